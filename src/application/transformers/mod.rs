// Panel transformers - query results to template merge variables
pub mod base;
pub mod gauge;
pub mod polystat;
pub mod stat;
pub mod table;
pub mod timeseries;

use crate::domain::panel::Panel;
use crate::domain::query::QueryResult;
use serde_json::{Map, Value};
use std::collections::HashMap;

use gauge::{BarGaugeTransformer, GaugeTransformer};
use polystat::PolystatTransformer;
use stat::StatTransformer;
use table::TableTransformer;
use timeseries::TimeSeriesTransformer;

/// Options passed through from the caller.
///
/// `timezone` is accepted for interface compatibility; rendering is UTC.
#[derive(Debug, Clone)]
pub struct TransformOptions {
    pub label_key: String,
    #[allow(dead_code)]
    pub timezone: String,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            label_key: "name".to_string(),
            timezone: "UTC".to_string(),
        }
    }
}

/// Converts one panel's query result into the flat merge-variables map
/// consumed by TRMNL templates.
pub trait Transformer {
    fn transform(
        &self,
        panel: &Panel,
        query_result: &QueryResult,
        options: &TransformOptions,
    ) -> Map<String, Value>;
}

/// The closed set of supported panel families. Aliases in the registry map
/// several Grafana type strings onto one family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelKind {
    Stat,
    Gauge,
    BarGauge,
    Polystat,
    Table,
    TableLegacy,
    TimeSeries,
    Graph,
    BarChart,
}

/// Immutable panel-type lookup table, built once by the composition root.
pub struct TransformerRegistry {
    kinds: HashMap<&'static str, PanelKind>,
}

impl TransformerRegistry {
    pub fn new() -> Self {
        let kinds = HashMap::from([
            ("stat", PanelKind::Stat),
            ("gauge", PanelKind::Gauge),
            ("bargauge", PanelKind::BarGauge),
            ("polystat", PanelKind::Polystat),
            ("grafana-polystat-panel", PanelKind::Polystat),
            ("table", PanelKind::Table),
            ("table-old", PanelKind::TableLegacy),
            ("timeseries", PanelKind::TimeSeries),
            ("graph", PanelKind::Graph),
            ("barchart", PanelKind::BarChart),
        ]);
        Self { kinds }
    }

    /// Resolve a panel type string. Unknown types fall back to the
    /// single-value transformer rather than failing.
    pub fn dispatch(&self, panel_type: &str) -> Box<dyn Transformer> {
        let kind = self
            .kinds
            .get(panel_type)
            .copied()
            .unwrap_or(PanelKind::Stat);

        match kind {
            PanelKind::Stat => Box::new(StatTransformer),
            PanelKind::Gauge => Box::new(GaugeTransformer),
            PanelKind::BarGauge => Box::new(BarGaugeTransformer),
            PanelKind::Polystat => Box::new(PolystatTransformer),
            PanelKind::Table => Box::new(TableTransformer::new("table")),
            PanelKind::TableLegacy => Box::new(TableTransformer::new("table-old")),
            PanelKind::TimeSeries => Box::new(TimeSeriesTransformer::new("timeseries")),
            PanelKind::Graph => Box::new(TimeSeriesTransformer::new("graph")),
            PanelKind::BarChart => Box::new(TimeSeriesTransformer::new("barchart")),
        }
    }

    pub fn supported_types(&self) -> Vec<&'static str> {
        let mut types: Vec<&'static str> = self.kinds.keys().copied().collect();
        types.sort_unstable();
        types
    }
}

impl Default for TransformerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::panel::Panel;
    use serde_json::json;

    fn stat_panel() -> Panel {
        Panel::from_response(&json!({"id": 1, "type": "stat", "title": "T"}))
    }

    #[test]
    fn test_supported_types() {
        let registry = TransformerRegistry::new();
        let types = registry.supported_types();
        for ty in ["stat", "gauge", "bargauge", "table", "timeseries", "polystat"] {
            assert!(types.contains(&ty), "missing {ty}");
        }
    }

    #[test]
    fn test_unknown_type_falls_back_to_stat() {
        let registry = TransformerRegistry::new();
        let panel = stat_panel();
        let result = QueryResult::default();
        let options = TransformOptions::default();

        let fallback = registry
            .dispatch("unknown_panel_type")
            .transform(&panel, &result, &options);
        let stat = registry
            .dispatch("stat")
            .transform(&panel, &result, &options);

        assert_eq!(fallback["panel_type"], stat["panel_type"]);
    }

    #[test]
    fn test_aliases_share_a_family() {
        let registry = TransformerRegistry::new();
        let panel = stat_panel();
        let result = QueryResult::default();
        let options = TransformOptions::default();

        let graph = registry
            .dispatch("graph")
            .transform(&panel, &result, &options);
        assert_eq!(graph["panel_type"], json!("graph"));
        assert!(graph.contains_key("chart_data"));

        let polystat = registry
            .dispatch("grafana-polystat-panel")
            .transform(&panel, &result, &options);
        assert_eq!(polystat["panel_type"], json!("polystat"));
    }
}
