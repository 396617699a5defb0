//! Chart registry.
//!
//! Charts are an opaque sink: each one holds the latest `(labels, values)`
//! pair plus the metadata the page needs to draw it. The registry is owned by
//! the dashboard view and mutated only through the update functions below.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::ChartSeries;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChartName {
    ApiCalls,
    DetectionCategories,
    HourlyUsage,
    ResponseTime,
    TopCategories,
    DeviceDistribution,
}

impl ChartName {
    pub const ALL: [ChartName; 6] = [
        ChartName::ApiCalls,
        ChartName::DetectionCategories,
        ChartName::HourlyUsage,
        ChartName::ResponseTime,
        ChartName::TopCategories,
        ChartName::DeviceDistribution,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ChartName::ApiCalls => "api-calls",
            ChartName::DetectionCategories => "detection-categories",
            ChartName::HourlyUsage => "hourly-usage",
            ChartName::ResponseTime => "response-time",
            ChartName::TopCategories => "top-categories",
            ChartName::DeviceDistribution => "device-distribution",
        }
    }

    pub fn kind(self) -> ChartKind {
        match self {
            ChartName::ApiCalls | ChartName::ResponseTime => ChartKind::Line,
            ChartName::DetectionCategories => ChartKind::Doughnut,
            ChartName::HourlyUsage | ChartName::TopCategories => ChartKind::Bar,
            ChartName::DeviceDistribution => ChartKind::Pie,
        }
    }

    /// Legend text for the single dataset.
    pub fn dataset_label(self) -> &'static str {
        match self {
            ChartName::ApiCalls | ChartName::HourlyUsage => "API Calls",
            ChartName::ResponseTime => "Response Time (ms)",
            ChartName::TopCategories => "Detection Count",
            ChartName::DetectionCategories => "Categories",
            ChartName::DeviceDistribution => "Devices",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Line,
    Bar,
    Doughnut,
    Pie,
}

/// Current contents of one chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartState {
    pub kind: ChartKind,
    pub dataset_label: &'static str,
    pub labels: Vec<String>,
    pub data: Vec<f64>,
    /// Bumped on every update so the page can skip redraws.
    pub revision: u64,
}

impl ChartState {
    fn empty(name: ChartName) -> Self {
        Self {
            kind: name.kind(),
            dataset_label: name.dataset_label(),
            labels: Vec::new(),
            data: Vec::new(),
            revision: 0,
        }
    }
}

/// Every chart on the dashboard, keyed by name.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ChartRegistry {
    charts: BTreeMap<ChartName, ChartState>,
}

impl Default for ChartRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ChartRegistry {
    /// All six charts, empty.
    pub fn new() -> Self {
        Self {
            charts: ChartName::ALL
                .into_iter()
                .map(|name| (name, ChartState::empty(name)))
                .collect(),
        }
    }

    pub fn get(&self, name: ChartName) -> Option<&ChartState> {
        self.charts.get(&name)
    }

    /// Replace a chart's data wholesale.
    pub fn set(&mut self, name: ChartName, series: &ChartSeries) {
        let state = self
            .charts
            .entry(name)
            .or_insert_with(|| ChartState::empty(name));
        state.labels = series.labels.clone();
        state.data = series.data.clone();
        state.revision += 1;
    }
}

pub fn update_api_calls_chart(registry: &mut ChartRegistry, series: &ChartSeries) {
    registry.set(ChartName::ApiCalls, series);
}

/// Detection categories feed both the doughnut and the top-categories bars.
pub fn update_category_charts(registry: &mut ChartRegistry, series: &ChartSeries) {
    registry.set(ChartName::DetectionCategories, series);
    registry.set(ChartName::TopCategories, series);
}

pub fn update_hourly_usage_chart(registry: &mut ChartRegistry, series: &ChartSeries) {
    registry.set(ChartName::HourlyUsage, series);
}

pub fn update_response_time_chart(registry: &mut ChartRegistry, series: &ChartSeries) {
    registry.set(ChartName::ResponseTime, series);
}

pub fn update_device_distribution_chart(registry: &mut ChartRegistry, series: &ChartSeries) {
    registry.set(ChartName::DeviceDistribution, series);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(labels: &[&str], data: &[f64]) -> ChartSeries {
        ChartSeries::new(labels.iter().map(|s| s.to_string()).collect(), data.to_vec()).unwrap()
    }

    #[test]
    fn registry_starts_with_all_charts_empty() {
        let registry = ChartRegistry::new();
        for name in ChartName::ALL {
            let chart = registry.get(name).unwrap();
            assert!(chart.labels.is_empty());
            assert_eq!(chart.revision, 0);
        }
    }

    #[test]
    fn categories_update_two_charts() {
        let mut registry = ChartRegistry::new();
        update_category_charts(&mut registry, &series(&["person", "car"], &[10.0, 4.0]));

        let doughnut = registry.get(ChartName::DetectionCategories).unwrap();
        let bars = registry.get(ChartName::TopCategories).unwrap();
        assert_eq!(doughnut.labels, bars.labels);
        assert_eq!(doughnut.kind, ChartKind::Doughnut);
        assert_eq!(bars.kind, ChartKind::Bar);
        assert!(registry.get(ChartName::ApiCalls).unwrap().data.is_empty());
    }

    #[test]
    fn updates_bump_revision() {
        let mut registry = ChartRegistry::new();
        update_api_calls_chart(&mut registry, &series(&["00:00"], &[1.0]));
        update_api_calls_chart(&mut registry, &series(&["00:00"], &[2.0]));
        let chart = registry.get(ChartName::ApiCalls).unwrap();
        assert_eq!(chart.revision, 2);
        assert_eq!(chart.data, vec![2.0]);
    }

    #[test]
    fn serializes_with_kebab_case_keys() {
        let mut registry = ChartRegistry::new();
        update_device_distribution_chart(&mut registry, &series(&["Desktop"], &[3.0]));
        let json = serde_json::to_value(&registry).unwrap();
        assert_eq!(json["device-distribution"]["kind"], "pie");
        assert_eq!(json["device-distribution"]["labels"][0], "Desktop");
        assert_eq!(json["response-time"]["dataset_label"], "Response Time (ms)");
    }
}
