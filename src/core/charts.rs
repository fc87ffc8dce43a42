//! Declarative chart bindings over per-step state records.
//!
//! A binding maps dotted key-paths inside heterogeneous step records onto a
//! live point collection, with no chart-specific code: time-series charts bind
//! one scalar path per dataset; scatter charts bind an array-valued field and
//! trace one entity per label. The engine only accumulates points and computes
//! visibility; drawing is the frontend's problem.
//!
//! Scrub semantics: a scrub value `v` in `[0, 100]` maps to a point-count
//! threshold `floor(N * v / 100)`. Panel bindings (all entities shown at once)
//! render the temporal prefix up to the threshold, faded by recency; non-panel
//! bindings render the single point at the threshold index.

use crate::history::StepRecord;
use serde_json::Value;

/// One line in a time-series chart: a display label and the key-path it binds.
#[derive(Debug, Clone)]
pub struct DatasetSpec {
    pub label: String,
    pub key: String,
}

/// A time-series chart: a title and its dataset bindings.
#[derive(Debug, Clone)]
pub struct ChartSpec {
    pub title: String,
    pub datasets: Vec<DatasetSpec>,
}

/// A scatter-trajectory chart.
///
/// `key` resolves to an array of entity samples in each record; entry `i`
/// (one per label) carries a two-element coordinate pair under `item_key`.
/// Panel charts show every entity's full trail simultaneously; non-panel
/// charts highlight a single moment per trajectory.
#[derive(Debug, Clone)]
pub struct ScatterSpec {
    pub title: String,
    pub key: String,
    pub item_key: String,
    pub panel: bool,
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesPoint {
    pub step: u64,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TracePoint {
    pub step: u64,
    pub x: f64,
    pub y: f64,
}

/// Scrub value to visible-point threshold.
fn scrub_threshold(n: usize, scrub: f64) -> usize {
    (n as f64 * scrub / 100.0).floor() as usize
}

/// Live state of one time-series chart.
#[derive(Debug)]
pub struct ChartState {
    series: Vec<Vec<SeriesPoint>>,
    scrub: f64,
}

impl ChartState {
    fn new(datasets: usize) -> Self {
        Self {
            series: vec![Vec::new(); datasets],
            scrub: 100.0,
        }
    }

    fn append(&mut self, spec: &ChartSpec, record: &StepRecord) {
        for (dataset, points) in spec.datasets.iter().zip(&mut self.series) {
            // A miss is legitimate (the field may be absent this step): skip.
            if let Some(value) = record.resolve(&dataset.key).and_then(Value::as_f64) {
                points.push(SeriesPoint {
                    step: record.step,
                    value,
                });
            }
        }
    }

    pub fn scrub(&self) -> f64 {
        self.scrub
    }

    pub fn series(&self, dataset: usize) -> &[SeriesPoint] {
        &self.series[dataset]
    }

    /// Points visible at the current scrub position (temporal prefix).
    pub fn visible(&self, dataset: usize) -> &[SeriesPoint] {
        let points = &self.series[dataset];
        &points[..scrub_threshold(points.len(), self.scrub)]
    }

    fn reset(&mut self) {
        for points in &mut self.series {
            points.clear();
        }
        self.scrub = 100.0;
    }
}

/// Live state of one scatter chart.
#[derive(Debug)]
pub struct ScatterState {
    traces: Vec<Vec<TracePoint>>,
    scrub: f64,
}

impl ScatterState {
    fn new(labels: usize) -> Self {
        Self {
            traces: vec![Vec::new(); labels],
            scrub: 100.0,
        }
    }

    fn append(&mut self, spec: &ScatterSpec, record: &StepRecord) {
        let Some(Value::Array(items)) = record.resolve(&spec.key) else {
            return;
        };
        for (i, trace) in self.traces.iter_mut().enumerate() {
            // Entity `i` may be absent from this step's sample: skip.
            let Some(pair) = items.get(i).and_then(|item| item.get(&spec.item_key)) else {
                continue;
            };
            let (Some(x), Some(y)) = (
                pair.get(0).and_then(Value::as_f64),
                pair.get(1).and_then(Value::as_f64),
            ) else {
                continue;
            };
            trace.push(TracePoint {
                step: record.step,
                x,
                y,
            });
        }
    }

    pub fn scrub(&self) -> f64 {
        self.scrub
    }

    pub fn trace(&self, label: usize) -> &[TracePoint] {
        &self.traces[label]
    }

    /// Panel visibility: the trajectory prefix up to the scrub threshold.
    pub fn visible(&self, label: usize) -> &[TracePoint] {
        let trace = &self.traces[label];
        &trace[..scrub_threshold(trace.len(), self.scrub)]
    }

    /// Non-panel visibility: the single point at the scrub position.
    pub fn focused(&self, label: usize) -> Option<&TracePoint> {
        let trace = &self.traces[label];
        if trace.is_empty() {
            return None;
        }
        let idx = scrub_threshold(trace.len(), self.scrub).min(trace.len() - 1);
        trace.get(idx)
    }

    /// Recency fade for panel rendering: newest points are most opaque.
    pub fn alpha(&self, label: usize, point: usize) -> f32 {
        let n = self.traces[label].len();
        if n == 0 {
            return 0.0;
        }
        (point + 1) as f32 / n as f32
    }

    fn reset(&mut self) {
        for trace in &mut self.traces {
            trace.clear();
        }
        self.scrub = 100.0;
    }
}

/// The full set of chart and scatter bindings for a dashboard.
#[derive(Debug, Default)]
pub struct ChartBindings {
    charts: Vec<(ChartSpec, ChartState)>,
    scatters: Vec<(ScatterSpec, ScatterState)>,
}

impl ChartBindings {
    pub fn new(charts: Vec<ChartSpec>, scatters: Vec<ScatterSpec>) -> Self {
        Self {
            charts: charts
                .into_iter()
                .map(|spec| {
                    let state = ChartState::new(spec.datasets.len());
                    (spec, state)
                })
                .collect(),
            scatters: scatters
                .into_iter()
                .map(|spec| {
                    let state = ScatterState::new(spec.labels.len());
                    (spec, state)
                })
                .collect(),
        }
    }

    /// Feed newly fetched records, in step order, to every binding.
    pub fn append(&mut self, records: &[StepRecord]) {
        for record in records {
            for (spec, state) in &mut self.charts {
                state.append(spec, record);
            }
            for (spec, state) in &mut self.scatters {
                state.append(spec, record);
            }
        }
    }

    /// Clear every binding's data and return all scrubs to full visibility.
    pub fn reset(&mut self) {
        for (_, state) in &mut self.charts {
            state.reset();
        }
        for (_, state) in &mut self.scatters {
            state.reset();
        }
    }

    pub fn charts(&self) -> &[(ChartSpec, ChartState)] {
        &self.charts
    }

    pub fn scatters(&self) -> &[(ScatterSpec, ScatterState)] {
        &self.scatters
    }

    pub fn set_chart_scrub(&mut self, chart: usize, scrub: f64) {
        if let Some((_, state)) = self.charts.get_mut(chart) {
            state.scrub = scrub.clamp(0.0, 100.0);
        }
    }

    pub fn set_scatter_scrub(&mut self, scatter: usize, scrub: f64) {
        if let Some((_, state)) = self.scatters.get_mut(scatter) {
            state.scrub = scrub.clamp(0.0, 100.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(step: u64, fields: Value) -> StepRecord {
        let mut v = fields;
        v["step"] = json!(step);
        serde_json::from_value(v).unwrap()
    }

    fn shares_chart() -> ChartSpec {
        ChartSpec {
            title: "Shares per Content".into(),
            datasets: vec![
                DatasetSpec {
                    label: "mean".into(),
                    key: "shares.mean".into(),
                },
                DatasetSpec {
                    label: "max".into(),
                    key: "shares.max".into(),
                },
            ],
        }
    }

    fn agent_scatter(panel: bool) -> ScatterSpec {
        ScatterSpec {
            title: "Agent Values".into(),
            key: "agents".into(),
            item_key: "values".into(),
            panel,
            labels: (0..3).map(|i| format!("Agent {i}")).collect(),
        }
    }

    #[test]
    fn series_accumulate_in_step_order() {
        let mut bindings = ChartBindings::new(vec![shares_chart()], vec![]);
        let records: Vec<StepRecord> = (0..4)
            .map(|s| {
                record(
                    s,
                    json!({"shares": {"mean": s as f64 * 0.5, "max": s as f64}}),
                )
            })
            .collect();
        bindings.append(&records[..2]);
        bindings.append(&records[2..]);

        let (_, state) = &bindings.charts()[0];
        let mean = state.series(0);
        assert_eq!(mean.len(), 4);
        assert_eq!(mean[3], SeriesPoint { step: 3, value: 1.5 });
        assert_eq!(state.series(1).len(), 4);
    }

    #[test]
    fn missing_paths_are_skipped_not_errors() {
        let mut bindings = ChartBindings::new(vec![shares_chart()], vec![]);
        bindings.append(&[
            record(0, json!({"shares": {"mean": 1.0}})),
            record(1, json!({"followers": {"mean": 9.0}})),
            record(2, json!({"shares": {"mean": 3.0, "max": 4.0}})),
        ]);

        let (_, state) = &bindings.charts()[0];
        assert_eq!(state.series(0).len(), 2);
        assert_eq!(state.series(1).len(), 1);
        assert_eq!(state.series(0)[1].step, 2);
    }

    #[test]
    fn scatter_traces_one_entity_per_label() {
        let mut bindings = ChartBindings::new(vec![], vec![agent_scatter(true)]);
        bindings.append(&[
            record(
                0,
                json!({"agents": [
                    {"values": [0.1, 0.2]},
                    {"values": [0.3, 0.4]},
                ]}),
            ),
            record(
                1,
                json!({"agents": [
                    {"values": [0.5, 0.6]},
                    {"id": 7},
                    {"values": [0.7, 0.8]},
                ]}),
            ),
        ]);

        let (_, state) = &bindings.scatters()[0];
        assert_eq!(state.trace(0).len(), 2);
        // Entity 1 had no coordinate pair at step 1.
        assert_eq!(state.trace(1).len(), 1);
        // Entity 2 was absent at step 0.
        assert_eq!(state.trace(2), &[TracePoint { step: 1, x: 0.7, y: 0.8 }]);
    }

    #[test]
    fn dotted_scatter_keys_resolve_through_nested_records() {
        let spec = ScatterSpec {
            title: "Publisher Audience Understanding".into(),
            key: "publishers.audience".into(),
            item_key: "values".into(),
            panel: true,
            labels: vec!["Publisher 0".into()],
        };
        let mut bindings = ChartBindings::new(vec![], vec![spec]);
        bindings.append(&[record(
            0,
            json!({"publishers": {"audience": [{"values": [1.0, -1.0]}]}}),
        )]);
        let (_, state) = &bindings.scatters()[0];
        assert_eq!(state.trace(0).len(), 1);
    }

    #[test]
    fn scrub_threshold_windows_panel_points() {
        let mut bindings = ChartBindings::new(vec![], vec![agent_scatter(true)]);
        let records: Vec<StepRecord> = (0..10)
            .map(|s| record(s, json!({"agents": [{"values": [s as f64, 0.0]}]})))
            .collect();
        bindings.append(&records);

        bindings.set_scatter_scrub(0, 50.0);
        let (_, state) = &bindings.scatters()[0];
        assert_eq!(state.visible(0).len(), 5);

        bindings.set_scatter_scrub(0, 100.0);
        assert_eq!(bindings.scatters()[0].1.visible(0).len(), 10);

        bindings.set_scatter_scrub(0, 0.0);
        assert_eq!(bindings.scatters()[0].1.visible(0).len(), 0);
    }

    #[test]
    fn non_panel_focuses_a_single_point() {
        let mut bindings = ChartBindings::new(vec![], vec![agent_scatter(false)]);
        let records: Vec<StepRecord> = (0..4)
            .map(|s| record(s, json!({"agents": [{"values": [s as f64, 0.0]}]})))
            .collect();
        bindings.append(&records);

        // Full scrub clamps to the most recent point.
        let (_, state) = &bindings.scatters()[0];
        assert_eq!(state.focused(0).unwrap().step, 3);

        bindings.set_scatter_scrub(0, 25.0);
        assert_eq!(bindings.scatters()[0].1.focused(0).unwrap().step, 1);

        bindings.set_scatter_scrub(0, 0.0);
        assert_eq!(bindings.scatters()[0].1.focused(0).unwrap().step, 0);

        // An empty trajectory has no focus point.
        assert!(bindings.scatters()[0].1.focused(2).is_none());
    }

    #[test]
    fn recency_alpha_rises_toward_newest() {
        let mut bindings = ChartBindings::new(vec![], vec![agent_scatter(true)]);
        let records: Vec<StepRecord> = (0..4)
            .map(|s| record(s, json!({"agents": [{"values": [0.0, 0.0]}]})))
            .collect();
        bindings.append(&records);

        let (_, state) = &bindings.scatters()[0];
        assert!(state.alpha(0, 0) < state.alpha(0, 3));
        assert_eq!(state.alpha(0, 3), 1.0);
    }

    #[test]
    fn reset_clears_data_and_restores_full_visibility() {
        let mut bindings = ChartBindings::new(vec![shares_chart()], vec![agent_scatter(true)]);
        bindings.append(&[record(
            0,
            json!({"shares": {"mean": 1.0}, "agents": [{"values": [0.0, 0.0]}]}),
        )]);
        bindings.set_chart_scrub(0, 10.0);
        bindings.set_scatter_scrub(0, 10.0);

        bindings.reset();

        let (_, chart) = &bindings.charts()[0];
        let (_, scatter) = &bindings.scatters()[0];
        assert!(chart.series(0).is_empty());
        assert!(scatter.trace(0).is_empty());
        assert_eq!(chart.scrub(), 100.0);
        assert_eq!(scatter.scrub(), 100.0);
    }

    #[test]
    fn scrub_input_is_clamped() {
        let mut bindings = ChartBindings::new(vec![shares_chart()], vec![]);
        bindings.set_chart_scrub(0, 250.0);
        assert_eq!(bindings.charts()[0].1.scrub(), 100.0);
        bindings.set_chart_scrub(0, -3.0);
        assert_eq!(bindings.charts()[0].1.scrub(), 0.0);
    }
}
