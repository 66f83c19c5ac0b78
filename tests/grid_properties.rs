//! Property tests for the cell matrix builder.

use std::cell::Cell as StdCell;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::rc::Rc;

use proptest::prelude::*;
use spark_timeline::{
    DEFAULT_CELL_ID_FORMAT, FormatCache, GridInputs, HookPipeline, Period, Row, TimeFormatter,
    Viewport, build_grid,
};

const CASES: u32 = 64;

/// Registered rows: ids r0..rN, some without layout data yet.
fn rows_strategy() -> impl Strategy<Value = Vec<Row>> {
    prop::collection::vec(prop::option::of(1u32..80), 0..12).prop_map(|heights| {
        heights
            .into_iter()
            .enumerate()
            .map(|(i, height)| match height {
                Some(h) => Row::new(format!("r{i}"), f64::from(h)),
                None => Row::pending(format!("r{i}")),
            })
            .collect()
    })
}

/// Visible ids, possibly repeated or unknown to the registry.
fn visible_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(0usize..16, 0..20)
        .prop_map(|ids| ids.into_iter().map(|i| format!("r{i}")).collect())
}

/// Sorted, distinct period starts. Steps may fall inside one minute.
fn periods_strategy() -> impl Strategy<Value = Vec<Period>> {
    prop::collection::btree_set(0i64..600, 0..10).prop_map(|starts: BTreeSet<i64>| {
        starts
            .into_iter()
            .map(|s| {
                let left = s * 15_000;
                Period::new(left, left + 15_000, 20.0)
            })
            .collect()
    })
}

#[derive(Debug)]
struct Case {
    rows: HashMap<String, Row>,
    visible: Vec<String>,
    periods: Vec<Period>,
}

impl Case {
    fn inputs(&self) -> GridInputs<'_> {
        GridInputs {
            viewport: Viewport {
                width: 640.0,
                inner_height: 480.0,
            },
            scroll_top: None,
            periods: &self.periods,
            visible_rows: &self.visible,
            rows: &self.rows,
        }
    }

    /// Visible ids that should make it into the grid, in order.
    fn expected_order(&self) -> Vec<String> {
        if self.periods.is_empty() {
            return Vec::new();
        }
        let mut seen = HashSet::new();
        self.visible
            .iter()
            .filter(|id| seen.insert(id.as_str()))
            .filter(|id| {
                self.rows
                    .get(id.as_str())
                    .and_then(Row::outer_height)
                    .is_some()
            })
            .cloned()
            .collect()
    }
}

fn case_strategy() -> impl Strategy<Value = Case> {
    (rows_strategy(), visible_strategy(), periods_strategy()).prop_map(
        |(rows, visible, periods)| Case {
            rows: rows.into_iter().map(|r| (r.id.clone(), r)).collect(),
            visible,
            periods,
        },
    )
}

fn counting_formatter() -> (Rc<StdCell<usize>>, impl TimeFormatter) {
    let calls = Rc::new(StdCell::new(0));
    let counter = calls.clone();
    let formatter = move |ts: i64, pattern: &str| {
        counter.set(counter.get() + 1);
        spark_timeline::ChronoFormatter.format(ts, pattern)
    };
    (calls, formatter)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: CASES,
        .. ProptestConfig::default()
    })]

    #[test]
    fn rows_follow_visible_order(case in case_strategy()) {
        let mut cache = FormatCache::new(DEFAULT_CELL_ID_FORMAT);
        let (_, formatter) = counting_formatter();
        let grid = build_grid(&case.inputs(), &mut cache, &formatter, &HookPipeline::default());

        let ids: Vec<String> = grid.iter().map(|r| r.row.id.clone()).collect();
        prop_assert_eq!(ids, case.expected_order());
    }

    #[test]
    fn tops_are_a_prefix_sum(case in case_strategy()) {
        let mut cache = FormatCache::new(DEFAULT_CELL_ID_FORMAT);
        let (_, formatter) = counting_formatter();
        let grid = build_grid(&case.inputs(), &mut cache, &formatter, &HookPipeline::default());

        let mut top = 0.0;
        for entry in &grid {
            prop_assert_eq!(entry.top, top);
            prop_assert!(entry.cells.iter().all(|c| c.top == top));
            prop_assert_eq!(entry.width, 640.0);
            top += entry.row.outer_height().unwrap_or_default();
        }
    }

    #[test]
    fn one_cell_per_period_with_unique_ids(case in case_strategy()) {
        let mut cache = FormatCache::new(DEFAULT_CELL_ID_FORMAT);
        let (_, formatter) = counting_formatter();
        let grid = build_grid(&case.inputs(), &mut cache, &formatter, &HookPipeline::default());

        for entry in &grid {
            prop_assert_eq!(entry.cells.len(), case.periods.len());
            let starts: Vec<i64> = entry.cells.iter().map(|c| c.time.left_global).collect();
            let expected: Vec<i64> = case.periods.iter().map(|p| p.left_global).collect();
            prop_assert_eq!(starts, expected);

            let prefix = format!("{}:", entry.row.id);
            prop_assert!(entry.cells.iter().all(|c| c.id.starts_with(&prefix)));
        }

        let all: Vec<&str> = grid
            .iter()
            .flat_map(|r| r.cells.iter().map(|c| c.id.as_str()))
            .collect();
        let distinct: HashSet<&str> = all.iter().copied().collect();
        prop_assert_eq!(distinct.len(), all.len());
    }

    #[test]
    fn rebuilding_is_idempotent(case in case_strategy()) {
        let mut cache = FormatCache::new(DEFAULT_CELL_ID_FORMAT);
        let (calls, formatter) = counting_formatter();
        let hooks = HookPipeline::default();

        let first = build_grid(&case.inputs(), &mut cache, &formatter, &hooks);
        let calls_after_first = calls.get();
        let second = build_grid(&case.inputs(), &mut cache, &formatter, &hooks);

        let shape = |grid: &spark_timeline::GridResult| -> Vec<(String, f64, Vec<String>)> {
            grid.iter()
                .map(|r| (
                    r.row.id.clone(),
                    r.top,
                    r.cells.iter().map(|c| c.id.clone()).collect(),
                ))
                .collect()
        };
        prop_assert_eq!(shape(&first), shape(&second));
        prop_assert_eq!(calls.get(), calls_after_first, "second build hits the cache");
    }

    #[test]
    fn each_timestamp_is_formatted_at_most_once(case in case_strategy()) {
        let mut cache = FormatCache::new(DEFAULT_CELL_ID_FORMAT);
        let (calls, formatter) = counting_formatter();
        let grid = build_grid(&case.inputs(), &mut cache, &formatter, &HookPipeline::default());

        let distinct: HashSet<i64> = case.periods.iter().map(|p| p.left_global).collect();
        prop_assert!(calls.get() <= distinct.len());
        if !grid.is_empty() {
            prop_assert_eq!(calls.get(), distinct.len());
            prop_assert_eq!(cache.len(), distinct.len());
        }
    }
}
