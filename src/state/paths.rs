//! State paths - the observable locations of [`ChartState`](super::ChartState).
//!
//! Subscribers declare what they depend on as a [`StatePaths`] set instead
//! of a bag of strings. Dotted paths (with `*` wildcards) are still accepted
//! at the edge and resolved against the schema table below.

bitflags::bitflags! {
    /// A set of state locations.
    ///
    /// Combine with bitwise OR: `StatePaths::PERIODS | StatePaths::VISIBLE_ROWS`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct StatePaths: u32 {
        const VIEWPORT_WIDTH = 1 << 0;
        const INNER_HEIGHT = 1 << 1;
        const SCROLL_TOP = 1 << 2;
        const PERIODS = 1 << 3;
        const VISIBLE_ROWS = 1 << 4;
        /// Row registry membership and row content.
        const ROWS = 1 << 5;
        /// Layout heights of any row (`rows.*.data.outer_height`).
        const ROW_HEIGHTS = 1 << 6;
        /// Total height of the visible rows.
        const ROWS_HEIGHT = 1 << 7;
        /// Row assignment of any chart item.
        const ITEM_ROWS = 1 << 8;
        /// Time extent of any chart item.
        const ITEM_TIMES = 1 << 9;
        const GRID_CONFIG = 1 << 10;
        /// The grid result published by any instance.
        const GRID = 1 << 11;
        const CONTAINER = 1 << 12;
        const HANDLES = 1 << 13;
    }
}

/// Dotted schema paths. `*` matches any key at that depth.
const SCHEMA: &[(&str, StatePaths)] = &[
    ("viewport.width", StatePaths::VIEWPORT_WIDTH),
    ("viewport.inner_height", StatePaths::INNER_HEIGHT),
    ("scroll.vertical.top", StatePaths::SCROLL_TOP),
    ("time.level.periods", StatePaths::PERIODS),
    ("list.visible_rows", StatePaths::VISIBLE_ROWS),
    ("list.rows_height", StatePaths::ROWS_HEIGHT),
    ("rows.*", StatePaths::ROWS),
    ("rows.*.data.outer_height", StatePaths::ROW_HEIGHTS),
    ("items.*.row_id", StatePaths::ITEM_ROWS),
    ("items.*.time", StatePaths::ITEM_TIMES),
    ("grid.config", StatePaths::GRID_CONFIG),
    ("grid.instances.*.rows_with_cells", StatePaths::GRID),
    ("grid.instances.*.container", StatePaths::CONTAINER),
    ("grid.handles", StatePaths::HANDLES),
];

impl StatePaths {
    /// Resolve a dotted path against the schema.
    ///
    /// - A leaf path selects that leaf: `"viewport.width"`
    /// - A parent path selects every leaf below it: `"viewport"`
    /// - `*` matches any key: `"rows.*.data.outer_height"`, `"items.*"`
    /// - A path below a leaf selects the deepest leaf containing it:
    ///   `"grid.config.cell_class"`, `"rows.r1.label"`
    ///
    /// Entries covering the whole query win over leaves that only contain
    /// it, so `"rows.r1.data.outer_height"` is `ROW_HEIGHTS` alone even
    /// though it also lies inside `rows.*`.
    ///
    /// Returns `None` if nothing in the schema matches.
    pub fn parse(path: &str) -> Option<Self> {
        if path.is_empty() {
            return None;
        }
        let query: Vec<&str> = path.split('.').collect();

        let covering = SCHEMA
            .iter()
            .filter(|(pattern, _)| pattern.split('.').count() >= query.len())
            .filter(|(pattern, _)| segments_match(&query, pattern))
            .fold(Self::empty(), |acc, (_, flag)| acc | *flag);
        if !covering.is_empty() {
            return Some(covering);
        }

        SCHEMA
            .iter()
            .filter(|(pattern, _)| segments_match(&query, pattern))
            .max_by_key(|(pattern, _)| pattern.split('.').count())
            .map(|(_, flag)| *flag)
    }

    /// Resolve several paths at once. Unknown paths are ignored.
    pub fn parse_all<'a>(paths: impl IntoIterator<Item = &'a str>) -> Self {
        paths
            .into_iter()
            .filter_map(Self::parse)
            .fold(Self::empty(), |acc, p| acc | p)
    }

    /// The dotted schema path of a single flag.
    pub fn path_of(flag: Self) -> Option<&'static str> {
        SCHEMA
            .iter()
            .find(|(_, f)| *f == flag)
            .map(|(pattern, _)| *pattern)
    }
}

/// Compare over the shorter of the two: a shorter query is a parent, a
/// longer one addresses something inside the pattern's leaf.
fn segments_match(query: &[&str], pattern: &str) -> bool {
    query
        .iter()
        .zip(pattern.split('.'))
        .all(|(q, p)| *q == "*" || p == "*" || *q == p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_leaf() {
        assert_eq!(
            StatePaths::parse("viewport.width"),
            Some(StatePaths::VIEWPORT_WIDTH)
        );
    }

    #[test]
    fn test_parse_parent_selects_children() {
        assert_eq!(
            StatePaths::parse("viewport"),
            Some(StatePaths::VIEWPORT_WIDTH | StatePaths::INNER_HEIGHT)
        );
        assert_eq!(
            StatePaths::parse("grid"),
            Some(
                StatePaths::GRID_CONFIG
                    | StatePaths::GRID
                    | StatePaths::CONTAINER
                    | StatePaths::HANDLES
            )
        );
    }

    #[test]
    fn test_parse_concrete_key_hits_wildcard() {
        assert_eq!(
            StatePaths::parse("rows.r1.data.outer_height"),
            Some(StatePaths::ROW_HEIGHTS)
        );
        assert_eq!(
            StatePaths::parse("rows.r1"),
            Some(StatePaths::ROWS | StatePaths::ROW_HEIGHTS)
        );
    }

    #[test]
    fn test_parse_inside_leaf_picks_deepest_container() {
        assert_eq!(StatePaths::parse("rows.r1.label"), Some(StatePaths::ROWS));
        assert_eq!(
            StatePaths::parse("rows.r1.data.outer_height.px"),
            Some(StatePaths::ROW_HEIGHTS)
        );
    }

    #[test]
    fn test_parse_grid_instance() {
        assert_eq!(
            StatePaths::parse("grid.instances.grid-0"),
            Some(StatePaths::GRID | StatePaths::CONTAINER)
        );
        assert_eq!(
            StatePaths::parse("grid.instances.grid-0.rows_with_cells"),
            Some(StatePaths::GRID)
        );
    }

    #[test]
    fn test_parse_wildcard_query() {
        assert_eq!(
            StatePaths::parse("items.*"),
            Some(StatePaths::ITEM_ROWS | StatePaths::ITEM_TIMES)
        );
        assert_eq!(
            StatePaths::parse("items.*.time"),
            Some(StatePaths::ITEM_TIMES)
        );
    }

    #[test]
    fn test_parse_below_leaf() {
        assert_eq!(
            StatePaths::parse("grid.config.cell_class"),
            Some(StatePaths::GRID_CONFIG)
        );
    }

    #[test]
    fn test_parse_unknown() {
        assert_eq!(StatePaths::parse(""), None);
        assert_eq!(StatePaths::parse("nope"), None);
        assert_eq!(StatePaths::parse("viewport.depth"), None);
    }

    #[test]
    fn test_parse_all_ignores_unknown() {
        let paths = StatePaths::parse_all(["time.level.periods", "bogus", "list.visible_rows"]);
        assert_eq!(paths, StatePaths::PERIODS | StatePaths::VISIBLE_ROWS);
    }

    #[test]
    fn test_path_of() {
        assert_eq!(
            StatePaths::path_of(StatePaths::GRID),
            Some("grid.instances.*.rows_with_cells")
        );
        assert_eq!(
            StatePaths::path_of(StatePaths::GRID | StatePaths::CONTAINER),
            None
        );
    }
}
