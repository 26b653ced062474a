use std::collections::HashMap;

/// Parses a spreadsheet count such as `"1,234,567"`.
pub fn parse_count(cell: &str) -> Option<i64> {
    let cleaned: String = cell.trim().chars().filter(|c| *c != ',').collect();
    cleaned.parse().ok()
}

/// A player row placed in the kingdom ranking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedRow {
    pub cells: Vec<String>,
    /// Parsed last cell; `None` when the sheet holds something non-numeric there.
    pub score: Option<i64>,
    pub rank: usize,
}

impl RankedRow {
    pub fn id(&self) -> &str {
        self.cells.first().map(String::as_str).unwrap_or_default()
    }

    pub fn name(&self) -> &str {
        self.cells.get(1).map(String::as_str).unwrap_or_default()
    }
}

/// Player rows sorted by total score, plus an id lookup into them.
///
/// Built once from the data rows of a grid and never mutated afterwards.
/// Rows whose last cell is not a number are kept so the player can still be
/// looked up, but they rank after every scored row in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RankedTable {
    rows: Vec<RankedRow>,
    by_id: HashMap<String, usize>,
}

impl RankedTable {
    pub fn build(data_rows: &[Vec<String>]) -> Self {
        let mut scored: Vec<(Option<i64>, &Vec<String>)> = Vec::with_capacity(data_rows.len());
        for (idx, row) in data_rows.iter().enumerate() {
            let Some(last) = row.last() else {
                tracing::debug!(row = idx + 1, "skipping empty row");
                continue;
            };
            let score = parse_count(last);
            if score.is_none() {
                let id = &row[0];
                tracing::warn!(
                    row = idx + 1,
                    id = %id,
                    value = %last,
                    "total score is not a number; ranking row last"
                );
            }
            scored.push((score, row));
        }

        // Stable: equal scores keep sheet order, unscored rows trail in sheet order.
        scored.sort_by(|a, b| match (a.0, b.0) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });

        let rows: Vec<RankedRow> = scored
            .into_iter()
            .enumerate()
            .map(|(pos, (score, cells))| RankedRow {
                cells: cells.clone(),
                score,
                rank: pos + 1,
            })
            .collect();

        let mut by_id = HashMap::with_capacity(rows.len());
        for (pos, row) in rows.iter().enumerate() {
            if let Some(previous) = by_id.insert(row.id().to_string(), pos) {
                tracing::warn!(
                    id = row.id(),
                    previous_rank = previous + 1,
                    rank = pos + 1,
                    "duplicate player id"
                );
            }
        }

        Self { rows, by_id }
    }

    pub fn total(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[RankedRow] {
        &self.rows
    }

    pub fn get(&self, id: &str) -> Option<&RankedRow> {
        self.by_id.get(id).map(|&pos| &self.rows[pos])
    }

    /// The synthetic `rank/total` field appended to a player's record.
    pub fn rank_label(&self, row: &RankedRow) -> String {
        format!("{}/{}", row.rank, self.total())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parse_count_strips_thousands_separators() {
        assert_eq!(parse_count("5,000"), Some(5000));
        assert_eq!(parse_count(" 1,234,567 "), Some(1_234_567));
        assert_eq!(parse_count("-12"), Some(-12));
        assert_eq!(parse_count("abc"), None);
        assert_eq!(parse_count(""), None);
        assert_eq!(parse_count("1.5"), None);
    }

    #[test]
    fn equal_scores_keep_input_order() {
        let rows = vec![
            row(&["a", "A", "5,000"]),
            row(&["b", "B", "3,000"]),
            row(&["c", "C", "5,000"]),
        ];
        let table = RankedTable::build(&rows);
        let order: Vec<(&str, usize)> = table.rows().iter().map(|r| (r.id(), r.rank)).collect();
        assert_eq!(order, vec![("a", 1), ("c", 2), ("b", 3)]);
        assert_eq!(table.total(), 3);
        let c = table.get("c").expect("c indexed");
        assert_eq!(table.rank_label(c), "2/3");
    }

    #[test]
    fn unparsable_scores_rank_after_scored_rows() {
        let rows = vec![
            row(&["x", "X", "n/a"]),
            row(&["a", "A", "10"]),
            row(&["y", "Y", ""]),
            row(&["b", "B", "20"]),
        ];
        let table = RankedTable::build(&rows);
        let ids: Vec<&str> = table.rows().iter().map(RankedRow::id).collect();
        assert_eq!(ids, vec!["b", "a", "x", "y"]);
        assert_eq!(table.get("x").map(|r| r.score), Some(None));
        assert_eq!(table.get("b").map(|r| r.score), Some(Some(20)));
        assert_eq!(table.total(), 4);
    }

    #[test]
    fn empty_rows_are_dropped() {
        let rows = vec![row(&[]), row(&["a", "A", "1"])];
        let table = RankedTable::build(&rows);
        assert_eq!(table.total(), 1);
        assert_eq!(table.rows()[0].rank, 1);
    }

    #[test]
    fn duplicate_ids_resolve_to_later_ranked_row() {
        let rows = vec![row(&["a", "First", "100"]), row(&["a", "Second", "50"])];
        let table = RankedTable::build(&rows);
        let found = table.get("a").expect("a indexed");
        assert_eq!(found.name(), "Second");
        assert_eq!(found.rank, 2);
        assert_eq!(table.total(), 2);
    }

    #[test]
    fn empty_input_builds_empty_table() {
        let table = RankedTable::build(&[]);
        assert!(table.is_empty());
        assert_eq!(table.get("a"), None);
    }
}
