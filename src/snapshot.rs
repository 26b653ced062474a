use chrono::{DateTime, Utc};

use crate::ranking::{RankedRow, RankedTable};
use crate::schema::{FieldMap, Grid, detect_boundary};

/// A player's record as label/value pairs, in display order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerStats {
    fields: Vec<(String, String)>,
}

impl PlayerStats {
    pub fn get(&self, label: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, label: &str) -> bool {
        self.get(label).is_some()
    }

    #[cfg(test)]
    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    pub(crate) fn insert(&mut self, label: &str, value: &str) {
        // Later columns win when a label repeats, matching a map built left to right.
        if let Some(slot) = self.fields.iter_mut().find(|(l, _)| l == label) {
            slot.1 = value.to_string();
        } else {
            self.fields.push((label.to_string(), value.to_string()));
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopEntry {
    pub name: String,
    pub score: Option<i64>,
}

/// The latest KvK data, ranked and indexed.
///
/// A snapshot is built in one pass from a fetched grid and is read-only from
/// then on. Refreshing means building a new one.
#[derive(Debug, Clone)]
pub struct KvkSnapshot {
    header: Vec<String>,
    boundary: Option<usize>,
    table: RankedTable,
    fields: FieldMap,
    fetched_at: DateTime<Utc>,
}

impl KvkSnapshot {
    pub fn build(grid: &Grid, fields: &FieldMap) -> Self {
        let fetched_at = Utc::now();
        let Some((header, data_rows)) = grid.split_first() else {
            tracing::warn!("spreadsheet returned no rows");
            return Self {
                header: Vec::new(),
                boundary: None,
                table: RankedTable::default(),
                fields: fields.clone(),
                fetched_at,
            };
        };

        let boundary = detect_boundary(header);
        match boundary {
            Some(idx) => {
                let missing = fields.validate(fields.projected_labels(header, idx));
                if !missing.is_empty() {
                    tracing::warn!(
                        field_map = fields.version,
                        missing = ?missing,
                        "sheet header does not carry every configured field"
                    );
                }
            }
            None => tracing::warn!(
                columns = header.len(),
                "no date column in sheet header; latest data unavailable"
            ),
        }

        let table = RankedTable::build(data_rows);
        if table.is_empty() {
            tracing::warn!("sheet has a header but no player rows");
        }
        tracing::info!(
            players = table.total(),
            date = boundary.map(|idx| header[idx].as_str()).unwrap_or("none"),
            "built kvk snapshot"
        );

        Self {
            header: header.clone(),
            boundary,
            table,
            fields: fields.clone(),
            fetched_at,
        }
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn field_map(&self) -> &FieldMap {
        &self.fields
    }

    pub fn total_players(&self) -> usize {
        self.table.total()
    }

    /// Label of the latest snapshot column, e.g. `10/15/24`.
    pub fn registration_date(&self) -> Option<&str> {
        self.boundary.map(|idx| self.header[idx].as_str())
    }

    /// Identity prefix, latest snapshot columns and kingdom rank for one player.
    ///
    /// The date column itself only marks the block boundary; its label is
    /// exposed through [`Self::registration_date`] instead.
    pub fn player(&self, id: &str) -> Option<PlayerStats> {
        let boundary = self.boundary?;
        let row = self.table.get(id)?;
        let mut stats = self.identity_fields(row);
        for (label, value) in self.header.iter().zip(row.cells.iter()).skip(boundary + 1) {
            stats.insert(label, value);
        }
        stats.insert(&self.fields.rank_label, &self.table.rank_label(row));
        Some(stats)
    }

    /// Identity prefix and rank only; answers even when no date column exists.
    pub fn player_identity(&self, id: &str) -> Option<PlayerStats> {
        let row = self.table.get(id)?;
        let mut stats = self.identity_fields(row);
        stats.insert(&self.fields.rank_label, &self.table.rank_label(row));
        Some(stats)
    }

    pub fn top(&self, n: usize) -> Vec<TopEntry> {
        self.table
            .rows()
            .iter()
            .take(n)
            .map(|row| TopEntry {
                name: row.name().to_string(),
                score: row.score,
            })
            .collect()
    }

    fn identity_fields(&self, row: &RankedRow) -> PlayerStats {
        let mut stats = PlayerStats::default();
        for (label, value) in self.fields.base_labels.iter().zip(row.cells.iter()) {
            stats.insert(label, value);
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&[&str]]) -> Grid {
        rows.iter()
            .map(|r| r.iter().map(|s| s.to_string()).collect())
            .collect()
    }

    fn sample() -> Grid {
        grid(&[
            &["ID", "NAME", "POWER", "KILL POINTS", "10/01/24", "NAME", "POWER", "TOTAL SCORE"],
            &["11", "Alpha", "90", "1,000", "", "Alpha", "95", "5,000"],
            &["22", "Bravo", "80", "900", "", "Bravo", "85", "3,000"],
            &["33", "Charlie", "70", "800", "", "Charlie", "75", "5,000"],
        ])
    }

    #[test]
    fn empty_grid_answers_nothing() {
        let snap = KvkSnapshot::build(&Vec::new(), &FieldMap::kvk_v1());
        assert_eq!(snap.player("11"), None);
        assert_eq!(snap.player_identity("11"), None);
        assert!(snap.top(10).is_empty());
        assert_eq!(snap.registration_date(), None);
        assert_eq!(snap.total_players(), 0);
    }

    #[test]
    fn header_only_grid_answers_nothing() {
        let snap = KvkSnapshot::build(&grid(&[&["ID", "10/01/24", "TOTAL"]]), &FieldMap::kvk_v1());
        assert_eq!(snap.registration_date(), Some("10/01/24"));
        assert_eq!(snap.player("11"), None);
        assert!(snap.top(3).is_empty());
    }

    #[test]
    fn point_query_projects_latest_block_and_rank() {
        let snap = KvkSnapshot::build(&sample(), &FieldMap::kvk_v1());
        let stats = snap.player("33").expect("player 33");
        let labels: Vec<&str> = stats.fields().iter().map(|(l, _)| l.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "ID",
                "BASE NAME",
                "BASE POWER",
                "BASE KILL POINTS",
                "NAME",
                "POWER",
                "TOTAL SCORE",
                "KVK RANK",
            ]
        );
        assert_eq!(stats.get("BASE POWER"), Some("70"));
        assert_eq!(stats.get("POWER"), Some("75"));
        assert_eq!(stats.get("KVK RANK"), Some("2/3"));
        assert_eq!(stats.get("10/01/24"), None);
        assert_eq!(snap.registration_date(), Some("10/01/24"));
    }

    #[test]
    fn unknown_id_is_absent() {
        let snap = KvkSnapshot::build(&sample(), &FieldMap::kvk_v1());
        assert_eq!(snap.player("99"), None);
    }

    #[test]
    fn missing_date_column_hides_latest_fields_only() {
        let g = grid(&[
            &["ID", "NAME", "POWER", "KILL POINTS", "TOTAL SCORE"],
            &["11", "Alpha", "90", "1,000", "5,000"],
        ]);
        let snap = KvkSnapshot::build(&g, &FieldMap::kvk_v1());
        assert_eq!(snap.player("11"), None);
        let identity = snap.player_identity("11").expect("identity");
        assert_eq!(identity.get("BASE NAME"), Some("Alpha"));
        assert_eq!(identity.get("KVK RANK"), Some("1/1"));
        assert_eq!(identity.get("TOTAL SCORE"), None);
        assert_eq!(snap.top(5).len(), 1);
    }

    #[test]
    fn ragged_row_omits_missing_trailing_fields() {
        let g = grid(&[
            &["ID", "NAME", "POWER", "KILL POINTS", "10/01/24", "NAME", "POWER", "TOTAL SCORE"],
            &["11", "Alpha", "90", "1,000", "", "Alpha", "95", "5,000"],
            &["22", "Bravo", "80", "900", "", "Bravo"],
        ]);
        let snap = KvkSnapshot::build(&g, &FieldMap::kvk_v1());
        let stats = snap.player("22").expect("player 22");
        assert_eq!(stats.get("NAME"), Some("Bravo"));
        assert_eq!(stats.get("POWER"), None);
        assert_eq!(stats.get("TOTAL SCORE"), None);
        assert_eq!(stats.get("KVK RANK"), Some("2/2"));
    }

    #[test]
    fn top_returns_ranked_entries_without_padding() {
        let snap = KvkSnapshot::build(&sample(), &FieldMap::kvk_v1());
        let top = snap.top(10);
        let names: Vec<&str> = top.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Charlie", "Bravo"]);
        assert_eq!(top[2].score, Some(3000));
        assert_eq!(snap.top(2).len(), 2);
        assert!(snap.top(0).is_empty());
    }

    #[test]
    fn rebuilding_from_same_grid_is_deterministic() {
        let fields = FieldMap::kvk_v1();
        let first = KvkSnapshot::build(&sample(), &fields);
        let second = KvkSnapshot::build(&sample(), &fields);
        for id in ["11", "22", "33", "44"] {
            assert_eq!(first.player(id), second.player(id));
        }
        assert_eq!(first.top(10), second.top(10));
    }
}
