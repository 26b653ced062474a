/// A spreadsheet export: row 0 is the header, rows may be ragged.
pub type Grid = Vec<Vec<String>>;

/// Matches snapshot labels shaped like `10/15/24`: three digit runs split by `/`.
pub fn is_snapshot_date(cell: &str) -> bool {
    let mut groups = 0;
    for part in cell.split('/') {
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
        groups += 1;
    }
    groups == 3
}

/// Index of the right-most snapshot-date column, if any.
pub fn detect_boundary(header: &[String]) -> Option<usize> {
    header.iter().rposition(|cell| is_snapshot_date(cell))
}

pub const KVK_RANK: &str = "KVK RANK";

/// Names the spreadsheet columns the bot depends on.
///
/// Headers double as lookup keys, so every name the bot reads lives here and
/// is checked against the fetched header once per snapshot instead of being
/// scattered through the command code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMap {
    pub version: u32,
    /// Labels given to the fixed identity prefix of every row.
    pub base_labels: Vec<String>,
    pub rank_label: String,
    /// Fields listed in the stat reply, in display order.
    pub display_keys: Vec<String>,
    pub goals: GoalFields,
}

/// Column names feeding the goal-progress calculation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoalFields {
    pub target_kills: String,
    pub target_deads: String,
    pub achieved_kills: String,
    pub achieved_deads: String,
    pub achieved_t4: Option<String>,
    pub achieved_t5: Option<String>,
    pub kill_override: Option<String>,
    pub dead_override: Option<String>,
}

impl GoalFields {
    pub fn names(&self) -> impl Iterator<Item = &str> {
        [
            Some(&self.target_kills),
            Some(&self.target_deads),
            Some(&self.achieved_kills),
            Some(&self.achieved_deads),
            self.achieved_t4.as_ref(),
            self.achieved_t5.as_ref(),
            self.kill_override.as_ref(),
            self.dead_override.as_ref(),
        ]
        .into_iter()
        .flatten()
        .map(String::as_str)
    }
}

impl FieldMap {
    pub fn kvk_v1() -> Self {
        Self {
            version: 1,
            base_labels: to_strings(&["ID", "BASE NAME", "BASE POWER", "BASE KILL POINTS"]),
            rank_label: KVK_RANK.to_string(),
            display_keys: to_strings(&[
                "ID",
                "NAME",
                "POWER",
                KVK_RANK,
                "KVK KILLS T4",
                "KVK KILLS T5",
                "KVK KILLS T4/T5",
                "KVK DEADS",
                "EXPECTED KILLS",
                "EXPECTED DEADS",
                "TOTAL SCORE",
            ]),
            goals: GoalFields {
                target_kills: "EXPECTED KILLS".to_string(),
                target_deads: "EXPECTED DEADS".to_string(),
                achieved_kills: "KVK KILLS T4/T5".to_string(),
                achieved_deads: "KVK DEADS".to_string(),
                achieved_t4: Some("KVK KILLS T4".to_string()),
                achieved_t5: Some("KVK KILLS T5".to_string()),
                kill_override: None,
                dead_override: None,
            },
        }
    }

    /// Labels a projected player record carries for a given header and boundary.
    pub fn projected_labels<'a>(
        &'a self,
        header: &'a [String],
        boundary: usize,
    ) -> impl Iterator<Item = &'a str> {
        self.base_labels
            .iter()
            .chain(header.iter().skip(boundary + 1))
            .map(String::as_str)
            .chain(std::iter::once(self.rank_label.as_str()))
    }

    /// Configured names (display and goal) that the projected labels lack.
    pub fn validate<'a, I>(&self, labels: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let present: std::collections::HashSet<&str> = labels.into_iter().collect();
        let mut missing: Vec<String> = Vec::new();
        for name in self
            .display_keys
            .iter()
            .map(String::as_str)
            .chain(self.goals.names())
        {
            if !present.contains(name) && !missing.iter().any(|m| m == name) {
                missing.push(name.to_string());
            }
        }
        missing
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
