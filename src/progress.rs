use thiserror::Error;

use crate::ranking::parse_count;
use crate::schema::GoalFields;
use crate::snapshot::PlayerStats;

/// Upper bound the progress gauge can display.
pub const GAUGE_MAX: i64 = 200;

/// How far a player is towards their kill and dead goals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GoalProgress {
    /// Combined kills and deads against the combined target, in percent.
    pub overall: Option<i64>,
    pub kills_met: bool,
    pub deads_met: bool,
    pub t4: Option<i64>,
    pub t5: Option<i64>,
    pub deads: Option<i64>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProgressSkip {
    #[error("field {0} missing from player record")]
    MissingField(String),
    #[error("field {field} is not a number: {value:?}")]
    Malformed { field: String, value: String },
    #[error("sum involving {field} does not fit in a 64-bit count")]
    Overflow { field: String },
}

impl GoalProgress {
    /// Computes goal progress, or `None` when the record cannot support it.
    ///
    /// Any configured field missing from the record, or any value that does
    /// not parse, drops the whole computation. The rest of the stat reply is
    /// unaffected.
    pub fn compute(stats: &PlayerStats, goals: &GoalFields) -> Option<Self> {
        match Self::try_compute(stats, goals) {
            Ok(progress) => Some(progress),
            Err(ProgressSkip::MissingField(field)) => {
                tracing::debug!(field = %field, "goal fields not configured in sheet");
                None
            }
            Err(err) => {
                tracing::warn!(error = %err, "skipping goal progress");
                None
            }
        }
    }

    pub fn try_compute(stats: &PlayerStats, goals: &GoalFields) -> Result<Self, ProgressSkip> {
        if let Some(missing) = goals.names().find(|name| !stats.contains(name)) {
            return Err(ProgressSkip::MissingField(missing.to_string()));
        }

        let target_kills = read_count(stats, &goals.target_kills)?;
        let target_deads = read_count(stats, &goals.target_deads)?;
        let kills = read_count(stats, &goals.achieved_kills)?;
        let deads = read_count(stats, &goals.achieved_deads)?;
        let t4 = goals
            .achieved_t4
            .as_deref()
            .map(|f| read_count(stats, f))
            .transpose()?;
        let t5 = goals
            .achieved_t5
            .as_deref()
            .map(|f| read_count(stats, f))
            .transpose()?;
        let kill_override = read_override(stats, goals.kill_override.as_deref())?;
        let dead_override = read_override(stats, goals.dead_override.as_deref())?;

        let kill_target = effective_target(target_kills, kill_override);
        let dead_target = effective_target(target_deads, dead_override);

        let reached = checked_sum(kills, deads, &goals.achieved_deads)?;
        let target = checked_sum(target_kills, target_deads, &goals.target_deads)?;

        Ok(Self {
            overall: percent(reached, target),
            kills_met: kills >= kill_target,
            deads_met: deads >= dead_target,
            t4: t4.and_then(|v| percent(v, target_kills)),
            t5: t5.and_then(|v| percent(v, target_kills)),
            deads: percent(deads, target_deads),
        })
    }

    /// Overall percentage clamped to the gauge range.
    pub fn gauge_value(&self) -> Option<i64> {
        self.overall.map(|p| p.clamp(0, GAUGE_MAX))
    }
}

fn read_count(stats: &PlayerStats, field: &str) -> Result<i64, ProgressSkip> {
    let value = stats
        .get(field)
        .ok_or_else(|| ProgressSkip::MissingField(field.to_string()))?;
    parse_count(value).ok_or_else(|| ProgressSkip::Malformed {
        field: field.to_string(),
        value: value.to_string(),
    })
}

fn read_override(stats: &PlayerStats, field: Option<&str>) -> Result<Option<i64>, ProgressSkip> {
    match field {
        Some(f) if stats.get(f).is_some_and(|v| !v.trim().is_empty()) => {
            read_count(stats, f).map(Some)
        }
        _ => Ok(None),
    }
}

fn checked_sum(a: i64, b: i64, field: &str) -> Result<i64, ProgressSkip> {
    a.checked_add(b).ok_or_else(|| ProgressSkip::Overflow {
        field: field.to_string(),
    })
}

fn effective_target(target: i64, player_override: Option<i64>) -> i64 {
    match player_override {
        Some(v) if v > 0 => v,
        _ => target,
    }
}

/// `round(100 * reached / target)`, half away from zero; `None` for a zero target.
fn percent(reached: i64, target: i64) -> Option<i64> {
    if target == 0 {
        return None;
    }
    Some((reached as f64 * 100.0 / target as f64).round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldMap;

    fn stats(pairs: &[(&str, &str)]) -> PlayerStats {
        let mut s = PlayerStats::default();
        for (label, value) in pairs {
            s.insert(label, value);
        }
        s
    }

    fn base_goals() -> GoalFields {
        GoalFields {
            target_kills: "EXPECTED KILLS".to_string(),
            target_deads: "EXPECTED DEADS".to_string(),
            achieved_kills: "KVK KILLS T4/T5".to_string(),
            achieved_deads: "KVK DEADS".to_string(),
            achieved_t4: None,
            achieved_t5: None,
            kill_override: None,
            dead_override: None,
        }
    }

    fn record(tk: &str, td: &str, k: &str, d: &str) -> PlayerStats {
        stats(&[
            ("EXPECTED KILLS", tk),
            ("EXPECTED DEADS", td),
            ("KVK KILLS T4/T5", k),
            ("KVK DEADS", d),
        ])
    }

    #[test]
    fn combined_percentage_and_met_flags() {
        let progress = GoalProgress::compute(&record("100", "50", "80", "50"), &base_goals())
            .expect("progress");
        assert_eq!(progress.overall, Some(87));
        assert!(!progress.kills_met);
        assert!(progress.deads_met);
        assert_eq!(progress.deads, Some(100));
    }

    #[test]
    fn zero_targets_omit_percentage() {
        let progress =
            GoalProgress::compute(&record("0", "0", "10", "5"), &base_goals()).expect("progress");
        assert_eq!(progress.overall, None);
        assert_eq!(progress.deads, None);
        assert_eq!(progress.gauge_value(), None);
        assert!(progress.kills_met);
    }

    #[test]
    fn missing_field_skips_everything() {
        let partial = stats(&[("EXPECTED KILLS", "100"), ("KVK DEADS", "5")]);
        assert_eq!(GoalProgress::compute(&partial, &base_goals()), None);
        assert_eq!(
            GoalProgress::try_compute(&partial, &base_goals()),
            Err(ProgressSkip::MissingField("EXPECTED DEADS".to_string()))
        );
    }

    #[test]
    fn malformed_value_skips_progress() {
        let bad = record("1,000", "n/a", "10", "5");
        assert_eq!(GoalProgress::compute(&bad, &base_goals()), None);
        assert_eq!(
            GoalProgress::try_compute(&bad, &base_goals()),
            Err(ProgressSkip::Malformed {
                field: "EXPECTED DEADS".to_string(),
                value: "n/a".to_string(),
            })
        );
    }

    #[test]
    fn override_target_decides_met_flag() {
        let mut goals = base_goals();
        goals.kill_override = Some("KILL TARGET".to_string());
        let mut s = record("100", "50", "80", "10");
        s.insert("KILL TARGET", "75");
        let progress = GoalProgress::compute(&s, &goals).expect("progress");
        assert!(progress.kills_met);
        assert_eq!(progress.overall, Some(60));

        s.insert("KILL TARGET", "0");
        assert!(!GoalProgress::compute(&s, &goals).expect("progress").kills_met);

        s.insert("KILL TARGET", "");
        assert!(!GoalProgress::compute(&s, &goals).expect("progress").kills_met);
    }

    #[test]
    fn tier_percentages_follow_kill_target() {
        let goals = FieldMap::kvk_v1().goals;
        let mut s = record("2,000", "1,000", "1,500", "250");
        s.insert("KVK KILLS T4", "500");
        s.insert("KVK KILLS T5", "1,000");
        let progress = GoalProgress::compute(&s, &goals).expect("progress");
        assert_eq!(progress.t4, Some(25));
        assert_eq!(progress.t5, Some(50));
        assert_eq!(progress.deads, Some(25));
        assert_eq!(progress.overall, Some(58));
    }

    #[test]
    fn sums_past_i64_range_skip_progress() {
        let huge = "9,223,372,036,854,775,807";
        let s = record(huge, "1", huge, "1");
        assert_eq!(GoalProgress::compute(&s, &base_goals()), None);
        assert_eq!(
            GoalProgress::try_compute(&s, &base_goals()),
            Err(ProgressSkip::Overflow {
                field: "KVK DEADS".to_string(),
            })
        );
    }

    #[test]
    fn large_counts_within_range_still_compute() {
        let s = record("4,000,000,000,000,000,000", "1", "2,000,000,000,000,000,000", "1");
        let progress = GoalProgress::compute(&s, &base_goals()).expect("progress");
        assert_eq!(progress.overall, Some(50));
    }

    #[test]
    fn gauge_value_is_clamped() {
        let progress = GoalProgress::compute(&record("10", "10", "100", "100"), &base_goals())
            .expect("progress");
        assert_eq!(progress.overall, Some(1000));
        assert_eq!(progress.gauge_value(), Some(GAUGE_MAX));
    }
}
