use std::fmt::Write as _;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::chart::gauge_chart_url;
use crate::progress::GoalProgress;
use crate::preferences::PreferenceStore;
use crate::schema::FieldMap;
use crate::sheets::SheetSource;
use crate::snapshot::KvkSnapshot;

const TOP_CHUNK_SIZE: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `stat <id>`: look up and remember an id.
    Stat(u64),
    /// `stat`: look up the remembered id.
    StatRemembered,
    Top,
    InvalidId(String),
}

impl Command {
    /// Parses a chat message; anything that is not a bot command yields `None`.
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = text.split_whitespace();
        let name = parts.next()?.trim_start_matches('/').to_ascii_lowercase();
        let arg = parts.next();
        if parts.next().is_some() {
            return None;
        }
        match (name.as_str(), arg) {
            ("stat", None) => Some(Command::StatRemembered),
            ("stat", Some(raw)) => Some(match raw.parse::<u64>() {
                Ok(id) => Command::Stat(id),
                Err(_) => Command::InvalidId(raw.to_string()),
            }),
            ("top", None) => Some(Command::Top),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Embed {
    pub title: String,
    pub description: String,
    pub fields: Vec<(String, String)>,
    pub image_url: Option<String>,
    pub footer: Option<String>,
}

/// What the bot answers, free of any chat-platform types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Embeds(Vec<Embed>),
}

impl Reply {
    pub fn render(&self) -> String {
        match self {
            Reply::Text(text) => text.clone(),
            Reply::Embeds(embeds) => {
                let mut out = String::new();
                for embed in embeds {
                    let _ = writeln!(out, "== {} ==", embed.title.trim_end());
                    if !embed.description.is_empty() {
                        out.push_str(&embed.description);
                    }
                    for (name, value) in &embed.fields {
                        let _ = writeln!(out, "[{name}]");
                        out.push_str(value);
                        if !value.ends_with('\n') {
                            out.push('\n');
                        }
                    }
                    if let Some(url) = &embed.image_url {
                        let _ = writeln!(out, "chart: {url}");
                    }
                    if let Some(footer) = &embed.footer {
                        let _ = writeln!(out, "-- {footer}");
                    }
                }
                out
            }
        }
    }
}

/// Hands out snapshots, refetching once the current one is older than `ttl`.
///
/// A zero TTL fetches on every request. A refresh builds a complete new
/// snapshot before replacing the old one; callers holding the previous `Arc`
/// keep a consistent view.
pub struct SnapshotProvider<S> {
    source: S,
    range: String,
    fields: FieldMap,
    ttl: Duration,
    current: Option<(Instant, Arc<KvkSnapshot>)>,
}

impl<S: SheetSource> SnapshotProvider<S> {
    pub fn new(source: S, range: String, fields: FieldMap, ttl: Duration) -> Self {
        Self {
            source,
            range,
            fields,
            ttl,
            current: None,
        }
    }

    pub fn snapshot(&mut self) -> Arc<KvkSnapshot> {
        if let Some((built_at, snap)) = &self.current
            && built_at.elapsed() < self.ttl
        {
            return Arc::clone(snap);
        }
        let grid = self.source.fetch(&self.range);
        let snap = Arc::new(KvkSnapshot::build(&grid, &self.fields));
        self.current = Some((Instant::now(), Arc::clone(&snap)));
        snap
    }
}

pub struct Bot<S, P> {
    snapshots: SnapshotProvider<S>,
    preferences: P,
    top_limit: usize,
}

impl<S: SheetSource, P: PreferenceStore> Bot<S, P> {
    pub fn new(snapshots: SnapshotProvider<S>, preferences: P, top_limit: usize) -> Self {
        Self {
            snapshots,
            preferences,
            top_limit,
        }
    }

    /// Answers one chat message from `author`, or `None` if it is not for the bot.
    pub fn handle(&mut self, author: &str, text: &str) -> Option<Reply> {
        let command = Command::parse(text)?;
        tracing::debug!(author, ?command, "handling command");
        let reply = match command {
            Command::InvalidId(raw) => {
                tracing::debug!(author, value = %raw, "rejecting governor id");
                Reply::Text("Governor ID is not valid.".to_string())
            }
            Command::Stat(id) => {
                self.remember(author, id);
                self.stat(id)
            }
            Command::StatRemembered => match self.remembered(author) {
                Some(id) => self.stat(id),
                None => Reply::Text(
                    "Governor ID not found in memory. Please try with the full command: \
                     `stat 1234` (where 1234 is your Governor ID)"
                        .to_string(),
                ),
            },
            Command::Top => self.top(),
        };
        Some(reply)
    }

    fn remember(&self, author: &str, id: u64) {
        if let Err(err) = self.preferences.set(author, id) {
            tracing::error!(error = %err, author, "failed to remember governor id");
        }
    }

    fn remembered(&self, author: &str) -> Option<u64> {
        self.preferences.get(author).unwrap_or_else(|err| {
            tracing::error!(error = %err, author, "failed to read remembered governor id");
            None
        })
    }

    pub fn stat(&mut self, id: u64) -> Reply {
        let snap = self.snapshots.snapshot();
        let key = id.to_string();
        // Without a date column only the identity prefix and rank are known.
        let Some(stats) = snap.player(&key).or_else(|| snap.player_identity(&key)) else {
            return Reply::Text(format!("Governor {id} not found in database."));
        };
        let fields = snap.field_map();

        let mut description = String::new();
        for key in &fields.display_keys {
            let value = stats.get(key).filter(|v| !v.is_empty()).unwrap_or("---");
            let _ = writeln!(description, "**{}**: {}", title_case(key), value);
        }

        let mut embed = Embed {
            title: format!(
                "Registration date: {} (Month/Date/Year)\n",
                snap.registration_date().unwrap_or("---")
            ),
            description,
            footer: Some(format!(
                "Fetched {}",
                snap.fetched_at().format("%Y-%m-%d %H:%M UTC")
            )),
            ..Default::default()
        };

        if let Some(progress) = GoalProgress::compute(&stats, &fields.goals)
            && let Some(overall) = progress.overall
        {
            embed
                .fields
                .push(("Kill/Dead Goal Progression".to_string(), format!("{overall}%")));
            embed
                .fields
                .push(("Goal Breakdown".to_string(), goal_breakdown(&progress)));
            embed.image_url = gauge_chart_url(&progress).map(String::from);
        }

        Reply::Embeds(vec![embed])
    }

    pub fn top(&mut self) -> Reply {
        let snap = self.snapshots.snapshot();
        let ranking = snap.top(self.top_limit);
        if ranking.is_empty() {
            return Reply::Text("No ranking data available.".to_string());
        }

        let embeds = ranking
            .chunks(TOP_CHUNK_SIZE)
            .enumerate()
            .map(|(idx, chunk)| {
                let start = idx * TOP_CHUNK_SIZE + 1;
                let end = idx * TOP_CHUNK_SIZE + chunk.len();
                let mut content = String::new();
                for (offset, entry) in chunk.iter().enumerate() {
                    let score = entry
                        .score
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| "---".to_string());
                    let _ = writeln!(
                        content,
                        "#{:02} | {} | {} pts",
                        start + offset,
                        entry.name,
                        score
                    );
                }
                Embed {
                    title: "KVK - TOP by TOTAL SCORE".to_string(),
                    fields: vec![(format!("{start} -> {end}"), content)],
                    footer: Some(format!("{} governors ranked", snap.total_players())),
                    ..Default::default()
                }
            })
            .collect();
        Reply::Embeds(embeds)
    }
}

fn goal_breakdown(progress: &GoalProgress) -> String {
    let mut out = String::new();
    let tiers = [
        ("T4 kills", progress.t4),
        ("T5 kills", progress.t5),
        ("Deads", progress.deads),
    ];
    for (label, pct) in tiers {
        if let Some(pct) = pct {
            let _ = writeln!(out, "{label}: {pct}%");
        }
    }
    let met = |ok: bool| if ok { "met" } else { "not met" };
    let _ = writeln!(out, "Kill goal: {}", met(progress.kills_met));
    let _ = writeln!(out, "Dead goal: {}", met(progress.deads_met));
    out
}

/// `KVK KILLS T4/T5` -> `Kvk Kills T4/T5`.
fn title_case(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    let mut at_word_start = true;
    for ch in label.chars() {
        if ch.is_alphabetic() {
            if at_word_start {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(ch);
            at_word_start = true;
        }
    }
    out
}
