//! Counter and goal model shared by the daemon, the watcher, and the popup
//! client. Wire field names follow the persisted JSON record (`dailyKey`,
//! `weeklyMin`), so a snapshot exported by the daemon is importable as-is.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Counting period a bump applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Daily,
    Weekly,
}

/// The closed set of tracked metrics. Bump requests carry free-form metric
/// names; anything that does not parse to one of these is a no-op by policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Tweets,
    Replies,
    Likes,
    Quotes,
    Media,
    Threads,
}

impl Metric {
    pub const ALL: [Metric; 6] = [
        Metric::Tweets,
        Metric::Replies,
        Metric::Likes,
        Metric::Quotes,
        Metric::Media,
        Metric::Threads,
    ];

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "tweets" => Some(Metric::Tweets),
            "replies" => Some(Metric::Replies),
            "likes" => Some(Metric::Likes),
            "quotes" => Some(Metric::Quotes),
            "media" => Some(Metric::Media),
            "threads" => Some(Metric::Threads),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Metric::Tweets => "tweets",
            Metric::Replies => "replies",
            Metric::Likes => "likes",
            Metric::Quotes => "quotes",
            Metric::Media => "media",
            Metric::Threads => "threads",
        }
    }
}

/// Adds a signed delta to a counter, clamping at zero. Amounts are bounded
/// at the protocol layer, so the i64 arithmetic here cannot overflow.
pub fn clamped_add(current: u32, amount: i64) -> u32 {
    (i64::from(current) + amount).clamp(0, i64::from(u32::MAX)) as u32
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DailyCounts {
    pub tweets: u32,
    pub replies: u32,
    pub likes: u32,
    pub quotes: u32,
    pub media: u32,
}

impl DailyCounts {
    pub fn get(&self, metric: Metric) -> Option<u32> {
        match metric {
            Metric::Tweets => Some(self.tweets),
            Metric::Replies => Some(self.replies),
            Metric::Likes => Some(self.likes),
            Metric::Quotes => Some(self.quotes),
            Metric::Media => Some(self.media),
            Metric::Threads => None,
        }
    }

    /// Applies a clamped delta; returns false when the metric has no daily
    /// counter (threads are weekly-only).
    pub fn apply(&mut self, metric: Metric, amount: i64) -> bool {
        let slot = match metric {
            Metric::Tweets => &mut self.tweets,
            Metric::Replies => &mut self.replies,
            Metric::Likes => &mut self.likes,
            Metric::Quotes => &mut self.quotes,
            Metric::Media => &mut self.media,
            Metric::Threads => return false,
        };
        *slot = clamped_add(*slot, amount);
        true
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeeklyCounts {
    pub media: u32,
    pub threads: u32,
}

impl WeeklyCounts {
    pub fn get(&self, metric: Metric) -> Option<u32> {
        match metric {
            Metric::Media => Some(self.media),
            Metric::Threads => Some(self.threads),
            _ => None,
        }
    }

    pub fn apply(&mut self, metric: Metric, amount: i64) -> bool {
        let slot = match metric {
            Metric::Media => &mut self.media,
            Metric::Threads => &mut self.threads,
            _ => return false,
        };
        *slot = clamped_add(*slot, amount);
        true
    }
}

/// Counter state for the current day and ISO week. The period tags record
/// which day/week the counts belong to; turnover compares them against the
/// present and zeroes any scope whose tag no longer matches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TrackerState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_key: Option<String>,
    pub daily: DailyCounts,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weekly_key: Option<String>,
    pub weekly: WeeklyCounts,
}

impl TrackerState {
    /// Returns true when the metric exists in the requested scope and the
    /// delta was applied.
    pub fn bump(&mut self, metric: Metric, amount: i64, scope: Scope) -> bool {
        match scope {
            Scope::Daily => self.daily.apply(metric, amount),
            Scope::Weekly => self.weekly.apply(metric, amount),
        }
    }
}

/// Goal fields for one metric. Which fields are meaningful depends on the
/// metric: the five daily metrics use `daily`, media adds a weekly floor,
/// threads carry a weekly floor and ceiling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GoalSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weekly_min: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weekly_max: Option<u32>,
}

impl GoalSpec {
    pub const fn daily_only(daily: u32) -> Self {
        Self {
            daily: Some(daily),
            weekly_min: None,
            weekly_max: None,
        }
    }

    /// Fields present in `patch` replace the corresponding base fields.
    pub fn overlay(base: Self, patch: Self) -> Self {
        Self {
            daily: patch.daily.or(base.daily),
            weekly_min: patch.weekly_min.or(base.weekly_min),
            weekly_max: patch.weekly_max.or(base.weekly_max),
        }
    }
}

/// Submitted goal updates, keyed by metric name. Unknown keys survive
/// deserialization and are filtered during the merge.
pub type GoalsPatch = BTreeMap<String, GoalSpec>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Goals {
    pub tweets: GoalSpec,
    pub replies: GoalSpec,
    pub likes: GoalSpec,
    pub quotes: GoalSpec,
    pub media: GoalSpec,
    pub threads: GoalSpec,
}

impl Default for Goals {
    fn default() -> Self {
        Self {
            tweets: GoalSpec::daily_only(5),
            replies: GoalSpec::daily_only(30),
            likes: GoalSpec::daily_only(100),
            quotes: GoalSpec::daily_only(3),
            media: GoalSpec {
                daily: Some(1),
                weekly_min: Some(3),
                weekly_max: None,
            },
            threads: GoalSpec {
                daily: None,
                weekly_min: Some(1),
                weekly_max: Some(3),
            },
        }
    }
}

impl Goals {
    pub fn get(&self, metric: Metric) -> &GoalSpec {
        match metric {
            Metric::Tweets => &self.tweets,
            Metric::Replies => &self.replies,
            Metric::Likes => &self.likes,
            Metric::Quotes => &self.quotes,
            Metric::Media => &self.media,
            Metric::Threads => &self.threads,
        }
    }

    fn slot(&mut self, metric: Metric) -> &mut GoalSpec {
        match metric {
            Metric::Tweets => &mut self.tweets,
            Metric::Replies => &mut self.replies,
            Metric::Likes => &mut self.likes,
            Metric::Quotes => &mut self.quotes,
            Metric::Media => &mut self.media,
            Metric::Threads => &mut self.threads,
        }
    }

    /// Schema-filtered merge: for each submitted known metric, the submitted
    /// fields land on top of the default spec for that metric (not the
    /// current one), so omitted fields revert to defaults. Unknown metric
    /// names are dropped. Metrics not submitted keep their current spec.
    pub fn merge_patch(&mut self, patch: &GoalsPatch) {
        let defaults = Goals::default();
        for (name, submitted) in patch {
            if let Some(metric) = Metric::parse(name) {
                *self.slot(metric) = GoalSpec::overlay(*defaults.get(metric), *submitted);
            }
        }
    }

    /// The full goal table as a patch, for clients that submit a wholesale
    /// replacement (such as a reset-to-defaults control).
    pub fn as_patch(&self) -> GoalsPatch {
        Metric::ALL
            .iter()
            .map(|metric| (metric.as_str().to_string(), *self.get(*metric)))
            .collect()
    }
}

/// The exportable pair: counter state plus goals. Both fields are required
/// on deserialization, which is what makes import shape-checking strict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub state: TrackerState,
    pub goals: Goals,
}

impl Snapshot {
    pub fn with_defaults() -> Self {
        Self {
            state: TrackerState::default(),
            goals: Goals::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_goal_table() {
        let goals = Goals::default();
        assert_eq!(goals.tweets.daily, Some(5));
        assert_eq!(goals.replies.daily, Some(30));
        assert_eq!(goals.likes.daily, Some(100));
        assert_eq!(goals.quotes.daily, Some(3));
        assert_eq!(goals.media.daily, Some(1));
        assert_eq!(goals.media.weekly_min, Some(3));
        assert_eq!(goals.threads.weekly_min, Some(1));
        assert_eq!(goals.threads.weekly_max, Some(3));
        assert_eq!(goals.threads.daily, None);
    }

    #[test]
    fn clamps_below_zero() {
        assert_eq!(clamped_add(0, -5), 0);
        assert_eq!(clamped_add(3, -5), 0);
        assert_eq!(clamped_add(3, -2), 1);
        assert_eq!(clamped_add(3, 4), 7);
    }

    #[test]
    fn bump_ignores_metric_missing_from_scope() {
        let mut state = TrackerState::default();
        assert!(!state.bump(Metric::Threads, 1, Scope::Daily));
        assert!(!state.bump(Metric::Tweets, 1, Scope::Weekly));
        assert_eq!(state, TrackerState::default());

        assert!(state.bump(Metric::Threads, 1, Scope::Weekly));
        assert_eq!(state.weekly.threads, 1);
    }

    #[test]
    fn media_counts_in_both_scopes() {
        let mut state = TrackerState::default();
        assert!(state.bump(Metric::Media, 1, Scope::Daily));
        assert!(state.bump(Metric::Media, 1, Scope::Weekly));
        assert_eq!(state.daily.media, 1);
        assert_eq!(state.weekly.media, 1);
    }

    #[test]
    fn merge_updates_only_submitted_metrics() {
        let mut goals = Goals::default();
        let patch: GoalsPatch = serde_json::from_value(json!({"tweets": {"daily": 10}})).unwrap();
        goals.merge_patch(&patch);
        assert_eq!(goals.tweets, GoalSpec::daily_only(10));
        assert_eq!(goals.replies, GoalSpec::daily_only(30));
        assert_eq!(goals.likes, GoalSpec::daily_only(100));
    }

    #[test]
    fn merge_fills_omitted_fields_from_defaults() {
        let mut goals = Goals::default();
        let patch: GoalsPatch = serde_json::from_value(json!({"media": {"daily": 2}})).unwrap();
        goals.merge_patch(&patch);
        assert_eq!(goals.media.daily, Some(2));
        assert_eq!(goals.media.weekly_min, Some(3));
    }

    #[test]
    fn merge_reverts_stale_fields_to_defaults() {
        let mut goals = Goals::default();
        goals.tweets = GoalSpec::daily_only(42);
        let patch: GoalsPatch = serde_json::from_value(json!({"tweets": {}})).unwrap();
        goals.merge_patch(&patch);
        assert_eq!(goals.tweets, GoalSpec::daily_only(5));
    }

    #[test]
    fn merge_drops_unknown_metric_names() {
        let mut goals = Goals::default();
        let patch: GoalsPatch =
            serde_json::from_value(json!({"bookmarks": {"daily": 9}})).unwrap();
        goals.merge_patch(&patch);
        assert_eq!(goals, Goals::default());
    }

    #[test]
    fn state_serializes_with_camel_case_tags() {
        let state = TrackerState {
            daily_key: Some("2026-08-25".to_string()),
            weekly_key: Some("2026-W35".to_string()),
            ..TrackerState::default()
        };
        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["dailyKey"], "2026-08-25");
        assert_eq!(value["weeklyKey"], "2026-W35");
        assert!(value.get("daily_key").is_none());
    }

    #[test]
    fn goal_spec_uses_camel_case_fields() {
        let value = serde_json::to_value(Goals::default()).unwrap();
        assert_eq!(value["media"]["weeklyMin"], 3);
        assert_eq!(value["threads"]["weeklyMax"], 3);
        assert!(value["tweets"].get("weeklyMin").is_none());
    }

    #[test]
    fn missing_goal_metrics_deserialize_to_defaults() {
        let goals: Goals = serde_json::from_value(json!({"tweets": {"daily": 1}})).unwrap();
        assert_eq!(goals.tweets.daily, Some(1));
        assert_eq!(goals.likes, GoalSpec::daily_only(100));
    }

    #[test]
    fn snapshot_requires_both_halves() {
        let missing_goals = serde_json::from_value::<Snapshot>(json!({"state": {}}));
        assert!(missing_goals.is_err());
        let full = serde_json::from_value::<Snapshot>(json!({"state": {}, "goals": {}})).unwrap();
        assert_eq!(full.goals, Goals::default());
    }
}
