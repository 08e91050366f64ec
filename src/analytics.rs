//! In-memory analytics sink.
//!
//! The coordination core treats this as an external collaborator: it appends
//! timestamped events and answers read-only stat queries, nothing more. The
//! log is transient and rebuilt from zero on every process restart.

use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use utoipa::ToSchema;

use crate::dto::unix_millis;

/// How many entries the recent-activity feed returns, newest first.
const RECENT_ACTIVITY_LIMIT: usize = 50;

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// One appended analytics entry.
pub struct AnalyticsEvent {
    /// Event name, e.g. `attempt`, `completion`, `hint`, `locked`.
    pub event: String,
    /// Session that produced the event.
    pub session_id: String,
    /// Display name at the time of the event, if known.
    pub player_name: Option<String>,
    /// Arbitrary event payload as reported by the client.
    #[schema(value_type = Object)]
    pub details: Value,
    /// Server-side receive time, unix milliseconds.
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// One completed run extracted from the log.
pub struct CompletionSample {
    /// Elapsed time reported by the client, milliseconds.
    pub time: i64,
    /// Difficulty the run was played on.
    pub difficulty: String,
    /// Hints consumed during the run.
    pub hints_used: i64,
    /// When the completion was recorded, unix milliseconds.
    pub timestamp: i64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Aggregated statistics over the analytics log.
pub struct AnalyticsStats {
    /// Total number of recorded events.
    pub total_events: usize,
    /// Events named `attempt`.
    pub total_attempts: usize,
    /// Events named `completion`.
    pub total_completions: usize,
    /// Events named `hint`.
    pub total_hints: usize,
    /// Events named `locked`.
    pub total_locked: usize,
    /// Every completion with its timing data.
    pub completion_times: Vec<CompletionSample>,
    /// Average completion time on easy, milliseconds (0 when none).
    pub avg_time_easy: i64,
    /// Average completion time on medium, milliseconds (0 when none).
    pub avg_time_medium: i64,
    /// Average completion time on hard, milliseconds (0 when none).
    pub avg_time_hard: i64,
    /// Best completion time on easy, if any run finished.
    pub best_time_easy: Option<i64>,
    /// Best completion time on medium, if any run finished.
    pub best_time_medium: Option<i64>,
    /// Best completion time on hard, if any run finished.
    pub best_time_hard: Option<i64>,
    /// Most recent events, newest first, capped at 50.
    pub recent_activity: Vec<AnalyticsEvent>,
}

/// Append-only ordered log of analytics events.
pub struct AnalyticsSink {
    events: RwLock<Vec<AnalyticsEvent>>,
}

impl AnalyticsSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self {
            events: RwLock::new(Vec::new()),
        }
    }

    /// Append one event, stamping it with the current time.
    pub async fn record(
        &self,
        event: impl Into<String>,
        session_id: impl Into<String>,
        player_name: Option<String>,
        details: Value,
    ) {
        let entry = AnalyticsEvent {
            event: event.into(),
            session_id: session_id.into(),
            player_name,
            details,
            timestamp: unix_millis(OffsetDateTime::now_utc()),
        };
        self.events.write().await.push(entry);
    }

    /// Snapshot the full log, oldest first.
    pub async fn dump(&self) -> Vec<AnalyticsEvent> {
        self.events.read().await.clone()
    }

    /// Discard every recorded event.
    pub async fn clear(&self) {
        self.events.write().await.clear();
    }

    /// Aggregate the log into the dashboard statistics.
    pub async fn stats(&self) -> AnalyticsStats {
        let events = self.events.read().await;

        let count_kind =
            |kind: &str| events.iter().filter(|entry| entry.event == kind).count();

        let completions = events
            .iter()
            .filter(|entry| entry.event == "completion")
            .filter_map(|entry| {
                Some(CompletionSample {
                    time: entry.details.get("time")?.as_i64()?,
                    difficulty: entry.details.get("difficulty")?.as_str()?.to_string(),
                    hints_used: entry
                        .details
                        .get("hintsUsed")
                        .and_then(Value::as_i64)
                        .unwrap_or(0),
                    timestamp: entry.timestamp,
                })
            })
            .collect::<Vec<_>>();

        let mut recent_activity = events
            .iter()
            .rev()
            .take(RECENT_ACTIVITY_LIMIT)
            .cloned()
            .collect::<Vec<_>>();
        recent_activity.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        AnalyticsStats {
            total_events: events.len(),
            total_attempts: count_kind("attempt"),
            total_completions: count_kind("completion"),
            total_hints: count_kind("hint"),
            total_locked: count_kind("locked"),
            avg_time_easy: avg_time(&completions, "easy"),
            avg_time_medium: avg_time(&completions, "medium"),
            avg_time_hard: avg_time(&completions, "hard"),
            best_time_easy: best_time(&completions, "easy"),
            best_time_medium: best_time(&completions, "medium"),
            best_time_hard: best_time(&completions, "hard"),
            completion_times: completions,
            recent_activity,
        }
    }
}

impl Default for AnalyticsSink {
    fn default() -> Self {
        Self::new()
    }
}

fn avg_time(completions: &[CompletionSample], difficulty: &str) -> i64 {
    let times = completions
        .iter()
        .filter(|sample| sample.difficulty == difficulty)
        .map(|sample| sample.time)
        .collect::<Vec<_>>();
    if times.is_empty() {
        return 0;
    }
    times.iter().sum::<i64>() / times.len() as i64
}

fn best_time(completions: &[CompletionSample], difficulty: &str) -> Option<i64> {
    completions
        .iter()
        .filter(|sample| sample.difficulty == difficulty)
        .map(|sample| sample.time)
        .min()
}
