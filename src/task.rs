//! Task model and the task-kind taxonomy.
//!
//! A task is a free-text description plus a priority, a kind tag decided
//! once at interpretation time, and any structured fields the interpreter
//! merged in (lead email, plan name, note text, ...). Agents dispatch on the
//! kind tag rather than re-scanning the text.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Task priority, clamped to 1..=3. Higher runs first within an agent's turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Priority(u8);

/// Clamp on the way in, so a hand-edited queue document cannot smuggle an
/// out-of-range priority past the invariant.
impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = i64::deserialize(deserializer)?;
        Ok(Priority::new(value))
    }
}

impl Priority {
    pub const LOW: Priority = Priority(1);
    pub const NORMAL: Priority = Priority(2);
    pub const HIGH: Priority = Priority(3);

    /// Clamp an arbitrary integer into the valid 1..=3 range.
    pub fn new(value: i64) -> Self {
        Priority(value.clamp(1, 3) as u8)
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::LOW
    }
}

/// Kind of work a task asks for.
///
/// Decided once by the interpreter (either supplied directly in its JSON
/// decision or classified from the text); agents `match` on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    AddLead,
    UpdateLead,
    LogNote,
    Pitch,
    FollowUp,
    Campaign,
    Outreach,
    Onboard,
    PlanChange,
    Renewal,
    CancelPlan,
    SupportTicket,
    RetainClient,
    Analyze,
    Report,
    DraftContent,
    LeadMagnet,
    Tutorial,
    DesignVisuals,
    BuildSite,
    PublishSite,
    ProcessInbox,
    AllocateBudget,
    Delegate,
    SchedulePost,
    AnalyzePricing,
    Forecast,
    SegmentClients,
    ScoutMarket,
    Other,
}

impl TaskKind {
    /// Deterministic keyword classification for free text.
    ///
    /// The single table below replaces what used to be per-agent substring
    /// checks; first match wins, so more specific phrases come first.
    pub fn classify(text: &str) -> TaskKind {
        let text = text.to_lowercase();
        const TABLE: &[(&str, TaskKind)] = &[
            ("add lead", TaskKind::AddLead),
            ("update lead", TaskKind::UpdateLead),
            ("log note", TaskKind::LogNote),
            ("lead magnet", TaskKind::LeadMagnet),
            ("warm lead", TaskKind::Outreach),
            ("outreach", TaskKind::Outreach),
            ("pitch", TaskKind::Pitch),
            ("close", TaskKind::Pitch),
            ("follow up", TaskKind::FollowUp),
            ("campaign", TaskKind::Campaign),
            ("onboard", TaskKind::Onboard),
            ("upgrade", TaskKind::PlanChange),
            ("downgrade", TaskKind::PlanChange),
            ("renew", TaskKind::Renewal),
            ("cancel", TaskKind::CancelPlan),
            ("subscription", TaskKind::Renewal),
            ("support", TaskKind::SupportTicket),
            ("ticket", TaskKind::SupportTicket),
            ("churn", TaskKind::RetainClient),
            ("retain", TaskKind::RetainClient),
            ("social", TaskKind::SchedulePost),
            ("post", TaskKind::SchedulePost),
            ("pricing", TaskKind::AnalyzePricing),
            ("forecast", TaskKind::Forecast),
            ("segment", TaskKind::SegmentClients),
            ("scout", TaskKind::ScoutMarket),
            ("research", TaskKind::ScoutMarket),
            ("analyze", TaskKind::Analyze),
            ("report", TaskKind::Report),
            ("generate content", TaskKind::DraftContent),
            ("write", TaskKind::DraftContent),
            ("tutorial", TaskKind::Tutorial),
            ("how to", TaskKind::Tutorial),
            ("visual", TaskKind::DesignVisuals),
            ("design", TaskKind::DesignVisuals),
            ("publish site", TaskKind::PublishSite),
            ("build site", TaskKind::BuildSite),
            ("website", TaskKind::BuildSite),
            ("inbox", TaskKind::ProcessInbox),
            ("email", TaskKind::ProcessInbox),
            ("budget", TaskKind::AllocateBudget),
            ("approve", TaskKind::AllocateBudget),
            ("delegate", TaskKind::Delegate),
            ("review", TaskKind::Delegate),
        ];
        for (needle, kind) in TABLE {
            if text.contains(needle) {
                return *kind;
            }
        }
        TaskKind::Other
    }
}

/// A unit of work addressed to an agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Free-text description
    #[serde(rename = "task")]
    pub text: String,

    #[serde(default)]
    pub priority: Priority,

    #[serde(default = "default_kind")]
    pub kind: TaskKind,

    /// Structured fields merged in by the interpreter or the enqueuing agent
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_kind() -> TaskKind {
    TaskKind::Other
}

impl Task {
    /// Build a task, classifying its kind from the text.
    pub fn new(text: impl Into<String>, priority: Priority) -> Self {
        let text = text.into();
        let kind = TaskKind::classify(&text);
        Self {
            text,
            priority,
            kind,
            extra: Map::new(),
        }
    }

    /// Build a task with an explicit kind.
    pub fn with_kind(text: impl Into<String>, priority: Priority, kind: TaskKind) -> Self {
        Self {
            text: text.into(),
            priority,
            kind,
            extra: Map::new(),
        }
    }

    /// Attach a structured field (builder style).
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Read a structured string field.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(Value::as_str)
    }

    /// Merge interpreter-decided values into this task.
    ///
    /// Text, priority, and kind are overwritten; extra fields are merged
    /// key-by-key with the decision winning on conflict.
    pub fn merge_decision(&mut self, text: String, priority: Priority, kind: TaskKind, extra: Map<String, Value>) {
        self.text = text;
        self.priority = priority;
        self.kind = kind;
        for (k, v) in extra {
            self.extra.insert(k, v);
        }
    }
}

/// Queue wire entry: the task plus the priority/timestamp recorded at
/// enqueue time. The duplicated priority mirrors the on-disk layout the
/// dashboards already read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedTask {
    pub task: Task,
    pub priority: Priority,
    pub timestamp: String,
}

impl QueuedTask {
    pub fn new(task: Task) -> Self {
        let priority = task.priority;
        Self {
            task,
            priority,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_maps_known_phrases() {
        assert_eq!(TaskKind::classify("Add lead from web form"), TaskKind::AddLead);
        assert_eq!(TaskKind::classify("Run lead gen CAMPAIGN"), TaskKind::Campaign);
        assert_eq!(TaskKind::classify("close active leads"), TaskKind::Pitch);
        assert_eq!(TaskKind::classify("investigate failures"), TaskKind::Other);
    }

    #[test]
    fn classify_prefers_more_specific_phrases() {
        // "add lead" must not be shadowed by the generic "lead magnet" entry
        assert_eq!(TaskKind::classify("create a lead magnet pdf"), TaskKind::LeadMagnet);
        assert_eq!(TaskKind::classify("pitch warm lead"), TaskKind::Outreach);
        // "pricing" and "forecast" win over the generic analyze/report entries
        assert_eq!(TaskKind::classify("analyze pricing tiers"), TaskKind::AnalyzePricing);
        assert_eq!(TaskKind::classify("forecast revenue report"), TaskKind::Forecast);
        assert_eq!(TaskKind::classify("schedule social posts"), TaskKind::SchedulePost);
        assert_eq!(TaskKind::classify("scout new market niches"), TaskKind::ScoutMarket);
        assert_eq!(TaskKind::classify("segment clients by revenue"), TaskKind::SegmentClients);
    }

    #[test]
    fn priority_clamps_out_of_range_values() {
        assert_eq!(Priority::new(0), Priority::LOW);
        assert_eq!(Priority::new(7), Priority::HIGH);
        assert_eq!(Priority::new(2), Priority::NORMAL);
    }

    #[test]
    fn priority_clamps_on_deserialize() {
        let low: Task = serde_json::from_str(r#"{"task": "x", "priority": 0}"#).unwrap();
        assert_eq!(low.priority, Priority::LOW);
        let high: Task = serde_json::from_str(r#"{"task": "x", "priority": 200}"#).unwrap();
        assert_eq!(high.priority, Priority::HIGH);
    }

    #[test]
    fn task_roundtrips_with_extra_fields() {
        let task = Task::new("add lead", Priority::NORMAL).with_field("email", "a@b.com");
        let json = serde_json::to_string(&task).unwrap();
        let back: Task = serde_json::from_str(&json).unwrap();
        assert_eq!(back.text, "add lead");
        assert_eq!(back.kind, TaskKind::AddLead);
        assert_eq!(back.field("email"), Some("a@b.com"));
    }

    #[test]
    fn merge_decision_overwrites_and_merges() {
        let mut task = Task::new("do something", Priority::LOW).with_field("email", "a@b.com");
        let mut extra = Map::new();
        extra.insert("plan".to_string(), Value::from("pro"));
        task.merge_decision("upgrade plan".to_string(), Priority::HIGH, TaskKind::PlanChange, extra);
        assert_eq!(task.text, "upgrade plan");
        assert_eq!(task.priority, Priority::HIGH);
        assert_eq!(task.field("email"), Some("a@b.com"));
        assert_eq!(task.field("plan"), Some("pro"));
    }
}
