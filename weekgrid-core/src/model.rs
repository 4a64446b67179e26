//! Persisted records: tasks, time slots, weekly schedules, history, users.
//!
//! String-valued fields coming from generated payloads pass through the
//! `normalize` functions here, so nothing outside the closed enums reaches a
//! stored record.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar;
use crate::grid::{CellId, GridSpan};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == value.trim())
    }

    /// Unknown values fall back to `medium`.
    pub fn normalize(value: &str) -> Self {
        Self::parse(value).unwrap_or(Priority::Medium)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Work,
    Health,
    Personal,
    Learning,
    Family,
    Break,
    Education,
    College,
    Fitness,
    Social,
    Finance,
    Hobby,
    Travel,
    Shopping,
    Maintenance,
    #[default]
    General,
}

impl Category {
    pub const ALL: [Category; 16] = [
        Category::Work,
        Category::Health,
        Category::Personal,
        Category::Learning,
        Category::Family,
        Category::Break,
        Category::Education,
        Category::College,
        Category::Fitness,
        Category::Social,
        Category::Finance,
        Category::Hobby,
        Category::Travel,
        Category::Shopping,
        Category::Maintenance,
        Category::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Work => "Work",
            Category::Health => "Health",
            Category::Personal => "Personal",
            Category::Learning => "Learning",
            Category::Family => "Family",
            Category::Break => "Break",
            Category::Education => "Education",
            Category::College => "College",
            Category::Fitness => "Fitness",
            Category::Social => "Social",
            Category::Finance => "Finance",
            Category::Hobby => "Hobby",
            Category::Travel => "Travel",
            Category::Shopping => "Shopping",
            Category::Maintenance => "Maintenance",
            Category::General => "General",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == value.trim())
    }

    /// Unknown values fall back to `General`.
    pub fn normalize(value: &str) -> Self {
        Self::parse(value).unwrap_or(Category::General)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EisenhowerCategory {
    UrgentImportant,
    UrgentNotImportant,
    NotUrgentImportant,
    #[default]
    NotUrgentNotImportant,
}

impl EisenhowerCategory {
    pub const ALL: [EisenhowerCategory; 4] = [
        EisenhowerCategory::UrgentImportant,
        EisenhowerCategory::NotUrgentImportant,
        EisenhowerCategory::UrgentNotImportant,
        EisenhowerCategory::NotUrgentNotImportant,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EisenhowerCategory::UrgentImportant => "urgent-important",
            EisenhowerCategory::UrgentNotImportant => "urgent-not-important",
            EisenhowerCategory::NotUrgentImportant => "not-urgent-important",
            EisenhowerCategory::NotUrgentNotImportant => "not-urgent-not-important",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == value.trim())
    }

    /// Unknown values fall back to `not-urgent-not-important`.
    pub fn normalize(value: &str) -> Self {
        Self::parse(value).unwrap_or(EisenhowerCategory::NotUrgentNotImportant)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub category: Category,
    pub eisenhower_category: EisenhowerCategory,
    pub completed: bool,
    /// Hours.
    pub duration: f64,
    /// Wall-clock start of the grid cell this task was planned for.
    pub scheduled_at: Option<NaiveDateTime>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "task.id")?;
        validate_non_empty(&self.user_id, "task.user_id")?;
        validate_non_empty(&self.title, "task.title")?;
        validate_duration(self.duration)
    }

    /// Grid cell the task was planned for, if it was planned on the grid.
    pub fn placement(&self) -> Option<CellId> {
        let at = self.scheduled_at?;
        CellId::new(calendar::logical_day_of(at), at.hour())
    }
}

/// Field values for a task that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub category: Category,
    pub eisenhower_category: EisenhowerCategory,
    pub duration: f64,
    pub scheduled_at: Option<NaiveDateTime>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            priority: Priority::Medium,
            category: Category::General,
            eisenhower_category: EisenhowerCategory::NotUrgentNotImportant,
            duration: 1.0,
            scheduled_at: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    pub fn with_eisenhower(mut self, category: EisenhowerCategory) -> Self {
        self.eisenhower_category = category;
        self
    }

    pub fn with_duration(mut self, hours: f64) -> Self {
        self.duration = hours;
        self
    }

    pub fn scheduled_at(mut self, at: NaiveDateTime) -> Self {
        self.scheduled_at = Some(at);
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.title, "task.title")?;
        validate_duration(self.duration)
    }
}

/// One bookable hour range within a logical day.
///
/// `day` is the logical day's anchor date; `start`/`end` are wall-clock times in
/// the user's timezone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub id: String,
    pub user_id: String,
    pub day: NaiveDate,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    /// Weak reference; the slot never owns the task.
    pub task_id: Option<String>,
    pub merged: bool,
}

impl TimeSlot {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "slot.id")?;
        validate_non_empty(&self.user_id, "slot.user_id")?;
        if self.end <= self.start {
            return Err("slot.end must be after slot.start".to_string());
        }
        let span = GridSpan::of(self)
            .ok_or_else(|| "slot must start on a grid hour of its logical day".to_string())?;
        if !self.merged && span.len != 1 {
            return Err("unmerged slot must cover exactly one grid hour".to_string());
        }
        Ok(())
    }

    pub fn span(&self) -> Option<GridSpan> {
        GridSpan::of(self)
    }

    /// First cell covered by this slot.
    pub fn cell(&self) -> Option<CellId> {
        self.span().map(|s| s.first_cell())
    }

    pub fn hours(&self) -> i64 {
        (self.end - self.start).num_hours()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlotDraft {
    pub day: NaiveDate,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub task_id: Option<String>,
}

impl TimeSlotDraft {
    /// An unmerged one-hour slot for `hour` of the logical day anchored at `anchor`.
    pub fn for_cell(anchor: NaiveDate, hour: u32, task_id: Option<String>) -> Self {
        Self {
            day: anchor,
            start: calendar::cell_start(anchor, hour),
            end: calendar::cell_end(anchor, hour),
            task_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklySchedule {
    pub id: String,
    pub user_id: String,
    pub week_start: NaiveDate,
    pub goals: String,
    pub time_slot_ids: Vec<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleDraft {
    pub week_start: NaiveDate,
    pub goals: String,
    pub time_slot_ids: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryAction {
    Create,
    Update,
    Delete,
    Move,
    Complete,
    Merge,
    Categorize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityType {
    Task,
    TimeSlot,
    MatrixTask,
}

/// Append-only audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub user_id: String,
    pub schedule_id: Option<String>,
    pub action: HistoryAction,
    pub entity_type: EntityType,
    pub entity_id: String,
    pub from: Option<serde_json::Value>,
    pub to: Option<serde_json::Value>,
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryDraft {
    pub schedule_id: Option<String>,
    pub action: HistoryAction,
    pub entity_type: EntityType,
    pub entity_id: String,
    pub from: Option<serde_json::Value>,
    pub to: Option<serde_json::Value>,
    pub description: String,
}

impl HistoryDraft {
    pub fn new(
        action: HistoryAction,
        entity_type: EntityType,
        entity_id: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            schedule_id: None,
            action,
            entity_type,
            entity_id: entity_id.into(),
            from: None,
            to: None,
            description: description.into(),
        }
    }

    pub fn with_schedule(mut self, schedule_id: impl Into<String>) -> Self {
        self.schedule_id = Some(schedule_id.into());
        self
    }

    pub fn with_from(mut self, from: serde_json::Value) -> Self {
        self.from = Some(from);
        self
    }

    pub fn with_to(mut self, to: serde_json::Value) -> Self {
        self.to = Some(to);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

fn validate_non_empty(value: &str, field: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field} must not be empty"));
    }
    Ok(())
}

fn validate_duration(hours: f64) -> Result<(), String> {
    if !hours.is_finite() || hours <= 0.0 {
        return Err("task.duration must be a positive number of hours".to_string());
    }
    Ok(())
}
