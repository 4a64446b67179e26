//! Persistence gateway.
//!
//! `Store` is the seam to whatever holds the records. Every call is one bounded
//! read or write; nothing here spans multiple records transactionally.
//! `MemoryStore` is the in-process implementation, serialisable so a caller can
//! keep it on disk between runs.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::model::{
    HistoryDraft, HistoryEntry, ScheduleDraft, Task, TaskDraft, TimeSlot, TimeSlotDraft, User,
    WeeklySchedule,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
    #[error("invalid {kind}: {reason}")]
    Validation { kind: &'static str, reason: String },
    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound { kind, id: id.into() }
    }

    pub fn validation(kind: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation { kind, reason: reason.into() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub user_id: Option<String>,
    /// Inclusive lower bound on `scheduled_at`.
    pub scheduled_from: Option<NaiveDateTime>,
    /// Exclusive upper bound on `scheduled_at`.
    pub scheduled_until: Option<NaiveDateTime>,
}

impl TaskFilter {
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self { user_id: Some(user_id.into()), ..Self::default() }
    }

    pub fn scheduled_between(mut self, from: NaiveDateTime, until: NaiveDateTime) -> Self {
        self.scheduled_from = Some(from);
        self.scheduled_until = Some(until);
        self
    }

    pub fn matches(&self, task: &Task) -> bool {
        if self.user_id.as_deref().is_some_and(|u| u != task.user_id) {
            return false;
        }
        if self.scheduled_from.is_none() && self.scheduled_until.is_none() {
            return true;
        }
        let Some(at) = task.scheduled_at else { return false };
        self.scheduled_from.is_none_or(|from| at >= from)
            && self.scheduled_until.is_none_or(|until| at < until)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotFilter {
    pub user_id: Option<String>,
    /// Inclusive lower bound on the logical day.
    pub from: Option<NaiveDate>,
    /// Exclusive upper bound on the logical day.
    pub until: Option<NaiveDate>,
}

impl SlotFilter {
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self { user_id: Some(user_id.into()), ..Self::default() }
    }

    pub fn days(mut self, from: NaiveDate, until: NaiveDate) -> Self {
        self.from = Some(from);
        self.until = Some(until);
        self
    }

    pub fn matches(&self, slot: &TimeSlot) -> bool {
        self.user_id.as_deref().is_none_or(|u| u == slot.user_id)
            && self.from.is_none_or(|from| slot.day >= from)
            && self.until.is_none_or(|until| slot.day < until)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleFilter {
    pub user_id: Option<String>,
    pub week_start: Option<NaiveDate>,
}

impl ScheduleFilter {
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self { user_id: Some(user_id.into()), ..Self::default() }
    }

    pub fn week(mut self, week_start: NaiveDate) -> Self {
        self.week_start = Some(week_start);
        self
    }

    pub fn matches(&self, schedule: &WeeklySchedule) -> bool {
        self.user_id.as_deref().is_none_or(|u| u == schedule.user_id)
            && self.week_start.is_none_or(|w| w == schedule.week_start)
    }
}

/// Create / read / update / delete for the five record families.
pub trait Store {
    fn create_user(&mut self, email: &str, name: &str) -> StoreResult<User>;
    fn get_user(&self, id: &str) -> StoreResult<User>;
    fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    fn create_task(&mut self, user_id: &str, draft: TaskDraft) -> StoreResult<Task>;
    fn get_task(&self, id: &str) -> StoreResult<Task>;
    fn list_tasks(&self, filter: &TaskFilter) -> StoreResult<Vec<Task>>;
    fn update_task(&mut self, task: &Task) -> StoreResult<Task>;
    /// Also clears the reference from every slot pointing at the task.
    fn delete_task(&mut self, id: &str) -> StoreResult<Task>;

    fn create_time_slot(&mut self, user_id: &str, draft: TimeSlotDraft) -> StoreResult<TimeSlot>;
    fn get_time_slot(&self, id: &str) -> StoreResult<TimeSlot>;
    /// Ordered by logical day, then start time.
    fn list_time_slots(&self, filter: &SlotFilter) -> StoreResult<Vec<TimeSlot>>;
    fn update_time_slot(&mut self, slot: &TimeSlot) -> StoreResult<TimeSlot>;
    fn delete_time_slot(&mut self, id: &str) -> StoreResult<TimeSlot>;

    fn create_schedule(&mut self, user_id: &str, draft: ScheduleDraft) -> StoreResult<WeeklySchedule>;
    fn get_schedule(&self, id: &str) -> StoreResult<WeeklySchedule>;
    /// Newest week first.
    fn list_schedules(&self, filter: &ScheduleFilter) -> StoreResult<Vec<WeeklySchedule>>;
    fn update_schedule(&mut self, schedule: &WeeklySchedule) -> StoreResult<WeeklySchedule>;
    fn delete_schedule(&mut self, id: &str) -> StoreResult<WeeklySchedule>;

    fn append_history(&mut self, user_id: &str, draft: HistoryDraft) -> StoreResult<HistoryEntry>;
    /// Oldest first.
    fn list_history(&self, user_id: &str) -> StoreResult<Vec<HistoryEntry>>;
}

/// Ordered in-memory store with sequential ids (`task-000001`, `slot-000002`, ...).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryStore {
    seq: u64,
    users: BTreeMap<String, User>,
    tasks: BTreeMap<String, Task>,
    slots: BTreeMap<String, TimeSlot>,
    schedules: BTreeMap<String, WeeklySchedule>,
    history: Vec<HistoryEntry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self, prefix: &str) -> String {
        self.seq += 1;
        format!("{prefix}-{:06}", self.seq)
    }

    fn check_task_ref(&self, task_id: Option<&str>) -> StoreResult<()> {
        match task_id {
            Some(id) if !self.tasks.contains_key(id) => Err(StoreError::validation(
                "time slot",
                format!("references unknown task {id}"),
            )),
            _ => Ok(()),
        }
    }

    fn check_user(&self, user_id: &str) -> StoreResult<()> {
        if self.users.contains_key(user_id) {
            Ok(())
        } else {
            Err(StoreError::not_found("user", user_id))
        }
    }
}

impl Store for MemoryStore {
    fn create_user(&mut self, email: &str, name: &str) -> StoreResult<User> {
        if email.trim().is_empty() {
            return Err(StoreError::validation("user", "email must not be empty"));
        }
        if self.users.values().any(|u| u.email == email) {
            return Err(StoreError::validation("user", format!("{email} already registered")));
        }
        let user = User {
            id: self.next_id("user"),
            email: email.to_string(),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        self.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    fn get_user(&self, id: &str) -> StoreResult<User> {
        self.users
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("user", id))
    }

    fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.users.values().find(|u| u.email == email).cloned())
    }

    fn create_task(&mut self, user_id: &str, draft: TaskDraft) -> StoreResult<Task> {
        self.check_user(user_id)?;
        draft
            .validate()
            .map_err(|reason| StoreError::validation("task", reason))?;
        let now = Utc::now();
        let task = Task {
            id: self.next_id("task"),
            user_id: user_id.to_string(),
            title: draft.title,
            description: draft.description,
            priority: draft.priority,
            category: draft.category,
            eisenhower_category: draft.eisenhower_category,
            completed: false,
            duration: draft.duration,
            scheduled_at: draft.scheduled_at,
            created_at: now,
            updated_at: now,
        };
        debug!(task_id = %task.id, title = %task.title, "created task");
        self.tasks.insert(task.id.clone(), task.clone());
        Ok(task)
    }

    fn get_task(&self, id: &str) -> StoreResult<Task> {
        self.tasks
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("task", id))
    }

    fn list_tasks(&self, filter: &TaskFilter) -> StoreResult<Vec<Task>> {
        Ok(self.tasks.values().filter(|t| filter.matches(t)).cloned().collect())
    }

    fn update_task(&mut self, task: &Task) -> StoreResult<Task> {
        let existing = self
            .tasks
            .get(&task.id)
            .ok_or_else(|| StoreError::not_found("task", &task.id))?;
        task.validate()
            .map_err(|reason| StoreError::validation("task", reason))?;
        let mut updated = task.clone();
        updated.user_id = existing.user_id.clone();
        updated.created_at = existing.created_at;
        updated.updated_at = Utc::now();
        self.tasks.insert(updated.id.clone(), updated.clone());
        Ok(updated)
    }

    fn delete_task(&mut self, id: &str) -> StoreResult<Task> {
        let task = self
            .tasks
            .remove(id)
            .ok_or_else(|| StoreError::not_found("task", id))?;
        for slot in self.slots.values_mut() {
            if slot.task_id.as_deref() == Some(id) {
                slot.task_id = None;
            }
        }
        debug!(task_id = %id, "deleted task and cleared slot references");
        Ok(task)
    }

    fn create_time_slot(&mut self, user_id: &str, draft: TimeSlotDraft) -> StoreResult<TimeSlot> {
        self.check_user(user_id)?;
        self.check_task_ref(draft.task_id.as_deref())?;
        let slot = TimeSlot {
            id: self.next_id("slot"),
            user_id: user_id.to_string(),
            day: draft.day,
            start: draft.start,
            end: draft.end,
            task_id: draft.task_id,
            merged: false,
        };
        slot.validate()
            .map_err(|reason| StoreError::validation("time slot", reason))?;
        self.slots.insert(slot.id.clone(), slot.clone());
        Ok(slot)
    }

    fn get_time_slot(&self, id: &str) -> StoreResult<TimeSlot> {
        self.slots
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("time slot", id))
    }

    fn list_time_slots(&self, filter: &SlotFilter) -> StoreResult<Vec<TimeSlot>> {
        let mut out: Vec<TimeSlot> = self.slots.values().filter(|s| filter.matches(s)).cloned().collect();
        out.sort_by(|a, b| a.day.cmp(&b.day).then(a.start.cmp(&b.start)));
        Ok(out)
    }

    fn update_time_slot(&mut self, slot: &TimeSlot) -> StoreResult<TimeSlot> {
        let existing = self
            .slots
            .get(&slot.id)
            .ok_or_else(|| StoreError::not_found("time slot", &slot.id))?;
        let mut updated = slot.clone();
        updated.user_id = existing.user_id.clone();
        updated
            .validate()
            .map_err(|reason| StoreError::validation("time slot", reason))?;
        self.check_task_ref(updated.task_id.as_deref())?;
        self.slots.insert(updated.id.clone(), updated.clone());
        Ok(updated)
    }

    fn delete_time_slot(&mut self, id: &str) -> StoreResult<TimeSlot> {
        self.slots
            .remove(id)
            .ok_or_else(|| StoreError::not_found("time slot", id))
    }

    fn create_schedule(&mut self, user_id: &str, draft: ScheduleDraft) -> StoreResult<WeeklySchedule> {
        self.check_user(user_id)?;
        if draft.goals.trim().is_empty() {
            return Err(StoreError::validation("schedule", "goals must not be empty"));
        }
        let schedule = WeeklySchedule {
            id: self.next_id("schedule"),
            user_id: user_id.to_string(),
            week_start: draft.week_start,
            goals: draft.goals,
            time_slot_ids: draft.time_slot_ids,
            active: true,
            created_at: Utc::now(),
        };
        self.schedules.insert(schedule.id.clone(), schedule.clone());
        Ok(schedule)
    }

    fn get_schedule(&self, id: &str) -> StoreResult<WeeklySchedule> {
        self.schedules
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("schedule", id))
    }

    fn list_schedules(&self, filter: &ScheduleFilter) -> StoreResult<Vec<WeeklySchedule>> {
        let mut out: Vec<WeeklySchedule> =
            self.schedules.values().filter(|s| filter.matches(s)).cloned().collect();
        out.sort_by(|a, b| b.week_start.cmp(&a.week_start).then(b.created_at.cmp(&a.created_at)));
        Ok(out)
    }

    fn update_schedule(&mut self, schedule: &WeeklySchedule) -> StoreResult<WeeklySchedule> {
        let existing = self
            .schedules
            .get(&schedule.id)
            .ok_or_else(|| StoreError::not_found("schedule", &schedule.id))?;
        let mut updated = schedule.clone();
        updated.user_id = existing.user_id.clone();
        updated.created_at = existing.created_at;
        self.schedules.insert(updated.id.clone(), updated.clone());
        Ok(updated)
    }

    fn delete_schedule(&mut self, id: &str) -> StoreResult<WeeklySchedule> {
        self.schedules
            .remove(id)
            .ok_or_else(|| StoreError::not_found("schedule", id))
    }

    fn append_history(&mut self, user_id: &str, draft: HistoryDraft) -> StoreResult<HistoryEntry> {
        if draft.description.trim().is_empty() {
            return Err(StoreError::validation("history entry", "description must not be empty"));
        }
        let entry = HistoryEntry {
            id: self.next_id("history"),
            user_id: user_id.to_string(),
            schedule_id: draft.schedule_id,
            action: draft.action,
            entity_type: draft.entity_type,
            entity_id: draft.entity_id,
            from: draft.from,
            to: draft.to,
            description: draft.description,
            timestamp: Utc::now(),
        };
        self.history.push(entry.clone());
        Ok(entry)
    }

    fn list_history(&self, user_id: &str) -> StoreResult<Vec<HistoryEntry>> {
        Ok(self.history.iter().filter(|h| h.user_id == user_id).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar;

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn store_with_user() -> (MemoryStore, String) {
        let mut store = MemoryStore::new();
        let user = store.create_user("demo@example.com", "Demo User").unwrap();
        (store, user.id)
    }

    #[test]
    fn ids_are_sequential_and_prefixed() {
        let (mut store, user) = store_with_user();
        let t = store.create_task(&user, TaskDraft::new("Write")).unwrap();
        let s = store
            .create_time_slot(&user, TimeSlotDraft::for_cell(monday(), 9, None))
            .unwrap();
        assert_eq!(user, "user-000001");
        assert_eq!(t.id, "task-000002");
        assert_eq!(s.id, "slot-000003");
    }

    #[test]
    fn deleting_task_clears_slot_reference() {
        let (mut store, user) = store_with_user();
        let task = store.create_task(&user, TaskDraft::new("Gym")).unwrap();
        let slot = store
            .create_time_slot(&user, TimeSlotDraft::for_cell(monday(), 7, Some(task.id.clone())))
            .unwrap();

        store.delete_task(&task.id).unwrap();
        assert_eq!(store.get_time_slot(&slot.id).unwrap().task_id, None);
        assert!(store.get_task(&task.id).unwrap_err().is_not_found());
    }

    #[test]
    fn slot_rejects_unknown_task_and_bad_range() {
        let (mut store, user) = store_with_user();
        let err = store
            .create_time_slot(&user, TimeSlotDraft::for_cell(monday(), 9, Some("task-999".into())))
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation { .. }));

        let mut draft = TimeSlotDraft::for_cell(monday(), 9, None);
        draft.end = draft.start;
        assert!(store.create_time_slot(&user, draft).is_err());
    }

    #[test]
    fn slot_listing_filters_by_day_range_and_orders_by_time() {
        let (mut store, user) = store_with_user();
        let tue = monday().succ_opt().unwrap();
        store.create_time_slot(&user, TimeSlotDraft::for_cell(tue, 9, None)).unwrap();
        store.create_time_slot(&user, TimeSlotDraft::for_cell(monday(), 0, None)).unwrap();
        store.create_time_slot(&user, TimeSlotDraft::for_cell(monday(), 22, None)).unwrap();

        let mon_only = store
            .list_time_slots(&SlotFilter::for_user(&user).days(monday(), tue))
            .unwrap();
        assert_eq!(mon_only.len(), 2);
        assert_eq!(mon_only[0].start, calendar::cell_start(monday(), 22));
        assert_eq!(mon_only[1].start, calendar::cell_start(monday(), 0));

        let other = store.list_time_slots(&SlotFilter::for_user("user-404")).unwrap();
        assert!(other.is_empty());
    }

    #[test]
    fn task_filter_by_scheduled_window() {
        let (mut store, user) = store_with_user();
        let at = calendar::cell_start(monday(), 9);
        store.create_task(&user, TaskDraft::new("Planned").scheduled_at(at)).unwrap();
        store.create_task(&user, TaskDraft::new("Loose")).unwrap();

        let all = store.list_tasks(&TaskFilter::for_user(&user)).unwrap();
        assert_eq!(all.len(), 2);
        let window = TaskFilter::for_user(&user)
            .scheduled_between(at, at + chrono::Duration::hours(1));
        let planned = store.list_tasks(&window).unwrap();
        assert_eq!(planned.len(), 1);
        assert_eq!(planned[0].title, "Planned");
    }

    #[test]
    fn store_survives_json_round_trip() {
        let (mut store, user) = store_with_user();
        store.create_task(&user, TaskDraft::new("Persist me")).unwrap();
        let json = serde_json::to_string(&store).unwrap();
        let mut back: MemoryStore = serde_json::from_str(&json).unwrap();
        assert_eq!(back.list_tasks(&TaskFilter::for_user(&user)).unwrap().len(), 1);
        // sequence continues rather than reusing ids
        let next = back.create_task(&user, TaskDraft::new("Next")).unwrap();
        assert_eq!(next.id, "task-000003");
    }
}
