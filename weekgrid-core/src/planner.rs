//! User-facing planner operations.
//!
//! Each operation is a short sequence of store calls followed by one history
//! entry. Weekly schedule install and cleanup live in `schedule.rs`.

use chrono::{Duration, NaiveDate, Weekday};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info};

use crate::calendar;
use crate::grid::CellId;
use crate::merge::{self, MergeError, MergePlan};
use crate::model::{
    Category, EisenhowerCategory, EntityType, HistoryAction, HistoryDraft, HistoryEntry, Priority,
    Task, TaskDraft, TimeSlot, TimeSlotDraft,
};
use crate::reconcile::ReconcileError;
use crate::store::{SlotFilter, Store, StoreError, TaskFilter};

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("quadrant must be 1-4, got {0}")]
    InvalidQuadrant(u8),
    #[error("hour {0} is not on the grid")]
    OffGrid(u32),
    #[error("{0} already holds a task")]
    CellOccupied(CellId),
    #[error("slot {0} has no task")]
    EmptySlot(String),
    #[error("slot {0} already holds a task")]
    SlotOccupied(String),
    #[error("a schedule for the week of {week_start} already exists ({schedule_id})")]
    ScheduleExists { schedule_id: String, week_start: NaiveDate },
    #[error("cleanup aborted after deleting {deleted} of {total} slots: {source}")]
    CleanupAborted { deleted: usize, total: usize, source: StoreError },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Merge(#[from] MergeError),
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

pub type PlannerResult<T> = Result<T, PlannerError>;

/// Field changes for [`Planner::edit_task`]. `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskEdit {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub category: Option<Category>,
    pub eisenhower_category: Option<EisenhowerCategory>,
    pub duration: Option<f64>,
}

impl TaskEdit {
    pub fn is_empty(&self) -> bool {
        *self == TaskEdit::default()
    }

    fn apply(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.trim().to_string();
        }
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(category) = self.category {
            task.category = category;
        }
        if let Some(eisenhower) = self.eisenhower_category {
            task.eisenhower_category = eisenhower;
        }
        if let Some(duration) = self.duration {
            task.duration = duration;
        }
    }
}

/// Planner operations for one user over a store.
pub struct Planner<S: Store> {
    store: S,
    user_id: String,
}

impl<S: Store> Planner<S> {
    pub fn new(store: S, user_id: impl Into<String>) -> Self {
        Self { store, user_id: user_id.into() }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub(crate) fn record(&mut self, draft: HistoryDraft) -> PlannerResult<HistoryEntry> {
        debug!(action = ?draft.action, entity = %draft.entity_id, "history");
        Ok(self.store.append_history(&self.user_id, draft)?)
    }

    pub fn tasks(&self) -> PlannerResult<Vec<Task>> {
        Ok(self.store.list_tasks(&TaskFilter::for_user(&self.user_id))?)
    }

    /// Slots of the seven logical days starting at `today`.
    pub fn week_slots(&self, today: NaiveDate) -> PlannerResult<Vec<TimeSlot>> {
        let filter = SlotFilter::for_user(&self.user_id).days(today, today + Duration::days(7));
        Ok(self.store.list_time_slots(&filter)?)
    }

    pub fn history(&self) -> PlannerResult<Vec<HistoryEntry>> {
        Ok(self.store.list_history(&self.user_id)?)
    }

    fn owned_task(&self, task_id: &str) -> PlannerResult<Task> {
        let task = self.store.get_task(task_id)?;
        if task.user_id != self.user_id {
            return Err(StoreError::not_found("task", task_id).into());
        }
        Ok(task)
    }

    fn owned_slot(&self, slot_id: &str) -> PlannerResult<TimeSlot> {
        let slot = self.store.get_time_slot(slot_id)?;
        if slot.user_id != self.user_id {
            return Err(StoreError::not_found("time slot", slot_id).into());
        }
        Ok(slot)
    }

    pub fn toggle_completion(&mut self, task_id: &str) -> PlannerResult<Task> {
        let mut task = self.owned_task(task_id)?;
        task.completed = !task.completed;
        let task = self.store.update_task(&task)?;
        let verb = if task.completed { "Completed" } else { "Uncompleted" };
        self.record(
            HistoryDraft::new(HistoryAction::Complete, EntityType::Task, &task.id, format!("{verb} task: {}", task.title))
                .with_from(json!({ "completed": !task.completed }))
                .with_to(json!({ "completed": task.completed })),
        )?;
        Ok(task)
    }

    pub fn edit_task(&mut self, task_id: &str, edit: &TaskEdit) -> PlannerResult<Task> {
        if edit.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(PlannerError::Missing("title"));
        }
        let before = self.owned_task(task_id)?;
        let mut task = before.clone();
        edit.apply(&mut task);
        let task = self.store.update_task(&task)?;
        self.record(
            HistoryDraft::new(HistoryAction::Update, EntityType::Task, &task.id, format!("Updated task: {}", task.title))
                .with_from(snapshot(&before))
                .with_to(snapshot(&task)),
        )?;
        Ok(task)
    }

    /// Delete a task. Slots that held it become empty.
    pub fn delete_task(&mut self, task_id: &str) -> PlannerResult<Task> {
        self.owned_task(task_id)?;
        let task = self.store.delete_task(task_id)?;
        self.record(
            HistoryDraft::new(HistoryAction::Delete, EntityType::Task, &task.id, format!("Deleted task: {}", task.title))
                .with_from(snapshot(&task)),
        )?;
        Ok(task)
    }

    /// Move the task in `from_slot` into the empty `to_slot`.
    ///
    /// The target is written first so the task is never left without a slot.
    pub fn move_task(&mut self, from_slot: &str, to_slot: &str) -> PlannerResult<(TimeSlot, TimeSlot)> {
        let mut source = self.owned_slot(from_slot)?;
        let mut target = self.owned_slot(to_slot)?;
        let task_id = source
            .task_id
            .clone()
            .ok_or_else(|| PlannerError::EmptySlot(source.id.clone()))?;
        if target.task_id.is_some() {
            return Err(PlannerError::SlotOccupied(target.id.clone()));
        }

        target.task_id = Some(task_id.clone());
        let target = self.store.update_time_slot(&target)?;
        source.task_id = None;
        let source = self.store.update_time_slot(&source)?;

        let mut task = self.store.get_task(&task_id)?;
        task.scheduled_at = Some(target.start);
        let task = self.store.update_task(&task)?;

        let description = match (source.cell(), target.cell()) {
            (Some(from), Some(to)) => format!("Moved task \"{}\" from {from} to {to}", task.title),
            _ => format!("Moved task \"{}\"", task.title),
        };
        self.record(
            HistoryDraft::new(HistoryAction::Move, EntityType::Task, &task.id, description)
                .with_from(json!({ "slotId": source.id }))
                .with_to(json!({ "slotId": target.id })),
        )?;
        Ok((source, target))
    }

    /// Re-categorize a task by dropping it on a matrix quadrant.
    pub fn move_to_quadrant(&mut self, task_id: &str, quadrant: u8) -> PlannerResult<Task> {
        let category =
            EisenhowerCategory::from_quadrant(quadrant).ok_or(PlannerError::InvalidQuadrant(quadrant))?;
        let mut task = self.owned_task(task_id)?;
        let old = task.eisenhower_category.quadrant();
        task.eisenhower_category = category;
        let task = self.store.update_task(&task)?;
        self.record(
            HistoryDraft::new(
                HistoryAction::Categorize,
                EntityType::MatrixTask,
                &task.id,
                format!("Moved task \"{}\" from Q{old} to Q{quadrant}", task.title),
            )
            .with_from(json!({ "quadrant": old }))
            .with_to(json!({ "quadrant": quadrant })),
        )?;
        Ok(task)
    }

    /// Create a task in the grid cell (`day`, `hour`) of the week starting at
    /// `today`. An empty slot there receives the task; a missing one is created.
    pub fn create_task_in_cell(
        &mut self,
        today: NaiveDate,
        day: Weekday,
        hour: u32,
        draft: TaskDraft,
    ) -> PlannerResult<(Task, TimeSlot)> {
        if draft.title.trim().is_empty() {
            return Err(PlannerError::Missing("title"));
        }
        let cell = CellId::new(day, hour).ok_or(PlannerError::OffGrid(hour))?;
        let anchor = calendar::anchor_date(today, day);
        let filter = SlotFilter::for_user(&self.user_id).days(anchor, anchor + Duration::days(1));
        let occupant = self
            .store
            .list_time_slots(&filter)?
            .into_iter()
            .find(|s| s.span().is_some_and(|span| span.covers(anchor, cell.index())));

        if occupant.as_ref().is_some_and(|s| s.task_id.is_some()) {
            return Err(PlannerError::CellOccupied(cell));
        }

        let at = occupant
            .as_ref()
            .map_or_else(|| calendar::cell_start(anchor, hour), |s| s.start);
        let task = self.store.create_task(&self.user_id, draft.scheduled_at(at))?;
        let slot = match occupant {
            Some(mut slot) => {
                slot.task_id = Some(task.id.clone());
                self.store.update_time_slot(&slot)?
            }
            None => self.store.create_time_slot(
                &self.user_id,
                TimeSlotDraft::for_cell(anchor, hour, Some(task.id.clone())),
            )?,
        };

        self.record(
            HistoryDraft::new(
                HistoryAction::Create,
                EntityType::Task,
                &task.id,
                format!("Created task \"{}\" at {cell}", task.title),
            )
            .with_to(snapshot(&task)),
        )?;
        info!(task_id = %task.id, slot_id = %slot.id, %cell, "created task in cell");
        Ok((task, slot))
    }

    pub fn merge_with_next(&mut self, slot_id: &str) -> PlannerResult<MergePlan> {
        self.owned_slot(slot_id)?;
        let plan = merge::merge_with_next(&mut self.store, slot_id)?;
        self.record_merge(&plan)?;
        Ok(plan)
    }

    /// Merge a selection of slots given in any order.
    pub fn merge_slots(&mut self, slot_ids: &[String]) -> PlannerResult<MergePlan> {
        for id in slot_ids {
            self.owned_slot(id)?;
        }
        let plan = merge::merge_selection(&mut self.store, slot_ids)?;
        self.record_merge(&plan)?;
        Ok(plan)
    }

    fn record_merge(&mut self, plan: &MergePlan) -> PlannerResult<()> {
        let hours = plan.survivor.hours();
        let label = plan
            .survivor
            .cell()
            .map_or_else(|| plan.survivor.id.clone(), |c| c.to_string());
        self.record(
            HistoryDraft::new(
                HistoryAction::Merge,
                EntityType::TimeSlot,
                &plan.survivor.id,
                format!("Merged {} slots into a {hours}h block at {label}", plan.absorbed.len() + 1),
            )
            .with_from(json!({ "absorbed": plan.absorbed, "displacedTasks": plan.displaced_tasks }))
            .with_to(json!({ "end": plan.survivor.end, "taskId": plan.survivor.task_id })),
        )?;
        Ok(())
    }
}

pub(crate) fn snapshot<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}
