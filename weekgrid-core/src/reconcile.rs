//! Reconciler: converge a generated schedule with what is already stored.
//!
//! Walks every grid cell of the week in grid order. A cell that already has a
//! stored slot is reused verbatim; otherwise a slot is created, carrying a task
//! when the generated schedule has an entry for the cell. Running it again with
//! its own output as the existing state creates nothing.

use chrono::{Duration, NaiveDate};
use thiserror::Error;
use tracing::{debug, info};

use crate::calendar::{self, WEEK};
use crate::grid::{self, CellId};
use crate::model::{Task, TimeSlot, TimeSlotDraft};
use crate::payload::{self, GeneratedSchedule, PayloadError};
use crate::store::{SlotFilter, Store, StoreError, TaskFilter};

#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Cells before `cell` were materialized; rerunning picks up from there.
    #[error("store failure while materializing {cell}: {source}")]
    Store { cell: CellId, source: StoreError },
    #[error("loading existing records: {0}")]
    Load(#[source] StoreError),
}

#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    /// One record per grid cell in grid order. A merged slot stands in for
    /// every cell it covers and appears once, at its first cell.
    pub slots: Vec<TimeSlot>,
    pub created_tasks: usize,
    pub created_slots: usize,
    pub reused_tasks: usize,
    pub reused_slots: usize,
    /// Set when the generated text was unusable and the built-in week was used.
    pub fallback: Option<PayloadError>,
}

impl Reconciliation {
    pub fn created_nothing(&self) -> bool {
        self.created_tasks == 0 && self.created_slots == 0
    }

    pub fn slot_ids(&self) -> Vec<String> {
        self.slots.iter().map(|s| s.id.clone()).collect()
    }

    /// Distinct task ids referenced by the resulting slots.
    pub fn task_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for id in self.slots.iter().filter_map(|s| s.task_id.as_ref()) {
            if !ids.contains(id) {
                ids.push(id.clone());
            }
        }
        ids
    }
}

enum Occupant<'a> {
    Starts(&'a TimeSlot),
    Covered(&'a TimeSlot),
}

fn occupant<'a>(slots: &'a [TimeSlot], anchor: NaiveDate, index: usize) -> Option<Occupant<'a>> {
    slots.iter().find_map(|slot| {
        let span = slot.span()?;
        if !span.covers(anchor, index) {
            None
        } else if span.first == index {
            Some(Occupant::Starts(slot))
        } else {
            Some(Occupant::Covered(slot))
        }
    })
}

/// Materialize `schedule` for the week starting at `today`.
///
/// `existing_tasks` and `existing_slots` are the caller's view of the store;
/// records belonging to other users are ignored.
pub fn reconcile<S: Store + ?Sized>(
    store: &mut S,
    user_id: &str,
    schedule: &GeneratedSchedule,
    existing_tasks: &[Task],
    existing_slots: &[TimeSlot],
    today: NaiveDate,
) -> Result<Reconciliation, ReconcileError> {
    let mut tasks: Vec<Task> = existing_tasks
        .iter()
        .filter(|t| t.user_id == user_id)
        .cloned()
        .collect();
    let mut slots: Vec<TimeSlot> = existing_slots
        .iter()
        .filter(|s| s.user_id == user_id)
        .cloned()
        .collect();
    let mut out = Reconciliation::default();

    for day in WEEK {
        let anchor = calendar::anchor_date(today, day);
        for cell in grid::day_cells(day) {
            let hour = cell.hour();
            match occupant(&slots, anchor, cell.index()) {
                Some(Occupant::Starts(slot)) => {
                    debug!(day = %day, hour, slot_id = %slot.id, "reusing existing slot");
                    out.slots.push(slot.clone());
                    out.reused_slots += 1;
                    continue;
                }
                Some(Occupant::Covered(slot)) => {
                    debug!(day = %day, hour, slot_id = %slot.id, "cell covered by merged slot");
                    continue;
                }
                None => {}
            }

            let task_id = match schedule.entry(day, hour) {
                Some(entry) => {
                    let at = calendar::cell_start(anchor, hour);
                    let known = tasks
                        .iter()
                        .find(|t| t.scheduled_at == Some(at) && t.title == entry.title)
                        .map(|t| t.id.clone());
                    match known {
                        Some(id) => {
                            out.reused_tasks += 1;
                            Some(id)
                        }
                        None => {
                            let task = store
                                .create_task(user_id, entry.to_draft().scheduled_at(at))
                                .map_err(|source| ReconcileError::Store { cell, source })?;
                            out.created_tasks += 1;
                            let id = task.id.clone();
                            tasks.push(task);
                            Some(id)
                        }
                    }
                }
                None => None,
            };

            let slot = store
                .create_time_slot(user_id, TimeSlotDraft::for_cell(anchor, hour, task_id))
                .map_err(|source| ReconcileError::Store { cell, source })?;
            debug!(day = %day, hour, slot_id = %slot.id, has_task = slot.task_id.is_some(), "created slot");
            out.created_slots += 1;
            out.slots.push(slot.clone());
            slots.push(slot);
        }
    }

    info!(
        created_slots = out.created_slots,
        created_tasks = out.created_tasks,
        reused_slots = out.reused_slots,
        reused_tasks = out.reused_tasks,
        "reconciled week"
    );
    Ok(out)
}

/// Read-before-write variant: fetch the user's tasks and the week's slots from
/// the store, then reconcile against them.
pub fn reconcile_from_store<S: Store + ?Sized>(
    store: &mut S,
    user_id: &str,
    schedule: &GeneratedSchedule,
    today: NaiveDate,
) -> Result<Reconciliation, ReconcileError> {
    let tasks = store
        .list_tasks(&TaskFilter::for_user(user_id))
        .map_err(ReconcileError::Load)?;
    let slots = store
        .list_time_slots(&SlotFilter::for_user(user_id).days(today, today + Duration::days(7)))
        .map_err(ReconcileError::Load)?;
    reconcile(store, user_id, schedule, &tasks, &slots, today)
}

/// Reconcile raw generated text, substituting the built-in week when the text
/// is unusable.
pub fn reconcile_text<S: Store + ?Sized>(
    store: &mut S,
    user_id: &str,
    text: &str,
    today: NaiveDate,
) -> Result<Reconciliation, ReconcileError> {
    let (schedule, fallback) = payload::parse_or_fallback(text);
    let mut out = reconcile_from_store(store, user_id, &schedule, today)?;
    out.fallback = fallback;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;
    use crate::model::TaskDraft;
    use crate::payload::GeneratedEntry;
    use crate::store::MemoryStore;

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn setup() -> (MemoryStore, String) {
        let mut store = MemoryStore::new();
        let user = store.create_user("demo@example.com", "Demo").unwrap();
        (store, user.id)
    }

    #[test]
    fn fills_every_cell() {
        let (mut store, user) = setup();
        let schedule = GeneratedSchedule::new().with(Weekday::Wed, "9", GeneratedEntry::new("Standup"));
        let out = reconcile(&mut store, &user, &schedule, &[], &[], monday()).unwrap();
        assert_eq!(out.slots.len(), 161);
        assert_eq!(out.created_slots, 161);
        assert_eq!(out.created_tasks, 1);
        assert_eq!(out.task_ids().len(), 1);
    }

    #[test]
    fn second_run_reuses_everything() {
        let (mut store, user) = setup();
        let schedule = GeneratedSchedule::new()
            .with(Weekday::Mon, "9", GeneratedEntry::new("Finish report"))
            .with(Weekday::Sun, "1am", GeneratedEntry::new("Late read"));
        let first = reconcile(&mut store, &user, &schedule, &[], &[], monday()).unwrap();
        let tasks = store.list_tasks(&TaskFilter::for_user(&user)).unwrap();

        let second = reconcile(&mut store, &user, &schedule, &tasks, &first.slots, monday()).unwrap();
        assert!(second.created_nothing());
        assert_eq!(second.reused_slots, 161);
        assert_eq!(second.slot_ids(), first.slot_ids());
    }

    #[test]
    fn reuses_task_with_same_cell_and_title() {
        let (mut store, user) = setup();
        let at = calendar::cell_start(monday(), 9);
        let task = store
            .create_task(&user, TaskDraft::new("Finish report").scheduled_at(at))
            .unwrap();
        let schedule = GeneratedSchedule::new().with(Weekday::Mon, "9", GeneratedEntry::new("Finish report"));

        let out = reconcile(&mut store, &user, &schedule, &[task.clone()], &[], monday()).unwrap();
        assert_eq!(out.created_tasks, 0);
        assert_eq!(out.reused_tasks, 1);
        assert_eq!(out.slots[5].task_id.as_deref(), Some(task.id.as_str()));
    }

    #[test]
    fn merged_slot_stands_in_for_covered_cells() {
        let (mut store, user) = setup();
        let mut merged = store
            .create_time_slot(&user, TimeSlotDraft::for_cell(monday(), 9, None))
            .unwrap();
        merged.end = calendar::cell_end(monday(), 11);
        merged.merged = true;
        let merged = store.update_time_slot(&merged).unwrap();

        let schedule = GeneratedSchedule::new().with(Weekday::Mon, "10", GeneratedEntry::new("Hidden"));
        let out = reconcile(&mut store, &user, &schedule, &[], &[merged.clone()], monday()).unwrap();
        assert_eq!(out.slots.len(), 159);
        assert_eq!(out.created_tasks, 0);
        assert_eq!(out.slots.iter().filter(|s| s.id == merged.id).count(), 1);
    }

    #[test]
    fn ignores_other_users_records() {
        let (mut store, user) = setup();
        let other = store.create_user("other@example.com", "Other").unwrap();
        let foreign = store
            .create_time_slot(&other.id, TimeSlotDraft::for_cell(monday(), 4, None))
            .unwrap();
        let out = reconcile(&mut store, &user, &GeneratedSchedule::new(), &[], &[foreign], monday()).unwrap();
        assert_eq!(out.created_slots, 161);
        assert!(out.slots.iter().all(|s| s.user_id == user));
    }

    #[test]
    fn unusable_text_falls_back() {
        let (mut store, user) = setup();
        let out = reconcile_text(&mut store, &user, "not json", monday()).unwrap();
        assert_eq!(out.fallback, Some(PayloadError::NoJsonObject));
        assert_eq!(out.created_tasks, 22);
    }

    #[test]
    fn twelve_hour_label_creates_one_task() {
        let (mut store, user) = setup();
        let text = r#"{"Monday": {"5pm": {"title": "Gym"}}}"#;
        let out = reconcile_text(&mut store, &user, text, monday()).unwrap();
        assert_eq!(out.fallback, None);
        assert_eq!(out.created_tasks, 1);
        assert_eq!(out.task_ids().len(), 1);

        let tasks = store.list_tasks(&TaskFilter::for_user(&user)).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].scheduled_at, Some(calendar::cell_start(monday(), 17)));
        assert!(out.slots[1].task_id.is_none());
    }
}
