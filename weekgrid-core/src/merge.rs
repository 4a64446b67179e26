//! Merge engine: collapse a contiguous run of slots into one.
//!
//! Every entry point funnels into [`plan_merge`], which checks the whole run
//! before anything is written. The survivor is written before any absorbed slot
//! is deleted, so an interrupted merge never loses the kept task.

use chrono::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::grid::GridSpan;
use crate::model::TimeSlot;
use crate::store::{SlotFilter, Store, StoreError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeError {
    #[error("a merge needs at least two slots, got {0}")]
    TooFewSlots(usize),
    #[error("slot {0} appears more than once in the range")]
    DuplicateSlot(String),
    #[error("slot {0} is not aligned to the grid")]
    OffGrid(String),
    #[error("slots {first} and {second} are on different logical days")]
    DifferentDays { first: String, second: String },
    #[error("slots {first} and {second} are not adjacent")]
    NotAdjacent { first: String, second: String },
    #[error("slot {0} is already merged; only the first slot of a range may be")]
    AlreadyMerged(String),
    #[error("slot {0} has no following slot to merge with")]
    NoNextSlot(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Outcome of a validated merge, before (or after) it is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergePlan {
    /// First slot of the range with its end extended and `merged` set.
    pub survivor: TimeSlot,
    /// Ids of the slots to delete, in range order.
    pub absorbed: Vec<String>,
    /// Tasks that sat in absorbed slots and lost their place.
    pub displaced_tasks: Vec<String>,
}

/// Validate `range` (ordered, in grid order) and work out the merged slot.
pub fn plan_merge(range: &[TimeSlot]) -> Result<MergePlan, MergeError> {
    let (first, rest) = match range {
        [first, rest @ ..] if !rest.is_empty() => (first, rest),
        _ => return Err(MergeError::TooFewSlots(range.len())),
    };

    for (i, slot) in range.iter().enumerate() {
        if range[..i].iter().any(|s| s.id == slot.id) {
            return Err(MergeError::DuplicateSlot(slot.id.clone()));
        }
    }
    if let Some(slot) = rest.iter().find(|s| s.merged) {
        return Err(MergeError::AlreadyMerged(slot.id.clone()));
    }

    let spans = range
        .iter()
        .map(|s| GridSpan::of(s).ok_or_else(|| MergeError::OffGrid(s.id.clone())))
        .collect::<Result<Vec<_>, _>>()?;

    for (pair, slots) in spans.windows(2).zip(range.windows(2)) {
        let (a, b) = (&slots[0], &slots[1]);
        if pair[0].date != pair[1].date {
            return Err(MergeError::DifferentDays { first: a.id.clone(), second: b.id.clone() });
        }
        if !pair[0].precedes(&pair[1]) {
            return Err(MergeError::NotAdjacent { first: a.id.clone(), second: b.id.clone() });
        }
    }

    // earliest non-empty task wins
    let kept = range.iter().find_map(|s| s.task_id.clone());
    let mut displaced = Vec::new();
    for id in range.iter().filter_map(|s| s.task_id.as_ref()) {
        if Some(id) != kept.as_ref() && !displaced.contains(id) {
            displaced.push(id.clone());
        }
    }

    let mut survivor = first.clone();
    survivor.end = range[range.len() - 1].end;
    survivor.merged = true;
    survivor.task_id = kept;

    Ok(MergePlan {
        survivor,
        absorbed: rest.iter().map(|s| s.id.clone()).collect(),
        displaced_tasks: displaced,
    })
}

/// Merge the slots `ids` (given in grid order) into the first of them.
pub fn merge_range<S: Store + ?Sized>(store: &mut S, ids: &[String]) -> Result<MergePlan, MergeError> {
    if ids.len() < 2 {
        return Err(MergeError::TooFewSlots(ids.len()));
    }
    let range = ids
        .iter()
        .map(|id| store.get_time_slot(id))
        .collect::<Result<Vec<_>, _>>()?;

    let plan = match plan_merge(&range) {
        Ok(plan) => plan,
        Err(err) => {
            warn!(error = %err, "merge rejected");
            return Err(err);
        }
    };

    let survivor = store.update_time_slot(&plan.survivor)?;
    for id in &plan.absorbed {
        store.delete_time_slot(id)?;
        debug!(slot_id = %id, survivor = %survivor.id, "absorbed slot");
    }
    info!(
        slot_id = %survivor.id,
        hours = survivor.hours(),
        absorbed = plan.absorbed.len(),
        "merged slots"
    );
    Ok(MergePlan { survivor, ..plan })
}

/// Merge `slot_id` with the slot that starts where it ends.
pub fn merge_with_next<S: Store + ?Sized>(store: &mut S, slot_id: &str) -> Result<MergePlan, MergeError> {
    let slot = store.get_time_slot(slot_id)?;
    let span = GridSpan::of(&slot).ok_or_else(|| MergeError::OffGrid(slot.id.clone()))?;
    let same_day = store.list_time_slots(
        &SlotFilter::for_user(&slot.user_id).days(slot.day, slot.day + Duration::days(1)),
    )?;
    let next = same_day
        .iter()
        .find(|s| GridSpan::of(s).is_some_and(|n| span.precedes(&n)))
        .ok_or_else(|| MergeError::NoNextSlot(slot.id.clone()))?;
    merge_range(store, &[slot.id.clone(), next.id.clone()])
}

/// Merge a user selection given in any order.
pub fn merge_selection<S: Store + ?Sized>(store: &mut S, ids: &[String]) -> Result<MergePlan, MergeError> {
    let mut selected = ids
        .iter()
        .map(|id| store.get_time_slot(id))
        .collect::<Result<Vec<_>, _>>()?;
    selected.sort_by(|a, b| a.day.cmp(&b.day).then(a.start.cmp(&b.start)));
    let ordered: Vec<String> = selected.into_iter().map(|s| s.id).collect();
    merge_range(store, &ordered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar;
    use crate::model::{TaskDraft, TimeSlotDraft};
    use crate::store::MemoryStore;
    use chrono::NaiveDate;

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    struct Fixture {
        store: MemoryStore,
        user: String,
    }

    impl Fixture {
        fn new() -> Self {
            let mut store = MemoryStore::new();
            let user = store.create_user("demo@example.com", "Demo").unwrap().id;
            Self { store, user }
        }

        fn slot(&mut self, day: NaiveDate, hour: u32, task: Option<&str>) -> TimeSlot {
            let task_id = task.map(|title| self.store.create_task(&self.user, TaskDraft::new(title)).unwrap().id);
            self.store
                .create_time_slot(&self.user, TimeSlotDraft::for_cell(day, hour, task_id))
                .unwrap()
        }
    }

    #[test]
    fn middle_task_survives_three_slot_merge() {
        let mut fx = Fixture::new();
        let a = fx.slot(monday(), 9, None);
        let b = fx.slot(monday(), 10, Some("Deep work"));
        let c = fx.slot(monday(), 11, None);

        let plan = merge_range(&mut fx.store, &[a.id.clone(), b.id.clone(), c.id.clone()]).unwrap();
        assert_eq!(plan.survivor.id, a.id);
        assert_eq!(plan.survivor.task_id, b.task_id);
        assert_eq!(plan.survivor.end, c.end);
        assert!(plan.survivor.merged);
        assert_eq!(plan.absorbed, vec![b.id.clone(), c.id.clone()]);
        assert!(fx.store.get_time_slot(&b.id).unwrap_err().is_not_found());
        assert_eq!(fx.store.get_time_slot(&a.id).unwrap().hours(), 3);
    }

    #[test]
    fn earlier_task_wins_and_later_is_displaced() {
        let mut fx = Fixture::new();
        let a = fx.slot(monday(), 9, Some("Running task"));
        let b = fx.slot(monday(), 10, Some("Planned task"));
        let plan = plan_merge(&[a.clone(), b.clone()]).unwrap();
        assert_eq!(plan.survivor.task_id, a.task_id);
        assert_eq!(plan.displaced_tasks, vec![b.task_id.unwrap()]);
    }

    #[test]
    fn rejects_gaps_and_day_changes_without_mutation() {
        let mut fx = Fixture::new();
        let nine = fx.slot(monday(), 9, None);
        let eleven = fx.slot(monday(), 11, None);
        let tue = fx.slot(monday().succ_opt().unwrap(), 4, None);
        let late = fx.slot(monday(), 2, None);

        let err = merge_range(&mut fx.store, &[nine.id.clone(), eleven.id.clone()]).unwrap_err();
        assert!(matches!(err, MergeError::NotAdjacent { .. }));
        let err = merge_range(&mut fx.store, &[late.id.clone(), tue.id.clone()]).unwrap_err();
        assert!(matches!(err, MergeError::DifferentDays { .. }));

        assert_eq!(fx.store.get_time_slot(&nine.id).unwrap(), nine);
        assert_eq!(fx.store.get_time_slot(&eleven.id).unwrap(), eleven);
        assert_eq!(fx.store.get_time_slot(&late.id).unwrap(), late);
    }

    #[test]
    fn single_slot_and_duplicates_rejected() {
        let mut fx = Fixture::new();
        let a = fx.slot(monday(), 9, None);
        assert_eq!(
            merge_range(&mut fx.store, &[a.id.clone()]),
            Err(MergeError::TooFewSlots(1))
        );
        assert_eq!(
            plan_merge(&[a.clone(), a.clone()]),
            Err(MergeError::DuplicateSlot(a.id.clone()))
        );
    }

    #[test]
    fn merged_slot_may_only_lead() {
        let mut fx = Fixture::new();
        let a = fx.slot(monday(), 9, None);
        let b = fx.slot(monday(), 10, None);
        let c = fx.slot(monday(), 11, None);
        merge_range(&mut fx.store, &[b.id.clone(), c.id.clone()]).unwrap();

        let err = merge_range(&mut fx.store, &[a.id.clone(), b.id.clone()]).unwrap_err();
        assert_eq!(err, MergeError::AlreadyMerged(b.id.clone()));

        // extending an existing merge forward is fine
        let d = fx.slot(monday(), 12, None);
        let plan = merge_range(&mut fx.store, &[b.id.clone(), d.id.clone()]).unwrap();
        assert_eq!(plan.survivor.start, calendar::cell_start(monday(), 10));
        assert_eq!(plan.survivor.end, calendar::cell_end(monday(), 12));
    }

    #[test]
    fn merge_with_next_crosses_midnight() {
        let mut fx = Fixture::new();
        let late = fx.slot(monday(), 23, Some("Night shift"));
        let midnight = fx.slot(monday(), 0, None);
        let plan = merge_with_next(&mut fx.store, &late.id).unwrap();
        assert_eq!(plan.absorbed, vec![midnight.id]);
        assert_eq!(plan.survivor.end, calendar::cell_end(monday(), 0));
        assert_eq!(plan.survivor.task_id, late.task_id);
    }

    #[test]
    fn merge_with_next_needs_a_neighbour() {
        let mut fx = Fixture::new();
        let last = fx.slot(monday(), 2, None);
        fx.slot(monday().succ_opt().unwrap(), 4, None);
        assert_eq!(
            merge_with_next(&mut fx.store, &last.id),
            Err(MergeError::NoNextSlot(last.id.clone()))
        );
    }

    #[test]
    fn selection_is_sorted_before_merging() {
        let mut fx = Fixture::new();
        let a = fx.slot(monday(), 14, None);
        let b = fx.slot(monday(), 15, Some("Review"));
        let plan = merge_selection(&mut fx.store, &[b.id.clone(), a.id.clone()]).unwrap();
        assert_eq!(plan.survivor.id, a.id);
        assert_eq!(plan.survivor.task_id, b.task_id);
    }
}
