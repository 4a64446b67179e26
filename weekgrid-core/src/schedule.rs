//! Weekly schedules: install a generated week, replace an existing one, and
//! clean up a schedule's slots.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::calendar;
use crate::model::{EntityType, HistoryAction, HistoryDraft, ScheduleDraft, WeeklySchedule};
use crate::payload::{GeneratedSchedule, PayloadError};
use crate::planner::{Planner, PlannerError, PlannerResult};
use crate::reconcile::{self, Reconciliation};
use crate::store::{ScheduleFilter, Store, StoreError};

/// What to do when deleting a schedule's slots hits an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CleanupPolicy {
    /// Keep going; slots already gone count as deleted, other failures are reported.
    #[default]
    BestEffort,
    /// Check every slot first, then stop at the first failed delete.
    AllOrNothing,
}

impl CleanupPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CleanupPolicy::BestEffort => "best-effort",
            CleanupPolicy::AllOrNothing => "all-or-nothing",
        }
    }
}

impl fmt::Display for CleanupPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CleanupPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "best-effort" => Ok(CleanupPolicy::BestEffort),
            "all-or-nothing" => Ok(CleanupPolicy::AllOrNothing),
            other => Err(format!("unknown cleanup policy: {other}")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub schedule_id: String,
    pub deleted_slots: usize,
    /// Slots that were already gone.
    pub missing_slots: usize,
    /// Slots that could not be deleted (best-effort only).
    pub failed: Vec<(String, StoreError)>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Installed {
    pub schedule: WeeklySchedule,
    pub reconciliation: Reconciliation,
    pub replaced: Vec<CleanupReport>,
}

impl Installed {
    pub fn task_count(&self) -> usize {
        self.reconciliation.task_ids().len()
    }
}

impl<S: Store> Planner<S> {
    pub fn schedules(&self) -> PlannerResult<Vec<WeeklySchedule>> {
        Ok(self.store().list_schedules(&ScheduleFilter::for_user(self.user_id()))?)
    }

    /// The schedule already recorded for the week containing `today`, if any.
    pub fn schedule_for_week(&self, today: NaiveDate) -> PlannerResult<Option<WeeklySchedule>> {
        let filter = ScheduleFilter::for_user(self.user_id()).week(calendar::week_start(today));
        Ok(self.store().list_schedules(&filter)?.into_iter().next())
    }

    /// Materialize `schedule` for the week containing `today` and record it.
    ///
    /// An existing schedule for the same week blocks the install unless
    /// `replace` is set, in which case it is cleaned up under `policy` first.
    pub fn install_schedule(
        &mut self,
        goals: &str,
        schedule: &GeneratedSchedule,
        fallback: Option<PayloadError>,
        today: NaiveDate,
        replace: bool,
        policy: CleanupPolicy,
    ) -> PlannerResult<Installed> {
        let goals = goals.trim();
        if goals.is_empty() {
            return Err(PlannerError::Missing("goals"));
        }

        let week_start = calendar::week_start(today);
        let existing = self
            .store()
            .list_schedules(&ScheduleFilter::for_user(self.user_id()).week(week_start))?;
        let mut replaced = Vec::new();
        if let Some(first) = existing.first() {
            if !replace {
                return Err(PlannerError::ScheduleExists {
                    schedule_id: first.id.clone(),
                    week_start,
                });
            }
            for old in &existing {
                replaced.push(self.delete_schedule(&old.id, policy)?);
            }
        }

        let user_id = self.user_id().to_string();
        let mut reconciliation = reconcile::reconcile_from_store(self.store_mut(), &user_id, schedule, today)?;
        reconciliation.fallback = fallback;

        let saved = self.store_mut().create_schedule(
            &user_id,
            ScheduleDraft {
                week_start,
                goals: goals.to_string(),
                time_slot_ids: reconciliation.slot_ids(),
            },
        )?;
        let task_count = reconciliation.task_ids().len();
        self.record(
            HistoryDraft::new(
                HistoryAction::Create,
                EntityType::Task,
                &saved.id,
                format!("Created weekly schedule with {task_count} tasks based on goals: {goals}"),
            )
            .with_schedule(&saved.id)
            .with_to(json!({ "scheduleId": saved.id, "taskCount": task_count })),
        )?;
        info!(schedule_id = %saved.id, %week_start, task_count, "installed weekly schedule");

        Ok(Installed { schedule: saved, reconciliation, replaced })
    }

    /// Delete a schedule's slots, then the schedule itself.
    pub fn delete_schedule(&mut self, schedule_id: &str, policy: CleanupPolicy) -> PlannerResult<CleanupReport> {
        let schedule = self.store().get_schedule(schedule_id)?;
        if schedule.user_id != self.user_id() {
            return Err(StoreError::not_found("schedule", schedule_id).into());
        }
        let report = match policy {
            CleanupPolicy::BestEffort => self.cleanup_best_effort(&schedule),
            CleanupPolicy::AllOrNothing => self.cleanup_all_or_nothing(&schedule)?,
        };
        if !report.is_clean() {
            warn!(
                schedule_id = %schedule.id,
                failed = report.failed.len(),
                "some slots could not be deleted"
            );
        }

        self.store_mut().delete_schedule(&schedule.id)?;
        self.record(
            HistoryDraft::new(
                HistoryAction::Delete,
                EntityType::TimeSlot,
                &schedule.id,
                format!(
                    "Deleted weekly schedule for {} ({} slots removed)",
                    schedule.week_start, report.deleted_slots
                ),
            )
            .with_schedule(&schedule.id)
            .with_from(json!({ "goals": schedule.goals, "slotCount": schedule.time_slot_ids.len() })),
        )?;
        Ok(report)
    }

    fn cleanup_best_effort(&mut self, schedule: &WeeklySchedule) -> CleanupReport {
        let mut report = CleanupReport { schedule_id: schedule.id.clone(), ..CleanupReport::default() };
        for id in &schedule.time_slot_ids {
            match self.store_mut().delete_time_slot(id) {
                Ok(_) => report.deleted_slots += 1,
                Err(err) if err.is_not_found() => report.missing_slots += 1,
                Err(err) => {
                    warn!(slot_id = %id, error = %err, "slot delete failed; continuing");
                    report.failed.push((id.clone(), err));
                }
            }
        }
        report
    }

    fn cleanup_all_or_nothing(&mut self, schedule: &WeeklySchedule) -> PlannerResult<CleanupReport> {
        let total = schedule.time_slot_ids.len();
        for id in &schedule.time_slot_ids {
            self.store()
                .get_time_slot(id)
                .map_err(|source| PlannerError::CleanupAborted { deleted: 0, total, source })?;
        }

        let mut report = CleanupReport { schedule_id: schedule.id.clone(), ..CleanupReport::default() };
        for id in &schedule.time_slot_ids {
            self.store_mut()
                .delete_time_slot(id)
                .map_err(|source| PlannerError::CleanupAborted {
                    deleted: report.deleted_slots,
                    total,
                    source,
                })?;
            report.deleted_slots += 1;
        }
        Ok(report)
    }
}
