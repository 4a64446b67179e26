//! Read models for the grid and matrix views.

use std::collections::HashMap;

use chrono::{NaiveDate, Timelike, Weekday};
use serde::Serialize;

use crate::calendar::{self, GRID_HOURS, WEEK};
use crate::grid::{self, CellId};
use crate::model::{Priority, Task, TimeSlot};
use crate::quadrant;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridCell {
    pub cell: CellId,
    pub slot_id: Option<String>,
    pub task: Option<Task>,
    /// True for cells after the first one of a merged slot.
    pub continuation: bool,
    /// Hours covered by the slot, when this is its first cell.
    pub span_hours: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridRow {
    pub hour: u32,
    pub label: String,
    /// One cell per logical day, Monday first.
    pub cells: Vec<GridCell>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridView {
    /// Logical days with their anchor dates, Monday first.
    pub days: Vec<(Weekday, NaiveDate)>,
    pub rows: Vec<GridRow>,
}

impl GridView {
    /// Lay out `slots` on the week as seen from `today`.
    pub fn build(today: NaiveDate, slots: &[TimeSlot], tasks: &[Task]) -> Self {
        let by_id: HashMap<&str, &Task> = tasks.iter().map(|t| (t.id.as_str(), t)).collect();
        let days: Vec<(Weekday, NaiveDate)> = WEEK
            .iter()
            .map(|d| (*d, calendar::anchor_date(today, *d)))
            .collect();

        let columns: Vec<Vec<GridCell>> = days
            .iter()
            .map(|(day, anchor)| {
                grid::day_cells(*day)
                    .map(|cell| place(cell, *anchor, slots, &by_id))
                    .collect()
            })
            .collect();

        let rows = GRID_HOURS
            .iter()
            .enumerate()
            .map(|(index, hour)| GridRow {
                hour: *hour,
                label: calendar::hour_label(*hour),
                cells: columns.iter().map(|column| column[index].clone()).collect(),
            })
            .collect();

        GridView { days, rows }
    }
}

fn place(cell: CellId, anchor: NaiveDate, slots: &[TimeSlot], tasks: &HashMap<&str, &Task>) -> GridCell {
    let index = cell.index();
    let found = slots.iter().find_map(|s| {
        let span = s.span()?;
        span.covers(anchor, index).then_some((s, span))
    });
    match found {
        Some((slot, span)) => GridCell {
            cell,
            slot_id: Some(slot.id.clone()),
            task: slot
                .task_id
                .as_deref()
                .and_then(|id| tasks.get(id))
                .map(|t| (*t).clone()),
            continuation: span.first != index,
            span_hours: if span.first == index { span.len as i64 } else { 0 },
        },
        None => GridCell { cell, slot_id: None, task: None, continuation: false, span_hours: 0 },
    }
}

/// `9am-12pm` style label for a slot.
pub fn slot_label(slot: &TimeSlot) -> String {
    format!(
        "{}-{}",
        calendar::hour_label(slot.start.hour()),
        calendar::hour_label(slot.end.hour())
    )
}

/// Counters shown above the grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScheduleStats {
    pub scheduled: usize,
    pub completed: usize,
    pub high_priority: usize,
    pub merged: usize,
    pub pending: usize,
}

impl ScheduleStats {
    pub fn from_slots(slots: &[TimeSlot], tasks: &[Task]) -> Self {
        let by_id: HashMap<&str, &Task> = tasks.iter().map(|t| (t.id.as_str(), t)).collect();
        let mut stats = ScheduleStats::default();
        for slot in slots {
            if slot.merged {
                stats.merged += 1;
            }
            let Some(task) = slot.task_id.as_deref().and_then(|id| by_id.get(id)) else {
                continue;
            };
            stats.scheduled += 1;
            if task.completed {
                stats.completed += 1;
            } else {
                stats.pending += 1;
            }
            if task.priority == Priority::High {
                stats.high_priority += 1;
            }
        }
        stats
    }
}

/// One matrix quadrant with its tasks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuadrantView {
    pub quadrant: u8,
    pub title: &'static str,
    pub tasks: Vec<Task>,
}

impl QuadrantView {
    pub fn pending(&self) -> usize {
        self.tasks.iter().filter(|t| !t.completed).count()
    }
}

pub fn matrix_view(tasks: &[Task]) -> Vec<QuadrantView> {
    quadrant::group_by_quadrant(tasks)
        .into_iter()
        .zip(quadrant::QUADRANTS)
        .map(|(tasks, q)| QuadrantView {
            quadrant: q,
            title: quadrant::quadrant_title(q),
            tasks: tasks.into_iter().cloned().collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EisenhowerCategory, TaskDraft, TimeSlotDraft};
    use crate::store::{MemoryStore, Store, TaskFilter};

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    #[test]
    fn grid_shows_merged_slot_once() {
        let mut store = MemoryStore::new();
        let user = store.create_user("demo@example.com", "Demo").unwrap().id;
        let task = store.create_task(&user, TaskDraft::new("Deep work")).unwrap();
        let mut slot = store
            .create_time_slot(&user, TimeSlotDraft::for_cell(monday(), 9, Some(task.id.clone())))
            .unwrap();
        slot.end = calendar::cell_end(monday(), 11);
        slot.merged = true;
        let slot = store.update_time_slot(&slot).unwrap();

        let view = GridView::build(monday(), &[slot.clone()], &[task]);
        assert_eq!(view.rows.len(), 23);
        assert_eq!(view.days.len(), 7);
        let nine = &view.rows[5].cells[0];
        assert_eq!(nine.span_hours, 3);
        assert_eq!(nine.task.as_ref().unwrap().title, "Deep work");
        assert!(view.rows[6].cells[0].continuation);
        assert!(view.rows[7].cells[0].continuation);
        assert!(!view.rows[8].cells[0].continuation);
        assert_eq!(view.rows[8].cells[0].slot_id, None);
        assert_eq!(slot_label(&slot), "9am-12pm");
    }

    #[test]
    fn stats_count_tasks_in_slots() {
        let mut store = MemoryStore::new();
        let user = store.create_user("demo@example.com", "Demo").unwrap().id;
        let hi = store
            .create_task(&user, TaskDraft::new("Ship").with_priority(Priority::High))
            .unwrap();
        let mut done = store.create_task(&user, TaskDraft::new("Email")).unwrap();
        done.completed = true;
        store.update_task(&done).unwrap();
        let slots = vec![
            store.create_time_slot(&user, TimeSlotDraft::for_cell(monday(), 9, Some(hi.id.clone()))).unwrap(),
            store.create_time_slot(&user, TimeSlotDraft::for_cell(monday(), 10, Some(done.id.clone()))).unwrap(),
            store.create_time_slot(&user, TimeSlotDraft::for_cell(monday(), 11, None)).unwrap(),
        ];
        let tasks = store.list_tasks(&TaskFilter::for_user(&user)).unwrap();
        let stats = ScheduleStats::from_slots(&slots, &tasks);
        assert_eq!(
            stats,
            ScheduleStats { scheduled: 2, completed: 1, high_priority: 1, merged: 0, pending: 1 }
        );
    }

    #[test]
    fn matrix_groups_into_four_quadrants() {
        let mut store = MemoryStore::new();
        let user = store.create_user("demo@example.com", "Demo").unwrap().id;
        store
            .create_task(&user, TaskDraft::new("Fire").with_eisenhower(EisenhowerCategory::UrgentImportant))
            .unwrap();
        store.create_task(&user, TaskDraft::new("Scroll")).unwrap();
        let tasks = store.list_tasks(&TaskFilter::for_user(&user)).unwrap();
        let matrix = matrix_view(&tasks);
        assert_eq!(matrix.len(), 4);
        assert_eq!(matrix[0].tasks[0].title, "Fire");
        assert_eq!(matrix[3].tasks[0].title, "Scroll");
        assert_eq!(matrix[3].title, "Not Urgent + Not Important");
        assert!(matrix[1].tasks.is_empty());
    }
}
