//! weekgrid-core: day-cycle calendar, slot grid, reconciliation and merging for
//! the weekly planner

pub mod calendar;
pub mod grid;
pub mod model;
pub mod quadrant;
pub mod payload;
pub mod fallback;
pub mod store;
pub mod reconcile;
pub mod merge;
pub mod planner;
pub mod schedule;
pub mod view;

pub use calendar::{
    anchor_date, days_to_schedule, grid_hours, hour_label, is_next_calendar_date, logical_day_of,
    week_start, weekday_name, DAY_START_HOUR, GRID_HOURS, WEEK,
};
pub use grid::{adjacent, all_cells, cell_id, CellId, GridSpan, CELLS_PER_WEEK, HOURS_PER_DAY};
pub use model::{
    Category, EisenhowerCategory, EntityType, HistoryAction, HistoryDraft, HistoryEntry, Priority,
    ScheduleDraft, Task, TaskDraft, TimeSlot, TimeSlotDraft, User, WeeklySchedule,
};
pub use quadrant::{group_by_quadrant, quadrant_of_label, quadrant_title, QUADRANTS};
pub use payload::{parse_or_fallback, parse_schedule, GeneratedEntry, GeneratedSchedule, PayloadError};
pub use fallback::{fallback_for, fallback_schedule};
pub use store::{MemoryStore, ScheduleFilter, SlotFilter, Store, StoreError, StoreResult, TaskFilter};
pub use reconcile::{reconcile, reconcile_from_store, reconcile_text, ReconcileError, Reconciliation};
pub use merge::{merge_range, merge_selection, merge_with_next, plan_merge, MergeError, MergePlan};
pub use planner::{Planner, PlannerError, PlannerResult, TaskEdit};
pub use schedule::{CleanupPolicy, CleanupReport, Installed};
pub use view::{matrix_view, slot_label, GridView, QuadrantView, ScheduleStats};
