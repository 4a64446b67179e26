//! Slot grid: 7 logical days x 23 hourly cells.
//!
//! Adjacency follows grid order, not timestamps. Hour 23 and hour 0 of the same
//! logical day are neighbours even though they sit on different calendar dates.

use std::cmp::Ordering;
use std::fmt;

use chrono::{NaiveDate, Timelike, Weekday};
use serde::Serialize;

use crate::calendar::{self, GRID_HOURS, WEEK};
use crate::model::TimeSlot;

pub const HOURS_PER_DAY: usize = GRID_HOURS.len();
pub const CELLS_PER_WEEK: usize = HOURS_PER_DAY * WEEK.len();

/// Position of `hour` in grid order, or `None` for hours outside the grid.
pub fn grid_index(hour: u32) -> Option<usize> {
    GRID_HOURS.iter().position(|h| *h == hour)
}

/// Identity of one grid cell: a logical weekday and a grid hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct CellId {
    day: Weekday,
    hour: u32,
}

impl CellId {
    pub fn new(day: Weekday, hour: u32) -> Option<Self> {
        grid_index(hour).map(|_| Self { day, hour })
    }

    pub fn day(&self) -> Weekday {
        self.day
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn index(&self) -> usize {
        // hour was validated on construction
        grid_index(self.hour).unwrap_or(0)
    }

    /// The next cell of the same logical day, if any.
    pub fn successor(&self) -> Option<CellId> {
        GRID_HOURS
            .get(self.index() + 1)
            .map(|hour| CellId { day: self.day, hour: *hour })
    }
}

impl PartialOrd for CellId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.day
            .num_days_from_monday()
            .cmp(&other.day.num_days_from_monday())
            .then_with(|| self.index().cmp(&other.index()))
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}",
            calendar::weekday_name(self.day),
            calendar::hour_label(self.hour)
        )
    }
}

pub fn cell_id(day: Weekday, hour: u32) -> Option<CellId> {
    CellId::new(day, hour)
}

/// True iff `b` immediately follows `a` on the same logical day.
pub fn adjacent(a: CellId, b: CellId) -> bool {
    a.day == b.day && a.index() + 1 == b.index()
}

/// The 23 cells of one logical day, in grid order.
pub fn day_cells(day: Weekday) -> impl Iterator<Item = CellId> {
    GRID_HOURS.iter().map(move |hour| CellId { day, hour: *hour })
}

/// All 161 cells, day-major (Monday first) and hour-minor in grid order.
pub fn all_cells() -> Vec<CellId> {
    WEEK.iter().flat_map(|day| day_cells(*day)).collect()
}

/// The run of grid cells a persisted time slot covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridSpan {
    pub date: NaiveDate,
    pub first: usize,
    pub len: usize,
}

impl GridSpan {
    /// Locate a slot on the grid. Returns `None` when the slot does not start on
    /// a grid hour of its logical day, or runs past the last grid hour.
    pub fn of(slot: &TimeSlot) -> Option<GridSpan> {
        let start = slot.start;
        if start.minute() != 0 || start.second() != 0 {
            return None;
        }
        let first = grid_index(start.hour())?;
        if start.date() != calendar::calendar_date_for(slot.day, start.hour()) {
            return None;
        }

        let length = slot.end - slot.start;
        if length.num_seconds() <= 0 || length.num_seconds() % 3600 != 0 {
            return None;
        }
        let len = usize::try_from(length.num_hours()).ok()?;
        if first + len > HOURS_PER_DAY {
            return None;
        }

        Some(GridSpan { date: slot.day, first, len })
    }

    pub fn day(&self) -> Weekday {
        chrono::Datelike::weekday(&self.date)
    }

    /// Grid index one past the last covered hour.
    pub fn end(&self) -> usize {
        self.first + self.len
    }

    pub fn first_cell(&self) -> CellId {
        CellId { day: self.day(), hour: GRID_HOURS[self.first] }
    }

    pub fn cells(&self) -> impl Iterator<Item = CellId> + '_ {
        GRID_HOURS[self.first..self.end()]
            .iter()
            .map(move |hour| CellId { day: self.day(), hour: *hour })
    }

    pub fn covers(&self, date: NaiveDate, index: usize) -> bool {
        self.date == date && index >= self.first && index < self.end()
    }

    /// True iff `next` starts exactly where this span ends on the same logical day.
    pub fn precedes(&self, next: &GridSpan) -> bool {
        self.date == next.date && self.end() == next.first
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use proptest::prelude::*;

    fn slot(day: NaiveDate, hour: u32, hours: i64) -> TimeSlot {
        let start = calendar::cell_start(day, hour);
        TimeSlot {
            id: "slot-1".to_string(),
            user_id: "user-1".to_string(),
            day,
            start,
            end: start + Duration::hours(hours),
            task_id: None,
            merged: hours > 1,
        }
    }

    #[test]
    fn enumerates_161_cells_day_major() {
        let cells = all_cells();
        assert_eq!(cells.len(), CELLS_PER_WEEK);
        assert_eq!(cells.len(), 161);
        assert_eq!(cells[0], CellId::new(Weekday::Mon, 4).unwrap());
        assert_eq!(cells[22], CellId::new(Weekday::Mon, 2).unwrap());
        assert_eq!(cells[23], CellId::new(Weekday::Tue, 4).unwrap());
        assert_eq!(cells[160], CellId::new(Weekday::Sun, 2).unwrap());

        let mut sorted = cells.clone();
        sorted.sort();
        assert_eq!(sorted, cells);
    }

    #[test]
    fn hour_three_is_not_a_cell() {
        assert!(CellId::new(Weekday::Mon, 3).is_none());
        assert!(CellId::new(Weekday::Mon, 24).is_none());
    }

    #[test]
    fn adjacency_wraps_midnight_but_not_days() {
        let mon = |h| CellId::new(Weekday::Mon, h).unwrap();
        assert!(adjacent(mon(9), mon(10)));
        assert!(adjacent(mon(23), mon(0)));
        assert!(adjacent(mon(1), mon(2)));
        assert!(!adjacent(mon(10), mon(9)));
        assert!(!adjacent(mon(9), mon(11)));
        assert!(!adjacent(mon(2), CellId::new(Weekday::Tue, 4).unwrap()));
        assert!(!adjacent(mon(9), CellId::new(Weekday::Tue, 10).unwrap()));
        assert_eq!(mon(2).successor(), None);
        assert_eq!(mon(23).successor(), Some(mon(0)));
    }

    #[test]
    fn span_of_slot_across_midnight() {
        let mon = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let span = GridSpan::of(&slot(mon, 23, 2)).unwrap();
        assert_eq!(span.first, 19);
        assert_eq!(span.len, 2);
        let hours: Vec<u32> = span.cells().map(|c| c.hour()).collect();
        assert_eq!(hours, vec![23, 0]);
        assert!(span.covers(mon, 20));
        assert!(!span.covers(mon, 21));

        let next = GridSpan::of(&slot(mon, 1, 1)).unwrap();
        assert!(span.precedes(&next));
    }

    #[test]
    fn span_rejects_off_grid_slots() {
        let mon = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        // runs past 03:00
        assert!(GridSpan::of(&slot(mon, 2, 2)).is_none());

        // hour 0 placed on the anchor date instead of the following one
        let mut bad = slot(mon, 0, 1);
        bad.start = mon.and_hms_opt(0, 0, 0).unwrap();
        bad.end = bad.start + Duration::hours(1);
        assert!(GridSpan::of(&bad).is_none());
    }

    proptest! {
        #[test]
        fn successor_is_always_adjacent(day in 0usize..7, idx in 0usize..HOURS_PER_DAY) {
            let cell = CellId::new(WEEK[day], GRID_HOURS[idx]).unwrap();
            match cell.successor() {
                Some(next) => prop_assert!(adjacent(cell, next)),
                None => prop_assert_eq!(idx, HOURS_PER_DAY - 1),
            }
        }

        #[test]
        fn adjacency_is_never_symmetric(a in 0usize..CELLS_PER_WEEK, b in 0usize..CELLS_PER_WEEK) {
            let cells = all_cells();
            prop_assert!(!(adjacent(cells[a], cells[b]) && adjacent(cells[b], cells[a])));
        }
    }
}
