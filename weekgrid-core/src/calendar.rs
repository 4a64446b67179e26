//! Day-cycle calendar.
//!
//! A logical day starts at 04:00 and runs through the 02:00 hour of the next
//! calendar date. Hours 0, 1 and 2 therefore sit on the calendar date after the
//! logical day's anchor date while still being grouped under the same weekday.
//! Hour 3 belongs to no grid cell.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};

/// First hour of a logical day.
pub const DAY_START_HOUR: u32 = 4;

/// The 23 bookable hours of a logical day, in grid order.
pub const GRID_HOURS: [u32; 23] = [
    4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 0, 1, 2,
];

/// Logical days in display order (Monday first).
pub const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

pub fn grid_hours() -> &'static [u32] {
    &GRID_HOURS
}

/// True for the hours that fall on the calendar date after the anchor date.
pub fn is_next_calendar_date(hour: u32) -> bool {
    hour <= 2
}

pub fn is_grid_hour(hour: u32) -> bool {
    hour < 24 && hour != 3
}

/// Anchor date of the logical day a wall-clock timestamp belongs to.
///
/// Anything before 04:00 still belongs to the previous logical day, including
/// the off-grid 03:00 hour.
pub fn logical_date_of(ts: NaiveDateTime) -> NaiveDate {
    if ts.hour() < DAY_START_HOUR {
        ts.date() - Duration::days(1)
    } else {
        ts.date()
    }
}

pub fn logical_day_of(ts: NaiveDateTime) -> Weekday {
    logical_date_of(ts).weekday()
}

/// Next occurrence of `day` on or after `today`.
pub fn anchor_date(today: NaiveDate, day: Weekday) -> NaiveDate {
    let ahead = (day.num_days_from_monday() + 7 - today.weekday().num_days_from_monday()) % 7;
    today + Duration::days(i64::from(ahead))
}

/// Calendar date a grid hour lands on for a logical day anchored at `anchor`.
pub fn calendar_date_for(anchor: NaiveDate, hour: u32) -> NaiveDate {
    if is_next_calendar_date(hour) {
        anchor + Duration::days(1)
    } else {
        anchor
    }
}

/// Wall-clock start of the grid hour `hour` for the logical day at `anchor`.
pub fn cell_start(anchor: NaiveDate, hour: u32) -> NaiveDateTime {
    calendar_date_for(anchor, hour).and_time(NaiveTime::MIN) + Duration::hours(i64::from(hour))
}

pub fn cell_end(anchor: NaiveDate, hour: u32) -> NaiveDateTime {
    cell_start(anchor, hour) + Duration::hours(1)
}

/// Monday of the week containing `today`.
pub fn week_start(today: NaiveDate) -> NaiveDate {
    today - Duration::days(i64::from(today.weekday().num_days_from_monday()))
}

/// Weekdays from `today` through the upcoming Sunday, inclusive.
pub fn days_to_schedule(today: NaiveDate) -> Vec<Weekday> {
    let from = today.weekday().num_days_from_monday() as usize;
    WEEK[from..].to_vec()
}

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Parse a full weekday name, ignoring case and surrounding whitespace.
pub fn parse_weekday(name: &str) -> Option<Weekday> {
    let lowered = name.trim().to_lowercase();
    WEEK.into_iter()
        .find(|d| weekday_name(*d).to_lowercase() == lowered)
}

/// Display label for an hour of day: `12am`, `9am`, `12pm`, `5pm`.
pub fn hour_label(hour: u32) -> String {
    match hour {
        0 => "12am".to_string(),
        12 => "12pm".to_string(),
        h if h > 12 => format!("{}pm", h - 12),
        h => format!("{h}am"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        date(y, m, d).and_hms_opt(h, 0, 0).unwrap()
    }

    #[test]
    fn grid_has_23_hours_and_skips_3am() {
        assert_eq!(grid_hours().len(), 23);
        assert_eq!(grid_hours()[0], 4);
        assert_eq!(grid_hours()[19], 23);
        assert_eq!(&grid_hours()[20..], &[0, 1, 2]);
        assert!(!grid_hours().contains(&3));
        assert!(!is_grid_hour(3));
        assert!(!is_grid_hour(24));
    }

    #[test]
    fn early_hours_belong_to_next_calendar_date() {
        for h in [0, 1, 2] {
            assert!(is_next_calendar_date(h));
        }
        for h in 4..24 {
            assert!(!is_next_calendar_date(h));
        }

        // 2026-10-19 is a Monday.
        let anchor = date(2026, 10, 19);
        assert_eq!(cell_start(anchor, 23), at(2026, 10, 19, 23));
        assert_eq!(cell_start(anchor, 0), at(2026, 10, 20, 0));
        assert_eq!(cell_end(anchor, 2), at(2026, 10, 20, 3));
    }

    #[test]
    fn late_night_stays_on_previous_logical_day() {
        assert_eq!(logical_day_of(at(2026, 10, 20, 1)), Weekday::Mon);
        assert_eq!(logical_day_of(at(2026, 10, 20, 3)), Weekday::Mon);
        assert_eq!(logical_day_of(at(2026, 10, 20, 4)), Weekday::Tue);
        assert_eq!(logical_date_of(at(2026, 10, 20, 2)), date(2026, 10, 19));
    }

    #[test]
    fn anchor_is_same_day_or_next_occurrence() {
        let wed = date(2026, 10, 21);
        assert_eq!(anchor_date(wed, Weekday::Wed), wed);
        assert_eq!(anchor_date(wed, Weekday::Fri), date(2026, 10, 23));
        assert_eq!(anchor_date(wed, Weekday::Mon), date(2026, 10, 26));
        assert_eq!(anchor_date(wed, Weekday::Tue), date(2026, 10, 27));
    }

    #[test]
    fn days_to_schedule_runs_through_sunday() {
        let wed = date(2026, 10, 21);
        assert_eq!(
            days_to_schedule(wed),
            vec![Weekday::Wed, Weekday::Thu, Weekday::Fri, Weekday::Sat, Weekday::Sun]
        );
        let sun = date(2026, 10, 25);
        assert_eq!(days_to_schedule(sun), vec![Weekday::Sun]);
        assert_eq!(days_to_schedule(date(2026, 10, 19)).len(), 7);
    }

    #[test]
    fn week_start_is_monday() {
        assert_eq!(week_start(date(2026, 10, 25)), date(2026, 10, 19));
        assert_eq!(week_start(date(2026, 10, 19)), date(2026, 10, 19));
    }

    #[test]
    fn weekday_names_round_trip() {
        for d in WEEK {
            assert_eq!(parse_weekday(weekday_name(d)), Some(d));
        }
        assert_eq!(parse_weekday("  monday "), Some(Weekday::Mon));
        assert_eq!(parse_weekday("Mon"), None);
    }

    #[test]
    fn hour_labels() {
        assert_eq!(hour_label(0), "12am");
        assert_eq!(hour_label(9), "9am");
        assert_eq!(hour_label(12), "12pm");
        assert_eq!(hour_label(14), "2pm");
    }
}
