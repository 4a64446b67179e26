//! Tolerant parser for generated schedules.
//!
//! The model's reply is free text that usually contains one JSON object keyed
//! by weekday name, then by an hour label. Everything untyped stops here:
//! callers only ever see `GeneratedSchedule` with normalized fields.

use std::collections::{BTreeMap, HashMap};

use chrono::Weekday;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::calendar::{self, WEEK};
use crate::fallback;
use crate::model::{Category, EisenhowerCategory, Priority, TaskDraft};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("no JSON object found in generated text")]
    NoJsonObject,
    #[error("generated JSON is invalid: {0}")]
    InvalidJson(String),
    #[error("generated JSON is not an object")]
    NotAnObject,
    #[error("generated JSON has no weekday keys")]
    NoDayKeys,
    #[error("extraction pattern: {0}")]
    Pattern(String),
    /// The model never produced text to parse.
    #[error("generation failed: {0}")]
    Upstream(String),
}

/// One generated task, already normalized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedEntry {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub category: Category,
    pub eisenhower_category: EisenhowerCategory,
    pub duration: f64,
}

impl GeneratedEntry {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            priority: Priority::Medium,
            category: Category::General,
            eisenhower_category: EisenhowerCategory::NotUrgentNotImportant,
            duration: 1.0,
        }
    }

    /// Build from one raw JSON entry, applying the defaulting rules.
    pub fn from_value(value: &Map<String, Value>) -> Self {
        let text = |key: &str| {
            value
                .get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
        };

        let title = text("title")
            .or_else(|| text("task"))
            .unwrap_or("Generated Task")
            .to_string();
        let duration = value
            .get("duration")
            .and_then(Value::as_f64)
            .filter(|d| d.is_finite() && *d > 0.0)
            .unwrap_or(1.0);

        Self {
            title,
            description: text("description").unwrap_or_default().to_string(),
            priority: text("priority").map_or(Priority::Medium, Priority::normalize),
            category: text("category").map_or(Category::General, Category::normalize),
            eisenhower_category: text("eisenhowerCategory")
                .or_else(|| text("eisenhower_category"))
                .map_or(EisenhowerCategory::NotUrgentNotImportant, EisenhowerCategory::normalize),
            duration,
        }
    }

    pub fn to_draft(&self) -> TaskDraft {
        TaskDraft::new(self.title.clone())
            .with_description(self.description.clone())
            .with_priority(self.priority)
            .with_category(self.category)
            .with_eisenhower(self.eisenhower_category)
            .with_duration(self.duration)
    }
}

/// Weekday -> hour -> entry. Each label is resolved to one hour when it is
/// inserted (see [`label_hour`]); two labels naming the same hour keep the one
/// with the lower spelling rank.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneratedSchedule {
    days: HashMap<Weekday, BTreeMap<u32, Placed>>,
}

#[derive(Debug, Clone, PartialEq)]
struct Placed {
    rank: u8,
    entry: GeneratedEntry,
}

impl GeneratedSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Labels that name no hour are dropped; the day is still listed.
    pub fn insert(&mut self, day: Weekday, label: impl Into<String>, entry: GeneratedEntry) {
        let label = label.into();
        let by_hour = self.days.entry(day).or_default();
        let Some((hour, rank)) = label_hour(&label) else {
            debug!(?day, label = %label, "ignoring unreadable hour label");
            return;
        };
        if by_hour.get(&hour).is_some_and(|held| held.rank <= rank) {
            debug!(?day, hour, label = %label, "hour already taken by a preferred spelling");
            return;
        }
        by_hour.insert(hour, Placed { rank, entry });
    }

    pub fn with(mut self, day: Weekday, label: impl Into<String>, entry: GeneratedEntry) -> Self {
        self.insert(day, label, entry);
        self
    }

    /// Entry for a grid cell.
    pub fn entry(&self, day: Weekday, hour: u32) -> Option<&GeneratedEntry> {
        self.days.get(&day)?.get(&hour).map(|p| &p.entry)
    }

    pub fn days(&self) -> Vec<Weekday> {
        WEEK.into_iter().filter(|d| self.days.contains_key(d)).collect()
    }

    /// Drop every weekday not in `keep`.
    pub fn retain_days(&mut self, keep: &[Weekday]) {
        self.days.retain(|day, _| keep.contains(day));
    }

    pub fn is_empty(&self) -> bool {
        self.days.values().all(BTreeMap::is_empty)
    }

    /// Number of grid cells that resolve to an entry.
    pub fn task_count(&self) -> usize {
        WEEK.iter()
            .map(|day| {
                calendar::GRID_HOURS
                    .iter()
                    .filter(|h| self.entry(*day, **h).is_some())
                    .count()
            })
            .sum()
    }
}

/// The single hour an hour label names, with its spelling rank.
///
/// Ranks follow the lookup order `H`, `H:00`, `Ham`, `Hpm`, `H:00am`, `H:00pm`
/// (0 through 5). Case and inner spaces are ignored and a leading zero is
/// allowed. With a suffix, 1 through 12 read as a 12-hour clock (`2pm` is 14,
/// `12am` is 0); any other number keeps its 24-hour value, so `14pm` is 14.
pub fn label_hour(label: &str) -> Option<(u32, u8)> {
    let norm: String = label
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();

    let (body, pm) = match (norm.strip_suffix("am"), norm.strip_suffix("pm")) {
        (Some(body), _) => (body, Some(false)),
        (_, Some(body)) => (body, Some(true)),
        _ => (norm.as_str(), None),
    };
    let (digits, on_the_hour) = match body.strip_suffix(":00") {
        Some(digits) => (digits, true),
        None => (body, false),
    };
    if digits.is_empty() || digits.len() > 2 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let n: u32 = digits.parse().ok()?;

    let hour = match (pm, n) {
        (Some(false), 12) => 0,
        (Some(true), 1..=11) => n + 12,
        _ => n,
    };
    if hour > 23 {
        return None;
    }
    let rank = match (pm, on_the_hour) {
        (None, false) => 0,
        (None, true) => 1,
        (Some(false), false) => 2,
        (Some(true), false) => 3,
        (Some(false), true) => 4,
        (Some(true), true) => 5,
    };
    Some((hour, rank))
}

/// Parse generated text into a schedule.
pub fn parse_schedule(text: &str) -> Result<GeneratedSchedule, PayloadError> {
    // greedy: first '{' through last '}'
    let object_re = Regex::new(r"(?s)\{.*\}").map_err(|e| PayloadError::Pattern(e.to_string()))?;
    let found = object_re.find(text).ok_or(PayloadError::NoJsonObject)?;
    let value: Value = serde_json::from_str(found.as_str())
        .map_err(|e| PayloadError::InvalidJson(e.to_string()))?;
    let root = value.as_object().ok_or(PayloadError::NotAnObject)?;

    let mut schedule = GeneratedSchedule::new();
    let mut saw_day = false;
    for (key, day_value) in root {
        let Some(day) = calendar::parse_weekday(key) else {
            debug!(key = %key, "ignoring non-weekday key in generated payload");
            continue;
        };
        let Some(hours) = day_value.as_object() else { continue };
        saw_day = true;
        schedule.days.entry(day).or_default();
        for (label, raw) in hours {
            match raw.as_object() {
                Some(fields) => schedule.insert(day, label.trim(), GeneratedEntry::from_value(fields)),
                None => debug!(day = %key, label = %label, "skipping non-object entry"),
            }
        }
    }

    if !saw_day {
        return Err(PayloadError::NoDayKeys);
    }
    Ok(schedule)
}

/// Parse, or substitute the built-in schedule. The second value carries the
/// reason the generated text was unusable.
pub fn parse_or_fallback(text: &str) -> (GeneratedSchedule, Option<PayloadError>) {
    match parse_schedule(text) {
        Ok(schedule) => (schedule, None),
        Err(err) => {
            warn!(error = %err, "generated schedule unusable; using fallback");
            (fallback::fallback_schedule(), Some(err))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_json_from_surrounding_prose() {
        let text = "Sure! Here is your plan:\n```json\n{\"Monday\": {\"9\": {\"title\": \"Finish report\", \"priority\": \"high\"}}}\n```\nGood luck.";
        let schedule = parse_schedule(text).unwrap();
        let entry = schedule.entry(Weekday::Mon, 9).unwrap();
        assert_eq!(entry.title, "Finish report");
        assert_eq!(entry.priority, Priority::High);
        assert_eq!(entry.category, Category::General);
        assert_eq!(entry.duration, 1.0);
    }

    #[test]
    fn rejects_unusable_payloads() {
        assert_eq!(parse_schedule("not json"), Err(PayloadError::NoJsonObject));
        assert!(matches!(parse_schedule("{not: json}"), Err(PayloadError::InvalidJson(_))));
        assert_eq!(parse_schedule(r#"{"foo": {"9": {}}}"#), Err(PayloadError::NoDayKeys));
        assert_eq!(parse_schedule(r#"{"Monday": "busy"}"#), Err(PayloadError::NoDayKeys));
    }

    #[test]
    fn label_spellings_and_ranks() {
        assert_eq!(label_hour("9"), Some((9, 0)));
        assert_eq!(label_hour("9:00"), Some((9, 1)));
        assert_eq!(label_hour("9am"), Some((9, 2)));
        assert_eq!(label_hour("9pm"), Some((21, 3)));
        assert_eq!(label_hour("9:00am"), Some((9, 4)));
        assert_eq!(label_hour("9:00 PM"), Some((21, 5)));
        assert_eq!(label_hour("09"), Some((9, 0)));
        assert_eq!(label_hour("12am"), Some((0, 2)));
        assert_eq!(label_hour("12pm"), Some((12, 3)));
        assert_eq!(label_hour("14pm"), Some((14, 3)));
        assert_eq!(label_hour("0"), Some((0, 0)));
        assert_eq!(label_hour("24"), None);
        assert_eq!(label_hour("9:30"), None);
        assert_eq!(label_hour("noon"), None);
        assert_eq!(label_hour(""), None);
    }

    #[test]
    fn bare_label_beats_colon_form() {
        let text = r#"{"Tuesday": {"14:00": {"title": "B"}, "14": {"title": "A"}}}"#;
        let schedule = parse_schedule(text).unwrap();
        assert_eq!(schedule.entry(Weekday::Tue, 14).unwrap().title, "A");
        assert_eq!(schedule.task_count(), 1);
    }

    #[test]
    fn each_label_lands_in_one_cell() {
        let text = r#"{"Friday": {"2pm": {"title": "Review"}, "12am": {"title": "Sleep"}, "5pm": {"title": "Gym"}}}"#;
        let schedule = parse_schedule(text).unwrap();
        assert_eq!(schedule.entry(Weekday::Fri, 14).unwrap().title, "Review");
        assert_eq!(schedule.entry(Weekday::Fri, 0).unwrap().title, "Sleep");
        assert_eq!(schedule.entry(Weekday::Fri, 17).unwrap().title, "Gym");
        assert!(schedule.entry(Weekday::Fri, 2).is_none());
        assert!(schedule.entry(Weekday::Fri, 5).is_none());
        assert!(schedule.entry(Weekday::Fri, 12).is_none());
        assert_eq!(schedule.task_count(), 3);
    }

    #[test]
    fn unreadable_labels_keep_the_day() {
        let schedule = parse_schedule(r#"{"Saturday": {"lunch": {"title": "Eat"}}}"#).unwrap();
        assert_eq!(schedule.days(), vec![Weekday::Sat]);
        assert!(schedule.is_empty());
    }

    #[test]
    fn title_and_field_defaulting() {
        let text = r#"{"Monday": {
            "8": {"task": "Stretch", "category": "Blorp", "eisenhowerCategory": "soon", "duration": -2},
            "9": {"priority": "low", "duration": 1.5}
        }}"#;
        let schedule = parse_schedule(text).unwrap();
        let a = schedule.entry(Weekday::Mon, 8).unwrap();
        assert_eq!(a.title, "Stretch");
        assert_eq!(a.category, Category::General);
        assert_eq!(a.eisenhower_category, EisenhowerCategory::NotUrgentNotImportant);
        assert_eq!(a.duration, 1.0);
        let b = schedule.entry(Weekday::Mon, 9).unwrap();
        assert_eq!(b.title, "Generated Task");
        assert_eq!(b.priority, Priority::Low);
        assert_eq!(b.duration, 1.5);
    }

    #[test]
    fn retain_days_and_counts() {
        let text = r#"{"Monday": {"8": {"title": "A"}}, "Sunday": {"10": {"title": "B"}, "3": {"title": "off grid"}}}"#;
        let mut schedule = parse_schedule(text).unwrap();
        assert_eq!(schedule.days(), vec![Weekday::Mon, Weekday::Sun]);
        // hour 3 has no cell
        assert_eq!(schedule.task_count(), 2);
        schedule.retain_days(&[Weekday::Sun]);
        assert_eq!(schedule.days(), vec![Weekday::Sun]);
        assert_eq!(schedule.task_count(), 1);
    }

    #[test]
    fn fallback_reports_reason() {
        let (schedule, reason) = parse_or_fallback("not json");
        assert_eq!(reason, Some(PayloadError::NoJsonObject));
        assert_eq!(schedule.entry(Weekday::Mon, 8).unwrap().title, "Morning Routine");

        let (_, reason) = parse_or_fallback(r#"{"Monday": {}}"#);
        assert_eq!(reason, None);
    }
}
