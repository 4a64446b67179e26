//! Built-in schedule used when generation output is unusable.

use chrono::Weekday;

use crate::model::{Category, EisenhowerCategory, Priority};
use crate::payload::{GeneratedEntry, GeneratedSchedule};

use Category as C;
use EisenhowerCategory as E;
use Priority as P;
use Weekday as W;

struct Sample {
    day: Weekday,
    hour: u32,
    title: &'static str,
    description: &'static str,
    priority: Priority,
    category: Category,
    eisenhower: EisenhowerCategory,
}

const fn sample(
    day: Weekday,
    hour: u32,
    title: &'static str,
    description: &'static str,
    priority: Priority,
    category: Category,
    eisenhower: EisenhowerCategory,
) -> Sample {
    Sample { day, hour, title, description, priority, category, eisenhower }
}

const SAMPLES: &[Sample] = &[
    sample(W::Mon, 8, "Morning Routine", "Start your day right with exercise and breakfast", P::High, C::Health, E::NotUrgentImportant),
    sample(W::Mon, 9, "Work Focus", "Main project work and planning", P::High, C::Work, E::UrgentImportant),
    sample(W::Mon, 12, "Lunch Break", "Healthy meal and rest", P::Medium, C::Break, E::NotUrgentImportant),
    sample(W::Mon, 14, "Afternoon Work", "Continue with project tasks", P::High, C::Work, E::UrgentImportant),
    sample(W::Tue, 8, "Exercise", "Fitness routine and stretching", P::High, C::Health, E::NotUrgentImportant),
    sample(W::Tue, 10, "Learning", "Skill development and training", P::Medium, C::Learning, E::NotUrgentImportant),
    sample(W::Tue, 13, "Work Session", "Focus on important tasks", P::High, C::Work, E::UrgentImportant),
    sample(W::Wed, 8, "Morning Routine", "Start your day with energy", P::High, C::Health, E::NotUrgentImportant),
    sample(W::Wed, 9, "Team Meeting", "Collaborate with team members", P::Medium, C::Work, E::UrgentNotImportant),
    sample(W::Wed, 11, "Deep Work", "Focus on complex tasks", P::High, C::Work, E::UrgentImportant),
    sample(W::Thu, 8, "Exercise", "Cardio and strength training", P::High, C::Health, E::NotUrgentImportant),
    sample(W::Thu, 10, "Learning", "Online course or reading", P::Medium, C::Learning, E::NotUrgentImportant),
    sample(W::Thu, 14, "Project Work", "Continue with ongoing projects", P::High, C::Work, E::UrgentImportant),
    sample(W::Fri, 8, "Morning Routine", "Prepare for productive day", P::High, C::Health, E::NotUrgentImportant),
    sample(W::Fri, 9, "Work Focus", "Complete weekly objectives", P::High, C::Work, E::UrgentImportant),
    sample(W::Fri, 16, "Week Review", "Plan and organize for next week", P::Medium, C::Personal, E::NotUrgentImportant),
    sample(W::Sat, 10, "Family Time", "Spend quality time with family", P::Medium, C::Family, E::NotUrgentImportant),
    sample(W::Sat, 14, "Personal Project", "Work on hobbies or interests", P::Low, C::Personal, E::NotUrgentNotImportant),
    sample(W::Sat, 18, "Relaxation", "Unwind and recharge", P::Low, C::Personal, E::NotUrgentNotImportant),
    sample(W::Sun, 10, "Rest and Planning", "Plan for next week and rest", P::Medium, C::Personal, E::NotUrgentImportant),
    sample(W::Sun, 16, "Preparation", "Prepare for the week ahead", P::Medium, C::Personal, E::NotUrgentImportant),
    sample(W::Sun, 20, "Evening Routine", "Set up for successful week", P::Low, C::Personal, E::NotUrgentNotImportant),
];

/// The fixed sample week, keyed by bare hour labels.
pub fn fallback_schedule() -> GeneratedSchedule {
    let mut schedule = GeneratedSchedule::new();
    for s in SAMPLES {
        schedule.insert(
            s.day,
            s.hour.to_string(),
            GeneratedEntry {
                title: s.title.to_string(),
                description: s.description.to_string(),
                priority: s.priority,
                category: s.category,
                eisenhower_category: s.eisenhower,
                duration: 1.0,
            },
        );
    }
    schedule
}

/// The sample week restricted to `days`.
pub fn fallback_for(days: &[Weekday]) -> GeneratedSchedule {
    let mut schedule = fallback_schedule();
    schedule.retain_days(days);
    schedule
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::WEEK;

    #[test]
    fn every_day_has_entries() {
        let schedule = fallback_schedule();
        assert_eq!(schedule.days(), WEEK.to_vec());
        assert_eq!(schedule.task_count(), 22);
    }

    #[test]
    fn monday_matches_fixed_samples() {
        let schedule = fallback_schedule();
        let titles: Vec<&str> = [8, 9, 12, 14]
            .into_iter()
            .filter_map(|h| schedule.entry(Weekday::Mon, h))
            .map(|e| e.title.as_str())
            .collect();
        assert_eq!(titles, ["Morning Routine", "Work Focus", "Lunch Break", "Afternoon Work"]);

        let lunch = schedule.entry(Weekday::Mon, 12).unwrap();
        assert_eq!(lunch.category, Category::Break);
        assert_eq!(lunch.priority, Priority::Medium);
    }

    #[test]
    fn restricted_to_requested_days() {
        let schedule = fallback_for(&[Weekday::Sat, Weekday::Sun]);
        assert_eq!(schedule.days(), vec![Weekday::Sat, Weekday::Sun]);
        assert!(schedule.entry(Weekday::Mon, 8).is_none());
        assert_eq!(schedule.entry(Weekday::Sun, 20).unwrap().title, "Evening Routine");
    }
}
