//! Eisenhower category <-> matrix quadrant mapping.
//!
//! | quadrant | category                 |
//! |----------|--------------------------|
//! | 1        | urgent-important         |
//! | 2        | not-urgent-important     |
//! | 3        | urgent-not-important     |
//! | 4        | not-urgent-not-important |

use crate::model::{EisenhowerCategory, Task};

pub const QUADRANTS: [u8; 4] = [1, 2, 3, 4];

impl EisenhowerCategory {
    pub fn quadrant(self) -> u8 {
        match self {
            EisenhowerCategory::UrgentImportant => 1,
            EisenhowerCategory::NotUrgentImportant => 2,
            EisenhowerCategory::UrgentNotImportant => 3,
            EisenhowerCategory::NotUrgentNotImportant => 4,
        }
    }

    /// Exact inverse of [`EisenhowerCategory::quadrant`]; `None` outside 1..=4.
    pub fn from_quadrant(quadrant: u8) -> Option<Self> {
        match quadrant {
            1 => Some(EisenhowerCategory::UrgentImportant),
            2 => Some(EisenhowerCategory::NotUrgentImportant),
            3 => Some(EisenhowerCategory::UrgentNotImportant),
            4 => Some(EisenhowerCategory::NotUrgentNotImportant),
            _ => None,
        }
    }
}

/// Display quadrant for a raw category label. Unrecognized labels land in 4.
pub fn quadrant_of_label(label: &str) -> u8 {
    EisenhowerCategory::parse(label).map_or(4, EisenhowerCategory::quadrant)
}

pub fn quadrant_title(quadrant: u8) -> &'static str {
    match quadrant {
        1 => "Urgent + Important",
        2 => "Not Urgent + Important",
        3 => "Urgent + Not Important",
        _ => "Not Urgent + Not Important",
    }
}

/// Tasks grouped by quadrant; index 0 holds quadrant 1.
pub fn group_by_quadrant(tasks: &[Task]) -> [Vec<&Task>; 4] {
    let mut out: [Vec<&Task>; 4] = Default::default();
    for task in tasks {
        let q = task.eisenhower_category.quadrant();
        out[usize::from(q - 1)].push(task);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn quadrants_are_distinct_and_reachable() {
        let qs: HashSet<u8> = EisenhowerCategory::ALL.iter().map(|c| c.quadrant()).collect();
        assert_eq!(qs, QUADRANTS.into_iter().collect());
        for q in QUADRANTS {
            assert!(EisenhowerCategory::from_quadrant(q).is_some());
        }
        assert_eq!(EisenhowerCategory::from_quadrant(0), None);
        assert_eq!(EisenhowerCategory::from_quadrant(5), None);
    }

    #[test]
    fn unknown_labels_display_in_quadrant_four() {
        assert_eq!(quadrant_of_label("urgent-important"), 1);
        assert_eq!(quadrant_of_label("not-urgent-important"), 2);
        assert_eq!(quadrant_of_label("sometime"), 4);
    }

    proptest! {
        #[test]
        fn category_quadrant_round_trip(i in 0usize..4) {
            let c = EisenhowerCategory::ALL[i];
            let q = c.quadrant();
            prop_assert_eq!(EisenhowerCategory::from_quadrant(q), Some(c));
            let back = EisenhowerCategory::from_quadrant(q).map(|c| c.quadrant());
            prop_assert_eq!(back, Some(q));
        }

        #[test]
        fn quadrant_category_round_trip(q in 1u8..=4) {
            let c = EisenhowerCategory::from_quadrant(q).unwrap();
            prop_assert_eq!(c.quadrant(), q);
        }
    }
}
