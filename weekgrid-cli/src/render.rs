//! Plain-text renderings for the terminal.

use std::fmt::Write as _;

use weekgrid_core::calendar::weekday_name;
use weekgrid_core::{
    slot_label, CleanupReport, GridView, HistoryEntry, QuadrantView, ScheduleStats, Task, TimeSlot,
    WeeklySchedule,
};

const COL: usize = 16;

fn fit(text: &str, width: usize) -> String {
    let count = text.chars().count();
    if count <= width {
        format!("{text:<width$}")
    } else {
        let cut: String = text.chars().take(width.saturating_sub(1)).collect();
        format!("{cut}~")
    }
}

pub fn grid(view: &GridView) -> String {
    let mut out = String::new();
    let _ = write!(out, "{:>5} ", "");
    for (day, date) in &view.days {
        let _ = write!(out, "| {} ", fit(&format!("{} {}", &weekday_name(*day)[..3], date.format("%m-%d")), COL));
    }
    out.push('\n');

    for row in &view.rows {
        let _ = write!(out, "{:>5} ", row.label);
        for cell in &row.cells {
            let text = match (&cell.task, cell.continuation) {
                (_, true) => "  :".to_string(),
                (Some(task), false) => {
                    let mark = if task.completed { "x " } else { "" };
                    if cell.span_hours > 1 {
                        format!("{mark}{} ({}h)", task.title, cell.span_hours)
                    } else {
                        format!("{mark}{}", task.title)
                    }
                }
                (None, false) if cell.slot_id.is_some() => "-".to_string(),
                (None, false) => String::new(),
            };
            let _ = write!(out, "| {} ", fit(&text, COL));
        }
        out.push('\n');
    }
    out
}

pub fn stats(stats: &ScheduleStats) -> String {
    format!(
        "scheduled {}  completed {}  pending {}  high priority {}  merged {}",
        stats.scheduled, stats.completed, stats.pending, stats.high_priority, stats.merged
    )
}

pub fn matrix(quadrants: &[QuadrantView]) -> String {
    let mut out = String::new();
    for q in quadrants {
        let _ = writeln!(out, "Q{} {} ({} pending / {} total)", q.quadrant, q.title, q.pending(), q.tasks.len());
        if q.tasks.is_empty() {
            let _ = writeln!(out, "    (none)");
        }
        for t in &q.tasks {
            let _ = writeln!(out, "    {}", task_line(t));
        }
    }
    out
}

pub fn task_line(t: &Task) -> String {
    let done = if t.completed { "x" } else { " " };
    // late-night tasks show under the logical day they were planned on
    let when = match (t.placement(), t.scheduled_at) {
        (Some(cell), _) => format!(" @ {cell}"),
        (None, Some(at)) => at.format(" @ %a %H:%M").to_string(),
        (None, None) => String::new(),
    };
    format!(
        "[{done}] {} {} ({}, {}, {}h){when}",
        t.id,
        t.title,
        t.priority.as_str(),
        t.category.as_str(),
        t.duration
    )
}

pub fn slot_line(s: &TimeSlot, task: Option<&Task>) -> String {
    let title = task.map(|t| t.title.as_str()).unwrap_or("(empty)");
    let merged = if s.merged { " merged" } else { "" };
    format!("{} {} {}{merged}: {title}", s.id, s.day.format("%a %Y-%m-%d"), slot_label(s))
}

pub fn schedule_line(s: &WeeklySchedule) -> String {
    format!("{} week of {} ({} slots): {}", s.id, s.week_start, s.time_slot_ids.len(), s.goals)
}

pub fn cleanup(report: &CleanupReport) -> String {
    let mut out = format!(
        "removed {} slots from {} ({} already gone)",
        report.deleted_slots, report.schedule_id, report.missing_slots
    );
    for (id, err) in &report.failed {
        let _ = write!(out, "\n  could not delete {id}: {err}");
    }
    out
}

pub fn history(entries: &[HistoryEntry]) -> String {
    let mut out = String::new();
    for e in entries {
        let _ = writeln!(out, "{} {}", e.timestamp.format("%Y-%m-%d %H:%M"), e.description);
    }
    out
}
