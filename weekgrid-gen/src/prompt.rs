//! Prompt text sent to the generation model.

use chrono::Weekday;
use weekgrid_core::calendar::weekday_name;
use weekgrid_core::model::Category;

const EXAMPLE_SHAPE: &str = r#"{
  "Monday": {
    "8": {"title": "Morning Routine", "description": "Exercise and breakfast", "priority": "high", "category": "Health", "eisenhowerCategory": "not-urgent-important"},
    "9": {"title": "Work Block 1", "description": "Focus on main project", "priority": "high", "category": "Work", "eisenhowerCategory": "urgent-important"},
    "10": {"title": "Work Block 2", "description": "Meetings and emails", "priority": "medium", "category": "Work", "eisenhowerCategory": "urgent-not-important"}
  },
  "Tuesday": {
    "8": {"title": "Exercise", "description": "Fitness routine", "priority": "high", "category": "Health", "eisenhowerCategory": "not-urgent-important"},
    "10": {"title": "Learning", "description": "Skill development", "priority": "medium", "category": "Learning", "eisenhowerCategory": "not-urgent-important"}
  },
  "Saturday": {
    "10": {"title": "Family Time", "description": "Spend quality time with family", "priority": "medium", "category": "Family", "eisenhowerCategory": "not-urgent-important"},
    "14": {"title": "Personal Project", "description": "Work on hobbies or personal interests", "priority": "low", "category": "Personal", "eisenhowerCategory": "not-urgent-not-important"}
  },
  "Sunday": {
    "10": {"title": "Rest and Planning", "description": "Plan for next week and rest", "priority": "medium", "category": "Personal", "eisenhowerCategory": "not-urgent-important"}
  }
}"#;

/// Build the schedule-generation prompt for `goals`, limited to `days`.
pub fn schedule_prompt(goals: &str, today: Weekday, days: &[Weekday]) -> String {
    let day_list = days.iter().map(|d| weekday_name(*d)).collect::<Vec<_>>().join(", ");
    let categories = Category::ALL
        .iter()
        .map(|c| format!("\"{}\"", c.as_str()))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"Create a detailed schedule for the remaining days of this week based on these goals: "{goals}".

Today is {today} and you should only create tasks for: {day_list}.

For each task, you must categorize it using the Eisenhower Matrix:
- "urgent-important": Critical tasks that need immediate attention (deadlines, emergencies, important meetings)
- "urgent-not-important": Tasks that feel urgent but aren't truly important (interruptions, some emails, non-critical requests)
- "not-urgent-important": Important tasks that aren't urgent (planning, skill development, relationship building, health)
- "not-urgent-not-important": Tasks that are neither urgent nor important (time wasters, excessive social media, busy work)

Return a JSON object with this exact structure (only include the days mentioned above):
{EXAMPLE_SHAPE}

Guidelines:
- Use hours 8-22 (8am-10pm)
- Include realistic breaks and meals
- Balance work, personal, health, and learning activities
- Set appropriate priorities: "high", "medium", "low"
- Use categories like: {categories}
- CRITICAL: Assign eisenhowerCategory to each task based on urgency and importance
- Make descriptions specific and actionable
- Consider the user's stated goals and preferences
- Return ONLY the JSON object, no additional text or markdown formatting
- Ensure the JSON is valid and properly formatted"#,
        goals = goals.trim(),
        today = weekday_name(today),
    )
}

/// Prompt asking the model to rewrite a user's goals into a clearer request.
pub fn improve_goals_prompt(original: &str) -> String {
    format!(
        r#"You are an expert prompt engineer. I need you to improve and fix this prompt for generating a weekly schedule. The prompt should be clear, specific, and optimized for generating a well-structured weekly schedule.

Original prompt: "{original}"

Please provide an improved version of this prompt that:
1. Is more specific and actionable
2. Includes clear instructions for task categorization using the Eisenhower Matrix
3. Specifies the desired output format (JSON structure)
4. Includes guidelines for realistic time allocation
5. Considers work-life balance
6. Is optimized for AI schedule generation

Return ONLY the improved prompt text, no additional explanations or formatting."#,
        original = original.trim(),
    )
}

/// Strip a surrounding Markdown code fence from model output, if present.
pub fn strip_code_fence(text: &str) -> String {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }
    let lines: Vec<&str> = trimmed.lines().collect();
    match lines.iter().skip(1).position(|l| l.trim().starts_with("```")) {
        Some(end) => lines[1..=end].join("\n").trim().to_string(),
        None => trimmed.to_string(),
    }
}
