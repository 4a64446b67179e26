//! Goals in, normalized schedule out.

use chrono::{Datelike, NaiveDate};
use thiserror::Error;
use tracing::{info, warn};
use weekgrid_core::calendar;
use weekgrid_core::fallback;
use weekgrid_core::payload::{self, GeneratedSchedule, PayloadError};

use crate::gemini::{GenerationError, TextGenerator};
use crate::prompt;

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("goals are required")]
    MissingGoals,
    #[error("a prompt is required")]
    MissingPrompt,
    #[error(transparent)]
    Generation(#[from] GenerationError),
}

/// A schedule ready to install, plus why the fallback was used, if it was.
#[derive(Debug, Clone)]
pub struct Generated {
    pub schedule: GeneratedSchedule,
    pub fallback: Option<PayloadError>,
}

impl Generated {
    pub fn used_fallback(&self) -> bool {
        self.fallback.is_some()
    }
}

/// Ask `generator` for a schedule covering the rest of the week.
///
/// Service failures and unusable replies both degrade to the built-in
/// schedule; only configuration errors and empty goals are returned.
pub async fn generate_schedule<G: TextGenerator>(
    generator: &G,
    goals: &str,
    today: NaiveDate,
) -> Result<Generated, GenerateError> {
    let goals = goals.trim();
    if goals.is_empty() {
        return Err(GenerateError::MissingGoals);
    }
    let days = calendar::days_to_schedule(today);
    let text = prompt::schedule_prompt(goals, today.weekday(), &days);

    let (mut schedule, fallback) = match generator.generate(&text).await {
        Ok(reply) => payload::parse_or_fallback(&reply),
        Err(err) if err.is_config() => return Err(err.into()),
        Err(err) => {
            warn!(error = %err, "schedule generation failed; using fallback");
            (fallback::fallback_schedule(), Some(PayloadError::Upstream(err.to_string())))
        }
    };
    schedule.retain_days(&days);
    info!(
        days = days.len(),
        tasks = schedule.task_count(),
        fallback = fallback.is_some(),
        "generated schedule"
    );
    Ok(Generated { schedule, fallback })
}

/// Rewrite free-form goals into a clearer prompt.
pub async fn improve_goals<G: TextGenerator>(generator: &G, original: &str) -> Result<String, GenerateError> {
    if original.trim().is_empty() {
        return Err(GenerateError::MissingPrompt);
    }
    let reply = generator.generate(&prompt::improve_goals_prompt(original)).await?;
    let improved = prompt::strip_code_fence(&reply);
    if improved.is_empty() {
        return Err(GenerationError::Empty.into());
    }
    Ok(improved)
}
