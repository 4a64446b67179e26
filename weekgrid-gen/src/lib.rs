//! weekgrid-gen: turns goals into a generated week via a text-generation
//! service, with a built-in schedule when the service can't help

pub mod gemini;
pub mod generate;
pub mod prompt;

pub use gemini::{
    extract_text, GeminiClient, GeminiConfig, GenerationError, OfflineGenerator, TextGenerator,
    DEFAULT_API_KEY_ENV, DEFAULT_BASE_URL, DEFAULT_MODEL,
};
pub use generate::{generate_schedule, improve_goals, GenerateError, Generated};
pub use prompt::{improve_goals_prompt, schedule_prompt, strip_code_fence};
