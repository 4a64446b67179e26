use anyhow::{Context, Result};
use weekgrid_gen::GeminiClient;

use crate::config::Config;

/// Gemini client from config; a missing key is reported with the variable to set.
pub fn gemini_client(cfg: &Config) -> Result<GeminiClient> {
    let gemini = cfg
        .gemini()
        .with_context(|| format!("generation needs an API key in ${}", cfg.generation.api_key_env))?;
    tracing::debug!(model = %gemini.model, base_url = %gemini.base_url, "using gemini");
    Ok(GeminiClient::new(gemini).context("build HTTP client")?)
}
