use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use weekgrid_core::{calendar, CleanupPolicy};
use weekgrid_gen::{GeminiConfig, DEFAULT_API_KEY_ENV, DEFAULT_BASE_URL, DEFAULT_MODEL};

use crate::state::ensure_weekgrid_home;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub generation: GenerationSection,
    #[serde(default)]
    pub calendar: CalendarSection,
    #[serde(default)]
    pub cleanup: CleanupSection,
    #[serde(default)]
    pub user: UserSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationSection {
    pub model: String,
    pub base_url: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarSection {
    /// IANA name, e.g. "Europe/Berlin".
    pub timezone: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleanupSection {
    pub policy: CleanupPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSection {
    pub email: String,
    pub name: String,
}

impl Default for GenerationSection {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            timeout_secs: 60,
        }
    }
}

impl Default for CalendarSection {
    fn default() -> Self {
        Self { timezone: "UTC".to_string() }
    }
}

impl Default for UserSection {
    fn default() -> Self {
        Self {
            email: "me@localhost".to_string(),
            name: "Me".to_string(),
        }
    }
}

impl Config {
    pub fn timezone(&self) -> Result<Tz> {
        self.calendar
            .timezone
            .parse::<Tz>()
            .map_err(|e| anyhow::anyhow!("invalid calendar.timezone {:?}: {e}", self.calendar.timezone))
    }

    /// Logical date right now in the configured timezone.
    pub fn today(&self) -> Result<NaiveDate> {
        let tz = self.timezone()?;
        Ok(calendar::logical_date_of(Utc::now().with_timezone(&tz).naive_local()))
    }

    /// Client settings; fails when the key variable is unset.
    pub fn gemini(&self) -> Result<GeminiConfig> {
        let mut cfg = GeminiConfig::from_env(&self.generation.api_key_env)?;
        cfg.model = self.generation.model.clone();
        cfg.base_url = self.generation.base_url.clone();
        cfg.timeout = Duration::from_secs(self.generation.timeout_secs.max(1));
        Ok(cfg)
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_weekgrid_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    load_config_from(&config_path()?)
}

pub fn load_config_from(p: &Path) -> Result<Config> {
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(p).with_context(|| format!("read {}", p.display()))?;
    toml::from_str(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn save_config(cfg: &Config) -> Result<()> {
    let p = config_path()?;
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config(&Config::default())?;
    println!("Wrote {}", p.display());
    Ok(())
}
