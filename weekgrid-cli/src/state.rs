use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use weekgrid_core::{MemoryStore, Store};

pub fn weekgrid_home() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("WEEKGRID_HOME") {
        if !dir.trim().is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".weekgrid"))
}

pub fn ensure_weekgrid_home() -> Result<PathBuf> {
    let dir = weekgrid_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

pub fn store_path() -> Result<PathBuf> {
    Ok(ensure_weekgrid_home()?.join("store.json"))
}

/// A missing file is an empty store.
pub fn load_store(path: &Path) -> Result<MemoryStore> {
    if !path.exists() {
        return Ok(MemoryStore::new());
    }
    let s = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&s).with_context(|| format!("parse {}", path.display()))
}

/// Write via a sibling temp file so a failed write leaves the old store intact.
pub fn save_store(path: &Path, store: &MemoryStore) -> Result<()> {
    let json = serde_json::to_string_pretty(store).context("serialize store")?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("replace {}", path.display()))?;
    Ok(())
}

/// Id of the local user, created on first use.
pub fn ensure_user(store: &mut MemoryStore, email: &str, name: &str) -> Result<String> {
    if let Some(user) = store.find_user_by_email(email)? {
        return Ok(user.id);
    }
    let user = store
        .create_user(email, name)
        .with_context(|| format!("create local user {email}"))?;
    tracing::info!(user_id = %user.id, %email, "created local user");
    Ok(user.id)
}
