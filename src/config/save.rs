use crate::config::load::SETTINGS_FILE_NAME;
use crate::config::types::PipelineSettings;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

pub fn save_settings(settings: &PipelineSettings) -> Result<()> {
    save_settings_to(settings, Path::new(SETTINGS_FILE_NAME))
}

pub fn save_settings_to(settings: &PipelineSettings, path: &Path) -> Result<()> {
    let content = serde_json::to_string_pretty(settings).context("Failed to serialize settings")?;

    fs::write(path, content)
        .with_context(|| format!("Failed to write settings to {}", path.display()))?;

    Ok(())
}
