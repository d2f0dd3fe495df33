use crate::config::types::PipelineSettings;
use anyhow::{Context, Result};
use log::{debug, warn};
use std::fs;
use std::path::Path;

/// 預設設定檔路徑（目前工作目錄）
pub const SETTINGS_FILE_NAME: &str = "settings.json";

impl PipelineSettings {
    /// 讀取 settings.json，不存在時使用預設值
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(SETTINGS_FILE_NAME))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("找不到設定檔，使用預設值: {}", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;

        let settings: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse settings from {}", path.display()))?;

        if settings.output_video_quality > 100 || settings.output_image_quality > 100 {
            warn!("品質設定超過 100，將於編碼時截斷");
        }

        settings
            .validate()
            .with_context(|| format!("設定檔內容無效: {}", path.display()))?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputVideoEncoder;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = PipelineSettings::load_from(&dir.path().join("settings.json")).unwrap();
        assert_eq!(settings, PipelineSettings::default());
    }

    #[test]
    fn test_load_reads_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(
            &path,
            r#"{"output_video_encoder": "libvpx-vp9", "keep_temp": true}"#,
        )
        .unwrap();

        let settings = PipelineSettings::load_from(&path).unwrap();
        assert_eq!(settings.output_video_encoder, OutputVideoEncoder::LibvpxVp9);
        assert!(settings.keep_temp);
    }

    #[test]
    fn test_load_rejects_invalid_settings() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"trim_frame_start": 0}"#).unwrap();
        assert!(PipelineSettings::load_from(&path).is_err());

        fs::write(&path, r#"{"output_video_preset": "placebo"}"#).unwrap();
        assert!(PipelineSettings::load_from(&path).is_err());
    }
}
