use super::process_supervisor::{ProcessSupervisor, RunMode};
use super::run_context::RunContext;
use anyhow::{Context, Result};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

/// JPEG `-q:v` 的上限（數字越小品質越高）
const IMAGE_MAX_COMPRESSION: u32 = 31;

/// 圖片目標：複製到輸出位置處理後再依品質重新壓縮
pub struct ImageFinalizer<'a> {
    context: &'a RunContext,
}

impl<'a> ImageFinalizer<'a> {
    #[must_use]
    pub const fn new(context: &'a RunContext) -> Self {
        Self { context }
    }

    /// webp 用最高品質 100，其他格式用 0（最佳）
    pub fn copy_image(
        &self,
        target_path: &Path,
        output_path: &Path,
        resolution: &str,
        is_webp: bool,
    ) -> bool {
        let compression = if is_webp { 100 } else { 0 };
        let args = vec![
            "-i".to_string(),
            target_path.to_string_lossy().to_string(),
            "-s".to_string(),
            resolution.to_string(),
            "-q:v".to_string(),
            compression.to_string(),
            "-y".to_string(),
            output_path.to_string_lossy().to_string(),
        ];
        info!("複製圖片: {} -> {}", target_path.display(), output_path.display());
        ProcessSupervisor::ffmpeg(self.context).run(&args, RunMode::Supervised)
    }

    /// 依輸出品質重新壓縮；先寫到同目錄的暫存檔再取代原檔
    pub fn finalize_image(&self, output_path: &Path, resolution: &str) -> Result<bool> {
        let compression = image_compression(self.context.settings.output_image_quality);
        let staging_path = staging_path(output_path);
        let args = vec![
            "-i".to_string(),
            output_path.to_string_lossy().to_string(),
            "-s".to_string(),
            resolution.to_string(),
            "-q:v".to_string(),
            compression.to_string(),
            "-y".to_string(),
            staging_path.to_string_lossy().to_string(),
        ];
        if !ProcessSupervisor::ffmpeg(self.context).run(&args, RunMode::Supervised) {
            if staging_path.exists() {
                fs::remove_file(&staging_path)
                    .with_context(|| format!("無法刪除暫存圖片: {}", staging_path.display()))?;
            }
            return Ok(false);
        }

        fs::rename(&staging_path, output_path).with_context(|| {
            format!(
                "無法取代輸出圖片: {} -> {}",
                staging_path.display(),
                output_path.display()
            )
        })?;
        Ok(true)
    }
}

/// `<主幹>.finalize.<副檔名>`，保留副檔名讓 ffmpeg 判斷輸出格式
fn staging_path(output_path: &Path) -> PathBuf {
    let stem = output_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_name = match output_path.extension() {
        Some(extension) => format!("{stem}.finalize.{}", extension.to_string_lossy()),
        None => format!("{stem}.finalize"),
    };
    output_path.with_file_name(file_name)
}

/// round(31 - quality * 0.31)，品質截斷到 100
#[must_use]
pub fn image_compression(quality: u8) -> u32 {
    let quality = u32::from(quality.min(100));
    ((100 - quality) * IMAGE_MAX_COMPRESSION + 50) / 100
}
