use crate::tools::ensure_directory_exists;
use anyhow::{Context, Result};
use log::debug;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

/// 擷取與合併之間的逐影格轉換階段
///
/// `output_dir` 為 `Some` 時（兩段式目錄），處理結果必須寫到該目錄並沿用原檔名，
/// 否則就地覆寫 `frames`。
pub trait FrameProcessor: Send + Sync {
    fn process_frames(&self, frames: &[PathBuf], output_dir: Option<&Path>) -> Result<()>;

    /// 處理已複製到輸出位置的圖片
    fn process_image(&self, _image_path: &Path) -> Result<()> {
        Ok(())
    }
}

/// 不做任何轉換；兩段式目錄下把影格原樣複製到輸出目錄
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughProcessor;

impl FrameProcessor for PassthroughProcessor {
    fn process_frames(&self, frames: &[PathBuf], output_dir: Option<&Path>) -> Result<()> {
        let Some(output_dir) = output_dir else {
            return Ok(());
        };
        ensure_directory_exists(output_dir)?;

        frames.par_iter().try_for_each(|frame| {
            let file_name = frame
                .file_name()
                .with_context(|| format!("無效的影格路徑: {}", frame.display()))?;
            let destination = output_dir.join(file_name);
            fs::copy(frame, &destination).with_context(|| {
                format!("無法複製影格: {} -> {}", frame.display(), destination.display())
            })?;
            Ok::<_, anyhow::Error>(())
        })?;

        debug!("已複製 {} 張影格到 {}", frames.len(), output_dir.display());
        Ok(())
    }
}
