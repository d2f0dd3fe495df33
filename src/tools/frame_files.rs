//! 影格檔案命名：`<4 位數補零序號>.<格式>`

use crate::config::TempFrameFormat;
use anyhow::{Context, Result};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use walkdir::WalkDir;

static REGEX_FRAME_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4,})\.([A-Za-z0-9]+)$").expect("Invalid regex"));

#[must_use]
pub fn frame_file_name(index: u32, format: TempFrameFormat) -> String {
    format!("{index:04}.{}", format.extension())
}

#[must_use]
pub fn frame_path(directory: &Path, index: u32, format: TempFrameFormat) -> PathBuf {
    directory.join(frame_file_name(index, format))
}

/// ffmpeg 的影格序列樣式，例如 `<dir>/%04d.jpg`
#[must_use]
pub fn frames_pattern(directory: &Path, format: TempFrameFormat) -> PathBuf {
    directory.join(format!("%04d.{}", format.extension()))
}

/// 由檔名解析影格序號，格式不符時回傳 None
#[must_use]
pub fn parse_frame_index(file_name: &str, format: TempFrameFormat) -> Option<u32> {
    let captures = REGEX_FRAME_NAME.captures(file_name)?;
    if &captures[2] != format.extension() {
        return None;
    }
    captures[1].parse().ok()
}

/// 列出目錄中的影格，依序號遞增排序
pub fn list_frames(directory: &Path, format: TempFrameFormat) -> Result<Vec<PathBuf>> {
    if !directory.is_dir() {
        return Ok(Vec::new());
    }

    let mut frames = Vec::new();
    for entry in WalkDir::new(directory).min_depth(1).max_depth(1) {
        let entry =
            entry.with_context(|| format!("無法讀取影格目錄: {}", directory.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let index = entry
            .file_name()
            .to_str()
            .and_then(|name| parse_frame_index(name, format));
        if let Some(index) = index {
            frames.push((index, entry.into_path()));
        }
    }

    frames.sort_by_key(|(index, _)| *index);
    Ok(frames.into_iter().map(|(_, path)| path).collect())
}

/// 刪除目錄中既有的影格，回傳刪除的數量
pub fn remove_frames(directory: &Path, format: TempFrameFormat) -> Result<usize> {
    let frames = list_frames(directory, format)?;
    for frame in &frames {
        fs::remove_file(frame)
            .with_context(|| format!("無法刪除舊影格: {}", frame.display()))?;
    }
    Ok(frames.len())
}
