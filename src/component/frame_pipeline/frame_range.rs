//! 影格範圍判斷
//!
//! 沿用工作區快取且只需要其中一段時，不能直接用 `%04d` 樣式合併
//! （會把範圍外的舊影格一起合進去），必須列出明確的影格清單。

use crate::config::TempFrameFormat;
use crate::tools::{Workspace, frame_path, frames_pattern, list_frames};
use anyhow::{Context, Result, bail};
use log::{debug, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// 缺少影格時最多列出幾個序號
const MISSING_PREVIEW_COUNT: usize = 10;

/// 1 起算的閉區間，None 表示該側不限制
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FrameRange {
    pub start: Option<u32>,
    pub end: Option<u32>,
}

impl FrameRange {
    #[must_use]
    pub const fn new(start: Option<u32>, end: Option<u32>) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub const fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// 補上預設值：起點 1、終點為總影格數
    #[must_use]
    pub fn resolve(&self, frame_total: u32) -> (u32, u32) {
        (self.start.unwrap_or(1), self.end.unwrap_or(frame_total))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GapPolicy {
    /// 略過缺少的影格
    #[default]
    Lenient,
    /// 有缺少的影格就失敗
    Strict,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameSequence {
    /// `<dir>/%04d.<fmt>`
    Pattern(PathBuf),
    /// 依序號排序、確實存在的影格
    List(Vec<PathBuf>),
}

/// 擷取時寫入工作區的實際範圍，供後續階段（含其他程序）讀回
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRangeRecord {
    pub start: u32,
    pub end: u32,
    pub frame_total: u32,
    pub requested: FrameRange,
}

impl FrameRangeRecord {
    #[must_use]
    pub fn new(requested: FrameRange, frame_total: u32) -> Self {
        let (start, end) = requested.resolve(frame_total);
        Self {
            start,
            end,
            frame_total,
            requested,
        }
    }

    /// 擷取時沒有裁切，影格序號與來源一致
    #[must_use]
    pub const fn covers_whole_video(&self) -> bool {
        self.requested.is_unbounded()
    }
}

/// 要求跳過擷取，且工作區已有指定格式的影格
#[must_use]
pub fn should_reuse_cache(
    workspace: &Workspace,
    format: TempFrameFormat,
    skip_extract_frames: bool,
) -> bool {
    skip_extract_frames && list_frames(workspace.path(), format).is_ok_and(|f| !f.is_empty())
}

/// 沿用快取且範圍沒有涵蓋整部影片時，需要明確的影格清單
#[must_use]
pub fn needs_explicit_range(reusing_cache: bool, range: FrameRange, frame_total: u32) -> bool {
    if !reusing_cache {
        return false;
    }
    let (start, end) = range.resolve(frame_total);
    start > 1 || end < frame_total
}

/// 列出 `start..=end` 中實際存在的影格檔案（依序號遞增）
pub fn resolve_frame_list(
    directory: &Path,
    format: TempFrameFormat,
    start: u32,
    end: u32,
    policy: GapPolicy,
) -> Result<Vec<PathBuf>> {
    if start > end {
        return Ok(Vec::new());
    }

    let candidates: Vec<(u32, PathBuf, bool)> = (start..=end)
        .into_par_iter()
        .map(|index| {
            let path = frame_path(directory, index, format);
            let exists = path.is_file();
            (index, path, exists)
        })
        .collect();

    let missing: Vec<u32> = candidates
        .iter()
        .filter(|(_, _, exists)| !exists)
        .map(|(index, _, _)| *index)
        .collect();

    if !missing.is_empty() {
        let preview = missing
            .iter()
            .take(MISSING_PREVIEW_COUNT)
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        match policy {
            GapPolicy::Strict => bail!(
                "{} 缺少 {} 個影格 ({start}-{end}): {preview}",
                directory.display(),
                missing.len()
            ),
            GapPolicy::Lenient => warn!(
                "{} 缺少 {} 個影格 ({start}-{end})，將略過: {preview}",
                directory.display(),
                missing.len()
            ),
        }
    }

    Ok(candidates
        .into_iter()
        .filter_map(|(_, path, exists)| exists.then_some(path))
        .collect())
}

/// 決定合併時使用樣式或明確清單
pub fn resolve_sequence(
    directory: &Path,
    format: TempFrameFormat,
    reusing_cache: bool,
    range: FrameRange,
    frame_total: u32,
    policy: GapPolicy,
) -> Result<FrameSequence> {
    if needs_explicit_range(reusing_cache, range, frame_total) {
        let (start, end) = range.resolve(frame_total);
        debug!("使用明確影格清單: {start}-{end}");
        let frames = resolve_frame_list(directory, format, start, end, policy)?;
        Ok(FrameSequence::List(frames))
    } else {
        Ok(FrameSequence::Pattern(frames_pattern(directory, format)))
    }
}

pub fn write_frame_range_record(workspace: &Workspace, record: &FrameRangeRecord) -> Result<()> {
    let path = workspace.frame_range_record_path();
    let content = serde_json::to_string_pretty(record).context("無法序列化影格範圍")?;
    fs::write(&path, content).with_context(|| format!("無法寫入影格範圍: {}", path.display()))
}

/// 重新擷取前刪除上一次的紀錄
pub fn remove_frame_range_record(workspace: &Workspace) -> Result<()> {
    let path = workspace.frame_range_record_path();
    if path.is_file() {
        fs::remove_file(&path)
            .with_context(|| format!("無法刪除影格範圍: {}", path.display()))?;
    }
    Ok(())
}

pub fn read_frame_range_record(workspace: &Workspace) -> Result<Option<FrameRangeRecord>> {
    let path = workspace.frame_range_record_path();
    if !path.is_file() {
        return Ok(None);
    }
    let content = fs::read_to_string(&path)
        .with_context(|| format!("無法讀取影格範圍: {}", path.display()))?;
    let record = serde_json::from_str(&content)
        .with_context(|| format!("無法解析影格範圍: {}", path.display()))?;
    Ok(Some(record))
}
