use super::frame_range::{
    FrameRange, FrameRangeRecord, remove_frame_range_record, should_reuse_cache,
    write_frame_range_record,
};
use super::process_supervisor::{ProcessSupervisor, RunMode};
use super::run_context::RunContext;
use crate::tools::{MediaProbe, Workspace, frames_pattern, remove_frames};
use anyhow::Result;
use log::info;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractOutcome {
    Extracted,
    /// 工作區已有影格，未啟動 ffmpeg
    ReusedHistory,
    Failed,
}

impl ExtractOutcome {
    #[must_use]
    pub const fn is_success(self) -> bool {
        !matches!(self, Self::Failed)
    }
}

/// 將影片解碼為工作區中的影格序列
pub struct FrameExtractor<'a> {
    context: &'a RunContext,
    probe: &'a dyn MediaProbe,
}

impl<'a> FrameExtractor<'a> {
    #[must_use]
    pub fn new(context: &'a RunContext, probe: &'a dyn MediaProbe) -> Self {
        Self { context, probe }
    }

    pub fn extract(
        &self,
        target_path: &Path,
        resolution: &str,
        fps: f64,
        range: FrameRange,
    ) -> Result<ExtractOutcome> {
        let settings = &self.context.settings;
        let workspace = self.context.workspace(target_path);

        if should_reuse_cache(
            &workspace,
            settings.temp_frame_format,
            settings.skip_extract_frames,
        ) {
            info!("沿用既有影格，跳過擷取: {}", workspace.path().display());
            return Ok(ExtractOutcome::ReusedHistory);
        }

        workspace.create(settings.out_new_dir)?;
        self.clear_previous_extraction(&workspace)?;

        let frame_total = u32::try_from(self.probe.frame_total(target_path)?).unwrap_or(u32::MAX);
        let pattern = frames_pattern(workspace.path(), settings.temp_frame_format);
        let args = build_extract_args(target_path, resolution, fps, range, &pattern);

        info!(
            "擷取影格: {} -> {}",
            target_path.display(),
            workspace.path().display()
        );
        if !ProcessSupervisor::ffmpeg(self.context).run(&args, RunMode::Supervised) {
            return Ok(ExtractOutcome::Failed);
        }

        write_frame_range_record(&workspace, &FrameRangeRecord::new(range, frame_total))?;
        Ok(ExtractOutcome::Extracted)
    }

    /// `%04d` 樣式會把留下的舊影格一起合併，重新擷取前先刪除
    fn clear_previous_extraction(&self, workspace: &Workspace) -> Result<()> {
        let settings = &self.context.settings;
        remove_frame_range_record(workspace)?;

        let mut removed = remove_frames(workspace.path(), settings.temp_frame_format)?;
        if settings.out_new_dir {
            removed += remove_frames(&workspace.out_dir(), settings.temp_frame_format)?;
        }
        if removed > 0 {
            info!("已刪除 {removed} 張舊影格: {}", workspace.path().display());
        }
        Ok(())
    }
}

/// 裁切（可選）與幀率濾鏡合成單一 `-vf` 表達式
#[must_use]
pub fn build_video_filter(range: FrameRange, fps: f64) -> String {
    let trim = match (range.start, range.end) {
        (Some(start), Some(end)) => Some(format!("trim=start_frame={start}:end_frame={end}")),
        (Some(start), None) => Some(format!("trim=start_frame={start}")),
        (None, Some(end)) => Some(format!("trim=end_frame={end}")),
        (None, None) => None,
    };

    match trim {
        Some(trim) => format!("{trim},fps={fps}"),
        None => format!("fps={fps}"),
    }
}

#[must_use]
pub fn build_extract_args(
    target_path: &Path,
    resolution: &str,
    fps: f64,
    range: FrameRange,
    pattern: &Path,
) -> Vec<String> {
    vec![
        "-i".to_string(),
        target_path.to_string_lossy().to_string(),
        "-s".to_string(),
        resolution.to_string(),
        "-q:v".to_string(),
        "0".to_string(),
        "-vf".to_string(),
        build_video_filter(range, fps),
        "-vsync".to_string(),
        "0".to_string(),
        pattern.to_string_lossy().to_string(),
    ]
}
