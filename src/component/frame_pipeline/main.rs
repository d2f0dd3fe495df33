use super::audio_reattacher::AudioReattacher;
use super::frame_extractor::{ExtractOutcome, FrameExtractor};
use super::frame_processor::{FrameProcessor, PassthroughProcessor};
use super::frame_merger::FrameMerger;
use super::frame_range::read_frame_range_record;
use super::image_finalizer::ImageFinalizer;
use super::run_context::RunContext;
use crate::tools::{
    FfprobeProbe, MediaKind, MediaProbe, TargetMedia, Workspace, ensure_directory_exists,
    list_frames, validate_file_exists,
};
use anyhow::{Result, bail};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::fmt;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    CopyImage,
    Extract,
    Process,
    Merge,
    Finalize,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CopyImage => "複製圖片",
            Self::Extract => "擷取影格",
            Self::Process => "處理影格",
            Self::Merge => "合併影格",
            Self::Finalize => "輸出",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStatus {
    Completed,
    /// 收到中斷信號，工作區保留供下次沿用
    Cancelled,
    Failed(PipelineStage),
}

/// 單一目標檔案的完整處理流程
pub struct FramePipeline {
    context: RunContext,
    probe: Box<dyn MediaProbe>,
    processor: Box<dyn FrameProcessor>,
}

impl FramePipeline {
    #[must_use]
    pub fn new(context: RunContext) -> Self {
        let probe = FfprobeProbe::new(context.settings.ffprobe_path.clone());
        Self {
            context,
            probe: Box::new(probe),
            processor: Box::new(PassthroughProcessor),
        }
    }

    #[must_use]
    pub fn with_probe(mut self, probe: impl MediaProbe + 'static) -> Self {
        self.probe = Box::new(probe);
        self
    }

    #[must_use]
    pub fn with_processor(mut self, processor: impl FrameProcessor + 'static) -> Self {
        self.processor = Box::new(processor);
        self
    }

    #[must_use]
    pub const fn context(&self) -> &RunContext {
        &self.context
    }

    pub fn run(&mut self, target_path: &Path, output_path: &Path) -> Result<PipelineStatus> {
        validate_file_exists(target_path)?;
        if let Some(parent) = output_path.parent()
            && !parent.as_os_str().is_empty()
        {
            ensure_directory_exists(parent)?;
        }

        let target = TargetMedia::detect(target_path)?;
        info!("處理目標: {} ({})", target.path.display(), target.kind);

        let status = match target.kind {
            MediaKind::Image => self.process_image(&target, output_path)?,
            MediaKind::Video => self.process_video(target_path, output_path)?,
            kind => bail!("不支援的媒體類型 {kind}: {}", target_path.display()),
        };

        match status {
            PipelineStatus::Completed => info!("處理完成: {}", output_path.display()),
            PipelineStatus::Cancelled => warn!("處理已中斷: {}", target_path.display()),
            PipelineStatus::Failed(stage) => error!("{stage}失敗: {}", target_path.display()),
        }
        Ok(status)
    }

    fn process_image(&self, target: &TargetMedia, output_path: &Path) -> Result<PipelineStatus> {
        let settings = &self.context.settings;
        let resolution = match &settings.output_image_resolution {
            Some(resolution) => resolution.clone(),
            None => self.probe.video_info(&target.path)?.resolution(),
        };
        let finalizer = ImageFinalizer::new(&self.context);

        let spinner = stage_spinner(PipelineStage::CopyImage);
        let copied = finalizer.copy_image(&target.path, output_path, &resolution, target.is_webp());
        spinner.finish_and_clear();
        if self.context.is_cancelled() {
            return Ok(PipelineStatus::Cancelled);
        }
        if !copied {
            return Ok(PipelineStatus::Failed(PipelineStage::CopyImage));
        }

        self.processor.process_image(output_path)?;
        if self.context.is_cancelled() {
            return Ok(PipelineStatus::Cancelled);
        }

        let spinner = stage_spinner(PipelineStage::Finalize);
        let finalized = finalizer.finalize_image(output_path, &resolution);
        spinner.finish_and_clear();
        let finalized = finalized?;
        if self.context.is_cancelled() {
            return Ok(PipelineStatus::Cancelled);
        }
        if !finalized {
            return Ok(PipelineStatus::Failed(PipelineStage::Finalize));
        }
        Ok(PipelineStatus::Completed)
    }

    fn process_video(&mut self, target_path: &Path, output_path: &Path) -> Result<PipelineStatus> {
        let settings = self.context.settings.clone();
        let workspace = self.context.workspace(target_path);
        let range = self.context.frame_range();

        let info = self.probe.video_info(target_path)?;
        let resolution = settings
            .output_video_resolution
            .clone()
            .unwrap_or_else(|| info.resolution());
        let fps = settings.output_video_fps.unwrap_or(info.frame_rate);

        self.context.history_reused = false;
        let spinner = stage_spinner(PipelineStage::Extract);
        let outcome = FrameExtractor::new(&self.context, self.probe.as_ref())
            .extract(target_path, &resolution, fps, range);
        spinner.finish_and_clear();
        let outcome = outcome?;
        self.context.history_reused = outcome == ExtractOutcome::ReusedHistory;
        if self.context.is_cancelled() {
            return Ok(PipelineStatus::Cancelled);
        }
        if outcome == ExtractOutcome::Failed {
            return Ok(PipelineStatus::Failed(PipelineStage::Extract));
        }
        if self.context.history_reused {
            warn_on_trimmed_cache(&workspace)?;
        }

        let frames = list_frames(workspace.path(), settings.temp_frame_format)?;
        if frames.is_empty() {
            bail!("工作區沒有任何影格: {}", workspace.path().display());
        }
        let spinner = stage_spinner(PipelineStage::Process);
        let output_dir = settings.out_new_dir.then(|| workspace.out_dir());
        if let Some(output_dir) = &output_dir {
            ensure_directory_exists(output_dir)?;
        }
        let processed = self.processor.process_frames(&frames, output_dir.as_deref());
        spinner.finish_and_clear();
        processed?;
        if self.context.is_cancelled() {
            return Ok(PipelineStatus::Cancelled);
        }

        let profile = self.context.encoding_profile();
        info!(
            "編碼設定: {} 品質 {} 預設 {}",
            profile.encoder(),
            profile.quality(),
            profile.preset_value().unwrap_or("無")
        );
        let spinner = stage_spinner(PipelineStage::Merge);
        let merged = FrameMerger::new(&self.context, self.probe.as_ref())
            .merge(target_path, &resolution, fps, &profile);
        spinner.finish_and_clear();
        let merged = merged?;
        if self.context.is_cancelled() {
            return Ok(PipelineStatus::Cancelled);
        }
        if !merged {
            return Ok(PipelineStatus::Failed(PipelineStage::Merge));
        }

        let spinner = stage_spinner(PipelineStage::Finalize);
        let promoted = self.finalize_video(&workspace, target_path, output_path, fps);
        spinner.finish_and_clear();
        if !promoted? {
            return Ok(PipelineStatus::Failed(PipelineStage::Finalize));
        }

        workspace.clear(settings.keep_temp)?;
        Ok(PipelineStatus::Completed)
    }

    /// 合併原始音訊；略過音訊或合併失敗時直接搬移無音訊的暫存影片
    fn finalize_video(
        &self,
        workspace: &Workspace,
        target_path: &Path,
        output_path: &Path,
        fps: f64,
    ) -> Result<bool> {
        if self.context.settings.skip_audio {
            return workspace.move_temp(output_path);
        }

        let restored = AudioReattacher::new(&self.context).restore_audio(
            target_path,
            output_path,
            fps,
            self.context.frame_range(),
        );
        if restored {
            return Ok(true);
        }

        warn!("無法合併原始音訊，改為輸出無音訊影片: {}", output_path.display());
        workspace.move_temp(output_path)
    }
}

/// 沿用的快取若是在裁切下擷取，影格序號與來源不一致
fn warn_on_trimmed_cache(workspace: &Workspace) -> Result<()> {
    if let Some(record) = read_frame_range_record(workspace)?
        && !record.covers_whole_video()
    {
        warn!(
            "沿用的影格是以裁切範圍 {}-{} 擷取（共 {} 格），序號可能與來源不一致",
            record.start, record.end, record.frame_total
        );
    }
    Ok(())
}

fn stage_spinner(stage: PipelineStage) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(format!("{stage}中..."));
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}
