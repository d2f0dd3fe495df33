use super::encoding_profile::EncodingProfile;
use super::frame_range::{FrameRange, GapPolicy};
use crate::config::PipelineSettings;
use crate::tools::Workspace;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// 單次管線執行的狀態，傳給每個階段
#[derive(Debug, Clone)]
pub struct RunContext {
    pub settings: PipelineSettings,
    pub shutdown_signal: Arc<AtomicBool>,
    /// 本次執行沿用了工作區中既有的影格
    pub history_reused: bool,
}

impl RunContext {
    #[must_use]
    pub const fn new(settings: PipelineSettings, shutdown_signal: Arc<AtomicBool>) -> Self {
        Self {
            settings,
            shutdown_signal,
            history_reused: false,
        }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.shutdown_signal.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn workspace(&self, target_path: &Path) -> Workspace {
        Workspace::resolve(target_path, self.settings.temp_dir.as_deref())
    }

    #[must_use]
    pub const fn frame_range(&self) -> FrameRange {
        FrameRange::new(self.settings.trim_frame_start, self.settings.trim_frame_end)
    }

    #[must_use]
    pub fn encoding_profile(&self) -> EncodingProfile {
        EncodingProfile::new(
            self.settings.output_video_encoder,
            i32::from(self.settings.output_video_quality),
            self.settings.output_video_preset,
        )
    }

    #[must_use]
    pub const fn gap_policy(&self) -> GapPolicy {
        if self.settings.strict_frames {
            GapPolicy::Strict
        } else {
            GapPolicy::Lenient
        }
    }

    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.settings.poll_interval_ms)
    }
}
