use super::frame_range::FrameRange;
use super::process_supervisor::{ProcessSupervisor, RunMode};
use super::run_context::RunContext;
use anyhow::Result;
use log::info;
use std::path::Path;

/// 將原始（可裁切的）音訊合併到重新編碼的影片上
pub struct AudioReattacher<'a> {
    context: &'a RunContext,
}

impl<'a> AudioReattacher<'a> {
    #[must_use]
    pub const fn new(context: &'a RunContext) -> Self {
        Self { context }
    }

    /// 以原始影片的音軌取代暫存影片的音訊，結果寫到 `output_path`
    pub fn restore_audio(
        &self,
        target_path: &Path,
        output_path: &Path,
        output_fps: f64,
        range: FrameRange,
    ) -> bool {
        let temp_output = self.context.workspace(target_path).temp_output_video_path();
        let args = build_restore_audio_args(&temp_output, target_path, output_path, output_fps, range);
        info!("合併原始音訊: {}", output_path.display());
        ProcessSupervisor::ffmpeg(self.context).run(&args, RunMode::MustComplete)
    }

    /// 以指定音訊檔取代，音訊較短時補靜音
    pub fn replace_audio(&self, target_path: &Path, audio_path: &Path, output_path: &Path) -> bool {
        let temp_output = self.context.workspace(target_path).temp_output_video_path();
        let args = build_replace_audio_args(&temp_output, audio_path, output_path);
        info!("替換音訊: {}", audio_path.display());
        ProcessSupervisor::ffmpeg(self.context).run(&args, RunMode::MustComplete)
    }

    /// 讀取 s16le PCM 原始音訊
    pub fn read_audio_buffer(
        &self,
        target_path: &Path,
        sample_rate: u32,
        channel_total: u32,
    ) -> Result<Option<Vec<u8>>> {
        let args = vec![
            "-i".to_string(),
            target_path.to_string_lossy().to_string(),
            "-vn".to_string(),
            "-f".to_string(),
            "s16le".to_string(),
            "-acodec".to_string(),
            "pcm_s16le".to_string(),
            "-ar".to_string(),
            sample_rate.to_string(),
            "-ac".to_string(),
            channel_total.to_string(),
            "-".to_string(),
        ];
        ProcessSupervisor::new(
            self.context.settings.ffmpeg_path.clone(),
            self.context.shutdown_signal.clone(),
        )
        .with_base_args(["-hide_banner", "-loglevel", "quiet"])
        .with_hwaccel(self.context.settings.hwaccel_cuda)
        .capture_stdout(&args)
    }
}

/// 裁切範圍換算成秒數後套用在原始影片（第二個輸入）
#[must_use]
pub fn build_restore_audio_args(
    temp_output: &Path,
    target_path: &Path,
    output_path: &Path,
    output_fps: f64,
    range: FrameRange,
) -> Vec<String> {
    let mut args = vec!["-i".to_string(), temp_output.to_string_lossy().to_string()];
    if let Some(start) = range.start {
        args.extend(["-ss".to_string(), (f64::from(start) / output_fps).to_string()]);
    }
    if let Some(end) = range.end {
        args.extend(["-to".to_string(), (f64::from(end) / output_fps).to_string()]);
    }
    args.extend([
        "-i".to_string(),
        target_path.to_string_lossy().to_string(),
        "-c".to_string(),
        "copy".to_string(),
        "-map".to_string(),
        "0:v:0".to_string(),
        "-map".to_string(),
        "1:a:0".to_string(),
        "-shortest".to_string(),
        "-y".to_string(),
        output_path.to_string_lossy().to_string(),
    ]);
    args
}

/// 音訊較短時以 `apad` 補靜音，`-shortest` 讓長度跟著影片
#[must_use]
pub fn build_replace_audio_args(
    temp_output: &Path,
    audio_path: &Path,
    output_path: &Path,
) -> Vec<String> {
    vec![
        "-i".to_string(),
        temp_output.to_string_lossy().to_string(),
        "-i".to_string(),
        audio_path.to_string_lossy().to_string(),
        "-af".to_string(),
        "apad".to_string(),
        "-shortest".to_string(),
        "-y".to_string(),
        output_path.to_string_lossy().to_string(),
    ]
}
