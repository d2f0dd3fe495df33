use super::encoding_profile::EncodingProfile;
use super::frame_range::{FrameSequence, resolve_sequence};
use super::process_supervisor::{ProcessSupervisor, RunMode};
use super::run_context::RunContext;
use crate::tools::{CONCAT_MANIFEST_NAME, MediaProbe};
use anyhow::{Context, Result, bail};
use log::{debug, info};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

/// 合併的輸入來源
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeInput {
    /// `%04d` 影格樣式
    Pattern(PathBuf),
    /// concat 清單，保留每張影格的時間長度
    Manifest(PathBuf),
}

/// 將影格序列重新編碼為工作區中的暫存影片
pub struct FrameMerger<'a> {
    context: &'a RunContext,
    probe: &'a dyn MediaProbe,
}

impl<'a> FrameMerger<'a> {
    #[must_use]
    pub fn new(context: &'a RunContext, probe: &'a dyn MediaProbe) -> Self {
        Self { context, probe }
    }

    pub fn merge(
        &self,
        target_path: &Path,
        resolution: &str,
        fps: f64,
        profile: &EncodingProfile,
    ) -> Result<bool> {
        let settings = &self.context.settings;
        let workspace = self.context.workspace(target_path);

        let temp_fps = self.probe.restrict_fps(target_path, fps)?;
        let frame_total = u32::try_from(self.probe.frame_total(target_path)?).unwrap_or(u32::MAX);
        let frames_dir = workspace.merge_source_dir(settings.out_new_dir);

        let sequence = resolve_sequence(
            &frames_dir,
            settings.temp_frame_format,
            self.context.history_reused,
            self.context.frame_range(),
            frame_total,
            self.context.gap_policy(),
        )?;

        let input = match sequence {
            FrameSequence::Pattern(pattern) => MergeInput::Pattern(pattern),
            FrameSequence::List(frames) => {
                if frames.is_empty() {
                    bail!("範圍內沒有任何影格: {}", frames_dir.display());
                }
                let manifest = write_concat_manifest(&frames_dir, &frames)?;
                info!("以影格清單合併 {} 張影格", frames.len());
                MergeInput::Manifest(manifest)
            }
        };

        let args = build_merge_args(
            &input,
            temp_fps,
            resolution,
            profile,
            fps,
            &workspace.temp_output_video_path(),
        );

        info!(
            "合併影格: {} -> {}",
            frames_dir.display(),
            workspace.temp_output_video_path().display()
        );
        Ok(ProcessSupervisor::ffmpeg(self.context).run(&args, RunMode::Supervised))
    }
}

#[must_use]
pub fn build_merge_args(
    input: &MergeInput,
    input_fps: f64,
    resolution: &str,
    profile: &EncodingProfile,
    output_fps: f64,
    output_path: &Path,
) -> Vec<String> {
    let mut args = vec!["-r".to_string(), input_fps.to_string()];
    let input_path = match input {
        MergeInput::Pattern(pattern) => pattern,
        MergeInput::Manifest(manifest) => {
            args.extend(["-f", "concat", "-safe", "0"].map(String::from));
            manifest
        }
    };
    args.extend([
        "-i".to_string(),
        input_path.to_string_lossy().to_string(),
        "-s".to_string(),
        resolution.to_string(),
    ]);
    args.extend(profile.codec_args());
    args.extend(profile.quality_args());
    args.extend([
        "-vf".to_string(),
        format!("framerate=fps={output_fps}"),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-colorspace".to_string(),
        "bt709".to_string(),
        "-y".to_string(),
        output_path.to_string_lossy().to_string(),
    ]);
    args
}

/// 寫入 ffmpeg concat 清單（每次重寫），回傳清單路徑
pub fn write_concat_manifest(directory: &Path, frames: &[PathBuf]) -> Result<PathBuf> {
    let manifest_path = directory.join(CONCAT_MANIFEST_NAME);
    if manifest_path.exists() {
        fs::remove_file(&manifest_path)
            .with_context(|| format!("無法刪除舊的影格清單: {}", manifest_path.display()))?;
    }

    let mut content = String::new();
    for frame in frames {
        let absolute = std::path::absolute(frame)
            .with_context(|| format!("無法取得絕對路徑: {}", frame.display()))?;
        let escaped = absolute.to_string_lossy().replace('\'', r"'\''");
        let _ = writeln!(content, "file '{escaped}'");
    }

    fs::write(&manifest_path, content)
        .with_context(|| format!("無法寫入影格清單: {}", manifest_path.display()))?;
    debug!("已寫入影格清單: {}", manifest_path.display());
    Ok(manifest_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{OutputVideoEncoder, OutputVideoPreset};
    use tempfile::TempDir;

    #[test]
    fn test_merge_args_from_pattern() {
        let profile =
            EncodingProfile::new(OutputVideoEncoder::Libx264, 100, OutputVideoPreset::Medium);
        let args = build_merge_args(
            &MergeInput::Pattern(PathBuf::from("/ws/%04d.jpg")),
            25.0,
            "640x360",
            &profile,
            30.0,
            Path::new("/ws/temp.mp4"),
        );
        assert_eq!(
            args,
            [
                "-r", "25", "-i", "/ws/%04d.jpg", "-s", "640x360", "-c:v", "libx264", "-crf", "0",
                "-preset", "medium", "-vf", "framerate=fps=30", "-pix_fmt", "yuv420p",
                "-colorspace", "bt709", "-y", "/ws/temp.mp4"
            ]
        );
    }

    #[test]
    fn test_merge_args_from_manifest_use_concat_demuxer() {
        let profile =
            EncodingProfile::new(OutputVideoEncoder::LibvpxVp9, 0, OutputVideoPreset::Fast);
        let args = build_merge_args(
            &MergeInput::Manifest(PathBuf::from("/ws/source.txt")),
            24.0,
            "64x64",
            &profile,
            24.0,
            Path::new("/ws/temp.mp4"),
        );
        assert_eq!(
            &args[..8],
            ["-r", "24", "-f", "concat", "-safe", "0", "-i", "/ws/source.txt"]
        );
        assert!(args.windows(2).any(|pair| pair == ["-crf", "63"]));
        assert!(!args.contains(&"-preset".to_string()));
    }

    #[test]
    fn test_manifest_is_rewritten_and_quoted() {
        let dir = TempDir::new().unwrap();
        let manifest_path = dir.path().join(CONCAT_MANIFEST_NAME);
        fs::write(&manifest_path, "file 'stale.jpg'\n").unwrap();

        let frames = vec![dir.path().join("0010.jpg"), dir.path().join("it's.jpg")];
        let written = write_concat_manifest(dir.path(), &frames).unwrap();
        assert_eq!(written, manifest_path);

        let content = fs::read_to_string(&manifest_path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], format!("file '{}'", frames[0].display()));
        assert!(lines[1].ends_with(r"it'\''s.jpg'"));
        assert!(!content.contains("stale"));
    }
}
