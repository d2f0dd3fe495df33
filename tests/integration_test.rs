//! 整合測試 - 以固定的探測結果與假的 ffmpeg 驗證管線流程
//!
//! 工作區中預先放好影格，不需要真正的 ffmpeg。

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use anyhow::Result;
use tempfile::TempDir;
use video_frame_pipeline::component::frame_pipeline::{
    FrameProcessor, FramePipeline, FrameRange, PipelineStage, PipelineStatus, RunContext,
    needs_explicit_range, read_frame_range_record,
};
use video_frame_pipeline::config::{PipelineSettings, TempFrameFormat};
use video_frame_pipeline::tools::{
    CONCAT_MANIFEST_NAME, MediaProbe, VideoInfo, Workspace, frame_path, list_frames,
};

const FRAME_TOTAL: u32 = 100;

/// 100 格、25 fps 的固定探測結果
struct StubProbe;

impl MediaProbe for StubProbe {
    fn video_info(&self, _path: &Path) -> Result<VideoInfo> {
        Ok(VideoInfo {
            duration_seconds: 4.0,
            width: 64,
            height: 64,
            frame_rate: 25.0,
            frame_total: u64::from(FRAME_TOTAL),
        })
    }
}

struct Fixture {
    dir: TempDir,
    target: PathBuf,
    output: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("clip.mp4");
        // 只需要讓內容判斷為影片
        fs::write(&target, b"\0\0\0\x20ftypisom\0\0\x02\0isomiso2avc1mp41").unwrap();
        let output = dir.path().join("result").join("clip.mp4");
        Self {
            dir,
            target,
            output,
        }
    }

    fn temp_root(&self) -> PathBuf {
        self.dir.path().join("tmp")
    }

    fn settings(&self) -> PipelineSettings {
        PipelineSettings {
            temp_dir: Some(self.temp_root()),
            skip_extract_frames: true,
            trim_frame_start: Some(10),
            trim_frame_end: Some(40),
            ffmpeg_path: "true".to_string(),
            poll_interval_ms: 10,
            ..PipelineSettings::default()
        }
    }

    fn workspace(&self) -> Workspace {
        Workspace::resolve(&self.target, Some(&self.temp_root()))
    }

    /// 預先放入 1..=100 的影格，`skip` 中的序號不建立
    fn populate_cache(&self, skip: &[u32]) -> Workspace {
        let workspace = self.workspace();
        workspace.create(false).unwrap();
        for index in (1..=FRAME_TOTAL).filter(|i| !skip.contains(i)) {
            fs::write(
                frame_path(workspace.path(), index, TempFrameFormat::Jpg),
                b"frame",
            )
            .unwrap();
        }
        workspace
    }

    /// 假的 ffmpeg：輸出參數是 `%04d.jpg` 樣式時建立 1..=31 的影格，其餘一律成功
    #[cfg(unix)]
    fn fake_ffmpeg(&self) -> String {
        use std::os::unix::fs::PermissionsExt;

        let script = self.dir.path().join("fake-ffmpeg.sh");
        fs::write(
            &script,
            r#"#!/bin/sh
for last; do :; done
case "$last" in
  *%04d.jpg)
    dir=$(dirname "$last")
    i=1
    while [ $i -le 31 ]; do
      : > "$dir/$(printf %04d $i).jpg"
      i=$((i + 1))
    done
    ;;
esac
exit 0
"#,
        )
        .unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        script.to_string_lossy().into_owned()
    }

    fn pipeline(&self, settings: PipelineSettings, shutdown: bool) -> FramePipeline {
        let context = RunContext::new(settings, Arc::new(AtomicBool::new(shutdown)));
        FramePipeline::new(context).with_probe(StubProbe)
    }
}

/// 測試 1: 沿用快取並裁切 10-40 時以明確清單合併
#[cfg(unix)]
#[test]
fn test_trimmed_merge_from_cache_uses_manifest() {
    let fixture = Fixture::new();
    let workspace = fixture.populate_cache(&[]);
    let settings = PipelineSettings {
        keep_temp: true,
        ..fixture.settings()
    };

    let range = FrameRange::new(settings.trim_frame_start, settings.trim_frame_end);
    assert!(needs_explicit_range(true, range, FRAME_TOTAL));

    let mut pipeline = fixture.pipeline(settings, false);
    let status = pipeline.run(&fixture.target, &fixture.output).unwrap();
    assert_eq!(status, PipelineStatus::Completed);
    assert!(pipeline.context().history_reused);

    let manifest = fs::read_to_string(workspace.path().join(CONCAT_MANIFEST_NAME)).unwrap();
    let lines: Vec<_> = manifest.lines().collect();
    assert_eq!(lines.len(), 31);
    assert!(lines[0].ends_with("0010.jpg'"));
    assert!(lines[30].ends_with("0040.jpg'"));
    assert!(lines.iter().all(|line| line.starts_with("file '/")));

    // keep_temp 保留工作區
    assert!(workspace.has_files());
}

/// 測試 2: 略過音訊時搬移暫存影片並清除工作區
#[cfg(unix)]
#[test]
fn test_skip_audio_promotes_temp_and_clears_workspace() {
    let fixture = Fixture::new();
    let workspace = fixture.populate_cache(&[]);
    fs::write(workspace.temp_output_video_path(), b"encoded").unwrap();

    let settings = PipelineSettings {
        skip_audio: true,
        ..fixture.settings()
    };
    let mut pipeline = fixture.pipeline(settings, false);
    let status = pipeline.run(&fixture.target, &fixture.output).unwrap();

    assert_eq!(status, PipelineStatus::Completed);
    assert_eq!(fs::read(&fixture.output).unwrap(), b"encoded");
    assert!(!workspace.exists());
    // 根目錄已經沒有其他工作區
    assert!(!fixture.temp_root().exists());
}

/// 測試 3: 清除時保留仍有其他工作區的根目錄
#[cfg(unix)]
#[test]
fn test_clear_keeps_root_with_other_workspaces() {
    let fixture = Fixture::new();
    let workspace = fixture.populate_cache(&[]);
    fs::write(workspace.temp_output_video_path(), b"encoded").unwrap();
    let other = Workspace::resolve(Path::new("other.mp4"), Some(&fixture.temp_root()));
    other.create(false).unwrap();

    let settings = PipelineSettings {
        skip_audio: true,
        ..fixture.settings()
    };
    let status = fixture
        .pipeline(settings, false)
        .run(&fixture.target, &fixture.output)
        .unwrap();

    assert_eq!(status, PipelineStatus::Completed);
    assert!(!workspace.exists());
    assert!(other.exists());
    assert!(fixture.temp_root().is_dir());
}

/// 測試 4: 沒有暫存影片可搬移時視為輸出失敗
#[cfg(unix)]
#[test]
fn test_missing_temp_output_fails_finalize() {
    let fixture = Fixture::new();
    let workspace = fixture.populate_cache(&[]);
    let settings = PipelineSettings {
        skip_audio: true,
        ..fixture.settings()
    };

    let status = fixture
        .pipeline(settings, false)
        .run(&fixture.target, &fixture.output)
        .unwrap();
    assert!(matches!(status, PipelineStatus::Failed(_)));
    // 失敗時保留工作區
    assert!(workspace.has_files());
}

/// 測試 5: 已收到中斷信號時不進入下一階段，工作區保留
#[test]
fn test_cancelled_run_keeps_workspace() {
    let fixture = Fixture::new();
    let workspace = fixture.populate_cache(&[]);

    let status = fixture
        .pipeline(fixture.settings(), true)
        .run(&fixture.target, &fixture.output)
        .unwrap();

    assert_eq!(status, PipelineStatus::Cancelled);
    assert!(workspace.has_files());
    assert!(!workspace.path().join(CONCAT_MANIFEST_NAME).exists());
    assert!(!fixture.output.exists());
}

/// 測試 6: 嚴格模式下範圍內缺少影格即失敗
#[test]
fn test_strict_mode_rejects_gaps() {
    let fixture = Fixture::new();
    fixture.populate_cache(&[20, 21]);
    let settings = PipelineSettings {
        strict_frames: true,
        ..fixture.settings()
    };

    let error = fixture
        .pipeline(settings, false)
        .run(&fixture.target, &fixture.output)
        .unwrap_err();
    assert!(format!("{error:#}").contains("缺少 2 個影格"));
}

/// 測試 7: 寬鬆模式下略過缺少的影格
#[cfg(unix)]
#[test]
fn test_lenient_mode_skips_gaps() {
    let fixture = Fixture::new();
    let workspace = fixture.populate_cache(&[20, 21]);
    let settings = PipelineSettings {
        keep_temp: true,
        ..fixture.settings()
    };

    let status = fixture
        .pipeline(settings, false)
        .run(&fixture.target, &fixture.output)
        .unwrap();
    assert_eq!(status, PipelineStatus::Completed);

    let manifest = fs::read_to_string(workspace.path().join(CONCAT_MANIFEST_NAME)).unwrap();
    assert_eq!(manifest.lines().count(), 29);
    assert!(!manifest.contains("0020.jpg"));
}

/// 只保留偶數影格，寫到兩段式的輸出目錄
struct EvenFrameProcessor;

impl FrameProcessor for EvenFrameProcessor {
    fn process_frames(&self, frames: &[PathBuf], output_dir: Option<&Path>) -> Result<()> {
        let output_dir = output_dir.expect("two-stage layout expected");
        for frame in frames {
            let name = frame.file_name().unwrap().to_string_lossy().into_owned();
            let index: u32 = name[..4].parse()?;
            if index % 2 == 0 {
                fs::copy(frame, output_dir.join(&name))?;
            }
        }
        Ok(())
    }
}

/// 測試 8: 兩段式目錄從 out 子目錄合併處理後的影格
#[cfg(unix)]
#[test]
fn test_two_stage_layout_merges_processed_frames() {
    let fixture = Fixture::new();
    let workspace = fixture.populate_cache(&[]);
    let settings = PipelineSettings {
        keep_temp: true,
        out_new_dir: true,
        ..fixture.settings()
    };

    let status = fixture
        .pipeline(settings, false)
        .with_processor(EvenFrameProcessor)
        .run(&fixture.target, &fixture.output)
        .unwrap();
    assert_eq!(status, PipelineStatus::Completed);

    let manifest = fs::read_to_string(workspace.out_dir().join(CONCAT_MANIFEST_NAME)).unwrap();
    let lines: Vec<_> = manifest.lines().collect();
    assert_eq!(lines.len(), 16);
    assert!(lines[0].ends_with("out/0010.jpg'"));
    assert!(lines[15].ends_with("out/0040.jpg'"));
}

/// 測試 9: 重新擷取前刪除舊影格，`%04d` 合併不會混入上次留下的影格
#[cfg(unix)]
#[test]
fn test_fresh_extraction_replaces_kept_frames() {
    let fixture = Fixture::new();
    let workspace = fixture.populate_cache(&[]);
    let settings = PipelineSettings {
        skip_extract_frames: false,
        keep_temp: true,
        ffmpeg_path: fixture.fake_ffmpeg(),
        ..fixture.settings()
    };

    let mut pipeline = fixture.pipeline(settings, false);
    let status = pipeline.run(&fixture.target, &fixture.output).unwrap();
    assert_eq!(status, PipelineStatus::Completed);
    assert!(!pipeline.context().history_reused);

    let frames = list_frames(workspace.path(), TempFrameFormat::Jpg).unwrap();
    assert_eq!(frames.len(), 31);
    assert!(frames[30].ends_with("0031.jpg"));
    assert!(!frame_path(workspace.path(), 32, TempFrameFormat::Jpg).exists());
    assert!(!frame_path(workspace.path(), 100, TempFrameFormat::Jpg).exists());

    let record = read_frame_range_record(&workspace).unwrap().unwrap();
    assert_eq!((record.start, record.end, record.frame_total), (10, 40, 100));
}

/// 測試 10: 擷取失敗的工作區不會在下次被當成快取
#[cfg(unix)]
#[test]
fn test_failed_extraction_is_not_reused() {
    let fixture = Fixture::new();
    let workspace = fixture.workspace();
    let failing = PipelineSettings {
        ffmpeg_path: "false".to_string(),
        ..fixture.settings()
    };

    let status = fixture
        .pipeline(failing, false)
        .run(&fixture.target, &fixture.output)
        .unwrap();
    assert_eq!(status, PipelineStatus::Failed(PipelineStage::Extract));
    assert!(workspace.exists());
    assert!(!workspace.frame_range_record_path().exists());

    let settings = PipelineSettings {
        keep_temp: true,
        ffmpeg_path: fixture.fake_ffmpeg(),
        ..fixture.settings()
    };
    let mut pipeline = fixture.pipeline(settings, false);
    let status = pipeline.run(&fixture.target, &fixture.output).unwrap();
    assert_eq!(status, PipelineStatus::Completed);
    assert!(!pipeline.context().history_reused);
    assert_eq!(
        list_frames(workspace.path(), TempFrameFormat::Jpg).unwrap().len(),
        31
    );
    assert!(workspace.frame_range_record_path().exists());
}
