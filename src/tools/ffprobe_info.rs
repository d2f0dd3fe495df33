use anyhow::{Context, Result, bail};
use regex::Regex;
use serde::Deserialize;
use std::path::Path;
use std::process::Command;
use std::sync::LazyLock;

static REGEX_RESOLUTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)x(\d+)$").expect("Invalid regex"));

#[derive(Debug, Clone)]
pub struct VideoInfo {
    pub duration_seconds: f64,
    pub width: u32,
    pub height: u32,
    pub frame_rate: f64,
    pub frame_total: u64,
}

impl VideoInfo {
    /// `寬x高` 格式，可直接傳給 ffmpeg 的 `-s`
    #[must_use]
    pub fn resolution(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

/// 媒體資訊查詢（幀率、總影格數）
pub trait MediaProbe {
    fn video_info(&self, path: &Path) -> Result<VideoInfo>;

    fn frame_rate(&self, path: &Path) -> Result<f64> {
        Ok(self.video_info(path)?.frame_rate)
    }

    fn frame_total(&self, path: &Path) -> Result<u64> {
        Ok(self.video_info(path)?.frame_total)
    }

    /// 要求的幀率不得超過來源影片本身的幀率
    fn restrict_fps(&self, path: &Path, fps: f64) -> Result<f64> {
        Ok(self.frame_rate(path)?.min(fps))
    }
}

#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    program: String,
}

impl FfprobeProbe {
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for FfprobeProbe {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

#[derive(Deserialize)]
struct FfprobeOutput {
    format: Option<FormatInfo>,
    streams: Option<Vec<StreamInfo>>,
}

#[derive(Deserialize)]
struct FormatInfo {
    duration: Option<String>,
}

#[derive(Deserialize)]
struct StreamInfo {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    nb_frames: Option<String>,
    duration: Option<String>,
}

impl MediaProbe for FfprobeProbe {
    fn video_info(&self, path: &Path) -> Result<VideoInfo> {
        let output = Command::new(&self.program)
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path)
            .output()
            .with_context(|| format!("無法執行 ffprobe: {}", path.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("ffprobe 執行失敗: {stderr}");
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_ffprobe_output(&stdout, path)
    }
}

fn parse_ffprobe_output(json: &str, path: &Path) -> Result<VideoInfo> {
    let probe: FfprobeOutput =
        serde_json::from_str(json).with_context(|| "無法解析 ffprobe 輸出")?;

    let video_stream = probe
        .streams
        .as_ref()
        .and_then(|streams| {
            streams
                .iter()
                .find(|s| s.codec_type.as_deref() == Some("video"))
        })
        .ok_or_else(|| anyhow::anyhow!("找不到視訊串流: {}", path.display()))?;

    let width = video_stream
        .width
        .ok_or_else(|| anyhow::anyhow!("無法取得影片寬度"))?;
    let height = video_stream
        .height
        .ok_or_else(|| anyhow::anyhow!("無法取得影片高度"))?;

    // 優先從 format，其次從 stream
    let duration_seconds = probe
        .format
        .as_ref()
        .and_then(|f| f.duration.as_ref())
        .or(video_stream.duration.as_ref())
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);

    let frame_rate = video_stream
        .r_frame_rate
        .as_ref()
        .and_then(|r| parse_frame_rate(r))
        .unwrap_or(30.0);

    // 容器未記錄影格數時，以長度乘幀率估算
    let frame_total = video_stream
        .nb_frames
        .as_ref()
        .and_then(|n| n.parse::<u64>().ok())
        .unwrap_or_else(|| (duration_seconds * frame_rate).round() as u64);

    Ok(VideoInfo {
        duration_seconds,
        width,
        height,
        frame_rate,
        frame_total,
    })
}

/// 解析幀率字串（例如 "30/1" 或 "30000/1001"）
fn parse_frame_rate(rate: &str) -> Option<f64> {
    if let Some((num_str, den_str)) = rate.split_once('/') {
        let num: f64 = num_str.parse().ok()?;
        let den: f64 = den_str.parse().ok()?;
        if den > 0.0 {
            return Some(num / den);
        }
        return None;
    }
    rate.parse().ok()
}

/// 解析 `寬x高` 解析度字串
#[must_use]
pub fn parse_resolution(resolution: &str) -> Option<(u32, u32)> {
    let captures = REGEX_RESOLUTION.captures(resolution.trim())?;
    let width = captures[1].parse().ok()?;
    let height = captures[2].parse().ok()?;
    (width > 0 && height > 0).then_some((width, height))
}
