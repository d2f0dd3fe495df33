use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// 輸出影片編碼器（序列化為 ffmpeg 的編碼器名稱）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OutputVideoEncoder {
    #[default]
    #[serde(rename = "libx264")]
    Libx264,
    #[serde(rename = "libx265")]
    Libx265,
    #[serde(rename = "libvpx-vp9")]
    LibvpxVp9,
    #[serde(rename = "h264_nvenc")]
    H264Nvenc,
    #[serde(rename = "hevc_nvenc")]
    HevcNvenc,
    #[serde(rename = "h264_amf")]
    H264Amf,
    #[serde(rename = "hevc_amf")]
    HevcAmf,
}

impl OutputVideoEncoder {
    #[must_use]
    pub const fn all() -> [Self; 7] {
        [
            Self::Libx264,
            Self::Libx265,
            Self::LibvpxVp9,
            Self::H264Nvenc,
            Self::HevcNvenc,
            Self::H264Amf,
            Self::HevcAmf,
        ]
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Libx264 => "libx264",
            Self::Libx265 => "libx265",
            Self::LibvpxVp9 => "libvpx-vp9",
            Self::H264Nvenc => "h264_nvenc",
            Self::HevcNvenc => "hevc_nvenc",
            Self::H264Amf => "h264_amf",
            Self::HevcAmf => "hevc_amf",
        }
    }
}

impl fmt::Display for OutputVideoEncoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputVideoEncoder {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::all()
            .into_iter()
            .find(|encoder| encoder.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("不支援的編碼器: {s}"))
    }
}

/// 編碼預設（由最快到最慢的九個等級）
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputVideoPreset {
    Ultrafast,
    Superfast,
    #[default]
    Veryfast,
    Faster,
    Fast,
    Medium,
    Slow,
    Slower,
    Veryslow,
}

impl OutputVideoPreset {
    #[must_use]
    pub const fn all() -> [Self; 9] {
        [
            Self::Ultrafast,
            Self::Superfast,
            Self::Veryfast,
            Self::Faster,
            Self::Fast,
            Self::Medium,
            Self::Slow,
            Self::Slower,
            Self::Veryslow,
        ]
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ultrafast => "ultrafast",
            Self::Superfast => "superfast",
            Self::Veryfast => "veryfast",
            Self::Faster => "faster",
            Self::Fast => "fast",
            Self::Medium => "medium",
            Self::Slow => "slow",
            Self::Slower => "slower",
            Self::Veryslow => "veryslow",
        }
    }
}

impl fmt::Display for OutputVideoPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputVideoPreset {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::all()
            .into_iter()
            .find(|preset| preset.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("不支援的編碼預設: {s}"))
    }
}

/// 暫存影格的圖片格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TempFrameFormat {
    Bmp,
    #[default]
    Jpg,
    Png,
}

impl TempFrameFormat {
    #[must_use]
    pub const fn all() -> [Self; 3] {
        [Self::Bmp, Self::Jpg, Self::Png]
    }

    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Bmp => "bmp",
            Self::Jpg => "jpg",
            Self::Png => "png",
        }
    }
}

impl fmt::Display for TempFrameFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// 管線設定（存放於工作目錄下的 settings.json）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// 暫存根目錄，未設定時使用系統暫存目錄
    pub temp_dir: Option<PathBuf>,
    /// 完成後保留工作區
    pub keep_temp: bool,
    /// 工作區已有影格時跳過擷取（續跑）
    pub skip_extract_frames: bool,
    /// 兩段式佈局：讀取工作區影格，寫入 `out` 子目錄
    pub out_new_dir: bool,
    pub hwaccel_cuda: bool,
    pub skip_audio: bool,
    /// 缺少影格時直接失敗，而非略過
    pub strict_frames: bool,
    pub output_video_encoder: OutputVideoEncoder,
    pub output_video_quality: u8,
    pub output_video_preset: OutputVideoPreset,
    pub output_image_quality: u8,
    pub temp_frame_format: TempFrameFormat,
    pub trim_frame_start: Option<u32>,
    pub trim_frame_end: Option<u32>,
    /// 例如 `1920x1080`，未設定時沿用來源解析度
    pub output_video_resolution: Option<String>,
    pub output_video_fps: Option<f64>,
    pub output_image_resolution: Option<String>,
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    pub poll_interval_ms: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            temp_dir: None,
            keep_temp: false,
            skip_extract_frames: false,
            out_new_dir: false,
            hwaccel_cuda: false,
            skip_audio: false,
            strict_frames: false,
            output_video_encoder: OutputVideoEncoder::default(),
            output_video_quality: 80,
            output_video_preset: OutputVideoPreset::default(),
            output_image_quality: 80,
            temp_frame_format: TempFrameFormat::default(),
            trim_frame_start: None,
            trim_frame_end: None,
            output_video_resolution: None,
            output_video_fps: None,
            output_image_resolution: None,
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            poll_interval_ms: 500,
        }
    }
}

impl PipelineSettings {
    pub fn validate(&self) -> Result<()> {
        if self.trim_frame_start == Some(0) || self.trim_frame_end == Some(0) {
            bail!("影格編號從 1 開始，不可為 0");
        }
        if let (Some(start), Some(end)) = (self.trim_frame_start, self.trim_frame_end)
            && start > end
        {
            bail!("起始影格 {start} 大於結束影格 {end}");
        }
        if let Some(fps) = self.output_video_fps
            && !(fps.is_finite() && fps > 0.0)
        {
            bail!("輸出幀率無效: {fps}");
        }
        for resolution in [&self.output_video_resolution, &self.output_image_resolution]
            .into_iter()
            .flatten()
        {
            if crate::tools::parse_resolution(resolution).is_none() {
                bail!("解析度格式錯誤（應為 寬x高）: {resolution}");
            }
        }
        if self.poll_interval_ms == 0 {
            bail!("poll_interval_ms 必須大於 0");
        }
        Ok(())
    }
}
