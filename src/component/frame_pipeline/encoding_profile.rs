//! 將抽象的品質 / 預設轉換為各編碼器的 ffmpeg 參數
//!
//! 壓縮值 = round(上限 - 品質 * 上限 / 100)，四捨五入採「遠離零」，
//! 以整數運算精確計算，避免 0.51 之類的浮點誤差。

use crate::config::{OutputVideoEncoder, OutputVideoPreset};

const H26X_MAX_COMPRESSION: u32 = 51;
const VP9_MAX_COMPRESSION: u32 = 63;

/// 編碼器家族，決定參數格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderFamily {
    /// libx264 / libx265
    Software,
    Vp9,
    Nvenc,
    Amf,
}

impl From<OutputVideoEncoder> for EncoderFamily {
    fn from(encoder: OutputVideoEncoder) -> Self {
        match encoder {
            OutputVideoEncoder::Libx264 | OutputVideoEncoder::Libx265 => Self::Software,
            OutputVideoEncoder::LibvpxVp9 => Self::Vp9,
            OutputVideoEncoder::H264Nvenc | OutputVideoEncoder::HevcNvenc => Self::Nvenc,
            OutputVideoEncoder::H264Amf | OutputVideoEncoder::HevcAmf => Self::Amf,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodingProfile {
    encoder: OutputVideoEncoder,
    quality: u32,
    preset: OutputVideoPreset,
}

impl EncodingProfile {
    /// 品質先截斷到 0..=100
    #[must_use]
    pub fn new(encoder: OutputVideoEncoder, quality: i32, preset: OutputVideoPreset) -> Self {
        Self {
            encoder,
            quality: quality.clamp(0, 100).unsigned_abs(),
            preset,
        }
    }

    #[must_use]
    pub const fn encoder(&self) -> OutputVideoEncoder {
        self.encoder
    }

    #[must_use]
    pub const fn quality(&self) -> u32 {
        self.quality
    }

    #[must_use]
    pub const fn preset(&self) -> OutputVideoPreset {
        self.preset
    }

    #[must_use]
    pub fn family(&self) -> EncoderFamily {
        EncoderFamily::from(self.encoder)
    }

    /// crf / cq / qp 的數值
    #[must_use]
    pub fn compression(&self) -> u32 {
        let max = match self.family() {
            EncoderFamily::Vp9 => VP9_MAX_COMPRESSION,
            EncoderFamily::Software | EncoderFamily::Nvenc | EncoderFamily::Amf => {
                H26X_MAX_COMPRESSION
            }
        };
        scale_compression(self.quality, max)
    }

    /// 編碼器專屬的預設值，VP9 沒有預設參數
    #[must_use]
    pub fn preset_value(&self) -> Option<&'static str> {
        match self.family() {
            EncoderFamily::Software => Some(self.preset.as_str()),
            EncoderFamily::Vp9 => None,
            EncoderFamily::Nvenc => Some(nvenc_preset(self.preset)),
            EncoderFamily::Amf => Some(amf_preset(self.preset)),
        }
    }

    /// `-c:v <encoder>`
    #[must_use]
    pub fn codec_args(&self) -> Vec<String> {
        vec!["-c:v".to_string(), self.encoder.as_str().to_string()]
    }

    /// 品質與預設參數
    #[must_use]
    pub fn quality_args(&self) -> Vec<String> {
        let compression = self.compression().to_string();

        match self.family() {
            EncoderFamily::Software => vec![
                "-crf".into(),
                compression,
                "-preset".into(),
                self.preset.as_str().into(),
            ],
            EncoderFamily::Vp9 => vec!["-crf".into(), compression],
            EncoderFamily::Nvenc => vec![
                "-cq".into(),
                compression,
                "-preset".into(),
                nvenc_preset(self.preset).into(),
            ],
            EncoderFamily::Amf => vec![
                "-qp_i".into(),
                compression.clone(),
                "-qp_p".into(),
                compression,
                "-quality".into(),
                amf_preset(self.preset).into(),
            ],
        }
    }
}

/// round(max - quality * max / 100)，遠離零四捨五入
const fn scale_compression(quality: u32, max: u32) -> u32 {
    ((100 - quality) * max + 50) / 100
}

/// NVENC 只分三級
#[must_use]
pub const fn nvenc_preset(preset: OutputVideoPreset) -> &'static str {
    match preset {
        OutputVideoPreset::Ultrafast
        | OutputVideoPreset::Superfast
        | OutputVideoPreset::Veryfast
        | OutputVideoPreset::Faster
        | OutputVideoPreset::Fast => "fast",
        OutputVideoPreset::Medium => "medium",
        OutputVideoPreset::Slow | OutputVideoPreset::Slower | OutputVideoPreset::Veryslow => {
            "slow"
        }
    }
}

/// AMF 的 `-quality` 三級
#[must_use]
pub const fn amf_preset(preset: OutputVideoPreset) -> &'static str {
    match preset {
        OutputVideoPreset::Ultrafast | OutputVideoPreset::Superfast | OutputVideoPreset::Veryfast => {
            "speed"
        }
        OutputVideoPreset::Faster | OutputVideoPreset::Fast | OutputVideoPreset::Medium => {
            "balanced"
        }
        OutputVideoPreset::Slow | OutputVideoPreset::Slower | OutputVideoPreset::Veryslow => {
            "quality"
        }
    }
}
