//! 以檔案開頭的 magic bytes 判斷媒體種類（不看副檔名）

use anyhow::{Context, Result};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

const SNIFF_LENGTH: usize = 192;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    Unknown,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetMedia {
    pub path: PathBuf,
    pub kind: MediaKind,
}

impl TargetMedia {
    pub fn detect(path: &Path) -> Result<Self> {
        let mut file =
            File::open(path).with_context(|| format!("無法開啟檔案: {}", path.display()))?;
        let mut header = Vec::with_capacity(SNIFF_LENGTH);
        file.by_ref()
            .take(SNIFF_LENGTH as u64)
            .read_to_end(&mut header)
            .with_context(|| format!("讀取檔案失敗: {}", path.display()))?;

        Ok(Self {
            path: path.to_path_buf(),
            kind: sniff_media_kind(&header),
        })
    }

    #[must_use]
    pub fn is_webp(&self) -> bool {
        File::open(&self.path).is_ok_and(|file| {
            let mut header = Vec::with_capacity(12);
            file.take(12).read_to_end(&mut header).is_ok() && is_webp(&header)
        })
    }
}

fn is_webp(header: &[u8]) -> bool {
    riff_form(header) == Some(&b"WEBP"[..])
}

fn riff_form(header: &[u8]) -> Option<&[u8]> {
    (header.len() >= 12 && header.starts_with(b"RIFF")).then(|| &header[8..12])
}

/// ISO BMFF（mp4/mov/m4a）的主要品牌
fn ftyp_brand(header: &[u8]) -> Option<&[u8]> {
    (header.len() >= 12 && &header[4..8] == b"ftyp").then(|| &header[8..12])
}

#[must_use]
pub fn sniff_media_kind(header: &[u8]) -> MediaKind {
    if header.starts_with(b"\x89PNG\r\n\x1a\n")
        || header.starts_with(&[0xFF, 0xD8, 0xFF])
        || header.starts_with(b"GIF87a")
        || header.starts_with(b"GIF89a")
        || header.starts_with(b"BM")
        || header.starts_with(b"II*\0")
        || header.starts_with(b"MM\0*")
        || is_webp(header)
    {
        return MediaKind::Image;
    }

    if let Some(brand) = ftyp_brand(header) {
        return match brand {
            b"M4A " | b"M4B " | b"M4P " => MediaKind::Audio,
            b"avif" | b"avis" | b"heic" | b"heix" | b"mif1" => MediaKind::Image,
            _ => MediaKind::Video,
        };
    }

    match riff_form(header) {
        Some(b"AVI ") => return MediaKind::Video,
        Some(b"WAVE") => return MediaKind::Audio,
        _ => {}
    }

    if header.starts_with(&[0x1A, 0x45, 0xDF, 0xA3])
        || header.starts_with(b"FLV\x01")
        || header.starts_with(&[0x00, 0x00, 0x01, 0xBA])
        || header.starts_with(&[0x30, 0x26, 0xB2, 0x75])
        || (header.len() > 188 && header[0] == 0x47 && header[188] == 0x47)
    {
        return MediaKind::Video;
    }

    if header.starts_with(b"ID3")
        || header.starts_with(b"fLaC")
        || header.starts_with(b"OggS")
        || (header.len() >= 2
            && header[0] == 0xFF
            && matches!(header[1], 0xFB | 0xF3 | 0xF2 | 0xF1 | 0xF9))
    {
        return MediaKind::Audio;
    }

    MediaKind::Unknown
}
