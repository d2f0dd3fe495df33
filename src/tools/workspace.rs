//! 工作區（暫存目錄）管理
//!
//! 每個目標檔案對應一個工作區：`<root>/<hash(檔名主幹)>`。
//! 只以檔名主幹（不含副檔名）計算雜湊，不同目錄下同名的檔案會共用同一個工作區。

use crate::tools::ensure_directory_exists;
use anyhow::{Context, Result};
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};

pub const TEMP_DIRECTORY_NAME: &str = "video_frame_pipeline";
pub const TEMP_OUTPUT_VIDEO_NAME: &str = "temp.mp4";
pub const OUT_DIRECTORY_NAME: &str = "out";
pub const FRAME_RANGE_RECORD_NAME: &str = "frame_range.json";
pub const CONCAT_MANIFEST_NAME: &str = "source.txt";

/// 工作區名稱取 BLAKE3 十六進位字串的前 32 個字元
const WORKSPACE_KEY_LENGTH: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
    path: PathBuf,
}

/// 以檔名主幹計算工作區名稱
#[must_use]
pub fn workspace_key(stem: &str) -> String {
    let hash = blake3::hash(stem.as_bytes());
    hash.to_hex().as_str()[..WORKSPACE_KEY_LENGTH].to_string()
}

/// 系統暫存目錄下的預設根目錄
#[must_use]
pub fn default_temp_root() -> PathBuf {
    std::env::temp_dir().join(TEMP_DIRECTORY_NAME)
}

impl Workspace {
    #[must_use]
    pub fn resolve(target_path: &Path, temp_dir: Option<&Path>) -> Self {
        let stem = target_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let root = temp_dir.map_or_else(default_temp_root, Path::to_path_buf);
        let path = root.join(workspace_key(&stem));
        Self { root, path }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 兩段式佈局的輸出目錄
    #[must_use]
    pub fn out_dir(&self) -> PathBuf {
        self.path.join(OUT_DIRECTORY_NAME)
    }

    /// 合併時讀取影格的目錄
    #[must_use]
    pub fn merge_source_dir(&self, out_new_dir: bool) -> PathBuf {
        if out_new_dir {
            self.out_dir()
        } else {
            self.path.clone()
        }
    }

    #[must_use]
    pub fn temp_output_video_path(&self) -> PathBuf {
        self.path.join(TEMP_OUTPUT_VIDEO_NAME)
    }

    #[must_use]
    pub fn frame_range_record_path(&self) -> PathBuf {
        self.path.join(FRAME_RANGE_RECORD_NAME)
    }

    /// 建立工作區（可重複呼叫）
    pub fn create(&self, out_new_dir: bool) -> Result<()> {
        info!("建立工作區: {}", self.path.display());
        ensure_directory_exists(&self.path)
            .with_context(|| format!("無法建立工作區: {}", self.path.display()))?;
        if out_new_dir {
            let out_dir = self.out_dir();
            ensure_directory_exists(&out_dir)
                .with_context(|| format!("無法建立輸出目錄: {}", out_dir.display()))?;
        }
        Ok(())
    }

    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.is_dir()
    }

    /// 工作區存在且至少含有一個檔案
    #[must_use]
    pub fn has_files(&self) -> bool {
        fs::read_dir(&self.path).is_ok_and(|entries| {
            entries
                .filter_map(std::result::Result::ok)
                .any(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
        })
    }

    /// 刪除工作區；根目錄因此變空時一併刪除
    pub fn clear(&self, keep_temp: bool) -> Result<()> {
        if !keep_temp && self.exists() {
            fs::remove_dir_all(&self.path)
                .with_context(|| format!("無法刪除工作區: {}", self.path.display()))?;
            info!("已刪除工作區: {}", self.path.display());
        }

        if self.root.is_dir() {
            let is_empty = fs::read_dir(&self.root)
                .with_context(|| format!("無法讀取暫存根目錄: {}", self.root.display()))?
                .next()
                .is_none();
            if is_empty {
                fs::remove_dir(&self.root)
                    .with_context(|| format!("無法刪除暫存根目錄: {}", self.root.display()))?;
                debug!("已刪除空的暫存根目錄: {}", self.root.display());
            }
        }
        Ok(())
    }

    /// 將暫存輸出影片移到最終位置，覆蓋既有檔案
    pub fn move_temp(&self, output_path: &Path) -> Result<bool> {
        let temp_output = self.temp_output_video_path();
        if !temp_output.is_file() {
            return Ok(false);
        }

        if output_path.is_file() {
            fs::remove_file(output_path)
                .with_context(|| format!("無法刪除既有輸出檔案: {}", output_path.display()))?;
        }

        // 跨檔案系統時 rename 會失敗，改以複製後刪除
        if fs::rename(&temp_output, output_path).is_err() {
            fs::copy(&temp_output, output_path).with_context(|| {
                format!(
                    "無法移動暫存輸出: {} -> {}",
                    temp_output.display(),
                    output_path.display()
                )
            })?;
            fs::remove_file(&temp_output)
                .with_context(|| format!("無法刪除暫存輸出: {}", temp_output.display()))?;
        }

        info!("已輸出: {}", output_path.display());
        Ok(true)
    }

    /// 暫存輸出已不存在，或目的檔不小於暫存輸出
    #[must_use]
    pub fn is_temp_moved(&self, output_path: &Path) -> bool {
        let Ok(temp_meta) = fs::metadata(self.temp_output_video_path()) else {
            return true;
        };
        if !temp_meta.is_file() {
            return true;
        }
        fs::metadata(output_path).is_ok_and(|m| m.is_file() && m.len() >= temp_meta.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_workspace_path_is_root_joined_with_stem_hash() {
        let root = Path::new("/scratch");
        let workspace = Workspace::resolve(Path::new("/videos/clip.mp4"), Some(root));
        assert_eq!(workspace.path(), root.join(workspace_key("clip")));
        assert_eq!(workspace_key("clip").len(), WORKSPACE_KEY_LENGTH);
    }

    #[test]
    fn test_workspace_key_is_stable() {
        assert_eq!(workspace_key("影片 01"), workspace_key("影片 01"));
        assert_ne!(workspace_key("clip_a"), workspace_key("clip_b"));
    }

    #[test]
    fn test_same_stem_collides_known_limitation() {
        let root = Path::new("/scratch");
        let a = Workspace::resolve(Path::new("/a/clip.mp4"), Some(root));
        let b = Workspace::resolve(Path::new("/b/clip.mkv"), Some(root));
        // 只看檔名主幹：不同目錄、不同副檔名仍共用工作區
        assert_eq!(a.path(), b.path());
    }

    #[test]
    fn test_default_root_is_under_system_temp() {
        let workspace = Workspace::resolve(Path::new("clip.mp4"), None);
        assert_eq!(workspace.root(), default_temp_root());
    }

    #[test]
    fn test_create_is_idempotent_and_makes_out_dir() {
        let dir = TempDir::new().unwrap();
        let workspace = Workspace::resolve(Path::new("clip.mp4"), Some(&dir.path().join("nested")));

        workspace.create(true).unwrap();
        workspace.create(true).unwrap();
        assert!(workspace.exists());
        assert!(workspace.out_dir().is_dir());
        assert!(!workspace.has_files());

        fs::write(workspace.path().join("0001.jpg"), b"frame").unwrap();
        assert!(workspace.has_files());
    }

    #[test]
    fn test_clear_removes_empty_parent() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("root");
        let workspace = Workspace::resolve(Path::new("clip.mp4"), Some(&root));
        workspace.create(false).unwrap();
        fs::write(workspace.path().join("0001.jpg"), b"frame").unwrap();

        workspace.clear(false).unwrap();
        assert!(!workspace.exists());
        assert!(!root.exists());
    }

    #[test]
    fn test_clear_keeps_parent_with_other_workspaces() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("root");
        let first = Workspace::resolve(Path::new("first.mp4"), Some(&root));
        let second = Workspace::resolve(Path::new("second.mp4"), Some(&root));
        first.create(false).unwrap();
        second.create(false).unwrap();

        first.clear(false).unwrap();
        assert!(!first.exists());
        assert!(second.exists());
        assert!(root.is_dir());
    }

    #[test]
    fn test_clear_with_keep_temp_leaves_workspace() {
        let dir = TempDir::new().unwrap();
        let workspace = Workspace::resolve(Path::new("clip.mp4"), Some(dir.path()));
        workspace.create(false).unwrap();

        workspace.clear(true).unwrap();
        assert!(workspace.exists());
    }

    #[test]
    fn test_move_temp_replaces_destination() {
        let dir = TempDir::new().unwrap();
        let workspace = Workspace::resolve(Path::new("clip.mp4"), Some(&dir.path().join("root")));
        workspace.create(false).unwrap();
        let output = dir.path().join("result.mp4");

        assert!(!workspace.move_temp(&output).unwrap());

        fs::write(&output, b"old").unwrap();
        fs::write(workspace.temp_output_video_path(), b"new video").unwrap();
        assert!(!workspace.is_temp_moved(&output));

        assert!(workspace.move_temp(&output).unwrap());
        assert_eq!(fs::read(&output).unwrap(), b"new video");
        assert!(!workspace.temp_output_video_path().exists());
        assert!(workspace.is_temp_moved(&output));
    }
}
