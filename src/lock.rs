//! サイト単位の実行ロック
//!
//! 同じサイトに対して2つの処理が同時に番号を割り当てると衝突するため、
//! ロックファイルで2つ目の実行をエラーにする。

use crate::error::{GallerySyncError, Result};
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

const LOCK_FILE_NAME: &str = ".gallery-sync.lock";

/// 保持している間ロックを維持する
#[derive(Debug)]
pub struct SiteLock {
    path: PathBuf,
}

impl SiteLock {
    pub fn acquire(site_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(site_dir)?;
        let path = site_dir.join(LOCK_FILE_NAME);

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                // 調査用に PID を残す
                if let Err(e) = writeln!(file, "{}", std::process::id()) {
                    tracing::debug!("ロックファイルへのPID書き込みに失敗: {}: {}", path.display(), e);
                }
                Ok(Self { path })
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                Err(GallerySyncError::Locked(path.display().to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for SiteLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}
