//! 台帳・スクリプトファイルの退避コピー

use crate::error::Result;
use std::path::{Path, PathBuf};

/// バックアップ名に付けるタイムスタンプ
pub fn backup_stamp() -> String {
    chrono::Local::now().format("%Y%m%d%H%M%S").to_string()
}

/// `<file>.bak-<stamp>` を作成する
///
/// 元ファイルが無ければ何もしない。
pub fn backup_file(path: &Path, stamp: &str) -> Result<Option<PathBuf>> {
    if !path.exists() {
        return Ok(None);
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let dest = path.with_file_name(format!("{}.bak-{}", file_name, stamp));
    std::fs::copy(path, &dest)?;
    tracing::debug!(from = %path.display(), to = %dest.display(), "バックアップを作成");
    Ok(Some(dest))
}
