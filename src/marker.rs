//! `const TOTAL_IMAGES = <N>;` の読み書き

use crate::error::{GallerySyncError, Result};
use crate::registry::write_replacing;
use regex::Regex;
use std::path::Path;

lazy_static::lazy_static! {
    static ref TOTAL_RE: Regex = Regex::new(r"(const\s+TOTAL_IMAGES\s*=\s*)(\d+)(\s*;)").unwrap();
}

/// 置換結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerUpdate {
    pub content: String,
    /// 置き換える前の値（最初の出現）
    pub previous: Option<u32>,
    /// 定数宣言の出現回数（2以上なら宣言が重複している）
    pub occurrences: usize,
}

/// 最初に出現する TOTAL_IMAGES の値
///
/// 宣言が無ければ `Ok(None)`。値が u32 に収まらなければ `InvalidRange`。
pub fn read_total(text: &str) -> Result<Option<u32>> {
    let Some(cap) = TOTAL_RE.captures(text) else {
        return Ok(None);
    };
    cap[2].parse::<u32>().map(Some).map_err(|_| {
        GallerySyncError::InvalidRange(format!("TOTAL_IMAGES の値が大きすぎます: {}", &cap[2]))
    })
}

/// TOTAL_IMAGES の値を置き換える
///
/// 宣言が複数ある場合はすべて置き換える。
pub fn replace_total(text: &str, total: u32) -> Result<MarkerUpdate> {
    let occurrences = TOTAL_RE.find_iter(text).count();
    if occurrences == 0 {
        return Err(GallerySyncError::MarkerNotFound(
            "`const TOTAL_IMAGES = <数値>;` の行がありません".into(),
        ));
    }

    let content = TOTAL_RE
        .replace_all(text, |cap: &regex::Captures| {
            format!("{}{}{}", &cap[1], total, &cap[3])
        })
        .into_owned();

    Ok(MarkerUpdate {
        content,
        // 範囲外の値は上書きで直せるので前の値は無しとして扱う
        previous: read_total(text).ok().flatten(),
        occurrences,
    })
}

/// ファイル内の TOTAL_IMAGES を更新し、更新前の値を返す
pub fn update_total_file(path: &Path, total: u32) -> Result<Option<u32>> {
    if !path.exists() {
        return Err(GallerySyncError::FileNotFound(path.display().to_string()));
    }
    let text = std::fs::read_to_string(path)?;
    let update = replace_total(&text, total)
        .map_err(|_| GallerySyncError::MarkerNotFound(path.display().to_string()))?;

    if update.occurrences > 1 {
        tracing::warn!(
            "{} に TOTAL_IMAGES の宣言が{}箇所あります。すべて {} に更新しました",
            path.display(),
            update.occurrences,
            total
        );
    }

    if update.content != text {
        write_replacing(path, &update.content)?;
    }
    Ok(update.previous)
}

/// ファイルから TOTAL_IMAGES を読む
pub fn read_total_file(path: &Path) -> Result<Option<u32>> {
    if !path.exists() {
        return Err(GallerySyncError::FileNotFound(path.display().to_string()));
    }
    read_total(&std::fs::read_to_string(path)?)
}
