//! 画像アセットの命名と番号割り当て
//!
//! アセットは `project-<N>.jpg` という名前で画像ディレクトリに置かれる。
//! 拡張子の大文字小文字は区別しない。

use crate::error::{GallerySyncError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

lazy_static::lazy_static! {
    static ref ASSET_RE: Regex = Regex::new(r"^project-(\d+)\.(?i:jpg)$").unwrap();
}

/// ファイル名からアセット番号を取り出す
pub fn parse_asset_id(file_name: &str) -> Option<u32> {
    ASSET_RE
        .captures(file_name)
        .and_then(|cap| cap[1].parse::<u32>().ok())
}

/// 番号からアセットのファイル名を作る
pub fn asset_file_name(id: u32) -> String {
    format!("project-{}.jpg", id)
}

/// 画像ディレクトリ内のアセットを番号順に列挙
///
/// ディレクトリが存在しなければ空のリストを返す。
pub fn list_assets(images_dir: &Path) -> Result<Vec<(u32, PathBuf)>> {
    if !images_dir.exists() {
        return Ok(Vec::new());
    }

    let mut assets = Vec::new();

    for entry in WalkDir::new(images_dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy();
        if let Some(id) = parse_asset_id(&file_name) {
            assets.push((id, entry.path().to_path_buf()));
        }
    }

    assets.sort_by_key(|(id, _)| *id);
    Ok(assets)
}

/// 既存アセットの最大番号（1件もなければ None）
pub fn max_asset_id(images_dir: &Path) -> Result<Option<u32>> {
    Ok(list_assets(images_dir)?.last().map(|(id, _)| *id))
}

/// 次に使える番号
///
/// 最大番号 + 1。ディレクトリが空・存在しない場合は 1。
/// 最大番号が `u32::MAX` なら次の番号は無いのでエラー。
pub fn next_id(images_dir: &Path) -> Result<u32> {
    match max_asset_id(images_dir)? {
        None => Ok(1),
        Some(max) => max.checked_add(1).ok_or_else(|| {
            GallerySyncError::InvalidRange(format!(
                "{} が番号の上限です。これ以上追加できません",
                asset_file_name(max)
            ))
        }),
    }
}

/// `start` から `count` 枚分の番号を振れるか確認
pub fn ensure_ids_fit(start: u32, count: usize) -> Result<()> {
    let capacity = (u32::MAX - start) as usize + 1;
    if count > capacity {
        return Err(GallerySyncError::RangeOverflow {
            range: format!("{}-", start),
            requested: count,
            capacity,
        });
    }
    Ok(())
}

/// 番号の閉区間 `[lo, hi]`（hi 省略時は上限なし）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdRange {
    pub lo: u32,
    pub hi: Option<u32>,
}

impl IdRange {
    pub fn new(lo: u32, hi: Option<u32>) -> Result<Self> {
        if lo == 0 {
            return Err(GallerySyncError::InvalidRange(
                "開始番号は1以上を指定してください".into(),
            ));
        }
        if let Some(hi) = hi {
            if hi < lo {
                return Err(GallerySyncError::InvalidRange(format!(
                    "終了番号 {} が開始番号 {} より小さい",
                    hi, lo
                )));
            }
        }
        Ok(Self { lo, hi })
    }

    pub fn contains(&self, id: u32) -> bool {
        id >= self.lo && self.hi.map_or(true, |hi| id <= hi)
    }

    /// 範囲に収まる件数（上限なしなら None）
    pub fn capacity(&self) -> Option<usize> {
        self.hi.map(|hi| (hi - self.lo) as usize + 1)
    }
}

impl std::fmt::Display for IdRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.hi {
            Some(hi) => write!(f, "{}-{}", self.lo, hi),
            None => write!(f, "{}-", self.lo),
        }
    }
}
