use crate::error::{GallerySyncError, Result};
use crate::optimizer::ImageOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "gallery-sync.json";

/// 元画像フォルダとラベル
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSet {
    pub path: PathBuf,
    pub label: String,
}

/// サイトごとの設定（gallery-sync.json）
///
/// 相対パスは設定ファイルのあるディレクトリ（サイトのルート）から解決する。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub images_dir: PathBuf,
    pub registry_file: PathBuf,
    pub count_file: PathBuf,
    pub max_dimension: u32,
    pub jpeg_quality: u8,
    pub backup: bool,
    pub sources: Vec<SourceSet>,
}

impl Default for Config {
    fn default() -> Self {
        let image = ImageOptions::default();
        Self {
            images_dir: "images".into(),
            registry_file: "location_data.js".into(),
            count_file: "script.js".into(),
            max_dimension: image.max_dimension,
            jpeg_quality: image.quality,
            backup: true,
            sources: Vec::new(),
        }
    }
}

/// 解決済みのサイト内パス
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitePaths {
    pub site_dir: PathBuf,
    pub images_dir: PathBuf,
    pub registry_file: PathBuf,
    pub count_file: PathBuf,
}

impl SitePaths {
    /// 既定のファイル名でサイトのパスを組み立てる
    pub fn under(site_dir: &Path) -> Self {
        Config::default().site_paths(site_dir)
    }
}

impl Config {
    /// 設定ファイルを読み込み（無ければ既定値）
    pub fn load(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_json::from_str(&content)?
        } else {
            tracing::debug!("設定ファイルが無いため既定値を使用: {}", path.display());
            Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// 設定ファイルの場所を決める
    ///
    /// 明示指定が無ければカレントの gallery-sync.json。
    /// 設定ファイルのあるディレクトリがサイトのルートになるため、
    /// ホームディレクトリなどサイト外の設定は探さない。
    pub fn config_path(explicit: Option<&Path>) -> PathBuf {
        match explicit {
            Some(path) => path.to_path_buf(),
            None => PathBuf::from(CONFIG_FILE_NAME),
        }
    }

    /// 設定ファイルの置き場所をサイトのルートとみなす
    pub fn site_dir_for(config_path: &Path) -> PathBuf {
        match config_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_dimension == 0 {
            return Err(GallerySyncError::Config("max_dimension は1以上にしてください".into()));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(GallerySyncError::Config(format!(
                "jpeg_quality は1〜100で指定してください: {}",
                self.jpeg_quality
            )));
        }
        if let Some(set) = self.sources.iter().find(|s| s.label.trim().is_empty()) {
            return Err(GallerySyncError::Config(format!(
                "ラベルが空の元画像フォルダがあります: {}",
                set.path.display()
            )));
        }
        Ok(())
    }

    pub fn site_paths(&self, site_dir: &Path) -> SitePaths {
        SitePaths {
            site_dir: site_dir.to_path_buf(),
            images_dir: site_dir.join(&self.images_dir),
            registry_file: site_dir.join(&self.registry_file),
            count_file: site_dir.join(&self.count_file),
        }
    }

    pub fn image_options(&self) -> ImageOptions {
        ImageOptions {
            max_dimension: self.max_dimension,
            quality: self.jpeg_quality,
        }
    }

    /// 元画像フォルダをサイトのルート基準で解決
    pub fn source_sets(&self, site_dir: &Path) -> Vec<SourceSet> {
        self.sources
            .iter()
            .map(|s| SourceSet {
                path: site_dir.join(&s.path),
                label: s.label.clone(),
            })
            .collect()
    }
}
