use thiserror::Error;

#[derive(Error, Debug)]
pub enum GallerySyncError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("フォルダが見つかりません: {0}")]
    FolderNotFound(String),

    #[error("画像読み込みエラー: {0}")]
    ImageLoad(String),

    #[error("画像書き出しエラー: {0}")]
    ImageEncode(String),

    #[error("台帳ファイルの形式が不正: {0}")]
    RegistryFormat(String),

    #[error("TOTAL_IMAGES 定数が見つかりません: {0}")]
    MarkerNotFound(String),

    #[error("番号範囲が不正: {0}")]
    InvalidRange(String),

    #[error("番号範囲 {range} に {requested}枚は収まりません（最大 {capacity}枚）")]
    RangeOverflow {
        range: String,
        requested: usize,
        capacity: usize,
    },

    #[error("別の処理が実行中です。異常終了後であればロックファイルを削除してください: {0}")]
    Locked(String),

    #[error("ユーザーにより中止されました")]
    Cancelled,

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GallerySyncError>;
