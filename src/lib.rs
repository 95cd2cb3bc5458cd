//! ギャラリー画像の連番取り込みと台帳同期
//!
//! `project-<N>.jpg` 形式の画像ディレクトリ、`location_data.js` の
//! ロケーション台帳、`script.js` の `TOTAL_IMAGES` 定数を
//! ひとつの手順で整合させる。
//!
//! 同一サイトに対する同時実行はサポートしない（[`lock::SiteLock`] で検出してエラーにする）。

pub mod asset;
pub mod backup;
pub mod cli;
pub mod config;
pub mod error;
pub mod lock;
pub mod logging;
pub mod marker;
pub mod optimizer;
pub mod registry;
pub mod scanner;
pub mod sync;
