use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gallery-sync")]
#[command(about = "ギャラリー画像の連番取り込み・ロケーション台帳同期ツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 設定ファイル（デフォルト: ./gallery-sync.json）
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// 台帳・スクリプトのバックアップを作らない
    #[arg(long, global = true)]
    pub no_backup: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 次に割り当てる番号を表示
    NextId,

    /// 指定した画像を末尾の番号に追加
    Add {
        /// 元画像ファイル
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// ロケーション名（1つなら全画像共通、複数ならファイルと同数）
        #[arg(short, long = "label", required = true)]
        labels: Vec<String>,
    },

    /// 設定の元画像フォルダをすべて取り込んで追加
    Sync,

    /// 番号範囲を捨てて、設定の元画像フォルダで置き換える
    Reprocess {
        /// 開始番号
        #[arg(long, required = true)]
        from: u32,

        /// 終了番号（省略時は開始番号以降すべて）
        #[arg(long)]
        to: Option<u32>,

        /// 確認せずに実行
        #[arg(short, long)]
        yes: bool,
    },

    /// 番号範囲の画像と台帳エントリを削除
    DeleteRange {
        /// 開始番号
        #[arg(long, required = true)]
        from: u32,

        /// 終了番号（省略時は開始番号以降すべて）
        #[arg(long)]
        to: Option<u32>,

        /// 確認せずに実行
        #[arg(short, long)]
        yes: bool,
    },

    /// TOTAL_IMAGES を画像フォルダの最大番号に合わせる
    SetTotal,

    /// 画像・台帳・TOTAL_IMAGES の整合性を確認
    Check,

    /// 設定を表示/作成
    Config {
        /// 設定を表示
        #[arg(long)]
        show: bool,

        /// 既定値で設定ファイルを作成
        #[arg(long)]
        init: bool,
    },
}
