use clap::Parser;
use dialoguer::Confirm;
use gallery_sync::{cli, config, error, logging, scanner, sync};
use gallery_sync::asset::IdRange;
use cli::{Cli, Commands};
use config::Config;
use error::{GallerySyncError, Result};
use scanner::SourceImage;
use std::path::PathBuf;
use sync::{SyncOptions, SyncReport, Synchronizer};

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let config_path = Config::config_path(cli.config.as_deref());
    let site_dir = Config::site_dir_for(&config_path);

    let config = Config::load(&config_path)?;
    let synchronizer = Synchronizer::new(
        config.site_paths(&site_dir),
        config.image_options(),
        SyncOptions {
            backup: config.backup && !cli.no_backup,
            progress: true,
        },
    );

    match cli.command {
        Commands::NextId => {
            println!("{}", synchronizer.next_id()?);
        }

        Commands::Add { files, labels } => {
            println!("🖼  gallery-sync - 画像追加\n");
            let batch = pair_labels(files, labels)?;
            let report = synchronizer.append(&batch)?;
            print_report(&report);
        }

        Commands::Sync => {
            println!("🖼  gallery-sync - 元画像フォルダ取り込み\n");
            let batch = scanner::collect_sources(&config.source_sets(&site_dir));
            println!("✔ {}枚の元画像を検出\n", batch.len());
            let report = synchronizer.append(&batch)?;
            print_report(&report);
        }

        Commands::Reprocess { from, to, yes } => {
            println!("♻  gallery-sync - 範囲の再取り込み\n");
            let range = IdRange::new(from, to)?;
            let batch = scanner::collect_sources(&config.source_sets(&site_dir));
            println!("✔ {}枚の元画像を検出", batch.len());

            if batch.is_empty() {
                println!("元画像がないため何も変更しません");
                return Ok(());
            }
            confirm(yes, &format!("project-{} の画像を削除して置き換えますか？", range))?;

            let report = synchronizer.replace_range(range, &batch)?;
            if report.committed() {
                println!("- 削除: 画像 {}枚 / 台帳 {}件", report.deleted_assets, report.removed_entries);
            }
            print_report(&report);
        }

        Commands::DeleteRange { from, to, yes } => {
            let range = IdRange::new(from, to)?;
            confirm(yes, &format!("project-{} の画像と台帳エントリを削除しますか？", range))?;

            let report = synchronizer.delete_range(range)?;
            println!("✔ 画像 {}枚 / 台帳 {}件を削除", report.deleted_assets.len(), report.removed_entries);
            if let Some(total) = report.total {
                println!("✔ TOTAL_IMAGES = {}", total);
            }
            print_backups(&report.backups);
        }

        Commands::SetTotal => {
            let (previous, total) = synchronizer.refresh_total()?;
            match previous {
                Some(previous) => println!("✔ TOTAL_IMAGES: {} → {}", previous, total),
                None => println!("✔ TOTAL_IMAGES = {}", total),
            }
        }

        Commands::Check => {
            let report = synchronizer.check()?;
            println!("画像: {}枚 / 台帳: {}件", report.asset_count, report.entry_count);
            println!(
                "最大番号: {} / TOTAL_IMAGES: {}",
                report.max_id.map(|n| n.to_string()).unwrap_or_else(|| "-".into()),
                report.marker.map(|n| n.to_string()).unwrap_or_else(|| "-".into())
            );
            for name in &report.unregistered_assets {
                println!("⚠ 台帳に未登録: {}", name);
            }
            for name in &report.orphan_entries {
                println!("⚠ 画像がない台帳エントリ: {}", name);
            }
            for name in &report.foreign_keys {
                println!("⚠ 命名規則外のキー: {}", name);
            }
            if !report.marker_matches() {
                println!("⚠ TOTAL_IMAGES が最大番号と一致しません（`gallery-sync set-total` で修正）");
            }
            if report.is_consistent() {
                println!("✅ 整合しています");
            }
        }

        Commands::Config { show, init } => {
            run_config(&config_path, show, init)?;
        }
    }

    Ok(())
}

fn run_config(path: &std::path::Path, show: bool, init: bool) -> Result<()> {
    if init {
        if path.exists() {
            return Err(GallerySyncError::Config(format!(
                "設定ファイルは既に存在します: {}",
                path.display()
            )));
        }
        Config::default().save(path)?;
        println!("✔ 設定ファイルを作成しました: {}", path.display());
    }

    if show || !init {
        let config = Config::load(path)?;
        println!("設定: {}", path.display());
        println!("  画像フォルダ: {}", config.images_dir.display());
        println!("  台帳ファイル: {}", config.registry_file.display());
        println!("  TOTAL_IMAGES: {}", config.count_file.display());
        println!("  最大画像サイズ: {}px", config.max_dimension);
        println!("  JPEG品質: {}", config.jpeg_quality);
        println!("  バックアップ: {}", if config.backup { "有効" } else { "無効" });
        for set in &config.sources {
            println!("  元画像: {} → {}", set.path.display(), set.label);
        }
    }

    Ok(())
}

/// ファイルとラベルを対応付ける
fn pair_labels(files: Vec<PathBuf>, labels: Vec<String>) -> Result<Vec<SourceImage>> {
    match labels.len() {
        1 => Ok(files.into_iter().map(|f| SourceImage::new(f, labels[0].clone())).collect()),
        n if n == files.len() => Ok(files
            .into_iter()
            .zip(labels)
            .map(|(f, l)| SourceImage::new(f, l))
            .collect()),
        n => Err(GallerySyncError::Config(format!(
            "ラベルは1つ、またはファイル数（{}）と同数を指定してください: {}個",
            files.len(),
            n
        ))),
    }
}

fn confirm(yes: bool, prompt: &str) -> Result<()> {
    if yes {
        return Ok(());
    }
    let accepted = Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(|e| GallerySyncError::Io(std::io::Error::other(e.to_string())))?;
    if accepted {
        Ok(())
    } else {
        Err(GallerySyncError::Cancelled)
    }
}

fn print_report(report: &SyncReport) {
    for entry in &report.added {
        println!("  + {}: {}", entry.file_name, entry.label);
    }
    for failure in &report.failures {
        println!("⚠ 失敗: {} ({})", failure.source.display(), failure.reason);
    }

    match report.total {
        Some(total) => {
            println!("\n✔ {}枚を追加 / {}枚失敗", report.added.len(), report.failures.len());
            println!("✔ TOTAL_IMAGES = {}", total);
            print_backups(&report.backups);
            println!("\n✅ 完了");
        }
        None => println!("\n取り込めた画像がないため台帳は更新していません"),
    }
}

fn print_backups(backups: &[PathBuf]) {
    for path in backups {
        println!("- バックアップ: {}", path.display());
    }
}
