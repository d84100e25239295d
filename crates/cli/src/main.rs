use anyhow::Result;
use clap::{Parser, ValueEnum};
use phone_media_renamer_core::{
    app_paths, load_config, rename_media, AppConfig, CollisionPolicy, RenameOutcome, RunOptions,
    RunReport,
};
use std::path::{Path, PathBuf};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "phone-media-renamer")]
#[command(about = "スマートフォンの写真・動画を撮影日ごとの連番ファイル名に一括リネームします")]
struct Cli {
    /// 対象フォルダ
    #[arg(default_value = ".")]
    directory: PathBuf,
    /// 実ファイルを変更せずに結果だけ表示する
    #[arg(long, default_value_t = false)]
    dry_run: bool,
    /// サブフォルダもフォルダ単位で処理する
    #[arg(long, default_value_t = false, overrides_with = "no_recursive")]
    recursive: bool,
    /// 設定で再帰が有効でも直下のファイルだけを処理する
    #[arg(long, default_value_t = false, overrides_with = "recursive")]
    no_recursive: bool,
    #[arg(long, value_enum)]
    collision: Option<CollisionArg>,
    #[arg(long)]
    ffprobe: Option<String>,
    #[arg(long)]
    probe_timeout_secs: Option<u64>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
    #[arg(long, short, default_value_t = false)]
    verbose: bool,
    /// 設定ファイルの場所と内容を表示して終了する
    #[arg(long, default_value_t = false)]
    show_config: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CollisionArg {
    Skip,
    NextFree,
}

impl From<CollisionArg> for CollisionPolicy {
    fn from(value: CollisionArg) -> Self {
        match value {
            CollisionArg::Skip => CollisionPolicy::Skip,
            CollisionArg::NextFree => CollisionPolicy::NextFree,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.show_config {
        return cmd_config_show(&load_config()?);
    }
    let mut config = config_or_default(load_config());
    apply_overrides(&mut config, &cli);
    cmd_rename(&cli, &config)
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// A broken or unreachable config file must not block renaming.
fn config_or_default(loaded: Result<AppConfig>) -> AppConfig {
    loaded.unwrap_or_else(|err| {
        warn!("設定ファイルを読めないため既定値で続行します: {err:#}");
        AppConfig::default()
    })
}

fn apply_overrides(config: &mut AppConfig, cli: &Cli) {
    if let Some(policy) = cli.collision {
        config.collision_policy = policy.into();
    }
    if let Some(ffprobe) = &cli.ffprobe {
        config.ffprobe_path = ffprobe.clone();
    }
    if let Some(secs) = cli.probe_timeout_secs {
        config.probe_timeout_secs = secs;
    }
    if cli.recursive {
        config.recursive_default = true;
    } else if cli.no_recursive {
        config.recursive_default = false;
    }
}

fn cmd_rename(cli: &Cli, config: &AppConfig) -> Result<()> {
    if !config.probe().is_available() {
        eprintln!(
            "警告: ffprobe が見つかりません ({})。動画はファイル日時で代用します。",
            config.ffprobe_path
        );
    }

    let options = RunOptions {
        root: cli.directory.clone(),
        dry_run: cli.dry_run,
        recursive: config.recursive_default,
        collision_policy: config.collision_policy,
    };

    let report = rename_media(&options, &config.resolver())?;

    match cli.output {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Table => {
            print_table(&report);
        }
    }

    if report.dry_run {
        eprintln!("dry-runモード: 実ファイルは変更していません。");
    }

    Ok(())
}

fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let paths = app_paths()?;
    println!("設定ファイル: {}", paths.config_path.display());
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

fn print_table(report: &RunReport) {
    if report.root_missing {
        println!("フォルダが存在しません: {}", report.root.display());
        return;
    }
    if report.batches.is_empty() && report.errors.is_empty() {
        println!("写真・動画が見つかりませんでした: {}", report.root.display());
        return;
    }

    for batch in &report.batches {
        println!("\n[{}]", batch.plan.directory.display());
        for (candidate, outcome) in batch.plan.candidates.iter().zip(&batch.result.outcomes) {
            println!("  {} ({:?})", describe(outcome), candidate.date_source);
            if let Some(warning) = &candidate.warning {
                println!("    警告: {warning}");
            }
        }
        println!(
            "  集計: 対象={} リネーム={} 変更なし={} 衝突スキップ={} 失敗={}",
            batch.result.considered,
            batch.result.renamed,
            batch.result.unchanged,
            batch.result.skipped,
            batch.result.failed
        );
    }

    for error in &report.errors {
        println!("\n[{}] 処理できませんでした: {}", error.directory.display(), error.error);
    }

    println!(
        "\n合計: {}フォルダ 対象={} リネーム={}",
        report.batches.len(),
        report.total_considered(),
        report.total_renamed()
    );
}

fn describe(outcome: &RenameOutcome) -> String {
    match outcome {
        RenameOutcome::Renamed { from, to } => {
            format!("{} -> {} (リネーム済み)", name_of(from), name_of(to))
        }
        RenameOutcome::WouldRename { from, to } => {
            format!("{} -> {} (DRY RUN)", name_of(from), name_of(to))
        }
        RenameOutcome::Unchanged { path } => format!("{} (命名済み)", name_of(path)),
        RenameOutcome::SkippedCollision { from, to } => {
            format!("{} -> {} (スキップ: 同名ファイルあり)", name_of(from), name_of(to))
        }
        RenameOutcome::Failed { from, to, error } => {
            format!("{} -> {} (失敗: {error})", name_of(from), name_of(to))
        }
    }
}

fn name_of(path: &Path) -> String {
    path.file_name()
        .map(|v| v.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
