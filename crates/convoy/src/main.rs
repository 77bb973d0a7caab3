mod commands;
mod serve;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "convoy")]
#[command(about = "リビジョンを渡すと、ホストが追いつく。", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 指定リビジョンへデプロイ
    Deploy {
        /// リビジョン（ブランチ名・タグ名・コミットハッシュ）
        revision: String,
        /// 設定ファイルのパス（省略時は自動探索）
        #[arg(short, long, env = "CONVOY_CONFIG_PATH")]
        config: Option<PathBuf>,
        /// gitワークツリーのディレクトリ（省略時はカレント）
        #[arg(short, long)]
        workdir: Option<PathBuf>,
    },
    /// Webhookを待ち受けるデーモンを起動
    Serve {
        /// 待ち受けアドレス
        #[arg(short, long, default_value = "0.0.0.0:8422")]
        bind: String,
        /// Webhook認証用の共有シークレット
        #[arg(long, env = "CONVOY_WEBHOOK_SECRET", hide_env_values = true)]
        secret: String,
        /// 設定ファイルのパス（省略時は自動探索）
        #[arg(short, long, env = "CONVOY_CONFIG_PATH")]
        config: Option<PathBuf>,
        /// gitワークツリーのディレクトリ（省略時はカレント）
        #[arg(short, long)]
        workdir: Option<PathBuf>,
    },
    /// トポロジーのコンテナ一覧を表示
    Status {
        /// 設定ファイルのパス（省略時は自動探索）
        #[arg(short, long, env = "CONVOY_CONFIG_PATH")]
        config: Option<PathBuf>,
    },
    /// 設定ファイルを検証
    Validate {
        /// 設定ファイルのパス（省略時は自動探索）
        #[arg(short, long, env = "CONVOY_CONFIG_PATH")]
        config: Option<PathBuf>,
    },
    /// バージョンを表示
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt::init();

    // Versionコマンドは設定ファイル不要
    if matches!(cli.command, Commands::Version) {
        println!("convoy {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    match cli.command {
        Commands::Deploy {
            revision,
            config,
            workdir,
        } => {
            let code = commands::deploy::run(&revision, config.as_deref(), workdir.as_deref()).await?;
            std::process::exit(code);
        }
        Commands::Serve {
            bind,
            secret,
            config,
            workdir,
        } => {
            serve::run(&bind, secret, config.as_deref(), workdir.as_deref()).await?;
        }
        Commands::Status { config } => {
            commands::status::run(config.as_deref()).await?;
        }
        Commands::Validate { config } => {
            commands::validate::run(config.as_deref())?;
        }
        Commands::Version => unreachable!(),
    }

    Ok(())
}
