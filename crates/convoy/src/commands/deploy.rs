//! deployコマンド
//!
//! 指定リビジョンへのデプロイRunを1回実行し、終了コードで結果を返す。

use colored::Colorize;
use convoy_container::DockerRuntime;
use convoy_core::model::{DeploymentRequest, RunStatus};
use convoy_core::run::DeploymentRun;
use convoy_source::GitWorkspace;
use std::path::Path;

pub async fn run(
    revision: &str,
    config: Option<&Path>,
    workdir: Option<&Path>,
) -> anyhow::Result<i32> {
    let (topology, config_path) = super::load_config(config)?;
    let workdir = match workdir {
        Some(p) => p.to_path_buf(),
        None => std::env::current_dir()?,
    };

    println!();
    println!(
        "{}",
        format!(
            "【Step 1/3】設定を読み込みました: {} ({}サービス)",
            config_path.display(),
            topology.services.len()
        )
        .blue()
    );

    println!();
    println!("{}", "【Step 2/3】Dockerに接続中...".blue());
    let runtime = DockerRuntime::connect(&workdir).await?;
    println!("  ✓ 接続完了");

    let source = GitWorkspace::new(&workdir).with_remote(&topology.remote);

    println!();
    println!(
        "{}",
        format!("【Step 3/3】デプロイ実行中: revision={}", revision).green()
    );

    let request = DeploymentRequest::manual(revision);
    let report = DeploymentRun::new(request)
        .execute(&runtime, &source, &topology)
        .await;

    print_report(&report);
    Ok(report.status.exit_code())
}

fn print_report(report: &convoy_core::model::RunReport) {
    let elapsed = (report.ended_at - report.started_at).num_seconds();
    println!();
    match report.status {
        RunStatus::Succeeded => {
            println!(
                "{}",
                format!(
                    "✓ デプロイ成功: {} ({}回の確認で収束、{}秒)",
                    report.request.revision,
                    report.attempts.len(),
                    elapsed
                )
                .green()
                .bold()
            );
        }
        RunStatus::FailedTimeout => {
            println!(
                "{}",
                format!(
                    "✗ 収束タイムアウト: {}回確認しても全サービスがhealthyになりませんでした",
                    report.attempts.len()
                )
                .red()
                .bold()
            );
        }
        status => {
            println!("{}", format!("✗ デプロイ失敗: {}", status).red().bold());
        }
    }

    // 最後のスナップショットをサービス別に表示
    if let Some(last) = report.attempts.last() {
        println!();
        for (service, state) in &last.per_service {
            let mark = match state {
                convoy_core::model::HealthState::Healthy => "✓".green(),
                convoy_core::model::HealthState::Starting => "…".yellow(),
                _ => "✗".red(),
            };
            println!("  {} {:<12} {}", mark, service, state);
        }
    }

    if let Some(failure) = &report.failure {
        if let Some(error) = &failure.error {
            println!();
            println!("{}", format!("エラー: {}", error).red());
        }
        if !failure.services.is_empty() {
            println!();
            println!("{}", "コンテナの状態:".dimmed());
            for listing in &failure.services {
                println!(
                    "  • {:<12} {:<10} {}",
                    listing.name,
                    listing.state,
                    listing.image.dimmed()
                );
            }
        }
    }
}
