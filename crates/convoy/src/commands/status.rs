//! statusコマンド
//!
//! トポロジーに属するコンテナの一覧を表示する。

use colored::Colorize;
use convoy_container::DockerRuntime;
use convoy_core::runtime::ServiceRuntime;
use std::path::Path;

pub async fn run(config: Option<&Path>) -> anyhow::Result<()> {
    let (topology, _) = super::load_config(config)?;

    let runtime = DockerRuntime::connect(std::env::current_dir()?).await?;
    let listings = runtime.list(&topology).await?;

    println!();
    if listings.is_empty() {
        println!("{}", "コンテナはありません".dimmed());
        return Ok(());
    }

    println!(
        "{}",
        format!("{:<16} {:<12} {:<40}", "SERVICE", "STATE", "IMAGE").bold()
    );
    for listing in &listings {
        let state = match listing.state.as_str() {
            "running" => listing.state.green(),
            "exited" | "dead" => listing.state.red(),
            _ => listing.state.yellow(),
        };
        println!("{:<16} {:<12} {:<40}", listing.name, state, listing.image);
    }

    Ok(())
}
