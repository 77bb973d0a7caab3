//! validateコマンド

use colored::Colorize;
use std::path::Path;

pub fn run(config: Option<&Path>) -> anyhow::Result<()> {
    let (topology, path) = super::load_config(config)?;

    println!();
    println!("{}", format!("✓ {} は有効です", path.display()).green().bold());
    println!();
    println!("  デプロイ名:   {}", topology.name.cyan());
    println!("  リモート:     {}", topology.remote);
    println!(
        "  収束設定:     最大{}回 × {}ms間隔",
        topology.converge.max_attempts, topology.converge.interval_ms
    );
    println!("  上限時間:     {}秒", topology.run_timeout_secs);
    println!();
    println!("  サービス:");
    for service in &topology.services {
        let image = if service.build.is_some() {
            format!("(build) {}", service.resolved_image())
        } else {
            service.resolved_image()
        };
        let deps = if service.depends_on.is_empty() {
            String::new()
        } else {
            format!(" ← {}", service.depends_on.join(", "))
        };
        println!("    • {:<12} {}{}", service.name, image.dimmed(), deps);
    }

    Ok(())
}
