pub mod deploy;
pub mod status;
pub mod validate;

use convoy_core::discovery;
use convoy_core::model::Topology;
use std::path::Path;

/// 設定ファイルをロード（明示パス優先）
pub fn load_config(explicit: Option<&Path>) -> anyhow::Result<(Topology, std::path::PathBuf)> {
    let current = std::env::current_dir()?;
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => discovery::find_config_file(&current)?,
    };
    let topology = discovery::load_topology(&path)?;
    Ok((topology, path))
}
