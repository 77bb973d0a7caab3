//! 設定ファイルの発見と読み込み

use crate::error::{Result, TopologyError};
use crate::model::Topology;
use crate::parser::parse_topology;
use std::path::{Path, PathBuf};

const CANDIDATES: [&str; 2] = ["convoy.kdl", ".convoy.kdl"];

/// convoy.kdl ファイルを探す
///
/// 以下の優先順位で検索:
/// 1. 環境変数 CONVOY_CONFIG_PATH (直接パス指定)
/// 2. 指定ディレクトリ: convoy.kdl, .convoy.kdl
/// 3. 指定ディレクトリの .convoy/ 内: 同様の順序
pub fn find_config_file(dir: &Path) -> Result<PathBuf> {
    // 1. 環境変数で直接指定
    if let Ok(config_path) = std::env::var("CONVOY_CONFIG_PATH") {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
    }

    // 2. 指定ディレクトリで検索
    for filename in &CANDIDATES {
        let path = dir.join(filename);
        if path.exists() {
            return Ok(path);
        }
    }

    // 3. .convoy/ ディレクトリで検索
    let convoy_dir = dir.join(".convoy");
    if convoy_dir.is_dir() {
        for filename in &CANDIDATES {
            let path = convoy_dir.join(filename);
            if path.exists() {
                return Ok(path);
            }
        }
    }

    Err(TopologyError::ConfigNotFound(dir.to_path_buf()))
}

/// 設定ファイルを読み込んでトポロジーを構築する
pub fn load_topology(path: &Path) -> Result<Topology> {
    let content = std::fs::read_to_string(path)?;
    parse_topology(&content)
}

/// ディレクトリから設定を発見して読み込む
pub fn load_topology_from_dir(dir: &Path) -> Result<Topology> {
    let path = find_config_file(dir)?;
    tracing::debug!("設定ファイル: {}", path.display());
    load_topology(&path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const MINIMAL: &str = r#"
        deployment "vantage" {
            service "api" image="api:latest"
        }
    "#;

    #[test]
    fn test_find_config_in_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("convoy.kdl"), MINIMAL).unwrap();

        let found = find_config_file(temp_dir.path()).unwrap();
        assert!(found.ends_with("convoy.kdl"));
    }

    #[test]
    fn test_find_config_in_convoy_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let convoy_dir = temp_dir.path().join(".convoy");
        fs::create_dir(&convoy_dir).unwrap();
        fs::write(convoy_dir.join("convoy.kdl"), MINIMAL).unwrap();

        let found = find_config_file(temp_dir.path()).unwrap();
        assert!(found.ends_with(".convoy/convoy.kdl"));
    }

    #[test]
    fn test_hidden_file_priority() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("convoy.kdl"), MINIMAL).unwrap();
        fs::write(temp_dir.path().join(".convoy.kdl"), MINIMAL).unwrap();

        // 可視ファイルが優先される
        let found = find_config_file(temp_dir.path()).unwrap();
        assert!(found.ends_with("convoy.kdl"));
        assert!(!found.ends_with(".convoy.kdl"));
    }

    #[test]
    fn test_config_not_found() {
        let temp_dir = tempfile::tempdir().unwrap();
        let result = find_config_file(temp_dir.path());
        assert!(matches!(result, Err(TopologyError::ConfigNotFound(_))));
    }

    #[test]
    fn test_load_topology_from_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("convoy.kdl"), MINIMAL).unwrap();

        let topology = load_topology_from_dir(temp_dir.path()).unwrap();
        assert_eq!(topology.name, "vantage");
    }
}
