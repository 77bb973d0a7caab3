//! トポロジー定義

use super::service::ServiceSpec;
use serde::{Deserialize, Serialize};

/// デプロイ対象の固定トポロジー
///
/// 1ホスト上で一緒に動くべき名前付きサービスの集合。
/// サービスの並び順は起動順と強制起動ヒューリスティックの判定順に使われる。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topology {
    /// プロジェクト名（コンテナ名・ネットワーク名の接頭辞）
    pub name: String,
    /// ソース同期に使うgitリモート名
    #[serde(default = "default_remote")]
    pub remote: String,
    /// サービス定義（順序付き）
    pub services: Vec<ServiceSpec>,
    /// 収束ループの設定
    #[serde(default)]
    pub converge: ConvergeConfig,
    /// Run全体（同期＋ビルド＋収束）の上限秒数
    ///
    /// 外部呼び出しのハングで排他ロックが塞がれ続けるのを防ぐ。
    #[serde(default = "default_run_timeout_secs")]
    pub run_timeout_secs: u64,
}

fn default_remote() -> String {
    "origin".to_string()
}

fn default_run_timeout_secs() -> u64 {
    900
}

impl Topology {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            remote: default_remote(),
            services: Vec::new(),
            converge: ConvergeConfig::default(),
            run_timeout_secs: default_run_timeout_secs(),
        }
    }

    /// サービス定義を名前で引く
    pub fn service(&self, name: &str) -> Option<&ServiceSpec> {
        self.services.iter().find(|s| s.name == name)
    }

    /// 収束判定の対象になるサービス名
    pub fn required_services(&self) -> impl Iterator<Item = &ServiceSpec> {
        self.services.iter().filter(|s| s.required_for_success)
    }

    /// 予約コンテナ名（`{project}-{service}`）
    pub fn container_name(&self, service: &str) -> String {
        format!("{}-{}", self.name, service)
    }

    /// トポロジー用のネットワーク名
    pub fn network_name(&self) -> String {
        format!("{}-net", self.name)
    }
}

/// 収束ループの設定
///
/// KDL形式：
/// ```kdl
/// converge max_attempts=120 interval_ms=2000
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ConvergeConfig {
    /// ポーリングの試行回数上限
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// 試行間の待機時間（ミリ秒）
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

fn default_max_attempts() -> u32 {
    120
}

fn default_interval_ms() -> u64 {
    2000 // 2秒
}

impl Default for ConvergeConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            interval_ms: default_interval_ms(),
        }
    }
}

impl ConvergeConfig {
    /// 最悪ケースの収束待ち時間（ミリ秒）
    pub fn worst_case_wait_ms(&self) -> u64 {
        self.max_attempts as u64 * self.interval_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_converge_defaults() {
        let config = ConvergeConfig::default();
        assert_eq!(config.max_attempts, 120);
        assert_eq!(config.interval_ms, 2000);
        // 120回 × 2秒 = 240秒
        assert_eq!(config.worst_case_wait_ms(), 240_000);
    }

    #[test]
    fn test_container_and_network_names() {
        let topology = Topology::new("vantage");
        assert_eq!(topology.container_name("api"), "vantage-api");
        assert_eq!(topology.network_name(), "vantage-net");
    }
}
