//! サービスのヘルス状態

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// サービスの観測状態
///
/// ランタイムへの問い合わせごとに新しく生成される。
/// ポーリング間でキャッシュしてはいけない（古い値が実際の遷移を隠すため）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    /// 状態不明（問い合わせ失敗など）
    Unknown,
    /// 起動処理中（ヘルスチェック未完了）
    Starting,
    /// 正常稼働中
    Healthy,
    /// 稼働しているがヘルスチェック失敗
    Unhealthy,
    /// コンテナが存在しない、または停止している
    NotRunning,
}

impl std::fmt::Display for HealthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthState::Unknown => write!(f, "unknown"),
            HealthState::Starting => write!(f, "starting"),
            HealthState::Healthy => write!(f, "healthy"),
            HealthState::Unhealthy => write!(f, "unhealthy"),
            HealthState::NotRunning => write!(f, "not_running"),
        }
    }
}

/// 1回のポーリングで観測した全サービスの状態
///
/// DeploymentRunの試行ログに追記専用で積まれ、失敗時の診断に使う。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthSnapshot {
    /// 試行番号（1始まり）
    pub sequence_number: u32,
    /// サービス名 → 観測状態
    pub per_service: BTreeMap<String, HealthState>,
    /// 観測時刻
    pub taken_at: DateTime<Utc>,
}

impl HealthSnapshot {
    pub fn new(sequence_number: u32, per_service: BTreeMap<String, HealthState>) -> Self {
        Self {
            sequence_number,
            per_service,
            taken_at: Utc::now(),
        }
    }

    /// 指定サービスの観測状態を返す
    pub fn state_of(&self, service: &str) -> HealthState {
        self.per_service
            .get(service)
            .copied()
            .unwrap_or(HealthState::Unknown)
    }
}
