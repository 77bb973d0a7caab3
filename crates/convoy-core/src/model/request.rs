//! デプロイ要求

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// デプロイのトリガー元
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// CLIから手動実行
    Manual,
    /// Webhook経由
    Webhook,
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trigger::Manual => write!(f, "manual"),
            Trigger::Webhook => write!(f, "webhook"),
        }
    }
}

/// 受理済みのデプロイ要求
///
/// 受理された時点で確定し、以後変更されない。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentRequest {
    /// 対象リビジョン（ブランチ / タグ / コミット）
    pub revision: String,
    /// トリガー元
    pub triggered_by: Trigger,
    /// 受理時刻
    pub received_at: DateTime<Utc>,
}

impl DeploymentRequest {
    pub fn new(revision: impl Into<String>, triggered_by: Trigger) -> Self {
        Self {
            revision: revision.into(),
            triggered_by,
            received_at: Utc::now(),
        }
    }

    pub fn manual(revision: impl Into<String>) -> Self {
        Self::new(revision, Trigger::Manual)
    }

    pub fn webhook(revision: impl Into<String>) -> Self {
        Self::new(revision, Trigger::Webhook)
    }
}
