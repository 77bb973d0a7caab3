//! Runステータスとレポート

use super::health::HealthSnapshot;
use super::request::DeploymentRequest;
use crate::runtime::ServiceListing;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// DeploymentRunのステータス
///
/// 遷移は前方向のみ：
/// pending → syncing → building → converging → (succeeded | failed_timeout | failed_error)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Syncing,
    Building,
    Converging,
    Succeeded,
    /// 収束ループの試行回数上限に到達（環境起因、リトライで解消しうる）
    FailedTimeout,
    /// 同期・ビルド・起動いずれかの決定的な失敗
    FailedError,
}

impl RunStatus {
    /// 遷移順のランク。terminalは全て同ランク
    pub(crate) fn rank(self) -> u8 {
        match self {
            RunStatus::Pending => 0,
            RunStatus::Syncing => 1,
            RunStatus::Building => 2,
            RunStatus::Converging => 3,
            RunStatus::Succeeded | RunStatus::FailedTimeout | RunStatus::FailedError => 4,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunStatus::Succeeded | RunStatus::FailedTimeout | RunStatus::FailedError
        )
    }

    /// CLI呼び出し形態のプロセス終了コード
    pub fn exit_code(self) -> i32 {
        match self {
            RunStatus::Succeeded => 0,
            RunStatus::FailedError => 1,
            RunStatus::FailedTimeout => 2,
            // 非terminalで問い合わせられることはない想定
            _ => 1,
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Pending => write!(f, "pending"),
            RunStatus::Syncing => write!(f, "syncing"),
            RunStatus::Building => write!(f, "building"),
            RunStatus::Converging => write!(f, "converging"),
            RunStatus::Succeeded => write!(f, "succeeded"),
            RunStatus::FailedTimeout => write!(f, "failed_timeout"),
            RunStatus::FailedError => write!(f, "failed_error"),
        }
    }
}

/// 失敗時に添付する診断情報
///
/// 人間が再実行せずに原因を特定できるよう、
/// スナップショット履歴とは別にエラー連鎖とランタイム側の一覧を残す。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FailureDiagnostics {
    /// エラー連鎖（failed_errorの場合のみ）
    pub error: Option<String>,
    /// ランタイム自身が報告した最後のサービス一覧
    #[serde(default)]
    pub services: Vec<ServiceListing>,
}

/// 1回のRunの最終レポート
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub request: DeploymentRequest,
    pub status: RunStatus,
    /// ポーリングの全スナップショット（追記順）
    pub attempts: Vec<HealthSnapshot>,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureDiagnostics>,
}

impl RunReport {
    /// Runの開始前に失敗した場合のレポート
    ///
    /// ランタイムへの接続失敗など、ステップに入る前のエラーでも
    /// レポートが残るようにする。
    pub fn failed_before_start(request: DeploymentRequest, error: impl Into<String>) -> Self {
        let now = Utc::now();
        RunReport {
            request,
            status: RunStatus::FailedError,
            attempts: Vec::new(),
            started_at: now,
            ended_at: now,
            failure: Some(FailureDiagnostics {
                error: Some(error.into()),
                services: Vec::new(),
            }),
        }
    }
}
