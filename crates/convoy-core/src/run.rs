//! DeploymentRun — リコンサイル全体を順序付けるステートマシン
//!
//! 同期 → 既存インスタンス除去 → ビルド/停止/起動 → 収束待ち を
//! 厳密に逐次実行し、terminalステータスと試行ログを所有する。
//! どのステップの失敗も残りを短絡して failed_error にする。
//! failed_timeout は収束ループだけが生む。

use crate::converge::{ConvergeOutcome, converge};
use crate::error::RunError;
use crate::model::{
    DeploymentRequest, FailureDiagnostics, HealthSnapshot, RunReport, RunStatus, Topology,
};
use crate::runtime::{ServiceRuntime, SourceControl};
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::time::timeout;

/// 診断用リスティング取得の上限。Run本体のdeadline超過後でも
/// ここで無期限に待たない
const LISTING_TIMEOUT: Duration = Duration::from_secs(10);

/// 1回のデプロイ実行
///
/// 受理時に生成され、terminalステータスにちょうど1回だけ到達する。
/// トポロジーは同時に1つのRunだけが所有する前提（排他は呼び出し側の
/// ロックで保証する）。
pub struct DeploymentRun {
    request: DeploymentRequest,
    status: RunStatus,
    attempts: Vec<HealthSnapshot>,
    started_at: DateTime<Utc>,
}

impl DeploymentRun {
    pub fn new(request: DeploymentRequest) -> Self {
        Self {
            request,
            status: RunStatus::Pending,
            attempts: Vec::new(),
            started_at: Utc::now(),
        }
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    /// ステータスを前方向にのみ進める
    fn advance(&mut self, next: RunStatus) {
        if self.status.is_terminal() {
            tracing::error!("terminal後の遷移は無視します: {} → {}", self.status, next);
            return;
        }
        debug_assert!(
            next.rank() > self.status.rank(),
            "ステータスの逆行: {} → {}",
            self.status,
            next
        );
        tracing::debug!("ステータス遷移: {} → {}", self.status, next);
        self.status = next;
    }

    /// Runを最後まで実行し、最終レポートを返す
    ///
    /// トポロジーの `run_timeout_secs` を全体の壁時計上限として適用する。
    /// 上限超過もfailed_errorとして報告し、呼び出し側は排他ロックを
    /// 解放できる。
    pub async fn execute<R: ServiceRuntime, S: SourceControl>(
        mut self,
        runtime: &R,
        source: &S,
        topology: &Topology,
    ) -> RunReport {
        let deadline = Duration::from_secs(topology.run_timeout_secs);
        let outcome = timeout(deadline, self.run_steps(runtime, source, topology)).await;

        match outcome {
            Ok(Ok(ConvergeOutcome::Converged { attempts })) => {
                self.advance(RunStatus::Succeeded);
                tracing::info!(
                    "デプロイ成功: revision={} attempts={}",
                    self.request.revision,
                    attempts
                );
                self.into_report(None)
            }
            Ok(Ok(ConvergeOutcome::TimedOut)) => {
                self.advance(RunStatus::FailedTimeout);
                tracing::warn!(
                    "収束タイムアウト: revision={} attempts={}",
                    self.request.revision,
                    self.attempts.len()
                );
                let services = Self::capture_listing(runtime, topology).await;
                self.into_report(Some(FailureDiagnostics {
                    error: None,
                    services,
                }))
            }
            Ok(Err(e)) => {
                self.advance(RunStatus::FailedError);
                tracing::error!("デプロイ失敗: revision={} {}", self.request.revision, e);
                let services = Self::capture_listing(runtime, topology).await;
                self.into_report(Some(FailureDiagnostics {
                    error: Some(e.to_string()),
                    services,
                }))
            }
            Err(_) => {
                self.advance(RunStatus::FailedError);
                let e = RunError::Deadline(topology.run_timeout_secs);
                tracing::error!("デプロイ失敗: revision={} {}", self.request.revision, e);
                self.into_report(Some(FailureDiagnostics {
                    error: Some(e.to_string()),
                    services: Vec::new(),
                }))
            }
        }
    }

    /// 同期からの収束までの本体。失敗は短絡してRunErrorで返す
    async fn run_steps<R: ServiceRuntime, S: SourceControl>(
        &mut self,
        runtime: &R,
        source: &S,
        topology: &Topology,
    ) -> Result<ConvergeOutcome, RunError> {
        self.advance(RunStatus::Syncing);
        source
            .fetch(&topology.remote)
            .await
            .map_err(RunError::Sync)?;
        source
            .reset_hard(&self.request.revision)
            .await
            .map_err(RunError::Sync)?;

        // 前回の失敗Runが残した同名インスタンスを先に除去する。
        // これがあるため同一リビジョンでの再実行は安全
        runtime.remove(topology).await.map_err(RunError::Reconcile)?;

        self.advance(RunStatus::Building);
        runtime.build(topology).await.map_err(RunError::Build)?;
        runtime.stop(topology).await.map_err(RunError::Stop)?;
        runtime.start(topology).await.map_err(RunError::Start)?;

        self.advance(RunStatus::Converging);
        Ok(converge(runtime, topology, &topology.converge, &mut self.attempts).await)
    }

    /// ランタイム側の一覧を失敗診断用に回収する（ベストエフォート）
    async fn capture_listing<R: ServiceRuntime>(
        runtime: &R,
        topology: &Topology,
    ) -> Vec<crate::ServiceListing> {
        match timeout(LISTING_TIMEOUT, runtime.list(topology)).await {
            Ok(Ok(listing)) => listing,
            Ok(Err(e)) => {
                tracing::debug!("サービス一覧の取得に失敗: {:#}", e);
                Vec::new()
            }
            Err(_) => Vec::new(),
        }
    }

    fn into_report(self, failure: Option<FailureDiagnostics>) -> RunReport {
        RunReport {
            request: self.request,
            status: self.status,
            attempts: self.attempts,
            started_at: self.started_at,
            ended_at: Utc::now(),
            failure,
        }
    }
}
