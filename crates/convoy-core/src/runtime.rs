//! ランタイム境界とソース境界のトレイト

use crate::model::{HealthState, Topology};
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// サービスライフサイクルエンジンのトレイト
///
/// リコンサイラはこの4操作（build / stop / start / probe）だけを前提にし、
/// 特定ランタイムのデータ形状には依存しない。
#[allow(async_fn_in_trait)]
pub trait ServiceRuntime {
    /// 全サービスのイメージ・成果物を準備する
    async fn build(&self, topology: &Topology) -> Result<()>;

    /// 稼働中のトポロジーを停止する。存在しないのはエラーではない
    async fn stop(&self, topology: &Topology) -> Result<()>;

    /// トポロジー全体を起動する（required以外も無条件に起動）
    async fn start(&self, topology: &Topology) -> Result<()>;

    /// 単一サービスを起動する（収束ループの強制起動用）
    async fn start_service(&self, topology: &Topology, service: &str) -> Result<()>;

    /// 予約名を持つ既存インスタンスを強制除去する（冪等）
    async fn remove(&self, topology: &Topology) -> Result<()>;

    /// 単一サービスの現在状態を問い合わせる（純粋な読み取り）
    async fn probe(&self, topology: &Topology, service: &str) -> Result<HealthState>;

    /// ランタイム自身のサービス一覧（失敗診断用）
    async fn list(&self, topology: &Topology) -> Result<Vec<ServiceListing>>;
}

/// ランタイムが報告するサービスの一覧エントリ
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceListing {
    pub name: String,
    pub state: String,
    pub image: String,
}

/// バージョン管理システムのトレイト
///
/// fetch + hard-reset だけを契約とする不透明な操作。
/// reset_hard はマージではなくローカル変更を破棄する。
#[allow(async_fn_in_trait)]
pub trait SourceControl {
    /// リモートから履歴を取得する
    async fn fetch(&self, remote: &str) -> Result<()>;

    /// ワーキングツリーを指定リビジョンに完全一致させる
    async fn reset_hard(&self, revision: &str) -> Result<()>;
}
