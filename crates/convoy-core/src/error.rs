use std::path::PathBuf;
use thiserror::Error;

/// トポロジー設定のエラー
#[derive(Error, Debug)]
pub enum TopologyError {
    #[error("KDLパースエラー: {0}")]
    KdlParse(#[from] kdl::KdlError),

    #[error("ファイル読み込みエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("無効な設定: {0}")]
    InvalidConfig(String),

    #[error(
        "設定ファイルが見つかりません\n探索開始位置: {0}\nヒント: convoy.kdl ファイルを含むディレクトリで実行してください"
    )]
    ConfigNotFound(PathBuf),

    #[error("サービスが見つかりません: {0}")]
    ServiceNotFound(String),

    #[error("サービス '{service}' の依存先 '{dependency}' が定義されていません")]
    UnknownDependency { service: String, dependency: String },

    #[error("サービス '{0}' に image も build も指定されていません")]
    MissingImage(String),
}

/// Runを失敗させるステップエラー
///
/// いずれのバリアントも最終ステータスは failed_error になる。
/// failed_timeout は収束ループだけが生む別系統（エラーではなく結果）。
#[derive(Error, Debug)]
pub enum RunError {
    #[error("ソース同期に失敗しました: {0:#}")]
    Sync(anyhow::Error),

    #[error("既存インスタンスの除去に失敗しました: {0:#}")]
    Reconcile(anyhow::Error),

    #[error("ビルドに失敗しました: {0:#}")]
    Build(anyhow::Error),

    #[error("サービスの停止に失敗しました: {0:#}")]
    Stop(anyhow::Error),

    #[error("サービスの起動に失敗しました: {0:#}")]
    Start(anyhow::Error),

    #[error("Runが上限時間（{0}秒）を超えました")]
    Deadline(u64),
}

pub type Result<T> = std::result::Result<T, TopologyError>;
