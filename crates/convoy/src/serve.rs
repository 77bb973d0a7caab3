//! serveコマンド - Webhookデーモン
//!
//! POST /deploy を受けてデプロイRunを起動する。共有シークレットで認証し、
//! 排他ロックで同時実行を1件に制限する。

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use colored::Colorize;
use convoy_container::DockerRuntime;
use convoy_core::model::{DeploymentRequest, RunReport, Topology};
use convoy_core::run::DeploymentRun;
use convoy_source::GitWorkspace;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tokio::sync::{Mutex, RwLock};

/// 認証トークンを渡すヘッダ
const TOKEN_HEADER: &str = "x-convoy-token";

#[derive(Clone)]
struct AppState {
    secret: Arc<String>,
    topology: Arc<Topology>,
    workdir: Arc<PathBuf>,
    /// Runの排他ロック。保持している間は新しいRunを受け付けない
    busy: Arc<Mutex<()>>,
    last_report: Arc<RwLock<Option<RunReport>>>,
}

#[derive(Deserialize)]
struct DeployPayload {
    revision: String,
}

pub async fn run(
    bind: &str,
    secret: String,
    config: Option<&Path>,
    workdir: Option<&Path>,
) -> anyhow::Result<()> {
    let (topology, config_path) = crate::commands::load_config(config)?;
    let workdir = match workdir {
        Some(p) => p.to_path_buf(),
        None => std::env::current_dir()?,
    };

    let state = AppState {
        secret: Arc::new(secret),
        topology: Arc::new(topology),
        workdir: Arc::new(workdir),
        busy: Arc::new(Mutex::new(())),
        last_report: Arc::new(RwLock::new(None)),
    };

    let app = axum::Router::new()
        .route("/deploy", post(handle_deploy))
        .route("/status", get(handle_status))
        .with_state(state);

    println!();
    println!(
        "{}",
        format!("✓ Webhookデーモン起動: http://{}", bind).green().bold()
    );
    println!("  設定: {}", config_path.display());
    println!("  エンドポイント: POST /deploy, GET /status");

    let listener = tokio::net::TcpListener::bind(bind).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// 共有シークレットの定数時間比較
fn token_matches(provided: &str, secret: &str) -> bool {
    provided.as_bytes().ct_eq(secret.as_bytes()).into()
}

async fn handle_deploy(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<DeployPayload>,
) -> (StatusCode, Json<serde_json::Value>) {
    let provided = headers
        .get(TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if !token_matches(provided, &state.secret) {
        tracing::warn!("認証失敗のWebhookを拒否");
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "error": "invalid token" })),
        );
    }

    // 実行中のRunがあれば即座に409を返す（キューイングしない）
    let guard = match state.busy.clone().try_lock_owned() {
        Ok(guard) => guard,
        Err(_) => {
            tracing::info!("Run実行中のため新規リクエストを拒否: {}", payload.revision);
            return (
                StatusCode::CONFLICT,
                Json(serde_json::json!({ "error": "a deployment run is already in progress" })),
            );
        }
    };

    let revision = payload.revision.clone();
    let topology = state.topology.clone();
    let workdir = state.workdir.clone();
    let last_report = state.last_report.clone();

    tokio::spawn(async move {
        // ロックはRun完了まで保持する
        let _guard = guard;

        let request = DeploymentRequest::webhook(&revision);

        // 接続に失敗してもレポートは残す（202を返した後なので）
        let runtime = match DockerRuntime::connect(workdir.as_path()).await {
            Ok(r) => r,
            Err(e) => {
                tracing::error!("Docker接続に失敗: {:#}", e);
                *last_report.write().await = Some(RunReport::failed_before_start(
                    request,
                    format!("Docker接続に失敗しました: {:#}", e),
                ));
                return;
            }
        };
        let source = GitWorkspace::new(workdir.as_path()).with_remote(&topology.remote);

        let report = DeploymentRun::new(request)
            .execute(&runtime, &source, &topology)
            .await;

        tracing::info!("Run完了: revision={} status={}", revision, report.status);
        *last_report.write().await = Some(report);
    });

    (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({
            "status": "accepted",
            "revision": payload.revision,
        })),
    )
}

async fn handle_status(
    State(state): State<AppState>,
) -> (StatusCode, Json<serde_json::Value>) {
    match state.last_report.read().await.as_ref() {
        Some(report) => match serde_json::to_value(report) {
            Ok(value) => (StatusCode::OK, Json(value)),
            Err(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": e.to_string() })),
            ),
        },
        None => (
            StatusCode::OK,
            Json(serde_json::json!({ "status": "no runs yet" })),
        ),
    }
}
