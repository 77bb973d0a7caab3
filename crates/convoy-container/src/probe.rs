//! サービスヘルスプローブ
//!
//! ランタイムのステータス文字列への依存を避け、
//! コンテナのinspect結果を構造化されたHealthStateに写像する。

// Bollard 0.19.4 の非推奨APIを一時的に使用
#![allow(deprecated)]

use crate::error::Result;
use bollard::Docker;
use bollard::container::InspectContainerOptions;
use bollard::models::HealthStatusEnum;
use convoy_core::HealthState;

/// コンテナの現在状態を観測する（純粋な読み取り）
///
/// 呼び出しごとに新しく取得し、結果をキャッシュしない。
///
/// 写像規則:
/// - コンテナ不在（404）または停止中 → `NotRunning`
/// - 稼働中でヘルスチェックが starting → `Starting`
/// - 稼働中でヘルスチェックが unhealthy → `Unhealthy`
/// - 稼働中でヘルスチェックが healthy、またはヘルスチェック未設定 → `Healthy`
pub async fn probe_container(docker: &Docker, container_name: &str) -> Result<HealthState> {
    let inspect = match docker
        .inspect_container(container_name, None::<InspectContainerOptions>)
        .await
    {
        Ok(inspect) => inspect,
        Err(bollard::errors::Error::DockerResponseServerError {
            status_code: 404, ..
        }) => return Ok(HealthState::NotRunning),
        Err(e) => return Err(e.into()),
    };

    let Some(state) = inspect.state else {
        return Ok(HealthState::Unknown);
    };

    if !state.running.unwrap_or(false) {
        return Ok(HealthState::NotRunning);
    }

    if let Some(health) = state.health
        && let Some(status) = health.status
    {
        let mapped = match status {
            HealthStatusEnum::HEALTHY => HealthState::Healthy,
            HealthStatusEnum::STARTING => HealthState::Starting,
            HealthStatusEnum::UNHEALTHY => HealthState::Unhealthy,
            // NONE / EMPTY: ヘルスチェックなし扱い
            _ => HealthState::Healthy,
        };
        return Ok(mapped);
    }

    // ヘルスチェックがない場合はrunningで健康とみなす
    Ok(HealthState::Healthy)
}
