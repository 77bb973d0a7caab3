//! トポロジーの事前整地
//!
//! 前回の失敗Runが残した同名コンテナは、次のRunのcreateを
//! 非決定的に失敗させる。起動前に予約名を持つインスタンスを
//! 強制除去してクリーンな状態を保証する。除去は冪等で、
//! 「存在しない」は成功として扱う。

use crate::error::Result;
use bollard::Docker;
use convoy_core::Topology;

/// 予約名を持つ既存インスタンスを停止・強制除去する
///
/// 2回連続で呼んでも同じ終端状態（全インスタンス不在）になる。
/// ランタイムレベルのエラー（権限不足など）だけをエスカレートする。
pub async fn remove_topology(docker: &Docker, topology: &Topology) -> Result<()> {
    for spec in &topology.services {
        let container_name = topology.container_name(&spec.name);

        // 停止はベストエフォート。直後の強制removeが確実に仕留める
        match docker
            .stop_container(
                &container_name,
                None::<bollard::query_parameters::StopContainerOptions>,
            )
            .await
        {
            Ok(_) => {
                tracing::debug!("停止: {}", container_name);
            }
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            }) => {
                // コンテナなし
            }
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 304, ..
            }) => {
                // 既に停止中
            }
            Err(e) => {
                tracing::warn!("停止エラー ({}): {}", container_name, e);
            }
        }

        // 削除（強制）。存在しないのは成功扱い
        match docker
            .remove_container(
                &container_name,
                Some(bollard::query_parameters::RemoveContainerOptions {
                    force: true,
                    ..Default::default()
                }),
            )
            .await
        {
            Ok(_) => {
                tracing::info!("除去: {}", container_name);
            }
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            }) => {
                // コンテナが存在しない場合は無視
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use convoy_core::ServiceSpec;

    #[tokio::test]
    #[ignore] // Docker接続が必要なため、通常のテストではスキップ
    async fn test_remove_is_idempotent() {
        let docker = crate::docker::connect().await.unwrap();
        let mut topology = Topology::new("convoy-reconciler-test");
        topology.services.push(ServiceSpec::new("ghost"));

        // 存在しないコンテナに対して2回連続で呼んでもエラーにならない
        remove_topology(&docker, &topology).await.unwrap();
        remove_topology(&docker, &topology).await.unwrap();
    }
}
