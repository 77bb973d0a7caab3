//! トポロジー全体のロールアウト
//!
//! `ServiceRuntime` トレイトのDocker実装。ビルド・停止・起動・調査の
//! 各操作をbollard経由で行う。

// Bollard 0.19.4 の非推奨APIを一時的に使用
#![allow(deprecated)]

use crate::converter::spec_to_container_config;
use crate::error::ContainerError;
use crate::{build, docker, probe, reconciler};
use bollard::Docker;
use colored::Colorize;
use convoy_core::model::{HealthState, ServiceSpec, Topology};
use convoy_core::runtime::{ServiceListing, ServiceRuntime};
use std::collections::HashMap;
use std::path::PathBuf;

/// Dockerに対するロールアウト実行器
pub struct DockerRuntime {
    docker: Docker,
    /// ビルドコンテキストの相対パス解決の基準ディレクトリ
    project_root: PathBuf,
}

impl DockerRuntime {
    pub fn new(docker: Docker, project_root: impl Into<PathBuf>) -> Self {
        Self {
            docker,
            project_root: project_root.into(),
        }
    }

    /// Docker接続込みで初期化
    pub async fn connect(project_root: impl Into<PathBuf>) -> crate::error::Result<Self> {
        let docker = docker::connect().await?;
        Ok(Self::new(docker, project_root))
    }

    /// ネットワークを作成（既に存在する場合はそのまま使う）
    async fn ensure_network(&self, topology: &Topology) -> anyhow::Result<()> {
        let network_name = topology.network_name();
        let network_config = bollard::models::NetworkCreateRequest {
            name: network_name.clone(),
            driver: Some("bridge".to_string()),
            ..Default::default()
        };

        match self.docker.create_network(network_config).await {
            Ok(_) => {
                tracing::debug!("ネットワーク作成完了: {}", network_name);
                Ok(())
            }
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 409, ..
            }) => {
                tracing::debug!("ネットワークは既に存在します: {}", network_name);
                Ok(())
            }
            Err(e) => Err(ContainerError::from(e).into()),
        }
    }

    /// サービスイメージを用意する
    ///
    /// build設定があればビルド、なければローカル確認の上で必要ならpull。
    async fn ensure_image(&self, spec: &ServiceSpec) -> anyhow::Result<()> {
        let image = spec.resolved_image();

        if let Some(build_config) = &spec.build {
            let context_dir = match &build_config.context {
                Some(context) => self.project_root.join(context),
                None => self.project_root.clone(),
            };
            let dockerfile = match &build_config.dockerfile {
                Some(dockerfile) => self.project_root.join(dockerfile),
                None => context_dir.join("Dockerfile"),
            };
            println!("  ↓ {} をビルド ({})", spec.name.cyan(), image);

            let context_data = build::create_context(&context_dir, &dockerfile)?;
            build::build_image(
                &self.docker,
                context_data,
                &image,
                &build_config.args,
                build_config.target.as_deref(),
            )
            .await?;
            return Ok(());
        }

        if docker::image_exists(&self.docker, &image).await? {
            tracing::debug!("イメージはローカルに存在: {}", image);
            return Ok(());
        }

        println!("  ↓ {} ({})", spec.name.cyan(), image);
        docker::pull_image(&self.docker, &image).await?;
        Ok(())
    }

    /// コンテナを作成して起動
    async fn create_and_start(&self, topology: &Topology, spec: &ServiceSpec) -> anyhow::Result<()> {
        let (container_config, create_options) =
            spec_to_container_config(topology, spec, &self.project_root);
        let container_name = topology.container_name(&spec.name);

        self.docker
            .create_container(Some(create_options), container_config)
            .await
            .map_err(ContainerError::from)?;

        self.docker
            .start_container(
                &container_name,
                None::<bollard::query_parameters::StartContainerOptions>,
            )
            .await
            .map_err(ContainerError::from)?;

        println!("  ✓ {} を起動しました", spec.name.green());
        Ok(())
    }
}

/// depends_onが空のサービスを先頭に並べる（簡易依存順）
fn startup_order(topology: &Topology) -> Vec<&ServiceSpec> {
    let mut ordered: Vec<&ServiceSpec> = Vec::new();
    let mut remaining: Vec<&ServiceSpec> = topology.services.iter().collect();

    while !remaining.is_empty() {
        let placed: Vec<String> = ordered.iter().map(|s| s.name.clone()).collect();
        let (ready, rest): (Vec<&ServiceSpec>, Vec<&ServiceSpec>) = remaining
            .into_iter()
            .partition(|s| s.depends_on.iter().all(|d| placed.contains(d)));

        if ready.is_empty() {
            // 循環依存があってもロールアウト自体は続行する
            ordered.extend(rest);
            break;
        }
        ordered.extend(ready);
        remaining = rest;
    }
    ordered
}

impl ServiceRuntime for DockerRuntime {
    async fn build(&self, topology: &Topology) -> anyhow::Result<()> {
        for spec in &topology.services {
            self.ensure_image(spec).await?;
        }
        Ok(())
    }

    async fn stop(&self, topology: &Topology) -> anyhow::Result<()> {
        for spec in &topology.services {
            let container_name = topology.container_name(&spec.name);
            match self
                .docker
                .stop_container(
                    &container_name,
                    None::<bollard::query_parameters::StopContainerOptions>,
                )
                .await
            {
                Ok(_) => {}
                // 404: 存在しない / 304: 既に停止済み
                Err(bollard::errors::Error::DockerResponseServerError {
                    status_code: 404 | 304,
                    ..
                }) => {}
                Err(e) => return Err(ContainerError::from(e).into()),
            }
        }
        Ok(())
    }

    async fn start(&self, topology: &Topology) -> anyhow::Result<()> {
        self.ensure_network(topology).await?;

        for spec in startup_order(topology) {
            self.create_and_start(topology, spec).await?;
        }
        Ok(())
    }

    async fn start_service(&self, topology: &Topology, service: &str) -> anyhow::Result<()> {
        let spec = topology
            .service(service)
            .ok_or_else(|| convoy_core::TopologyError::ServiceNotFound(service.to_string()))?;
        let container_name = topology.container_name(service);

        match self
            .docker
            .start_container(
                &container_name,
                None::<bollard::query_parameters::StartContainerOptions>,
            )
            .await
        {
            Ok(_) => Ok(()),
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            }) => {
                // コンテナが存在しない場合は作成して起動
                tracing::info!("コンテナが存在しないため、新規作成します: {}", container_name);
                self.ensure_network(topology).await?;
                self.create_and_start(topology, spec).await
            }
            Err(e) => Err(ContainerError::from(e).into()),
        }
    }

    async fn remove(&self, topology: &Topology) -> anyhow::Result<()> {
        reconciler::remove_topology(&self.docker, topology).await?;
        Ok(())
    }

    async fn probe(&self, topology: &Topology, service: &str) -> anyhow::Result<HealthState> {
        let container_name = topology.container_name(service);
        let state = probe::probe_container(&self.docker, &container_name).await?;
        Ok(state)
    }

    async fn list(&self, topology: &Topology) -> anyhow::Result<Vec<ServiceListing>> {
        let mut filters = HashMap::new();
        filters.insert(
            "label".to_string(),
            vec![format!("convoy.project={}", topology.name)],
        );

        let options = bollard::container::ListContainersOptions {
            all: true,
            filters,
            ..Default::default()
        };

        let containers = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(ContainerError::from)?;

        let mut listings: Vec<ServiceListing> = containers
            .into_iter()
            .map(|c| {
                let name = c
                    .labels
                    .as_ref()
                    .and_then(|l| l.get("convoy.service").cloned())
                    .unwrap_or_else(|| {
                        c.names
                            .as_ref()
                            .and_then(|n| n.first())
                            .map(|n| n.trim_start_matches('/').to_string())
                            .unwrap_or_default()
                    });
                ServiceListing {
                    name,
                    state: c.state.map(|s| s.to_string()).unwrap_or_default(),
                    image: c.image.unwrap_or_default(),
                }
            })
            .collect();
        listings.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(listings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topology_with(services: Vec<ServiceSpec>) -> Topology {
        let mut t = Topology::new("vantage");
        t.services = services;
        t
    }

    fn spec(name: &str, deps: &[&str]) -> ServiceSpec {
        let mut s = ServiceSpec::new(name);
        s.image = Some("img".to_string());
        s.depends_on = deps.iter().map(|d| d.to_string()).collect();
        s
    }

    #[test]
    fn test_startup_order_deps_first() {
        let topology = topology_with(vec![
            spec("api", &["db", "cache"]),
            spec("db", &[]),
            spec("cache", &[]),
        ]);
        let order: Vec<&str> = startup_order(&topology)
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(order, vec!["db", "cache", "api"]);
    }

    #[test]
    fn test_startup_order_cycle_does_not_hang() {
        let topology = topology_with(vec![spec("a", &["b"]), spec("b", &["a"])]);
        let order = startup_order(&topology);
        assert_eq!(order.len(), 2);
    }
}
