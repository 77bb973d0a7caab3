//! ServiceSpec から Docker API パラメータへの変換

// Bollard 0.19.4 の非推奨APIを一時的に使用
#![allow(deprecated)]

use bollard::container::{Config, CreateContainerOptions, NetworkingConfig};
use bollard::models::{EndpointSettings, HostConfig, PortBinding};
use convoy_core::{ServiceSpec, Topology};
use std::collections::HashMap;
use std::path::Path;

/// ServiceSpecをDockerのコンテナ設定に変換
///
/// 相対パスのボリュームはプロジェクトルートを基準に解決する。
pub fn spec_to_container_config(
    topology: &Topology,
    spec: &ServiceSpec,
    project_root: &Path,
) -> (Config<String>, CreateContainerOptions<String>) {
    let image = spec.resolved_image();

    // 環境変数の設定
    let env: Vec<String> = spec
        .environment
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect();

    // ポートバインディングの設定
    let mut port_bindings = HashMap::new();
    let mut exposed_ports = HashMap::new();

    for port in &spec.ports {
        let container_port = format!("{}/tcp", port.container);

        exposed_ports.insert(container_port.clone(), HashMap::new());
        port_bindings.insert(
            container_port,
            Some(vec![PortBinding {
                host_ip: Some("0.0.0.0".to_string()),
                host_port: Some(port.host.to_string()),
            }]),
        );
    }

    // ボリュームバインディング
    let binds: Vec<String> = spec
        .volumes
        .iter()
        .map(|v| {
            let mode = if v.read_only { "ro" } else { "rw" };
            // 相対パスはプロジェクトルート基準で絶対パスに変換
            let host_path = if v.host.is_relative() {
                project_root.join(&v.host)
            } else {
                v.host.clone()
            };
            format!("{}:{}:{}", host_path.display(), v.container.display(), mode)
        })
        .collect();

    let network_name = topology.network_name();

    let host_config = Some(HostConfig {
        port_bindings: Some(port_bindings),
        binds: Some(binds),
        network_mode: Some(network_name.clone()),
        ..Default::default()
    });

    // ラベル設定（一覧取得のフィルタに使う）
    let mut labels = HashMap::new();
    labels.insert("convoy.project".to_string(), topology.name.clone());
    labels.insert("convoy.service".to_string(), spec.name.clone());

    // ネットワーク設定（サービス名でエイリアス）
    let mut endpoints = HashMap::new();
    endpoints.insert(
        network_name,
        EndpointSettings {
            aliases: Some(vec![spec.name.clone()]),
            ..Default::default()
        },
    );

    let config = Config {
        image: Some(image),
        env: Some(env),
        exposed_ports: Some(exposed_ports),
        host_config,
        labels: Some(labels),
        cmd: spec.command.as_ref().map(|c| {
            // コマンドをスペースで分割
            c.split_whitespace().map(String::from).collect()
        }),
        networking_config: Some(NetworkingConfig {
            endpoints_config: endpoints,
        }),
        ..Default::default()
    };

    let options = CreateContainerOptions {
        name: topology.container_name(&spec.name),
        platform: None,
    };

    (config, options)
}
