//! サービスノードのパース

use super::{first_string_arg, int_in_range, prop_bool, prop_int, prop_str};
use crate::error::{Result, TopologyError};
use crate::model::{BuildConfig, Port, ServiceSpec, Volume};
use kdl::{KdlDocument, KdlNode};
use std::path::PathBuf;

/// service ノードをパース
pub fn parse_service(node: &KdlNode) -> Result<ServiceSpec> {
    let name = first_string_arg(node)
        .ok_or_else(|| TopologyError::InvalidConfig("service には名前が必要です".to_string()))?;

    let mut spec = ServiceSpec::new(name);
    spec.image = prop_str(node, "image").map(|s| s.to_string());
    spec.version = prop_str(node, "version").map(|s| s.to_string());
    spec.command = prop_str(node, "command").map(|s| s.to_string());
    if let Some(required) = prop_bool(node, "required") {
        spec.required_for_success = required;
    }

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "image" => {
                    if let Some(image) = first_string_arg(child) {
                        spec.image = Some(image.to_string());
                    }
                }
                "command" => {
                    if let Some(command) = first_string_arg(child) {
                        spec.command = Some(command.to_string());
                    }
                }
                "port" => {
                    if let Some(port) = parse_port(child)? {
                        spec.ports.push(port);
                    }
                }
                "volume" => {
                    if let Some(volume) = parse_volume(child) {
                        spec.volumes.push(volume);
                    }
                }
                "env" => {
                    if let Some(envs) = child.children() {
                        for env_node in envs.nodes() {
                            let key = env_node.name().value().to_string();
                            let value = first_string_arg(env_node).unwrap_or("").to_string();
                            spec.environment.insert(key, value);
                        }
                    }
                }
                "depends_on" => {
                    spec.depends_on = child
                        .entries()
                        .iter()
                        .filter_map(|e| e.value().as_string().map(|s| s.to_string()))
                        .collect();
                }
                "build" => {
                    spec.build = Some(parse_build(child));
                }
                _ => {}
            }
        }
    }

    Ok(spec)
}

/// build ノードをパース
fn parse_build(node: &KdlNode) -> BuildConfig {
    let mut config = BuildConfig {
        dockerfile: prop_str(node, "dockerfile").map(PathBuf::from),
        context: prop_str(node, "context").map(PathBuf::from),
        target: prop_str(node, "target").map(|s| s.to_string()),
        ..Default::default()
    };

    if let Some(children) = node.children() {
        for child in children.nodes() {
            if child.name().value() == "args"
                && let Some(args) = child.children()
            {
                for arg_node in args.nodes() {
                    let key = arg_node.name().value().to_string();
                    let value = first_string_arg(arg_node).unwrap_or("").to_string();
                    config.args.insert(key, value);
                }
            }
        }
    }

    config
}

/// port ノードをパース
///
/// u16に収まらないポート番号は黙って切り捨てず設定エラーにする
fn parse_port(node: &KdlNode) -> Result<Option<Port>> {
    let (Some(host), Some(container)) = (prop_int(node, "host"), prop_int(node, "container"))
    else {
        return Ok(None);
    };
    Ok(Some(Port {
        host: int_in_range(host, "host")?,
        container: int_in_range(container, "container")?,
    }))
}

/// volume ノードをパース
fn parse_volume(node: &KdlNode) -> Option<Volume> {
    let host = prop_str(node, "host")?;
    let container = prop_str(node, "container")?;
    Some(Volume {
        host: PathBuf::from(host),
        container: PathBuf::from(container),
        read_only: prop_bool(node, "read_only").unwrap_or(false),
    })
}

/// スタンドアロンのKDL断片からサービスをパース（テスト用ヘルパ）
#[cfg(test)]
fn parse_service_fragment(kdl: &str) -> Result<ServiceSpec> {
    let doc: KdlDocument = kdl.parse()?;
    parse_service(doc.nodes().first().expect("fragment has a node"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_service_properties() {
        let spec = parse_service_fragment(
            r#"service "cache" image="redis" version="7-alpine" required=#false"#,
        )
        .unwrap();

        assert_eq!(spec.name, "cache");
        assert_eq!(spec.image.as_deref(), Some("redis"));
        assert_eq!(spec.version.as_deref(), Some("7-alpine"));
        assert!(!spec.required_for_success);
        assert_eq!(spec.resolved_image(), "redis:7-alpine");
    }

    #[test]
    fn test_parse_service_children() {
        let spec = parse_service_fragment(
            r#"
            service "api" {
                image "ghcr.io/example/api:v2"
                command "node server.js"
                port host=8080 container=3000
                volume host="./static" container="/srv/static" read_only=#true
                env {
                    DATABASE_URL "postgres://db/app"
                    RUST_LOG "info"
                }
                depends_on "db" "cache"
            }
            "#,
        )
        .unwrap();

        assert_eq!(spec.image.as_deref(), Some("ghcr.io/example/api:v2"));
        assert_eq!(spec.command.as_deref(), Some("node server.js"));
        assert_eq!(
            spec.ports,
            vec![Port {
                host: 8080,
                container: 3000
            }]
        );
        assert_eq!(spec.volumes.len(), 1);
        assert!(spec.volumes[0].read_only);
        assert_eq!(
            spec.environment.get("DATABASE_URL").map(String::as_str),
            Some("postgres://db/app")
        );
        assert_eq!(spec.depends_on, vec!["db".to_string(), "cache".to_string()]);
    }

    #[test]
    fn test_parse_build_block() {
        let spec = parse_service_fragment(
            r#"
            service "api" {
                build dockerfile="Dockerfile.api" context="." target="release" {
                    args {
                        GIT_SHA "abc123"
                    }
                }
            }
            "#,
        )
        .unwrap();

        let build = spec.build.unwrap();
        assert_eq!(build.dockerfile, Some(PathBuf::from("Dockerfile.api")));
        assert_eq!(build.context, Some(PathBuf::from(".")));
        assert_eq!(build.target.as_deref(), Some("release"));
        assert_eq!(
            build.args.get("GIT_SHA").map(String::as_str),
            Some("abc123")
        );
    }

    #[test]
    fn test_port_out_of_range_rejected() {
        // u16を超えるポート番号は切り捨てではなくエラー
        let result = parse_service_fragment(
            r#"
            service "api" {
                image "api:latest"
                port host=99999 container=3000
            }
            "#,
        );
        assert!(matches!(result, Err(TopologyError::InvalidConfig(_))));
    }

    #[test]
    fn test_negative_port_rejected() {
        let result = parse_service_fragment(
            r#"
            service "api" {
                image "api:latest"
                port host=8080 container=-1
            }
            "#,
        );
        assert!(matches!(result, Err(TopologyError::InvalidConfig(_))));
    }

    #[test]
    fn test_service_without_name_rejected() {
        let result = parse_service_fragment(r#"service image="api""#);
        assert!(matches!(result, Err(TopologyError::InvalidConfig(_))));
    }
}
