//! convoy.kdl のパース

mod service;

pub use service::parse_service;

use crate::error::{Result, TopologyError};
use crate::model::Topology;
use kdl::{KdlDocument, KdlNode};

/// KDL文字列からトポロジーを構築する
pub fn parse_topology(input: &str) -> Result<Topology> {
    let doc: KdlDocument = input.parse()?;

    let node = doc
        .nodes()
        .iter()
        .find(|n| n.name().value() == "deployment")
        .ok_or_else(|| {
            TopologyError::InvalidConfig("deployment ノードが見つかりません".to_string())
        })?;

    let name = first_string_arg(node).ok_or_else(|| {
        TopologyError::InvalidConfig("deployment にはプロジェクト名が必要です".to_string())
    })?;

    let mut topology = Topology::new(name);

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "remote" => {
                    if let Some(remote) = first_string_arg(child) {
                        topology.remote = remote.to_string();
                    }
                }
                "run_timeout_secs" => {
                    if let Some(secs) = first_integer_arg(child) {
                        topology.run_timeout_secs = int_in_range(secs, "run_timeout_secs")?;
                    }
                }
                "converge" => {
                    if let Some(max_attempts) = prop_int(child, "max_attempts") {
                        topology.converge.max_attempts = int_in_range(max_attempts, "max_attempts")?;
                    }
                    if let Some(interval_ms) = prop_int(child, "interval_ms") {
                        topology.converge.interval_ms = int_in_range(interval_ms, "interval_ms")?;
                    }
                }
                "service" => {
                    topology.services.push(parse_service(child)?);
                }
                _ => {}
            }
        }
    }

    validate(&topology)?;
    Ok(topology)
}

/// パース後の整合性チェック
fn validate(topology: &Topology) -> Result<()> {
    if topology.services.is_empty() {
        return Err(TopologyError::InvalidConfig(
            "サービスが1つも定義されていません".to_string(),
        ));
    }

    for (i, spec) in topology.services.iter().enumerate() {
        if topology.services[..i].iter().any(|s| s.name == spec.name) {
            return Err(TopologyError::InvalidConfig(format!(
                "サービス名 '{}' が重複しています",
                spec.name
            )));
        }
        if spec.image.is_none() && spec.build.is_none() {
            return Err(TopologyError::MissingImage(spec.name.clone()));
        }
        for dep in &spec.depends_on {
            if topology.service(dep).is_none() {
                return Err(TopologyError::UnknownDependency {
                    service: spec.name.clone(),
                    dependency: dep.clone(),
                });
            }
        }
    }

    Ok(())
}

/// 名前なしの先頭引数を文字列として取得
pub(crate) fn first_string_arg(node: &KdlNode) -> Option<&str> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_string())
}

/// 名前なしの先頭引数を整数として取得
pub(crate) fn first_integer_arg(node: &KdlNode) -> Option<i128> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_integer())
}

/// 名前付きプロパティを文字列として取得
pub(crate) fn prop_str<'a>(node: &'a KdlNode, key: &str) -> Option<&'a str> {
    node.entries()
        .iter()
        .find(|e| e.name().map(|n| n.value()) == Some(key))
        .and_then(|e| e.value().as_string())
}

/// 名前付きプロパティを整数として取得
pub(crate) fn prop_int(node: &KdlNode, key: &str) -> Option<i128> {
    node.entries()
        .iter()
        .find(|e| e.name().map(|n| n.value()) == Some(key))
        .and_then(|e| e.value().as_integer())
}

/// 整数値を対象の型に収まることを確認して変換する
///
/// `as` キャストの暗黙の切り捨てを避ける。範囲外は設定エラー
pub(crate) fn int_in_range<T: TryFrom<i128>>(value: i128, key: &str) -> Result<T> {
    T::try_from(value).map_err(|_| {
        TopologyError::InvalidConfig(format!("'{}' の値が範囲外です: {}", key, value))
    })
}

/// 名前付きプロパティを真偽値として取得
pub(crate) fn prop_bool(node: &KdlNode, key: &str) -> Option<bool> {
    node.entries()
        .iter()
        .find(|e| e.name().map(|n| n.value()) == Some(key))
        .and_then(|e| e.value().as_bool())
}
