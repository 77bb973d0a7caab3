//! サービス定義

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// トポロジーを構成する1サービスの定義
///
/// KDL形式：
/// ```kdl
/// service "api" required=#true {
///     build dockerfile="Dockerfile.api" context="."
///     port host=8080 container=3000
///     env {
///         DATABASE_URL "postgres://db/app"
///     }
///     depends_on "db" "cache"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSpec {
    /// サービス名（コンテナ名の予約名になる）
    pub name: String,
    /// イメージ（例: "postgres:16"）。buildがある場合は省略可
    pub image: Option<String>,
    /// イメージのバージョンタグ（imageと別指定する場合）
    pub version: Option<String>,
    /// 起動コマンドの上書き
    pub command: Option<String>,
    /// ビルド設定（Dockerfileからビルドするサービス用）
    pub build: Option<BuildConfig>,
    #[serde(default)]
    pub ports: Vec<Port>,
    #[serde(default)]
    pub environment: HashMap<String, String>,
    #[serde(default)]
    pub volumes: Vec<Volume>,
    /// 依存するサービス名
    ///
    /// 依存が全てhealthyなのに自身がnot_runningのとき、
    /// 収束ループが1回だけ強制起動を試みる判定に使う。
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// デプロイ成功の判定に含めるか
    ///
    /// falseのサービスも起動はされるが、収束判定の対象にならない。
    #[serde(default = "default_required")]
    pub required_for_success: bool,
}

fn default_required() -> bool {
    true
}

impl ServiceSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: None,
            version: None,
            command: None,
            build: None,
            ports: Vec::new(),
            environment: HashMap::new(),
            volumes: Vec::new(),
            depends_on: Vec::new(),
            required_for_success: true,
        }
    }

    /// 実際に使うイメージ名を解決する
    ///
    /// 1. imageとversionの両方があれば "image:version"
    /// 2. imageのみでタグ付きならそのまま
    /// 3. imageのみでタグなしなら ":latest" を補う
    /// 4. どちらもなければサービス名をイメージ名とみなす
    pub fn resolved_image(&self) -> String {
        match (&self.image, &self.version) {
            (Some(img), Some(ver)) => format!("{}:{}", img, ver),
            (Some(img), None) => {
                if img.contains(':') {
                    img.clone()
                } else {
                    format!("{}:latest", img)
                }
            }
            (None, Some(ver)) => format!("{}:{}", self.name, ver),
            (None, None) => format!("{}:latest", self.name),
        }
    }
}

/// ポートマッピング
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    pub host: u16,
    pub container: u16,
}

/// ボリュームマウント
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    pub host: PathBuf,
    pub container: PathBuf,
    #[serde(default)]
    pub read_only: bool,
}

/// ビルド設定
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Dockerfileのパス（プロジェクトルートからの相対パス）
    pub dockerfile: Option<PathBuf>,
    /// ビルドコンテキストのパス。未指定ならプロジェクトルート
    pub context: Option<PathBuf>,
    /// ビルド引数
    #[serde(default)]
    pub args: HashMap<String, String>,
    /// マルチステージビルドのターゲット
    pub target: Option<String>,
}
