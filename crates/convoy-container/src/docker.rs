//! Docker接続とイメージ取得

// Bollard 0.19.4 の非推奨APIを一時的に使用
#![allow(deprecated)]

use crate::error::{ContainerError, Result};
use bollard::Docker;
use colored::Colorize;
use futures_util::stream::StreamExt;

/// Docker接続を初期化（接続テスト付き）
pub async fn connect() -> Result<Docker> {
    let docker = Docker::connect_with_local_defaults()
        .map_err(|e| ContainerError::DockerConnectionFailed(e.to_string()))?;

    docker
        .ping()
        .await
        .map_err(|e| ContainerError::DockerConnectionFailed(e.to_string()))?;

    Ok(docker)
}

/// イメージ名とタグを分離
/// 例: "redis:7-alpine" -> ("redis", "7-alpine")
///     "postgres" -> ("postgres", "latest")
pub fn parse_image_tag(image: &str) -> (&str, &str) {
    if let Some((name, tag)) = image.rsplit_once(':')
        && !tag.contains('/')
    {
        (name, tag)
    } else {
        (image, "latest")
    }
}

/// ローカルにイメージが存在するか確認
pub async fn image_exists(docker: &Docker, image: &str) -> Result<bool> {
    match docker.inspect_image(image).await {
        Ok(_) => Ok(true),
        Err(bollard::errors::Error::DockerResponseServerError {
            status_code: 404, ..
        }) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Dockerイメージをpull
pub async fn pull_image(docker: &Docker, image: &str) -> Result<()> {
    let (image_name, tag) = parse_image_tag(image);

    println!("  ↓ イメージをプル中: {}", image.cyan());

    let options = bollard::image::CreateImageOptions {
        from_image: image_name,
        tag,
        ..Default::default()
    };

    let mut stream = docker.create_image(Some(options), None, None);

    while let Some(info) = stream.next().await {
        match info {
            Ok(bollard::models::CreateImageInfo {
                status: Some(status),
                progress: Some(progress),
                ..
            }) => {
                // 進捗を表示（同じ行に上書き）
                print!("\r  ↓ {}: {}", status, progress);
                use std::io::Write;
                let _ = std::io::stdout().flush();
            }
            Ok(bollard::models::CreateImageInfo {
                status: Some(status),
                ..
            }) => {
                print!("\r  ↓ {}                    ", status);
                use std::io::Write;
                let _ = std::io::stdout().flush();
            }
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            }) => {
                println!();
                return Err(ContainerError::ImageNotFound {
                    image: image.to_string(),
                });
            }
            Err(e) => {
                println!();
                return Err(ContainerError::DockerApiError(format!(
                    "イメージのプルに失敗しました: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    println!();
    println!("  ✓ プル完了");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_image_tag() {
        assert_eq!(parse_image_tag("redis:7-alpine"), ("redis", "7-alpine"));
        assert_eq!(parse_image_tag("postgres"), ("postgres", "latest"));
        assert_eq!(
            parse_image_tag("ghcr.io/example/api:v2"),
            ("ghcr.io/example/api", "v2")
        );
        // ポート付きレジストリのタグなしイメージ
        assert_eq!(
            parse_image_tag("localhost:5000/app"),
            ("localhost:5000/app", "latest")
        );
    }
}
