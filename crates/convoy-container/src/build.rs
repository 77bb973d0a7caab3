//! Dockerイメージのビルド

// Bollard 0.19.4 の非推奨APIを一時的に使用
#![allow(deprecated)]

use crate::error::{ContainerError, Result};
use bollard::Docker;
use bollard::image::BuildImageOptions;
use colored::Colorize;
use flate2::Compression;
use flate2::write::GzEncoder;
use futures_util::stream::StreamExt;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tar::Builder;

/// ビルドコンテキストをtar.gzアーカイブとして作成
///
/// Dockerfileはコンテキスト外にあってもよく、常に "Dockerfile" という
/// 名前でアーカイブに追加される。
pub fn create_context(context_path: &Path, dockerfile_path: &Path) -> Result<Vec<u8>> {
    tracing::debug!("ビルドコンテキストを作成: {}", context_path.display());

    let mut archive_data = Vec::new();
    {
        let encoder = GzEncoder::new(&mut archive_data, Compression::default());
        let mut tar = Builder::new(encoder);

        tar.append_dir_all(".", context_path)
            .map_err(|e| ContainerError::ContextFailed(e.to_string()))?;

        let mut dockerfile_file = File::open(dockerfile_path)
            .map_err(|e| ContainerError::ContextFailed(format!("{}: {}", dockerfile_path.display(), e)))?;
        let mut dockerfile_content = Vec::new();
        dockerfile_file
            .read_to_end(&mut dockerfile_content)
            .map_err(|e| ContainerError::ContextFailed(e.to_string()))?;

        let mut header = tar::Header::new_gnu();
        header
            .set_path("Dockerfile")
            .map_err(|e| ContainerError::ContextFailed(e.to_string()))?;
        header.set_size(dockerfile_content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();

        tar.append(&header, &dockerfile_content[..])
            .map_err(|e| ContainerError::ContextFailed(e.to_string()))?;

        tar.finish()
            .map_err(|e| ContainerError::ContextFailed(e.to_string()))?;
    }

    tracing::debug!("ビルドコンテキスト作成完了: {} bytes", archive_data.len());
    Ok(archive_data)
}

/// イメージをビルド
pub async fn build_image(
    docker: &Docker,
    context_data: Vec<u8>,
    tag: &str,
    build_args: &HashMap<String, String>,
    target: Option<&str>,
) -> Result<()> {
    tracing::info!("Building image: {}", tag);

    let build_args_refs: HashMap<&str, &str> = build_args
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();

    let options = BuildImageOptions {
        dockerfile: "Dockerfile",
        t: tag,
        buildargs: build_args_refs,
        target: target.unwrap_or(""),
        rm: true,      // 中間コンテナを削除
        forcerm: true, // ビルド失敗時も中間コンテナを削除
        pull: true,    // ベースイメージを常にpull
        ..Default::default()
    };

    use bytes::Bytes;
    use http_body_util::{Either, Full};
    let body = Full::new(Bytes::from(context_data));
    let mut stream = docker.build_image(options, None, Some(Either::Left(body)));

    while let Some(msg) = stream.next().await {
        match msg {
            Ok(output) => handle_build_output(output)?,
            Err(e) => return Err(e.into()),
        }
    }

    tracing::info!("Successfully built: {}", tag);
    Ok(())
}

/// ビルド出力の処理
fn handle_build_output(output: bollard::models::BuildInfo) -> Result<()> {
    if let Some(stream) = output.stream {
        // ビルドステップの出力
        print!("{}", stream);
    }

    if let Some(error) = output.error {
        return Err(ContainerError::BuildFailed(error));
    }

    if let Some(error_detail) = output.error_detail {
        let error_msg = error_detail
            .message
            .unwrap_or_else(|| "Unknown build error".to_string());
        return Err(ContainerError::BuildFailed(error_msg));
    }

    if let Some(status) = output.status {
        // ステータスメッセージ（pull等）
        println!("{}", status.cyan());
    }

    Ok(())
}
