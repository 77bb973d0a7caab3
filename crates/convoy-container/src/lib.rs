//! convoy-container - Dockerコンテナのライフサイクル管理
//!
//! bollard経由でトポロジーのビルド・起動・停止・ヘルス調査を行う。

pub mod build;
pub mod converter;
pub mod docker;
pub mod error;
pub mod probe;
pub mod reconciler;
pub mod rollout;

pub use build::*;
pub use converter::*;
pub use docker::*;
pub use error::*;
pub use probe::*;
pub use reconciler::*;
pub use rollout::*;
