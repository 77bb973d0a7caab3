use thiserror::Error;

/// Errors raised while synchronizing the working tree.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(
        "gitコマンドが見つかりません\n\n\
         ヒント:\n\
         • gitがインストールされているか確認してください\n\
         • PATHにgitが含まれているか確認してください"
    )]
    GitNotFound,

    #[error(
        "リビジョン '{0}' が見つかりません\n\n\
         ヒント:\n\
         • ブランチ名・タグ名・コミットハッシュを確認してください\n\
         • リモートにpush済みか確認してください"
    )]
    UnknownRevision(String),

    #[error(
        "リモート '{0}' に接続できません\n\n\
         ヒント:\n\
         • ネットワーク接続を確認してください\n\
         • リモートURLと認証情報を確認してください"
    )]
    RemoteUnreachable(String),

    #[error("gitコマンドが失敗しました: {command}\n{stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("I/Oエラー: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SyncError>;
