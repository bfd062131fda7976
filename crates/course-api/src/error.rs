use catalogue_common::error::ChatError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Chat(#[from] ChatError),

    #[error("config error: {0}")]
    Config(String),
}
