use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidatorError {
    #[error("no code blocks found in generated text")]
    NoCodeBlocks,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ValidatorError>;
