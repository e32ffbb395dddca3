pub type ChanfxResult<T> = Result<T, ChanfxError>;

#[derive(thiserror::Error, Debug)]
pub enum ChanfxError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("window acquisition failed: {0}")]
    Acquisition(String),

    #[error("scanline commit failed: {0}")]
    Commit(String),

    #[error("malformed program: {0}")]
    MalformedProgram(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ChanfxError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn acquisition(msg: impl Into<String>) -> Self {
        Self::Acquisition(msg.into())
    }

    pub fn commit(msg: impl Into<String>) -> Self {
        Self::Commit(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedProgram(msg.into())
    }
}
