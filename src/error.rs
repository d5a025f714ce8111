use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("MCP error: {0}")]
    Rpc(String),

    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Delivery error: {0}")]
    Delivery(String),

    #[error("Email error: {0}")]
    Email(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Short, stable label used for span and metric attributes.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config",
            AppError::Http(e) if e.is_timeout() => "timeout",
            AppError::Http(e) if e.is_connect() => "network_error",
            AppError::Http(e) if e.is_status() => "http_status",
            AppError::Http(_) => "http",
            AppError::Rpc(_) => "rpc",
            AppError::Decode(_) => "decode",
            AppError::Delivery(_) => "delivery",
            AppError::Email(_) => "email",
            AppError::Io(_) => "io",
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
