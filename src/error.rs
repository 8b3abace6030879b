use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No usable browser: {0}")]
    BrowserUnavailable(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Login field not found: {0}")]
    LoginFieldNotFound(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Run was cancelled")]
    Cancelled,

    #[error("File not found")]
    NotFound,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WebDriver error: {0}")]
    WebDriver(#[from] thirtyfour::error::WebDriverError),
}

impl IntoResponse for AgentError {
    fn into_response(self) -> Response {
        let status = match &self {
            AgentError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AgentError::NotFound => StatusCode::NOT_FOUND,
            AgentError::BrowserUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = serde_json::json!({
            "error": self.to_string(),
        });

        (status, axum::Json(body)).into_response()
    }
}
