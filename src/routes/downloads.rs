use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::error::AgentError;
use crate::state::SharedState;

const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// List every registered file whose backing file still exists, newest
/// first. Stale entries are purged as a side effect.
pub async fn list_downloads(State(state): State<SharedState>) -> impl IntoResponse {
    let files = state.files.list().await;
    Json(serde_json::json!({ "files": files }))
}

/// Remove a registry entry (the file itself stays on disk).
pub async fn remove_download(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Response {
    match state.files.remove(&id).await {
        Ok(()) => Json(serde_json::json!({
            "success": true,
            "message": "File removed from list"
        }))
        .into_response(),
        Err(_) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({
                "success": false,
                "message": "File not found"
            })),
        )
            .into_response(),
    }
}

/// Stream a registered file as an attachment under its display name. The
/// entry stays registered so the file can be re-downloaded.
pub async fn download_file(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Response, AgentError> {
    let (path, display_name) = state.files.resolve(&id).await?;
    let bytes = tokio::fs::read(&path).await.map_err(|_| AgentError::NotFound)?;

    let mime = mime_guess::from_path(&path)
        .first_raw()
        .unwrap_or(XLSX_MIME);
    let disposition = format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        display_name.replace('"', ""),
        rfc5987_encode(&display_name)
    );

    Ok((
        [
            (header::CONTENT_TYPE, mime.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
            (
                header::ACCESS_CONTROL_EXPOSE_HEADERS,
                "Content-Disposition".to_string(),
            ),
        ],
        bytes,
    )
        .into_response())
}

/// Percent-encode for the RFC 5987 `filename*` parameter.
fn rfc5987_encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'.' | b'-' | b'_' | b'~' => {
                out.push(byte as char);
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rfc5987_passthrough() {
        assert_eq!(rfc5987_encode("Midterm.xlsx"), "Midterm.xlsx");
    }

    #[test]
    fn test_rfc5987_encodes_spaces_and_unicode() {
        assert_eq!(rfc5987_encode("my report.xlsx"), "my%20report.xlsx");
        assert_eq!(rfc5987_encode("résumé"), "r%C3%A9sum%C3%A9");
    }
}
