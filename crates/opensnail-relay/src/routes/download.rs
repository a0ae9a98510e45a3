use axum::extract::{Path, State};
use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Response};
use tracing::debug;

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/download/{filename}
/// Sends the stored bytes as an attachment named after the key.
pub async fn download(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    let found = state.gateway.retrieve(&filename, false).await?;

    let disposition = HeaderValue::from_str(&attachment_disposition(&found.filename))
        .map_err(|e| AppError::Internal(format!("invalid attachment filename: {}", e)))?;

    debug!(key = %found.filename, size = found.payload.len(), "Serving download");
    Ok((
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/octet-stream"),
            ),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        found.payload,
    )
        .into_response())
}

/// `Content-Disposition` value with an ASCII `filename` for old clients and
/// the exact UTF-8 name in `filename*`
fn attachment_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| if c.is_ascii() { c } else { '_' })
        .collect();
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(filename)
    )
}

/// GET /api/download/tempshare/{code}
/// Resolves a short code to the full download URL.
pub async fn tempshare(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<String, AppError> {
    let found = state.gateway.retrieve(&code, true).await?;
    Ok(state.gateway.download_url(&found.filename))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_disposition() {
        assert_eq!(
            attachment_disposition("mybot-483920.js"),
            "attachment; filename=\"mybot-483920.js\"; filename*=UTF-8''mybot-483920.js"
        );
    }

    #[test]
    fn test_non_ascii_disposition_is_percent_encoded() {
        let value = attachment_disposition("héllo-483920.js");
        assert_eq!(
            value,
            "attachment; filename=\"h_llo-483920.js\"; filename*=UTF-8''h%C3%A9llo-483920.js"
        );
        assert!(value.is_ascii());
        assert!(HeaderValue::from_str(&value).is_ok());
    }
}
