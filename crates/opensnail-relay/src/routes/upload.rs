use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use tracing::warn;

use crate::constants::{UPLOAD_FILE_FIELD, UPLOAD_NAME_FIELD};
use crate::error::AppError;
use crate::gateway::UploadForm;
use crate::state::AppState;

/// POST /api/upload
/// Multipart form with the file in `extension` and its name in
/// `extensionName`. Returns the download URL as plain text.
pub async fn upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<String, AppError> {
    let mut multipart = multipart.map_err(|rejection| {
        warn!(error = %rejection, "Upload is not a multipart form");
        AppError::BadRequest(rejection.body_text())
    })?;
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(&state, e))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some(UPLOAD_FILE_FIELD) => {
                form.original_filename = field.file_name().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| multipart_error(&state, e))?;
                form.payload = Some(bytes);
            }
            Some(UPLOAD_NAME_FIELD) => {
                form.declared_name =
                    Some(field.text().await.map_err(|e| multipart_error(&state, e))?);
            }
            _ => {}
        }
    }

    Ok(state.gateway.accept(form).await?)
}

/// Body over the size limit and malformed forms are the client's fault;
/// anything else is a failure reading the request stream.
fn multipart_error(state: &AppState, err: MultipartError) -> AppError {
    let status = err.status();
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        warn!(error = %err, "Upload exceeded the request body limit");
        return AppError::BadRequest(format!(
            "File exceeds the upload limit of {} bytes.",
            state.gateway.policy().max_size
        ));
    }
    if status.is_client_error() {
        return AppError::BadRequest(err.body_text());
    }
    AppError::Internal(format!("failed to read upload: {}", err))
}
