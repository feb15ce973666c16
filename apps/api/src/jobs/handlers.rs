//! Axum route handlers for the Jobs JSON API.

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::jobs::board::JobListing;
use crate::jobs::models::JobEntry;
use crate::jobs::validation::Upload;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Serialize)]
pub struct AdminOptionsResponse {
    pub options: Vec<String>,
}

/// Fields of the add-job form, as posted.
#[derive(Debug, Default)]
pub struct JobForm {
    pub role: String,
    pub file: Option<Upload>,
}

/// Reads the `role` and `file` parts of a multipart submission.
/// Unknown parts are ignored.
pub async fn read_job_form(mut multipart: Multipart) -> Result<JobForm, MultipartError> {
    let mut form = JobForm::default();

    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some("role") => form.role = field.text().await?,
            Some("file") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await?;
                form.file = Some(Upload {
                    file_name,
                    content_type,
                    bytes,
                });
            }
            _ => {}
        }
    }

    Ok(form)
}

/// Wording for an unreadable upload. Bodies over the configured limit get
/// their own message.
pub(crate) fn describe_form_error(err: &MultipartError, limit: usize) -> String {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        format!("The uploaded file is too large. Uploads are limited to {limit} bytes.")
    } else {
        format!("Could not read the upload: {}", err.body_text())
    }
}

fn form_error(err: MultipartError, limit: usize) -> AppError {
    let message = describe_form_error(&err, limit);
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(message)
    } else {
        AppError::Validation(message)
    }
}

/// GET /api/v1/jobs?q=
pub async fn handle_list_jobs(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<JobListing>, AppError> {
    Ok(Json(state.board.search(&params.q).await?))
}

/// POST /api/v1/jobs
///
/// Multipart `role` + `file`. Returns the stored entry.
pub async fn handle_create_job(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<JobEntry>), AppError> {
    let form = read_job_form(multipart)
        .await
        .map_err(|e| form_error(e, state.config.max_upload_bytes))?;
    let entry = state.board.add_job(&form.role, form.file).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// GET /api/v1/jobs/:stored_filename/download
///
/// Serves the document under the name it was uploaded with.
pub async fn handle_download(
    State(state): State<AppState>,
    Path(stored_filename): Path<String>,
) -> Result<Response, AppError> {
    let download = state.board.download(&stored_filename).await?;

    Ok((
        [
            (header::CONTENT_TYPE, download.content_type),
            (
                header::CONTENT_DISPOSITION,
                content_disposition_value(&download.original_filename),
            ),
        ],
        download.bytes,
    )
        .into_response())
}

/// DELETE /api/v1/jobs/:stored_filename
pub async fn handle_delete_job(
    State(state): State<AppState>,
    Path(stored_filename): Path<String>,
) -> Result<StatusCode, AppError> {
    state.board.delete_by_stored_name(&stored_filename).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/admin/options
///
/// Labels for every row of the unfiltered table, in table order.
pub async fn handle_admin_options(
    State(state): State<AppState>,
) -> Result<Json<AdminOptionsResponse>, AppError> {
    let options = state.board.admin_labels().await?;
    Ok(Json(AdminOptionsResponse { options }))
}

/// `Content-Disposition` for a download, with an ASCII fallback name and the
/// exact name percent-encoded per RFC 5987.
fn content_disposition_value(filename: &str) -> String {
    let ascii_safe: String = filename
        .chars()
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .filter(|c| !matches!(c, '"' | ';' | '\\'))
        .collect();
    let ascii_name = if ascii_safe.trim().is_empty() {
        "download".to_string()
    } else {
        ascii_safe
    };

    let encoded = percent_encode(filename);

    format!("attachment; filename=\"{ascii_name}\"; filename*=UTF-8''{encoded}")
}

/// Percent-encodes everything but RFC 3986 unreserved characters. Safe for
/// both URL path segments and RFC 5987 header values.
pub(crate) fn percent_encode(value: &str) -> String {
    value
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                String::from(b as char)
            }
            _ => format!("%{b:02X}"),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition_plain_name() {
        assert_eq!(
            content_disposition_value("spec.pdf"),
            "attachment; filename=\"spec.pdf\"; filename*=UTF-8''spec.pdf"
        );
    }

    #[test]
    fn test_content_disposition_encodes_unicode_and_spaces() {
        let value = content_disposition_value("Zoë JD.txt");
        assert!(value.contains("filename=\"Zo JD.txt\""));
        assert!(value.ends_with("filename*=UTF-8''Zo%C3%AB%20JD.txt"));
    }

    #[test]
    fn test_percent_encode_path_segment() {
        assert_eq!(percent_encode("ab12_x y#?/.pdf"), "ab12_x%20y%23%3F%2F.pdf");
    }

    #[test]
    fn test_content_disposition_strips_quotes() {
        let value = content_disposition_value("a\"b;c.pdf");
        assert!(value.starts_with("attachment; filename=\"abc.pdf\""));
    }
}
