//! Server-rendered job board page.
//!
//! Every interaction is one request: apply at most one mutation, then render
//! the whole page again from the working copy.

use anyhow::Result;
use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    response::Html,
    Form,
};
use minijinja::Environment;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::jobs::board::{BoardError, ListedJob};
use crate::jobs::handlers::{describe_form_error, percent_encode, read_job_form, SearchQuery};
use crate::jobs::validation::ALLOWED_TYPES;
use crate::state::AppState;

const PAGE_TITLE: &str = "Job Board";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Success,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct JobRow<'a> {
    #[serde(flatten)]
    job: &'a ListedJob,
    download_href: String,
}

#[derive(Debug, Serialize)]
struct PageView<'a> {
    page_title: &'static str,
    notice: Option<&'a Notice>,
    query: &'a str,
    jobs: Vec<JobRow<'a>>,
    admin_options: &'a [String],
    accept: String,
}

/// Holds the compiled page template.
pub struct PageRenderer {
    env: Environment<'static>,
}

impl PageRenderer {
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        // The `.html` name turns on HTML auto-escaping.
        env.add_template("index.html", include_str!("templates/index.html.j2"))?;
        Ok(Self { env })
    }

    fn render(
        &self,
        query: &str,
        jobs: &[ListedJob],
        admin_options: &[String],
        notice: Option<&Notice>,
    ) -> Result<String, minijinja::Error> {
        let view = PageView {
            page_title: PAGE_TITLE,
            notice,
            query,
            jobs: jobs
                .iter()
                .map(|job| JobRow {
                    download_href: format!(
                        "/api/v1/jobs/{}/download",
                        percent_encode(&job.stored_filename)
                    ),
                    job,
                })
                .collect(),
            admin_options,
            accept: ALLOWED_TYPES
                .iter()
                .map(|(ext, _)| format!(".{ext}"))
                .collect::<Vec<_>>()
                .join(","),
        };
        self.env.get_template("index.html")?.render(&view)
    }
}

/// Renders the page for `query` from the current working copy.
async fn render_page(
    state: &AppState,
    query: &str,
    notice: Option<&Notice>,
) -> Result<Html<String>, AppError> {
    let listing = state.board.search(query).await?;
    let admin_options = state.board.admin_labels().await?;
    let html = state
        .pages
        .render(&listing.query, &listing.jobs, &admin_options, notice)
        .map_err(|e| AppError::Internal(e.into()))?;
    Ok(Html(html))
}

fn failure_status(err: &BoardError) -> StatusCode {
    match err {
        BoardError::Validation(_) | BoardError::Selection(_) => StatusCode::BAD_REQUEST,
        BoardError::UnknownJob(_) | BoardError::MissingBlob(_) => StatusCode::NOT_FOUND,
        BoardError::Blob(_) | BoardError::Record(_) | BoardError::Task(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// GET /?q=
pub async fn handle_page(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Result<Html<String>, AppError> {
    render_page(&state, &params.q, None).await
}

/// POST /jobs
///
/// Form submission from the page. Re-renders with a cleared form.
pub async fn handle_add_job(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Html<String>), AppError> {
    let form = match read_job_form(multipart).await {
        Ok(form) => form,
        Err(e) => {
            let status = e.status();
            let notice = Notice::error(describe_form_error(&e, state.config.max_upload_bytes));
            return Ok((status, render_page(&state, "", Some(&notice)).await?));
        }
    };

    let (status, notice) = match state.board.add_job(&form.role, form.file).await {
        Ok(entry) => (
            StatusCode::OK,
            Notice::success(format!("✅ '{}' added.", entry.role)),
        ),
        Err(e) => (failure_status(&e), Notice::error(e.to_string())),
    };

    Ok((status, render_page(&state, "", Some(&notice)).await?))
}

#[derive(Debug, Deserialize)]
pub struct DeleteForm {
    #[serde(default)]
    pub label: String,
}

/// POST /admin/delete
pub async fn handle_admin_delete(
    State(state): State<AppState>,
    Form(form): Form<DeleteForm>,
) -> Result<(StatusCode, Html<String>), AppError> {
    let (status, notice) = match state.board.delete_by_label(&form.label).await {
        Ok(_) => (StatusCode::OK, Notice::success("Deleted.")),
        Err(e) => (failure_status(&e), Notice::error(e.to_string())),
    };

    Ok((status, render_page(&state, "", Some(&notice)).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(position: usize, role: &str, present: bool) -> ListedJob {
        ListedJob {
            position,
            label: format!("{position}: {role}"),
            role: role.to_string(),
            stored_filename: format!("{position:032x}_jd #{position}.pdf"),
            original_filename: format!("jd #{position}.pdf"),
            blob_present: present,
        }
    }

    #[test]
    fn test_empty_state_message() {
        let html = PageRenderer::new().unwrap().render("", &[], &[], None).unwrap();
        assert!(html.contains("No jobs yet. Add one using the form above."));
        assert!(!html.contains("Delete Selected"));
        assert!(html.contains("accept=\".pdf,.docx,.txt\""));
    }

    #[test]
    fn test_rows_and_missing_warning() {
        let jobs = [job(0, "API Developer", true), job(1, "Tester", false)];
        let options = vec!["0: API Developer".to_string(), "1: Tester".to_string()];
        let html = PageRenderer::new()
            .unwrap()
            .render("", &jobs, &options, None)
            .unwrap();

        assert!(html.contains("<strong>API Developer</strong>"));
        assert!(html.contains("/api/v1/jobs/00000000000000000000000000000000_jd%20%230.pdf/download"));
        assert_eq!(html.matches("File missing on disk.").count(), 1);
        assert!(html.contains("<option value=\"1: Tester\">"));
        assert!(!html.contains("No jobs yet"));
    }

    #[test]
    fn test_user_text_is_escaped() {
        let jobs = [job(0, "<script>alert(1)</script>", true)];
        let html = PageRenderer::new()
            .unwrap()
            .render("\"><b>", &jobs, &[], Some(&Notice::error("<i>bad</i>")))
            .unwrap();

        assert!(!html.contains("<script>alert(1)</script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("\"><b>"));
        assert!(!html.contains("<i>bad</i>"));
    }

    #[test]
    fn test_notice_kind_class() {
        let html = PageRenderer::new()
            .unwrap()
            .render("", &[], &[], Some(&Notice::success("Deleted.")))
            .unwrap();
        assert!(html.contains("class=\"notice success\""));
    }
}
