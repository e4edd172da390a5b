use axum::{
    extract::{Form, Path, Query, State},
    http::header,
    response::{IntoResponse, Redirect, Response},
};
use chrono::Local;
use maud::Markup;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use super::templates::{self, JobListView};
use super::AppState;
use crate::documents;
use crate::errors::AppError;
use crate::models::{JobRecord, ParseValueError};
use crate::tracker::{followups, JobQuery, Stats};

fn not_found(index: usize) -> AppError {
    AppError::NotFound(format!("Job {index} not found"))
}

/// Blank means "not set".
fn parse_optional<T>(raw: &str) -> Result<Option<T>, ParseValueError>
where
    T: FromStr<Err = ParseValueError>,
{
    let raw = raw.trim();
    if raw.is_empty() {
        Ok(None)
    } else {
        raw.parse().map(Some)
    }
}

/// Like `parse_optional`, but a value the row already holds passes through
/// even when it is not a known label, so editing such a row keeps it.
fn parse_kept<T>(raw: &str, current: Option<&T>) -> Result<Option<T>, ParseValueError>
where
    T: FromStr<Err = ParseValueError> + fmt::Display + Clone,
{
    parse_optional(raw).or_else(|e| match current {
        Some(value) if value.to_string().trim() == raw.trim() => Ok(Some(value.clone())),
        _ => Err(e),
    })
}

/// GET /
pub async fn dashboard(State(state): State<AppState>) -> Result<Markup, AppError> {
    let jobs = state.tracker.load()?;
    let stats = Stats::compute(jobs.iter().filter(|job| !job.hidden));
    let due = followups(&jobs, false);
    Ok(templates::dashboard_page(&stats, &due))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ListParams {
    pub status: String,
    pub priority: String,
    pub group: String,
    pub show_hidden: String,
    pub sort: String,
    pub dir: String,
}

impl ListParams {
    pub fn query(&self) -> Result<JobQuery, ParseValueError> {
        Ok(JobQuery {
            status: parse_optional(&self.status)?,
            priority: parse_optional(&self.priority)?,
            group: parse_optional(&self.group)?,
            show_hidden: !self.show_hidden.is_empty(),
            sort: parse_optional(&self.sort)?,
            descending: self.dir == "desc",
        })
    }
}

/// GET /jobs
pub async fn jobs_list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Markup, AppError> {
    let query = params.query()?;
    let jobs = state.tracker.load()?;
    let statuses: BTreeSet<&str> = jobs
        .iter()
        .filter(|job| job.status.is_known())
        .map(|job| job.status.as_str())
        .collect();

    Ok(templates::jobs_page(&JobListView {
        rows: query.apply(&jobs),
        statuses: statuses.into_iter().collect(),
        status: query.status,
        priority: query.priority,
        group: query.group,
        show_hidden: query.show_hidden,
        sort: query.sort,
        descending: query.descending,
    }))
}

/// Form fields are named after the tracker columns. Hidden state is managed
/// by the hide/unhide actions, never by the form.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct JobForm {
    #[serde(rename = "Company")]
    pub company: String,
    #[serde(rename = "Position")]
    pub position: String,
    #[serde(rename = "Location")]
    pub location: String,
    #[serde(rename = "Salary (Base)")]
    pub salary_base: String,
    #[serde(rename = "Total Comp Est.")]
    pub total_comp: String,
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "Applied Date")]
    pub applied_date: String,
    #[serde(rename = "Job URL")]
    pub job_url: String,
    #[serde(rename = "Contact Name")]
    pub contact_name: String,
    #[serde(rename = "Contact Email")]
    pub contact_email: String,
    #[serde(rename = "Contact Phone")]
    pub contact_phone: String,
    #[serde(rename = "Last Contact Date")]
    pub last_contact_date: String,
    #[serde(rename = "Next Follow-Up")]
    pub next_follow_up: String,
    #[serde(rename = "Interview Stage")]
    pub interview_stage: String,
    #[serde(rename = "Notes")]
    pub notes: String,
    #[serde(rename = "Priority")]
    pub priority: String,
    pub notes_append: String,
    pub notes_replace: Option<String>,
}

impl JobForm {
    /// The submitted fields as a record. Unknown enum values are rejected
    /// unless `current` already holds them.
    pub fn to_record(&self, current: Option<&JobRecord>) -> Result<JobRecord, ParseValueError> {
        Ok(JobRecord {
            company: self.company.trim().to_string(),
            position: self.position.trim().to_string(),
            location: self.location.trim().to_string(),
            salary_base: self.salary_base.trim().to_string(),
            total_comp: self.total_comp.trim().to_string(),
            status: parse_kept(&self.status, current.map(|job| &job.status))?.unwrap_or_default(),
            applied_date: self.applied_date.trim().to_string(),
            job_url: self.job_url.trim().to_string(),
            contact_name: self.contact_name.trim().to_string(),
            contact_email: self.contact_email.trim().to_string(),
            contact_phone: self.contact_phone.trim().to_string(),
            last_contact_date: self.last_contact_date.trim().to_string(),
            next_follow_up: self.next_follow_up.trim().to_string(),
            interview_stage: parse_kept(
                &self.interview_stage,
                current.and_then(|job| job.interview_stage.as_ref()),
            )?,
            notes: self.notes.trim().to_string(),
            priority: parse_kept(&self.priority, current.and_then(|job| job.priority.as_ref()))?,
            hidden: false,
            hide_reason: String::new(),
        })
    }
}

/// GET /jobs/new
pub async fn job_new_form() -> Markup {
    templates::job_form_page(None)
}

/// POST /jobs/new
pub async fn job_create(
    State(state): State<AppState>,
    Form(form): Form<JobForm>,
) -> Result<Redirect, AppError> {
    let job = form.to_record(None)?;
    if job.company.is_empty() {
        return Err(AppError::BadRequest("Company is required".to_string()));
    }
    let job = state.tracker.add(job)?;
    tracing::info!(job = %job.label(), "added job");
    Ok(Redirect::to("/jobs"))
}

/// GET /jobs/:index
pub async fn job_detail(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> Result<Markup, AppError> {
    let job = state.tracker.get(index)?.ok_or_else(|| not_found(index))?;
    let docs = documents::company_documents(&state.config, &job.company, &job.position)?;
    Ok(templates::job_detail_page(index, &job, &docs))
}

/// GET /jobs/:index/edit
pub async fn job_edit_form(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> Result<Markup, AppError> {
    let job = state.tracker.get(index)?.ok_or_else(|| not_found(index))?;
    Ok(templates::job_form_page(Some((index, &job))))
}

/// POST /jobs/:index/edit
///
/// A non-blank `notes_append` adds a dated note; otherwise `notes_replace`,
/// when present, overwrites the notes.
pub async fn job_update(
    State(state): State<AppState>,
    Path(index): Path<usize>,
    Form(form): Form<JobForm>,
) -> Result<Redirect, AppError> {
    let current = state.tracker.get(index)?.ok_or_else(|| not_found(index))?;
    let edited = form.to_record(Some(&current))?;
    let today = Local::now().date_naive();

    let updated = state.tracker.modify(index, |job| {
        let notes = std::mem::take(&mut job.notes);
        *job = JobRecord {
            notes,
            hidden: job.hidden,
            hide_reason: std::mem::take(&mut job.hide_reason),
            ..edited
        };
        if !form.notes_append.trim().is_empty() {
            job.append_note(&form.notes_append, today);
        } else if let Some(notes) = &form.notes_replace {
            job.notes = notes.trim().to_string();
        }
    })?;
    let updated = updated.ok_or_else(|| not_found(index))?;
    tracing::info!(job = %updated.label(), "updated job");
    Ok(Redirect::to(&format!("/jobs/{index}")))
}

/// POST /jobs/:index/delete
pub async fn job_delete(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> Result<Redirect, AppError> {
    let removed = state.tracker.delete(index)?.ok_or_else(|| not_found(index))?;
    tracing::info!(job = %removed.label(), "deleted job");
    Ok(Redirect::to("/jobs"))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct HideForm {
    pub reason: String,
}

/// POST /jobs/:index/hide
pub async fn job_hide(
    State(state): State<AppState>,
    Path(index): Path<usize>,
    Form(form): Form<HideForm>,
) -> Result<Redirect, AppError> {
    let job = state.tracker.hide(index, &form.reason)?.ok_or_else(|| not_found(index))?;
    tracing::info!(job = %job.label(), reason = %job.hide_reason, "hid job");
    Ok(Redirect::to("/jobs"))
}

/// POST /jobs/:index/unhide
pub async fn job_unhide(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> Result<Redirect, AppError> {
    let job = state.tracker.unhide(index)?.ok_or_else(|| not_found(index))?;
    tracing::info!(job = %job.label(), "restored job");
    Ok(Redirect::to(&format!("/jobs/{index}")))
}

/// GET /documents
pub async fn documents_index(State(state): State<AppState>) -> Result<Markup, AppError> {
    let listing = documents::list_documents(&state.config)?;
    Ok(templates::documents_page(&listing))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ViewParams {
    pub path: String,
}

/// GET /documents/view?path=...
pub async fn document_view(
    State(state): State<AppState>,
    Query(params): Query<ViewParams>,
) -> Result<Markup, AppError> {
    if params.path.is_empty() {
        return Err(AppError::BadRequest("Missing path".to_string()));
    }
    let config = &state.config;
    let roots = [
        config.resumes_dir.as_path(),
        config.cover_letters_dir.as_path(),
        config.why_company_dir.as_path(),
    ];
    let path = documents::contained(&config.home, &PathBuf::from(&params.path), &roots)
        .ok_or(AppError::Forbidden)?;
    let text = documents::read_markdown(&path)?
        .ok_or_else(|| AppError::NotFound(format!("Document {} not found", params.path)))?;
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(templates::document_view_page(&name, &text))
}

fn content_type(path: &std::path::Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("pdf") => "application/pdf",
        Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}

async fn send_file(path: PathBuf, attachment: bool) -> Result<Response, AppError> {
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", path.display()))?;
    let name = path
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let disposition = if attachment {
        format!("attachment; filename=\"{name}\"")
    } else {
        format!("inline; filename=\"{name}\"")
    };
    Ok((
        [
            (header::CONTENT_TYPE, content_type(&path).to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

/// GET /documents/download/*filename
pub async fn document_download(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    let config = &state.config;
    let roots = [config.resumes_dir.as_path(), config.cover_letters_dir.as_path()];
    let path = documents::find_download(&config.home, &filename, &roots)
        .ok_or_else(|| AppError::NotFound(format!("Document {filename} not found")))?;
    send_file(path, true).await
}

/// GET /base-resume
pub async fn base_resume(State(state): State<AppState>) -> Result<Response, AppError> {
    let path = state.config.base_resume.clone();
    if !path.is_file() {
        return Err(AppError::NotFound("Base resume not found".to_string()));
    }
    send_file(path, false).await
}
