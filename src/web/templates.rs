use axum::http::StatusCode;
use maud::{html, Markup, PreEscaped, DOCTYPE};
use std::path::Path;

use crate::documents::{CompanyDoc, CompanyDocs, DocEntry, Listing};
use crate::markdown::{self, Block, SectionKind};
use crate::models::{HIDE_REASONS, InterviewStage, JobRecord, Priority, Status};
use crate::tracker::{Group, SortKey, Stats};

const STYLE: &str = "
body { font-family: system-ui, sans-serif; margin: 0; color: #222; }
header { display: flex; align-items: center; justify-content: space-between; padding: 0.75rem 1.5rem; background: #1a1a2e; color: #fff; }
header a { color: #fff; text-decoration: none; }
nav ul { display: flex; gap: 1.25rem; list-style: none; margin: 0; padding: 0; }
.container { max-width: 1100px; margin: 1.5rem auto; padding: 0 1.5rem; }
.card { border: 1px solid #ddd; border-radius: 6px; padding: 1rem 1.25rem; margin-bottom: 1.25rem; }
.stats { display: flex; flex-wrap: wrap; gap: 1rem; margin-bottom: 1.25rem; }
.stat { flex: 1; min-width: 120px; border: 1px solid #ddd; border-radius: 6px; padding: 0.75rem; text-align: center; }
.stat strong { display: block; font-size: 1.8rem; }
table { width: 100%; border-collapse: collapse; }
th, td { text-align: left; padding: 0.4rem 0.5rem; border-bottom: 1px solid #eee; }
tr.hidden-row { color: #999; }
.filters { display: flex; flex-wrap: wrap; gap: 0.5rem; align-items: center; margin-bottom: 1rem; }
.muted { color: #777; }
form.inline { display: inline; }
.field { display: flex; flex-direction: column; margin-bottom: 0.75rem; }
.grid { display: grid; grid-template-columns: repeat(2, 1fr); gap: 0 1.5rem; }
.document { max-width: 800px; line-height: 1.5; }
";

pub fn layout(title: &str, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) " | Job Search" }
                style { (PreEscaped(STYLE)) }
            }
            body {
                header {
                    h3 { a href="/" { "Job Search" } }
                    nav {
                        ul {
                            li { a href="/" { "Dashboard" } }
                            li { a href="/jobs" { "Jobs" } }
                            li { a href="/jobs/new" { "Add Job" } }
                            li { a href="/documents" { "Documents" } }
                            li { a href="/base-resume" { "Base Resume" } }
                        }
                    }
                }
                main class="container" { (content) }
            }
        }
    }
}

pub fn error_page(status: StatusCode, message: &str) -> Markup {
    let reason = status.canonical_reason().unwrap_or("Error");
    layout(
        reason,
        html! {
            h1 { (status.as_u16()) " " (reason) }
            p { (message) }
            a href="/" { "Back to dashboard" }
        },
    )
}

fn job_href(index: usize) -> String {
    format!("/jobs/{index}")
}

fn view_href(path: &Path) -> String {
    format!(
        "/documents/view?path={}",
        urlencoding::encode(&path.to_string_lossy())
    )
}

fn download_href(filename: &str) -> String {
    format!("/documents/download/{}", urlencoding::encode(filename))
}

fn priority_label(job: &JobRecord) -> &str {
    job.priority.as_ref().map(|p| p.as_str()).unwrap_or("")
}

fn stat(label: &str, value: usize, href: &str) -> Markup {
    html! {
        a class="stat" href=(href) {
            strong { (value) }
            (label)
        }
    }
}

pub fn dashboard_page(stats: &Stats, followups: &[(usize, &JobRecord)]) -> Markup {
    layout(
        "Dashboard",
        html! {
            h1 { "Dashboard" }
            section class="stats" {
                (stat("Total", stats.total, "/jobs"))
                (stat("Applied", stats.applied, "/jobs?group=applied"))
                (stat("Not Applied", stats.not_applied, "/jobs?group=not_applied"))
                (stat("Interviewing", stats.interviewing, "/jobs?group=interviewing"))
                (stat("Offers", stats.offers, "/jobs?group=offers"))
                (stat("Rejected/Closed", stats.rejected, "/jobs?group=rejected"))
            }
            p { "Response rate: " strong { (stats.response_rate_label()) } }

            section class="card" {
                h3 { "Follow-ups" }
                @if followups.is_empty() {
                    p class="muted" { "No follow-ups scheduled." }
                } @else {
                    table {
                        thead {
                            tr { th { "Date" } th { "Company" } th { "Position" } th { "Status" } th { "Contact" } }
                        }
                        tbody {
                            @for (index, job) in followups {
                                tr {
                                    td { (job.next_follow_up) }
                                    td { a href=(job_href(*index)) { (job.company) } }
                                    td { (job.position) }
                                    td { (job.status.as_str()) }
                                    td { (job.contact_name) }
                                }
                            }
                        }
                    }
                }
            }
        },
    )
}

/// Everything the job list page shows, including the current filter values.
pub struct JobListView<'a> {
    pub rows: Vec<(usize, &'a JobRecord)>,
    /// Statuses present in the tracker, sorted.
    pub statuses: Vec<&'a str>,
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    pub group: Option<Group>,
    pub show_hidden: bool,
    pub sort: Option<SortKey>,
    pub descending: bool,
}

pub fn jobs_page(view: &JobListView<'_>) -> Markup {
    let heading = match view.group {
        Some(group) => format!("Jobs: {}", group.label()),
        None => "Jobs".to_string(),
    };
    layout(
        "Jobs",
        html! {
            h1 { (heading) }
            form class="filters" method="get" action="/jobs" {
                select name="group" {
                    option value="" { "All groups" }
                    @for group in Group::ALL {
                        option value=(group.key()) selected[view.group == Some(group)] { (group.label()) }
                    }
                }
                select name="status" {
                    option value="" { "All statuses" }
                    @for status in &view.statuses {
                        option value=(status) selected[view.status.as_ref().is_some_and(|s| s.as_str() == *status)] { (status) }
                    }
                }
                select name="priority" {
                    option value="" { "All priorities" }
                    @for priority in Priority::ALL {
                        option value=(priority.as_str()) selected[view.priority.as_ref() == Some(priority)] { (priority.as_str()) }
                    }
                }
                select name="sort" {
                    option value="" { "Tracker order" }
                    @for key in SortKey::ALL {
                        option value=(key.key()) selected[view.sort == Some(key)] { "Sort by " (key.key()) }
                    }
                }
                select name="dir" {
                    option value="asc" selected[!view.descending] { "Ascending" }
                    option value="desc" selected[view.descending] { "Descending" }
                }
                label {
                    input type="checkbox" name="show_hidden" value="1" checked[view.show_hidden];
                    " Show hidden"
                }
                button type="submit" { "Apply" }
            }

            p class="muted" { (view.rows.len()) " jobs" }
            table {
                thead {
                    tr {
                        th { "Company" } th { "Position" } th { "Location" } th { "Total Comp" }
                        th { "Status" } th { "Applied" } th { "Priority" } th { "Follow-Up" }
                    }
                }
                tbody {
                    @for (index, job) in &view.rows {
                        tr class=[job.hidden.then_some("hidden-row")] {
                            td { a href=(job_href(*index)) { (job.company) } }
                            td { (job.position) }
                            td { (job.location) }
                            td { (job.total_comp) }
                            td { (job.status.as_str()) }
                            td { (job.applied_date) }
                            td { (priority_label(job)) }
                            td { (job.next_follow_up) }
                        }
                    }
                }
            }
        },
    )
}

fn text_field(label: &str, name: &str, value: &str) -> Markup {
    html! {
        label class="field" {
            (label)
            input type="text" name=(name) value=(value);
        }
    }
}

fn date_field(label: &str, name: &str, value: &str) -> Markup {
    html! {
        label class="field" {
            (label)
            input type="date" name=(name) value=(value);
        }
    }
}

/// Add form when `existing` is `None`, edit form otherwise.
pub fn job_form_page(existing: Option<(usize, &JobRecord)>) -> Markup {
    let blank = JobRecord::default();
    let (title, action, job) = match existing {
        Some((index, job)) => ("Edit Job", format!("/jobs/{index}/edit"), job),
        None => ("Add Job", "/jobs/new".to_string(), &blank),
    };
    layout(
        title,
        html! {
            h1 { (title) }
            form method="post" action=(action) {
                div class="grid" {
                    (text_field("Company", "Company", &job.company))
                    (text_field("Position", "Position", &job.position))
                    (text_field("Location", "Location", &job.location))
                    (text_field("Salary (Base)", "Salary (Base)", &job.salary_base))
                    (text_field("Total Comp Est.", "Total Comp Est.", &job.total_comp))
                    (text_field("Job URL", "Job URL", &job.job_url))
                    label class="field" {
                        "Status"
                        select name="Status" {
                            @for status in Status::ALL {
                                option value=(status.as_str()) selected[job.status == *status] { (status.as_str()) }
                            }
                            @if !job.status.is_known() {
                                option value=(job.status.as_str()) selected { (job.status.as_str()) }
                            }
                        }
                    }
                    label class="field" {
                        "Interview Stage"
                        select name="Interview Stage" {
                            option value="" { "" }
                            @for stage in InterviewStage::ALL {
                                option value=(stage.as_str()) selected[job.interview_stage.as_ref() == Some(stage)] { (stage.as_str()) }
                            }
                            @if let Some(stage) = job.interview_stage.as_ref().filter(|s| !s.is_known()) {
                                option value=(stage.as_str()) selected { (stage.as_str()) }
                            }
                        }
                    }
                    label class="field" {
                        "Priority"
                        select name="Priority" {
                            option value="" { "" }
                            @for priority in Priority::ALL {
                                option value=(priority.as_str()) selected[job.priority.as_ref() == Some(priority)] { (priority.as_str()) }
                            }
                            @if let Some(priority) = job.priority.as_ref().filter(|p| !p.is_known()) {
                                option value=(priority.as_str()) selected { (priority.as_str()) }
                            }
                        }
                    }
                    (date_field("Applied Date", "Applied Date", &job.applied_date))
                    (text_field("Contact Name", "Contact Name", &job.contact_name))
                    (text_field("Contact Email", "Contact Email", &job.contact_email))
                    (text_field("Contact Phone", "Contact Phone", &job.contact_phone))
                    (date_field("Last Contact Date", "Last Contact Date", &job.last_contact_date))
                    (date_field("Next Follow-Up", "Next Follow-Up", &job.next_follow_up))
                }
                @if existing.is_some() {
                    label class="field" {
                        "Add a note (dated, appended)"
                        input type="text" name="notes_append";
                    }
                    label class="field" {
                        "Notes (edit directly)"
                        textarea name="notes_replace" rows="4" { (job.notes) }
                    }
                } @else {
                    label class="field" {
                        "Notes"
                        textarea name="Notes" rows="4" {}
                    }
                }
                button type="submit" { "Save" }
            }
        },
    )
}

fn company_doc_rows(label: &str, docs: &[CompanyDoc]) -> Markup {
    html! {
        h4 { (label) }
        @if docs.is_empty() {
            p class="muted" { "None found." }
        } @else {
            ul {
                @for doc in docs {
                    li {
                        (doc.label) " "
                        a href=(view_href(&doc.md_path)) { "View" }
                        @if let Some(pdf_name) = &doc.pdf_name {
                            " | "
                            a href=(download_href(pdf_name)) { "PDF" }
                        }
                    }
                }
            }
        }
    }
}

pub fn job_detail_page(index: usize, job: &JobRecord, docs: &CompanyDocs) -> Markup {
    let fields: [(&str, &str); 12] = [
        ("Location", &job.location),
        ("Salary (Base)", &job.salary_base),
        ("Total Comp Est.", &job.total_comp),
        ("Status", job.status.as_str()),
        ("Applied Date", &job.applied_date),
        ("Interview Stage", job.interview_stage.as_ref().map(|s| s.as_str()).unwrap_or("")),
        ("Priority", priority_label(job)),
        ("Contact Name", &job.contact_name),
        ("Contact Email", &job.contact_email),
        ("Contact Phone", &job.contact_phone),
        ("Last Contact Date", &job.last_contact_date),
        ("Next Follow-Up", &job.next_follow_up),
    ];
    layout(
        &job.label(),
        html! {
            h1 { (job.company) }
            h2 { (job.position) }
            @if job.hidden {
                p class="muted" { "Hidden: " (job.hide_reason) }
            }
            @if !job.job_url.is_empty() {
                p { a href=(job.job_url) target="_blank" rel="noopener" { "Job posting" } }
            }
            section class="card" {
                table {
                    @for (label, value) in fields {
                        tr { th { (label) } td { (value) } }
                    }
                }
            }
            section class="card" {
                h3 { "Notes" }
                @if job.notes.is_empty() {
                    p class="muted" { "No notes." }
                } @else {
                    ul {
                        @for entry in job.notes.split(" | ") {
                            li { (entry) }
                        }
                    }
                }
            }
            section class="card" {
                h3 { "Documents" }
                (company_doc_rows("Resumes", &docs.resumes))
                (company_doc_rows("Cover Letters", &docs.cover_letters))
                (company_doc_rows("Why Company", &docs.why_company))
            }
            section class="card" {
                a href=(format!("/jobs/{index}/edit")) { "Edit" }
                " "
                @if job.hidden {
                    form class="inline" method="post" action=(format!("/jobs/{index}/unhide")) {
                        button type="submit" { "Unhide" }
                    }
                } @else {
                    form class="inline" method="post" action=(format!("/jobs/{index}/hide")) {
                        select name="reason" {
                            @for reason in HIDE_REASONS {
                                option value=(reason) { (reason) }
                            }
                        }
                        button type="submit" { "Hide" }
                    }
                }
                " "
                form class="inline" method="post" action=(format!("/jobs/{index}/delete"))
                    onsubmit="return confirm('Delete this job?');" {
                    button type="submit" { "Delete" }
                }
            }
        },
    )
}

fn document_rows(entries: &[DocEntry]) -> Markup {
    html! {
        @if entries.is_empty() {
            p class="muted" { "No documents." }
        } @else {
            table {
                thead { tr { th { "File" } th { "Company" } th { "" } } }
                tbody {
                    @for entry in entries {
                        tr {
                            td { (entry.filename) }
                            td { (entry.company.replace('_', " ")) }
                            td {
                                @if entry.kind == "md" {
                                    a href=(view_href(&entry.path)) { "View" }
                                } @else {
                                    a href=(download_href(&entry.filename)) { "Download" }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

pub fn documents_page(listing: &Listing) -> Markup {
    layout(
        "Documents",
        html! {
            h1 { "Documents" }
            section class="card" {
                h3 { "Resumes" }
                (document_rows(&listing.resumes))
            }
            section class="card" {
                h3 { "Cover Letters" }
                (document_rows(&listing.cover_letters))
            }
        },
    )
}

pub fn document_view_page(name: &str, text: &str) -> Markup {
    layout(
        name,
        html! {
            p { a href="/documents" { "Back to documents" } }
            article class="document" { (render_markdown(text)) }
        },
    )
}

fn inline(text: &str) -> Markup {
    html! {
        @for span in markdown::inline_spans(text) {
            @if span.bold && span.italic {
                strong { em { (span.text) } }
            } @else if span.bold {
                strong { (span.text) }
            } @else if span.italic {
                em { (span.text) }
            } @else {
                (span.text)
            }
        }
    }
}

/// Consecutive bullets and table rows render as one list or table.
enum Chunk<'a> {
    List(Vec<&'a str>),
    Table(Vec<&'a str>),
    Single(&'a Block),
}

fn chunks(blocks: &[Block]) -> Vec<Chunk<'_>> {
    let mut out: Vec<Chunk<'_>> = Vec::new();
    for block in blocks {
        match block {
            Block::Bullet(item) => {
                if let Some(Chunk::List(items)) = out.last_mut() {
                    items.push(item.as_str());
                    continue;
                }
                out.push(Chunk::List(vec![item.as_str()]));
            }
            Block::TableRow(row) => {
                if let Some(Chunk::Table(rows)) = out.last_mut() {
                    rows.push(row.as_str());
                    continue;
                }
                out.push(Chunk::Table(vec![row.as_str()]));
            }
            other => out.push(Chunk::Single(other)),
        }
    }
    out
}

fn table_markup(rows: &[&str]) -> Markup {
    let has_header = rows.get(1).is_some_and(|row| markdown::is_table_separator(row));
    html! {
        table {
            @for (i, row) in rows.iter().enumerate() {
                @if !markdown::is_table_separator(row) {
                    tr {
                        @for cell in markdown::table_cells(row) {
                            @if has_header && i == 0 {
                                th { (inline(cell)) }
                            } @else {
                                td { (inline(cell)) }
                            }
                        }
                    }
                }
            }
        }
    }
}

/// HTML preview of a resume or cover letter, built from the same line model
/// the document converters use.
pub fn render_markdown(text: &str) -> Markup {
    let sections = markdown::parse(text);
    html! {
        @for section in &sections {
            @match section.kind {
                SectionKind::Title => h1 { (inline(&section.heading)) },
                SectionKind::Header => h2 { (inline(&section.heading)) },
                SectionKind::Preamble => {},
            }
            @for chunk in chunks(&section.blocks) {
                @match chunk {
                    Chunk::List(items) => ul { @for item in items { li { (inline(item)) } } },
                    Chunk::Table(rows) => (table_markup(&rows)),
                    Chunk::Single(Block::Heading3(text)) => h3 { (inline(text)) },
                    Chunk::Single(Block::Rule) => { hr; },
                    Chunk::Single(Block::Text(text)) => p { (inline(text)) },
                    Chunk::Single(_) => {},
                }
            }
        }
    }
}
