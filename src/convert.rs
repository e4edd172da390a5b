use anyhow::{anyhow, Context, Result};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::{docx, pdf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Docx,
    Pdf,
}

impl Format {
    pub fn extension(&self) -> &'static str {
        match self {
            Format::Docx => "docx",
            Format::Pdf => "pdf",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.extension().to_uppercase())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Resume,
    CoverLetter,
}

impl Kind {
    pub fn plural(&self) -> &'static str {
        match self {
            Kind::Resume => "resumes",
            Kind::CoverLetter => "cover letters",
        }
    }
}

/// `<output_dir>/<input stem>.<ext>`
pub fn output_path(input: &Path, output_dir: &Path, format: Format) -> PathBuf {
    let mut name = input.file_stem().unwrap_or(input.as_os_str()).to_os_string();
    name.push(".");
    name.push(format.extension());
    output_dir.join(name)
}

/// Converts one markdown file and returns the written path. Cover letters as
/// DOCX go through the resume layout.
pub fn convert_file(kind: Kind, format: Format, input: &Path, output_dir: &Path) -> Result<PathBuf> {
    if !input.is_file() {
        return Err(anyhow!("File not found: {}", input.display()));
    }
    let text = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let output = output_path(input, output_dir, format);
    let title = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    match (kind, format) {
        (Kind::Resume, Format::Pdf) => pdf::resume(&text).write(&title, &output)?,
        (Kind::CoverLetter, Format::Pdf) => pdf::cover_letter(&text).write(&title, &output)?,
        (_, Format::Docx) => docx::write(docx::resume(&text), &output)?,
    }
    tracing::info!(input = %input.display(), output = %output.display(), "converted");
    Ok(output)
}

/// Every `*.md` directly inside `dir`, sorted by name.
pub fn markdown_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "md"))
        .collect();
    files.sort();
    Ok(files)
}

#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub converted: Vec<(PathBuf, PathBuf)>,
    pub failed: Vec<(PathBuf, String)>,
}

/// Converts every markdown file in `dir`. A failure is recorded and the batch
/// moves on.
pub fn convert_all(kind: Kind, format: Format, dir: &Path, output_dir: &Path) -> Result<BatchOutcome> {
    let files = markdown_files(dir)?;
    let mut outcome = BatchOutcome::default();
    for input in files {
        match convert_file(kind, format, &input, output_dir) {
            Ok(output) => outcome.converted.push((input, output)),
            Err(e) => {
                tracing::warn!(input = %input.display(), error = %e, "conversion failed");
                outcome.failed.push((input, format!("{e:#}")));
            }
        }
    }
    Ok(outcome)
}
