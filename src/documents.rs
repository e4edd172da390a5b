use anyhow::{Context, Result};
use std::path::{Component, Path, PathBuf};

use crate::config::Config;

/// A resume or cover letter file as shown in the document browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocEntry {
    pub filename: String,
    /// File stem with the candidate prefix removed.
    pub company: String,
    /// `md` or `pdf`.
    pub kind: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    pub resumes: Vec<DocEntry>,
    pub cover_letters: Vec<DocEntry>,
}

pub fn list_documents(config: &Config) -> Result<Listing> {
    Ok(Listing {
        resumes: list_dir(&config.resumes_dir, &config.resume_prefix())?,
        cover_letters: list_dir(&config.cover_letters_dir, &config.cover_letter_prefix())?,
    })
}

fn list_dir(dir: &Path, prefix: &str) -> Result<Vec<DocEntry>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .collect();
    paths.sort();

    Ok(paths
        .into_iter()
        .filter_map(|path| {
            let kind = path.extension()?.to_str()?;
            if kind != "md" && kind != "pdf" {
                return None;
            }
            let stem = path.file_stem()?.to_string_lossy();
            Some(DocEntry {
                filename: path.file_name()?.to_string_lossy().into_owned(),
                company: stem.replace(prefix, ""),
                kind: kind.to_string(),
                path: path.clone(),
            })
        })
        .collect())
}

/// A tailored document for one company, found by file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyDoc {
    pub md_path: PathBuf,
    /// Rendered copy offered for download; WhyCompany notes have none.
    pub pdf_name: Option<String>,
    /// File stem after the candidate prefix, e.g. `Acme_Platform`.
    pub tag: String,
    pub label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompanyDocs {
    pub resumes: Vec<CompanyDoc>,
    pub cover_letters: Vec<CompanyDoc>,
    pub why_company: Vec<CompanyDoc>,
}

/// Finds `<prefix><Company>*.md` files, trying the company with spaces as
/// underscores and then with spaces removed. When a company has several
/// documents, the position narrows them down.
pub fn company_documents(config: &Config, company: &str, position: &str) -> Result<CompanyDocs> {
    let company = company.trim();
    if company.is_empty() {
        return Ok(CompanyDocs::default());
    }
    let resumes = find_tagged(&config.resumes_dir, &config.resume_prefix(), company, true)?;
    let cover_letters =
        find_tagged(&config.cover_letters_dir, &config.cover_letter_prefix(), company, true)?;
    let why_company =
        find_tagged(&config.why_company_dir, &config.why_company_prefix(), company, false)?;
    Ok(CompanyDocs {
        resumes: filter_by_position(resumes, company, position),
        cover_letters: filter_by_position(cover_letters, company, position),
        why_company: filter_by_position(why_company, company, position),
    })
}

fn find_tagged(dir: &Path, prefix: &str, company: &str, with_pdf: bool) -> Result<Vec<CompanyDoc>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut stems: Vec<String> = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "md"))
        .filter_map(|path| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .collect();
    stems.sort();

    for variant in [company.replace(' ', "_"), company.replace(' ', "")] {
        let wanted = format!("{prefix}{variant}");
        let docs: Vec<CompanyDoc> = stems
            .iter()
            .filter(|stem| stem.starts_with(&wanted))
            .map(|stem| {
                let tag = stem[prefix.len()..].to_string();
                CompanyDoc {
                    md_path: dir.join(format!("{stem}.md")),
                    pdf_name: with_pdf.then(|| format!("{stem}.pdf")),
                    label: tag.replace('_', " "),
                    tag,
                }
            })
            .collect();
        if !docs.is_empty() {
            return Ok(docs);
        }
    }
    Ok(Vec::new())
}

/// Lowercase ASCII alphanumerics only.
fn normalize(text: &str) -> String {
    text.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Keeps documents whose role suffix (the tag after the company name)
/// appears in the position. Falls back to every document when there is at
/// most one, no position, or nothing matches.
pub fn filter_by_position(docs: Vec<CompanyDoc>, company: &str, position: &str) -> Vec<CompanyDoc> {
    if docs.len() <= 1 || position.trim().is_empty() {
        return docs;
    }
    let position = normalize(position);
    let company = normalize(company);
    let matched: Vec<CompanyDoc> = docs
        .iter()
        .filter(|doc| {
            let tag = normalize(&doc.tag);
            let role = tag.strip_prefix(company.as_str()).unwrap_or(&tag);
            !role.is_empty() && position.contains(role)
        })
        .cloned()
        .collect();
    if matched.is_empty() { docs } else { matched }
}

/// Raw markdown, or `None` when the file is missing or not `.md`.
pub fn read_markdown(path: &Path) -> Result<Option<String>> {
    if !path.is_file() || path.extension().is_none_or(|ext| ext != "md") {
        return Ok(None);
    }
    let text = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(Some(text))
}

fn lexical(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Absolute, symlink-free form of `path`. A missing file is resolved through
/// its parent so it compares like an existing one.
pub fn resolve(base: &Path, path: &Path) -> PathBuf {
    let joined = lexical(&base.join(path));
    if let Ok(real) = joined.canonicalize() {
        return real;
    }
    match (joined.parent().map(Path::canonicalize), joined.file_name()) {
        (Some(Ok(parent)), Some(name)) => parent.join(name),
        _ => joined,
    }
}

/// The resolved path when it lies inside one of `roots`, compared component
/// by component.
pub fn contained(base: &Path, path: &Path, roots: &[&Path]) -> Option<PathBuf> {
    let resolved = resolve(base, path);
    roots
        .iter()
        .map(|root| resolve(base, root))
        .any(|root| resolved.starts_with(&root))
        .then_some(resolved)
}

/// Looks `filename` up under each root in turn; only existing `.pdf` and
/// `.docx` files that stay inside their root qualify.
pub fn find_download(base: &Path, filename: &str, roots: &[&Path]) -> Option<PathBuf> {
    roots.iter().find_map(|root| {
        let candidate = root.join(filename);
        let allowed = candidate
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext == "pdf" || ext == "docx");
        if !allowed || !candidate.is_file() {
            return None;
        }
        contained(base, &candidate, &[root])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workspace() -> (tempfile::TempDir, Config) {
        let dir = tempfile::tempdir().unwrap();
        let home = dir.path().to_string_lossy().into_owned();
        let config = Config::from_lookup(|key| match key {
            "JOBTRACK_HOME" => Some(home.clone()),
            "CANDIDATE_NAME" => Some("Jane_Doe".to_string()),
            _ => None,
        })
        .unwrap();
        std::fs::create_dir_all(&config.resumes_dir).unwrap();
        std::fs::create_dir_all(&config.cover_letters_dir).unwrap();
        (dir, config)
    }

    fn touch(path: &Path) {
        std::fs::write(path, "# doc\n").unwrap();
    }

    #[test]
    fn test_list_documents_md_and_pdf_only() {
        let (_dir, config) = workspace();
        touch(&config.resumes_dir.join("Jane_Doe_Resume_Acme.md"));
        touch(&config.resumes_dir.join("Jane_Doe_Resume_Acme.pdf"));
        touch(&config.resumes_dir.join("Jane_Doe_Resume_Acme.docx"));
        touch(&config.cover_letters_dir.join("Jane_Doe_CoverLetter_Globex.md"));

        let listing = list_documents(&config).unwrap();
        let names: Vec<&str> = listing.resumes.iter().map(|d| d.filename.as_str()).collect();
        assert_eq!(names, vec!["Jane_Doe_Resume_Acme.md", "Jane_Doe_Resume_Acme.pdf"]);
        assert_eq!(listing.resumes[0].company, "Acme");
        assert_eq!(listing.cover_letters[0].company, "Globex");
        assert_eq!(listing.cover_letters[0].kind, "md");
    }

    #[test]
    fn test_company_documents_variants_and_position() {
        let (_dir, config) = workspace();
        touch(&config.resumes_dir.join("Jane_Doe_Resume_Big_Co_Platform.md"));
        touch(&config.resumes_dir.join("Jane_Doe_Resume_Big_Co_Safeguards.md"));
        touch(&config.cover_letters_dir.join("Jane_Doe_CoverLetter_BigCo.md"));

        let docs = company_documents(&config, "Big Co", "Safeguards Engineer").unwrap();
        assert_eq!(docs.resumes.len(), 1);
        assert_eq!(docs.resumes[0].tag, "Big_Co_Safeguards");
        assert_eq!(docs.resumes[0].label, "Big Co Safeguards");
        assert_eq!(
            docs.resumes[0].pdf_name.as_deref(),
            Some("Jane_Doe_Resume_Big_Co_Safeguards.pdf")
        );
        assert_eq!(docs.cover_letters.len(), 1);

        let docs = company_documents(&config, "Big Co", "Data Scientist").unwrap();
        assert_eq!(docs.resumes.len(), 2);
        assert_eq!(company_documents(&config, "", "x").unwrap(), CompanyDocs::default());
    }

    #[test]
    fn test_company_documents_include_why_company_notes() {
        let (_dir, config) = workspace();
        assert!(company_documents(&config, "Acme", "SRE").unwrap().why_company.is_empty());

        std::fs::create_dir_all(&config.why_company_dir).unwrap();
        touch(&config.why_company_dir.join("Jane_Doe_WhyCompany_Acme_SRE.md"));
        touch(&config.why_company_dir.join("Jane_Doe_WhyCompany_Acme_Data.md"));
        touch(&config.why_company_dir.join("Jane_Doe_WhyCompany_Globex.md"));

        let docs = company_documents(&config, "Acme", "Senior SRE").unwrap();
        assert_eq!(docs.why_company.len(), 1);
        assert_eq!(docs.why_company[0].label, "Acme SRE");
        assert_eq!(docs.why_company[0].pdf_name, None);
        assert_eq!(
            docs.why_company[0].md_path,
            config.why_company_dir.join("Jane_Doe_WhyCompany_Acme_SRE.md")
        );
        assert!(docs.resumes.is_empty());
    }

    #[test]
    fn test_read_markdown() {
        let (_dir, config) = workspace();
        let md = config.resumes_dir.join("a.md");
        touch(&md);
        assert_eq!(read_markdown(&md).unwrap().as_deref(), Some("# doc\n"));
        assert_eq!(read_markdown(&config.resumes_dir.join("missing.md")).unwrap(), None);
        let pdf = config.resumes_dir.join("a.pdf");
        touch(&pdf);
        assert_eq!(read_markdown(&pdf).unwrap(), None);
    }

    #[test]
    fn test_containment() {
        let (_dir, config) = workspace();
        let roots = [config.resumes_dir.as_path(), config.cover_letters_dir.as_path()];
        let inside = config.resumes_dir.join("Jane_Doe_Resume_Acme.md");
        touch(&inside);

        assert!(contained(&config.home, &inside, &roots).is_some());
        assert!(contained(&config.home, &config.resumes_dir.join("missing.md"), &roots).is_some());
        assert!(contained(&config.home, Path::new("Resumes/../job_tracker.csv"), &roots).is_none());
        assert!(contained(&config.home, Path::new("/etc/passwd"), &roots).is_none());
        // A sibling directory sharing the prefix is not inside.
        assert!(contained(&config.home, Path::new("ResumesOld/x.md"), &roots).is_none());
    }

    #[test]
    fn test_find_download() {
        let (_dir, config) = workspace();
        let roots = [config.resumes_dir.as_path(), config.cover_letters_dir.as_path()];
        touch(&config.cover_letters_dir.join("letter.pdf"));
        touch(&config.resumes_dir.join("notes.md"));

        assert!(find_download(&config.home, "letter.pdf", &roots).is_some());
        assert!(find_download(&config.home, "notes.md", &roots).is_none());
        assert!(find_download(&config.home, "../job_tracker.csv", &roots).is_none());
        assert!(find_download(&config.home, "missing.docx", &roots).is_none());
    }
}
