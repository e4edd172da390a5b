use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::Path;

use crate::extract::{Platform, Posting, extract_postings, normalize_url};
use crate::fetch::Fetch;
use crate::pool::run_bounded;
use crate::store::write_atomic;

/// When a posting was first and last observed on a career page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub title: String,
    pub company: String,
    pub first_seen: String,
    pub last_seen: String,
}

/// Previously observed postings, keyed by normalized URL, in file order.
/// Entries are never removed automatically.
pub type Ledger = IndexMap<String, LedgerEntry>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CareerPage {
    pub company: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
}

impl CareerPage {
    pub fn platform(&self) -> Platform {
        self.platform
            .as_deref()
            .map(Platform::from_tag)
            .unwrap_or_default()
    }

    pub fn keywords(&self) -> &[String] {
        self.keywords.as_deref().unwrap_or_default()
    }
}

/// The hand-edited scan configuration. The ledger lives in `checked_urls`;
/// top-level keys this tool does not know about survive a rewrite.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanConfig {
    #[serde(default)]
    pub career_pages: Vec<CareerPage>,
    #[serde(default)]
    pub search_queries: Vec<String>,
    #[serde(default)]
    pub filters: Map<String, Value>,
    #[serde(default)]
    pub checked_urls: Ledger,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ScanConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("Invalid JSON in {}", path.display()))
    }

    /// Rewrites the whole file, pretty-printed with a trailing newline.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        write_atomic(path, json.as_bytes())
    }
}

/// Case-insensitive substring match against any keyword; no keywords matches all.
pub fn matches_keywords(title: &str, keywords: &[String]) -> bool {
    if keywords.is_empty() {
        return true;
    }
    let title = title.to_lowercase();
    keywords.iter().any(|kw| title.contains(&kw.to_lowercase()))
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classified {
    pub new: Vec<Posting>,
    pub seen: Vec<Posting>,
}

/// Splits postings into new and seen. A posting is seen when its normalized
/// URL is in the ledger or among the tracker's URLs.
pub fn classify(postings: Vec<Posting>, ledger: &Ledger, tracked: &HashSet<String>) -> Classified {
    let mut classified = Classified::default();
    for posting in postings {
        let key = posting.normalized_url();
        if ledger.contains_key(&key) || tracked.contains(&key) {
            classified.seen.push(posting);
        } else {
            classified.new.push(posting);
        }
    }
    classified
}

/// Writes every classified posting into the ledger. Known entries keep
/// `first_seen` and get `last_seen = today`.
pub fn record_sightings(ledger: &mut Ledger, company: &str, classified: &Classified, today: &str) {
    for posting in classified.new.iter().chain(&classified.seen) {
        ledger
            .entry(posting.normalized_url())
            .and_modify(|entry| entry.last_seen = today.to_string())
            .or_insert_with(|| LedgerEntry {
                title: posting.title.clone(),
                company: company.to_string(),
                first_seen: today.to_string(),
                last_seen: today.to_string(),
            });
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PageOutcome {
    Failed(String),
    Fetched(Vec<Posting>),
}

/// Fetches one career page and returns its keyword-matching postings.
pub fn scan_page<F: Fetch + ?Sized>(fetcher: &F, page: &CareerPage) -> PageOutcome {
    let response = fetcher.fetch(&page.url);
    if response.is_transport_failure() {
        tracing::warn!(company = %page.company, reason = %response.body, "career page unreachable");
        return PageOutcome::Failed("Connection failed".to_string());
    }
    if response.status >= 400 {
        tracing::warn!(company = %page.company, status = response.status, "career page error");
        return PageOutcome::Failed(format!("HTTP {}", response.status));
    }
    let keywords = page.keywords();
    let postings = extract_postings(&response.body, page.platform())
        .into_iter()
        .filter(|posting| matches_keywords(&posting.title, keywords))
        .collect();
    PageOutcome::Fetched(postings)
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompanyReport {
    pub company: String,
    pub url: String,
    pub error: Option<String>,
    pub postings: Classified,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanReport {
    pub companies: Vec<CompanyReport>,
}

impl ScanReport {
    pub fn new_count(&self) -> usize {
        self.companies.iter().map(|c| c.postings.new.len()).sum()
    }

    pub fn seen_count(&self) -> usize {
        self.companies.iter().map(|c| c.postings.seen.len()).sum()
    }

    pub fn errors(&self) -> impl Iterator<Item = (&str, &str)> {
        self.companies
            .iter()
            .filter_map(|c| c.error.as_deref().map(|e| (c.company.as_str(), e)))
    }
}

/// Scans every configured page on a bounded pool and classifies the results
/// in config order. With `update_seen`, the ledger in `config` is refreshed;
/// persisting it is left to the caller.
pub fn run_scan<F: Fetch + ?Sized>(
    config: &mut ScanConfig,
    tracked: &HashSet<String>,
    fetcher: &F,
    workers: usize,
    update_seen: bool,
    today: &str,
) -> ScanReport {
    let outcomes = run_bounded(&config.career_pages, workers, |page| scan_page(fetcher, page));

    let mut report = ScanReport::default();
    for (page, outcome) in config.career_pages.iter().zip(outcomes) {
        let (error, postings) = match outcome {
            PageOutcome::Failed(reason) => (Some(reason), Classified::default()),
            PageOutcome::Fetched(postings) => {
                let classified = classify(postings, &config.checked_urls, tracked);
                if update_seen {
                    record_sightings(&mut config.checked_urls, &page.company, &classified, today);
                }
                (None, classified)
            }
        };
        report.companies.push(CompanyReport {
            company: page.company.clone(),
            url: page.url.clone(),
            error,
            postings,
        });
    }
    report
}

/// Tracker URLs, normalized the same way as ledger keys.
pub fn normalized_set<'a>(urls: impl IntoIterator<Item = &'a str>) -> HashSet<String> {
    urls.into_iter().map(normalize_url).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::CannedFetcher;

    fn entry(title: &str, first: &str) -> LedgerEntry {
        LedgerEntry {
            title: title.to_string(),
            company: "Acme".to_string(),
            first_seen: first.to_string(),
            last_seen: first.to_string(),
        }
    }

    fn page(company: &str, url: &str, platform: Option<&str>, keywords: &[&str]) -> CareerPage {
        CareerPage {
            company: company.to_string(),
            url: url.to_string(),
            platform: platform.map(str::to_string),
            keywords: if keywords.is_empty() {
                None
            } else {
                Some(keywords.iter().map(|k| k.to_string()).collect())
            },
        }
    }

    #[test]
    fn test_classify_against_ledger_and_tracker() {
        let mut ledger = Ledger::new();
        ledger.insert("https://a.com/jobs/a".to_string(), entry("A", "2025-01-01"));
        let tracked = normalized_set(["https://a.com/jobs/b/?src=li"]);

        let classified = classify(
            vec![
                Posting::new("https://a.com/jobs/a", "A"),
                Posting::new("https://a.com/jobs/b", "B"),
                Posting::new("https://a.com/jobs/c", "C"),
            ],
            &ledger,
            &tracked,
        );

        let seen: Vec<&str> = classified.seen.iter().map(|p| p.title.as_str()).collect();
        let new: Vec<&str> = classified.new.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(seen, vec!["A", "B"]);
        assert_eq!(new, vec!["C"]);
    }

    #[test]
    fn test_matches_keywords() {
        let keywords = vec!["sre".to_string(), "Platform".to_string()];
        assert!(matches_keywords("Senior SRE", &keywords));
        assert!(matches_keywords("platform engineer", &keywords));
        assert!(!matches_keywords("Accountant", &keywords));
        assert!(matches_keywords("Accountant", &[]));
    }

    #[test]
    fn test_record_sightings_preserves_first_seen() {
        let mut ledger = Ledger::new();
        ledger.insert("https://a.com/jobs/a".to_string(), entry("A", "2025-01-01"));
        let classified = Classified {
            new: vec![Posting::new("https://a.com/jobs/c/", "C")],
            seen: vec![
                Posting::new("https://a.com/jobs/a?x=1", "A renamed"),
                Posting::new("https://a.com/jobs/b", "B"),
            ],
        };

        record_sightings(&mut ledger, "Acme", &classified, "2025-02-02");

        let a = &ledger["https://a.com/jobs/a"];
        assert_eq!(a.first_seen, "2025-01-01");
        assert_eq!(a.last_seen, "2025-02-02");
        assert_eq!(a.title, "A");
        assert_eq!(ledger["https://a.com/jobs/b"].first_seen, "2025-02-02");
        assert_eq!(ledger["https://a.com/jobs/c"].company, "Acme");
        assert_eq!(ledger.len(), 3);
    }

    #[test]
    fn test_scan_page_reports_failures() {
        let fetcher = CannedFetcher::default().with("https://down.example/careers", 503, "");
        let outcome = scan_page(&fetcher, &page("Down", "https://down.example/careers", None, &[]));
        assert_eq!(outcome, PageOutcome::Failed("HTTP 503".to_string()));

        let outcome = scan_page(&fetcher, &page("Gone", "https://gone.example", None, &[]));
        assert_eq!(outcome, PageOutcome::Failed("Connection failed".to_string()));
    }

    #[test]
    fn test_run_scan_classifies_in_config_order_and_updates_ledger() {
        let board = r#"
            <a href="https://co.example/jobs/101-sre-lead">x</a>
            <a href="https://co.example/jobs/102-accountant">y</a>
            <a href="https://co.example/jobs/103-platform-engineer">z</a>
        "#;
        let fetcher = CannedFetcher::default()
            .with("https://co.example/careers", 200, board)
            .with("https://broken.example/careers", 500, "oops");

        let mut config = ScanConfig {
            career_pages: vec![
                page("Broken", "https://broken.example/careers", Some("lever"), &[]),
                page("Co", "https://co.example/careers", None, &["sre", "platform"]),
            ],
            ..Default::default()
        };
        config
            .checked_urls
            .insert("https://co.example/jobs/101-sre-lead".to_string(), entry("Sre Lead", "2025-01-01"));
        let tracked = HashSet::new();

        let report = run_scan(&mut config, &tracked, &fetcher, 2, true, "2025-03-03");

        assert_eq!(report.companies[0].company, "Broken");
        assert_eq!(report.companies[0].error.as_deref(), Some("HTTP 500"));
        let co = &report.companies[1];
        assert_eq!(co.postings.seen, vec![Posting::new("https://co.example/jobs/101-sre-lead", "Sre Lead")]);
        assert_eq!(
            co.postings.new,
            vec![Posting::new("https://co.example/jobs/103-platform-engineer", "Platform Engineer")]
        );
        assert_eq!(report.new_count(), 1);
        assert_eq!(report.seen_count(), 1);
        assert_eq!(report.errors().count(), 1);

        assert_eq!(config.checked_urls.len(), 2);
        let lead = &config.checked_urls["https://co.example/jobs/101-sre-lead"];
        assert_eq!((lead.first_seen.as_str(), lead.last_seen.as_str()), ("2025-01-01", "2025-03-03"));
        assert!(!config.checked_urls.contains_key("https://co.example/jobs/102-accountant"));
    }

    #[test]
    fn test_run_scan_without_update_leaves_ledger() {
        let fetcher = CannedFetcher::default()
            .with("https://co.example/careers", 200, r#"<a href="https://co.example/jobs/1-sre">x</a>"#);
        let mut config = ScanConfig {
            career_pages: vec![page("Co", "https://co.example/careers", None, &[])],
            ..Default::default()
        };
        let report = run_scan(&mut config, &HashSet::new(), &fetcher, 5, false, "2025-03-03");
        assert_eq!(report.new_count(), 1);
        assert!(config.checked_urls.is_empty());
    }

    #[test]
    fn test_config_round_trip_preserves_unknown_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job_search_config.json");
        std::fs::write(
            &path,
            r#"{
  "career_pages": [{"company": "Acme", "url": "https://acme.example/careers", "platform": "ashby"}],
  "search_queries": ["site:lever.co sre remote"],
  "filters": {"min_salary": 180000},
  "notes_for_me": "keep this"
}"#,
        )
        .unwrap();

        let config = ScanConfig::load(&path).unwrap();
        assert_eq!(config.career_pages[0].platform(), Platform::Generic);
        assert!(config.career_pages[0].keywords().is_empty());
        config.save(&path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.ends_with("}\n"));
        assert!(written.contains("\"notes_for_me\": \"keep this\""));
        assert!(written.contains("\"platform\": \"ashby\""));
        assert!(!written.contains("\"keywords\""));
        assert_eq!(ScanConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_config_save_keeps_key_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job_search_config.json");
        std::fs::write(
            &path,
            r#"{
  "filters": {"remote": true, "min_salary": 180000, "exclude": ["crypto"]},
  "checked_urls": {
    "https://zeta.example/jobs/9": {"title": "Sre", "company": "Zeta", "first_seen": "2025-01-01", "last_seen": "2025-01-01"},
    "https://acme.example/jobs/1": {"title": "Sre", "company": "Acme", "first_seen": "2025-01-02", "last_seen": "2025-01-02"}
  },
  "zz_notes": "first",
  "aa_notes": "second"
}"#,
        )
        .unwrap();

        let mut config = ScanConfig::load(&path).unwrap();
        config
            .checked_urls
            .insert("https://beta.example/jobs/5".to_string(), entry("Platform", "2025-02-02"));
        config.save(&path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        let position = |needle: &str| written.find(needle).unwrap();
        assert!(position("\"remote\"") < position("\"min_salary\""));
        assert!(position("\"min_salary\"") < position("\"exclude\""));
        assert!(position("zeta.example") < position("acme.example"));
        assert!(position("acme.example") < position("beta.example"));
        assert!(position("\"zz_notes\"") < position("\"aa_notes\""));
    }
}
