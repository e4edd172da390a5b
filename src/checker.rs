use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

use crate::fetch::Fetch;
use crate::models::{JobRecord, Status};
use crate::pool::run_bounded;

// Page content that means the posting is gone even though the server said 200.
static CLOSED_PATTERNS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)no longer (available|accepting|open)",
        r"|position.{0,20}(has been |been )?(filled|closed|removed)",
        r"|job.{0,20}(has been |been )?(closed|expired|removed|no longer)",
        r"|this role has been",
        r"|this (job|position) (is|has) (no longer|been)",
        r"|page\s*not\s*found",
        r"|we couldn.?t find",
        r"|does not exist",
        r"|posting has been",
        r"|opening is no longer",
        r"|not currently accepting",
        r"|no matching job",
        r"|job not found",
        r"|this listing has",
        r"|opportunity is no longer",
    ))
    .expect("closed patterns")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlState {
    NoUrl,
    Unreachable,
    Closed,
    Blocked,
    Error,
    Open,
}

impl UrlState {
    pub fn as_str(&self) -> &'static str {
        match self {
            UrlState::NoUrl => "NO_URL",
            UrlState::Unreachable => "UNREACHABLE",
            UrlState::Closed => "CLOSED",
            UrlState::Blocked => "BLOCKED",
            UrlState::Error => "ERROR",
            UrlState::Open => "OPEN",
        }
    }
}

impl fmt::Display for UrlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlCheck {
    pub state: UrlState,
    pub detail: String,
}

impl UrlCheck {
    fn new(state: UrlState, detail: impl Into<String>) -> Self {
        Self {
            state,
            detail: detail.into(),
        }
    }
}

pub fn looks_closed(body: &str) -> bool {
    CLOSED_PATTERNS.is_match(body)
}

/// Fetches a posting URL and decides whether it still looks open.
pub fn check_posting<F: Fetch + ?Sized>(fetcher: &F, url: &str) -> UrlCheck {
    if !url.starts_with("http") {
        return UrlCheck::new(UrlState::NoUrl, "No valid URL provided");
    }
    let response = fetcher.fetch(url);
    match response.status {
        0 => UrlCheck::new(UrlState::Unreachable, "Connection failed or timed out"),
        404 => UrlCheck::new(UrlState::Closed, "HTTP 404 - page not found"),
        403 => UrlCheck::new(UrlState::Blocked, "HTTP 403 - site blocks automated access"),
        code if code >= 400 => UrlCheck::new(UrlState::Error, format!("HTTP {code}")),
        _ if looks_closed(&response.body) => {
            UrlCheck::new(UrlState::Closed, "Page content indicates posting is closed")
        }
        code => UrlCheck::new(UrlState::Open, format!("HTTP {code} - no closed signals detected")),
    }
}

/// A tracker row selected for checking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub index: usize,
    pub label: String,
    pub url: String,
}

/// Rows with a Job URL, skipping ones already marked Position Closed unless
/// `include_closed` is set.
pub fn select_targets(jobs: &[JobRecord], include_closed: bool) -> Vec<Target> {
    jobs.iter()
        .enumerate()
        .filter(|(_, job)| include_closed || job.status != Status::PositionClosed)
        .filter(|(_, job)| !job.job_url.trim().is_empty())
        .map(|(index, job)| Target {
            index,
            label: job.label(),
            url: job.job_url.trim().to_string(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub target: Target,
    pub check: UrlCheck,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckSummary {
    pub open: usize,
    pub closed: usize,
    pub unverified: usize,
}

impl CheckSummary {
    pub fn tally(results: &[CheckResult]) -> Self {
        let mut summary = CheckSummary::default();
        for result in results {
            match result.check.state {
                UrlState::Open => summary.open += 1,
                UrlState::Closed => summary.closed += 1,
                _ => summary.unverified += 1,
            }
        }
        summary
    }
}

/// Checks every target on a bounded pool; results keep target order.
pub fn run_checks<F: Fetch + ?Sized>(fetcher: &F, targets: Vec<Target>, workers: usize) -> Vec<CheckResult> {
    let checks = run_bounded(&targets, workers, |target| check_posting(fetcher, &target.url));
    targets
        .into_iter()
        .zip(checks)
        .map(|(target, check)| CheckResult { target, check })
        .collect()
}

/// Marks every row whose URL checked CLOSED as Position Closed. Returns the
/// number of rows changed.
pub fn mark_closed(jobs: &mut [JobRecord], results: &[CheckResult]) -> usize {
    let mut changed = 0;
    for result in results.iter().filter(|r| r.check.state == UrlState::Closed) {
        if let Some(job) = jobs.get_mut(result.target.index) {
            job.status = Status::PositionClosed;
            changed += 1;
        }
    }
    changed
}
