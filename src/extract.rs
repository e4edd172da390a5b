use regex::Regex;
use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

/// Job-board software with a known career-page markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Platform {
    Greenhouse,
    Lever,
    Dover,
    Workable,
    Workday,
    #[default]
    Generic,
}

impl Platform {
    /// Maps a config tag to a platform. Unknown tags fall back to the generic extractor.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_lowercase().as_str() {
            "greenhouse" => Platform::Greenhouse,
            "lever" => Platform::Lever,
            "dover" => Platform::Dover,
            "workable" => Platform::Workable,
            "workday" => Platform::Workday,
            _ => Platform::Generic,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Greenhouse => "greenhouse",
            Platform::Lever => "lever",
            Platform::Dover => "dover",
            Platform::Workable => "workable",
            Platform::Workday => "workday",
            Platform::Generic => "generic",
        }
    }

    fn pattern(&self) -> Option<&'static Regex> {
        match self {
            Platform::Greenhouse => Some(&*GREENHOUSE),
            Platform::Lever => Some(&*LEVER),
            Platform::Dover => Some(&*DOVER),
            Platform::Workable => Some(&*WORKABLE),
            Platform::Workday => Some(&*WORKDAY),
            Platform::Generic => None,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A job link found on a career page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    pub url: String,
    pub title: String,
}

impl Posting {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
        }
    }

    pub fn normalized_url(&self) -> String {
        normalize_url(&self.url)
    }
}

// Each platform pattern captures (url, title).
static GREENHOUSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?is)<a[^>]*href="(https?://(?:job-boards\.)?greenhouse\.io/[^/]+/jobs/\d+[^"]*)"[^>]*>.*?<p[^>]*class="[^"]*body--medium[^"]*"[^>]*>\s*([^<]+?)\s*(?:<[^/]|</p>)"#,
    )
    .expect("greenhouse pattern")
});

static LEVER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?is)<a[^>]*class="posting-title"[^>]*href="(https?://jobs\.lever\.co/[^/]+/[0-9a-f-]+)"[^>]*>\s*<h5[^>]*>\s*([^<]+?)\s*</h5>"#,
    )
    .expect("lever pattern")
});

static DOVER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?is)href="(https?://app\.dover\.com/apply/[^/]+/[0-9a-f-]+[^"]*)"[^>]*>\s*([^<]+?)\s*</a>"#,
    )
    .expect("dover pattern")
});

static WORKABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?is)href="(https?://apply\.workable\.com/[^/]+/j/[A-Za-z0-9]+/?)"[^>]*>[^<]*?([^<]+?)\s*</a>"#,
    )
    .expect("workable pattern")
});

static WORKDAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?is)href="(https?://[^"]*\.myworkdayjobs\.com/[^"]*?/job/[^"]+)"[^>]*>\s*([^<]+?)\s*</a>"#,
    )
    .expect("workday pattern")
});

static GENERIC_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)href="(https?://[^"]*(?:/jobs?/|/careers?/|/positions?/|/openings?/|/apply/)[^"]*)""#,
    )
    .expect("generic link pattern")
});

static JSON_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)"(?:url|href|apply_url)"\s*:\s*"(https?://[^"]*(?:/jobs?/|/careers?/|/positions?/)[^"]*)""#,
    )
    .expect("json link pattern")
});

static ASSET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.(css|js|png|jpg|svg|ico|woff)").expect("asset pattern"));

static ID_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9a-f-]{20,}").expect("id run pattern"));

static LEADING_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+[-_]?").expect("leading id pattern"));

/// Strips the query string and fragment, then any trailing slashes.
pub fn normalize_url(url: &str) -> String {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    url[..end].trim_end_matches('/').to_string()
}

/// Decodes the two entities career pages actually emit in titles. This is
/// not a general HTML entity decoder.
pub fn unescape_title(title: &str) -> String {
    title.replace("&amp;", "&").replace("&#x27;", "'")
}

/// Derives a readable title from the last path segment of a posting URL.
pub fn title_from_url(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    let segment = trimmed.rsplit('/').next().unwrap_or(trimmed);
    let segment = ID_RUN.replace_all(segment, "");
    let segment = LEADING_ID.replace(&segment, "");
    let words = segment.replace(['-', '_'], " ");
    let words = words.trim();
    if words.is_empty() {
        "(untitled)".to_string()
    } else {
        title_case(words)
    }
}

/// Upper-cases every letter that follows a non-letter and lower-cases the rest.
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_is_letter = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if prev_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            out.push(c);
            prev_is_letter = false;
        }
    }
    out
}

/// Extracts postings from a career page, deduplicated by normalized URL.
/// The first occurrence of a URL keeps its title.
pub fn extract_postings(html: &str, platform: Platform) -> Vec<Posting> {
    let postings = match platform.pattern() {
        Some(pattern) => pattern
            .captures_iter(html)
            .map(|caps| {
                let url = caps[1].trim_end_matches('/').to_string();
                let title = unescape_title(caps[2].trim());
                let title = if title.is_empty() {
                    title_from_url(&url)
                } else {
                    title
                };
                Posting { url, title }
            })
            .collect(),
        None => generic_postings(html),
    };
    dedupe(postings)
}

fn generic_postings(html: &str) -> Vec<Posting> {
    GENERIC_LINK
        .captures_iter(html)
        .chain(JSON_LINK.captures_iter(html))
        .map(|caps| caps[1].to_string())
        .filter(|link| !ASSET.is_match(link))
        .map(|link| {
            let title = title_from_url(&link);
            Posting::new(link.trim_end_matches('/'), title)
        })
        .collect()
}

pub fn dedupe(postings: Vec<Posting>) -> Vec<Posting> {
    let mut seen = HashSet::new();
    postings
        .into_iter()
        .filter(|posting| seen.insert(posting.normalized_url()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_url_strips_query_fragment_and_slash() {
        assert_eq!(normalize_url("https://a.com/jobs/1/?x=1#top"), "https://a.com/jobs/1");
        assert_eq!(normalize_url("https://a.com/jobs/1#frag"), "https://a.com/jobs/1");
        assert_eq!(normalize_url("https://a.com/jobs/1///"), "https://a.com/jobs/1");
        assert_eq!(normalize_url(""), "");
    }

    #[test]
    fn test_normalize_url_is_idempotent() {
        for url in [
            "https://a.com/jobs/1/?x=1",
            "https://a.com/careers/#/list/",
            "https://a.com/?q=/jobs/",
            "plain",
        ] {
            let once = normalize_url(url);
            assert_eq!(normalize_url(&once), once);
        }
    }

    #[test]
    fn test_unescape_title_handles_two_entities_only() {
        assert_eq!(
            unescape_title("Senior SRE &amp; Platform Engineer"),
            "Senior SRE & Platform Engineer"
        );
        assert_eq!(unescape_title("Engineer, Builder&#x27;s Team"), "Engineer, Builder's Team");
        assert_eq!(unescape_title("R&amp;D &lt;Lead&gt;"), "R&D &lt;Lead&gt;");
    }

    #[test]
    fn test_title_from_url_strips_ids() {
        assert_eq!(
            title_from_url("https://co.com/careers/12345-abc123def456789012345678/senior-sre"),
            "Senior Sre"
        );
        assert_eq!(
            title_from_url("https://co.com/jobs/4821-staff_platform-engineer/"),
            "Staff Platform Engineer"
        );
        assert_eq!(
            title_from_url("https://co.com/careers/12345-abc123def456789012345678"),
            "(untitled)"
        );
        assert_eq!(title_from_url("https://co.com/jobs/98765"), "(untitled)");
    }

    #[test]
    fn test_greenhouse_tolerates_markup_and_case() {
        let html = r#"
            <A class="job" HREF="https://job-boards.greenhouse.io/acme/jobs/4567?gh_src=x">
              <div class="row"><P class="body body--medium">
                Senior SRE &amp; Platform Engineer
              </p><span>Remote</span></div>
            </a>
            <a href="https://boards.example.com/x">Not a job</a>
        "#;
        let postings = extract_postings(html, Platform::Greenhouse);
        assert_eq!(
            postings,
            vec![Posting::new(
                "https://job-boards.greenhouse.io/acme/jobs/4567?gh_src=x",
                "Senior SRE & Platform Engineer"
            )]
        );
    }

    #[test]
    fn test_lever_extracts_title_from_h5() {
        let html = r#"<div><a class="posting-title" href="https://jobs.lever.co/acme/0b1c2d3e-aaaa-bbbb-cccc-1234567890ab">
            <h5 data-qa="posting-name">Site Reliability Engineer</h5></a></div>"#;
        let postings = extract_postings(html, Platform::Lever);
        assert_eq!(postings.len(), 1);
        assert_eq!(postings[0].title, "Site Reliability Engineer");
        assert!(postings[0].url.ends_with("1234567890ab"));
    }

    #[test]
    fn test_workable_and_workday_and_dover() {
        let workable = r#"<li><a href="https://apply.workable.com/acme/j/AB12CD/" class="x">  Data Engineer </a></li>"#;
        let postings = extract_postings(workable, Platform::Workable);
        assert_eq!(postings[0].url, "https://apply.workable.com/acme/j/AB12CD");
        assert_eq!(postings[0].title, "Data Engineer");

        let workday = r#"<a href="https://acme.wd5.myworkdayjobs.com/en-US/External/job/Remote/Cloud-Engineer_R123">Cloud Engineer</a>"#;
        let postings = extract_postings(workday, Platform::Workday);
        assert_eq!(postings[0].title, "Cloud Engineer");

        let dover = r#"<a href="https://app.dover.com/apply/acme/9f8e7d6c-1111-2222-3333-444455556666">Founding Engineer</a>"#;
        let postings = extract_postings(dover, Platform::Dover);
        assert_eq!(postings[0].title, "Founding Engineer");
    }

    #[test]
    fn test_generic_collects_anchor_and_json_links() {
        let html = r#"
            <a href="https://co.com/careers/123-backend-engineer/">Backend</a>
            <a href="https://co.com/careers/123-backend-engineer?ref=home">Backend again</a>
            <link href="https://co.com/careers/static/site.css">
            <a href="https://co.com/about">About</a>
            <script>{"url": "https://co.com/jobs/devops_lead", "name": "x"}</script>
        "#;
        let postings = extract_postings(html, Platform::Generic);
        assert_eq!(
            postings,
            vec![
                Posting::new("https://co.com/careers/123-backend-engineer", "Backend Engineer"),
                Posting::new("https://co.com/jobs/devops_lead", "Devops Lead"),
            ]
        );
    }

    #[test]
    fn test_dedupe_first_title_wins() {
        let postings = dedupe(vec![
            Posting::new("https://a.com/jobs/1?x", "First"),
            Posting::new("https://a.com/jobs/2", "Other"),
            Posting::new("https://a.com/jobs/1/", "Second"),
        ]);
        assert_eq!(postings.len(), 2);
        assert_eq!(postings[0].title, "First");
        let unique: HashSet<String> = postings.iter().map(Posting::normalized_url).collect();
        assert_eq!(unique.len(), postings.len());
    }

    #[test]
    fn test_platform_from_tag_falls_back_to_generic() {
        assert_eq!(Platform::from_tag("Greenhouse"), Platform::Greenhouse);
        assert_eq!(Platform::from_tag("ashby"), Platform::Generic);
        assert_eq!(Platform::from_tag(""), Platform::Generic);
    }
}
