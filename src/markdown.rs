use regex::Regex;
use std::sync::LazyLock;

static BOLD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*.*?\*\*").expect("bold pattern"));
static ITALIC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*.*?\*").expect("italic pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    /// Lines before the first heading.
    Preamble,
    /// `# ` heading.
    Title,
    /// `## ` heading.
    Header,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading3(String),
    Bullet(String),
    Rule,
    TableRow(String),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub kind: SectionKind,
    pub heading: String,
    pub blocks: Vec<Block>,
}

impl Section {
    fn new(kind: SectionKind, heading: &str) -> Self {
        Self {
            kind,
            heading: heading.trim().to_string(),
            blocks: Vec::new(),
        }
    }
}

/// Line-oriented structural parse of a resume. Only line prefixes matter;
/// this is not a CommonMark parser.
pub fn parse(text: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut current = Section::new(SectionKind::Preamble, "");

    for line in text.trim().lines() {
        if let Some(heading) = line.strip_prefix("# ") {
            push_section(&mut sections, current);
            current = Section::new(SectionKind::Title, heading);
        } else if let Some(heading) = line.strip_prefix("## ") {
            push_section(&mut sections, current);
            current = Section::new(SectionKind::Header, heading);
        } else if let Some(heading) = line.strip_prefix("### ") {
            current.blocks.push(Block::Heading3(heading.trim().to_string()));
        } else if let Some(item) = line.strip_prefix("- ") {
            current.blocks.push(Block::Bullet(item.trim().to_string()));
        } else if line.starts_with("---") {
            current.blocks.push(Block::Rule);
        } else if line.starts_with('|') {
            current.blocks.push(Block::TableRow(line.trim().to_string()));
        } else if !line.trim().is_empty() {
            current.blocks.push(Block::Text(line.trim().to_string()));
        }
    }
    push_section(&mut sections, current);
    sections
}

fn push_section(sections: &mut Vec<Section>, section: Section) {
    // An empty preamble is not a section.
    if section.kind == SectionKind::Preamble && section.blocks.is_empty() {
        return;
    }
    sections.push(section);
}

/// `|---|---|` style separator rows carry no content.
pub fn is_table_separator(row: &str) -> bool {
    row.starts_with("|--") || row.starts_with("| --")
}

/// Non-empty cells of a table row.
pub fn table_cells(row: &str) -> Vec<&str> {
    row.split('|').map(str::trim).filter(|c| !c.is_empty()).collect()
}

/// Flattens a table row to `a | b | c`; separator and empty rows give `None`.
pub fn flatten_table_row(row: &str) -> Option<String> {
    if is_table_separator(row) {
        return None;
    }
    let cells = table_cells(row);
    if cells.is_empty() {
        None
    } else {
        Some(cells.join(" | "))
    }
}

/// Standalone `**...**` line, rendered centered.
pub fn is_bold_line(text: &str) -> bool {
    text.len() >= 4 && text.starts_with("**") && text.ends_with("**")
}

/// `(555) 010-0000 | me@example.com` style contact line.
pub fn is_contact_line(text: &str) -> bool {
    text.starts_with('(') && text.contains('|')
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
}

impl Span {
    fn plain(text: &str) -> Self {
        Self {
            text: text.to_string(),
            bold: false,
            italic: false,
        }
    }
}

/// Splits inline `**bold**` spans first, then `*italic*` spans inside the
/// remaining text. Nesting is not supported.
pub fn inline_spans(text: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    for (part, is_bold) in split_keeping(&BOLD, text) {
        if is_bold {
            push_span(&mut spans, Span {
                text: part[2..part.len() - 2].to_string(),
                bold: true,
                italic: false,
            });
            continue;
        }
        for (sub, matched) in split_keeping(&ITALIC, part) {
            if matched && !sub.starts_with("**") {
                push_span(&mut spans, Span {
                    text: sub[1..sub.len() - 1].to_string(),
                    bold: false,
                    italic: true,
                });
            } else {
                push_span(&mut spans, Span::plain(sub));
            }
        }
    }
    spans
}

fn push_span(spans: &mut Vec<Span>, span: Span) {
    if !span.text.is_empty() {
        spans.push(span);
    }
}

/// Pieces of `text` in order, each flagged with whether it was a match.
fn split_keeping<'a>(pattern: &Regex, text: &'a str) -> Vec<(&'a str, bool)> {
    let mut pieces = Vec::new();
    let mut last = 0;
    for m in pattern.find_iter(text) {
        if m.start() > last {
            pieces.push((&text[last..m.start()], false));
        }
        pieces.push((m.as_str(), true));
        last = m.end();
    }
    if last < text.len() {
        pieces.push((&text[last..], false));
    }
    pieces
}

/// Inline markup removed; what a reader would see.
pub fn plain_text(text: &str) -> String {
    inline_spans(text).into_iter().map(|s| s.text).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESUME: &str = "\
# Jane Doe

**Site Reliability Engineer**
(555) 010-0000 | jane@example.com

## Experience
### Acme Corp | 2021 - Present
- Cut **p99 latency** by 40%
- Ran *on-call* rotation
---

## Skills
| Area | Tools |
|------|-------|
| Cloud | AWS, GCP |
";

    #[test]
    fn test_parse_sections_and_blocks() {
        let sections = parse(RESUME);
        assert_eq!(sections.len(), 3);
        assert_eq!(sections[0].kind, SectionKind::Title);
        assert_eq!(sections[0].heading, "Jane Doe");
        assert_eq!(
            sections[0].blocks,
            vec![
                Block::Text("**Site Reliability Engineer**".to_string()),
                Block::Text("(555) 010-0000 | jane@example.com".to_string()),
            ]
        );
        assert_eq!(sections[1].kind, SectionKind::Header);
        assert_eq!(
            sections[1].blocks,
            vec![
                Block::Heading3("Acme Corp | 2021 - Present".to_string()),
                Block::Bullet("Cut **p99 latency** by 40%".to_string()),
                Block::Bullet("Ran *on-call* rotation".to_string()),
                Block::Rule,
            ]
        );
        assert_eq!(sections[2].blocks.len(), 3);
    }

    #[test]
    fn test_preamble_kept_when_text_precedes_heading() {
        let sections = parse("Draft v2\n\n# Name\ntext");
        assert_eq!(sections[0].kind, SectionKind::Preamble);
        assert_eq!(sections[0].blocks, vec![Block::Text("Draft v2".to_string())]);
        assert_eq!(sections[1].heading, "Name");
        assert!(parse("").is_empty());
    }

    #[test]
    fn test_inline_spans_bold_then_italic() {
        let spans = inline_spans("Led **SRE** team, *remote* first");
        let summary: Vec<(&str, bool, bool)> =
            spans.iter().map(|s| (s.text.as_str(), s.bold, s.italic)).collect();
        assert_eq!(
            summary,
            vec![
                ("Led ", false, false),
                ("SRE", true, false),
                (" team, ", false, false),
                ("remote", false, true),
                (" first", false, false),
            ]
        );
        assert_eq!(plain_text("**a** and *b*"), "a and b");
        assert_eq!(plain_text("5 * 3"), "5 * 3");
    }

    #[test]
    fn test_table_rows() {
        assert_eq!(flatten_table_row("| Cloud | AWS, GCP |").as_deref(), Some("Cloud | AWS, GCP"));
        assert_eq!(flatten_table_row("|------|-------|"), None);
        assert_eq!(flatten_table_row("| --- | --- |"), None);
        assert_eq!(flatten_table_row("| |"), None);
    }

    #[test]
    fn test_line_classifiers() {
        assert!(is_bold_line("**Staff Engineer**"));
        assert!(!is_bold_line("**"));
        assert!(is_contact_line("(555) 010-0000 | a@b.c"));
        assert!(!is_contact_line("555 | a@b.c"));
    }
}
