/// Phrases that mark the closing block when they sit just before the signature.
pub const CLOSINGS: [&str; 5] = ["sincerely", "best regards", "regards", "best", "respectfully"];

/// A cover letter as a sequence of tagged blocks.
///
/// Roles are assigned from block position and a few phrases, so a letter that
/// strays from the sender / recipient / salutation / body / closing /
/// signature shape will be tagged wrongly. Unrecognised blocks become
/// paragraphs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Sender {
        name: String,
        contact: Option<String>,
        date: Option<String>,
    },
    Recipient(Vec<String>),
    Salutation(String),
    Paragraph(String),
    Closing(String),
    Signature(String),
}

/// Groups consecutive non-blank lines; lines are trimmed.
pub fn split_blocks(text: &str) -> Vec<Vec<String>> {
    let mut blocks = Vec::new();
    let mut current: Vec<String> = Vec::new();
    for line in text.trim().lines() {
        let line = line.trim();
        if line.is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line.to_string());
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }
    blocks
}

fn is_closing(text: &str) -> bool {
    let phrase = text.trim_end_matches(',').to_lowercase();
    CLOSINGS.contains(&phrase.as_str())
}

pub fn parse(text: &str) -> Vec<Block> {
    let mut blocks = split_blocks(text).into_iter();
    let mut letter = Vec::new();

    if let Some(sender) = blocks.next() {
        let mut lines = sender.into_iter();
        letter.push(Block::Sender {
            name: lines.next().unwrap_or_default(),
            contact: lines.next(),
            date: lines.next(),
        });
    }
    if let Some(recipient) = blocks.next() {
        letter.push(Block::Recipient(
            recipient.into_iter().filter(|line| !line.starts_with("http")).collect(),
        ));
    }

    let rest: Vec<Vec<String>> = blocks.collect();
    let count = rest.len();
    for (i, lines) in rest.into_iter().enumerate() {
        let single_line = lines.len() == 1;
        let text = lines.join(" ");
        let block = if i + 1 == count && single_line {
            Block::Signature(text)
        } else if i + 2 == count && is_closing(&text) {
            Block::Closing(text)
        } else if text.starts_with("Dear ") {
            Block::Salutation(text)
        } else {
            Block::Paragraph(text)
        };
        letter.push(block);
    }
    letter
}

#[cfg(test)]
mod tests {
    use super::*;

    const LETTER: &str = "\
Jane Doe
(555) 010-0000 | jane@example.com
March 3, 2025

Acme Corp
Site Reliability Engineer
https://acme.example/jobs/1

Dear Hiring Team,

I have spent six years keeping
large fleets healthy.

I would like to do that at Acme.

Sincerely,

Jane Doe
";

    #[test]
    fn test_parse_typical_letter() {
        let blocks = parse(LETTER);
        assert_eq!(
            blocks,
            vec![
                Block::Sender {
                    name: "Jane Doe".to_string(),
                    contact: Some("(555) 010-0000 | jane@example.com".to_string()),
                    date: Some("March 3, 2025".to_string()),
                },
                Block::Recipient(vec![
                    "Acme Corp".to_string(),
                    "Site Reliability Engineer".to_string()
                ]),
                Block::Salutation("Dear Hiring Team,".to_string()),
                Block::Paragraph("I have spent six years keeping large fleets healthy.".to_string()),
                Block::Paragraph("I would like to do that at Acme.".to_string()),
                Block::Closing("Sincerely,".to_string()),
                Block::Signature("Jane Doe".to_string()),
            ]
        );
    }

    #[test]
    fn test_closing_only_recognised_before_signature() {
        let blocks = parse("Me\n\nThem\n\nBest,\n\nMore text here.\n\nMe");
        assert_eq!(blocks[2], Block::Paragraph("Best,".to_string()));
        assert_eq!(blocks[3], Block::Paragraph("More text here.".to_string()));
        assert_eq!(blocks[4], Block::Signature("Me".to_string()));
    }

    #[test]
    fn test_multi_line_last_block_is_not_a_signature() {
        let blocks = parse("Me\n\nThem\n\nBest regards,\nMe");
        assert_eq!(blocks.last(), Some(&Block::Paragraph("Best regards, Me".to_string())));
    }

    #[test]
    fn test_short_sender_block() {
        let blocks = parse("Just A Name");
        assert_eq!(
            blocks,
            vec![Block::Sender {
                name: "Just A Name".to_string(),
                contact: None,
                date: None
            }]
        );
        assert!(parse("   \n\n").is_empty());
    }

    #[test]
    fn test_split_blocks_trims_lines() {
        assert_eq!(
            split_blocks("  a \n b\n\n\n c "),
            vec![vec!["a".to_string(), "b".to_string()], vec!["c".to_string()]]
        );
    }
}
