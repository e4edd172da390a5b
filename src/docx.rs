use anyhow::{Context, Result};
use docx_rs::{
    AbstractNumbering, AlignmentType, Docx, IndentLevel, Level, LevelJc, LevelText, LineSpacing,
    NumberFormat, Numbering, NumberingId, PageMargin, Paragraph, Run, RunFonts, SpecialIndentType,
    Start,
};
use std::fs::File;
use std::path::Path;

use crate::markdown::{self, Block, SectionKind, Span};

const FONT: &str = "Calibri";
const INK: &str = "333333";
const NAVY: &str = "1a1a2e";
const BULLETS: usize = 1;

// Sizes are half-points, spacing and indents are twentieths of a point.
const fn pt(points: f32) -> usize {
    (points * 2.0) as usize
}

const fn twips(points: f32) -> u32 {
    (points * 20.0) as u32
}

/// How a paragraph's runs are dressed.
#[derive(Clone, Copy)]
struct RunStyle {
    size: usize,
    color: &'static str,
    bold: bool,
}

fn runs(paragraph: Paragraph, spans: &[Span], style: RunStyle) -> Paragraph {
    spans.iter().fold(paragraph, |paragraph, span| {
        let mut run = Run::new()
            .add_text(span.text.as_str())
            .size(style.size)
            .color(style.color);
        if span.bold || style.bold {
            run = run.bold();
        }
        if span.italic {
            run = run.italic();
        }
        paragraph.add_run(run)
    })
}

fn spacing(before: f32, after: f32) -> LineSpacing {
    LineSpacing::new().before(twips(before)).after(twips(after))
}

/// Builds an ATS-friendly resume document: one paragraph per line, no
/// tables or text boxes.
pub fn resume(markdown_text: &str) -> Docx {
    let bullet_level = Level::new(
        0,
        Start::new(1),
        NumberFormat::new("bullet"),
        LevelText::new("\u{2022}"),
        LevelJc::new("left"),
    )
    .indent(Some(360), Some(SpecialIndentType::Hanging(180)), None, None);

    let mut doc = Docx::new()
        .default_fonts(RunFonts::new().ascii(FONT).hi_ansi(FONT).cs(FONT).east_asia(FONT))
        .default_size(pt(10.5))
        .page_margin(PageMargin::new().top(720).bottom(720).left(864).right(864))
        .add_abstract_numbering(AbstractNumbering::new(BULLETS).add_level(bullet_level))
        .add_numbering(Numbering::new(BULLETS, BULLETS));

    let body = RunStyle {
        size: pt(10.0),
        color: INK,
        bold: false,
    };

    for section in markdown::parse(markdown_text) {
        match section.kind {
            SectionKind::Title => {
                let run = Run::new()
                    .add_text(section.heading.as_str())
                    .bold()
                    .size(pt(18.0))
                    .color(NAVY);
                doc = doc.add_paragraph(
                    Paragraph::new()
                        .align(AlignmentType::Center)
                        .line_spacing(spacing(0.0, 2.0))
                        .add_run(run),
                );
            }
            SectionKind::Header => {
                let run = Run::new()
                    .add_text(section.heading.to_uppercase())
                    .bold()
                    .size(pt(12.0))
                    .color(NAVY);
                doc = doc.add_paragraph(
                    Paragraph::new().line_spacing(spacing(10.0, 4.0)).add_run(run),
                );
                // A row of tiny underscores reads as a thin rule under the header.
                let rule = Run::new().add_text("_".repeat(90)).size(pt(2.0)).color(NAVY);
                doc = doc.add_paragraph(
                    Paragraph::new().line_spacing(spacing(0.0, 4.0)).add_run(rule),
                );
            }
            SectionKind::Preamble => {}
        }

        for block in &section.blocks {
            let paragraph = match block {
                Block::Heading3(text) => runs(
                    Paragraph::new().line_spacing(spacing(6.0, 2.0)),
                    &markdown::inline_spans(text),
                    RunStyle {
                        size: pt(11.0),
                        bold: true,
                        ..body
                    },
                ),
                Block::Bullet(text) => runs(
                    Paragraph::new()
                        .numbering(NumberingId::new(BULLETS), IndentLevel::new(0))
                        .line_spacing(spacing(1.0, 1.0)),
                    &markdown::inline_spans(text),
                    body,
                ),
                Block::Text(text) if markdown::is_bold_line(text) => runs(
                    Paragraph::new()
                        .align(AlignmentType::Center)
                        .line_spacing(spacing(0.0, 2.0)),
                    &markdown::inline_spans(text),
                    RunStyle {
                        size: pt(10.5),
                        ..body
                    },
                ),
                Block::Text(text) if markdown::is_contact_line(text) => runs(
                    Paragraph::new()
                        .align(AlignmentType::Center)
                        .line_spacing(spacing(0.0, 6.0)),
                    &markdown::inline_spans(text),
                    body,
                ),
                Block::Text(text) => runs(
                    Paragraph::new().line_spacing(spacing(0.0, 2.0)),
                    &markdown::inline_spans(text),
                    body,
                ),
                Block::Rule => continue,
                Block::TableRow(row) => {
                    let Some(flat) = markdown::flatten_table_row(row) else {
                        continue;
                    };
                    runs(
                        Paragraph::new().line_spacing(spacing(0.0, 1.0)),
                        &markdown::inline_spans(&flat),
                        RunStyle {
                            size: pt(9.5),
                            ..body
                        },
                    )
                }
            };
            doc = doc.add_paragraph(paragraph);
        }
    }
    doc
}

pub fn write(doc: Docx, path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    doc.build()
        .pack(file)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::debug!(path = %path.display(), "wrote docx");
    Ok(())
}
