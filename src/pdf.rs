use anyhow::{anyhow, Context, Result};
use printpdf::{BuiltinFont, Color, IndirectFontRef, Line as PathLine, Mm, PdfDocument, PdfLayerReference, Point, Rgb};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use crate::layout::{Face, Line, text_width, words, wrap};
use crate::letter;
use crate::markdown::{self, Block, SectionKind, Span};

pub const PAGE_WIDTH: f32 = 612.0;
pub const PAGE_HEIGHT: f32 = 792.0;

const INK: [u8; 3] = [0x33, 0x33, 0x33];
const LETTER_INK: [u8; 3] = [0x22, 0x22, 0x22];
const NAVY: [u8; 3] = [0x1a, 0x1a, 0x2e];
const MUTED: [u8; 3] = [0x55, 0x55, 0x55];
const RULE_GRAY: [u8; 3] = [0xcc, 0xcc, 0xcc];

/// Page margins in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margins {
    pub top: f32,
    pub bottom: f32,
    pub left: f32,
    pub right: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Justify,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Style {
    pub size: f32,
    /// Line height as a multiple of `size`.
    pub leading: f32,
    pub align: Align,
    pub indent: f32,
    pub color: [u8; 3],
    pub bold: bool,
    pub space_before: f32,
    pub space_after: f32,
}

impl Style {
    pub const fn body(size: f32, leading: f32, color: [u8; 3]) -> Self {
        Self {
            size,
            leading,
            align: Align::Left,
            indent: 0.0,
            color,
            bold: false,
            space_before: 0.0,
            space_after: 0.0,
        }
    }
}

/// Something to draw; coordinates are points from the bottom-left corner.
#[derive(Debug, Clone, PartialEq)]
pub enum Mark {
    Text {
        x: f32,
        y: f32,
        size: f32,
        face: Face,
        color: [u8; 3],
        text: String,
    },
    Rule {
        x1: f32,
        x2: f32,
        y: f32,
        thickness: f32,
        color: [u8; 3],
    },
}

/// A paginated US-letter document built top to bottom.
#[derive(Debug, Clone)]
pub struct Document {
    margins: Margins,
    pages: Vec<Vec<Mark>>,
    /// Top of the next line.
    cursor: f32,
}

impl Document {
    pub fn new(margins: Margins) -> Self {
        Self {
            margins,
            pages: vec![Vec::new()],
            cursor: PAGE_HEIGHT - margins.top,
        }
    }

    pub fn pages(&self) -> &[Vec<Mark>] {
        &self.pages
    }

    pub fn content_width(&self) -> f32 {
        PAGE_WIDTH - self.margins.left - self.margins.right
    }

    fn at_page_top(&self) -> bool {
        self.cursor >= PAGE_HEIGHT - self.margins.top
    }

    fn new_page(&mut self) {
        self.pages.push(Vec::new());
        self.cursor = PAGE_HEIGHT - self.margins.top;
    }

    fn ensure_room(&mut self, height: f32) {
        if self.cursor - height < self.margins.bottom && !self.at_page_top() {
            self.new_page();
        }
    }

    fn push(&mut self, mark: Mark) {
        if let Some(page) = self.pages.last_mut() {
            page.push(mark);
        }
    }

    /// Vertical space; swallowed at the top of a page.
    pub fn space(&mut self, points: f32) {
        if !self.at_page_top() {
            self.cursor = (self.cursor - points).max(self.margins.bottom);
        }
    }

    pub fn paragraph(&mut self, spans: &[Span], style: &Style) {
        self.paragraph_with_marker(spans, style, None);
    }

    pub fn plain(&mut self, text: &str, style: &Style) {
        let span = Span {
            text: text.to_string(),
            bold: false,
            italic: false,
        };
        self.paragraph(std::slice::from_ref(&span), style);
    }

    /// Lays out wrapped text. `marker` is drawn in the indent of the first line.
    pub fn paragraph_with_marker(&mut self, spans: &[Span], style: &Style, marker: Option<&str>) {
        let available = self.content_width() - style.indent;
        let lines = wrap(
            words(
                spans
                    .iter()
                    .map(|s| (s.text.as_str(), Face::new(s.bold || style.bold, s.italic))),
            ),
            style.size,
            available,
        );
        if lines.is_empty() {
            return;
        }

        self.space(style.space_before);
        let line_height = style.size * style.leading;
        let left = self.margins.left + style.indent;
        let last = lines.len() - 1;
        for (i, line) in lines.into_iter().enumerate() {
            self.ensure_room(line_height);
            let baseline = self.cursor - line_height + (line_height - style.size) / 2.0 + style.size * 0.2;
            if i == 0 {
                if let Some(marker) = marker {
                    let x = left - text_width(marker, Face::Regular, style.size) - style.size * 0.5;
                    self.push(Mark::Text {
                        x,
                        y: baseline,
                        size: style.size,
                        face: Face::Regular,
                        color: style.color,
                        text: marker.to_string(),
                    });
                }
            }
            let offset = match style.align {
                Align::Center => ((available - line.width) / 2.0).max(0.0),
                Align::Left | Align::Justify => 0.0,
            };
            let extra_per_gap = if style.align == Align::Justify && i != last && line.gaps > 0 {
                (available - line.width).max(0.0) / line.gaps as f32
            } else {
                0.0
            };
            for (x, face, text) in runs(&line, style.size, extra_per_gap) {
                self.push(Mark::Text {
                    x: left + offset + x,
                    y: baseline,
                    size: style.size,
                    face,
                    color: style.color,
                    text,
                });
            }
            self.cursor -= line_height;
        }
        self.space(style.space_after);
    }

    /// A horizontal rule across the content width.
    pub fn rule(&mut self, thickness: f32, color: [u8; 3], space_after: f32) {
        self.ensure_room(thickness);
        let y = self.cursor - thickness / 2.0;
        let (x1, x2) = (self.margins.left, PAGE_WIDTH - self.margins.right);
        self.push(Mark::Rule {
            x1,
            x2,
            y,
            thickness,
            color,
        });
        self.cursor -= thickness;
        self.space(space_after);
    }

    pub fn write(&self, title: &str, path: &Path) -> Result<()> {
        let (doc, first_page, first_layer) =
            PdfDocument::new(title, mm(PAGE_WIDTH), mm(PAGE_HEIGHT), "Layer 1");
        let fonts = Fonts {
            regular: builtin(&doc, BuiltinFont::Helvetica)?,
            bold: builtin(&doc, BuiltinFont::HelveticaBold)?,
            oblique: builtin(&doc, BuiltinFont::HelveticaOblique)?,
            bold_oblique: builtin(&doc, BuiltinFont::HelveticaBoldOblique)?,
        };

        for (i, marks) in self.pages.iter().enumerate() {
            let layer = if i == 0 {
                doc.get_page(first_page).get_layer(first_layer)
            } else {
                let (page, layer) = doc.add_page(mm(PAGE_WIDTH), mm(PAGE_HEIGHT), "Layer 1");
                doc.get_page(page).get_layer(layer)
            };
            for mark in marks {
                draw(&layer, &fonts, mark);
            }
        }

        let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
        doc.save(&mut BufWriter::new(file))
            .map_err(|e| anyhow!("Failed to write {}: {e:?}", path.display()))?;
        tracing::debug!(path = %path.display(), pages = self.pages.len(), "wrote pdf");
        Ok(())
    }
}

/// Groups a line's words into same-face runs. Words separated by a space
/// share a run unless the line is being justified.
fn runs(line: &Line, size: f32, extra_per_gap: f32) -> Vec<(f32, Face, String)> {
    let mut runs: Vec<(f32, Face, String)> = Vec::new();
    let mut shift = 0.0;
    let mut prev_end: Option<f32> = None;
    for (x, word) in &line.words {
        let spaced = prev_end.is_some_and(|end| *x - end > 0.01);
        if spaced {
            shift += extra_per_gap;
        }
        prev_end = Some(*x + word.width(size));
        match runs.last_mut() {
            Some((_, face, text)) if *face == word.face && (extra_per_gap == 0.0 || !spaced) => {
                if spaced {
                    text.push(' ');
                }
                text.push_str(&word.text);
            }
            _ => runs.push((*x + shift, word.face, word.text.clone())),
        }
    }
    runs
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    oblique: IndirectFontRef,
    bold_oblique: IndirectFontRef,
}

impl Fonts {
    fn get(&self, face: Face) -> &IndirectFontRef {
        match face {
            Face::Regular => &self.regular,
            Face::Bold => &self.bold,
            Face::Oblique => &self.oblique,
            Face::BoldOblique => &self.bold_oblique,
        }
    }
}

fn builtin(doc: &printpdf::PdfDocumentReference, font: BuiltinFont) -> Result<IndirectFontRef> {
    doc.add_builtin_font(font)
        .map_err(|e| anyhow!("Failed to load builtin font: {e:?}"))
}

fn mm(points: f32) -> Mm {
    Mm(points * 25.4 / 72.0)
}

fn rgb([r, g, b]: [u8; 3]) -> Color {
    Color::Rgb(Rgb::new(
        f32::from(r) / 255.0,
        f32::from(g) / 255.0,
        f32::from(b) / 255.0,
        None,
    ))
}

fn draw(layer: &PdfLayerReference, fonts: &Fonts, mark: &Mark) {
    match mark {
        Mark::Text {
            x,
            y,
            size,
            face,
            color,
            text,
        } => {
            layer.set_fill_color(rgb(*color));
            layer.use_text(text.as_str(), *size, mm(*x), mm(*y), fonts.get(*face));
        }
        Mark::Rule {
            x1,
            x2,
            y,
            thickness,
            color,
        } => {
            layer.set_outline_color(rgb(*color));
            layer.set_outline_thickness(*thickness);
            layer.add_line(PathLine {
                points: vec![
                    (Point::new(mm(*x1), mm(*y)), false),
                    (Point::new(mm(*x2), mm(*y)), false),
                ],
                is_closed: false,
            });
        }
    }
}

/// Resume layout: 0.5" / 0.6" margins, Helvetica standing in for Calibri.
pub fn resume(markdown_text: &str) -> Document {
    let mut doc = Document::new(Margins {
        top: 36.0,
        bottom: 36.0,
        left: 43.2,
        right: 43.2,
    });
    let body = Style {
        space_before: 2.0,
        space_after: 2.0,
        ..Style::body(10.0, 1.4, INK)
    };

    for section in markdown::parse(markdown_text) {
        match section.kind {
            SectionKind::Title => doc.plain(&section.heading, &Style {
                align: Align::Center,
                bold: true,
                space_after: 2.0,
                ..Style::body(18.0, 1.2, NAVY)
            }),
            SectionKind::Header => {
                doc.plain(&section.heading.to_uppercase(), &Style {
                    bold: true,
                    space_before: 10.0,
                    space_after: 3.0,
                    ..Style::body(12.0, 1.2, NAVY)
                });
                doc.rule(1.0, NAVY, 4.0);
            }
            SectionKind::Preamble => {}
        }

        for (i, block) in section.blocks.iter().enumerate() {
            match block {
                Block::Heading3(text) => doc.paragraph(&markdown::inline_spans(text), &Style {
                    bold: true,
                    space_before: 6.0,
                    space_after: 2.0,
                    ..Style::body(11.0, 1.3, INK)
                }),
                Block::Bullet(text) => doc.paragraph_with_marker(
                    &markdown::inline_spans(text),
                    &Style {
                        indent: 18.0,
                        space_before: 1.0,
                        space_after: 1.0,
                        ..body
                    },
                    Some("-"),
                ),
                Block::Text(text) => {
                    let centered = markdown::is_bold_line(text)
                        || markdown::is_contact_line(text)
                        || (i == 0 && section.kind == SectionKind::Title);
                    let style = if centered {
                        Style {
                            align: Align::Center,
                            space_after: if markdown::is_bold_line(text) { 2.0 } else { 6.0 },
                            ..body
                        }
                    } else {
                        body
                    };
                    doc.paragraph(&markdown::inline_spans(text), &style);
                }
                Block::Rule => {
                    doc.space(6.0);
                    doc.rule(0.75, RULE_GRAY, 6.0);
                }
                Block::TableRow(row) => {
                    if let Some(flat) = markdown::flatten_table_row(row) {
                        doc.paragraph(&markdown::inline_spans(&flat), &Style {
                            space_after: 1.0,
                            ..Style::body(9.5, 1.3, INK)
                        });
                    }
                }
            }
        }
    }
    doc
}

/// Cover letter layout: 1" margins, 11 pt justified body.
pub fn cover_letter(markdown_text: &str) -> Document {
    let mut doc = Document::new(Margins {
        top: 72.0,
        bottom: 72.0,
        left: 72.0,
        right: 72.0,
    });
    let body = Style::body(11.0, 1.5, LETTER_INK);

    for block in letter::parse(markdown_text) {
        match block {
            letter::Block::Sender { name, contact, date } => {
                doc.plain(&name, &Style {
                    bold: true,
                    ..Style::body(16.0, 1.3, NAVY)
                });
                for line in [contact, date].into_iter().flatten() {
                    doc.plain(&line, &Style {
                        space_before: 2.0,
                        ..Style::body(10.0, 1.4, MUTED)
                    });
                }
                doc.space(24.0);
            }
            letter::Block::Recipient(lines) => {
                for line in &lines {
                    doc.plain(line, &Style {
                        leading: 1.4,
                        ..body
                    });
                }
                doc.space(20.0);
            }
            letter::Block::Salutation(text) => doc.plain(&text, &Style {
                space_after: 12.0,
                ..body
            }),
            letter::Block::Paragraph(text) => doc.paragraph(&markdown::inline_spans(&text), &Style {
                align: Align::Justify,
                space_after: 10.0,
                ..body
            }),
            letter::Block::Closing(text) => doc.plain(&text, &Style {
                space_before: 20.0,
                space_after: 4.0,
                ..body
            }),
            letter::Block::Signature(text) => doc.plain(&text, &Style {
                bold: true,
                color: NAVY,
                ..body
            }),
        }
    }
    doc
}
