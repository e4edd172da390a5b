//! Text measurement and line breaking for the builtin PDF faces.
//!
//! Widths come from the standard Helvetica AFM tables, in thousandths of an
//! em, covering ASCII 0x20..=0x7E. Index = (char as usize) - 32. Text is
//! sanitized to that range before it is measured or drawn, so the tables are
//! exact for everything that reaches the page.

use textwrap::core::Fragment;
use textwrap::wrap_algorithms::wrap_first_fit;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Face {
    Regular,
    Bold,
    Oblique,
    BoldOblique,
}

impl Face {
    pub fn new(bold: bool, italic: bool) -> Self {
        match (bold, italic) {
            (false, false) => Face::Regular,
            (true, false) => Face::Bold,
            (false, true) => Face::Oblique,
            (true, true) => Face::BoldOblique,
        }
    }

    pub fn is_bold(&self) -> bool {
        matches!(self, Face::Bold | Face::BoldOblique)
    }

    fn widths(&self) -> &'static [u16; 95] {
        // Oblique faces share the upright metrics.
        if self.is_bold() {
            &HELVETICA_BOLD
        } else {
            &HELVETICA
        }
    }
}

#[rustfmt::skip]
static HELVETICA: [u16; 95] = [
    // sp   !    "    #    $    %    &    '    (    )    *    +    ,    -    .    /
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    // 0-9
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    // :    ;    <    =    >    ?    @
    278, 278, 584, 584, 584, 556, 1015,
    // A    B    C    D    E    F    G    H    I    J    K    L    M
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833,
    // N    O    P    Q    R    S    T    U    V    W    X    Y    Z
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    // [    \    ]    ^    _    `
    278, 278, 278, 469, 556, 333,
    // a    b    c    d    e    f    g    h    i    j    k    l    m
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833,
    // n    o    p    q    r    s    t    u    v    w    x    y    z
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500,
    // {    |    }    ~
    334, 260, 334, 584,
];

#[rustfmt::skip]
static HELVETICA_BOLD: [u16; 95] = [
    // sp   !    "    #    $    %    &    '    (    )    *    +    ,    -    .    /
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    // 0-9
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    // :    ;    <    =    >    ?    @
    333, 333, 584, 584, 584, 611, 975,
    // A    B    C    D    E    F    G    H    I    J    K    L    M
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833,
    // N    O    P    Q    R    S    T    U    V    W    X    Y    Z
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    // [    \    ]    ^    _    `
    333, 278, 333, 584, 556, 333,
    // a    b    c    d    e    f    g    h    i    j    k    l    m
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889,
    // n    o    p    q    r    s    t    u    v    w    x    y    z
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500,
    // {    |    }    ~
    389, 280, 389, 584,
];

/// Rendered width of `text` in points.
pub fn text_width(text: &str, face: Face, size: f32) -> f32 {
    let widths = face.widths();
    let units: u32 = text
        .chars()
        .map(|c| match c as usize {
            code @ 32..=126 => u32::from(widths[code - 32]),
            _ => 556,
        })
        .sum();
    units as f32 * size / 1000.0
}

/// Maps typographic punctuation to ASCII and replaces anything else outside
/// printable ASCII with `?`.
pub fn sanitize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            ' '..='~' => out.push(c),
            '\u{2018}' | '\u{2019}' | '\u{2032}' => out.push('\''),
            '\u{201C}' | '\u{201D}' | '\u{2033}' => out.push('"'),
            '\u{2013}' | '\u{2014}' | '\u{2212}' | '\u{2022}' | '\u{00B7}' => out.push('-'),
            '\u{2026}' => out.push_str("..."),
            '\t' | '\u{00A0}' | '\u{2009}' => out.push(' '),
            '\u{00E9}' | '\u{00E8}' => out.push('e'),
            _ => out.push('?'),
        }
    }
    out
}

/// A word with its face. Words never contain whitespace.
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub text: String,
    pub face: Face,
}

impl Word {
    pub fn width(&self, size: f32) -> f32 {
        text_width(&self.text, self.face, size)
    }
}

/// Splits styled spans into words. A span boundary inside a word (e.g.
/// `**Rust**,`) yields adjacent words joined without a space.
pub fn words<'a>(spans: impl IntoIterator<Item = (&'a str, Face)>) -> Vec<(Word, bool)> {
    let mut out = Vec::new();
    let mut pending_space = false;
    for (text, face) in spans {
        let text = sanitize(text);
        let mut rest = text.as_str();
        while !rest.is_empty() {
            let trimmed = rest.trim_start();
            if trimmed.len() != rest.len() {
                pending_space = true;
                rest = trimmed;
                continue;
            }
            let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
            let space_before = pending_space && !out.is_empty();
            out.push((
                Word {
                    text: rest[..end].to_string(),
                    face,
                },
                space_before,
            ));
            pending_space = false;
            rest = &rest[end..];
        }
    }
    out
}

/// A laid-out line: words with their x offset from the line start.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub words: Vec<(f32, Word)>,
    pub width: f32,
    /// Number of inter-word gaps, used for justification.
    pub gaps: usize,
}

/// Words that must stay together: a run joined without spaces, e.g. a bold
/// span followed by punctuation. Lines only break between chunks.
#[derive(Debug)]
struct Chunk {
    words: Vec<(f32, Word)>,
    width: f32,
    space: f32,
}

impl Fragment for Chunk {
    fn width(&self) -> f64 {
        f64::from(self.width)
    }

    fn whitespace_width(&self) -> f64 {
        f64::from(self.space)
    }

    fn penalty_width(&self) -> f64 {
        0.0
    }
}

fn chunks(words: Vec<(Word, bool)>, size: f32) -> Vec<Chunk> {
    let space = text_width(" ", Face::Regular, size);
    let mut out: Vec<Chunk> = Vec::new();
    for (word, space_before) in words {
        let word_width = word.width(size);
        match out.last_mut() {
            Some(chunk) if !space_before => {
                chunk.words.push((chunk.width, word));
                chunk.width += word_width;
            }
            _ => out.push(Chunk {
                words: vec![(0.0, word)],
                width: word_width,
                space,
            }),
        }
    }
    out
}

/// First-fit line breaking. The bool on each word says whether a space
/// precedes it. A single word wider than `max_width` gets a line of its own.
pub fn wrap(words: Vec<(Word, bool)>, size: f32, max_width: f32) -> Vec<Line> {
    let chunks = chunks(words, size);
    wrap_first_fit(&chunks, &[f64::from(max_width)])
        .into_iter()
        .map(|slice| {
            let mut line = Line {
                words: Vec::new(),
                width: 0.0,
                gaps: 0,
            };
            for (i, chunk) in slice.iter().enumerate() {
                if i > 0 {
                    line.width += chunk.space;
                    line.gaps += 1;
                }
                let x = line.width;
                line.words
                    .extend(chunk.words.iter().map(|(offset, word)| (x + offset, word.clone())));
                line.width += chunk.width;
            }
            line
        })
        .collect()
}
