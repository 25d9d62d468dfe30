//! Content stream decoding into positioned text spans and ruling lines.
//!
//! Only what table detection needs is tracked: text position, font size,
//! and straight path segments. Glyph widths are estimated from the font
//! size since font metrics are not loaded.

use std::collections::BTreeMap;

use lopdf::content::Content;
use lopdf::{Dictionary, Document as LopdfDocument, Object};

use crate::error::{Error, Result};

/// Average glyph advance as a fraction of the font size.
const GLYPH_WIDTH_FACTOR: f32 = 0.5;

/// A run of text with its position on the page.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    /// The text content
    pub text: String,
    /// X position (left edge)
    pub x: f32,
    /// Y position (baseline)
    pub y: f32,
    /// Estimated width of the text
    pub width: f32,
    /// Effective font size in points
    pub font_size: f32,
}

impl TextSpan {
    /// Create a span, estimating its width from the font size.
    pub fn new(text: impl Into<String>, x: f32, y: f32, font_size: f32) -> Self {
        let text = text.into();
        let width = text.chars().count() as f32 * font_size * GLYPH_WIDTH_FACTOR;
        Self {
            text,
            x,
            y,
            width,
            font_size,
        }
    }

    /// Right edge.
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Top Y coordinate (approximate ascender).
    pub fn top(&self) -> f32 {
        self.y + self.font_size * 0.8
    }

    /// Bottom Y coordinate (approximate descender).
    pub fn bottom(&self) -> f32 {
        self.y - self.font_size * 0.2
    }

    /// Visual center.
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, (self.top() + self.bottom()) / 2.0)
    }
}

/// A straight horizontal or vertical segment drawn on the page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ruling {
    /// Start X
    pub x0: f32,
    /// Start Y
    pub y0: f32,
    /// End X
    pub x1: f32,
    /// End Y
    pub y1: f32,
}

impl Ruling {
    /// Create a ruling with ordered endpoints.
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    /// Check if the segment is (nearly) horizontal.
    pub fn is_horizontal(&self) -> bool {
        (self.y1 - self.y0).abs() < 1.0 && self.x1 > self.x0
    }

    /// Check if the segment is (nearly) vertical.
    pub fn is_vertical(&self) -> bool {
        (self.x1 - self.x0).abs() < 1.0 && self.y1 > self.y0
    }

    /// Length along its dominant axis.
    pub fn length(&self) -> f32 {
        (self.x1 - self.x0).max(self.y1 - self.y0)
    }
}

/// Positioned content of a single page.
#[derive(Debug, Clone, Default)]
pub struct PageLayout {
    /// Text spans in content stream order
    pub spans: Vec<TextSpan>,
    /// Straight segments from stroked or filled paths
    pub rulings: Vec<Ruling>,
}

/// Affine transform `[a b c d e f]`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Matrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Matrix {
    const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    fn from_operands(operands: &[Object]) -> Option<Self> {
        if operands.len() < 6 {
            return None;
        }
        Some(Self {
            a: get_number(&operands[0])?,
            b: get_number(&operands[1])?,
            c: get_number(&operands[2])?,
            d: get_number(&operands[3])?,
            e: get_number(&operands[4])?,
            f: get_number(&operands[5])?,
        })
    }

    /// `self` applied first, then `other`.
    fn then(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            x * self.a + y * self.c + self.e,
            x * self.b + y * self.d + self.f,
        )
    }

    fn vertical_scale(&self) -> f32 {
        (self.c * self.c + self.d * self.d).sqrt()
    }
}

/// Text state inside a `BT`/`ET` block.
#[derive(Debug, Clone)]
struct TextState {
    matrix: Matrix,
    line_matrix: Matrix,
    leading: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            matrix: Matrix::IDENTITY,
            line_matrix: Matrix::IDENTITY,
            leading: 0.0,
        }
    }
}

impl TextState {
    fn move_line(&mut self, tx: f32, ty: f32) {
        let translate = Matrix {
            e: tx,
            f: ty,
            ..Matrix::IDENTITY
        };
        self.line_matrix = translate.then(&self.line_matrix);
        self.matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        let leading = if self.leading == 0.0 { 12.0 } else { self.leading };
        self.move_line(0.0, -leading);
    }

    fn advance(&mut self, tx: f32) {
        let translate = Matrix {
            e: tx,
            ..Matrix::IDENTITY
        };
        self.matrix = translate.then(&self.matrix);
    }
}

/// Decode one page's content stream.
pub(crate) fn decode_page(
    doc: &LopdfDocument,
    content: &[u8],
    fonts: &BTreeMap<Vec<u8>, &Dictionary>,
) -> Result<PageLayout> {
    let content = Content::decode(content).map_err(|e| Error::PdfParse(e.to_string()))?;

    let mut layout = PageLayout::default();
    let mut ctm = Matrix::IDENTITY;
    let mut ctm_stack: Vec<Matrix> = Vec::new();
    let mut text = TextState::default();
    let mut in_text_block = false;
    let mut font_name: Vec<u8> = Vec::new();
    let mut font_size: f32 = 12.0;

    // Current path: list of subpaths, each a list of device-space points.
    let mut path: Vec<Vec<(f32, f32)>> = Vec::new();

    for op in content.operations {
        let operands = &op.operands;
        match op.operator.as_str() {
            "q" => ctm_stack.push(ctm),
            "Q" => ctm = ctm_stack.pop().unwrap_or(Matrix::IDENTITY),
            "cm" => {
                if let Some(m) = Matrix::from_operands(operands) {
                    ctm = m.then(&ctm);
                }
            }
            "BT" => {
                in_text_block = true;
                text = TextState {
                    leading: text.leading,
                    ..TextState::default()
                };
            }
            "ET" => in_text_block = false,
            "Tf" => {
                if operands.len() >= 2 {
                    if let Object::Name(name) = &operands[0] {
                        font_name = name.clone();
                    }
                    font_size = get_number(&operands[1]).unwrap_or(12.0);
                }
            }
            "TL" => {
                if let Some(v) = operands.first().and_then(get_number) {
                    text.leading = v;
                }
            }
            "Td" | "TD" => {
                if operands.len() >= 2 {
                    let tx = get_number(&operands[0]).unwrap_or(0.0);
                    let ty = get_number(&operands[1]).unwrap_or(0.0);
                    if op.operator == "TD" {
                        text.leading = -ty;
                    }
                    text.move_line(tx, ty);
                }
            }
            "Tm" => {
                if let Some(m) = Matrix::from_operands(operands) {
                    text.matrix = m;
                    text.line_matrix = m;
                }
            }
            "T*" => text.next_line(),
            "Tj" | "TJ" | "'" | "\"" if in_text_block => {
                if op.operator == "'" || op.operator == "\"" {
                    text.next_line();
                }
                let encoding = fonts
                    .get(&font_name)
                    .and_then(|f| f.get_font_encoding(doc).ok());
                let decode = |bytes: &[u8]| match encoding {
                    Some(ref enc) => LopdfDocument::decode_text(enc, bytes).unwrap_or_default(),
                    None => decode_text_simple(bytes),
                };

                let shown = match op.operator.as_str() {
                    "TJ" => match operands.first() {
                        Some(Object::Array(items)) => decode_tj_array(items, &decode),
                        _ => String::new(),
                    },
                    "\"" => match operands.get(2) {
                        Some(Object::String(bytes, _)) => decode(bytes),
                        _ => String::new(),
                    },
                    _ => match operands.first() {
                        Some(Object::String(bytes, _)) => decode(bytes),
                        _ => String::new(),
                    },
                };

                if !shown.trim().is_empty() {
                    let device = text.matrix.then(&ctm);
                    let (x, y) = device.apply(0.0, 0.0);
                    let size = font_size * device.vertical_scale();
                    layout.spans.push(TextSpan::new(shown.trim(), x, y, size));
                }
                let advance = shown.chars().count() as f32 * font_size * GLYPH_WIDTH_FACTOR;
                text.advance(advance);
            }
            "m" => {
                if let (Some(x), Some(y)) = point(operands, 0) {
                    path.push(vec![ctm.apply(x, y)]);
                }
            }
            "l" => {
                if let (Some(x), Some(y)) = point(operands, 0) {
                    let p = ctm.apply(x, y);
                    match path.last_mut() {
                        Some(subpath) => subpath.push(p),
                        None => path.push(vec![p]),
                    }
                }
            }
            "re" => {
                if let (Some(x), Some(y), Some(w), Some(h)) = (
                    operands.first().and_then(get_number),
                    operands.get(1).and_then(get_number),
                    operands.get(2).and_then(get_number),
                    operands.get(3).and_then(get_number),
                ) {
                    path.push(vec![
                        ctm.apply(x, y),
                        ctm.apply(x + w, y),
                        ctm.apply(x + w, y + h),
                        ctm.apply(x, y + h),
                        ctm.apply(x, y),
                    ]);
                }
            }
            "h" => {
                if let Some(subpath) = path.last_mut() {
                    if let Some(&first) = subpath.first() {
                        subpath.push(first);
                    }
                }
            }
            "S" | "s" | "f" | "F" | "f*" | "B" | "B*" | "b" | "b*" => {
                for subpath in path.drain(..) {
                    layout.rulings.extend(subpath_rulings(&subpath));
                }
            }
            "n" => path.clear(),
            _ => {}
        }
    }

    Ok(layout)
}

/// Decode a `TJ` array, inserting spaces at large negative kerning.
fn decode_tj_array(items: &[Object], decode: &dyn Fn(&[u8]) -> String) -> String {
    // 200 thousandths of an em is roughly a word space in most fonts.
    let space_threshold = 200.0;
    let mut combined = String::new();

    for item in items {
        match item {
            Object::String(bytes, _) => combined.push_str(&decode(bytes)),
            Object::Integer(_) | Object::Real(_) => {
                let adjustment = -get_number(item).unwrap_or(0.0);
                if adjustment > space_threshold
                    && !combined.is_empty()
                    && !combined.ends_with(' ')
                {
                    combined.push(' ');
                }
            }
            _ => {}
        }
    }

    combined
}

/// Straight axis-aligned segments of a subpath.
///
/// Filled thin rectangles count too: many generators draw table borders
/// as narrow filled boxes rather than stroked lines.
fn subpath_rulings(points: &[(f32, f32)]) -> Vec<Ruling> {
    let mut rulings = Vec::new();

    if points.len() == 5 {
        let xs = points.iter().map(|p| p.0);
        let ys = points.iter().map(|p| p.1);
        let (min_x, max_x) = xs.fold((f32::MAX, f32::MIN), |(lo, hi), v| (lo.min(v), hi.max(v)));
        let (min_y, max_y) = ys.fold((f32::MAX, f32::MIN), |(lo, hi), v| (lo.min(v), hi.max(v)));
        if max_y - min_y < 2.0 && max_x - min_x >= 2.0 {
            let y = (min_y + max_y) / 2.0;
            return vec![Ruling::new(min_x, y, max_x, y)];
        }
        if max_x - min_x < 2.0 && max_y - min_y >= 2.0 {
            let x = (min_x + max_x) / 2.0;
            return vec![Ruling::new(x, min_y, x, max_y)];
        }
    }

    for pair in points.windows(2) {
        let ruling = Ruling::new(pair[0].0, pair[0].1, pair[1].0, pair[1].1);
        if ruling.is_horizontal() || ruling.is_vertical() {
            rulings.push(ruling);
        }
    }

    rulings
}

fn point(operands: &[Object], index: usize) -> (Option<f32>, Option<f32>) {
    (
        operands.get(index).and_then(get_number),
        operands.get(index + 1).and_then(get_number),
    )
}

/// Helper to extract a number from a PDF object.
pub(crate) fn get_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Simple text decoding fallback when no encoding is available.
pub(crate) fn decode_text_simple(bytes: &[u8]) -> String {
    // UTF-16BE with BOM
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16(&utf16).unwrap_or_default();
    }

    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    // Latin-1
    bytes.iter().map(|&b| b as char).collect()
}
