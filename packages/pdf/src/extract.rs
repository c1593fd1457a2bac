//! Positioned text extraction with [`lopdf`].
//!
//! Each page's content stream is replayed through a minimal text state
//! machine that tracks the text matrix, line matrix, leading, font, and
//! the graphics CTM. Every show operator emits one [`TextFragment`] at
//! the current text origin mapped into user space.
//!
//! Glyph widths are not read. After a show operator the pen advances by
//! an approximation of half the font size per character, which keeps
//! successive fragments on one line ordered left to right.

use std::collections::BTreeMap;

use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId};
use timesheet_attendance_models::TextFragment;

use crate::AttendanceError;

type Matrix = [f64; 6];

const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// Average glyph advance as a fraction of the font size.
const GLYPH_ADVANCE: f64 = 0.5;

/// Line spacing used by `T*` when the stream never set a leading.
const FALLBACK_LEADING: f64 = 1.2;

/// `a × b` in PDF's row-vector convention.
fn multiply(a: &Matrix, b: &Matrix) -> Matrix {
    [
        a[0].mul_add(b[0], a[1] * b[2]),
        a[0].mul_add(b[1], a[1] * b[3]),
        a[2].mul_add(b[0], a[3] * b[2]),
        a[2].mul_add(b[1], a[3] * b[3]),
        a[4].mul_add(b[0], a[5].mul_add(b[2], b[4])),
        a[4].mul_add(b[1], a[5].mul_add(b[3], b[5])),
    ]
}

const fn translation(tx: f64, ty: f64) -> Matrix {
    [1.0, 0.0, 0.0, 1.0, tx, ty]
}

#[allow(clippy::cast_precision_loss)]
fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(f64::from(*r)),
        _ => None,
    }
}

fn matrix_operand(operands: &[Object]) -> Option<Matrix> {
    if operands.len() < 6 {
        return None;
    }
    let mut m = IDENTITY;
    for (slot, operand) in m.iter_mut().zip(operands) {
        *slot = number(operand)?;
    }
    Some(m)
}

/// Decodes a string operand through the current font's encoding, falling
/// back to UTF-16BE (with BOM) and then Latin-1.
fn decode_string(
    bytes: &[u8],
    doc: &Document,
    fonts: &BTreeMap<Vec<u8>, &Dictionary>,
    font: &[u8],
) -> String {
    if let Some(text) = fonts
        .get(font)
        .and_then(|dict| dict.get_font_encoding(doc).ok())
        .and_then(|encoding| Document::decode_text(&encoding, bytes).ok())
    {
        return text;
    }

    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }

    bytes.iter().map(|&b| char::from(b)).collect()
}

struct TextState<'a> {
    doc: &'a Document,
    fonts: BTreeMap<Vec<u8>, &'a Dictionary>,
    ctm: Matrix,
    ctm_stack: Vec<Matrix>,
    text_matrix: Matrix,
    line_matrix: Matrix,
    font: Vec<u8>,
    font_size: f64,
    leading: Option<f64>,
    fragments: Vec<TextFragment>,
}

impl<'a> TextState<'a> {
    fn new(doc: &'a Document, page_id: ObjectId) -> Self {
        Self {
            doc,
            fonts: doc.get_page_fonts(page_id).unwrap_or_default(),
            ctm: IDENTITY,
            ctm_stack: Vec::new(),
            text_matrix: IDENTITY,
            line_matrix: IDENTITY,
            font: Vec::new(),
            font_size: 12.0,
            leading: None,
            fragments: Vec::new(),
        }
    }

    fn move_line(&mut self, tx: f64, ty: f64) {
        self.line_matrix = multiply(&translation(tx, ty), &self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        let leading = self
            .leading
            .unwrap_or(self.font_size * FALLBACK_LEADING);
        self.move_line(0.0, -leading);
    }

    fn decode(&self, obj: &Object) -> Option<String> {
        match obj {
            Object::String(bytes, _) => {
                Some(decode_string(bytes, self.doc, &self.fonts, &self.font))
            }
            _ => None,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn advance(&mut self, chars: usize, adjustment: f64) {
        let tx = (chars as f64).mul_add(
            self.font_size * GLYPH_ADVANCE,
            -adjustment / 1000.0 * self.font_size,
        );
        self.text_matrix = multiply(&translation(tx, 0.0), &self.text_matrix);
    }

    /// Emits `text` at the current text origin and advances the pen.
    fn show(&mut self, text: &str, adjustment: f64) {
        let origin = multiply(&self.text_matrix, &self.ctm);
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            self.fragments
                .push(TextFragment::new(trimmed, origin[4], origin[5]));
        }
        self.advance(text.chars().count(), adjustment);
    }

    fn show_array(&mut self, items: &[Object]) {
        let mut text = String::new();
        let mut adjustment = 0.0;
        for item in items {
            if let Some(n) = number(item) {
                adjustment += n;
            } else if let Some(s) = self.decode(item) {
                text.push_str(&s);
            }
        }
        self.show(&text, adjustment);
    }

    fn apply(&mut self, operator: &str, operands: &[Object]) {
        match operator {
            "q" => self.ctm_stack.push(self.ctm),
            "Q" => {
                if let Some(ctm) = self.ctm_stack.pop() {
                    self.ctm = ctm;
                }
            }
            "cm" => {
                if let Some(m) = matrix_operand(operands) {
                    self.ctm = multiply(&m, &self.ctm);
                }
            }
            "BT" => {
                self.text_matrix = IDENTITY;
                self.line_matrix = IDENTITY;
            }
            "Tf" => {
                if let Some(name) = operands.first().and_then(|o| o.as_name().ok()) {
                    self.font = name.to_vec();
                }
                if let Some(size) = operands.get(1).and_then(number) {
                    self.font_size = size;
                }
            }
            "TL" => {
                if let Some(leading) = operands.first().and_then(number) {
                    self.leading = Some(leading);
                }
            }
            "Td" | "TD" => {
                let tx = operands.first().and_then(number).unwrap_or(0.0);
                let ty = operands.get(1).and_then(number).unwrap_or(0.0);
                if operator == "TD" {
                    self.leading = Some(-ty);
                }
                self.move_line(tx, ty);
            }
            "Tm" => {
                if let Some(m) = matrix_operand(operands) {
                    self.text_matrix = m;
                    self.line_matrix = m;
                }
            }
            "T*" => self.next_line(),
            "Tj" => {
                if let Some(text) = operands.first().and_then(|o| self.decode(o)) {
                    self.show(&text, 0.0);
                }
            }
            "TJ" => {
                if let Some(items) = operands.first().and_then(|o| o.as_array().ok()) {
                    self.show_array(items);
                }
            }
            "'" => {
                self.next_line();
                if let Some(text) = operands.first().and_then(|o| self.decode(o)) {
                    self.show(&text, 0.0);
                }
            }
            "\"" => {
                self.next_line();
                if let Some(text) = operands.get(2).and_then(|o| self.decode(o)) {
                    self.show(&text, 0.0);
                }
            }
            _ => {}
        }
    }
}

/// Parses PDF bytes into a document.
///
/// # Errors
///
/// Returns [`AttendanceError::Document`] if the bytes are not a decodable
/// PDF container.
pub fn load_document(bytes: &[u8]) -> Result<Document, AttendanceError> {
    Document::load_mem(bytes).map_err(|e| AttendanceError::Document(e.to_string()))
}

/// Extracts all positioned text fragments from one page.
///
/// A page whose content stream cannot be read or decoded yields no
/// fragments and a warning rather than failing the document.
#[must_use]
pub fn page_fragments(doc: &Document, page_number: u32, page_id: ObjectId) -> Vec<TextFragment> {
    let content = match doc
        .get_page_content(page_id)
        .and_then(|data| Content::decode(&data))
    {
        Ok(content) => content,
        Err(e) => {
            log::warn!("Skipping page {page_number}: cannot decode content stream: {e}");
            return Vec::new();
        }
    };

    let mut state = TextState::new(doc, page_id);
    for op in &content.operations {
        state.apply(&op.operator, &op.operands);
    }

    log::trace!(
        "Page {page_number}: {} fragments from {} operations",
        state.fragments.len(),
        content.operations.len()
    );

    state.fragments
}

/// Extracts fragments for every page, in page order.
///
/// # Errors
///
/// Returns [`AttendanceError::Document`] if the bytes are not a decodable
/// PDF container.
pub fn extract_fragments(bytes: &[u8]) -> Result<Vec<Vec<TextFragment>>, AttendanceError> {
    let doc = load_document(bytes)?;
    Ok(doc
        .get_pages()
        .into_iter()
        .map(|(number, id)| page_fragments(&doc, number, id))
        .collect())
}

/// Builds an in-memory PDF with one page per content stream.
#[cfg(test)]
pub(crate) fn build_pdf(pages: &[&str]) -> Vec<u8> {
    use lopdf::{Stream, dictionary};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let kids: Vec<Object> = pages
        .iter()
        .map(|content| {
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.as_bytes().to_vec()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            });
            page_id.into()
        })
        .collect();

    #[allow(clippy::cast_possible_wrap)]
    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}
