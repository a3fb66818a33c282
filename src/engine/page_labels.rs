//! PDF page label number tree (`/PageLabels` in the document catalog).
//!
//! Each range starts at a 0-based page index and numbers its pages with a
//! style, an optional prefix and a start value. Pages before the first
//! range, or documents without a tree, are labelled with their 1-based
//! page number.

use lopdf::{Dictionary, Document, Object};

/// Nested `/Kids` deeper than this are ignored.
const MAX_TREE_DEPTH: usize = 32;

/// Largest value rendered with roman or letter numerals. Larger values
/// (hostile `/St` entries) are rendered as decimal digits instead.
const MAX_SYMBOLIC_VALUE: u32 = 3999;

/// Numbering style of a label range (`/S`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelStyle {
    /// `/D` 1, 2, 3
    Decimal,
    /// `/R` I, II, III
    UpperRoman,
    /// `/r` i, ii, iii
    LowerRoman,
    /// `/A` A..Z, AA..ZZ
    UpperAlpha,
    /// `/a` a..z, aa..zz
    LowerAlpha,
    /// No `/S`: the label is the prefix alone.
    PrefixOnly,
}

impl LabelStyle {
    fn from_name(name: &[u8]) -> Self {
        match name {
            b"D" => LabelStyle::Decimal,
            b"R" => LabelStyle::UpperRoman,
            b"r" => LabelStyle::LowerRoman,
            b"A" => LabelStyle::UpperAlpha,
            b"a" => LabelStyle::LowerAlpha,
            _ => LabelStyle::PrefixOnly,
        }
    }

    /// Render a numeric value in this style.
    pub fn format(self, value: u32) -> String {
        let symbolic = !matches!(self, LabelStyle::Decimal | LabelStyle::PrefixOnly);
        if symbolic && value > MAX_SYMBOLIC_VALUE {
            return value.to_string();
        }

        match self {
            LabelStyle::Decimal => value.to_string(),
            LabelStyle::UpperRoman => roman(value),
            LabelStyle::LowerRoman => roman(value).to_lowercase(),
            LabelStyle::UpperAlpha => alpha(value),
            LabelStyle::LowerAlpha => alpha(value).to_lowercase(),
            LabelStyle::PrefixOnly => String::new(),
        }
    }
}

/// One entry of the number tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLabelRange {
    pub first_page: usize,
    pub style: LabelStyle,
    pub prefix: String,
    pub start: u32,
}

/// Page labels of a document, ordered by first page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageLabels {
    ranges: Vec<PageLabelRange>,
}

impl PageLabels {
    pub fn new(mut ranges: Vec<PageLabelRange>) -> Self {
        ranges.sort_by_key(|r| r.first_page);
        Self { ranges }
    }

    /// Read the catalog's label tree. Malformed or missing trees yield no ranges.
    pub fn from_document(doc: &Document) -> Self {
        let mut ranges = Vec::new();
        if let Some(tree) = label_tree(doc) {
            collect_ranges(doc, tree, &mut ranges, 0);
        }
        Self::new(ranges)
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Label of the page at `page_index` (0-based).
    pub fn label(&self, page_index: usize) -> String {
        let range = self
            .ranges
            .iter()
            .rev()
            .find(|r| r.first_page <= page_index);

        match range {
            Some(range) => {
                let offset = u32::try_from(page_index - range.first_page).unwrap_or(u32::MAX);
                let value = range.start.saturating_add(offset);
                format!("{}{}", range.prefix, range.style.format(value))
            }
            None => (page_index + 1).to_string(),
        }
    }
}

fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn resolve_dict<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Dictionary> {
    match resolve(doc, object)? {
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

fn label_tree(doc: &Document) -> Option<&Dictionary> {
    let catalog = resolve_dict(doc, doc.trailer.get(b"Root").ok()?)?;
    resolve_dict(doc, catalog.get(b"PageLabels").ok()?)
}

fn collect_ranges(
    doc: &Document,
    node: &Dictionary,
    ranges: &mut Vec<PageLabelRange>,
    depth: usize,
) {
    if depth > MAX_TREE_DEPTH {
        return;
    }

    if let Some(Object::Array(nums)) = node.get(b"Nums").ok().and_then(|o| resolve(doc, o)) {
        for pair in nums.chunks_exact(2) {
            let first_page = match resolve(doc, &pair[0]) {
                Some(Object::Integer(n)) if *n >= 0 => *n as usize,
                _ => continue,
            };
            if let Some(dict) = resolve_dict(doc, &pair[1]) {
                ranges.push(parse_range(doc, first_page, dict));
            }
        }
    }

    if let Some(Object::Array(kids)) = node.get(b"Kids").ok().and_then(|o| resolve(doc, o)) {
        for kid in kids {
            if let Some(child) = resolve_dict(doc, kid) {
                collect_ranges(doc, child, ranges, depth + 1);
            }
        }
    }
}

fn parse_range(doc: &Document, first_page: usize, dict: &Dictionary) -> PageLabelRange {
    let style = match entry(doc, dict, b"S") {
        Some(Object::Name(name)) => LabelStyle::from_name(name),
        _ => LabelStyle::PrefixOnly,
    };
    let prefix = match entry(doc, dict, b"P") {
        Some(Object::String(bytes, _)) => decode_text_string(bytes),
        _ => String::new(),
    };
    let start = match entry(doc, dict, b"St") {
        Some(Object::Integer(n)) if *n >= 1 => u32::try_from(*n).unwrap_or(u32::MAX),
        _ => 1,
    };

    PageLabelRange {
        first_page,
        style,
        prefix,
        start,
    }
}

fn entry<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    dict.get(key).ok().and_then(|o| resolve(doc, o))
}

/// Decode a PDF text string: UTF-16BE with BOM, otherwise byte-per-char.
fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    bytes.iter().map(|&b| char::from(b)).collect()
}

fn roman(mut value: u32) -> String {
    const NUMERALS: [(u32, &str); 13] = [
        (1000, "M"),
        (900, "CM"),
        (500, "D"),
        (400, "CD"),
        (100, "C"),
        (90, "XC"),
        (50, "L"),
        (40, "XL"),
        (10, "X"),
        (9, "IX"),
        (5, "V"),
        (4, "IV"),
        (1, "I"),
    ];

    let mut out = String::new();
    for (n, numeral) in NUMERALS {
        while value >= n {
            out.push_str(numeral);
            value -= n;
        }
    }
    out
}

/// 1 = A, 26 = Z, 27 = AA, 52 = ZZ, 53 = AAA.
fn alpha(value: u32) -> String {
    if value == 0 {
        return String::new();
    }
    let letter = char::from(b'A' + ((value - 1) % 26) as u8);
    let repeat = ((value - 1) / 26 + 1) as usize;
    std::iter::repeat_n(letter, repeat).collect()
}
