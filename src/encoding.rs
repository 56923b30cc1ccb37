//! Label resolution services: encoders, taggers and character properties
//!
//! An [`Encoder`] converts between character and codepoint labels; a
//! [`Tagger`] derives tags or comments from a glyph's labels. A few encoders
//! are built in and can be found by name through [`encoder`].

use std::sync::LazyLock;

use indexmap::IndexMap;

use crate::label::{Char, Codepoint, Label, Tag};

/// Converts between characters and codepoints
pub trait Encoder: Send + Sync {
    /// Normalised name of the encoding
    fn name(&self) -> &str;

    /// Character for the first codepoint label found, if mapped
    fn char(&self, labels: &[Label]) -> Option<Char>;

    /// Codepoint for the first character label found, if mapped
    fn codepoint(&self, labels: &[Label]) -> Option<Codepoint>;

    /// All mapped (codepoint, character) pairs, in codepoint order.
    ///
    /// Empty if the mapping is not enumerable.
    fn mapping(&self) -> Vec<(Codepoint, Char)>;
}

/// Derives tags or comments from labels
pub trait Tagger: Send + Sync {
    /// Name of the tagger
    fn name(&self) -> &str;

    /// Comment text for a glyph with these labels, empty if none
    fn comment(&self, labels: &[Label]) -> String;

    /// Tag for a glyph with these labels
    fn tag(&self, labels: &[Label]) -> Tag {
        Tag::new(self.comment(labels))
    }
}

fn first_char(labels: &[Label]) -> Option<&Char> {
    labels.iter().find_map(Label::as_char)
}

fn first_codepoint(labels: &[Label]) -> Option<&Codepoint> {
    labels.iter().find_map(Label::as_codepoint)
}

/// An encoder backed by a codepoint to character table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Charmap {
    name: String,
    ord2chr: IndexMap<Codepoint, Char>,
    chr2ord: IndexMap<Char, Codepoint>,
}

impl Charmap {
    /// Create a character map from (codepoint, character) pairs
    pub fn new(name: &str, mapping: impl IntoIterator<Item = (Codepoint, Char)>) -> Self {
        let ord2chr = mapping
            .into_iter()
            .filter(|(cp, c)| !cp.is_empty() && !c.is_empty())
            .collect::<IndexMap<_, _>>();
        let chr2ord = ord2chr.iter().map(|(k, v)| (v.clone(), k.clone())).collect();
        Charmap {
            name: normalize_encoding_name(name),
            ord2chr,
            chr2ord,
        }
    }

    /// Number of mapped codepoints
    pub fn len(&self) -> usize {
        self.ord2chr.len()
    }

    /// True if nothing is mapped
    pub fn is_empty(&self) -> bool {
        self.ord2chr.is_empty()
    }

    /// Character for a codepoint
    pub fn get(&self, codepoint: &Codepoint) -> Option<&Char> {
        self.ord2chr.get(codepoint)
    }
}

impl Encoder for Charmap {
    fn name(&self) -> &str {
        &self.name
    }

    fn char(&self, labels: &[Label]) -> Option<Char> {
        first_codepoint(labels).and_then(|cp| self.ord2chr.get(cp).cloned())
    }

    fn codepoint(&self, labels: &[Label]) -> Option<Codepoint> {
        first_char(labels).and_then(|c| self.chr2ord.get(c).cloned())
    }

    fn mapping(&self) -> Vec<(Codepoint, Char)> {
        let mut mapping = self
            .ord2chr
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect::<Vec<_>>();
        mapping.sort();
        mapping
    }
}

/// Unicode itself as an encoding: codepoints are UTF-32 scalar values
#[derive(Debug, Clone, Copy, Default)]
pub struct Unicode;

impl Encoder for Unicode {
    fn name(&self) -> &str {
        "unicode"
    }

    fn char(&self, labels: &[Label]) -> Option<Char> {
        let bytes = first_codepoint(labels)?.value();
        // left-pad to whole UTF-32 units
        let padded = std::iter::repeat(0u8)
            .take((4 - bytes.len() % 4) % 4)
            .chain(bytes.iter().copied())
            .collect::<Vec<_>>();
        padded
            .chunks(4)
            .map(|unit| char::from_u32(u32::from_be_bytes([unit[0], unit[1], unit[2], unit[3]])))
            .collect::<Option<String>>()
            .map(Char::new)
    }

    fn codepoint(&self, labels: &[Label]) -> Option<Codepoint> {
        let char = first_char(labels)?;
        if char.is_empty() {
            return None;
        }
        let bytes = char
            .value()
            .chars()
            .flat_map(|c| (c as u32).to_be_bytes())
            .collect::<Vec<_>>();
        Some(Codepoint::from_bytes(bytes))
    }

    fn mapping(&self) -> Vec<(Codepoint, Char)> {
        vec![]
    }
}

static LATIN_1: LazyLock<Charmap> = LazyLock::new(|| {
    Charmap::new(
        "latin-1",
        (0u8..=255).map(|b| (Codepoint::from_bytes(vec![b]), Char::new(char::from(b).to_string()))),
    )
});

static ASCII: LazyLock<Charmap> = LazyLock::new(|| {
    Charmap::new(
        "ascii",
        (0u8..=127).map(|b| (Codepoint::from_bytes(vec![b]), Char::new(char::from(b).to_string()))),
    )
});

/// Normalise an encoding name for display: lowercase, with `_` and spaces as `-`
pub fn normalize_encoding_name(name: &str) -> String {
    name.trim().to_lowercase().replace(['_', ' '], "-")
}

fn match_key(name: &str) -> String {
    normalize_encoding_name(name).replace(['-', '.'], "")
}

/// Find a built-in encoder by name.
///
/// Names match case-insensitively, ignoring punctuation.
pub fn encoder(name: &str) -> Option<&'static dyn Encoder> {
    match match_key(name).as_str() {
        "latin1" | "iso88591" | "l1" => Some(&*LATIN_1),
        "ascii" | "usascii" | "iso646us" => Some(&*ASCII),
        "unicode" | "ucs" => Some(&Unicode),
        _ => None,
    }
}

/// Tags glyphs with their printable character
#[derive(Debug, Clone, Copy, Default)]
pub struct CharTagger;

impl Tagger for CharTagger {
    fn name(&self) -> &str {
        "char"
    }

    fn comment(&self, labels: &[Label]) -> String {
        match first_char(labels) {
            Some(c) if is_printable(c.value()) => c.value().to_string(),
            _ => String::new(),
        }
    }
}

/// Tags glyphs with their codepoint, behind a prefix
#[derive(Debug, Clone, Default)]
pub struct CodepointTagger {
    prefix: String,
}

impl CodepointTagger {
    /// Create a codepoint tagger
    pub fn new(prefix: &str) -> Self {
        CodepointTagger {
            prefix: prefix.to_string(),
        }
    }
}

impl Tagger for CodepointTagger {
    fn name(&self) -> &str {
        "codepoint"
    }

    fn comment(&self, labels: &[Label]) -> String {
        match first_codepoint(labels) {
            Some(cp) if !cp.is_empty() => format!("{}{}", self.prefix, cp),
            _ => String::new(),
        }
    }
}

/// Find a built-in tagger by name
pub fn tagger(name: &str) -> Option<Box<dyn Tagger>> {
    match name.trim().to_lowercase().as_str() {
        "char" => Some(Box::new(CharTagger)),
        "codepoint" => Some(Box::new(CodepointTagger::default())),
        _ => None,
    }
}

fn is_line_or_paragraph_separator(c: char) -> bool {
    matches!(c, '\u{2028}' | '\u{2029}')
}

fn is_private_use(c: char) -> bool {
    matches!(c,
        '\u{e000}'..='\u{f8ff}' | '\u{f0000}'..='\u{ffffd}' | '\u{100000}'..='\u{10fffd}')
}

// general category Cf
fn is_format(c: char) -> bool {
    matches!(c,
        '\u{ad}' | '\u{600}'..='\u{605}' | '\u{61c}' | '\u{6dd}' | '\u{70f}' | '\u{890}'..='\u{891}'
        | '\u{8e2}' | '\u{180e}' | '\u{200b}'..='\u{200f}' | '\u{202a}'..='\u{202e}'
        | '\u{2060}'..='\u{2064}' | '\u{2066}'..='\u{206f}' | '\u{feff}' | '\u{fff9}'..='\u{fffb}'
        | '\u{110bd}' | '\u{110cd}' | '\u{13430}'..='\u{1343f}' | '\u{1bca0}'..='\u{1bca3}'
        | '\u{1d173}'..='\u{1d17a}' | '\u{e0001}' | '\u{e0020}'..='\u{e007f}')
}

/// True if any character has a graphical representation.
///
/// Controls and line/paragraph separators are not graphical; spaces are.
pub fn is_graphical(text: &str) -> bool {
    text.chars()
        .any(|c| !c.is_control() && !is_line_or_paragraph_separator(c))
}

/// True if the text is empty, or graphical and free of private-use and
/// format characters.
pub fn is_printable(text: &str) -> bool {
    text.is_empty()
        || is_graphical(text) && text.chars().all(|c| !is_private_use(c) && !is_format(c))
}

/// True if the text is non-empty and consists of spaces and non-graphical characters
pub fn is_blank(text: &str) -> bool {
    !text.is_empty()
        && text
            .chars()
            .all(|c| is_space_separator(c) || !is_graphical(c.encode_utf8(&mut [0; 4])))
}

// general category Zs
fn is_space_separator(c: char) -> bool {
    c.is_whitespace() && !c.is_control() && !is_line_or_paragraph_separator(c)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_character_classes() {
        assert!(is_graphical("A"));
        assert!(is_graphical(" "));
        assert!(!is_graphical("\u{7}"));
        assert!(is_blank(" "));
        assert!(is_blank("\u{a0}"));
        assert!(is_blank("\n"));
        assert!(!is_blank(""));
        assert!(!is_blank("a "));
        assert!(is_printable(""));
        assert!(is_printable("é"));
        assert!(!is_printable("\u{e000}"));
        assert!(!is_printable("\u{200b}"));
    }

    #[test]
    fn test_latin1() {
        let latin1 = encoder("ISO 8859-1").unwrap();
        assert_eq!(latin1.name(), "latin-1");
        assert_eq!(latin1.char(&[Label::from(0xe9u32)]), Some(Char::new("é")));
        assert_eq!(
            latin1.codepoint(&[Label::from('é')]),
            Some(Codepoint::from_int(0xe9))
        );
        assert_eq!(latin1.codepoint(&[Label::from('\u{20ac}')]), None);
        assert_eq!(latin1.mapping().len(), 256);
        assert!(encoder("no-such-thing").is_none());
    }

    #[test]
    fn test_unicode() {
        let unicode = encoder("unicode").unwrap();
        assert_eq!(unicode.char(&[Label::from(0x20acu32)]), Some(Char::new("\u{20ac}")));
        assert_eq!(
            unicode.codepoint(&[Label::from('\u{20ac}')]),
            Some(Codepoint::from_int(0x20ac))
        );
    }

    #[test]
    fn test_taggers() {
        let labels = [Label::from(0x41u32), Label::from('A')];
        assert_eq!(CharTagger.tag(&labels), Tag::new("A"));
        assert_eq!(CodepointTagger::new("cp").comment(&labels), "cp0x41");
        assert_eq!(CharTagger.comment(&[Label::from('\u{1}')]), "");
        assert!(tagger("char").is_some());
    }
}
