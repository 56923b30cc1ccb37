//! Glyph labels: characters, codepoints and tags
//!
//! A glyph can carry any number of labels. A [`Char`] is a Unicode character or
//! grapheme sequence, a [`Codepoint`] is a (possibly multi-byte) index into a
//! legacy code page and a [`Tag`] is a free-form name.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::{encoding::is_printable, geometry::parse_int, BitfontError};

/// A character label
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Char(SmolStr);

impl Char {
    /// Create a character label from a string
    pub fn new(value: impl AsRef<str>) -> Self {
        Char(SmolStr::new(value.as_ref()))
    }

    /// The characters contained in the label
    pub fn value(&self) -> &str {
        &self.0
    }

    /// True if the label contains no characters
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Char {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.chars().all(|c| is_printable(&c.to_string())) {
            write!(f, "'{}'", self.0)
        } else {
            let elements = self
                .0
                .chars()
                .map(|c| format!("u+{:04x}", c as u32))
                .collect::<Vec<_>>();
            write!(f, "{}", elements.join(", "))
        }
    }
}

/// A codepoint label, stored big-endian without leading zero bytes
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Codepoint(Vec<u8>);

impl Codepoint {
    /// Create a codepoint label from raw bytes
    pub fn from_bytes(value: impl Into<Vec<u8>>) -> Self {
        let mut value = value.into();
        if value.len() > 1 {
            let leading = value.iter().take_while(|&&b| b == 0).count();
            let leading = leading.min(value.len() - 1);
            value.drain(..leading);
        }
        Codepoint(value)
    }

    /// Create a codepoint label from an integer
    pub fn from_int(value: u32) -> Self {
        let bytes = value.to_be_bytes();
        Codepoint::from_bytes(bytes.to_vec())
    }

    /// The raw bytes of the codepoint
    pub fn value(&self) -> &[u8] {
        &self.0
    }

    /// True if the label contains no bytes
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The integer value of the codepoint, if not empty
    pub fn to_int(&self) -> Option<u32> {
        if self.0.is_empty() || self.0.len() > 4 {
            return None;
        }
        Some(self.0.iter().fold(0u32, |acc, &b| (acc << 8) | b as u32))
    }
}

impl PartialOrd for Codepoint {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Codepoint {
    // order like integers
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0
            .len()
            .cmp(&other.0.len())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl fmt::Display for Codepoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl FromStr for Codepoint {
    type Err = BitfontError;

    /// Parse a codepoint such as `65`, `0x41` or the multibyte `0xf5,0x02`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = vec![];
        for element in s.split(',') {
            let value = parse_int(element).map_err(|e| BitfontError::invalid("codepoint", s, e))?;
            let value = u32::try_from(value)
                .map_err(|_| BitfontError::invalid("codepoint", s, "negative codepoint"))?;
            bytes.extend(Codepoint::from_int(value).0);
        }
        Ok(Codepoint::from_bytes(bytes))
    }
}

/// A tag label
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tag(SmolStr);

impl Tag {
    /// Create a tag label
    pub fn new(value: impl AsRef<str>) -> Self {
        Tag(SmolStr::new(value.as_ref()))
    }

    /// The tag text
    pub fn value(&self) -> &str {
        &self.0
    }

    /// True if the tag is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.0)
    }
}

/// Any of the three kinds of label
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Label {
    /// A Unicode character or grapheme sequence
    Char(Char),
    /// A code page index
    Codepoint(Codepoint),
    /// A free-form name
    Tag(Tag),
}

impl Label {
    /// True if the wrapped label is empty
    pub fn is_empty(&self) -> bool {
        match self {
            Label::Char(c) => c.is_empty(),
            Label::Codepoint(c) => c.is_empty(),
            Label::Tag(t) => t.is_empty(),
        }
    }

    /// The wrapped character label, if any
    pub fn as_char(&self) -> Option<&Char> {
        match self {
            Label::Char(c) => Some(c),
            _ => None,
        }
    }

    /// The wrapped codepoint label, if any
    pub fn as_codepoint(&self) -> Option<&Codepoint> {
        match self {
            Label::Codepoint(c) => Some(c),
            _ => None,
        }
    }

    /// The wrapped tag label, if any
    pub fn as_tag(&self) -> Option<&Tag> {
        match self {
            Label::Tag(t) => Some(t),
            _ => None,
        }
    }
}

impl From<Char> for Label {
    fn from(value: Char) -> Self {
        Label::Char(value)
    }
}

impl From<Codepoint> for Label {
    fn from(value: Codepoint) -> Self {
        Label::Codepoint(value)
    }
}

impl From<Tag> for Label {
    fn from(value: Tag) -> Self {
        Label::Tag(value)
    }
}

impl From<char> for Label {
    fn from(value: char) -> Self {
        Label::Char(Char::new(value.to_string()))
    }
}

impl From<u32> for Label {
    fn from(value: u32) -> Self {
        Label::Codepoint(Codepoint::from_int(value))
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Char(c) => c.fmt(f),
            Label::Codepoint(c) => c.fmt(f),
            Label::Tag(t) => t.fmt(f),
        }
    }
}

fn strip_matching(value: &str, delimiter: char) -> Option<&str> {
    if value.chars().count() >= 2 && value.starts_with(delimiter) && value.ends_with(delimiter) {
        Some(&value[1..value.len() - 1])
    } else {
        None
    }
}

fn char_element(element: &str) -> Option<String> {
    let element = element.trim();
    if let Some(quoted) = strip_matching(element, '\'') {
        return Some(quoted.to_string());
    }
    let lower = element.to_lowercase();
    let hex = lower.strip_prefix("u+")?;
    let value = u32::from_str_radix(hex, 16).ok()?;
    char::from_u32(value).map(|c| c.to_string())
}

impl FromStr for Label {
    type Err = BitfontError;

    /// Convert text to a label, following these rules in order:
    ///
    /// - `"..."` is a tag, `'...'` is a character
    /// - text starting with a digit is a codepoint
    /// - a single character, or anything containing non-ASCII, is a character
    /// - `u+` sequences are characters
    /// - anything else is a tag
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Label::Char(Char::default()));
        }
        if let Some(tag) = strip_matching(s, '"') {
            return Ok(Label::Tag(Tag::new(tag)));
        }
        if let Some(char) = strip_matching(s, '\'') {
            return Ok(Label::Char(Char::new(char)));
        }
        if s.starts_with(|c: char| c.is_ascii_digit()) {
            if let Ok(cp) = s.parse::<Codepoint>() {
                return Ok(Label::Codepoint(cp));
            }
        }
        if s.chars().count() == 1 || !s.is_ascii() {
            return Ok(Label::Char(Char::new(s)));
        }
        let elements = s
            .split(',')
            .filter(|e| !e.is_empty())
            .map(char_element)
            .collect::<Option<Vec<_>>>();
        if let Some(elements) = elements {
            return Ok(Label::Char(Char::new(elements.concat())));
        }
        Ok(Label::Tag(Tag::new(s.trim())))
    }
}

impl Serialize for Label {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Label {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
