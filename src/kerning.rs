use std::{fmt, str::FromStr};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{geometry::parse_int, label::Label, BitfontError, Glyph};

/// Pairwise kerning adjustments, keyed by the label of the neighbouring glyph
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernTable(IndexMap<Label, i32>);

impl KernTable {
    /// Create an empty kerning table
    pub fn new() -> Self {
        Self::default()
    }

    /// True if the table has no entries
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Adjustment for a neighbour label
    pub fn get(&self, label: &Label) -> Option<i32> {
        self.0.get(label).copied()
    }

    /// Add or replace an adjustment
    pub fn insert(&mut self, label: Label, value: i32) {
        self.0.insert(label, value);
    }

    /// Iterate over the entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&Label, &i32)> {
        self.0.iter()
    }

    /// Kerning amount for a neighbouring glyph: the entry for its first
    /// matching label, or zero.
    pub fn get_for_glyph(&self, second: &Glyph) -> i32 {
        second
            .get_labels()
            .iter()
            .find_map(|label| self.get(label))
            .unwrap_or(0)
    }
}

impl FromIterator<(Label, i32)> for KernTable {
    fn from_iter<T: IntoIterator<Item = (Label, i32)>>(iter: T) -> Self {
        KernTable(iter.into_iter().collect())
    }
}

impl fmt::Display for KernTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines = self
            .0
            .iter()
            .map(|(label, value)| format!("{} {}", label, value))
            .collect::<Vec<_>>();
        write!(f, "{}", lines.join("\n"))
    }
}

impl FromStr for KernTable {
    type Err = BitfontError;

    /// Parse lines of `label amount`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| {
                let (label, value) = line
                    .rsplit_once(char::is_whitespace)
                    .ok_or_else(|| BitfontError::invalid("kerning", line, "expected `label amount`"))?;
                let value =
                    parse_int(value).map_err(|e| BitfontError::invalid("kerning", line, e))?;
                Ok((label.trim().parse::<Label>()?, value))
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::label::Tag;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_kern_table() {
        let table: KernTable = "'A' -1\n\"space\" 2\nu+0041, u+0301 3".parse().unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.get(&Label::from('A')), Some(-1));
        assert_eq!(table.get(&Label::Tag(Tag::new("space"))), Some(2));
        assert_eq!(table.to_string(), "'A' -1\n\"space\" 2\n'A\u{301}' 3");
    }

    #[test]
    fn test_get_for_glyph() {
        let table: KernTable = [(Label::from('B'), 2)].into_iter().collect();
        let glyph = Glyph::blank(2, 2)
            .with_labels([Label::from(0x42u32), Label::from('B')]);
        assert_eq!(table.get_for_glyph(&glyph), 2);
        assert_eq!(table.get_for_glyph(&Glyph::blank(2, 2)), 0);
    }
}
