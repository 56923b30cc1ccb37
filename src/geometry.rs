use std::{
    fmt,
    ops::{Add, Sub},
    str::FromStr,
    sync::LazyLock,
};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::BitfontError;

static TUPLE_SEPARATOR: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"[\s,]+"));
// `8x16`; a leading zero is a hex prefix instead
static DIMENSIONS: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^(-?[1-9][0-9]*)x(-?[0-9]+)$"));

/// Split a textual tuple such as `8x16`, `1, 1` or `0 -2 8 14` into integers.
///
/// A single value is repeated to fill the requested length.
pub(crate) fn parse_tuple(value: &str, length: usize) -> Result<Vec<i32>, String> {
    let separator = TUPLE_SEPARATOR.as_ref().map_err(|e| e.to_string())?;
    let dimensions = DIMENSIONS.as_ref().map_err(|e| e.to_string())?;
    let mut items = vec![];
    for element in separator.split(value.trim()).filter(|s| !s.is_empty()) {
        match dimensions.captures(element) {
            Some(caps) => {
                items.push(parse_int(&caps[1])?);
                items.push(parse_int(&caps[2])?);
            }
            None => items.push(parse_int(element)?),
        }
    }
    match items.len() {
        0 => Ok(vec![0; length]),
        1 => Ok(vec![items[0]; length]),
        n if n == length => Ok(items),
        n => Err(format!("expected {} values, found {}", length, n)),
    }
}

/// Parse an integer in decimal, `0x` hex or `0o` octal notation.
///
/// Fractional values are truncated towards negative infinity.
pub(crate) fn parse_int(value: &str) -> Result<i32, String> {
    let value = value.trim();
    let (negative, digits) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value.strip_prefix('+').unwrap_or(value)),
    };
    let parsed = if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        i32::from_str_radix(hex, 16).ok()
    } else if let Some(oct) = digits.strip_prefix("0o") {
        i32::from_str_radix(oct, 8).ok()
    } else {
        digits
            .parse::<i32>()
            .ok()
            .or_else(|| digits.parse::<f64>().ok().map(|f| f.floor() as i32))
    };
    parsed
        .map(|v| if negative { -v } else { v })
        .ok_or_else(|| format!("not an integer: {:?}", value))
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// A pair of integer coordinates, or a width and height
pub struct Coord {
    /// Horizontal component
    pub x: i32,
    /// Vertical component
    pub y: i32,
}

impl Coord {
    /// Create a new Coord
    pub const fn new(x: i32, y: i32) -> Self {
        Coord { x, y }
    }

    /// True if both components are nonzero
    pub fn is_nonzero_area(&self) -> bool {
        self.x != 0 && self.y != 0
    }
}

impl Add for Coord {
    type Output = Coord;
    fn add(self, rhs: Coord) -> Coord {
        Coord::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Coord {
    type Output = Coord;
    fn sub(self, rhs: Coord) -> Coord {
        Coord::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl From<(i32, i32)> for Coord {
    fn from((x, y): (i32, i32)) -> Self {
        Coord::new(x, y)
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.x, self.y)
    }
}

impl FromStr for Coord {
    type Err = BitfontError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let items = parse_tuple(s, 2).map_err(|e| BitfontError::invalid("coord", s, e))?;
        Ok(Coord::new(items[0], items[1]))
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// A box given by its edges, in a coordinate frame with the origin at bottom left
pub struct Bounds {
    /// Left edge
    pub left: i32,
    /// Bottom edge
    pub bottom: i32,
    /// Right edge
    pub right: i32,
    /// Top edge
    pub top: i32,
}

impl Bounds {
    /// Create new Bounds
    pub const fn new(left: i32, bottom: i32, right: i32, top: i32) -> Self {
        Bounds {
            left,
            bottom,
            right,
            top,
        }
    }

    /// Horizontal extent
    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    /// Vertical extent
    pub fn height(&self) -> i32 {
        self.top - self.bottom
    }

    /// Width and height as a Coord
    pub fn size(&self) -> Coord {
        Coord::new(self.width(), self.height())
    }

    /// Smallest box containing both boxes
    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds::new(
            self.left.min(other.left),
            self.bottom.min(other.bottom),
            self.right.max(other.right),
            self.top.max(other.top),
        )
    }

    /// True if all edges are zero
    pub fn is_zero(&self) -> bool {
        *self == Bounds::default()
    }

    /// Edges in the order left, bottom, right, top
    pub fn as_array(&self) -> [i32; 4] {
        [self.left, self.bottom, self.right, self.top]
    }
}

impl Add for Bounds {
    type Output = Bounds;
    fn add(self, rhs: Bounds) -> Bounds {
        Bounds::new(
            self.left + rhs.left,
            self.bottom + rhs.bottom,
            self.right + rhs.right,
            self.top + rhs.top,
        )
    }
}

impl Sub for Bounds {
    type Output = Bounds;
    fn sub(self, rhs: Bounds) -> Bounds {
        Bounds::new(
            self.left - rhs.left,
            self.bottom - rhs.bottom,
            self.right - rhs.right,
            self.top - rhs.top,
        )
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} {}", self.left, self.bottom, self.right, self.top)
    }
}

impl FromStr for Bounds {
    type Err = BitfontError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let items = parse_tuple(s, 4).map_err(|e| BitfontError::invalid("bounds", s, e))?;
        Ok(Bounds::new(items[0], items[1], items[2], items[3]))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_coord() {
        assert_eq!("8x16".parse::<Coord>().unwrap(), Coord::new(8, 16));
        assert_eq!("1, 2".parse::<Coord>().unwrap(), Coord::new(1, 2));
        assert_eq!("3".parse::<Coord>().unwrap(), Coord::new(3, 3));
        assert!("1 2 3".parse::<Coord>().is_err());
    }

    #[test]
    fn test_parse_bounds() {
        assert_eq!(
            "0, -2, 8, 14".parse::<Bounds>().unwrap(),
            Bounds::new(0, -2, 8, 14)
        );
        assert_eq!(Bounds::new(0, -2, 8, 14).to_string(), "0 -2 8 14");
    }

    #[test]
    fn test_parse_tuple_hex_elements() {
        assert_eq!(parse_tuple("0x10, 0x20", 2).unwrap(), vec![16, 32]);
        assert_eq!(parse_tuple("1 0x10 2 0x20", 4).unwrap(), vec![1, 16, 2, 32]);
        assert!(parse_tuple("0x10x3", 2).is_err());
        assert_eq!(parse_tuple("12x-3", 2).unwrap(), vec![12, -3]);
        assert_eq!(parse_tuple("0x0", 2).unwrap(), vec![0, 0]);
    }

    #[test]
    fn test_union() {
        let a = Bounds::new(0, -2, 4, 6);
        let b = Bounds::new(-1, 0, 3, 8);
        assert_eq!(a.union(&b), Bounds::new(-1, -2, 4, 8));
        assert_eq!(a.union(&b).size(), Coord::new(5, 10));
    }
}
