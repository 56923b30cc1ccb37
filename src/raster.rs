//! Immutable pixel matrices
//!
//! A [`Raster`] is a rectangular grid of ink levels, stored row by row from
//! the top. Level 0 is paper; any other level is ink. Bilevel rasters have two
//! levels, greyscale rasters more. Rows and pixel data are shared between
//! copies, so cloning is cheap and every transformation returns a new raster.

use std::{fmt, str::FromStr, sync::Arc};

use crate::{
    geometry::{Bounds, Coord},
    BitfontError,
};

/// How pixel rows are aligned to byte boundaries
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum Alignment {
    /// Rows start on a byte boundary, padding on the right
    #[default]
    Left,
    /// Rows end on a byte boundary, padding on the left
    Right,
    /// Rows are packed without padding
    Bit,
}

impl FromStr for Alignment {
    type Err = BitfontError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "l" | "left" => Ok(Alignment::Left),
            "r" | "right" => Ok(Alignment::Right),
            "b" | "bit" => Ok(Alignment::Bit),
            other => Err(BitfontError::Config(format!(
                "Alignment must be `left`, `right` or `bit`, not `{}`",
                other
            ))),
        }
    }
}

/// Order of the bytes of a byte-aligned bitmap
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum MatrixOrder {
    /// All bytes of one row, then the next row
    #[default]
    RowMajor,
    /// The first byte of every row, then the second byte of every row, ...
    ColumnMajor,
}

/// Bit order within a byte
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum BitOrder {
    /// Most significant bit is the leftmost pixel
    #[default]
    Big,
    /// Least significant bit is the leftmost pixel
    Little,
}

/// How overlaid pixels are combined
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum OverlayOperator {
    /// Ink where any layer has ink
    #[default]
    Any,
    /// Ink where every layer has ink
    All,
    /// Ink where an odd number of layers have ink
    Parity,
}

/// Which way the top of a sheared raster moves
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum ShearDirection {
    /// Move the top to the left
    Left,
    /// Move the top to the right
    #[default]
    Right,
}

impl FromStr for ShearDirection {
    type Err = BitfontError;

    /// Only the first letter is significant
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().chars().next().map(|c| c.to_ascii_lowercase()) {
            Some('l') => Ok(ShearDirection::Left),
            Some('r') => Ok(ShearDirection::Right),
            _ => Err(BitfontError::Config(format!(
                "Shear direction must be `left` or `right`, not `{}`",
                s
            ))),
        }
    }
}

/// Options for [`Raster::from_bytes`]
#[derive(Debug, Clone, Copy, Default)]
pub struct FromBytesOptions {
    /// Raster width in pixels
    pub width: Option<usize>,
    /// Raster height in pixels
    pub height: Option<usize>,
    /// Pixels per row, including padding
    pub stride: Option<usize>,
    /// Byte alignment of the rows
    pub align: Alignment,
    /// Byte matrix order (ignored for bit alignment)
    pub order: MatrixOrder,
    /// Reverse the bytes in groups of this size, 0 for none
    pub byte_swap: usize,
    /// Bit order within each byte
    pub bit_order: BitOrder,
}

/// Options for [`Raster::as_bytes`]
#[derive(Debug, Clone, Copy, Default)]
pub struct AsBytesOptions {
    /// Byte alignment of the rows
    pub align: Alignment,
    /// Pixels per row, including padding
    pub stride: Option<usize>,
    /// Reverse the bytes in groups of this size, 0 for none
    pub byte_swap: usize,
    /// Bit order within each byte
    pub bit_order: BitOrder,
}

/// Options for [`Raster::as_text`]
#[derive(Debug, Clone, Copy)]
pub struct TextOptions<'a> {
    /// Text for an inked pixel
    pub ink: &'a str,
    /// Text for a paper pixel
    pub paper: &'a str,
    /// Text at the start of each row
    pub start: &'a str,
    /// Text at the end of each row
    pub end: &'a str,
}

impl Default for TextOptions<'_> {
    fn default() -> Self {
        TextOptions {
            ink: "@",
            paper: ".",
            start: "",
            end: "\n",
        }
    }
}

pub(crate) fn ceildiv(num: usize, den: usize) -> usize {
    num.div_ceil(den)
}

fn positive(operation: &str, value: i32) -> Result<usize, BitfontError> {
    usize::try_from(value).map_err(|_| {
        BitfontError::Config(format!(
            "Can only {} by a positive amount, not {}",
            operation, value
        ))
    })
}

fn factor(operation: &str, value: i32) -> Result<usize, BitfontError> {
    match usize::try_from(value) {
        Ok(f) if f > 0 => Ok(f),
        _ => Err(BitfontError::Config(format!(
            "Can only {} by a factor of at least 1, not {}",
            operation, value
        ))),
    }
}

fn bytes_to_bits(bytes: &[u8]) -> Vec<u8> {
    bytes
        .iter()
        .flat_map(|byte| (0..8).rev().map(move |i| (byte >> i) & 1))
        .collect()
}

// bits are padded with zeros to a whole number of bytes
fn bits_to_bytes(bits: &[u8], bit_order: BitOrder) -> Vec<u8> {
    bits.chunks(8)
        .map(|chunk| {
            let byte = chunk
                .iter()
                .chain(std::iter::repeat(&0))
                .take(8)
                .fold(0u8, |acc, &bit| (acc << 1) | (bit != 0) as u8);
            match bit_order {
                BitOrder::Big => byte,
                BitOrder::Little => byte.reverse_bits(),
            }
        })
        .collect()
}

fn swap_bytes(bytes: &[u8], group: usize) -> Vec<u8> {
    let mut padded = bytes.to_vec();
    padded.resize(ceildiv(bytes.len(), group) * group, 0);
    padded
        .chunks(group)
        .flat_map(|chunk| chunk.iter().rev().copied())
        .collect()
}

fn decode_hex(hex: &str) -> Result<Vec<u8>, BitfontError> {
    let digits = hex
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| {
            c.to_digit(16)
                .map(|d| d as u8)
                .ok_or_else(|| BitfontError::invalid("hex", hex, format!("bad digit {:?}", c)))
        })
        .collect::<Result<Vec<_>, _>>()?;
    if digits.len() % 2 != 0 {
        return Err(BitfontError::invalid("hex", hex, "odd number of digits"));
    }
    Ok(digits.chunks(2).map(|pair| (pair[0] << 4) | pair[1]).collect())
}

/// Quadrant block for a 2x2 cell given as top-left, top-right, bottom-left, bottom-right
fn quadrant(tl: bool, tr: bool, bl: bool, br: bool) -> char {
    const QUADRANTS: [char; 16] = [
        ' ', '\u{2597}', '\u{2596}', '\u{2584}', '\u{259d}', '\u{2590}', '\u{259e}', '\u{259f}',
        '\u{2598}', '\u{259a}', '\u{258c}', '\u{2599}', '\u{2580}', '\u{259c}', '\u{259b}',
        '\u{2588}',
    ];
    QUADRANTS[(tl as usize) << 3 | (tr as usize) << 2 | (bl as usize) << 1 | br as usize]
}

/// An immutable matrix of ink levels
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Raster {
    width: usize,
    height: usize,
    levels: u8,
    pixels: Arc<[u8]>,
}

impl Default for Raster {
    fn default() -> Self {
        Raster::blank(0, 0)
    }
}

impl fmt::Debug for Raster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.height == 0 {
            return write!(f, "Raster(width={})", self.width);
        }
        write!(
            f,
            "Raster({})",
            self.as_text(TextOptions {
                start: "\n  ",
                end: "",
                ..Default::default()
            })
        )
    }
}

impl Raster {
    fn from_fn(
        width: usize,
        height: usize,
        levels: u8,
        pixel: impl Fn(usize, usize) -> u8,
    ) -> Raster {
        let mut pixels = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                pixels.push(pixel(x, y));
            }
        }
        Raster {
            width,
            height,
            levels,
            pixels: pixels.into(),
        }
    }

    /// Create a raster from rows of ink levels.
    ///
    /// All rows must be of equal length. The number of levels is taken from
    /// the largest value found, with a minimum of two.
    pub fn from_rows<R: AsRef<[u8]>>(rows: impl IntoIterator<Item = R>) -> Result<Raster, BitfontError> {
        let mut pixels = vec![];
        let mut width = None;
        let mut height = 0;
        for row in rows {
            let row = row.as_ref();
            match width {
                None => width = Some(row.len()),
                Some(w) if w != row.len() => {
                    return Err(BitfontError::Geometry(format!(
                        "all rows must be of the same width; found {} and {}",
                        w,
                        row.len()
                    )))
                }
                _ => {}
            }
            pixels.extend_from_slice(row);
            height += 1;
        }
        let levels = pixels.iter().max().map_or(2, |&m| m.max(1).saturating_add(1));
        Ok(Raster {
            width: width.unwrap_or(0),
            height,
            levels,
            pixels: pixels.into(),
        })
    }

    /// Create a raster from text rows, where `ink` marks inked pixels.
    pub fn from_text(text: &str, ink: char) -> Result<Raster, BitfontError> {
        let rows = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(|l| l.chars().map(|c| (c == ink) as u8).collect::<Vec<_>>())
            .collect::<Vec<_>>();
        Raster::from_rows(rows)
    }

    /// Create an uninked raster
    pub fn blank(width: usize, height: usize) -> Raster {
        Raster {
            width,
            height,
            levels: 2,
            pixels: vec![0; width * height].into(),
        }
    }

    /// Width in pixels
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> usize {
        self.height
    }

    /// Width and height
    pub fn size(&self) -> Coord {
        Coord::new(self.width as i32, self.height as i32)
    }

    /// Number of ink levels, 2 for a bilevel raster
    pub fn levels(&self) -> u8 {
        self.levels
    }

    fn ink(&self) -> u8 {
        self.levels.saturating_sub(1).max(1)
    }

    fn get(&self, x: usize, y: usize) -> u8 {
        self.pixels[y * self.width + x]
    }

    /// Ink level at column `x`, row `y` counted from the top
    pub fn pixel(&self, x: usize, y: usize) -> Option<u8> {
        (x < self.width && y < self.height).then(|| self.get(x, y))
    }

    /// Iterate over the rows, from the top
    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        (0..self.height).map(move |y| &self.pixels[y * self.width..(y + 1) * self.width])
    }

    /// True if the raster has no ink
    pub fn is_blank(&self) -> bool {
        self.pixels.iter().all(|&p| p == 0)
    }

    /// Offsets from the raster edges to the ink: left, bottom, right, top.
    ///
    /// An uninked raster has padding `(width, height, 0, 0)`.
    pub fn padding(&self) -> Bounds {
        if self.height == 0 {
            return Bounds::default();
        }
        let row_inked = self
            .rows()
            .map(|row| row.iter().any(|&p| p != 0))
            .collect::<Vec<_>>();
        let Some(top) = row_inked.iter().position(|&r| r) else {
            return Bounds::new(self.width as i32, self.height as i32, 0, 0);
        };
        let bottom = row_inked.iter().rev().position(|&r| r).unwrap_or(0);
        let col_inked = (0..self.width)
            .map(|x| (0..self.height).any(|y| self.get(x, y) != 0))
            .collect::<Vec<_>>();
        let left = col_inked.iter().position(|&c| c).unwrap_or(0);
        let right = col_inked.iter().rev().position(|&c| c).unwrap_or(0);
        Bounds::new(left as i32, bottom as i32, right as i32, top as i32)
    }

    // conversions

    /// Rows of user-specified ink and paper values
    pub fn as_matrix<T: Clone>(&self, ink: T, paper: T) -> Vec<Vec<T>> {
        self.rows()
            .map(|row| {
                row.iter()
                    .map(|&p| if p != 0 { ink.clone() } else { paper.clone() })
                    .collect()
            })
            .collect()
    }

    /// Flat sequence of user-specified ink and paper values
    pub fn as_vector<T: Clone>(&self, ink: T, paper: T) -> Vec<T> {
        self.pixels
            .iter()
            .map(|&p| if p != 0 { ink.clone() } else { paper.clone() })
            .collect()
    }

    /// Flat bytes with the given byte sequence for each ink and paper pixel
    pub fn as_bits(&self, ink: &[u8], paper: &[u8]) -> Vec<u8> {
        self.pixels
            .iter()
            .flat_map(|&p| if p != 0 { ink } else { paper })
            .copied()
            .collect()
    }

    /// Text rendering, one line per row
    pub fn as_text(&self, options: TextOptions) -> String {
        if self.height == 0 {
            return String::new();
        }
        self.rows()
            .map(|row| {
                let pixels = row
                    .iter()
                    .map(|&p| if p != 0 { options.ink } else { options.paper })
                    .collect::<String>();
                format!("{}{}{}", options.start, pixels, options.end)
            })
            .collect()
    }

    /// Text rendering with block elements, each covering `resolution` pixels.
    ///
    /// Supported resolutions are 1x1, 2x1, 1x2, 2x2 (quadrants) and
    /// 2x4 (braille patterns).
    pub fn as_blocks(&self, resolution: Coord) -> Result<String, BitfontError> {
        if self.height == 0 {
            return Ok(String::new());
        }
        let (ncols, nrows) = (resolution.x, resolution.y);
        let block: fn(&dyn Fn(usize, usize) -> bool) -> char = match (ncols, nrows) {
            (1, 1) => |p| quadrant(p(0, 0), p(0, 0), p(0, 0), p(0, 0)),
            (2, 1) => |p| quadrant(p(0, 0), p(1, 0), p(0, 0), p(1, 0)),
            (1, 2) => |p| quadrant(p(0, 0), p(0, 0), p(0, 1), p(0, 1)),
            (2, 2) => |p| quadrant(p(0, 0), p(1, 0), p(0, 1), p(1, 1)),
            (2, 4) => |p| {
                const DOTS: [(usize, usize); 8] =
                    [(0, 0), (0, 1), (0, 2), (1, 0), (1, 1), (1, 2), (0, 3), (1, 3)];
                let code = DOTS
                    .iter()
                    .enumerate()
                    .fold(0u32, |acc, (bit, &(x, y))| acc | (p(x, y) as u32) << bit);
                char::from_u32(0x2800 + code).unwrap_or(' ')
            },
            _ => {
                return Err(BitfontError::Config(format!(
                    "Unsupported block resolution: {}",
                    resolution
                )))
            }
        };
        let (ncols, nrows) = (ncols as usize, nrows as usize);
        let mut lines = vec![];
        for by in (0..self.height).step_by(nrows) {
            let line = (0..self.width)
                .step_by(ncols)
                .map(|bx| {
                    block(&|dx, dy| {
                        self.pixel(bx + dx, by + dy).is_some_and(|p| p != 0)
                    })
                })
                .collect::<String>();
            lines.push(line);
        }
        Ok(lines.join("\n") + "\n")
    }

    /// Create a raster from a flat sequence of bits, `stride` per row.
    ///
    /// Only the first `width` bits of each row are used (the last `width`
    /// for right alignment). Bits that do not make up a whole row are ignored.
    pub fn from_vector(
        bits: &[u8],
        stride: usize,
        width: Option<usize>,
        height: Option<usize>,
        align: Alignment,
    ) -> Result<Raster, BitfontError> {
        if bits.is_empty() || width == Some(0) || stride == 0 {
            return Ok(Raster::blank(0, 0));
        }
        let width = width.unwrap_or(stride);
        if width > stride {
            return Err(BitfontError::Geometry(format!(
                "width {} exceeds stride {}",
                width, stride
            )));
        }
        let offset = match align {
            Alignment::Right => stride - width,
            _ => 0,
        };
        let mut rows = (0..bits.len() / stride)
            .map(|row| {
                let start = row * stride + offset;
                bits[start..start + width]
                    .iter()
                    .map(|&b| (b != 0) as u8)
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();
        if let Some(height) = height {
            if rows.len() < height {
                return Err(BitfontError::Geometry(format!(
                    "bit string too short: {} rows for height {}",
                    rows.len(),
                    height
                )));
            }
            rows.truncate(height);
        }
        let mut raster = Raster::from_rows(rows)?;
        raster.levels = 2;
        if raster.height == 0 {
            raster.width = width;
        }
        Ok(raster)
    }

    /// Create a bilevel raster from packed bytes
    pub fn from_bytes(bytes: &[u8], options: FromBytesOptions) -> Result<Raster, BitfontError> {
        let FromBytesOptions {
            width,
            height,
            stride,
            align,
            order,
            byte_swap,
            bit_order,
        } = options;
        if width.is_none() && height.is_none() && stride.is_none() {
            return Err(BitfontError::Config(
                "At least one of width, height or stride must be specified".to_string(),
            ));
        }
        if width == Some(0) || height == Some(0) {
            return Ok(Raster::blank(width.unwrap_or(0), 0));
        }
        let rows_from_height = || {
            height.ok_or_else(|| {
                BitfontError::Config("height is needed to determine the stride".to_string())
            })
        };
        let (width, stride) = match (stride, width, align) {
            (Some(stride), width, _) => (Some(width.unwrap_or(stride)), stride),
            (None, Some(width), Alignment::Bit) => (Some(width), width),
            (None, Some(width), _) => (Some(width), 8 * ceildiv(width, 8)),
            (None, None, Alignment::Bit) => (None, 8 * bytes.len() / rows_from_height()?),
            (None, None, _) => (None, 8 * (bytes.len() / rows_from_height()?)),
        };
        let mut bytes = bytes.to_vec();
        if byte_swap > 0 {
            let length = bytes.len();
            bytes = swap_bytes(&bytes, byte_swap);
            bytes.truncate(length);
        }
        if order == MatrixOrder::ColumnMajor && align != Alignment::Bit {
            let height = rows_from_height()?;
            bytes = (0..height)
                .flat_map(|offset| bytes.iter().skip(offset).step_by(height).copied())
                .collect();
        }
        if bit_order == BitOrder::Little {
            bytes = bytes.iter().map(|b| b.reverse_bits()).collect();
        }
        let bits = bytes_to_bits(&bytes);
        Raster::from_vector(&bits, stride, width, height, align)
    }

    /// Rows of packed bytes, each row padded to a byte boundary
    pub fn as_byterows(&self, align: Alignment, bit_order: BitOrder) -> Vec<Vec<u8>> {
        if self.height == 0 || self.width == 0 {
            return vec![];
        }
        let bytewidth = ceildiv(self.width, 8);
        let pad = 8 * bytewidth - self.width;
        self.rows()
            .map(|row| {
                let bits = row.iter().map(|&p| (p != 0) as u8);
                let bits: Vec<u8> = match align {
                    Alignment::Right => std::iter::repeat(0).take(pad).chain(bits).collect(),
                    _ => bits.collect(),
                };
                bits_to_bytes(&bits, bit_order)
            })
            .collect()
    }

    /// Flat packed bytes
    pub fn as_bytes(&self, options: AsBytesOptions) -> Result<Vec<u8>, BitfontError> {
        if self.height == 0 || self.width == 0 {
            return Ok(vec![]);
        }
        let raster = match options.stride {
            Some(stride) => {
                let extra = stride.checked_sub(self.width).ok_or_else(|| {
                    BitfontError::Config(format!(
                        "stride {} is less than width {}",
                        stride, self.width
                    ))
                })? as i32;
                match options.align {
                    Alignment::Right => self.expand(extra, 0, 0, 0)?,
                    _ => self.expand(0, 0, extra, 0)?,
                }
            }
            None => self.clone(),
        };
        let bytes = match options.align {
            Alignment::Bit => bits_to_bytes(&raster.as_vector(1u8, 0u8), options.bit_order),
            align => raster.as_byterows(align, options.bit_order).concat(),
        };
        if options.byte_swap > 0 {
            return Ok(swap_bytes(&bytes, options.byte_swap));
        }
        Ok(bytes)
    }

    /// Number of bytes [`as_bytes`](Raster::as_bytes) would produce
    pub fn get_byte_size(&self, align: Alignment, stride: Option<usize>) -> usize {
        if self.height == 0 || self.width == 0 {
            return 0;
        }
        let stride = stride.unwrap_or(self.width);
        match align {
            Alignment::Bit => ceildiv(stride * self.height, 8),
            _ => ceildiv(stride, 8) * self.height,
        }
    }

    /// Create a raster from a hex string of packed bytes
    pub fn from_hex(
        hex: &str,
        width: usize,
        height: Option<usize>,
        align: Alignment,
    ) -> Result<Raster, BitfontError> {
        let bytes = decode_hex(hex)?;
        Raster::from_bytes(
            &bytes,
            FromBytesOptions {
                width: Some(width),
                height,
                align,
                ..Default::default()
            },
        )
    }

    /// Packed bytes as a lowercase hex string
    pub fn as_hex(&self, align: Alignment) -> Result<String, BitfontError> {
        let bytes = self.as_bytes(AsBytesOptions {
            align,
            ..Default::default()
        })?;
        Ok(bytes.iter().map(|b| format!("{:02x}", b)).collect())
    }

    /// Join rasters of equal height left to right. Zero-width rasters are skipped.
    pub fn concatenate(rasters: &[Raster]) -> Result<Raster, BitfontError> {
        let rasters = rasters.iter().filter(|r| r.width > 0).collect::<Vec<_>>();
        let Some(first) = rasters.first() else {
            return Ok(Raster::blank(0, 0));
        };
        if rasters.iter().any(|r| r.height != first.height) {
            return Err(BitfontError::Geometry(
                "rasters must be of the same height".to_string(),
            ));
        }
        let rows = (0..first.height).map(|y| {
            rasters
                .iter()
                .flat_map(|r| r.rows().nth(y).unwrap_or(&[]).iter().copied())
                .collect::<Vec<_>>()
        });
        let mut joined = Raster::from_rows(rows.collect::<Vec<_>>())?;
        joined.levels = rasters.iter().map(|r| r.levels).max().unwrap_or(2);
        Ok(joined)
    }

    // orthogonal transformations

    /// Reverse horizontally
    pub fn mirror(&self) -> Raster {
        Raster::from_fn(self.width, self.height, self.levels, |x, y| {
            self.get(self.width - 1 - x, y)
        })
    }

    /// Reverse vertically
    pub fn flip(&self) -> Raster {
        Raster::from_fn(self.width, self.height, self.levels, |x, y| {
            self.get(x, self.height - 1 - y)
        })
    }

    /// Swap rows and columns
    pub fn transpose(&self) -> Raster {
        Raster::from_fn(self.height, self.width, self.levels, |x, y| self.get(y, x))
    }

    /// Rotate by quarter turns; negative values turn anticlockwise
    pub fn turn(&self, clockwise: i32) -> Raster {
        match clockwise.rem_euclid(4) {
            1 => self.transpose().mirror(),
            2 => self.mirror().flip(),
            3 => self.transpose().flip(),
            _ => self.clone(),
        }
    }

    // ink shifts on constant raster size

    /// Cycle rows down and columns right; negative values go up and left
    pub fn roll(&self, down: i32, right: i32) -> Raster {
        if self.width == 0 || self.height == 0 {
            return self.clone();
        }
        let rows = down.rem_euclid(self.height as i32) as usize;
        let columns = right.rem_euclid(self.width as i32) as usize;
        Raster::from_fn(self.width, self.height, self.levels, |x, y| {
            self.get(
                (x + self.width - columns) % self.width,
                (y + self.height - rows) % self.height,
            )
        })
    }

    /// Move the ink, filling with paper
    pub fn shift(&self, left: i32, down: i32, right: i32, up: i32) -> Result<Raster, BitfontError> {
        for amount in [left, down, right, up] {
            positive("shift", amount)?;
        }
        let rows = (down - up) as isize;
        let columns = (right - left) as isize;
        Ok(Raster::from_fn(self.width, self.height, self.levels, |x, y| {
            let sx = x as isize - columns;
            let sy = y as isize - rows;
            if sx < 0 || sy < 0 || sx >= self.width as isize || sy >= self.height as isize {
                0
            } else {
                self.get(sx as usize, sy as usize)
            }
        }))
    }

    // raster size changes

    /// Remove columns and rows from the edges
    pub fn crop(&self, left: i32, bottom: i32, right: i32, top: i32) -> Result<Raster, BitfontError> {
        let (left, bottom) = (positive("crop", left)?, positive("crop", bottom)?);
        let (right, top) = (positive("crop", right)?, positive("crop", top)?);
        let width = self.width.saturating_sub(left + right);
        if self.height <= top + bottom {
            return Ok(Raster::blank(width, 0));
        }
        Ok(Raster::from_fn(
            width,
            self.height - top - bottom,
            self.levels,
            |x, y| self.get(x + left, y + top),
        ))
    }

    /// Add paper columns and rows at the edges
    pub fn expand(&self, left: i32, bottom: i32, right: i32, top: i32) -> Result<Raster, BitfontError> {
        let (left, bottom) = (positive("expand", left)?, positive("expand", bottom)?);
        let (right, top) = (positive("expand", right)?, positive("expand", top)?);
        let width = left + self.width + right;
        let height = top + self.height + bottom;
        if height == 0 {
            return Ok(Raster::blank(width, 0));
        }
        Ok(Raster::from_fn(width, height, self.levels, |x, y| {
            if (left..left + self.width).contains(&x) && (top..top + self.height).contains(&y) {
                self.get(x - left, y - top)
            } else {
                0
            }
        }))
    }

    /// Repeat each column `factor_x` and each row `factor_y` times
    pub fn stretch(&self, factor_x: i32, factor_y: i32) -> Result<Raster, BitfontError> {
        let (fx, fy) = (factor("stretch", factor_x)?, factor("stretch", factor_y)?);
        if (fx, fy) == (1, 1) {
            return Ok(self.clone());
        }
        Ok(Raster::from_fn(
            self.width * fx,
            self.height * fy,
            self.levels,
            |x, y| self.get(x / fx, y / fy),
        ))
    }

    /// Keep every `factor_x`-th column and every `factor_y`-th row.
    ///
    /// Unless `force` is set, fails with [`BitfontError::LossyOperation`] if
    /// any discarded row or column differs from the one kept in its place.
    pub fn shrink(&self, factor_x: i32, factor_y: i32, force: bool) -> Result<Raster, BitfontError> {
        let (fx, fy) = (factor("shrink", factor_x)?, factor("shrink", factor_y)?);
        if (fx, fy) == (1, 1) {
            return Ok(self.clone());
        }
        if !force {
            for y in 0..self.height {
                for x in 0..self.width {
                    if self.get(x, y) != self.get(x - x % fx, y - y % fy) {
                        return Err(BitfontError::LossyOperation(format!(
                            "shrinking by {}x{} would discard pixel ({}, {})",
                            fx, fy, x, y
                        )));
                    }
                }
            }
        }
        Ok(Raster::from_fn(
            ceildiv(self.width, fx),
            ceildiv(self.height, fy),
            self.levels,
            |x, y| self.get(x * fx, y * fy),
        ))
    }

    // effects

    /// Combine equal-sized rasters pixel by pixel
    pub fn overlay(rasters: &[&Raster], operator: OverlayOperator) -> Result<Raster, BitfontError> {
        let Some(first) = rasters.first() else {
            return Ok(Raster::blank(0, 0));
        };
        if rasters
            .iter()
            .any(|r| (r.width, r.height) != (first.width, first.height))
        {
            return Err(BitfontError::Geometry(
                "overlaid rasters must be of the same size".to_string(),
            ));
        }
        let levels = rasters.iter().map(|r| r.levels).max().unwrap_or(2);
        let ink = levels - 1;
        Ok(Raster::from_fn(first.width, first.height, levels, |x, y| {
            let values = rasters.iter().map(|r| r.get(x, y));
            match operator {
                OverlayOperator::Any => values.max().unwrap_or(0),
                OverlayOperator::All => values.min().unwrap_or(0),
                OverlayOperator::Parity => {
                    if values.filter(|&v| v != 0).count() % 2 == 1 {
                        ink
                    } else {
                        0
                    }
                }
            }
        }))
    }

    /// Swap ink and paper
    pub fn invert(&self) -> Raster {
        let ink = self.ink();
        Raster::from_fn(self.width, self.height, self.levels, |x, y| {
            ink.saturating_sub(self.get(x, y))
        })
    }

    /// Repeat inked pixels in each direction
    pub fn smear(&self, left: i32, right: i32, up: i32, down: i32) -> Result<Raster, BitfontError> {
        let mut work = self.clone();
        for (count, direction) in [(left, 0), (right, 1), (up, 2), (down, 3)] {
            let shifted = (1..=positive("smear", count)? as i32)
                .map(|i| match direction {
                    0 => work.shift(i, 0, 0, 0),
                    1 => work.shift(0, 0, i, 0),
                    2 => work.shift(0, 0, 0, i),
                    _ => work.shift(0, i, 0, 0),
                })
                .collect::<Result<Vec<_>, _>>()?;
            work = {
                let layers = std::iter::once(&work).chain(shifted.iter()).collect::<Vec<_>>();
                Raster::overlay(&layers, OverlayOperator::Any)?
            };
        }
        Ok(work)
    }

    /// Slant by dislocating rows, keeping the bottom row fixed.
    ///
    /// Row `y` counted from the bottom moves by
    /// `(y * pitch.x + modulo) / pitch.y` pixels, less one if `modulo` equals
    /// `pitch.y`.
    pub fn shear(
        &self,
        direction: ShearDirection,
        pitch: Coord,
        modulo: i32,
    ) -> Result<Raster, BitfontError> {
        if pitch.y == 0 {
            return Err(BitfontError::Config("Shear pitch must have nonzero y".to_string()));
        }
        let height = self.height as i32;
        let width = self.width as i32;
        let shifts = (0..height)
            .map(|row| {
                let y = height - 1 - row;
                let shift = (y * pitch.x + modulo).div_euclid(pitch.y) - (modulo == pitch.y) as i32;
                shift.clamp(0, width) as usize
            })
            .collect::<Vec<_>>();
        Ok(Raster::from_fn(self.width, self.height, self.levels, |x, y| {
            let shift = shifts[y];
            match direction {
                ShearDirection::Left if x + shift < self.width => self.get(x + shift, y),
                ShearDirection::Right if x >= shift => self.get(x - shift, y),
                _ => 0,
            }
        }))
    }

    /// Ink the rows from `bottom_height` up to `top_height`, counted from the bottom
    pub fn underline(&self, top_height: i32, bottom_height: i32) -> Raster {
        if bottom_height > top_height {
            return self.clone();
        }
        let height = self.height as i32;
        let top = top_height.clamp(0, height);
        let bottom = bottom_height.clamp(0, height);
        let ink = self.ink();
        Raster::from_fn(self.width, self.height, self.levels, |x, y| {
            let line = height - y as i32 - 1;
            if top >= line && line >= bottom {
                ink
            } else {
                self.get(x, y)
            }
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn raster(text: &str) -> Raster {
        Raster::from_text(text, '@').unwrap()
    }

    fn text(raster: &Raster) -> String {
        raster.as_text(TextOptions::default())
    }

    const A: &str = "
        .@@.
        @..@
        @@@@
        @..@
        @..@
    ";

    #[test]
    fn test_ragged_rows() {
        assert!(matches!(
            Raster::from_rows([vec![0, 1], vec![1]]),
            Err(BitfontError::Geometry(_))
        ));
    }

    #[test]
    fn test_mirror_flip_transpose() {
        let r = raster("@..\n@@.");
        assert_eq!(text(&r.mirror()), "..@\n.@@\n");
        assert_eq!(text(&r.flip()), "@@.\n@..\n");
        assert_eq!(text(&r.transpose()), "@@\n.@\n..\n");
        assert_eq!(text(&r.turn(1)), "@@\n@.\n..\n");
        assert_eq!(r.turn(4), r);
        assert_eq!(r.turn(-1), r.turn(3));
    }

    #[test]
    fn test_crop_expand() {
        let r = raster(A);
        let cropped = r.crop(1, 1, 1, 1).unwrap();
        assert_eq!(text(&cropped), "..\n@@\n..\n");
        assert_eq!(r.expand(1, 2, 0, 1).unwrap().crop(1, 2, 0, 1).unwrap(), r);
        assert!(matches!(r.crop(-1, 0, 0, 0), Err(BitfontError::Config(_))));
        let gone = r.crop(0, 3, 1, 3).unwrap();
        assert_eq!((gone.width(), gone.height()), (3, 0));
    }

    #[test]
    fn test_padding() {
        let r = raster("....\n.@..\n....");
        assert_eq!(r.padding(), Bounds::new(1, 1, 2, 1));
        assert_eq!(Raster::blank(3, 2).padding(), Bounds::new(3, 2, 0, 0));
        assert_eq!(Raster::blank(0, 0).padding(), Bounds::new(0, 0, 0, 0));
    }

    #[test]
    fn test_stretch_shrink() {
        let r = raster(A);
        let stretched = r.stretch(2, 3).unwrap();
        assert_eq!((stretched.width(), stretched.height()), (8, 15));
        assert_eq!(stretched.shrink(2, 3, false).unwrap(), r);
        assert!(matches!(
            r.shrink(2, 1, false),
            Err(BitfontError::LossyOperation(_))
        ));
        assert_eq!(text(&r.shrink(2, 1, true).unwrap()), ".@\n@.\n@@\n@.\n@.\n");
        assert_eq!(r.stretch(1, 1).unwrap(), r);
    }

    #[test]
    fn test_roll_and_shift() {
        let r = raster("@..\n...");
        assert_eq!(text(&r.roll(1, 1)), "...\n.@.\n");
        assert_eq!(text(&r.roll(-1, -1)), "...\n..@\n");
        assert_eq!(text(&r.shift(0, 1, 1, 0).unwrap()), "...\n.@.\n");
        assert_eq!(text(&r.shift(1, 0, 0, 0).unwrap()), "...\n...\n");
    }

    #[test]
    fn test_smear() {
        let r = raster(".@..\n....");
        assert_eq!(text(&r.smear(0, 2, 0, 1).unwrap()), ".@@@\n.@@@\n");
    }

    #[test]
    fn test_overlay() {
        let a = raster("@.\n..");
        let b = raster("@@\n..");
        assert_eq!(
            text(&Raster::overlay(&[&a, &b], OverlayOperator::Any).unwrap()),
            "@@\n..\n"
        );
        assert_eq!(
            text(&Raster::overlay(&[&a, &b], OverlayOperator::All).unwrap()),
            "@.\n..\n"
        );
        assert_eq!(
            text(&Raster::overlay(&[&a, &b], OverlayOperator::Parity).unwrap()),
            ".@\n..\n"
        );
        assert!(Raster::overlay(&[&a, &raster("@")], OverlayOperator::Any).is_err());
    }

    #[test]
    fn test_shear() {
        let r = raster("@..\n@..\n@..");
        let sheared = r.shear(ShearDirection::Right, Coord::new(1, 1), 1).unwrap();
        assert_eq!(text(&sheared), "..@\n.@.\n@..\n");
        let r = raster("..@\n..@\n..@");
        let sheared = r.shear(ShearDirection::Left, Coord::new(1, 1), 1).unwrap();
        assert_eq!(text(&sheared), "@..\n.@.\n..@\n");
    }

    #[test]
    fn test_underline() {
        let r = Raster::blank(2, 3);
        assert_eq!(text(&r.underline(1, 0)), "..\n@@\n@@\n");
        assert_eq!(r.underline(0, 1), r);
    }

    #[test]
    fn test_invert() {
        assert_eq!(text(&raster("@.").invert()), ".@\n");
    }

    #[rstest]
    #[case(Alignment::Left, BitOrder::Big, vec![0x60, 0x90, 0xf0, 0x90, 0x90])]
    #[case(Alignment::Right, BitOrder::Big, vec![0x06, 0x09, 0x0f, 0x09, 0x09])]
    #[case(Alignment::Left, BitOrder::Little, vec![0x06, 0x09, 0x0f, 0x09, 0x09])]
    fn test_bytes(#[case] align: Alignment, #[case] bit_order: BitOrder, #[case] expected: Vec<u8>) {
        let r = raster(A);
        let bytes = r
            .as_bytes(AsBytesOptions {
                align,
                bit_order,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(bytes, expected);
        let back = Raster::from_bytes(
            &bytes,
            FromBytesOptions {
                width: Some(4),
                align,
                bit_order,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn test_bit_aligned_bytes() {
        let r = raster(A);
        let bytes = r
            .as_bytes(AsBytesOptions {
                align: Alignment::Bit,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(bytes, vec![0x69, 0xf9, 0x90]);
        assert_eq!(r.get_byte_size(Alignment::Bit, None), 3);
        assert_eq!(r.get_byte_size(Alignment::Left, None), 5);
        let back = Raster::from_bytes(
            &bytes,
            FromBytesOptions {
                width: Some(4),
                height: Some(5),
                align: Alignment::Bit,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn test_column_major_and_byte_swap() {
        let r = raster("@.........\n.@........");
        let bytes = [0x80, 0x40, 0x00, 0x00];
        let back = Raster::from_bytes(
            &bytes,
            FromBytesOptions {
                width: Some(10),
                height: Some(2),
                order: MatrixOrder::ColumnMajor,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(back, r);
        let swapped = r
            .as_bytes(AsBytesOptions {
                byte_swap: 2,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(swapped, vec![0x00, 0x80, 0x00, 0x40]);
    }

    #[test]
    fn test_hex() {
        let r = raster(A);
        assert_eq!(r.as_hex(Alignment::Left).unwrap(), "6090f09090");
        assert_eq!(Raster::from_hex("6090f09090", 4, None, Alignment::Left).unwrap(), r);
    }

    #[test]
    fn test_from_vector() {
        let bits = [0, 1, 1, 1, 0, 0];
        let r = Raster::from_vector(&bits, 3, Some(2), None, Alignment::Right).unwrap();
        assert_eq!(text(&r), "@@\n..\n");
        assert!(Raster::from_vector(&bits, 3, None, Some(3), Alignment::Left).is_err());
        assert_eq!(r.as_vector(1u8, 0u8), vec![1, 1, 0, 0]);
    }

    #[test]
    fn test_blocks() {
        let r = raster("@.@\n.@@\n@..");
        assert_eq!(
            r.as_blocks(Coord::new(2, 2)).unwrap(),
            "\u{259a}\u{258c}\n\u{2598} \n"
        );
        assert!(r.as_blocks(Coord::new(3, 3)).is_err());
    }

    #[test]
    fn test_concatenate() {
        let joined = Raster::concatenate(&[raster("@\n."), Raster::blank(0, 0), raster(".\n@")]).unwrap();
        assert_eq!(text(&joined), "@.\n.@\n");
        assert!(Raster::concatenate(&[raster("@"), raster("@\n@")]).is_err());
    }
}
