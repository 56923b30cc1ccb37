//! # Bitfont
//!
//! Bitfont is a library for working with bitmap fonts. It provides a single
//! in-memory model that bitmap font formats can be read into and written out
//! of, whatever their metric conventions: character-cell, multi-cell,
//! monospace or proportional spacing, horizontal and vertical writing metrics,
//! kerning, bearings and baseline offsets.
//!
//! ## Core Concepts
//!
//! - A [`Raster`] is an immutable grid of pixels, bilevel or greyscale, with a
//!   pixel-level transformation algebra: mirror, flip, transpose, turn, crop,
//!   expand, stretch, shrink, shear, smear, overlay and more.
//! - A [`Glyph`] is a raster positioned relative to the origin by its metrics,
//!   with [`Label`]s (characters, codepoints or tags) and a comment.
//! - A [`Font`] is an ordered collection of glyphs with font-wide properties.
//!   Properties such as ascent, line height or the [`Spacing`] class are
//!   derived from the glyphs unless they are set explicitly.
//!
//! Glyphs and fonts are immutable: every operation returns a new object, and
//! derived values are computed once and cached.
//!
//! ## Properties
//!
//! Both glyphs and fonts carry a typed property set (see [`properties`]).
//! Properties have schema defaults, may be overridden, and some are always
//! derived. Names that are not in the schema are kept as string-valued
//! extension properties, so that nothing read from a file is lost.
//!
//! ## JSON Serialization
//!
//! Fonts serialize to and from a native JSON form (`.bitfont` files) holding
//! the glyphs with their pixel rows, and all explicitly set properties and
//! comments. Use [`load`] and [`Font::save`].
//!
//! ## Example
//!
//! ```no_run
//! use bitfont::{Label, Missing};
//!
//! let font = bitfont::load("fixed.bitfont")?;
//! println!("{} is a {} font", font.name(), font.spacing());
//! let bold = font.smear(None, None, None, None)?;
//! let glyph = bold.get_glyph(&Label::from('A'), &Missing::Default)?;
//! println!("{}", glyph.as_text(Default::default()));
//! bold.save("fixed-bold.bitfont")?;
//! # Ok::<(), bitfont::BitfontError>(())
//! ```
//!
//! ## Font filters
//!
//! Font-wide transformations are also available as [`filters`], which can be
//! chained and are exposed as options of the `bitfont` command line tool.
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]

#[cfg(feature = "cli")]
extern crate serde_json_path_to_error as serde_json;

pub mod encoding;
mod error;
/// Font filters
pub mod filters;
mod font;
mod geometry;
mod glyph;
mod kerning;
mod label;
pub mod properties;
mod raster;
mod serde_helpers;
mod stroke;

pub use crate::{
    error::BitfontError,
    font::{Font, FontProperties, Missing, Spacing},
    geometry::{Bounds, Coord},
    glyph::{Glyph, GlyphProperties, LabelOptions, MetricsOptions},
    kerning::KernTable,
    label::{Char, Codepoint, Label, Tag},
    raster::{
        Alignment, AsBytesOptions, BitOrder, FromBytesOptions, MatrixOrder, OverlayOperator,
        Raster, ShearDirection, TextOptions,
    },
    stroke::{StrokeKind, StrokeMove, StrokePath},
};
use std::path::PathBuf;

/// Load a font from a file
///
/// Only the native `.bitfont` JSON form is supported; any other extension
/// fails with [`BitfontError::UnknownFileType`].
pub fn load(filename: impl Into<PathBuf>) -> Result<Font, BitfontError> {
    let pb = filename.into();
    match pb.extension() {
        Some(ext) if ext == "bitfont" => {
            let buffered = std::io::BufReader::new(std::fs::File::open(&pb)?);
            Ok(serde_json::from_reader(buffered)?)
        }
        _ => Err(BitfontError::UnknownFileType { path: pb }),
    }
}
