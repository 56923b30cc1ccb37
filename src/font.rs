//! Fonts: an ordered collection of glyphs with font-wide properties
//!
//! Most font properties that describe metrics are derived from the glyphs
//! unless they have been set explicitly. Summary properties such as
//! [`Font::spacing`] and [`Font::ink_bounds`] are always derived and cached.
//! Like glyphs, fonts are immutable and all operations return a new font.

use std::{collections::HashSet, fmt, path::Path, str::FromStr, sync::OnceLock};

use indexmap::IndexMap;
#[cfg(feature = "rayon")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use crate::{
    encoding::{encoder, Charmap, Encoder},
    geometry::{parse_int, Bounds, Coord},
    glyph::{Glyph, GlyphProperties, LabelOptions, MetricsOptions},
    kerning::KernTable,
    label::{Char, Codepoint, Label, Tag},
    properties::{extend_string, normalize_name, Value},
    raster::{OverlayOperator, Raster, ShearDirection},
    BitfontError,
};

crate::property_set! {
    /// Recognised font properties
    ///
    /// Many of these are derived from the glyphs if not set; see the
    /// accessors on [`Font`].
    pub struct FontProperties {
        // naming
        /// Full human-friendly name
        name: String = String::new(),
        /// Typeface family
        family: String = String::new(),
        /// Additional names, such as weight and slant
        subfamily: String = String::new(),
        /// Unique identifier
        font_id: String = String::new(),
        /// Designer or creator
        author: String = String::new(),
        /// Author or issuer
        foundry: String = String::new(),
        /// Copyright string
        copyright: String = String::new(),
        /// Licence or other notice
        notice: String = String::new(),
        /// Font version
        revision: String = "0".to_string(),

        // descriptive
        /// Font style
        style: String = String::new(),
        /// Nominal point height
        point_size: i32 = 0,
        /// Stroke weight
        weight: String = "regular".to_string(),
        /// Slant
        slant: String = "roman".to_string(),
        /// Width of the characters
        setwidth: String = "normal".to_string(),
        /// Underline, strikethrough and the like
        decoration: String = String::new(),

        // rendering target
        /// Target device
        device: String = String::new(),
        /// Pixel aspect ratio, as (x, y)
        pixel_aspect: Coord = Coord::new(1, 1),
        /// Target resolution in dots per inch
        dpi: Coord = Coord::new(72, 72),

        // summaries
        /// Mean advance width
        average_width: f64 = 0.0,
        /// Largest advance width
        max_width: i32 = 0,
        /// Advance width of `X`
        cap_width: i32 = 0,
        /// Advance width of the digits, if they are all equal
        digit_width: i32 = 0,
        /// Ink height of `x`
        x_height: i32 = 0,
        /// Ink height of `X`
        cap_height: i32 = 0,

        // metrics
        /// Typographic ascent above the baseline
        ascent: i32 = 0,
        /// Typographic descent below the baseline
        descent: i32 = 0,
        /// Distance between baselines
        line_height: i32 = 0,
        /// Distance between lines, in excess of the pixel size
        leading: i32 = 0,
        /// Extent left of the central axis, in vertical writing
        left_extent: i32 = 0,
        /// Extent right of the central axis, in vertical writing
        right_extent: i32 = 0,
        /// Distance between central axes, in vertical writing
        line_width: i32 = 0,

        // characters
        /// Name of the encoding
        encoding: String = String::new(),
        /// Label of the glyph to use for missing characters
        default_char: Label = Label::Char(Char::default()),
        /// Label of the character that separates words
        word_boundary: Label = Label::from(' '),

        // rendering hints
        /// Writing direction
        direction: String = String::new(),
        /// Pixels to smear rightwards for synthetic bold
        bold_smear: i32 = 1,
        /// Slant for synthetic italic, as (x, y)
        italic_pitch: Coord = Coord::new(1, 1),
        /// Thickness of synthetic outlines
        outline_thickness: i32 = 1,
        /// Thickness of synthetic underlines
        underline_thickness: i32 = 1,
        /// Position of the underline below the baseline
        underline_descent: i32 = 0,
        /// Superscript size in pixels
        superscript_size: i32 = 0,
        /// Subscript size in pixels
        subscript_size: i32 = 0,
        /// Superscript offset
        superscript_offset: Coord = Coord::new(0, 0),
        /// Subscript offset
        subscript_offset: Coord = Coord::new(0, 0),
        /// Small capital size in pixels
        small_cap_size: i32 = 0,
        /// Space between words
        word_space: i32 = 0,
        /// Minimum space between words
        min_word_space: i32 = 0,
        /// Maximum space between words
        max_word_space: i32 = 0,
        /// Space between sentences
        sentence_space: i32 = 0,

        // conversion metadata
        /// Software that converted the font
        converter: String = String::new(),
        /// File the font was converted from
        source_name: String = String::new(),
        /// Format the font was converted from
        source_format: String = String::new(),
        /// Operations applied to the font
        history: String = String::new(),
    }
    computed: [
        spacing, pixel_size, raster, raster_size, cell_size,
        bounding_box, ink_bounds, padding,
    ]
}

// glyph metrics that may be given font-wide, to be added to every glyph
const GLYPH_METRICS: &[&str] = &[
    "shift_up",
    "left_bearing",
    "right_bearing",
    "shift_left",
    "top_bearing",
    "bottom_bearing",
];

/// How a font's glyphs are spaced
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Spacing {
    /// Glyphs have differing advances
    Proportional,
    /// Glyphs have equal advances but may not fit a cell
    Monospace,
    /// All glyphs fit one cell of fixed size
    CharacterCell,
    /// Glyphs take up one or two cells of fixed size
    MultiCell,
}

impl Spacing {
    /// True for character-cell and multi-cell fonts
    pub fn is_cell_based(&self) -> bool {
        matches!(self, Spacing::CharacterCell | Spacing::MultiCell)
    }
}

impl fmt::Display for Spacing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Spacing::Proportional => "proportional",
            Spacing::Monospace => "monospace",
            Spacing::CharacterCell => "character-cell",
            Spacing::MultiCell => "multi-cell",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Spacing {
    type Err = BitfontError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_name(s).as_str() {
            "proportional" => Ok(Spacing::Proportional),
            "monospace" => Ok(Spacing::Monospace),
            "character_cell" => Ok(Spacing::CharacterCell),
            "multi_cell" => Ok(Spacing::MultiCell),
            _ => Err(BitfontError::invalid("spacing", s, "unknown spacing")),
        }
    }
}

/// What [`Font::get_glyph`] returns for a label that is not in the font
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Missing {
    /// Fail with [`BitfontError::GlyphNotFound`]
    #[default]
    Raise,
    /// The default glyph, or the space glyph for the word boundary
    Default,
    /// A glyph with no pixels and no advance
    Empty,
    /// The given glyph
    Glyph(Box<Glyph>),
}

impl FromStr for Missing {
    type Err = BitfontError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "raise" => Ok(Missing::Raise),
            "default" => Ok(Missing::Default),
            "empty" => Ok(Missing::Empty),
            other => Err(BitfontError::Config(format!(
                "Missing glyph policy must be `raise`, `default` or `empty`, not `{}`",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct FontCache {
    labels: OnceLock<IndexMap<Label, usize>>,
    vertical: OnceLock<bool>,
    spacing: OnceLock<Spacing>,
    raster: OnceLock<Bounds>,
    ink_bounds: OnceLock<Bounds>,
    cell_size: OnceLock<Coord>,
    average_width: OnceLock<f64>,
    max_width: OnceLock<i32>,
    lowest: OnceLock<Option<i32>>,
}

/// A bitmap font
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "FontRecord", into = "FontRecord")]
pub struct Font {
    glyphs: Vec<Glyph>,
    props: FontProperties,
    comments: IndexMap<String, String>,
    cache: FontCache,
}

impl PartialEq for Font {
    fn eq(&self, other: &Self) -> bool {
        self.glyphs == other.glyphs && self.props == other.props && self.comments == other.comments
    }
}

fn title_case(text: &str) -> String {
    let mut title = String::with_capacity(text.len());
    let mut previous_cased = false;
    for c in text.chars() {
        if previous_cased {
            title.extend(c.to_lowercase());
        } else {
            title.extend(c.to_uppercase());
        }
        previous_cased = c.is_alphabetic();
    }
    title
}

// rounds half to even
fn round(value: f64) -> i32 {
    value.round_ties_even() as i32
}

fn glyph_metric(glyph: &Glyph, name: &str) -> i32 {
    match name {
        "shift_up" => glyph.shift_up(),
        "left_bearing" => glyph.left_bearing(),
        "right_bearing" => glyph.right_bearing(),
        "shift_left" => glyph.shift_left(),
        "top_bearing" => glyph.top_bearing(),
        "bottom_bearing" => glyph.bottom_bearing(),
        _ => 0,
    }
}

fn has_kerning(glyph: &Glyph) -> bool {
    glyph
        .right_kerning()
        .iter()
        .chain(glyph.left_kerning().iter())
        .any(|(_, &value)| value != 0)
}

/// Add font-wide glyph metrics to each glyph, removing them from the font properties
fn apply_metrics(
    glyphs: Vec<Glyph>,
    props: &mut FontProperties,
) -> Result<Vec<Glyph>, BitfontError> {
    let metrics = props
        .extra()
        .iter()
        .filter(|(key, _)| GLYPH_METRICS.contains(&normalize_name(key).as_str()))
        .map(|(key, value)| {
            parse_int(value)
                .map(|delta| (key.clone(), normalize_name(key), delta))
                .map_err(|e| BitfontError::invalid(key.as_str(), value.as_str(), e))
        })
        .collect::<Result<Vec<_>, _>>()?;
    if metrics.is_empty() {
        return Ok(glyphs);
    }
    for (key, _, _) in &metrics {
        props.unset(key)?;
    }
    glyphs
        .iter()
        .map(|glyph| {
            glyph.modify(
                metrics
                    .iter()
                    .map(|(_, name, delta)| (name.as_str(), glyph_metric(glyph, name) + delta)),
            )
        })
        .collect()
}

impl Font {
    /// Create a font from glyphs and properties.
    ///
    /// Glyph metrics such as `shift_up` or `left_bearing` given among the
    /// properties are added to every glyph.
    pub fn new(
        glyphs: impl IntoIterator<Item = Glyph>,
        props: FontProperties,
    ) -> Result<Font, BitfontError> {
        Font::assemble(glyphs.into_iter().collect(), props, IndexMap::new())
    }

    /// Create a font from glyphs, with default properties
    pub fn from_glyphs(glyphs: impl IntoIterator<Item = Glyph>) -> Font {
        Font {
            glyphs: glyphs.into_iter().collect(),
            props: FontProperties::default().freeze(),
            comments: IndexMap::new(),
            cache: FontCache::default(),
        }
    }

    fn assemble(
        glyphs: Vec<Glyph>,
        props: FontProperties,
        comments: IndexMap<String, String>,
    ) -> Result<Font, BitfontError> {
        let mut props = props.thawed();
        let glyphs = apply_metrics(glyphs, &mut props)?;
        Ok(Font {
            glyphs,
            props: props.freeze(),
            comments,
            cache: FontCache::default(),
        })
    }

    fn rebuild(&self, glyphs: Vec<Glyph>, props: FontProperties) -> Font {
        Font {
            glyphs,
            props: props.freeze(),
            comments: self.comments.clone(),
            cache: FontCache::default(),
        }
    }

    /// A copy with the glyphs replaced
    pub fn with_glyphs(&self, glyphs: Vec<Glyph>) -> Font {
        self.rebuild(glyphs, self.props.clone())
    }

    fn with_props(&self, props: FontProperties) -> Font {
        self.rebuild(self.glyphs.clone(), props)
    }

    /// A copy with a comment set; the empty key is the global comment
    pub fn with_comment(mut self, key: &str, comment: impl Into<String>) -> Font {
        let comment = comment.into();
        if comment.is_empty() {
            self.comments.shift_remove(key);
        } else {
            self.comments.insert(key.to_string(), comment);
        }
        self
    }

    /// A copy with properties overridden.
    ///
    /// Values are converted to the declared types; unknown names are kept
    /// as extension properties.
    pub fn modify<K: AsRef<str>, V: Into<Value>>(
        &self,
        properties: impl IntoIterator<Item = (K, V)>,
    ) -> Result<Font, BitfontError> {
        let mut props = self.props.thawed();
        for (key, value) in properties {
            props.set_value(key.as_ref(), value.into())?;
        }
        Font::assemble(self.glyphs.clone(), props, self.comments.clone())
    }

    /// A copy with glyphs added, and the global comment and properties
    /// extended by a line each
    pub fn append<K: AsRef<str>, V: AsRef<str>>(
        &self,
        glyphs: impl IntoIterator<Item = Glyph>,
        comment: &str,
        properties: impl IntoIterator<Item = (K, V)>,
    ) -> Result<Font, BitfontError> {
        let mut props = self.props.thawed();
        for (key, value) in properties {
            let (key, value) = (key.as_ref(), value.as_ref());
            let value = match props.get_defined(key) {
                Some(existing) => extend_string(&existing.to_string(), value),
                None => value.to_string(),
            };
            props.set_str(key, &value)?;
        }
        let glyphs = self.glyphs.iter().cloned().chain(glyphs).collect();
        let comment = extend_string(self.get_comment(""), comment);
        Ok(Font::assemble(glyphs, props, self.comments.clone())?.with_comment("", comment))
    }

    /// A copy with `glyphs`, the global `comment` or named properties removed.
    ///
    /// Comments on removed properties go too.
    pub fn drop(&self, names: &[&str]) -> Result<Font, BitfontError> {
        let mut glyphs = self.glyphs.clone();
        let mut props = self.props.thawed();
        let mut comments = self.comments.clone();
        for &name in names {
            match name {
                "glyphs" => glyphs.clear(),
                "comment" => {
                    comments.shift_remove("");
                }
                name => {
                    props.unset(name)?;
                    comments.shift_remove(name);
                }
            }
        }
        Font::assemble(glyphs, props, comments)
    }

    // property access

    /// The glyphs, in order
    pub fn glyphs(&self) -> &[Glyph] {
        &self.glyphs
    }

    /// The property set
    pub fn props(&self) -> &FontProperties {
        &self.props
    }

    /// Global comment for the empty key, else the comment on a property
    pub fn get_comment(&self, key: &str) -> &str {
        self.comments.get(key).map(String::as_str).unwrap_or("")
    }

    /// All comments by key
    pub fn comments(&self) -> &IndexMap<String, String> {
        &self.comments
    }

    /// Value of any property by name, including the derived ones.
    ///
    /// Fails with [`BitfontError::UnknownProperty`] for names that are neither
    /// in the schema nor defined as extension properties.
    pub fn get(&self, name: &str) -> Result<Value, BitfontError> {
        Ok(match normalize_name(name).as_str() {
            "name" => self.name().into(),
            "family" => self.family().into(),
            "subfamily" => self.subfamily().into(),
            "foundry" => self.foundry().into(),
            "point_size" => self.point_size().into(),
            "dpi" => self.dpi().into(),
            "spacing" => self.spacing().to_string().into(),
            "raster" => self.raster().into(),
            "raster_size" => self.raster_size().into(),
            "cell_size" => self.cell_size().into(),
            "ink_bounds" => self.ink_bounds().into(),
            "bounding_box" => self.bounding_box().into(),
            "padding" => self.padding().into(),
            "pixel_size" => self.pixel_size().into(),
            "average_width" => self.average_width().into(),
            "max_width" => self.max_width().into(),
            "cap_width" => self.cap_width().into(),
            "digit_width" => self.digit_width().into(),
            "x_height" => self.x_height().into(),
            "cap_height" => self.cap_height().into(),
            "ascent" => self.ascent().into(),
            "descent" => self.descent().into(),
            "line_height" => self.line_height().into(),
            "leading" => self.leading().into(),
            "left_extent" => self.left_extent().into(),
            "right_extent" => self.right_extent().into(),
            "line_width" => self.line_width().into(),
            "default_char" => self.default_char().into(),
            "underline_descent" => self.underline_descent().into(),
            "superscript_size" => self.superscript_size().into(),
            "subscript_size" => self.subscript_size().into(),
            "superscript_offset" => self.superscript_offset().into(),
            "subscript_offset" => self.subscript_offset().into(),
            "small_cap_size" => self.small_cap_size().into(),
            "word_space" => self.word_space().into(),
            "min_word_space" => self.min_word_space().into(),
            "max_word_space" => self.max_word_space().into(),
            "sentence_space" => self.sentence_space().into(),
            _ => match self.props.get_defined(name) {
                Some(value) => value,
                None => FontProperties::get_default(name)?,
            },
        })
    }

    /// Every schema property with its effective value, then extension properties
    pub fn properties(&self) -> Vec<(String, Value)> {
        FontProperties::FIELDS
            .iter()
            .chain(FontProperties::COMPUTED)
            .filter_map(|&name| self.get(name).ok().map(|v| (name.to_string(), v)))
            .chain(
                self.props
                    .extra()
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::Text(v.clone()))),
            )
            .collect()
    }

    /// True if vertical metrics are set on the font or any glyph
    pub fn has_vertical_metrics(&self) -> bool {
        *self.cache.vertical.get_or_init(|| {
            [
                self.props.line_width(),
                self.props.left_extent(),
                self.props.right_extent(),
            ]
            .iter()
            .any(|v| v.is_some_and(|v| v != 0))
                || self.glyphs.iter().any(Glyph::has_vertical_metrics)
        })
    }

    // naming

    /// Full name: family, subfamily and size
    pub fn name(&self) -> String {
        if let Some(name) = self.props.name() {
            return name;
        }
        let size = if self.spacing().is_cell_based() {
            self.cell_size().to_string()
        } else {
            self.point_size().to_string()
        };
        [self.family(), self.subfamily(), size]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Family name, by default derived from the source file name
    pub fn family(&self) -> String {
        if let Some(family) = self.props.family() {
            return family;
        }
        let source_name = self.props.get_source_name();
        let stem = Path::new(&source_name)
            .file_stem()
            .map(|s| s.to_string_lossy().replace('_', " "))
            .unwrap_or_default();
        let stem = if stem == stem.to_uppercase() || stem == stem.to_lowercase() {
            title_case(&stem)
        } else {
            stem
        };
        stem.replace(' ', "")
    }

    /// Subfamily, by default the non-default setwidth, weight and slant
    pub fn subfamily(&self) -> String {
        if let Some(subfamily) = self.props.subfamily() {
            return subfamily;
        }
        [
            (self.props.get_setwidth(), FontProperties::default_setwidth()),
            (self.props.get_weight(), FontProperties::default_weight()),
            (self.props.get_slant(), FontProperties::default_slant()),
        ]
        .into_iter()
        .filter(|(value, default)| value != default)
        .map(|(value, _)| title_case(&value))
        .collect::<Vec<_>>()
        .join(" ")
    }

    /// Author or issuer
    pub fn foundry(&self) -> String {
        self.props.foundry().unwrap_or_else(|| self.props.get_author())
    }

    /// Nominal point size, at 72 points per inch
    pub fn point_size(&self) -> i32 {
        self.props
            .point_size()
            .unwrap_or_else(|| self.pixel_size() * self.dpi().y / 72)
    }

    /// Target resolution; 72 dpi unless implied by an explicit point size
    pub fn dpi(&self) -> Coord {
        if let Some(dpi) = self.props.dpi() {
            return dpi;
        }
        let dpi = match self.props.point_size() {
            Some(point_size) if point_size != 0 => (72 * self.pixel_size()).div_euclid(point_size),
            _ => 72,
        };
        let aspect = self.props.get_pixel_aspect();
        if aspect.y == 0 {
            return Coord::new(dpi, dpi);
        }
        Coord::new((dpi * aspect.x).div_euclid(aspect.y), dpi)
    }

    /// Name of the encoding
    pub fn encoding(&self) -> String {
        self.props.get_encoding()
    }

    /// Writing direction
    pub fn direction(&self) -> String {
        self.props.get_direction()
    }

    // metrics

    /// Distance between baselines
    pub fn line_height(&self) -> i32 {
        if let Some(line_height) = self.props.line_height() {
            return line_height;
        }
        match self.props.leading() {
            Some(leading) => self.pixel_size() + leading,
            None => self.raster_size().y.max(self.pixel_size()),
        }
    }

    /// Distance between central axes in vertical writing; the largest advance by default
    pub fn line_width(&self) -> i32 {
        self.props.line_width().unwrap_or_else(|| self.max_width())
    }

    /// Ascent above the baseline; the top of the ink by default
    pub fn ascent(&self) -> i32 {
        self.props
            .ascent()
            .unwrap_or_else(|| self.ink_bounds().top.max(0))
    }

    /// Descent below the baseline; the bottom of the ink by default
    pub fn descent(&self) -> i32 {
        self.props
            .descent()
            .unwrap_or_else(|| (-self.ink_bounds().bottom).max(0))
    }

    /// Extent right of the central axis; the right of the ink by default
    pub fn right_extent(&self) -> i32 {
        self.props
            .right_extent()
            .unwrap_or_else(|| self.ink_bounds().right.max(0))
    }

    /// Extent left of the central axis; the left of the ink by default
    pub fn left_extent(&self) -> i32 {
        self.props
            .left_extent()
            .unwrap_or_else(|| (-self.ink_bounds().left).max(0))
    }

    /// Pixel size; always ascent plus descent
    pub fn pixel_size(&self) -> i32 {
        self.ascent() + self.descent()
    }

    /// Line height in excess of the pixel size
    pub fn leading(&self) -> i32 {
        self.props
            .leading()
            .unwrap_or_else(|| self.line_height() - self.pixel_size())
    }

    // summaries

    /// Spacing class, derived from the glyph metrics
    pub fn spacing(&self) -> Spacing {
        *self.cache.spacing.get_or_init(|| self.compute_spacing())
    }

    fn compute_spacing(&self) -> Spacing {
        if self.glyphs.is_empty() {
            return Spacing::CharacterCell;
        }
        if self.glyphs.iter().any(has_kerning) {
            return Spacing::Proportional;
        }
        let vertical = self.has_vertical_metrics();
        // void glyphs do not count against monospace
        let advances = self
            .glyphs
            .iter()
            .filter(|g| g.advance_width() != 0)
            .map(|g| (g.advance_width(), if vertical { g.advance_height() } else { 0 }))
            .collect::<HashSet<_>>();
        if advances.len() > 2 {
            return Spacing::Proportional;
        }
        let monospaced = advances.len() == 1;
        let fallback = if monospaced {
            Spacing::Monospace
        } else {
            Spacing::Proportional
        };
        let ink = self.ink_bounds();
        if ink.height() > self.line_height() || vertical && ink.width() > self.line_width() {
            return fallback;
        }
        let in_cell = self.glyphs.iter().all(|g| {
            let padding = g.padding();
            -g.left_bearing() <= padding.left
                && -g.right_bearing() <= padding.right
                && -g.top_bearing() <= padding.top
                && -g.bottom_bearing() <= padding.bottom
        });
        match (in_cell, monospaced) {
            (true, true) => Spacing::CharacterCell,
            (true, false) => Spacing::MultiCell,
            (false, _) => fallback,
        }
    }

    /// Box containing every glyph raster, overlaid at the origin
    pub fn raster(&self) -> Bounds {
        *self.cache.raster.get_or_init(|| {
            self.glyphs
                .iter()
                .map(Glyph::raster)
                .reduce(|acc, r| acc.union(&r))
                .unwrap_or_default()
        })
    }

    /// Dimensions of the font raster
    pub fn raster_size(&self) -> Coord {
        self.raster().size()
    }

    /// Cell dimensions of a character-cell or multi-cell font, else zero
    pub fn cell_size(&self) -> Coord {
        *self.cache.cell_size.get_or_init(|| self.compute_cell_size())
    }

    fn compute_cell_size(&self) -> Coord {
        if self.glyphs.is_empty() || !self.spacing().is_cell_based() {
            return Coord::default();
        }
        let vertical = self.has_vertical_metrics();
        let line_height = self.line_height();
        // the smaller of at most two advances; wide glyphs take two cells
        self.glyphs
            .iter()
            .map(|g| {
                let height = if vertical { g.advance_height() } else { line_height };
                (g.advance_width(), height)
            })
            .filter(|&(x, y)| x != 0 && y != 0)
            .min()
            .map(Coord::from)
            .unwrap_or_default()
    }

    /// Box containing all ink, with the glyphs overlaid at the origin
    pub fn ink_bounds(&self) -> Bounds {
        *self.cache.ink_bounds.get_or_init(|| {
            self.glyphs
                .iter()
                .filter(|g| g.bounding_box().is_nonzero_area())
                .map(Glyph::ink_bounds)
                .reduce(|acc, b| acc.union(&b))
                .unwrap_or_default()
        })
    }

    /// Dimensions of the ink bounds
    pub fn bounding_box(&self) -> Coord {
        self.ink_bounds().size()
    }

    /// Offsets from the font raster to the ink bounds: left, bottom, right, top
    pub fn padding(&self) -> Bounds {
        let (ink, raster) = (self.ink_bounds(), self.raster());
        Bounds::new(
            ink.left - raster.left,
            ink.bottom - raster.bottom,
            raster.right - ink.right,
            raster.top - ink.top,
        )
    }

    /// Mean advance width
    pub fn average_width(&self) -> f64 {
        if let Some(average) = self.props.average_width() {
            return average;
        }
        *self.cache.average_width.get_or_init(|| {
            if self.glyphs.is_empty() {
                return 0.0;
            }
            let total = self.glyphs.iter().map(|g| g.advance_width() as f64).sum::<f64>();
            total / self.glyphs.len() as f64
        })
    }

    /// Largest advance width
    pub fn max_width(&self) -> i32 {
        self.props.max_width().unwrap_or_else(|| {
            *self.cache.max_width.get_or_init(|| {
                self.glyphs
                    .iter()
                    .map(Glyph::advance_width)
                    .max()
                    .unwrap_or(0)
            })
        })
    }

    fn glyph_for_char(&self, c: char) -> Option<&Glyph> {
        self.get_index(&Label::from(c)).map(|i| &self.glyphs[i])
    }

    /// Advance width of `X`
    pub fn cap_width(&self) -> i32 {
        self.props
            .cap_width()
            .unwrap_or_else(|| self.glyph_for_char('X').map_or(0, Glyph::advance_width))
    }

    /// Ink height of `x`
    pub fn x_height(&self) -> i32 {
        self.props
            .x_height()
            .unwrap_or_else(|| self.glyph_for_char('x').map_or(0, |g| g.bounding_box().y))
    }

    /// Ink height of `X`
    pub fn cap_height(&self) -> i32 {
        self.props
            .cap_height()
            .unwrap_or_else(|| self.glyph_for_char('X').map_or(0, |g| g.bounding_box().y))
    }

    /// Advance width of the digits and `$`, if all present and equal; else 0
    pub fn digit_width(&self) -> i32 {
        if let Some(width) = self.props.digit_width() {
            return width;
        }
        let widths = "$0123456789"
            .chars()
            .map(|c| self.glyph_for_char(c).map(Glyph::advance_width))
            .collect::<Option<HashSet<_>>>();
        match widths {
            Some(widths) if widths.len() == 1 => widths.into_iter().next().unwrap_or(0),
            _ => 0,
        }
    }

    // rendering hints

    /// Position of the underline below the baseline
    pub fn underline_descent(&self) -> i32 {
        if let Some(descent) = self.props.underline_descent() {
            return descent;
        }
        let lowest = self.cache.lowest.get_or_init(|| {
            self.glyphs
                .iter()
                .map(|g| g.shift_up() + g.padding().bottom)
                .min()
        });
        let Some(lowest) = *lowest else {
            return 0;
        };
        // one below the baseline, plus half the descent rounded up
        1 - lowest.div_euclid(2)
    }

    /// Recommended superscript size
    pub fn superscript_size(&self) -> i32 {
        self.props
            .superscript_size()
            .unwrap_or_else(|| round(self.pixel_size() as f64 * 0.6))
    }

    /// Recommended subscript size
    pub fn subscript_size(&self) -> i32 {
        self.props
            .subscript_size()
            .unwrap_or_else(|| round(self.pixel_size() as f64 * 0.6))
    }

    /// Recommended superscript offset
    pub fn superscript_offset(&self) -> Coord {
        self.props
            .superscript_offset()
            .unwrap_or_else(|| Coord::new(0, round(self.pixel_size() as f64 * 0.4)))
    }

    /// Recommended subscript offset
    pub fn subscript_offset(&self) -> Coord {
        self.props
            .subscript_offset()
            .unwrap_or_else(|| Coord::new(0, round(self.pixel_size() as f64 * 0.4)))
    }

    /// Recommended small capital size
    pub fn small_cap_size(&self) -> i32 {
        if let Some(size) = self.props.small_cap_size() {
            return size;
        }
        let (x_height, cap_height) = (self.x_height() as f64, self.cap_height() as f64);
        if cap_height == 0.0 {
            return 0;
        }
        round(self.pixel_size() as f64 * ((x_height + (cap_height - x_height) / 3.0) / cap_height))
    }

    /// Space between words: the advance of the space glyph if there is one
    pub fn word_space(&self) -> i32 {
        if let Some(space) = self.props.word_space() {
            return space;
        }
        match self.glyph_for_char(' ') {
            Some(space) => space.advance_width(),
            None if self.spacing().is_cell_based() => self.cell_size().x,
            None => round(self.pixel_size() as f64 / 3.0),
        }
    }

    /// Minimum space between words
    pub fn min_word_space(&self) -> i32 {
        self.props
            .min_word_space()
            .unwrap_or_else(|| round(0.75 * self.word_space() as f64))
    }

    /// Maximum space between words
    pub fn max_word_space(&self) -> i32 {
        self.props
            .max_word_space()
            .unwrap_or_else(|| round(1.5 * self.word_space() as f64))
    }

    /// Space between sentences
    pub fn sentence_space(&self) -> i32 {
        self.props
            .sentence_space()
            .unwrap_or_else(|| self.word_space())
    }

    /// Label of the default glyph: U+FFFD if the font has it
    pub fn default_char(&self) -> Label {
        self.props.default_char().unwrap_or_else(|| {
            let replacement = Label::from('\u{fffd}');
            if self.get_index(&replacement).is_some() {
                replacement
            } else {
                Label::Char(Char::default())
            }
        })
    }

    /// Label of the character that separates words
    pub fn word_boundary(&self) -> Label {
        self.props.get_word_boundary()
    }

    // glyph access

    fn labels(&self) -> &IndexMap<Label, usize> {
        self.cache.labels.get_or_init(|| {
            // later glyphs win for duplicate labels
            let label_map = self
                .glyphs
                .iter()
                .enumerate()
                .flat_map(|(index, glyph)| glyph.get_labels().iter().map(move |l| (l.clone(), index)))
                .collect::<IndexMap<_, _>>();
            let Some(font_encoder) = encoder(&self.encoding()) else {
                return label_map;
            };
            let mut table = IndexMap::new();
            for (label, &index) in &label_map {
                if let Some(c) = font_encoder.char(std::slice::from_ref(label)) {
                    table.insert(Label::Char(c), index);
                }
            }
            for (label, &index) in &label_map {
                if let Some(cp) = font_encoder.codepoint(std::slice::from_ref(label)) {
                    table.insert(Label::Codepoint(cp), index);
                }
            }
            // explicit labels take precedence over encoded ones
            table.extend(label_map);
            table
        })
    }

    /// Index of the glyph with the given label, if any
    pub fn get_index(&self, label: &Label) -> Option<usize> {
        self.labels().get(label).copied()
    }

    // compose from a canonical equivalent or from the decomposed parts
    fn compose_glyph(&self, char: &Char) -> Result<Option<Glyph>, BitfontError> {
        if char.is_empty() {
            return Ok(None);
        }
        let nfc = Label::Char(Char::new(char.value().nfc().collect::<String>()));
        if let Some(index) = self.get_index(&nfc) {
            return Ok(Some(self.glyphs[index].clone()));
        }
        let parts = char
            .value()
            .nfd()
            .map(|c| self.get_index(&Label::from(c)).map(|i| &self.glyphs[i]))
            .collect::<Option<Vec<_>>>();
        match parts {
            Some(parts) if !parts.is_empty() => {
                log::debug!("Composing glyph for {} from {} parts", char, parts.len());
                Glyph::overlay(&parts, OverlayOperator::Any).map(Some)
            }
            _ => Ok(None),
        }
    }

    fn find_glyph(&self, label: &Label) -> Result<Option<Glyph>, BitfontError> {
        if let Some(index) = self.get_index(label) {
            return Ok(Some(self.glyphs[index].clone()));
        }
        match label {
            Label::Char(char) => self.compose_glyph(char),
            _ => Ok(None),
        }
    }

    /// Glyph for a label.
    ///
    /// Characters not in the font are composed from their canonical
    /// decomposition if possible; otherwise the `missing` policy applies.
    pub fn get_glyph(&self, label: &Label, missing: &Missing) -> Result<Glyph, BitfontError> {
        if let Some(glyph) = self.find_glyph(label)? {
            return Ok(glyph);
        }
        match missing {
            Missing::Raise => Err(BitfontError::GlyphNotFound {
                label: label.to_string(),
            }),
            Missing::Default if *label == self.word_boundary() => Ok(self.get_space_glyph()),
            Missing::Default => self.get_default_glyph(),
            Missing::Empty => Ok(self.get_empty_glyph()),
            Missing::Glyph(glyph) => Ok((**glyph).clone()),
        }
    }

    /// The glyph for `default_char`, or else an inked block the size of a space
    pub fn get_default_glyph(&self) -> Result<Glyph, BitfontError> {
        Ok(match self.find_glyph(&self.default_char())? {
            Some(glyph) => glyph,
            None => self.get_space_glyph().invert(),
        })
    }

    /// A blank glyph of word-space width, standing on the descent line
    pub fn get_space_glyph(&self) -> Glyph {
        let width = usize::try_from(self.word_space()).unwrap_or(0);
        let height = usize::try_from(self.pixel_size()).unwrap_or(0);
        let props = GlyphProperties::default().with_shift_up(-self.descent());
        Glyph::new(Raster::blank(width, height), props)
    }

    /// A glyph with no pixels and no advance
    pub fn get_empty_glyph(&self) -> Glyph {
        Glyph::blank(0, 0)
    }

    /// Characters covered by the font, including those implied by the encoding
    pub fn get_chars(&self) -> Vec<&Char> {
        self.labels().keys().filter_map(Label::as_char).collect()
    }

    /// Codepoints covered by the font, including those implied by the encoding
    pub fn get_codepoints(&self) -> Vec<&Codepoint> {
        self.labels().keys().filter_map(Label::as_codepoint).collect()
    }

    /// Tags covered by the font
    pub fn get_tags(&self) -> Vec<&Tag> {
        self.labels().keys().filter_map(Label::as_tag).collect()
    }

    /// Character map implied by glyphs with both a codepoint and a char
    pub fn get_charmap(&self) -> Charmap {
        Charmap::new(
            &format!("implied-{}", self.name()),
            self.glyphs
                .iter()
                .map(|g| (g.codepoint(), g.char()))
                .filter(|(cp, c)| !cp.is_empty() && !c.is_empty()),
        )
    }

    // label operations

    /// Add labels or comments to all glyphs.
    ///
    /// Without a source, characters are labelled from the font encoding; an
    /// unrecognised encoding leaves the font unchanged.
    pub fn label(&self, options: &LabelOptions) -> Result<Font, BitfontError> {
        options.check()?;
        let mut options = *options;
        let mut encoding = self.encoding();
        if options.is_empty() {
            if encoding.is_empty() {
                return Ok(self.clone());
            }
            match encoder(&encoding) {
                Some(font_encoder) => options.char_from = Some(font_encoder),
                None => {
                    log::warn!("Encoding `{}` not recognised.", encoding);
                    return Ok(self.clone());
                }
            }
        }
        if options.overwrite || encoding.is_empty() {
            if let Some(source) = options.char_from.or(options.codepoint_from) {
                encoding = source.name().to_string();
            }
        }
        let glyphs = self.try_for_all_glyphs(|g| g.label(&options))?;
        let (glyphs, mut props) = self.relink_glyphs(glyphs)?;
        if !encoding.is_empty() {
            props = props.with_encoding(encoding);
        }
        Ok(self.rebuild(glyphs, props))
    }

    /// Point label references in properties and kerning tables at the new
    /// first label of the glyph they referred to. `glyphs` must be in the
    /// same order as the font's own.
    fn relink_glyphs(
        &self,
        glyphs: Vec<Glyph>,
    ) -> Result<(Vec<Glyph>, FontProperties), BitfontError> {
        let update = |old: &Label| -> Option<Label> {
            let index = self.get_index(old)?;
            glyphs.get(index)?.get_labels().first().cloned()
        };
        let mut props = self.props.thawed();
        if let Some(label) = self.props.default_char() {
            match update(&label) {
                Some(label) => props = props.with_default_char(label),
                None => props.unset("default_char")?,
            }
        }
        if let Some(label) = self.props.word_boundary() {
            match update(&label) {
                Some(label) => props = props.with_word_boundary(label),
                None => props.unset("word_boundary")?,
            }
        }
        let relink = |table: KernTable| {
            let mut relinked = KernTable::new();
            for (label, &value) in table.iter() {
                if let Some(label) = update(label) {
                    relinked.insert(label, value);
                }
            }
            relinked
        };
        let relinked = glyphs
            .iter()
            .map(|glyph| {
                let (right, left) = (glyph.right_kerning(), glyph.left_kerning());
                if right.is_empty() && left.is_empty() {
                    return Ok(glyph.clone());
                }
                glyph.modify([
                    ("right_kerning", Value::Kerning(relink(right))),
                    ("left_kerning", Value::Kerning(relink(left))),
                ])
            })
            .collect::<Result<Vec<_>, BitfontError>>()?;
        Ok((relinked, props))
    }

    /// The glyphs with any of the labels, in font order
    pub fn subset(&self, labels: &[Label]) -> Font {
        let mut indices = labels
            .iter()
            .filter_map(|l| self.get_index(l))
            .collect::<Vec<_>>();
        indices.sort_unstable();
        indices.dedup();
        self.with_glyphs(indices.into_iter().map(|i| self.glyphs[i].clone()).collect())
    }

    /// The glyphs with none of the labels
    pub fn exclude(&self, labels: &[Label]) -> Font {
        if labels.is_empty() {
            return self.clone();
        }
        let excluded = labels.iter().collect::<HashSet<_>>();
        self.with_glyphs(
            self.glyphs
                .iter()
                .filter(|g| !g.get_labels().iter().any(|l| excluded.contains(l)))
                .cloned()
                .collect(),
        )
    }

    /// A font with one glyph for each label, in the given order, labelled
    /// with that label only. Missing glyphs are filled in by the `missing` policy.
    pub fn resample(&self, labels: &[Label], missing: &Missing) -> Result<Font, BitfontError> {
        let glyphs = labels
            .iter()
            .map(|l| self.get_glyph(l, missing))
            .collect::<Result<Vec<_>, _>>()?;
        let font = self.with_glyphs(glyphs.clone());
        let relabelled = glyphs
            .into_iter()
            .zip(labels)
            .map(|(g, l)| g.with_labels([l.clone()]))
            .collect();
        let (glyphs, props) = font.relink_glyphs(relabelled)?;
        Ok(font.rebuild(glyphs, props))
    }

    /// Resample to every character of an encoding, in codepoint order, and
    /// label the glyphs with their codepoints in that encoding
    pub fn resample_encoding(
        &self,
        encoding: &dyn Encoder,
        missing: &Missing,
    ) -> Result<Font, BitfontError> {
        let labels = encoding
            .mapping()
            .into_iter()
            .map(|(_, c)| Label::Char(c))
            .collect::<Vec<_>>();
        self.resample(&labels, missing)?.label(&LabelOptions {
            codepoint_from: Some(encoding),
            overwrite: true,
            ..Default::default()
        })
    }

    /// Set, extend or remove a property
    pub fn set_property(
        &self,
        key: &str,
        value: &str,
        append: bool,
        remove: bool,
    ) -> Result<Font, BitfontError> {
        if remove {
            let mut props = self.props.thawed();
            props.unset(key)?;
            return Ok(self.with_props(props));
        }
        if append {
            return self.append(vec![], "", [(key, value)]);
        }
        self.modify([(key, value)])
    }

    /// Set, extend or remove a comment; the empty key is the global comment
    pub fn set_comment(&self, key: &str, value: &str, append: bool, remove: bool) -> Font {
        if remove {
            return self.clone().with_comment(key, "");
        }
        let comment = if append {
            extend_string(self.get_comment(key), value)
        } else {
            value.to_string()
        };
        self.clone().with_comment(key, comment)
    }

    // transformations

    fn for_all_glyphs(&self, operation: impl Fn(&Glyph) -> Glyph + Send + Sync) -> Vec<Glyph> {
        #[cfg(feature = "rayon")]
        let glyphs = self.glyphs.par_iter().map(operation).collect();
        #[cfg(not(feature = "rayon"))]
        let glyphs = self.glyphs.iter().map(operation).collect();
        glyphs
    }

    fn try_for_all_glyphs(
        &self,
        operation: impl Fn(&Glyph) -> Result<Glyph, BitfontError> + Send + Sync,
    ) -> Result<Vec<Glyph>, BitfontError> {
        #[cfg(feature = "rayon")]
        let glyphs = self.glyphs.par_iter().map(operation).collect();
        #[cfg(not(feature = "rayon"))]
        let glyphs = self.glyphs.iter().map(operation).collect();
        glyphs
    }

    fn with_direction(&self, mapping: &[(&str, &str)]) -> FontProperties {
        let direction = self.direction();
        match mapping.iter().find(|(from, _)| *from == direction) {
            Some((_, to)) => self.props.clone().with_direction(to.to_string()),
            None => self.props.clone(),
        }
    }

    /// Reverse horizontally
    pub fn mirror(&self) -> Font {
        self.mirror_with(MetricsOptions::default())
    }

    /// Reverse horizontally, with explicit metrics handling
    pub fn mirror_with(&self, options: MetricsOptions) -> Font {
        let font = self.with_glyphs(self.for_all_glyphs(|g| g.mirror_with(options)));
        if !options.adjust_metrics {
            return font;
        }
        font.with_props(font.with_direction(&[
            ("left-to-right", "right-to-left"),
            ("right-to-left", "left-to-right"),
        ]))
    }

    /// Reverse vertically
    pub fn flip(&self) -> Font {
        self.flip_with(MetricsOptions::default())
    }

    /// Reverse vertically, with explicit metrics handling
    pub fn flip_with(&self, options: MetricsOptions) -> Font {
        let font = self.with_glyphs(self.for_all_glyphs(|g| g.flip_with(options)));
        if !options.adjust_metrics {
            return font;
        }
        font.with_props(font.with_direction(&[
            ("top-to-bottom", "bottom-to-top"),
            ("bottom-to-top", "top-to-bottom"),
        ]))
    }

    /// Swap horizontal and vertical directions
    pub fn transpose(&self) -> Font {
        self.transpose_with(MetricsOptions::default())
    }

    /// Swap horizontal and vertical directions, with explicit metrics handling
    pub fn transpose_with(&self, options: MetricsOptions) -> Font {
        let font = self.with_glyphs(self.for_all_glyphs(|g| g.transpose_with(options)));
        if !options.adjust_metrics {
            return font;
        }
        let props = font
            .with_direction(&[
                ("left-to-right", "top-to-bottom"),
                ("right-to-left", "bottom-to-top"),
                ("top-to-bottom", "left-to-right"),
                ("bottom-to-top", "right-to-left"),
            ])
            .with_line_height(font.line_width())
            .with_line_width(font.line_height());
        font.with_props(props)
    }

    /// Rotate by quarter turns; negative values turn anticlockwise
    pub fn turn(&self, clockwise: i32) -> Font {
        (0..clockwise.rem_euclid(4)).fold(self.clone(), |font, _| font.transpose().mirror())
    }

    // keep line advances where they were before a resize
    fn pin_line_advances(&self, font: Font, line_width: bool) -> Font {
        let mut props = font.props.clone().with_line_height(self.line_height());
        if line_width {
            props = props.with_line_width(self.line_width());
        }
        font.with_props(props)
    }

    /// Remove columns and rows from every glyph
    pub fn crop(&self, left: i32, bottom: i32, right: i32, top: i32) -> Result<Font, BitfontError> {
        self.crop_with(left, bottom, right, top, MetricsOptions::default())
    }

    /// Remove columns and rows from every glyph, with explicit metrics handling
    pub fn crop_with(
        &self,
        left: i32,
        bottom: i32,
        right: i32,
        top: i32,
        options: MetricsOptions,
    ) -> Result<Font, BitfontError> {
        let glyphs = self.try_for_all_glyphs(|g| g.crop_with(left, bottom, right, top, options))?;
        let font = self.with_glyphs(glyphs);
        if !options.adjust_metrics {
            return Ok(font);
        }
        Ok(self.pin_line_advances(font, true))
    }

    /// Add blank columns and rows to every glyph
    pub fn expand(&self, left: i32, bottom: i32, right: i32, top: i32) -> Result<Font, BitfontError> {
        self.expand_with(left, bottom, right, top, MetricsOptions::default())
    }

    /// Add blank columns and rows to every glyph, with explicit metrics handling
    pub fn expand_with(
        &self,
        left: i32,
        bottom: i32,
        right: i32,
        top: i32,
        options: MetricsOptions,
    ) -> Result<Font, BitfontError> {
        let glyphs =
            self.try_for_all_glyphs(|g| g.expand_with(left, bottom, right, top, options))?;
        let font = self.with_glyphs(glyphs);
        if !options.adjust_metrics {
            return Ok(font);
        }
        Ok(self.pin_line_advances(font, true))
    }

    /// Crop every glyph to its ink
    pub fn reduce(&self) -> Result<Font, BitfontError> {
        self.reduce_with(true)
    }

    /// Crop every glyph to its ink, optionally leaving the metrics alone.
    ///
    /// Vertical metrics are adjusted if the font has any.
    pub fn reduce_with(&self, adjust_metrics: bool) -> Result<Font, BitfontError> {
        let vertical = self.has_vertical_metrics();
        let options = MetricsOptions {
            adjust_metrics,
            create_vertical_metrics: vertical,
        };
        let font = self.with_glyphs(self.try_for_all_glyphs(|g| g.reduce_with(options))?);
        if !adjust_metrics {
            return Ok(font);
        }
        Ok(self.pin_line_advances(font, vertical))
    }

    /// Pad glyphs to include positive bearings and reach the line height.
    ///
    /// Negative upshifts are equalised so that all glyphs share a baseline row.
    pub fn equalise_horizontal(&self) -> Result<Font, BitfontError> {
        let Some(lowest) = self.glyphs.iter().map(Glyph::shift_up).min() else {
            return Ok(self.clone());
        };
        let add_shift_up = (-lowest).max(0);
        let line_height = self.line_height();
        let glyphs = self.try_for_all_glyphs(|g| {
            g.expand(
                g.left_bearing().max(0),
                g.shift_up() + add_shift_up,
                g.right_bearing().max(0),
                (line_height - g.height() - g.shift_up() - add_shift_up).max(0),
            )
        })?;
        Ok(self.with_glyphs(glyphs))
    }

    /// Repeat columns and rows of every glyph
    pub fn stretch(&self, factor_x: i32, factor_y: i32) -> Result<Font, BitfontError> {
        self.stretch_with(factor_x, factor_y, MetricsOptions::default())
    }

    /// Repeat columns and rows, with explicit metrics handling
    pub fn stretch_with(
        &self,
        factor_x: i32,
        factor_y: i32,
        options: MetricsOptions,
    ) -> Result<Font, BitfontError> {
        if (factor_x, factor_y) == (1, 1) {
            return Ok(self.clone());
        }
        let glyphs = self.try_for_all_glyphs(|g| g.stretch_with(factor_x, factor_y, options))?;
        let font = self.with_glyphs(glyphs);
        if !options.adjust_metrics {
            return Ok(font);
        }
        let props = font
            .props
            .clone()
            .with_line_height(self.line_height() * factor_y)
            .with_line_width(self.line_width() * factor_x);
        Ok(font.with_props(props))
    }

    /// Keep every n-th column and row of every glyph.
    ///
    /// Unless `force` is set, fails with [`BitfontError::LossyOperation`] if
    /// any glyph would lose differing pixels.
    pub fn shrink(&self, factor_x: i32, factor_y: i32, force: bool) -> Result<Font, BitfontError> {
        self.shrink_with(factor_x, factor_y, force, MetricsOptions::default())
    }

    /// Shrink, with explicit metrics handling
    pub fn shrink_with(
        &self,
        factor_x: i32,
        factor_y: i32,
        force: bool,
        options: MetricsOptions,
    ) -> Result<Font, BitfontError> {
        if (factor_x, factor_y) == (1, 1) {
            return Ok(self.clone());
        }
        let glyphs =
            self.try_for_all_glyphs(|g| g.shrink_with(factor_x, factor_y, force, options))?;
        let font = self.with_glyphs(glyphs);
        if !options.adjust_metrics {
            return Ok(font);
        }
        let props = font
            .props
            .clone()
            .with_line_height(self.line_height().div_euclid(factor_y))
            .with_line_width(self.line_width().div_euclid(factor_x));
        Ok(font.with_props(props))
    }

    /// Repeat inked pixels; with no amounts given, smear right by `bold_smear`
    pub fn smear(
        &self,
        left: Option<i32>,
        right: Option<i32>,
        up: Option<i32>,
        down: Option<i32>,
    ) -> Result<Font, BitfontError> {
        self.smear_with(left, right, up, down, MetricsOptions::default())
    }

    /// Smear, with explicit metrics handling
    pub fn smear_with(
        &self,
        left: Option<i32>,
        right: Option<i32>,
        up: Option<i32>,
        down: Option<i32>,
        options: MetricsOptions,
    ) -> Result<Font, BitfontError> {
        let right = match (left, right, up, down) {
            (None, None, None, None) => Some(self.props.get_bold_smear()),
            _ => right,
        };
        let (left, right, up, down) = (
            left.unwrap_or(0),
            right.unwrap_or(0),
            up.unwrap_or(0),
            down.unwrap_or(0),
        );
        let glyphs = self.try_for_all_glyphs(|g| g.smear_with(left, right, up, down, options))?;
        Ok(self.with_glyphs(glyphs))
    }

    /// Draw a line under every glyph; defaults from `underline_descent` and
    /// `underline_thickness`
    pub fn underline(&self, descent: Option<i32>, thickness: Option<i32>) -> Result<Font, BitfontError> {
        let descent = descent.unwrap_or_else(|| self.underline_descent());
        let thickness = thickness.unwrap_or_else(|| self.props.get_underline_thickness());
        let glyphs = self.try_for_all_glyphs(|g| g.underline(descent, thickness))?;
        Ok(self.with_glyphs(glyphs))
    }

    /// Slant every glyph; the pitch defaults to `italic_pitch`
    pub fn shear(&self, direction: ShearDirection, pitch: Option<Coord>) -> Result<Font, BitfontError> {
        let pitch = pitch.unwrap_or_else(|| self.props.get_italic_pitch());
        let glyphs = self.try_for_all_glyphs(|g| g.shear(direction, pitch, false))?;
        Ok(self.with_glyphs(glyphs))
    }

    /// Outline every glyph; the thickness defaults to `outline_thickness`
    pub fn outline(&self, thickness: Option<i32>) -> Result<Font, BitfontError> {
        let thickness = thickness.unwrap_or_else(|| self.props.get_outline_thickness());
        let glyphs = self.try_for_all_glyphs(|g| g.outline(thickness, false))?;
        Ok(self.with_glyphs(glyphs))
    }

    /// Swap ink and paper in every glyph
    pub fn invert(&self) -> Font {
        self.with_glyphs(self.for_all_glyphs(Glyph::invert))
    }

    /// Cycle the rows down and columns right in every glyph
    pub fn roll(&self, down: i32, right: i32) -> Font {
        self.with_glyphs(self.for_all_glyphs(|g| g.roll(down, right)))
    }

    /// Save the font to a file; only the native `.bitfont` JSON form is supported
    pub fn save<T: Into<std::path::PathBuf>>(&self, path: T) -> Result<(), BitfontError> {
        let path = path.into();
        if path.extension().and_then(|x| x.to_str()) == Some("bitfont") {
            let file = std::fs::File::create(&path)?;
            let mut buffer = std::io::BufWriter::new(file);
            serde_json::to_writer_pretty(&mut buffer, &self)?;
            return Ok(());
        }
        Err(BitfontError::UnknownFileType { path })
    }
}

/// Native serialised form of a font
#[derive(Debug, Clone, Serialize, Deserialize)]
struct FontRecord {
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    comments: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    properties: IndexMap<String, String>,
    #[serde(default)]
    glyphs: Vec<Glyph>,
}

impl From<Font> for FontRecord {
    fn from(font: Font) -> Self {
        FontRecord {
            comments: font.comments,
            properties: font
                .props
                .defined()
                .into_iter()
                .map(|(k, v)| (k, v.to_string()))
                .collect(),
            glyphs: font.glyphs,
        }
    }
}

impl TryFrom<FontRecord> for Font {
    type Error = BitfontError;

    fn try_from(record: FontRecord) -> Result<Self, Self::Error> {
        let mut props = FontProperties::default();
        for (key, value) in &record.properties {
            props.set_str(key, value)?;
        }
        Font::assemble(record.glyphs, props, record.comments)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::raster::{Raster, TextOptions};
    use pretty_assertions::assert_eq;

    fn glyph(text: &str, label: char) -> Glyph {
        Glyph::new(
            Raster::from_text(text, '@').unwrap(),
            GlyphProperties::default().with_shift_up(-2),
        )
        .with_labels([Label::from(label)])
    }

    fn text(glyph: &Glyph) -> String {
        glyph.as_text(TextOptions::default())
    }

    const CAP_X: &str = "....\n@..@\n@..@\n.@@.\n.@@.\n@..@\n@..@\n....\n";
    const SMALL_X: &str = "....\n....\n....\n@..@\n.@@.\n@..@\n....\n....\n";

    fn sample() -> Font {
        let space = Glyph::new(
            Raster::blank(4, 8),
            GlyphProperties::default().with_shift_up(-2),
        )
        .with_labels([Label::from(' ')]);
        Font::from_glyphs([space, glyph(CAP_X, 'X'), glyph(SMALL_X, 'x')])
    }

    #[test]
    fn test_derived_metrics() {
        let font = sample();
        assert_eq!(font.ink_bounds(), Bounds::new(0, -1, 4, 5));
        assert_eq!(font.raster(), Bounds::new(0, -2, 4, 6));
        assert_eq!(font.raster_size(), Coord::new(4, 8));
        assert_eq!(font.padding(), Bounds::new(0, 1, 0, 1));
        assert_eq!(font.ascent(), 5);
        assert_eq!(font.descent(), 1);
        assert_eq!(font.pixel_size(), 6);
        assert_eq!(font.line_height(), 8);
        assert_eq!(font.leading(), 2);
        assert_eq!(font.spacing(), Spacing::CharacterCell);
        assert_eq!(font.cell_size(), Coord::new(4, 8));
        assert_eq!(font.cap_height(), 6);
        assert_eq!(font.x_height(), 3);
        assert_eq!(font.cap_width(), 4);
        assert_eq!(font.digit_width(), 0);
        assert_eq!(font.average_width(), 4.0);
        assert_eq!(font.small_cap_size(), 4);
        assert_eq!(font.word_space(), 4);
        assert_eq!(font.min_word_space(), 3);
        assert_eq!(font.max_word_space(), 6);
        assert_eq!(font.superscript_size(), 4);
        assert_eq!(font.subscript_offset(), Coord::new(0, 2));
        assert_eq!(font.underline_descent(), 2);
        assert_eq!(font.point_size(), 6);
        assert_eq!(font.dpi(), Coord::new(72, 72));
        assert_eq!(font.default_char(), Label::Char(Char::default()));
        assert!(!font.has_vertical_metrics());
    }

    #[test]
    fn test_overridden_metrics() {
        let font = sample()
            .modify([("leading", 4), ("point_size", 12), ("pixel_aspect", 2)])
            .unwrap();
        assert_eq!(font.line_height(), 10);
        assert_eq!(font.dpi(), Coord::new(36, 36));
        assert_eq!(font.get("leading").unwrap(), Value::Int(4));
        // pixel size cannot be set
        let font = font.modify([("pixel_size", 20)]).unwrap();
        assert_eq!(font.pixel_size(), 6);
    }

    #[test]
    fn test_names() {
        let font = sample();
        assert_eq!(font.name(), "4x8");
        let font = font
            .modify([
                ("source_name", "fonts/my_font.yaff"),
                ("weight", "bold"),
                ("setwidth", "semi-condensed"),
            ])
            .unwrap();
        assert_eq!(font.family(), "MyFont");
        assert_eq!(font.subfamily(), "Semi-Condensed Bold");
        assert_eq!(font.name(), "MyFont Semi-Condensed Bold 4x8");
        let font = font.modify([("author", "Somebody")]).unwrap();
        assert_eq!(font.foundry(), "Somebody");
        assert_eq!(
            font.modify([("source_name", "CamelCase.fon")]).unwrap().family(),
            "CamelCase"
        );
    }

    #[test]
    fn test_spacing_classes() {
        assert_eq!(Font::default().spacing(), Spacing::CharacterCell);
        let narrow = glyph("@@@@\n", 'a');
        let wide = glyph("@@@@@@@@\n", 'w');
        assert_eq!(
            Font::from_glyphs([narrow.clone()]).spacing(),
            Spacing::CharacterCell
        );
        let multi = Font::from_glyphs([narrow.clone(), wide.clone()]);
        assert_eq!(multi.spacing(), Spacing::MultiCell);
        assert_eq!(multi.cell_size(), Coord::new(4, multi.line_height()));
        let three = Font::from_glyphs([narrow.clone(), wide, glyph("@@\n", 'i')]);
        assert_eq!(three.spacing(), Spacing::Proportional);
        let mut kerning = KernTable::new();
        kerning.insert(Label::from('a'), -1);
        let kerned = narrow
            .modify([("right_kerning", Value::Kerning(kerning))])
            .unwrap();
        assert_eq!(
            Font::from_glyphs([kerned, narrow.clone()]).spacing(),
            Spacing::Proportional
        );
    }

    #[test]
    fn test_spacing_overflow() {
        let tall = glyph("@\n@\n@\n@\n", 'l');
        let font = Font::from_glyphs([tall]).modify([("line_height", 2)]).unwrap();
        assert_eq!(font.spacing(), Spacing::Monospace);
        // ink sticks out to the left of the advance
        let overhang = glyph("@.\n@.\n", 'l').modify([("left_bearing", -1)]).unwrap();
        assert_eq!(Font::from_glyphs([overhang]).spacing(), Spacing::Monospace);
    }

    #[test]
    fn test_get_glyph_missing_policies() {
        let font = sample();
        let x = font.get_glyph(&Label::from('X'), &Missing::Raise).unwrap();
        assert_eq!(text(&x), CAP_X);
        assert!(matches!(
            font.get_glyph(&Label::from('q'), &Missing::Raise),
            Err(BitfontError::GlyphNotFound { .. })
        ));
        let default = font.get_glyph(&Label::from('q'), &Missing::Default).unwrap();
        assert_eq!(default.raster_size(), Coord::new(4, 6));
        assert_eq!(default.shift_up(), -1);
        assert_eq!(text(&default), "@@@@\n".repeat(6));
        let empty = font.get_glyph(&Label::from('q'), &Missing::Empty).unwrap();
        assert_eq!(empty.advance_width(), 0);
        let fallback = Missing::Glyph(Box::new(Glyph::blank(2, 2)));
        assert_eq!(
            font.get_glyph(&Label::from('q'), &fallback).unwrap().raster_size(),
            Coord::new(2, 2)
        );
        let no_space = font.exclude(&[Label::from(' ')]);
        let space = no_space.get_glyph(&Label::from(' '), &Missing::Default).unwrap();
        assert!(space.is_blank());
    }

    #[test]
    fn test_compose_from_decomposition() {
        let mark = |text: &str, c: char, shift_up: i32| {
            Glyph::new(
                Raster::from_text(text, '@').unwrap(),
                GlyphProperties::default()
                    .with_shift_up(shift_up)
                    .with_right_bearing(-3),
            )
            .with_labels([Label::from(c)])
        };
        let u = Glyph::new(
            Raster::from_text("@.@\n@.@\n@@@\n", '@').unwrap(),
            GlyphProperties::default(),
        )
        .with_labels([Label::from('u')]);
        let font = Font::from_glyphs([u, mark("@@@", '\u{304}', 4), mark(".@.", '\u{327}', -1)]);
        // u with macron and cedilla has no precomposed form
        let label = Label::Char(Char::new("\u{16b}\u{327}"));
        let composed = font.get_glyph(&label, &Missing::Raise).unwrap();
        assert_eq!(text(&composed), "@@@\n...\n@.@\n@.@\n@@@\n.@.\n");
        assert_eq!(composed.shift_up(), -1);
        assert_eq!(composed.advance_width(), 3);
        assert!(font
            .get_glyph(&Label::Char(Char::new("\u{e9}")), &Missing::Raise)
            .is_err());
    }

    #[test]
    fn test_default_glyph_from_default_char() {
        let font = sample().modify([("default_char", "'x'")]).unwrap();
        assert_eq!(text(&font.get_default_glyph().unwrap()), SMALL_X);
    }

    #[test]
    fn test_duplicate_labels_last_wins() {
        let first = glyph("@\n", 'A');
        let second = glyph("@@\n", 'A');
        let font = Font::from_glyphs([first, second]);
        let found = font.get_glyph(&Label::from('A'), &Missing::Raise).unwrap();
        assert_eq!(found.width(), 2);
        assert_eq!(font.get_index(&Label::from('A')), Some(1));
    }

    #[test]
    fn test_encoding_aware_lookup() {
        let glyph = Glyph::blank(1, 1).with_labels([Label::from(0x41u32)]);
        let font = Font::from_glyphs([glyph]).modify([("encoding", "latin-1")]).unwrap();
        assert_eq!(font.get_index(&Label::from('A')), Some(0));
        assert_eq!(font.get_chars(), vec![&Char::new("A")]);
        assert_eq!(font.get_codepoints(), vec![&Codepoint::from_int(0x41)]);
        assert!(font.get_tags().is_empty());
    }

    #[test]
    fn test_label_from_encoding() {
        let glyphs = [0x41u32, 0x42].map(|cp| glyph("@\n", ' ').with_labels([Label::from(cp)]));
        let font = Font::from_glyphs(glyphs).modify([("encoding", "latin-1")]).unwrap();
        let labelled = font.label(&LabelOptions::default()).unwrap();
        assert_eq!(labelled.glyphs()[1].char(), Char::new("B"));
        assert_eq!(labelled.get_charmap().len(), 2);
        let unknown = font.modify([("encoding", "klingon")]).unwrap();
        assert_eq!(unknown.label(&LabelOptions::default()).unwrap(), unknown);
        let latin1 = encoder("latin-1").unwrap();
        assert!(matches!(
            font.label(&LabelOptions {
                char_from: Some(latin1),
                codepoint_from: Some(latin1),
                ..Default::default()
            }),
            Err(BitfontError::Config(_))
        ));
    }

    #[test]
    fn test_label_sets_encoding() {
        let font = Font::from_glyphs([Glyph::blank(1, 1).with_labels([Label::from('A')])]);
        let labelled = font
            .label(&LabelOptions {
                codepoint_from: encoder("ascii"),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(labelled.encoding(), "ascii");
        assert_eq!(labelled.glyphs()[0].codepoint(), Codepoint::from_int(0x41));
    }

    #[test]
    fn test_subset_and_exclude() {
        let font = sample();
        let subset = font.subset(&[Label::from('x'), Label::from('X'), Label::from('?')]);
        assert_eq!(subset.glyphs().len(), 2);
        assert_eq!(subset.glyphs()[0].char(), Char::new("X"));
        let excluded = font.exclude(&[Label::from('X')]);
        assert_eq!(excluded.glyphs().len(), 2);
        assert!(excluded.get_index(&Label::from('X')).is_none());
    }

    #[test]
    fn test_resample_relinks_references() {
        let mut kerning = KernTable::new();
        kerning.insert(Label::from(0x42u32), -1);
        let a = Glyph::blank(1, 1)
            .with_labels([Label::from(0x41u32)])
            .modify([("right_kerning", Value::Kerning(kerning))])
            .unwrap();
        let b = Glyph::blank(1, 1).with_labels([Label::from(0x42u32)]);
        let font = Font::from_glyphs([a, b])
            .modify([("encoding", "latin-1"), ("default_char", "0x41")])
            .unwrap();
        let resampled = font
            .resample(&[Label::from('B'), Label::from('A')], &Missing::Raise)
            .unwrap();
        assert_eq!(resampled.glyphs()[0].get_labels(), &[Label::from('B')]);
        assert_eq!(resampled.default_char(), Label::from('A'));
        let kerning = resampled.glyphs()[1].right_kerning();
        assert_eq!(kerning.get(&Label::from('B')), Some(-1));
        assert_eq!(kerning.len(), 1);
    }

    #[test]
    fn test_resample_encoding() {
        let font = Font::from_glyphs([glyph("@\n", 'A')]);
        let ascii = encoder("ascii").unwrap();
        let resampled = font.resample_encoding(ascii, &Missing::Empty).unwrap();
        assert_eq!(resampled.glyphs().len(), 128);
        assert_eq!(resampled.encoding(), "ascii");
        let a = resampled
            .get_glyph(&Label::from(0x41u32), &Missing::Raise)
            .unwrap();
        assert_eq!(text(&a), "@\n");
    }

    #[test]
    fn test_font_wide_glyph_metrics() {
        let mut props = FontProperties::default();
        props.set_str("shift-up", "-1").unwrap();
        props.set_str("copyright", "nobody").unwrap();
        let font = Font::new([glyph("@\n", 'a')], props).unwrap();
        assert_eq!(font.glyphs()[0].shift_up(), -3);
        assert!(font.props().extra().is_empty());
        assert_eq!(font.get("copyright").unwrap(), Value::Text("nobody".into()));
    }

    #[test]
    fn test_append_drop_and_comments() {
        let font = sample()
            .with_comment("", "global")
            .with_comment("history", "about history")
            .modify([("history", "loaded")])
            .unwrap();
        let appended = font
            .append([glyph("@\n", 'y')], "more", [("history", "converted")])
            .unwrap();
        assert_eq!(appended.glyphs().len(), 4);
        assert_eq!(appended.get_comment(""), "global\nmore");
        assert_eq!(appended.get("history").unwrap(), Value::Text("loaded\nconverted".into()));
        let dropped = appended.drop(&["history", "comment", "glyphs"]).unwrap();
        assert_eq!(dropped.get_comment(""), "");
        assert_eq!(dropped.get_comment("history"), "");
        assert!(dropped.glyphs().is_empty());
        assert!(!dropped.props().is_defined("history"));
        let commented = dropped.set_comment("", "a", false, false).set_comment("", "b", true, false);
        assert_eq!(commented.get_comment(""), "a\nb");
        assert_eq!(commented.set_comment("", "", false, true).get_comment(""), "");
    }

    #[test]
    fn test_set_property() {
        let font = sample().set_property("notice", "first", false, false).unwrap();
        let font = font.set_property("notice", "second", true, false).unwrap();
        assert_eq!(font.get("notice").unwrap(), Value::Text("first\nsecond".into()));
        let font = font.set_property("notice", "", false, true).unwrap();
        assert!(!font.props().is_defined("notice"));
        assert!(matches!(
            font.get("no_such_property"),
            Err(BitfontError::UnknownProperty { .. })
        ));
    }

    #[test]
    fn test_direction_and_line_metrics() {
        let font = sample().modify([("direction", "left-to-right")]).unwrap();
        assert_eq!(font.mirror().direction(), "right-to-left");
        assert_eq!(font.mirror().mirror().direction(), "left-to-right");
        let transposed = font.transpose();
        assert_eq!(transposed.direction(), "top-to-bottom");
        assert!(transposed.props().line_width().is_some());
        assert_eq!(transposed.flip().direction(), "bottom-to-top");
    }

    #[test]
    fn test_resizing_pins_line_height() {
        let font = sample();
        let cropped = font.crop(0, 1, 0, 1).unwrap();
        assert_eq!(cropped.line_height(), 8);
        assert_eq!(cropped.glyphs()[1].raster_size(), Coord::new(4, 6));
        let reduced = font.reduce().unwrap();
        assert_eq!(reduced.line_height(), 8);
        assert_eq!(reduced.ink_bounds(), font.ink_bounds());
        let stretched = font.stretch(2, 2).unwrap();
        assert_eq!(stretched.line_height(), 16);
        assert_eq!(stretched.shrink(2, 2, false).unwrap().line_height(), 8);
    }

    #[test]
    fn test_effects_use_font_defaults() {
        let font = sample();
        let bold = font.smear(None, None, None, None).unwrap();
        assert_eq!(bold.glyphs()[1].raster_size(), Coord::new(5, 8));
        assert_eq!(bold.glyphs()[1].advance_width(), 4);
        let underlined = font.underline(None, None).unwrap();
        assert_eq!(underlined.glyphs()[0].ink_bounds(), Bounds::new(0, -2, 4, -1));
        let italic = font.shear(ShearDirection::Right, None).unwrap();
        assert_eq!(italic.glyphs()[1].raster_size(), Coord::new(11, 8));
        let outlined = font.outline(None).unwrap();
        assert_eq!(outlined.glyphs()[1].bounding_box(), Coord::new(6, 8));
    }

    #[test]
    fn test_equalise_horizontal() {
        let low = glyph("@\n", 'a').modify([("shift_up", -3), ("right_bearing", 1)]).unwrap();
        let high = glyph("@\n", 'b').modify([("shift_up", 1), ("left_bearing", -1)]).unwrap();
        let font = Font::from_glyphs([low, high]).modify([("line_height", 6)]).unwrap();
        let equalised = font.equalise_horizontal().unwrap();
        for glyph in equalised.glyphs() {
            assert_eq!(glyph.shift_up(), -3);
            assert_eq!(glyph.height(), 6);
            assert!(glyph.right_bearing() <= 0);
        }
        assert_eq!(equalised.glyphs()[0].width(), 2);
        assert_eq!(equalised.glyphs()[1].left_bearing(), -1);
    }

    #[test]
    fn test_frozen() {
        let font = sample();
        let mut props = font.props().clone();
        assert!(matches!(
            props.set_str("ascent", "3"),
            Err(BitfontError::ImmutableState { .. })
        ));
        assert_eq!(font.ascent(), 5);
    }

    #[test]
    fn test_spacing_parse() {
        assert_eq!("multi-cell".parse::<Spacing>().unwrap(), Spacing::MultiCell);
        assert_eq!(Spacing::CharacterCell.to_string(), "character-cell");
        assert!("wide".parse::<Spacing>().is_err());
        assert_eq!("Default".parse::<Missing>().unwrap(), Missing::Default);
    }

    #[test]
    fn test_extension_property_spellings() {
        let font = sample().modify([("my-prop", "x")]).unwrap();
        assert_eq!(font.get("my_prop").unwrap(), Value::Text("x".into()));
        assert_eq!(font.get("my-prop").unwrap(), Value::Text("x".into()));
        let font = font.modify([("my_prop", "y")]).unwrap();
        assert_eq!(font.props().extra().len(), 1);
        assert_eq!(font.props().extra().get("my-prop").unwrap(), "y");
        let dropped = font.drop(&["my_prop"]).unwrap();
        assert!(dropped.props().extra().is_empty());
        assert_eq!(
            font,
            sample().modify([("my_prop", "y")]).unwrap()
        );
    }

    #[test]
    fn test_cached_derivations() {
        let font = sample();
        assert_eq!(font.max_width(), 4);
        assert_eq!(font.cell_size(), Coord::new(4, 8));
        assert_eq!(font.cell_size(), Coord::new(4, 8));
        let wider = font.modify([("max_width", "9")]).unwrap();
        assert_eq!(wider.max_width(), 9);
        assert_eq!(font.max_width(), 4);
        let appended = font.append([glyph("@@@@@@\n", 'w')], "", [("history", "")]).unwrap();
        assert_eq!(appended.max_width(), 6);
    }
}
