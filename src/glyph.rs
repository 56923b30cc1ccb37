//! Glyphs: a raster together with metrics, labels and a comment
//!
//! A [`Glyph`] is an immutable value. Every operation returns a new glyph;
//! geometric transformations adjust the metrics so that the glyph renders at
//! the same position with the same advance, unless told otherwise through
//! [`MetricsOptions`].

use std::sync::OnceLock;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{
    encoding::{is_blank, is_graphical, Encoder, Tagger},
    geometry::{Bounds, Coord},
    kerning::KernTable,
    label::{Char, Codepoint, Label, Tag},
    properties::{extend_string, normalize_name, Value},
    raster::{
        Alignment, AsBytesOptions, BitOrder, FromBytesOptions, OverlayOperator,
        Raster, ShearDirection, TextOptions,
    },
    serde_helpers::{raster_de, raster_ser},
    stroke::StrokePath,
    BitfontError,
};

crate::property_set! {
    /// Recognised glyph properties
    pub struct GlyphProperties {
        /// Offset from the pen position to the left edge of the raster
        left_bearing: i32 = 0,
        /// Offset from the right edge of the raster to the next pen position
        right_bearing: i32 = 0,
        /// Offset from the baseline to the bottom edge of the raster
        shift_up: i32 = 0,
        /// Kerning with the glyph to the right
        right_kerning: KernTable = KernTable::new(),
        /// Kerning with the glyph to the left
        left_kerning: KernTable = KernTable::new(),
        /// Offset from the pen position to the top edge, in vertical writing
        top_bearing: i32 = 0,
        /// Offset from the bottom edge to the next pen position, in vertical writing
        bottom_bearing: i32 = 0,
        /// Offset from the central axis to the left edge, in vertical writing
        shift_left: i32 = 0,
        /// Stroke path for stroke fonts
        path: StrokePath = StrokePath::default(),
        // writable: the advance width unless set
        scalable_width: f64 = 0.0,
        // writable: the advance height unless set
        scalable_height: f64 = 0.0,
    }
    computed: [
        advance_width, advance_height, width, height, ink_bounds,
        bounding_box, padding, raster, raster_size,
    ]
}

/// How a transformation treats the glyph metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsOptions {
    /// Adjust metrics so the transformation does not move the glyph (default: true)
    pub adjust_metrics: bool,
    /// Also adjust vertical metrics if the glyph has none yet (default: false)
    pub create_vertical_metrics: bool,
}

impl Default for MetricsOptions {
    fn default() -> Self {
        MetricsOptions {
            adjust_metrics: true,
            create_vertical_metrics: false,
        }
    }
}

impl MetricsOptions {
    /// Adjust metrics, creating vertical metrics if requested
    pub fn vertical(create_vertical_metrics: bool) -> Self {
        MetricsOptions {
            adjust_metrics: true,
            create_vertical_metrics,
        }
    }
}

/// Where [`Glyph::label`] and [`Font::label`](crate::Font::label) take labels from.
///
/// At most one source may be given per call.
#[derive(Clone, Copy)]
pub struct LabelOptions<'a> {
    /// Encoder used to set codepoint labels
    pub codepoint_from: Option<&'a dyn Encoder>,
    /// Encoder used to set char labels
    pub char_from: Option<&'a dyn Encoder>,
    /// Tagger used to set tag labels
    pub tag_from: Option<&'a dyn Tagger>,
    /// Tagger used to set the comment
    pub comment_from: Option<&'a dyn Tagger>,
    /// Replace existing labels of the same kind
    pub overwrite: bool,
    /// Do not give blank glyphs a non-whitespace char label
    pub match_whitespace: bool,
    /// Do not give inked glyphs a non-graphical char label
    pub match_graphical: bool,
}

impl Default for LabelOptions<'_> {
    fn default() -> Self {
        LabelOptions {
            codepoint_from: None,
            char_from: None,
            tag_from: None,
            comment_from: None,
            overwrite: false,
            match_whitespace: true,
            match_graphical: true,
        }
    }
}

impl LabelOptions<'_> {
    pub(crate) fn check(&self) -> Result<(), BitfontError> {
        let given = [
            self.codepoint_from.is_some(),
            self.char_from.is_some(),
            self.tag_from.is_some(),
            self.comment_from.is_some(),
        ];
        if given.iter().filter(|&&g| g).count() > 1 {
            return Err(BitfontError::Config(
                "Can only set one of character, codepoint, tag or comment with one label() call. \
                 Use separate calls to set more."
                    .to_string(),
            ));
        }
        Ok(())
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.codepoint_from.is_none()
            && self.char_from.is_none()
            && self.tag_from.is_none()
            && self.comment_from.is_none()
    }
}

/// A single glyph: pixels, metrics, labels and a comment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "GlyphRecord", into = "GlyphRecord")]
pub struct Glyph {
    pixels: Raster,
    props: GlyphProperties,
    labels: Vec<Label>,
    comment: String,
    padding: OnceLock<Bounds>,
}

impl Default for Glyph {
    fn default() -> Self {
        Glyph::new(Raster::default(), GlyphProperties::default())
    }
}

impl PartialEq for Glyph {
    /// Glyphs are equal if their pixels and all their properties agree.
    /// Labels and comments are not compared.
    fn eq(&self, other: &Self) -> bool {
        if (self.width(), self.height()) != (other.width(), other.height()) {
            return false;
        }
        let names = self
            .props
            .defined()
            .into_iter()
            .chain(other.props.defined())
            .map(|(name, _)| name);
        for name in names {
            match (self.get(&name), other.get(&name)) {
                (Ok(a), Ok(b)) if a == b => {}
                _ => return false,
            }
        }
        self.pixels.as_matrix(1u8, 0u8) == other.pixels.as_matrix(1u8, 0u8)
    }
}

impl Glyph {
    /// Create a glyph from a raster and properties
    pub fn new(pixels: Raster, props: GlyphProperties) -> Glyph {
        Glyph {
            pixels,
            props: props.freeze(),
            labels: vec![],
            comment: String::new(),
            padding: OnceLock::new(),
        }
    }

    /// Create an uninked glyph
    pub fn blank(width: usize, height: usize) -> Glyph {
        Glyph::new(Raster::blank(width, height), GlyphProperties::default())
    }

    /// Create a glyph from packed bytes
    pub fn from_bytes(bytes: &[u8], options: FromBytesOptions) -> Result<Glyph, BitfontError> {
        Ok(Glyph::new(
            Raster::from_bytes(bytes, options)?,
            GlyphProperties::default(),
        ))
    }

    /// Create a glyph from a hex string
    pub fn from_hex(
        hex: &str,
        width: usize,
        height: Option<usize>,
        align: Alignment,
    ) -> Result<Glyph, BitfontError> {
        Ok(Glyph::new(
            Raster::from_hex(hex, width, height, align)?,
            GlyphProperties::default(),
        ))
    }

    /// Create a glyph from a flat sequence of bits
    pub fn from_vector(
        bits: &[u8],
        stride: usize,
        width: Option<usize>,
        align: Alignment,
    ) -> Result<Glyph, BitfontError> {
        Ok(Glyph::new(
            Raster::from_vector(bits, stride, width, None, align)?,
            GlyphProperties::default(),
        ))
    }

    /// Draw a stroke path and create a glyph with matching bearings.
    ///
    /// The advance width defaults to the right edge of the path.
    pub fn from_path(path: StrokePath, advance_width: Option<i32>) -> Glyph {
        let bounds = path.bounds();
        let advance_width = advance_width.unwrap_or(bounds.right);
        let pixels = path.draw();
        let props = GlyphProperties::default()
            .with_right_bearing(advance_width - bounds.right)
            .with_left_bearing(bounds.left)
            .with_shift_up(bounds.bottom)
            .with_path(path);
        Glyph::new(pixels, props)
    }

    // copy-on-write

    fn rebuild(&self, pixels: Raster, props: GlyphProperties) -> Glyph {
        Glyph {
            pixels,
            props: props.freeze(),
            labels: self.labels.clone(),
            comment: self.comment.clone(),
            padding: OnceLock::new(),
        }
    }

    fn with_props(&self, props: GlyphProperties) -> Glyph {
        Glyph {
            props: props.freeze(),
            ..self.clone()
        }
    }

    /// A copy with different pixels
    pub fn with_pixels(&self, pixels: Raster) -> Glyph {
        self.rebuild(pixels, self.props.clone())
    }

    /// A copy with the labels replaced. Empty labels are dropped.
    pub fn with_labels(mut self, labels: impl IntoIterator<Item = Label>) -> Glyph {
        self.labels = labels.into_iter().filter(|l| !l.is_empty()).collect();
        self
    }

    /// A copy with the comment replaced
    pub fn with_comment(mut self, comment: impl Into<String>) -> Glyph {
        self.comment = comment.into();
        self
    }

    fn replace_label(mut self, kind: fn(&Label) -> bool, label: Option<Label>) -> Glyph {
        self.labels.retain(|l| !kind(l));
        self.labels.extend(label.filter(|l| !l.is_empty()));
        self
    }

    /// A copy with the char label replaced; an empty char removes it
    pub fn with_char(self, char: Char) -> Glyph {
        self.replace_label(|l| l.as_char().is_some(), Some(Label::Char(char)))
    }

    /// A copy with the codepoint label replaced; an empty codepoint removes it
    pub fn with_codepoint(self, codepoint: Codepoint) -> Glyph {
        self.replace_label(|l| l.as_codepoint().is_some(), Some(Label::Codepoint(codepoint)))
    }

    /// A copy with the tag label replaced; an empty tag removes it
    pub fn with_tag(self, tag: Tag) -> Glyph {
        self.replace_label(|l| l.as_tag().is_some(), Some(Label::Tag(tag)))
    }

    /// A copy with properties overridden.
    ///
    /// Values are converted to the declared types; unknown names are kept
    /// as extension properties.
    pub fn modify<K: AsRef<str>, V: Into<Value>>(
        &self,
        properties: impl IntoIterator<Item = (K, V)>,
    ) -> Result<Glyph, BitfontError> {
        let mut props = self.props.thawed();
        for (key, value) in properties {
            props.set_value(key.as_ref(), value.into())?;
        }
        Ok(self.with_props(props))
    }

    /// A copy with the comment and properties extended by a line each.
    ///
    /// Properties that are not yet defined are set. A `history` property is
    /// not carried over.
    pub fn append<K: AsRef<str>, V: AsRef<str>>(
        &self,
        comment: &str,
        properties: impl IntoIterator<Item = (K, V)>,
    ) -> Result<Glyph, BitfontError> {
        let mut props = self.props.thawed();
        for (key, value) in properties {
            let (key, value) = (key.as_ref(), value.as_ref());
            if normalize_name(key) == "history" {
                log::debug!("Ignoring glyph history {:?}", value);
                continue;
            }
            let value = match props.get_defined(key) {
                Some(existing) => extend_string(&existing.to_string(), value),
                None => value.to_string(),
            };
            props.set_str(key, &value)?;
        }
        let comment = extend_string(&self.comment, comment);
        Ok(self.with_props(props).with_comment(comment))
    }

    /// A copy with `pixels`, `labels`, `comment` or named properties removed
    pub fn drop(&self, names: &[&str]) -> Result<Glyph, BitfontError> {
        let mut glyph = self.clone();
        let mut props = self.props.thawed();
        for &name in names {
            match name {
                "pixels" => glyph = glyph.with_pixels(Raster::blank(0, 0)),
                "labels" => glyph.labels.clear(),
                "comment" => glyph.comment.clear(),
                name => props.unset(name)?,
            }
        }
        Ok(glyph.with_props(props))
    }

    /// Set labels or the comment from an encoder or tagger.
    ///
    /// Fails with [`BitfontError::Config`] if more than one source is given.
    pub fn label(&self, options: &LabelOptions) -> Result<Glyph, BitfontError> {
        options.check()?;
        let labels = &self.labels;
        if let Some(encoder) = options.codepoint_from {
            if options.overwrite || self.codepoint().is_empty() {
                let codepoint = encoder.codepoint(labels).unwrap_or_default();
                return Ok(self.clone().with_codepoint(codepoint));
            }
        }
        if let Some(encoder) = options.char_from {
            if options.overwrite || self.char().is_empty() {
                let char = encoder.char(labels).unwrap_or_default();
                if !char.is_empty() {
                    if options.match_whitespace && self.is_blank() && !is_blank(char.value()) {
                        return Ok(self.clone());
                    }
                    if options.match_graphical && !self.is_blank() && !is_graphical(char.value()) {
                        return Ok(self.clone());
                    }
                }
                return Ok(self.clone().with_char(char));
            }
        }
        if let Some(tagger) = options.tag_from {
            if options.overwrite || self.tags().is_empty() {
                return Ok(self.clone().with_tag(tagger.tag(labels)));
            }
        }
        if let Some(tagger) = options.comment_from {
            return Ok(self.clone().with_comment(tagger.comment(labels)));
        }
        Ok(self.clone())
    }

    // property access

    /// The property set
    pub fn props(&self) -> &GlyphProperties {
        &self.props
    }

    /// The comment
    pub fn comment(&self) -> &str {
        &self.comment
    }

    /// The labels, in order
    pub fn get_labels(&self) -> &[Label] {
        &self.labels
    }

    /// The char labels
    pub fn chars(&self) -> Vec<&Char> {
        self.labels.iter().filter_map(Label::as_char).collect()
    }

    /// The codepoint labels
    pub fn codepoints(&self) -> Vec<&Codepoint> {
        self.labels.iter().filter_map(Label::as_codepoint).collect()
    }

    /// The tag labels
    pub fn tags(&self) -> Vec<&Tag> {
        self.labels.iter().filter_map(Label::as_tag).collect()
    }

    /// The first char label, or an empty char
    pub fn char(&self) -> Char {
        self.chars().first().map(|&c| c.clone()).unwrap_or_default()
    }

    /// The first codepoint label, or an empty codepoint
    pub fn codepoint(&self) -> Codepoint {
        self.codepoints().first().map(|&c| c.clone()).unwrap_or_default()
    }

    /// Value of any property by name, including the computed ones.
    ///
    /// Fails with [`BitfontError::UnknownProperty`] for names that are neither
    /// in the schema nor defined as extension properties.
    pub fn get(&self, name: &str) -> Result<Value, BitfontError> {
        Ok(match normalize_name(name).as_str() {
            "advance_width" => self.advance_width().into(),
            "advance_height" => self.advance_height().into(),
            "width" => self.width().into(),
            "height" => self.height().into(),
            "ink_bounds" => self.ink_bounds().into(),
            "bounding_box" => self.bounding_box().into(),
            "padding" => self.padding().into(),
            "raster" => self.raster().into(),
            "raster_size" => self.raster_size().into(),
            "scalable_width" => self.scalable_width().into(),
            "scalable_height" => self.scalable_height().into(),
            _ => match self.props.get_defined(name) {
                Some(value) => value,
                None => GlyphProperties::get_default(name)?,
            },
        })
    }

    /// Offset from the pen position to the left edge of the raster
    pub fn left_bearing(&self) -> i32 {
        self.props.get_left_bearing()
    }

    /// Offset from the right edge of the raster to the next pen position
    pub fn right_bearing(&self) -> i32 {
        self.props.get_right_bearing()
    }

    /// Offset from the baseline to the bottom of the raster
    pub fn shift_up(&self) -> i32 {
        self.props.get_shift_up()
    }

    /// Vertical-writing offset from the pen position to the top of the raster
    pub fn top_bearing(&self) -> i32 {
        self.props.get_top_bearing()
    }

    /// Vertical-writing offset from the bottom of the raster to the next pen position
    pub fn bottom_bearing(&self) -> i32 {
        self.props.get_bottom_bearing()
    }

    /// Vertical-writing offset from the central axis to the left of the raster
    pub fn shift_left(&self) -> i32 {
        self.props.get_shift_left()
    }

    /// Kerning with the glyph to the right
    pub fn right_kerning(&self) -> KernTable {
        self.props.get_right_kerning()
    }

    /// Kerning with the glyph to the left
    pub fn left_kerning(&self) -> KernTable {
        self.props.get_left_kerning()
    }

    /// Stroke path, empty for bitmap glyphs
    pub fn path(&self) -> StrokePath {
        self.props.get_path()
    }

    /// Advance width including bearings
    pub fn advance_width(&self) -> i32 {
        self.left_bearing() + self.width() + self.right_bearing()
    }

    /// Advance height including bearings
    pub fn advance_height(&self) -> i32 {
        self.top_bearing() + self.height() + self.bottom_bearing()
    }

    /// Overridable fractional advance width
    pub fn scalable_width(&self) -> f64 {
        self.props
            .scalable_width()
            .unwrap_or_else(|| self.advance_width() as f64)
    }

    /// Overridable fractional advance height
    pub fn scalable_height(&self) -> f64 {
        self.props
            .scalable_height()
            .unwrap_or_else(|| self.advance_height() as f64)
    }

    /// Raster width
    pub fn width(&self) -> i32 {
        self.pixels.width() as i32
    }

    /// Raster height
    pub fn height(&self) -> i32 {
        self.pixels.height() as i32
    }

    /// Offsets from the raster edges to the ink: left, bottom, right, top
    pub fn padding(&self) -> Bounds {
        *self.padding.get_or_init(|| self.pixels.padding())
    }

    /// Tightest box around the ink, relative to the origin.
    ///
    /// All zeros for a glyph without ink.
    pub fn ink_bounds(&self) -> Bounds {
        let (raster, padding) = (self.raster(), self.padding());
        let bounds = Bounds::new(
            raster.left + padding.left,
            raster.bottom + padding.bottom,
            raster.right - padding.right,
            raster.top - padding.top,
        );
        if bounds.left == bounds.right || bounds.top == bounds.bottom {
            return Bounds::default();
        }
        bounds
    }

    /// Dimensions of the ink bounds
    pub fn bounding_box(&self) -> Coord {
        self.ink_bounds().size()
    }

    /// Raster edges relative to the origin
    pub fn raster(&self) -> Bounds {
        Bounds::new(
            self.left_bearing(),
            self.shift_up(),
            self.left_bearing() + self.width(),
            self.shift_up() + self.height(),
        )
    }

    /// Raster dimensions
    pub fn raster_size(&self) -> Coord {
        Coord::new(self.width(), self.height())
    }

    /// True if any vertical metric is set to a nonzero value
    pub fn has_vertical_metrics(&self) -> bool {
        [
            self.props.top_bearing(),
            self.props.bottom_bearing(),
            self.props.shift_left(),
        ]
        .iter()
        .any(|v| v.is_some_and(|v| v != 0))
    }

    fn vertical(&self, options: MetricsOptions) -> bool {
        options.create_vertical_metrics || self.has_vertical_metrics()
    }

    // conversion

    /// The pixel raster
    pub fn pixels(&self) -> &Raster {
        &self.pixels
    }

    /// True if the glyph has no ink
    pub fn is_blank(&self) -> bool {
        self.pixels.is_blank()
    }

    /// Rows of user-specified ink and paper values
    pub fn as_matrix<T: Clone>(&self, ink: T, paper: T) -> Vec<Vec<T>> {
        self.pixels.as_matrix(ink, paper)
    }

    /// Flat sequence of user-specified ink and paper values
    pub fn as_vector<T: Clone>(&self, ink: T, paper: T) -> Vec<T> {
        self.pixels.as_vector(ink, paper)
    }

    /// Flat bytes with a byte sequence for each ink and paper pixel
    pub fn as_bits(&self, ink: &[u8], paper: &[u8]) -> Vec<u8> {
        self.pixels.as_bits(ink, paper)
    }

    /// Text rendering
    pub fn as_text(&self, options: TextOptions) -> String {
        self.pixels.as_text(options)
    }

    /// Block element rendering
    pub fn as_blocks(&self, resolution: Coord) -> Result<String, BitfontError> {
        self.pixels.as_blocks(resolution)
    }

    /// Rows of packed bytes
    pub fn as_byterows(&self, align: Alignment) -> Vec<Vec<u8>> {
        self.pixels.as_byterows(align, BitOrder::Big)
    }

    /// Flat packed bytes
    pub fn as_bytes(&self, options: AsBytesOptions) -> Result<Vec<u8>, BitfontError> {
        self.pixels.as_bytes(options)
    }

    /// Packed bytes as hex
    pub fn as_hex(&self, align: Alignment) -> Result<String, BitfontError> {
        self.pixels.as_hex(align)
    }

    // orthogonal transformations

    /// Reverse horizontally
    pub fn mirror(&self) -> Glyph {
        self.mirror_with(MetricsOptions::default())
    }

    /// Reverse horizontally, with explicit metrics handling
    pub fn mirror_with(&self, options: MetricsOptions) -> Glyph {
        let pixels = self.pixels.mirror();
        let mut props = self.props.clone();
        if options.adjust_metrics {
            props = props
                .with_left_bearing(self.right_bearing())
                .with_right_bearing(self.left_bearing());
            if self.vertical(options) {
                props = props.with_shift_left(-self.shift_left());
            }
        }
        self.rebuild(pixels, props)
    }

    /// Reverse vertically
    pub fn flip(&self) -> Glyph {
        self.flip_with(MetricsOptions::default())
    }

    /// Reverse vertically, with explicit metrics handling
    pub fn flip_with(&self, options: MetricsOptions) -> Glyph {
        let pixels = self.pixels.flip();
        let mut props = self.props.clone();
        if options.adjust_metrics {
            // about the baseline
            props = props.with_shift_up(-self.height() - self.shift_up());
            if self.vertical(options) {
                props = props
                    .with_top_bearing(self.bottom_bearing())
                    .with_bottom_bearing(self.top_bearing());
            }
        }
        self.rebuild(pixels, props)
    }

    /// Swap rows and columns, exchanging horizontal and vertical metrics
    pub fn transpose(&self) -> Glyph {
        self.transpose_with(MetricsOptions::default())
    }

    /// Swap rows and columns, with explicit metrics handling
    pub fn transpose_with(&self, options: MetricsOptions) -> Glyph {
        let pixels = self.pixels.transpose();
        let mut props = self.props.clone();
        if options.adjust_metrics {
            props = props
                .with_top_bearing(self.left_bearing())
                .with_left_bearing(self.top_bearing())
                .with_right_bearing(self.bottom_bearing())
                .with_bottom_bearing(self.right_bearing())
                .with_shift_left(self.shift_up() + self.height().div_euclid(2))
                .with_shift_up(self.shift_left() - self.width().div_euclid(2));
        }
        self.rebuild(pixels, props)
    }

    /// Rotate by quarter turns; negative values turn anticlockwise
    ///
    /// Every turn is a sequence of single clockwise quarter turns, so that
    /// metrics rounded on odd raster sizes come back where they started.
    pub fn turn(&self, clockwise: i32) -> Glyph {
        (0..clockwise.rem_euclid(4)).fold(self.clone(), |glyph, _| glyph.transpose().mirror())
    }

    // raster resizing

    /// Remove columns and rows from the edges
    pub fn crop(&self, left: i32, bottom: i32, right: i32, top: i32) -> Result<Glyph, BitfontError> {
        self.crop_with(left, bottom, right, top, MetricsOptions::default())
    }

    /// Remove columns and rows from the edges, with explicit metrics handling
    pub fn crop_with(
        &self,
        left: i32,
        bottom: i32,
        right: i32,
        top: i32,
        options: MetricsOptions,
    ) -> Result<Glyph, BitfontError> {
        if [left, bottom, right, top] == [0; 4] {
            return Ok(self.clone());
        }
        let pixels = self.pixels.crop(left, bottom, right, top)?;
        let mut props = self.props.clone();
        if options.adjust_metrics {
            props = props
                .with_left_bearing(self.left_bearing() + left)
                .with_right_bearing(self.right_bearing() + right)
                .with_shift_up(self.shift_up() + bottom);
            if self.vertical(options) {
                // shift_left rounds differently for odd and even widths
                let sign = if self.width() % 2 == 1 { 1 } else { -1 };
                props = props
                    .with_top_bearing(self.top_bearing() + top)
                    .with_bottom_bearing(self.bottom_bearing() + bottom)
                    .with_shift_left(self.shift_left() + sign * (sign * (right - left)).div_euclid(2));
            }
        }
        Ok(self.rebuild(pixels, props))
    }

    /// Add blank columns and rows at the edges
    pub fn expand(&self, left: i32, bottom: i32, right: i32, top: i32) -> Result<Glyph, BitfontError> {
        self.expand_with(left, bottom, right, top, MetricsOptions::default())
    }

    /// Add blank columns and rows at the edges, with explicit metrics handling
    pub fn expand_with(
        &self,
        left: i32,
        bottom: i32,
        right: i32,
        top: i32,
        options: MetricsOptions,
    ) -> Result<Glyph, BitfontError> {
        if [left, bottom, right, top] == [0; 4] {
            return Ok(self.clone());
        }
        let pixels = self.pixels.expand(left, bottom, right, top)?;
        let mut props = self.props.clone();
        if options.adjust_metrics {
            props = props
                .with_left_bearing(self.left_bearing() - left)
                .with_right_bearing(self.right_bearing() - right)
                .with_shift_up(self.shift_up() - bottom);
            if self.vertical(options) {
                // expanding left acts on shift_left like cropping right
                let sign = if self.width() % 2 == 1 { 1 } else { -1 };
                props = props
                    .with_top_bearing(self.top_bearing() - top)
                    .with_bottom_bearing(self.bottom_bearing() - bottom)
                    .with_shift_left(self.shift_left() + sign * (sign * (left - right)).div_euclid(2));
            }
        }
        Ok(self.rebuild(pixels, props))
    }

    /// Crop to the ink bounds
    pub fn reduce(&self) -> Result<Glyph, BitfontError> {
        self.reduce_with(MetricsOptions::default())
    }

    /// Crop to the ink bounds, with explicit metrics handling
    pub fn reduce_with(&self, options: MetricsOptions) -> Result<Glyph, BitfontError> {
        let Bounds {
            left,
            bottom,
            right,
            top,
        } = self.padding();
        self.crop_with(left, bottom, right, top, options)
    }

    // scaling

    /// Repeat each column `factor_x` and each row `factor_y` times
    pub fn stretch(&self, factor_x: i32, factor_y: i32) -> Result<Glyph, BitfontError> {
        self.stretch_with(factor_x, factor_y, MetricsOptions::default())
    }

    /// Stretch, with explicit metrics handling
    pub fn stretch_with(
        &self,
        factor_x: i32,
        factor_y: i32,
        options: MetricsOptions,
    ) -> Result<Glyph, BitfontError> {
        if (factor_x, factor_y) == (1, 1) {
            return Ok(self.clone());
        }
        let pixels = self.pixels.stretch(factor_x, factor_y)?;
        let mut props = self.props.clone();
        if options.adjust_metrics {
            props = props
                .with_left_bearing(factor_x * self.left_bearing())
                .with_right_bearing(factor_x * self.right_bearing())
                .with_shift_up(factor_y * self.shift_up());
            if self.vertical(options) {
                props = props
                    .with_top_bearing(factor_y * self.top_bearing())
                    .with_bottom_bearing(factor_y * self.bottom_bearing())
                    .with_shift_left(factor_x * self.shift_left());
            }
        }
        Ok(self.rebuild(pixels, props))
    }

    /// Keep every `factor_x`-th column and `factor_y`-th row.
    ///
    /// Unless `force` is set, fails with [`BitfontError::LossyOperation`] if
    /// this would discard differing pixels.
    pub fn shrink(&self, factor_x: i32, factor_y: i32, force: bool) -> Result<Glyph, BitfontError> {
        self.shrink_with(factor_x, factor_y, force, MetricsOptions::default())
    }

    /// Shrink, with explicit metrics handling
    pub fn shrink_with(
        &self,
        factor_x: i32,
        factor_y: i32,
        force: bool,
        options: MetricsOptions,
    ) -> Result<Glyph, BitfontError> {
        if (factor_x, factor_y) == (1, 1) {
            return Ok(self.clone());
        }
        let pixels = self.pixels.shrink(factor_x, factor_y, force)?;
        let mut props = self.props.clone();
        if options.adjust_metrics {
            props = props
                .with_left_bearing(self.left_bearing().div_euclid(factor_x))
                .with_right_bearing(self.right_bearing().div_euclid(factor_x))
                .with_shift_up(self.shift_up().div_euclid(factor_y));
            if self.vertical(options) {
                props = props
                    .with_top_bearing(self.top_bearing().div_euclid(factor_y))
                    .with_bottom_bearing(self.bottom_bearing().div_euclid(factor_y))
                    .with_shift_left(self.shift_left().div_euclid(factor_x));
            }
        }
        Ok(self.rebuild(pixels, props))
    }

    // effects

    /// Slant by dislocating rows, keeping the baseline fixed.
    ///
    /// `pitch` is the slant as (x, y): x pixels across for every y pixels up.
    pub fn shear(
        &self,
        direction: ShearDirection,
        pitch: Coord,
        create_vertical_metrics: bool,
    ) -> Result<Glyph, BitfontError> {
        if pitch.y <= 0 || pitch.x < 0 {
            return Err(BitfontError::Config(format!(
                "Shear pitch must be non-negative with nonzero y, not {}",
                pitch
            )));
        }
        if self.height() == 0 {
            return Ok(self.clone());
        }
        let extra_width = (self.height() - 1) * pitch.x / pitch.y;
        // start the diagonal at the baseline
        let modulo = pitch.y - (-self.shift_up() * pitch.x).rem_euclid(pitch.y);
        let pre = (-self.shift_up() * pitch.x + modulo).div_euclid(pitch.y) - (modulo == pitch.y) as i32;
        let sign = match direction {
            ShearDirection::Right => 1,
            ShearDirection::Left => -1,
        };
        let mut props = self
            .props
            .clone()
            .with_left_bearing(self.left_bearing() - sign * pre)
            .with_right_bearing(self.right_bearing() + sign * pre);
        if create_vertical_metrics || self.has_vertical_metrics() {
            props = props.with_shift_left(self.shift_left() + sign * pre);
        }
        let work = self.with_props(props);
        let work = match direction {
            ShearDirection::Right => work.expand(0, 0, extra_width, 0)?,
            ShearDirection::Left => work.expand(extra_width, 0, 0, 0)?,
        };
        let pixels = work.pixels.shear(direction, pitch, modulo)?;
        Ok(work.with_pixels(pixels))
    }

    /// Repeat inked pixels in each direction, growing the raster as needed
    pub fn smear(&self, left: i32, right: i32, up: i32, down: i32) -> Result<Glyph, BitfontError> {
        self.smear_with(left, right, up, down, MetricsOptions::default())
    }

    /// Smear, with explicit metrics handling
    pub fn smear_with(
        &self,
        left: i32,
        right: i32,
        up: i32,
        down: i32,
        options: MetricsOptions,
    ) -> Result<Glyph, BitfontError> {
        let padding = self.padding();
        let work = self.expand_with(
            (left - padding.left).max(0),
            (down - padding.bottom).max(0),
            (right - padding.right).max(0),
            (up - padding.top).max(0),
            options,
        )?;
        let pixels = work.pixels.smear(left, right, up, down)?;
        Ok(work.with_pixels(pixels))
    }

    /// Replace the ink with an outline of the given thickness
    pub fn outline(&self, thickness: i32, create_vertical_metrics: bool) -> Result<Glyph, BitfontError> {
        let thicker = self.smear_with(
            thickness,
            thickness,
            thickness,
            thickness,
            MetricsOptions::vertical(create_vertical_metrics),
        )?;
        Glyph::overlay(&[&thicker, self], OverlayOperator::Parity)
    }

    /// Draw a line `descent` pixels below the baseline, `thickness` pixels thick
    pub fn underline(&self, descent: i32, thickness: i32) -> Result<Glyph, BitfontError> {
        let height = -self.shift_up() - descent;
        // grow downwards if the line falls below the raster, upwards if above
        let down = (thickness - height - 1).max(0);
        let up = (height - self.height() + 1).max(0);
        let work = self.expand(0, down, 0, up)?;
        let top_height = height + down;
        let bottom_height = top_height - thickness + 1;
        let pixels = work.pixels.underline(top_height, bottom_height);
        Ok(work.with_pixels(pixels))
    }

    /// Swap ink and paper
    pub fn invert(&self) -> Glyph {
        self.with_pixels(self.pixels.invert())
    }

    /// Cycle rows down and columns right
    pub fn roll(&self, down: i32, right: i32) -> Glyph {
        self.with_pixels(self.pixels.roll(down, right))
    }

    /// Superimpose glyphs, aligned by their metrics.
    ///
    /// The result has the properties, labels and comment of the first glyph.
    pub fn overlay(glyphs: &[&Glyph], operator: OverlayOperator) -> Result<Glyph, BitfontError> {
        let Some(first) = glyphs.first() else {
            return Ok(Glyph::default());
        };
        let common = glyphs
            .iter()
            .map(|g| g.raster())
            .fold(first.raster(), |acc, r| acc.union(&r));
        let expanded = glyphs
            .iter()
            .map(|g| {
                let r = g.raster();
                g.expand(
                    r.left - common.left,
                    r.bottom - common.bottom,
                    common.right - r.right,
                    common.top - r.top,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;
        let rasters = expanded.iter().map(|g| &g.pixels).collect::<Vec<_>>();
        let pixels = Raster::overlay(&rasters, operator)?;
        Ok(expanded[0].with_pixels(pixels))
    }
}

/// Native serialised form of a glyph
#[derive(Debug, Clone, Serialize, Deserialize)]
struct GlyphRecord {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    labels: Vec<Label>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    comment: String,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    properties: IndexMap<String, String>,
    // only needed when there are no rows to carry it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    width: Option<usize>,
    #[serde(default, serialize_with = "raster_ser", deserialize_with = "raster_de")]
    pixels: Raster,
}

impl From<Glyph> for GlyphRecord {
    fn from(glyph: Glyph) -> Self {
        let width = (glyph.pixels.height() == 0 && glyph.pixels.width() > 0)
            .then(|| glyph.pixels.width());
        GlyphRecord {
            properties: glyph
                .props
                .defined()
                .into_iter()
                .map(|(k, v)| (k, v.to_string()))
                .collect(),
            labels: glyph.labels,
            comment: glyph.comment,
            width,
            pixels: glyph.pixels,
        }
    }
}

impl TryFrom<GlyphRecord> for Glyph {
    type Error = BitfontError;

    fn try_from(record: GlyphRecord) -> Result<Self, Self::Error> {
        let mut props = GlyphProperties::default();
        for (key, value) in &record.properties {
            props.set_str(key, value)?;
        }
        let pixels = match record.width {
            Some(width) if record.pixels.height() == 0 => Raster::blank(width, 0),
            _ => record.pixels,
        };
        Ok(Glyph::new(pixels, props)
            .with_labels(record.labels)
            .with_comment(record.comment))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::encoding::{encoder, CharTagger};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn glyph(text: &str) -> Glyph {
        Glyph::new(Raster::from_text(text, '@').unwrap(), GlyphProperties::default())
    }

    fn text(glyph: &Glyph) -> String {
        glyph.as_text(TextOptions::default())
    }

    const ONE: &str = "\
        ..@.\n\
        .@@.\n\
        ..@.\n\
        ..@.\n\
        .@@@\n\
        ....\n";

    fn one() -> Glyph {
        glyph(ONE)
            .modify([
                ("shift_up", -1),
                ("left_bearing", 1),
                ("right_bearing", 2),
                ("top_bearing", -1),
                ("bottom_bearing", -2),
                ("shift_left", -2),
            ])
            .unwrap()
    }

    #[test]
    fn test_computed_metrics() {
        let one = one();
        assert_eq!(one.advance_width(), 7);
        assert_eq!(one.advance_height(), 3);
        assert_eq!(one.padding(), Bounds::new(1, 1, 0, 0));
        assert_eq!(one.raster(), Bounds::new(1, -1, 5, 5));
        assert_eq!(one.ink_bounds(), Bounds::new(2, 0, 5, 5));
        assert_eq!(one.bounding_box(), Coord::new(3, 5));
        assert_eq!(one.scalable_width(), 7.0);
        assert!(one.has_vertical_metrics());
        assert_eq!(Glyph::blank(3, 3).ink_bounds(), Bounds::default());
    }

    #[test]
    fn test_get_by_name() {
        let one = one();
        assert_eq!(one.get("advance-width").unwrap(), Value::Int(7));
        assert_eq!(one.get("shift_up").unwrap(), Value::Int(-1));
        assert_eq!(one.get("right_kerning").unwrap(), Value::Kerning(KernTable::new()));
        assert!(matches!(
            one.get("no_such_property"),
            Err(BitfontError::UnknownProperty { .. })
        ));
    }

    #[test]
    fn test_computed_property_not_settable() {
        let one = one();
        let modified = one.modify([("advance_width", 20)]).unwrap();
        assert_eq!(modified.advance_width(), 7);
    }

    #[test]
    fn test_mirror() {
        let mirrored = one().mirror();
        assert_eq!(mirrored.left_bearing(), 2);
        assert_eq!(mirrored.right_bearing(), 1);
        assert_eq!(mirrored.shift_left(), 2);
        assert_eq!(
            text(&mirrored),
            ".@..\n.@@.\n.@..\n.@..\n@@@.\n....\n"
        );
        assert_eq!(mirrored.mirror(), one());
    }

    #[test]
    fn test_flip() {
        let flipped = one().flip();
        assert_eq!(flipped.shift_up(), -5);
        assert_eq!(flipped.top_bearing(), -2);
        assert_eq!(flipped.bottom_bearing(), -1);
        assert_eq!(flipped.flip(), one());
    }

    #[test]
    fn test_transpose() {
        let transposed = one().transpose();
        assert_eq!(transposed.raster_size(), Coord::new(6, 4));
        assert_eq!(transposed.top_bearing(), 1);
        assert_eq!(transposed.left_bearing(), -1);
        assert_eq!(transposed.right_bearing(), -2);
        assert_eq!(transposed.bottom_bearing(), 2);
        assert_eq!(transposed.shift_left(), 2);
        assert_eq!(transposed.shift_up(), -4);
    }

    #[rstest]
    #[case(0, 0, 0, 0)]
    #[case(1, 0, 0, 0)]
    #[case(2, 1, 3, 1)]
    #[case(0, 3, 1, 2)]
    fn test_expand_crop_inverse(
        #[case] left: i32,
        #[case] bottom: i32,
        #[case] right: i32,
        #[case] top: i32,
    ) {
        let one = one();
        let expanded = one.expand(left, bottom, right, top).unwrap();
        assert_eq!(expanded.advance_width(), one.advance_width());
        assert_eq!(expanded.advance_height(), one.advance_height());
        let cropped = expanded.crop(left, bottom, right, top).unwrap();
        assert_eq!(cropped, one);
        assert_eq!(cropped.shift_left(), one.shift_left());
    }

    #[test]
    fn test_crop_negative_fails() {
        assert!(matches!(one().crop(-1, 0, 0, 0), Err(BitfontError::Config(_))));
    }

    #[test]
    fn test_reduce() {
        let reduced = one().reduce().unwrap();
        assert_eq!(text(&reduced), ".@.\n@@.\n.@.\n.@.\n@@@\n");
        assert_eq!(reduced.left_bearing(), 2);
        assert_eq!(reduced.shift_up(), 0);
        assert_eq!(reduced.advance_width(), 7);
        assert_eq!(reduced.reduce().unwrap(), reduced);
        let blank = Glyph::blank(3, 2).reduce().unwrap();
        assert_eq!(blank.raster_size(), Coord::new(0, 0));
        assert_eq!(blank.advance_width(), 3);
    }

    #[test]
    fn test_stretch_shrink() {
        let one = one();
        let stretched = one.stretch(2, 3).unwrap();
        assert_eq!(stretched.raster_size(), Coord::new(8, 18));
        assert_eq!(stretched.left_bearing(), 2);
        assert_eq!(stretched.shift_up(), -3);
        assert_eq!(stretched.shrink(2, 3, false).unwrap(), one);
        assert!(matches!(
            one.shrink(2, 1, false),
            Err(BitfontError::LossyOperation(_))
        ));
        assert!(one.shrink(2, 1, true).is_ok());
    }

    #[rstest]
    #[case(1)]
    #[case(2)]
    #[case(3)]
    fn test_turn(#[case] turns: i32) {
        let glyph = Glyph::new(
            Raster::from_text("@@.\n@..\n...\n@@@\n.@.\n", '@').unwrap(),
            GlyphProperties::default().with_shift_up(-2),
        );
        let stepwise = (0..turns).fold(glyph.clone(), |g, _| g.turn(1));
        assert_eq!(glyph.turn(turns), stepwise);
        assert_eq!(glyph.turn(turns).turn(4 - turns), glyph);
        assert_eq!(glyph.turn(turns).turn(-turns), glyph);
        assert_eq!(glyph.turn(4), glyph);
    }

    #[test]
    fn test_shear() {
        let bar = glyph("@\n@\n@\n").modify([("right_bearing", 1)]).unwrap();
        let sheared = bar.shear(ShearDirection::Right, Coord::new(1, 1), false).unwrap();
        assert_eq!(text(&sheared), "..@\n.@.\n@..\n");
        assert_eq!(sheared.advance_width(), bar.advance_width());
        assert_eq!(sheared.right_bearing(), -1);
        assert!(bar.shear(ShearDirection::Left, Coord::new(1, 0), false).is_err());
    }

    #[test]
    fn test_smear_and_outline() {
        let dot = glyph("...\n.@.\n...\n");
        let smeared = dot.smear(0, 1, 0, 0).unwrap();
        assert_eq!(text(&smeared), "...\n.@@\n...\n");
        let bold = glyph("@\n").smear(0, 1, 0, 0).unwrap();
        assert_eq!(bold.raster_size(), Coord::new(2, 1));
        assert_eq!(bold.right_bearing(), -1);
        let outlined = glyph("@\n").outline(1, false).unwrap();
        assert_eq!(text(&outlined), "@@@\n@.@\n@@@\n");
        assert_eq!(outlined.left_bearing(), -1);
        assert_eq!(outlined.shift_up(), -1);
    }

    #[test]
    fn test_underline() {
        let glyph = glyph("@.\n@.\n").modify([("shift_up", 0)]).unwrap();
        let underlined = glyph.underline(1, 1).unwrap();
        assert_eq!(text(&underlined), "@.\n@.\n@@\n");
        assert_eq!(underlined.shift_up(), -1);
    }

    #[test]
    fn test_overlay_by_metrics() {
        let base = glyph("@.\n@.\n");
        let mark = glyph("@\n").modify([("left_bearing", 1), ("shift_up", 2)]).unwrap();
        let combined = Glyph::overlay(&[&base, &mark], OverlayOperator::Any).unwrap();
        assert_eq!(text(&combined), ".@\n@.\n@.\n");
        assert_eq!(combined.raster(), Bounds::new(0, 0, 2, 3));
    }

    #[test]
    fn test_from_path() {
        let path: StrokePath = "m 1 0 l 0 2".parse().unwrap();
        let glyph = Glyph::from_path(path.clone(), Some(4));
        assert_eq!(glyph.left_bearing(), 1);
        assert_eq!(glyph.right_bearing(), 2);
        assert_eq!(glyph.advance_width(), 4);
        assert_eq!(glyph.path(), path);
    }

    #[test]
    fn test_append_and_drop() {
        let glyph = Glyph::blank(1, 1)
            .with_comment("first")
            .modify([("vendor_note", "a")])
            .unwrap();
        let appended = glyph
            .append("second", [("vendor_note", "b"), ("history", "load")])
            .unwrap();
        assert_eq!(appended.comment(), "first\nsecond");
        assert_eq!(
            appended.props().get_defined("vendor_note"),
            Some(Value::Text("a\nb".to_string()))
        );
        assert!(!appended.props().is_defined("history"));
        let dropped = appended.drop(&["comment", "vendor_note", "pixels"]).unwrap();
        assert_eq!(dropped.comment(), "");
        assert!(dropped.props().defined().is_empty());
        assert_eq!(dropped.raster_size(), Coord::new(0, 0));
    }

    #[test]
    fn test_label() {
        let latin1 = encoder("latin-1").unwrap();
        let glyph = glyph("@\n").with_labels([Label::from(0x41u32)]);
        let labelled = glyph
            .label(&LabelOptions {
                char_from: Some(latin1),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(labelled.char(), Char::new("A"));
        let tagged = labelled
            .label(&LabelOptions {
                tag_from: Some(&CharTagger),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(tagged.tags(), vec![&Tag::new("A")]);
        assert!(matches!(
            glyph.label(&LabelOptions {
                char_from: Some(latin1),
                codepoint_from: Some(latin1),
                ..Default::default()
            }),
            Err(BitfontError::Config(_))
        ));
    }

    #[test]
    fn test_label_guards() {
        let latin1 = encoder("latin-1").unwrap();
        // an inked glyph does not get a control character
        let inked = glyph("@\n").with_labels([Label::from(0x01u32)]);
        let options = LabelOptions {
            char_from: Some(latin1),
            ..Default::default()
        };
        assert!(inked.label(&options).unwrap().char().is_empty());
        // a blank glyph does not get a letter
        let blank = Glyph::blank(1, 1).with_labels([Label::from(0x41u32)]);
        assert!(blank.label(&options).unwrap().char().is_empty());
        let space = Glyph::blank(1, 1).with_labels([Label::from(0x20u32)]);
        assert_eq!(space.label(&options).unwrap().char(), Char::new(" "));
    }

    #[test]
    fn test_frozen_properties() {
        let one = one();
        let mut props = one.props().clone();
        assert!(matches!(
            props.set_str("left_bearing", "5"),
            Err(BitfontError::ImmutableState { .. })
        ));
        assert_eq!(one.left_bearing(), 1);
    }

    #[test]
    fn test_json_round_trip() {
        let one = one().with_labels([Label::from('1')]).with_comment("digit one");
        let json = serde_json::to_string(&one).unwrap();
        let back: Glyph = serde_json::from_str(&json).unwrap();
        assert_eq!(back, one);
        assert_eq!(back.get_labels(), one.get_labels());
        assert_eq!(back.comment(), "digit one");
        let empty: Glyph = serde_json::from_str(
            &serde_json::to_string(&Glyph::blank(3, 0)).unwrap(),
        )
        .unwrap();
        assert_eq!(empty.raster_size(), Coord::new(3, 0));
    }
}
