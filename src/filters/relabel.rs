use crate::{encoding::encoder, filters::FontFilter, glyph::LabelOptions};

/// A filter that labels glyphs from a built-in encoding
///
/// Glyphs with a codepoint get a character label and vice versa; existing
/// labels are kept.
pub struct Relabel(String);

impl Relabel {
    /// Create a new Relabel filter
    pub fn new(encoding: impl Into<String>) -> Self {
        Relabel(encoding.into())
    }
}

impl FontFilter for Relabel {
    fn apply(&self, font: &mut crate::Font) -> Result<(), crate::BitfontError> {
        log::info!("Labelling glyphs from encoding {}", self.0);
        let source = encoder(&self.0).ok_or_else(|| {
            crate::BitfontError::FilterError(format!("Unknown encoding: {}", self.0))
        })?;
        *font = font
            .label(&LabelOptions {
                char_from: Some(source),
                ..Default::default()
            })?
            .label(&LabelOptions {
                codepoint_from: Some(source),
                ..Default::default()
            })?;
        Ok(())
    }

    fn from_str(s: &str) -> Result<Self, crate::BitfontError>
    where
        Self: Sized,
    {
        if encoder(s).is_none() {
            return Err(crate::BitfontError::FilterError(format!(
                "Unknown encoding: {}",
                s
            )));
        }
        Ok(Relabel::new(s.trim()))
    }

    #[cfg(feature = "cli")]
    fn arg() -> clap::Arg
    where
        Self: Sized,
    {
        clap::Arg::new("label")
            .long("label")
            .value_name("ENCODING")
            .help("Add character and codepoint labels from a built-in encoding")
            .action(clap::ArgAction::Append)
    }
}
