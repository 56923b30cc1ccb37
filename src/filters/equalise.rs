use crate::filters::FontFilter;

#[derive(Default)]
/// A filter that pads glyphs to a common height and baseline
pub struct EqualiseHorizontal;

impl EqualiseHorizontal {
    /// Create a new EqualiseHorizontal filter
    pub fn new() -> Self {
        EqualiseHorizontal
    }
}

impl FontFilter for EqualiseHorizontal {
    fn apply(&self, font: &mut crate::Font) -> Result<(), crate::BitfontError> {
        log::info!("Equalising glyph rasters");
        *font = font.equalise_horizontal()?;
        Ok(())
    }

    fn from_str(_s: &str) -> Result<Self, crate::BitfontError>
    where
        Self: Sized,
    {
        Ok(EqualiseHorizontal::new())
    }

    #[cfg(feature = "cli")]
    fn arg() -> clap::Arg
    where
        Self: Sized,
    {
        clap::Arg::new("equalise")
            .long("equalise-horizontal")
            .help("Pad glyphs to the line height and a common baseline")
            .action(clap::ArgAction::SetTrue)
    }
}
