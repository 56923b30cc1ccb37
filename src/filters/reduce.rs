use crate::filters::FontFilter;

#[derive(Default)]
/// A filter that crops every glyph to its ink
pub struct Reduce;

impl Reduce {
    /// Create a new Reduce filter
    pub fn new() -> Self {
        Reduce
    }
}

impl FontFilter for Reduce {
    fn apply(&self, font: &mut crate::Font) -> Result<(), crate::BitfontError> {
        log::info!("Reducing glyphs to their ink bounds");
        *font = font.reduce()?;
        Ok(())
    }

    fn from_str(_s: &str) -> Result<Self, crate::BitfontError>
    where
        Self: Sized,
    {
        Ok(Reduce::new())
    }

    #[cfg(feature = "cli")]
    fn arg() -> clap::Arg
    where
        Self: Sized,
    {
        clap::Arg::new("reduce")
            .long("reduce")
            .help("Crop glyphs to their ink bounds")
            .action(clap::ArgAction::SetTrue)
    }
}
