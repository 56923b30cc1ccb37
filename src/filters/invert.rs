use crate::filters::FontFilter;

#[derive(Default)]
/// A filter that swaps ink and paper
pub struct Invert;

impl Invert {
    /// Create a new Invert filter
    pub fn new() -> Self {
        Invert
    }
}

impl FontFilter for Invert {
    fn apply(&self, font: &mut crate::Font) -> Result<(), crate::BitfontError> {
        log::info!("Inverting glyphs");
        *font = font.invert();
        Ok(())
    }

    fn from_str(_s: &str) -> Result<Self, crate::BitfontError>
    where
        Self: Sized,
    {
        Ok(Invert::new())
    }

    #[cfg(feature = "cli")]
    fn arg() -> clap::Arg
    where
        Self: Sized,
    {
        clap::Arg::new("invert")
            .long("invert")
            .help("Swap ink and paper")
            .action(clap::ArgAction::SetTrue)
    }
}
