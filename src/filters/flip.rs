use crate::filters::FontFilter;

#[derive(Default)]
/// A filter that reverses all glyphs vertically
pub struct Flip;

impl Flip {
    /// Create a new Flip filter
    pub fn new() -> Self {
        Flip
    }
}

impl FontFilter for Flip {
    fn apply(&self, font: &mut crate::Font) -> Result<(), crate::BitfontError> {
        log::info!("Flipping glyphs");
        *font = font.flip();
        Ok(())
    }

    fn from_str(_s: &str) -> Result<Self, crate::BitfontError>
    where
        Self: Sized,
    {
        Ok(Flip::new())
    }

    #[cfg(feature = "cli")]
    fn arg() -> clap::Arg
    where
        Self: Sized,
    {
        clap::Arg::new("flip")
            .long("flip")
            .help("Reverse glyphs vertically")
            .action(clap::ArgAction::SetTrue)
    }
}
