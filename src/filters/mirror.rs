use crate::filters::FontFilter;

#[derive(Default)]
/// A filter that reverses all glyphs horizontally
pub struct Mirror;

impl Mirror {
    /// Create a new Mirror filter
    pub fn new() -> Self {
        Mirror
    }
}

impl FontFilter for Mirror {
    fn apply(&self, font: &mut crate::Font) -> Result<(), crate::BitfontError> {
        log::info!("Mirroring glyphs");
        *font = font.mirror();
        Ok(())
    }

    fn from_str(_s: &str) -> Result<Self, crate::BitfontError>
    where
        Self: Sized,
    {
        Ok(Mirror::new())
    }

    #[cfg(feature = "cli")]
    fn arg() -> clap::Arg
    where
        Self: Sized,
    {
        clap::Arg::new("mirror")
            .long("mirror")
            .help("Reverse glyphs horizontally")
            .action(clap::ArgAction::SetTrue)
    }
}
