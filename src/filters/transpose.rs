use crate::filters::FontFilter;

#[derive(Default)]
/// A filter that swaps the horizontal and vertical directions
pub struct Transpose;

impl Transpose {
    /// Create a new Transpose filter
    pub fn new() -> Self {
        Transpose
    }
}

impl FontFilter for Transpose {
    fn apply(&self, font: &mut crate::Font) -> Result<(), crate::BitfontError> {
        log::info!("Transposing glyphs");
        *font = font.transpose();
        Ok(())
    }

    fn from_str(_s: &str) -> Result<Self, crate::BitfontError>
    where
        Self: Sized,
    {
        Ok(Transpose::new())
    }

    #[cfg(feature = "cli")]
    fn arg() -> clap::Arg
    where
        Self: Sized,
    {
        clap::Arg::new("transpose")
            .long("transpose")
            .help("Swap horizontal and vertical directions")
            .action(clap::ArgAction::SetTrue)
    }
}
