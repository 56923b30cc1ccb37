use crate::filters::FontFilter;

/// A filter that repeats the columns and rows of every glyph
pub struct Stretch {
    factor_x: i32,
    factor_y: i32,
}

impl Stretch {
    /// Create a new Stretch filter
    pub fn new(factor_x: i32, factor_y: i32) -> Self {
        Stretch { factor_x, factor_y }
    }
}

impl FontFilter for Stretch {
    fn apply(&self, font: &mut crate::Font) -> Result<(), crate::BitfontError> {
        log::info!("Stretching glyphs by {}x{}", self.factor_x, self.factor_y);
        *font = font.stretch(self.factor_x, self.factor_y)?;
        Ok(())
    }

    fn from_str(s: &str) -> Result<Self, crate::BitfontError>
    where
        Self: Sized,
    {
        let factors = super::parse_ints("stretch", s, 2)?;
        Ok(Stretch::new(factors[0], factors[1]))
    }

    #[cfg(feature = "cli")]
    fn arg() -> clap::Arg
    where
        Self: Sized,
    {
        clap::Arg::new("stretch")
            .long("stretch")
            .value_name("X,Y")
            .help("Repeat every column X times and every row Y times")
            .action(clap::ArgAction::Append)
    }
}
