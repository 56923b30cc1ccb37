use crate::filters::FontFilter;

/// A filter that keeps every n-th column and row of every glyph
///
/// Fails if pixels that differ would be merged, unless forced.
pub struct Shrink {
    factor_x: i32,
    factor_y: i32,
    force: bool,
}

impl Shrink {
    /// Create a new Shrink filter
    pub fn new(factor_x: i32, factor_y: i32, force: bool) -> Self {
        Shrink {
            factor_x,
            factor_y,
            force,
        }
    }
}

impl FontFilter for Shrink {
    fn apply(&self, font: &mut crate::Font) -> Result<(), crate::BitfontError> {
        log::info!(
            "Shrinking glyphs by {}x{}{}",
            self.factor_x,
            self.factor_y,
            if self.force { " (forced)" } else { "" }
        );
        *font = font.shrink(self.factor_x, self.factor_y, self.force)?;
        Ok(())
    }

    fn from_str(s: &str) -> Result<Self, crate::BitfontError>
    where
        Self: Sized,
    {
        let (factors, force) = match s.trim().strip_suffix("force") {
            Some(rest) => (rest.trim_end().trim_end_matches(','), true),
            None => (s, false),
        };
        let factors = super::parse_ints("shrink", factors, 2)?;
        Ok(Shrink::new(factors[0], factors[1], force))
    }

    #[cfg(feature = "cli")]
    fn arg() -> clap::Arg
    where
        Self: Sized,
    {
        clap::Arg::new("shrink")
            .long("shrink")
            .value_name("X,Y[,force]")
            .help("Keep every X-th column and Y-th row; add `force` to allow losing pixels")
            .action(clap::ArgAction::Append)
    }
}
