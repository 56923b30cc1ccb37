use crate::filters::FontFilter;

/// A filter that rotates all glyphs by quarter turns
pub struct Turn(i32);

impl Turn {
    /// Create a new Turn filter; negative values turn anticlockwise
    pub fn new(clockwise: i32) -> Self {
        Turn(clockwise)
    }
}

impl FontFilter for Turn {
    fn apply(&self, font: &mut crate::Font) -> Result<(), crate::BitfontError> {
        log::info!("Turning glyphs {} quarter turns clockwise", self.0);
        *font = font.turn(self.0);
        Ok(())
    }

    fn from_str(s: &str) -> Result<Self, crate::BitfontError>
    where
        Self: Sized,
    {
        let turns = if s.trim().is_empty() {
            1
        } else {
            crate::geometry::parse_int(s).map_err(|e| {
                crate::BitfontError::FilterError(format!("Bad argument {:?} for turn: {}", s, e))
            })?
        };
        Ok(Turn::new(turns))
    }

    #[cfg(feature = "cli")]
    fn arg() -> clap::Arg
    where
        Self: Sized,
    {
        clap::Arg::new("turn")
            .long("turn")
            .value_name("QUARTERS")
            .help("Rotate glyphs by quarter turns clockwise; negative for anticlockwise")
            .allow_negative_numbers(true)
            .action(clap::ArgAction::Append)
    }
}
