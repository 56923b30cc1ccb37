use crate::filters::FontFilter;

/// A filter that draws a line under every glyph
pub struct Underline {
    descent: Option<i32>,
    thickness: Option<i32>,
}

impl Underline {
    /// Create a new Underline filter; unset values come from the font
    pub fn new(descent: Option<i32>, thickness: Option<i32>) -> Self {
        Underline { descent, thickness }
    }
}

impl FontFilter for Underline {
    fn apply(&self, font: &mut crate::Font) -> Result<(), crate::BitfontError> {
        log::info!("Underlining glyphs");
        *font = font.underline(self.descent, self.thickness)?;
        Ok(())
    }

    fn from_str(s: &str) -> Result<Self, crate::BitfontError>
    where
        Self: Sized,
    {
        if s.trim().is_empty() {
            return Ok(Underline::new(None, None));
        }
        let values = super::parse_ints("underline", s, 2)?;
        Ok(Underline::new(Some(values[0]), Some(values[1])))
    }

    #[cfg(feature = "cli")]
    fn arg() -> clap::Arg
    where
        Self: Sized,
    {
        clap::Arg::new("underline")
            .long("underline")
            .value_name("DESCENT,THICKNESS")
            .help("Draw an underline; defaults come from the font properties")
            .num_args(0..=1)
            .default_missing_value("")
            .action(clap::ArgAction::Append)
    }
}
