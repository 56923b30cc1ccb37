use crate::filters::FontFilter;

/// A filter that replaces the ink of every glyph with its outline
pub struct Outline(Option<i32>);

impl Outline {
    /// Create a new Outline filter; the thickness defaults to the font's `outline_thickness`
    pub fn new(thickness: Option<i32>) -> Self {
        Outline(thickness)
    }
}

impl FontFilter for Outline {
    fn apply(&self, font: &mut crate::Font) -> Result<(), crate::BitfontError> {
        log::info!("Outlining glyphs");
        *font = font.outline(self.0)?;
        Ok(())
    }

    fn from_str(s: &str) -> Result<Self, crate::BitfontError>
    where
        Self: Sized,
    {
        if s.trim().is_empty() {
            return Ok(Outline::new(None));
        }
        Ok(Outline::new(Some(super::parse_ints("outline", s, 1)?[0])))
    }

    #[cfg(feature = "cli")]
    fn arg() -> clap::Arg
    where
        Self: Sized,
    {
        clap::Arg::new("outline")
            .long("outline")
            .value_name("THICKNESS")
            .help("Replace glyphs with their outline")
            .num_args(0..=1)
            .default_missing_value("")
            .action(clap::ArgAction::Append)
    }
}
