use crate::filters::FontFilter;

/// A filter that repeats inked pixels, as for a synthetic bold
///
/// Without amounts, smears right by the font's `bold_smear`.
pub struct Smear(Option<[i32; 4]>);

impl Smear {
    /// Create a new Smear filter with amounts left, right, up and down
    pub fn new(amounts: Option<[i32; 4]>) -> Self {
        Smear(amounts)
    }
}

impl FontFilter for Smear {
    fn apply(&self, font: &mut crate::Font) -> Result<(), crate::BitfontError> {
        log::info!("Smearing glyphs");
        *font = match self.0 {
            Some([left, right, up, down]) => font.smear(Some(left), Some(right), Some(up), Some(down))?,
            None => font.smear(None, None, None, None)?,
        };
        Ok(())
    }

    fn from_str(s: &str) -> Result<Self, crate::BitfontError>
    where
        Self: Sized,
    {
        if s.trim().is_empty() {
            return Ok(Smear::new(None));
        }
        let amounts = super::parse_ints("smear", s, 4)?;
        Ok(Smear::new(Some([amounts[0], amounts[1], amounts[2], amounts[3]])))
    }

    #[cfg(feature = "cli")]
    fn arg() -> clap::Arg
    where
        Self: Sized,
    {
        clap::Arg::new("smear")
            .long("smear")
            .value_name("LEFT,RIGHT,UP,DOWN")
            .help("Repeat inked pixels; without amounts, embolden by the font's bold smear")
            .num_args(0..=1)
            .default_missing_value("")
            .action(clap::ArgAction::Append)
    }
}
