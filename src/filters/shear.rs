use crate::{filters::FontFilter, raster::ShearDirection, Coord};

/// A filter that slants every glyph, as for a synthetic italic
pub struct Shear {
    direction: ShearDirection,
    pitch: Option<Coord>,
}

impl Shear {
    /// Create a new Shear filter; the pitch defaults to the font's `italic_pitch`
    pub fn new(direction: ShearDirection, pitch: Option<Coord>) -> Self {
        Shear { direction, pitch }
    }
}

impl FontFilter for Shear {
    fn apply(&self, font: &mut crate::Font) -> Result<(), crate::BitfontError> {
        log::info!("Shearing glyphs {:?}", self.direction);
        *font = font.shear(self.direction, self.pitch)?;
        Ok(())
    }

    fn from_str(s: &str) -> Result<Self, crate::BitfontError>
    where
        Self: Sized,
    {
        let (direction, pitch) = match s.split_once(',') {
            Some((direction, pitch)) => {
                let pitch = super::parse_ints("shear", pitch, 2)?;
                (direction, Some(Coord::new(pitch[0], pitch[1])))
            }
            None if s.trim().is_empty() => ("right", None),
            None => (s, None),
        };
        Ok(Shear::new(direction.parse()?, pitch))
    }

    #[cfg(feature = "cli")]
    fn arg() -> clap::Arg
    where
        Self: Sized,
    {
        clap::Arg::new("shear")
            .long("shear")
            .value_name("DIRECTION[,X,Y]")
            .help("Slant glyphs left or right by X pixels for every Y pixels up")
            .num_args(0..=1)
            .default_missing_value("right")
            .action(clap::ArgAction::Append)
    }
}
