use crate::{filters::FontFilter, Bounds};

/// A filter that removes columns and rows from the edges of every glyph
pub struct Crop(Bounds);

impl Crop {
    /// Create a new Crop filter
    pub fn new(left: i32, bottom: i32, right: i32, top: i32) -> Self {
        Crop(Bounds::new(left, bottom, right, top))
    }
}

impl FontFilter for Crop {
    fn apply(&self, font: &mut crate::Font) -> Result<(), crate::BitfontError> {
        log::info!("Cropping glyphs by {}", self.0);
        let Bounds {
            left,
            bottom,
            right,
            top,
        } = self.0;
        *font = font.crop(left, bottom, right, top)?;
        Ok(())
    }

    fn from_str(s: &str) -> Result<Self, crate::BitfontError>
    where
        Self: Sized,
    {
        let edges = super::parse_ints("crop", s, 4)?;
        Ok(Crop::new(edges[0], edges[1], edges[2], edges[3]))
    }

    #[cfg(feature = "cli")]
    fn arg() -> clap::Arg
    where
        Self: Sized,
    {
        clap::Arg::new("crop")
            .long("crop")
            .value_name("EDGES")
            .help("Remove LEFT,BOTTOM,RIGHT,TOP pixels from every glyph")
            .action(clap::ArgAction::Append)
    }
}
