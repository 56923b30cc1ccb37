use crate::{filters::FontFilter, Bounds};

/// A filter that adds blank columns and rows to the edges of every glyph
pub struct Expand(Bounds);

impl Expand {
    /// Create a new Expand filter
    pub fn new(left: i32, bottom: i32, right: i32, top: i32) -> Self {
        Expand(Bounds::new(left, bottom, right, top))
    }
}

impl FontFilter for Expand {
    fn apply(&self, font: &mut crate::Font) -> Result<(), crate::BitfontError> {
        log::info!("Expanding glyphs by {}", self.0);
        let Bounds {
            left,
            bottom,
            right,
            top,
        } = self.0;
        *font = font.expand(left, bottom, right, top)?;
        Ok(())
    }

    fn from_str(s: &str) -> Result<Self, crate::BitfontError>
    where
        Self: Sized,
    {
        let edges = super::parse_ints("expand", s, 4)?;
        Ok(Expand::new(edges[0], edges[1], edges[2], edges[3]))
    }

    #[cfg(feature = "cli")]
    fn arg() -> clap::Arg
    where
        Self: Sized,
    {
        clap::Arg::new("expand")
            .long("expand")
            .value_name("EDGES")
            .help("Add LEFT,BOTTOM,RIGHT,TOP blank pixels to every glyph")
            .action(clap::ArgAction::Append)
    }
}
