/// Macro to declare filters with less boilerplate
///
/// Usage: `declare_filters! { TypeName(module_name) => "cli_name", ... }`
macro_rules! declare_filters {
    ($($(#[$meta:meta])* $type:ident($module:ident) => $name:literal),* $(,)?) => {
        // Import modules
        $(
            $(#[$meta])*
            mod $module;
        )*

        // Re-export types
        $(
            $(#[$meta])*
            pub use $module::$type;
        )*

        #[cfg(feature = "cli")]
        #[doc="Add filter arguments to a clap Command"]
        pub fn filter_group(mut command: clap::Command) -> clap::Command {
            command = command.next_help_heading("Font filters");
            let mut ids = Vec::new();
            $(
                $(#[$meta])*
                {
                    let arg = $type::arg();
                    ids.push(arg.get_id().clone());
                    command = command.arg(arg);
                }
            )*
            command.group(clap::ArgGroup::new("filters").args(ids).multiple(true))
        }

        #[cfg(feature = "cli")]
        #[doc="Convert a CLI filter name and argument to a FontFilter instance"]
        pub fn cli_to_filter(name: &str, arg: &str) -> Result<Box<dyn FontFilter>, crate::BitfontError> {
            Ok(match name {
                $(
                    $(#[$meta])*
                    $name => Box::new($type::from_str(arg)?),
                )*
                _ => {
                    return Err(crate::BitfontError::FilterError(format!(
                        "Unknown filter: {}",
                        name
                    )))
                }
            })
        }
    };
}

// Declare all filters in one place
declare_filters! {
    Mirror(mirror) => "mirror",
    Flip(flip) => "flip",
    Transpose(transpose) => "transpose",
    Turn(turn) => "turn",
    Crop(crop) => "crop",
    Expand(expand) => "expand",
    Reduce(reduce) => "reduce",
    Stretch(stretch) => "stretch",
    Shrink(shrink) => "shrink",
    Smear(smear) => "smear",
    Shear(shear) => "shear",
    Underline(underline) => "underline",
    Outline(outline) => "outline",
    Invert(invert) => "invert",
    EqualiseHorizontal(equalise) => "equalise",
    Relabel(relabel) => "label",
}

/// A trait for font filters that can be applied to a font
pub trait FontFilter {
    /// Apply the filter to the given font
    fn apply(&self, font: &mut crate::Font) -> Result<(), crate::BitfontError>;

    /// Parse a FontFilter from a string argument
    fn from_str(s: &str) -> Result<Self, crate::BitfontError>
    where
        Self: Sized;

    #[cfg(feature = "cli")]
    /// Get the clap argument for this filter
    fn arg() -> clap::Arg
    where
        Self: Sized;
}

/// Parse a comma-separated list of integers; one value is repeated, none gives zeros
fn parse_ints(filter: &str, arg: &str, count: usize) -> Result<Vec<i32>, crate::BitfontError> {
    crate::geometry::parse_tuple(arg, count).map_err(|e| {
        crate::BitfontError::FilterError(format!("Bad argument {:?} for {}: {}", arg, filter, e))
    })
}
