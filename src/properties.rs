//! The property engine shared by glyphs and fonts
//!
//! A property set is a struct of optional, typed fields generated by
//! [`property_set!`](crate::property_set). A field that is `None` falls back to
//! its schema default, or (for writable computed properties) to a value
//! derived by the owning [`Glyph`](crate::Glyph) or [`Font`](crate::Font).
//! Properties that are always derived are listed as `computed` and refuse to
//! be set. Names that are not in the schema are kept verbatim as string-valued
//! extension properties.
//!
//! Property sets are frozen once they belong to a glyph or font; setting a
//! field on a frozen set fails with [`BitfontError::ImmutableState`].

use std::fmt;

use crate::{
    geometry::{parse_int, Bounds, Coord},
    kerning::KernTable,
    label::Label,
    stroke::StrokePath,
    BitfontError,
};

/// A dynamically typed property value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// An integer
    Int(i32),
    /// A fractional number
    Number(f64),
    /// Text, also used for raw values still to be converted
    Text(String),
    /// A coordinate pair
    Coord(Coord),
    /// A box
    Bounds(Bounds),
    /// A glyph label
    Label(Label),
    /// A kerning table
    Kerning(KernTable),
    /// A stroke path
    Path(StrokePath),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "{}", s),
            Value::Coord(c) => write!(f, "{}", c),
            Value::Bounds(b) => write!(f, "{}", b),
            Value::Label(l) => write!(f, "{}", l),
            Value::Kerning(k) => write!(f, "{}", k),
            Value::Path(p) => write!(f, "{}", p),
        }
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<Coord> for Value {
    fn from(value: Coord) -> Self {
        Value::Coord(value)
    }
}

impl From<Bounds> for Value {
    fn from(value: Bounds) -> Self {
        Value::Bounds(value)
    }
}

impl From<Label> for Value {
    fn from(value: Label) -> Self {
        Value::Label(value)
    }
}

impl From<KernTable> for Value {
    fn from(value: KernTable) -> Self {
        Value::Kerning(value)
    }
}

impl From<StrokePath> for Value {
    fn from(value: StrokePath) -> Self {
        Value::Path(value)
    }
}

/// A type that can be stored in a property set
///
/// `from_value` is the per-type converter applied to raw override values.
pub trait PropertyType: Sized + Clone + PartialEq {
    /// Convert a value to this type
    fn from_value(property: &str, value: Value) -> Result<Self, BitfontError>;
    /// Wrap this value
    fn to_value(&self) -> Value;
}

fn mismatch(property: &str, value: &Value, expected: &str) -> BitfontError {
    BitfontError::invalid(property, value.to_string(), format!("expected {}", expected))
}

impl PropertyType for i32 {
    fn from_value(property: &str, value: Value) -> Result<Self, BitfontError> {
        match value {
            Value::Int(i) => Ok(i),
            Value::Number(n) => Ok(n.floor() as i32),
            Value::Text(s) => parse_int(&s).map_err(|e| BitfontError::invalid(property, s, e)),
            other => Err(mismatch(property, &other, "an integer")),
        }
    }

    fn to_value(&self) -> Value {
        Value::Int(*self)
    }
}

impl PropertyType for f64 {
    fn from_value(property: &str, value: Value) -> Result<Self, BitfontError> {
        match value {
            Value::Int(i) => Ok(i as f64),
            Value::Number(n) => Ok(n),
            Value::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|e| BitfontError::invalid(property, s, e.to_string())),
            other => Err(mismatch(property, &other, "a number")),
        }
    }

    fn to_value(&self) -> Value {
        Value::Number(*self)
    }
}

impl PropertyType for String {
    fn from_value(_property: &str, value: Value) -> Result<Self, BitfontError> {
        match value {
            Value::Text(s) => Ok(s),
            other => Ok(other.to_string()),
        }
    }

    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }
}

impl PropertyType for Coord {
    fn from_value(property: &str, value: Value) -> Result<Self, BitfontError> {
        match value {
            Value::Coord(c) => Ok(c),
            Value::Int(i) => Ok(Coord::new(i, i)),
            Value::Text(s) => s.parse().map_err(|_| mismatch(property, &Value::Text(s), "a coordinate pair")),
            other => Err(mismatch(property, &other, "a coordinate pair")),
        }
    }

    fn to_value(&self) -> Value {
        Value::Coord(*self)
    }
}

impl PropertyType for Bounds {
    fn from_value(property: &str, value: Value) -> Result<Self, BitfontError> {
        match value {
            Value::Bounds(b) => Ok(b),
            Value::Text(s) => s.parse().map_err(|_| mismatch(property, &Value::Text(s), "four edges")),
            other => Err(mismatch(property, &other, "four edges")),
        }
    }

    fn to_value(&self) -> Value {
        Value::Bounds(*self)
    }
}

impl PropertyType for Label {
    fn from_value(property: &str, value: Value) -> Result<Self, BitfontError> {
        match value {
            Value::Label(l) => Ok(l),
            Value::Int(i) => u32::try_from(i)
                .map(Label::from)
                .map_err(|_| BitfontError::invalid(property, i.to_string(), "negative codepoint")),
            Value::Text(s) => s.parse(),
            other => Err(mismatch(property, &other, "a label")),
        }
    }

    fn to_value(&self) -> Value {
        Value::Label(self.clone())
    }
}

impl PropertyType for KernTable {
    fn from_value(property: &str, value: Value) -> Result<Self, BitfontError> {
        match value {
            Value::Kerning(k) => Ok(k),
            Value::Text(s) => s.parse(),
            other => Err(mismatch(property, &other, "a kerning table")),
        }
    }

    fn to_value(&self) -> Value {
        Value::Kerning(self.clone())
    }
}

impl PropertyType for StrokePath {
    fn from_value(property: &str, value: Value) -> Result<Self, BitfontError> {
        match value {
            Value::Path(p) => Ok(p),
            Value::Text(s) => s.parse(),
            other => Err(mismatch(property, &other, "a stroke path")),
        }
    }

    fn to_value(&self) -> Value {
        Value::Path(self.clone())
    }
}

/// Normalise a property name to the schema's spelling.
///
/// Names are compared case-insensitively, with `-`, `.` and spaces equivalent
/// to `_`.
pub fn normalize_name(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| match c {
            '-' | '.' | ' ' => '_',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

/// Add a line to a multiline string, dropping empty lines.
pub fn extend_string(string: &str, line: &str) -> String {
    string
        .split('\n')
        .chain(std::iter::once(line))
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render `key: value` pairs as text, one per line.
///
/// Multiline values start on the next line and are indented.
pub fn props_to_text<K: AsRef<str>, V: AsRef<str>>(
    props: impl IntoIterator<Item = (K, V)>,
) -> String {
    props
        .into_iter()
        .map(|(key, value)| {
            let (key, value) = (key.as_ref(), value.as_ref());
            if value.contains('\n') {
                let indented = value
                    .lines()
                    .map(|l| format!("    {}", l))
                    .collect::<Vec<_>>()
                    .join("\n");
                format!("{}:\n{}", key, indented)
            } else {
                format!("{}: {}", key, value)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse text produced by [`props_to_text`] back into pairs.
pub fn props_from_text(text: &str) -> Result<Vec<(String, String)>, BitfontError> {
    let mut props: Vec<(String, String)> = vec![];
    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        if line.starts_with(char::is_whitespace) {
            let Some((_, value)) = props.last_mut() else {
                return Err(BitfontError::Config(format!(
                    "continuation line without a key: {:?}",
                    line
                )));
            };
            *value = extend_string(value, line.trim());
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            return Err(BitfontError::Config(format!("expected `key: value`, found {:?}", line)));
        };
        props.push((key.trim().to_string(), value.trim().to_string()));
    }
    Ok(props)
}

/// Declare a property set.
///
/// Each stored field is given as `name: Type = default`. Fields listed under
/// `computed` are known names that are always derived by the owner and are
/// refused (with a warning) by the setters.
#[macro_export]
macro_rules! property_set {
    (
        $(#[$meta:meta])*
        pub struct $name:ident {
            $(
                $(#[$fmeta:meta])*
                $field:ident: $ty:ty = $default:expr,
            )*
        }
        computed: [$($computed:ident),* $(,)?]
    ) => {
        paste::paste! {
            $(#[$meta])*
            #[derive(Debug, Clone, Default)]
            pub struct $name {
                $(
                    $(#[$fmeta])*
                    $field: Option<$ty>,
                )*
                extra: indexmap::IndexMap<String, String>,
                frozen: bool,
            }

            impl $name {
                /// Names of the stored fields, in schema order
                pub const FIELDS: &'static [&'static str] = &[$(stringify!($field)),*];
                /// Names of the properties that are always derived
                pub const COMPUTED: &'static [&'static str] = &[$(stringify!($computed)),*];

                $(
                    #[doc = concat!("Schema default of `", stringify!($field), "`")]
                    pub fn [<default_ $field>]() -> $ty {
                        $default
                    }

                    #[doc = concat!("Explicitly set value of `", stringify!($field), "`, if any")]
                    pub fn $field(&self) -> Option<$ty> {
                        self.$field.clone()
                    }

                    #[doc = concat!("Value of `", stringify!($field), "`, or its schema default")]
                    pub fn [<get_ $field>](&self) -> $ty {
                        self.$field.clone().unwrap_or_else(Self::[<default_ $field>])
                    }

                    #[doc = concat!("A copy of the set with `", stringify!($field), "` overridden")]
                    pub fn [<with_ $field>](mut self, value: $ty) -> Self {
                        self.$field = Some(value);
                        self
                    }
                )*

                /// True if the name is a stored or computed property of the schema
                pub fn is_known(name: &str) -> bool {
                    let key = $crate::properties::normalize_name(name);
                    Self::FIELDS.contains(&key.as_str()) || Self::COMPUTED.contains(&key.as_str())
                }

                /// True if the name is a property that is always derived
                pub fn is_computed(name: &str) -> bool {
                    let key = $crate::properties::normalize_name(name);
                    Self::COMPUTED.contains(&key.as_str())
                }

                /// True once the set belongs to an immutable object
                pub fn is_frozen(&self) -> bool {
                    self.frozen
                }

                /// Make the property set immutable
                pub fn freeze(mut self) -> Self {
                    self.frozen = true;
                    self
                }

                pub(crate) fn thawed(&self) -> Self {
                    let mut props = self.clone();
                    props.frozen = false;
                    props
                }

                fn check_frozen(&self, name: &str) -> Result<(), $crate::BitfontError> {
                    if self.frozen {
                        return Err($crate::BitfontError::ImmutableState {
                            property: name.to_string(),
                        });
                    }
                    Ok(())
                }

                /// Set a property, converting the value to the declared type.
                ///
                /// Computed properties are ignored with a warning; unknown names
                /// are kept as extension properties.
                pub fn set_value(
                    &mut self,
                    name: &str,
                    value: $crate::properties::Value,
                ) -> Result<(), $crate::BitfontError> {
                    self.check_frozen(name)?;
                    let key = $crate::properties::normalize_name(name);
                    $(
                        if key == stringify!($field) {
                            self.$field = Some(
                                <$ty as $crate::properties::PropertyType>::from_value(&key, value)?
                            );
                            return Ok(());
                        }
                    )*
                    if Self::COMPUTED.contains(&key.as_str()) {
                        log::warn!("Property `{}` is computed and cannot be set; ignoring", key);
                        return Ok(());
                    }
                    log::debug!("Keeping extension property `{}`", name);
                    self.insert_extra(name, value.to_string());
                    Ok(())
                }

                // extension names match in normalised form but keep their first spelling
                fn extra_index(&self, name: &str) -> Option<usize> {
                    let key = $crate::properties::normalize_name(name);
                    self.extra
                        .keys()
                        .position(|k| $crate::properties::normalize_name(k) == key)
                }

                fn insert_extra(&mut self, name: &str, value: String) {
                    match self.extra_index(name) {
                        Some(index) => {
                            if let Some((_, old)) = self.extra.get_index_mut(index) {
                                *old = value;
                            }
                        }
                        None => {
                            self.extra.insert(name.trim().to_string(), value);
                        }
                    }
                }

                /// Set a property from its textual form
                pub fn set_str(&mut self, name: &str, value: &str) -> Result<(), $crate::BitfontError> {
                    self.set_value(name, $crate::properties::Value::Text(value.to_string()))
                }

                /// Set properties from `key: value` lines
                pub fn set_text(&mut self, text: &str) -> Result<(), $crate::BitfontError> {
                    for (key, value) in $crate::properties::props_from_text(text)? {
                        self.set_str(&key, &value)?;
                    }
                    Ok(())
                }

                /// Remove an explicitly set property, reverting to its default
                pub fn unset(&mut self, name: &str) -> Result<(), $crate::BitfontError> {
                    self.check_frozen(name)?;
                    let key = $crate::properties::normalize_name(name);
                    $(
                        if key == stringify!($field) {
                            self.$field = None;
                            return Ok(());
                        }
                    )*
                    if let Some(index) = self.extra_index(name) {
                        self.extra.shift_remove_index(index);
                    }
                    Ok(())
                }

                /// Copy every explicitly set property of `other` over this set
                pub fn update(&mut self, other: &Self) -> Result<(), $crate::BitfontError> {
                    self.check_frozen(stringify!($name))?;
                    $(
                        if other.$field.is_some() {
                            self.$field = other.$field.clone();
                        }
                    )*
                    for (key, value) in &other.extra {
                        self.insert_extra(key, value.clone());
                    }
                    Ok(())
                }

                /// The explicitly set value of a property, if any
                pub fn get_defined(&self, name: &str) -> Option<$crate::properties::Value> {
                    let key = $crate::properties::normalize_name(name);
                    $(
                        if key == stringify!($field) {
                            return self.$field
                                .as_ref()
                                .map($crate::properties::PropertyType::to_value);
                        }
                    )*
                    self.extra_index(name)
                        .and_then(|index| self.extra.get_index(index))
                        .map(|(_, v)| $crate::properties::Value::Text(v.clone()))
                }

                /// True if the property has been explicitly set
                pub fn is_defined(&self, name: &str) -> bool {
                    self.get_defined(name).is_some()
                }

                /// All explicitly set properties: schema fields in order, then extensions
                pub fn defined(&self) -> Vec<(String, $crate::properties::Value)> {
                    let mut props = vec![];
                    $(
                        if let Some(value) = &self.$field {
                            props.push((
                                stringify!($field).to_string(),
                                $crate::properties::PropertyType::to_value(value),
                            ));
                        }
                    )*
                    props.extend(self.extra.iter().map(|(k, v)| {
                        (k.clone(), $crate::properties::Value::Text(v.clone()))
                    }));
                    props
                }

                /// Extension properties not in the schema
                pub fn extra(&self) -> &indexmap::IndexMap<String, String> {
                    &self.extra
                }

                /// Schema default of a stored property
                pub fn get_default(name: &str) -> Result<$crate::properties::Value, $crate::BitfontError> {
                    let key = $crate::properties::normalize_name(name);
                    $(
                        if key == stringify!($field) {
                            return Ok($crate::properties::PropertyType::to_value(
                                &Self::[<default_ $field>]()
                            ));
                        }
                    )*
                    Err($crate::BitfontError::UnknownProperty { name: name.to_string() })
                }

                /// Explicitly set properties as `key: value` text
                pub fn to_text(&self) -> String {
                    $crate::properties::props_to_text(
                        self.defined().into_iter().map(|(k, v)| (k, v.to_string()))
                    )
                }
            }

            impl PartialEq for $name {
                fn eq(&self, other: &Self) -> bool {
                    true $(&& self.$field == other.$field)*
                        && self.extra.len() == other.extra.len()
                        && self.extra.iter().all(|(key, value)| {
                            other
                                .extra_index(key)
                                .and_then(|index| other.extra.get_index(index))
                                .is_some_and(|(_, v)| v == value)
                        })
                }
            }
        }
    };
}
