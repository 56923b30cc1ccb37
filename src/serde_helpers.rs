use serde::{ser::SerializeSeq as _, Deserialize as _};

use crate::raster::Raster;

const INK_DIGITS: &str = "0123456789abcdef";

// bilevel rows as `.` and `@`; greyscale rows as one hex digit per pixel
pub(crate) fn raster_ser<S>(raster: &Raster, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    let greyscale = raster.levels() > 2;
    let mut seq = serializer.serialize_seq(Some(raster.height()))?;
    for row in raster.rows() {
        let line = row
            .iter()
            .map(|&p| match (greyscale, p) {
                (_, 0) => '.',
                (false, _) => '@',
                (true, p) => INK_DIGITS.chars().nth(p as usize).unwrap_or('@'),
            })
            .collect::<String>();
        seq.serialize_element(&line)?;
    }
    seq.end()
}

pub(crate) fn raster_de<'de, D>(deserializer: D) -> Result<Raster, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let rows: Vec<String> = Vec::deserialize(deserializer)?;
    let rows = rows
        .iter()
        .map(|row| {
            row.chars()
                .map(|c| match c {
                    '.' => Ok(0),
                    '@' => Ok(1),
                    c => c.to_digit(16).map(|d| d as u8).ok_or_else(|| {
                        serde::de::Error::custom(format!("Invalid pixel {:?} in row {:?}", c, row))
                    }),
                })
                .collect::<Result<Vec<u8>, D::Error>>()
        })
        .collect::<Result<Vec<_>, _>>()?;
    Raster::from_rows(rows).map_err(serde::de::Error::custom)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(serde::Serialize, serde::Deserialize)]
    struct Wrapper {
        #[serde(serialize_with = "raster_ser", deserialize_with = "raster_de")]
        pixels: Raster,
    }

    #[test]
    fn test_raster_rows() {
        let pixels = Raster::from_text("@.\n.@", '@').unwrap();
        let json = serde_json::to_string(&Wrapper { pixels: pixels.clone() }).unwrap();
        assert_eq!(json, r#"{"pixels":["@.",".@"]}"#);
        let back: Wrapper = serde_json::from_str(&json).unwrap();
        assert_eq!(back.pixels, pixels);
    }

    #[test]
    fn test_greyscale_rows() {
        let pixels = Raster::from_rows([[0u8, 3], [1, 2]]).unwrap();
        let json = serde_json::to_string(&Wrapper { pixels: pixels.clone() }).unwrap();
        assert_eq!(json, r#"{"pixels":[".3","12"]}"#);
        let back: Wrapper = serde_json::from_str(&json).unwrap();
        assert_eq!(back.pixels, pixels);
    }
}
