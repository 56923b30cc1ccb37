use bitfont::{
    load, BitfontError, Char, Coord, Font, FontProperties, Glyph, GlyphProperties, KernTable,
    Label, Missing, OverlayOperator, Raster, Spacing, TextOptions,
};
use pretty_assertions::assert_eq;
use rstest::rstest;

const ONE: &str = "
    ........
    ........
    ........
    ...@@...
    ..@@@...
    .@@@@...
    ...@@...
    ...@@...
    ...@@...
    ...@@...
    ...@@...
    ...@@...
    .@@@@@@.
    ........
    ........
    ........
";

fn text(glyph: &Glyph) -> String {
    glyph.as_text(TextOptions::default())
}

fn one() -> Result<Glyph, BitfontError> {
    let mut props = GlyphProperties::default()
        .with_shift_up(-3)
        .with_left_bearing(1)
        .with_top_bearing(-1)
        .with_bottom_bearing(-2);
    props.set_str("test", "preserved")?;
    Ok(Glyph::new(Raster::from_text(ONE, '@')?, props).with_labels([Label::from('1')]))
}

fn asymmetric() -> Result<Glyph, BitfontError> {
    Ok(Glyph::new(
        Raster::from_text("@@..\n@...\n@@@.\n", '@')?,
        GlyphProperties::default()
            .with_shift_up(-1)
            .with_left_bearing(1)
            .with_right_bearing(2),
    ))
}

#[test]
fn test_mirror_scenario() -> Result<(), BitfontError> {
    let font = Font::from_glyphs([one()?]);
    let mirrored = font.mirror();
    let glyph = &mirrored.glyphs()[0];
    let original = &font.glyphs()[0];
    assert_eq!(glyph.left_bearing(), original.right_bearing());
    assert_eq!(glyph.right_bearing(), original.left_bearing());
    assert_eq!(glyph.shift_left(), -original.shift_left());
    let reversed = ONE
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| format!("{}\n", l.chars().rev().collect::<String>()))
        .collect::<String>();
    assert_eq!(text(glyph), reversed);
    assert_eq!(
        glyph.get("test")?,
        bitfont::properties::Value::Text("preserved".into())
    );
    assert_eq!(glyph.advance_width(), original.advance_width());
    Ok(())
}

// odd raster dimensions, so that halving for vertical metrics rounds
fn odd_sized(props: GlyphProperties) -> Result<Glyph, BitfontError> {
    Ok(Glyph::new(
        Raster::from_text("@@.\n@..\n@@@\n..@\n.@@\n", '@')?,
        props.with_shift_up(-2),
    ))
}

fn vertical_props() -> GlyphProperties {
    GlyphProperties::default()
        .with_left_bearing(1)
        .with_right_bearing(2)
        .with_top_bearing(1)
        .with_bottom_bearing(3)
        .with_shift_left(1)
}

#[rstest]
#[case(0, 1)]
#[case(1, 1)]
#[case(1, 3)]
#[case(3, 1)]
#[case(2, 2)]
#[case(-1, 2)]
#[case(3, -7)]
fn test_turn_group_law(#[case] a: i32, #[case] b: i32) -> Result<(), BitfontError> {
    let raster = asymmetric()?.pixels().clone();
    assert_eq!(raster.turn(a).turn(b), raster.turn(a + b));
    assert_eq!(raster.turn(4), raster);
    let glyphs = [
        asymmetric()?,
        odd_sized(GlyphProperties::default())?,
        odd_sized(vertical_props())?,
    ];
    for glyph in &glyphs {
        assert_eq!(glyph.turn(a).turn(b), glyph.turn(a + b));
        let stepwise = (0..b.rem_euclid(4)).fold(glyph.clone(), |g, _| g.turn(1));
        assert_eq!(stepwise, glyph.turn(b));
        assert_eq!(&glyph.turn(b).turn(-b), glyph);
    }
    let font = Font::from_glyphs(glyphs);
    assert_eq!(font.turn(a).turn(b).glyphs(), font.turn(a + b).glyphs());
    let stepwise = (0..b.rem_euclid(4)).fold(font.clone(), |f, _| f.turn(1));
    assert_eq!(stepwise.glyphs(), font.turn(b).glyphs());
    assert_eq!(font.turn(b).turn(-b).glyphs(), font.glyphs());
    Ok(())
}

#[test]
fn test_involutions() -> Result<(), BitfontError> {
    let glyph = asymmetric()?;
    assert_eq!(glyph.mirror().mirror(), glyph);
    assert_eq!(glyph.flip().flip(), glyph);
    assert_eq!(glyph.turn(4), glyph);
    let font = Font::from_glyphs([glyph, one()?]);
    assert_eq!(font.mirror().mirror(), font);
    assert_eq!(font.flip().flip(), font);
    Ok(())
}

#[rstest]
#[case(0, 0, 0, 0)]
#[case(1, 0, 0, 0)]
#[case(0, 2, 1, 0)]
#[case(3, 1, 2, 4)]
fn test_crop_expand_inverse(
    #[case] left: i32,
    #[case] bottom: i32,
    #[case] right: i32,
    #[case] top: i32,
) -> Result<(), BitfontError> {
    for glyph in [asymmetric()?, one()?] {
        let expanded = glyph.expand(left, bottom, right, top)?;
        assert_eq!(expanded.advance_width(), glyph.advance_width());
        if glyph.has_vertical_metrics() {
            assert_eq!(expanded.advance_height(), glyph.advance_height());
        }
        assert_eq!(expanded.crop(left, bottom, right, top)?, glyph);
    }
    Ok(())
}

#[test]
fn test_advance_invariance() -> Result<(), BitfontError> {
    let glyph = one()?;
    let transformed = [
        glyph.crop(1, 2, 1, 2)?,
        glyph.expand(2, 1, 0, 3)?,
        glyph.mirror(),
        glyph.flip(),
        glyph.reduce()?,
    ];
    for result in transformed {
        assert_eq!(result.advance_width(), glyph.advance_width());
        assert_eq!(result.advance_height(), glyph.advance_height());
    }
    Ok(())
}

#[test]
fn test_stretch_shrink_round_trip() -> Result<(), BitfontError> {
    let glyph = asymmetric()?;
    let stretched = glyph.stretch(2, 3)?;
    assert_eq!(stretched.raster_size(), Coord::new(8, 9));
    assert_eq!(stretched.shrink(2, 3, false)?.pixels(), glyph.pixels());
    assert!(matches!(
        glyph.shrink(2, 1, false),
        Err(BitfontError::LossyOperation(_))
    ));
    assert_eq!(glyph.shrink(2, 1, true)?.width(), 2);
    Ok(())
}

#[test]
fn test_reduce_idempotent() -> Result<(), BitfontError> {
    for glyph in [asymmetric()?, one()?, Glyph::blank(3, 3)] {
        let reduced = glyph.reduce()?;
        assert_eq!(reduced.reduce()?, reduced);
    }
    let font = Font::from_glyphs([one()?, asymmetric()?]);
    let reduced = font.reduce()?;
    assert_eq!(reduced.reduce()?, reduced);
    Ok(())
}

#[test]
fn test_spacing_boundary_cases() -> Result<(), BitfontError> {
    let cell = |width: usize, c: char| -> Result<Glyph, BitfontError> {
        let row = "@".repeat(width);
        Ok(Glyph::new(
            Raster::from_text(&format!("{row}\n{row}\n"), '@')?,
            GlyphProperties::default(),
        )
        .with_labels([Label::from(c)]))
    };
    assert_eq!(Font::from_glyphs([one()?]).spacing(), Spacing::CharacterCell);
    let multi = Font::from_glyphs([cell(4, 'a')?, cell(8, 'w')?, cell(4, 'b')?]);
    assert_eq!(multi.spacing(), Spacing::MultiCell);
    assert_eq!(multi.cell_size(), Coord::new(4, 2));

    let mut kerning = KernTable::new();
    kerning.insert(Label::from('b'), 1);
    let kerned = cell(4, 'a')?.modify([("right_kerning", bitfont::properties::Value::Kerning(kerning))])?;
    let font = Font::from_glyphs([kerned, cell(4, 'b')?]);
    assert_eq!(font.spacing(), Spacing::Proportional);
    Ok(())
}

#[test]
fn test_overlay_composition() -> Result<(), BitfontError> {
    // a slice of a unifont-like fixture: space, u, macron, cedilla
    let mark = |rows: &str, shift_up: i32, c: char| -> Result<Glyph, BitfontError> {
        Ok(Glyph::new(
            Raster::from_text(rows, '@')?,
            GlyphProperties::default()
                .with_shift_up(shift_up)
                .with_right_bearing(-4),
        )
        .with_labels([Label::from(c)]))
    };
    let space = Glyph::blank(4, 8)
        .modify([("shift_up", -2)])?
        .with_labels([Label::from(' ')]);
    let u = Glyph::new(
        Raster::from_text("....\n....\n....\n@..@\n@..@\n@..@\n.@@@\n....\n", '@')?,
        GlyphProperties::default().with_shift_up(-2),
    )
    .with_labels([Label::from('u')]);
    let macron = mark(".@@@\n", 5, '\u{304}')?;
    let cedilla = mark("..@.\n.@..\n", -2, '\u{327}')?;
    let font = Font::from_glyphs([space, u.clone(), macron.clone(), cedilla.clone()]);

    let composed = font.get_glyph(&Label::Char(Char::new("\u{16b}\u{327}")), &Missing::Raise)?;
    assert_eq!(
        text(&composed),
        ".@@@\n....\n....\n@..@\n@..@\n@..@\n.@@@\n.@..\n"
    );
    // the union of the component rasters in their own frames
    let expected = Glyph::overlay(&[&u, &cedilla, &macron], OverlayOperator::Any)?;
    assert_eq!(composed, expected);
    assert_eq!(composed.advance_width(), u.advance_width());
    Ok(())
}

#[test]
fn test_frozen_immutability() -> Result<(), BitfontError> {
    let glyph = one()?;
    let mut props = glyph.props().clone();
    assert!(matches!(
        props.set_str("shift_up", "5"),
        Err(BitfontError::ImmutableState { .. })
    ));
    assert_eq!(glyph.shift_up(), -3);
    let font = Font::from_glyphs([glyph]);
    let mut font_props = font.props().clone();
    assert!(font_props.set_str("family", "Changed").is_err());
    assert_eq!(font.family(), "");
    Ok(())
}

#[test]
fn test_json_round_trip() -> Result<(), BitfontError> {
    let mut props = FontProperties::default();
    props.set_text("family: Sample\nencoding: latin-1\nfoundry-url: https://example.com\n")?;
    let font = Font::new([one()?, asymmetric()?.with_labels([Label::from(0x41u32)])], props)?
        .with_comment("", "A test font")
        .with_comment("family", "named after nothing");
    let path = std::env::temp_dir().join(format!("bitfont-test-{}.bitfont", std::process::id()));
    font.save(&path)?;
    let loaded = load(&path)?;
    std::fs::remove_file(&path)?;
    assert_eq!(loaded, font);
    assert_eq!(loaded.get_comment("family"), "named after nothing");
    assert_eq!(loaded.props().extra().get("foundry-url").map(String::as_str), Some("https://example.com"));
    assert_eq!(loaded.get_index(&Label::from('A')), Some(1));
    Ok(())
}

#[test]
fn test_unknown_file_type() {
    assert!(matches!(
        load("font.bdf"),
        Err(BitfontError::UnknownFileType { .. })
    ));
    assert!(matches!(
        Font::default().save("font.yaff"),
        Err(BitfontError::UnknownFileType { .. })
    ));
}
