//! Sprite palettes (`.dpd`) and the lookup of the palette a sprite uses.
use crate::assets::container::{PALETTE_KEY, read_container};
use crate::error::{Error, Result};
use crate::ext::io::*;
use crate::types::{ImageData, Rgb};
use crate::utils::struct_pack::{StructUnpack, unpack_records};
use serde::Serialize;
use std::io::{Read, Seek};

pub const PALETTE_NAME_LEN: usize = 64;
pub const PALETTE_COLORS: usize = 256;

/// Palette used when no palette name matches a sprite.
pub const FALLBACK_PALETTE: &str = "Bright1";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Palette {
    pub name: String,
    /// Always 256 entries.
    pub colors: Vec<Rgb>,
}

impl StructUnpack for Palette {
    const NAME: &'static str = "palette";
    const SIZE: usize = PALETTE_NAME_LEN + PALETTE_COLORS * 3;

    fn unpack<R: Read>(reader: &mut R) -> Result<Self> {
        let name = reader.read_fstring(PALETTE_NAME_LEN)?;
        let raw = reader.read_exact_vec(PALETTE_COLORS * 3)?;
        let colors = raw.chunks_exact(3).map(|c| Rgb(c[0], c[1], c[2])).collect();
        Ok(Palette { name, colors })
    }
}

impl Palette {
    /// A 16x16 image showing every entry, index 0 at the top left.
    pub fn swatch(&self) -> ImageData {
        ImageData::from_rgb(16, 16, self.colors.iter().copied())
    }
}

/// Parses decrypted palette container content.
pub fn decode_palettes(data: &[u8]) -> Result<Vec<Palette>> {
    unpack_records(data)
}

/// Reads, verifies, decrypts and parses a palette container.
pub fn read_palettes<R: Read + Seek>(reader: &mut R) -> Result<Vec<Palette>> {
    let payload = read_container(reader, PALETTE_KEY)?;
    decode_palettes(&payload.data)
}

/// Reduces a sprite name to the prefix palettes are named after.
///
/// The name is cut at the first space, then at the first hyphen, then
/// trailing digits are removed: `"Wolf02-a (shadow)"` becomes `"Wolf"`.
pub fn canonical_sprite_name(name: &str) -> &str {
    let name = name.split(' ').next().unwrap_or_default();
    let name = name.split('-').next().unwrap_or_default();
    name.trim_end_matches(|c: char| c.is_ascii_digit())
}

/// The decoded palettes of a run, in container order.
///
/// Construction fails when the fallback palette is absent, since sprites
/// with no matching palette could not be rendered.
#[derive(Debug)]
pub struct PaletteSet {
    palettes: Vec<Palette>,
    fallback: usize,
}

impl PaletteSet {
    pub fn new(palettes: Vec<Palette>) -> Result<Self> {
        let fallback = palettes
            .iter()
            .position(|p| p.name == FALLBACK_PALETTE)
            .ok_or_else(|| Error::MissingPaletteFallback(FALLBACK_PALETTE.to_string()))?;
        Ok(PaletteSet { palettes, fallback })
    }

    /// Picks the palette for a sprite.
    ///
    /// The first palette, in container order, whose name starts with the
    /// canonical sprite name wins. Otherwise the fallback palette is used.
    pub fn resolve(&self, sprite_name: &str) -> &Palette {
        let canonical = canonical_sprite_name(sprite_name);
        self.palettes
            .iter()
            .find(|p| p.name.starts_with(canonical))
            .unwrap_or(&self.palettes[self.fallback])
    }

    pub fn palettes(&self) -> &[Palette] {
        &self.palettes
    }
}

#[cfg(test)]
fn test_palette(name: &str, seed: u8) -> Palette {
    Palette {
        name: name.to_string(),
        colors: (0..=255u8)
            .map(|i| Rgb(i, seed, i.wrapping_add(seed)))
            .collect(),
    }
}

#[cfg(test)]
fn encode_palette(p: &Palette) -> Vec<u8> {
    let mut out = p.name.as_bytes().to_vec();
    out.resize(PALETTE_NAME_LEN, 0);
    for Rgb(r, g, b) in &p.colors {
        out.extend_from_slice(&[*r, *g, *b]);
    }
    out
}

#[test]
fn test_decode_palettes() {
    let palettes = vec![test_palette("Bright1", 1), test_palette("Wolf", 2)];
    let data: Vec<u8> = palettes.iter().flat_map(encode_palette).collect();
    let decoded = decode_palettes(&data).unwrap();
    assert_eq!(decoded, palettes);
    assert_eq!(decoded[1].colors[255], Rgb(255, 2, 1));
}

#[test]
fn test_decode_palettes_remainder() {
    let mut data = encode_palette(&test_palette("Bright1", 1));
    data.push(0);
    assert!(matches!(
        decode_palettes(&data),
        Err(Error::MalformedRecordStream { kind: "palette", .. })
    ));
}

#[test]
fn test_read_palettes_from_container() {
    let data = encode_palette(&test_palette("Bright1", 9));
    let file = crate::assets::container::build_container(&data, PALETTE_KEY, None);
    let palettes = read_palettes(&mut std::io::Cursor::new(file)).unwrap();
    assert_eq!(palettes.len(), 1);
    assert_eq!(palettes[0].name, "Bright1");
    assert_eq!(palettes[0].colors[3], Rgb(3, 9, 12));
}

#[test]
fn test_canonical_sprite_name() {
    assert_eq!(canonical_sprite_name("Wolf02-a (shadow)"), "Wolf");
    assert_eq!(canonical_sprite_name("Goblin 3"), "Goblin");
    assert_eq!(canonical_sprite_name("Tree12"), "Tree");
    assert_eq!(canonical_sprite_name("X1Y2"), "X1Y");
    assert_eq!(canonical_sprite_name("123"), "");
    assert_eq!(canonical_sprite_name(""), "");
}

#[test]
fn test_resolve_prefers_matching_palette() {
    let set = PaletteSet::new(vec![test_palette("Wolf", 1), test_palette("Bright1", 2)]).unwrap();
    assert_eq!(set.resolve("Wolf02-a (shadow)").name, "Wolf");
}

#[test]
fn test_resolve_falls_back_to_bright1() {
    let set = PaletteSet::new(vec![test_palette("Bright1", 2)]).unwrap();
    assert_eq!(set.resolve("Wolf02-a (shadow)").name, "Bright1");
    assert_eq!(set.resolve("anything").name, "Bright1");
}

#[test]
fn test_resolve_first_match_wins() {
    let set = PaletteSet::new(vec![
        test_palette("Bright1", 0),
        test_palette("WolfDark", 1),
        test_palette("Wolf", 2),
    ])
    .unwrap();
    assert_eq!(set.resolve("Wolf01").name, "WolfDark");
}

#[test]
fn test_missing_fallback_is_fatal() {
    let err = PaletteSet::new(vec![test_palette("Wolf", 1)]).unwrap_err();
    assert!(err.is_fatal());
    assert!(matches!(err, Error::MissingPaletteFallback(ref name) if name == "Bright1"));
}

#[test]
fn test_swatch() {
    let img = test_palette("Bright1", 4).swatch();
    assert_eq!((img.width, img.height), (16, 16));
    assert_eq!(img.pixel(1, 1), Some(Rgb(17, 4, 21)));
}

#[cfg(test)]
proptest::proptest! {
    #[test]
    fn prop_canonical_name_is_prefix(name in "\\PC{0,40}") {
        let canonical = canonical_sprite_name(&name);
        proptest::prop_assert!(name.starts_with(canonical));
        proptest::prop_assert!(!canonical.contains(' '));
        proptest::prop_assert!(!canonical.contains('-'));
        proptest::prop_assert!(!canonical.ends_with(|c: char| c.is_ascii_digit()));
    }
}
