use clap::ValueEnum;
use serde::Serialize;
use std::path::PathBuf;

/// A palette color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ImageColorType {
    Rgb,
}

impl ImageColorType {
    pub fn bpp(&self, depth: u8) -> u16 {
        match self {
            ImageColorType::Rgb => depth as u16 * 3,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, ValueEnum, PartialEq, Eq, PartialOrd, Ord)]
pub enum ImageOutputType {
    #[default]
    Png,
}

impl AsRef<str> for ImageOutputType {
    fn as_ref(&self) -> &str {
        match self {
            ImageOutputType::Png => "png",
        }
    }
}

#[derive(Clone, Debug)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub color_type: ImageColorType,
    pub depth: u8,
    pub data: Vec<u8>,
}

impl ImageData {
    /// Builds an 8-bit RGB image from resolved colors in row-major order.
    pub fn from_rgb(width: u32, height: u32, pixels: impl IntoIterator<Item = Rgb>) -> Self {
        let mut data = Vec::with_capacity(width as usize * height as usize * 3);
        for Rgb(r, g, b) in pixels {
            data.extend_from_slice(&[r, g, b]);
        }
        ImageData {
            width,
            height,
            color_type: ImageColorType::Rgb,
            depth: 8,
            data,
        }
    }

    /// Color at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let stride = self.color_type.bpp(self.depth) as usize / 8;
        let p = (y as usize * self.width as usize + x as usize) * stride;
        let px = self.data.get(p..p + 3)?;
        Some(Rgb(px[0], px[1], px[2]))
    }
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq, PartialOrd, Ord, Hash)]
/// Kind of asset found in a game install
pub enum AssetKind {
    /// World atlas (rt_map.dat)
    Rtmap,
    /// Sprite metadata container (.did)
    SpriteIds,
    /// Palette container (.dpd)
    Palettes,
    /// Sprite pixel archives (.dda)
    Sprites,
}

impl AsRef<str> for AssetKind {
    fn as_ref(&self) -> &str {
        match self {
            AssetKind::Rtmap => "rtmap",
            AssetKind::SpriteIds => "sprite ids",
            AssetKind::Palettes => "palettes",
            AssetKind::Sprites => "sprites",
        }
    }
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_ref())
    }
}

/// Settings for one extraction run.
#[derive(Clone, Debug)]
pub struct ExtractConfig {
    pub install_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Server folder inside the install directory holding custom game files.
    pub server: Option<String>,
    /// Number of worlds in rt_map.dat.
    pub worlds: usize,
    pub image_type: ImageOutputType,
    pub skip: Vec<AssetKind>,
}

impl ExtractConfig {
    pub fn wants(&self, kind: AssetKind) -> bool {
        !self.skip.contains(&kind)
    }
}

#[test]
fn test_image_from_rgb() {
    let img = ImageData::from_rgb(2, 1, [Rgb(1, 2, 3), Rgb(4, 5, 6)]);
    assert_eq!(img.data, vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(img.pixel(1, 0), Some(Rgb(4, 5, 6)));
    assert_eq!(img.pixel(2, 0), None);
}
