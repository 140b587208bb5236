//! Batch extraction of a whole install.
//!
//! Each asset kind is extracted on its own, and within a kind every world or
//! sprite is a separate unit: a unit that fails is recorded in the
//! [`Diagnostics`] and the batch moves on. Only a missing fallback palette
//! stops a run, and it is checked before any sprite archive is opened.
use crate::assets::palette::{Palette, PaletteSet, read_palettes};
use crate::assets::rtmap::{RtMap, RtMapLayout};
use crate::assets::sprite::SpriteArchives;
use crate::assets::sprite_id::{SpriteRecord, read_sprite_ids};
use crate::diagnostics::Diagnostics;
use crate::error::Result;
use crate::locator::AssetLocator;
use crate::types::{AssetKind, ExtractConfig, ImageOutputType};
use crate::utils::files::{
    make_sure_dir_exists, sanitize_component, sanitize_relative_path, write_file,
};
use crate::utils::img::encode_img;
use std::collections::{BTreeSet, HashSet};
use std::fs::File;
use std::io::{BufReader, Read, Seek, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const RTMAP_OUTPUT_DIR: &str = "rtmap";
pub const SPRITE_OUTPUT_DIR: &str = "sprite";
pub const SPRITE_IMAGE_DIR: &str = "images";
pub const PALETTE_OUTPUT_DIR: &str = "palette";
pub const SPRITE_IDS_JSON: &str = "sprites.json";
pub const PALETTES_JSON: &str = "palettes.json";

fn open_asset(path: &Path) -> Result<BufReader<File>> {
    Ok(BufReader::new(File::open(path)?))
}

/// Returns `dir/stem.ext`, or `dir/stem-k.ext` if an earlier call of the run
/// already handed out that path.
fn unique_output_path(dir: &Path, stem: &str, ext: &str, used: &mut HashSet<PathBuf>) -> PathBuf {
    let mut path = dir.join(format!("{}.{}", stem, ext));
    let mut k = 1;
    while !used.insert(path.clone()) {
        path = dir.join(format!("{}-{}.{}", stem, k, ext));
        k += 1;
    }
    path
}

fn write_json<T: serde::Serialize + ?Sized>(value: &T, path: &Path) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    make_sure_dir_exists(path)?;
    let mut f = write_file(path)?;
    f.write_all(s.as_bytes())?;
    f.flush()?;
    Ok(())
}

/// Writes every world of the atlas as `world<i>` into `output_dir`.
pub fn extract_rtmap<R: Read + Seek>(
    reader: R,
    layout: RtMapLayout,
    output_dir: &Path,
    typ: ImageOutputType,
    diag: &mut Diagnostics,
) -> Result<()> {
    let mut map = RtMap::new(reader, layout)?;
    for world in 0..map.world_count() {
        let filename = output_dir.join(format!("world{}.{}", world, typ.as_ref()));
        info!("Extracting rtmap {} to {}", world, filename.display());
        let result = map
            .read_world(world)
            .and_then(|w| w.to_image())
            .and_then(|img| encode_img(&img, typ, &filename));
        match result {
            Ok(()) => diag.decoded(),
            Err(e) => diag.skip(format!("world {}", world), e),
        }
    }
    Ok(())
}

/// Reads the sprite ids. A container that fails verification yields no
/// records and one warning.
pub fn load_sprite_ids<R: Read + Seek>(
    reader: &mut R,
    diag: &mut Diagnostics,
) -> Option<Vec<SpriteRecord>> {
    match read_sprite_ids(reader) {
        Ok(records) => {
            info!("Read {} sprite ids", records.len());
            Some(records)
        }
        Err(e) => {
            diag.warn(AssetKind::SpriteIds.as_ref(), e);
            None
        }
    }
}

pub fn load_palettes<R: Read + Seek>(reader: &mut R, diag: &mut Diagnostics) -> Option<Vec<Palette>> {
    match read_palettes(reader) {
        Ok(palettes) => {
            info!("Read {} palettes", palettes.len());
            Some(palettes)
        }
        Err(e) => {
            diag.warn(AssetKind::Palettes.as_ref(), e);
            None
        }
    }
}

pub fn write_sprite_ids(records: &[SpriteRecord], output_dir: &Path) -> Result<PathBuf> {
    let path = output_dir.join(SPRITE_IDS_JSON);
    info!("Extracting sprite ids to {}", path.display());
    write_json(records, &path)?;
    Ok(path)
}

/// Writes `palettes.json` and one swatch image per palette.
pub fn write_palettes(
    palettes: &[Palette],
    output_dir: &Path,
    typ: ImageOutputType,
    diag: &mut Diagnostics,
) -> Result<()> {
    let path = output_dir.join(PALETTES_JSON);
    info!("Extracting palettes to {}", path.display());
    write_json(palettes, &path)?;
    let mut used = HashSet::new();
    for palette in palettes {
        let stem = sanitize_component(&palette.name);
        let filename = unique_output_path(output_dir, &stem, typ.as_ref(), &mut used);
        match encode_img(&palette.swatch(), typ, &filename) {
            Ok(()) => diag.decoded(),
            Err(e) => diag.skip(palette.name.as_str(), e),
        }
    }
    Ok(())
}

/// Output file of a sprite below `output_dir`, following its logical path.
pub fn sprite_output_path(
    output_dir: &Path,
    record: &SpriteRecord,
    typ: ImageOutputType,
    used: &mut HashSet<PathBuf>,
) -> PathBuf {
    let dir = output_dir.join(sanitize_relative_path(&record.path));
    unique_output_path(&dir, &sanitize_component(&record.name), typ.as_ref(), used)
}

/// Decodes and writes every sprite of `records`.
pub fn extract_sprites<R: Read + Seek>(
    records: &[SpriteRecord],
    archives: &mut SpriteArchives<R>,
    palettes: &PaletteSet,
    output_dir: &Path,
    typ: ImageOutputType,
    diag: &mut Diagnostics,
) -> Result<()> {
    let mut used = HashSet::new();
    for record in records {
        let result = archives.decode(record, palettes).and_then(|sprite| {
            let filename = sprite_output_path(output_dir, record, typ, &mut used);
            encode_img(&sprite.image, typ, &filename)
        });
        match result {
            Ok(()) => diag.decoded(),
            Err(e) => diag.skip(record.name.as_str(), e),
        }
    }
    Ok(())
}

/// Opens every archive the records refer to. Archives that cannot be found
/// or opened are left out with a warning.
pub fn open_archives(
    locator: &AssetLocator,
    records: &[SpriteRecord],
    diag: &mut Diagnostics,
) -> SpriteArchives<BufReader<File>> {
    let indices: BTreeSet<u64> = records.iter().map(|r| r.archive_index).collect();
    let mut archives = SpriteArchives::new();
    for index in indices {
        let Some(path) = locator.locate_archive(index, diag) else {
            continue;
        };
        match open_asset(&path) {
            Ok(file) => archives.insert(index, file),
            Err(e) => diag.warn(path.display().to_string(), e),
        }
    }
    archives
}

fn open_kind(
    locator: &AssetLocator,
    kind: AssetKind,
    diag: &mut Diagnostics,
) -> Option<BufReader<File>> {
    let path = locator.locate_kind(kind, diag)?;
    match open_asset(&path) {
        Ok(file) => Some(file),
        Err(e) => {
            diag.warn(kind.as_ref(), e);
            None
        }
    }
}

/// Extracts every asset kind `config` asks for.
///
/// Returns an error only for failures that stop the run, see
/// [`crate::error::Error::is_fatal`].
pub fn extract_all(config: &ExtractConfig, diag: &mut Diagnostics) -> Result<()> {
    let locator = AssetLocator::from_config(config);
    let out = &config.output_dir;

    if config.wants(AssetKind::Rtmap) {
        if let Some(file) = open_kind(&locator, AssetKind::Rtmap, diag) {
            let layout = RtMapLayout::with_worlds(config.worlds);
            let dir = out.join(RTMAP_OUTPUT_DIR);
            if let Err(e) = extract_rtmap(file, layout, &dir, config.image_type, diag) {
                diag.warn(AssetKind::Rtmap.as_ref(), e);
            }
        }
    }

    let sprites = config.wants(AssetKind::Sprites);
    let records = if config.wants(AssetKind::SpriteIds) || sprites {
        open_kind(&locator, AssetKind::SpriteIds, diag)
            .and_then(|mut file| load_sprite_ids(&mut file, diag))
    } else {
        None
    };
    if config.wants(AssetKind::SpriteIds) {
        if let Some(records) = &records {
            let dir = out.join(SPRITE_OUTPUT_DIR);
            if let Err(e) = write_sprite_ids(records, &dir) {
                diag.warn(AssetKind::SpriteIds.as_ref(), e);
            }
        }
    }

    let palettes = if config.wants(AssetKind::Palettes) || sprites {
        open_kind(&locator, AssetKind::Palettes, diag)
            .and_then(|mut file| load_palettes(&mut file, diag))
    } else {
        None
    };
    if config.wants(AssetKind::Palettes) {
        if let Some(palettes) = &palettes {
            let dir = out.join(PALETTE_OUTPUT_DIR);
            if let Err(e) = write_palettes(palettes, &dir, config.image_type, diag) {
                diag.warn(AssetKind::Palettes.as_ref(), e);
            }
        }
    }

    if sprites {
        // an unreadable palette container leaves no fallback either
        let palettes = PaletteSet::new(palettes.unwrap_or_default())?;
        match records {
            Some(records) => {
                let mut archives = open_archives(&locator, &records, diag);
                let dir = out.join(SPRITE_OUTPUT_DIR).join(SPRITE_IMAGE_DIR);
                extract_sprites(
                    &records,
                    &mut archives,
                    &palettes,
                    &dir,
                    config.image_type,
                    diag,
                )?;
            }
            None => warn!("Sprite ids are unavailable, skipping sprites"),
        }
    }
    Ok(())
}

#[test]
fn test_unique_output_path() {
    let mut used = HashSet::new();
    let dir = Path::new("out");
    assert_eq!(
        unique_output_path(dir, "Wolf", "png", &mut used),
        dir.join("Wolf.png")
    );
    assert_eq!(
        unique_output_path(dir, "Wolf", "png", &mut used),
        dir.join("Wolf-1.png")
    );
    assert_eq!(
        unique_output_path(dir, "Wolf", "png", &mut used),
        dir.join("Wolf-2.png")
    );
}

#[test]
fn test_sprite_output_path() {
    let mut used = HashSet::new();
    let record = SpriteRecord {
        name: "Wolf02-a (shadow)".into(),
        path: "Monsters\\Wolf".into(),
        archive_offset: 0,
        archive_index: 0,
    };
    let path = sprite_output_path(Path::new("out"), &record, ImageOutputType::Png, &mut used);
    assert_eq!(
        path,
        Path::new("out")
            .join("Monsters")
            .join("Wolf")
            .join("Wolf02-a (shadow).png")
    );
}

#[test]
fn test_missing_archive_skips_sprite() {
    let records = vec![SpriteRecord {
        name: "Wolf".into(),
        path: String::new(),
        archive_offset: 0,
        archive_index: 2,
    }];
    let palettes = PaletteSet::new(vec![Palette {
        name: "Bright1".into(),
        colors: vec![Default::default(); 256],
    }])
    .unwrap();
    let mut archives: SpriteArchives<std::io::Cursor<Vec<u8>>> = SpriteArchives::new();
    let mut diag = Diagnostics::new();
    extract_sprites(
        &records,
        &mut archives,
        &palettes,
        Path::new("unused"),
        ImageOutputType::Png,
        &mut diag,
    )
    .unwrap();
    assert_eq!(diag.counter().skipped(), 1);
    assert_eq!(diag.warnings()[0].subject, "Wolf");
    assert!(matches!(
        diag.warnings()[0].error,
        crate::error::Error::MissingArchive(2)
    ));
}
