use flate2::Compression;
use flate2::write::ZlibEncoder;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use t4c_tool::assets::container::{PALETTE_KEY, SPRITE_ID_KEY};
use t4c_tool::assets::palette::PaletteSet;
use t4c_tool::assets::rtmap::RtMapLayout;
use t4c_tool::assets::sprite::SpriteArchives;
use t4c_tool::assets::sprite::header::HEADER_KEY;
use t4c_tool::assets::sprite_id::SpriteRecord;
use t4c_tool::diagnostics::Diagnostics;
use t4c_tool::error::Error;
use t4c_tool::extract::*;
use t4c_tool::locator::{GAME_FILES_DIR, PALETTE_FILE, SPRITE_ID_FILE, archive_file_name};
use t4c_tool::types::{AssetKind, ExtractConfig, ImageOutputType};

fn deflate(data: &[u8]) -> Vec<u8> {
    let mut e = ZlibEncoder::new(Vec::new(), Compression::fast());
    e.write_all(data).unwrap();
    e.finish().unwrap()
}

/// Builds a checksummed container. `digest` overrides the real MD5.
fn container(plain: &[u8], key: u8, digest: Option<&str>) -> Vec<u8> {
    let encrypted: Vec<u8> = plain.iter().map(|b| b ^ key).collect();
    let compressed = deflate(&encrypted);
    let digest = digest.map_or_else(
        || format!("{:x}", md5::compute(&encrypted)),
        str::to_string,
    );
    let digest = digest.as_bytes();
    let mut out = Vec::new();
    out.extend_from_slice(&digest[..16]);
    out.extend_from_slice(&(encrypted.len() as u32).to_le_bytes());
    out.extend_from_slice(&(compressed.len() as u32).to_le_bytes());
    out.extend_from_slice(&digest[16..]);
    out.push(0);
    out.extend_from_slice(&compressed);
    out.push(0);
    out
}

fn sprite_record(name: &str, path: &str, offset: u32, index: u64) -> Vec<u8> {
    let mut out = name.as_bytes().to_vec();
    out.resize(64, 0);
    let mut p = path.as_bytes().to_vec();
    p.resize(256, 0);
    out.extend_from_slice(&p);
    out.extend_from_slice(&offset.to_le_bytes());
    out.extend_from_slice(&index.to_le_bytes());
    out
}

fn palette(name: &str, rgb: impl Fn(u8) -> [u8; 3]) -> Vec<u8> {
    let mut out = name.as_bytes().to_vec();
    out.resize(64, 0);
    for i in 0..=255u8 {
        out.extend_from_slice(&rgb(i));
    }
    out
}

/// One encrypted sprite: header followed by payload.
fn sprite(sprite_type: u16, width: u16, height: u16, size_uncompressed: u32, payload: &[u8]) -> Vec<u8> {
    let mut header = Vec::with_capacity(28);
    header.extend_from_slice(&sprite_type.to_le_bytes());
    header.extend_from_slice(&0u16.to_le_bytes());
    header.extend_from_slice(&width.to_le_bytes());
    header.extend_from_slice(&height.to_le_bytes());
    header.extend_from_slice(&[0; 12]);
    header.extend_from_slice(&size_uncompressed.to_le_bytes());
    header.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    let mut out: Vec<u8> = header.iter().zip(HEADER_KEY).map(|(b, k)| b ^ k).collect();
    out.extend_from_slice(payload);
    out
}

/// Concatenates sprites into an archive, returning their offsets.
fn archive(sprites: &[Vec<u8>]) -> (Vec<u8>, Vec<u32>) {
    let mut out = b"DDA\0".to_vec();
    let mut offsets = Vec::new();
    for s in sprites {
        offsets.push(out.len() as u32 - 4);
        out.extend_from_slice(s);
    }
    (out, offsets)
}

fn temp_dir(name: &str) -> PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!("t4c-extract-{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&path);
    std::fs::create_dir_all(&path).unwrap();
    path
}

fn record(name: &str, path: &str, archive_offset: u32, archive_index: u64) -> SpriteRecord {
    SpriteRecord {
        name: name.into(),
        path: path.into(),
        archive_offset,
        archive_index,
    }
}

fn read_png(path: &Path) -> (u32, u32, Vec<u8>) {
    let file = std::io::BufReader::new(std::fs::File::open(path).unwrap());
    let mut reader = png::Decoder::new(file).read_info().unwrap();
    let (width, height) = (reader.info().width, reader.info().height);
    let mut buf = vec![0; width as usize * height as usize * 3];
    let info = reader.next_frame(&mut buf).unwrap();
    buf.truncate(info.buffer_size());
    (info.width, info.height, buf)
}

#[test]
fn mismatched_sprite_id_container_yields_no_records() {
    let data = sprite_record("Wolf01", "Monsters", 0, 0);
    let file = container(&data, SPRITE_ID_KEY, Some("0123456789abcdef0123456789abcdef"));
    let mut diag = Diagnostics::new();
    let records = load_sprite_ids(&mut Cursor::new(file), &mut diag);
    assert!(records.is_none());
    assert_eq!(diag.warnings().len(), 1);
    assert_eq!(diag.warnings()[0].subject, "sprite ids");
    assert!(matches!(
        diag.warnings()[0].error,
        Error::ChecksumMismatch { ref expected, .. } if expected == "0123456789abcdef0123456789abcdef"
    ));
    assert_eq!(diag.counter().ok(), 0);
}

#[test]
fn valid_sprite_id_container() {
    let mut data = sprite_record("Wolf01", "Monsters\\Wolf", 12, 1);
    data.extend(sprite_record("Tree", "", 0, 0));
    let file = container(&data, SPRITE_ID_KEY, None);
    let mut diag = Diagnostics::new();
    let records = load_sprite_ids(&mut Cursor::new(file), &mut diag).unwrap();
    assert_eq!(
        records,
        vec![
            record("Wolf01", "Monsters\\Wolf", 12, 1),
            record("Tree", "", 0, 0)
        ]
    );
    assert!(diag.is_clean());
}

#[test]
fn rtmap_worlds_fail_independently() {
    let width = 4;
    let height = 2;
    let mut good = vec![0u8, 1, 0, 1, 1, 0, 1, 0];
    good.extend_from_slice(&[255, 0, 0, 0, 0, 255]);
    let short = vec![0u8; 3];
    let worlds = [deflate(&good), deflate(&short), deflate(&good)];

    let mut file = Vec::new();
    file.extend_from_slice(&0u32.to_le_bytes());
    for w in &worlds {
        file.extend_from_slice(&(w.len() as u32).to_le_bytes());
    }
    let mut offset = 4 + 8 * worlds.len();
    for w in &worlds {
        file.extend_from_slice(&(offset as u32).to_le_bytes());
        offset += w.len();
    }
    for w in &worlds {
        file.extend_from_slice(w);
    }

    let out = temp_dir("rtmap");
    let layout = RtMapLayout {
        worlds: 3,
        width,
        height,
    };
    let mut diag = Diagnostics::new();
    extract_rtmap(Cursor::new(file), layout, &out, ImageOutputType::Png, &mut diag).unwrap();
    assert_eq!(diag.counter().ok(), 2);
    assert_eq!(diag.counter().skipped(), 1);
    assert_eq!(diag.warnings()[0].subject, "world 1");
    assert!(matches!(
        diag.warnings()[0].error,
        Error::PixelCountMismatch { .. }
    ));
    assert!(!out.join("world1.png").exists());
    let (w, h, pixels) = read_png(&out.join("world2.png"));
    assert_eq!((w, h), (4, 2));
    assert_eq!(&pixels[..6], &[255, 0, 0, 0, 0, 255]);
    let _ = std::fs::remove_dir_all(&out);
}

#[test]
fn sprite_batch_isolates_failures() {
    let bright = palette("Bright1", |i| [i, i, i]);
    let wolf = palette("Wolf", |i| [i, 0, 0]);
    let mut palettes_data = bright;
    palettes_data.extend(wolf);
    let mut diag = Diagnostics::new();
    let palettes = load_palettes(
        &mut Cursor::new(container(&palettes_data, PALETTE_KEY, None)),
        &mut diag,
    )
    .unwrap();

    let (dda, offsets) = archive(&[
        sprite(1, 2, 1, 2, &[1, 2]),
        // literal run longer than the sprite row
        sprite(2, 2, 1, 0, &[3, 0, 0, 2, 0, 1, 1, 0]),
        sprite(7, 1, 1, 1, &[0]),
        sprite(9, 2, 1, 2, &deflate(&[5, 6])),
    ]);
    let mut archives = SpriteArchives::new();
    archives.insert(0, Cursor::new(dda));
    let records = vec![
        record("Wolf01", "Monsters\\Wolf", offsets[0], 0),
        record("Broken", "Misc", offsets[1], 0),
        record("Odd", "Misc", offsets[2], 0),
        record("Lost", "Misc", 0, 3),
        record("Wolf01", "Monsters\\Wolf", offsets[3], 0),
    ];

    let palettes = PaletteSet::new(palettes).unwrap();
    let out = temp_dir("sprites");
    extract_sprites(
        &records,
        &mut archives,
        &palettes,
        &out,
        ImageOutputType::Png,
        &mut diag,
    )
    .unwrap();

    assert_eq!(diag.counter().ok(), 2);
    assert_eq!(diag.counter().skipped(), 3);
    let subjects: Vec<&str> = diag.warnings().iter().map(|w| w.subject.as_str()).collect();
    assert_eq!(subjects, vec!["Broken", "Odd", "Lost"]);
    assert!(matches!(diag.warnings()[0].error, Error::RleOutOfBounds { .. }));
    assert!(matches!(
        diag.warnings()[1].error,
        Error::UnrecognizedSpriteType(7)
    ));
    assert!(matches!(diag.warnings()[2].error, Error::MissingArchive(3)));

    let dir = out.join("Monsters").join("Wolf");
    let (_, _, first) = read_png(&dir.join("Wolf01.png"));
    assert_eq!(first, vec![1, 0, 0, 2, 0, 0]);
    let (_, _, second) = read_png(&dir.join("Wolf01-1.png"));
    assert_eq!(second, vec![5, 0, 0, 6, 0, 0]);
    let _ = std::fs::remove_dir_all(&out);
}

#[test]
fn extract_all_from_install() {
    let install = temp_dir("install");
    let game_files = install.join(GAME_FILES_DIR);
    std::fs::create_dir_all(&game_files).unwrap();

    let (dda, offsets) = archive(&[sprite(1, 1, 1, 1, &[7])]);
    std::fs::write(game_files.join(archive_file_name(0)), dda).unwrap();
    let mut ids = sprite_record("Rock", "Nature\\..\\Rocks", offsets[0], 0);
    ids.extend(sprite_record("Tree", "Nature", 0, 5));
    std::fs::write(
        game_files.join(SPRITE_ID_FILE),
        container(&ids, SPRITE_ID_KEY, None),
    )
    .unwrap();
    std::fs::write(
        game_files.join(PALETTE_FILE),
        container(&palette("Bright1", |i| [i, 1, 2]), PALETTE_KEY, None),
    )
    .unwrap();

    let out = install.join("out");
    let config = ExtractConfig {
        install_dir: install.clone(),
        output_dir: out.clone(),
        server: Some("saga".into()),
        worlds: 8,
        image_type: ImageOutputType::Png,
        skip: vec![],
    };
    let mut diag = Diagnostics::new();
    extract_all(&config, &mut diag).unwrap();

    // rt_map.dat and archive 5 are missing
    let subjects: Vec<&str> = diag.warnings().iter().map(|w| w.subject.as_str()).collect();
    assert_eq!(subjects, vec!["rtmap", "v2datai5.dda", "Tree"]);
    assert!(matches!(diag.warnings()[0].error, Error::NotFound(_)));
    assert!(matches!(diag.warnings()[2].error, Error::MissingArchive(5)));

    let json = std::fs::read_to_string(out.join("sprite").join("sprites.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value[0]["name"], "Rock");
    assert_eq!(value[1]["archive_index"], 5);

    let json = std::fs::read_to_string(out.join("palette").join("palettes.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value[0]["name"], "Bright1");
    assert_eq!(value[0]["colors"][3], serde_json::json!([3, 1, 2]));
    let (w, h, _) = read_png(&out.join("palette").join("Bright1.png"));
    assert_eq!((w, h), (16, 16));

    let rock = out
        .join("sprite")
        .join("images")
        .join("Nature")
        .join("Rocks")
        .join("Rock.png");
    let (_, _, pixels) = read_png(&rock);
    assert_eq!(pixels, vec![7, 1, 2]);

    // the palette swatch and the rock sprite
    assert_eq!(diag.counter().ok(), 2);
    assert_eq!(diag.counter().skipped(), 1);
    let _ = std::fs::remove_dir_all(&install);
}

#[test]
fn sprites_need_the_fallback_palette() {
    let install = temp_dir("fatal");
    let game_files = install.join(GAME_FILES_DIR);
    std::fs::create_dir_all(&game_files).unwrap();
    std::fs::write(
        game_files.join(SPRITE_ID_FILE),
        container(&sprite_record("Rock", "", 0, 0), SPRITE_ID_KEY, None),
    )
    .unwrap();
    std::fs::write(
        game_files.join(PALETTE_FILE),
        container(&palette("Dark", |i| [i, i, i]), PALETTE_KEY, None),
    )
    .unwrap();
    let config = ExtractConfig {
        install_dir: install.clone(),
        output_dir: install.join("out"),
        server: None,
        worlds: 8,
        image_type: ImageOutputType::Png,
        skip: vec![AssetKind::Rtmap, AssetKind::Palettes, AssetKind::SpriteIds],
    };
    let mut diag = Diagnostics::new();
    let err = extract_all(&config, &mut diag).unwrap_err();
    assert!(err.is_fatal());
    assert!(matches!(err, Error::MissingPaletteFallback(_)));
    // archive 0 is absent, so no archive was looked up before the check
    assert!(diag.is_clean());
    let _ = std::fs::remove_dir_all(&install);
}

#[test]
fn sprites_stop_on_unreadable_palettes() {
    let install = temp_dir("bad-palettes");
    let game_files = install.join(GAME_FILES_DIR);
    std::fs::create_dir_all(&game_files).unwrap();
    let (dda, offsets) = archive(&[sprite(1, 1, 1, 1, &[7])]);
    std::fs::write(game_files.join(archive_file_name(0)), dda).unwrap();
    std::fs::write(
        game_files.join(SPRITE_ID_FILE),
        container(&sprite_record("Rock", "", offsets[0], 0), SPRITE_ID_KEY, None),
    )
    .unwrap();
    std::fs::write(
        game_files.join(PALETTE_FILE),
        container(
            &palette("Bright1", |i| [i, i, i]),
            PALETTE_KEY,
            Some("0123456789abcdef0123456789abcdef"),
        ),
    )
    .unwrap();
    let out = install.join("out");
    let config = ExtractConfig {
        install_dir: install.clone(),
        output_dir: out.clone(),
        server: None,
        worlds: 8,
        image_type: ImageOutputType::Png,
        skip: vec![AssetKind::Rtmap],
    };
    let mut diag = Diagnostics::new();
    let err = extract_all(&config, &mut diag).unwrap_err();
    assert!(matches!(err, Error::MissingPaletteFallback(_)));
    assert_eq!(diag.warnings().len(), 1);
    assert_eq!(diag.warnings()[0].subject, "palettes");
    assert!(matches!(
        diag.warnings()[0].error,
        Error::ChecksumMismatch { .. }
    ));
    assert!(out.join("sprite").join("sprites.json").exists());
    assert!(!out.join("sprite").join("images").exists());
    assert_eq!(diag.counter().ok(), 0);
    let _ = std::fs::remove_dir_all(&install);
}
