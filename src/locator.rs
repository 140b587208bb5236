//! Finds asset files inside a game install.
//!
//! An install keeps its files in `game files/`. Servers shipping custom maps
//! add a top level folder of their own (`neerya/game files/`, ...), which is
//! searched first when a server is given.
use crate::diagnostics::Diagnostics;
use crate::error::Error;
use crate::types::{AssetKind, ExtractConfig};
use crate::utils::files::find_file_ignore_case;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const GAME_FILES_DIR: &str = "game files";
pub const RTMAP_FILE: &str = "rt_map.dat";
pub const SPRITE_ID_FILE: &str = "v2datai.did";
pub const PALETTE_FILE: &str = "v2colori.dpd";

/// File name of the sprite archive with the given number.
pub fn archive_file_name(index: u64) -> String {
    format!("v2datai{}.dda", index)
}

/// File holding a single-file asset kind. Sprites are spread over several
/// archives and have none.
pub fn asset_file_name(kind: AssetKind) -> Option<&'static str> {
    match kind {
        AssetKind::Rtmap => Some(RTMAP_FILE),
        AssetKind::SpriteIds => Some(SPRITE_ID_FILE),
        AssetKind::Palettes => Some(PALETTE_FILE),
        AssetKind::Sprites => None,
    }
}

#[derive(Clone, Debug)]
pub struct AssetLocator {
    install_dir: PathBuf,
    server: Option<String>,
}

impl AssetLocator {
    pub fn new(install_dir: impl Into<PathBuf>, server: Option<String>) -> Self {
        AssetLocator {
            install_dir: install_dir.into(),
            server,
        }
    }

    pub fn from_config(config: &ExtractConfig) -> Self {
        Self::new(&config.install_dir, config.server.clone())
    }

    fn genuine_dir(&self) -> PathBuf {
        self.install_dir.join(GAME_FILES_DIR)
    }

    fn server_dir(&self) -> Option<PathBuf> {
        self.server
            .as_ref()
            .map(|s| self.install_dir.join(s).join(GAME_FILES_DIR))
    }

    /// Finds `file_name`, preferring the server folder.
    ///
    /// When neither folder has the file a warning is recorded for `subject`.
    pub fn locate(
        &self,
        subject: &str,
        file_name: &str,
        diag: &mut Diagnostics,
    ) -> Option<PathBuf> {
        if let Some(dir) = self.server_dir() {
            if let Some(path) = find_file_ignore_case(&dir, file_name) {
                info!("Using {} file: {}", subject, path.display());
                return Some(path);
            }
            warn!("File {} does not exist", dir.join(file_name).display());
            warn!(
                "Falling back to genuine {}",
                self.genuine_dir().join(file_name).display()
            );
        }
        let dir = self.genuine_dir();
        match find_file_ignore_case(&dir, file_name) {
            Some(path) => {
                info!("Using {} file: {}", subject, path.display());
                Some(path)
            }
            None => {
                diag.warn(subject, Error::NotFound(dir.join(file_name)));
                None
            }
        }
    }

    /// Finds the file of a single-file asset kind.
    pub fn locate_kind(&self, kind: AssetKind, diag: &mut Diagnostics) -> Option<PathBuf> {
        let file_name = asset_file_name(kind)?;
        self.locate(kind.as_ref(), file_name, diag)
    }

    /// Finds the sprite archive with the given number.
    pub fn locate_archive(&self, index: u64, diag: &mut Diagnostics) -> Option<PathBuf> {
        let file_name = archive_file_name(index);
        self.locate(&file_name, &file_name, diag)
    }

    pub fn install_dir(&self) -> &Path {
        &self.install_dir
    }
}

#[cfg(test)]
fn test_install(name: &str) -> PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!("t4c-locator-{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&path);
    std::fs::create_dir_all(path.join(GAME_FILES_DIR)).unwrap();
    std::fs::create_dir_all(path.join("neerya").join(GAME_FILES_DIR)).unwrap();
    path
}

#[test]
fn test_archive_file_name() {
    assert_eq!(archive_file_name(3), "v2datai3.dda");
    assert_eq!(asset_file_name(AssetKind::Palettes), Some("v2colori.dpd"));
    assert_eq!(asset_file_name(AssetKind::Sprites), None);
}

#[test]
fn test_locate_prefers_server() {
    let install = test_install("server");
    let genuine = install.join(GAME_FILES_DIR).join(RTMAP_FILE);
    let custom = install.join("neerya").join(GAME_FILES_DIR).join(RTMAP_FILE);
    std::fs::write(&genuine, b"genuine").unwrap();
    std::fs::write(&custom, b"custom").unwrap();
    let mut diag = Diagnostics::new();

    let locator = AssetLocator::new(&install, Some("neerya".into()));
    assert_eq!(locator.locate_kind(AssetKind::Rtmap, &mut diag), Some(custom));
    let locator = AssetLocator::new(&install, None);
    assert_eq!(locator.locate_kind(AssetKind::Rtmap, &mut diag), Some(genuine));
    assert!(diag.is_clean());
    let _ = std::fs::remove_dir_all(&install);
}

#[test]
fn test_locate_falls_back_to_genuine() {
    let install = test_install("fallback");
    std::fs::write(install.join(GAME_FILES_DIR).join("V2DATAI.DID"), b"x").unwrap();
    let mut diag = Diagnostics::new();
    let locator = AssetLocator::new(&install, Some("neerya".into()));
    let found = locator.locate_kind(AssetKind::SpriteIds, &mut diag).unwrap();
    assert_eq!(found.file_name().unwrap(), "V2DATAI.DID");
    assert!(diag.is_clean());
    let _ = std::fs::remove_dir_all(&install);
}

#[test]
fn test_locate_missing_warns() {
    let install = test_install("missing");
    let mut diag = Diagnostics::new();
    let locator = AssetLocator::new(&install, Some("neerya".into()));
    assert_eq!(locator.locate_kind(AssetKind::Palettes, &mut diag), None);
    assert_eq!(locator.locate_archive(4, &mut diag), None);
    assert_eq!(diag.warnings().len(), 2);
    assert_eq!(diag.warnings()[0].subject, "palettes");
    assert!(matches!(diag.warnings()[0].error, Error::NotFound(_)));
    assert_eq!(diag.warnings()[1].subject, "v2datai4.dda");
    let _ = std::fs::remove_dir_all(&install);
}
