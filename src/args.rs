use crate::types::*;
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

/// Tools for extracting The 4th Coming game assets
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Arg {
    #[arg(global = true, action = ArgAction::SetTrue, short, long)]
    /// Print backtrace on error
    pub backtrace: bool,
    #[arg(global = true, action = ArgAction::SetTrue, short, long)]
    /// Print debug logs
    pub verbose: bool,
    #[command(subcommand)]
    /// Command
    pub command: Command,
}

#[derive(Args, Debug)]
pub struct ExtractArgs {
    #[arg(short = 'i', long = "install-directory")]
    /// Install directory of T4C
    pub install_dir: PathBuf,
    #[arg(short = 'o', long = "output-directory")]
    /// Output directory for extracted files
    pub output_dir: PathBuf,
    #[arg(short = 's', long)]
    /// Server from which to extract the data. By default the genuine files
    /// are extracted, but an install can contain server-specific folders with
    /// custom maps: top level folders holding a "game files" subfolder, such
    /// as "neerya" or "saga".
    pub server: Option<String>,
    #[arg(long, default_value_t = crate::assets::rtmap::RTMAP_WORLDS)]
    /// Number of worlds in rt_map.dat (5 for old clients)
    pub worlds: usize,
    #[arg(long, value_enum)]
    /// Asset kinds to leave out
    pub skip: Vec<AssetKind>,
    #[arg(long, value_enum, default_value_t = ImageOutputType::Png)]
    /// Output image type
    pub image_type: ImageOutputType,
}

impl ExtractArgs {
    pub fn to_config(&self) -> ExtractConfig {
        ExtractConfig {
            install_dir: self.install_dir.clone(),
            output_dir: self.output_dir.clone(),
            server: self.server.clone(),
            worlds: self.worlds,
            image_type: self.image_type,
            skip: self.skip.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
/// Commands
pub enum Command {
    /// Extract world maps, sprite ids, palettes and sprites
    Extract(ExtractArgs),
}

pub fn parse_args() -> Arg {
    Arg::parse()
}

#[test]
fn test_parse_extract() {
    let arg = Arg::try_parse_from([
        "t4c", "-v", "extract", "-i", "T4C", "-o", "out", "-s", "neerya", "--worlds", "5",
        "--skip", "sprites", "--skip", "sprite-ids",
    ])
    .unwrap();
    assert!(arg.verbose);
    assert!(!arg.backtrace);
    let Command::Extract(args) = arg.command;
    let config = args.to_config();
    assert_eq!(config.install_dir, PathBuf::from("T4C"));
    assert_eq!(config.server.as_deref(), Some("neerya"));
    assert_eq!(config.worlds, 5);
    assert!(!config.wants(AssetKind::Sprites));
    assert!(!config.wants(AssetKind::SpriteIds));
    assert!(config.wants(AssetKind::Rtmap));
    assert_eq!(config.image_type, ImageOutputType::Png);
}

#[test]
fn test_parse_defaults() {
    let arg = Arg::try_parse_from(["t4c", "extract", "-i", "T4C", "-o", "out"]).unwrap();
    let Command::Extract(args) = arg.command;
    assert_eq!(args.worlds, 8);
    assert!(args.server.is_none());
    assert!(args.skip.is_empty());
}
