// Command line interface module
// Handles parsing of command line arguments and expansion of image paths

use crate::coordinator::ViewerConfig;
use crate::error::ViewerError;
use crate::geometry::Size;
use crate::image_loader::{format_from_extension, ImageSource};
use crate::wayland::{MAX_SIZE, MIN_SIZE};
use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, error};
use std::fs;
use std::path::{Path, PathBuf};

/// wimgv - A simple panning image viewer for Wayland
#[derive(Parser, Debug)]
#[command(name = "wimgv")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Image files or directories of images to show
    #[arg(value_name = "IMAGE", required_unless_present = "keybindings")]
    pub files: Vec<PathBuf>,

    /// Initial width of the window
    #[arg(long, default_value = "600", value_parser = parse_window_side)]
    pub width: u32,

    /// Initial height of the window
    #[arg(long, default_value = "600", value_parser = parse_window_side)]
    pub height: u32,

    /// Resize the window to the first image displayed
    #[arg(long)]
    pub auto_resize: bool,

    /// The increment (in pixels) used to pan the image with h, j, k, l
    #[arg(long, default_value = "20", value_parser = parse_dimension)]
    pub increment: u32,

    /// Print all keybindings and exit
    #[arg(long)]
    pub keybindings: bool,

    /// Print debug logging to stderr
    #[arg(short, long)]
    pub verbose: bool,
}

/// Arguments resolved into what the viewer needs
#[derive(Debug)]
pub struct ParsedArgs {
    pub sources: Vec<ImageSource>,
    pub config: ViewerConfig,
}

/// Parse a non-zero pixel count
fn parse_dimension(s: &str) -> Result<u32, String> {
    let value: u32 = s.parse().map_err(|_| "Invalid pixel value")?;
    if value == 0 {
        return Err("Value must be non-zero".to_string());
    }
    Ok(value)
}

/// Parse a window side, which the window itself limits to `MIN_SIZE..=MAX_SIZE`
fn parse_window_side(s: &str) -> Result<u32, String> {
    let value = parse_dimension(s)?;
    if !(MIN_SIZE..=MAX_SIZE).contains(&value) {
        return Err(format!(
            "Window size must be between {} and {}",
            MIN_SIZE, MAX_SIZE
        ));
    }
    Ok(value)
}

/// Resolve parsed arguments, expanding directories into image files
pub fn resolve(args: Args) -> Result<ParsedArgs> {
    let files = find_files(&args.files);
    if files.is_empty() {
        return Err(ViewerError::NoImages(args.files).into());
    }

    Ok(ParsedArgs {
        sources: files.into_iter().map(ImageSource::new).collect(),
        config: ViewerConfig {
            initial_viewport: Size::new(args.width, args.height),
            step: args.increment,
            auto_resize: args.auto_resize,
        },
    })
}

/// Expand the arguments into a flat list of files.
///
/// Directories contribute the image files directly inside them, sorted by
/// name. Paths that cannot be accessed are reported and skipped.
pub fn find_files(args: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in args {
        match fs::metadata(path) {
            Err(e) => error!("Can't access {}: {}", path.display(), e),
            Ok(meta) if meta.is_dir() => match dir_images(path) {
                Ok(found) => files.extend(found),
                Err(e) => error!("{:#}", e),
            },
            Ok(_) => files.push(path.clone()),
        }
    }
    files
}

/// Image files directly inside `dir`
fn dir_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_image_file(path))
        .collect();
    files.sort();

    debug!("Found {} images in {}", files.len(), dir.display());
    Ok(files)
}

fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(format_from_extension)
        .is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directories_expand_to_sorted_images() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.png", "a.JPG", "notes.txt", "c.gif"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("nested.png")).unwrap();

        let files = find_files(&[dir.path().to_path_buf()]);
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.JPG", "b.png", "c.gif"]);
    }

    #[test]
    fn plain_files_are_kept_in_order_and_missing_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let second = dir.path().join("z.dat");
        let first = dir.path().join("y.png");
        fs::write(&second, b"x").unwrap();
        fs::write(&first, b"x").unwrap();

        let files = find_files(&[
            second.clone(),
            dir.path().join("missing.png"),
            first.clone(),
        ]);
        assert_eq!(files, vec![second, first]);
    }

    #[test]
    fn dimensions_must_be_non_zero() {
        assert_eq!(parse_dimension("20"), Ok(20));
        assert!(parse_dimension("0").is_err());
        assert!(parse_dimension("-3").is_err());
    }

    #[test]
    fn window_sides_stay_within_window_limits() {
        assert_eq!(parse_window_side("50"), Ok(50));
        assert_eq!(parse_window_side("8192"), Ok(8192));
        assert!(parse_window_side("20").is_err());
        assert!(parse_window_side("9000").is_err());

        assert!(Args::try_parse_from(["wimgv", "--width", "20", "a.png"]).is_err());
        assert!(Args::try_parse_from(["wimgv", "--height", "9000", "a.png"]).is_err());
        let args = Args::try_parse_from(["wimgv", "--width", "50", "--height", "8192", "a.png"])
            .unwrap();
        assert_eq!((args.width, args.height), (50, 8192));
    }

    #[test]
    fn resolve_builds_config_and_sources() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.png");
        fs::write(&path, b"x").unwrap();
        let args = Args::try_parse_from([
            "wimgv",
            "--increment",
            "7",
            "--auto-resize",
            path.to_str().unwrap(),
        ])
        .unwrap();

        let parsed = resolve(args).unwrap();
        assert_eq!(parsed.sources, vec![ImageSource::new(&path)]);
        assert_eq!(parsed.config.step, 7);
        assert!(parsed.config.auto_resize);
        assert_eq!(parsed.config.initial_viewport, Size::new(600, 600));
    }

    #[test]
    fn resolve_fails_without_usable_files() {
        let args = Args::try_parse_from(["wimgv", "/definitely/not/here.png"]).unwrap();
        let err = resolve(args).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ViewerError>(),
            Some(ViewerError::NoImages(_))
        ));
    }

    #[test]
    fn args_parse_with_defaults() {
        let args = Args::try_parse_from(["wimgv", "a.png", "b.png"]).unwrap();
        assert_eq!(args.files.len(), 2);
        assert_eq!((args.width, args.height, args.increment), (600, 600, 20));
        assert!(!args.auto_resize);
    }

    #[test]
    fn files_required_unless_listing_keybindings() {
        assert!(Args::try_parse_from(["wimgv"]).is_err());
        assert!(Args::try_parse_from(["wimgv", "--keybindings"]).is_ok());
        assert!(Args::try_parse_from(["wimgv", "--width", "0", "a.png"]).is_err());
    }
}
