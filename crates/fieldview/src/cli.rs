use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "fieldview",
    author,
    version,
    about = "Preview and export procedural pixel-field layers",
    arg_required_else_help = false
)]
pub struct Args {
    /// Layer preset file (TOML). Defaults to the built-in duotone layers.
    #[arg(long, value_name = "PATH")]
    pub preset: Option<PathBuf>,

    /// Name of the layer to render from the preset file.
    #[arg(long, value_name = "NAME", default_value = "background")]
    pub layer: String,

    /// Window or export size (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", default_value = "1280x720")]
    pub size: String,

    /// Freeze the animation clock, as for reduced-motion environments.
    #[arg(long)]
    pub reduced_motion: bool,

    /// Render a single still to this PNG path instead of opening a window.
    #[arg(long, value_name = "PATH")]
    pub export: Option<PathBuf>,

    /// Animation time of the exported still, in seconds.
    #[arg(long, value_name = "SECONDS", default_value_t = 0.0)]
    pub time: f32,
}

pub fn parse() -> Args {
    Args::parse()
}

/// Parses a `WIDTHxHEIGHT` dimension string.
pub fn parse_size(value: &str) -> Result<(u32, u32)> {
    let Some((width, height)) = value.split_once(['x', 'X']) else {
        bail!("expected WIDTHxHEIGHT, got `{value}`");
    };
    let width: u32 = width.trim().parse()?;
    let height: u32 = height.trim().parse()?;
    if width == 0 || height == 0 {
        bail!("size must be non-zero, got `{value}`");
    }
    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::parse_size;

    #[test]
    fn parses_well_formed_sizes() {
        assert_eq!(parse_size("1280x720").unwrap(), (1280, 720));
        assert_eq!(parse_size("640X480").unwrap(), (640, 480));
        assert_eq!(parse_size(" 800 x 600 ").unwrap(), (800, 600));
    }

    #[test]
    fn rejects_malformed_sizes() {
        assert!(parse_size("1280").is_err());
        assert!(parse_size("0x720").is_err());
        assert!(parse_size("axb").is_err());
    }
}
