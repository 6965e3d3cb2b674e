use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "shaderstack",
    author,
    version,
    about = "Render a stack of GLSL scenes through a post-processing effect chain"
)]
pub struct Cli {
    /// TOML config file; falls back to `$SHADERSTACK_CONFIG`, then the user config dir.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Override the window/render size (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_surface_size)]
    pub size: Option<(u32, u32)>,

    /// Render a single still frame at this timestamp (seconds) instead of animating.
    #[arg(long, value_name = "SECONDS")]
    pub still_time: Option<f32>,

    /// Render one frame offscreen, save it to this PNG path, then exit.
    #[arg(long, value_name = "PATH")]
    pub export: Option<PathBuf>,

    /// Print the effective configuration as TOML and exit.
    #[arg(long)]
    pub print_config: bool,

    /// Validate every scene and effect shader without opening a window, then exit.
    #[arg(long)]
    pub check: bool,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_surface_size(value: &str) -> Result<(u32, u32)> {
    let trimmed = value.trim();
    let (width, height) = trimmed
        .split_once(['x', 'X', '×'])
        .ok_or_else(|| anyhow::anyhow!("expected WxH format, e.g. 1920x1080"))?;

    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid width in size"))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid height in size"))?;

    if width == 0 || height == 0 {
        anyhow::bail!("surface dimensions must be greater than zero");
    }

    Ok((width, height))
}
