use clap::Parser;
use std::collections::HashSet;
use std::path::PathBuf;

use crate::core::scroll::ScrollProgress;
use crate::entities::SurfaceSize;

/// Most decimals tried when making output names unique
const MAX_NAME_DECIMALS: usize = 9;

/// Render a scroll-scrubbed frame sequence at chosen scroll positions
///
/// Loads the whole sequence, then simulates a container five viewports tall and
/// writes one PNG per requested scroll progress.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Directory frame locators are resolved against
    #[arg(short = 'a', long = "assets", value_name = "DIR")]
    pub assets: PathBuf,

    /// Renderer config file (default: scrolly.json from the config directory)
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Custom configuration directory (overrides default platform paths)
    #[arg(short = 'c', long = "config-dir", value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    /// Viewport size
    #[arg(short = 's', long = "size", value_name = "WxH", default_value = "1280x720")]
    pub size: SurfaceSize,

    /// Scroll progress to render, 0..1 (can be specified multiple times)
    #[arg(short = 'p', long = "progress", value_name = "P")]
    pub progress: Vec<f64>,

    /// Render N evenly spaced positions from 0 to 1
    #[arg(long = "sweep", value_name = "N")]
    pub sweep: Option<usize>,

    /// Output directory for rendered PNGs
    #[arg(short = 'o', long = "out", value_name = "DIR", default_value = "scrolly_out")]
    pub out: PathBuf,

    /// Worker threads override (default: config, then number of CPUs)
    #[arg(long = "workers", value_name = "N")]
    pub workers: Option<usize>,

    /// Enable debug logging to file (default: scrolly.log)
    #[arg(short = 'l', long = "log", value_name = "LOG_FILE")]
    pub log_file: Option<Option<PathBuf>>,

    /// Increase logging verbosity (default: warn, -v: info, -vv: debug, -vvv+: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,
}

impl Args {
    /// Requested progress values in render order, clamped to [0,1], each once.
    /// Progress 0 if none were given.
    pub fn positions(&self) -> Vec<f64> {
        let mut requested = self.progress.clone();
        if let Some(n) = self.sweep {
            match n {
                0 => {}
                1 => requested.push(0.0),
                n => requested.extend((0..n).map(|i| i as f64 / (n - 1) as f64)),
            }
        }

        let mut seen = HashSet::new();
        let mut out: Vec<f64> = requested
            .into_iter()
            .map(|p| ScrollProgress::new(p).value())
            .filter(|p| seen.insert(p.to_bits()))
            .collect();
        if out.is_empty() {
            out.push(0.0);
        }
        out
    }
}

fn name_at(progress: f64, decimals: usize) -> String {
    let width = if decimals == 0 { 3 } else { 4 + decimals };
    format!(
        "frame_at_{:0width$.prec$}.png",
        progress * 100.0,
        width = width,
        prec = decimals
    )
}

/// Output file names for `positions`: `frame_at_<percent>.png` with just enough
/// decimals that no two positions share a name.
pub fn output_names(positions: &[f64]) -> Vec<String> {
    for decimals in 0..=MAX_NAME_DECIMALS {
        let names: Vec<String> = positions.iter().map(|&p| name_at(p, decimals)).collect();
        let unique: HashSet<&str> = names.iter().map(String::as_str).collect();
        if unique.len() == names.len() {
            return names;
        }
    }
    // Positions closer than the widest name can show: number them
    positions
        .iter()
        .enumerate()
        .map(|(i, &p)| {
            let name = name_at(p, MAX_NAME_DECIMALS);
            format!("{}_{}.png", name.trim_end_matches(".png"), i)
        })
        .collect()
}
