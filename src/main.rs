use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{debug, info, warn};

use scrolly::cli::{Args, output_names};
use scrolly::config::{self, PathConfig, RendererConfig};
use scrolly::core::renderer_events::{CompletionChanged, PreloadProgress, ScrollMeasured};
use scrolly::core::scroll::{ScrollMetrics, ScrollProgress};
use scrolly::progress::LoadProgress;
use scrolly::{EventBus, FsAssetStore, RasterSurface, RendererPhase, ScrollyRenderer, Workers};

/// Height of the simulated scroll container, in viewport heights
const CONTAINER_VIEWPORTS: f64 = 5.0;

fn init_logging(args: &Args, path_config: &PathConfig) -> Result<()> {
    // 0 (default) = warn, 1 (-v) = info, 2 (-vv) = debug, 3+ (-vvv) = trace
    let log_level = match args.verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    if let Some(log_path_opt) = &args.log_file {
        let log_path = log_path_opt
            .as_ref()
            .cloned()
            .unwrap_or_else(|| config::data_file("scrolly.log", path_config));

        let file = std::fs::File::create(&log_path)
            .with_context(|| format!("Failed to create log file: {}", log_path.display()))?;

        env_logger::Builder::new()
            .filter_level(log_level)
            .format_timestamp_millis()
            .target(env_logger::Target::Pipe(Box::new(file)))
            .init();

        info!("Logging to file: {} (level: {:?})", log_path.display(), log_level);
    } else {
        // Console logging (respects RUST_LOG if set)
        env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or(log_level.as_str().to_lowercase()),
        )
        .format_timestamp_millis()
        .init();
    }
    Ok(())
}

fn load_config(args: &Args, path_config: &PathConfig) -> Result<RendererConfig> {
    let mut config = match &args.config {
        Some(path) => RendererConfig::load(path)?,
        None => RendererConfig::load_or_default(path_config)?,
    };
    if let Some(workers) = args.workers {
        config.workers = Some(workers);
    }
    config.validate()?;
    Ok(config)
}

/// Block until the preload settles, draining the bus queue meanwhile
fn wait_for_frames(renderer: &ScrollyRenderer<RasterSurface>, bus: &EventBus) -> RendererPhase {
    loop {
        let phase = renderer.phase();
        if !matches!(phase, RendererPhase::Loading { .. }) {
            return phase;
        }
        let drained = bus.poll().len();
        if drained > 0 {
            debug!("Drained {} queued events", drained);
        }
        std::thread::sleep(Duration::from_millis(10));
    }
}

fn render_positions(
    args: &Args,
    config: &RendererConfig,
    renderer: &ScrollyRenderer<RasterSurface>,
    bus: &EventBus,
) -> Result<()> {
    std::fs::create_dir_all(&args.out)
        .with_context(|| format!("Failed to create output dir: {}", args.out.display()))?;

    let viewport_h = args.size.height as f64;
    let mut metrics = ScrollMetrics {
        scroll_y: 0.0,
        container_top: 0.0,
        container_height: viewport_h * CONTAINER_VIEWPORTS,
        viewport_height: viewport_h,
    };

    let positions = args.positions();
    let names = output_names(&positions);
    for (p, name) in positions.into_iter().zip(names) {
        let progress = ScrollProgress::new(p);
        metrics.scroll_y = config.scroll_offset.scroll_for_progress(progress, &metrics);
        bus.emit(ScrollMeasured(metrics));

        let index = renderer.frame_index();
        let path = args.out.join(name);
        save_surface(renderer, &path)?;

        println!(
            "{:>7.3}% -> frame {:>4} -> {}{}",
            progress.value() * 100.0,
            index,
            path.display(),
            if renderer.is_complete() { " (complete)" } else { "" }
        );
    }
    bus.clear();
    Ok(())
}

fn save_surface(renderer: &ScrollyRenderer<RasterSurface>, path: &Path) -> Result<()> {
    renderer
        .with_surface(|surface| surface.save(path))
        .with_context(|| format!("Failed to write {}", path.display()))
}

fn main() -> Result<()> {
    let args = Args::parse();
    let path_config = PathConfig::from_env_and_cli(args.config_dir.clone());

    if args.log_file == Some(None) {
        if let Err(e) = config::ensure_dirs(&path_config) {
            eprintln!("Warning: Failed to create application directories: {}", e);
        }
    }
    init_logging(&args, &path_config)?;

    info!("Scrolly starting...");
    debug!("Command-line args: {:?}", args);
    info!(
        "Config path: {}",
        config::config_file(config::CONFIG_FILE, &path_config).display()
    );

    let config = load_config(&args, &path_config)?;
    info!(
        "Sequence: {} frames, {} .. {}",
        config.total_frames,
        config.frame_pattern.resolve(0),
        config.frame_pattern.resolve(config.total_frames - 1)
    );

    let bus = EventBus::new();
    let progress = LoadProgress::new(config.total_frames);
    let bar = progress.clone();
    bus.subscribe::<PreloadProgress, _>(move |e| bar.update(e));
    bus.subscribe::<CompletionChanged, _>(|e| {
        info!("Canvas layer {}", if e.complete { "retired" } else { "restored" });
    });

    let store = Arc::new(FsAssetStore::new(&args.assets));
    let pool = Arc::new(Workers::new(config.worker_threads()));
    info!("Workers: {} threads", pool.num_threads());

    let mut renderer = ScrollyRenderer::mount(
        &config,
        bus.clone(),
        store,
        pool,
        RasterSurface::new(args.size),
        args.size,
    );

    match wait_for_frames(&renderer, &bus) {
        RendererPhase::Failed { reason } => {
            progress.abandon("Failed to load frames");
            renderer.unmount();
            bail!("Failed to load frames: {}", reason);
        }
        _ => progress.finish(format!("Loaded {} frames", config.total_frames)),
    }

    let result = render_positions(&args, &config, &renderer, &bus);
    if let Err(e) = &result {
        warn!("Rendering stopped: {:#}", e);
    }
    renderer.unmount();
    result
}
