//! tilebrot-app - headless renderer
//!
//! Renders a view of the Mandelbrot set to a PNG, optionally after playing a
//! fly tour, and can save or resume sessions.

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tilebrot::prelude::*;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ProfileArg {
    /// Low iteration budget, fast
    Coarse,
    /// Twice the coarse budget
    Fine,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PaletteArg {
    Bernstein,
    Grayscale,
}

#[derive(Parser)]
#[command(name = "tilebrot")]
#[command(about = "Render tiles of the Mandelbrot set", long_about = None)]
struct Args {
    /// View width in pixels
    #[arg(long, default_value = "800")]
    width: u32,

    /// View height in pixels
    #[arg(long, default_value = "600")]
    height: u32,

    /// Iteration preset
    #[arg(long, value_enum, default_value = "coarse")]
    profile: ProfileArg,

    /// JSON configuration file, overrides --profile
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum, default_value = "bernstein")]
    palette: PaletteArg,

    /// Zoom level (0 or a power of two)
    #[arg(long)]
    zoom: Option<u32>,

    /// Real part of the view centre
    #[arg(long, allow_hyphen_values = true)]
    center_x: Option<f64>,

    /// Imaginary part of the view centre
    #[arg(long, allow_hyphen_values = true)]
    center_y: Option<f64>,

    /// Play the built-in fly tour before rendering
    #[arg(long)]
    tour: bool,

    /// Play a fly tape from a JSON file before rendering
    #[arg(long, conflicts_with = "tour")]
    tape: Option<PathBuf>,

    /// Output PNG path
    #[arg(long, default_value = "tilebrot.png")]
    output: PathBuf,

    /// Resume the session stored in this file
    #[arg(long)]
    load_session: Option<PathBuf>,

    /// Store the final session in this file
    #[arg(long)]
    save_session: Option<PathBuf>,

    /// Give up on the snapshot after this many seconds
    #[arg(long, default_value = "120")]
    timeout: u64,
}

fn main() -> anyhow::Result<()> {
    tilebrot::init_logging();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => ViewerConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => match args.profile {
            ProfileArg::Coarse => ViewerProfile::Coarse.resolve(),
            ProfileArg::Fine => ViewerProfile::Fine.resolve(),
        },
    };
    let palette = match args.palette {
        PaletteArg::Bernstein => Palette::Bernstein,
        PaletteArg::Grayscale => Palette::Grayscale,
    };

    let mut viewer = FractalViewer::new(
        config,
        Arc::new(MandelbrotKernel::new(palette)),
        Box::new(NoopKeepAwake),
    )?;
    viewer.apply(Command::Resize {
        width: args.width as i32,
        height: args.height as i32,
    })?;

    if let Some(path) = &args.load_session {
        let state = SessionState::load(path)
            .with_context(|| format!("loading session {}", path.display()))?;
        viewer.context_mut().restore_state(&state)?;
    }
    if let Some(zoom) = args.zoom {
        viewer.apply(Command::ZoomTo(zoom))?;
    }
    if args.center_x.is_some() || args.center_y.is_some() {
        let current = viewer.context().center();
        let center = RealPoint::new(
            args.center_x.unwrap_or(current.x),
            args.center_y.unwrap_or(current.y),
        );
        viewer.context_mut().pan_to_real(center);
    }

    let tape = match &args.tape {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading tape {}", path.display()))?;
            Some(serde_json::from_str::<FlyTape>(&json)?)
        }
        None if args.tour => Some(FlyTape::demo()),
        None => None,
    };
    if let Some(tape) = tape {
        viewer.fly_mut().set_tape(tape);
        viewer.apply(Command::StartFly)?;
        viewer.run_until_idle();
        log::info!("tour finished in {:?}", viewer.fly().elapsed());
    }

    let snapshots = viewer.snapshots();
    viewer.apply(Command::StartSnapshot {
        width: args.width,
        height: args.height,
    })?;
    viewer.run_until_idle();
    let image = match snapshots.recv_timeout(Duration::from_secs(args.timeout)) {
        Ok(image) => image,
        Err(_) => bail!("snapshot did not finish within {}s", args.timeout),
    };
    image
        .save(&args.output)
        .with_context(|| format!("writing {}", args.output.display()))?;
    println!("{} -> {}", viewer.context().caption(), args.output.display());

    if let Some(path) = &args.save_session {
        viewer.context().save_state()?.save(path)?;
    }

    viewer.shutdown();
    Ok(())
}
