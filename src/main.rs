use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use dotswarm::engine::Engine;
use dotswarm::scene::load_scene;
use dotswarm::text::TextPainter;

#[derive(Debug, Parser)]
#[command(name = "dotswarm")]
#[command(about = "Particle shape-shifter renderer")]
#[command(version = version_string())]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Validate a scene file and print a summary.
    Check {
        scene: Option<PathBuf>,
    },
    /// Render the scene to PNG frames.
    Render {
        scene: Option<PathBuf>,
        #[arg(short = 'o', long = "output")]
        output: PathBuf,
        #[arg(long, default_value_t = 12)]
        seconds: u64,
        /// Write every Nth frame.
        #[arg(long, default_value_t = 1)]
        every: u64,
        /// TTF to use instead of the embedded pixel font.
        #[arg(long)]
        font: Option<PathBuf>,
    },
    /// Run the sequencer headlessly and print the switch log as JSON.
    Trace {
        scene: Option<PathBuf>,
        #[arg(long, default_value_t = 12)]
        seconds: u64,
        #[arg(long)]
        font: Option<PathBuf>,
    },
}

fn version_string() -> String {
    match option_env!("DOTSWARM_GIT_HASH") {
        Some(hash) => format!("{} ({hash})", env!("CARGO_PKG_VERSION")),
        None => env!("CARGO_PKG_VERSION").to_owned(),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check { scene } => run_check(scene.as_deref()),
        Commands::Render {
            scene,
            output,
            seconds,
            every,
            font,
        } => run_render(scene.as_deref(), &output, seconds, every, font.as_deref()),
        Commands::Trace {
            scene,
            seconds,
            font,
        } => run_trace(scene.as_deref(), seconds, font.as_deref()),
    }
}

fn painter_for(font: Option<&Path>) -> Result<TextPainter> {
    match font {
        Some(path) => {
            let bytes =
                fs::read(path).with_context(|| format!("failed to read font {}", path.display()))?;
            TextPainter::from_font_bytes(&bytes)
        }
        None => Ok(TextPainter::embedded()),
    }
}

fn run_check(scene_path: Option<&Path>) -> Result<()> {
    let scene = load_scene(scene_path)?;

    let source = scene_path.map_or_else(|| "<default>".to_owned(), |p| p.display().to_string());
    println!(
        "OK: {} ({}x{}, {} fps, seed {})",
        source, scene.canvas.width, scene.canvas.height, scene.fps, scene.seed
    );
    println!("Tokens: {}", scene.sequence.split('|').count());
    println!(
        "Custom shape: {} rows x {} columns",
        scene.custom_shape.grid.len(),
        scene.custom_shape.columns()
    );
    println!("Images: {}", scene.images.len());
    Ok(())
}

fn run_render(
    scene_path: Option<&Path>,
    output_dir: &Path,
    seconds: u64,
    every: u64,
    font: Option<&Path>,
) -> Result<()> {
    let scene = load_scene(scene_path)?;
    let mut engine = Engine::new(&scene, painter_for(font)?)?;

    fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;

    let fps = engine.fps() as u64;
    let total_frames = seconds * fps;
    let every = every.max(1);
    let mut written = 0u64;

    engine.start();
    for frame_index in 0..total_frames {
        engine.advance(frame_index * 1000 / fps)?;
        engine.tick_frame();

        if frame_index % every == 0 {
            let frame_path = output_dir.join(format!("frame_{frame_index:05}.png"));
            engine.save_frame(&frame_path)?;
            written += 1;
        }
        if frame_index % fps == 0 {
            eprintln!("rendered frame {}/{}", frame_index + 1, total_frames);
        }
    }
    engine.shutdown();

    println!("Wrote {} frames to {}", written, output_dir.display());
    Ok(())
}

fn run_trace(scene_path: Option<&Path>, seconds: u64, font: Option<&Path>) -> Result<()> {
    let scene = load_scene(scene_path)?;
    let mut engine = Engine::new(&scene, painter_for(font)?)?;

    let fps = engine.fps() as u64;
    engine.start();
    for frame_index in 0..seconds * fps {
        engine.advance(frame_index * 1000 / fps)?;
        engine.tick_frame();
    }
    engine.shutdown();

    println!("{}", serde_json::to_string_pretty(engine.switch_log())?);
    Ok(())
}
