//! MirrorInk replay driver.
//!
//! Replays a JSON script of input against a headless drawing session, writes
//! the resulting PNG and optionally stores it in the on-disk library.

mod script;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use mirrorink_core::{DrawingSession, FileStore, Library, export_file_name};
use script::{Runner, Script};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "mirrorink-replay", about = "Replay MirrorInk input scripts and manage the drawing library")]
struct Cli {
    /// Library directory (defaults to the platform data directory).
    #[arg(long, global = true)]
    library: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a script and export the composite.
    Replay {
        script: PathBuf,
        /// Output PNG (defaults to `mirror-drawing-<millis>.png`).
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Divide the preset canvas size by this factor.
        #[arg(long, default_value_t = 1)]
        scale: u32,
        /// Also save the result to the library.
        #[arg(long)]
        save: bool,
        /// Library name for the saved drawing.
        #[arg(long)]
        name: Option<String>,
    },
    /// List saved drawings, newest first.
    List,
    /// Write a saved drawing's composite to a PNG file.
    Export {
        id: String,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Load a saved drawing through a session and re-export it at a scale.
    Render {
        id: String,
        #[arg(long, short)]
        output: Option<PathBuf>,
        #[arg(long, default_value_t = 1)]
        scale: u32,
    },
    Rename {
        id: String,
        name: String,
    },
    Delete {
        id: String,
    },
}

fn open_library(dir: Option<&Path>) -> Result<Library<FileStore>> {
    let store = match dir {
        Some(dir) => FileStore::new(dir.to_path_buf()),
        None => FileStore::default_location(),
    }
    .context("opening library")?;
    Ok(Library::new(store))
}

fn write_png(path: &Path, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))?;
    log::info!("Wrote {}", path.display());
    Ok(())
}

fn replay(
    library_dir: Option<&Path>,
    script_path: &Path,
    output: Option<PathBuf>,
    scale: u32,
    save: bool,
    name: Option<&str>,
) -> Result<()> {
    let script = Script::from_file(script_path)?;
    let mut session = DrawingSession::with_scale(script.settings.clone(), scale);
    session.on_change(|change| log::trace!("session change: {:?}", change));

    let base_dir = script_path.parent().unwrap_or(Path::new("."));
    Runner::new(&mut session, base_dir).run(&script)?;

    let output = output.unwrap_or_else(|| PathBuf::from(export_file_name(chrono::Utc::now().timestamp_millis())));
    write_png(&output, &session.export_png()?)?;

    if save {
        let library = open_library(library_dir)?;
        let record = pollster::block_on(session.save_to_library(&library, name))?;
        println!("{}\t{}", record.id, record.name);
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let library_dir = cli.library.as_deref();

    match cli.command {
        Command::Replay {
            script,
            output,
            scale,
            save,
            name,
        } => replay(library_dir, &script, output, scale, save, name.as_deref())?,
        Command::List => {
            let library = open_library(library_dir)?;
            for drawing in pollster::block_on(library.list()) {
                let layers = drawing.layers.as_ref().map_or(1, Vec::len);
                println!(
                    "{}\t{}\t{}\t{} layer(s)\t{}",
                    drawing.id, drawing.version, drawing.timestamp, layers, drawing.name
                );
            }
        }
        Command::Export { id, output } => {
            let library = open_library(library_dir)?;
            let Some(drawing) = pollster::block_on(library.get(&id)) else {
                bail!("no drawing with id {id}");
            };
            let output = output.unwrap_or_else(|| PathBuf::from(drawing.download_file_name()));
            write_png(&output, &drawing.composite_png()?)?;
        }
        Command::Render { id, output, scale } => {
            let library = open_library(library_dir)?;
            let Some(drawing) = pollster::block_on(library.get(&id)) else {
                bail!("no drawing with id {id}");
            };
            let mut session = DrawingSession::with_scale(drawing.settings.clone(), scale);
            pollster::block_on(session.load_from_library(&drawing))?;
            let output = output.unwrap_or_else(|| PathBuf::from(drawing.download_file_name()));
            write_png(&output, &session.export_png()?)?;
        }
        Command::Rename { id, name } => {
            let library = open_library(library_dir)?;
            pollster::block_on(library.rename(&id, &name))?;
        }
        Command::Delete { id } => {
            let library = open_library(library_dir)?;
            pollster::block_on(library.delete(&id))?;
        }
    }
    Ok(())
}
