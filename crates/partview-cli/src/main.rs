//! partview - inspect 3D models and manage projects in a project store
//!
//! Subcommands:
//! - `inspect`: load a local model and print its parts, optionally picking
//!   the part under a screen point
//! - `list`: list stored projects
//! - `open`: open a stored project and print its parts as reconciled
//! - `create`: upload a model as a new project
//! - `edit`: change a project's transform, name, notes or one part
//! - `delete`: delete a project
//! - `quote`: show, save or export a project's quote
//!
//! With `--offline` every command runs against an in-process store that
//! lives for one invocation.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use partview_sync::{HttpProjectStore, MemoryProjectStore, ProjectStore, ProjectSync, SyncConfig};

mod commands;
mod report;

#[derive(Parser, Debug)]
#[command(name = "partview")]
#[command(about = "Inspect 3D models and manage stored projects", long_about = None)]
struct Cli {
    /// Project store base URL
    #[arg(long, global = true, env = "PARTVIEW_API_URL")]
    api_url: Option<String>,

    /// Use an in-memory store instead of the REST API
    #[arg(long, global = true)]
    offline: bool,

    /// Print JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load a local model file and print its parts
    Inspect(InspectArgs),
    /// List stored projects
    List,
    /// Open a stored project
    Open(OpenArgs),
    /// Upload a model as a new project
    Create(commands::CreateArgs),
    /// Change a stored project
    Edit(commands::EditArgs),
    /// Delete a stored project
    Delete(commands::DeleteArgs),
    /// Show, update or export a project's quote
    Quote(commands::QuoteArgs),
}

#[derive(Args, Debug)]
struct InspectArgs {
    /// Model file (stl, obj, ply, gltf, glb, 3mf)
    file: PathBuf,

    /// Fit the camera and pick the part under this screen point, given in
    /// normalized device coordinates as x,y (-1..1, +y up)
    #[arg(long, value_parser = commands::parse_ndc)]
    pick: Option<glam::Vec2>,
}

#[derive(Args, Debug)]
struct OpenArgs {
    /// Project id
    id: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if cli.offline {
        let mut sync = ProjectSync::headless(MemoryProjectStore::new());
        return run(&mut sync, cli.command, cli.json).await;
    }

    let mut config = SyncConfig::from_env();
    if let Some(url) = cli.api_url {
        config = config.with_api_url(url);
    }
    let mut sync = ProjectSync::headless(HttpProjectStore::new(config)?);
    run(&mut sync, cli.command, cli.json).await
}

async fn run<S: ProjectStore>(sync: &mut ProjectSync<S>, command: Command, json: bool) -> Result<()> {
    match command {
        Command::Inspect(args) => commands::inspect(sync, &args.file, args.pick, json),
        Command::List => commands::list(sync, json).await,
        Command::Open(args) => commands::open(sync, &args.id, json).await,
        Command::Create(args) => commands::create(sync, args).await,
        Command::Edit(args) => commands::edit(sync, args).await,
        Command::Delete(args) => commands::delete(sync, args).await,
        Command::Quote(args) => commands::quote(sync, args, json).await,
    }
}
