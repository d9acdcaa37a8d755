//! Subcommand handlers.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::Args;
use glam::Vec2;
use partview_core::{Color, MaterialPreset, PartId, Vec3Value};
use partview_sync::{ProjectDraft, ProjectStore, ProjectSync, QuoteItem};
use tracing::info;

use crate::report;

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Model file to upload
    file: PathBuf,

    /// Project name
    #[arg(long)]
    name: String,

    #[arg(long, default_value = "")]
    author: String,

    /// Password protecting later edits
    #[arg(long, env = "PARTVIEW_PASSWORD")]
    password: String,

    /// Date shown in the project list
    #[arg(long, default_value = "")]
    date: String,

    /// Initial position as x,y,z
    #[arg(long, value_parser = parse_vec3)]
    position: Option<Vec3Value>,

    /// Initial rotation in degrees as x,y,z
    #[arg(long, value_parser = parse_vec3)]
    rotation: Option<Vec3Value>,
}

#[derive(Args, Debug)]
pub struct EditArgs {
    /// Project id
    id: String,

    #[arg(long, env = "PARTVIEW_PASSWORD")]
    password: String,

    /// New position as x,y,z
    #[arg(long, value_parser = parse_vec3)]
    position: Option<Vec3Value>,

    /// New rotation in degrees as x,y,z
    #[arg(long, value_parser = parse_vec3)]
    rotation: Option<Vec3Value>,

    /// New project name
    #[arg(long)]
    rename: Option<String>,

    /// Project notes
    #[arg(long)]
    notes: Option<String>,

    /// Replace the model with this file
    #[arg(long)]
    model: Option<PathBuf>,

    /// Part to edit (0-based id)
    #[arg(long)]
    part: Option<u32>,

    #[arg(long, requires = "part")]
    part_name: Option<String>,

    #[arg(long, requires = "part")]
    part_notes: Option<String>,

    /// Part color as #rrggbb
    #[arg(long, requires = "part")]
    color: Option<Color>,

    /// plastic, metal, roughMetal, rubber or glass
    #[arg(long, requires = "part")]
    preset: Option<MaterialPreset>,
}

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Project id
    id: String,

    #[arg(long, env = "PARTVIEW_PASSWORD")]
    password: String,
}

#[derive(Args, Debug)]
pub struct QuoteArgs {
    /// Project id
    id: String,

    /// Append a line as concepto:cantidad:precio
    #[arg(long = "add", value_parser = parse_quote_item)]
    items: Vec<QuoteItem>,

    /// Write the spreadsheet export to this path
    #[arg(long)]
    export: Option<PathBuf>,
}

fn parse_vec3(s: &str) -> std::result::Result<Vec3Value, String> {
    let values = s
        .split(',')
        .map(|v| v.trim().parse::<f32>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid number in '{s}': {e}"))?;
    match values[..] {
        [x, y, z] => Ok(Vec3Value::new(x, y, z)),
        _ => Err(format!("expected x,y,z, got '{s}'")),
    }
}

pub fn parse_ndc(s: &str) -> std::result::Result<Vec2, String> {
    let values = s
        .split(',')
        .map(|v| v.trim().parse::<f32>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid number in '{s}': {e}"))?;
    match values[..] {
        [x, y] if (-1.0..=1.0).contains(&x) && (-1.0..=1.0).contains(&y) => Ok(Vec2::new(x, y)),
        [_, _] => Err(format!("'{s}' is outside -1..1")),
        _ => Err(format!("expected x,y, got '{s}'")),
    }
}

fn parse_quote_item(s: &str) -> std::result::Result<QuoteItem, String> {
    let mut fields = s.rsplitn(3, ':');
    let (Some(precio), Some(cantidad), Some(concepto)) = (fields.next(), fields.next(), fields.next())
    else {
        return Err(format!("expected concepto:cantidad:precio, got '{s}'"));
    };
    let number = |v: &str| {
        v.trim()
            .parse::<f64>()
            .map_err(|e| format!("invalid number '{v}': {e}"))
    };
    Ok(QuoteItem::new(concepto.trim(), number(cantidad)?, number(precio)?))
}

fn read_model(path: &Path) -> Result<(String, Vec<u8>)> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .context("Model path has no file name")?
        .to_string();
    Ok((file_name, bytes))
}

pub fn inspect<S: ProjectStore>(
    sync: &mut ProjectSync<S>,
    path: &Path,
    pick: Option<Vec2>,
    json: bool,
) -> Result<()> {
    let (file_name, bytes) = read_model(path)?;
    sync.load_local_file(&file_name, &bytes)?;
    let Some(ndc) = pick else {
        return report::model(sync.session(), json);
    };

    let session = sync.session_mut();
    session.fit_camera()?;
    let hit = session.pick_at(ndc, 1.0, Instant::now());
    report::pick(session, ndc, hit.as_ref(), json)
}

pub async fn list<S: ProjectStore>(sync: &mut ProjectSync<S>, json: bool) -> Result<()> {
    let projects = sync.refresh_projects().await?;
    report::projects(projects, json)
}

pub async fn open<S: ProjectStore>(sync: &mut ProjectSync<S>, id: &str, json: bool) -> Result<()> {
    sync.refresh_projects().await?;
    sync.open_project(id).await?;
    if let Some(record) = sync.active_project() {
        report::project_header(record, json);
    }
    report::model(sync.session(), json)
}

/// Load the file locally so its parts and transform go up with it, then
/// create and open the project.
pub async fn create<S: ProjectStore>(sync: &mut ProjectSync<S>, args: CreateArgs) -> Result<()> {
    let (file_name, bytes) = read_model(&args.file)?;
    sync.load_local_file(&file_name, &bytes)?;
    if let Some(position) = args.position {
        sync.session_mut().set_position(position);
    }
    if let Some(rotation) = args.rotation {
        sync.session_mut().set_rotation(rotation);
    }

    let id = sync
        .create_project(ProjectDraft {
            name: args.name,
            author: args.author,
            password: args.password,
            date: args.date,
            file_name,
            bytes,
        })
        .await?;
    println!("{id}");
    sync.open_project(&id).await?;
    report::model(sync.session(), false)
}

pub async fn edit<S: ProjectStore>(sync: &mut ProjectSync<S>, args: EditArgs) -> Result<()> {
    sync.refresh_projects().await?;
    sync.open_project(&args.id).await?;
    let password = args.password.as_str();
    let mut changed = false;

    if let Some(path) = &args.model {
        let (file_name, bytes) = read_model(path)?;
        sync.replace_model(&file_name, bytes, password).await?;
        sync.open_project(&args.id).await?;
        changed = true;
    }
    if args.position.is_some() || args.rotation.is_some() {
        let session = sync.session_mut();
        if let Some(position) = args.position {
            session.set_position(position);
        }
        if let Some(rotation) = args.rotation {
            session.set_rotation(rotation);
        }
        sync.save_transform(password).await?;
        changed = true;
    }
    if let Some(name) = &args.rename {
        sync.rename_project(name, password).await?;
        changed = true;
    }
    if let Some(notes) = &args.notes {
        sync.save_notes(notes, password).await?;
        changed = true;
    }
    if let Some(part) = args.part.map(PartId) {
        let session = sync.session_mut();
        if let Some(name) = &args.part_name {
            session.set_part_name(part, name.as_str())?;
        }
        if let Some(notes) = &args.part_notes {
            session.set_part_notes(part, notes.as_str())?;
        }
        if let Some(color) = args.color {
            session.set_part_color(part, color)?;
        }
        if let Some(preset) = args.preset {
            session.set_part_preset(part, preset)?;
        }
        sync.save_part_meta(part, password).await?;
        changed = true;
    }

    if !changed {
        bail!("nothing to change; see `partview edit --help`");
    }
    info!(id = %args.id, "project updated");
    Ok(())
}

pub async fn delete<S: ProjectStore>(sync: &mut ProjectSync<S>, args: DeleteArgs) -> Result<()> {
    sync.delete_project(&args.id, &args.password).await?;
    println!("deleted {}", args.id);
    Ok(())
}

pub async fn quote<S: ProjectStore>(sync: &mut ProjectSync<S>, args: QuoteArgs, json: bool) -> Result<()> {
    let mut quote = sync.load_quote(&args.id).await?;
    if !args.items.is_empty() {
        quote.items.extend(args.items);
        quote = sync.save_quote(&args.id, quote).await?;
    }
    report::quote(&quote, json)?;

    if let Some(path) = &args.export {
        let bytes = sync.export_quote(&args.id).await?;
        std::fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;
        println!("exported to {}", path.display());
    }
    Ok(())
}
