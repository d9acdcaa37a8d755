//! Terminal and JSON output.

use anyhow::Result;
use glam::Vec2;
use partview_core::Part;
use partview_sync::{ProjectRecord, Quote};
use partview_viewer::{Hit, RenderBackend, ViewerSession};
use serde::Serialize;

#[derive(Serialize)]
struct ModelReport<'a> {
    format: Option<String>,
    meshes: usize,
    bounds_min: [f32; 3],
    bounds_max: [f32; 3],
    ground_offset: f32,
    parts: &'a [Part],
}

pub fn model<B: RenderBackend>(session: &ViewerSession<B>, json: bool) -> Result<()> {
    let Some(model) = session.active_model() else {
        println!("no model loaded");
        return Ok(());
    };
    let bounds = model.scene.world_bounds();
    let report = ModelReport {
        format: session.format().map(|f| f.to_string()),
        meshes: model.scene.mesh_count(),
        bounds_min: bounds.min.to_array(),
        bounds_max: bounds.max.to_array(),
        ground_offset: session.ground_offset(),
        parts: session.parts(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "{} model, {} parts, bounds {:?} .. {:?}",
        report.format.as_deref().unwrap_or("unknown"),
        report.parts.len(),
        report.bounds_min,
        report.bounds_max
    );
    if report.ground_offset != 0.0 {
        println!("snapped to ground by {:+.3}", report.ground_offset);
    }
    println!("{:>4}  {:<24} {:<8} {:<10} {:<7} notes", "id", "name", "color", "preset", "visible");
    for part in report.parts {
        println!(
            "{:>4}  {:<24} {:<8} {:<10} {:<7} {}",
            part.id.0,
            part.name,
            part.color.to_hex(),
            part.material_preset.as_str(),
            part.visible,
            part.notes
        );
    }
    Ok(())
}

#[derive(Serialize)]
struct PickReport<'a> {
    ndc: [f32; 2],
    part: Option<&'a Part>,
    distance: Option<f32>,
    point: Option<[f32; 3]>,
}

pub fn pick<B: RenderBackend>(
    session: &ViewerSession<B>,
    ndc: Vec2,
    hit: Option<&Hit>,
    json: bool,
) -> Result<()> {
    let report = PickReport {
        ndc: ndc.to_array(),
        part: hit.and_then(|h| session.part(h.part)),
        distance: hit.map(|h| h.distance),
        point: hit.map(|h| h.point.to_array()),
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    match (report.part, report.distance) {
        (Some(part), Some(distance)) => println!(
            "part {} '{}' at distance {:.3}, color {}, {}",
            part.id.0,
            part.name,
            distance,
            part.color.to_hex(),
            part.material_preset.as_str()
        ),
        _ => println!("nothing under ({}, {})", ndc.x, ndc.y),
    }
    Ok(())
}

pub fn projects(projects: &[ProjectRecord], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(projects)?);
        return Ok(());
    }
    if projects.is_empty() {
        println!("no projects");
        return Ok(());
    }
    println!("{:<12} {:<24} {:<16} {:<12} model", "id", "name", "author", "date");
    for p in projects {
        println!(
            "{:<12} {:<24} {:<16} {:<12} {}",
            p.id,
            p.name,
            p.author,
            p.date,
            p.model_file_name().unwrap_or("-")
        );
    }
    Ok(())
}

pub fn project_header(record: &ProjectRecord, json: bool) {
    if json {
        return;
    }
    println!("{} ({}) by {}", record.name, record.id, record.author);
    if !record.pending_notes.is_empty() {
        println!("notes: {}", record.pending_notes);
    }
}

pub fn quote(quote: &Quote, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(quote)?);
        return Ok(());
    }
    for item in &quote.items {
        println!(
            "{:<32} {:>8} x {:>10.2} = {:>10.2}",
            item.concepto,
            item.cantidad,
            item.precio,
            item.subtotal()
        );
    }
    println!("{:<32} {:>34.2}", "total", quote.total);
    Ok(())
}
