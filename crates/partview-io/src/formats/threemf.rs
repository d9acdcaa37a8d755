//! 3MF reader: a ZIP package holding an XML model part.

use std::io::{Cursor, Read, Seek};

use glam::{Mat4, Vec3, Vec4};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;

use crate::error::{IoError, Result};
use crate::format::ModelFormat;
use crate::registry::FormatReader;
use crate::scene::{SceneNode, SceneRoot, TriangleMesh};

/// ZIP local file header signature.
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// Reader for 3MF packages.
///
/// Every `<object>` that carries a `<mesh>` and is placed by the `<build>`
/// section becomes one mesh node, in document order, under a single unnamed
/// group root.
pub struct ThreeMfReader;

impl ThreeMfReader {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ThreeMfReader {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatReader for ThreeMfReader {
    fn name(&self) -> &'static str {
        "3mf"
    }

    fn format(&self) -> ModelFormat {
        ModelFormat::CompressedTriangleArchive
    }

    fn extensions(&self) -> &[&'static str] {
        &["3mf"]
    }

    fn can_read(&self, data: &[u8]) -> bool {
        data.starts_with(ZIP_MAGIC)
    }

    fn read(&self, data: &[u8]) -> Result<SceneRoot> {
        let mut archive = zip::ZipArchive::new(Cursor::new(data))?;
        let model_path = find_model_path(&mut archive)?;

        let mut xml = String::new();
        archive.by_name(&model_path)?.read_to_string(&mut xml)?;
        debug!(part = %model_path, bytes = xml.len(), "3MF model part");

        let model = parse_model(&xml)?;
        Ok(model.into_scene())
    }
}

/// Locate the model part, usually `3D/3dmodel.model`.
fn find_model_path<R: Read + Seek>(archive: &mut zip::ZipArchive<R>) -> Result<String> {
    let candidates = ["3D/3dmodel.model", "3d/3dmodel.model", "3D/3DModel.model"];
    for candidate in candidates {
        if archive.by_name(candidate).is_ok() {
            return Ok(candidate.to_string());
        }
    }

    archive
        .file_names()
        .find(|name| name.to_lowercase().ends_with(".model"))
        .map(str::to_string)
        .ok_or_else(|| IoError::InvalidData("no model part in 3MF package".into()))
}

#[derive(Debug, Default)]
struct ModelObject {
    id: String,
    name: String,
    mesh: Option<TriangleMesh>,
    /// Referenced object ids with their component transforms.
    components: Vec<(String, Mat4)>,
}

#[derive(Debug, Default)]
struct Model {
    unit: Option<String>,
    objects: Vec<ModelObject>,
    /// Build items: object id and item transform.
    items: Vec<(String, Mat4)>,
}

impl Model {
    /// Placement of a mesh object: the first build item that references it,
    /// directly or through one level of components. `None` when no build
    /// item reaches it. A model without build items places everything at
    /// the origin.
    fn placement_of(&self, object_id: &str) -> Option<Mat4> {
        if self.items.is_empty() {
            return Some(Mat4::IDENTITY);
        }
        for (item_id, item_transform) in &self.items {
            if item_id == object_id {
                return Some(*item_transform);
            }
            let via_component = self
                .objects
                .iter()
                .find(|o| &o.id == item_id)
                .and_then(|o| o.components.iter().find(|(id, _)| id == object_id));
            if let Some((_, component_transform)) = via_component {
                return Some(*item_transform * *component_transform);
            }
        }
        None
    }

    fn into_scene(self) -> SceneRoot {
        let placements: Vec<Option<Mat4>> = self
            .objects
            .iter()
            .map(|o| self.placement_of(&o.id))
            .collect();

        let mut scene = SceneRoot::new();
        scene.metadata.unit = self.unit;
        let root = scene.add_root(SceneNode::new(""));

        for (object, placement) in self.objects.into_iter().zip(placements) {
            let (Some(mesh), Some(transform)) = (object.mesh, placement) else {
                continue;
            };
            let geometry = scene.add_geometry(mesh);
            scene.add_child(
                root,
                SceneNode::with_geometry(object.name, geometry).transformed(transform),
            );
        }
        scene
    }
}

fn attr(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == key)
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}

fn number<T: std::str::FromStr>(e: &BytesStart, key: &[u8], position: usize) -> Result<T> {
    let raw = attr(e, key).ok_or_else(|| {
        IoError::parse_at(
            format!("missing attribute '{}'", String::from_utf8_lossy(key)),
            position,
        )
    })?;
    raw.trim()
        .parse()
        .map_err(|_| IoError::parse_at(format!("invalid number '{}'", raw), position))
}

/// Parse a 3MF affine transform: 12 values, row-vector convention.
fn parse_transform(value: &str) -> Result<Mat4> {
    let m: Vec<f32> = value
        .split_whitespace()
        .map(str::parse)
        .collect::<std::result::Result<_, _>>()
        .map_err(|_| IoError::parse(format!("invalid transform '{}'", value)))?;
    if m.len() != 12 {
        return Err(IoError::parse(format!(
            "transform needs 12 values, got {}",
            m.len()
        )));
    }
    Ok(Mat4::from_cols(
        Vec4::new(m[0], m[1], m[2], 0.0),
        Vec4::new(m[3], m[4], m[5], 0.0),
        Vec4::new(m[6], m[7], m[8], 0.0),
        Vec4::new(m[9], m[10], m[11], 1.0),
    ))
}

fn transform_attr(e: &BytesStart) -> Result<Mat4> {
    match attr(e, b"transform") {
        Some(value) => parse_transform(&value),
        None => Ok(Mat4::IDENTITY),
    }
}

fn parse_model(xml: &str) -> Result<Model> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut model = Model::default();
    let mut current: Option<ModelObject> = None;

    loop {
        let position = reader.buffer_position() as usize;
        let event = reader.read_event()?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => match e.local_name().as_ref() {
                b"model" => model.unit = attr(e, b"unit"),
                b"object" => {
                    let object = ModelObject {
                        id: attr(e, b"id").unwrap_or_default(),
                        name: attr(e, b"name").unwrap_or_default(),
                        ..Default::default()
                    };
                    if matches!(event, Event::Empty(_)) {
                        model.objects.push(object);
                    } else {
                        current = Some(object);
                    }
                }
                b"mesh" => {
                    if let Some(object) = current.as_mut() {
                        object.mesh = Some(TriangleMesh::new());
                    }
                }
                b"vertex" => {
                    if let Some(mesh) = current.as_mut().and_then(|o| o.mesh.as_mut()) {
                        mesh.positions.push(Vec3::new(
                            number(e, b"x", position)?,
                            number(e, b"y", position)?,
                            number(e, b"z", position)?,
                        ));
                    }
                }
                b"triangle" => {
                    if let Some(mesh) = current.as_mut().and_then(|o| o.mesh.as_mut()) {
                        mesh.indices.extend([
                            number::<u32>(e, b"v1", position)?,
                            number::<u32>(e, b"v2", position)?,
                            number::<u32>(e, b"v3", position)?,
                        ]);
                    }
                }
                b"component" => {
                    if let Some(object) = current.as_mut() {
                        let id = attr(e, b"objectid").unwrap_or_default();
                        object.components.push((id, transform_attr(e)?));
                    }
                }
                b"item" => {
                    let id = attr(e, b"objectid").unwrap_or_default();
                    model.items.push((id, transform_attr(e)?));
                }
                _ => {}
            },
            Event::End(ref e) if e.local_name().as_ref() == b"object" => {
                if let Some(object) = current.take() {
                    if let Some(mesh) = &object.mesh {
                        mesh.validate()?;
                    }
                    model.objects.push(object);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    debug!(
        objects = model.objects.len(),
        items = model.items.len(),
        unit = ?model.unit,
        "3MF model parsed"
    );
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn package(model_xml: &str) -> Vec<u8> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);
        zip.start_file("3D/3dmodel.model", options).unwrap();
        zip.write_all(model_xml.as_bytes()).unwrap();
        zip.finish().unwrap().into_inner()
    }

    const TWO_OBJECTS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<model unit="millimeter" xmlns="http://schemas.microsoft.com/3dmanufacturing/core/2015/02">
  <resources>
    <object id="1" name="Housing" type="model">
      <mesh>
        <vertices>
          <vertex x="0" y="0" z="0"/>
          <vertex x="10" y="0" z="0"/>
          <vertex x="0" y="10" z="0"/>
        </vertices>
        <triangles>
          <triangle v1="0" v2="1" v3="2"/>
        </triangles>
      </mesh>
    </object>
    <object id="2" type="model">
      <mesh>
        <vertices>
          <vertex x="0" y="0" z="0"/>
          <vertex x="1" y="0" z="0"/>
          <vertex x="0" y="1" z="0"/>
        </vertices>
        <triangles>
          <triangle v1="0" v2="1" v3="2"/>
        </triangles>
      </mesh>
    </object>
    <object id="3" type="model">
      <components>
        <component objectid="2" transform="1 0 0 0 1 0 0 0 1 0 0 5"/>
      </components>
    </object>
  </resources>
  <build>
    <item objectid="1" transform="1 0 0 0 1 0 0 0 1 20 0 0"/>
    <item objectid="3" transform="1 0 0 0 1 0 0 0 1 0 3 0"/>
  </build>
</model>"#;

    #[test]
    fn test_can_read() {
        let reader = ThreeMfReader::new();
        assert!(reader.can_read(&package(TWO_OBJECTS)));
        assert!(!reader.can_read(b"solid x"));
    }

    #[test]
    fn test_mesh_objects_in_document_order() {
        let scene = ThreeMfReader::new().read(&package(TWO_OBJECTS)).unwrap();
        assert_eq!(scene.mesh_count(), 2);
        assert_eq!(scene.metadata.unit.as_deref(), Some("millimeter"));

        let root = &scene.nodes[scene.roots[0]];
        assert_eq!(root.children.len(), 2);
        assert_eq!(scene.nodes[root.children[0]].name, "Housing");
        assert_eq!(scene.nodes[root.children[1]].name, "");
    }

    #[test]
    fn test_build_transforms_applied() {
        let scene = ThreeMfReader::new().read(&package(TWO_OBJECTS)).unwrap();
        let root = &scene.nodes[scene.roots[0]];

        let housing = &scene.nodes[root.children[0]];
        assert_eq!(housing.transform.w_axis.x, 20.0);

        // Item translation composed with the component translation
        let nested = &scene.nodes[root.children[1]];
        let origin = nested.transform.transform_point3(Vec3::ZERO);
        assert_eq!(origin, Vec3::new(0.0, 3.0, 5.0));
    }

    #[test]
    fn test_objects_outside_build_are_skipped() {
        let xml = TWO_OBJECTS.replace(
            r#"<item objectid="3" transform="1 0 0 0 1 0 0 0 1 0 3 0"/>"#,
            "",
        );
        let scene = ThreeMfReader::new().read(&package(&xml)).unwrap();
        assert_eq!(scene.mesh_count(), 1);
        let root = &scene.nodes[scene.roots[0]];
        assert_eq!(root.children.len(), 1);
        assert_eq!(scene.nodes[root.children[0]].name, "Housing");
    }

    #[test]
    fn test_model_without_build_keeps_meshes() {
        let start = TWO_OBJECTS.find("<build>").unwrap();
        let end = TWO_OBJECTS.find("</build>").unwrap() + "</build>".len();
        let xml = format!("{}{}", &TWO_OBJECTS[..start], &TWO_OBJECTS[end..]);

        let scene = ThreeMfReader::new().read(&package(&xml)).unwrap();
        let root = &scene.nodes[scene.roots[0]];
        assert_eq!(root.children.len(), 2);
        assert_eq!(scene.nodes[root.children[0]].transform, Mat4::IDENTITY);
    }

    #[test]
    fn test_parse_transform_rejects_short_list() {
        assert!(parse_transform("1 0 0").is_err());
        assert!(parse_transform("1 0 0 0 1 0 0 0 1 a b c").is_err());
    }

    #[test]
    fn test_not_a_zip_fails() {
        assert!(ThreeMfReader::new().read(b"PK\x03\x04garbage").is_err());
    }

    #[test]
    fn test_bad_index_fails() {
        let xml = TWO_OBJECTS.replace(r#"v3="2"/>"#, r#"v3="9"/>"#);
        assert!(ThreeMfReader::new().read(&package(&xml)).is_err());
    }
}
