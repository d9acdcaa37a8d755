//! glTF reader implementation.

use base64::Engine;
use glam::{Mat4, Quat, Vec3, Vec4};
use tracing::debug;

use crate::error::{IoError, Result};
use crate::format::ModelFormat;
use crate::registry::FormatReader;
use crate::scene::{AlphaMode, Material, NodeId, SceneNode, SceneRoot, Surface, TriangleMesh};

use super::schema::{
    self, component_size, Accessor, Gltf, COMPONENT_BYTE, COMPONENT_SHORT,
    COMPONENT_UNSIGNED_BYTE, COMPONENT_UNSIGNED_INT, COMPONENT_UNSIGNED_SHORT,
};

/// GLB magic number.
const GLB_MAGIC: u32 = 0x46546C67; // "glTF" in little-endian
/// GLB version 2.
const GLB_VERSION: u32 = 2;
/// JSON chunk type.
const GLB_CHUNK_JSON: u32 = 0x4E4F534A; // "JSON" in little-endian
/// Binary chunk type.
const GLB_CHUNK_BIN: u32 = 0x004E4942; // "BIN\0" in little-endian
/// Upper bound on values synthesized for an accessor with no buffer view.
const MAX_ZERO_FILLED_VALUES: usize = 1 << 24;

/// One converted primitive: geometry index and optional imported material.
type PrimitiveRef = (usize, Option<usize>);

/// Reader for glTF 2.0 files.
///
/// Rebuilds the node hierarchy of the default scene. A mesh with several
/// primitives becomes a group node with one child per primitive.
pub struct GltfReader;

impl GltfReader {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GltfReader {
    fn default() -> Self {
        Self::new()
    }
}

fn read_u32(data: &[u8], offset: usize) -> Option<u32> {
    let bytes = data.get(offset..offset + 4)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn is_glb(data: &[u8]) -> bool {
    read_u32(data, 0) == Some(GLB_MAGIC)
}

impl FormatReader for GltfReader {
    fn name(&self) -> &'static str {
        "gltf"
    }

    fn format(&self) -> ModelFormat {
        ModelFormat::Gltf
    }

    fn extensions(&self) -> &[&'static str] {
        &["gltf", "glb"]
    }

    fn can_read(&self, data: &[u8]) -> bool {
        if is_glb(data) {
            return true;
        }
        match std::str::from_utf8(data) {
            Ok(text) => text.trim_start().starts_with('{') && text.contains("\"asset\""),
            Err(_) => false,
        }
    }

    fn read(&self, data: &[u8]) -> Result<SceneRoot> {
        let (gltf, bin) = if is_glb(data) {
            let (json, bin) = split_glb(data)?;
            (serde_json::from_slice::<Gltf>(json)?, bin)
        } else {
            (serde_json::from_slice::<Gltf>(data)?, None)
        };

        if !gltf.asset.version.starts_with('2') {
            return Err(IoError::Unsupported(format!(
                "glTF version {}",
                gltf.asset.version
            )));
        }
        if let Some(ext) = gltf.extensions_required.first() {
            return Err(IoError::Unsupported(format!("required extension {}", ext)));
        }

        let buffers = load_buffers(&gltf, bin)?;
        convert_gltf(&gltf, &buffers)
    }
}

/// Split a GLB container into its JSON chunk and optional binary chunk.
fn split_glb(data: &[u8]) -> Result<(&[u8], Option<&[u8]>)> {
    if data.len() < 12 {
        return Err(IoError::InvalidData("GLB file too short".into()));
    }

    let version = read_u32(data, 4).unwrap_or_default();
    if version != GLB_VERSION {
        return Err(IoError::Unsupported(format!(
            "GLB version {} not supported",
            version
        )));
    }

    let mut offset = 12;
    let mut json_data = None;
    let mut bin_data = None;

    while offset + 8 <= data.len() {
        let chunk_length = read_u32(data, offset).unwrap_or_default() as usize;
        let chunk_type = read_u32(data, offset + 4).unwrap_or_default();
        offset += 8;

        let end = offset
            .checked_add(chunk_length)
            .filter(|&end| end <= data.len())
            .ok_or_else(|| IoError::parse_at("GLB chunk extends past end of file", offset))?;

        match chunk_type {
            GLB_CHUNK_JSON => json_data = Some(&data[offset..end]),
            GLB_CHUNK_BIN => bin_data = Some(&data[offset..end]),
            _ => {}
        }

        // Chunks are 4-byte aligned
        offset = (end + 3) & !3;
    }

    let json_data =
        json_data.ok_or_else(|| IoError::InvalidData("GLB missing JSON chunk".into()))?;
    Ok((json_data, bin_data))
}

fn load_buffers(gltf: &Gltf, bin: Option<&[u8]>) -> Result<Vec<Vec<u8>>> {
    gltf.buffers
        .iter()
        .enumerate()
        .map(|(i, buffer)| match (&buffer.uri, bin) {
            (Some(uri), _) => decode_data_uri(uri),
            (None, Some(bin)) if i == 0 => Ok(bin[..buffer.byte_length.min(bin.len())].to_vec()),
            (None, _) => Err(IoError::InvalidData(format!("buffer {} has no data", i))),
        })
        .collect()
}

/// Decode a `data:` URI. External files are not reachable from a byte slice.
fn decode_data_uri(uri: &str) -> Result<Vec<u8>> {
    let Some(rest) = uri.strip_prefix("data:") else {
        return Err(IoError::Unsupported(format!(
            "external buffer URIs not supported: {}",
            uri
        )));
    };
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| IoError::InvalidData("invalid data URI".into()))?;
    if !header.ends_with(";base64") {
        return Err(IoError::Unsupported(
            "URL-encoded data URIs not supported".into(),
        ));
    }
    Ok(base64::engine::general_purpose::STANDARD.decode(payload)?)
}

fn convert_gltf(gltf: &Gltf, buffers: &[Vec<u8>]) -> Result<SceneRoot> {
    let mut scene = SceneRoot::new();
    scene.metadata.generator = gltf.asset.generator.clone();
    scene.metadata.copyright = gltf.asset.copyright.clone();

    for mat in &gltf.materials {
        scene.add_material(convert_material(mat));
    }

    let mut mesh_map: Vec<Vec<PrimitiveRef>> = Vec::with_capacity(gltf.meshes.len());
    for (mesh_idx, mesh) in gltf.meshes.iter().enumerate() {
        let mut primitives = Vec::new();
        for (prim_idx, prim) in mesh.primitives.iter().enumerate() {
            let Some(tri_mesh) = convert_primitive(gltf, buffers, prim)? else {
                debug!(mesh = mesh_idx, primitive = prim_idx, mode = prim.mode, "skipping primitive");
                continue;
            };
            let geometry = scene.add_geometry(tri_mesh);
            let material = prim.material.filter(|&m| m < gltf.materials.len());
            primitives.push((geometry, material));
        }
        mesh_map.push(primitives);
    }

    let roots: Vec<usize> = match gltf.scenes.get(gltf.scene.unwrap_or(0)) {
        Some(s) => s.nodes.clone(),
        None => {
            // No scene: every node without a parent is a root
            let mut has_parent = vec![false; gltf.nodes.len()];
            for node in &gltf.nodes {
                for &child in &node.children {
                    if let Some(flag) = has_parent.get_mut(child) {
                        *flag = true;
                    }
                }
            }
            (0..gltf.nodes.len()).filter(|&i| !has_parent[i]).collect()
        }
    };

    let mut visited = vec![false; gltf.nodes.len()];
    for root in roots {
        convert_node(gltf, &mesh_map, root, None, &mut visited, &mut scene)?;
    }

    Ok(scene)
}

fn convert_material(mat: &schema::GltfMaterial) -> Material {
    let mut material = Material::new(mat.name.clone().unwrap_or_default());
    if let Some(pbr) = &mat.pbr_metallic_roughness {
        material.base_color = Vec4::from(pbr.base_color_factor);
        material.metallic = pbr.metallic_factor;
        material.roughness = pbr.roughness_factor;
    }
    material.emissive = mat.emissive_factor;
    material.alpha_mode = match mat.alpha_mode.as_deref() {
        Some("MASK") => AlphaMode::Mask,
        Some("BLEND") => AlphaMode::Blend,
        _ => AlphaMode::Opaque,
    };
    material.double_sided = mat.double_sided;
    material
}

/// Convert one primitive. Returns `None` for modes other than triangles and
/// points, and for primitives without positions.
fn convert_primitive(
    gltf: &Gltf,
    buffers: &[Vec<u8>],
    prim: &schema::Primitive,
) -> Result<Option<TriangleMesh>> {
    if prim.mode != schema::MODE_TRIANGLES && prim.mode != schema::MODE_POINTS {
        return Ok(None);
    }
    let Some(&position_accessor) = prim.attributes.get("POSITION") else {
        return Ok(None);
    };

    let mut mesh = TriangleMesh::new();
    mesh.positions = read_vec3s(gltf, buffers, position_accessor)?;

    if let Some(&normal_accessor) = prim.attributes.get("NORMAL") {
        let normals = read_vec3s(gltf, buffers, normal_accessor)?;
        if normals.len() == mesh.positions.len() {
            mesh.normals = Some(normals);
        }
    }

    if let Some(&color_accessor) = prim.attributes.get("COLOR_0") {
        let (values, components) = read_accessor(gltf, buffers, color_accessor)?;
        if components >= 3 {
            mesh.colors = Some(
                values
                    .chunks_exact(components)
                    .map(|c| Vec3::new(c[0] as f32, c[1] as f32, c[2] as f32))
                    .collect(),
            );
        }
    }

    if prim.mode == schema::MODE_TRIANGLES {
        mesh.indices = match prim.indices {
            Some(idx) => read_indices(gltf, buffers, idx)?,
            None => (0..mesh.positions.len() as u32).collect(),
        };
    }

    mesh.validate()?;
    Ok(Some(mesh))
}

fn accessor_at(gltf: &Gltf, accessor_idx: usize) -> Result<&Accessor> {
    gltf.accessors
        .get(accessor_idx)
        .ok_or_else(|| IoError::InvalidData(format!("invalid accessor {}", accessor_idx)))
}

/// Read an accessor as flat `f64` values, honoring stride and normalization.
///
/// Returns the values and the number of components per element.
fn read_accessor(
    gltf: &Gltf,
    buffers: &[Vec<u8>],
    accessor_idx: usize,
) -> Result<(Vec<f64>, usize)> {
    let accessor = accessor_at(gltf, accessor_idx)?;
    let components = accessor.component_count().ok_or_else(|| {
        IoError::Unsupported(format!("accessor type {}", accessor.accessor_type))
    })?;
    let csize = component_size(accessor.component_type).ok_or_else(|| {
        IoError::InvalidData(format!(
            "unknown component type {}",
            accessor.component_type
        ))
    })?;

    let overflow = || IoError::InvalidData(format!("accessor {} size overflows", accessor_idx));
    let value_count = accessor
        .count
        .checked_mul(components)
        .ok_or_else(overflow)?;

    let Some(view_idx) = accessor.buffer_view else {
        // Accessors without a buffer view are zero-filled.
        if value_count > MAX_ZERO_FILLED_VALUES {
            return Err(IoError::InvalidData(format!(
                "accessor {} has no buffer view and {} elements",
                accessor_idx, accessor.count
            )));
        }
        return Ok((vec![0.0; value_count], components));
    };
    let view = gltf
        .buffer_views
        .get(view_idx)
        .ok_or_else(|| IoError::InvalidData(format!("invalid buffer view {}", view_idx)))?;
    let buffer = buffers
        .get(view.buffer)
        .ok_or_else(|| IoError::InvalidData(format!("invalid buffer {}", view.buffer)))?;

    let view_end = view
        .byte_offset
        .checked_add(view.byte_length)
        .filter(|end| *end <= buffer.len())
        .ok_or_else(|| IoError::InvalidData("buffer view out of bounds".into()))?;

    let element_size = components * csize;
    let stride = view.byte_stride.unwrap_or(element_size);
    if stride < element_size {
        return Err(IoError::InvalidData(format!(
            "buffer view {} stride {} is shorter than its {}-byte elements",
            view_idx, stride, element_size
        )));
    }
    let start = view
        .byte_offset
        .checked_add(accessor.byte_offset)
        .ok_or_else(overflow)?;
    if accessor.count > 0 {
        let end = (accessor.count - 1)
            .checked_mul(stride)
            .and_then(|span| span.checked_add(start))
            .and_then(|last| last.checked_add(element_size))
            .ok_or_else(overflow)?;
        if end > view_end {
            return Err(IoError::InvalidData(format!(
                "accessor {} data out of bounds",
                accessor_idx
            )));
        }
    }

    let decode = component_decoder(accessor.component_type, accessor.normalized);
    let mut values = Vec::with_capacity(value_count);
    for i in 0..accessor.count {
        let base = start + i * stride;
        for c in 0..components {
            let off = base + c * csize;
            values.push(decode(&buffer[off..off + csize]));
        }
    }

    Ok((values, components))
}

/// Decoder for one little-endian component of a known type.
fn component_decoder(component_type: u32, normalized: bool) -> fn(&[u8]) -> f64 {
    match (component_type, normalized) {
        (COMPONENT_UNSIGNED_INT, _) => |b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f64,
        (COMPONENT_UNSIGNED_SHORT, false) => |b| u16::from_le_bytes([b[0], b[1]]) as f64,
        (COMPONENT_UNSIGNED_SHORT, true) => |b| u16::from_le_bytes([b[0], b[1]]) as f64 / 65535.0,
        (COMPONENT_SHORT, false) => |b| i16::from_le_bytes([b[0], b[1]]) as f64,
        (COMPONENT_SHORT, true) => |b| (i16::from_le_bytes([b[0], b[1]]) as f64 / 32767.0).max(-1.0),
        (COMPONENT_UNSIGNED_BYTE, false) => |b| b[0] as f64,
        (COMPONENT_UNSIGNED_BYTE, true) => |b| b[0] as f64 / 255.0,
        (COMPONENT_BYTE, false) => |b| b[0] as i8 as f64,
        (COMPONENT_BYTE, true) => |b| (b[0] as i8 as f64 / 127.0).max(-1.0),
        _ => |b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f64,
    }
}

fn read_vec3s(gltf: &Gltf, buffers: &[Vec<u8>], accessor_idx: usize) -> Result<Vec<Vec3>> {
    let (values, components) = read_accessor(gltf, buffers, accessor_idx)?;
    if components != 3 {
        return Err(IoError::InvalidData(format!(
            "expected VEC3 accessor, got {} components",
            components
        )));
    }
    Ok(values
        .chunks_exact(3)
        .map(|c| Vec3::new(c[0] as f32, c[1] as f32, c[2] as f32))
        .collect())
}

fn read_indices(gltf: &Gltf, buffers: &[Vec<u8>], accessor_idx: usize) -> Result<Vec<u32>> {
    let accessor = accessor_at(gltf, accessor_idx)?;
    if !matches!(
        accessor.component_type,
        COMPONENT_UNSIGNED_BYTE | COMPONENT_UNSIGNED_SHORT | COMPONENT_UNSIGNED_INT
    ) {
        return Err(IoError::InvalidData(format!(
            "unsupported index component type: {}",
            accessor.component_type
        )));
    }
    let (values, components) = read_accessor(gltf, buffers, accessor_idx)?;
    if components != 1 {
        return Err(IoError::InvalidData("index accessor must be SCALAR".into()));
    }
    Ok(values.into_iter().map(|v| v as u32).collect())
}

fn node_transform(node: &schema::Node) -> Mat4 {
    if let Some(matrix) = &node.matrix {
        return Mat4::from_cols_array(matrix);
    }
    let translation = node.translation.map(Vec3::from).unwrap_or(Vec3::ZERO);
    let rotation = node
        .rotation
        .map(|r| Quat::from_xyzw(r[0], r[1], r[2], r[3]).normalize())
        .unwrap_or(Quat::IDENTITY);
    let scale = node.scale.map(Vec3::from).unwrap_or(Vec3::ONE);
    Mat4::from_scale_rotation_translation(scale, rotation, translation)
}

fn primitive_surface(material: Option<usize>) -> Surface {
    material.map(Surface::Imported).unwrap_or_default()
}

fn convert_node(
    gltf: &Gltf,
    mesh_map: &[Vec<PrimitiveRef>],
    node_idx: usize,
    parent: Option<NodeId>,
    visited: &mut [bool],
    scene: &mut SceneRoot,
) -> Result<()> {
    let gltf_node = gltf
        .nodes
        .get(node_idx)
        .ok_or_else(|| IoError::InvalidData(format!("invalid node {}", node_idx)))?;
    if std::mem::replace(&mut visited[node_idx], true) {
        return Err(IoError::InvalidData(format!(
            "node {} appears more than once in the hierarchy",
            node_idx
        )));
    }

    let transform = node_transform(gltf_node);
    let primitives = gltf_node
        .mesh
        .and_then(|m| mesh_map.get(m))
        .map(Vec::as_slice)
        .unwrap_or_default();
    let name = gltf_node
        .name
        .clone()
        .or_else(|| {
            gltf_node
                .mesh
                .and_then(|m| gltf.meshes.get(m))
                .and_then(|m| m.name.clone())
        })
        .unwrap_or_default();

    let this = match primitives {
        [(geometry, material)] => scene.add_node(
            parent,
            SceneNode::with_geometry(name, *geometry)
                .transformed(transform)
                .with_surface(primitive_surface(*material)),
        ),
        _ => {
            let group = scene.add_node(parent, SceneNode::new(name.clone()).transformed(transform));
            for (i, &(geometry, material)) in primitives.iter().enumerate() {
                let prim_name = if name.is_empty() {
                    String::new()
                } else {
                    format!("{}_{}", name, i)
                };
                scene.add_child(
                    group,
                    SceneNode::with_geometry(prim_name, geometry)
                        .with_surface(primitive_surface(material)),
                );
            }
            group
        }
    };

    for &child_idx in &gltf_node.children {
        convert_node(gltf, mesh_map, child_idx, Some(this), visited, scene)?;
    }

    Ok(())
}
