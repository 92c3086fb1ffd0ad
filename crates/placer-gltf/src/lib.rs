//! glTF import into CPU-side [`ModelData`], ready for GPU upload.

use anyhow::{Context, Result, bail};
use glam::{Mat4, Vec3};
use log::{debug, warn};
use placer_3d::{MeshData, ModelData, Vertex};
use std::path::Path;

pub fn load_gltf_model(path: &Path) -> Result<ModelData> {
    let (document, buffers, _images) = gltf::import(path)
        .with_context(|| format!("failed to import glTF {}", path.display()))?;
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("model");
    build_model(name, &document, &buffers)
}

fn build_model(
    name: &str,
    document: &gltf::Document,
    buffers: &[gltf::buffer::Data],
) -> Result<ModelData> {
    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .with_context(|| format!("glTF `{name}` has no scenes"))?;

    let mut model = ModelData {
        name: name.to_string(),
        meshes: Vec::new(),
    };
    for node in scene.nodes() {
        collect_node(&node, Mat4::IDENTITY, buffers, &mut model.meshes)?;
    }

    if model.meshes.is_empty() {
        bail!("glTF `{name}` has no triangle meshes");
    }
    debug!("loaded `{name}` with {} mesh part(s)", model.meshes.len());
    Ok(model)
}

fn collect_node(
    node: &gltf::Node,
    parent: Mat4,
    buffers: &[gltf::buffer::Data],
    out: &mut Vec<MeshData>,
) -> Result<()> {
    let transform = parent * Mat4::from_cols_array_2d(&node.transform().matrix());

    if let Some(mesh) = node.mesh() {
        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                warn!(
                    "skipping {:?} primitive in mesh {:?}",
                    primitive.mode(),
                    mesh.name()
                );
                continue;
            }
            out.push(read_primitive(&primitive, transform, buffers)?);
        }
    }

    for child in node.children() {
        collect_node(&child, transform, buffers, out)?;
    }
    Ok(())
}

fn read_primitive(
    primitive: &gltf::Primitive,
    transform: Mat4,
    buffers: &[gltf::buffer::Data],
) -> Result<MeshData> {
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| &data.0[..]));

    let positions: Vec<[f32; 3]> = reader
        .read_positions()
        .context("mesh primitive has no positions")?
        .collect();

    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..positions.len() as u32).collect(),
    };
    if let Some(bad) = indices.iter().find(|&&i| i as usize >= positions.len()) {
        bail!("index {bad} out of range for {} vertices", positions.len());
    }

    let normals: Vec<[f32; 3]> = match reader.read_normals() {
        Some(normals) => normals.collect(),
        None => smooth_normals(&positions, &indices),
    };
    if normals.len() != positions.len() {
        bail!(
            "mesh primitive has {} normals for {} positions",
            normals.len(),
            positions.len()
        );
    }

    let vertices = positions
        .iter()
        .zip(normals)
        .map(|(&position, normal)| Vertex { position, normal })
        .collect();

    Ok(MeshData {
        vertices,
        indices,
        transform,
        color: primitive
            .material()
            .pbr_metallic_roughness()
            .base_color_factor(),
    })
}

/// Area-weighted vertex normals, for assets exported without them.
fn smooth_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
    let mut acc = vec![Vec3::ZERO; positions.len()];
    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| i as usize);
        let (pa, pb, pc) = (
            Vec3::from(positions[a]),
            Vec3::from(positions[b]),
            Vec3::from(positions[c]),
        );
        let face = (pb - pa).cross(pc - pa);
        acc[a] += face;
        acc[b] += face;
        acc[c] += face;
    }
    acc.into_iter()
        .map(|n| n.try_normalize().unwrap_or(Vec3::Y).to_array())
        .collect()
}
