use crate::model::{MeshData, ModelData, Vertex};
use glam::Mat4;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerStyle {
    pub radius: f32,
    pub height: f32,
    pub segments: u32,
    pub color: [f32; 4],
}

impl Default for MarkerStyle {
    fn default() -> Self {
        Self {
            radius: 0.05,
            height: 0.01,
            segments: 32,
            color: [1.0, 0.0, 0.0, 0.5],
        }
    }
}

impl MarkerStyle {
    pub fn build(&self) -> ModelData {
        ModelData {
            name: "marker".into(),
            meshes: vec![cylinder(self.radius, self.height, self.segments, self.color)],
        }
    }
}

/// Y-up capped cylinder centred on the origin.
pub fn cylinder(radius: f32, height: f32, segments: u32, color: [f32; 4]) -> MeshData {
    let segments = segments.max(3);
    let half = height * 0.5;
    let mut vertices = Vec::new();
    let mut indices = Vec::new();

    let ring = |i: u32| {
        let a = TAU * i as f32 / segments as f32;
        (a.cos(), a.sin())
    };

    // side
    for i in 0..=segments {
        let (c, s) = ring(i);
        let normal = [c, 0.0, s];
        vertices.push(Vertex {
            position: [radius * c, -half, radius * s],
            normal,
        });
        vertices.push(Vertex {
            position: [radius * c, half, radius * s],
            normal,
        });
    }
    for i in 0..segments {
        let b = i * 2;
        indices.extend_from_slice(&[b, b + 1, b + 2, b + 2, b + 1, b + 3]);
    }

    // caps
    for (y, ny) in [(half, 1.0), (-half, -1.0)] {
        let center = vertices.len() as u32;
        vertices.push(Vertex {
            position: [0.0, y, 0.0],
            normal: [0.0, ny, 0.0],
        });
        for i in 0..=segments {
            let (c, s) = ring(i);
            vertices.push(Vertex {
                position: [radius * c, y, radius * s],
                normal: [0.0, ny, 0.0],
            });
        }
        for i in 0..segments {
            let a = center + 1 + i;
            if ny > 0.0 {
                indices.extend_from_slice(&[center, a + 1, a]);
            } else {
                indices.extend_from_slice(&[center, a, a + 1]);
            }
        }
    }

    MeshData {
        vertices,
        indices,
        transform: Mat4::IDENTITY,
        color,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cylinder_stays_within_radius_and_height() {
        let mesh = cylinder(0.05, 0.01, 32, [1.0, 0.0, 0.0, 0.5]);
        for v in &mesh.vertices {
            let [x, y, z] = v.position;
            assert!((x * x + z * z).sqrt() <= 0.05 + 1e-6);
            assert!(y.abs() <= 0.005 + 1e-6);
        }
    }

    #[test]
    fn cylinder_indices_are_in_range() {
        let mesh = cylinder(1.0, 1.0, 8, [1.0; 4]);
        assert_eq!(mesh.indices.len() % 3, 0);
        // side quads plus two fans
        assert_eq!(mesh.indices.len(), (8 * 6 + 8 * 3 * 2) as usize);
        let n = mesh.vertices.len() as u32;
        assert!(mesh.indices.iter().all(|&i| i < n));
    }

    #[test]
    fn degenerate_segment_count_is_clamped() {
        let mesh = cylinder(1.0, 1.0, 0, [1.0; 4]);
        assert_eq!(mesh.indices.len(), 3 * 6 + 3 * 3 * 2);
    }

    #[test]
    fn default_marker_is_translucent_red() {
        let marker = MarkerStyle::default().build();
        assert_eq!(marker.meshes.len(), 1);
        assert_eq!(marker.meshes[0].color, [1.0, 0.0, 0.0, 0.5]);
    }
}
