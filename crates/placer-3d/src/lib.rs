pub mod depth;
pub mod model;
pub mod pipeline;
pub mod primitives;
pub mod render;

pub use depth::{DEPTH_FORMAT, create_depth};
pub use model::{GpuMesh, GpuModel, MeshData, ModelData, Vertex};
pub use pipeline::{Layouts, ObjectUniform, create_bind_group_layouts, create_pipeline};
pub use primitives::{MarkerStyle, cylinder};
pub use render::{DrawItem, Renderer3D};
