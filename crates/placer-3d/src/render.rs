use crate::depth::create_depth;
use crate::model::GpuModel;
use crate::pipeline::{ObjectUniform, create_bind_group_layouts, create_pipeline};
use glam::Mat4;
use std::num::NonZeroU64;
use wgpu::*;

const INITIAL_OBJECT_SLOTS: u64 = 64;

/// One model drawn at one world transform.
pub struct DrawItem<'a> {
    pub model: &'a GpuModel,
    pub transform: Mat4,
}

pub struct Renderer3D {
    pub render_pipeline: RenderPipeline,
    pub depth_view: TextureView,
    pub depth_tex: Texture,
    pub camera_bg: BindGroup,
    pub camera_buf: Buffer,
    object_bgl: BindGroupLayout,
    object_buf: Buffer,
    object_bg: BindGroup,
    object_stride: u64,
    object_slots: u64,
}

impl Renderer3D {
    pub fn new(device: &Device, surface_format: TextureFormat, width: u32, height: u32) -> Self {
        let layouts = create_bind_group_layouts(device);
        let (depth_view, depth_tex) = create_depth(device, width, height);
        let (render_pipeline, camera_bg, camera_buf) =
            create_pipeline(device, surface_format, &layouts);

        let object_stride = align_to(
            ObjectUniform::SIZE,
            device.limits().min_uniform_buffer_offset_alignment as u64,
        );
        let (object_buf, object_bg) = create_object_ubo(
            device,
            &layouts.object_bgl,
            object_stride,
            INITIAL_OBJECT_SLOTS,
        );

        Self {
            render_pipeline,
            depth_view,
            depth_tex,
            camera_bg,
            camera_buf,
            object_bgl: layouts.object_bgl,
            object_buf,
            object_bg,
            object_stride,
            object_slots: INITIAL_OBJECT_SLOTS,
        }
    }

    pub fn resize(&mut self, device: &Device, width: u32, height: u32) {
        let (dv, dt) = create_depth(device, width, height);
        self.depth_view = dv;
        self.depth_tex = dt;
    }

    fn ensure_slots(&mut self, device: &Device, needed: u64) {
        if needed <= self.object_slots {
            return;
        }
        let slots = needed.next_power_of_two();
        let (buf, bg) = create_object_ubo(device, &self.object_bgl, self.object_stride, slots);
        self.object_buf = buf;
        self.object_bg = bg;
        self.object_slots = slots;
    }

    /// Draws in the order given; callers put translucent items last.
    pub fn render(
        &mut self,
        device: &Device,
        queue: &Queue,
        encoder: &mut CommandEncoder,
        target_view: &TextureView,
        clear: Color,
        draws: &[DrawItem<'_>],
    ) {
        let uniforms: Vec<ObjectUniform> = draws
            .iter()
            .flat_map(|item| {
                item.model.meshes.iter().map(move |mesh| ObjectUniform {
                    model: (item.transform * mesh.transform).to_cols_array_2d(),
                    color: mesh.color,
                })
            })
            .collect();

        if !uniforms.is_empty() {
            self.ensure_slots(device, uniforms.len() as u64);
            let stride = self.object_stride as usize;
            let mut staging = vec![0u8; uniforms.len() * stride];
            for (i, uniform) in uniforms.iter().enumerate() {
                let bytes = bytemuck::bytes_of(uniform);
                staging[i * stride..i * stride + bytes.len()].copy_from_slice(bytes);
            }
            queue.write_buffer(&self.object_buf, 0, &staging);
        }

        let mut r_pass = encoder.begin_render_pass(&RenderPassDescriptor {
            label: Some("scene_pass"),
            color_attachments: &[Some(RenderPassColorAttachment {
                view: target_view,
                depth_slice: None,
                resolve_target: None,
                ops: Operations {
                    load: LoadOp::Clear(clear),
                    store: StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(RenderPassDepthStencilAttachment {
                view: &self.depth_view,
                depth_ops: Some(Operations {
                    load: LoadOp::Clear(1.0),
                    store: StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        r_pass.set_pipeline(&self.render_pipeline);
        r_pass.set_bind_group(0, &self.camera_bg, &[]);

        let meshes = draws.iter().flat_map(|item| item.model.meshes.iter());
        for (slot, mesh) in meshes.enumerate() {
            let offset = (slot as u64 * self.object_stride) as u32;
            r_pass.set_bind_group(1, &self.object_bg, &[offset]);
            r_pass.set_vertex_buffer(0, mesh.vbuf.slice(..));
            r_pass.set_index_buffer(mesh.ibuf.slice(..), IndexFormat::Uint32);
            r_pass.draw_indexed(0..mesh.index_count, 0, 0..1);
        }
    }
}

fn create_object_ubo(
    device: &Device,
    layout: &BindGroupLayout,
    stride: u64,
    slots: u64,
) -> (Buffer, BindGroup) {
    let buffer = device.create_buffer(&BufferDescriptor {
        label: Some("object_ubo"),
        size: stride * slots,
        usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let bind_group = device.create_bind_group(&BindGroupDescriptor {
        label: Some("object_bg"),
        layout,
        entries: &[BindGroupEntry {
            binding: 0,
            resource: BindingResource::Buffer(BufferBinding {
                buffer: &buffer,
                offset: 0,
                size: NonZeroU64::new(ObjectUniform::SIZE),
            }),
        }],
    });
    (buffer, bind_group)
}

pub fn align_to(size: u64, alignment: u64) -> u64 {
    let alignment = alignment.max(1);
    size.div_ceil(alignment) * alignment
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_stride_respects_offset_alignment() {
        assert_eq!(align_to(ObjectUniform::SIZE, 256), 256);
        assert_eq!(align_to(80, 16), 80);
        assert_eq!(align_to(81, 16), 96);
        assert_eq!(align_to(80, 0), 80);
    }
}
