pub mod button;
pub mod context;
pub mod hit_test;
pub mod loader;
pub mod placement;
pub mod resize;
pub mod session;

use std::time::Instant;

use glam::Mat4;
use log::warn;
use winit::{
    dpi::PhysicalSize,
    event::{DeviceEvent, WindowEvent},
    event_loop::EventLoopProxy,
    window::Window,
};

use wgpu::{
    CommandEncoderDescriptor, Device, ExperimentalFeatures, Features, Instance, Limits,
    MemoryHints, PowerPreference, Queue, RequestAdapterOptions, Surface, SurfaceConfiguration,
    TextureView, TextureViewDescriptor,
};

pub type RcWindow = std::sync::Arc<Window>;

use placer_3d::{DrawItem, GpuModel, MarkerStyle, ModelData, Renderer3D};
use placer_camera::{
    CameraController, CameraSettings, PerspectiveCamera, ViewerRig, update_camera_buffer,
};
use placer_scene::Scene;

pub use button::{ArButton, ArButtonState, ButtonAction};
pub use context::ArContext;
pub use hit_test::{HitTestLoop, apply_hit_results};
pub use loader::spawn_model_load;
pub use placement::{IgnoredTap, TapOutcome, place_at_marker};
pub use resize::{RenderSurface, handle_resize};
pub use session::{SessionController, SurfaceLayer};

/// Events delivered to the app through the winit event loop.
pub enum RuntimeEvent {
    GraphicsReady(Box<Graphics>),
    ModelLoaded(anyhow::Result<ModelData>),
}

#[derive(Debug, Clone, Default)]
pub struct GraphicsSettings {
    pub camera: CameraSettings,
    pub marker: MarkerStyle,
}

const BACKDROP: wgpu::Color = wgpu::Color {
    r: 0.05,
    g: 0.06,
    b: 0.08,
    a: 1.0,
};

pub async fn create_graphics(
    window: RcWindow,
    proxy: EventLoopProxy<RuntimeEvent>,
    settings: GraphicsSettings,
) {
    let instance = Instance::default();
    let surface = instance
        .create_surface(std::sync::Arc::clone(&window))
        .expect("Could not create a surface for the window.");

    let adapter = instance
        .request_adapter(&RequestAdapterOptions {
            power_preference: PowerPreference::default(),
            force_fallback_adapter: false,
            compatible_surface: Some(&surface),
        })
        .await
        .expect("Could not get an adapter (GPU).");

    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: None,
            required_features: Features::empty(),
            required_limits: Limits::downlevel_webgl2_defaults().using_resolution(adapter.limits()),
            memory_hints: MemoryHints::Performance,
            trace: Default::default(),
            experimental_features: ExperimentalFeatures::disabled(),
        })
        .await
        .expect("Failed to get device");

    let size = window.inner_size();
    let width = size.width.max(1);
    let height = size.height.max(1);

    let surface_config = surface
        .get_default_config(&adapter, width, height)
        .expect("Failed to create surface config");
    surface.configure(&device, &surface_config);

    let renderer = Renderer3D::new(
        &device,
        surface_config.format,
        surface_config.width,
        surface_config.height,
    );

    let camera = PerspectiveCamera::from_settings(
        &settings.camera,
        surface_config.width,
        surface_config.height,
    );
    let rig = ViewerRig::standing(settings.camera.eye_height);
    let controller = CameraController::new(settings.camera.speed);
    let marker_model = GpuModel::upload(&device, &settings.marker.build());

    update_camera_buffer(&queue, &renderer.camera_buf, &camera, &rig);

    let gfx = Graphics {
        window,
        surface,
        surface_config,
        device,
        queue,
        renderer,
        camera,
        rig,
        controller,
        marker_model,
        last_frame_time: Instant::now(),
    };

    let _ = proxy.send_event(RuntimeEvent::GraphicsReady(Box::new(gfx)));
}

pub struct Graphics {
    window: RcWindow,
    surface: Surface<'static>,
    surface_config: SurfaceConfiguration,
    device: Device,
    queue: Queue,
    renderer: Renderer3D,
    camera: PerspectiveCamera,
    rig: ViewerRig,
    controller: CameraController,
    marker_model: GpuModel,
    last_frame_time: Instant,
}

/// The swapchain plus everything sized to it.
struct SurfaceTarget<'a> {
    surface: &'a Surface<'static>,
    config: &'a mut SurfaceConfiguration,
    device: &'a Device,
    renderer: &'a mut Renderer3D,
}

impl RenderSurface for SurfaceTarget<'_> {
    fn resize_surface(&mut self, width: u32, height: u32) {
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(self.device, self.config);
        self.renderer.resize(self.device, width, height);
    }

    fn surface_size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }
}

impl Graphics {
    pub fn request_redraw(&self) {
        self.window.request_redraw();
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        let mut target = SurfaceTarget {
            surface: &self.surface,
            config: &mut self.surface_config,
            device: &self.device,
            renderer: &mut self.renderer,
        };
        handle_resize(&mut self.camera, &mut target, new_size.width, new_size.height);
        update_camera_buffer(&self.queue, &self.renderer.camera_buf, &self.camera, &self.rig);
    }

    /// Steps the viewer by the wall-clock time since the previous frame.
    pub fn advance(&mut self) {
        let now = Instant::now();
        let dt = (now - self.last_frame_time).as_secs_f32().min(0.1);
        self.last_frame_time = now;
        self.controller.update(&mut self.rig, dt);
    }

    /// Device pose used for this frame's hit-tests.
    pub fn viewer_pose(&self) -> Mat4 {
        self.rig.pose()
    }

    pub fn upload_model(&self, data: &ModelData) -> GpuModel {
        GpuModel::upload(&self.device, data)
    }

    pub fn draw<F>(&mut self, scene: &Scene<GpuModel>, layer: SurfaceLayer, overlay: F)
    where
        F: FnOnce(&mut Self, &TextureView, &mut wgpu::CommandEncoder),
    {
        update_camera_buffer(&self.queue, &self.renderer.camera_buf, &self.camera, &self.rig);

        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.surface_config);
                return;
            }
            Err(err) => {
                warn!("skipping frame: {err}");
                return;
            }
        };
        let swap_view = frame.texture.create_view(&TextureViewDescriptor::default());

        let mut draws: Vec<DrawItem<'_>> = scene
            .instances()
            .iter()
            .filter(|instance| instance.visible)
            .map(|instance| DrawItem {
                model: instance.asset.as_ref(),
                transform: instance.world_transform(),
            })
            .collect();
        if scene.marker.visible {
            draws.push(DrawItem {
                model: &self.marker_model,
                transform: scene.marker.transform,
            });
        }

        let clear = match layer {
            SurfaceLayer::Front => BACKDROP,
            SurfaceLayer::Behind => wgpu::Color::TRANSPARENT,
        };

        let mut encoder = self
            .device
            .create_command_encoder(&CommandEncoderDescriptor { label: None });
        self.renderer.render(
            &self.device,
            &self.queue,
            &mut encoder,
            &swap_view,
            clear,
            &draws,
        );
        drop(draws);
        overlay(self, &swap_view, &mut encoder);
        self.queue.submit(Some(encoder.finish()));
        frame.present();
    }

    pub fn handle_window_event(&mut self, event: &WindowEvent) {
        self.controller.handle_window_event(event);
    }

    pub fn handle_device_event(&mut self, event: &DeviceEvent) {
        self.controller.handle_device_event(event, &mut self.rig);
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    pub fn surface_config(&self) -> &SurfaceConfiguration {
        &self.surface_config
    }
}
