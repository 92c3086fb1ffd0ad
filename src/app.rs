use crate::config::PlacerConfig;
use glam::Vec3;
use log::{debug, info, warn};
use placer_3d::GpuModel;
use placer_runtime::{
    ArButton, ArContext, ButtonAction, Graphics, GraphicsSettings, RcWindow, RuntimeEvent,
    SessionController, TapOutcome, create_graphics, place_at_marker, spawn_model_load,
};
use placer_scene::{ModelTemplate, Scene};
use placer_xr::{SimulatedFrame, SimulatedXr, XrSessionMode, XrSystem};
use std::sync::Arc;
use std::time::{Duration, Instant};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{DeviceEvent, ElementState, MouseButton, StartCause, TouchPhase, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop, EventLoopProxy},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

const FPS: u64 = 60;
const FRAME_TIME: Duration = Duration::from_nanos(1_000_000_000 / FPS);

enum State {
    Ready(ReadyState),
    Init(Option<EventLoopProxy<RuntimeEvent>>),
}

struct ReadyState {
    gfx: Graphics,
    egui_ctx: egui::Context,
    egui_state: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
    scene: Scene<GpuModel>,
    session: SessionController,
    ar: Option<ArContext>,
}

enum Intent {
    Tap,
    ExitSession,
}

pub struct App {
    state: State,
    render_target: Instant,
    config: PlacerConfig,
    xr: SimulatedXr,
    button: ArButton,
    proxy: EventLoopProxy<RuntimeEvent>,
}

impl App {
    pub fn new(event_loop: &EventLoop<RuntimeEvent>, config: PlacerConfig) -> Self {
        let proxy = event_loop.create_proxy();
        let xr = SimulatedXr::new(config.simulator.clone());
        let button = ArButton::create(&xr, config.xr.enabled, config.xr.session_init());
        Self {
            state: State::Init(Some(proxy.clone())),
            render_target: Instant::now(),
            config,
            xr,
            button,
            proxy,
        }
    }

    fn init_egui_for_graphics(
        gfx: &Graphics,
    ) -> (egui::Context, egui_winit::State, egui_wgpu::Renderer) {
        let egui_ctx = egui::Context::default();
        let viewport_id = egui_ctx.viewport_id();

        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            viewport_id,
            gfx.window(),
            None,
            None,
            None,
        );

        let egui_renderer = egui_wgpu::Renderer::new(
            gfx.device(),
            gfx.surface_config().format,
            egui_wgpu::RendererOptions::default(),
        );

        (egui_ctx, egui_state, egui_renderer)
    }

    fn graphics_ready(&mut self, gfx: Graphics) {
        let (egui_ctx, egui_state, egui_renderer) = App::init_egui_for_graphics(&gfx);

        let proxy = self.proxy.clone();
        let loading = spawn_model_load(self.config.model.path.clone(), move |result| {
            let _ = proxy.send_event(RuntimeEvent::ModelLoaded(result));
        });
        if let Err(err) = loading {
            warn!("could not start model loader: {err}");
        }

        gfx.request_redraw();
        self.state = State::Ready(ReadyState {
            gfx,
            egui_ctx,
            egui_state,
            egui_renderer,
            scene: Scene::new().with_max_instances(self.config.scene.max_instances),
            session: SessionController::new(),
            ar: None,
        });
    }

    fn model_loaded(&mut self, result: anyhow::Result<placer_3d::ModelData>) {
        let State::Ready(ready) = &mut self.state else {
            return;
        };
        // Failures were already logged by the loader; placement just stays off.
        let Ok(data) = result else {
            return;
        };
        let model = ready.gfx.upload_model(&data);
        ready.scene.set_template(ModelTemplate::new(
            Arc::new(model),
            Vec3::splat(self.config.model.scale),
        ));
        info!("model `{}` ready for placement", data.name);
    }

    fn frame(&mut self) {
        let State::Ready(ready) = &mut self.state else {
            return;
        };
        ready.gfx.advance();
        let mut session_lost = false;
        if let Some(ar) = &mut ready.ar {
            let xr_frame = SimulatedFrame::new(ready.gfx.viewer_pose(), self.xr.settings());
            session_lost = !ar.on_frame(Some(&xr_frame), &mut ready.scene.marker);
        }
        if session_lost {
            self.end_session();
        }
        let State::Ready(ready) = &mut self.state else {
            return;
        };
        let action = Self::draw_frame(ready, &self.button, &self.config.window.title);
        match action {
            Some(ButtonAction::StartSession) => self.start_session(),
            Some(ButtonAction::EndSession) => self.end_session(),
            None => {}
        }
    }

    fn start_session(&mut self) {
        let State::Ready(ready) = &mut self.state else {
            return;
        };
        if ready.ar.is_some() {
            return;
        }
        match self
            .xr
            .request_session(XrSessionMode::ImmersiveAr, self.button.init().clone())
        {
            Ok(session) => {
                ready.ar = Some(ArContext::begin(session));
                ready.session.on_session_start();
            }
            Err(err) => warn!("could not start AR session: {err}"),
        }
    }

    fn end_session(&mut self) {
        let State::Ready(ready) = &mut self.state else {
            return;
        };
        if let Some(ar) = ready.ar.take() {
            ar.end(&mut ready.scene.marker);
            ready.session.on_session_end();
        }
    }

    fn tap(&mut self) {
        let State::Ready(ready) = &mut self.state else {
            return;
        };
        if let TapOutcome::Placed { evicted } =
            place_at_marker(&mut ready.scene, ready.session.is_presenting())
        {
            debug!(
                "{} instance(s) in scene, {evicted} evicted",
                ready.scene.instances().len()
            );
        }
    }

    fn resized(&mut self, size: PhysicalSize<u32>) {
        if let State::Ready(ready) = &mut self.state {
            ready.gfx.resize(size);
        }
    }

    fn input(&mut self, event: WindowEvent) {
        let State::Ready(ready) = &mut self.state else {
            return;
        };
        let response = ready.egui_state.on_window_event(ready.gfx.window(), &event);
        if response.repaint {
            ready.gfx.request_redraw();
        }
        if response.consumed {
            return;
        }
        ready.gfx.handle_window_event(&event);

        let intent = match &event {
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => Some(Intent::Tap),
            WindowEvent::Touch(touch) if touch.phase == TouchPhase::Started => Some(Intent::Tap),
            WindowEvent::KeyboardInput {
                event: key_event, ..
            } if key_event.physical_key == PhysicalKey::Code(KeyCode::Escape)
                && key_event.state == ElementState::Pressed
                && !key_event.repeat =>
            {
                Some(Intent::ExitSession)
            }
            _ => None,
        };
        match intent {
            Some(Intent::Tap) => self.tap(),
            Some(Intent::ExitSession) => self.end_session(),
            None => {}
        }
    }

    fn draw_frame(
        ready: &mut ReadyState,
        button: &ArButton,
        title: &str,
    ) -> Option<ButtonAction> {
        let raw_input = ready.egui_state.take_egui_input(ready.gfx.window());
        let presenting = ready.session.is_presenting();
        let overlay_visible = ready.session.overlay_visible();
        let model_ready = ready.scene.template().is_some();
        let placed = ready.scene.instances().len();
        let mut action = None;

        let full_output = ready.egui_ctx.run(raw_input, |ctx| {
            if overlay_visible {
                egui::Window::new(title)
                    .id(egui::Id::new("title_container"))
                    .collapsible(false)
                    .resizable(false)
                    .anchor(egui::Align2::CENTER_TOP, egui::vec2(0.0, 24.0))
                    .show(ctx, |ui| {
                        ui.heading("Tap to place");
                        ui.separator();
                        ui.label(
                            "Start AR and aim at the floor.\n\
                             Hold the right mouse button to look, WASD to walk.\n\
                             Click to place the model at the marker, Esc to leave.",
                        );
                        ui.separator();
                        ui.label(if model_ready {
                            "Model loaded."
                        } else {
                            "Loading model…"
                        });
                        ui.label(format!("Placed: {placed}"));
                    });
            }

            egui::Area::new(egui::Id::new("ar_button"))
                .anchor(egui::Align2::CENTER_BOTTOM, egui::vec2(0.0, -24.0))
                .show(ctx, |ui| {
                    let next = button.click(presenting);
                    let widget = egui::Button::new(
                        egui::RichText::new(button.label(presenting)).size(16.0),
                    )
                    .min_size(egui::vec2(180.0, 40.0));
                    if ui.add_enabled(next.is_some(), widget).clicked() {
                        action = next;
                    }
                });
        });

        let egui::FullOutput {
            platform_output,
            textures_delta,
            shapes,
            pixels_per_point,
            ..
        } = full_output;

        ready
            .egui_state
            .handle_platform_output(ready.gfx.window(), platform_output);

        let paint_jobs = ready.egui_ctx.tessellate(shapes, pixels_per_point);
        let layer = ready.session.surface_layer();
        let egui_renderer = &mut ready.egui_renderer;

        ready
            .gfx
            .draw(&ready.scene, layer, |gfx_inner, swap_view, encoder| {
                for (id, image_delta) in &textures_delta.set {
                    egui_renderer.update_texture(
                        gfx_inner.device(),
                        gfx_inner.queue(),
                        *id,
                        image_delta,
                    );
                }
                for id in &textures_delta.free {
                    egui_renderer.free_texture(id);
                }

                let screen_descriptor = egui_wgpu::ScreenDescriptor {
                    size_in_pixels: [
                        gfx_inner.surface_config().width,
                        gfx_inner.surface_config().height,
                    ],
                    pixels_per_point,
                };

                egui_renderer.update_buffers(
                    gfx_inner.device(),
                    gfx_inner.queue(),
                    encoder,
                    &paint_jobs,
                    &screen_descriptor,
                );

                let rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("egui_overlay_pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: swap_view,
                        depth_slice: None,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                });

                let mut rpass = rpass.forget_lifetime();
                egui_renderer.render(&mut rpass, &paint_jobs, &screen_descriptor);
            });

        action
    }
}

impl ApplicationHandler<RuntimeEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if let State::Init(proxy) = &mut self.state {
            if let Some(proxy) = proxy.take() {
                let win_attr = Window::default_attributes().with_title(&self.config.window.title);

                let window: RcWindow = Arc::new(
                    event_loop
                        .create_window(win_attr)
                        .expect("create window err."),
                );
                let settings = GraphicsSettings {
                    camera: self.config.camera.clone(),
                    marker: self.config.marker.clone(),
                };
                pollster::block_on(create_graphics(window, proxy, settings));
            }
        }
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: RuntimeEvent) {
        match event {
            RuntimeEvent::GraphicsReady(gfx) => self.graphics_ready(*gfx),
            RuntimeEvent::ModelLoaded(result) => self.model_loaded(result),
        }
    }

    fn new_events(&mut self, _event_loop: &ActiveEventLoop, _cause: StartCause) {
        if self.render_target <= Instant::now() {
            self.render_target += FRAME_TIME;
            if let State::Ready(ready) = &mut self.state {
                ready.gfx.request_redraw();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::Resized(size) => self.resized(size),
            WindowEvent::RedrawRequested => {
                self.frame();
                let now = Instant::now();
                if self.render_target <= now {
                    self.render_target = now + FRAME_TIME;
                    if let State::Ready(ready) = &mut self.state {
                        ready.gfx.request_redraw();
                    }
                }
            }
            WindowEvent::CloseRequested => {
                self.end_session();
                event_loop.exit();
            }
            other => self.input(other),
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: winit::event::DeviceId,
        event: DeviceEvent,
    ) {
        if let State::Ready(ready) = &mut self.state {
            ready.gfx.handle_device_event(&event);
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::WaitUntil(self.render_target));
    }
}
