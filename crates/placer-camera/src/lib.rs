use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};
use wgpu::{Buffer, Queue};
use winit::event::{DeviceEvent, ElementState, KeyEvent, MouseButton, WindowEvent};
use winit::keyboard::KeyCode;

pub fn forward_from_yaw_pitch(yaw: f32, pitch: f32) -> Vec3 {
    let cp = pitch.cos();
    let sp = pitch.sin();
    let cy = yaw.cos();
    let sy = yaw.sin();
    Vec3::new(cy * cp, sp, -sy * cp)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub fov_y_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub eye_height: f32,
    pub speed: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            fov_y_degrees: 70.0,
            near: 0.01,
            far: 20.0,
            eye_height: 1.6,
            speed: 1.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PerspectiveCamera {
    pub fov_y_degrees: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    projection: Mat4,
}

impl PerspectiveCamera {
    pub fn new(fov_y_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        let mut camera = Self {
            fov_y_degrees,
            aspect,
            near,
            far,
            projection: Mat4::IDENTITY,
        };
        camera.update_projection_matrix();
        camera
    }

    pub fn from_settings(settings: &CameraSettings, width: u32, height: u32) -> Self {
        Self::new(
            settings.fov_y_degrees,
            aspect_ratio(width, height),
            settings.near,
            settings.far,
        )
    }

    /// Recomputes the projection from the current parameters. Call after
    /// changing any public field.
    pub fn update_projection_matrix(&mut self) {
        self.projection =
            Mat4::perspective_rh(self.fov_y_degrees.to_radians(), self.aspect, self.near, self.far);
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }
}

pub fn aspect_ratio(width: u32, height: u32) -> f32 {
    width.max(1) as f32 / height.max(1) as f32
}

/// Where the viewer stands and looks. On desktop this stands in for the
/// tracked device pose.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerRig {
    pub eye: Vec3,
    pub yaw: f32,
    pub pitch: f32,
}

impl ViewerRig {
    pub fn new(eye: Vec3, yaw: f32, pitch: f32) -> Self {
        Self { eye, yaw, pitch }
    }

    /// Standing at `eye_height`, facing -Z and tilted towards the floor.
    pub fn standing(eye_height: f32) -> Self {
        Self::new(
            Vec3::new(0.0, eye_height, 0.0),
            std::f32::consts::FRAC_PI_2,
            -0.6,
        )
    }

    pub fn forward(&self) -> Vec3 {
        forward_from_yaw_pitch(self.yaw, self.pitch)
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_to_rh(self.eye, self.forward(), Vec3::Y)
    }

    /// Viewer-to-world transform; its -Z axis is the gaze direction.
    pub fn pose(&self) -> Mat4 {
        self.view().inverse()
    }
}

pub struct CameraController {
    move_forward: bool,
    move_back: bool,
    move_left: bool,
    move_right: bool,
    move_up: bool,
    move_down: bool,
    boost_speed: bool,
    look_active: bool,
    base_speed: f32,
}

impl CameraController {
    pub fn new(base_speed: f32) -> Self {
        Self {
            move_forward: false,
            move_back: false,
            move_left: false,
            move_right: false,
            move_up: false,
            move_down: false,
            boost_speed: false,
            look_active: false,
            base_speed,
        }
    }

    pub fn handle_window_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: winit::keyboard::PhysicalKey::Code(code),
                        state,
                        repeat,
                        ..
                    },
                ..
            } => {
                if *repeat {
                    return;
                }
                let pressed = *state == ElementState::Pressed;
                match code {
                    KeyCode::KeyW => self.move_forward = pressed,
                    KeyCode::KeyS => self.move_back = pressed,
                    KeyCode::KeyA => self.move_left = pressed,
                    KeyCode::KeyD => self.move_right = pressed,
                    KeyCode::KeyJ => self.move_up = pressed,
                    KeyCode::KeyK => self.move_down = pressed,
                    KeyCode::ShiftLeft => self.boost_speed = pressed,
                    _ => {}
                }
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Right,
                ..
            } => self.look_active = *state == ElementState::Pressed,
            WindowEvent::Focused(false) => *self = Self::new(self.base_speed),
            _ => {}
        }
    }

    pub fn handle_device_event(&mut self, event: &DeviceEvent, rig: &mut ViewerRig) {
        if !self.look_active {
            return;
        }
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            self.look(rig, *dx as f32, *dy as f32);
        }
    }

    fn look(&self, rig: &mut ViewerRig, dx: f32, dy: f32) {
        let sensitivity = 0.0025;
        rig.yaw -= dx * sensitivity;
        rig.pitch -= dy * sensitivity;
        let max_pitch = std::f32::consts::FRAC_PI_2 - 0.01;
        rig.pitch = rig.pitch.clamp(-max_pitch, max_pitch);
    }

    pub fn update(&mut self, rig: &mut ViewerRig, dt: f32) {
        let mut movement = Vec3::ZERO;

        let forward = rig.forward();
        let flat_forward = Vec3::new(forward.x, 0.0, forward.z).normalize_or_zero();
        let right = flat_forward.cross(Vec3::Y).normalize_or_zero();

        if self.move_forward {
            movement += flat_forward;
        }
        if self.move_back {
            movement -= flat_forward;
        }
        if self.move_right {
            movement += right;
        }
        if self.move_left {
            movement -= right;
        }
        if self.move_up {
            movement += Vec3::Y;
        }
        if self.move_down {
            movement -= Vec3::Y;
        }

        if movement.length_squared() > 0.0 {
            let mut speed = self.base_speed;
            if self.boost_speed {
                speed *= 5.0;
            }
            rig.eye += movement.normalize() * speed * dt;
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new(camera: &PerspectiveCamera, rig: &ViewerRig) -> Self {
        Self {
            view_proj: (camera.projection() * rig.view()).to_cols_array_2d(),
        }
    }
}

pub fn update_camera_buffer(
    queue: &Queue,
    camera_buf: &Buffer,
    camera: &PerspectiveCamera,
    rig: &ViewerRig,
) {
    let uniform = CameraUniform::new(camera, rig);
    queue.write_buffer(camera_buf, 0, bytemuck::bytes_of(&uniform));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projection_follows_aspect() {
        let mut camera = PerspectiveCamera::new(70.0, 1.0, 0.01, 20.0);
        let square = camera.projection();
        camera.aspect = 2.0;
        assert_eq!(camera.projection(), square);
        camera.update_projection_matrix();
        assert_ne!(camera.projection(), square);
        assert!((camera.projection().x_axis.x * 2.0 - square.x_axis.x).abs() < 1e-5);
    }

    #[test]
    fn aspect_ratio_guards_zero_sizes() {
        assert_eq!(aspect_ratio(1920, 1080), 1920.0 / 1080.0);
        assert_eq!(aspect_ratio(640, 0), 640.0);
    }

    #[test]
    fn pose_gazes_along_forward() {
        let rig = ViewerRig::standing(1.6);
        let gaze = rig.pose().transform_vector3(Vec3::NEG_Z);
        assert!(gaze.abs_diff_eq(rig.forward(), 1e-5));
        assert!(rig.pose().transform_point3(Vec3::ZERO).abs_diff_eq(rig.eye, 1e-5));
        assert!(rig.forward().y < 0.0 && rig.forward().z < 0.0);
    }

    #[test]
    fn look_clamps_pitch() {
        let controller = CameraController::new(1.0);
        let mut rig = ViewerRig::standing(1.6);
        controller.look(&mut rig, 0.0, -100_000.0);
        assert!(rig.pitch < std::f32::consts::FRAC_PI_2);
    }

    #[test]
    fn idle_controller_does_not_move() {
        let mut controller = CameraController::new(1.0);
        let mut rig = ViewerRig::standing(1.6);
        let before = rig.clone();
        controller.update(&mut rig, 0.5);
        assert_eq!(rig, before);
    }

    #[test]
    fn forward_key_walks_on_the_ground_plane() {
        let mut controller = CameraController::new(2.0);
        controller.move_forward = true;
        let mut rig = ViewerRig::standing(1.6);
        controller.update(&mut rig, 0.5);
        assert!(rig.eye.abs_diff_eq(Vec3::new(0.0, 1.6, -1.0), 1e-5), "{:?}", rig.eye);
    }
}
