use placer_camera::{PerspectiveCamera, aspect_ratio};

/// Something with pixel dimensions that can be reconfigured.
pub trait RenderSurface {
    fn resize_surface(&mut self, width: u32, height: u32);
    fn surface_size(&self) -> (u32, u32);
}

/// Keeps the camera and the output surface in step with the viewport.
/// Zero-sized viewports (minimised windows) are treated as 1x1.
pub fn handle_resize(
    camera: &mut PerspectiveCamera,
    surface: &mut dyn RenderSurface,
    width: u32,
    height: u32,
) {
    let (width, height) = (width.max(1), height.max(1));
    camera.aspect = aspect_ratio(width, height);
    camera.update_projection_matrix();
    surface.resize_surface(width, height);
}
