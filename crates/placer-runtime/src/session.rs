use log::debug;

/// Stacking of the render surface relative to the page-level overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceLayer {
    Front,
    /// Under everything, so the passthrough camera image shows.
    Behind,
}

impl SurfaceLayer {
    pub fn z_index(self) -> i32 {
        match self {
            SurfaceLayer::Front => 0,
            SurfaceLayer::Behind => -1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionController {
    presenting: bool,
    overlay_visible: bool,
    surface_layer: SurfaceLayer,
}

impl SessionController {
    pub fn new() -> Self {
        Self {
            presenting: false,
            overlay_visible: true,
            surface_layer: SurfaceLayer::Front,
        }
    }

    pub fn is_presenting(&self) -> bool {
        self.presenting
    }

    pub fn overlay_visible(&self) -> bool {
        self.overlay_visible
    }

    pub fn surface_layer(&self) -> SurfaceLayer {
        self.surface_layer
    }

    pub fn on_session_start(&mut self) {
        self.presenting = true;
        self.overlay_visible = false;
        self.surface_layer = SurfaceLayer::Behind;
        debug!("overlay hidden, surface z-index {}", self.surface_layer.z_index());
    }

    pub fn on_session_end(&mut self) {
        self.presenting = false;
        self.overlay_visible = true;
        self.surface_layer = SurfaceLayer::Front;
        debug!("overlay restored, surface z-index {}", self.surface_layer.z_index());
    }
}

impl Default for SessionController {
    fn default() -> Self {
        Self::new()
    }
}
