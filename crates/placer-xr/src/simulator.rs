//! Desktop stand-in for an AR device.
//!
//! Surfaces are reduced to one infinite horizontal floor. A hit-test source
//! bound to the viewer space casts the viewer's forward ray at that floor.

use crate::error::XrError;
use crate::session::{
    Feature, HitTestOptions, HitTestResult, HitTestSource, ReferenceSpace, ReferenceSpaceKind,
    SessionInit, XrFrame, XrSession, XrSessionMode, XrSystem,
};
use futures_util::future::{self, FutureExt, LocalBoxFuture};
use glam::{Mat4, Vec3};
use log::debug;
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorSettings {
    pub floor_height: f32,
    pub max_distance: f32,
    /// When false, hit-test source requests stay pending forever, like a
    /// device that accepts the request but never delivers.
    pub hit_test_available: bool,
    pub supported_features: Vec<Feature>,
}

impl Default for SimulatorSettings {
    fn default() -> Self {
        Self {
            floor_height: 0.0,
            max_distance: 20.0,
            hit_test_available: true,
            supported_features: vec![Feature::HitTest, Feature::Local],
        }
    }
}

impl SimulatorSettings {
    fn supports(&self, feature: Feature) -> bool {
        self.supported_features.contains(&feature)
    }
}

pub struct SimulatedXr {
    settings: SimulatorSettings,
}

impl SimulatedXr {
    pub fn new(settings: SimulatorSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &SimulatorSettings {
        &self.settings
    }

    fn missing_feature(&self, init: &SessionInit) -> Option<Feature> {
        init.required_features
            .iter()
            .copied()
            .find(|f| !self.settings.supports(*f))
    }
}

impl XrSystem for SimulatedXr {
    fn is_session_supported(&self, mode: XrSessionMode, init: &SessionInit) -> bool {
        mode == XrSessionMode::ImmersiveAr && self.missing_feature(init).is_none()
    }

    fn request_session(
        &self,
        mode: XrSessionMode,
        init: SessionInit,
    ) -> Result<Rc<dyn XrSession>, XrError> {
        if mode != XrSessionMode::ImmersiveAr {
            return Err(XrError::NotSupported(mode));
        }
        if let Some(feature) = self.missing_feature(&init) {
            return Err(XrError::FeatureUnavailable(feature));
        }
        debug!("simulated {mode:?} session granted with {:?}", init.required_features);
        Ok(Rc::new(SimulatedSession::new(self.settings.clone())))
    }
}

pub struct SimulatedSession {
    settings: SimulatorSettings,
    next_id: Cell<u64>,
    ended: Cell<bool>,
}

impl SimulatedSession {
    pub fn new(settings: SimulatorSettings) -> Self {
        Self {
            settings,
            next_id: Cell::new(1),
            ended: Cell::new(false),
        }
    }

    fn issue_id(&self) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }
}

impl XrSession for SimulatedSession {
    fn request_reference_space(
        &self,
        kind: ReferenceSpaceKind,
    ) -> LocalBoxFuture<'static, Result<ReferenceSpace, XrError>> {
        if self.has_ended() {
            return future::ready(Err(XrError::SessionEnded)).boxed_local();
        }
        let space = ReferenceSpace {
            kind,
            id: self.issue_id(),
        };
        future::ready(Ok(space)).boxed_local()
    }

    fn request_hit_test_source(
        &self,
        options: HitTestOptions,
    ) -> LocalBoxFuture<'static, Result<HitTestSource, XrError>> {
        if self.has_ended() {
            return future::ready(Err(XrError::SessionEnded)).boxed_local();
        }
        if !self.settings.supports(Feature::HitTest) {
            return future::ready(Err(XrError::FeatureUnavailable(Feature::HitTest))).boxed_local();
        }
        if !self.settings.hit_test_available {
            return future::pending().boxed_local();
        }
        let source = HitTestSource {
            id: self.issue_id(),
            space: options.space,
        };
        future::ready(Ok(source)).boxed_local()
    }

    fn end(&self) {
        self.ended.set(true);
    }

    fn has_ended(&self) -> bool {
        self.ended.get()
    }
}

/// One simulated frame, captured at the viewer pose the desktop camera had
/// when the frame began.
pub struct SimulatedFrame {
    viewer: Mat4,
    floor_height: f32,
    max_distance: f32,
}

impl SimulatedFrame {
    pub fn new(viewer: Mat4, settings: &SimulatorSettings) -> Self {
        Self {
            viewer,
            floor_height: settings.floor_height,
            max_distance: settings.max_distance,
        }
    }
}

impl XrFrame for SimulatedFrame {
    fn hit_test_results(&self, source: &HitTestSource) -> Vec<HitTestResult> {
        let origin_space = match source.space.kind {
            ReferenceSpaceKind::Viewer => self.viewer,
            ReferenceSpaceKind::Local | ReferenceSpaceKind::LocalFloor => Mat4::IDENTITY,
        };
        let origin = origin_space.transform_point3(Vec3::ZERO);
        let direction = origin_space.transform_vector3(Vec3::NEG_Z);

        cast_floor_ray(origin, direction, self.floor_height, self.max_distance)
            .map(|point| vec![HitTestResult::new(Mat4::from_translation(point))])
            .unwrap_or_default()
    }
}

/// Intersects a ray with the plane `y = floor_height`. Only rays heading down
/// onto the floor from above, within `max_distance`, hit.
pub fn cast_floor_ray(
    origin: Vec3,
    direction: Vec3,
    floor_height: f32,
    max_distance: f32,
) -> Option<Vec3> {
    let direction = direction.normalize_or_zero();
    if direction.y >= -f32::EPSILON {
        return None;
    }
    let t = (floor_height - origin.y) / direction.y;
    if t < 0.0 || t > max_distance {
        return None;
    }
    Some(origin + direction * t)
}
