//! AR session API types and traits.

use crate::error::XrError;
use futures_util::future::LocalBoxFuture;
use glam::Mat4;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XrSessionMode {
    ImmersiveAr,
    ImmersiveVr,
    Inline,
}

/// Optional session capabilities, named the way device APIs spell them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Feature {
    HitTest,
    Local,
    LocalFloor,
    DomOverlay,
    Anchors,
}

impl Feature {
    pub fn as_str(self) -> &'static str {
        match self {
            Feature::HitTest => "hit-test",
            Feature::Local => "local",
            Feature::LocalFloor => "local-floor",
            Feature::DomOverlay => "dom-overlay",
            Feature::Anchors => "anchors",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionInit {
    pub required_features: Vec<Feature>,
    pub optional_features: Vec<Feature>,
}

impl SessionInit {
    pub fn requiring(features: impl IntoIterator<Item = Feature>) -> Self {
        Self {
            required_features: features.into_iter().collect(),
            optional_features: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceSpaceKind {
    /// Origin follows the device.
    Viewer,
    Local,
    LocalFloor,
}

/// Opaque reference-space handle issued by a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceSpace {
    pub kind: ReferenceSpaceKind,
    pub id: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HitTestOptions {
    pub space: ReferenceSpace,
}

impl HitTestOptions {
    pub fn new(space: ReferenceSpace) -> Self {
        Self { space }
    }
}

/// Opaque hit-test source handle. Valid for the lifetime of the session that
/// issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HitTestSource {
    pub id: u64,
    pub space: ReferenceSpace,
}

/// One intersection with a real-world surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitTestResult {
    pose: Mat4,
}

impl HitTestResult {
    pub fn new(pose: Mat4) -> Self {
        Self { pose }
    }

    /// Pose of the hit in the session's local reference space.
    pub fn pose(&self) -> Mat4 {
        self.pose
    }
}

pub trait XrSystem {
    fn is_session_supported(&self, mode: XrSessionMode, init: &SessionInit) -> bool;

    fn request_session(
        &self,
        mode: XrSessionMode,
        init: SessionInit,
    ) -> Result<Rc<dyn XrSession>, XrError>;
}

/// A running immersive session.
///
/// Both request methods start their work when called and return a
/// single-shot future. A future may never resolve; callers must not block on
/// it.
pub trait XrSession {
    fn request_reference_space(
        &self,
        kind: ReferenceSpaceKind,
    ) -> LocalBoxFuture<'static, Result<ReferenceSpace, XrError>>;

    fn request_hit_test_source(
        &self,
        options: HitTestOptions,
    ) -> LocalBoxFuture<'static, Result<HitTestSource, XrError>>;

    fn end(&self);

    fn has_ended(&self) -> bool;
}

/// Per-frame device data.
pub trait XrFrame {
    /// Results ordered by relevance, nearest first.
    fn hit_test_results(&self, source: &HitTestSource) -> Vec<HitTestResult>;
}
