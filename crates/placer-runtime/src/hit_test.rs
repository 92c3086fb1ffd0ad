//! Per-frame surface tracking.
//!
//! The hit-test source is requested once per session, on the first frame,
//! as a chained single-shot future (viewer space, then a source bound to
//! it). Frames never wait for it: each later frame polls the future with a
//! no-op waker until it settles. A future that never settles leaves the
//! marker hidden for the rest of the session.

use futures_util::FutureExt;
use futures_util::future::LocalBoxFuture;
use futures_util::task::noop_waker_ref;
use log::{debug, warn};
use placer_scene::Marker;
use placer_xr::{
    HitTestOptions, HitTestResult, HitTestSource, ReferenceSpaceKind, XrError, XrFrame, XrSession,
};
use std::rc::Rc;
use std::task::{Context, Poll};

type SourceRequest = LocalBoxFuture<'static, Result<HitTestSource, XrError>>;

enum SourceState {
    Unrequested,
    Pending(SourceRequest),
    Ready(HitTestSource),
    Failed,
}

pub struct HitTestLoop {
    source: SourceState,
}

impl HitTestLoop {
    pub fn new() -> Self {
        Self {
            source: SourceState::Unrequested,
        }
    }

    pub fn is_requested(&self) -> bool {
        !matches!(self.source, SourceState::Unrequested)
    }

    pub fn source(&self) -> Option<&HitTestSource> {
        match &self.source {
            SourceState::Ready(source) => Some(source),
            _ => None,
        }
    }

    /// Issues the source request unless one was already issued this
    /// session. Returns whether a request went out.
    pub fn request_source(&mut self, session: &Rc<dyn XrSession>) -> bool {
        if self.is_requested() {
            return false;
        }
        let viewer_space = session.request_reference_space(ReferenceSpaceKind::Viewer);
        let session = Rc::clone(session);
        let request = async move {
            let space = viewer_space.await?;
            session
                .request_hit_test_source(HitTestOptions::new(space))
                .await
        };
        self.source = SourceState::Pending(request.boxed_local());
        debug!("hit-test source requested");
        true
    }

    fn poll_source(&mut self) {
        let SourceState::Pending(request) = &mut self.source else {
            return;
        };
        let mut cx = Context::from_waker(noop_waker_ref());
        match request.poll_unpin(&mut cx) {
            Poll::Pending => {}
            Poll::Ready(Ok(source)) => {
                debug!("hit-test source {} ready", source.id);
                self.source = SourceState::Ready(source);
            }
            Poll::Ready(Err(err)) => {
                warn!("hit-test source unavailable: {err}");
                self.source = SourceState::Failed;
            }
        }
    }

    pub fn on_frame(
        &mut self,
        session: &Rc<dyn XrSession>,
        frame: &dyn XrFrame,
        marker: &mut Marker,
    ) {
        if !self.request_source(session) {
            self.poll_source();
        }
        if let Some(source) = self.source() {
            apply_hit_results(&frame.hit_test_results(source), marker);
        }
    }

    /// Back to the pre-session state, whether or not a source resolved.
    pub fn reset(&mut self) {
        self.source = SourceState::Unrequested;
    }
}

impl Default for HitTestLoop {
    fn default() -> Self {
        Self::new()
    }
}

/// Nearest result wins; no results hides the marker.
pub fn apply_hit_results(results: &[HitTestResult], marker: &mut Marker) {
    match results.first() {
        Some(hit) => marker.show_at(hit.pose()),
        None => marker.hide(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use futures_util::future;
    use glam::{Mat4, Vec3};
    use placer_xr::ReferenceSpace;
    use std::cell::{Cell, RefCell};

    /// Session whose requests resolve (or hang) on demand and are counted.
    pub(crate) struct FakeSession {
        pub space_requests: Cell<u32>,
        pub source_requests: Cell<u32>,
        pub resolves: bool,
        pub fails: bool,
        pub ended: Cell<bool>,
    }

    impl FakeSession {
        fn new(resolves: bool, fails: bool) -> Rc<Self> {
            Rc::new(Self {
                space_requests: Cell::new(0),
                source_requests: Cell::new(0),
                resolves,
                fails,
                ended: Cell::new(false),
            })
        }

        pub fn resolving() -> Rc<Self> {
            Self::new(true, false)
        }

        pub fn hanging() -> Rc<Self> {
            Self::new(false, false)
        }

        pub fn failing() -> Rc<Self> {
            Self::new(true, true)
        }
    }

    impl XrSession for FakeSession {
        fn request_reference_space(
            &self,
            kind: ReferenceSpaceKind,
        ) -> LocalBoxFuture<'static, Result<ReferenceSpace, XrError>> {
            self.space_requests.set(self.space_requests.get() + 1);
            future::ready(Ok(ReferenceSpace { kind, id: 7 })).boxed_local()
        }

        fn request_hit_test_source(
            &self,
            options: HitTestOptions,
        ) -> LocalBoxFuture<'static, Result<HitTestSource, XrError>> {
            self.source_requests.set(self.source_requests.get() + 1);
            if self.fails {
                return future::ready(Err(XrError::FeatureUnavailable(
                    placer_xr::Feature::HitTest,
                )))
                .boxed_local();
            }
            if !self.resolves {
                return future::pending().boxed_local();
            }
            future::ready(Ok(HitTestSource {
                id: 42,
                space: options.space,
            }))
            .boxed_local()
        }

        fn end(&self) {
            self.ended.set(true);
        }

        fn has_ended(&self) -> bool {
            self.ended.get()
        }
    }

    /// Frame that replays a fixed list of results and records queries.
    pub(crate) struct FakeFrame {
        pub results: Vec<HitTestResult>,
        pub queried: RefCell<Vec<u64>>,
    }

    impl FakeFrame {
        pub fn with_poses(poses: &[Mat4]) -> Self {
            Self {
                results: poses.iter().copied().map(HitTestResult::new).collect(),
                queried: RefCell::new(Vec::new()),
            }
        }
    }

    impl XrFrame for FakeFrame {
        fn hit_test_results(&self, source: &HitTestSource) -> Vec<HitTestResult> {
            self.queried.borrow_mut().push(source.id);
            self.results.clone()
        }
    }

    pub(crate) fn as_dyn(session: &Rc<FakeSession>) -> Rc<dyn XrSession> {
        Rc::clone(session) as Rc<dyn XrSession>
    }

    fn at(x: f32) -> Mat4 {
        Mat4::from_translation(Vec3::new(x, 0.0, -1.0))
    }

    #[test]
    fn empty_results_hide_marker() {
        let mut marker = Marker::new();
        marker.show_at(at(1.0));
        apply_hit_results(&[], &mut marker);
        assert!(!marker.visible);
    }

    #[test]
    fn first_result_wins() {
        let mut marker = Marker::new();
        let results = [HitTestResult::new(at(1.0)), HitTestResult::new(at(2.0))];
        apply_hit_results(&results, &mut marker);
        assert!(marker.visible);
        assert_eq!(marker.transform, at(1.0));
    }

    #[test]
    fn source_is_requested_once_per_session() {
        let fake = FakeSession::hanging();
        let session = as_dyn(&fake);
        let mut hit_test = HitTestLoop::new();

        assert!(hit_test.request_source(&session));
        assert!(!hit_test.request_source(&session));
        assert_eq!(fake.space_requests.get(), 1);
        assert!(hit_test.is_requested());
    }

    #[test]
    fn source_resolves_on_a_later_frame() {
        let fake = FakeSession::resolving();
        let session = as_dyn(&fake);
        let frame = FakeFrame::with_poses(&[at(3.0)]);
        let mut marker = Marker::new();
        let mut hit_test = HitTestLoop::new();

        hit_test.on_frame(&session, &frame, &mut marker);
        assert!(hit_test.source().is_none());
        assert!(!marker.visible);

        hit_test.on_frame(&session, &frame, &mut marker);
        assert_eq!(hit_test.source().map(|s| s.id), Some(42));
        assert!(marker.visible);
        assert_eq!(marker.transform, at(3.0));
        assert_eq!(fake.space_requests.get(), 1);
        assert_eq!(fake.source_requests.get(), 1);
    }

    #[test]
    fn marker_tracks_and_hides_with_results() {
        let session = as_dyn(&FakeSession::resolving());
        let mut marker = Marker::new();
        let mut hit_test = HitTestLoop::new();
        let hit = FakeFrame::with_poses(&[at(1.0)]);
        let miss = FakeFrame::with_poses(&[]);

        hit_test.on_frame(&session, &hit, &mut marker);
        hit_test.on_frame(&session, &hit, &mut marker);
        assert!(marker.visible);
        hit_test.on_frame(&session, &miss, &mut marker);
        assert!(!marker.visible);
        assert_eq!(miss.queried.borrow().as_slice(), &[42]);
    }

    #[test]
    fn hanging_request_keeps_marker_hidden() {
        let session = as_dyn(&FakeSession::hanging());
        let frame = FakeFrame::with_poses(&[at(1.0)]);
        let mut marker = Marker::new();
        let mut hit_test = HitTestLoop::new();

        for _ in 0..10 {
            hit_test.on_frame(&session, &frame, &mut marker);
        }
        assert!(!marker.visible);
        assert!(frame.queried.borrow().is_empty());
    }

    #[test]
    fn failed_request_is_not_retried() {
        let fake = FakeSession::failing();
        let session = as_dyn(&fake);
        let frame = FakeFrame::with_poses(&[at(1.0)]);
        let mut marker = Marker::new();
        let mut hit_test = HitTestLoop::new();

        for _ in 0..5 {
            hit_test.on_frame(&session, &frame, &mut marker);
        }
        assert!(hit_test.is_requested());
        assert!(hit_test.source().is_none());
        assert_eq!(fake.source_requests.get(), 1);
        assert!(!marker.visible);
    }

    #[test]
    fn reset_clears_flag_and_source() {
        let fake = FakeSession::resolving();
        let session = as_dyn(&fake);
        let frame = FakeFrame::with_poses(&[]);
        let mut marker = Marker::new();

        let mut resolved = HitTestLoop::new();
        resolved.on_frame(&session, &frame, &mut marker);
        resolved.on_frame(&session, &frame, &mut marker);
        assert!(resolved.source().is_some());
        resolved.reset();
        assert!(!resolved.is_requested());
        assert!(resolved.source().is_none());

        let mut pending = HitTestLoop::new();
        pending.request_source(&as_dyn(&FakeSession::hanging()));
        pending.reset();
        assert!(!pending.is_requested());

        assert!(resolved.request_source(&session));
        assert_eq!(fake.space_requests.get(), 2);
    }
}
