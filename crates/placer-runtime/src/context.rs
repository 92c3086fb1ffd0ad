use crate::hit_test::HitTestLoop;
use log::info;
use placer_scene::Marker;
use placer_xr::{XrFrame, XrSession};
use std::rc::Rc;

/// Everything that lives exactly as long as one immersive session.
pub struct ArContext {
    session: Rc<dyn XrSession>,
    hit_test: HitTestLoop,
}

impl ArContext {
    pub fn begin(session: Rc<dyn XrSession>) -> Self {
        info!("AR session started");
        Self {
            session,
            hit_test: HitTestLoop::new(),
        }
    }

    pub fn hit_test(&self) -> &HitTestLoop {
        &self.hit_test
    }

    /// Frame callback. `frame` is `None` when the device delivered no AR
    /// data for this frame.
    ///
    /// Returns `false` once the device has ended the session on its own. By
    /// then the hit-test state is cleared and the marker hidden; the caller
    /// still has to drop the context.
    pub fn on_frame(&mut self, frame: Option<&dyn XrFrame>, marker: &mut Marker) -> bool {
        if self.session.has_ended() {
            if self.hit_test.is_requested() || marker.visible {
                info!("AR session ended by the device");
            }
            self.hit_test.reset();
            marker.hide();
            return false;
        }
        if let Some(frame) = frame {
            self.hit_test.on_frame(&self.session, frame, marker);
        }
        true
    }

    pub fn end(mut self, marker: &mut Marker) {
        self.session.end();
        self.hit_test.reset();
        marker.hide();
        info!("AR session ended");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hit_test::tests::{FakeFrame, FakeSession, as_dyn};
    use glam::Mat4;

    #[test]
    fn frames_without_ar_data_do_nothing() {
        let fake = FakeSession::resolving();
        let mut ctx = ArContext::begin(as_dyn(&fake));
        let mut marker = Marker::new();
        assert!(ctx.on_frame(None, &mut marker));
        assert!(!ctx.hit_test().is_requested());
        assert_eq!(fake.space_requests.get(), 0);
    }

    #[test]
    fn end_stops_session_and_hides_marker() {
        let fake = FakeSession::resolving();
        let mut ctx = ArContext::begin(as_dyn(&fake));
        let frame = FakeFrame::with_poses(&[Mat4::IDENTITY]);
        let mut marker = Marker::new();
        ctx.on_frame(Some(&frame), &mut marker);
        ctx.on_frame(Some(&frame), &mut marker);
        assert!(marker.visible);

        ctx.end(&mut marker);
        assert!(fake.ended.get());
        assert!(!marker.visible);
    }

    #[test]
    fn device_ended_session_clears_tracking() {
        let fake = FakeSession::resolving();
        let mut ctx = ArContext::begin(as_dyn(&fake));
        let hit = FakeFrame::with_poses(&[Mat4::IDENTITY]);
        let miss = FakeFrame::with_poses(&[]);
        let mut marker = Marker::new();
        assert!(ctx.on_frame(Some(&hit), &mut marker));
        assert!(ctx.on_frame(Some(&hit), &mut marker));
        assert!(marker.visible);
        assert!(ctx.hit_test().source().is_some());

        fake.end();
        assert!(!ctx.on_frame(Some(&miss), &mut marker));
        assert!(!marker.visible);
        assert!(!ctx.hit_test().is_requested());
        assert!(ctx.hit_test().source().is_none());
        assert!(miss.queried.borrow().is_empty());
    }

    #[test]
    fn session_ended_before_first_frame_requests_nothing() {
        let fake = FakeSession::resolving();
        let mut ctx = ArContext::begin(as_dyn(&fake));
        fake.end();
        let frame = FakeFrame::with_poses(&[Mat4::IDENTITY]);
        let mut marker = Marker::new();
        assert!(!ctx.on_frame(Some(&frame), &mut marker));
        assert!(!ctx.hit_test().is_requested());
        assert_eq!(fake.space_requests.get(), 0);
    }

    #[test]
    fn next_session_requests_a_fresh_source() {
        let first = FakeSession::resolving();
        let frame = FakeFrame::with_poses(&[]);
        let mut marker = Marker::new();

        let mut ctx = ArContext::begin(as_dyn(&first));
        ctx.on_frame(Some(&frame), &mut marker);
        ctx.end(&mut marker);

        let second = FakeSession::resolving();
        let mut ctx = ArContext::begin(as_dyn(&second));
        ctx.on_frame(Some(&frame), &mut marker);
        assert_eq!(first.space_requests.get(), 1);
        assert_eq!(second.space_requests.get(), 1);
    }
}
