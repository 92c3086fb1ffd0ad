//! Device AR seam.
//!
//! The runtime only ever talks to an AR device through the traits in
//! [`session`]: a system that can hand out immersive sessions, sessions that
//! resolve reference spaces and hit-test sources asynchronously, and frames
//! that report hit-test results. [`simulator`] backs those traits on desktop.

pub mod error;
pub mod session;
pub mod simulator;

pub use error::XrError;
pub use session::{
    Feature, HitTestOptions, HitTestResult, HitTestSource, ReferenceSpace, ReferenceSpaceKind,
    SessionInit, XrFrame, XrSession, XrSessionMode, XrSystem,
};
pub use simulator::{SimulatedFrame, SimulatedSession, SimulatedXr, SimulatorSettings};
