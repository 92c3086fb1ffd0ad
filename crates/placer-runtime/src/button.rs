use placer_xr::{SessionInit, XrSessionMode, XrSystem};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArButtonState {
    Unsupported,
    Ready,
    Presenting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonAction {
    StartSession,
    EndSession,
}

/// Session-entry control. Built once from the required features; the app
/// only draws it and forwards clicks.
#[derive(Debug, Clone)]
pub struct ArButton {
    init: SessionInit,
    supported: bool,
}

impl ArButton {
    pub fn create(system: &dyn XrSystem, xr_enabled: bool, init: SessionInit) -> Self {
        let supported =
            xr_enabled && system.is_session_supported(XrSessionMode::ImmersiveAr, &init);
        Self { init, supported }
    }

    pub fn init(&self) -> &SessionInit {
        &self.init
    }

    pub fn state(&self, presenting: bool) -> ArButtonState {
        match (self.supported, presenting) {
            (false, _) => ArButtonState::Unsupported,
            (true, false) => ArButtonState::Ready,
            (true, true) => ArButtonState::Presenting,
        }
    }

    pub fn label(&self, presenting: bool) -> &'static str {
        match self.state(presenting) {
            ArButtonState::Unsupported => "AR NOT SUPPORTED",
            ArButtonState::Ready => "START AR",
            ArButtonState::Presenting => "STOP AR",
        }
    }

    pub fn click(&self, presenting: bool) -> Option<ButtonAction> {
        match self.state(presenting) {
            ArButtonState::Unsupported => None,
            ArButtonState::Ready => Some(ButtonAction::StartSession),
            ArButtonState::Presenting => Some(ButtonAction::EndSession),
        }
    }
}
