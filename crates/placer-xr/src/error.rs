use crate::session::{Feature, XrSessionMode};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum XrError {
    #[error("session mode {0:?} is not supported")]
    NotSupported(XrSessionMode),
    #[error("required feature `{0}` is not available")]
    FeatureUnavailable(Feature),
    #[error("session has already ended")]
    SessionEnded,
}
