use thiserror::Error;

use crate::model::GroupId;
use crate::sys::window_server::WindowServerError;

#[derive(Debug, Error, PartialEq)]
pub enum MosaicError {
    #[error("Invalid group \"{group}\": {reason}")]
    InvalidGroup { group: String, reason: String },
    #[error("Monitor {monitor} does not exist ({count} monitors)")]
    InvalidMonitor { monitor: u32, count: usize },
    #[error("Group {0} not found")]
    GroupNotFound(GroupId),
    #[error("No monitors to lay windows out on")]
    NoMonitors,
    #[error("Window server error: {0}")]
    WindowServer(String),
}

impl From<WindowServerError> for MosaicError {
    fn from(e: WindowServerError) -> Self { MosaicError::WindowServer(e.to_string()) }
}
