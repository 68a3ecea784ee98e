use serde::Serialize;
use std::fmt;

/// Outbound change notification for the control point
///
/// The protocol server turns these into GENA events; the adapter only decides
/// which service and variable changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "service", content = "variable", rename_all = "snake_case")]
pub enum Notification {
    /// AVTransport state variable changed
    AvTransport(&'static str),

    /// Volume or mute changed
    RenderingControl,
}

pub const TRANSPORT_STATE: &str = "TransportState";
pub const RELATIVE_TIME_POSITION: &str = "RelativeTimePosition";
pub const RELATIVE_COUNTER_POSITION: &str = "RelativeCounterPosition";

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notification::AvTransport(variable) => write!(f, "AVTransport/{}", variable),
            Notification::RenderingControl => write!(f, "RenderingControl"),
        }
    }
}
