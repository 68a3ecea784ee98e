// DLNA media renderer bridge
pub mod action;
pub mod adapter;
pub mod notification;

pub use action::{RendererAction, TransportState};
pub use adapter::RemoteControlAdapter;
pub use notification::Notification;
