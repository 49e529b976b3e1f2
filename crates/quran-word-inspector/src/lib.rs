pub mod handlers;
pub mod inspector;

pub use handlers::{AppState, ApiError, InspectRequest, router};
pub use inspector::{BundleTicket, Inspector, InspectorSession, Phase};
