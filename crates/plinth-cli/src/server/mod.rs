//! Development server: lifecycle state machine, HTTP routing and the
//! browser reload channel.

pub mod lifecycle;
pub mod reload;
pub mod routes;

pub use lifecycle::{Server, ServerState};
pub use reload::ReloadChannel;
