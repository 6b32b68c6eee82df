//! The relay hop: subscribe-and-forward from the local task registry, fed by
//! either the in-process reasoning loop or a pump pulling the next hop inward.

pub mod hop;
mod pump;
pub mod subscription;
pub mod upstream;

pub use hop::{HopSettings, RelayHop};
pub use subscription::Subscription;
pub use upstream::{HttpUpstream, LocalUpstream, Upstream};
