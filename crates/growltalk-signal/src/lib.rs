//! GrowlTalk Signal Server
//!
//! Signaling relay that pairs unattended kiosks with human operators over
//! plain HTTP. Peers cannot reach each other before a WebRTC media path
//! exists, so they swap SDP offers/answers and ICE candidates through caller
//! records held here.
//!
//! # Protocol
//!
//! 1. Kiosks and operators sign in and receive a caller id
//! 2. Each peer calls keep-session every half TTL; silent peers are swept
//! 3. Operators long-poll `callers` for the oldest AVAILABLE kiosk
//! 4. Peers PUT SDP, ICE and status updates onto caller records
//! 5. Peers read each other's records until the media path is up

pub mod lifecycle;
pub mod messages;
pub mod query;
pub mod registry;
pub mod relay;
pub mod server;
pub mod sweeper;

pub use lifecycle::SessionLifecycle;
pub use query::{CallerFilter, CallerQuery, QueryEngine, QueryResult};
pub use registry::{Registry, RegistryStats};
pub use relay::{CallerFields, UpdateRelay};
pub use server::{ApiError, SignalServer};
pub use sweeper::ExpirySweeper;
