//! Room services behind the websocket routes.
//!
//! ARCHITECTURE
//! ============
//! Membership, drawing mutations, fan-out, and eviction live here; the
//! route layer only translates between wire events and service calls.

pub mod reaper;
pub mod room;
