//! REST client layer.
//!
//! DESIGN
//! ======
//! `transport` owns the single HTTP client; `backend` and `tasks` are thin
//! endpoint wrappers over it. Only `backend` is consumed by the session
//! lifecycle.

pub mod backend;
pub mod tasks;
pub mod transport;
pub mod types;
