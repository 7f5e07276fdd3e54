//! Client-side state.
//!
//! `session` holds the authentication lifecycle; `store` the durable token
//! slot it owns.

pub mod session;
pub mod store;
