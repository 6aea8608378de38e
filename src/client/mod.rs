//! Remote client
//!
//! Speaks the server's wire protocol for callers that use this service
//! as a backing store.

pub mod remote;

pub use remote::RemoteFs;
