//! File system storage
//!
//! Path resolution, the per-request filesystem operations, and the
//! atomic write pipeline.

pub mod atomic_write;
pub mod operations;
pub mod resolver;
pub mod results;

pub use operations::FileAccessHandler;
pub use resolver::PathResolver;
pub use results::FileInfo;
