pub mod client;
pub mod config;
pub mod error;
pub mod protocol;
pub mod server;
pub mod storage;

pub use client::RemoteFs;
pub use config::ServerConfig;
pub use server::Server;
pub use storage::{FileAccessHandler, FileInfo, PathResolver};
