use log::{error, info, warn};
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::server::session::{SessionLimits, handle_connection};
use crate::storage::FileAccessHandler;

pub struct Server {
    listener: TcpListener,
    handler: Arc<FileAccessHandler>,
    limits: SessionLimits,
}

impl Server {
    /// Check the served directories and bind the listener.
    pub async fn bind(config: &ServerConfig) -> Result<Self, ServerError> {
        prepare_directories(config)?;

        let addr = config.listen_socket();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;
        info!("Server bound to {}", addr);

        Ok(Self {
            listener,
            handler: Arc::new(FileAccessHandler::from_config(config)),
            limits: SessionLimits::from_config(config),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections forever.
    pub async fn run(self) {
        self.run_until(std::future::pending()).await
    }

    /// Accept connections until `shutdown` resolves.
    pub async fn run_until<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        info!(
            "Serving {} (confined: {}) on {}",
            self.handler.resolver().root().display(),
            self.handler.resolver().is_confined(),
            self.listener
                .local_addr()
                .map(|a| a.to_string())
                .unwrap_or_else(|_| "unknown address".into())
        );

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutting down");
                    return;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        info!("Client connected: {}", peer);
                        let handler = Arc::clone(&self.handler);
                        let limits = self.limits;

                        // One task per connection so the accept loop never blocks
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, peer, handler, limits).await {
                                warn!("Connection {} ended with error: {}", peer, e);
                            }
                        });
                    }
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                    }
                },
            }
        }
    }
}

/// The root must already exist; the staging directory is created on demand.
fn prepare_directories(config: &ServerConfig) -> Result<(), ServerError> {
    let root = config.server_root_path();
    match std::fs::metadata(&root) {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => {
            return Err(ServerError::InvalidRoot(format!(
                "{} is not a directory",
                root.display()
            )));
        }
        Err(e) => {
            return Err(ServerError::InvalidRoot(format!("{}: {}", root.display(), e)));
        }
    }

    std::fs::create_dir_all(config.staging_dir_path())?;
    info!("Server root: {} (staging: {})", root.display(), config.staging_dir);
    Ok(())
}
