//! TCP listener: accepts connections and hands each one to its own task

use crate::config::ServerConfig;
use crate::connection::{ConnectionError, ConnectionHandler};
use crate::game::SharedGameState;
use crate::router::CommandRouter;
use log::{debug, error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// Listening socket plus the shared handler every connection task uses
pub struct Server {
    listener: TcpListener,
    handler: Arc<ConnectionHandler>,
}

impl Server {
    pub async fn bind(
        config: ServerConfig,
        game: SharedGameState,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let listener = TcpListener::bind(&config.bind_addr).await?;
        info!(
            "Server listening on {} ({:?} protocol)",
            listener.local_addr()?,
            config.protocol
        );

        let router = CommandRouter::new(game, config.static_dir.clone());
        let handler = Arc::new(ConnectionHandler::new(router, &config));
        Ok(Server { listener, handler })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept loop. Runs until the task is dropped; a failing connection
    /// only ends its own task.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    debug!("Connection from {}", addr);
                    let handler = Arc::clone(&self.handler);

                    tokio::spawn(async move {
                        match handler.handle(stream, addr).await {
                            Ok(()) => {}
                            Err(ConnectionError::Timeout(after)) => {
                                debug!("Connection from {} idle for {:?}, dropped", addr, after)
                            }
                            Err(ConnectionError::Closed) => {
                                debug!("Connection from {} closed without a request", addr)
                            }
                            Err(e) => warn!("Connection from {} failed: {}", addr, e),
                        }
                    });
                }
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            }
        }
    }
}
