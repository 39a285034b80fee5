//! `ColorclashServer` builder and server loop.
//!
//! Ties the layers together: transport → protocol → room registry.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use colorclash_protocol::{Codec, JsonCodec};
use colorclash_room::{RoomConfig, RoomRegistry};
use colorclash_transport::WebSocketTransport;

use crate::ColorclashError;
use crate::handler::handle_connection;

/// Where the server listens unless told otherwise.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3001";

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) registry: Arc<RoomRegistry>,
    pub(crate) codec: C,
}

/// Builder for configuring and starting a Colorclash server.
///
/// # Example
///
/// ```rust,no_run
/// use colorclash::prelude::*;
///
/// # async fn run() -> Result<(), ColorclashError> {
/// let server = ColorclashServer::builder()
///     .bind("127.0.0.1:3001")
///     .room_config(RoomConfig { round_secs: 45, ..RoomConfig::default() })
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
#[derive(Debug)]
pub struct ColorclashServerBuilder {
    bind_addr: String,
    room_config: RoomConfig,
}

impl ColorclashServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            room_config: RoomConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the configuration every room is created with.
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.room_config = config;
        self
    }

    /// Binds the listener. Speaks JSON.
    pub async fn build(self) -> Result<ColorclashServer<JsonCodec>, ColorclashError> {
        self.build_with_codec(JsonCodec).await
    }

    /// Binds the listener with a custom wire format.
    pub async fn build_with_codec<C: Codec>(
        self,
        codec: C,
    ) -> Result<ColorclashServer<C>, ColorclashError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;
        let state = Arc::new(ServerState {
            registry: Arc::new(RoomRegistry::new(self.room_config)),
            codec,
        });
        Ok(ColorclashServer { transport, state })
    }
}

impl Default for ColorclashServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Colorclash server.
///
/// Call [`run()`](Self::run) or [`run_until()`](Self::run_until) to start
/// accepting connections.
pub struct ColorclashServer<C: Codec = JsonCodec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl ColorclashServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> ColorclashServerBuilder {
        ColorclashServerBuilder::new()
    }
}

impl<C: Codec> ColorclashServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ColorclashError> {
        Ok(self.transport.local_addr()?)
    }

    /// The registry holding every live room.
    pub fn registry(&self) -> Arc<RoomRegistry> {
        Arc::clone(&self.state.registry)
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), ColorclashError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `shutdown` resolves, then shuts every
    /// room down.
    ///
    /// Each accepted connection gets its own handler task. A failed
    /// accept (bad handshake, reset socket) is logged and skipped.
    pub async fn run_until(
        mut self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), ColorclashError> {
        tracing::info!("Colorclash server running");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("shutdown requested");
                    break;
                }
                accepted = self.transport.accept() => match accepted {
                    Ok(conn) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(conn, state).await {
                                tracing::debug!(
                                    error = %e,
                                    "connection ended with error"
                                );
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
            }
        }

        self.state.registry.shutdown().await;
        tracing::info!("Colorclash server stopped");
        Ok(())
    }
}
