//! HTTP listener for the echo server.
//!
//! Binds a TCP listener, accepts connections and serves each one with
//! hyper's HTTP/1 connection driver. In sequential mode connections are
//! served one at a time with keep-alive disabled, so a single client cannot
//! hold the accept loop. In concurrent mode each connection gets a task.

use crate::config::{Config, ServeMode};
use crate::handler::{handle_request, ConnectionInfo, EchoOutput};
use crate::journal::Journal;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info};

/// Server instance
pub struct Server {
    listener: TcpListener,
    journal: Arc<Journal>,
    output: EchoOutput,
    mode: ServeMode,
}

impl Server {
    /// Bind the configured address. Port 0 asks the OS for an ephemeral port.
    pub async fn bind(
        config: &Config,
        journal: Arc<Journal>,
        output: EchoOutput,
    ) -> io::Result<Self> {
        let listener = TcpListener::bind(&config.listen).await?;
        Ok(Server {
            listener,
            journal,
            output,
            mode: config.mode,
        })
    }

    /// Address actually bound, including the OS-assigned port
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept and serve connections forever
    pub async fn run(self) -> io::Result<()> {
        info!(
            address = %self.local_addr()?,
            mode = ?self.mode,
            journal = %self.journal.path().display(),
            "Server listening"
        );

        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    debug!(peer = %peer, "New connection");
                    let journal = Arc::clone(&self.journal);
                    let output = Arc::clone(&self.output);

                    match self.mode {
                        ServeMode::Sequential => {
                            serve_connection(stream, peer, journal, output, false).await;
                        }
                        ServeMode::Concurrent => {
                            tokio::spawn(serve_connection(stream, peer, journal, output, true));
                        }
                    }
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }
}

/// Serve every request on one connection, logging connection-level errors.
async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    journal: Arc<Journal>,
    output: EchoOutput,
    keep_alive: bool,
) {
    let conn = Arc::new(ConnectionInfo::new(peer, stream.local_addr()));
    let io = TokioIo::new(stream);

    let service = service_fn(move |req| {
        handle_request(
            req,
            Arc::clone(&conn),
            Arc::clone(&journal),
            Arc::clone(&output),
        )
    });

    if let Err(e) = http1::Builder::new()
        .keep_alive(keep_alive)
        .serve_connection(io, service)
        .await
    {
        debug!(peer = %peer, error = %e, "Connection error");
    }
}
