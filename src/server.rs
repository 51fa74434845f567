use crate::config::ListenerConfig;
use crate::console::Console;
use crate::handler::{error_response, handle_request};
use crate::http::HttpCodec;
use crate::{ListenerError, Result};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::{signal, sync::broadcast, time::timeout};
use tokio_util::codec::Framed;
use tracing::{debug, error, info, warn, Instrument};

/// HTTP listener that prints POST bodies and answers every request once
///
/// # Examples
///
/// ```no_run
/// use postecho::{EchoListener, ListenerConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let listener = EchoListener::bind(ListenerConfig::default()).await?;
///     listener.run().await?;
///     Ok(())
/// }
/// ```
pub struct EchoListener {
    config: ListenerConfig,
    listener: TcpListener,
    local_addr: SocketAddr,
    console: Console,
    shutdown_signal: Arc<broadcast::Sender<()>>,
}

impl EchoListener {
    /// Binds the listening socket, printing to stdout
    pub async fn bind(config: ListenerConfig) -> Result<Self> {
        Self::bind_with_console(config, Console::stdout()).await
    }

    /// Binds the listening socket, printing to the given console
    pub async fn bind_with_console(config: ListenerConfig, console: Console) -> Result<Self> {
        config.validate()?;

        let listener = TcpListener::bind(config.bind_addr)
            .await
            .map_err(|source| ListenerError::Bind {
                addr: config.bind_addr,
                source,
            })?;
        let local_addr = listener.local_addr()?;
        let (shutdown_signal, _) = broadcast::channel(1);

        Ok(Self {
            config,
            listener,
            local_addr,
            console,
            shutdown_signal: Arc::new(shutdown_signal),
        })
    }

    /// Address actually bound, useful when binding port 0
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Returns a shutdown signal sender that stops [`run`](Self::run) when sent to
    pub fn shutdown_signal(&self) -> broadcast::Sender<()> {
        self.shutdown_signal.as_ref().clone()
    }

    /// Accepts connections until Ctrl+C or the internal shutdown signal
    ///
    /// The listening socket is closed when this returns.
    pub async fn run(self) -> Result<()> {
        let Self {
            config,
            listener,
            local_addr,
            console,
            shutdown_signal,
        } = self;

        let url = format!("http://{}:{}", config.bind_addr.ip(), local_addr.port());
        if let Err(e) = console.announce_start(&url) {
            warn!(error = %e, "Failed to write startup notice");
        }
        info!(
            address = %local_addr,
            format = %config.body_format,
            "Echo listener accepting connections"
        );

        let connection_count = Arc::new(AtomicUsize::new(0));
        let mut shutdown_rx = shutdown_signal.subscribe();
        let ctrl_c = signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((stream, addr)) => {
                            let current_count = connection_count.load(Ordering::SeqCst);
                            if current_count >= config.max_connections {
                                warn!(
                                    %addr,
                                    current = current_count,
                                    limit = config.max_connections,
                                    "Connection rejected: limit reached"
                                );
                                continue;
                            }

                            let new_count = connection_count.fetch_add(1, Ordering::SeqCst) + 1;
                            debug!(%addr, current = new_count, "Accepted connection");

                            let config = config.clone();
                            let console = console.clone();
                            let connection_count = connection_count.clone();
                            let span = tracing::info_span!("connection", %addr);

                            tokio::spawn(async move {
                                let served = handle_connection(stream, &config, &console)
                                    .instrument(span)
                                    .await;
                                if let Err(e) = served {
                                    error!(%addr, error = %e, "Error handling connection");
                                }
                                let final_count =
                                    connection_count.fetch_sub(1, Ordering::SeqCst) - 1;
                                debug!(%addr, current = final_count, "Connection closed");
                            });
                        }
                        Err(e) => {
                            error!(error = %e, "Failed to accept connection");
                        }
                    }
                }
                result = &mut ctrl_c => {
                    match result {
                        Ok(()) => info!("Received shutdown signal, stopping listener"),
                        Err(e) => {
                            error!(error = %e, "Failed to listen for Ctrl+C, stopping listener")
                        }
                    }
                    break;
                }
                _ = shutdown_rx.recv() => {
                    info!("Received internal shutdown signal, stopping listener");
                    break;
                }
            }
        }

        drop(listener);
        if let Err(e) = console.announce_stop() {
            warn!(error = %e, "Failed to write shutdown notice");
        }
        info!("Echo listener stopped");
        Ok(())
    }
}

/// How long a rejected client may keep sending before the socket is dropped
const DISCARD_TIMEOUT: Duration = Duration::from_secs(2);

/// Reads one request, writes one response, then closes the connection
async fn handle_connection(
    stream: TcpStream,
    config: &ListenerConfig,
    console: &Console,
) -> Result<()> {
    let codec = HttpCodec::new(config.max_body_size, config.server_name.clone());
    let mut framed = Framed::new(stream, codec);

    let next = match config.read_timeout {
        Some(limit) => match timeout(limit, framed.next()).await {
            Ok(next) => next,
            Err(_) => Some(Err(ListenerError::Timeout(format!(
                "no complete request within {limit:?}"
            )))),
        },
        None => framed.next().await,
    };

    let outcome = match next {
        Some(Ok(request)) => {
            info!(
                method = %request.method,
                path = %request.path,
                size = request.content_length,
                "Received request"
            );
            handle_request(&request, console, config.body_format)
        }
        Some(Err(e)) => Err(e),
        None => {
            debug!("Client closed connection without a request");
            return Ok(());
        }
    };

    let (response, rejected) = match outcome {
        Ok(response) => (response, false),
        Err(e) => match error_response(&e) {
            Some(response) => {
                warn!(error = %e, status = response.status.as_u16(), "Rejecting request");
                (response, true)
            }
            None => return Err(e),
        },
    };

    let status = response.status;
    framed.send(response).await?;
    let mut stream = framed.into_inner();
    stream.shutdown().await?;
    debug!(status = status.as_u16(), "Sent response");

    if rejected {
        discard_unread(&mut stream).await;
    }
    Ok(())
}

/// Drops whatever the client still sends after an early reply
///
/// Closing a socket with unread input resets the connection, and the reset
/// can reach the client before it reads the reply.
async fn discard_unread(stream: &mut TcpStream) {
    let mut scratch = [0u8; 8192];
    let drained = timeout(DISCARD_TIMEOUT, async {
        let mut discarded = 0usize;
        loop {
            match stream.read(&mut scratch).await {
                Ok(0) | Err(_) => return discarded,
                Ok(n) => discarded += n,
            }
        }
    })
    .await;

    match drained {
        Ok(discarded) => debug!(discarded, "Discarded unread request data"),
        Err(_) => debug!("Client kept sending after rejection, closing"),
    }
}
