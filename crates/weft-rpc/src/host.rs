//! Reference host serving newline-delimited JSON envelopes over TCP.
//!
//! Each connection carries a sequence of request lines and receives one
//! response line per request, in order. A connection that closes or
//! half-closes while a call is in flight cancels that call; nothing is
//! written back.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use weft_config::Config;
use weft_wire::{WireError, WireRequest};

use crate::context::{ContextKind, ContextObjects, HostCapabilities};
use crate::dispatch::{DispatchError, Dispatcher};

/// Tracing target for host operations.
pub(crate) const HOST_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::host");

const ERROR_BACKOFF: Duration = Duration::from_millis(150);

/// Errors surfaced while binding or running the line host.
#[derive(Debug, Error)]
pub enum HostError {
    /// The listen address could not be parsed.
    #[error("invalid listen address {address}: {source}")]
    Address {
        /// Configured address.
        address: String,
        /// Parse failure.
        #[source]
        source: std::net::AddrParseError,
    },
    /// Binding the listener failed.
    #[error("failed to bind TCP listener at {addr}: {source}")]
    Bind {
        /// Address the host tried to bind.
        addr: SocketAddr,
        /// Bind failure.
        #[source]
        source: io::Error,
    },
    /// Reading or writing a connection failed.
    #[error("connection I/O failed: {0}")]
    Io(#[from] io::Error),
    /// A response envelope could not be serialised.
    #[error(transparent)]
    Wire(#[from] WireError),
}

/// Peer details supplied to factories as [`ContextKind::Connection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionInfo {
    /// Remote address of the connection.
    pub peer: SocketAddr,
}

/// TCP host that feeds request lines to a [`Dispatcher`].
#[derive(Debug)]
pub struct LineHost {
    listener: TcpListener,
    dispatcher: Dispatcher,
    max_request_bytes: usize,
    shutdown: CancellationToken,
}

impl LineHost {
    /// Context kinds the host supplies on every call.
    #[must_use]
    pub fn capabilities() -> HostCapabilities {
        HostCapabilities::with_kinds([ContextKind::Connection])
    }

    /// Binds a host to `address`.
    ///
    /// # Errors
    ///
    /// Returns [`HostError`] when the address is invalid or cannot be bound.
    pub async fn bind(
        address: &str,
        dispatcher: Dispatcher,
        max_request_bytes: usize,
    ) -> Result<Self, HostError> {
        let addr: SocketAddr = address.parse().map_err(|source| HostError::Address {
            address: address.to_owned(),
            source,
        })?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| HostError::Bind { addr, source })?;
        Ok(Self {
            listener,
            dispatcher,
            max_request_bytes,
            shutdown: CancellationToken::new(),
        })
    }

    /// Binds a host using the configured address and request limit.
    ///
    /// # Errors
    ///
    /// As [`LineHost::bind`].
    pub async fn from_config(config: &Config, dispatcher: Dispatcher) -> Result<Self, HostError> {
        Self::bind(
            config.listen_address(),
            dispatcher,
            config.max_request_bytes(),
        )
        .await
    }

    /// Address the listener is bound to.
    ///
    /// # Errors
    ///
    /// Returns the socket error when the address cannot be read.
    pub fn local_addr(&self) -> Result<SocketAddr, HostError> {
        Ok(self.listener.local_addr()?)
    }

    /// Token that stops the accept loop and every open connection.
    #[must_use]
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Accepts connections until the shutdown token is cancelled.
    pub async fn serve(self) {
        let address = self
            .listener
            .local_addr()
            .map_or_else(|_| "unknown".to_owned(), |addr| addr.to_string());
        info!(target: HOST_TARGET, %address, "line host active");
        let mut last_error = None::<io::ErrorKind>;
        loop {
            let accepted = tokio::select! {
                () = self.shutdown.cancelled() => break,
                accepted = self.listener.accept() => accepted,
            };
            match accepted {
                Ok((stream, peer)) => {
                    last_error = None;
                    self.spawn_connection(stream, peer);
                }
                Err(error) => {
                    let kind = error.kind();
                    if last_error != Some(kind) {
                        warn!(target: HOST_TARGET, error = %error, "socket accept error");
                    }
                    last_error = Some(kind);
                    tokio::time::sleep(ERROR_BACKOFF).await;
                }
            }
        }
        info!(target: HOST_TARGET, %address, "line host stopped");
    }

    fn spawn_connection(&self, stream: TcpStream, peer: SocketAddr) {
        let dispatcher = self.dispatcher.clone();
        let limit = self.max_request_bytes;
        let shutdown = self.shutdown.child_token();
        tokio::spawn(async move {
            let context = ContextObjects::new().with(ContextKind::Connection, ConnectionInfo { peer });
            let served = tokio::select! {
                () = shutdown.cancelled() => Ok(()),
                served = serve_connection(stream, &dispatcher, &context, limit) => served,
            };
            if let Err(error) = served {
                warn!(target: HOST_TARGET, %peer, error = %error, "connection handler error");
            }
        });
    }
}

/// Serves one connection until the peer closes it.
///
/// Requests longer than `max_request_bytes` are skipped without being
/// buffered and answered with a `BadRequest` failure.
///
/// # Errors
///
/// Returns [`HostError`] when the connection fails.
pub async fn serve_connection<S>(
    stream: S,
    dispatcher: &Dispatcher,
    context: &ContextObjects,
    max_request_bytes: usize,
) -> Result<(), HostError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (read_half, mut writer) = tokio::io::split(stream);
    let mut reader = BufReader::new(read_half);
    loop {
        let Some(line) = read_request_line(&mut reader, max_request_bytes).await? else {
            return Ok(());
        };
        let response = match line {
            RequestLine::TooLarge => {
                discard_line(&mut reader).await?;
                DispatchError::request_too_large(max_request_bytes).into_response()
            }
            RequestLine::Complete(bytes) => {
                let request = match WireRequest::parse(&bytes) {
                    Ok(request) => request,
                    Err(error) => {
                        let rejection = DispatchError::MalformedRequest(error);
                        write_line(&mut writer, &rejection.into_response().to_line()?).await?;
                        continue;
                    }
                };
                let route = request.route.clone();
                tokio::select! {
                    response = dispatcher.dispatch_request(request, context) => response,
                    () = peer_closed(&mut reader) => {
                        debug!(target: HOST_TARGET, route = %route, "peer disconnected; call cancelled");
                        return Ok(());
                    }
                }
            }
        };
        write_line(&mut writer, &response.to_line()?).await?;
    }
}

enum RequestLine {
    Complete(Vec<u8>),
    TooLarge,
}

async fn read_request_line<R>(reader: &mut R, limit: usize) -> io::Result<Option<RequestLine>>
where
    R: AsyncBufReadExt + Unpin,
{
    let mut buffer = Vec::new();
    let bound = u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(1);
    let read = (&mut *reader).take(bound).read_until(b'\n', &mut buffer).await?;
    if read == 0 {
        return Ok(None);
    }
    if buffer.last() == Some(&b'\n') {
        buffer.pop();
    }
    if buffer.len() > limit {
        return Ok(Some(RequestLine::TooLarge));
    }
    Ok(Some(RequestLine::Complete(buffer)))
}

async fn discard_line<R>(reader: &mut R) -> io::Result<()>
where
    R: AsyncBufReadExt + Unpin,
{
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(());
        }
        let (used, done) = match available.iter().position(|byte| *byte == b'\n') {
            Some(index) => (index + 1, true),
            None => (available.len(), false),
        };
        reader.consume(used);
        if done {
            return Ok(());
        }
    }
}

/// Resolves once the peer closes its write side. Pipelined data keeps the
/// future pending so the in-flight call can finish.
async fn peer_closed<R>(reader: &mut R)
where
    R: AsyncBufReadExt + Unpin,
{
    match reader.fill_buf().await {
        Ok([]) | Err(_) => {}
        Ok(_) => std::future::pending::<()>().await,
    }
}

async fn write_line<W>(writer: &mut W, line: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(line).await?;
    writer.flush().await
}
