//! Blocking TCP front end: one peer at a time, frames forwarded to a shared
//! sink.

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::relay::{RelayError, RelaySession};

/// Bytes requested per read from the peer.
pub const READ_CHUNK: usize = 127;

/// How long an echo may block before it is skipped.
pub const ECHO_TIMEOUT: Duration = Duration::from_millis(100);

/// Totals for one finished connection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConnectionSummary {
    /// Lines received.
    pub lines: u64,
    /// Frames forwarded.
    pub forwarded: u64,
    /// Lines discarded as too long.
    pub overflows: u64,
}

/// Relays one connection until the peer closes it or the connection breaks.
///
/// Only a failing `forward` sink is an error.
pub fn serve_connection<S, F>(
    stream: &mut S,
    forward: &mut F,
) -> Result<ConnectionSummary, RelayError>
where
    S: Read + Write + ?Sized,
    F: Write + ?Sized,
{
    let mut session = RelaySession::new();
    let mut buf = [0u8; READ_CHUNK];
    loop {
        let n = match stream.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => {
                debug!(%err, "peer read failed, closing");
                break;
            }
        };
        match session.feed(&buf[..n], &mut *forward, &mut *stream) {
            Ok(()) => {}
            Err(RelayError::Echo(err)) => {
                warn!(%err, "peer connection broke");
                break;
            }
            Err(err) => return Err(err),
        }
        forward.flush().map_err(RelayError::Forward)?;
    }
    Ok(ConnectionSummary {
        lines: session.lines(),
        forwarded: session.forwarded(),
        overflows: session.overflows(),
    })
}

/// Accepts and relays a single peer.
///
/// Returns the peer address and its totals.
pub fn serve_one<F>(
    listener: &TcpListener,
    forward: &mut F,
) -> Result<(SocketAddr, ConnectionSummary), RelayError>
where
    F: Write + ?Sized,
{
    let (mut stream, peer) = loop {
        match listener.accept() {
            Ok(accepted) => break accepted,
            Err(err) => warn!(%err, "accept failed"),
        }
    };
    info!(%peer, "client connected");
    if let Err(err) = stream.set_nodelay(true) {
        debug!(%err, "could not disable nagle");
    }
    if let Err(err) = stream.set_write_timeout(Some(ECHO_TIMEOUT)) {
        debug!(%err, "could not set echo timeout");
    }

    let summary = serve_connection(&mut stream, forward)?;
    info!(
        %peer,
        lines = summary.lines,
        forwarded = summary.forwarded,
        "client disconnected"
    );
    Ok((peer, summary))
}

/// Relays peers one after another for as long as the sink accepts frames.
pub fn serve<F>(listener: &TcpListener, forward: &mut F) -> Result<(), RelayError>
where
    F: Write + ?Sized,
{
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "relay listening");
    }
    loop {
        serve_one(listener, &mut *forward)?;
    }
}
