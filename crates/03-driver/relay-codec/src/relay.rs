use std::io::{self, Write};

use thiserror::Error;
use tracing::{debug, warn};

use crate::frame::{extract_frame, trim_line_end, write_forward};
use crate::line::LineAssembler;

/// Why a relay session stopped.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The serial-side sink rejected a frame.
    #[error("forwarding frame failed: {0}")]
    Forward(#[source] io::Error),
    /// The peer connection broke while echoing the line counter.
    #[error("echo to peer failed: {0}")]
    Echo(#[source] io::Error),
}

/// Per-connection relay state: line reassembly plus the echoed line counter.
#[derive(Debug, Default)]
pub struct RelaySession {
    assembler: LineAssembler,
    lines: u64,
    forwarded: u64,
}

impl RelaySession {
    /// Starts a session with the line counter at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines received so far.
    pub fn lines(&self) -> u64 {
        self.lines
    }

    /// Frames forwarded so far.
    pub fn forwarded(&self) -> u64 {
        self.forwarded
    }

    /// Lines dropped for exceeding the line buffer.
    pub fn overflows(&self) -> u64 {
        self.assembler.overflows()
    }

    /// Processes bytes read from the peer.
    ///
    /// Every completed line bumps the counter and echoes it to `peer` as
    /// `"{n}\r\n"`, whether or not it carried a frame. Frames go to
    /// `forward`. An echo that times out is skipped, not fatal.
    pub fn feed<F, P>(
        &mut self,
        chunk: &[u8],
        forward: &mut F,
        peer: &mut P,
    ) -> Result<(), RelayError>
    where
        F: Write + ?Sized,
        P: Write + ?Sized,
    {
        let Self {
            assembler,
            lines,
            forwarded,
        } = self;
        assembler.feed(chunk, |line| {
            let line = trim_line_end(line);
            if let Some(content) = extract_frame(line) {
                write_forward(&mut *forward, content).map_err(RelayError::Forward)?;
                *forwarded += 1;
                debug!(len = content.len(), "frame forwarded");
            }

            *lines += 1;
            match peer.write_all(format!("{lines}\r\n").as_bytes()) {
                Ok(()) => Ok(()),
                Err(err)
                    if matches!(
                        err.kind(),
                        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                    ) =>
                {
                    warn!(line = *lines, "peer not draining, echo skipped");
                    Ok(())
                }
                Err(err) => Err(RelayError::Echo(err)),
            }
        })
    }
}
