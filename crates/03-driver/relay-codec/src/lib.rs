//! Line-oriented relay: reassembles `[payload]` frames from a TCP peer,
//! forwards them with a CRC-16/MODBUS suffix and echoes a per-line counter
//! back as a liveness signal.

mod crc;
mod frame;
mod line;
mod relay;
mod server;

pub use crc::crc16;
pub use frame::{extract_frame, trim_line_end, write_forward, MAX_CONTENT_LEN};
pub use line::{LineAssembler, LINE_CAPACITY};
pub use relay::{RelayError, RelaySession};
pub use server::{
    serve, serve_connection, serve_one, ConnectionSummary, ECHO_TIMEOUT, READ_CHUNK,
};
