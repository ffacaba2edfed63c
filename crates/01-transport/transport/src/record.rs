//! Fixed-size records moved from the producer to the consumer.

/// Payload size used when callers do not pick one explicitly.
pub const DEFAULT_PAYLOAD_SIZE: usize = 4096;

/// Marker written at payload offset 0.
pub const HEAD_MARKER: u8 = 0xAA;
/// Marker written at the last payload offset.
pub const TAIL_MARKER: u8 = 0x55;

/// A sequence-stamped, time-stamped payload of `N` bytes.
///
/// `N` must be at least 2 so the head and tail markers occupy distinct
/// offsets; smaller payloads fail to compile.
///
/// The layout is plain old data: an all-zero bit pattern is a valid record,
/// which lets arenas hand out zeroed slots without running constructors.
#[repr(C)]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record<const N: usize = DEFAULT_PAYLOAD_SIZE> {
    /// Producer-assigned sequence number, wrapping at `u32::MAX`.
    pub sequence: u32,
    /// Monotonic microsecond timestamp taken when the record was emitted.
    pub timestamp: i64,
    /// Opaque payload bytes bracketed by [`HEAD_MARKER`] and [`TAIL_MARKER`].
    pub payload: [u8; N],
}

/// Which sentinel bytes failed verification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SentinelMismatch {
    /// Byte found at offset 0.
    pub head: u8,
    /// Byte found at offset `N - 1`.
    pub tail: u8,
}

impl<const N: usize> Record<N> {
    /// Size of the payload in bytes.
    pub const PAYLOAD_SIZE: usize = N;

    pub(crate) const MARKERS_FIT: () = assert!(
        N >= 2,
        "record payload must hold distinct head and tail markers"
    );

    /// Returns a zeroed record.
    pub const fn zeroed() -> Self {
        let () = Self::MARKERS_FIT;
        Self {
            sequence: 0,
            timestamp: 0,
            payload: [0; N],
        }
    }

    /// Writes the head and tail markers into the payload.
    pub fn stamp_markers(&mut self) {
        let () = Self::MARKERS_FIT;
        self.payload[0] = HEAD_MARKER;
        self.payload[N - 1] = TAIL_MARKER;
    }

    /// Checks both sentinel bytes.
    pub fn verify_markers(&self) -> Result<(), SentinelMismatch> {
        let () = Self::MARKERS_FIT;
        let head = self.payload[0];
        let tail = self.payload[N - 1];
        if head == HEAD_MARKER && tail == TAIL_MARKER {
            Ok(())
        } else {
            Err(SentinelMismatch { head, tail })
        }
    }
}

impl<const N: usize> Default for Record<N> {
    fn default() -> Self {
        Self::zeroed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stamped_record_verifies() {
        let mut record = Record::<16>::zeroed();
        assert!(record.verify_markers().is_err());
        record.stamp_markers();
        assert_eq!(record.payload[0], HEAD_MARKER);
        assert_eq!(record.payload[15], TAIL_MARKER);
        assert_eq!(record.verify_markers(), Ok(()));
    }

    #[test]
    fn mismatch_reports_observed_bytes() {
        let mut record = Record::<8>::zeroed();
        record.stamp_markers();
        record.payload[7] = 0x00;
        assert_eq!(
            record.verify_markers(),
            Err(SentinelMismatch {
                head: HEAD_MARKER,
                tail: 0x00
            })
        );
    }

    #[test]
    fn smallest_payload_keeps_markers_apart() {
        let mut record = Record::<2>::zeroed();
        record.stamp_markers();
        assert_eq!(record.payload, [HEAD_MARKER, TAIL_MARKER]);
        assert_eq!(record.verify_markers(), Ok(()));
    }
}
