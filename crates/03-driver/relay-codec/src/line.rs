/// Bytes a single line may hold before it is discarded.
pub const LINE_CAPACITY: usize = 255;

/// Reassembles `\n`-terminated lines from arbitrary read chunks.
///
/// A line that grows past [`LINE_CAPACITY`] is thrown away: the byte that
/// would overflow is dropped and collection restarts from empty.
#[derive(Debug)]
pub struct LineAssembler {
    buf: Vec<u8>,
    overflows: u64,
}

impl LineAssembler {
    /// Creates an empty assembler.
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(LINE_CAPACITY),
            overflows: 0,
        }
    }

    /// Feeds a chunk, calling `on_line` with every completed line (without
    /// the `\n`). Stops at the first error `on_line` returns.
    pub fn feed<E>(
        &mut self,
        chunk: &[u8],
        mut on_line: impl FnMut(&[u8]) -> Result<(), E>,
    ) -> Result<(), E> {
        for &byte in chunk {
            if byte == b'\n' {
                let result = on_line(&self.buf);
                self.buf.clear();
                result?;
            } else if self.buf.len() < LINE_CAPACITY {
                self.buf.push(byte);
            } else {
                self.buf.clear();
                self.overflows += 1;
            }
        }
        Ok(())
    }

    /// Bytes of the line collected so far.
    pub fn partial(&self) -> &[u8] {
        &self.buf
    }

    /// Lines discarded for exceeding [`LINE_CAPACITY`].
    pub fn overflows(&self) -> u64 {
        self.overflows
    }

    /// Forgets any partial line.
    pub fn reset(&mut self) {
        self.buf.clear();
    }
}

impl Default for LineAssembler {
    fn default() -> Self {
        Self::new()
    }
}
