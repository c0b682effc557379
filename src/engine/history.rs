//! Rolling input history, which grains read their source samples from.

// -------------------------------------------------------------------------------------------------

/// Mono circular buffer, which keeps track of the number of samples written since the last
/// reset, so reads can be bounded to history that actually got written.
///
/// The buffer length is rounded up to a power of two to allow masked indexing.
#[derive(Debug, Default)]
pub(crate) struct HistoryBuffer {
    buffer: Vec<f32>,
    buffer_mask: usize,
    write_pos: usize,
    write_count: u64,
}

impl HistoryBuffer {
    /// Create a new history buffer which can hold at least `min_capacity` samples.
    pub fn new(min_capacity: usize) -> Self {
        let (buffer, buffer_mask) = if min_capacity > 0 {
            let buffer_len = min_capacity.next_power_of_two();
            (vec![0.0; buffer_len], buffer_len - 1)
        } else {
            (Vec::new(), 0)
        };
        let write_pos = 0;
        let write_count = 0;
        Self {
            buffer,
            buffer_mask,
            write_pos,
            write_count,
        }
    }

    /// Number of samples the buffer can hold.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Total number of samples written since the last reset.
    #[inline]
    pub fn write_count(&self) -> u64 {
        self.write_count
    }

    /// Forget all written history. Buffer contents are not touched, but can no longer be read.
    pub fn reset(&mut self) {
        self.write_pos = 0;
        self.write_count = 0;
    }

    /// Append a new sample.
    #[inline]
    pub fn write(&mut self, sample: f32) {
        if self.buffer.is_empty() {
            return;
        }
        self.buffer[self.write_pos] = sample;
        self.write_pos = (self.write_pos + 1) & self.buffer_mask;
        self.write_count += 1;
    }

    /// Largest offset that currently can be read: the oldest sample written since the last
    /// reset which is still present in the buffer.
    #[inline]
    pub fn max_read_offset(&self) -> usize {
        let written = self.write_count.saturating_sub(1);
        let capacity = self.capacity().saturating_sub(1) as u64;
        written.min(capacity) as usize
    }

    /// Read the sample `offset` positions before the most recently written one.
    /// Offsets beyond the available history are clamped to the oldest valid sample.
    /// Returns silence when nothing got written yet.
    #[inline]
    pub fn read(&self, offset: usize) -> f32 {
        if self.write_count == 0 {
            return 0.0;
        }
        let offset = offset.min(self.max_read_offset());
        let index = self
            .write_pos
            .wrapping_sub(1)
            .wrapping_sub(offset)
            & self.buffer_mask;
        self.buffer[index]
    }
}

// -------------------------------------------------------------------------------------------------
