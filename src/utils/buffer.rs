//! Interleaved sample buffer helpers.

// -------------------------------------------------------------------------------------------------

/// Frame-wise mutable access to interleaved audio buffers.
pub trait InterleavedBufferMut {
    /// Iterate over all complete sample frames of the given channel layout.
    /// Trailing samples which don't form a complete frame are skipped.
    fn frames_mut(&mut self, channel_count: usize) -> std::slice::ChunksExactMut<'_, f32>;
}

impl InterleavedBufferMut for [f32] {
    #[inline]
    fn frames_mut(&mut self, channel_count: usize) -> std::slice::ChunksExactMut<'_, f32> {
        assert!(channel_count > 0, "Need at least one channel");
        debug_assert!(
            self.len() % channel_count == 0,
            "Buffer length must be a multiple of the channel count"
        );
        self.chunks_exact_mut(channel_count)
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interleaved_frames() {
        let mut buffer = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let frames = buffer.as_mut_slice().frames_mut(2).collect::<Vec<_>>();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[1], [3.0, 4.0]);

        for frame in buffer.as_mut_slice().frames_mut(3) {
            frame[0] = 0.0;
        }
        assert_eq!(buffer, [0.0, 2.0, 3.0, 0.0, 5.0, 6.0]);
    }
}
