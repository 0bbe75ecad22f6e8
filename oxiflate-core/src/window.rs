//! Sliding window of recent output for back-reference resolution.
//!
//! [`SlidingWindow`] is a power-of-two ring buffer holding the last
//! `2^window_bits` bytes a decoder produced. DEFLATE allows window sizes from
//! 256 bytes (`window_bits = 8`) up to 32 KiB (`window_bits = 15`).

use crate::adler::Adler32;
use crate::buffers::{StreamBuffers, try_alloc};
use crate::error::{OxiFlateError, Result};

/// Smallest supported window size, as log2.
pub const MIN_WINDOW_BITS: u8 = 8;
/// Largest supported window size, as log2.
pub const MAX_WINDOW_BITS: u8 = 15;

/// A ring buffer of the most recent output bytes.
///
/// # Example
///
/// ```
/// use oxiflate_core::window::SlidingWindow;
///
/// let mut window = SlidingWindow::new(8).unwrap();
/// window.record(b"AB");
/// assert_eq!(window.match_at(2, 5).unwrap(), b"ABABA");
/// ```
#[derive(Debug, Clone)]
pub struct SlidingWindow {
    /// The underlying buffer.
    buffer: Vec<u8>,
    /// Next write position.
    position: usize,
    /// Number of valid history bytes (up to capacity).
    size: usize,
    /// Capacity - 1.
    mask: usize,
    /// Adler-32 of the installed preset dictionary.
    dictionary_id: Option<u32>,
}

impl SlidingWindow {
    /// Create a window of `2^window_bits` bytes.
    ///
    /// # Arguments
    ///
    /// * `window_bits` - log2 of the window size (8-15)
    pub fn new(window_bits: u8) -> Result<Self> {
        if !(MIN_WINDOW_BITS..=MAX_WINDOW_BITS).contains(&window_bits) {
            return Err(OxiFlateError::invalid_parameter(format!(
                "window bits {window_bits} outside {MIN_WINDOW_BITS}-{MAX_WINDOW_BITS}"
            )));
        }
        let capacity = 1usize << window_bits;
        Ok(Self {
            buffer: try_alloc(capacity, 0u8)?,
            position: 0,
            size: 0,
            mask: capacity - 1,
            dictionary_id: None,
        })
    }

    /// Get the capacity of the window.
    pub fn capacity(&self) -> usize {
        self.mask + 1
    }

    /// Number of valid history bytes.
    pub fn len(&self) -> usize {
        self.size
    }

    /// Check if no history is available.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Identity of the installed dictionary, if any.
    pub fn dictionary_id(&self) -> Option<u32> {
        self.dictionary_id
    }

    /// Forget all history and the dictionary identity.
    pub fn clear(&mut self) {
        self.position = 0;
        self.size = 0;
        self.dictionary_id = None;
    }

    /// Append one byte, overwriting the oldest when full.
    #[inline]
    pub fn record_byte(&mut self, byte: u8) {
        self.buffer[self.position] = byte;
        self.position = (self.position + 1) & self.mask;
        if self.size <= self.mask {
            self.size += 1;
        }
    }

    /// Append bytes, overwriting the oldest when full.
    pub fn record(&mut self, bytes: &[u8]) {
        let capacity = self.capacity();
        // Only the tail can survive
        let tail = &bytes[bytes.len().saturating_sub(capacity)..];

        let first = tail.len().min(capacity - self.position);
        self.buffer[self.position..self.position + first].copy_from_slice(&tail[..first]);
        let rest = tail.len() - first;
        self.buffer[..rest].copy_from_slice(&tail[first..]);

        self.position = (self.position + tail.len()) & self.mask;
        self.size = (self.size + bytes.len()).min(capacity);
    }

    fn check_distance(&self, distance: usize) -> Result<()> {
        if distance == 0 || distance > self.size {
            return Err(OxiFlateError::invalid_distance(distance, self.size));
        }
        Ok(())
    }

    /// Read the byte `distance` positions back (1 = most recent).
    pub fn byte_at(&self, distance: usize) -> Result<u8> {
        self.check_distance(distance)?;
        Ok(self.buffer[self.position.wrapping_sub(distance) & self.mask])
    }

    /// The bytes a back-reference of (`distance`, `length`) would produce.
    ///
    /// When `length` exceeds `distance` the referenced bytes repeat, exactly
    /// as an overlapping LZ77 copy does. The window is not modified.
    pub fn match_at(&self, distance: usize, length: usize) -> Result<Vec<u8>> {
        self.check_distance(distance)?;
        let start = self.position.wrapping_sub(distance);
        Ok((0..length)
            .map(|i| self.buffer[start.wrapping_add(i % distance) & self.mask])
            .collect())
    }

    /// Resolve a back-reference into the output, recording each byte.
    ///
    /// Copies at most `length` bytes, fewer if the output fills first.
    ///
    /// # Returns
    ///
    /// The number of bytes copied.
    pub fn copy_match(
        &mut self,
        distance: usize,
        length: usize,
        out: &mut StreamBuffers<'_, '_>,
    ) -> Result<usize> {
        self.check_distance(distance)?;
        let count = length.min(out.avail_out());
        let mut src = self.position.wrapping_sub(distance) & self.mask;
        for _ in 0..count {
            let byte = self.buffer[src];
            out.push(byte);
            self.record_byte(byte);
            src = (src + 1) & self.mask;
        }
        Ok(count)
    }

    /// Pre-fill the window with a preset dictionary.
    ///
    /// Only the last `capacity` bytes of a longer dictionary are kept. The
    /// Adler-32 of the whole dictionary becomes the window identity.
    ///
    /// # Returns
    ///
    /// The dictionary id.
    pub fn preload_dictionary(&mut self, dictionary: &[u8]) -> u32 {
        let id = Adler32::checksum(dictionary);
        self.record(dictionary);
        self.dictionary_id = Some(id);
        id
    }

    /// Get the last `count` bytes of history, oldest first.
    pub fn last_bytes(&self, count: usize) -> Vec<u8> {
        let count = count.min(self.size);
        (0..count)
            .map(|i| self.buffer[self.position.wrapping_sub(count - i) & self.mask])
            .collect()
    }
}
