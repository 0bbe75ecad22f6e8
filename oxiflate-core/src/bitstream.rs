//! Bit-level I/O for the DEFLATE block stream.
//!
//! This module provides [`BitReader`] and [`BitWriter`], both working over
//! in-memory byte buffers rather than `Read`/`Write` objects so that a stream
//! can stop at any byte boundary and pick up again on the next call.
//!
//! # Bit Ordering
//!
//! DEFLATE packs bits LSB-first: the first bit of a value lands in the least
//! significant free bit of the current byte.
//!
//! # Example
//!
//! ```
//! use oxiflate_core::bitstream::{BitReader, BitWriter};
//! use oxiflate_core::buffers::StreamBuffers;
//!
//! // Writing bits
//! let mut writer = BitWriter::new();
//! writer.write_bits(0b101, 3);
//! writer.write_bits(0b1100, 4);
//! writer.align_to_byte();
//! let mut packed = [0u8; 4];
//! let mut out = StreamBuffers::new(&[], &mut packed);
//! assert_eq!(writer.drain_into(&mut out), 1);
//!
//! // Reading bits
//! let mut sink = [0u8; 0];
//! let mut input = StreamBuffers::new(&packed[..1], &mut sink);
//! let mut reader = BitReader::new();
//! assert_eq!(reader.try_read_bits(&mut input, 3), Some(0b101));
//! assert_eq!(reader.try_read_bits(&mut input, 4), Some(0b1100));
//! ```

use crate::buffers::StreamBuffers;

/// A resumable LSB-first bit accumulator.
///
/// Bytes are pulled from the call's input one at a time and only when a
/// request cannot be satisfied from bits already held, so no input is ever
/// consumed speculatively.
#[derive(Debug, Clone, Default)]
pub struct BitReader {
    /// Bit buffer (LSB-first).
    buffer: u64,
    /// Number of valid bits in buffer.
    bits_in_buffer: u8,
    /// Total bits consumed (for error reporting).
    total_bits_read: u64,
}

impl BitReader {
    /// Create an empty reader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the total number of bits consumed so far.
    pub fn bits_read(&self) -> u64 {
        self.total_bits_read
    }

    /// Number of bits currently held.
    #[inline]
    pub fn available(&self) -> u8 {
        self.bits_in_buffer
    }

    /// Pull one input byte into the accumulator.
    ///
    /// Returns `false` when the input is exhausted.
    #[inline]
    pub fn pull_byte(&mut self, buf: &mut StreamBuffers<'_, '_>) -> bool {
        if self.bits_in_buffer > 56 {
            return false;
        }
        match buf.next_byte() {
            Some(byte) => {
                self.buffer |= u64::from(byte) << self.bits_in_buffer;
                self.bits_in_buffer += 8;
                true
            }
            None => false,
        }
    }

    /// Make sure at least `count` bits are held.
    ///
    /// # Arguments
    ///
    /// * `count` - Number of bits required (0-32)
    ///
    /// # Returns
    ///
    /// `false` if the input ran out first; bits pulled so far are kept.
    #[inline]
    pub fn fill(&mut self, buf: &mut StreamBuffers<'_, '_>, count: u8) -> bool {
        debug_assert!(count <= 32, "Cannot fill more than 32 bits at once");
        while self.bits_in_buffer < count {
            if !self.pull_byte(buf) {
                return false;
            }
        }
        true
    }

    /// Look at the next `count` held bits without consuming them.
    ///
    /// `count` must not exceed [`available`](Self::available).
    #[inline]
    pub fn peek_bits(&self, count: u8) -> u32 {
        debug_assert!(count <= 32 && count <= self.bits_in_buffer);
        (self.buffer & ((1u64 << count) - 1)) as u32
    }

    /// Drop `count` held bits.
    #[inline]
    pub fn skip_bits(&mut self, count: u8) {
        debug_assert!(count <= self.bits_in_buffer);
        self.buffer >>= count;
        self.bits_in_buffer -= count;
        self.total_bits_read += u64::from(count);
    }

    /// Consume `count` held bits and return them.
    #[inline]
    pub fn read_bits(&mut self, count: u8) -> u32 {
        let value = self.peek_bits(count);
        self.skip_bits(count);
        value
    }

    /// Fill and read `count` bits, or return `None` if the input ran out.
    pub fn try_read_bits(&mut self, buf: &mut StreamBuffers<'_, '_>, count: u8) -> Option<u32> {
        if self.fill(buf, count) {
            Some(self.read_bits(count))
        } else {
            None
        }
    }

    /// Discard bits up to the next byte boundary.
    pub fn align_to_byte(&mut self) {
        let skip = self.bits_in_buffer % 8;
        self.skip_bits(skip);
    }

    /// Read one byte on a byte boundary, from held bits first, then input.
    pub fn read_aligned_byte(&mut self, buf: &mut StreamBuffers<'_, '_>) -> Option<u8> {
        debug_assert!(self.bits_in_buffer % 8 == 0, "Reader is not byte aligned");
        if self.bits_in_buffer >= 8 {
            return Some(self.read_bits(8) as u8);
        }
        let byte = buf.next_byte()?;
        self.total_bits_read += 8;
        Some(byte)
    }

    /// Number of whole bytes held after byte alignment.
    pub fn held_bytes(&self) -> usize {
        usize::from(self.bits_in_buffer / 8)
    }

    /// Forget all held bits.
    pub fn clear(&mut self) {
        self.buffer = 0;
        self.bits_in_buffer = 0;
    }
}

/// A bit-level writer that packs into an owned pending buffer.
///
/// Completed bytes accumulate until [`drain_into`](Self::drain_into) hands
/// them to the caller's output. A trailing partial byte stays in the bit
/// buffer until more bits arrive or [`align_to_byte`](Self::align_to_byte)
/// pads it.
#[derive(Debug, Clone, Default)]
pub struct BitWriter {
    /// Completed bytes not yet handed out.
    pending: Vec<u8>,
    /// How much of `pending` has already been drained.
    drained: usize,
    /// Bit buffer (LSB-first).
    buffer: u64,
    /// Number of valid bits in buffer.
    bits_in_buffer: u8,
    /// Total bits written (for statistics).
    total_bits_written: u64,
}

impl BitWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a writer whose pending buffer is pre-sized.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            pending: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Get the total number of bits written so far.
    pub fn bits_written(&self) -> u64 {
        self.total_bits_written
    }

    /// Number of bits waiting for a byte to complete.
    pub fn partial_bits(&self) -> u8 {
        self.bits_in_buffer
    }

    /// Number of completed bytes not yet drained.
    pub fn pending_len(&self) -> usize {
        self.pending.len() - self.drained
    }

    /// Check whether completed bytes are waiting to be drained.
    pub fn has_pending(&self) -> bool {
        self.pending_len() > 0
    }

    /// Write up to 32 bits (LSB-first).
    ///
    /// # Arguments
    ///
    /// * `value` - The bits to write (only the lowest `count` bits are used)
    /// * `count` - Number of bits to write (0-32)
    #[inline]
    pub fn write_bits(&mut self, value: u32, count: u8) {
        debug_assert!(count <= 32, "Cannot write more than 32 bits at once");
        if count == 0 {
            return;
        }

        let mask = (1u64 << count) - 1;
        self.buffer |= (u64::from(value) & mask) << self.bits_in_buffer;
        self.bits_in_buffer += count;
        self.total_bits_written += u64::from(count);

        while self.bits_in_buffer >= 8 {
            self.pending.push(self.buffer as u8);
            self.buffer >>= 8;
            self.bits_in_buffer -= 8;
        }
    }

    /// Write a single bit.
    #[inline]
    pub fn write_bit(&mut self, bit: bool) {
        self.write_bits(u32::from(bit), 1);
    }

    /// Pad with zero bits up to the next byte boundary.
    pub fn align_to_byte(&mut self) {
        if self.bits_in_buffer > 0 {
            let pad = 8 - self.bits_in_buffer;
            self.write_bits(0, pad);
        }
    }

    /// Write whole bytes, bit-packed if the writer is not aligned.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        if self.bits_in_buffer == 0 {
            self.pending.extend_from_slice(bytes);
            self.total_bits_written += 8 * bytes.len() as u64;
        } else {
            for &byte in bytes {
                self.write_bits(u32::from(byte), 8);
            }
        }
    }

    /// Move as many completed bytes as fit into the caller's output.
    ///
    /// # Returns
    ///
    /// The number of bytes moved.
    pub fn drain_into(&mut self, buf: &mut StreamBuffers<'_, '_>) -> usize {
        let count = buf.write(&self.pending[self.drained..]);
        self.drained += count;
        if self.drained == self.pending.len() {
            self.pending.clear();
            self.drained = 0;
        }
        count
    }

    /// Drop all pending bytes and bits.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.drained = 0;
        self.buffer = 0;
        self.bits_in_buffer = 0;
    }
}
