//! Borrowed input/output cursors for a single streaming call.
//!
//! A [`StreamBuffers`] pairs the caller's input slice with its output slice and
//! tracks how far each has advanced. Engines never keep it past the call.

use crate::error::{OxiFlateError, Result};

/// Allocate a vector of `len` copies of `fill`, reporting failure as an error.
///
/// Engine tables are sized once at init; a failed reservation surfaces as
/// [`OxiFlateError::OutOfMemory`] instead of aborting.
pub fn try_alloc<T: Clone>(len: usize, fill: T) -> Result<Vec<T>> {
    let mut table = Vec::new();
    table
        .try_reserve_exact(len)
        .map_err(|_| OxiFlateError::out_of_memory(len.saturating_mul(std::mem::size_of::<T>())))?;
    table.resize(len, fill);
    Ok(table)
}

/// Input and output cursors for one call into an engine.
#[derive(Debug)]
pub struct StreamBuffers<'i, 'o> {
    input: &'i [u8],
    in_pos: usize,
    output: &'o mut [u8],
    out_pos: usize,
}

impl<'i, 'o> StreamBuffers<'i, 'o> {
    /// Wrap the caller's buffers.
    pub fn new(input: &'i [u8], output: &'o mut [u8]) -> Self {
        Self {
            input,
            in_pos: 0,
            output,
            out_pos: 0,
        }
    }

    /// Bytes of input not yet consumed.
    #[inline]
    pub fn avail_in(&self) -> usize {
        self.input.len() - self.in_pos
    }

    /// Bytes of output space left.
    #[inline]
    pub fn avail_out(&self) -> usize {
        self.output.len() - self.out_pos
    }

    /// Bytes consumed so far in this call.
    #[inline]
    pub fn consumed(&self) -> usize {
        self.in_pos
    }

    /// Bytes produced so far in this call.
    #[inline]
    pub fn produced(&self) -> usize {
        self.out_pos
    }

    /// The unconsumed part of the input.
    pub fn remaining_input(&self) -> &'i [u8] {
        let input = self.input;
        &input[self.in_pos..]
    }

    /// Mark `count` input bytes as consumed.
    pub fn advance_input(&mut self, count: usize) {
        self.in_pos = (self.in_pos + count).min(self.input.len());
    }

    /// Take the next input byte.
    #[inline]
    pub fn next_byte(&mut self) -> Option<u8> {
        let byte = *self.input.get(self.in_pos)?;
        self.in_pos += 1;
        Some(byte)
    }

    /// Copy as much input as fits into `dst`, returning the count.
    pub fn read_into(&mut self, dst: &mut [u8]) -> usize {
        let count = dst.len().min(self.avail_in());
        dst[..count].copy_from_slice(&self.input[self.in_pos..self.in_pos + count]);
        self.in_pos += count;
        count
    }

    /// Append one byte to the output; `false` when the output is full.
    #[inline]
    pub fn push(&mut self, byte: u8) -> bool {
        match self.output.get_mut(self.out_pos) {
            Some(slot) => {
                *slot = byte;
                self.out_pos += 1;
                true
            }
            None => false,
        }
    }

    /// Copy as much of `src` as fits into the output, returning the count.
    pub fn write(&mut self, src: &[u8]) -> usize {
        let count = src.len().min(self.avail_out());
        self.output[self.out_pos..self.out_pos + count].copy_from_slice(&src[..count]);
        self.out_pos += count;
        count
    }

    /// Output written since position `start` of this call.
    pub fn written_since(&self, start: usize) -> &[u8] {
        &self.output[start.min(self.out_pos)..self.out_pos]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursors_advance() {
        let input = [1u8, 2, 3, 4];
        let mut output = [0u8; 3];
        let mut buf = StreamBuffers::new(&input, &mut output);

        assert_eq!(buf.next_byte(), Some(1));
        let mut dst = [0u8; 2];
        assert_eq!(buf.read_into(&mut dst), 2);
        assert_eq!(dst, [2, 3]);
        assert_eq!(buf.avail_in(), 1);

        assert!(buf.push(9));
        assert_eq!(buf.write(&[7, 8, 6]), 2);
        assert!(!buf.push(5));
        assert_eq!(buf.written_since(1), &[7, 8]);
        assert_eq!(buf.produced(), 3);
        assert_eq!(buf.consumed(), 3);
    }

    #[test]
    fn test_try_alloc() {
        let table = try_alloc(16, 0u16).expect("small allocation succeeds");
        assert_eq!(table.len(), 16);
        assert!(table.iter().all(|&v| v == 0));

        let err = try_alloc(usize::MAX, 0u8).expect_err("allocation must fail");
        assert!(matches!(err, OxiFlateError::OutOfMemory { .. }));
    }

    #[test]
    fn test_empty_buffers() {
        let mut output = [0u8; 0];
        let mut buf = StreamBuffers::new(&[], &mut output);
        assert_eq!(buf.next_byte(), None);
        assert!(!buf.push(0));
        assert_eq!(buf.write(b"abc"), 0);
        assert!(buf.remaining_input().is_empty());
    }
}
