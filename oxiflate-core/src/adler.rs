//! Adler-32 checksum (RFC 1950).
//!
//! The zlib trailer and the preset-dictionary id are both Adler-32 values.
//! Besides running updates this module provides [`Adler32::combine`], which
//! merges the checksums of two adjacent buffers without rescanning them.

/// Largest prime smaller than 65536.
const ADLER_MOD: u32 = 65521;

/// Largest n such that 255n(n+1)/2 + (n+1)(ADLER_MOD-1) fits in a u32.
const NMAX: usize = 5552;

/// Adler-32 checksum calculator.
///
/// `Clone` takes an independent snapshot of the running state.
///
/// # Example
///
/// ```
/// use oxiflate_core::adler::Adler32;
///
/// let mut adler = Adler32::new();
/// adler.update(b"Wikipedia");
/// assert_eq!(adler.value(), 0x11E6_0398);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Adler32 {
    a: u32,
    b: u32,
}

impl Adler32 {
    /// Create a new Adler-32 calculator.
    pub fn new() -> Self {
        Self { a: 1, b: 0 }
    }

    /// Resume from a previously computed checksum value.
    pub fn from_value(value: u32) -> Self {
        Self {
            a: value & 0xFFFF,
            b: value >> 16,
        }
    }

    /// Reset to the checksum of the empty string.
    pub fn reset(&mut self) {
        self.a = 1;
        self.b = 0;
    }

    /// Update the checksum with more data.
    pub fn update(&mut self, data: &[u8]) {
        let mut a = self.a;
        let mut b = self.b;

        // Reduce once per NMAX bytes so the sums cannot overflow
        for chunk in data.chunks(NMAX) {
            for &byte in chunk {
                a += u32::from(byte);
                b += a;
            }
            a %= ADLER_MOD;
            b %= ADLER_MOD;
        }

        self.a = a;
        self.b = b;
    }

    /// Get the current checksum value.
    pub fn value(&self) -> u32 {
        (self.b << 16) | self.a
    }

    /// Compute the Adler-32 of data in one shot.
    pub fn checksum(data: &[u8]) -> u32 {
        let mut adler = Self::new();
        adler.update(data);
        adler.value()
    }

    /// Combine two checksums.
    ///
    /// # Arguments
    ///
    /// * `adler1` - Checksum of the first buffer
    /// * `adler2` - Checksum of the second buffer
    /// * `len2` - Length of the second buffer
    ///
    /// # Returns
    ///
    /// The checksum of the first buffer followed by the second.
    pub fn combine(adler1: u32, adler2: u32, len2: u64) -> u32 {
        let modulus = u64::from(ADLER_MOD);
        let rem = len2 % modulus;

        let mut sum1 = u64::from(adler1 & 0xFFFF);
        let mut sum2 = (rem * sum1) % modulus;
        sum1 += u64::from(adler2 & 0xFFFF) + modulus - 1;
        sum2 += u64::from(adler1 >> 16) + u64::from(adler2 >> 16) + modulus - rem;

        sum1 %= modulus;
        sum2 %= modulus;
        ((sum2 << 16) | sum1) as u32
    }
}

impl Default for Adler32 {
    fn default() -> Self {
        Self::new()
    }
}
