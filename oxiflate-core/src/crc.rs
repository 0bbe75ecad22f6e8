//! CRC-32 (ISO 3309 / ITU-T V.42) as used by the gzip trailer.
//!
//! Updates use the slicing-by-8 technique for inputs of 16 bytes or more and
//! a single table otherwise. [`Crc32::combine`] merges two checksums in
//! logarithmic time by multiplying in GF(2) modulo the CRC polynomial.
//!
//! The gzip header CRC16 is the low half of a CRC-32 over the header bytes,
//! so no separate 16-bit polynomial is needed.

/// Reflected CRC-32 polynomial.
const POLY: u32 = 0xEDB88320;

/// CRC-32 slicing-by-8 lookup tables; table 0 is the classic byte table.
const CRC32_TABLES: [[u32; 256]; 8] = {
    let mut tables = [[0u32; 256]; 8];

    let mut i = 0usize;
    while i < 256 {
        let mut crc = i as u32;
        let mut j = 0;
        while j < 8 {
            crc = if crc & 1 != 0 { (crc >> 1) ^ POLY } else { crc >> 1 };
            j += 1;
        }
        tables[0][i] = crc;
        i += 1;
    }

    let mut t = 1usize;
    while t < 8 {
        let mut i = 0usize;
        while i < 256 {
            let prev = tables[t - 1][i];
            tables[t][i] = (prev >> 8) ^ tables[0][(prev & 0xFF) as usize];
            i += 1;
        }
        t += 1;
    }

    tables
};

/// x^(2^k) modulo the polynomial, for k = 0..32.
const X2N_TABLE: [u32; 32] = {
    let mut table = [0u32; 32];
    // x^1 in reflected form
    let mut p: u32 = 1 << 30;
    table[0] = p;
    let mut n = 1usize;
    while n < 32 {
        p = multmodp(p, p);
        table[n] = p;
        n += 1;
    }
    table
};

/// Multiply two polynomials modulo the CRC polynomial (reflected form,
/// bit 31 is x^0).
const fn multmodp(a: u32, mut b: u32) -> u32 {
    let mut product = 0u32;
    let mut bit = 31i32;
    while bit >= 0 {
        if a & (1u32 << bit) != 0 {
            product ^= b;
        }
        b = if b & 1 != 0 { (b >> 1) ^ POLY } else { b >> 1 };
        bit -= 1;
    }
    product
}

/// x^(n * 2^k) modulo the CRC polynomial.
fn x2nmodp(mut n: u64, mut k: usize) -> u32 {
    let mut p: u32 = 1 << 31;
    while n != 0 {
        if n & 1 != 0 {
            p = multmodp(X2N_TABLE[k & 31], p);
        }
        n >>= 1;
        k += 1;
    }
    p
}

/// CRC-32 calculator.
///
/// `Clone` takes an independent snapshot of the running state.
///
/// # Example
///
/// ```
/// use oxiflate_core::crc::Crc32;
///
/// let mut crc = Crc32::new();
/// crc.update(b"Hello, World!");
/// assert_eq!(crc.value(), 0xEC4AC3D0);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Crc32 {
    crc: u32,
}

impl Crc32 {
    /// Create a new CRC-32 calculator.
    pub fn new() -> Self {
        Self { crc: 0xFFFFFFFF }
    }

    /// Resume from a previously computed checksum value.
    pub fn from_value(value: u32) -> Self {
        Self { crc: !value }
    }

    /// Reset the CRC to its initial state.
    pub fn reset(&mut self) {
        self.crc = 0xFFFFFFFF;
    }

    /// Update the CRC with more data.
    #[inline]
    pub fn update(&mut self, data: &[u8]) {
        if data.len() >= 16 {
            crc32_slice8(&mut self.crc, data);
        } else {
            crc32_bytewise(&mut self.crc, data);
        }
    }

    /// Get the current CRC value.
    #[inline(always)]
    pub fn value(&self) -> u32 {
        !self.crc
    }

    /// Compute CRC-32 for a slice in one call.
    pub fn checksum(data: &[u8]) -> u32 {
        let mut crc = Self::new();
        crc.update(data);
        crc.value()
    }

    /// Combine two checksums.
    ///
    /// # Arguments
    ///
    /// * `crc1` - Checksum of the first buffer
    /// * `crc2` - Checksum of the second buffer
    /// * `len2` - Length of the second buffer
    ///
    /// # Returns
    ///
    /// The checksum of the first buffer followed by the second.
    pub fn combine(crc1: u32, crc2: u32, len2: u64) -> u32 {
        multmodp(x2nmodp(len2, 3), crc1) ^ crc2
    }
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn crc32_bytewise(crc: &mut u32, data: &[u8]) {
    let mut c = *crc;
    for &byte in data {
        c = CRC32_TABLES[0][((c ^ u32::from(byte)) & 0xFF) as usize] ^ (c >> 8);
    }
    *crc = c;
}

/// Slicing-by-8: eight table lookups per 8-byte chunk.
#[inline]
fn crc32_slice8(crc: &mut u32, data: &[u8]) {
    let mut c = *crc;
    let mut chunks = data.chunks_exact(8);

    for chunk in &mut chunks {
        let low = c ^ u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        c = CRC32_TABLES[7][(low & 0xFF) as usize]
            ^ CRC32_TABLES[6][((low >> 8) & 0xFF) as usize]
            ^ CRC32_TABLES[5][((low >> 16) & 0xFF) as usize]
            ^ CRC32_TABLES[4][(low >> 24) as usize]
            ^ CRC32_TABLES[3][chunk[4] as usize]
            ^ CRC32_TABLES[2][chunk[5] as usize]
            ^ CRC32_TABLES[1][chunk[6] as usize]
            ^ CRC32_TABLES[0][chunk[7] as usize];
    }

    *crc = c;
    crc32_bytewise(crc, chunks.remainder());
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn random_bytes(len: usize, mut seed: u64) -> Vec<u8> {
        let mut data = Vec::with_capacity(len);
        for _ in 0..len {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
            data.push((seed >> 32) as u8);
        }
        data
    }

    #[rstest]
    #[case::empty(b"", 0x0000_0000)]
    #[case::check_value(b"123456789", 0xCBF4_3926)]
    #[case::hello_world(b"Hello, World!", 0xEC4A_C3D0)]
    #[case::gzip_foo_payload(b"foo", 0x8C73_6521)]
    fn test_crc32_known_values(#[case] data: &[u8], #[case] expected: u32) {
        assert_eq!(Crc32::checksum(data), expected);
    }

    #[test]
    fn test_crc32_incremental() {
        let mut crc = Crc32::new();
        crc.update(b"Hello");
        crc.update(b", ");
        crc.update(b"World!");
        assert_eq!(crc.value(), 0xEC4AC3D0);
    }

    #[test]
    fn test_slice8_matches_bytewise() {
        for size in [1, 7, 8, 15, 16, 17, 31, 32, 64, 129, 4096] {
            let data = random_bytes(size, size as u64);
            let mut fast = 0xFFFFFFFF;
            let mut slow = 0xFFFFFFFF;
            crc32_slice8(&mut fast, &data);
            crc32_bytewise(&mut slow, &data);
            assert_eq!(fast, slow, "mismatch for size {size}");
        }
    }

    #[test]
    fn test_copy_is_independent() {
        let buf1 = random_bytes(1024, 1);
        let buf2 = random_bytes(1024, 2);

        let mut original = Crc32::new();
        original.update(&buf1);
        let mut copy = original.clone();

        original.update(&buf2);
        copy.update(&buf1);

        assert_ne!(original.value(), copy.value());
        assert_eq!(
            original.value(),
            Crc32::checksum(&[buf1.clone(), buf2].concat())
        );
        assert_eq!(
            copy.value(),
            Crc32::checksum(&[buf1.clone(), buf1].concat())
        );
    }

    #[test]
    fn test_combine() {
        let buf1 = random_bytes(1024, 3);
        let buf2 = random_bytes(777, 4);

        let crc1 = Crc32::checksum(&buf1);
        let crc2 = Crc32::checksum(&buf2);
        let expected = Crc32::checksum(&[buf1, buf2.clone()].concat());

        assert_eq!(Crc32::combine(crc1, crc2, buf2.len() as u64), expected);
    }

    #[test]
    fn test_combine_with_empty_parts() {
        let data = random_bytes(300, 8);
        let crc = Crc32::checksum(&data);
        assert_eq!(Crc32::combine(crc, 0, 0), crc);
        assert_eq!(Crc32::combine(0, crc, data.len() as u64), crc);
    }

    #[test]
    fn test_from_value_resumes() {
        let mut crc = Crc32::new();
        crc.update(b"hello, ");
        let mut resumed = Crc32::from_value(crc.value());
        resumed.update(b"hello!");
        assert_eq!(resumed.value(), Crc32::checksum(b"hello, hello!"));
    }
}
