use std::sync::OnceLock;

/// Reflected CRC-32 polynomial shared by zlib and PNG.
pub const CRC32_POLYNOMIAL: u32 = 0xEDB8_8320;

const ADLER_MODULUS: u32 = 65_521;

static CRC_TABLE: OnceLock<[u32; 256]> = OnceLock::new();

fn build_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    for (n, entry) in table.iter_mut().enumerate() {
        let mut c = n as u32;
        for _ in 0..8 {
            c = if c & 1 == 1 {
                CRC32_POLYNOMIAL ^ (c >> 1)
            } else {
                c >> 1
            };
        }
        *entry = c;
    }
    table
}

/// The 256-entry lookup table, built on first use and shared read-only
/// for the rest of the process.
pub fn crc_table() -> &'static [u32; 256] {
    CRC_TABLE.get_or_init(build_table)
}

/// Running CRC-32 over one or more byte slices.
///
/// Chunk checksums cover `type || payload`; feeding the two slices through
/// `update` avoids concatenating them first.
#[derive(Debug, Clone, Copy)]
pub struct Crc32 {
    state: u32,
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}

impl Crc32 {
    pub fn new() -> Self {
        Self { state: 0xFFFF_FFFF }
    }

    pub fn update(&mut self, bytes: &[u8]) {
        let table = crc_table();
        let mut c = self.state;
        for &b in bytes {
            c = table[((c ^ b as u32) & 0xFF) as usize] ^ (c >> 8);
        }
        self.state = c;
    }

    pub fn finalize(self) -> u32 {
        self.state ^ 0xFFFF_FFFF
    }
}

/// One-shot CRC-32, byte-for-byte identical to zlib's `crc32`.
pub fn crc32(bytes: &[u8]) -> u32 {
    let mut hasher = Crc32::new();
    hasher.update(bytes);
    hasher.finalize()
}

/// Adler-32 of `bytes`, the checksum a zlib stream carries in its trailer.
pub fn adler32(bytes: &[u8]) -> u32 {
    // 5552 is the largest run that cannot overflow `b` before reduction.
    let (mut a, mut b) = (1u32, 0u32);
    for run in bytes.chunks(5552) {
        for &byte in run {
            a += byte as u32;
            b += a;
        }
        a %= ADLER_MODULUS;
        b %= ADLER_MODULUS;
    }
    (b << 16) | a
}
