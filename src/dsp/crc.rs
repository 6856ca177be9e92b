// CRC-32 (reflected IEEE polynomial) for frame integrity checking

const CRC32_POLYNOMIAL: u32 = 0xEDB8_8320;

/// Calculate the CRC-32 checksum of the given bytes
pub fn crc32(data: &[u8]) -> u32 {
    let mut crc: u32 = 0xFFFF_FFFF;

    for &byte in data {
        crc ^= byte as u32;
        for _ in 0..8 {
            if (crc & 1) != 0 {
                crc = (crc >> 1) ^ CRC32_POLYNOMIAL;
            } else {
                crc >>= 1;
            }
        }
    }

    !crc
}

/// Verify a CRC-32 checksum
pub fn verify_crc32(data: &[u8], expected: u32) -> bool {
    crc32(data) == expected
}
