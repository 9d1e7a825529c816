/// CRC32 implementation for MPEG-2 TS PSI tables
/// Based on ITU-T H.222.0 / ISO/IEC 13818-1 Annex A
/// Polynomial: x32 + x26 + x23 + x22 + x16 + x12 + x11 + x10 + x8 + x7 + x5 + x4 + x2 + x + 1
/// Initial value: 0xFFFFFFFF, no reflection, no final XOR

const CRC32_MPEG2: u32 = 0x04C11DB7;

const CRC32_TABLE: [u32; 256] = {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = (i as u32) << 24;
        let mut j = 0;
        while j < 8 {
            crc = if (crc & 0x80000000) != 0 {
                (crc << 1) ^ CRC32_MPEG2
            } else {
                crc << 1
            };
            j += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
};

/// MPEG-2 CRC32 calculator used for PAT/PMT sections.
///
/// The lookup table is built at compile time, so the type carries no state and
/// all methods are associated functions.
pub struct Crc32Mpeg2;

impl Crc32Mpeg2 {
    /// Calculates the CRC32 checksum for the given data using the MPEG-2 algorithm
    ///
    /// # Examples
    ///
    /// ```
    /// use tsmux::utils::Crc32Mpeg2;
    ///
    /// assert_eq!(Crc32Mpeg2::calculate(b"123456789"), 0x0376E6E7);
    /// ```
    pub fn calculate(data: &[u8]) -> u32 {
        let mut crc = 0xFFFFFFFF;
        for &byte in data {
            let index = ((crc >> 24) ^ (byte as u32)) & 0xFF;
            crc = (crc << 8) ^ CRC32_TABLE[index as usize];
        }
        crc
    }

    /// Checks a complete section whose last four bytes are its big-endian CRC.
    ///
    /// Running the CRC over the section including its own checksum yields zero
    /// when the section is intact.
    pub fn verify(section: &[u8]) -> bool {
        section.len() >= 4 && Self::calculate(section) == 0
    }
}
