// SPDX-License-Identifier: MIT

//! CRC-8, polynomial 0x07, init 0x00, no reflection, no final xor.

pub const CRC8_POLY: u8 = 0x07;

const fn build_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u8;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ CRC8_POLY
            } else {
                crc << 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

static CRC8_TABLE: [u8; 256] = build_table();

/// Incremental CRC-8 over several slices.
#[derive(Debug, Clone, Copy, Default)]
pub struct Crc8 {
    crc: u8,
}

impl Crc8 {
    #[inline]
    pub fn new() -> Self {
        Self { crc: 0 }
    }

    #[inline]
    pub fn update(&mut self, data: &[u8]) {
        for &b in data {
            self.crc = CRC8_TABLE[(self.crc ^ b) as usize];
        }
    }

    #[inline]
    pub fn finalize(self) -> u8 {
        self.crc
    }
}

#[inline]
pub fn crc8(data: &[u8]) -> u8 {
    let mut h = Crc8::new();
    h.update(data);
    h.finalize()
}
