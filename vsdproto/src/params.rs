// SPDX-License-Identifier: MIT

use alloc::vec::Vec;

use crate::errors::*;
use vsdio::cursor::ByteCursor;
use vsdpart::bpb::{BPB_RECORD_SIZE, SyntheticBpb};

pub const IO_PARAMS_SIZE: usize = 7;

/// READ / WRITE parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IoParams {
    pub drive: u8,
    pub start_sector: u32,
    pub sector_count: u16,
}

impl IoParams {
    pub fn to_bytes(&self) -> [u8; IO_PARAMS_SIZE] {
        let mut out = [0u8; IO_PARAMS_SIZE];
        out[0] = self.drive;
        out[1..5].copy_from_slice(&self.start_sector.to_le_bytes());
        out[5..7].copy_from_slice(&self.sector_count.to_le_bytes());
        out
    }

    pub fn decode(params: &[u8]) -> ProtoResult<Self> {
        if params.len() != IO_PARAMS_SIZE {
            return Err(ProtoError::Malformed("I/O params must be 7 bytes"));
        }
        let mut cur = ByteCursor::new(params);
        Ok(Self {
            drive: cur.read_u8()?,
            start_sector: cur.read_u32_le()?,
            sector_count: cur.read_u16_le()?,
        })
    }
}

/// INIT response data: unit count then one BPB record per unit.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InitPayload {
    pub units: Vec<SyntheticBpb>,
}

impl InitPayload {
    pub fn to_bytes(&self) -> ProtoResult<Vec<u8>> {
        let count = u8::try_from(self.units.len())
            .map_err(|_| ProtoError::Malformed("More than 255 units"))?;
        let mut out = Vec::new();
        out.try_reserve_exact(1 + self.units.len() * BPB_RECORD_SIZE)
            .map_err(|_| ProtoError::Allocation)?;
        out.push(count);
        for bpb in &self.units {
            out.extend_from_slice(&bpb.to_bytes());
        }
        Ok(out)
    }

    pub fn decode(data: &[u8]) -> ProtoResult<Self> {
        let mut cur = ByteCursor::new(data);
        let count = cur.read_u8()? as usize;
        let mut units = Vec::with_capacity(count);
        for _ in 0..count {
            units.push(SyntheticBpb::decode(&mut cur)?);
        }
        Ok(Self { units })
    }

    #[inline]
    pub fn num_units(&self) -> usize {
        self.units.len()
    }
}
