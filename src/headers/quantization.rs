// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

use crate::BLOCK_SIZE;
use crate::error::{Error, Result};
use crate::headers::markers::Segment;

pub const NUM_QUANTIZATION_TABLES: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum QuantizationPrecision {
    Bits8 = 0,
    Bits16 = 1,
}

/// Quantizer step sizes in zig-zag order, as they appear in DQT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantizationTable {
    pub precision: QuantizationPrecision,
    pub values: [u16; BLOCK_SIZE],
}

/// Parses a DQT payload, which may define several tables.
pub fn parse_dqt(data: &[u8]) -> Result<Vec<(usize, QuantizationTable)>> {
    let mut segment = Segment::new("DQT", data);
    let mut tables = Vec::new();
    while !segment.is_empty() {
        let (pq, tq) = segment.nibbles()?;
        let precision = QuantizationPrecision::from_u8(pq)
            .ok_or_else(|| Error::InvalidEnum(pq as u32, "QuantizationPrecision".to_string()))?;
        if tq as usize >= NUM_QUANTIZATION_TABLES {
            return Err(Error::InvalidTableId("quantization", tq));
        }
        let mut values = [0u16; BLOCK_SIZE];
        for value in values.iter_mut() {
            *value = match precision {
                QuantizationPrecision::Bits8 => segment.u8()? as u16,
                QuantizationPrecision::Bits16 => segment.u16()?,
            };
        }
        tables.push((tq as usize, QuantizationTable { precision, values }));
    }
    if tables.is_empty() {
        return Err(Error::InvalidMarkerSegment("DQT"));
    }
    Ok(tables)
}

#[cfg(test)]
mod test {
    use test_log::test;

    use super::*;

    #[test]
    fn parses_mixed_precision_tables() {
        let mut data = vec![0x00];
        data.extend((1..=64).map(|v| v as u8));
        data.push(0x13);
        for v in 0..64u16 {
            data.extend_from_slice(&(v * 300).to_be_bytes());
        }
        let tables = parse_dqt(&data).unwrap();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].0, 0);
        assert_eq!(tables[0].1.precision, QuantizationPrecision::Bits8);
        assert_eq!(tables[0].1.values[63], 64);
        assert_eq!(tables[1].0, 3);
        assert_eq!(tables[1].1.precision, QuantizationPrecision::Bits16);
        assert_eq!(tables[1].1.values[2], 600);
    }

    #[test]
    fn rejects_invalid_tables() {
        assert!(matches!(
            parse_dqt(&[0x04]),
            Err(Error::InvalidTableId("quantization", 4))
        ));
        assert!(matches!(parse_dqt(&[0x20]), Err(Error::InvalidEnum(2, _))));
        assert!(matches!(
            parse_dqt(&[0x00, 1, 2, 3]),
            Err(Error::InvalidMarkerSegment("DQT"))
        ));
        assert!(matches!(
            parse_dqt(&[]),
            Err(Error::InvalidMarkerSegment("DQT"))
        ));
    }
}
