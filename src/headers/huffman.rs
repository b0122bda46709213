// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use num_traits::FromPrimitive;

use crate::entropy_coding::huffman::{HuffmanTable, MAX_CODE_LENGTH, MAX_CODES};
use crate::entropy_coding::scan::{HuffmanTableClass, NUM_HUFFMAN_SLOTS};
use crate::error::{Error, Result};
use crate::headers::markers::Segment;

/// One table of a DHT segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HuffmanSpec {
    pub class: HuffmanTableClass,
    pub id: usize,
    /// Number of codes of each length from 1 to 16.
    pub counts: [u8; MAX_CODE_LENGTH],
    pub symbols: Vec<u8>,
}

impl HuffmanSpec {
    pub fn build(&self) -> Result<HuffmanTable> {
        HuffmanTable::build(&self.counts, &self.symbols)
    }
}

/// Parses a DHT payload, which may define several tables.
pub fn parse_dht(data: &[u8]) -> Result<Vec<HuffmanSpec>> {
    let mut segment = Segment::new("DHT", data);
    let mut specs = Vec::new();
    while !segment.is_empty() {
        let (tc, th) = segment.nibbles()?;
        let class = HuffmanTableClass::from_u8(tc)
            .ok_or_else(|| Error::InvalidEnum(tc as u32, "HuffmanTableClass".to_string()))?;
        if th as usize >= NUM_HUFFMAN_SLOTS {
            return Err(Error::InvalidTableId(class.name(), th));
        }
        let mut counts = [0u8; MAX_CODE_LENGTH];
        for count in counts.iter_mut() {
            *count = segment.u8()?;
        }
        let total: usize = counts.iter().map(|&c| c as usize).sum();
        if total > MAX_CODES {
            return Err(Error::TooManyHuffmanCodes(total));
        }
        let symbols = segment.bytes(total)?.to_vec();
        specs.push(HuffmanSpec {
            class,
            id: th as usize,
            counts,
            symbols,
        });
    }
    if specs.is_empty() {
        return Err(Error::InvalidMarkerSegment("DHT"));
    }
    Ok(specs)
}

#[cfg(test)]
mod test {
    use test_log::test;

    use super::*;

    #[test]
    fn parses_two_tables() {
        let mut data = vec![0x00, 0, 1, 5, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0];
        data.extend(0..12u8);
        data.extend_from_slice(&[0x11, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        data.extend_from_slice(&[0x00, 0xf0]);
        let specs = parse_dht(&data).unwrap();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].class, HuffmanTableClass::Dc);
        assert_eq!(specs[0].id, 0);
        assert_eq!(specs[0].symbols.len(), 12);
        assert_eq!(specs[0].build().unwrap().num_codes(), 12);
        assert_eq!(specs[1].class, HuffmanTableClass::Ac);
        assert_eq!(specs[1].id, 1);
        assert_eq!(specs[1].symbols, [0x00, 0xf0]);
    }

    #[test]
    fn rejects_invalid_tables() {
        let mut data = vec![0x24];
        data.extend_from_slice(&[0; 16]);
        assert!(matches!(parse_dht(&data), Err(Error::InvalidEnum(2, _))));
        data[0] = 0x04;
        assert!(matches!(
            parse_dht(&data),
            Err(Error::InvalidTableId("DC", 4))
        ));
        let mut short = vec![0x00, 2];
        short.extend_from_slice(&[0; 15]);
        short.push(7);
        assert!(matches!(
            parse_dht(&short),
            Err(Error::InvalidMarkerSegment("DHT"))
        ));
    }
}
