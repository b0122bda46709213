// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use crate::bit_cursor::BitCursor;
use crate::error::{Error, Result};
use crate::util::{CeilLog2, tracing_wrappers::*};

pub const MAX_CODE_LENGTH: usize = 16;
pub const MAX_CODES: usize = 256;
pub const DEFAULT_ARY: usize = 16;

const ROOT: usize = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Empty,
    Node(u32),
    Leaf(u32),
}

#[derive(Debug, Clone, Copy)]
struct Leaf {
    symbol: u8,
    code_length: u8,
}

/// A decoding tree for one canonical Huffman code.
///
/// Every node has `ary` slots and consumes `log2(ary)` bits. A code whose
/// length is not a multiple of `log2(ary)` ends in several slots of its last
/// node, all pointing to the same leaf, so decoding always fetches whole
/// levels and returns the bits it read past the end of the code.
#[derive(Debug, Clone)]
pub struct HuffmanTable {
    bits_per_level: usize,
    // Node `i` owns `slots[i * ary..(i + 1) * ary]`.
    slots: Vec<Slot>,
    leaves: Vec<Leaf>,
}

impl HuffmanTable {
    /// Creates a table with no codes.
    pub fn new(ary: usize) -> Result<HuffmanTable> {
        if !ary.is_power_of_two() || !(2..=256).contains(&ary) {
            return Err(Error::InvalidHuffmanArity(ary));
        }
        Ok(HuffmanTable {
            bits_per_level: ary.ceil_log2(),
            slots: vec![Slot::Empty; ary],
            leaves: Vec::new(),
        })
    }

    /// Builds the table described by a DHT segment with the default arity.
    ///
    /// `counts[i]` is the number of codes of length `i + 1`; `symbols` lists
    /// the symbols by increasing code length.
    pub fn build(counts: &[u8; MAX_CODE_LENGTH], symbols: &[u8]) -> Result<HuffmanTable> {
        Self::build_with_ary(counts, symbols, DEFAULT_ARY)
    }

    pub fn build_with_ary(
        counts: &[u8; MAX_CODE_LENGTH],
        symbols: &[u8],
        ary: usize,
    ) -> Result<HuffmanTable> {
        let counted: usize = counts.iter().map(|&c| c as usize).sum();
        if counted > MAX_CODES {
            return Err(Error::TooManyHuffmanCodes(counted));
        }
        if counted != symbols.len() {
            return Err(Error::HuffmanSymbolCountMismatch {
                counted,
                symbols: symbols.len(),
            });
        }
        let mut table = HuffmanTable::new(ary)?;
        let mut symbols = symbols.iter();
        // Codes of one length are consecutive; moving to the next length
        // appends a zero bit.
        let mut code = 0u32;
        for (length, &count) in (1..=MAX_CODE_LENGTH).zip(counts.iter()) {
            let count = count as usize;
            if code as usize + count > 1 << length {
                return Err(Error::InvalidHuffmanHistogram { length, count });
            }
            for symbol in symbols.by_ref().take(count) {
                table.add_code(code as u16, length as u8, *symbol)?;
                code += 1;
            }
            code <<= 1;
        }
        debug!(
            "built Huffman table: {} codes, ary {}, {} nodes",
            counted,
            ary,
            table.num_nodes()
        );
        Ok(table)
    }

    fn ary(&self) -> usize {
        1 << self.bits_per_level
    }

    pub fn num_nodes(&self) -> usize {
        self.slots.len() >> self.bits_per_level
    }

    pub fn num_codes(&self) -> usize {
        self.leaves.len()
    }

    fn slot_index(&self, node: usize, child: usize) -> usize {
        node * self.ary() + child
    }

    fn push_node(&mut self) -> u32 {
        let id = self.num_nodes() as u32;
        self.slots.extend(std::iter::repeat_n(Slot::Empty, self.ary()));
        id
    }

    /// Inserts the `length`-bit codeword `code` (MSB first) for `symbol`.
    pub fn add_code(&mut self, code: u16, length: u8, symbol: u8) -> Result<()> {
        let len = length as usize;
        if len == 0 || len > MAX_CODE_LENGTH || (code as u32) >> len != 0 {
            return Err(Error::InvalidHuffmanCodeLength(length));
        }
        let collision = Error::HuffmanCodewordCollision { code, length };
        let step = self.bits_per_level;
        let mut node = ROOT;
        let mut pos = 0;
        while len - pos > step {
            let child = ((code as usize) >> (len - pos - step)) & (self.ary() - 1);
            let index = self.slot_index(node, child);
            node = match self.slots[index] {
                Slot::Node(next) => next as usize,
                Slot::Empty => {
                    let next = self.push_node();
                    self.slots[index] = Slot::Node(next);
                    next as usize
                }
                Slot::Leaf(_) => return Err(collision),
            };
            pos += step;
        }
        // The remaining bits select a contiguous range of children: the code
        // bits padded with every possible suffix.
        let rest = len - pos;
        let low = ((code as usize) & ((1 << rest) - 1)) << (step - rest);
        let high = low | ((1 << (step - rest)) - 1);
        let first = self.slot_index(node, low);
        let last = self.slot_index(node, high);
        if self.slots[first..=last].iter().any(|s| *s != Slot::Empty) {
            return Err(collision);
        }
        let leaf = self.leaves.len() as u32;
        self.leaves.push(Leaf {
            symbol,
            code_length: length,
        });
        self.slots[first..=last].fill(Slot::Leaf(leaf));
        Ok(())
    }

    /// Decodes one symbol at the cursor's read position.
    ///
    /// On success the cursor is left right after the codeword. On failure its
    /// position is unchanged; the error is [`Error::OutOfBounds`] if the
    /// written bits end before a full codeword, and
    /// [`Error::HuffmanCodeNotFound`] if the bits match no codeword.
    pub fn decode(&self, cursor: &mut BitCursor) -> Result<u8> {
        let available = cursor.remaining_bits();
        let step = self.bits_per_level;
        let mut consumed = 0;
        let mut node = ROOT;
        loop {
            if consumed >= available {
                cursor.back_bits(consumed)?;
                return Err(Error::OutOfBounds);
            }
            let child = cursor.next_bits_padded(step)? as usize;
            consumed += step;
            match self.slots[self.slot_index(node, child)] {
                Slot::Node(next) => node = next as usize,
                Slot::Leaf(leaf) => {
                    let leaf = self.leaves[leaf as usize];
                    let length = leaf.code_length as usize;
                    debug_assert!(consumed >= length && consumed - length < step);
                    if length > available {
                        cursor.back_bits(consumed)?;
                        return Err(Error::OutOfBounds);
                    }
                    cursor.back_bits(consumed - length)?;
                    return Ok(leaf.symbol);
                }
                Slot::Empty => {
                    cursor.back_bits(consumed)?;
                    return Err(if consumed > available {
                        Error::OutOfBounds
                    } else {
                        Error::HuffmanCodeNotFound
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use test_log::test;

    use super::*;
    use crate::util::test::{BitWriter, bit_cursor_from_str};

    // ITU-T T.81 Table K.3, luminance DC.
    const LUMA_DC_COUNTS: [u8; 16] = [0, 1, 5, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0];
    const LUMA_DC_SYMBOLS: [u8; 12] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11];

    fn decode_str(table: &HuffmanTable, bits: &str) -> Result<u8> {
        table.decode(&mut bit_cursor_from_str(bits))
    }

    fn counts_from(lengths: &[(usize, u8)]) -> [u8; 16] {
        let mut counts = [0u8; 16];
        for &(length, count) in lengths {
            counts[length - 1] = count;
        }
        counts
    }

    #[test]
    fn canonical_assignment_of_mixed_lengths() {
        let counts = counts_from(&[(2, 1), (3, 1)]);
        let table = HuffmanTable::build_with_ary(&counts, b"AB", 8).unwrap();
        let mut cursor = bit_cursor_from_str("00010000");
        assert_eq!(table.decode(&mut cursor).unwrap(), b'A');
        assert_eq!(cursor.position(), 2);
        assert_eq!(table.decode(&mut cursor).unwrap(), b'B');
        assert_eq!(cursor.position(), 5);
        assert!(matches!(
            decode_str(&table, "01100000"),
            Err(Error::HuffmanCodeNotFound)
        ));
    }

    #[test]
    fn explicit_codes_fan_out_over_short_suffixes() {
        let mut table = HuffmanTable::new(4).unwrap();
        table.add_code(0b01, 2, 56).unwrap();
        table.add_code(0b100, 3, 12).unwrap();
        table.add_code(0b1111_1111, 8, 34).unwrap();
        for bits in ["10000000", "10010000"] {
            assert_eq!(decode_str(&table, bits).unwrap(), 12);
        }
        for bits in ["01000000", "01100000", "01110000"] {
            assert_eq!(decode_str(&table, bits).unwrap(), 56);
        }
        assert_eq!(decode_str(&table, "11111111").unwrap(), 34);
        assert!(matches!(
            decode_str(&table, "00000000"),
            Err(Error::HuffmanCodeNotFound)
        ));
    }

    #[test]
    fn rejects_collisions() {
        let mut table = HuffmanTable::new(4).unwrap();
        table.add_code(0b010, 3, 1).unwrap();
        assert!(matches!(
            table.add_code(0b01, 2, 2),
            Err(Error::HuffmanCodewordCollision { .. })
        ));
        assert!(matches!(
            table.add_code(0b0101, 4, 2),
            Err(Error::HuffmanCodewordCollision { .. })
        ));
        table.add_code(0b011, 3, 3).unwrap();
        assert_eq!(table.num_codes(), 2);
    }

    #[test]
    fn rejects_invalid_histograms() {
        let too_many_short = counts_from(&[(1, 3)]);
        assert!(matches!(
            HuffmanTable::build(&too_many_short, &[0, 1, 2]),
            Err(Error::InvalidHuffmanHistogram {
                length: 1,
                count: 3
            })
        ));
        let oversubscribed = counts_from(&[(1, 1), (2, 3)]);
        assert!(matches!(
            HuffmanTable::build(&oversubscribed, &[0, 1, 2, 3]),
            Err(Error::InvalidHuffmanHistogram { length: 2, .. })
        ));
        let counts = counts_from(&[(2, 2)]);
        assert!(matches!(
            HuffmanTable::build(&counts, &[0]),
            Err(Error::HuffmanSymbolCountMismatch {
                counted: 2,
                symbols: 1
            })
        ));
        let huge = counts_from(&[(16, 255), (15, 2)]);
        assert!(matches!(
            HuffmanTable::build(&huge, &[0; 257]),
            Err(Error::TooManyHuffmanCodes(257))
        ));
        assert!(matches!(
            HuffmanTable::new(3),
            Err(Error::InvalidHuffmanArity(3))
        ));
        assert!(matches!(
            HuffmanTable::new(512),
            Err(Error::InvalidHuffmanArity(512))
        ));
    }

    #[test]
    fn truncated_codeword_is_out_of_bounds() {
        let table = HuffmanTable::build(&LUMA_DC_COUNTS, &LUMA_DC_SYMBOLS).unwrap();
        // Symbol 11 is the 9-bit code 111111110.
        let mut cursor = BitCursor::from_bytes(&[0xff]).unwrap();
        assert!(matches!(table.decode(&mut cursor), Err(Error::OutOfBounds)));
        assert_eq!(cursor.position(), 0);
        let mut empty = BitCursor::new(0);
        assert!(matches!(table.decode(&mut empty), Err(Error::OutOfBounds)));
    }

    #[test]
    fn codeword_ending_at_write_end_decodes() {
        let table = HuffmanTable::build_with_ary(&LUMA_DC_COUNTS, &LUMA_DC_SYMBOLS, 256).unwrap();
        // 111110 is symbol 8; the last level reads two bits past the data.
        let mut cursor = BitCursor::from_bytes(&[0b0011_1110]).unwrap();
        cursor.skip_bits(2).unwrap();
        assert_eq!(table.decode(&mut cursor).unwrap(), 8);
        assert!(cursor.eof());
        assert_eq!(cursor.remaining_bits(), 0);
    }

    fn check_agrees_with_encoder(ary: usize) {
        arbtest::arbtest(|u| {
            // Draw a random complete-enough code by limiting each length to the
            // space left over by the shorter ones.
            let mut counts = [0u8; 16];
            let mut space = 1u32;
            let mut total = 0usize;
            for (i, count) in counts.iter_mut().enumerate() {
                space <<= 1;
                let max = space.min(256 - total as u32).min(255);
                let take = if i == 15 { max } else { u.int_in_range(0..=max)? };
                *count = take as u8;
                space -= take;
                total += take as usize;
            }
            if total == 0 {
                return Ok(());
            }
            let symbols: Vec<u8> = (0..total).map(|s| s as u8).collect();
            let table = HuffmanTable::build_with_ary(&counts, &symbols, ary).unwrap();
            let codes = BitWriter::canonical_codes(&counts, &symbols);
            let message: Vec<u8> = (0..u.int_in_range(1..=64)?)
                .map(|_| u.choose(&symbols).copied())
                .collect::<arbtest::arbitrary::Result<_>>()?;
            let mut writer = BitWriter::new();
            for symbol in &message {
                let (code, length) = codes[*symbol as usize];
                writer.write_bits(code as u32, length);
            }
            let mut cursor = BitCursor::from_bytes(&writer.finish_unstuffed()).unwrap();
            for symbol in &message {
                assert_eq!(table.decode(&mut cursor).unwrap(), *symbol);
            }
            Ok(())
        });
    }

    macro_rules! ary_tests {
        ($($ary:literal),*) => {
            paste::paste! {
                $(
                    #[test]
                    fn [<decode_matches_encoder_ary_ $ary>]() {
                        check_agrees_with_encoder($ary);
                    }
                )*
            }
        };
    }

    ary_tests!(2, 4, 16, 256);
}
