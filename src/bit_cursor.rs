// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use std::fmt::Debug;

use crate::error::{Error, Result};
use byteorder::{BigEndian, ByteOrder};

/// Zeroed bytes kept past the capacity so that word loads at the write end stay in bounds.
const TAIL_PADDING: usize = 4;

pub const MAX_BITS_PER_CALL: usize = 25;

/// A growable byte buffer that is read MSB-first at bit granularity.
///
/// Bytes are appended at the write end and consumed from the read position,
/// which is kept as a byte offset plus a bit offset in `0..8`. When the buffer
/// has to grow or runs out of room, only the unread tail is kept.
#[derive(Clone)]
pub struct BitCursor {
    buf: Vec<u8>,
    capacity: usize,
    write_end: usize,
    byte_pos: usize,
    bit_pos: usize,
}

impl Debug for BitCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "BitCursor{{ capacity: {}, write_end: {}, position: {}.{} }}",
            self.capacity, self.write_end, self.byte_pos, self.bit_pos
        )
    }
}

impl BitCursor {
    /// Creates an empty cursor able to hold `capacity` bytes before growing.
    pub fn new(capacity: usize) -> BitCursor {
        BitCursor {
            buf: vec![0; capacity + TAIL_PADDING],
            capacity,
            write_end: 0,
            byte_pos: 0,
            bit_pos: 0,
        }
    }

    /// Creates a cursor holding a copy of `data`, positioned at its first bit.
    /// ```
    /// # use jpeg_baseline::bit_cursor::BitCursor;
    /// let mut cursor = BitCursor::from_bytes(&[0b1010_0101])?;
    /// assert_eq!(cursor.next_bits(3)?, 0b101);
    /// assert_eq!(cursor.next_bits(5)?, 0b00101);
    /// assert!(cursor.eof());
    /// # Ok::<(), jpeg_baseline::error::Error>(())
    /// ```
    pub fn from_bytes(data: &[u8]) -> Result<BitCursor> {
        let mut cursor = BitCursor::new(data.len());
        cursor.append(data)?;
        Ok(cursor)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of unread bytes, counting a partially read byte as unread.
    pub fn len(&self) -> usize {
        self.write_end.saturating_sub(self.byte_pos)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of bits between the read position and the write end.
    pub fn remaining_bits(&self) -> usize {
        (self.write_end * 8).saturating_sub(self.position())
    }

    /// Read position in bits from the start of the buffer.
    pub fn position(&self) -> usize {
        self.byte_pos * 8 + self.bit_pos
    }

    pub fn byte_position(&self) -> usize {
        self.byte_pos
    }

    pub fn bit_offset(&self) -> usize {
        self.bit_pos
    }

    pub fn is_byte_aligned(&self) -> bool {
        self.bit_pos == 0
    }

    /// Returns true once the read position has reached the write end.
    pub fn eof(&self) -> bool {
        self.byte_pos >= self.write_end
    }

    pub fn rewind(&mut self) {
        self.byte_pos = 0;
        self.bit_pos = 0;
    }

    /// Drops all buffered data. The allocation is kept.
    pub fn clear(&mut self) {
        self.write_end = 0;
        self.rewind();
    }

    /// Snaps a read position past the write end back onto it and returns the
    /// number of unread bytes.
    fn fix_position(&mut self) -> usize {
        if self.byte_pos >= self.write_end {
            self.byte_pos = self.write_end;
            self.bit_pos = 0;
        }
        self.write_end - self.byte_pos
    }

    /// Reallocates the buffer to `new_capacity` bytes, keeping only the unread
    /// tail. Returns `false` if the tail would not fit.
    pub fn reserve(&mut self, new_capacity: usize) -> Result<bool> {
        let unread = self.fix_position();
        if new_capacity < unread {
            return Ok(false);
        }
        let mut buf = Vec::new();
        buf.try_reserve_exact(new_capacity + TAIL_PADDING)?;
        buf.extend_from_slice(&self.buf[self.byte_pos..self.write_end]);
        buf.resize(new_capacity + TAIL_PADDING, 0);
        self.buf = buf;
        self.capacity = new_capacity;
        self.write_end = unread;
        self.byte_pos = 0;
        Ok(true)
    }

    /// Moves the unread tail to the front of the buffer. The bit offset inside
    /// the first unread byte is preserved.
    pub fn trim(&mut self) {
        if self.byte_pos == 0 {
            return;
        }
        if self.eof() {
            self.clear();
            return;
        }
        self.buf.copy_within(self.byte_pos..self.write_end, 0);
        self.write_end -= self.byte_pos;
        self.byte_pos = 0;
    }

    /// Shrinks the allocation to the unread tail.
    pub fn shrink_to_fit(&mut self) -> Result<()> {
        let unread = self.fix_position();
        self.reserve(unread)?;
        Ok(())
    }

    /// Copies `data` to the write end, growing or compacting the buffer first
    /// if needed. Fails only if the allocation fails.
    pub fn append(&mut self, data: &[u8]) -> Result<usize> {
        if data.is_empty() {
            return Ok(0);
        }
        let min_size = self.fix_position() + data.len();
        if min_size > self.capacity {
            self.reserve(min_size.max(self.capacity * 2))?;
        }
        if self.write_end + data.len() > self.capacity {
            self.trim();
        }
        debug_assert!(self.write_end + data.len() <= self.capacity);
        self.buf[self.write_end..self.write_end + data.len()].copy_from_slice(data);
        self.write_end += data.len();
        Ok(data.len())
    }

    /// Loads `num` bits at the read position without bounds checks against the
    /// write end. The caller must guarantee `byte_pos <= capacity`.
    fn front_bits(&self, num: usize) -> u32 {
        debug_assert!((1..=MAX_BITS_PER_CALL).contains(&num));
        let data = &self.buf[self.byte_pos..];
        let bit = self.bit_pos;
        if num <= 9 {
            let word = BigEndian::read_u16(data) as u32;
            (word & ((1 << (16 - bit)) - 1)) >> (16 - bit - num)
        } else if num <= 17 {
            let word = BigEndian::read_u24(data);
            (word & ((1 << (24 - bit)) - 1)) >> (24 - bit - num)
        } else {
            let word = BigEndian::read_u32(data) as u64;
            ((word & ((1u64 << (32 - bit)) - 1)) >> (32 - bit - num)) as u32
        }
    }

    /// Reads the next `num` bits (1 to 25) MSB-first.
    /// ```
    /// # use jpeg_baseline::bit_cursor::BitCursor;
    /// let mut cursor = BitCursor::from_bytes(&[0x12, 0x34, 0x56, 0x78])?;
    /// assert_eq!(cursor.next_bits(4)?, 0x1);
    /// assert_eq!(cursor.next_bits(24)?, 0x234567);
    /// assert_eq!(cursor.remaining_bits(), 4);
    /// assert!(cursor.next_bits(5).is_err());
    /// # Ok::<(), jpeg_baseline::error::Error>(())
    /// ```
    pub fn next_bits(&mut self, num: usize) -> Result<u32> {
        if num == 0 || num > MAX_BITS_PER_CALL || num > self.remaining_bits() {
            return Err(Error::OutOfBounds);
        }
        let ret = self.front_bits(num);
        self.advance(num);
        Ok(ret)
    }

    /// Reads the next `num` bits, treating bits past the write end as zeros.
    /// At least one bit must be available. Callers check how many of the
    /// returned bits were real with [`BitCursor::remaining_bits`] beforehand.
    pub(crate) fn next_bits_padded(&mut self, num: usize) -> Result<u32> {
        let available = self.remaining_bits();
        if num == 0 || num > MAX_BITS_PER_CALL || available == 0 {
            return Err(Error::OutOfBounds);
        }
        let mut ret = self.front_bits(num);
        if num > available {
            ret &= !((1u32 << (num - available)) - 1);
        }
        self.advance(num);
        Ok(ret)
    }

    pub fn next_bit(&mut self) -> Result<bool> {
        Ok(self.next_bits(1)? != 0)
    }

    /// Reads 8 bits, which need not be byte aligned.
    pub fn next_byte(&mut self) -> Result<u8> {
        Ok(self.next_bits(8)? as u8)
    }

    fn advance(&mut self, num: usize) {
        self.byte_pos += (num + self.bit_pos) >> 3;
        self.bit_pos = (self.bit_pos + num) & 7;
    }

    /// Skips `num` bits.
    pub fn skip_bits(&mut self, num: usize) -> Result<()> {
        if num > self.remaining_bits() {
            return Err(Error::OutOfBounds);
        }
        self.advance(num);
        Ok(())
    }

    /// Moves the read position back by `num` bits, borrowing from the byte
    /// offset when the bit offset would go negative.
    /// ```
    /// # use jpeg_baseline::bit_cursor::BitCursor;
    /// let mut cursor = BitCursor::from_bytes(&[0xf0, 0x0f])?;
    /// assert_eq!(cursor.next_bits(10)?, 0b11_1100_0000);
    /// cursor.back_bits(5)?;
    /// assert_eq!(cursor.position(), 5);
    /// assert_eq!(cursor.next_bits(11)?, 0b000_0000_1111);
    /// # Ok::<(), jpeg_baseline::error::Error>(())
    /// ```
    pub fn back_bits(&mut self, num: usize) -> Result<()> {
        let position = self.position().checked_sub(num).ok_or(Error::OutOfBounds)?;
        self.byte_pos = position / 8;
        self.bit_pos = position % 8;
        Ok(())
    }

    /// Skips to the next byte boundary, discarding the rest of a partially
    /// read byte.
    pub fn jump_to_byte_boundary(&mut self) {
        if self.bit_pos != 0 {
            self.bit_pos = 0;
            self.byte_pos += 1;
        }
    }
}

#[cfg(test)]
mod test {
    use rand::{Rng, SeedableRng};
    use rand_xorshift::XorShiftRng;
    use test_log::test;

    use super::*;

    #[test]
    fn read_basic_bits() {
        let mut cursor = BitCursor::from_bytes(&[0xa5]).unwrap();
        assert_eq!(cursor.next_bits(4).unwrap(), 0b1010);
        assert!(!cursor.eof());
        assert_eq!(cursor.next_bits(4).unwrap(), 0b0101);
        assert!(cursor.eof());
        assert!(matches!(cursor.next_bits(1), Err(Error::OutOfBounds)));
    }

    #[test]
    fn read_widest_word_at_last_bit_offset() {
        let mut cursor = BitCursor::from_bytes(&[0x01, 0xff, 0x00, 0xff, 0x80]).unwrap();
        cursor.skip_bits(7).unwrap();
        assert_eq!(cursor.next_bits(25).unwrap(), 0b1_1111_1111_0000_0000_1111_1111);
        assert_eq!(cursor.next_bits(1).unwrap(), 1);
        assert_eq!(cursor.remaining_bits(), 7);
    }

    #[test]
    fn next_bits_rejects_invalid_widths() {
        let mut cursor = BitCursor::from_bytes(&[0; 8]).unwrap();
        assert!(cursor.next_bits(0).is_err());
        assert!(cursor.next_bits(26).is_err());
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn back_bits_borrows_across_bytes() {
        let mut cursor = BitCursor::from_bytes(&[0x00, 0xff, 0x00]).unwrap();
        cursor.skip_bits(9).unwrap();
        assert_eq!((cursor.byte_position(), cursor.bit_offset()), (1, 1));
        cursor.back_bits(3).unwrap();
        assert_eq!((cursor.byte_position(), cursor.bit_offset()), (0, 6));
        assert_eq!(cursor.next_bits(4).unwrap(), 0b0011);
        assert!(cursor.back_bits(11).is_err());
    }

    #[test]
    fn padded_read_zeroes_missing_bits() {
        let mut cursor = BitCursor::from_bytes(&[0xff]).unwrap();
        cursor.skip_bits(6).unwrap();
        assert_eq!(cursor.next_bits_padded(4).unwrap(), 0b1100);
        cursor.back_bits(2).unwrap();
        assert_eq!(cursor.remaining_bits(), 0);
        assert!(cursor.next_bits_padded(1).is_err());
    }

    #[test]
    fn jump_to_byte_boundary() {
        let mut cursor = BitCursor::from_bytes(&[0xff, 0x80]).unwrap();
        cursor.jump_to_byte_boundary();
        assert_eq!(cursor.position(), 0);
        cursor.skip_bits(3).unwrap();
        cursor.jump_to_byte_boundary();
        assert_eq!(cursor.position(), 8);
        assert!(cursor.next_bit().unwrap());
    }

    #[test]
    fn append_grows_and_keeps_unread_tail() {
        let mut cursor = BitCursor::new(2);
        cursor.append(&[0xab, 0xcd]).unwrap();
        assert_eq!(cursor.next_bits(12).unwrap(), 0xabc);
        cursor.append(&[0xef, 0x01, 0x23]).unwrap();
        assert_eq!(cursor.byte_position(), 0);
        assert_eq!(cursor.bit_offset(), 4);
        assert!(cursor.capacity() >= 4);
        assert_eq!(cursor.next_bits(20).unwrap(), 0xdef01);
        assert_eq!(cursor.next_bits(8).unwrap(), 0x23);
        assert!(cursor.eof());
    }

    #[test]
    fn append_compacts_before_growing() {
        let mut cursor = BitCursor::new(4);
        cursor.append(&[1, 2, 3, 4]).unwrap();
        cursor.skip_bits(24).unwrap();
        cursor.append(&[5, 6]).unwrap();
        assert_eq!(cursor.capacity(), 4);
        assert_eq!(cursor.len(), 3);
        assert_eq!(cursor.next_byte().unwrap(), 4);
        assert_eq!(cursor.next_bits(16).unwrap(), 0x0506);
    }

    #[test]
    fn reserve_refuses_to_drop_data() {
        let mut cursor = BitCursor::from_bytes(&[1, 2, 3]).unwrap();
        assert!(!cursor.reserve(2).unwrap());
        cursor.skip_bits(8).unwrap();
        assert!(cursor.reserve(2).unwrap());
        assert_eq!(cursor.next_bits(16).unwrap(), 0x0203);
        cursor.shrink_to_fit().unwrap();
        assert_eq!(cursor.capacity(), 0);
    }

    #[test]
    fn split_reads_reconstruct_input() {
        arbtest::arbtest(|u| {
            let data: Vec<u8> = u.arbitrary()?;
            let mut cursor = BitCursor::from_bytes(&data).unwrap();
            let mut bits = Vec::with_capacity(data.len() * 8);
            while cursor.remaining_bits() > 0 {
                let num = u
                    .int_in_range(1..=MAX_BITS_PER_CALL)?
                    .min(cursor.remaining_bits());
                let value = cursor.next_bits(num).unwrap();
                bits.extend((0..num).rev().map(|i| (value >> i) & 1 != 0));
            }
            let rebuilt: Vec<u8> = bits
                .chunks(8)
                .map(|byte| byte.iter().fold(0u8, |acc, &b| (acc << 1) | b as u8))
                .collect();
            assert_eq!(rebuilt, data);
            Ok(())
        });
    }

    #[test]
    fn back_bits_inverts_next_bits() {
        arbtest::arbtest(|u| {
            let data: [u8; 16] = u.arbitrary()?;
            let mut cursor = BitCursor::from_bytes(&data).unwrap();
            cursor.skip_bits(u.int_in_range(0..=64)?).unwrap();
            let num = u.int_in_range(1..=MAX_BITS_PER_CALL)?;
            let before = cursor.position();
            let first = cursor.next_bits(num).unwrap();
            cursor.back_bits(num).unwrap();
            assert_eq!(cursor.position(), before);
            assert_eq!(cursor.next_bits(num).unwrap(), first);
            Ok(())
        });
    }

    #[test]
    fn interleaved_appends_and_reads() {
        let mut rng = XorShiftRng::seed_from_u64(0x6a70_6567);
        let data: Vec<u8> = (0..4096).map(|_| rng.random()).collect();
        let mut cursor = BitCursor::new(16);
        let mut appended = 0;
        let mut read_bits = 0;
        while read_bits < data.len() * 8 {
            if cursor.remaining_bits() < 32 && appended < data.len() {
                let end = (appended + rng.random_range(1..64)).min(data.len());
                cursor.append(&data[appended..end]).unwrap();
                appended = end;
                if rng.random_bool(0.3) {
                    cursor.trim();
                }
            }
            let num = rng
                .random_range(1..=MAX_BITS_PER_CALL)
                .min(cursor.remaining_bits());
            let value = cursor.next_bits(num).unwrap();
            for i in 0..num {
                let bit = read_bits + i;
                let expected = (data[bit / 8] >> (7 - bit % 8)) & 1;
                assert_eq!((value >> (num - 1 - i)) & 1, expected as u32, "bit {bit}");
            }
            read_bits += num;
        }
        assert!(cursor.eof());
    }
}
