// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use crate::BLOCK_SIZE;
use crate::bit_cursor::BitCursor;
use crate::entropy_coding::huffman::HuffmanTable;
use crate::error::{Error, Result};

/// Quantized coefficients of one 8x8 block in zig-zag order.
pub type CoefficientBlock = [i32; BLOCK_SIZE];

const MAX_DC_CATEGORY: u8 = 15;
const EOB: u8 = 0x00;
const ZRL: u8 = 0xf0;

/// Converts `size` additional bits into a signed value (ITU-T T.81 F.2.2.1,
/// EXTEND). Values with a leading zero bit are negative.
///
/// ```
/// # use jpeg_baseline::entropy_coding::block::extend;
/// assert_eq!(extend(0b011, 3), -4);
/// assert_eq!(extend(0b110, 3), 6);
/// assert_eq!(extend(0, 0), 0);
/// ```
pub fn extend(bits: u32, size: u8) -> i32 {
    if size == 0 {
        return 0;
    }
    let bits = bits as i32;
    if bits < 1 << (size - 1) {
        bits - (1 << size) + 1
    } else {
        bits
    }
}

fn read_magnitude(cursor: &mut BitCursor, size: u8) -> Result<i32> {
    if size == 0 {
        return Ok(0);
    }
    Ok(extend(cursor.next_bits(size as usize)?, size))
}

/// Decodes one block into `coefficients`.
///
/// The DC difference is added to `dc_predictor`, which then holds the block's
/// DC value. Coefficients not covered by the AC run-length data are zero.
pub fn decode_block(
    cursor: &mut BitCursor,
    dc_predictor: &mut i32,
    coefficients: &mut CoefficientBlock,
    dc_table: &HuffmanTable,
    ac_table: &HuffmanTable,
) -> Result<()> {
    coefficients.fill(0);

    let category = dc_table.decode(cursor)?;
    if category > MAX_DC_CATEGORY {
        return Err(Error::InvalidDcCategory(category));
    }
    let diff = read_magnitude(cursor, category)?;
    *dc_predictor = dc_predictor.wrapping_add(diff);
    coefficients[0] = *dc_predictor;

    let mut k = 1;
    while k < BLOCK_SIZE {
        let symbol = ac_table.decode(cursor)?;
        let run = (symbol >> 4) as usize;
        let size = symbol & 0xf;
        if size == 0 {
            match symbol {
                EOB => break,
                ZRL => k += 16,
                // Not used by conforming encoders; skipped as run + 1 zeros.
                _ => k += run + 1,
            }
            if k > BLOCK_SIZE {
                return Err(Error::RunLengthOverflow(k));
            }
            continue;
        }
        k += run;
        if k >= BLOCK_SIZE {
            return Err(Error::RunLengthOverflow(k));
        }
        coefficients[k] = read_magnitude(cursor, size)?;
        k += 1;
    }
    Ok(())
}
