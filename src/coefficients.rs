// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use crate::BLOCK_SIZE;
use crate::entropy_coding::block::CoefficientBlock;
use crate::headers::QuantizationTable;

/// Natural (row-major) position of each coefficient in zig-zag order.
#[rustfmt::skip]
pub const ZIGZAG_TO_NATURAL: [usize; BLOCK_SIZE] = [
     0,  1,  8, 16,  9,  2,  3, 10,
    17, 24, 32, 25, 18, 11,  4,  5,
    12, 19, 26, 33, 40, 48, 41, 34,
    27, 20, 13,  6,  7, 14, 21, 28,
    35, 42, 49, 56, 57, 50, 43, 36,
    29, 22, 15, 23, 30, 37, 44, 51,
    58, 59, 52, 45, 38, 31, 39, 46,
    53, 60, 61, 54, 47, 55, 62, 63,
];

/// Multiplies a block in decode order by its quantizer step sizes and
/// scatters it into natural order.
pub fn dequantize_block(block: &CoefficientBlock, table: &QuantizationTable) -> CoefficientBlock {
    let mut natural = [0; BLOCK_SIZE];
    for (k, (&coefficient, &step)) in block.iter().zip(table.values.iter()).enumerate() {
        natural[ZIGZAG_TO_NATURAL[k]] = coefficient.wrapping_mul(step as i32);
    }
    natural
}
