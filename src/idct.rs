// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Integer 8x8 inverse DCT (Chen-Wang butterfly, 11-bit fixed point).

use crate::entropy_coding::block::CoefficientBlock;
use crate::{BLOCK_DIM, BLOCK_SIZE};

const W1: i32 = 2841; // 2048 * sqrt(2) * cos(1 * pi / 16)
const W2: i32 = 2676; // 2048 * sqrt(2) * cos(2 * pi / 16)
const W3: i32 = 2408; // 2048 * sqrt(2) * cos(3 * pi / 16)
const W5: i32 = 1609; // 2048 * sqrt(2) * cos(5 * pi / 16)
const W6: i32 = 1108; // 2048 * sqrt(2) * cos(6 * pi / 16)
const W7: i32 = 565; // 2048 * sqrt(2) * cos(7 * pi / 16)

const CLIP_OFFSET: i32 = 512;
const CLIP_MIN: i32 = -256;
const CLIP_MAX: i32 = 255;

// Dequantized coefficients of 8-bit data lie in this range.
const COEFFICIENT_MIN: i32 = -1024;
const COEFFICIENT_MAX: i32 = 1023;

/// Saturates column outputs to the signed 9-bit sample range.
#[derive(Debug, Clone)]
pub struct IdctClipTable {
    table: Box<[i32; 2 * CLIP_OFFSET as usize]>,
}

impl IdctClipTable {
    pub fn new() -> IdctClipTable {
        let table = array_init::array_init(|i| (i as i32 - CLIP_OFFSET).clamp(CLIP_MIN, CLIP_MAX));
        IdctClipTable {
            table: Box::new(table),
        }
    }

    pub fn clip(&self, value: i32) -> i32 {
        self.table[(value.clamp(-CLIP_OFFSET, CLIP_OFFSET - 1) + CLIP_OFFSET) as usize]
    }
}

impl Default for IdctClipTable {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Idct {
    clip: IdctClipTable,
}

impl Idct {
    pub fn new(clip: IdctClipTable) -> Idct {
        Idct { clip }
    }

    fn row(blk: &mut [i32]) {
        let mut x1 = blk[4] << 11;
        let mut x2 = blk[6];
        let mut x3 = blk[2];
        let mut x4 = blk[1];
        let mut x5 = blk[7];
        let mut x6 = blk[5];
        let mut x7 = blk[3];
        if (x1 | x2 | x3 | x4 | x5 | x6 | x7) == 0 {
            let dc = blk[0] << 3;
            blk[..BLOCK_DIM].fill(dc);
            return;
        }
        let mut x0 = (blk[0] << 11) + 128;

        let mut x8 = W7 * (x4 + x5);
        x4 = x8 + (W1 - W7) * x4;
        x5 = x8 - (W1 + W7) * x5;
        x8 = W3 * (x6 + x7);
        x6 = x8 - (W3 - W5) * x6;
        x7 = x8 - (W3 + W5) * x7;

        x8 = x0 + x1;
        x0 -= x1;
        x1 = W6 * (x3 + x2);
        x2 = x1 - (W2 + W6) * x2;
        x3 = x1 + (W2 - W6) * x3;
        x1 = x4 + x6;
        x4 -= x6;
        x6 = x5 + x7;
        x5 -= x7;

        x7 = x8 + x3;
        x8 -= x3;
        x3 = x0 + x2;
        x0 -= x2;
        x2 = (181 * (x4 + x5) + 128) >> 8;
        x4 = (181 * (x4 - x5) + 128) >> 8;

        blk[0] = (x7 + x1) >> 8;
        blk[1] = (x3 + x2) >> 8;
        blk[2] = (x0 + x4) >> 8;
        blk[3] = (x8 + x6) >> 8;
        blk[4] = (x8 - x6) >> 8;
        blk[5] = (x0 - x4) >> 8;
        blk[6] = (x3 - x2) >> 8;
        blk[7] = (x7 - x1) >> 8;
    }

    fn column(&self, block: &mut CoefficientBlock, col: usize) {
        let at = |row: usize| row * BLOCK_DIM + col;
        let mut x1 = block[at(4)] << 8;
        let mut x2 = block[at(6)];
        let mut x3 = block[at(2)];
        let mut x4 = block[at(1)];
        let mut x5 = block[at(7)];
        let mut x6 = block[at(5)];
        let mut x7 = block[at(3)];
        if (x1 | x2 | x3 | x4 | x5 | x6 | x7) == 0 {
            let dc = self.clip.clip((block[at(0)] + 32) >> 6);
            for row in 0..BLOCK_DIM {
                block[at(row)] = dc;
            }
            return;
        }
        let mut x0 = (block[at(0)] << 8) + 8192;

        let mut x8 = W7 * (x4 + x5) + 4;
        x4 = (x8 + (W1 - W7) * x4) >> 3;
        x5 = (x8 - (W1 + W7) * x5) >> 3;
        x8 = W3 * (x6 + x7) + 4;
        x6 = (x8 - (W3 - W5) * x6) >> 3;
        x7 = (x8 - (W3 + W5) * x7) >> 3;

        x8 = x0 + x1;
        x0 -= x1;
        x1 = W6 * (x3 + x2) + 4;
        x2 = (x1 - (W2 + W6) * x2) >> 3;
        x3 = (x1 + (W2 - W6) * x3) >> 3;
        x1 = x4 + x6;
        x4 -= x6;
        x6 = x5 + x7;
        x5 -= x7;

        x7 = x8 + x3;
        x8 -= x3;
        x3 = x0 + x2;
        x0 -= x2;
        x2 = (181 * (x4 + x5) + 128) >> 8;
        x4 = (181 * (x4 - x5) + 128) >> 8;

        let clip = &self.clip;
        block[at(0)] = clip.clip((x7 + x1) >> 14);
        block[at(1)] = clip.clip((x3 + x2) >> 14);
        block[at(2)] = clip.clip((x0 + x4) >> 14);
        block[at(3)] = clip.clip((x8 + x6) >> 14);
        block[at(4)] = clip.clip((x8 - x6) >> 14);
        block[at(5)] = clip.clip((x0 - x4) >> 14);
        block[at(6)] = clip.clip((x3 - x2) >> 14);
        block[at(7)] = clip.clip((x7 - x1) >> 14);
    }

    /// Transforms dequantized natural-order coefficients in place into
    /// samples in `-256..=255`, before level shifting.
    pub fn transform(&self, block: &mut CoefficientBlock) {
        for c in block.iter_mut() {
            *c = (*c).clamp(COEFFICIENT_MIN, COEFFICIENT_MAX);
        }
        for row in block.chunks_exact_mut(BLOCK_DIM) {
            Self::row(row);
        }
        for col in 0..BLOCK_DIM {
            self.column(block, col);
        }
    }

    /// Transforms a block and level shifts it to 8-bit samples.
    pub fn to_samples(&self, block: &CoefficientBlock) -> [u8; BLOCK_SIZE] {
        let mut spatial = *block;
        self.transform(&mut spatial);
        spatial.map(|s| (s + 128).clamp(0, 255) as u8)
    }
}
