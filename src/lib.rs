// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Baseline JPEG decoder built around a bit-exact entropy decoding engine.
//!
//! The core turns the entropy-coded segment of a baseline scan into a flat
//! array of 64-coefficient blocks:
//!
//! - [`bit_cursor::BitCursor`] is a growable byte buffer read at bit
//!   granularity.
//! - [`entropy_coding::huffman::HuffmanTable`] decodes canonical Huffman codes
//!   built from DHT data.
//! - [`entropy_coding::refill::EntropyRefiller`] feeds the cursor from a
//!   byte source, removing `0xFF 0x00` stuffing and stopping at markers.
//! - [`entropy_coding::block::decode_block`] and
//!   [`entropy_coding::scan::ScanDecoder`] run the MCU loop.
//!
//! Marker parsing, dequantization, the IDCT, colour conversion and BMP output
//! are provided around the core so whole files can be decoded.

#![deny(unsafe_code)]
pub mod bit_cursor;
pub mod coefficients;
pub mod color;
pub mod decode;
pub mod enc;
pub mod entropy_coding;
pub mod error;
pub mod headers;
pub mod idct;
pub mod util;

pub const BLOCK_DIM: usize = 8;
pub const BLOCK_SIZE: usize = BLOCK_DIM * BLOCK_DIM;
