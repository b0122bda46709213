// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use std::collections::TryReserveError;

use thiserror::Error;

use crate::entropy_coding::{huffman::MAX_CODES, scan::BlockLocation};

#[derive(Error, Debug)]
pub enum Error {
    // Bit cursor and entropy decoding errors.
    #[error("Read out of bounds")]
    OutOfBounds,
    #[error("Entropy-coded data exhausted after {decoded} of {expected} blocks")]
    StreamExhausted { decoded: usize, expected: usize },
    #[error("No Huffman code matches the bitstream")]
    HuffmanCodeNotFound,
    #[error("Huffman lookup failed at {0}")]
    HuffmanLookupFailed(BlockLocation),
    #[error("Invalid DC category {0}")]
    InvalidDcCategory(u8),
    #[error("Run length overflows the block: coefficient index {0}")]
    RunLengthOverflow(usize),
    #[error("Corrupt block at {location}: {reason}")]
    CorruptBlock {
        location: BlockLocation,
        reason: String,
    },
    #[error("Byte {0:02x} after 0xff is neither stuffing nor a marker")]
    MalformedByteStuffing(u8),
    #[error("Expected a restart marker, found {0:?}")]
    MissingRestartMarker(Option<u8>),
    // Huffman table construction errors.
    #[error("Too many Huffman codes: {0}, max is {MAX_CODES}")]
    TooManyHuffmanCodes(usize),
    #[error("Invalid Huffman histogram: {count} codes of length {length}")]
    InvalidHuffmanHistogram { length: usize, count: usize },
    #[error("Huffman table has {counted} codes but {symbols} symbols")]
    HuffmanSymbolCountMismatch { counted: usize, symbols: usize },
    #[error("Huffman codeword {code:#x} of length {length} collides with an existing code")]
    HuffmanCodewordCollision { code: u16, length: u8 },
    #[error("Invalid Huffman code length {0}")]
    InvalidHuffmanCodeLength(u8),
    #[error("Invalid Huffman tree arity {0}, expected a power of two in 2..=256")]
    InvalidHuffmanArity(usize),
    // Marker layer errors.
    #[error("Missing SOI marker")]
    InvalidSoi,
    #[error("Unexpected marker ff{0:02x}")]
    UnexpectedMarker(u8),
    #[error("Unsupported marker ff{0:02x}")]
    UnsupportedMarker(u8),
    #[error("Unsupported sample precision: {0}")]
    UnsupportedPrecision(u8),
    #[error("Invalid marker segment: {0}")]
    InvalidMarkerSegment(&'static str),
    #[error("Invalid {0} table id {1}")]
    InvalidTableId(&'static str, u8),
    #[error("Missing {0} Huffman table {1}")]
    MissingHuffmanTable(&'static str, usize),
    #[error("Missing quantization table {0}")]
    MissingQuantizationTable(usize),
    #[error("Scan references unknown component {0}")]
    UnknownComponent(u8),
    #[error("Invalid image size: {0}x{1}")]
    InvalidImageSize(usize, usize),
    #[error("Cannot convert {0} components to RGB")]
    UnsupportedColorComponents(usize),
    #[error("Invalid enum value {0} for {1}")]
    InvalidEnum(u32, String),
    #[error("Out of memory: {0}")]
    OutOfMemory(#[from] TryReserveError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Attaches block coordinates to an error raised while decoding one block.
    pub fn at_block(self, location: BlockLocation, decoded: usize, expected: usize) -> Error {
        match self {
            Error::OutOfBounds => Error::StreamExhausted { decoded, expected },
            Error::HuffmanCodeNotFound => Error::HuffmanLookupFailed(location),
            Error::InvalidDcCategory(_) | Error::RunLengthOverflow(_) => Error::CorruptBlock {
                location,
                reason: self.to_string(),
            },
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
