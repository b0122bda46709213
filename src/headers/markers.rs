// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use std::io::Read;

use byteorder::{BigEndian, ReadBytesExt};
use num_derive::FromPrimitive;

use crate::error::{Error, Result};

/// Marker codes the decoder acts on. APPn and RSTn are ranges and are
/// classified with [`is_app`] and [`is_restart`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum Marker {
    Sof0 = 0xc0,
    Dht = 0xc4,
    Soi = 0xd8,
    Eoi = 0xd9,
    Sos = 0xda,
    Dqt = 0xdb,
    Dnl = 0xdc,
    Dri = 0xdd,
    Com = 0xfe,
}

pub fn is_app(code: u8) -> bool {
    (0xe0..=0xef).contains(&code)
}

pub fn is_restart(code: u8) -> bool {
    (0xd0..=0xd7).contains(&code)
}

/// SOF1 to SOF15 other than DHT: extended, progressive, lossless,
/// hierarchical and arithmetic-coded frames.
pub fn is_unsupported_frame(code: u8) -> bool {
    (0xc1..=0xcf).contains(&code) && code != Marker::Dht as u8
}

/// Reads a marker, skipping any `0xFF` fill bytes before the code.
pub fn read_marker<R: Read>(source: &mut R) -> Result<u8> {
    let first = source.read_u8()?;
    if first != 0xff {
        return Err(Error::InvalidMarkerSegment("expected a marker"));
    }
    loop {
        match source.read_u8()? {
            0xff => continue,
            0x00 => return Err(Error::InvalidMarkerSegment("stuffed byte outside scan data")),
            code => return Ok(code),
        }
    }
}

/// Reads the length-prefixed payload of a marker segment.
pub fn read_segment<R: Read>(source: &mut R) -> Result<Vec<u8>> {
    let length = source.read_u16::<BigEndian>()? as usize;
    if length < 2 {
        return Err(Error::InvalidMarkerSegment("segment length below 2"));
    }
    let mut payload = Vec::new();
    payload.try_reserve_exact(length - 2)?;
    payload.resize(length - 2, 0);
    source.read_exact(&mut payload)?;
    Ok(payload)
}

/// A cursor over one segment payload. Reads past the end and unread
/// trailing bytes are both reported as a malformed segment.
pub(crate) struct Segment<'a> {
    name: &'static str,
    data: &'a [u8],
}

impl<'a> Segment<'a> {
    pub(crate) fn new(name: &'static str, data: &'a [u8]) -> Segment<'a> {
        Segment { name, data }
    }

    pub(crate) fn u8(&mut self) -> Result<u8> {
        self.data
            .read_u8()
            .map_err(|_| Error::InvalidMarkerSegment(self.name))
    }

    pub(crate) fn u16(&mut self) -> Result<u16> {
        self.data
            .read_u16::<BigEndian>()
            .map_err(|_| Error::InvalidMarkerSegment(self.name))
    }

    /// Splits a byte into its high and low nibbles.
    pub(crate) fn nibbles(&mut self) -> Result<(u8, u8)> {
        let byte = self.u8()?;
        Ok((byte >> 4, byte & 0xf))
    }

    pub(crate) fn bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        if count > self.data.len() {
            return Err(Error::InvalidMarkerSegment(self.name));
        }
        let (head, tail) = self.data.split_at(count);
        self.data = tail;
        Ok(head)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub(crate) fn finish(self) -> Result<()> {
        if self.data.is_empty() {
            Ok(())
        } else {
            Err(Error::InvalidMarkerSegment(self.name))
        }
    }
}
