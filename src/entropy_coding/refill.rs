// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use std::io::{BufReader, Cursor, ErrorKind, Read, Seek};

use crate::bit_cursor::BitCursor;
use crate::error::{Error, Result};
use crate::util::tracing_wrappers::*;

/// Bytes requested from the source by a single refill.
pub const REFILL_CHUNK_SIZE: usize = 512;
/// The cursor is topped up whenever fewer unread bytes than this remain.
pub const LOW_WATER_MARK: usize = 512;

/// A byte source that can give back bytes it already returned.
///
/// Reading entropy-coded data in chunks always over-reads into the marker
/// that ends the segment; those bytes are returned with
/// [`EntropySource::unconsume`] so that the marker layer sees them again.
pub trait EntropySource: Read {
    /// Un-consumes the last `count` bytes returned by `read`.
    fn unconsume(&mut self, count: usize) -> std::io::Result<()>;
}

impl<T: AsRef<[u8]>> EntropySource for Cursor<T> {
    fn unconsume(&mut self, count: usize) -> std::io::Result<()> {
        let position = self
            .position()
            .checked_sub(count as u64)
            .ok_or_else(|| std::io::Error::new(ErrorKind::InvalidInput, "unconsume before start"))?;
        self.set_position(position);
        Ok(())
    }
}

impl<R: Read + Seek> EntropySource for BufReader<R> {
    fn unconsume(&mut self, count: usize) -> std::io::Result<()> {
        self.seek_relative(-(count as i64))
    }
}

/// Why the refiller stopped producing data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentEnd {
    /// A marker was found; the source is positioned at its `0xFF`.
    Marker(u8),
    /// The source ran out of bytes.
    EndOfInput,
}

fn is_marker(byte: u8) -> bool {
    // 0xFF is a fill byte that may precede any marker code.
    matches!(byte, 0x01 | 0xc0..=0xff)
}

/// Moves entropy-coded bytes from a source into a [`BitCursor`].
///
/// Stuffed `0xFF 0x00` pairs are collapsed to `0xFF`. Any other `0xFF xx`
/// pair with `xx` a marker code ends the segment: nothing past it is
/// appended and the source is rewound to the `0xFF`. Once ended, refills
/// append nothing until [`EntropyRefiller::resume`] is called.
pub struct EntropyRefiller<S> {
    source: S,
    end: Option<SegmentEnd>,
    chunk: Box<[u8; REFILL_CHUNK_SIZE]>,
}

impl<S: EntropySource> EntropyRefiller<S> {
    pub fn new(source: S) -> EntropyRefiller<S> {
        EntropyRefiller {
            source,
            end: None,
            chunk: Box::new([0; REFILL_CHUNK_SIZE]),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.end.is_some()
    }

    pub fn segment_end(&self) -> Option<SegmentEnd> {
        self.end
    }

    /// Clears the end-of-segment state, e.g. after a restart marker has
    /// been consumed from the source.
    pub fn resume(&mut self) {
        self.end = None;
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn into_inner(self) -> S {
        self.source
    }

    fn read_chunk(&mut self) -> Result<usize> {
        loop {
            match self.source.read(&mut self.chunk[..]) {
                Ok(count) => return Ok(count),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn read_lookahead(&mut self) -> Result<Option<u8>> {
        let mut byte = [0u8];
        loop {
            match self.source.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(byte[0])),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn finish(&mut self, end: SegmentEnd) {
        trace!(?end, "entropy-coded segment ended");
        self.end = Some(end);
    }

    /// Reads one chunk from the source, destuffs it and appends it to
    /// `cursor`. Returns the number of bytes appended.
    pub fn refill(&mut self, cursor: &mut BitCursor) -> Result<usize> {
        if self.end.is_some() {
            return Ok(0);
        }
        let count = self.read_chunk()?;
        if count == 0 {
            self.finish(SegmentEnd::EndOfInput);
            return Ok(0);
        }
        let mut appended = 0;
        let mut start = 0;
        while let Some(offset) = self.chunk[start..count].iter().position(|&b| b == 0xff) {
            let ff = start + offset;
            let (next, lookahead) = if ff + 1 < count {
                (self.chunk[ff + 1], 0)
            } else {
                match self.read_lookahead()? {
                    Some(byte) => (byte, 1),
                    None => {
                        // A lone trailing 0xFF cannot start a complete marker.
                        appended += cursor.append(&self.chunk[start..ff])?;
                        self.finish(SegmentEnd::EndOfInput);
                        return Ok(appended);
                    }
                }
            };
            if next == 0x00 {
                appended += cursor.append(&self.chunk[start..=ff])?;
                start = (ff + 2).min(count);
            } else if is_marker(next) {
                appended += cursor.append(&self.chunk[start..ff])?;
                self.source.unconsume(count - ff + lookahead)?;
                self.finish(SegmentEnd::Marker(next));
                return Ok(appended);
            } else {
                return Err(Error::MalformedByteStuffing(next));
            }
        }
        appended += cursor.append(&self.chunk[start..count])?;
        Ok(appended)
    }

    /// Refills until `cursor` holds at least [`LOW_WATER_MARK`] unread bytes
    /// or the segment ends.
    pub fn top_up(&mut self, cursor: &mut BitCursor) -> Result<()> {
        while !self.is_finished() && cursor.len() < LOW_WATER_MARK {
            self.refill(cursor)?;
        }
        Ok(())
    }

    /// Refills until the segment ends.
    pub fn drain(&mut self, cursor: &mut BitCursor) -> Result<()> {
        while !self.is_finished() {
            self.refill(cursor)?;
        }
        Ok(())
    }
}
