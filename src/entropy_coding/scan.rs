// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use std::fmt;
use std::io::Read;

use num_derive::FromPrimitive;

use crate::BLOCK_SIZE;
use crate::bit_cursor::BitCursor;
use crate::entropy_coding::block::{CoefficientBlock, decode_block};
use crate::entropy_coding::huffman::HuffmanTable;
use crate::entropy_coding::refill::{EntropyRefiller, EntropySource, SegmentEnd};
use crate::error::{Error, Result};
use crate::util::tracing_wrappers::*;

/// Initial capacity of the scan decoder's bit cursor, in bytes.
pub const INITIAL_CURSOR_CAPACITY: usize = 1024;
/// Number of Huffman table slots per class.
pub const NUM_HUFFMAN_SLOTS: usize = 4;

const RST0: u8 = 0xd0;
const NUM_RESTART_MARKERS: usize = 8;

/// Coordinates of a block within a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockLocation {
    pub mcu: usize,
    pub channel: usize,
    pub block: usize,
}

impl fmt::Display for BlockLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MCU {}, channel {}, block {}",
            self.mcu, self.channel, self.block
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum HuffmanTableClass {
    Dc = 0,
    Ac = 1,
}

impl HuffmanTableClass {
    pub fn name(self) -> &'static str {
        match self {
            HuffmanTableClass::Dc => "DC",
            HuffmanTableClass::Ac => "AC",
        }
    }
}

/// The DC and AC tables of a scan, indexed by table id.
#[derive(Debug, Clone)]
pub struct HuffmanTables {
    dc: [Option<HuffmanTable>; NUM_HUFFMAN_SLOTS],
    ac: [Option<HuffmanTable>; NUM_HUFFMAN_SLOTS],
}

impl Default for HuffmanTables {
    fn default() -> Self {
        HuffmanTables {
            dc: array_init::array_init(|_| None),
            ac: array_init::array_init(|_| None),
        }
    }
}

impl HuffmanTables {
    fn slots(&self, class: HuffmanTableClass) -> &[Option<HuffmanTable>; NUM_HUFFMAN_SLOTS] {
        match class {
            HuffmanTableClass::Dc => &self.dc,
            HuffmanTableClass::Ac => &self.ac,
        }
    }

    pub fn set(&mut self, class: HuffmanTableClass, id: usize, table: HuffmanTable) -> Result<()> {
        let slots = match class {
            HuffmanTableClass::Dc => &mut self.dc,
            HuffmanTableClass::Ac => &mut self.ac,
        };
        let slot = slots
            .get_mut(id)
            .ok_or(Error::InvalidTableId(class.name(), id as u8))?;
        *slot = Some(table);
        Ok(())
    }

    pub fn get(&self, class: HuffmanTableClass, id: usize) -> Result<&HuffmanTable> {
        self.slots(class)
            .get(id)
            .and_then(Option::as_ref)
            .ok_or(Error::MissingHuffmanTable(class.name(), id))
    }
}

/// One channel of a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanComponent {
    pub blocks_per_mcu: usize,
    pub dc_table: usize,
    pub ac_table: usize,
}

/// Block layout of a scan, in the order the blocks are coded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanGeometry {
    pub components: Vec<ScanComponent>,
    pub mcu_count: usize,
    /// MCUs between restart markers, 0 if restart markers are not used.
    pub restart_interval: usize,
}

impl ScanGeometry {
    pub fn blocks_per_mcu(&self) -> usize {
        self.components.iter().map(|c| c.blocks_per_mcu).sum()
    }

    pub fn total_blocks(&self) -> usize {
        self.mcu_count * self.blocks_per_mcu()
    }

    /// Location of the block at `index` in coding order.
    pub fn location(&self, index: usize) -> BlockLocation {
        let blocks_per_mcu = self.blocks_per_mcu();
        let mut block = index % blocks_per_mcu;
        let mut channel = 0;
        while block >= self.components[channel].blocks_per_mcu {
            block -= self.components[channel].blocks_per_mcu;
            channel += 1;
        }
        BlockLocation {
            mcu: index / blocks_per_mcu,
            channel,
            block,
        }
    }
}

/// Running DC values, one per channel.
#[derive(Debug, Clone)]
pub struct DcPredictors(Vec<i32>);

impl DcPredictors {
    pub fn new(num_channels: usize) -> DcPredictors {
        DcPredictors(vec![0; num_channels])
    }

    pub fn reset(&mut self) {
        self.0.fill(0);
    }

    pub fn get(&self, channel: usize) -> i32 {
        self.0[channel]
    }
}

/// Decodes the blocks of one scan in MCU, channel, block order.
pub struct ScanDecoder<'a, S> {
    tables: &'a HuffmanTables,
    geometry: &'a ScanGeometry,
    cursor: BitCursor,
    refiller: EntropyRefiller<S>,
    predictors: DcPredictors,
    next: BlockLocation,
    decoded: usize,
    total: usize,
    restarts: usize,
}

impl<'a, S: EntropySource> ScanDecoder<'a, S> {
    /// Creates a decoder reading entropy-coded data from `source`, which must
    /// be positioned right after the SOS segment.
    ///
    /// Fails if a channel refers to a table that is not defined.
    pub fn new(
        tables: &'a HuffmanTables,
        geometry: &'a ScanGeometry,
        source: S,
    ) -> Result<ScanDecoder<'a, S>> {
        for component in geometry.components.iter() {
            tables.get(HuffmanTableClass::Dc, component.dc_table)?;
            tables.get(HuffmanTableClass::Ac, component.ac_table)?;
        }
        Ok(ScanDecoder {
            tables,
            geometry,
            cursor: BitCursor::new(INITIAL_CURSOR_CAPACITY),
            refiller: EntropyRefiller::new(source),
            predictors: DcPredictors::new(geometry.components.len()),
            next: BlockLocation::default(),
            decoded: 0,
            total: geometry.total_blocks(),
            restarts: 0,
        })
    }

    /// Resets every channel's DC predictor to 0.
    pub fn reset_predictors(&mut self) {
        self.predictors.reset();
    }

    pub fn predictors(&self) -> &DcPredictors {
        &self.predictors
    }

    pub fn decoded_blocks(&self) -> usize {
        self.decoded
    }

    pub fn total_blocks(&self) -> usize {
        self.total
    }

    pub fn is_finished(&self) -> bool {
        self.decoded == self.total
    }

    fn at_restart_boundary(&self) -> bool {
        let interval = self.geometry.restart_interval;
        let next = &self.next;
        interval != 0
            && next.mcu != 0
            && next.mcu % interval == 0
            && next.channel == 0
            && next.block == 0
    }

    fn read_source_byte(&mut self) -> Result<Option<u8>> {
        let mut byte = [0u8];
        match self.refiller.source_mut().read(&mut byte)? {
            0 => Ok(None),
            _ => Ok(Some(byte[0])),
        }
    }

    /// Skips to the restart marker that ends the current interval and
    /// consumes it.
    fn restart(&mut self) -> Result<()> {
        self.refiller.drain(&mut self.cursor)?;
        let discarded = self.cursor.remaining_bits();
        if discarded >= 8 {
            debug!(discarded, "skipping unused entropy-coded data before restart marker");
        }
        self.cursor.clear();

        if self.refiller.segment_end() == Some(SegmentEnd::EndOfInput) {
            return Err(Error::MissingRestartMarker(None));
        }
        if self.read_source_byte()? != Some(0xff) {
            return Err(Error::MissingRestartMarker(None));
        }
        let marker = loop {
            match self.read_source_byte()? {
                Some(0xff) => continue,
                Some(marker) => break marker,
                None => return Err(Error::MissingRestartMarker(None)),
            }
        };
        if !(RST0..RST0 + NUM_RESTART_MARKERS as u8).contains(&marker) {
            return Err(Error::MissingRestartMarker(Some(marker)));
        }
        let expected = RST0 + (self.restarts % NUM_RESTART_MARKERS) as u8;
        if marker != expected {
            warn!(
                "restart marker ff{marker:02x} out of sequence, expected ff{expected:02x}"
            );
        }
        debug!(mcu = self.next.mcu, marker, "restart");
        self.restarts += 1;
        self.reset_predictors();
        self.refiller.resume();
        Ok(())
    }

    fn advance(&mut self) {
        let components = &self.geometry.components;
        let next = &mut self.next;
        next.block += 1;
        if next.block == components[next.channel].blocks_per_mcu {
            next.block = 0;
            next.channel += 1;
            if next.channel == components.len() {
                next.channel = 0;
                next.mcu += 1;
            }
        }
    }

    /// Decodes the next block into `coefficients` and returns its location,
    /// or `None` once every block of the scan has been decoded.
    pub fn decode_next(
        &mut self,
        coefficients: &mut CoefficientBlock,
    ) -> Result<Option<BlockLocation>> {
        if self.is_finished() {
            return Ok(None);
        }
        if self.at_restart_boundary() {
            self.restart()?;
        }
        self.refiller.top_up(&mut self.cursor)?;
        if self.cursor.eof() {
            return Err(Error::StreamExhausted {
                decoded: self.decoded,
                expected: self.total,
            });
        }

        let location = self.next;
        let component = &self.geometry.components[location.channel];
        let dc_table = self.tables.get(HuffmanTableClass::Dc, component.dc_table)?;
        let ac_table = self.tables.get(HuffmanTableClass::Ac, component.ac_table)?;
        decode_block(
            &mut self.cursor,
            &mut self.predictors.0[location.channel],
            coefficients,
            dc_table,
            ac_table,
        )
        .map_err(|e| e.at_block(location, self.decoded, self.total))?;

        self.decoded += 1;
        self.advance();
        if self.is_finished() {
            // Leave the source at the marker that ends the scan.
            self.refiller.drain(&mut self.cursor)?;
            debug!(
                blocks = self.decoded,
                mcus = self.geometry.mcu_count,
                restarts = self.restarts,
                "scan decoded"
            );
        }
        Ok(Some(location))
    }

    /// Decodes every remaining block of the scan.
    pub fn decode_all(&mut self) -> Result<Vec<CoefficientBlock>> {
        let mut blocks = Vec::new();
        blocks.try_reserve_exact(self.total - self.decoded)?;
        let mut coefficients = [0; BLOCK_SIZE];
        while self.decode_next(&mut coefficients)?.is_some() {
            blocks.push(coefficients);
        }
        Ok(blocks)
    }

    /// Returns the source. Once the scan is finished it is positioned at the
    /// marker that follows the entropy-coded data.
    pub fn into_source(self) -> S {
        self.refiller.into_inner()
    }
}
