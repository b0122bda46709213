// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use crate::BLOCK_SIZE;
use crate::entropy_coding::scan::NUM_HUFFMAN_SLOTS;
use crate::error::{Error, Result};
use crate::headers::frame::FrameHeader;
use crate::headers::markers::Segment;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanComponentSelector {
    /// Index into the frame's component list.
    pub component: usize,
    pub dc_table: usize,
    pub ac_table: usize,
}

/// A baseline SOS header: the full spectral range in a single pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanHeader {
    pub components: Vec<ScanComponentSelector>,
}

impl ScanHeader {
    pub fn parse(data: &[u8], frame: &FrameHeader) -> Result<ScanHeader> {
        let mut segment = Segment::new("SOS", data);
        let num_components = segment.u8()? as usize;
        if num_components == 0 || num_components > frame.components.len() {
            return Err(Error::InvalidMarkerSegment("SOS component count"));
        }
        let mut components: Vec<ScanComponentSelector> = Vec::with_capacity(num_components);
        for _ in 0..num_components {
            let id = segment.u8()?;
            let component = frame
                .component_index(id)
                .ok_or(Error::UnknownComponent(id))?;
            if components.iter().any(|c| c.component == component) {
                return Err(Error::InvalidMarkerSegment("SOS duplicate component"));
            }
            let (dc_table, ac_table) = segment.nibbles()?;
            if dc_table as usize >= NUM_HUFFMAN_SLOTS {
                return Err(Error::InvalidTableId("DC", dc_table));
            }
            if ac_table as usize >= NUM_HUFFMAN_SLOTS {
                return Err(Error::InvalidTableId("AC", ac_table));
            }
            components.push(ScanComponentSelector {
                component,
                dc_table: dc_table as usize,
                ac_table: ac_table as usize,
            });
        }
        let spectral_start = segment.u8()?;
        let spectral_end = segment.u8()?;
        let (ah, al) = segment.nibbles()?;
        segment.finish()?;
        if spectral_start != 0 || spectral_end as usize != BLOCK_SIZE - 1 || ah != 0 || al != 0 {
            return Err(Error::InvalidMarkerSegment(
                "SOS spectral selection or successive approximation is not baseline",
            ));
        }
        Ok(ScanHeader { components })
    }

    /// A scan with a single component codes one block per MCU.
    pub fn is_interleaved(&self) -> bool {
        self.components.len() > 1
    }
}
