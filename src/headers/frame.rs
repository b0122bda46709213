// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use crate::BLOCK_DIM;
use crate::error::{Error, Result};
use crate::headers::markers::Segment;
use crate::headers::quantization::NUM_QUANTIZATION_TABLES;

pub const MAX_COMPONENTS: usize = 4;
pub const MAX_SAMPLING_FACTOR: u8 = 4;
pub const SAMPLE_PRECISION: u8 = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameComponent {
    pub id: u8,
    pub h_sampling: u8,
    pub v_sampling: u8,
    pub quantization_table: u8,
}

impl FrameComponent {
    pub fn blocks_per_mcu(&self) -> usize {
        self.h_sampling as usize * self.v_sampling as usize
    }
}

/// A baseline (SOF0) frame header and the MCU grid derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameHeader {
    pub width: usize,
    pub height: usize,
    pub components: Vec<FrameComponent>,
    pub max_h_sampling: u8,
    pub max_v_sampling: u8,
    pub mcus_wide: usize,
    pub mcus_tall: usize,
}

impl FrameHeader {
    pub fn parse(data: &[u8]) -> Result<FrameHeader> {
        let mut segment = Segment::new("SOF0", data);
        let precision = segment.u8()?;
        if precision != SAMPLE_PRECISION {
            return Err(Error::UnsupportedPrecision(precision));
        }
        let height = segment.u16()? as usize;
        let width = segment.u16()? as usize;
        // A zero height would be defined later by a DNL marker.
        if width == 0 || height == 0 {
            return Err(Error::InvalidImageSize(width, height));
        }
        let num_components = segment.u8()? as usize;
        if num_components == 0 || num_components > MAX_COMPONENTS {
            return Err(Error::InvalidMarkerSegment("SOF0 component count"));
        }

        let mut components: Vec<FrameComponent> = Vec::with_capacity(num_components);
        for _ in 0..num_components {
            let id = segment.u8()?;
            let (h_sampling, v_sampling) = segment.nibbles()?;
            let quantization_table = segment.u8()?;
            if !(1..=MAX_SAMPLING_FACTOR).contains(&h_sampling)
                || !(1..=MAX_SAMPLING_FACTOR).contains(&v_sampling)
            {
                return Err(Error::InvalidMarkerSegment("SOF0 sampling factor"));
            }
            if quantization_table as usize >= NUM_QUANTIZATION_TABLES {
                return Err(Error::InvalidTableId("quantization", quantization_table));
            }
            if components.iter().any(|c| c.id == id) {
                return Err(Error::InvalidMarkerSegment("SOF0 duplicate component id"));
            }
            components.push(FrameComponent {
                id,
                h_sampling,
                v_sampling,
                quantization_table,
            });
        }
        segment.finish()?;

        let max_h_sampling = components.iter().map(|c| c.h_sampling).max().unwrap_or(1);
        let max_v_sampling = components.iter().map(|c| c.v_sampling).max().unwrap_or(1);
        let mcu_width = max_h_sampling as usize * BLOCK_DIM;
        let mcu_height = max_v_sampling as usize * BLOCK_DIM;
        Ok(FrameHeader {
            width,
            height,
            components,
            max_h_sampling,
            max_v_sampling,
            mcus_wide: width.div_ceil(mcu_width),
            mcus_tall: height.div_ceil(mcu_height),
        })
    }

    pub fn mcu_count(&self) -> usize {
        self.mcus_wide * self.mcus_tall
    }

    pub fn component_index(&self, id: u8) -> Option<usize> {
        self.components.iter().position(|c| c.id == id)
    }

    /// Width in samples of a component before upsampling.
    pub fn component_width(&self, component: usize) -> usize {
        let h = self.components[component].h_sampling as usize;
        (self.width * h).div_ceil(self.max_h_sampling as usize)
    }

    pub fn component_height(&self, component: usize) -> usize {
        let v = self.components[component].v_sampling as usize;
        (self.height * v).div_ceil(self.max_v_sampling as usize)
    }

    /// Block grid of a component in an interleaved scan, padded to whole MCUs.
    pub fn mcu_blocks(&self, component: usize) -> (usize, usize) {
        let c = &self.components[component];
        (
            self.mcus_wide * c.h_sampling as usize,
            self.mcus_tall * c.v_sampling as usize,
        )
    }

    /// Block grid of a component coded on its own in a non-interleaved scan.
    pub fn component_blocks(&self, component: usize) -> (usize, usize) {
        (
            self.component_width(component).div_ceil(BLOCK_DIM),
            self.component_height(component).div_ceil(BLOCK_DIM),
        )
    }
}

#[cfg(test)]
mod test {
    use test_log::test;

    use super::*;

    fn sof0(width: u16, height: u16, components: &[(u8, u8, u8)]) -> Vec<u8> {
        let mut data = vec![8];
        data.extend_from_slice(&height.to_be_bytes());
        data.extend_from_slice(&width.to_be_bytes());
        data.push(components.len() as u8);
        for &(id, sampling, table) in components {
            data.extend_from_slice(&[id, sampling, table]);
        }
        data
    }

    #[test]
    fn ycbcr_420_geometry() {
        let frame =
            FrameHeader::parse(&sof0(33, 17, &[(1, 0x22, 0), (2, 0x11, 1), (3, 0x11, 1)]))
                .unwrap();
        assert_eq!((frame.max_h_sampling, frame.max_v_sampling), (2, 2));
        assert_eq!((frame.mcus_wide, frame.mcus_tall), (3, 2));
        assert_eq!(frame.mcu_count(), 6);
        assert_eq!(frame.components[0].blocks_per_mcu(), 4);
        assert_eq!(frame.mcu_blocks(0), (6, 4));
        assert_eq!(frame.mcu_blocks(1), (3, 2));
        assert_eq!(frame.component_width(1), 17);
        assert_eq!(frame.component_height(1), 9);
        assert_eq!(frame.component_blocks(1), (3, 2));
        assert_eq!(frame.component_index(3), Some(2));
        assert_eq!(frame.component_index(4), None);
    }

    #[test]
    fn grayscale_geometry() {
        let frame = FrameHeader::parse(&sof0(20, 9, &[(1, 0x11, 0)])).unwrap();
        assert_eq!((frame.mcus_wide, frame.mcus_tall), (3, 2));
        assert_eq!(frame.component_blocks(0), (3, 2));
    }

    #[test]
    fn rejects_invalid_frames() {
        let mut data = sof0(8, 8, &[(1, 0x11, 0)]);
        data[0] = 12;
        assert!(matches!(
            FrameHeader::parse(&data),
            Err(Error::UnsupportedPrecision(12))
        ));
        assert!(matches!(
            FrameHeader::parse(&sof0(0, 8, &[(1, 0x11, 0)])),
            Err(Error::InvalidImageSize(0, 8))
        ));
        assert!(matches!(
            FrameHeader::parse(&sof0(8, 8, &[(1, 0x51, 0)])),
            Err(Error::InvalidMarkerSegment(_))
        ));
        assert!(matches!(
            FrameHeader::parse(&sof0(8, 8, &[(1, 0x11, 4)])),
            Err(Error::InvalidTableId("quantization", 4))
        ));
        assert!(matches!(
            FrameHeader::parse(&sof0(8, 8, &[(1, 0x11, 0), (1, 0x11, 0)])),
            Err(Error::InvalidMarkerSegment(_))
        ));
        let mut trailing = sof0(8, 8, &[(1, 0x11, 0)]);
        trailing.push(0);
        assert!(FrameHeader::parse(&trailing).is_err());
    }
}
