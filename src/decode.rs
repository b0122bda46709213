// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use crate::BLOCK_SIZE;
use crate::coefficients::dequantize_block;
use crate::color::{RgbImage, to_rgb};
use crate::entropy_coding::block::CoefficientBlock;
use crate::entropy_coding::refill::EntropySource;
use crate::entropy_coding::scan::{ScanDecoder, ScanGeometry};
use crate::error::Result;
use crate::headers::{FrameComponent, JpegHeaders, QuantizationTable, read_headers, read_trailer};
use crate::idct::{Idct, IdctClipTable};
use crate::util::tracing_wrappers::*;

/// The dequantized coefficients of a baseline JPEG file.
#[derive(Debug, Clone)]
pub struct DecodedCoefficients {
    pub headers: JpegHeaders,
    pub geometry: ScanGeometry,
    /// Natural-order blocks in coding order: MCU-major, then channel, then
    /// block within the channel.
    pub blocks: Vec<CoefficientBlock>,
}

impl DecodedCoefficients {
    pub fn width(&self) -> usize {
        self.headers.frame.width
    }

    pub fn height(&self) -> usize {
        self.headers.frame.height
    }

    pub fn num_channels(&self) -> usize {
        self.geometry.components.len()
    }

    /// The frame component coded in a scan channel.
    pub fn frame_component(&self, channel: usize) -> &FrameComponent {
        &self.headers.frame.components[self.headers.scan.components[channel].component]
    }

    /// Blocks across and down in a channel's block grid.
    pub fn block_grid(&self, channel: usize) -> (usize, usize) {
        let component = self.headers.scan.components[channel].component;
        if self.headers.scan.is_interleaved() {
            self.headers.frame.mcu_blocks(component)
        } else {
            self.headers.frame.component_blocks(component)
        }
    }

    /// Returns the channel of the block at `index` and its position in that
    /// channel's block grid.
    pub fn block_position(&self, index: usize) -> (usize, usize, usize) {
        let location = self.geometry.location(index);
        if self.headers.scan.is_interleaved() {
            let component = self.frame_component(location.channel);
            let h = component.h_sampling as usize;
            let v = component.v_sampling as usize;
            let mcus_wide = self.headers.frame.mcus_wide;
            (
                location.channel,
                (location.mcu % mcus_wide) * h + location.block % h,
                (location.mcu / mcus_wide) * v + location.block / h,
            )
        } else {
            let (wide, _) = self.block_grid(location.channel);
            (location.channel, location.mcu % wide, location.mcu / wide)
        }
    }
}

/// Decodes a baseline JPEG file into dequantized coefficient blocks.
///
/// On success `source` has been read up to and including EOI.
pub fn decode_coefficients<S: EntropySource>(mut source: S) -> Result<DecodedCoefficients> {
    let headers = read_headers(&mut source)?;
    let geometry = headers.scan_geometry();
    let quantization_tables = (0..geometry.components.len())
        .map(|channel| headers.quantization_table(channel))
        .collect::<Result<Vec<&QuantizationTable>>>()?;

    let mut decoder = ScanDecoder::new(&headers.huffman_tables, &geometry, source)?;
    let mut blocks = Vec::new();
    blocks.try_reserve_exact(decoder.total_blocks())?;
    let mut block = [0; BLOCK_SIZE];
    while let Some(location) = decoder.decode_next(&mut block)? {
        blocks.push(dequantize_block(&block, quantization_tables[location.channel]));
    }
    let mut source = decoder.into_source();
    read_trailer(&mut source)?;
    debug!(
        width = headers.frame.width,
        height = headers.frame.height,
        blocks = blocks.len(),
        "decoded coefficients"
    );

    Ok(DecodedCoefficients {
        headers,
        geometry,
        blocks,
    })
}

/// Decodes a baseline JPEG file into 8-bit RGB.
pub fn decode_to_rgb<S: EntropySource>(source: S) -> Result<RgbImage> {
    let coefficients = decode_coefficients(source)?;
    to_rgb(&coefficients, &Idct::new(IdctClipTable::new()))
}
