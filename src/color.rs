// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use crate::BLOCK_DIM;
use crate::decode::DecodedCoefficients;
use crate::error::{Error, Result};
use crate::idct::Idct;
use crate::util::tracing_wrappers::*;

/// An 8-bit RGB image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbImage {
    pub width: usize,
    pub height: usize,
    /// Interleaved RGB, rows top to bottom.
    pub pixels: Vec<u8>,
}

impl RgbImage {
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        let i = (y * self.width + x) * 3;
        [self.pixels[i], self.pixels[i + 1], self.pixels[i + 2]]
    }
}

/// Samples of one channel over its whole block grid.
struct Plane {
    stride: usize,
    samples: Vec<u8>,
}

fn try_filled<T: Clone>(len: usize, value: T) -> Result<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)?;
    v.resize(len, value);
    Ok(v)
}

fn render_planes(coefficients: &DecodedCoefficients, idct: &Idct) -> Result<Vec<Plane>> {
    let mut planes = (0..coefficients.num_channels())
        .map(|channel| {
            let (wide, tall) = coefficients.block_grid(channel);
            let stride = wide * BLOCK_DIM;
            Ok(Plane {
                stride,
                samples: try_filled(stride * tall * BLOCK_DIM, 0u8)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    for (index, block) in coefficients.blocks.iter().enumerate() {
        let (channel, bx, by) = coefficients.block_position(index);
        let samples = idct.to_samples(block);
        let plane = &mut planes[channel];
        for (row, src) in samples.chunks_exact(BLOCK_DIM).enumerate() {
            let start = (by * BLOCK_DIM + row) * plane.stride + bx * BLOCK_DIM;
            plane.samples[start..start + BLOCK_DIM].copy_from_slice(src);
        }
    }
    Ok(planes)
}

/// Converts one full-range BT.601 sample (JFIF, ITU-T T.871 clause 7) to RGB.
pub fn ycbcr_to_rgb(y: u8, cb: u8, cr: u8) -> [u8; 3] {
    let y = y as f32;
    let cb = cb as f32 - 128.0;
    let cr = cr as f32 - 128.0;
    let to_u8 = |v: f32| v.round().clamp(0.0, 255.0) as u8;
    [
        to_u8(cr.mul_add(1.402, y)),
        to_u8(cr.mul_add(
            -0.299 * 1.402 / 0.587,
            cb.mul_add(-0.114 * 1.772 / 0.587, y),
        )),
        to_u8(cb.mul_add(1.772, y)),
    ]
}

/// Runs the IDCT over every block and converts the result to RGB.
///
/// Chroma planes are upsampled to full resolution by nearest neighbour.
/// One-channel images are returned as grey.
pub fn to_rgb(coefficients: &DecodedCoefficients, idct: &Idct) -> Result<RgbImage> {
    let num_channels = coefficients.num_channels();
    if num_channels != 1 && num_channels != 3 {
        return Err(Error::UnsupportedColorComponents(num_channels));
    }
    let planes = render_planes(coefficients, idct)?;

    // Scan channels in frame component order, so that Y comes first.
    let mut channels: Vec<usize> = (0..num_channels).collect();
    channels.sort_by_key(|&c| coefficients.headers.scan.components[c].component);

    let frame = &coefficients.headers.frame;
    let (width, height) = (frame.width, frame.height);
    let max_h = frame.max_h_sampling as usize;
    let max_v = frame.max_v_sampling as usize;
    let sampling: Vec<(usize, usize)> = channels
        .iter()
        .map(|&c| {
            let component = coefficients.frame_component(c);
            (component.h_sampling as usize, component.v_sampling as usize)
        })
        .collect();

    let mut pixels = try_filled(width * height * 3, 0u8)?;
    for y in 0..height {
        for x in 0..width {
            let mut sample = [0u8; 3];
            for (i, (&channel, &(h, v))) in channels.iter().zip(sampling.iter()).enumerate() {
                let plane = &planes[channel];
                let (sx, sy) = if coefficients.headers.scan.is_interleaved() {
                    (x * h / max_h, y * v / max_v)
                } else {
                    (x, y)
                };
                sample[i] = plane.samples[sy * plane.stride + sx];
            }
            let rgb = if num_channels == 1 {
                [sample[0]; 3]
            } else {
                ycbcr_to_rgb(sample[0], sample[1], sample[2])
            };
            let i = (y * width + x) * 3;
            pixels[i..i + 3].copy_from_slice(&rgb);
        }
    }
    debug!(width, height, num_channels, "converted to RGB");
    Ok(RgbImage {
        width,
        height,
        pixels,
    })
}
