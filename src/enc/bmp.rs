// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use std::io::Write;

use byteorder::{LittleEndian, WriteBytesExt};

use crate::color::RgbImage;
use crate::error::{Error, Result};

const FILE_HEADER_SIZE: u32 = 14;
const INFO_HEADER_SIZE: u32 = 40;
const BITS_PER_PIXEL: u16 = 24;
// 72 dpi.
const PIXELS_PER_METER: i32 = 2835;

fn row_size(width: usize) -> usize {
    (width * 3).next_multiple_of(4)
}

/// Encodes an image as an uncompressed 24-bit BMP with bottom-up rows.
pub fn to_bmp(image: &RgbImage) -> Result<Vec<u8>> {
    let (width, height) = (image.width, image.height);
    if width == 0 || height == 0 || image.pixels.len() != width * height * 3 {
        return Err(Error::InvalidImageSize(width, height));
    }
    let stride = row_size(width);
    let image_size = stride
        .checked_mul(height)
        .and_then(|size| u32::try_from(size).ok())
        .filter(|&size| size <= u32::MAX - FILE_HEADER_SIZE - INFO_HEADER_SIZE)
        .ok_or(Error::InvalidImageSize(width, height))?;
    let (Ok(bmp_width), Ok(bmp_height)) = (i32::try_from(width), i32::try_from(height)) else {
        return Err(Error::InvalidImageSize(width, height));
    };
    let offset = FILE_HEADER_SIZE + INFO_HEADER_SIZE;

    let mut ret = Vec::new();
    ret.try_reserve_exact((offset + image_size) as usize)?;

    ret.write_all(b"BM")?;
    ret.write_u32::<LittleEndian>(offset + image_size)?;
    ret.write_u16::<LittleEndian>(0)?;
    ret.write_u16::<LittleEndian>(0)?;
    ret.write_u32::<LittleEndian>(offset)?;

    ret.write_u32::<LittleEndian>(INFO_HEADER_SIZE)?;
    ret.write_i32::<LittleEndian>(bmp_width)?;
    ret.write_i32::<LittleEndian>(bmp_height)?;
    ret.write_u16::<LittleEndian>(1)?;
    ret.write_u16::<LittleEndian>(BITS_PER_PIXEL)?;
    // BI_RGB, no compression.
    ret.write_u32::<LittleEndian>(0)?;
    ret.write_u32::<LittleEndian>(image_size)?;
    ret.write_i32::<LittleEndian>(PIXELS_PER_METER)?;
    ret.write_i32::<LittleEndian>(PIXELS_PER_METER)?;
    ret.write_u32::<LittleEndian>(0)?;
    ret.write_u32::<LittleEndian>(0)?;

    let padding = stride - width * 3;
    for row in image.pixels.chunks_exact(width * 3).rev() {
        for rgb in row.chunks_exact(3) {
            ret.extend_from_slice(&[rgb[2], rgb[1], rgb[0]]);
        }
        ret.extend(std::iter::repeat_n(0u8, padding));
    }
    Ok(ret)
}

#[cfg(test)]
mod test {
    use byteorder::{ByteOrder, LittleEndian};
    use test_log::test;

    use super::*;

    #[test]
    fn writes_bottom_up_padded_rows() {
        let image = RgbImage {
            width: 2,
            height: 2,
            pixels: vec![
                1, 2, 3, 4, 5, 6, //
                7, 8, 9, 10, 11, 12,
            ],
        };
        let bmp = to_bmp(&image).unwrap();
        assert_eq!(&bmp[..2], b"BM");
        assert_eq!(bmp.len(), 54 + 16);
        assert_eq!(LittleEndian::read_u32(&bmp[2..6]), 70);
        assert_eq!(LittleEndian::read_u32(&bmp[10..14]), 54);
        assert_eq!(LittleEndian::read_i32(&bmp[18..22]), 2);
        assert_eq!(LittleEndian::read_i32(&bmp[22..26]), 2);
        assert_eq!(LittleEndian::read_u16(&bmp[28..30]), 24);
        assert_eq!(LittleEndian::read_u32(&bmp[34..38]), 16);
        assert_eq!(
            &bmp[54..],
            [9, 8, 7, 12, 11, 10, 0, 0, 3, 2, 1, 6, 5, 4, 0, 0]
        );
    }

    #[test]
    fn rejects_oversized_images() {
        let image = RgbImage {
            width: 1 << 31,
            height: 1,
            pixels: Vec::new(),
        };
        assert!(matches!(
            to_bmp(&image),
            Err(Error::InvalidImageSize(_, 1))
        ));
    }
}
