// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! The marker layer: everything in a JPEG file outside entropy-coded data.

pub mod frame;
pub mod huffman;
pub mod markers;
pub mod quantization;
pub mod scan;

use std::io::{ErrorKind, Read};

use byteorder::ReadBytesExt;
use num_traits::FromPrimitive;

use crate::entropy_coding::scan::{HuffmanTables, ScanComponent, ScanGeometry};
use crate::error::{Error, Result};
use crate::util::tracing_wrappers::*;

pub use frame::{FrameComponent, FrameHeader};
pub use huffman::{HuffmanSpec, parse_dht};
pub use markers::Marker;
pub use quantization::{NUM_QUANTIZATION_TABLES, QuantizationTable, parse_dqt};
pub use scan::{ScanComponentSelector, ScanHeader};

use markers::{Segment, is_app, is_restart, is_unsupported_frame, read_marker, read_segment};

/// Everything needed to decode the entropy-coded data that follows SOS.
#[derive(Debug, Clone)]
pub struct JpegHeaders {
    pub frame: FrameHeader,
    pub scan: ScanHeader,
    pub quantization_tables: [Option<QuantizationTable>; NUM_QUANTIZATION_TABLES],
    pub huffman_tables: HuffmanTables,
    /// MCUs per restart interval, 0 if restart markers are not used.
    pub restart_interval: u16,
}

impl JpegHeaders {
    /// The block layout of the scan.
    ///
    /// An interleaved scan codes every component's `h * v` blocks per MCU
    /// over the padded MCU grid. A single-component scan codes one block per
    /// MCU over the component's own block grid.
    pub fn scan_geometry(&self) -> ScanGeometry {
        let frame = &self.frame;
        let interleaved = self.scan.is_interleaved();
        let components = self
            .scan
            .components
            .iter()
            .map(|selector| ScanComponent {
                blocks_per_mcu: if interleaved {
                    frame.components[selector.component].blocks_per_mcu()
                } else {
                    1
                },
                dc_table: selector.dc_table,
                ac_table: selector.ac_table,
            })
            .collect();
        let mcu_count = if interleaved {
            frame.mcu_count()
        } else {
            let (wide, tall) = frame.component_blocks(self.scan.components[0].component);
            wide * tall
        };
        ScanGeometry {
            components,
            mcu_count,
            restart_interval: self.restart_interval as usize,
        }
    }

    /// The quantization table of a scan channel.
    pub fn quantization_table(&self, channel: usize) -> Result<&QuantizationTable> {
        let component = &self.frame.components[self.scan.components[channel].component];
        let id = component.quantization_table as usize;
        self.quantization_tables[id]
            .as_ref()
            .ok_or(Error::MissingQuantizationTable(id))
    }
}

fn skip_segment<R: Read>(source: &mut R, _code: u8) -> Result<()> {
    let _payload = read_segment(source)?;
    debug!(len = _payload.len(), "skipping segment ff{_code:02x}");
    Ok(())
}

/// Reads markers from SOI through SOS. On success `source` is positioned at
/// the first byte of entropy-coded data.
pub fn read_headers<R: Read>(source: &mut R) -> Result<JpegHeaders> {
    let soi = [source.read_u8()?, source.read_u8()?];
    if soi != [0xff, Marker::Soi as u8] {
        return Err(Error::InvalidSoi);
    }

    let mut frame: Option<FrameHeader> = None;
    let mut quantization_tables: [Option<QuantizationTable>; NUM_QUANTIZATION_TABLES] =
        array_init::array_init(|_| None);
    let mut huffman_tables = HuffmanTables::default();
    let mut restart_interval = 0;

    loop {
        let code = read_marker(source)?;
        match Marker::from_u8(code) {
            Some(Marker::Sof0) => {
                if frame.is_some() {
                    return Err(Error::UnexpectedMarker(code));
                }
                let header = FrameHeader::parse(&read_segment(source)?)?;
                debug!(
                    width = header.width,
                    height = header.height,
                    components = header.components.len(),
                    "SOF0"
                );
                frame = Some(header);
            }
            Some(Marker::Dht) => {
                for spec in parse_dht(&read_segment(source)?)? {
                    if huffman_tables.get(spec.class, spec.id).is_ok() {
                        return Err(Error::InvalidMarkerSegment("DHT redefines a table"));
                    }
                    debug!(class = spec.class.name(), id = spec.id, "DHT");
                    huffman_tables.set(spec.class, spec.id, spec.build()?)?;
                }
            }
            Some(Marker::Dqt) => {
                for (id, table) in parse_dqt(&read_segment(source)?)? {
                    if quantization_tables[id].is_some() {
                        return Err(Error::InvalidMarkerSegment("DQT redefines a table"));
                    }
                    debug!(id, precision = ?table.precision, "DQT");
                    quantization_tables[id] = Some(table);
                }
            }
            Some(Marker::Dri) => {
                let payload = read_segment(source)?;
                let mut segment = Segment::new("DRI", &payload);
                restart_interval = segment.u16()?;
                segment.finish()?;
                debug!(restart_interval, "DRI");
            }
            Some(Marker::Sos) => {
                let frame = frame.ok_or(Error::UnexpectedMarker(code))?;
                let scan = ScanHeader::parse(&read_segment(source)?, &frame)?;
                if scan.components.len() != frame.components.len() {
                    return Err(Error::InvalidMarkerSegment(
                        "scan does not cover every frame component",
                    ));
                }
                let headers = JpegHeaders {
                    frame,
                    scan,
                    quantization_tables,
                    huffman_tables,
                    restart_interval,
                };
                for channel in 0..headers.scan.components.len() {
                    headers.quantization_table(channel)?;
                }
                debug!(
                    components = headers.scan.components.len(),
                    interleaved = headers.scan.is_interleaved(),
                    "SOS"
                );
                return Ok(headers);
            }
            Some(Marker::Com) => skip_segment(source, code)?,
            Some(Marker::Soi | Marker::Eoi | Marker::Dnl) => {
                return Err(Error::UnexpectedMarker(code));
            }
            None if is_app(code) => skip_segment(source, code)?,
            None if is_unsupported_frame(code) => return Err(Error::UnsupportedMarker(code)),
            None if is_restart(code) || code == 0x01 => {
                return Err(Error::UnexpectedMarker(code));
            }
            None => skip_segment(source, code)?,
        }
    }
}

/// Reads the markers that follow the entropy-coded data, up to EOI.
///
/// A file that ends without EOI is accepted with a warning. Further scans
/// are not supported.
pub fn read_trailer<R: Read>(source: &mut R) -> Result<()> {
    loop {
        let code = match read_marker(source) {
            Ok(code) => code,
            Err(Error::Io(e)) if e.kind() == ErrorKind::UnexpectedEof => {
                warn!("missing EOI marker");
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        match Marker::from_u8(code) {
            Some(Marker::Eoi) => return Ok(()),
            Some(Marker::Sos | Marker::Dnl) => return Err(Error::UnsupportedMarker(code)),
            Some(Marker::Soi | Marker::Sof0) => return Err(Error::UnexpectedMarker(code)),
            None if is_unsupported_frame(code) => return Err(Error::UnsupportedMarker(code)),
            None if is_restart(code) || code == 0x01 => {
                return Err(Error::UnexpectedMarker(code));
            }
            _ => skip_segment(source, code)?,
        }
    }
}

#[cfg(test)]
mod test {
    use test_log::test;

    use super::*;

    fn segment(code: u8, payload: &[u8]) -> Vec<u8> {
        let mut data = vec![0xff, code];
        data.extend_from_slice(&(payload.len() as u16 + 2).to_be_bytes());
        data.extend_from_slice(payload);
        data
    }

    fn dqt(id: u8) -> Vec<u8> {
        let mut payload = vec![id];
        payload.extend_from_slice(&[1; 64]);
        segment(0xdb, &payload)
    }

    fn gray_headers(with_dqt: bool) -> Vec<u8> {
        let mut data = vec![0xff, 0xd8];
        data.extend(segment(0xe0, &[0xaa, 0xbb]));
        if with_dqt {
            data.extend(dqt(0));
        }
        data.extend(segment(0xc0, &[8, 0x00, 0x10, 0x00, 0x08, 1, 1, 0x11, 0]));
        // One code of length 1 in a DC and an AC table.
        let mut dht = Vec::new();
        for class in [0x00, 0x10] {
            dht.push(class);
            dht.push(1);
            dht.extend_from_slice(&[0; 15]);
            dht.push(0x00);
        }
        data.extend(segment(0xc4, &dht));
        data.extend(segment(0xdd, &[0x00, 0x01]));
        data.extend(segment(0xda, &[1, 1, 0x00, 0, 63, 0]));
        data
    }

    #[test]
    fn reads_grayscale_headers() {
        let mut data = gray_headers(true);
        data.extend_from_slice(&[0x12, 0x34]);
        let mut source: &[u8] = &data;
        let headers = read_headers(&mut source).unwrap();
        assert_eq!(source, [0x12, 0x34]);
        assert_eq!((headers.frame.width, headers.frame.height), (8, 16));
        assert_eq!(headers.restart_interval, 1);
        assert_eq!(headers.quantization_table(0).unwrap().values, [1; 64]);

        let geometry = headers.scan_geometry();
        assert_eq!(geometry.mcu_count, 2);
        assert_eq!(geometry.blocks_per_mcu(), 1);
        assert_eq!(geometry.restart_interval, 1);
    }

    #[test]
    fn rejects_missing_soi() {
        let mut source: &[u8] = &[0xff, 0xd9];
        assert!(matches!(read_headers(&mut source), Err(Error::InvalidSoi)));
    }

    #[test]
    fn rejects_progressive_frames() {
        let mut data = vec![0xff, 0xd8];
        data.extend(dqt(0));
        data.extend(segment(0xc2, &[8, 0, 8, 0, 8, 1, 1, 0x11, 0]));
        let mut source: &[u8] = &data;
        assert!(matches!(
            read_headers(&mut source),
            Err(Error::UnsupportedMarker(0xc2))
        ));
    }

    #[test]
    fn rejects_missing_quantization_table() {
        let data = gray_headers(false);
        let mut source: &[u8] = &data;
        assert!(matches!(
            read_headers(&mut source),
            Err(Error::MissingQuantizationTable(0))
        ));
    }

    #[test]
    fn rejects_table_redefinition() {
        let mut data = vec![0xff, 0xd8];
        data.extend(dqt(2));
        data.extend(dqt(2));
        let mut source: &[u8] = &data;
        assert!(matches!(
            read_headers(&mut source),
            Err(Error::InvalidMarkerSegment(_))
        ));
    }

    #[test]
    fn trailer_reaches_eoi() {
        let mut source: &[u8] = &[0xff, 0xfe, 0x00, 0x03, b'x', 0xff, 0xff, 0xd9];
        read_trailer(&mut source).unwrap();
        assert!(source.is_empty());

        let mut missing: &[u8] = &[];
        read_trailer(&mut missing).unwrap();

        let mut second_scan: &[u8] = &[0xff, 0xda, 0x00, 0x02];
        assert!(matches!(
            read_trailer(&mut second_scan),
            Err(Error::UnsupportedMarker(0xda))
        ));
    }
}
