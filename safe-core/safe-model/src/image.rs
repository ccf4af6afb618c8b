//! Narrow JPEG segment codec
//!
//! Only the segments needed to rebuild a baseline image are kept: the comment,
//! the frame header, the quantization and huffman tables and the scan header.
//! Everything after the scan header is opaque scan data. Images are always
//! written back in one canonical segment order, so any file produced here
//! decodes and re-encodes to the same bytes.

use std::io::{self, Write};

use crate::error::FormatError;

/// Start of image marker
pub const START_MARKER: [u8; 2] = [0xff, 0xd8];
/// End of image marker
pub const END_MARKER: [u8; 2] = [0xff, 0xd9];
/// First byte of every segment
pub const MARKER_PREFIX: u8 = 0xff;

/// Maximum number of quantization or huffman table segments
pub const MAX_TABLES: usize = 10;

/// Segment types understood by the codec
pub mod segment {
    /// Comment
    pub const COM: u8 = 0xfe;
    /// Baseline start of frame
    pub const SOF0: u8 = 0xc0;
    /// Define quantization table
    pub const DQT: u8 = 0xdb;
    /// Define huffman table
    pub const DHT: u8 = 0xc4;
    /// Start of scan (terminal)
    pub const SOS: u8 = 0xda;
}

/// Structured form of an image
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageRecord {
    pub comment: Vec<u8>,
    pub start_of_frame: Vec<u8>,
    pub start_of_scan: Vec<u8>,
    pub quantization_tables: Vec<Vec<u8>>,
    pub huffman_tables: Vec<Vec<u8>>,
    /// Compressed payload after the scan header, never interpreted
    pub scan_data: Vec<u8>,
}

impl ImageRecord {
    /// Copy of this image with the comment replaced
    pub fn with_comment(&self, comment: impl Into<Vec<u8>>) -> Self {
        Self {
            comment: comment.into(),
            ..self.clone()
        }
    }

    /// Encode to bytes in canonical order
    pub fn to_bytes(&self) -> Vec<u8> {
        encode(self)
    }
}

/// One segment as found in the stream
struct Segment<'a> {
    kind: u8,
    payload: &'a [u8],
    /// Offset of the byte following this segment
    next: usize,
}

/// Read the segment starting at `offset`
///
/// `end` is the offset of the trailing end marker; segments may not run into it.
fn read_segment(img: &[u8], offset: usize, end: usize) -> Result<Segment<'_>, FormatError> {
    if offset + 4 > end {
        return Err(FormatError::Truncated { offset });
    }
    if img[offset] != MARKER_PREFIX {
        return Err(FormatError::ExpectedMarker { offset });
    }
    let kind = img[offset + 1];
    let length = u16::from_be_bytes([img[offset + 2], img[offset + 3]]);
    if length < 2 {
        return Err(FormatError::BadLength { offset, length });
    }
    let next = offset + 2 + length as usize;
    if next > end {
        return Err(FormatError::Truncated { offset });
    }
    Ok(Segment {
        kind,
        payload: &img[offset + 4..next],
        next,
    })
}

/// Decode an image
///
/// # Arguments
/// * `img` - Complete file contents
///
/// # Returns
/// * `Ok(ImageRecord)` with the kept segments
/// * `Err(FormatError)` if the markers, a segment header or the table counts are invalid
pub fn decode(img: &[u8]) -> Result<ImageRecord, FormatError> {
    if img.len() < 4 || img[..2] != START_MARKER || img[img.len() - 2..] != END_MARKER {
        return Err(FormatError::BadHeaderOrFooter);
    }
    let end = img.len() - 2;

    let mut image = ImageRecord::default();
    let mut offset = 2;

    loop {
        if offset >= end {
            return Err(FormatError::MissingScan);
        }
        let seg = read_segment(img, offset, end)?;
        offset = seg.next;

        match seg.kind {
            segment::COM => image.comment = seg.payload.to_vec(),
            segment::SOF0 => image.start_of_frame = seg.payload.to_vec(),
            segment::DQT => {
                if image.quantization_tables.len() == MAX_TABLES {
                    return Err(FormatError::TooManyQuantizationTables);
                }
                image.quantization_tables.push(seg.payload.to_vec());
            }
            segment::DHT => {
                if image.huffman_tables.len() == MAX_TABLES {
                    return Err(FormatError::TooManyHuffmanTables);
                }
                image.huffman_tables.push(seg.payload.to_vec());
            }
            segment::SOS => {
                image.start_of_scan = seg.payload.to_vec();
                break;
            }
            other => log::trace!("skipping segment 0x{other:02x}"),
        }
    }

    image.scan_data = img[offset..end].to_vec();
    Ok(image)
}

fn write_segment(out: &mut Vec<u8>, kind: u8, payload: &[u8]) {
    debug_assert!(
        payload.len() <= u16::MAX as usize - 2,
        "segment payload too large"
    );
    let len = (payload.len() + 2) as u16;
    let [hi, lo] = len.to_be_bytes();
    out.extend_from_slice(&[MARKER_PREFIX, kind, hi, lo]);
    out.extend_from_slice(payload);
}

/// Encode an image to a byte vector in canonical segment order
pub fn encode(image: &ImageRecord) -> Vec<u8> {
    let mut out = Vec::with_capacity(encoded_len(image));
    out.extend_from_slice(&START_MARKER);
    write_segment(&mut out, segment::COM, &image.comment);
    for table in &image.quantization_tables {
        write_segment(&mut out, segment::DQT, table);
    }
    write_segment(&mut out, segment::SOF0, &image.start_of_frame);
    for table in &image.huffman_tables {
        write_segment(&mut out, segment::DHT, table);
    }
    write_segment(&mut out, segment::SOS, &image.start_of_scan);
    out.extend_from_slice(&image.scan_data);
    out.extend_from_slice(&END_MARKER);
    out
}

/// Write an image in canonical segment order
pub fn write_to<W: Write>(w: &mut W, image: &ImageRecord) -> io::Result<()> {
    w.write_all(&encode(image))
}

fn encoded_len(image: &ImageRecord) -> usize {
    let segments = [&image.comment, &image.start_of_frame, &image.start_of_scan]
        .into_iter()
        .chain(&image.quantization_tables)
        .chain(&image.huffman_tables);
    let body: usize = segments.map(|p| p.len() + 4).sum();
    START_MARKER.len() + body + image.scan_data.len() + END_MARKER.len()
}
