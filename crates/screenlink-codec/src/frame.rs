//! Raw and decoded frame types.

use bytes::Bytes;

/// A raw captured video frame handed to the encoder.
///
/// The pixel layout is whatever the capture collaborator produces
/// (typically packed BGRA); the encoder implementation is responsible
/// for any colorspace conversion.
#[derive(Debug, Clone)]
pub struct RawFrame {
    /// Pixel data.
    pub data: Bytes,

    /// Frame width in pixels.
    pub width: u32,

    /// Frame height in pixels.
    pub height: u32,

    /// Monotonically increasing capture sequence number.
    pub sequence: u64,
}

impl RawFrame {
    /// Create a new raw frame.
    pub fn new(data: Bytes, width: u32, height: u32, sequence: u64) -> Self {
        Self {
            data,
            width,
            height,
            sequence,
        }
    }
}

/// A decoded picture in planar YUV 4:2:0 layout.
///
/// Three planes (Y, U, V) with independent strides, as handed to the
/// render surface collaborator.
#[derive(Debug, Clone)]
pub struct DecodedPicture {
    /// Luma plane.
    pub y: Bytes,

    /// Chroma U plane.
    pub u: Bytes,

    /// Chroma V plane.
    pub v: Bytes,

    /// Bytes per row for each plane, Y/U/V order.
    pub strides: [usize; 3],

    /// Picture width in pixels.
    pub width: u32,

    /// Picture height in pixels.
    pub height: u32,
}

impl DecodedPicture {
    /// Expected plane sizes for the given height and strides.
    pub fn plane_sizes(height: u32, strides: [usize; 3]) -> [usize; 3] {
        let h = height as usize;
        let chroma_rows = h.div_ceil(2);
        [strides[0] * h, strides[1] * chroma_rows, strides[2] * chroma_rows]
    }

    /// Validate that the plane buffers match the declared geometry.
    pub fn is_valid(&self) -> bool {
        let expected = Self::plane_sizes(self.height, self.strides);
        self.y.len() >= expected[0] && self.u.len() >= expected[1] && self.v.len() >= expected[2]
    }
}
