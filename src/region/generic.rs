//! Generic region decoding (6.2): rebuild a bitmap pixel-by-pixel from a
//! causal neighborhood of already-decoded pixels.
//!
//! "The generic region decoding procedure... reconstructs a bitmap of size
//! GBW by GBH from an arithmetically or MMR coded bit stream." (6.2)

use std::io::{Read, Seek};

use crate::arithmetic_decoder::ArithmeticDecoder;
use crate::bitmap::Bitmap;
use crate::context::ContextMemory;
use crate::error::{DecodeError, Result};
use crate::reader::BitReader;

/// One of the four fixed generic-region neighborhood templates (Figures 3-6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenericTemplate {
    /// 16 context bits, 4 adaptive pixels (Figure 3).
    Template0,
    /// 13 context bits, 1 adaptive pixel (Figure 4).
    Template1,
    /// 10 context bits, 1 adaptive pixel (Figure 5).
    Template2,
    /// 10 context bits, 1 adaptive pixel (Figure 6).
    Template3,
}

impl GenericTemplate {
    /// Number of context bits this template's neighborhood produces.
    pub fn context_bits(self) -> u32 {
        match self {
            Self::Template0 => 16,
            Self::Template1 => 13,
            Self::Template2 | Self::Template3 => 10,
        }
    }

    /// How many adaptive (AT) pixel overrides this template accepts (6.2.5.3).
    pub fn num_at_pixels(self) -> usize {
        match self {
            Self::Template0 => 4,
            Self::Template1 | Self::Template2 | Self::Template3 => 1,
        }
    }

    /// The default AT pixel positions (Table 6).
    pub fn default_at_pixels(self) -> &'static [(i8, i8)] {
        match self {
            Self::Template0 => &[(3, -1), (-3, -1), (2, -2), (-2, -2)],
            Self::Template1 => &[(3, -1)],
            Self::Template2 | Self::Template3 => &[(2, -1)],
        }
    }

    /// The fixed (non-adaptive) neighborhood offsets of Figures 3-6.
    fn fixed_offsets(self) -> &'static [(i32, i32)] {
        match self {
            Self::Template0 => &[
                (-1, -2), (0, -2), (1, -2),
                (-2, -1), (-1, -1), (0, -1), (1, -1), (2, -1),
                (-4, 0), (-3, 0), (-2, 0), (-1, 0),
            ],
            Self::Template1 => &[
                (-1, -2), (0, -2), (1, -2), (2, -2),
                (-2, -1), (-1, -1), (0, -1), (1, -1), (2, -1),
                (-3, 0), (-2, 0), (-1, 0),
            ],
            Self::Template2 => &[
                (-1, -2), (0, -2), (1, -2),
                (-2, -1), (-1, -1), (0, -1), (1, -1),
                (-2, 0), (-1, 0),
            ],
            Self::Template3 => &[
                (-3, -1), (-2, -1), (-1, -1), (0, -1), (1, -1),
                (-4, 0), (-3, 0), (-2, 0), (-1, 0),
            ],
        }
    }

    /// The SLTP pseudo-pixel context used by typical prediction (Figures 8-11).
    /// This value is fixed per template regardless of the AT pixel positions.
    fn sltp_context(self) -> u32 {
        match self {
            Self::Template0 => 0x9B25,
            Self::Template1 => 0x0795,
            Self::Template2 => 0x00E5,
            Self::Template3 => 0x0195,
        }
    }

    /// The full context-formation order (6.2.5.3): the fixed neighborhood
    /// merged with the AT pixels at their actual positions, sorted in raster
    /// order (row, then column) from most to least significant bit. AT pixel
    /// placement is run-time data, but its position in the context still
    /// follows this raster order, just as the fixed pixels do.
    fn context_offsets(self, at_pixels: &[(i8, i8)]) -> Vec<(i32, i32)> {
        let mut offsets: Vec<(i32, i32)> =
            self.fixed_offsets().iter().copied().collect();
        offsets.extend(at_pixels.iter().map(|&(x, y)| (x as i32, y as i32)));
        offsets.sort_by_key(|&(x, y)| (y, x));
        offsets
    }
}

/// Parameters driving one generic-region decode (6.2.5.3, 6.2.5.7).
#[derive(Debug, Clone)]
pub struct GenericRegionParams {
    /// `GBTEMPLATE`.
    pub template: GenericTemplate,
    /// `GBAT1..4`: adaptive pixel positions. Length must equal
    /// `template.num_at_pixels()`.
    pub at_pixels: Vec<(i8, i8)>,
    /// `TPGDON`.
    pub tpgdon: bool,
}

/// Decode a standalone generic region segment's arithmetic-coded data into a
/// fresh `width x height` bitmap (6.2.5, MMR branch excluded — see §1).
pub fn decode_generic_region<R: Read + Seek>(
    reader: &mut BitReader<R>,
    width: u32,
    height: u32,
    params: &GenericRegionParams,
    skip: Option<&Bitmap>,
    mmr: bool,
) -> Result<Bitmap> {
    if mmr {
        #[cfg(feature = "logging")]
        log::warn!("rejecting MMR-coded generic region ({width}x{height})");
        return Err(DecodeError::Unsupported("MMR generic region decoding"));
    }

    #[cfg(feature = "logging")]
    log::debug!("decoding generic region {width}x{height}, template {:?}", params.template);

    let mut bitmap = Bitmap::new(width, height);
    let mut ad = ArithmeticDecoder::new(reader)?;
    let mut cx = ContextMemory::new(1 << params.template.context_bits());
    decode_into(&mut bitmap, &mut ad, &mut cx, params, skip)?;
    Ok(bitmap)
}

/// Decode one generic-region bitplane into `bitmap` using a caller-supplied
/// arithmetic decoder and context memory.
///
/// The halftone decoder's grayscale index planes (Annex C.5) are each a
/// separate invocation of this same procedure sharing one continuous
/// arithmetic-coded bit stream and one context array across planes, so the
/// decoder/context state must be threaded through rather than recreated.
pub fn decode_into<R: Read + Seek>(
    bitmap: &mut Bitmap,
    ad: &mut ArithmeticDecoder<'_, R>,
    cx: &mut ContextMemory,
    params: &GenericRegionParams,
    skip: Option<&Bitmap>,
) -> Result<()> {
    let width = bitmap.width();
    let height = bitmap.height();
    let offsets = params.template.context_offsets(&params.at_pixels);

    // "1) Set: LTP = 0" (6.2.5.7)
    let mut ltp = false;

    for y in 0..height {
        if params.tpgdon {
            let sltp_bit = ad.decode(cx, params.template.sltp_context() as usize)?;
            // "Set: LTP = LTP XOR SLTP" (6.2.5.7)
            ltp = ltp != (sltp_bit != 0);
        }

        if ltp {
            // "If LTP = 1 then set every pixel of the current row of GBREG
            // equal to the corresponding pixel of the row immediately
            // above." (6.2.5.7)
            if y > 0 {
                for x in 0..width {
                    let above = bitmap.get_pixel(x, y - 1);
                    bitmap.set_pixel(x, y, above);
                }
            }
            continue;
        }

        for x in 0..width {
            if let Some(skip) = skip {
                if skip.get_pixel(x, y) {
                    bitmap.set_pixel(x, y, false);
                    continue;
                }
            }

            let context = gather_context(bitmap, &offsets, x as i32, y as i32);
            let bit = ad.decode(cx, context as usize)?;
            bitmap.set_pixel(x, y, bit != 0);
        }
    }

    Ok(())
}

#[inline]
fn gather_context(bitmap: &Bitmap, offsets: &[(i32, i32)], x: i32, y: i32) -> u32 {
    let mut context = 0u32;
    for &(dx, dy) in offsets {
        let (px, py) = (x + dx, y + dy);
        let bit = if px < 0 || py < 0 {
            false
        } else {
            bitmap.get_pixel(px as u32, py as u32)
        };
        context = (context << 1) | (bit as u32);
    }
    context
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn params(template: GenericTemplate, tpgdon: bool) -> GenericRegionParams {
        GenericRegionParams {
            at_pixels: template.default_at_pixels().to_vec(),
            template,
            tpgdon,
        }
    }

    #[test]
    fn decoded_region_has_requested_dimensions() {
        let data: &[u8] = &[0x00, 0x02, 0x00, 0x51, 0x00, 0x00, 0x00, 0xC0, 0xFF, 0xAC];
        let mut reader = BitReader::new(Cursor::new(data)).unwrap();
        let bmp =
            decode_generic_region(&mut reader, 8, 4, &params(GenericTemplate::Template2, false), None, false)
                .unwrap();
        assert_eq!(bmp.width(), 8);
        assert_eq!(bmp.height(), 4);
    }

    #[test]
    fn mmr_is_rejected() {
        let data: &[u8] = &[0x00];
        let mut reader = BitReader::new(Cursor::new(data)).unwrap();
        let err =
            decode_generic_region(&mut reader, 4, 4, &params(GenericTemplate::Template0, false), None, true)
                .unwrap_err();
        assert!(matches!(err, DecodeError::Unsupported(_)));
    }

    #[test]
    fn skip_bitmap_forces_pixels_to_zero() {
        let data: &[u8] = &[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF];
        let mut reader = BitReader::new(Cursor::new(data)).unwrap();
        let skip = Bitmap::filled(4, 4, true);
        let bmp = decode_generic_region(
            &mut reader,
            4,
            4,
            &params(GenericTemplate::Template2, false),
            Some(&skip),
            false,
        )
        .unwrap();
        for y in 0..4 {
            for x in 0..4 {
                assert!(!bmp.get_pixel(x, y));
            }
        }
    }

    #[test]
    fn context_offsets_sort_by_raster_order() {
        let offsets = GenericTemplate::Template0
            .context_offsets(GenericTemplate::Template0.default_at_pixels());
        assert_eq!(offsets.len(), 16);
        assert_eq!(offsets[0], (-2, -2));
        assert_eq!(offsets[15], (-1, 0));
    }
}
