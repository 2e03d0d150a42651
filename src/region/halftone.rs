//! Halftone region decoding (6.6): a grid of pattern indices, themselves
//! decoded as Gray-coded bit-planes, painted onto an output bitmap.
//!
//! "The halftone region decoding procedure... uses a dictionary of
//! HNUMPATS... patterns, and places those patterns according to
//! grey-scale values decoded for a rectangular grid of points." (6.6.5)

use std::io::{Read, Seek};

use crate::arithmetic_decoder::ArithmeticDecoder;
use crate::bitmap::Bitmap;
use crate::blit::{CombinationOperator, blit};
use crate::context::ContextMemory;
use crate::error::{DecodeError, Result};
use crate::reader::BitReader;
use crate::region::generic::{GenericRegionParams, GenericTemplate, decode_into};

/// The halftone grid's placement, shared by skip-bitmap computation and
/// pattern rendering (6.6.5.1, 6.6.5.2, Annex C.5).
#[derive(Debug, Clone, Copy)]
pub struct HalftoneGrid {
    /// `HGW`: grid width, in cells.
    pub width: u32,
    /// `HGH`: grid height, in cells.
    pub height: u32,
    /// `HGX`: grid origin X, in pixels.
    pub x: i32,
    /// `HGY`: grid origin Y, in pixels.
    pub y: i32,
    /// `HRX`: 256 times the X component of the grid vector.
    pub vector_x: u16,
    /// `HRY`: 256 times the Y component of the grid vector.
    pub vector_y: u16,
}

/// Parameters driving one halftone-region decode (7.4.5, 6.6.5).
#[derive(Debug, Clone)]
pub struct HalftoneRegionParams {
    /// `HTEMPLATE`: the template used to code the index plane bitplanes.
    pub template: GenericTemplate,
    /// `HENABLESKIP`.
    pub enable_skip: bool,
    /// `HCOMBOP`: how placed patterns combine into the output bitmap.
    pub combination_operator: CombinationOperator,
    /// `HDEFPIXEL`: the output bitmap's initial fill.
    pub default_pixel: bool,
    /// The grid geometry.
    pub grid: HalftoneGrid,
}

/// Decode a halftone region's arithmetic-coded index planes and render the
/// referenced `patterns` into a fresh `width x height` bitmap.
///
/// `patterns` is the flattened, already-decoded pattern dictionary (`P` in
/// 6.6.5); pattern dictionary decoding itself is out of scope here.
pub fn decode_halftone_region<R: Read + Seek>(
    reader: &mut BitReader<R>,
    width: u32,
    height: u32,
    params: &HalftoneRegionParams,
    patterns: &[Bitmap],
    mmr: bool,
) -> Result<Bitmap> {
    if mmr {
        #[cfg(feature = "logging")]
        log::warn!("rejecting MMR-coded halftone region ({width}x{height})");
        return Err(DecodeError::Unsupported("MMR halftone region decoding"));
    }
    if patterns.is_empty() {
        return Err(DecodeError::CorruptedStream);
    }

    let grid = &params.grid;
    if (grid.width == 0 || grid.height == 0) && width > 0 && height > 0 {
        return Err(DecodeError::InvalidHeaderValue("halftone grid dimension"));
    }

    let bits_per_value = bits_for_pattern_count(patterns.len());

    #[cfg(feature = "logging")]
    log::debug!(
        "decoding halftone region {width}x{height}, grid {}x{}, {} patterns, {bits_per_value} bits/value",
        grid.width,
        grid.height,
        patterns.len(),
    );

    let skip = if params.enable_skip {
        Some(compute_skip_bitmap(grid, patterns, width, height))
    } else {
        None
    };

    let gray_values = if bits_per_value == 0 {
        vec![0u32; (grid.width * grid.height) as usize]
    } else {
        decode_gray_scale_planes(
            reader,
            grid.width,
            grid.height,
            bits_per_value,
            params.template,
            skip.as_ref(),
        )?
    };

    let mut output = Bitmap::filled(width, height, params.default_pixel);
    render_patterns(&mut output, &gray_values, grid, patterns, params.combination_operator)?;
    Ok(output)
}

fn bits_for_pattern_count(count: usize) -> u32 {
    if count <= 1 {
        0
    } else {
        (count as u32 - 1).ilog2() + 1
    }
}

/// Decode the Gray-coded bit-plane stack into a `grid.width x grid.height`
/// array of pattern indices (Annex C.5).
///
/// All bitplanes share one continuous arithmetic-coded stream and one
/// context array; the decoder is created once here and threaded through
/// each plane's generic-region decode.
fn decode_gray_scale_planes<R: Read + Seek>(
    reader: &mut BitReader<R>,
    width: u32,
    height: u32,
    bits_per_value: u32,
    template: GenericTemplate,
    skip: Option<&Bitmap>,
) -> Result<Vec<u32>> {
    let mut ad = ArithmeticDecoder::new(reader)?;
    let mut cx = ContextMemory::new(1 << template.context_bits());
    let plane_params = GenericRegionParams {
        template,
        at_pixels: template.default_at_pixels().to_vec(),
        tpgdon: false,
    };

    let mut values = vec![0u32; (width * height) as usize];

    // "Decode GSPLANES[GSBPP - 1]" (C.5, step 1) - the most significant plane.
    let mut prev_plane = Bitmap::new(width, height);
    decode_into(&mut prev_plane, &mut ad, &mut cx, &plane_params, skip)?;
    accumulate_plane(&mut values, &prev_plane, bits_per_value - 1);

    // "While J >= 0: decode GSPLANES[J], then
    // GSPLANES[J] = GSPLANES[J+1] XOR GSPLANES[J]" (C.5, steps 2-3).
    for j in (0..bits_per_value - 1).rev() {
        let mut plane = Bitmap::new(width, height);
        decode_into(&mut plane, &mut ad, &mut cx, &plane_params, skip)?;

        for y in 0..height {
            for x in 0..width {
                let bit = plane.get_pixel(x, y) ^ prev_plane.get_pixel(x, y);
                plane.set_pixel(x, y, bit);
            }
        }

        accumulate_plane(&mut values, &plane, j);
        prev_plane = plane;
    }

    Ok(values)
}

fn accumulate_plane(values: &mut [u32], plane: &Bitmap, bit: u32) {
    for y in 0..plane.height() {
        for x in 0..plane.width() {
            if plane.get_pixel(x, y) {
                values[(y * plane.width() + x) as usize] |= 1 << bit;
            }
        }
    }
}

/// "HSKIP(mg, ng) = 1 if the pattern placed at grid cell (mg, ng) would not
/// overlap the region bitmap at all" (6.6.5.1).
fn compute_skip_bitmap(
    grid: &HalftoneGrid,
    patterns: &[Bitmap],
    region_width: u32,
    region_height: u32,
) -> Bitmap {
    let pattern_width = patterns[0].width() as i32;
    let pattern_height = patterns[0].height() as i32;

    let mut skip = Bitmap::new(grid.width, grid.height);
    for m in 0..grid.height {
        for n in 0..grid.width {
            let (x, y) = grid_coords(grid, m, n);
            let outside = x + pattern_width <= 0
                || x >= region_width as i32
                || y + pattern_height <= 0
                || y >= region_height as i32;
            if outside {
                skip.set_pixel(n, m, true);
            }
        }
    }
    skip
}

fn render_patterns(
    output: &mut Bitmap,
    gray_values: &[u32],
    grid: &HalftoneGrid,
    patterns: &[Bitmap],
    op: CombinationOperator,
) -> Result<()> {
    for m in 0..grid.height {
        for n in 0..grid.width {
            let index = gray_values[(m * grid.width + n) as usize] as usize;
            let pattern = patterns.get(index).ok_or(DecodeError::CorruptedStream)?;
            let (x, y) = grid_coords(grid, m, n);
            blit(output, pattern, x, y, op);
        }
    }
    Ok(())
}

/// `x = (HGX + mg*HRY + ng*HRX) >> 8`, `y = (HGY + mg*HRX - ng*HRY) >> 8`
/// (6.6.5.2) - the 1/256-pixel fixed-point grid-to-pixel conversion, using
/// an arithmetic (floor) shift.
#[inline]
fn grid_coords(grid: &HalftoneGrid, m: u32, n: u32) -> (i32, i32) {
    let (m, n) = (m as i64, n as i64);
    let (hrx, hry) = (grid.vector_x as i64, grid.vector_y as i64);
    let x = (grid.x as i64 + m * hry + n * hrx) >> 8;
    let y = (grid.y as i64 + m * hrx - n * hry) >> 8;
    (x as i32, y as i32)
}
