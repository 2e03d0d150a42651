//! End-to-end tests exercising the blitter and halftone region decoder
//! together, the way a region decoder exercises them in practice.

use jbig2_core::region::generic::GenericTemplate;
use jbig2_core::region::halftone::{HalftoneGrid, HalftoneRegionParams, decode_halftone_region};
use jbig2_core::{Bitmap, BitReader, CombinationOperator, blit};
use std::io::Cursor;

fn byte_bitmap(byte: u8) -> Bitmap {
    Bitmap::from_packed(8, 1, vec![byte])
}

#[test]
fn single_byte_blit_table_matches_every_operator() {
    let cases: [(CombinationOperator, u8); 6] = [
        (CombinationOperator::Or, 0x0F),
        (CombinationOperator::And, 0x08),
        (CombinationOperator::Xor, 0x07),
        (CombinationOperator::Xnor, 0xF8),
        (CombinationOperator::Replace, 0x0D),
        (CombinationOperator::Not, 0xF2),
    ];

    for (op, expected) in cases {
        let mut dst = byte_bitmap(0x0A);
        let src = byte_bitmap(0x0D);
        blit(&mut dst, &src, 0, 0, op);
        assert_eq!(dst.data()[0], expected, "operator {op:?}");
    }
}

#[test]
fn blit_clipping_leaves_destination_untouched() {
    let mut dst = Bitmap::filled(8, 8, true);
    let before = dst.data().to_vec();
    let src = Bitmap::filled(4, 4, false);

    blit(&mut dst, &src, 100, 100, CombinationOperator::Replace);

    assert_eq!(dst.data(), before.as_slice());
}

#[test]
fn xor_applied_twice_is_identity() {
    let mut dst = Bitmap::filled(16, 3, false);
    dst.set_pixel(2, 1, true);
    dst.set_pixel(9, 2, true);
    let before = dst.clone();

    let src = Bitmap::filled(16, 3, true);
    blit(&mut dst, &src, 0, 0, CombinationOperator::Xor);
    blit(&mut dst, &src, 0, 0, CombinationOperator::Xor);

    assert_eq!(dst, before);
}

#[test]
fn not_applied_twice_is_identity() {
    let mut dst = Bitmap::new(8, 1);
    let src = byte_bitmap(0b1011_0010);

    // blit(NOT) writes !src into dst, ignoring dst's own value.
    blit(&mut dst, &src, 0, 0, CombinationOperator::Not);
    let inverted = dst.clone();
    blit(&mut dst, &inverted, 0, 0, CombinationOperator::Not);

    assert_eq!(dst.data(), src.data());
}

#[test]
fn single_pattern_halftone_region_tiles_without_decoding_planes() {
    // N = 1 referenced pattern means bitsPerValue = 0 (6.6.5, corner case):
    // every grid cell uses pattern 0 and no bit-plane stream is consumed.
    let pattern = Bitmap::filled(4, 4, true);
    let mut reader = BitReader::new(Cursor::new(&[][..])).unwrap();

    let params = HalftoneRegionParams {
        template: GenericTemplate::Template0,
        enable_skip: false,
        combination_operator: CombinationOperator::Or,
        default_pixel: false,
        grid: HalftoneGrid { width: 2, height: 2, x: 0, y: 0, vector_x: 4 << 8, vector_y: 0 },
    };

    let region =
        decode_halftone_region(&mut reader, 8, 8, &params, &[pattern], false).unwrap();

    for y in 0..8 {
        for x in 0..8 {
            assert!(region.get_pixel(x, y), "expected pixel ({x},{y}) to be set");
        }
    }
}
