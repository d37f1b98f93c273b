//! Tests the geometric guarantees of the column band shift.

use rand::SeedableRng;
use rand::rngs::StdRng;
use veil_core::{Frame, PixelFormat};
use veil_scramble::{MAX_SHIFT, scramble_columns};

/// Encodes `column + 1` in the first byte and the row in the second.
fn coordinate_frame(width: u32, height: u32) -> Frame {
    let mut pixels = Vec::new();
    for y in 0..height {
        for x in 0..width {
            pixels.extend_from_slice(&[x as u8 + 1, y as u8, 7, 255]);
        }
    }
    Frame::new(width, height, PixelFormat::Bgrx, pixels).expect("frame should be valid")
}

#[test]
fn scramble_bounds_tests_sources_stay_within_shift_window() {
    let (width, height) = (97_u32, 13_u32);
    let frame = coordinate_frame(width, height);

    for seed in 0..8 {
        let mut rng = StdRng::seed_from_u64(seed);
        let scrambled = scramble_columns(&frame, &mut rng);
        assert_eq!(scrambled.width(), width);
        assert_eq!(scrambled.height(), height);
        assert_eq!(scrambled.format(), frame.format());

        for y in 0..height {
            for x in 0..width {
                let pixel = scrambled.pixel(x, y).expect("in bounds");
                if pixel == [0, 0, 0, 0] {
                    continue;
                }

                let source_x = i64::from(pixel[0]) - 1;
                assert!(source_x >= 0 && source_x < i64::from(width));
                assert!(
                    (source_x - i64::from(x)) >= -MAX_SHIFT && (source_x - i64::from(x)) < MAX_SHIFT,
                    "column {x} sourced from {source_x}"
                );
                assert_eq!(u32::from(pixel[1]), y, "pixels never move between rows");
            }
        }
    }
}

#[test]
fn scramble_bounds_tests_edge_columns_can_turn_black() {
    let frame = coordinate_frame(12, 1);
    let mut saw_black = false;

    for seed in 0..64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let scrambled = scramble_columns(&frame, &mut rng);
        saw_black |= (0..12).any(|x| scrambled.pixel(x, 0).expect("in bounds") == [0, 0, 0, 0]);
    }

    assert!(saw_black, "out-of-range sources must be filled with black");
}
