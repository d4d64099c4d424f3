use align_imgproc::*;
use image::{GrayImage, Luma};
use nalgebra::Matrix3;

fn checkerboard(width: u32, height: u32, cell: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        if ((x / cell) + (y / cell)) % 2 == 0 {
            Luma([220])
        } else {
            Luma([30])
        }
    })
}

#[test]
fn test_resize_functional() {
    let mut img = GrayImage::new(100, 100);
    img.put_pixel(50, 50, Luma([255]));

    let up = resize(&img, 200, 200, Interpolation::Linear);
    assert_eq!(up.width(), 200);
    assert_eq!(up.height(), 200);

    let down = resize(&img, 50, 50, Interpolation::Linear);
    assert_eq!(down.width(), 50);
    assert_eq!(down.height(), 50);
}

#[test]
fn test_geometry_warp_identity() {
    let img = checkerboard(20, 12, 3);
    let warped = warp_perspective(&img, &Matrix3::identity(), 20, 12);
    assert_eq!(warped, img);
}

#[test]
fn test_warp_is_deterministic() {
    let img = checkerboard(40, 40, 5);
    let m = Matrix3::new(0.98, 0.05, 1.3, -0.04, 1.01, -2.2, 1e-4, -5e-5, 1.0);
    let a = warp_perspective(&img, &m, 40, 40);
    let b = warp_perspective(&img, &m, 40, 40);
    assert_eq!(a, b);
}

#[test]
fn test_warp_translation_round_trip_interior() {
    let img = checkerboard(30, 30, 4);
    let forward = Matrix3::new(1.0, 0.0, -3.0, 0.0, 1.0, 2.0, 0.0, 0.0, 1.0);
    let back = forward.try_inverse().unwrap();
    let moved = warp_perspective(&img, &forward, 30, 30);
    let restored = warp_perspective(&moved, &back, 30, 30);
    for y in 3..27 {
        for x in 4..26 {
            assert_eq!(restored.get_pixel(x, y), img.get_pixel(x, y));
        }
    }
}

#[test]
fn test_blur_then_downscale() {
    let img = checkerboard(64, 48, 8);
    let blurred = gaussian_blur(&img, 1.0);
    let half = downscale(&blurred, 0.5).unwrap();
    assert_eq!((half.width(), half.height()), (32, 24));
    let min = half.pixels().map(|p| p[0]).min().unwrap();
    let max = half.pixels().map(|p| p[0]).max().unwrap();
    assert!(min >= 30 && max <= 220);
}

#[test]
fn test_validate_image_size() {
    assert!(validate_image_size(0, 10).is_err());
    assert!(validate_image_size(10, 10).is_ok());
}
