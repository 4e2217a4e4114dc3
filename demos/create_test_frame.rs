use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_polygon_mut};
use imageproc::point::Point;
use imageproc::rect::Rect;

fn main() {
    let mut img = RgbImage::from_pixel(640, 400, Rgb([120, 120, 120]));

    // Axis-aligned green cube
    draw_filled_rect_mut(&mut img, Rect::at(100, 220).of_size(60, 60), Rgb([0, 200, 180]));

    // Yellow cylinder seen from above, tilted 45 degrees
    draw_polygon_mut(
        &mut img,
        &[Point::new(320, 200), Point::new(360, 240), Point::new(320, 280), Point::new(280, 240)],
        Rgb([255, 220, 130]),
    );

    // Long red plus bar
    draw_filled_rect_mut(&mut img, Rect::at(460, 300).of_size(120, 40), Rgb([230, 30, 30]));

    img.save("test_frame.png").unwrap();
    println!("Created test_frame.png (640x400 tabletop scene)");
}
