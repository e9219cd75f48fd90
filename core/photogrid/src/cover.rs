//! "Cover" fitting: fill a destination rectangle completely, preserving the
//! source aspect ratio and cropping the excess on the longer axis.

use image::imageops::FilterType;
use image::{DynamicImage, Rgba, RgbaImage};

use crate::layout::DestRect;
use crate::store::Offset;

/// Sub-rectangle of the source image, in source pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceRect {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

/// Source crop that exactly fills a `dest_w × dest_h` box, positioned by `bias`.
///
/// `bias` works like CSS `background-position` percentages: `{50, 50}`
/// crops symmetrically, `{0, 0}` keeps the top-left corner, `{100, 100}`
/// keeps the bottom-right.
pub fn cover_source_rect(src_w: u32, src_h: u32, dest_w: f64, dest_h: f64, bias: Offset) -> SourceRect {
    let (iw, ih) = (src_w as f64, src_h as f64);
    let source_ratio = iw / ih;
    let dest_ratio = dest_w / dest_h;

    if source_ratio > dest_ratio {
        // Source relatively wider: keep full height, trim the sides.
        let height = ih;
        let width = height * dest_ratio;
        SourceRect {
            x: (iw - width) * (bias.x / 100.0),
            y: 0.0,
            width,
            height,
        }
    } else {
        let width = iw;
        let height = width / dest_ratio;
        SourceRect {
            x: 0.0,
            y: (ih - height) * (bias.y / 100.0),
            width,
            height,
        }
    }
}

/// Symmetric cover crop, identical to CSS `background-size: cover` with a
/// centred position.
pub fn centered_source_rect(src_w: u32, src_h: u32, dest_w: f64, dest_h: f64) -> SourceRect {
    cover_source_rect(src_w, src_h, dest_w, dest_h, Offset::CENTER)
}

/// Resample the cover crop of `image` into a new `width × height` tile.
///
/// Returns `None` for a degenerate destination or source.
pub fn render_cover_tile(
    image: &DynamicImage,
    width: u32,
    height: u32,
    bias: Offset,
    filter: FilterType,
) -> Option<RgbaImage> {
    let (src_w, src_h) = (image.width(), image.height());
    if width == 0 || height == 0 || src_w == 0 || src_h == 0 {
        return None;
    }

    let rect = cover_source_rect(src_w, src_h, width as f64, height as f64, bias);
    let scale = width as f64 / rect.width;

    // Widen the crop to whole source pixels, scale that window uniformly, then
    // cut the destination out at the sub-pixel origin. Cropping at rounded
    // source coordinates instead would stretch small sources.
    let x0 = (rect.x.floor().max(0.0) as u32).min(src_w - 1);
    let y0 = (rect.y.floor().max(0.0) as u32).min(src_h - 1);
    let x1 = ((rect.x + rect.width).ceil() as u32).clamp(x0 + 1, src_w);
    let y1 = ((rect.y + rect.height).ceil() as u32).clamp(y0 + 1, src_h);

    let origin_x = ((rect.x - x0 as f64) * scale).round().max(0.0) as u32;
    let origin_y = ((rect.y - y0 as f64) * scale).round().max(0.0) as u32;
    let window_w = (((x1 - x0) as f64 * scale).round() as u32).max(origin_x + width);
    let window_h = (((y1 - y0) as f64 * scale).round() as u32).max(origin_y + height);

    let window = image
        .crop_imm(x0, y0, x1 - x0, y1 - y0)
        .resize_exact(window_w, window_h, filter);
    Some(window.crop_imm(origin_x, origin_y, width, height).to_rgba8())
}

/// Draw `image` cover-fitted into `dest` on `canvas`, alpha-blending over
/// what is already there.
pub fn draw_cover(canvas: &mut RgbaImage, image: &DynamicImage, dest: DestRect, bias: Offset, filter: FilterType) {
    if let Some(tile) = render_cover_tile(image, dest.width, dest.height, bias, filter) {
        blend_onto(canvas, &tile, dest.x as i64, dest.y as i64);
    }
}

/// Source-over composite of `tile` onto `canvas` with its top-left corner at
/// `(x, y)`, clipped to the canvas. Opaque pixels are copied verbatim.
pub(crate) fn blend_onto(canvas: &mut RgbaImage, tile: &RgbaImage, x: i64, y: i64) {
    let (canvas_w, canvas_h) = (canvas.width() as i64, canvas.height() as i64);
    for (tx, ty, pixel) in tile.enumerate_pixels() {
        let (cx, cy) = (x + tx as i64, y + ty as i64);
        if cx < 0 || cy < 0 || cx >= canvas_w || cy >= canvas_h {
            continue;
        }
        let [r, g, b, a] = pixel.0;
        match a {
            0 => {}
            255 => canvas.put_pixel(cx as u32, cy as u32, *pixel),
            _ => {
                let under = canvas.get_pixel_mut(cx as u32, cy as u32);
                let fg_a = a as f32 / 255.0;
                let bg_a = under.0[3] as f32 / 255.0 * (1.0 - fg_a);
                let out_a = fg_a + bg_a;
                let mix = |fg: u8, bg: u8| ((fg as f32 * fg_a + bg as f32 * bg_a) / out_a).round() as u8;
                *under = Rgba([
                    mix(r, under.0[0]),
                    mix(g, under.0[1]),
                    mix(b, under.0[2]),
                    (out_a * 255.0).round() as u8,
                ]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn wide_source_into_square_trims_sides() {
        let rect = centered_source_rect(400, 200, 100.0, 100.0);
        assert!((rect.width - 200.0).abs() < EPS);
        assert!((rect.height - 200.0).abs() < EPS);
        assert!((rect.x - 100.0).abs() < EPS);
        assert_eq!(rect.y, 0.0);
    }

    #[test]
    fn tall_source_into_landscape_trims_top_and_bottom() {
        let rect = centered_source_rect(300, 600, 200.0, 100.0);
        assert!((rect.width - 300.0).abs() < EPS);
        assert!((rect.height - 150.0).abs() < EPS);
        assert_eq!(rect.x, 0.0);
        assert!((rect.y - 225.0).abs() < EPS);
    }

    #[test]
    fn matching_aspect_uses_whole_source() {
        let rect = centered_source_rect(640, 480, 320.0, 240.0);
        assert_eq!(
            rect,
            SourceRect {
                x: 0.0,
                y: 0.0,
                width: 640.0,
                height: 480.0
            }
        );
    }

    #[test]
    fn bias_moves_crop_to_edges() {
        let start = cover_source_rect(400, 200, 100.0, 100.0, Offset { x: 0.0, y: 50.0 });
        assert_eq!(start.x, 0.0);
        let end = cover_source_rect(400, 200, 100.0, 100.0, Offset { x: 100.0, y: 50.0 });
        assert!((end.x + end.width - 400.0).abs() < EPS);
    }

    #[test]
    fn tile_has_requested_size() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(37, 91, Rgba([10, 20, 30, 255])));
        let tile = render_cover_tile(&img, 64, 48, Offset::CENTER, FilterType::CatmullRom).unwrap();
        assert_eq!(tile.dimensions(), (64, 48));
        assert_eq!(tile.get_pixel(32, 24), &Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn degenerate_destination_draws_nothing() {
        let img = DynamicImage::ImageRgba8(RgbaImage::new(8, 8));
        assert!(render_cover_tile(&img, 0, 10, Offset::CENTER, FilterType::Triangle).is_none());
    }

    #[test]
    fn panned_crop_shows_chosen_half() {
        // Left half red, right half blue; a square crop panned fully left is all red.
        let mut src = RgbaImage::from_pixel(20, 10, Rgba([0, 0, 255, 255]));
        for y in 0..10 {
            for x in 0..10 {
                src.put_pixel(x, y, Rgba([255, 0, 0, 255]));
            }
        }
        let img = DynamicImage::ImageRgba8(src);
        let tile = render_cover_tile(&img, 10, 10, Offset { x: 0.0, y: 50.0 }, FilterType::Nearest).unwrap();
        assert!(tile.pixels().all(|p| *p == Rgba([255, 0, 0, 255])));
    }

    #[test]
    fn small_source_keeps_its_aspect_when_upscaled() {
        // 10×7 source, one colour per column, into 100×99: each visible
        // column should land about 100 / 7.07 ≈ 14.1 destination pixels wide.
        let src = RgbaImage::from_fn(10, 7, |x, _| Rgba([x as u8 * 20, 0, 0, 255]));
        let img = DynamicImage::ImageRgba8(src);
        let tile = render_cover_tile(&img, 100, 99, Offset::CENTER, FilterType::Nearest).unwrap();

        let mut widths = [0u32; 10];
        for x in 0..100 {
            widths[(tile.get_pixel(x, 50).0[0] / 20) as usize] += 1;
        }
        assert_eq!(widths[0], 0);
        assert_eq!(widths[9], 0);
        for (column, width) in widths.iter().enumerate().take(8).skip(2) {
            assert!((14..=15).contains(width), "column {column} drawn {width} px wide");
        }
        assert_eq!(widths.iter().sum::<u32>(), 100);
    }

    #[test]
    fn cover_tile_matches_destination_for_large_ratios() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(3, 500, Rgba([7, 8, 9, 255])));
        let tile = render_cover_tile(&img, 300, 20, Offset::CENTER, FilterType::Triangle).unwrap();
        assert_eq!(tile.dimensions(), (300, 20));
        assert!(tile.pixels().all(|p| *p == Rgba([7, 8, 9, 255])));
    }

    #[test]
    fn translucent_pixels_blend_over_white() {
        let mut canvas = RgbaImage::from_pixel(2, 1, Rgba([255, 255, 255, 255]));
        let tile = RgbaImage::from_pixel(1, 1, Rgba([255, 0, 0, 128]));
        blend_onto(&mut canvas, &tile, 1, 0);
        let pixel = canvas.get_pixel(1, 0);
        assert_eq!(pixel.0[0], 255);
        assert!((pixel.0[1] as i16 - 127).abs() <= 1);
        assert_eq!(pixel.0[3], 255);
        assert_eq!(canvas.get_pixel(0, 0), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn blend_clips_negative_origin() {
        let mut canvas = RgbaImage::from_pixel(4, 4, Rgba([255, 255, 255, 255]));
        let tile = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
        blend_onto(&mut canvas, &tile, -2, -2);
        assert_eq!(canvas.get_pixel(1, 1), &Rgba([0, 0, 0, 255]));
        assert_eq!(canvas.get_pixel(2, 2), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn draw_cover_blends_onto_canvas_at_dest() {
        let mut canvas = RgbaImage::from_pixel(10, 10, Rgba([255, 255, 255, 255]));
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255])));
        let dest = DestRect {
            x: 5,
            y: 0,
            width: 5,
            height: 10,
        };
        draw_cover(&mut canvas, &img, dest, Offset::CENTER, FilterType::Triangle);
        assert_eq!(canvas.get_pixel(4, 5), &Rgba([255, 255, 255, 255]));
        assert_eq!(canvas.get_pixel(5, 5), &Rgba([0, 0, 0, 255]));
        assert_eq!(canvas.get_pixel(9, 9), &Rgba([0, 0, 0, 255]));
    }
}
