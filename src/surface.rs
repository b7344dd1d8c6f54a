use std::io::Cursor;

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageError, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use log::debug;

use crate::geometry::{aspect_fit, PixelRect, Point2D, Size2D};
use crate::stroke::{PenColor, Segment};

pub const CANVAS_WIDTH: u32 = 1280;
pub const CANVAS_HEIGHT: u32 = 720;

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// The drawing raster. Fixed size, starts out white, only ever repainted.
#[derive(Debug, Clone)]
pub struct Surface {
    pixels: RgbaImage,
}

impl Surface {
    pub fn new() -> Self {
        Surface { pixels: RgbaImage::from_pixel(CANVAS_WIDTH, CANVAS_HEIGHT, WHITE) }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn size(&self) -> Size2D {
        Size2D::from_pixels(self.width(), self.height())
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn full_rect(&self) -> PixelRect {
        PixelRect { x: 0, y: 0, width: self.width(), height: self.height() }
    }

    pub fn fill_white(&mut self) {
        for pixel in self.pixels.pixels_mut() {
            *pixel = WHITE;
        }
    }

    /// Stroke one segment with round caps. Returns the touched area, or None
    /// when the segment lies entirely off the surface.
    pub fn stroke_segment(&mut self, segment: &Segment, color: PenColor, width: f64) -> Option<PixelRect> {
        let radius = width / 2.0;
        let (from, to) = (segment.from, segment.to);

        let min_x = from.x.min(to.x) - radius - 1.0;
        let min_y = from.y.min(to.y) - radius - 1.0;
        let max_x = from.x.max(to.x) + radius + 1.0;
        let max_y = from.y.max(to.y) + radius + 1.0;

        let (w, h) = (self.width() as f64, self.height() as f64);
        if !(max_x >= 0.0 && max_y >= 0.0 && min_x < w && min_y < h) {
            return None;
        }

        let x0 = min_x.floor().max(0.0) as u32;
        let y0 = min_y.floor().max(0.0) as u32;
        let x1 = (max_x.ceil() as u32).min(self.width() - 1);
        let y1 = (max_y.ceil() as u32).min(self.height() - 1);

        let rgba = color.to_rgba();
        for y in y0..=y1 {
            for x in x0..=x1 {
                let center = Point2D::new(x as f64 + 0.5, y as f64 + 0.5);
                let coverage = (radius + 0.5 - distance_to_segment(center, from, to)).clamp(0.0, 1.0);
                if coverage > 0.0 {
                    blend(self.pixels.get_pixel_mut(x, y), rgba, coverage);
                }
            }
        }

        Some(PixelRect { x: x0, y: y0, width: x1 - x0 + 1, height: y1 - y0 + 1 })
    }

    /// Repaint white and draw `image` centered at its aspect-fit placement.
    /// Returns where the image landed.
    pub fn draw_background(&mut self, image: &RgbaImage) -> Option<PixelRect> {
        self.fill_white();

        let placement = aspect_fit(self.size(), Size2D::from_pixels(image.width(), image.height()))?;
        let rect = placement.to_pixel_rect(self.width(), self.height());
        debug!("background {}x{} placed at {:?}", image.width(), image.height(), rect);

        let scaled = imageops::resize(image, rect.width, rect.height, FilterType::Triangle);
        imageops::overlay(&mut self.pixels, &scaled, rect.x as i64, rect.y as i64);
        Some(rect)
    }

    /// The surface composited onto opaque white, PNG encoded.
    pub fn flatten_png(&self) -> Result<Vec<u8>, ImageError> {
        encode_png(DynamicImage::ImageRgb8(flatten_onto_white(&self.pixels)))
    }

    /// What the download action saves. Without a background it's the whole
    /// surface; with one, the region the background was fitted into, scaled
    /// back to the background's own resolution.
    pub fn export_image(&self, background: Option<(u32, u32)>) -> RgbaImage {
        let Some((bg_w, bg_h)) = background else {
            return self.pixels.clone();
        };
        let Some(placement) = aspect_fit(self.size(), Size2D::from_pixels(bg_w, bg_h)) else {
            return self.pixels.clone();
        };

        let rect = placement.to_pixel_rect(self.width(), self.height());
        let cropped = imageops::crop_imm(&self.pixels, rect.x, rect.y, rect.width, rect.height).to_image();
        if cropped.dimensions() == (bg_w, bg_h) {
            cropped
        } else {
            imageops::resize(&cropped, bg_w, bg_h, FilterType::Triangle)
        }
    }

    pub fn export_png(&self, background: Option<(u32, u32)>) -> Result<Vec<u8>, ImageError> {
        encode_png(DynamicImage::ImageRgba8(self.export_image(background)))
    }

    /// Row-major RGBA bytes of `rect`, ready for `putImageData`.
    pub fn region_rgba(&self, rect: &PixelRect) -> Vec<u8> {
        let raw = self.pixels.as_raw();
        let stride = self.width() as usize * 4;
        let row_len = rect.width as usize * 4;

        let mut bytes = Vec::with_capacity(row_len * rect.height as usize);
        for row in rect.y..rect.y + rect.height {
            let start = row as usize * stride + rect.x as usize * 4;
            bytes.extend_from_slice(&raw[start..start + row_len]);
        }
        bytes
    }
}

impl Default for Surface {
    fn default() -> Self {
        Surface::new()
    }
}

/// Composite a possibly transparent raster onto opaque white.
pub fn flatten_onto_white(image: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let Rgba([r, g, b, a]) = *image.get_pixel(x, y);
        let alpha = a as f64 / 255.0;
        let over_white = |c: u8| (c as f64 * alpha + 255.0 * (1.0 - alpha)).round() as u8;
        Rgb([over_white(r), over_white(g), over_white(b)])
    })
}

pub fn encode_png(image: DynamicImage) -> Result<Vec<u8>, ImageError> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

fn distance_to_segment(p: Point2D, a: Point2D, b: Point2D) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let d = dx * dx + dy * dy;
    if d == 0.0 {
        return p.distance_to(a);
    }

    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / d).clamp(0.0, 1.0);
    p.distance_to(Point2D::new(a.x + t * dx, a.y + t * dy))
}

// source-over with `coverage` as the source alpha
fn blend(dst: &mut Rgba<u8>, src: Rgba<u8>, coverage: f64) {
    let inv = 1.0 - coverage;
    for i in 0..3 {
        dst.0[i] = (src.0[i] as f64 * coverage + dst.0[i] as f64 * inv).round() as u8;
    }
    dst.0[3] = (255.0 * coverage + dst.0[3] as f64 * inv).round() as u8;
}
