#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}
impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Point2D { x, y }
    }

    pub fn distance_to(&self, other: Point2D) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size2D {
    pub width: f64,
    pub height: f64,
}
impl Size2D {
    pub fn new(width: f64, height: f64) -> Self {
        Size2D { width, height }
    }

    pub fn from_pixels(width: u32, height: u32) -> Self {
        Size2D { width: width as f64, height: height as f64 }
    }

    /// width / height, or None when either side can't form a ratio
    pub fn aspect_ratio(&self) -> Option<f64> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if valid(self.width) && valid(self.height) {
            Some(self.width / self.height)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect2D {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}
impl Rect2D {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Rect2D { x, y, width, height }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Snap to whole pixels inside a `bounds_w` x `bounds_h` surface.
    /// The result always covers at least one pixel.
    pub fn to_pixel_rect(&self, bounds_w: u32, bounds_h: u32) -> PixelRect {
        let clamp = |v: f64, max: u32| (v.round().max(0.0) as u32).min(max);

        let x = clamp(self.x, bounds_w.saturating_sub(1));
        let y = clamp(self.y, bounds_h.saturating_sub(1));
        let right = clamp(self.right(), bounds_w).max(x + 1);
        let bottom = clamp(self.bottom(), bounds_h).max(y + 1);
        PixelRect { x, y, width: right - x, height: bottom - y }
    }
}

/// Integer rectangle in surface pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/*
    Centered, undistorted placement of a `src` sized image inside `dest`.
    A relatively wider destination pillarboxes (full height), anything else
    letterboxes (full width). Equal ratios letterbox with zero bands.
*/
pub fn aspect_fit(dest: Size2D, src: Size2D) -> Option<Rect2D> {
    let dest_ratio = dest.aspect_ratio()?;
    let src_ratio = src.aspect_ratio()?;

    if dest_ratio > src_ratio {
        let height = dest.height;
        let width = src.width * (dest.height / src.height);
        Some(Rect2D::new((dest.width - width) / 2.0, 0.0, width, height))
    } else {
        let width = dest.width;
        let height = src.height * (dest.width / src.width);
        Some(Rect2D::new(0.0, (dest.height - height) / 2.0, width, height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn square_source_in_wide_destination_pillarboxes() {
        let fit = aspect_fit(Size2D::new(1280.0, 720.0), Size2D::new(1024.0, 1024.0)).unwrap();
        assert_eq!(fit.height, 720.0);
        assert_eq!(fit.width, 720.0);
        assert_eq!(fit.x, 280.0);
        assert_eq!(fit.y, 0.0);
    }

    #[test]
    fn wide_source_letterboxes() {
        let fit = aspect_fit(Size2D::new(1280.0, 720.0), Size2D::new(2000.0, 500.0)).unwrap();
        assert_eq!(fit.width, 1280.0);
        assert_eq!(fit.height, 320.0);
        assert_eq!(fit.x, 0.0);
        assert_eq!(fit.y, 200.0);
    }

    #[test]
    fn pillarbox_margins_are_symmetric() {
        let dests = [(1280.0, 720.0), (1920.0, 1080.0), (400.0, 100.0), (333.0, 77.0)];
        let srcs = [(1.0, 1.0), (512.0, 768.0), (3.0, 7.0), (1000.0, 999.0)];
        for (dw, dh) in dests {
            for (sw, sh) in srcs {
                let dest = Size2D::new(dw, dh);
                let src = Size2D::new(sw, sh);
                if dw / dh <= sw / sh {
                    continue;
                }
                let fit = aspect_fit(dest, src).unwrap();
                assert!((fit.height - dh).abs() < EPS);
                assert!((fit.y).abs() < EPS);
                let left = fit.x;
                let right = dw - fit.right();
                assert!((left - right).abs() < EPS, "{dw}x{dh} <- {sw}x{sh}");
            }
        }
    }

    #[test]
    fn letterbox_margins_are_symmetric() {
        let dests = [(1280.0, 720.0), (720.0, 1280.0), (100.0, 100.0)];
        let srcs = [(1920.0, 1080.0), (4000.0, 1000.0), (16.0, 9.0), (100.0, 100.0)];
        for (dw, dh) in dests {
            for (sw, sh) in srcs {
                if dw / dh > sw / sh {
                    continue;
                }
                let fit = aspect_fit(Size2D::new(dw, dh), Size2D::new(sw, sh)).unwrap();
                assert!((fit.width - dw).abs() < EPS);
                assert!((fit.x).abs() < EPS);
                let top = fit.y;
                let bottom = dh - fit.bottom();
                assert!((top - bottom).abs() < EPS, "{dw}x{dh} <- {sw}x{sh}");
            }
        }
    }

    #[test]
    fn equal_ratio_covers_destination() {
        let fit = aspect_fit(Size2D::new(1280.0, 720.0), Size2D::new(640.0, 360.0)).unwrap();
        assert_eq!(fit, Rect2D::new(0.0, 0.0, 1280.0, 720.0));
    }

    #[test]
    fn degenerate_sizes_have_no_placement() {
        assert!(aspect_fit(Size2D::new(1280.0, 720.0), Size2D::new(0.0, 10.0)).is_none());
        assert!(aspect_fit(Size2D::new(0.0, 720.0), Size2D::new(10.0, 10.0)).is_none());
        assert!(aspect_fit(Size2D::new(1280.0, f64::NAN), Size2D::new(10.0, 10.0)).is_none());
    }

    #[test]
    fn pixel_rect_is_clamped_and_non_empty() {
        let rect = Rect2D::new(-3.2, 10.6, 2000.0, 0.1).to_pixel_rect(1280, 720);
        assert_eq!(rect.x, 0);
        assert_eq!(rect.y, 11);
        assert_eq!(rect.width, 1280);
        assert_eq!(rect.height, 1);
    }
}
