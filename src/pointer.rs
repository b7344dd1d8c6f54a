use crate::geometry::{Point2D, Size2D};

/// On-screen bounding box of the canvas element (CSS pixels).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasBounds {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PointerInput {
    /// Offset from the canvas origin, as mouse events report it.
    Mouse { offset: Point2D },
    /// Client coordinates of the active touches; only the first is used.
    Touch { touches: Vec<Point2D> },
}

/// Map a pointer position in displayed pixels into the canvas' internal pixel space.
/// Returns None when the event carries no usable coordinate or the canvas isn't laid out.
pub fn map_to_canvas(input: &PointerInput, bounds: &CanvasBounds, internal: Size2D) -> Option<Point2D> {
    if !(bounds.width > 0.0 && bounds.height > 0.0) {
        return None;
    }

    let scale_x = internal.width / bounds.width;
    let scale_y = internal.height / bounds.height;

    let offset = match input {
        PointerInput::Mouse { offset } => *offset,
        PointerInput::Touch { touches } => {
            let first = touches.first()?;
            Point2D::new(first.x - bounds.left, first.y - bounds.top)
        }
    };

    if !(offset.x.is_finite() && offset.y.is_finite()) {
        return None;
    }

    Some(Point2D::new(offset.x * scale_x, offset.y * scale_y))
}
