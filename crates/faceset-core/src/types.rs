
/// Bounding box for a detected face, in frame pixel coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
}

impl BoundingBox {
    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Intersection-over-Union with another box.
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = (self.x + self.width).min(other.x + other.width);
        let y2 = (self.y + self.height).min(other.y + other.height);

        let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
        let union = self.area() + other.area() - inter;
        if union > 0.0 { inter / union } else { 0.0 }
    }
}

/// A face box snapped to the pixel grid of the frame it was detected in.
///
/// Coordinates may be negative or extend past the frame; clamping happens
/// when the box is turned into a crop region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl PixelBox {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// Round a detector box to the nearest pixel.
    pub fn from_bounding_box(bbox: &BoundingBox) -> Self {
        Self {
            x: bbox.x.round() as i32,
            y: bbox.y.round() as i32,
            width: bbox.width.round().max(0.0) as i32,
            height: bbox.height.round().max(0.0) as i32,
        }
    }

    /// Exclusive right edge, saturating for out-of-range detector output.
    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.width)
    }

    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.height)
    }
}

impl From<&BoundingBox> for PixelBox {
    fn from(bbox: &BoundingBox) -> Self {
        Self::from_bounding_box(bbox)
    }
}
