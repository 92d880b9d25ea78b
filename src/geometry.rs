// SPDX-License-Identifier: GPL-3.0-only

//! Plain geometry values for the preview compositing path.
//!
//! The blit destination is computed here: the largest rectangle that
//! preserves the source's aspect ratio inside a destination rectangle,
//! floored to whole units so the copy never straddles a texel boundary.

/// A width/height pair in whatever unit the caller is working in
/// (logical points or backing pixels).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const ZERO: Size = Size {
        width: 0.0,
        height: 0.0,
    };

    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Scale both dimensions by `n` (logical size × backing scale → pixels).
    pub fn multiply(self, n: f32) -> Self {
        Self::new(self.width * n, self.height * n)
    }

    /// The largest size with this aspect ratio that fits inside `rect`.
    ///
    /// Dimensions are floored; a degenerate (zero-area) source collapses
    /// to [`Size::ZERO`].
    pub fn scale_fit(self, rect: Rect) -> Size {
        if self.width <= 0.0 || self.height <= 0.0 {
            return Size::ZERO;
        }
        let ratio = (rect.size.width / self.width).min(rect.size.height / self.height);
        Size::new((self.width * ratio).floor(), (self.height * ratio).floor())
    }
}

/// A 2D coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    pub fn new(origin: Point, size: Size) -> Self {
        Self { origin, size }
    }

    /// A rectangle of the given size anchored at the coordinate-space zero.
    pub fn from_size(size: Size) -> Self {
        Self {
            origin: Point::ZERO,
            size,
        }
    }

    pub fn max_x(&self) -> f32 {
        self.origin.x + self.size.width
    }

    pub fn max_y(&self) -> f32 {
        self.origin.y + self.size.height
    }

    /// Fit this rectangle's size inside `rect` and center the result.
    ///
    /// Centering is computed against `rect`'s max edges, so the result is
    /// only visually centered when `rect`'s origin is zero; a non-zero
    /// origin shifts the result toward zero by half the origin. Callers
    /// that need true centering must normalize the destination first.
    pub fn scale_fit(self, rect: Rect) -> Rect {
        let size = self.size.scale_fit(rect);
        let center = Point::new(
            (rect.max_x() - size.width) * 0.5,
            (rect.max_y() - size.height) * 0.5,
        );
        Rect::new(center, size)
    }
}
