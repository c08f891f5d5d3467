// ZoomTile -- Tile-based subsampling and zoom engine for huge images, written in Rust
//
// Copyright (c) 2024-2025 Martin van der Werff <github (at) newinnovations.nl>
//
// This file is part of ZoomTile.
//
// ZoomTile is free software: you can redistribute it and/or modify it under the terms of
// the GNU Affero General Public License as published by the Free Software Foundation, either
// version 3 of the License, or (at your option) any later version.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS "AS IS" AND ANY EXPRESS OR
// IMPLIED WARRANTIES, INCLUDING, BUT NOT LIMITED TO, THE IMPLIED WARRANTIES OF MERCHANTABILITY AND
// FITNESS FOR A PARTICULAR PURPOSE ARE DISCLAIMED. IN NO EVENT SHALL THE AUTHOR BE LIABLE FOR ANY
// DIRECT, INDIRECT, INCIDENTAL, SPECIAL, EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT
// LIMITED TO, PROCUREMENT OF SUBSTITUTE GOODS OR SERVICES; LOSS OF USE, DATA, OR PROFITS; OR
// BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY THEORY OF LIABILITY, WHETHER IN CONTRACT,
// STRICT LIABILITY, OR TORT (INCLUDING NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE USE
// OF THIS SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

use std::fmt::{Debug, Display};

/// Axis aligned rectangle, half-open: `[x0, x1) x [y0, y1)`.
#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub struct Rect<T> {
    pub x0: T,
    pub y0: T,
    pub x1: T,
    pub y1: T,
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size<T> {
    width: T,
    height: T,
}

#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub struct VectorPoint<T> {
    x: T,
    y: T,
}

/// Non-uniform scale, used for `ContentScale::FillBounds` where both axes
/// scale independently.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleFactor {
    pub x: f64,
    pub y: f64,
}

/// Normalizes a rotation to 0, 90, 180 or 270 degrees.
///
/// # Panics
/// Panics if `rotation` is not a multiple of 90. Callers are expected to
/// validate user input before it reaches the geometry layer.
pub fn normalize_rotation(rotation: i32) -> i32 {
    assert!(
        rotation % 90 == 0,
        "rotation must be a multiple of 90, got {rotation}"
    );
    rotation.rem_euclid(360)
}

fn min_of<T: PartialOrd>(a: T, b: T) -> T {
    if a <= b {
        a
    } else {
        b
    }
}

fn max_of<T: PartialOrd>(a: T, b: T) -> T {
    if a >= b {
        a
    } else {
        b
    }
}

impl<T> Size<T>
where
    T: Copy + Default + PartialOrd,
{
    pub const fn new(width: T, height: T) -> Self {
        Self { width, height }
    }

    pub fn width(&self) -> T {
        self.width
    }

    pub fn height(&self) -> T {
        self.height
    }

    /// A size is empty when either dimension is zero or negative.
    pub fn is_empty(&self) -> bool {
        self.width <= T::default() || self.height <= T::default()
    }

    /// Returns the size of the bounding box after rotating by `rotation` degrees.
    ///
    /// # Panics
    /// Panics if `rotation` is not a multiple of 90.
    pub fn rotate(&self, rotation: i32) -> Self {
        match normalize_rotation(rotation) {
            90 | 270 => Self::new(self.height, self.width),
            _ => *self,
        }
    }

    /// Sizes are rotated around their own origin, so rotating in a space is
    /// the same as a plain rotation. Kept for symmetry with points and rects.
    pub fn rotate_in_space(&self, rotation: i32) -> Self {
        self.rotate(rotation)
    }

    pub fn reverse_rotate_in_space(&self, rotation: i32) -> Self {
        self.rotate(360 - normalize_rotation(rotation))
    }
}

impl<T> VectorPoint<T>
where
    T: Default
        + Copy
        + std::ops::Add<Output = T>
        + std::ops::Sub<Output = T>
        + std::ops::Mul<Output = T>
        + std::ops::Div<Output = T>,
{
    pub const fn new(x: T, y: T) -> Self {
        Self { x, y }
    }

    pub fn x(&self) -> T {
        self.x
    }

    pub fn y(&self) -> T {
        self.y
    }

    /// Returns a new vector translated by the given offsets.
    pub fn translate(&self, offset: VectorPoint<T>) -> Self {
        Self::new(self.x + offset.x(), self.y + offset.y())
    }

    /// Returns a new vector scaled by the given scale.
    pub fn scale(&self, scale: T) -> Self {
        Self::new(self.x * scale, self.y * scale)
    }

    /// Returns a new vector unscaled by the given scale.
    pub fn unscale(&self, scale: T) -> Self {
        Self::new(self.x / scale, self.y / scale)
    }

    /// Returns the vector rotated by 180 degrees
    pub fn neg(&self) -> Self {
        Self::new(T::default() - self.x, T::default() - self.y)
    }

    /// Rotates clockwise (screen coordinates, y pointing down) around the origin.
    ///
    /// # Panics
    /// Panics if `rotation` is not a multiple of 90.
    pub fn rotate(&self, rotation: i32) -> Self {
        match normalize_rotation(rotation) {
            90 => Self::new(T::default() - self.y, self.x),
            180 => Self::new(T::default() - self.x, T::default() - self.y),
            270 => Self::new(self.y, T::default() - self.x),
            _ => Self::new(self.x, self.y),
        }
    }

    /// Expresses a point located in a space of `space_size` in the space
    /// obtained by rotating that space by `rotation` degrees. The origin of
    /// the rotated space is again its top-left corner.
    ///
    /// # Panics
    /// Panics if `rotation` is not a multiple of 90.
    pub fn rotate_in_space(&self, space_size: Size<T>, rotation: i32) -> Self {
        let (w, h) = (space_size.width, space_size.height);
        match normalize_rotation(rotation) {
            90 => Self::new(h - self.y, self.x),
            180 => Self::new(w - self.x, h - self.y),
            270 => Self::new(self.y, w - self.x),
            _ => *self,
        }
    }

    /// Inverse of [`rotate_in_space`](Self::rotate_in_space): `space_size` is
    /// the size of the original, unrotated space.
    pub fn reverse_rotate_in_space(&self, space_size: Size<T>, rotation: i32) -> Self
    where
        T: PartialOrd,
    {
        let rotation = normalize_rotation(rotation);
        let rotated_space = space_size.rotate(rotation);
        self.rotate_in_space(rotated_space, 360 - rotation)
    }
}

impl<T> std::ops::Add for VectorPoint<T>
where
    T: Copy + std::ops::Add<Output = T>,
{
    type Output = VectorPoint<T>;

    fn add(self, rhs: Self) -> Self::Output {
        Self::Output {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl<T> std::ops::AddAssign for VectorPoint<T>
where
    T: Copy + std::ops::Add<Output = T>,
{
    fn add_assign(&mut self, rhs: Self) {
        self.x = self.x + rhs.x;
        self.y = self.y + rhs.y;
    }
}

impl<T> std::ops::Sub for VectorPoint<T>
where
    T: Copy + std::ops::Sub<Output = T>,
{
    type Output = VectorPoint<T>;

    fn sub(self, rhs: Self) -> Self::Output {
        Self::Output {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl VectorPoint<f64> {
    pub fn distance(&self, other: &Self) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn times(&self, scale: ScaleFactor) -> Self {
        Self::new(self.x * scale.x, self.y * scale.y)
    }

    pub fn div(&self, scale: ScaleFactor) -> Self {
        Self::new(self.x / scale.x, self.y / scale.y)
    }

    /// Linear interpolation, `fraction` 0.0 returns `self`, 1.0 returns `other`
    pub fn lerp(&self, other: &Self, fraction: f64) -> Self {
        Self::new(
            self.x + (other.x - self.x) * fraction,
            self.y + (other.y - self.y) * fraction,
        )
    }
}

impl<T> Rect<T>
where
    T: Copy
        + PartialOrd
        + std::ops::Add<Output = T>
        + std::ops::Sub<Output = T>
        + std::ops::Mul<Output = T>
        + std::ops::Div<Output = T>
        + Debug
        + Default,
{
    /// Creates a new rectangle with the given coordinates.
    /// No validation is performed - the rectangle may be invalid or empty.
    pub const fn new(x0: T, y0: T, x1: T, y1: T) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn new_from_size(size: Size<T>) -> Self {
        Self::new(T::default(), T::default(), size.width, size.height)
    }

    pub fn from_points(p0: VectorPoint<T>, p1: VectorPoint<T>) -> Self {
        Self::new(
            min_of(p0.x, p1.x),
            min_of(p0.y, p1.y),
            max_of(p0.x, p1.x),
            max_of(p0.y, p1.y),
        )
    }

    /// Returns true if the rectangle is empty (has zero or negative area).
    /// An empty rectangle has x0 >= x1 or y0 >= y1.
    pub fn is_empty(&self) -> bool {
        self.x0 >= self.x1 || self.y0 >= self.y1
    }

    /// Returns true if the rectangle is valid (x0 <= x1 and y0 <= y1).
    /// A valid rectangle may still be empty if x0 == x1 or y0 == y1.
    pub fn is_valid(&self) -> bool {
        self.x0 <= self.x1 && self.y0 <= self.y1
    }

    /// Returns true if the point (x, y) is contained within the rectangle.
    /// Uses half-open intervals: [x0, x1) and [y0, y1).
    pub fn contains(&self, p: VectorPoint<T>) -> bool {
        if self.is_empty() {
            false
        } else {
            p.x >= self.x0 && p.x < self.x1 && p.y >= self.y0 && p.y < self.y1
        }
    }

    /// Returns true if both rectangles share at least some area.
    pub fn overlaps(&self, other: &Self) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.x0 < other.x1
            && other.x0 < self.x1
            && self.y0 < other.y1
            && other.y0 < self.y1
    }

    /// Returns the width of the rectangle.
    /// Returns zero for empty rectangles.
    pub fn width(&self) -> T {
        if self.is_empty() {
            T::default()
        } else {
            self.x1 - self.x0
        }
    }

    /// Returns the height of the rectangle.
    /// Returns zero for empty rectangles.
    pub fn height(&self) -> T {
        if self.is_empty() {
            T::default()
        } else {
            self.y1 - self.y0
        }
    }

    /// Returns the size of the rectangle.
    /// Returns zero for empty rectangles.
    pub fn size(&self) -> Size<T> {
        if self.is_empty() {
            Size::default()
        } else {
            Size {
                width: self.x1 - self.x0,
                height: self.y1 - self.y0,
            }
        }
    }

    /// Returns the union of this rectangle with another rectangle.
    /// If one rectangle is empty, returns the other rectangle.
    pub fn union(&self, other: &Self) -> Self {
        if self.is_empty() && other.is_empty() {
            Self::default()
        } else if self.is_empty() {
            *other
        } else if other.is_empty() {
            *self
        } else {
            Self::new(
                min_of(self.x0, other.x0),
                min_of(self.y0, other.y0),
                max_of(self.x1, other.x1),
                max_of(self.y1, other.y1),
            )
        }
    }

    /// Returns the intersection of this rectangle with another rectangle.
    /// Returns an empty rectangle if there is no intersection.
    pub fn intersect(&self, other: &Self) -> Self {
        Self::new(
            max_of(self.x0, other.x0),
            max_of(self.y0, other.y0),
            min_of(self.x1, other.x1),
            min_of(self.y1, other.y1),
        )
    }

    /// Returns a new rectangle scaled by the given scale.
    pub fn scale(&self, scale: T) -> Self {
        Self::new(
            self.x0 * scale,
            self.y0 * scale,
            self.x1 * scale,
            self.y1 * scale,
        )
    }

    /// Returns a new rectangle translated by the given offsets.
    pub fn translate(&self, offset: VectorPoint<T>) -> Self {
        Self::new(
            self.x0 + offset.x(),
            self.y0 + offset.y(),
            self.x1 + offset.x(),
            self.y1 + offset.y(),
        )
    }

    /// Rotates the rectangle around the origin.
    pub fn rotate(&self, rotation: i32) -> Self {
        if self.is_valid() {
            Self::from_points(
                VectorPoint::new(self.x0, self.y0).rotate(rotation),
                VectorPoint::new(self.x1, self.y1).rotate(rotation),
            )
        } else {
            Self::default()
        }
    }

    /// Expresses a rectangle located in a space of `space_size` in the rotated
    /// space. See [`VectorPoint::rotate_in_space`].
    pub fn rotate_in_space(&self, space_size: Size<T>, rotation: i32) -> Self {
        Self::from_points(
            self.point0().rotate_in_space(space_size, rotation),
            self.point1().rotate_in_space(space_size, rotation),
        )
    }

    /// Inverse of [`rotate_in_space`](Self::rotate_in_space), `space_size`
    /// being the size of the unrotated space.
    pub fn reverse_rotate_in_space(&self, space_size: Size<T>, rotation: i32) -> Self {
        Self::from_points(
            self.point0().reverse_rotate_in_space(space_size, rotation),
            self.point1().reverse_rotate_in_space(space_size, rotation),
        )
    }

    pub fn point0(&self) -> VectorPoint<T> {
        VectorPoint {
            x: self.x0,
            y: self.y0,
        }
    }

    pub fn point1(&self) -> VectorPoint<T> {
        VectorPoint {
            x: self.x1,
            y: self.y1,
        }
    }
}

impl Size<f64> {
    pub fn times(&self, scale: ScaleFactor) -> Self {
        Self::new(self.width * scale.x, self.height * scale.y)
    }

    pub fn center(&self) -> PointD {
        PointD::new(self.width / 2.0, self.height / 2.0)
    }
}

impl Size<i32> {
    pub fn to_f64_size(self) -> SizeD {
        SizeD::new(self.width as f64, self.height as f64)
    }

    /// Aspect ratio rounded to two decimals, 0.0 for empty sizes
    pub fn aspect_ratio(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            (self.width as f64 / self.height as f64 * 100.0).round() / 100.0
        }
    }
}

impl Rect<f64> {
    /// Rounds the rectangle outwards to integer coordinates: floor for the
    /// top-left corner and ceil for the bottom-right to ensure coverage.
    pub fn round(&self) -> (i32, i32, i32, i32) {
        (
            self.x0.floor() as i32,
            self.y0.floor() as i32,
            self.x1.ceil() as i32,
            self.y1.ceil() as i32,
        )
    }

    pub fn to_i32_rect(self) -> Rect<i32> {
        let (x0, y0, x1, y1) = self.round();
        Rect::new(x0, y0, x1, y1)
    }

    pub fn from_i32_rect(rect: &Rect<i32>) -> Self {
        Rect::new(
            rect.x0 as f64,
            rect.y0 as f64,
            rect.x1 as f64,
            rect.y1 as f64,
        )
    }

    pub fn center(&self) -> PointD {
        PointD::new((self.x0 + self.x1) / 2.0, (self.y0 + self.y1) / 2.0)
    }

    pub fn times(&self, scale: ScaleFactor) -> Self {
        Self::new(
            self.x0 * scale.x,
            self.y0 * scale.y,
            self.x1 * scale.x,
            self.y1 * scale.y,
        )
    }
}

impl Rect<i32> {
    pub fn to_f64_rect(self) -> Rect<f64> {
        Rect::from_i32_rect(&self)
    }

    /// Compact "x0,y0,x1,y1" form used in cache keys and logs
    pub fn to_short_string(&self) -> String {
        format!("{},{},{},{}", self.x0, self.y0, self.x1, self.y1)
    }

    /// Last pixel covered by this rectangle, inclusive coordinates
    pub fn last_pixel(&self) -> PointI {
        PointI::new(self.x1 - 1, self.y1 - 1)
    }
}

impl Display for Rect<i32> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({})", self.to_short_string())
    }
}

impl ScaleFactor {
    pub const ONE: ScaleFactor = ScaleFactor { x: 1.0, y: 1.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub const fn uniform(scale: f64) -> Self {
        Self { x: scale, y: scale }
    }

    pub fn times(&self, other: ScaleFactor) -> Self {
        Self::new(self.x * other.x, self.y * other.y)
    }

    pub fn div(&self, other: ScaleFactor) -> Self {
        Self::new(self.x / other.x, self.y / other.y)
    }

    pub fn lerp(&self, other: &Self, fraction: f64) -> Self {
        Self::new(
            self.x + (other.x - self.x) * fraction,
            self.y + (other.y - self.y) * fraction,
        )
    }
}

impl Default for ScaleFactor {
    fn default() -> Self {
        Self::ONE
    }
}

pub type RectI = Rect<i32>;
pub type RectD = Rect<f64>;
pub type SizeI = Size<i32>;
pub type SizeD = Size<f64>;
pub type PointI = VectorPoint<i32>;
pub type PointD = VectorPoint<f64>;
pub type VectorI = VectorPoint<i32>;
pub type VectorD = VectorPoint<f64>;
