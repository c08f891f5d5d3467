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

use std::fmt::Display;

use crate::rect::{normalize_rotation, PointD, ScaleFactor, SizeD, VectorD};

/// Affine placement of the content in the container.
///
/// A content point is first rotated around `rotation_origin`, then scaled
/// around `scale_origin`, then translated by `offset`. Both origins are
/// fractions of the content size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub scale: ScaleFactor,
    pub offset: VectorD,
    /// Always 0, 90, 180 or 270
    pub rotation: i32,
    pub scale_origin: PointD,
    pub rotation_origin: PointD,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        scale: ScaleFactor::ONE,
        offset: VectorD::new(0.0, 0.0),
        rotation: 0,
        scale_origin: PointD::new(0.0, 0.0),
        rotation_origin: PointD::new(0.0, 0.0),
    };

    pub fn new(scale: ScaleFactor, offset: VectorD) -> Self {
        Self {
            scale,
            offset,
            ..Self::IDENTITY
        }
    }

    /// Transform rotated around the content center.
    ///
    /// # Panics
    /// Panics if `rotation` is not a multiple of 90.
    pub fn new_rotated(scale: ScaleFactor, offset: VectorD, rotation: i32) -> Self {
        Self {
            scale,
            offset,
            rotation: normalize_rotation(rotation),
            scale_origin: PointD::new(0.0, 0.0),
            rotation_origin: PointD::new(0.5, 0.5),
        }
    }

    /// Uniform scale, the x component for non-uniform transforms
    pub fn scale_x(&self) -> f64 {
        self.scale.x
    }

    /// Maps a content point into container coordinates.
    ///
    /// # Arguments
    /// * `point` - Point in content coordinates
    /// * `content_size` - Unrotated content size, needed to resolve the origins
    pub fn apply(&self, point: PointD, content_size: SizeD) -> PointD {
        let pivot = PointD::new(
            self.rotation_origin.x() * content_size.width(),
            self.rotation_origin.y() * content_size.height(),
        );
        let rotated = (point - pivot).rotate(self.rotation) + pivot;
        let scale_pivot = PointD::new(
            self.scale_origin.x() * content_size.width(),
            self.scale_origin.y() * content_size.height(),
        );
        let scaled = (rotated - scale_pivot).times(self.scale) + scale_pivot;
        scaled + self.offset
    }

    /// Inverse of [`apply`](Self::apply): maps a container point back into
    /// content coordinates.
    pub fn reverse(&self, point: PointD, content_size: SizeD) -> PointD {
        let scale_pivot = PointD::new(
            self.scale_origin.x() * content_size.width(),
            self.scale_origin.y() * content_size.height(),
        );
        let unscaled = (point - self.offset - scale_pivot).div(self.scale) + scale_pivot;
        let pivot = PointD::new(
            self.rotation_origin.x() * content_size.width(),
            self.rotation_origin.y() * content_size.height(),
        );
        (unscaled - pivot).rotate(360 - self.rotation) + pivot
    }

    /// Composes this (base) transform with a user transform applied on top of
    /// it in container space.
    pub fn plus(&self, user: &Transform) -> Transform {
        Transform {
            scale: self.scale.times(user.scale),
            offset: self.offset.times(user.scale) + user.offset,
            rotation: normalize_rotation(self.rotation + user.rotation),
            scale_origin: self.scale_origin,
            rotation_origin: self.rotation_origin,
        }
    }

    /// Recovers the user transform such that `base.plus(user) == self`.
    pub fn minus(&self, base: &Transform) -> Transform {
        let scale = self.scale.div(base.scale);
        Transform {
            scale,
            offset: self.offset - base.offset.times(scale),
            rotation: normalize_rotation(self.rotation - base.rotation),
            scale_origin: PointD::new(0.0, 0.0),
            rotation_origin: PointD::new(0.0, 0.0),
        }
    }

    /// Interpolated transform for animations. Rotation and origins jump to `end`.
    pub fn lerp(&self, end: &Transform, fraction: f64) -> Transform {
        Transform {
            scale: self.scale.lerp(&end.scale, fraction),
            offset: self.offset.lerp(&end.offset, fraction),
            ..*end
        }
    }

    pub fn approx_eq(&self, other: &Transform, epsilon: f64) -> bool {
        (self.scale.x - other.scale.x).abs() < epsilon
            && (self.scale.y - other.scale.y).abs() < epsilon
            && (self.offset.x() - other.offset.x()).abs() < epsilon
            && (self.offset.y() - other.offset.y()).abs() < epsilon
            && self.rotation == other.rotation
    }
}

impl Display for Transform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({:.2}x{:.2},{:.2}x{:.2},{})",
            self.scale.x,
            self.scale.y,
            self.offset.x(),
            self.offset.y(),
            self.rotation
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_point(a: PointD, b: PointD) -> bool {
        (a.x() - b.x()).abs() < 1e-9 && (a.y() - b.y()).abs() < 1e-9
    }

    #[test]
    fn test_apply_without_rotation() {
        let transform = Transform::new(ScaleFactor::uniform(2.0), VectorD::new(10.0, 20.0));
        let content = SizeD::new(100.0, 50.0);
        let p = transform.apply(PointD::new(5.0, 5.0), content);
        assert_eq!(p, PointD::new(20.0, 30.0));
        assert_eq!(transform.reverse(p, content), PointD::new(5.0, 5.0));
    }

    #[test]
    fn test_apply_with_rotation() {
        // 100x50 content rotated 90 around its center: top-left of the rotated
        // box is at (25, -25), so an offset of (-25, 25) moves it to the origin
        let transform = Transform::new_rotated(ScaleFactor::ONE, VectorD::new(-25.0, 25.0), 90);
        let content = SizeD::new(100.0, 50.0);
        // Original top-left ends at the top-right of the 50x100 rotated box
        let p = transform.apply(PointD::new(0.0, 0.0), content);
        assert!(approx_point(p, PointD::new(50.0, 0.0)), "{p:?}");
        let p = transform.apply(PointD::new(100.0, 50.0), content);
        assert!(approx_point(p, PointD::new(0.0, 100.0)), "{p:?}");
        for point in [PointD::new(13.0, 7.0), PointD::new(99.0, 1.0)] {
            let back = transform.reverse(transform.apply(point, content), content);
            assert!(approx_point(back, point));
        }
    }

    #[test]
    fn test_plus_minus() {
        let base = Transform::new_rotated(ScaleFactor::uniform(0.5), VectorD::new(10.0, 40.0), 180);
        let user = Transform::new(ScaleFactor::uniform(3.0), VectorD::new(-100.0, -7.0));
        let final_transform = base.plus(&user);
        assert_eq!(final_transform.scale, ScaleFactor::uniform(1.5));
        assert_eq!(final_transform.offset, VectorD::new(-70.0, 113.0));
        assert_eq!(final_transform.rotation, 180);
        assert!(final_transform.minus(&base).approx_eq(&user, 1e-9));

        let content = SizeD::new(300.0, 200.0);
        let p = PointD::new(42.0, 17.0);
        let expected = PointD::new(
            base.apply(p, content).x() * 3.0 - 100.0,
            base.apply(p, content).y() * 3.0 - 7.0,
        );
        assert!(approx_point(final_transform.apply(p, content), expected));
    }

    #[test]
    fn test_lerp() {
        let start = Transform::new(ScaleFactor::uniform(1.0), VectorD::new(0.0, 0.0));
        let end = Transform::new(ScaleFactor::uniform(3.0), VectorD::new(-100.0, 50.0));
        let half = start.lerp(&end, 0.5);
        assert_eq!(half.scale, ScaleFactor::uniform(2.0));
        assert_eq!(half.offset, VectorD::new(-50.0, 25.0));
        assert_eq!(start.lerp(&end, 1.0), end);
    }

    #[test]
    fn test_display() {
        let transform = Transform::new(ScaleFactor::uniform(2.0), VectorD::new(-1.5, 3.0));
        assert_eq!(transform.to_string(), "(2.00x2.00,-1.50x3.00,0)");
    }
}
