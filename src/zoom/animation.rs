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

use std::time::Duration;

use crate::{
    rect::{RectD, VectorD},
    zoom::transform::Transform,
};

/// Maps linear progress (0..=1) to eased progress
pub type Easing = fn(f64) -> f64;

pub fn linear(fraction: f64) -> f64 {
    fraction
}

pub fn ease_out_quad(fraction: f64) -> f64 {
    1.0 - (1.0 - fraction) * (1.0 - fraction)
}

#[derive(Debug, Clone)]
enum AnimationKind {
    Transform {
        start: Transform,
        end: Transform,
        duration: Duration,
        easing: Easing,
    },
    Fling {
        start: Transform,
        velocity: VectorD,
        bounds: RectD,
        friction: f64,
        min_velocity: f64,
    },
}

/// A running user transform animation, stepped by the owner's frame clock.
///
/// The first call to [`step`](Self::step) defines the start time, so an
/// animation created between frames starts on the next frame.
#[derive(Debug, Clone)]
pub struct Animation {
    kind: AnimationKind,
    /// `ContinuousTransformType` flag this animation runs under
    transform_type: u32,
    started: Option<Duration>,
}

impl Animation {
    pub fn transform(
        start: Transform,
        end: Transform,
        duration: Duration,
        easing: Easing,
        transform_type: u32,
    ) -> Self {
        Self {
            kind: AnimationKind::Transform {
                start,
                end,
                duration,
                easing,
            },
            transform_type,
            started: None,
        }
    }

    pub fn fling(
        start: Transform,
        velocity: VectorD,
        bounds: RectD,
        friction: f64,
        min_velocity: f64,
        transform_type: u32,
    ) -> Self {
        Self {
            kind: AnimationKind::Fling {
                start,
                velocity,
                bounds,
                friction,
                min_velocity,
            },
            transform_type,
            started: None,
        }
    }

    pub fn transform_type(&self) -> u32 {
        self.transform_type
    }

    /// Final transform of a transform animation, `None` for flings
    pub fn end(&self) -> Option<Transform> {
        match &self.kind {
            AnimationKind::Transform { end, .. } => Some(*end),
            AnimationKind::Fling { .. } => None,
        }
    }

    /// Returns the user transform for `frame_time` and whether the animation
    /// has finished.
    pub fn step(&mut self, frame_time: Duration) -> (Transform, bool) {
        let started = *self.started.get_or_insert(frame_time);
        let elapsed = frame_time.saturating_sub(started).as_secs_f64();
        match &self.kind {
            AnimationKind::Transform {
                start,
                end,
                duration,
                easing,
            } => {
                let total = duration.as_secs_f64();
                if total <= 0.0 || elapsed >= total {
                    (*end, true)
                } else {
                    (start.lerp(end, easing(elapsed / total)), false)
                }
            }
            AnimationKind::Fling {
                start,
                velocity,
                bounds,
                friction,
                min_velocity,
            } => {
                let decay = (-friction * elapsed).exp();
                let travelled = velocity.scale((1.0 - decay) / friction);
                let unlimited = start.offset + travelled;
                let offset = VectorD::new(
                    unlimited.x().clamp(bounds.x0, bounds.x1),
                    unlimited.y().clamp(bounds.y0, bounds.y1),
                );
                let speed = velocity.length() * decay;
                let blocked_x = velocity.x() == 0.0 || offset.x() != unlimited.x();
                let blocked_y = velocity.y() == 0.0 || offset.y() != unlimited.y();
                let finished = speed < *min_velocity || (blocked_x && blocked_y);
                (Transform { offset, ..*start }, finished)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rect::ScaleFactor;

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[test]
    fn test_transform_animation() {
        let start = Transform::IDENTITY;
        let end = Transform::new(ScaleFactor::uniform(3.0), VectorD::new(-200.0, -100.0));
        let mut animation = Animation::transform(start, end, ms(300), linear, 1);
        let (transform, finished) = animation.step(ms(1000));
        assert_eq!(transform, start);
        assert!(!finished);
        let (transform, finished) = animation.step(ms(1150));
        assert_eq!(transform.scale, ScaleFactor::uniform(2.0));
        assert!(!finished);
        let (transform, finished) = animation.step(ms(1300));
        assert_eq!(transform, end);
        assert!(finished);
        assert_eq!(animation.end(), Some(end));
    }

    #[test]
    fn test_zero_duration() {
        let end = Transform::new(ScaleFactor::uniform(2.0), VectorD::default());
        let mut animation = Animation::transform(Transform::IDENTITY, end, ms(0), linear, 1);
        assert_eq!(animation.step(ms(5)), (end, true));
    }

    #[test]
    fn test_easing() {
        assert_eq!(ease_out_quad(0.0), 0.0);
        assert_eq!(ease_out_quad(1.0), 1.0);
        assert!(ease_out_quad(0.5) > linear(0.5));
    }

    #[test]
    fn test_fling_decays_and_stays_in_bounds() {
        let start = Transform::new(ScaleFactor::uniform(2.0), VectorD::new(-100.0, -50.0));
        let bounds = RectD::new(-1000.0, -500.0, 0.0, 0.0);
        let mut animation = Animation::fling(start, VectorD::new(-2000.0, 0.0), bounds, 4.0, 50.0, 16);
        assert!(animation.end().is_none());
        animation.step(ms(0));
        let (first, finished) = animation.step(ms(100));
        assert!(!finished);
        assert!(first.offset.x() < -100.0);
        assert_eq!(first.offset.y(), -50.0);
        assert_eq!(first.scale, start.scale);
        let (later, _) = animation.step(ms(200));
        // Decelerating: the second interval covers less distance
        assert!(first.offset.x() - later.offset.x() < -100.0 - first.offset.x());
        let (last, finished) = animation.step(ms(5000));
        assert!(finished);
        assert!(last.offset.x() >= -1000.0);
    }

    #[test]
    fn test_fling_blocked_by_bounds() {
        let start = Transform::new(ScaleFactor::uniform(2.0), VectorD::new(-10.0, 0.0));
        let bounds = RectD::new(-1000.0, 0.0, 0.0, 0.0);
        let mut animation = Animation::fling(start, VectorD::new(5000.0, 0.0), bounds, 4.0, 50.0, 16);
        animation.step(ms(0));
        let (transform, finished) = animation.step(ms(100));
        assert_eq!(transform.offset.x(), 0.0);
        assert!(finished);
    }
}
