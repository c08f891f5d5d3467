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

use async_channel::Receiver;

use crate::{
    config::ZoomConfig,
    error::{ZoomError, ZoomResult},
    observe::Subscribers,
    rect::{normalize_rotation, PointD, RectD, ScaleFactor, SizeD, VectorD},
    zoom::{
        animation::{linear, Animation, Easing},
        calculate::{
            calculate_base_transform, calculate_content_display_rect,
            calculate_content_visible_rect, calculate_locate_user_offset,
            calculate_next_step_scale, calculate_scroll_edge, calculate_user_offset_bounds,
            calculate_user_offset_for_centroid, can_scroll, content_point_to_touch_point,
            limit_scale_with_rubber_band, limit_user_offset, touch_point_to_content_point,
            Placement, ScrollEdge,
        },
        content::{Alignment, ContentScale},
        read_mode::{
            calculate_read_mode_user_transform, LongImageDecider, ReadMode, ReadModeSizeType,
        },
        scales::{Scales, ScalesCalculator},
        transform::Transform,
        ContinuousTransformType, ZoomableState,
    },
};

const TRANSFORM_EPSILON: f64 = 1.0e-6;

/// Rotation gestures snap to the next quarter turn past this many degrees
const GESTURE_ROTATION_SNAP: f64 = 45.0;

/// Zoom, pan and rotation state of the content inside its container.
///
/// The displayed transform is `base ⊕ user`: the base transform places the
/// content according to content scale, alignment and rotation, the user
/// transform holds everything the user did on top of that. All scales taken
/// and returned by the public API are final scales (base times user).
///
/// Every change is published to subscribers as a [`ZoomableState`].
pub struct ZoomableCore {
    config: ZoomConfig,
    container_size: SizeD,
    content_size: SizeD,
    content_origin_size: SizeD,
    content_scale: ContentScale,
    alignment: Alignment,
    rotation: i32,
    read_mode: Option<ReadMode>,
    scales_calculator: ScalesCalculator,
    limit_offset_within_base_visible_rect: bool,
    base_transform: Transform,
    user_transform: Transform,
    scales: Scales,
    continuous_transform_type: u32,
    animation: Option<Animation>,
    easing: Easing,
    gesture_rotation: f64,
    subscribers: Subscribers<ZoomableState>,
}

impl ZoomableCore {
    pub fn new(config: ZoomConfig) -> Self {
        Self {
            scales_calculator: ScalesCalculator::Dynamic {
                multiple: config.scales_multiple,
            },
            limit_offset_within_base_visible_rect: config.limit_offset_within_base_visible_rect,
            config,
            container_size: SizeD::default(),
            content_size: SizeD::default(),
            content_origin_size: SizeD::default(),
            content_scale: ContentScale::default(),
            alignment: Alignment::default(),
            rotation: 0,
            read_mode: None,
            base_transform: Transform::IDENTITY,
            user_transform: Transform::IDENTITY,
            scales: Scales::default(),
            continuous_transform_type: ContinuousTransformType::NONE,
            animation: None,
            easing: linear,
            gesture_rotation: 0.0,
            subscribers: Subscribers::default(),
        }
    }

    pub fn subscribe(&mut self) -> Receiver<ZoomableState> {
        self.subscribers.subscribe()
    }

    fn publish(&mut self) {
        let state = self.state();
        self.subscribers.publish(&state);
    }

    fn placement(&self) -> Placement {
        Placement::new(
            self.container_size,
            self.content_size,
            self.content_scale,
            self.alignment,
            self.rotation,
        )
    }

    pub fn is_ready(&self) -> bool {
        !self.container_size.is_empty() && !self.content_size.is_empty()
    }

    /// Recomputes everything and returns to the initial user transform.
    fn reset(&mut self, reason: &str) {
        self.stop_animation_silently();
        let placement = self.placement();
        self.base_transform = calculate_base_transform(&placement);
        let read_mode_transform =
            calculate_read_mode_user_transform(&placement, self.read_mode.as_ref());
        self.user_transform = read_mode_transform.unwrap_or(Transform::IDENTITY);
        self.update_scales();
        log::debug!(
            "Zoomable reset ({reason}): container={:?} content={:?} base={} user={} scales={:.3}/{:.3}/{:.3}",
            self.container_size,
            self.content_size,
            self.base_transform,
            self.user_transform,
            self.scales.min,
            self.scales.medium,
            self.scales.max
        );
        self.publish();
    }

    fn update_scales(&mut self) {
        let placement = self.placement();
        let initial_user_scale =
            calculate_read_mode_user_transform(&placement, self.read_mode.as_ref())
                .map(|transform| transform.scale.x)
                .unwrap_or(1.0);
        self.scales = self.scales_calculator.calculate(
            &placement,
            self.content_origin_size,
            initial_user_scale,
        );
    }

    pub fn set_container_size(&mut self, size: SizeD) {
        if size != self.container_size {
            self.container_size = size;
            self.reset("container size");
        }
    }

    pub fn set_content_size(&mut self, size: SizeD) {
        if size == self.content_size {
            return;
        }
        let old = self.content_size;
        self.content_size = size;
        let same_aspect_ratio = !old.is_empty()
            && !size.is_empty()
            && ((old.width() / old.height()) - (size.width() / size.height())).abs() < 0.01;
        if self
            .config
            .keep_transform_when_same_aspect_ratio_content_size_changed
            && same_aspect_ratio
        {
            self.stop_animation_silently();
            self.base_transform = calculate_base_transform(&self.placement());
            self.update_scales();
            log::debug!(
                "Content size changed {old:?} -> {size:?}, keeping user transform {}",
                self.user_transform
            );
            self.publish();
        } else {
            self.reset("content size");
        }
    }

    /// Size of the original image the content is a thumbnail of; only affects
    /// the scale bounds.
    pub fn set_content_origin_size(&mut self, size: SizeD) {
        if size != self.content_origin_size {
            self.content_origin_size = size;
            self.update_scales();
            self.publish();
        }
    }

    pub fn set_content_scale(&mut self, content_scale: ContentScale) {
        if content_scale != self.content_scale {
            self.content_scale = content_scale;
            self.reset("content scale");
        }
    }

    pub fn set_alignment(&mut self, alignment: Alignment) {
        if alignment != self.alignment {
            self.alignment = alignment;
            self.reset("alignment");
        }
    }

    pub fn set_read_mode(&mut self, read_mode: Option<ReadMode>) {
        if read_mode != self.read_mode {
            self.read_mode = read_mode;
            self.reset("read mode");
        }
    }

    /// Read mode for `size_type` with the long image thresholds from the config
    pub fn set_read_mode_size_type(&mut self, size_type: Option<ReadModeSizeType>) {
        let read_mode = size_type.map(|size_type| {
            ReadMode::new(size_type, LongImageDecider::from(&self.config))
        });
        self.set_read_mode(read_mode);
    }

    pub fn set_scales_calculator(&mut self, scales_calculator: ScalesCalculator) {
        if scales_calculator != self.scales_calculator {
            self.scales_calculator = scales_calculator;
            self.reset("scales calculator");
        }
    }

    pub fn set_limit_offset_within_base_visible_rect(&mut self, limit: bool) {
        if limit != self.limit_offset_within_base_visible_rect {
            self.limit_offset_within_base_visible_rect = limit;
            self.reset("limit offset");
        }
    }

    pub fn set_easing(&mut self, easing: Easing) {
        self.easing = easing;
    }

    pub fn container_size(&self) -> SizeD {
        self.container_size
    }

    pub fn content_size(&self) -> SizeD {
        self.content_size
    }

    pub fn content_origin_size(&self) -> SizeD {
        self.content_origin_size
    }

    pub fn rotation(&self) -> i32 {
        self.rotation
    }

    pub fn continuous_transform_type(&self) -> u32 {
        self.continuous_transform_type
    }

    pub fn base_transform(&self) -> Transform {
        self.base_transform
    }

    pub fn user_transform(&self) -> Transform {
        self.user_transform
    }

    pub fn transform(&self) -> Transform {
        self.base_transform.plus(&self.user_transform)
    }

    pub fn min_scale(&self) -> f64 {
        self.scales.min
    }

    pub fn medium_scale(&self) -> f64 {
        self.scales.medium
    }

    pub fn max_scale(&self) -> f64 {
        self.scales.max
    }

    fn user_scale(&self) -> f64 {
        self.user_transform.scale.x
    }

    fn user_scale_for(&self, scale: f64) -> f64 {
        scale / self.base_transform.scale.x
    }

    fn user_offset_bounds_for(&self, user_scale: f64) -> RectD {
        calculate_user_offset_bounds(
            &self.placement(),
            user_scale,
            self.limit_offset_within_base_visible_rect,
        )
    }

    pub fn user_offset_bounds(&self) -> RectD {
        self.user_offset_bounds_for(self.user_scale())
    }

    pub fn content_display_rect(&self) -> RectD {
        calculate_content_display_rect(
            &self.placement(),
            self.user_scale(),
            self.user_transform.offset,
        )
    }

    pub fn content_visible_rect(&self) -> RectD {
        calculate_content_visible_rect(
            &self.placement(),
            self.user_scale(),
            self.user_transform.offset,
        )
    }

    pub fn scroll_edge(&self) -> ScrollEdge {
        calculate_scroll_edge(&self.user_offset_bounds(), self.user_transform.offset)
    }

    pub fn can_scroll(&self, horizontal: bool, direction: i32) -> bool {
        can_scroll(horizontal, direction, &self.scroll_edge())
    }

    pub fn touch_point_to_content_point(&self, touch_point: PointD) -> PointD {
        touch_point_to_content_point(
            &self.placement(),
            self.user_scale(),
            self.user_transform.offset,
            touch_point,
        )
    }

    pub fn content_point_to_touch_point(&self, content_point: PointD) -> PointD {
        content_point_to_touch_point(
            &self.placement(),
            self.user_scale(),
            self.user_transform.offset,
            content_point,
        )
    }

    pub fn state(&self) -> ZoomableState {
        ZoomableState {
            container_size: self.container_size,
            content_size: self.content_size,
            content_origin_size: self.content_origin_size,
            rotation: self.rotation,
            base_transform: self.base_transform,
            user_transform: self.user_transform,
            transform: self.transform(),
            min_scale: self.scales.min,
            medium_scale: self.scales.medium,
            max_scale: self.scales.max,
            content_display_rect: self.content_display_rect(),
            content_visible_rect: self.content_visible_rect(),
            user_offset_bounds: self.user_offset_bounds(),
            scroll_edge: self.scroll_edge(),
            continuous_transform_type: self.continuous_transform_type,
        }
    }

    /// Applies `target` directly or through an animation. Returns false when
    /// the target equals the current user transform.
    fn update_user_transform(&mut self, target: Transform, animated: bool, transform_type: u32) -> bool {
        if target.approx_eq(&self.user_transform, TRANSFORM_EPSILON) {
            return false;
        }
        let duration = Duration::from_millis(self.config.animation_duration_ms);
        if animated && !duration.is_zero() {
            self.animation = Some(Animation::transform(
                self.user_transform,
                target,
                duration,
                self.easing,
                transform_type,
            ));
            self.continuous_transform_type |= transform_type;
        } else {
            self.user_transform = target;
        }
        self.publish();
        true
    }

    /// Scales to `target_scale`, clamped to the scale bounds, keeping
    /// `centroid_content_point` (default: center of the visible content) at
    /// the same place in the container.
    pub fn scale(
        &mut self,
        target_scale: f64,
        centroid_content_point: Option<PointD>,
        animated: bool,
    ) -> bool {
        self.stop_all_animation();
        if !self.is_ready() {
            return false;
        }
        let target_user_scale =
            self.user_scale_for(target_scale.clamp(self.scales.min, self.scales.max));
        let content_point =
            centroid_content_point.unwrap_or_else(|| self.content_visible_rect().center());
        let centroid = self.content_point_to_touch_point(content_point);
        let offset = calculate_user_offset_for_centroid(
            self.user_scale(),
            self.user_transform.offset,
            target_user_scale,
            centroid,
        );
        let offset = limit_user_offset(offset, &self.user_offset_bounds_for(target_user_scale));
        let target = Transform::new(ScaleFactor::uniform(target_user_scale), offset);
        self.update_user_transform(target, animated, ContinuousTransformType::SCALE)
    }

    /// Moves to the next of the min / medium (/ max) scales. Returns the scale
    /// switched to, `None` when not ready or when the scale does not change.
    pub fn switch_scale(
        &mut self,
        centroid_content_point: Option<PointD>,
        animated: bool,
    ) -> Option<f64> {
        if !self.is_ready() {
            return None;
        }
        let steps = if self.config.three_step_scale {
            vec![self.scales.min, self.scales.medium, self.scales.max]
        } else {
            vec![self.scales.min, self.scales.medium]
        };
        let next = calculate_next_step_scale(&steps, self.transform().scale.x, 0.1);
        self.scale(next, centroid_content_point, animated).then_some(next)
    }

    /// Moves the content so the final offset becomes `target_offset`, limited
    /// to the offset bounds.
    pub fn offset(&mut self, target_offset: VectorD, animated: bool) -> bool {
        self.stop_all_animation();
        if !self.is_ready() {
            return false;
        }
        let user_offset = target_offset - self.base_transform.offset.times(self.user_transform.scale);
        let user_offset = limit_user_offset(user_offset, &self.user_offset_bounds());
        let target = Transform {
            offset: user_offset,
            ..self.user_transform
        };
        self.update_user_transform(target, animated, ContinuousTransformType::OFFSET)
    }

    /// Scales to `target_scale` and brings `content_point` as close to the
    /// center of the container as the offset bounds allow.
    pub fn locate(&mut self, content_point: PointD, target_scale: f64, animated: bool) -> bool {
        self.stop_all_animation();
        if !self.is_ready() {
            return false;
        }
        let user_scale =
            self.user_scale_for(target_scale.clamp(self.scales.min, self.scales.max));
        let offset = calculate_locate_user_offset(&self.placement(), content_point, user_scale);
        let offset = limit_user_offset(offset, &self.user_offset_bounds_for(user_scale));
        let target = Transform::new(ScaleFactor::uniform(user_scale), offset);
        self.update_user_transform(target, animated, ContinuousTransformType::LOCATE)
    }

    /// Sets the absolute rotation. The visible center and user scale are kept
    /// where the new bounds allow.
    pub fn rotate(&mut self, target_rotation: i32) -> ZoomResult<()> {
        if target_rotation % 90 != 0 {
            return Err(ZoomError::InvalidRotation(target_rotation));
        }
        let rotation = normalize_rotation(target_rotation);
        if rotation == self.rotation {
            return Ok(());
        }
        self.stop_all_animation();
        if !self.is_ready() {
            self.rotation = rotation;
            self.reset("rotation");
            return Ok(());
        }
        let center = self.content_visible_rect().center();
        let user_scale = self.user_scale();
        self.rotation = rotation;
        self.base_transform = calculate_base_transform(&self.placement());
        self.update_scales();
        let user_scale = user_scale.clamp(
            self.user_scale_for(self.scales.min),
            self.user_scale_for(self.scales.max),
        );
        let offset = calculate_locate_user_offset(&self.placement(), center, user_scale);
        let offset = limit_user_offset(offset, &self.user_offset_bounds_for(user_scale));
        self.user_transform = Transform::new(ScaleFactor::uniform(user_scale), offset);
        log::debug!("Rotated to {rotation}, base={}", self.base_transform);
        self.publish();
        Ok(())
    }

    /// One step of a touch gesture. Scale and offset beyond their bounds are
    /// damped instead of clamped; [`gesture_end`](Self::gesture_end) rolls
    /// them back.
    ///
    /// # Arguments
    /// * `centroid` - Gesture center in container coordinates
    /// * `pan_change` - Translation since the previous step
    /// * `zoom_change` - Scale multiplier since the previous step
    /// * `rotation_change` - Rotation in degrees since the previous step
    pub fn gesture_transform(
        &mut self,
        centroid: PointD,
        pan_change: VectorD,
        zoom_change: f64,
        rotation_change: f64,
    ) {
        self.stop_all_animation();
        if !self.is_ready() {
            return;
        }
        self.continuous_transform_type |= ContinuousTransformType::GESTURE;
        let current_scale = self.transform().scale.x;
        let target_scale = current_scale * zoom_change;
        let limited_scale = if self.config.rubber_band_scale {
            limit_scale_with_rubber_band(
                current_scale,
                target_scale,
                self.scales.min,
                self.scales.max,
                self.config.rubber_band_ratio,
                self.config.rubber_band_damping,
            )
        } else {
            target_scale.clamp(self.scales.min, self.scales.max)
        };
        let user_scale = self.user_scale_for(limited_scale);
        let zoomed = calculate_user_offset_for_centroid(
            self.user_scale(),
            self.user_transform.offset,
            user_scale,
            centroid,
        );
        let bounds = self.user_offset_bounds_for(user_scale);
        let damping = self.config.rubber_band_damping;
        // Only the part of the move beyond a bound is damped
        let damped = |zoomed: f64, pan: f64, min: f64, max: f64| {
            let moved = zoomed + pan;
            if moved > max {
                let start = zoomed.max(max);
                start + (moved - start) * damping
            } else if moved < min {
                let start = zoomed.min(min);
                start + (moved - start) * damping
            } else {
                moved
            }
        };
        let offset = VectorD::new(
            damped(zoomed.x(), pan_change.x(), bounds.x0, bounds.x1),
            damped(zoomed.y(), pan_change.y(), bounds.y0, bounds.y1),
        );
        self.gesture_rotation += rotation_change;
        self.user_transform = Transform::new(ScaleFactor::uniform(user_scale), offset);
        self.publish();
    }

    /// Ends a gesture: snaps rotation, then rolls back scale or offset if they
    /// are out of bounds, otherwise flings with `velocity` (px/s).
    pub fn gesture_end(&mut self, velocity: VectorD) {
        self.continuous_transform_type &= !ContinuousTransformType::GESTURE;
        let rotation = std::mem::take(&mut self.gesture_rotation);
        if rotation.abs() >= GESTURE_ROTATION_SNAP {
            let quarters = (rotation / 90.0).round() as i32;
            if let Err(e) = self.rotate(self.rotation + quarters * 90) {
                log::warn!("Gesture rotation failed: {e}");
            }
        }
        if self.rollback_scale(None) {
            return;
        }
        let offset = self.user_transform.offset;
        let limited = limit_user_offset(offset, &self.user_offset_bounds());
        if limited != offset {
            let target = Transform {
                offset: limited,
                ..self.user_transform
            };
            self.update_user_transform(target, true, ContinuousTransformType::OFFSET);
            return;
        }
        if !self.fling(velocity) {
            self.publish();
        }
    }

    /// Animates the scale back into bounds around `centroid` (container
    /// coordinates, default: container center). Returns false when the scale
    /// is already within bounds.
    pub fn rollback_scale(&mut self, centroid: Option<PointD>) -> bool {
        if !self.is_ready() {
            return false;
        }
        let current = self.transform().scale.x;
        let target_scale = current.clamp(self.scales.min, self.scales.max);
        if (target_scale - current).abs() < TRANSFORM_EPSILON {
            return false;
        }
        self.stop_all_animation();
        let centroid = centroid.unwrap_or_else(|| self.container_size.center());
        let user_scale = self.user_scale_for(target_scale);
        let offset = calculate_user_offset_for_centroid(
            self.user_scale(),
            self.user_transform.offset,
            user_scale,
            centroid,
        );
        let offset = limit_user_offset(offset, &self.user_offset_bounds_for(user_scale));
        let target = Transform::new(ScaleFactor::uniform(user_scale), offset);
        self.update_user_transform(target, true, ContinuousTransformType::SCALE)
    }

    /// Starts a decelerating offset animation. Returns false for velocities
    /// below the configured minimum.
    pub fn fling(&mut self, velocity: VectorD) -> bool {
        if !self.is_ready() || velocity.length() < self.config.fling_min_velocity {
            return false;
        }
        self.stop_all_animation();
        self.animation = Some(Animation::fling(
            self.user_transform,
            velocity,
            self.user_offset_bounds(),
            self.config.fling_friction,
            self.config.fling_min_velocity,
            ContinuousTransformType::FLING,
        ));
        self.continuous_transform_type |= ContinuousTransformType::FLING;
        self.publish();
        true
    }

    fn stop_animation_silently(&mut self) -> bool {
        match self.animation.take() {
            Some(animation) => {
                self.continuous_transform_type &= !animation.transform_type();
                true
            }
            None => false,
        }
    }

    /// Cancels any running animation, leaving the transform where it is.
    pub fn stop_all_animation(&mut self) {
        if self.stop_animation_silently() {
            self.publish();
        }
    }

    /// Steps the running animation to `frame_time` (any monotonic clock).
    /// Returns false when nothing is animating.
    pub fn advance(&mut self, frame_time: Duration) -> bool {
        let Some(animation) = self.animation.as_mut() else {
            return false;
        };
        let transform_type = animation.transform_type();
        let (transform, finished) = animation.step(frame_time);
        self.user_transform = transform;
        if finished {
            self.animation = None;
            self.continuous_transform_type &= !transform_type;
        }
        self.publish();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observe::drain;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    fn approx_point(a: PointD, b: PointD) -> bool {
        (a.x() - b.x()).abs() < 1e-6 && (a.y() - b.y()).abs() < 1e-6
    }

    fn zoomable() -> ZoomableCore {
        let mut zoomable = ZoomableCore::new(ZoomConfig::default());
        zoomable.set_container_size(SizeD::new(1200.0, 700.0));
        zoomable.set_content_size(SizeD::new(849.0, 611.0));
        zoomable
    }

    fn finish_animation(zoomable: &mut ZoomableCore) {
        let mut frame = Duration::from_secs(100);
        while zoomable.advance(frame) {
            frame += Duration::from_millis(16);
        }
    }

    #[test]
    fn test_unready() {
        let mut zoomable = ZoomableCore::new(ZoomConfig::default());
        assert!(!zoomable.is_ready());
        assert!(!zoomable.state().is_ready());
        assert!(!zoomable.scale(2.0, None, false));
        assert!(zoomable.switch_scale(None, false).is_none());
        assert_eq!(zoomable.transform(), Transform::IDENTITY);
        zoomable.set_container_size(SizeD::new(1200.0, 700.0));
        assert!(!zoomable.is_ready());
    }

    #[test]
    fn test_reset() {
        let zoomable = zoomable();
        assert!(zoomable.is_ready());
        assert!(approx_eq(zoomable.base_transform().scale.x, 700.0 / 611.0));
        assert_eq!(zoomable.user_transform(), Transform::IDENTITY);
        assert!(approx_eq(zoomable.min_scale(), zoomable.transform().scale.x));
        assert!(zoomable.min_scale() <= zoomable.medium_scale());
        assert!(zoomable.medium_scale() <= zoomable.max_scale());
        let visible = zoomable.content_visible_rect();
        assert!(approx_eq(visible.width(), 849.0) && approx_eq(visible.height(), 611.0));
    }

    #[test]
    fn test_content_origin_size_updates_scales() {
        let mut zoomable = zoomable();
        zoomable.set_content_origin_size(SizeD::new(6799.0, 4890.0));
        assert!(approx_eq(zoomable.medium_scale(), 6799.0 / 849.0));
        assert_eq!(zoomable.user_transform(), Transform::IDENTITY);
    }

    #[test]
    fn test_scale_clamped() {
        let mut zoomable = zoomable();
        assert!(!zoomable.scale(zoomable.min_scale(), None, false));
        assert!(zoomable.scale(1000.0, None, false));
        assert!(approx_eq(zoomable.transform().scale.x, zoomable.max_scale()));
        assert!(zoomable.scale(0.001, None, false));
        assert!(approx_eq(zoomable.transform().scale.x, zoomable.min_scale()));
    }

    #[test]
    fn test_scale_keeps_centroid() {
        let mut zoomable = zoomable();
        let center = PointD::new(424.5, 305.5);
        assert!(zoomable.scale(3.0, Some(center), false));
        assert!(approx_eq(zoomable.transform().scale.x, 3.0));
        assert!(approx_point(
            zoomable.content_point_to_touch_point(center),
            PointD::new(600.0, 350.0)
        ));

        let point = PointD::new(400.0, 300.0);
        let before = zoomable.content_point_to_touch_point(point);
        assert!(zoomable.scale(3.2, Some(point), false));
        assert!(approx_point(zoomable.content_point_to_touch_point(point), before));
    }

    #[test]
    fn test_switch_scale() {
        let mut zoomable = zoomable();
        let medium = zoomable.medium_scale();
        assert_eq!(zoomable.switch_scale(None, false), Some(medium));
        assert!(approx_eq(zoomable.transform().scale.x, medium));
        assert_eq!(zoomable.switch_scale(None, false), Some(zoomable.min_scale()));

        let config = ZoomConfig {
            three_step_scale: true,
            ..Default::default()
        };
        let mut zoomable = ZoomableCore::new(config);
        zoomable.set_container_size(SizeD::new(1200.0, 700.0));
        zoomable.set_content_size(SizeD::new(849.0, 611.0));
        zoomable.switch_scale(None, false);
        assert_eq!(zoomable.switch_scale(None, false), Some(zoomable.max_scale()));
        assert_eq!(zoomable.switch_scale(None, false), Some(zoomable.min_scale()));
    }

    #[test]
    fn test_switch_scale_unchanged() {
        let config = ZoomConfig {
            scales_multiple: 1.0,
            ..Default::default()
        };
        let mut zoomable = ZoomableCore::new(config);
        zoomable.set_container_size(SizeD::new(1000.0, 1000.0));
        zoomable.set_content_size(SizeD::new(1000.0, 1000.0));
        assert!(approx_eq(zoomable.min_scale(), zoomable.medium_scale()));
        assert_eq!(zoomable.switch_scale(None, false), None);
        assert!(approx_eq(zoomable.transform().scale.x, 1.0));
    }

    #[test]
    fn test_offset_clamped() {
        let mut zoomable = zoomable();
        zoomable.scale(4.0, None, false);
        assert!(zoomable.offset(VectorD::new(100000.0, 100000.0), false));
        let bounds = zoomable.user_offset_bounds();
        let offset = zoomable.user_transform().offset;
        assert!(approx_eq(offset.x(), bounds.x1));
        assert!(approx_eq(offset.y(), bounds.y1));
        assert_eq!(zoomable.scroll_edge().horizontal, crate::zoom::calculate::Edge::Start);
        assert!(!zoomable.can_scroll(true, -1));
        assert!(zoomable.can_scroll(true, 1));
    }

    #[test]
    fn test_locate() {
        let mut zoomable = zoomable();
        let point = PointD::new(200.0, 150.0);
        assert!(zoomable.locate(point, 4.0, false));
        assert!(approx_eq(zoomable.transform().scale.x, 4.0));
        assert!(approx_point(
            zoomable.content_point_to_touch_point(point),
            PointD::new(600.0, 350.0)
        ));
        let touch = zoomable.content_point_to_touch_point(point);
        assert!(approx_point(zoomable.touch_point_to_content_point(touch), point));
    }

    #[test]
    fn test_rotate() {
        let mut zoomable = zoomable();
        assert!(matches!(
            zoomable.rotate(45),
            Err(ZoomError::InvalidRotation(45))
        ));
        zoomable.scale(2.0, None, false);
        let user_scale = zoomable.user_transform().scale.x;
        zoomable.rotate(90).unwrap();
        assert_eq!(zoomable.rotation(), 90);
        assert_eq!(zoomable.base_transform().rotation, 90);
        assert!(approx_eq(zoomable.base_transform().scale.x, 700.0 / 849.0));
        assert!(approx_eq(zoomable.user_transform().scale.x, user_scale));
        let center = zoomable.content_visible_rect().center();
        assert!(approx_point(center, PointD::new(424.5, 305.5)), "{center:?}");
        zoomable.rotate(-270).unwrap();
        assert_eq!(zoomable.rotation(), 90);
    }

    #[test]
    fn test_gesture_rubber_band_and_rollback() {
        let mut zoomable = zoomable();
        let max = zoomable.max_scale();
        zoomable.scale(max, None, false);
        zoomable.gesture_transform(PointD::new(600.0, 350.0), VectorD::default(), 2.0, 0.0);
        assert_ne!(
            zoomable.continuous_transform_type() & ContinuousTransformType::GESTURE,
            0
        );
        let scale = zoomable.transform().scale.x;
        assert!(scale > max && scale < max * 2.0, "{scale}");

        zoomable.gesture_end(VectorD::default());
        assert_eq!(
            zoomable.continuous_transform_type(),
            ContinuousTransformType::SCALE
        );
        finish_animation(&mut zoomable);
        assert_eq!(zoomable.continuous_transform_type(), ContinuousTransformType::NONE);
        assert!(approx_eq(zoomable.transform().scale.x, max));
    }

    #[test]
    fn test_gesture_pan_beyond_bounds_is_damped() {
        let mut zoomable = zoomable();
        zoomable.scale(4.0, None, false);
        let bounds = zoomable.user_offset_bounds();
        let offset = zoomable.user_transform().offset;
        let pan = VectorD::new(bounds.x1 - offset.x() + 100.0, 0.0);
        zoomable.gesture_transform(PointD::new(600.0, 350.0), pan, 1.0, 0.0);
        let damped = zoomable.user_transform().offset.x();
        assert!(approx_eq(damped, bounds.x1 + 50.0), "{damped}");
        zoomable.gesture_end(VectorD::default());
        assert_eq!(zoomable.continuous_transform_type(), ContinuousTransformType::OFFSET);
        finish_animation(&mut zoomable);
        assert!(approx_eq(zoomable.user_transform().offset.x(), bounds.x1));
    }

    #[test]
    fn test_gesture_rotation_snaps() {
        let mut zoomable = zoomable();
        zoomable.gesture_transform(PointD::new(600.0, 350.0), VectorD::default(), 1.0, 30.0);
        zoomable.gesture_end(VectorD::default());
        assert_eq!(zoomable.rotation(), 0);
        zoomable.gesture_transform(PointD::new(600.0, 350.0), VectorD::default(), 1.0, 40.0);
        zoomable.gesture_transform(PointD::new(600.0, 350.0), VectorD::default(), 1.0, 20.0);
        zoomable.gesture_end(VectorD::default());
        assert_eq!(zoomable.rotation(), 90);
    }

    #[test]
    fn test_fling() {
        let mut zoomable = zoomable();
        zoomable.scale(4.0, None, false);
        assert!(!zoomable.fling(VectorD::new(10.0, 0.0)));
        let start = zoomable.user_transform().offset;
        assert!(zoomable.fling(VectorD::new(-3000.0, 0.0)));
        assert_eq!(zoomable.continuous_transform_type(), ContinuousTransformType::FLING);
        zoomable.advance(Duration::from_millis(0));
        zoomable.advance(Duration::from_millis(100));
        assert!(zoomable.user_transform().offset.x() < start.x());
        zoomable.advance(Duration::from_secs(10));
        assert!(!zoomable.advance(Duration::from_secs(11)));
        assert_eq!(zoomable.continuous_transform_type(), ContinuousTransformType::NONE);
        let bounds = zoomable.user_offset_bounds();
        let offset = zoomable.user_transform().offset;
        assert!(offset.x() >= bounds.x0 && offset.x() <= bounds.x1);
    }

    #[test]
    fn test_last_writer_wins() {
        let mut zoomable = zoomable();
        assert!(zoomable.scale(4.0, None, true));
        assert_eq!(zoomable.continuous_transform_type(), ContinuousTransformType::SCALE);
        // Not applied before the first frame
        assert_eq!(zoomable.user_transform(), Transform::IDENTITY);
        zoomable.offset(VectorD::new(0.0, 0.0), false);
        assert_eq!(zoomable.continuous_transform_type(), ContinuousTransformType::NONE);
        assert!(!zoomable.advance(Duration::from_secs(1)));
    }

    #[test]
    fn test_subscribe() {
        let mut zoomable = ZoomableCore::new(ZoomConfig::default());
        let receiver = zoomable.subscribe();
        zoomable.set_container_size(SizeD::new(1200.0, 700.0));
        zoomable.set_content_size(SizeD::new(849.0, 611.0));
        zoomable.scale(3.0, None, false);
        let states = drain(&receiver);
        assert_eq!(states.len(), 3);
        assert!(!states[0].is_ready());
        assert!(states[1].is_ready());
        assert_eq!(states[2], zoomable.state());
        assert!(approx_eq(states[2].transform.scale.x, 3.0));
    }

    #[test]
    fn test_content_size_same_aspect_ratio_keeps_transform() {
        let mut zoomable = zoomable();
        zoomable.scale(4.0, None, false);
        let user = zoomable.user_transform();
        zoomable.set_content_size(SizeD::new(1698.0, 1222.0));
        assert_eq!(zoomable.user_transform(), user);
        assert!(approx_eq(zoomable.transform().scale.x, 2.0));
        zoomable.set_content_size(SizeD::new(1000.0, 1000.0));
        assert_eq!(zoomable.user_transform(), Transform::IDENTITY);
    }

    #[test]
    fn test_read_mode() {
        let mut zoomable = ZoomableCore::new(ZoomConfig::default());
        zoomable.set_read_mode(Some(ReadMode::new(
            ReadModeSizeType::Both,
            LongImageDecider::default(),
        )));
        zoomable.set_container_size(SizeD::new(1000.0, 1000.0));
        zoomable.set_content_size(SizeD::new(100.0, 1000.0));
        assert!(approx_eq(zoomable.user_transform().scale.x, 10.0));
        assert!(approx_point(zoomable.transform().offset, VectorD::new(0.0, 0.0)));
        assert!(zoomable.medium_scale() >= 10.0 - 1e-9);
        assert!(zoomable.can_scroll(false, 1));
        assert!(!zoomable.can_scroll(false, -1));
    }

    #[test]
    fn test_read_mode_thresholds_from_config() {
        let config = ZoomConfig {
            read_mode_same_direction_multiple: 1.5,
            read_mode_not_same_direction_multiple: 1.5,
            ..Default::default()
        };
        let mut zoomable = ZoomableCore::new(config);
        zoomable.set_read_mode_size_type(Some(ReadModeSizeType::Both));
        zoomable.set_container_size(SizeD::new(1000.0, 1000.0));
        zoomable.set_content_size(SizeD::new(500.0, 1000.0));
        assert!(approx_eq(zoomable.user_transform().scale.x, 2.0));

        let mut zoomable = ZoomableCore::new(ZoomConfig::default());
        zoomable.set_read_mode_size_type(Some(ReadModeSizeType::Both));
        zoomable.set_container_size(SizeD::new(1000.0, 1000.0));
        zoomable.set_content_size(SizeD::new(500.0, 1000.0));
        assert_eq!(zoomable.user_transform(), Transform::IDENTITY);
    }
}
