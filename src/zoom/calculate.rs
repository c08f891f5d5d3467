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

//! Pure geometry of the zoomable: base transform, visible rects, offset
//! bounds, scroll edges and the scale helpers used by gestures.

use crate::{
    rect::{PointD, RectD, ScaleFactor, SizeD, VectorD},
    zoom::{
        content::{Alignment, AxisAlignment, ContentScale},
        transform::Transform,
    },
};

/// Everything that determines the base transform.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Placement {
    pub container: SizeD,
    pub content: SizeD,
    pub content_scale: ContentScale,
    pub alignment: Alignment,
    /// 0, 90, 180 or 270
    pub rotation: i32,
}

impl Placement {
    pub fn new(
        container: SizeD,
        content: SizeD,
        content_scale: ContentScale,
        alignment: Alignment,
        rotation: i32,
    ) -> Self {
        Self {
            container,
            content,
            content_scale,
            alignment,
            rotation,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.container.is_empty() || self.content.is_empty()
    }

    pub fn rotated_content(&self) -> SizeD {
        self.content.rotate(self.rotation)
    }
}

/// Which end of an axis has been reached while scrolling
#[derive(Debug, Default, Eq, PartialEq, Hash, Clone, Copy)]
pub enum Edge {
    #[default]
    None,
    Start,
    End,
    Both,
}

#[derive(Debug, Default, Eq, PartialEq, Hash, Clone, Copy)]
pub struct ScrollEdge {
    pub horizontal: Edge,
    pub vertical: Edge,
}

const EDGE_TOLERANCE: f64 = 1.0e-3;

/// Base transform: rotate around the content center, scale by the content
/// scale, and move the rotated bounding box onto its aligned position.
pub fn calculate_base_transform(placement: &Placement) -> Transform {
    if placement.is_empty() {
        return Transform::IDENTITY;
    }
    let content = placement.content;
    let rotated = placement.rotated_content();
    let scale = placement
        .content_scale
        .compute_scale_factor(rotated, placement.container);
    let aligned = placement
        .alignment
        .align(rotated.times(scale), placement.container);
    // Top-left of the rotated bounding box before scaling and translation
    let rotated_top_left = VectorD::new(
        (content.width() - rotated.width()) / 2.0,
        (content.height() - rotated.height()) / 2.0,
    );
    let offset = aligned - rotated_top_left.times(scale);
    Transform::new_rotated(scale, offset, placement.rotation)
}

/// Where the content sits in the container at base, in container coordinates
pub fn calculate_content_base_display_rect(placement: &Placement) -> RectD {
    if placement.is_empty() {
        return RectD::default();
    }
    let rotated = placement.rotated_content();
    let scale = placement
        .content_scale
        .compute_scale_factor(rotated, placement.container);
    let scaled = rotated.times(scale);
    let aligned = placement.alignment.align(scaled, placement.container);
    RectD::new_from_size(scaled).translate(aligned)
}

pub fn calculate_content_display_rect(
    placement: &Placement,
    user_scale: f64,
    user_offset: VectorD,
) -> RectD {
    if placement.is_empty() || user_scale <= 0.0 {
        return RectD::default();
    }
    calculate_content_base_display_rect(placement)
        .scale(user_scale)
        .translate(user_offset)
}

/// The part of the content visible at base, in content coordinates
pub fn calculate_content_base_visible_rect(placement: &Placement) -> RectD {
    calculate_content_visible_rect(placement, 1.0, VectorD::default())
}

/// The container mapped back into unrotated content coordinates, clamped to
/// the content.
pub fn calculate_content_visible_rect(
    placement: &Placement,
    user_scale: f64,
    user_offset: VectorD,
) -> RectD {
    if placement.is_empty() || user_scale <= 0.0 {
        return RectD::default();
    }
    let transform = calculate_base_transform(placement).plus(&Transform::new(
        ScaleFactor::uniform(user_scale),
        user_offset,
    ));
    let container = RectD::new_from_size(placement.container);
    let visible = RectD::from_points(
        transform.reverse(container.point0(), placement.content),
        transform.reverse(container.point1(), placement.content),
    )
    .intersect(&RectD::new_from_size(placement.content));
    if visible.is_empty() {
        RectD::default()
    } else {
        visible
    }
}

/// Allowed range of the user offset, as a rect of offsets.
///
/// Per axis: when the displayed content is larger than the container the
/// range keeps the container covered, otherwise it collapses to the single
/// offset given by the alignment. Collapsed axes give `x0 == x1` (or
/// `y0 == y1`), so the result is not necessarily a non-empty rect.
pub fn calculate_user_offset_bounds(
    placement: &Placement,
    user_scale: f64,
    limit_base_visible_rect: bool,
) -> RectD {
    if placement.is_empty() || user_scale <= 0.0 {
        return RectD::default();
    }
    let mut base = calculate_content_base_display_rect(placement);
    if limit_base_visible_rect {
        base = base.intersect(&RectD::new_from_size(placement.container));
    }
    let display = base.scale(user_scale);
    let (x0, x1) = axis_offset_bounds(
        display.x0,
        display.x1,
        placement.container.width(),
        placement.alignment.horizontal(),
    );
    let (y0, y1) = axis_offset_bounds(
        display.y0,
        display.y1,
        placement.container.height(),
        placement.alignment.vertical(),
    );
    RectD::new(x0, y0, x1, y1)
}

fn axis_offset_bounds(
    start: f64,
    end: f64,
    space: f64,
    alignment: AxisAlignment,
) -> (f64, f64) {
    let length = end - start;
    if length > space {
        (space - end, -start)
    } else {
        let offset = alignment.align(length, space) - start;
        (offset, offset)
    }
}

pub fn limit_user_offset(user_offset: VectorD, bounds: &RectD) -> VectorD {
    VectorD::new(
        user_offset.x().clamp(bounds.x0, bounds.x1),
        user_offset.y().clamp(bounds.y0, bounds.y1),
    )
}

pub fn calculate_scroll_edge(user_offset_bounds: &RectD, user_offset: VectorD) -> ScrollEdge {
    ScrollEdge {
        horizontal: axis_edge(user_offset_bounds.x0, user_offset_bounds.x1, user_offset.x()),
        vertical: axis_edge(user_offset_bounds.y0, user_offset_bounds.y1, user_offset.y()),
    }
}

fn axis_edge(min: f64, max: f64, offset: f64) -> Edge {
    // Offset at its maximum shows the start of the content
    let start = offset >= max - EDGE_TOLERANCE;
    let end = offset <= min + EDGE_TOLERANCE;
    match (start, end) {
        (true, true) => Edge::Both,
        (true, false) => Edge::Start,
        (false, true) => Edge::End,
        (false, false) => Edge::None,
    }
}

/// Whether the content can scroll further in `direction` (negative towards
/// the start, positive towards the end, zero for either).
pub fn can_scroll(horizontal: bool, direction: i32, scroll_edge: &ScrollEdge) -> bool {
    let edge = if horizontal {
        scroll_edge.horizontal
    } else {
        scroll_edge.vertical
    };
    match direction {
        d if d < 0 => edge != Edge::Start && edge != Edge::Both,
        d if d > 0 => edge != Edge::End && edge != Edge::Both,
        _ => edge != Edge::Both,
    }
}

/// Maps a point in the container to the unrotated content, clamped to the content
pub fn touch_point_to_content_point(
    placement: &Placement,
    user_scale: f64,
    user_offset: VectorD,
    touch_point: PointD,
) -> PointD {
    if placement.is_empty() || user_scale <= 0.0 {
        return PointD::default();
    }
    let transform = calculate_base_transform(placement).plus(&Transform::new(
        ScaleFactor::uniform(user_scale),
        user_offset,
    ));
    let point = transform.reverse(touch_point, placement.content);
    PointD::new(
        point.x().clamp(0.0, placement.content.width()),
        point.y().clamp(0.0, placement.content.height()),
    )
}

pub fn content_point_to_touch_point(
    placement: &Placement,
    user_scale: f64,
    user_offset: VectorD,
    content_point: PointD,
) -> PointD {
    if placement.is_empty() || user_scale <= 0.0 {
        return PointD::default();
    }
    calculate_base_transform(placement)
        .plus(&Transform::new(ScaleFactor::uniform(user_scale), user_offset))
        .apply(content_point, placement.content)
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Next scale in `steps` after `current_scale`, wrapping around to the first.
///
/// Scales are compared at one decimal, and a step must exceed the current
/// scale by more than `range_of_error` to count as the next one.
pub fn calculate_next_step_scale(steps: &[f64], current_scale: f64, range_of_error: f64) -> f64 {
    let Some(first) = steps.first() else {
        return current_scale;
    };
    let current = round_one_decimal(current_scale);
    steps
        .iter()
        .find(|step| round_one_decimal(**step) > current + range_of_error)
        .copied()
        .unwrap_or(*first)
}

/// Damped scale for targets outside `[min_scale, max_scale]`.
///
/// Inside the bounds the target is returned unchanged. Outside, only part of
/// the requested change is applied, and the further the target overshoots
/// the stronger the damping. The result always lies strictly between
/// `current_scale` and `target_scale` (unless they are equal).
pub fn limit_scale_with_rubber_band(
    current_scale: f64,
    target_scale: f64,
    min_scale: f64,
    max_scale: f64,
    ratio: f64,
    damping: f64,
) -> f64 {
    let progress = if target_scale > max_scale {
        (target_scale - max_scale) / (max_scale * (ratio - 1.0))
    } else if target_scale < min_scale {
        (min_scale - target_scale) / (min_scale - min_scale / ratio)
    } else {
        return target_scale;
    };
    if !progress.is_finite() {
        return current_scale;
    }
    current_scale + (target_scale - current_scale) * damping / (1.0 + progress)
}

/// User offset that keeps the container point `centroid` fixed while the user
/// scale changes from `current_scale` to `target_scale`.
pub fn calculate_user_offset_for_centroid(
    current_scale: f64,
    current_offset: VectorD,
    target_scale: f64,
    centroid: PointD,
) -> VectorD {
    if current_scale <= 0.0 {
        return current_offset;
    }
    let ratio = target_scale / current_scale;
    centroid - (centroid - current_offset).scale(ratio)
}

/// User offset that puts `content_point` in the middle of the container at
/// `user_scale`. Not yet limited to the offset bounds.
pub fn calculate_locate_user_offset(
    placement: &Placement,
    content_point: PointD,
    user_scale: f64,
) -> VectorD {
    if placement.is_empty() {
        return VectorD::default();
    }
    let base_point = calculate_base_transform(placement).apply(content_point, placement.content);
    placement.container.center() - base_point.scale(user_scale)
}
