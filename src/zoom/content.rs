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

use crate::rect::{ScaleFactor, SizeD, VectorD};

/// Defines how the content is initially scaled to the container.
#[derive(Default, Debug, Eq, PartialEq, Hash, Clone, Copy)]
pub enum ContentScale {
    /// Scale down or up so the content fits entirely, keeping the aspect ratio
    #[default]
    Fit,
    /// Stretch each axis independently to fill the container exactly
    FillBounds,
    /// Match the container width, keeping the aspect ratio
    FillWidth,
    /// Match the container height, keeping the aspect ratio
    FillHeight,
    /// Fill the container completely, cropping whatever does not fit
    Crop,
    /// Like `Fit`, but never scales content up
    Inside,
    /// Display the content at its own size
    None,
}

impl ContentScale {
    /// Computes the scale that maps `src` onto `dst` for this mode.
    ///
    /// # Arguments
    /// * `src` - Size of the content, already rotated
    /// * `dst` - Size of the container
    ///
    /// # Returns
    /// * The scale factor, `ScaleFactor::ONE` when either size is empty
    pub fn compute_scale_factor(&self, src: SizeD, dst: SizeD) -> ScaleFactor {
        if src.is_empty() || dst.is_empty() {
            return ScaleFactor::ONE;
        }
        let width_scale = dst.width() / src.width();
        let height_scale = dst.height() / src.height();
        match self {
            ContentScale::Fit => ScaleFactor::uniform(width_scale.min(height_scale)),
            ContentScale::FillBounds => ScaleFactor::new(width_scale, height_scale),
            ContentScale::FillWidth => ScaleFactor::uniform(width_scale),
            ContentScale::FillHeight => ScaleFactor::uniform(height_scale),
            ContentScale::Crop => ScaleFactor::uniform(width_scale.max(height_scale)),
            ContentScale::Inside => {
                if src.width() <= dst.width() && src.height() <= dst.height() {
                    ScaleFactor::ONE
                } else {
                    ScaleFactor::uniform(width_scale.min(height_scale))
                }
            }
            ContentScale::None => ScaleFactor::ONE,
        }
    }
}

impl From<&str> for ContentScale {
    fn from(value: &str) -> Self {
        match value {
            "fill-bounds" => ContentScale::FillBounds,
            "fill-width" => ContentScale::FillWidth,
            "fill-height" => ContentScale::FillHeight,
            "crop" => ContentScale::Crop,
            "inside" => ContentScale::Inside,
            "none" => ContentScale::None,
            _ => ContentScale::Fit,
        }
    }
}

impl From<ContentScale> for &str {
    fn from(value: ContentScale) -> Self {
        match value {
            ContentScale::Fit => "fit",
            ContentScale::FillBounds => "fill-bounds",
            ContentScale::FillWidth => "fill-width",
            ContentScale::FillHeight => "fill-height",
            ContentScale::Crop => "crop",
            ContentScale::Inside => "inside",
            ContentScale::None => "none",
        }
    }
}

/// Position along a single axis
#[derive(Debug, Eq, PartialEq, Hash, Clone, Copy)]
pub enum AxisAlignment {
    Start,
    Center,
    End,
}

impl AxisAlignment {
    pub fn is_start(&self) -> bool {
        *self == AxisAlignment::Start
    }

    pub fn is_center(&self) -> bool {
        *self == AxisAlignment::Center
    }

    pub fn is_end(&self) -> bool {
        *self == AxisAlignment::End
    }

    /// Offset of an item of length `size` placed in a space of length `space`.
    /// Negative when the item is larger than the space.
    pub fn align(&self, size: f64, space: f64) -> f64 {
        match self {
            AxisAlignment::Start => 0.0,
            AxisAlignment::Center => (space - size) / 2.0,
            AxisAlignment::End => space - size,
        }
    }
}

/// Where the content is placed in the container when it does not fill it.
#[derive(Default, Debug, Eq, PartialEq, Hash, Clone, Copy)]
pub enum Alignment {
    TopStart,
    TopCenter,
    TopEnd,
    CenterStart,
    #[default]
    Center,
    CenterEnd,
    BottomStart,
    BottomCenter,
    BottomEnd,
}

impl Alignment {
    pub fn horizontal(&self) -> AxisAlignment {
        match self {
            Alignment::TopStart | Alignment::CenterStart | Alignment::BottomStart => {
                AxisAlignment::Start
            }
            Alignment::TopCenter | Alignment::Center | Alignment::BottomCenter => {
                AxisAlignment::Center
            }
            Alignment::TopEnd | Alignment::CenterEnd | Alignment::BottomEnd => AxisAlignment::End,
        }
    }

    pub fn vertical(&self) -> AxisAlignment {
        match self {
            Alignment::TopStart | Alignment::TopCenter | Alignment::TopEnd => AxisAlignment::Start,
            Alignment::CenterStart | Alignment::Center | Alignment::CenterEnd => {
                AxisAlignment::Center
            }
            Alignment::BottomStart | Alignment::BottomCenter | Alignment::BottomEnd => {
                AxisAlignment::End
            }
        }
    }

    pub fn axis(&self, horizontal: bool) -> AxisAlignment {
        if horizontal {
            self.horizontal()
        } else {
            self.vertical()
        }
    }

    /// Offset of the top-left corner of `size` when aligned in `space`
    pub fn align(&self, size: SizeD, space: SizeD) -> VectorD {
        VectorD::new(
            self.horizontal().align(size.width(), space.width()),
            self.vertical().align(size.height(), space.height()),
        )
    }
}

impl From<&str> for Alignment {
    fn from(value: &str) -> Self {
        match value {
            "top-start" => Alignment::TopStart,
            "top-center" => Alignment::TopCenter,
            "top-end" => Alignment::TopEnd,
            "center-start" => Alignment::CenterStart,
            "center-end" => Alignment::CenterEnd,
            "bottom-start" => Alignment::BottomStart,
            "bottom-center" => Alignment::BottomCenter,
            "bottom-end" => Alignment::BottomEnd,
            _ => Alignment::Center,
        }
    }
}

impl From<Alignment> for &str {
    fn from(value: Alignment) -> Self {
        match value {
            Alignment::TopStart => "top-start",
            Alignment::TopCenter => "top-center",
            Alignment::TopEnd => "top-end",
            Alignment::CenterStart => "center-start",
            Alignment::Center => "center",
            Alignment::CenterEnd => "center-end",
            Alignment::BottomStart => "bottom-start",
            Alignment::BottomCenter => "bottom-center",
            Alignment::BottomEnd => "bottom-end",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SRC: SizeD = SizeD::new(400.0, 200.0);
    const DST: SizeD = SizeD::new(1000.0, 1000.0);

    #[test]
    fn test_compute_scale_factor() {
        assert_eq!(ContentScale::Fit.compute_scale_factor(SRC, DST), ScaleFactor::uniform(2.5));
        assert_eq!(ContentScale::Crop.compute_scale_factor(SRC, DST), ScaleFactor::uniform(5.0));
        assert_eq!(
            ContentScale::FillBounds.compute_scale_factor(SRC, DST),
            ScaleFactor::new(2.5, 5.0)
        );
        assert_eq!(
            ContentScale::FillWidth.compute_scale_factor(SRC, DST),
            ScaleFactor::uniform(2.5)
        );
        assert_eq!(
            ContentScale::FillHeight.compute_scale_factor(SRC, DST),
            ScaleFactor::uniform(5.0)
        );
        assert_eq!(ContentScale::Inside.compute_scale_factor(SRC, DST), ScaleFactor::ONE);
        assert_eq!(
            ContentScale::Inside.compute_scale_factor(DST, SRC),
            ScaleFactor::uniform(0.2)
        );
        assert_eq!(ContentScale::None.compute_scale_factor(SRC, DST), ScaleFactor::ONE);
        assert_eq!(
            ContentScale::Fit.compute_scale_factor(SizeD::default(), DST),
            ScaleFactor::ONE
        );
    }

    #[test]
    fn test_align() {
        let size = SizeD::new(100.0, 50.0);
        let space = SizeD::new(300.0, 150.0);
        assert_eq!(Alignment::TopStart.align(size, space), VectorD::new(0.0, 0.0));
        assert_eq!(Alignment::Center.align(size, space), VectorD::new(100.0, 50.0));
        assert_eq!(Alignment::BottomEnd.align(size, space), VectorD::new(200.0, 100.0));
        assert_eq!(Alignment::CenterEnd.align(size, space), VectorD::new(200.0, 50.0));
        // Larger than the space gives a negative offset
        assert_eq!(Alignment::Center.align(space, size), VectorD::new(-100.0, -50.0));
    }

    #[test]
    fn test_axis() {
        assert!(Alignment::BottomStart.horizontal().is_start());
        assert!(Alignment::BottomStart.vertical().is_end());
        assert!(Alignment::TopCenter.axis(true).is_center());
        assert!(Alignment::TopCenter.axis(false).is_start());
    }

    #[test]
    fn test_string_conversion() {
        for scale in [
            ContentScale::Fit,
            ContentScale::FillBounds,
            ContentScale::Crop,
            ContentScale::None,
        ] {
            let name: &str = scale.into();
            assert_eq!(ContentScale::from(name), scale);
        }
        let name: &str = Alignment::BottomCenter.into();
        assert_eq!(name, "bottom-center");
        assert_eq!(Alignment::from("unknown"), Alignment::Center);
    }
}
