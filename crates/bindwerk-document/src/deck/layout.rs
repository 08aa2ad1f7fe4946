// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Slide geometry — where an image of a given pixel size lands on the slide.
//
// Geometry is computed in canvas pixels at 96 per inch. The standard 10 x 7.5
// inch slide is therefore 960 x 720 canvas pixels, and one image pixel maps to
// one canvas pixel (9525 EMU).

use bindwerk_core::types::DeckLayout;

/// English Metric Units per inch, as used by DrawingML.
pub const EMU_PER_INCH: i64 = 914_400;
/// Canvas pixels per inch.
pub const PX_PER_INCH: i64 = 96;
/// EMU per canvas pixel.
pub const EMU_PER_PX: i64 = EMU_PER_INCH / PX_PER_INCH;

/// Slide dimensions in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlideCanvas {
    pub width: f64,
    pub height: f64,
}

impl SlideCanvas {
    /// 10 x 7.5 inch (4:3) slide.
    pub const STANDARD: Self = Self {
        width: 960.0,
        height: 720.0,
    };

    /// Offset of a blank-layout image from the top-left corner (0.5 inch).
    pub const BLANK_OFFSET: f64 = 48.0;

    pub fn width_emu(&self) -> i64 {
        px_to_emu(self.width)
    }

    pub fn height_emu(&self) -> i64 {
        px_to_emu(self.height)
    }

    /// Position and size of a `width` x `height` pixel image under `layout`.
    pub fn place(&self, layout: DeckLayout, width: u32, height: u32) -> Placement {
        let (w, h) = (f64::from(width), f64::from(height));
        match layout {
            DeckLayout::Blank => Placement {
                x: Self::BLANK_OFFSET,
                y: Self::BLANK_OFFSET,
                width: w,
                height: h,
            },
            DeckLayout::Centered => self.centre(w, h),
            DeckLayout::FullBleedFit => {
                if width == 0 || height == 0 {
                    return self.centre(w, h);
                }
                let scale = (self.width / w).min(self.height / h);
                self.centre(w * scale, h * scale)
            }
        }
    }

    fn centre(&self, width: f64, height: f64) -> Placement {
        Placement {
            x: (self.width - width) / 2.0,
            y: (self.height - height) / 2.0,
            width,
            height,
        }
    }
}

impl Default for SlideCanvas {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// An image rectangle in canvas pixels. Offsets are negative when a native-size
/// image is larger than the slide.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Placement {
    pub fn to_emu(&self) -> EmuRect {
        EmuRect {
            x: px_to_emu(self.x),
            y: px_to_emu(self.y),
            cx: px_to_emu(self.width),
            cy: px_to_emu(self.height),
        }
    }
}

/// A DrawingML transform (`a:off` / `a:ext`) in EMU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmuRect {
    pub x: i64,
    pub y: i64,
    pub cx: i64,
    pub cy: i64,
}

fn px_to_emu(px: f64) -> i64 {
    (px * EMU_PER_PX as f64).round() as i64
}
