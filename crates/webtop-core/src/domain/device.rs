//! Device classification.
//!
//! The shell adapts to the device it runs on: phones get a taller status bar
//! inset and swipe navigation, desktops get floating windows driven by a mouse.
//! Classification is a pure function of the viewport so it can be recomputed
//! on every (debounced) resize.

use serde::{Deserialize, Serialize};

use super::geometry::{Point, Rect, Size};

/// Broad device category derived from the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    Mobile,
    Tablet,
    Desktop,
}

/// Screen orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Portrait,
    Landscape,
}

/// Raw viewport measurements reported by the host surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    /// `true` when the primary input is a touch screen.
    pub touch: bool,
}

impl Viewport {
    pub const fn new(width: f64, height: f64, touch: bool) -> Self {
        Self {
            width,
            height,
            touch,
        }
    }

    /// Returns `true` when both dimensions are finite and positive.
    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// Breakpoints and insets used by [`DeviceProfile::classify`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeviceThresholds {
    /// Viewports narrower than this are phones.
    pub mobile_max_width: f64,
    /// Touch viewports narrower than this (and not phones) are tablets.
    pub tablet_max_width: f64,
    /// Height reserved for the menu bar on desktop and tablet.
    pub desktop_top_inset: f64,
    /// Height reserved for the status bar on phones.
    pub mobile_top_inset: f64,
}

impl Default for DeviceThresholds {
    fn default() -> Self {
        Self {
            mobile_max_width: 768.0,
            tablet_max_width: 1024.0,
            desktop_top_inset: 20.0,
            mobile_top_inset: 44.0,
        }
    }
}

/// The classified device: what kind of screen we are on and how much of it is
/// usable by the desktop surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeviceProfile {
    pub class: DeviceClass,
    pub orientation: Orientation,
    pub viewport: Viewport,
    /// Pixels at the top of the viewport reserved for system chrome.
    pub top_inset: f64,
}

impl DeviceProfile {
    /// Classifies a viewport.
    ///
    /// - width < `mobile_max_width` → [`DeviceClass::Mobile`]
    /// - width < `tablet_max_width` on a touch device → [`DeviceClass::Tablet`]
    /// - otherwise → [`DeviceClass::Desktop`]
    ///
    /// Orientation is portrait when the viewport is at least as tall as it is wide.
    pub fn classify(viewport: Viewport, thresholds: &DeviceThresholds) -> Self {
        let class = if viewport.width < thresholds.mobile_max_width {
            DeviceClass::Mobile
        } else if viewport.touch && viewport.width < thresholds.tablet_max_width {
            DeviceClass::Tablet
        } else {
            DeviceClass::Desktop
        };
        let orientation = if viewport.height >= viewport.width {
            Orientation::Portrait
        } else {
            Orientation::Landscape
        };
        let top_inset = match class {
            DeviceClass::Mobile => thresholds.mobile_top_inset,
            DeviceClass::Tablet | DeviceClass::Desktop => thresholds.desktop_top_inset,
        };
        Self {
            class,
            orientation,
            viewport,
            top_inset,
        }
    }

    pub fn is_mobile(&self) -> bool {
        self.class == DeviceClass::Mobile
    }

    /// The region available to windows and desktop icons: the whole viewport
    /// minus the chrome inset at the top.
    pub fn desktop_bounds(&self) -> Rect {
        Rect {
            origin: Point::new(0.0, self.top_inset),
            size: Size::new(
                self.viewport.width,
                (self.viewport.height - self.top_inset).max(0.0),
            ),
        }
    }
}
