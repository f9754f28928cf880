//! Swipe gesture classification.
//!
//! A gesture is recognised from two samples only: where the pointer went down
//! and where it came up.  The rule set is deliberately small and must stay
//! exactly as documented on [`classify_gesture`] because app-switching muscle
//! memory depends on it.
//!
//! # Classification at a glance (for beginners)
//!
//! ```text
//!          dy < 0 : swipe_up
//!              ▲
//!  dx < 0 ◄────●────► dx > 0
//!  swipe_left  │      swipe_right
//!              ▼
//!          dy > 0 : swipe_down
//! ```
//!
//! The dominant axis wins (`|dx| > |dy|` → horizontal; ties go vertical).
//! Anything that moved less than the threshold on both axes is a tap.

use serde::{Deserialize, Serialize};

use super::geometry::Point;

/// The recognised gesture types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureKind {
    SwipeUp,
    SwipeDown,
    SwipeLeft,
    SwipeRight,
    /// Horizontal swipe that started at the left screen edge.
    EdgeSwipeLeft,
    /// Horizontal swipe that started at the right screen edge.
    EdgeSwipeRight,
}

/// A classified gesture, published once on the bus and then discarded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gesture {
    pub kind: GestureKind,
    pub start: Point,
    pub end: Point,
    pub duration_ms: u64,
}

/// Tunables for [`classify_gesture`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GestureThresholds {
    /// Minimum travel on the dominant axis, in pixels.
    pub swipe_threshold: f64,
    /// Width of the strip along the left and right screen edges where a
    /// horizontal swipe becomes an edge swipe.
    pub edge_margin: f64,
}

impl Default for GestureThresholds {
    fn default() -> Self {
        Self {
            swipe_threshold: 50.0,
            edge_margin: 20.0,
        }
    }
}

/// Classifies a completed pointer interaction.
///
/// Rules, applied in order:
///
/// 1. `max(|dx|, |dy|) < swipe_threshold` → `None` (a tap, handled elsewhere).
/// 2. `|dx| > |dy|` → horizontal swipe by the sign of `dx`.  If the swipe
///    started within `edge_margin` of the left or right edge of a
///    `screen_width`-wide screen it becomes [`GestureKind::EdgeSwipeLeft`] or
///    [`GestureKind::EdgeSwipeRight`] respectively.
/// 3. Otherwise → vertical swipe by the sign of `dy`.
///
/// Non-finite coordinates are malformed input and also yield `None`.
pub fn classify_gesture(
    start: Point,
    end: Point,
    duration_ms: u64,
    screen_width: f64,
    thresholds: &GestureThresholds,
) -> Option<Gesture> {
    if !start.is_finite() || !end.is_finite() {
        return None;
    }

    let (dx, dy) = end.delta_from(start);
    if dx.abs().max(dy.abs()) < thresholds.swipe_threshold {
        return None;
    }

    let kind = if dx.abs() > dy.abs() {
        if start.x <= thresholds.edge_margin {
            GestureKind::EdgeSwipeLeft
        } else if screen_width.is_finite() && start.x >= screen_width - thresholds.edge_margin {
            GestureKind::EdgeSwipeRight
        } else if dx > 0.0 {
            GestureKind::SwipeRight
        } else {
            GestureKind::SwipeLeft
        }
    } else if dy > 0.0 {
        GestureKind::SwipeDown
    } else {
        GestureKind::SwipeUp
    };

    Some(Gesture {
        kind,
        start,
        end,
        duration_ms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const WIDTH: f64 = 390.0;

    fn classify(start: (f64, f64), end: (f64, f64), duration_ms: u64) -> Option<GestureKind> {
        classify_gesture(
            Point::new(start.0, start.1),
            Point::new(end.0, end.1),
            duration_ms,
            WIDTH,
            &GestureThresholds::default(),
        )
        .map(|g| g.kind)
    }

    #[test]
    fn test_dominant_horizontal_travel_is_swipe_right() {
        // Arrange / Act – dx=90, dy=10 over 200ms
        let kind = classify((100.0, 300.0), (190.0, 310.0), 200);

        // Assert
        assert_eq!(kind, Some(GestureKind::SwipeRight));
    }

    #[test]
    fn test_small_travel_is_not_a_gesture() {
        // dx=10, dy=10 over 100ms is below the 50px threshold
        assert_eq!(classify((100.0, 300.0), (110.0, 310.0), 100), None);
    }

    #[test]
    fn test_travel_just_below_threshold_is_not_a_gesture() {
        assert_eq!(classify((100.0, 300.0), (149.9, 300.0), 100), None);
    }

    #[test]
    fn test_travel_at_threshold_is_a_gesture() {
        assert_eq!(
            classify((100.0, 300.0), (50.0, 300.0), 100),
            Some(GestureKind::SwipeLeft)
        );
    }

    #[test]
    fn test_vertical_swipes_follow_sign_of_dy() {
        assert_eq!(
            classify((200.0, 400.0), (210.0, 300.0), 150),
            Some(GestureKind::SwipeUp)
        );
        assert_eq!(
            classify((200.0, 100.0), (190.0, 260.0), 150),
            Some(GestureKind::SwipeDown)
        );
    }

    #[test]
    fn test_equal_axes_classify_as_vertical() {
        assert_eq!(
            classify((200.0, 200.0), (260.0, 260.0), 100),
            Some(GestureKind::SwipeDown)
        );
    }

    #[test]
    fn test_horizontal_swipe_from_left_edge_is_edge_swipe_left() {
        assert_eq!(
            classify((5.0, 300.0), (150.0, 300.0), 120),
            Some(GestureKind::EdgeSwipeLeft)
        );
    }

    #[test]
    fn test_horizontal_swipe_from_right_edge_is_edge_swipe_right() {
        assert_eq!(
            classify((385.0, 300.0), (200.0, 290.0), 120),
            Some(GestureKind::EdgeSwipeRight)
        );
    }

    #[test]
    fn test_vertical_swipe_from_edge_stays_vertical() {
        assert_eq!(
            classify((5.0, 100.0), (10.0, 300.0), 120),
            Some(GestureKind::SwipeDown)
        );
    }

    #[test]
    fn test_nan_positions_are_ignored() {
        assert_eq!(classify((f64::NAN, 0.0), (200.0, 0.0), 100), None);
    }

    #[test]
    fn test_gesture_carries_geometry_and_duration() {
        // Arrange
        let start = Point::new(100.0, 300.0);
        let end = Point::new(190.0, 310.0);

        // Act
        let gesture =
            classify_gesture(start, end, 200, WIDTH, &GestureThresholds::default()).unwrap();

        // Assert
        assert_eq!(gesture.start, start);
        assert_eq!(gesture.end, end);
        assert_eq!(gesture.duration_ms, 200);
    }
}
