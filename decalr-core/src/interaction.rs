//! Click detection for pointer input
//!
//! Pointer down/up pairs only count as a click when the pointer barely moved;
//! anything larger is a drag (the camera orbit gesture) and places nothing.
use crate::projection::ScreenPoint;

/// Default movement tolerance between press and release, in pixels
pub const CLICK_THRESHOLD_PX: f32 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    Pressed { down: ScreenPoint },
}

/// Emitted on a release close enough to its press
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Click {
    pub position: ScreenPoint,
}

#[derive(Debug, Clone)]
pub struct InteractionController {
    state: InteractionState,
    threshold_sq: f32,
}

impl InteractionController {
    pub fn new(threshold_px: f32) -> Self {
        Self {
            state: InteractionState::Idle,
            threshold_sq: threshold_px * threshold_px,
        }
    }

    pub fn state(&self) -> InteractionState {
        self.state
    }

    pub fn pointer_down(&mut self, position: ScreenPoint) {
        self.state = InteractionState::Pressed { down: position };
    }

    /// Ends the gesture. A release at exactly the threshold is a drag.
    pub fn pointer_up(&mut self, position: ScreenPoint) -> Option<Click> {
        let InteractionState::Pressed { down } = std::mem::take(&mut self.state) else {
            return None;
        };

        let distance_sq = (position - down).norm_squared();
        (distance_sq < self.threshold_sq).then_some(Click { position })
    }
}

impl Default for InteractionController {
    fn default() -> Self {
        Self::new(CLICK_THRESHOLD_PX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(down: (f32, f32), up: (f32, f32)) -> Option<Click> {
        let mut controller = InteractionController::default();
        controller.pointer_down(ScreenPoint::new(down.0, down.1));
        let click = controller.pointer_up(ScreenPoint::new(up.0, up.1));
        assert_eq!(controller.state(), InteractionState::Idle);
        click
    }

    #[test]
    fn test_same_position_clicks() {
        let click = pair((100.0, 80.0), (100.0, 80.0)).unwrap();
        assert_eq!(click.position, ScreenPoint::new(100.0, 80.0));
    }

    #[test]
    fn test_small_jitter_clicks() {
        assert!(pair((100.0, 80.0), (103.0, 83.0)).is_some());
    }

    #[test]
    fn test_drag_is_not_a_click() {
        assert!(pair((100.0, 80.0), (140.0, 80.0)).is_none());
    }

    #[test]
    fn test_exact_threshold_is_not_a_click() {
        assert!(pair((0.0, 0.0), (5.0, 0.0)).is_none());
        assert!(pair((0.0, 0.0), (3.0, 4.0)).is_none());
    }

    #[test]
    fn test_release_without_press_is_ignored() {
        let mut controller = InteractionController::default();
        assert!(controller.pointer_up(ScreenPoint::new(1.0, 1.0)).is_none());
    }

    #[test]
    fn test_each_press_clicks_once() {
        let mut controller = InteractionController::default();
        controller.pointer_down(ScreenPoint::new(10.0, 10.0));
        assert!(controller.pointer_up(ScreenPoint::new(10.0, 10.0)).is_some());
        assert!(controller.pointer_up(ScreenPoint::new(10.0, 10.0)).is_none());
    }

    #[test]
    fn test_custom_threshold() {
        let mut controller = InteractionController::new(20.0);
        controller.pointer_down(ScreenPoint::new(0.0, 0.0));
        assert!(controller.pointer_up(ScreenPoint::new(12.0, 12.0)).is_some());
    }
}
