//! Keyboard state shared between DOM callbacks and the frame loop.
//!
//! Key handlers only flip booleans; the frame loop turns the held set into a
//! [`CameraMotion`] once per frame, so movement speed is tied to frames and
//! not to the browser's key-repeat rate.

use nalgebra::Vector3;
use std::collections::HashMap;

/// Keys whose default page behaviour (scrolling) is suppressed when the
/// event belongs to a viewer.
pub const NAVIGATION_KEYS: [&str; 5] = ["ArrowUp", "ArrowDown", "ArrowLeft", "ArrowRight", " "];

pub fn is_navigation_key(key: &str) -> bool {
    NAVIGATION_KEYS.contains(&key)
}

/// What a viewer does with one page-level key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyRoute {
    pub accepted: bool,
    pub prevent_default: bool,
}

/// Events are taken when they target the viewer's container or fall through
/// to the page body, so several viewers on one page keep their own keys.
pub fn route_key(key: &str, inside_container: bool, is_body: bool) -> KeyRoute {
    let accepted = inside_container || is_body;
    KeyRoute { accepted, prevent_default: accepted && is_navigation_key(key) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPhase {
    Down,
    Up,
}

#[derive(Debug, Default, Clone)]
pub struct KeyState {
    keys: HashMap<String, bool>,
}

impl KeyState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&mut self, key: &str) {
        self.keys.insert(key.to_string(), true);
    }

    pub fn release(&mut self, key: &str) {
        self.keys.insert(key.to_string(), false);
    }

    pub fn is_pressed(&self, key: &str) -> bool {
        self.keys.get(key).copied().unwrap_or(false)
    }

    /// Applies one page-level key event. Events owned by something else on
    /// the page leave the state untouched. Only key-down suppresses scrolling.
    pub fn handle(&mut self, phase: KeyPhase, key: &str, inside_container: bool, is_body: bool) -> KeyRoute {
        let route = route_key(key, inside_container, is_body);
        if !route.accepted {
            return route;
        }
        match phase {
            KeyPhase::Down => {
                self.press(key);
                route
            }
            KeyPhase::Up => {
                self.release(key);
                KeyRoute { prevent_default: false, ..route }
            }
        }
    }

    fn any(&self, keys: &[&str]) -> bool {
        keys.iter().any(|k| self.is_pressed(k))
    }

    /// Per-frame camera deltas for the currently held keys.
    pub fn motion(&self, move_speed: f32, rotate_speed: f32) -> CameraMotion {
        let mut motion = CameraMotion::default();

        if self.any(&["w", "W"]) {
            motion.translate.z -= move_speed;
        }
        if self.any(&["s", "S"]) {
            motion.translate.z += move_speed;
        }
        if self.any(&["a", "A"]) {
            motion.translate.x -= move_speed;
        }
        if self.any(&["d", "D"]) {
            motion.translate.x += move_speed;
        }

        if self.is_pressed("ArrowLeft") {
            motion.yaw += rotate_speed;
        }
        if self.is_pressed("ArrowRight") {
            motion.yaw -= rotate_speed;
        }
        if self.is_pressed("ArrowUp") {
            motion.pitch += rotate_speed;
        }
        if self.is_pressed("ArrowDown") {
            motion.pitch -= rotate_speed;
        }

        motion
    }
}

/// Camera-local translation plus yaw/pitch increments for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraMotion {
    pub translate: Vector3<f32>,
    pub yaw: f32,
    pub pitch: f32,
}

impl Default for CameraMotion {
    fn default() -> Self {
        CameraMotion { translate: Vector3::zeros(), yaw: 0.0, pitch: 0.0 }
    }
}

impl CameraMotion {
    pub fn is_idle(&self) -> bool {
        *self == CameraMotion::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_press_is_idempotent() {
        let mut keys = KeyState::new();
        keys.press("w");
        keys.press("w");
        assert!(keys.is_pressed("w"));
        keys.release("w");
        assert!(!keys.is_pressed("w"));
    }

    #[test]
    fn idle_when_nothing_held() {
        let keys = KeyState::new();
        assert!(keys.motion(1.0, 0.02).is_idle());
    }

    #[test]
    fn wasd_maps_to_local_axes_either_case() {
        let mut keys = KeyState::new();
        keys.press("W");
        keys.press("d");
        let motion = keys.motion(2.0, 0.02);
        assert_eq!(motion.translate, Vector3::new(2.0, 0.0, -2.0));
    }

    #[test]
    fn opposite_keys_cancel() {
        let mut keys = KeyState::new();
        keys.press("ArrowLeft");
        keys.press("ArrowRight");
        keys.press("ArrowUp");
        let motion = keys.motion(1.0, 0.02);
        assert_eq!(motion.yaw, 0.0);
        assert_eq!(motion.pitch, 0.02);
    }

    #[test]
    fn foreign_targets_are_left_alone() {
        let route = route_key("ArrowUp", false, false);
        assert!(!route.accepted);
        assert!(!route.prevent_default);
    }

    #[test]
    fn body_target_is_accepted() {
        assert_eq!(route_key("ArrowDown", false, true), KeyRoute { accepted: true, prevent_default: true });
        assert_eq!(route_key("w", true, false), KeyRoute { accepted: true, prevent_default: false });
    }

    #[test]
    fn keyup_is_routed_like_keydown() {
        let mut keys = KeyState::new();
        let down = keys.handle(KeyPhase::Down, "ArrowUp", false, true);
        assert!(down.accepted && down.prevent_default);
        assert!(keys.is_pressed("ArrowUp"));

        // released somewhere else on the page: still held here
        let foreign = keys.handle(KeyPhase::Up, "ArrowUp", false, false);
        assert!(!foreign.accepted);
        assert!(keys.is_pressed("ArrowUp"));

        let up = keys.handle(KeyPhase::Up, "ArrowUp", false, true);
        assert_eq!(up, KeyRoute { accepted: true, prevent_default: false });
        assert!(!keys.is_pressed("ArrowUp"));
    }

    #[test]
    fn foreign_keydown_is_not_recorded() {
        let mut keys = KeyState::new();
        keys.handle(KeyPhase::Down, "w", false, false);
        assert!(!keys.is_pressed("w"));
        assert!(keys.motion(1.0, 0.02).is_idle());
    }

    #[test]
    fn only_arrows_and_space_are_navigation_keys() {
        assert!(is_navigation_key("ArrowUp"));
        assert!(is_navigation_key(" "));
        assert!(!is_navigation_key("w"));
        assert!(!is_navigation_key("Enter"));
    }
}
