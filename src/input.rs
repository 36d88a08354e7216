//! Keyboard input snapshots and the key-binding action table.
//!
//! [`InputState`] keeps three maps, each key code to the instant it fired:
//! keys currently held, keys pressed this tick, keys released this tick.
//! The pressed/released maps are cleared at the end of every tick; the held
//! map persists until the key goes up. OS key repeat is filtered out.
//!
//! [`KeyBindings`] is the configuration table mapping keys to camera and
//! light mutator actions; [`KeyBindings::apply`] runs once per tick against
//! the current snapshots.

use std::collections::HashMap;
use std::time::Instant;

use glam::Vec3;
use winit::event::{ElementState, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::scene::Scene;
use crate::uniform::{UniformTier, UniformValue};

/// Per-tick keyboard snapshots.
#[derive(Default)]
pub struct InputState {
    held: HashMap<KeyCode, Instant>,
    pressed: HashMap<KeyCode, Instant>,
    released: HashMap<KeyCode, Instant>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a window event into the snapshots.
    pub fn handle_event(&mut self, event: &WindowEvent) {
        if let WindowEvent::KeyboardInput { event, .. } = event {
            if let PhysicalKey::Code(key) = event.physical_key {
                match event.state {
                    ElementState::Pressed => self.key_down(key, Instant::now()),
                    ElementState::Released => self.key_up(key, Instant::now()),
                }
            }
        }
    }

    fn key_down(&mut self, key: KeyCode, at: Instant) {
        // Held already => OS key repeat, not a new press.
        if !self.held.contains_key(&key) {
            self.pressed.insert(key, at);
            self.held.insert(key, at);
        }
    }

    fn key_up(&mut self, key: KeyCode, at: Instant) {
        self.held.remove(&key);
        self.released.insert(key, at);
    }

    /// Clear the per-tick maps. Call once after actions run.
    pub fn end_tick(&mut self) {
        self.pressed.clear();
        self.released.clear();
    }

    pub fn is_held(&self, key: KeyCode) -> bool {
        self.held.contains_key(&key)
    }

    pub fn was_pressed(&self, key: KeyCode) -> bool {
        self.pressed.contains_key(&key)
    }

    pub fn was_released(&self, key: KeyCode) -> bool {
        self.released.contains_key(&key)
    }

    pub fn held(&self) -> &HashMap<KeyCode, Instant> {
        &self.held
    }

    pub fn pressed(&self) -> &HashMap<KeyCode, Instant> {
        &self.pressed
    }

    pub fn released(&self) -> &HashMap<KeyCode, Instant> {
        &self.released
    }
}

/// When a binding fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trigger {
    /// Every tick while the key is held; the action scales with dt.
    Held,
    /// Once on the tick the key went down.
    Pressed,
    /// Once on the tick the key went up.
    Released,
}

/// Continuous camera mutations, applied to the viewer or light camera.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CameraAction {
    /// Orbit about the world Y axis through the look target.
    Orbit(f32),
    /// Orbit vertically about the tilt axis.
    OrbitVert(f32),
    /// Zoom toward (positive) or away from (negative) the look target.
    Zoom(f32),
    Yaw(f32),
    Tilt(f32),
    Roll(f32),
}

impl CameraAction {
    fn apply(self, camera: &mut crate::camera::Camera, dt: f32) {
        match self {
            CameraAction::Orbit(speed) => {
                camera.rotate_around(speed * dt, Vec3::Y);
            }
            CameraAction::OrbitVert(speed) => {
                camera.rotate_around_vert(speed * dt);
            }
            CameraAction::Zoom(speed) => {
                camera.zoom(speed * dt);
            }
            CameraAction::Yaw(speed) => {
                camera.yaw(speed * dt);
            }
            CameraAction::Tilt(speed) => {
                camera.tilt(speed * dt);
            }
            CameraAction::Roll(speed) => {
                camera.roll(speed * dt);
            }
        }
    }
}

/// What a binding does when it fires.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Action {
    Camera(CameraAction),
    Light(CameraAction),
    /// Force mesh-tier `lighting_on` off, or clear the override.
    ToggleLighting,
    /// Force scene-tier `shadows_on` off, or clear the override.
    ToggleShadows,
}

/// One row of the binding table.
#[derive(Clone, Copy, Debug)]
pub struct Binding {
    pub key: KeyCode,
    pub trigger: Trigger,
    pub action: Action,
}

/// The key-to-action configuration table.
pub struct KeyBindings {
    pub bindings: Vec<Binding>,
}

impl Default for KeyBindings {
    /// Arrow keys orbit the viewer, W/S zoom, A/D yaw, Q/E roll, J/L orbit
    /// the light, 1 toggles lighting, 2 toggles shadows.
    fn default() -> Self {
        use KeyCode::*;
        let held = |key, action| Binding {
            key,
            trigger: Trigger::Held,
            action,
        };
        let pressed = |key, action| Binding {
            key,
            trigger: Trigger::Pressed,
            action,
        };
        Self {
            bindings: vec![
                held(ArrowLeft, Action::Camera(CameraAction::Orbit(1.5))),
                held(ArrowRight, Action::Camera(CameraAction::Orbit(-1.5))),
                held(ArrowUp, Action::Camera(CameraAction::OrbitVert(1.0))),
                held(ArrowDown, Action::Camera(CameraAction::OrbitVert(-1.0))),
                held(KeyW, Action::Camera(CameraAction::Zoom(8.0))),
                held(KeyS, Action::Camera(CameraAction::Zoom(-8.0))),
                held(KeyA, Action::Camera(CameraAction::Yaw(1.0))),
                held(KeyD, Action::Camera(CameraAction::Yaw(-1.0))),
                held(KeyQ, Action::Camera(CameraAction::Roll(1.0))),
                held(KeyE, Action::Camera(CameraAction::Roll(-1.0))),
                held(KeyJ, Action::Light(CameraAction::Orbit(1.0))),
                held(KeyL, Action::Light(CameraAction::Orbit(-1.0))),
                pressed(Digit1, Action::ToggleLighting),
                pressed(Digit2, Action::ToggleShadows),
            ],
        }
    }
}

impl KeyBindings {
    /// Apply every binding whose trigger matched this tick.
    pub fn apply(&self, input: &InputState, scene: &mut Scene, dt: f32) {
        for binding in &self.bindings {
            let fired = match binding.trigger {
                Trigger::Held => input.is_held(binding.key),
                Trigger::Pressed => input.was_pressed(binding.key),
                Trigger::Released => input.was_released(binding.key),
            };
            if !fired {
                continue;
            }
            match binding.action {
                Action::Camera(action) => action.apply(&mut scene.camera, dt),
                Action::Light(action) => action.apply(&mut scene.light, dt),
                Action::ToggleLighting => {
                    if !scene.unforce(UniformTier::Mesh, "lighting_on") {
                        scene.force(UniformTier::Mesh, "lighting_on", UniformValue::Int(0));
                    }
                }
                Action::ToggleShadows => {
                    if !scene.unforce(UniformTier::Scene, "shadows_on") {
                        scene.force(UniformTier::Scene, "shadows_on", UniformValue::Int(0));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Camera;

    #[test]
    fn press_and_release_live_for_one_tick() {
        let mut input = InputState::new();
        let now = Instant::now();

        input.key_down(KeyCode::KeyW, now);
        assert!(input.was_pressed(KeyCode::KeyW));
        assert!(input.is_held(KeyCode::KeyW));

        input.end_tick();
        assert!(!input.was_pressed(KeyCode::KeyW));
        assert!(input.is_held(KeyCode::KeyW), "held persists across ticks");

        input.key_up(KeyCode::KeyW, now);
        assert!(input.was_released(KeyCode::KeyW));
        assert!(!input.is_held(KeyCode::KeyW));

        input.end_tick();
        assert!(!input.was_released(KeyCode::KeyW));
    }

    #[test]
    fn key_repeat_does_not_refire_pressed() {
        let mut input = InputState::new();
        let now = Instant::now();
        input.key_down(KeyCode::Space, now);
        input.end_tick();
        input.key_down(KeyCode::Space, now);
        assert!(
            !input.was_pressed(KeyCode::Space),
            "repeat while held is not a new press"
        );
    }

    fn test_scene() -> Scene {
        Scene::new(
            Camera::new(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, Vec3::Y),
            Camera::new(Vec3::new(0.0, 20.0, 10.0), Vec3::ZERO, Vec3::Y),
        )
    }

    #[test]
    fn held_binding_mutates_the_camera() {
        let mut input = InputState::new();
        input.key_down(KeyCode::KeyW, Instant::now());

        let mut scene = test_scene();
        let before = scene.camera.look_distance();
        KeyBindings::default().apply(&input, &mut scene, 0.1);
        assert!(scene.camera.look_distance() < before, "W zooms in");
    }

    #[test]
    fn lighting_toggle_forces_and_clears() {
        let mut input = InputState::new();
        let mut scene = test_scene();
        let bindings = KeyBindings::default();

        input.key_down(KeyCode::Digit1, Instant::now());
        bindings.apply(&input, &mut scene, 0.016);
        assert!(scene.is_forced(UniformTier::Mesh, "lighting_on"));
        input.end_tick();

        // Held but not newly pressed: no refire.
        bindings.apply(&input, &mut scene, 0.016);
        assert!(scene.is_forced(UniformTier::Mesh, "lighting_on"));

        input.key_up(KeyCode::Digit1, Instant::now());
        input.end_tick();
        input.key_down(KeyCode::Digit1, Instant::now());
        bindings.apply(&input, &mut scene, 0.016);
        assert!(!scene.is_forced(UniformTier::Mesh, "lighting_on"));
    }
}
