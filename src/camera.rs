//! Viewer and light cameras with a lazily recomputed view matrix.
//!
//! A [`Camera`] is three vectors — position, look target, up — plus a
//! cached view matrix. Every mutator drops the cache; [`Camera::view_matrix`]
//! recomputes it at most once per mutation. All orbit-style operations are
//! built on [`rotation_about_line`]: a rotation about an axis anchored at a
//! pivot point (the look target for orbiting, the position for yaw/tilt).

use glam::{Mat4, Vec3};

use crate::transform::rotation_about_line;

/// Zoom clamp: the camera never gets closer to its look target than this.
pub const MIN_LOOK_DISTANCE: f32 = 1e-4;

/// A look-at camera with cached view matrix and orbit/zoom/pan mutators.
#[derive(Clone, Debug)]
pub struct Camera {
    pos: Vec3,
    look: Vec3,
    up: Vec3,
    /// Vertical field of view in radians, used by [`Camera::perspective`].
    pub fov_y: f32,
    /// Near plane distance for the projection matrix.
    pub near: f32,
    /// Far plane distance for the projection matrix.
    pub far: f32,
    view: Option<Mat4>,
}

impl Camera {
    /// Create a camera at `pos` looking at `look` with the given up hint.
    ///
    /// # Panics
    ///
    /// Panics when `up` is (anti)parallel to the look direction or when
    /// `pos == look` — both are contract violations that would produce a
    /// degenerate view basis.
    pub fn new(pos: Vec3, look: Vec3, up: Vec3) -> Self {
        let forward = look - pos;
        assert!(
            forward.length_squared() > 0.0,
            "camera position and look target must differ"
        );
        assert!(up.length_squared() > 0.0, "up vector must be non-zero");
        assert!(
            forward.normalize().cross(up.normalize()).length_squared() > 1e-10,
            "up vector must not be parallel to the look direction"
        );
        Self {
            pos,
            look,
            up,
            fov_y: std::f32::consts::FRAC_PI_4,
            near: 0.1,
            far: 1000.0,
            view: None,
        }
    }

    pub fn pos(&self) -> Vec3 {
        self.pos
    }

    pub fn look(&self) -> Vec3 {
        self.look
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    pub fn set_pos(&mut self, pos: Vec3) -> &mut Self {
        self.pos = pos;
        self.invalidate()
    }

    pub fn set_look(&mut self, look: Vec3) -> &mut Self {
        self.look = look;
        self.invalidate()
    }

    pub fn set_up(&mut self, up: Vec3) -> &mut Self {
        self.up = up;
        self.invalidate()
    }

    /// Vector from the position to the look target.
    pub fn look_vector(&self) -> Vec3 {
        self.look - self.pos
    }

    /// Distance from the position to the look target.
    pub fn look_distance(&self) -> f32 {
        self.look_vector().length()
    }

    /// Whether the view matrix cache is currently valid. Exposed so callers
    /// (and tests) can observe the recompute-once contract.
    pub fn has_cached_view(&self) -> bool {
        self.view.is_some()
    }

    /// The view matrix, recomputed lazily after any mutation.
    pub fn view_matrix(&mut self) -> Mat4 {
        match self.view {
            Some(m) => m,
            None => {
                let m = Mat4::look_at_rh(self.pos, self.look, self.up);
                self.view = Some(m);
                m
            }
        }
    }

    /// Perspective projection for the current fov/near/far at `aspect`.
    pub fn perspective(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, aspect, self.near, self.far)
    }

    /// Translate position and look target together.
    pub fn pan(&mut self, delta: Vec3) -> &mut Self {
        self.pos += delta;
        self.look += delta;
        self.invalidate()
    }

    /// Orbit the position about the axis line through the look target.
    pub fn rotate_around(&mut self, angle: f32, axis: Vec3) -> &mut Self {
        let m = rotation_about_line(angle, axis, self.look);
        self.pos = m.transform_point3(self.pos);
        self.up = m.transform_vector3(self.up);
        self.invalidate()
    }

    /// Orbit, then zoom toward the target by `zoom` (clamped like
    /// [`Camera::zoom`]).
    pub fn rotate_around_zoom(&mut self, angle: f32, axis: Vec3, zoom: f32) -> &mut Self {
        self.rotate_around(angle, axis);
        self.zoom(zoom)
    }

    /// Orbit vertically: rotate about the tilt axis `look_vector × up`
    /// through the look target.
    pub fn rotate_around_vert(&mut self, angle: f32) -> &mut Self {
        let axis = self.look_vector().cross(self.up);
        self.rotate_around(angle, axis)
    }

    /// Move the position toward the look target by `distance`, clamped so
    /// the look distance never reaches [`MIN_LOOK_DISTANCE`]. Negative
    /// distances zoom out without a clamp.
    pub fn zoom(&mut self, distance: f32) -> &mut Self {
        let dist = self.look_distance();
        let step = distance.min(dist - MIN_LOOK_DISTANCE);
        if step != 0.0 {
            self.pos += self.look_vector() / dist * step;
            self.invalidate();
        }
        self
    }

    /// Rotate the look target about the up axis through the position.
    pub fn yaw(&mut self, angle: f32) -> &mut Self {
        let m = rotation_about_line(angle, self.up, self.pos);
        self.look = m.transform_point3(self.look);
        self.invalidate()
    }

    /// Rotate the look target (and the up vector, to keep the basis
    /// orthogonal) about the tilt axis through the position.
    pub fn tilt(&mut self, angle: f32) -> &mut Self {
        let axis = self.look_vector().cross(self.up);
        let m = rotation_about_line(angle, axis, self.pos);
        self.look = m.transform_point3(self.look);
        self.up = m.transform_vector3(self.up);
        self.invalidate()
    }

    /// Roll the up vector about the look direction.
    pub fn roll(&mut self, angle: f32) -> &mut Self {
        let axis = self.look_vector();
        self.up = Mat4::from_axis_angle(axis.normalize(), angle).transform_vector3(self.up);
        self.invalidate()
    }

    fn invalidate(&mut self) -> &mut Self {
        self.view = None;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> Camera {
        Camera::new(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, Vec3::Y)
    }

    #[test]
    fn view_matrix_is_cached_until_mutation() {
        let mut cam = camera();
        assert!(!cam.has_cached_view());

        let first = cam.view_matrix();
        assert!(cam.has_cached_view());
        let second = cam.view_matrix();
        assert_eq!(first, second);
        assert!(cam.has_cached_view());

        cam.zoom(1.0);
        assert!(!cam.has_cached_view());
        let third = cam.view_matrix();
        assert_ne!(first, third);
    }

    #[test]
    fn zoom_moves_toward_look_and_clamps() {
        let mut cam = camera();
        cam.zoom(5.0);
        assert!((cam.pos() - Vec3::new(0.0, 0.0, 5.0)).length() < 1e-5);
        assert_eq!(cam.look(), Vec3::ZERO);

        // Overshooting clamps at the epsilon floor instead of crossing the
        // target.
        cam.zoom(20.0);
        assert!(cam.pos().z > 0.0);
        assert!((cam.pos().z - MIN_LOOK_DISTANCE).abs() < 1e-5);
        assert!(cam.look_distance() >= MIN_LOOK_DISTANCE * 0.5);
    }

    #[test]
    fn zoom_out_is_unclamped() {
        let mut cam = camera();
        cam.zoom(-5.0);
        assert!((cam.pos().z - 15.0).abs() < 1e-4);
    }

    #[test]
    fn repeated_overzoom_never_crosses_target() {
        let mut cam = camera();
        for _ in 0..10 {
            cam.zoom(100.0);
            assert!(cam.pos().z > 0.0, "camera crossed its look target");
        }
    }

    #[test]
    fn rotate_around_preserves_look_distance() {
        let mut cam = camera();
        let before = cam.look_distance();
        cam.rotate_around(1.1, Vec3::Y);
        assert!((cam.look_distance() - before).abs() < 1e-4);
        assert_eq!(cam.look(), Vec3::ZERO);
    }

    #[test]
    fn rotate_around_vert_keeps_basis_nondegenerate() {
        let mut cam = camera();
        // Orbit far past the pole; the up vector follows the orbit, so the
        // view basis never degenerates.
        for _ in 0..8 {
            cam.rotate_around_vert(0.5);
            let forward = cam.look_vector().normalize();
            let cross = forward.cross(cam.up().normalize());
            assert!(cross.length_squared() > 1e-6);
        }
    }

    #[test]
    fn yaw_keeps_position_and_distance() {
        let mut cam = camera();
        let dist = cam.look_distance();
        cam.yaw(0.8);
        assert_eq!(cam.pos(), Vec3::new(0.0, 0.0, 10.0));
        assert!((cam.look_distance() - dist).abs() < 1e-4);
        assert!(cam.look() != Vec3::ZERO);
    }

    #[test]
    fn pan_translates_both_endpoints() {
        let mut cam = camera();
        cam.pan(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(cam.pos(), Vec3::new(1.0, 2.0, 13.0));
        assert_eq!(cam.look(), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    #[should_panic(expected = "parallel")]
    fn parallel_up_is_rejected() {
        Camera::new(Vec3::new(0.0, 5.0, 0.0), Vec3::ZERO, Vec3::Y);
    }
}
