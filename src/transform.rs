//! Composable affine transforms for placing models and objects in a scene.
//!
//! [`World`] keeps its four factors — a frozen `base` matrix, a scale
//! vector, an accumulated rotation matrix, and a translation vector —
//! separate until [`World::to_matrix`] multiplies them back together. The
//! composition order is fixed:
//!
//! ```text
//! M = T(translation) · rotation · S(scale) · base
//! ```
//!
//! Keeping the factors apart is what makes [`World::save_as_base`] useful:
//! it folds the current composition into `base` and resets the other three,
//! freezing a placement (say, a slot on a circular layer) so further local
//! transforms compose on top of it.
//!
//! # Example
//!
//! ```
//! use sundial::World;
//! use glam::Vec3;
//!
//! let mut world = World::new();
//! world
//!     .rotate_z(0.5)
//!     .translate_y(4.0)
//!     .save_as_base()
//!     .rotate_z(-0.5);
//! let placed = world.to_matrix();
//! ```

use glam::{Mat4, Vec3};

/// Rotation about an axis line anchored at `pivot` (not the origin).
///
/// This is the primitive behind camera orbiting, object layer placement,
/// and whole-world rotation: translate the pivot to the origin, rotate,
/// translate back.
pub fn rotation_about_line(angle: f32, axis: Vec3, pivot: Vec3) -> Mat4 {
    assert!(
        axis.length_squared() > 0.0,
        "rotation axis must be non-zero"
    );
    Mat4::from_translation(pivot)
        * Mat4::from_axis_angle(axis.normalize(), angle)
        * Mat4::from_translation(-pivot)
}

/// A to-world transform decomposed into base, scale, rotation, and
/// translation factors.
///
/// Every mutator returns `&mut Self` so transform edits chain. Unlike the
/// camera, `to_matrix()` recomputes on every call; there is no cache to
/// invalidate.
#[derive(Clone, Debug, PartialEq)]
pub struct World {
    base: Mat4,
    scale: Vec3,
    rotation: Mat4,
    translation: Vec3,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    /// Identity transform: all four factors at their neutral values.
    pub fn new() -> Self {
        Self {
            base: Mat4::IDENTITY,
            scale: Vec3::ONE,
            rotation: Mat4::IDENTITY,
            translation: Vec3::ZERO,
        }
    }

    /// Transform with an explicit frozen base matrix.
    pub fn from_base(base: Mat4) -> Self {
        Self {
            base,
            ..Self::new()
        }
    }

    /// Transform with an initial scale and translation (the common shape for
    /// model placement in scene definitions).
    pub fn from_scale_translation(scale: Vec3, translation: Vec3) -> Self {
        Self {
            scale,
            translation,
            ..Self::new()
        }
    }

    pub fn base(&self) -> Mat4 {
        self.base
    }

    pub fn scale_factor(&self) -> Vec3 {
        self.scale
    }

    pub fn rotation(&self) -> Mat4 {
        self.rotation
    }

    pub fn translation(&self) -> Vec3 {
        self.translation
    }

    pub fn set_base(&mut self, base: Mat4) -> &mut Self {
        self.base = base;
        self
    }

    /// Reset every factor to identity.
    pub fn reset(&mut self) -> &mut Self {
        *self = Self::new();
        self
    }

    pub fn reset_base(&mut self) -> &mut Self {
        self.base = Mat4::IDENTITY;
        self
    }

    pub fn reset_scale(&mut self) -> &mut Self {
        self.scale = Vec3::ONE;
        self
    }

    pub fn reset_rotation(&mut self) -> &mut Self {
        self.rotation = Mat4::IDENTITY;
        self
    }

    pub fn reset_translation(&mut self) -> &mut Self {
        self.translation = Vec3::ZERO;
        self
    }

    /// Fold the current composition into `base` and reset the other three
    /// factors. Idempotent on the resulting matrix: folding twice in a row
    /// changes nothing.
    pub fn save_as_base(&mut self) -> &mut Self {
        self.base = self.to_matrix();
        self.reset_scale();
        self.reset_rotation();
        self.reset_translation();
        self
    }

    /// A new transform whose `base` is this transform's folded matrix, with
    /// scale/rotation/translation reset. The source is untouched.
    pub fn clone_as_base(&self) -> Self {
        Self::from_base(self.to_matrix())
    }

    /// Multiply the scale factor component-wise.
    pub fn scale(&mut self, s: Vec3) -> &mut Self {
        self.scale *= s;
        self
    }

    /// Multiply all three scale components by the same factor.
    pub fn scale_uniform(&mut self, s: f32) -> &mut Self {
        self.scale *= s;
        self
    }

    pub fn scale_x(&mut self, x: f32) -> &mut Self {
        self.scale.x *= x;
        self
    }

    pub fn scale_y(&mut self, y: f32) -> &mut Self {
        self.scale.y *= y;
        self
    }

    pub fn scale_z(&mut self, z: f32) -> &mut Self {
        self.scale.z *= z;
        self
    }

    /// Accumulate a rotation about `axis`. New rotations pre-multiply, so
    /// they apply after everything already accumulated.
    pub fn rotate(&mut self, angle: f32, axis: Vec3) -> &mut Self {
        assert!(
            axis.length_squared() > 0.0,
            "rotation axis must be non-zero"
        );
        self.rotation = Mat4::from_axis_angle(axis.normalize(), angle) * self.rotation;
        self
    }

    pub fn rotate_x(&mut self, angle: f32) -> &mut Self {
        self.rotation = Mat4::from_rotation_x(angle) * self.rotation;
        self
    }

    pub fn rotate_y(&mut self, angle: f32) -> &mut Self {
        self.rotation = Mat4::from_rotation_y(angle) * self.rotation;
        self
    }

    pub fn rotate_z(&mut self, angle: f32) -> &mut Self {
        self.rotation = Mat4::from_rotation_z(angle) * self.rotation;
        self
    }

    pub fn translate(&mut self, v: Vec3) -> &mut Self {
        self.translation += v;
        self
    }

    pub fn translate_x(&mut self, x: f32) -> &mut Self {
        self.translation.x += x;
        self
    }

    pub fn translate_y(&mut self, y: f32) -> &mut Self {
        self.translation.y += y;
        self
    }

    pub fn translate_z(&mut self, z: f32) -> &mut Self {
        self.translation.z += z;
        self
    }

    /// The scale factor as a diagonal matrix.
    pub fn scale_matrix(&self) -> Mat4 {
        Mat4::from_scale(self.scale)
    }

    /// The translation vector as a translation matrix.
    pub fn translation_matrix(&self) -> Mat4 {
        Mat4::from_translation(self.translation)
    }

    /// Compose the effective matrix: `T · R · S · base`.
    pub fn to_matrix(&self) -> Mat4 {
        self.translation_matrix() * self.rotation * self.scale_matrix() * self.base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    fn mat_approx_eq(a: Mat4, b: Mat4) {
        for (x, y) in a.to_cols_array().iter().zip(b.to_cols_array().iter()) {
            assert!((x - y).abs() < 1e-5, "matrices differ: {a:?} vs {b:?}");
        }
    }

    #[test]
    fn to_matrix_matches_factor_product() {
        let mut w = World::new();
        w.scale(Vec3::new(2.0, 3.0, 4.0))
            .rotate_y(0.7)
            .translate(Vec3::new(1.0, -2.0, 5.0));

        let expected = Mat4::from_translation(Vec3::new(1.0, -2.0, 5.0))
            * Mat4::from_rotation_y(0.7)
            * Mat4::from_scale(Vec3::new(2.0, 3.0, 4.0))
            * Mat4::IDENTITY;
        assert_eq!(w.to_matrix(), expected);
    }

    #[test]
    fn rotations_accumulate_in_application_order() {
        let mut w = World::new();
        w.rotate_x(0.3).rotate_z(0.9);
        let expected = Mat4::from_rotation_z(0.9) * Mat4::from_rotation_x(0.3);
        mat_approx_eq(w.rotation(), expected);
    }

    #[test]
    fn clone_is_independent() {
        let mut original = World::new();
        original.translate_x(3.0).rotate_y(1.0);

        let mut copy = original.clone();
        assert_eq!(copy.to_matrix(), original.to_matrix());

        copy.translate_z(9.0).scale_uniform(0.5);
        assert_eq!(
            original.to_matrix(),
            {
                let mut w = World::new();
                w.translate_x(3.0).rotate_y(1.0);
                w.to_matrix()
            },
            "mutating the clone must not touch the original"
        );
    }

    #[test]
    fn save_as_base_preserves_matrix_and_is_idempotent() {
        let mut w = World::new();
        w.scale_uniform(2.0).rotate_z(0.4).translate_y(6.0);
        let before = w.to_matrix();

        w.save_as_base();
        let first = w.to_matrix();
        mat_approx_eq(before, first);
        assert_eq!(w.scale_factor(), Vec3::ONE);
        assert_eq!(w.rotation(), Mat4::IDENTITY);
        assert_eq!(w.translation(), Vec3::ZERO);

        w.save_as_base();
        mat_approx_eq(first, w.to_matrix());
    }

    #[test]
    fn clone_as_base_folds_without_mutating_source() {
        let mut w = World::new();
        w.rotate_x(0.2).translate_x(1.5);
        let folded = w.clone_as_base();

        mat_approx_eq(folded.to_matrix(), w.to_matrix());
        assert_eq!(folded.scale_factor(), Vec3::ONE);
        assert_ne!(w.translation(), Vec3::ZERO);
    }

    #[test]
    fn circular_layer_placement() {
        // The layer recipe: rotate into the slot angle, push out along Y,
        // freeze, then undo the slot rotation locally.
        let angle = std::f32::consts::FRAC_PI_2;
        let radius = 4.0;
        let mut w = World::new();
        w.rotate_z(angle)
            .translate_y(radius)
            .save_as_base()
            .rotate_z(-angle);

        // Folded matrix is R(-a) · T(0, r, 0) · R(a): the origin lands on
        // R(-a) · (0, r, 0), which for a = +90 degrees is (r, 0, 0).
        let placed = w.to_matrix().transform_point3(Vec3::ZERO);
        assert!((placed - Vec3::new(radius, 0.0, 0.0)).length() < 1e-5);

        // The local frame ends up unrotated: a +X offset stays +X.
        let x_offset = w.to_matrix().transform_point3(Vec3::X) - placed;
        assert!((x_offset - Vec3::X).length() < 1e-4);
    }

    #[test]
    fn rotation_about_line_moves_pivot_nowhere() {
        let pivot = Vec3::new(2.0, -1.0, 3.0);
        let m = rotation_about_line(1.3, Vec3::Y, pivot);
        let moved = m * Vec4::new(pivot.x, pivot.y, pivot.z, 1.0);
        assert!((Vec3::new(moved.x, moved.y, moved.z) - pivot).length() < 1e-5);
    }

    #[test]
    #[should_panic(expected = "non-zero")]
    fn zero_axis_rotation_is_a_contract_violation() {
        let mut w = World::new();
        w.rotate(1.0, Vec3::ZERO);
    }
}
