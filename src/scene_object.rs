//! Named groups of models sharing one transform and an update callback.

use std::collections::BTreeMap;

use glam::Mat4;

use crate::model::Model;
use crate::transform::World;
use crate::uniform::{UniformSet, UniformValue};

/// Per-tick animation callback. The object passes itself back in
/// (take/call/restore internally), so the callback may mutate models and
/// transform freely. The second argument is the elapsed tick time in
/// seconds.
pub type UpdateFn = Box<dyn FnMut(&mut SceneObject, f32)>;

/// Per-model draw flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModelFlags {
    /// Hidden entries produce no draw calls until unhidden.
    pub hide: bool,
    /// When false the model opts out of the object's shared placement and
    /// draws with an identity object-world matrix (screen-space quads,
    /// debug geometry).
    pub scene_world: bool,
}

impl Default for ModelFlags {
    fn default() -> Self {
        Self {
            hide: false,
            scene_world: true,
        }
    }
}

impl ModelFlags {
    /// Resolve the object-world matrix this entry draws with: `None` for
    /// hidden entries, identity for entries that opted out of the shared
    /// placement.
    pub fn resolved_world(self, obj_world: Mat4) -> Option<Mat4> {
        if self.hide {
            None
        } else if self.scene_world {
            Some(obj_world)
        } else {
            Some(Mat4::IDENTITY)
        }
    }
}

/// A model slot inside a scene object.
pub struct ModelEntry {
    pub model: Model,
    pub flags: ModelFlags,
}

impl ModelEntry {
    pub fn new(model: Model) -> Self {
        Self {
            model,
            flags: ModelFlags::default(),
        }
    }

    pub fn with_flags(model: Model, flags: ModelFlags) -> Self {
        Self { model, flags }
    }
}

/// One entry of an object's draw traversal: the model, its resolved
/// object-world matrix, and its name for diagnostics.
pub struct DrawItem<'a> {
    pub name: &'a str,
    pub model: &'a Model,
    pub obj_world: Mat4,
}

/// A named collection of models sharing a transform, an object-tier
/// override set, and an optional per-tick update callback.
pub struct SceneObject {
    models: BTreeMap<String, ModelEntry>,
    /// Shared placement applied to every non-opted-out model.
    pub world: World,
    /// Object-tier uniform overrides.
    pub uniforms: UniformSet,
    /// Whether the shadow pass draws this object. Helper geometry (axes,
    /// overlay quads) sets this false instead of being hidden and restored
    /// around the pass.
    pub casts_shadows: bool,
    update: Option<UpdateFn>,
}

impl SceneObject {
    pub fn new(models: BTreeMap<String, ModelEntry>) -> Self {
        Self {
            models,
            world: World::new(),
            uniforms: UniformSet::new(),
            casts_shadows: true,
            update: None,
        }
    }

    pub fn with_world(mut self, world: World) -> Self {
        self.world = world;
        self
    }

    pub fn with_uniforms(mut self, uniforms: UniformSet) -> Self {
        self.uniforms = uniforms;
        self
    }

    pub fn with_casts_shadows(mut self, casts: bool) -> Self {
        self.casts_shadows = casts;
        self
    }

    pub fn with_update(mut self, update: UpdateFn) -> Self {
        self.update = Some(update);
        self
    }

    pub fn models(&self) -> impl Iterator<Item = (&String, &ModelEntry)> {
        self.models.iter()
    }

    pub fn model(&self, name: &str) -> Option<&ModelEntry> {
        self.models.get(name)
    }

    pub fn model_mut(&mut self, name: &str) -> Option<&mut ModelEntry> {
        self.models.get_mut(name)
    }

    /// Flip a model's hide flag. Returns false when no such model exists.
    pub fn set_hidden(&mut self, name: &str, hide: bool) -> bool {
        match self.models.get_mut(name) {
            Some(entry) => {
                entry.flags.hide = hide;
                true
            }
            None => false,
        }
    }

    /// Run the update callback, if any, with the elapsed tick time.
    pub fn update(&mut self, dt: f32) {
        if let Some(mut callback) = self.update.take() {
            callback(self, dt);
            self.update = Some(callback);
        }
    }

    /// Object-tier uniform values: the composed shared transform plus the
    /// object's own overrides.
    pub fn tier_values(&self) -> UniformSet {
        let mut values = UniformSet::new();
        values.insert(
            "obj_world".to_string(),
            UniformValue::Mat4(self.world.to_matrix()),
        );
        for (name, value) in &self.uniforms {
            values.insert(name.clone(), value.clone());
        }
        values
    }

    /// The draw traversal: every visible model in name order, each with its
    /// flags resolved against the shared matrix.
    pub fn draw_list(&self) -> Vec<DrawItem<'_>> {
        let obj_world = self.world.to_matrix();
        self.models
            .iter()
            .filter_map(|(name, entry)| {
                entry.flags.resolved_world(obj_world).map(|obj_world| DrawItem {
                    name,
                    model: &entry.model,
                    obj_world,
                })
            })
            .collect()
    }

    /// Number of draw calls the next traversal will produce.
    pub fn draw_count(&self) -> u32 {
        self.models
            .values()
            .filter(|entry| !entry.flags.hide)
            .count() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn hidden_entries_resolve_to_no_draw() {
        let obj_world = Mat4::from_translation(Vec3::X);
        let mut flags = ModelFlags::default();

        assert_eq!(flags.resolved_world(obj_world), Some(obj_world));

        flags.hide = true;
        assert_eq!(flags.resolved_world(obj_world), None);

        flags.hide = false;
        assert_eq!(flags.resolved_world(obj_world), Some(obj_world));
    }

    #[test]
    fn opted_out_entries_draw_with_identity() {
        let obj_world = Mat4::from_translation(Vec3::new(0.0, 5.0, 0.0));
        let flags = ModelFlags {
            hide: false,
            scene_world: false,
        };
        assert_eq!(flags.resolved_world(obj_world), Some(Mat4::IDENTITY));
    }

    #[test]
    fn empty_object_produces_no_draws() {
        let object = SceneObject::new(BTreeMap::new());
        assert_eq!(object.draw_count(), 0);
        assert!(object.draw_list().is_empty());
    }

    #[test]
    fn tier_values_expose_composed_world() {
        let mut object = SceneObject::new(BTreeMap::new());
        object.world.translate(Vec3::new(1.0, 2.0, 3.0));
        let values = object.tier_values();
        match values.get("obj_world") {
            Some(UniformValue::Mat4(m)) => {
                assert_eq!(m.transform_point3(Vec3::ZERO), Vec3::new(1.0, 2.0, 3.0));
            }
            other => panic!("unexpected obj_world value: {other:?}"),
        }
    }

    #[test]
    fn update_callback_can_mutate_the_object() {
        let mut object = SceneObject::new(BTreeMap::new()).with_update(Box::new(|obj, dt| {
            obj.world.rotate_z(dt);
        }));
        object.update(0.5);
        object.update(0.5);
        let expected = Mat4::from_rotation_z(1.0);
        for (a, b) in object
            .world
            .rotation()
            .to_cols_array()
            .iter()
            .zip(expected.to_cols_array().iter())
        {
            assert!((a - b).abs() < 1e-5);
        }
    }
}
