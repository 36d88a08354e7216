//! The scene: object registry, mesh registry, cameras, and forced
//! uniform overrides.
//!
//! Ownership and teardown order follow the resource model: scene objects
//! (and their models) hold `Rc` references into the mesh registry, so
//! [`Scene::release`] drops the objects first, then releases each mesh's
//! GPU buffers once its reference count has fallen back to one.

use std::collections::BTreeMap;
use std::rc::Rc;

use glam::Vec3;

use crate::camera::Camera;
use crate::error::RenderError;
use crate::mesh::Mesh;
use crate::scene_object::SceneObject;
use crate::uniform::{UniformSet, UniformTier, UniformValue};

/// Everything the render pipeline reads each tick.
pub struct Scene {
    /// Viewer camera.
    pub camera: Camera,
    /// Diffuse light camera; the shadow pass renders from its view.
    pub light: Camera,
    objects: BTreeMap<String, SceneObject>,
    meshes: BTreeMap<String, Rc<Mesh>>,
    forced: BTreeMap<UniformTier, UniformSet>,
}

impl Scene {
    pub fn new(camera: Camera, light: Camera) -> Self {
        Self {
            camera,
            light,
            objects: BTreeMap::new(),
            meshes: BTreeMap::new(),
            forced: BTreeMap::new(),
        }
    }

    /// Register a mesh under a name, returning the shared handle.
    pub fn add_mesh(&mut self, name: impl Into<String>, mesh: Mesh) -> Rc<Mesh> {
        let rc = Rc::new(mesh);
        self.meshes.insert(name.into(), Rc::clone(&rc));
        rc
    }

    /// Look up a registered mesh.
    pub fn mesh(&self, name: &str) -> Result<Rc<Mesh>, RenderError> {
        self.meshes
            .get(name)
            .cloned()
            .ok_or_else(|| RenderError::UnknownMesh(name.to_string()))
    }

    pub fn add_object(&mut self, name: impl Into<String>, object: SceneObject) {
        self.objects.insert(name.into(), object);
    }

    pub fn object(&self, name: &str) -> Option<&SceneObject> {
        self.objects.get(name)
    }

    pub fn object_mut(&mut self, name: &str) -> Option<&mut SceneObject> {
        self.objects.get_mut(name)
    }

    pub fn objects(&self) -> impl Iterator<Item = (&String, &SceneObject)> {
        self.objects.iter()
    }

    /// Run every object's update callback with the elapsed tick time.
    pub fn update(&mut self, dt: f32) {
        let names: Vec<String> = self.objects.keys().cloned().collect();
        for name in names {
            if let Some(mut object) = self.objects.remove(&name) {
                object.update(dt);
                self.objects.insert(name, object);
            }
        }
    }

    /// Total draw calls the next frame will issue per pass over all
    /// objects, used to size the uniform arena.
    pub fn draw_count(&self) -> u32 {
        self.objects.values().map(|o| o.draw_count()).sum()
    }

    /// Force a uniform value for every draw until cleared, overriding both
    /// caller-supplied values and defaults at its tier.
    pub fn force(&mut self, tier: UniformTier, name: impl Into<String>, value: UniformValue) {
        self.forced.entry(tier).or_default().insert(name.into(), value);
    }

    /// Clear a forced override. Returns whether it was set.
    pub fn unforce(&mut self, tier: UniformTier, name: &str) -> bool {
        self.forced
            .get_mut(&tier)
            .map(|set| set.remove(name).is_some())
            .unwrap_or(false)
    }

    /// Whether a forced override is active.
    pub fn is_forced(&self, tier: UniformTier, name: &str) -> bool {
        self.forced
            .get(&tier)
            .is_some_and(|set| set.contains_key(name))
    }

    /// The forced override set for a tier, if any.
    pub fn forced(&self, tier: UniformTier) -> Option<&UniformSet> {
        self.forced.get(&tier)
    }

    /// Arrange scene objects in concentric circular layers around the
    /// origin and register them under generated names.
    ///
    /// Layer `i` sits at radius `init_distance + i * layer_distance`; the
    /// objects of a layer spread evenly starting at `init_angle`. Each
    /// object's placement is frozen into its transform base and the slot
    /// rotation undone locally, so later local rotations (clock hands) stay
    /// upright.
    pub fn add_circular_layers(
        &mut self,
        base_name: &str,
        layers: Vec<Vec<SceneObject>>,
        layer_distance: f32,
        init_distance: f32,
        init_angle: f32,
    ) {
        for (layer_index, layer) in layers.into_iter().enumerate() {
            let radius = init_distance + layer_index as f32 * layer_distance;
            let count = layer.len().max(1);
            let angle_step = std::f32::consts::TAU / count as f32;
            for (i, mut object) in layer.into_iter().enumerate() {
                let angle = init_angle + i as f32 * angle_step;
                object
                    .world
                    .rotate_z(angle)
                    .translate_y(radius)
                    .save_as_base()
                    .rotate_z(-angle);
                self.add_object(format!("{base_name}_{layer_index}_{i}"), object);
            }
        }
    }

    /// Direction the diffuse light shines along (from the light camera
    /// toward its look target).
    pub fn light_dir(&self) -> Vec3 {
        self.light.look_vector().normalize_or(Vec3::NEG_Y)
    }

    /// Tear the scene down: drop all objects (and their mesh references),
    /// then release every mesh's GPU buffers. A mesh still referenced
    /// outside the scene is logged and skipped rather than released out
    /// from under its user.
    pub fn release(&mut self) {
        self.objects.clear();
        let meshes = std::mem::take(&mut self.meshes);
        for (name, mesh) in meshes {
            match Rc::try_unwrap(mesh) {
                Ok(mut mesh) => mesh.release(),
                Err(rc) => log::warn!(
                    "mesh '{name}' still has {} external references at teardown; leaking buffers",
                    Rc::strong_count(&rc) - 1
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn test_scene() -> Scene {
        let camera = Camera::new(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, Vec3::Y);
        let light = Camera::new(Vec3::new(0.0, 20.0, 10.0), Vec3::ZERO, Vec3::Y);
        Scene::new(camera, light)
    }

    #[test]
    fn unknown_mesh_is_an_error() {
        let scene = test_scene();
        assert!(matches!(
            scene.mesh("missing"),
            Err(RenderError::UnknownMesh(_))
        ));
    }

    #[test]
    fn forced_overrides_toggle() {
        let mut scene = test_scene();
        assert!(!scene.is_forced(UniformTier::Mesh, "lighting_on"));

        scene.force(UniformTier::Mesh, "lighting_on", UniformValue::Int(0));
        assert!(scene.is_forced(UniformTier::Mesh, "lighting_on"));
        assert_eq!(
            scene
                .forced(UniformTier::Mesh)
                .and_then(|set| set.get("lighting_on")),
            Some(&UniformValue::Int(0))
        );

        assert!(scene.unforce(UniformTier::Mesh, "lighting_on"));
        assert!(!scene.is_forced(UniformTier::Mesh, "lighting_on"));
        assert!(!scene.unforce(UniformTier::Mesh, "lighting_on"));
    }

    #[test]
    fn circular_layers_place_objects_at_radius() {
        let mut scene = test_scene();
        let layer: Vec<SceneObject> = (0..4)
            .map(|_| SceneObject::new(BTreeMap::new()))
            .collect();
        scene.add_circular_layers("ring", vec![layer], 2.0, 4.0, 0.0);

        for i in 0..4 {
            let object = scene.object(&format!("ring_0_{i}")).unwrap();
            let placed = object.world.to_matrix().transform_point3(Vec3::ZERO);
            assert!(
                (placed.length() - 4.0).abs() < 1e-4,
                "object {i} sits at radius {}",
                placed.length()
            );
        }

        // Slot 0 starts at the top of the ring (+Y) and the others spread
        // by a quarter turn each.
        let first = scene
            .object("ring_0_0")
            .unwrap()
            .world
            .to_matrix()
            .transform_point3(Vec3::ZERO);
        assert!((first - Vec3::new(0.0, 4.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn update_reaches_every_object() {
        let mut scene = test_scene();
        for i in 0..3 {
            scene.add_object(
                format!("obj{i}"),
                SceneObject::new(BTreeMap::new()).with_update(Box::new(|obj, dt| {
                    obj.world.translate_x(dt);
                })),
            );
        }
        scene.update(2.0);
        for i in 0..3 {
            let object = scene.object(&format!("obj{i}")).unwrap();
            assert_eq!(object.world.translation(), Vec3::new(2.0, 0.0, 0.0));
        }
    }

    #[test]
    fn light_dir_points_from_light_to_target() {
        let scene = test_scene();
        let dir = scene.light_dir();
        assert!((dir.length() - 1.0).abs() < 1e-5);
        assert!(dir.y < 0.0, "light above the origin shines downward");
    }
}
