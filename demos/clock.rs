//! A wall of clocks with animated hands, arranged in circular layers,
//! lit by a single diffuse light with variance soft shadows.
//!
//! Arrow keys orbit the camera, W/S zoom, J/L orbit the light, 1 toggles
//! lighting, 2 toggles shadows.

use std::collections::BTreeMap;
use std::f32::consts::{FRAC_PI_2, TAU};
use std::rc::Rc;

use sundial::{
    AppConfig, Camera, Gpu, KeyBindings, Mesh, MeshData, Model, ModelEntry, RenderError, Scene,
    SceneObject, UniformSet, UniformValue, Vec3, Vec4, World, run,
};

/// Seconds per revolution of the fast hand; the slow hand runs at a
/// twelfth of this.
const MINUTE_PERIOD: f32 = 8.0;

fn clock(gpu: &Gpu, cube: &Rc<Mesh>, face_color: Vec4) -> SceneObject {
    let mut models = BTreeMap::new();

    let mut face = World::new();
    face.scale(Vec3::new(3.0, 3.0, 0.3));
    models.insert(
        "face".to_string(),
        ModelEntry::new(Model::new(
            gpu,
            Rc::clone(cube),
            face_color,
            face,
            UniformSet::new(),
        )),
    );

    let mut hub = World::new();
    hub.scale(Vec3::new(0.3, 0.3, 0.3)).translate_z(0.3);
    models.insert(
        "hub".to_string(),
        ModelEntry::new(Model::new(
            gpu,
            Rc::clone(cube),
            Vec4::new(0.1, 0.1, 0.1, 1.0),
            hub,
            UniformSet::new(),
        )),
    );

    // Hands pivot at the clock center: scale and offset are frozen into
    // the base so the per-frame rotation swings the hand instead of
    // spinning it about its own middle.
    let hand = |length: f32, width: f32| {
        let mut world = World::new();
        world
            .scale(Vec3::new(width, length, width))
            .translate(Vec3::new(0.0, length * 0.5, 0.35))
            .save_as_base();
        world
    };
    let mut specular = UniformSet::new();
    specular.insert("specular_int".to_string(), UniformValue::Float(0.4));
    models.insert(
        "minute".to_string(),
        ModelEntry::new(Model::new(
            gpu,
            Rc::clone(cube),
            Vec4::new(0.9, 0.9, 0.9, 1.0),
            hand(1.3, 0.12),
            specular.clone(),
        )),
    );
    models.insert(
        "hour".to_string(),
        ModelEntry::new(Model::new(
            gpu,
            Rc::clone(cube),
            Vec4::new(0.9, 0.6, 0.2, 1.0),
            hand(0.8, 0.18),
            specular,
        )),
    );

    SceneObject::new(models).with_update(Box::new(|obj, dt| {
        if let Some(entry) = obj.model_mut("minute") {
            entry.model.world.rotate_z(-dt * TAU / MINUTE_PERIOD);
        }
        if let Some(entry) = obj.model_mut("hour") {
            entry.model.world.rotate_z(-dt * TAU / (MINUTE_PERIOD * 12.0));
        }
    }))
}

fn main() -> Result<(), RenderError> {
    env_logger::init();

    run(AppConfig::new().title("Sundial clocks"), |gpu, _programs| {
        let mut scene = Scene::new(
            Camera::new(Vec3::new(0.0, 3.0, 30.0), Vec3::new(0.0, 1.0, 0.0), Vec3::Y),
            Camera::new(Vec3::new(14.0, 24.0, 22.0), Vec3::ZERO, Vec3::Y),
        );

        let cube = scene.add_mesh(
            "cube",
            MeshData::cube().upload(gpu, "cube", UniformSet::new()),
        );
        scene.add_mesh(
            "ground",
            MeshData::plane(80.0).upload(gpu, "ground", UniformSet::new()),
        );
        scene.add_mesh("axes", Mesh::axes(gpu, "axes", 5.0));

        // Two rings of clocks around the origin, the inner one starting at
        // twelve o'clock.
        let inner: Vec<SceneObject> = (0..4)
            .map(|_| clock(gpu, &cube, Vec4::new(0.25, 0.3, 0.4, 1.0)))
            .collect();
        let outer: Vec<SceneObject> = (0..8)
            .map(|_| clock(gpu, &cube, Vec4::new(0.35, 0.25, 0.25, 1.0)))
            .collect();
        scene.add_circular_layers("clock", vec![inner, outer], 8.0, 5.0, FRAC_PI_2);

        let mut ground_world = World::new();
        ground_world.translate_y(-15.0);
        let ground = Model::new(
            gpu,
            scene.mesh("ground")?,
            Vec4::new(0.5, 0.5, 0.45, 1.0),
            ground_world,
            UniformSet::new(),
        );
        let mut ground_models = BTreeMap::new();
        ground_models.insert("plane".to_string(), ModelEntry::new(ground));
        scene.add_object("ground", SceneObject::new(ground_models));

        let axes = Model::new(
            gpu,
            scene.mesh("axes")?,
            Vec4::new(1.0, 1.0, 0.4, 1.0),
            World::new(),
            UniformSet::new(),
        );
        let mut axes_models = BTreeMap::new();
        axes_models.insert("lines".to_string(), ModelEntry::new(axes));
        scene.add_object(
            "axes",
            SceneObject::new(axes_models).with_casts_shadows(false),
        );

        Ok((scene, KeyBindings::default()))
    })
}
