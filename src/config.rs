//! Declarative scene configuration.
//!
//! A scene can be described as data — nested records naming, per object,
//! its constituent models (mesh name, color, transform, uniform overrides,
//! flags), a shared transform, and an update callback by registry name —
//! and built against a mesh registry and a program's uniform layout.
//! The records derive `serde::Deserialize`, so a scene definition can live
//! in a JSON file next to the mesh data or be constructed in code.
//!
//! Uniform override values in a definition are plain scalars and number
//! lists; they are typed against the program's declared slot type at build
//! time, so a `vec3` slot fed a two-element list fails loudly during
//! startup instead of corrupting the block at draw time.

use std::collections::BTreeMap;

use glam::{Vec2, Vec3, Vec4};
use serde::Deserialize;

use crate::error::{AssetError, RenderError};
use crate::gpu::Gpu;
use crate::model::Model;
use crate::scene::Scene;
use crate::scene_object::{ModelEntry, ModelFlags, SceneObject, UpdateFn};
use crate::transform::World;
use crate::uniform::{TierLayout, UniformSet, UniformType, UniformValue, UniformsLayout};

/// A whole scene: objects by name.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct SceneDef {
    pub objects: BTreeMap<String, SceneObjectDef>,
}

impl SceneDef {
    pub fn from_json_str(json: &str) -> Result<Self, AssetError> {
        serde_json::from_str(json).map_err(|source| AssetError::Parse {
            what: "scene definition".to_string(),
            source,
        })
    }
}

/// One scene object: models, shared transform, overrides, update callback.
#[derive(Clone, Debug, Deserialize)]
pub struct SceneObjectDef {
    pub models: BTreeMap<String, ModelDef>,
    #[serde(default)]
    pub transform: TransformDef,
    #[serde(default)]
    pub uniforms: BTreeMap<String, UniformValueDef>,
    /// Name of an update callback in the [`UpdateRegistry`].
    #[serde(default)]
    pub update: Option<String>,
    #[serde(default = "default_true")]
    pub casts_shadows: bool,
}

/// One model inside an object.
#[derive(Clone, Debug, Deserialize)]
pub struct ModelDef {
    /// Name of a mesh in the scene's mesh registry.
    pub mesh: String,
    /// RGBA color.
    pub color: [f32; 4],
    #[serde(default)]
    pub transform: TransformDef,
    #[serde(default)]
    pub uniforms: BTreeMap<String, UniformValueDef>,
    #[serde(default)]
    pub hide: bool,
    #[serde(default = "default_true")]
    pub scene_world: bool,
}

fn default_true() -> bool {
    true
}

/// A transform spec: scale, a list of axis-angle rotations applied in
/// order, and a translation. With `as_base` the realized composition is
/// folded into the transform's base, so later animation rotations swing
/// the placed geometry instead of spinning it in place.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct TransformDef {
    #[serde(default)]
    pub scale: Option<[f32; 3]>,
    #[serde(default)]
    pub rotate: Vec<RotationDef>,
    #[serde(default)]
    pub translate: Option<[f32; 3]>,
    #[serde(default)]
    pub as_base: bool,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RotationDef {
    pub axis: [f32; 3],
    pub angle: f32,
}

impl TransformDef {
    /// Realize the definition as a [`World`].
    pub fn to_world(&self) -> World {
        let mut world = World::new();
        if let Some(scale) = self.scale {
            world.scale(Vec3::from_array(scale));
        }
        for rotation in &self.rotate {
            world.rotate(rotation.angle, Vec3::from_array(rotation.axis));
        }
        if let Some(translate) = self.translate {
            world.translate(Vec3::from_array(translate));
        }
        if self.as_base {
            world.save_as_base();
        }
        world
    }
}

/// An untyped uniform value as written in a definition; typed against the
/// program layout at build time.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum UniformValueDef {
    Scalar(f64),
    List(Vec<f64>),
}

impl UniformValueDef {
    /// Convert against the declared slot type.
    pub fn typed(&self, name: &str, ty: UniformType) -> Result<UniformValue, AssetError> {
        let err = |what: &str| {
            AssetError::Malformed(format!(
                "uniform '{name}' declared as {ty:?} but the definition holds {what}"
            ))
        };
        let floats = |n: usize| -> Result<Vec<f32>, AssetError> {
            match self {
                UniformValueDef::List(values) if values.len() == n => {
                    Ok(values.iter().map(|v| *v as f32).collect())
                }
                UniformValueDef::List(values) => {
                    Err(err(&format!("a {}-element list", values.len())))
                }
                UniformValueDef::Scalar(_) => Err(err("a scalar")),
            }
        };
        match ty {
            UniformType::Float => match self {
                UniformValueDef::Scalar(v) => Ok(UniformValue::Float(*v as f32)),
                _ => Err(err("a list")),
            },
            UniformType::Int => match self {
                UniformValueDef::Scalar(v) => Ok(UniformValue::Int(*v as i32)),
                _ => Err(err("a list")),
            },
            UniformType::Vec2 => floats(2).map(|v| UniformValue::Vec2(Vec2::new(v[0], v[1]))),
            UniformType::Vec3 => {
                floats(3).map(|v| UniformValue::Vec3(Vec3::new(v[0], v[1], v[2])))
            }
            UniformType::Vec4 => {
                floats(4).map(|v| UniformValue::Vec4(Vec4::new(v[0], v[1], v[2], v[3])))
            }
            UniformType::IVec2 => {
                floats(2).map(|v| UniformValue::IVec2([v[0] as i32, v[1] as i32]))
            }
            UniformType::IVec3 => floats(3)
                .map(|v| UniformValue::IVec3([v[0] as i32, v[1] as i32, v[2] as i32])),
            UniformType::IVec4 => floats(4).map(|v| {
                UniformValue::IVec4([v[0] as i32, v[1] as i32, v[2] as i32, v[3] as i32])
            }),
            UniformType::Mat2 | UniformType::Mat3 | UniformType::Mat4 => {
                Err(err("matrix uniforms cannot be set from a definition"))
            }
        }
    }
}

/// Named update callbacks a definition can refer to.
#[derive(Default)]
pub struct UpdateRegistry {
    factories: BTreeMap<String, Box<dyn Fn() -> UpdateFn>>,
}

impl UpdateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback factory under a name. Each object naming it gets
    /// its own callback instance.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        factory: impl Fn() -> UpdateFn + 'static,
    ) {
        self.factories.insert(name.into(), Box::new(factory));
    }

    fn instantiate(&self, name: &str) -> Result<UpdateFn, AssetError> {
        self.factories
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| {
                AssetError::Malformed(format!("unknown update callback '{name}'"))
            })
    }
}

fn typed_set(
    defs: &BTreeMap<String, UniformValueDef>,
    layout: &TierLayout,
    owner: &str,
) -> Result<UniformSet, AssetError> {
    let mut set = UniformSet::new();
    for (name, def) in defs {
        let slot = layout.get(name).ok_or_else(|| {
            AssetError::Malformed(format!("{owner}: no uniform '{name}' at this tier"))
        })?;
        set.insert(name.clone(), def.typed(name, slot.ty)?);
    }
    Ok(set)
}

/// Instantiate every object of a definition into the scene.
///
/// `layout` is the uniform layout of the program the scene draws with;
/// override values are typed against it. Fails on the first unknown mesh,
/// unknown uniform, type mismatch, or unknown update callback.
pub fn build_scene(
    gpu: &Gpu,
    scene: &mut Scene,
    def: &SceneDef,
    layout: &UniformsLayout,
    registry: &UpdateRegistry,
) -> Result<(), RenderError> {
    for (object_name, object_def) in &def.objects {
        let mut models = BTreeMap::new();
        for (model_name, model_def) in &object_def.models {
            let mesh = scene.mesh(&model_def.mesh)?;
            let uniforms = typed_set(
                &model_def.uniforms,
                &layout.model,
                &format!("{object_name}.{model_name}"),
            )?;
            let model = Model::new(
                gpu,
                mesh,
                Vec4::from_array(model_def.color),
                model_def.transform.to_world(),
                uniforms,
            );
            models.insert(
                model_name.clone(),
                ModelEntry::with_flags(
                    model,
                    ModelFlags {
                        hide: model_def.hide,
                        scene_world: model_def.scene_world,
                    },
                ),
            );
        }

        let uniforms = typed_set(&object_def.uniforms, &layout.object, object_name)?;
        let mut object = SceneObject::new(models)
            .with_world(object_def.transform.to_world())
            .with_uniforms(uniforms)
            .with_casts_shadows(object_def.casts_shadows);
        if let Some(update_name) = &object_def.update {
            object = object.with_update(registry.instantiate(update_name)?);
        }
        scene.add_object(object_name.clone(), object);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uniform::{UniformDef, UniformTier};

    #[test]
    fn parses_a_nested_scene_definition() {
        let json = r#"{
            "objects": {
                "clock": {
                    "models": {
                        "face": {
                            "mesh": "disc",
                            "color": [0.2, 0.2, 0.2, 1.0],
                            "uniforms": { "specular_exp": 16.0 }
                        },
                        "hand": {
                            "mesh": "bar",
                            "color": [0.9, 0.9, 0.9, 1.0],
                            "transform": { "translate": [0.0, 0.0, 1.0] },
                            "hide": true
                        }
                    },
                    "transform": { "scale": [2.0, 2.0, 1.0] },
                    "update": "spin_hands"
                }
            }
        }"#;
        let def = SceneDef::from_json_str(json).unwrap();
        let clock = &def.objects["clock"];
        assert_eq!(clock.models.len(), 2);
        assert!(clock.models["hand"].hide);
        assert!(clock.models["hand"].scene_world);
        assert_eq!(clock.update.as_deref(), Some("spin_hands"));
        assert_eq!(clock.transform.scale, Some([2.0, 2.0, 1.0]));
    }

    #[test]
    fn transform_def_realizes_in_order() {
        let def = TransformDef {
            scale: Some([2.0, 2.0, 2.0]),
            rotate: vec![RotationDef {
                axis: [0.0, 0.0, 1.0],
                angle: std::f32::consts::FRAC_PI_2,
            }],
            translate: Some([1.0, 0.0, 0.0]),
            as_base: false,
        };
        let world = def.to_world();
        // Scale, then rotate, then translate: (1, 0, 0) ends up at
        // (1, 2, 0).
        let p = world.to_matrix().transform_point3(Vec3::X);
        assert!((p - Vec3::new(1.0, 2.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn uniform_defs_type_against_the_layout() {
        let def = UniformValueDef::Scalar(3.0);
        assert_eq!(
            def.typed("specular_exp", UniformType::Float).unwrap(),
            UniformValue::Float(3.0)
        );
        assert_eq!(
            def.typed("lighting_on", UniformType::Int).unwrap(),
            UniformValue::Int(3)
        );

        let list = UniformValueDef::List(vec![1.0, 2.0, 3.0]);
        assert_eq!(
            list.typed("tint", UniformType::Vec3).unwrap(),
            UniformValue::Vec3(Vec3::new(1.0, 2.0, 3.0))
        );

        let wrong = UniformValueDef::List(vec![1.0, 2.0]);
        assert!(wrong.typed("tint", UniformType::Vec3).is_err());
    }

    #[test]
    fn unknown_uniform_names_fail_at_build_time() {
        let defs: BTreeMap<String, UniformValueDef> =
            [("nonsense".to_string(), UniformValueDef::Scalar(1.0))]
                .into_iter()
                .collect();
        let layout = UniformsLayout::build(&[UniformDef::new(
            UniformTier::Model,
            "specular_exp",
            UniformType::Float,
            UniformValue::Float(8.0),
        )]);
        let err = typed_set(&defs, &layout.model, "clock.face").unwrap_err();
        assert!(err.to_string().contains("nonsense"));
    }

    #[test]
    fn registry_instantiates_fresh_callbacks() {
        let mut registry = UpdateRegistry::new();
        registry.register("spin", || {
            Box::new(|obj: &mut SceneObject, dt: f32| {
                obj.world.rotate_z(dt);
            })
        });
        assert!(registry.instantiate("spin").is_ok());
        assert!(registry.instantiate("missing").is_err());
    }
}
