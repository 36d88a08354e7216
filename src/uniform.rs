//! Typed shader uniforms and the four-tier value merge.
//!
//! Uniforms live in one uniform block per program. Each declared uniform has
//! a type, a byte offset assigned at program build time (the Rust-side twin
//! of a GL uniform location), and a default value. Declarations partition
//! into four tiers — [`UniformTier::Scene`], [`UniformTier::Object`],
//! [`UniformTier::Model`], [`UniformTier::Mesh`] — and each draw resolves
//! every declared name as:
//!
//! ```text
//! effective = forced override ?? caller-supplied value ?? tier default
//! ```
//!
//! The winning values are serialized into the draw's block slice with WGSL
//! uniform-address-space size/alignment rules, so the Rust layout and the
//! shader struct agree as long as both declare fields in the same order.
//!
//! Assigning a value whose type differs from the declared slot type is a
//! programming error and panics; there is no silent coercion.

use std::collections::BTreeMap;

use glam::{Mat2, Mat3, Mat4, Vec2, Vec3, Vec4};

/// The four scopes at which uniform defaults and overrides are declared.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UniformTier {
    /// Frame-wide values: projection, view matrices, light data.
    Scene,
    /// Per scene object: the shared object-to-world matrix.
    Object,
    /// Per model: world factors and material parameters.
    Model,
    /// Per mesh: defaults stored with the geometry (e.g. `lighting_on`).
    Mesh,
}

impl UniformTier {
    pub const ALL: [UniformTier; 4] = [
        UniformTier::Scene,
        UniformTier::Object,
        UniformTier::Model,
        UniformTier::Mesh,
    ];
}

/// Declared type of a uniform slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UniformType {
    Mat2,
    Mat3,
    Mat4,
    Float,
    Vec2,
    Vec3,
    Vec4,
    Int,
    IVec2,
    IVec3,
    IVec4,
}

impl UniformType {
    /// Alignment in the uniform address space (WGSL rules).
    pub fn align(self) -> usize {
        match self {
            UniformType::Float | UniformType::Int => 4,
            UniformType::Vec2 | UniformType::IVec2 | UniformType::Mat2 => 8,
            UniformType::Vec3
            | UniformType::Vec4
            | UniformType::IVec3
            | UniformType::IVec4
            | UniformType::Mat3
            | UniformType::Mat4 => 16,
        }
    }

    /// Size in bytes in the uniform address space. Matrix columns pad to
    /// their column alignment (a mat3 is three vec3 columns, each padded to
    /// 16 bytes).
    pub fn size(self) -> usize {
        match self {
            UniformType::Float | UniformType::Int => 4,
            UniformType::Vec2 | UniformType::IVec2 => 8,
            UniformType::Vec3 | UniformType::IVec3 => 12,
            UniformType::Vec4 | UniformType::IVec4 => 16,
            UniformType::Mat2 => 16,
            UniformType::Mat3 => 48,
            UniformType::Mat4 => 64,
        }
    }
}

/// A concrete uniform value.
#[derive(Clone, Debug, PartialEq)]
pub enum UniformValue {
    Mat2(Mat2),
    Mat3(Mat3),
    Mat4(Mat4),
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Int(i32),
    IVec2([i32; 2]),
    IVec3([i32; 3]),
    IVec4([i32; 4]),
}

impl UniformValue {
    /// The declared type this value satisfies.
    pub fn ty(&self) -> UniformType {
        match self {
            UniformValue::Mat2(_) => UniformType::Mat2,
            UniformValue::Mat3(_) => UniformType::Mat3,
            UniformValue::Mat4(_) => UniformType::Mat4,
            UniformValue::Float(_) => UniformType::Float,
            UniformValue::Vec2(_) => UniformType::Vec2,
            UniformValue::Vec3(_) => UniformType::Vec3,
            UniformValue::Vec4(_) => UniformType::Vec4,
            UniformValue::Int(_) => UniformType::Int,
            UniformValue::IVec2(_) => UniformType::IVec2,
            UniformValue::IVec3(_) => UniformType::IVec3,
            UniformValue::IVec4(_) => UniformType::IVec4,
        }
    }

    fn write_at(&self, block: &mut [u8], offset: usize) {
        fn put(block: &mut [u8], offset: usize, bytes: &[u8]) {
            block[offset..offset + bytes.len()].copy_from_slice(bytes);
        }
        match self {
            UniformValue::Mat2(m) => put(block, offset, bytemuck::bytes_of(&m.to_cols_array())),
            UniformValue::Mat3(m) => {
                // Three vec3 columns, each padded to 16 bytes.
                for (i, col) in [m.x_axis, m.y_axis, m.z_axis].iter().enumerate() {
                    put(block, offset + i * 16, bytemuck::bytes_of(&col.to_array()));
                }
            }
            UniformValue::Mat4(m) => put(block, offset, bytemuck::bytes_of(&m.to_cols_array())),
            UniformValue::Float(v) => put(block, offset, bytemuck::bytes_of(v)),
            UniformValue::Vec2(v) => put(block, offset, bytemuck::bytes_of(&v.to_array())),
            UniformValue::Vec3(v) => put(block, offset, bytemuck::bytes_of(&v.to_array())),
            UniformValue::Vec4(v) => put(block, offset, bytemuck::bytes_of(&v.to_array())),
            UniformValue::Int(v) => put(block, offset, bytemuck::bytes_of(v)),
            UniformValue::IVec2(v) => put(block, offset, bytemuck::bytes_of(v)),
            UniformValue::IVec3(v) => put(block, offset, bytemuck::bytes_of(v)),
            UniformValue::IVec4(v) => put(block, offset, bytemuck::bytes_of(v)),
        }
    }
}

/// A named bag of uniform values, used for defaults, per-draw supplies, and
/// forced overrides. Ordered so traversal stays deterministic.
pub type UniformSet = BTreeMap<String, UniformValue>;

/// A resolved uniform bound to its block slot: type, offset, value.
#[derive(Clone, Debug)]
pub struct Uniform {
    pub ty: UniformType,
    pub offset: usize,
    pub value: UniformValue,
}

impl Uniform {
    /// Serialize the value into the uniform block.
    ///
    /// # Panics
    ///
    /// Panics when the value's dimensionality does not match the declared
    /// type — a contract violation, not a recoverable condition.
    pub fn write(&self, block: &mut [u8]) {
        assert_eq!(
            self.value.ty(),
            self.ty,
            "uniform value type {:?} does not match declared type {:?}",
            self.value.ty(),
            self.ty,
        );
        self.value.write_at(block, self.offset);
    }
}

/// One declared uniform: tier, name, type, default value.
#[derive(Clone, Debug)]
pub struct UniformDef {
    pub tier: UniformTier,
    pub name: &'static str,
    pub ty: UniformType,
    pub default: UniformValue,
}

impl UniformDef {
    pub fn new(
        tier: UniformTier,
        name: &'static str,
        ty: UniformType,
        default: UniformValue,
    ) -> Self {
        assert_eq!(
            default.ty(),
            ty,
            "default for uniform '{name}' does not match its declared type"
        );
        Self {
            tier,
            name,
            ty,
            default,
        }
    }
}

/// A slot in the built layout.
#[derive(Clone, Debug)]
pub struct UniformSlot {
    pub ty: UniformType,
    pub offset: usize,
    pub default: UniformValue,
}

/// The per-tier slot table of one compiled program.
#[derive(Clone, Debug, Default)]
pub struct TierLayout {
    /// Slots in declaration order, which is also block order.
    pub slots: Vec<(String, UniformSlot)>,
}

impl TierLayout {
    pub fn get(&self, name: &str) -> Option<&UniformSlot> {
        self.slots
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, slot)| slot)
    }
}

/// Four-tier uniform layout plus the total block size.
#[derive(Clone, Debug, Default)]
pub struct UniformsLayout {
    pub scene: TierLayout,
    pub object: TierLayout,
    pub model: TierLayout,
    pub mesh: TierLayout,
    /// Block size in bytes, padded to 16.
    pub block_size: usize,
}

impl UniformsLayout {
    /// Assign block offsets to `defs` in declaration order using WGSL
    /// uniform layout rules and bucket the slots by tier.
    pub fn build(defs: &[UniformDef]) -> Self {
        let mut layout = UniformsLayout::default();
        let mut offset = 0usize;
        for def in defs {
            offset = offset.next_multiple_of(def.ty.align());
            let slot = UniformSlot {
                ty: def.ty,
                offset,
                default: def.default.clone(),
            };
            offset += def.ty.size();
            layout.tier_mut(def.tier).slots.push((def.name.into(), slot));
        }
        layout.block_size = offset.next_multiple_of(16).max(16);
        layout
    }

    pub fn tier(&self, tier: UniformTier) -> &TierLayout {
        match tier {
            UniformTier::Scene => &self.scene,
            UniformTier::Object => &self.object,
            UniformTier::Model => &self.model,
            UniformTier::Mesh => &self.mesh,
        }
    }

    fn tier_mut(&mut self, tier: UniformTier) -> &mut TierLayout {
        match tier {
            UniformTier::Scene => &mut self.scene,
            UniformTier::Object => &mut self.object,
            UniformTier::Model => &mut self.model,
            UniformTier::Mesh => &mut self.mesh,
        }
    }
}

/// Resolve one tier: for every declared name pick
/// `forced ?? supplied ?? default` and append the concrete [`Uniform`].
pub fn resolve_tier(
    layout: &TierLayout,
    forced: Option<&UniformSet>,
    supplied: Option<&UniformSet>,
    out: &mut Vec<Uniform>,
) {
    for (name, slot) in &layout.slots {
        let value = forced
            .and_then(|set| set.get(name))
            .or_else(|| supplied.and_then(|set| set.get(name)))
            .cloned()
            .unwrap_or_else(|| slot.default.clone());
        out.push(Uniform {
            ty: slot.ty,
            offset: slot.offset,
            value,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn float_set(pairs: &[(&str, f32)]) -> UniformSet {
        pairs
            .iter()
            .map(|(n, v)| (n.to_string(), UniformValue::Float(*v)))
            .collect()
    }

    fn layout_xyz() -> TierLayout {
        let defs = [
            UniformDef::new(
                UniformTier::Mesh,
                "x",
                UniformType::Float,
                UniformValue::Float(4.0),
            ),
            UniformDef::new(
                UniformTier::Mesh,
                "y",
                UniformType::Float,
                UniformValue::Float(5.0),
            ),
            UniformDef::new(
                UniformTier::Mesh,
                "z",
                UniformType::Float,
                UniformValue::Float(6.0),
            ),
        ];
        UniformsLayout::build(&defs).mesh
    }

    #[test]
    fn merge_precedence_forced_supplied_default() {
        let layout = layout_xyz();
        let forced = float_set(&[("x", 1.0)]);
        let supplied = float_set(&[("x", 2.0), ("y", 3.0)]);

        let mut out = Vec::new();
        resolve_tier(&layout, Some(&forced), Some(&supplied), &mut out);

        let values: Vec<f32> = out
            .iter()
            .map(|u| match u.value {
                UniformValue::Float(v) => v,
                _ => panic!("expected float"),
            })
            .collect();
        assert_eq!(values, vec![1.0, 3.0, 6.0]);
    }

    #[test]
    fn missing_supplies_fall_through_to_defaults() {
        let layout = layout_xyz();
        let mut out = Vec::new();
        resolve_tier(&layout, None, None, &mut out);
        assert_eq!(out.len(), 3);
        assert_eq!(out[2].value, UniformValue::Float(6.0));
    }

    #[test]
    fn offsets_follow_wgsl_uniform_rules() {
        let defs = [
            UniformDef::new(
                UniformTier::Scene,
                "proj",
                UniformType::Mat4,
                UniformValue::Mat4(Mat4::IDENTITY),
            ),
            UniformDef::new(
                UniformTier::Scene,
                "light_dir",
                UniformType::Vec3,
                UniformValue::Vec3(Vec3::Y),
            ),
            // A float packs into the vec3's trailing 4 bytes.
            UniformDef::new(
                UniformTier::Scene,
                "ambient",
                UniformType::Float,
                UniformValue::Float(0.2),
            ),
            // The next vec3 re-aligns to 16.
            UniformDef::new(
                UniformTier::Scene,
                "camera_pos",
                UniformType::Vec3,
                UniformValue::Vec3(Vec3::ZERO),
            ),
        ];
        let layout = UniformsLayout::build(&defs);
        let scene = &layout.scene;
        assert_eq!(scene.get("proj").unwrap().offset, 0);
        assert_eq!(scene.get("light_dir").unwrap().offset, 64);
        assert_eq!(scene.get("ambient").unwrap().offset, 76);
        assert_eq!(scene.get("camera_pos").unwrap().offset, 80);
        assert_eq!(layout.block_size, 96);
    }

    #[test]
    fn block_write_places_values_at_offsets() {
        let uniform = Uniform {
            ty: UniformType::Vec3,
            offset: 16,
            value: UniformValue::Vec3(Vec3::new(1.0, 2.0, 3.0)),
        };
        let mut block = vec![0u8; 32];
        uniform.write(&mut block);
        let floats: &[f32] = bytemuck::cast_slice(&block);
        assert_eq!(&floats[4..7], &[1.0, 2.0, 3.0]);
    }

    #[test]
    #[should_panic(expected = "does not match declared type")]
    fn dimension_mismatch_is_a_contract_violation() {
        let uniform = Uniform {
            ty: UniformType::Vec3,
            offset: 0,
            value: UniformValue::Vec2(Vec2::ONE),
        };
        let mut block = vec![0u8; 16];
        uniform.write(&mut block);
    }

    #[test]
    fn tiers_partition_declarations() {
        let defs = [
            UniformDef::new(
                UniformTier::Scene,
                "a",
                UniformType::Float,
                UniformValue::Float(0.0),
            ),
            UniformDef::new(
                UniformTier::Model,
                "b",
                UniformType::Float,
                UniformValue::Float(0.0),
            ),
            UniformDef::new(
                UniformTier::Mesh,
                "c",
                UniformType::Int,
                UniformValue::Int(1),
            ),
        ];
        let layout = UniformsLayout::build(&defs);
        assert_eq!(layout.scene.slots.len(), 1);
        assert_eq!(layout.object.slots.len(), 0);
        assert_eq!(layout.model.slots.len(), 1);
        assert_eq!(layout.mesh.slots.len(), 1);
    }
}
