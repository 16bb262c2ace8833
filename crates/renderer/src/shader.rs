//! Compiled shader programs.
//!
//! A program is a WGSL vertex module plus a WGSL fragment module. Linking parses and
//! validates both with naga and reflects, once, every uniform they declare and every
//! vertex input location. Uniform writes go through that table: the strict setter
//! reports unknown names, the tolerant one treats them as a no-op.

use std::collections::HashMap;

use asset::VertexSemantic;
use corelib::{Mat3, Mat4, Vec2, Vec3, Vec4};
use naga::{AddressSpace, Binding, Module, ScalarKind, ShaderStage, TypeInner, VectorSize};
use parking_lot::Mutex;

/// Opaque id of a texture living on the GPU side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UniformKind {
    Float,
    Int,
    UInt,
    Vec2,
    Vec3,
    Vec4,
    Mat3,
    Mat4,
    Texture,
    /// Declared with a type the setters cannot write.
    Other,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Int(i32),
    UInt(u32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat3(Mat3),
    Mat4(Mat4),
    Texture(TextureHandle),
}

impl UniformValue {
    pub fn kind(&self) -> UniformKind {
        match self {
            UniformValue::Float(_) => UniformKind::Float,
            UniformValue::Int(_) => UniformKind::Int,
            UniformValue::UInt(_) => UniformKind::UInt,
            UniformValue::Vec2(_) => UniformKind::Vec2,
            UniformValue::Vec3(_) => UniformKind::Vec3,
            UniformValue::Vec4(_) => UniformKind::Vec4,
            UniformValue::Mat3(_) => UniformKind::Mat3,
            UniformValue::Mat4(_) => UniformKind::Mat4,
            UniformValue::Texture(_) => UniformKind::Texture,
        }
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        UniformValue::Float(v)
    }
}

impl From<i32> for UniformValue {
    fn from(v: i32) -> Self {
        UniformValue::Int(v)
    }
}

impl From<Vec2> for UniformValue {
    fn from(v: Vec2) -> Self {
        UniformValue::Vec2(v)
    }
}

impl From<Vec3> for UniformValue {
    fn from(v: Vec3) -> Self {
        UniformValue::Vec3(v)
    }
}

impl From<[f32; 3]> for UniformValue {
    fn from(v: [f32; 3]) -> Self {
        UniformValue::Vec3(Vec3::from(v))
    }
}

impl From<Vec4> for UniformValue {
    fn from(v: Vec4) -> Self {
        UniformValue::Vec4(v)
    }
}

impl From<Mat4> for UniformValue {
    fn from(v: Mat4) -> Self {
        UniformValue::Mat4(v)
    }
}

impl From<TextureHandle> for UniformValue {
    fn from(v: TextureHandle) -> Self {
        UniformValue::Texture(v)
    }
}

/// Reflected declaration of one uniform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UniformInfo {
    pub kind: UniformKind,
    pub group: u32,
    pub binding: u32,
    slot: usize,
}

/// Outcome of [`ShaderProgram::set_uniform_safe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UniformWrite {
    /// The program does not declare the uniform; nothing happened.
    Absent,
    /// Declared, but with a different kind; nothing was written.
    Rejected,
    Written,
}

#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("{stage:?} shader of '{label}' failed to parse:\n{message}")]
    Parse {
        label: String,
        stage: ShaderStage,
        message: String,
    },

    #[error("{stage:?} shader of '{label}' failed validation:\n{message}")]
    Validation {
        label: String,
        stage: ShaderStage,
        message: String,
    },

    #[error("{stage:?} shader of '{label}' has no {stage:?} entry point")]
    MissingEntryPoint { label: String, stage: ShaderStage },

    #[error("uniform '{name}' of '{label}' is declared as {first:?} and {second:?}")]
    UniformConflict {
        label: String,
        name: String,
        first: UniformKind,
        second: UniformKind,
    },
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum UniformError {
    #[error("'{program}' declares no uniform named '{name}'")]
    Unknown { program: String, name: String },

    #[error("uniform '{name}' of '{program}' is {expected:?}, got {actual:?}")]
    KindMismatch {
        program: String,
        name: String,
        expected: UniformKind,
        actual: UniformKind,
    },
}

#[derive(Debug)]
pub struct ShaderProgram {
    label: String,
    uniforms: HashMap<String, UniformInfo>,
    inputs: HashMap<String, u32>,
    attributes: Vec<(VertexSemantic, String)>,
    values: Mutex<Vec<Option<UniformValue>>>,
}

impl ShaderProgram {
    /// Compile and link a vertex/fragment pair. `attributes` maps mesh semantics to
    /// vertex input names.
    pub fn link(
        label: &str,
        vertex_src: &str,
        fragment_src: &str,
        attributes: &[(VertexSemantic, &str)],
    ) -> Result<Self, LinkError> {
        let result = Self::link_inner(label, vertex_src, fragment_src, attributes);
        match &result {
            Ok(program) => log::debug!(
                "linked '{}': {} uniforms, {} vertex inputs",
                label,
                program.uniforms.len(),
                program.inputs.len()
            ),
            Err(e) => log::error!("failed to link program: {e}"),
        }
        result
    }

    fn link_inner(
        label: &str,
        vertex_src: &str,
        fragment_src: &str,
        attributes: &[(VertexSemantic, &str)],
    ) -> Result<Self, LinkError> {
        let vs = compile(label, ShaderStage::Vertex, vertex_src)?;
        let fs = compile(label, ShaderStage::Fragment, fragment_src)?;

        let mut uniforms = HashMap::new();
        collect_uniforms(label, &vs, &mut uniforms)?;
        collect_uniforms(label, &fs, &mut uniforms)?;

        Ok(Self {
            label: label.to_string(),
            values: Mutex::new(vec![None; uniforms.len()]),
            uniforms,
            inputs: vertex_inputs(&vs),
            attributes: attributes
                .iter()
                .map(|&(semantic, name)| (semantic, name.to_string()))
                .collect(),
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn has_uniform(&self, name: &str) -> bool {
        self.uniforms.contains_key(name)
    }

    pub fn uniform_info(&self, name: &str) -> Option<&UniformInfo> {
        self.uniforms.get(name)
    }

    pub fn uniform_names(&self) -> impl Iterator<Item = &str> {
        self.uniforms.keys().map(String::as_str)
    }

    /// Last value written to `name`, if any.
    pub fn uniform(&self, name: &str) -> Option<UniformValue> {
        let info = self.uniforms.get(name)?;
        self.values.lock()[info.slot]
    }

    /// Strict write: unknown names and kind mismatches are errors.
    pub fn set_uniform(
        &self,
        name: &str,
        value: impl Into<UniformValue>,
    ) -> Result<(), UniformError> {
        let value = value.into();
        let info = self.uniforms.get(name).ok_or_else(|| UniformError::Unknown {
            program: self.label.clone(),
            name: name.to_string(),
        })?;
        if info.kind != value.kind() {
            return Err(UniformError::KindMismatch {
                program: self.label.clone(),
                name: name.to_string(),
                expected: info.kind,
                actual: value.kind(),
            });
        }
        self.values.lock()[info.slot] = Some(value);
        Ok(())
    }

    /// Tolerant write: a uniform the program does not declare is skipped silently.
    pub fn set_uniform_safe(&self, name: &str, value: impl Into<UniformValue>) -> UniformWrite {
        match self.set_uniform(name, value) {
            Ok(()) => UniformWrite::Written,
            Err(UniformError::Unknown { .. }) => UniformWrite::Absent,
            Err(e) => {
                log::warn!("{e}");
                UniformWrite::Rejected
            }
        }
    }

    /// Forget the value last written to `name`. Returns `false` when the program
    /// does not declare it.
    pub fn clear_uniform(&self, name: &str) -> bool {
        let Some(info) = self.uniforms.get(name) else {
            return false;
        };
        self.values.lock()[info.slot] = None;
        true
    }

    /// Every uniform that has a value, sorted by name.
    pub fn snapshot(&self) -> Vec<(String, UniformValue)> {
        let values = self.values.lock();
        let mut out: Vec<_> = self
            .uniforms
            .iter()
            .filter_map(|(name, info)| values[info.slot].map(|v| (name.clone(), v)))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    /// Location of the vertex input bound to `semantic`.
    pub fn attribute_location(&self, semantic: VertexSemantic) -> Option<u32> {
        let (_, name) = self.attributes.iter().find(|(s, _)| *s == semantic)?;
        self.attribute_location_by_name(name)
    }

    pub fn attribute_location_by_name(&self, name: &str) -> Option<u32> {
        self.inputs.get(name).copied()
    }

    /// Semantics this program binds, in declaration order.
    pub fn attribute_semantics(&self) -> impl Iterator<Item = VertexSemantic> + '_ {
        self.attributes.iter().map(|(s, _)| *s)
    }
}

fn compile(label: &str, stage: ShaderStage, src: &str) -> Result<Module, LinkError> {
    let module = naga::front::wgsl::parse_str(src).map_err(|e| LinkError::Parse {
        label: label.to_string(),
        stage,
        message: e.emit_to_string(src),
    })?;

    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|e| LinkError::Validation {
        label: label.to_string(),
        stage,
        message: e.emit_to_string(src),
    })?;

    if !module.entry_points.iter().any(|ep| ep.stage == stage) {
        return Err(LinkError::MissingEntryPoint {
            label: label.to_string(),
            stage,
        });
    }
    Ok(module)
}

fn uniform_kind(inner: &TypeInner) -> UniformKind {
    match *inner {
        TypeInner::Scalar(scalar) => match scalar.kind {
            ScalarKind::Float => UniformKind::Float,
            ScalarKind::Sint => UniformKind::Int,
            ScalarKind::Uint => UniformKind::UInt,
            _ => UniformKind::Other,
        },
        TypeInner::Vector { size, scalar } if scalar.kind == ScalarKind::Float => match size {
            VectorSize::Bi => UniformKind::Vec2,
            VectorSize::Tri => UniformKind::Vec3,
            VectorSize::Quad => UniformKind::Vec4,
        },
        TypeInner::Matrix {
            columns: VectorSize::Tri,
            rows: VectorSize::Tri,
            ..
        } => UniformKind::Mat3,
        TypeInner::Matrix {
            columns: VectorSize::Quad,
            rows: VectorSize::Quad,
            ..
        } => UniformKind::Mat4,
        _ => UniformKind::Other,
    }
}

fn collect_uniforms(
    label: &str,
    module: &Module,
    table: &mut HashMap<String, UniformInfo>,
) -> Result<(), LinkError> {
    for (_, var) in module.global_variables.iter() {
        let inner = &module.types[var.ty].inner;
        let kind = match var.space {
            AddressSpace::Uniform => uniform_kind(inner),
            AddressSpace::Handle => match inner {
                TypeInner::Image { .. } => UniformKind::Texture,
                // Samplers travel with their texture.
                _ => continue,
            },
            _ => continue,
        };
        let Some(name) = var.name.clone() else {
            continue;
        };
        let (group, binding) = var.binding.as_ref().map_or((0, 0), |b| (b.group, b.binding));

        match table.get(&name) {
            Some(existing) if existing.kind != kind => {
                return Err(LinkError::UniformConflict {
                    label: label.to_string(),
                    name,
                    first: existing.kind,
                    second: kind,
                });
            }
            Some(_) => {}
            None => {
                let slot = table.len();
                table.insert(
                    name,
                    UniformInfo {
                        kind,
                        group,
                        binding,
                        slot,
                    },
                );
            }
        }
    }
    Ok(())
}

fn vertex_inputs(module: &Module) -> HashMap<String, u32> {
    let mut inputs = HashMap::new();
    let mut add = |name: &Option<String>, binding: &Option<Binding>| {
        if let (Some(name), Some(Binding::Location { location, .. })) = (name, binding) {
            inputs.insert(name.clone(), *location);
        }
    };

    for ep in module.entry_points.iter().filter(|ep| ep.stage == ShaderStage::Vertex) {
        for arg in &ep.function.arguments {
            if arg.binding.is_some() {
                add(&arg.name, &arg.binding);
            } else if let TypeInner::Struct { members, .. } = &module.types[arg.ty].inner {
                for member in members {
                    add(&member.name, &member.binding);
                }
            }
        }
    }
    inputs
}
