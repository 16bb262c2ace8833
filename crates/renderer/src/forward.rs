//! Forward multi-light pass execution.
//!
//! A draw with N lights runs every Base pass once against light 0, then every Add pass
//! once per remaining light, blended additively over what the earlier passes wrote.

use asset::GpuMesh;
use corelib::{CameraState, Light, Mat4, Vec3, Vec4};

use crate::backend::DrawSink;
use crate::material::{LightMode, Material, RenderPass, SystemUniform};
use crate::shader::{UniformValue, UniformWrite};

/// Placeholder bound to WorldLightPos when the scene has no lights.
const NO_LIGHT_POS: Vec4 = Vec4::new(0.0, 0.0, 1.0, 0.0);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlendMode {
    /// Overwrites the target, writes depth.
    Replace,
    /// `dst + src`, depth tested with `LessEqual` but not written.
    Additive,
}

impl BlendMode {
    pub fn for_light_mode(mode: LightMode) -> Self {
        match mode {
            LightMode::Base => BlendMode::Replace,
            LightMode::Add => BlendMode::Additive,
        }
    }

    pub fn blend_state(self) -> wgpu::BlendState {
        match self {
            BlendMode::Replace => wgpu::BlendState::REPLACE,
            BlendMode::Additive => {
                let add = wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::One,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                };
                wgpu::BlendState {
                    color: add,
                    alpha: add,
                }
            }
        }
    }

    pub fn depth_write_enabled(self) -> bool {
        matches!(self, BlendMode::Replace)
    }

    pub fn depth_compare(self) -> wgpu::CompareFunction {
        match self {
            BlendMode::Replace => wgpu::CompareFunction::Less,
            BlendMode::Additive => wgpu::CompareFunction::LessEqual,
        }
    }
}

/// One execution of one pass against (at most) one light.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PassInvocation {
    pub pass_index: usize,
    pub light_index: Option<usize>,
    pub light_mode: LightMode,
    pub blend: BlendMode,
}

/// Order in which `passes` run for a draw lit by `light_count` lights.
pub fn plan_passes(passes: &[RenderPass], light_count: usize) -> Vec<PassInvocation> {
    let invocation = |pass_index: usize, light_index: Option<usize>| {
        let light_mode = passes[pass_index].light_mode();
        PassInvocation {
            pass_index,
            light_index,
            light_mode,
            blend: BlendMode::for_light_mode(light_mode),
        }
    };

    let first_light = (light_count > 0).then_some(0);
    let mut plan: Vec<_> = indices_of(passes, LightMode::Base)
        .map(|i| invocation(i, first_light))
        .collect();
    for light in 1..light_count {
        plan.extend(indices_of(passes, LightMode::Add).map(|i| invocation(i, Some(light))));
    }
    plan
}

fn indices_of(passes: &[RenderPass], mode: LightMode) -> impl Iterator<Item = usize> + '_ {
    passes
        .iter()
        .enumerate()
        .filter(move |(_, p)| p.light_mode() == mode)
        .map(|(i, _)| i)
}

/// Scene state shared by every draw of a frame.
#[derive(Clone, Debug, Default)]
pub struct FrameState {
    pub camera: CameraState,
    pub ambient: Vec3,
    pub lights: Vec<Light>,
}

impl FrameState {
    pub fn new(camera: CameraState, ambient: Vec3) -> Self {
        Self {
            camera,
            ambient,
            lights: Vec::new(),
        }
    }

    pub fn with_light(mut self, light: Light) -> Self {
        self.lights.push(light);
        self
    }
}

/// Value of `uniform` for one invocation, or `None` when it is not bound there
/// (ambient outside Base passes).
pub fn resolve_system_uniform(
    uniform: SystemUniform,
    invocation: &PassInvocation,
    object_to_world: Mat4,
    frame: &FrameState,
) -> Option<UniformValue> {
    let light = invocation.light_index.and_then(|i| frame.lights.get(i));
    let value: UniformValue = match uniform {
        SystemUniform::MvpMatrix => (frame.camera.view_proj() * object_to_world).into(),
        SystemUniform::World2Object => object_to_world.inverse().into(),
        SystemUniform::Object2World => object_to_world.into(),
        SystemUniform::WorldCameraPos => frame.camera.world_position().into(),
        SystemUniform::SceneAmbient => match invocation.light_mode {
            LightMode::Base => frame.ambient.into(),
            LightMode::Add => return None,
        },
        SystemUniform::LightColor => light.map_or(Vec3::ZERO, |l| l.color).into(),
        SystemUniform::WorldLightPos => light.map_or(NO_LIGHT_POS, Light::world_light_pos).into(),
    };
    Some(value)
}

/// Everything a backend needs to issue one pass.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawCall {
    pub program: String,
    pub invocation: PassInvocation,
    /// System uniforms the program actually received, in the material's order.
    pub system_uniforms: Vec<SystemUniform>,
    /// Program uniform values at submit time, sorted by name.
    pub uniforms: Vec<(String, UniformValue)>,
    pub vertex_count: u32,
    pub index_count: u32,
}

impl DrawCall {
    pub fn uniform(&self, name: &str) -> Option<UniformValue> {
        self.uniforms
            .iter()
            .find(|(n, _)| n == name)
            .map(|&(_, v)| v)
    }

    pub fn binds(&self, uniform: SystemUniform) -> bool {
        self.system_uniforms.contains(&uniform)
    }
}

#[derive(Debug, Default)]
pub struct ForwardRenderer {
    draws: u64,
}

impl ForwardRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pass invocations submitted so far.
    pub fn draws(&self) -> u64 {
        self.draws
    }

    /// Run every applicable pass of `material` over `mesh`; returns the number of
    /// invocations submitted.
    pub fn draw<B>(
        &mut self,
        sink: &mut dyn DrawSink,
        mesh: &GpuMesh<B>,
        material: &dyn Material,
        object_to_world: Mat4,
        frame: &FrameState,
    ) -> usize {
        let passes = material.render_passes();
        let plan = plan_passes(passes, frame.lights.len());
        for invocation in &plan {
            let pass = &passes[invocation.pass_index];
            let program = pass.program();

            let mut bound = Vec::new();
            for &uniform in material.required_system_uniforms() {
                let Some(value) =
                    resolve_system_uniform(uniform, invocation, object_to_world, frame)
                else {
                    continue;
                };
                if program.set_uniform_safe(uniform.uniform_name(), value)
                    == UniformWrite::Written
                {
                    bound.push(uniform);
                }
            }
            material.bind_custom_uniforms(pass);

            log::debug!(
                "pass {} '{}' light {:?} blend {:?}",
                invocation.pass_index,
                program.label(),
                invocation.light_index,
                invocation.blend
            );
            sink.submit(DrawCall {
                program: program.label().to_string(),
                invocation: *invocation,
                system_uniforms: bound,
                uniforms: program.snapshot(),
                vertex_count: mesh.vertex_count(),
                index_count: mesh.index_count(),
            });
            self.draws += 1;
        }
        plan.len()
    }
}
