//! Materials: ordered render passes plus the uniforms each pass needs.
//!
//! The renderer only talks to [`Material`]. It binds the system uniforms a material
//! asks for, then lets the material write its own values into the pass program.

mod basic_light;
mod vertex_light;

use std::sync::Arc;

pub use basic_light::BasicLightMaterial;
pub use vertex_light::VertexLightMaterial;

use crate::shader::ShaderProgram;

/// Which lights a pass is drawn for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LightMode {
    /// Runs once per draw: ambient plus the first light.
    #[default]
    Base,
    /// Runs once per additional light, blended additively.
    Add,
}

/// Engine-supplied shader inputs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SystemUniform {
    MvpMatrix,
    World2Object,
    Object2World,
    WorldCameraPos,
    SceneAmbient,
    LightColor,
    WorldLightPos,
}

impl SystemUniform {
    pub const ALL: [SystemUniform; 7] = [
        SystemUniform::MvpMatrix,
        SystemUniform::World2Object,
        SystemUniform::Object2World,
        SystemUniform::WorldCameraPos,
        SystemUniform::SceneAmbient,
        SystemUniform::LightColor,
        SystemUniform::WorldLightPos,
    ];

    /// Name the uniform is declared under in shader source.
    pub fn uniform_name(self) -> &'static str {
        match self {
            SystemUniform::MvpMatrix => "u_mvpMatrix",
            SystemUniform::World2Object => "u_world2Object",
            SystemUniform::Object2World => "u_object2World",
            SystemUniform::WorldCameraPos => "u_worldCameraPos",
            SystemUniform::SceneAmbient => "u_ambient",
            SystemUniform::LightColor => "u_LightColor",
            SystemUniform::WorldLightPos => "u_worldLightPos",
        }
    }
}

#[derive(Clone, Debug)]
pub struct RenderPass {
    program: Arc<ShaderProgram>,
    light_mode: LightMode,
}

impl RenderPass {
    pub fn new(program: Arc<ShaderProgram>, light_mode: LightMode) -> Self {
        Self {
            program,
            light_mode,
        }
    }

    pub fn program(&self) -> &ShaderProgram {
        &self.program
    }

    pub fn shared_program(&self) -> &Arc<ShaderProgram> {
        &self.program
    }

    pub fn light_mode(&self) -> LightMode {
        self.light_mode
    }
}

/// Ordered pass list a material variant builds in its constructor.
#[derive(Clone, Debug, Default)]
pub struct RenderPassList {
    passes: Vec<RenderPass>,
}

impl RenderPassList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_render_pass(&mut self, program: Arc<ShaderProgram>, light_mode: LightMode) {
        self.passes.push(RenderPass::new(program, light_mode));
    }

    pub fn as_slice(&self) -> &[RenderPass] {
        &self.passes
    }
}

/// Contract every material variant fulfils.
pub trait Material {
    fn render_passes(&self) -> &[RenderPass];

    /// System uniforms the renderer must bind before each pass.
    fn required_system_uniforms(&self) -> &[SystemUniform];

    /// Write material values into `pass`. Called once per pass per draw.
    fn bind_custom_uniforms(&self, pass: &RenderPass);
}

/// Uniform set shared by the lit materials.
pub const LIT_SYSTEM_UNIFORMS: [SystemUniform; 7] = SystemUniform::ALL;
