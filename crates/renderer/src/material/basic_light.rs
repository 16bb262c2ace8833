use asset::VertexSemantic;
use corelib::Vec3;

use super::{LIT_SYSTEM_UNIFORMS, LightMode, Material, RenderPass, RenderPassList, SystemUniform};
use crate::cache::{ProgramCache, ProgramKey};
use crate::shader::{LinkError, ShaderProgram};

const KEY: ProgramKey = ProgramKey("basic_light");
const VERTEX_SRC: &str = include_str!("../shaders/basic_light.vert.wgsl");
const FRAGMENT_SRC: &str = include_str!("../shaders/basic_light.frag.wgsl");

const ATTRIBUTES: [(VertexSemantic, &str); 2] = [
    (VertexSemantic::Position, "a_Position"),
    (VertexSemantic::Normal, "a_Normal"),
];

/// Per-vertex Phong with a single Base pass. Extra lights are ignored.
#[derive(Clone, Debug)]
pub struct BasicLightMaterial {
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub gloss: f32,
    passes: RenderPassList,
}

impl BasicLightMaterial {
    pub fn new(cache: &ProgramCache) -> Result<Self, LinkError> {
        let program = cache.get_or_link(KEY, || {
            ShaderProgram::link(KEY.0, VERTEX_SRC, FRAGMENT_SRC, &ATTRIBUTES)
        })?;
        let mut passes = RenderPassList::new();
        passes.add_render_pass(program, LightMode::Base);
        Ok(Self {
            diffuse: Vec3::ONE,
            specular: Vec3::ONE,
            gloss: 20.0,
            passes,
        })
    }
}

impl Material for BasicLightMaterial {
    fn render_passes(&self) -> &[RenderPass] {
        self.passes.as_slice()
    }

    fn required_system_uniforms(&self) -> &[SystemUniform] {
        &LIT_SYSTEM_UNIFORMS
    }

    fn bind_custom_uniforms(&self, pass: &RenderPass) {
        let program = pass.program();
        program.set_uniform_safe("u_diffuse", self.diffuse);
        program.set_uniform_safe("u_specular", self.specular);
        program.set_uniform_safe("u_gloss", self.gloss);
    }
}
