use asset::VertexSemantic;
use corelib::{Vec3, Vec4};

use super::{LIT_SYSTEM_UNIFORMS, LightMode, Material, RenderPass, RenderPassList, SystemUniform};
use crate::cache::{ProgramCache, ProgramKey};
use crate::shader::{LinkError, ShaderProgram, TextureHandle};

const BASE_KEY: ProgramKey = ProgramKey("vertex_light.forward_base");
const ADD_KEY: ProgramKey = ProgramKey("vertex_light.forward_add");

const BASE_VERTEX_SRC: &str = include_str!("../shaders/vertex_light_base.vert.wgsl");
const ADD_VERTEX_SRC: &str = include_str!("../shaders/vertex_light_add.vert.wgsl");
const FRAGMENT_SRC: &str = include_str!("../shaders/vertex_light.frag.wgsl");

const ATTRIBUTES: [(VertexSemantic, &str); 3] = [
    (VertexSemantic::Position, "a_Position"),
    (VertexSemantic::Normal, "a_Normal"),
    (VertexSemantic::Uv0, "a_Texcoord"),
];

/// Per-vertex lighting over a tinted main texture.
///
/// The Base pass adds ambient and the first light; the Add pass contributes one
/// further light at a time and does not declare `u_ambient`.
#[derive(Clone, Debug)]
pub struct VertexLightMaterial {
    pub specular: Vec3,
    pub gloss: f32,
    pub color_tint: Vec3,
    pub main_texture: Option<TextureHandle>,
    /// Scale in xy, offset in zw.
    pub main_texture_st: Vec4,
    passes: RenderPassList,
}

impl VertexLightMaterial {
    pub fn new(cache: &ProgramCache) -> Result<Self, LinkError> {
        let base = cache.get_or_link(BASE_KEY, || {
            ShaderProgram::link(BASE_KEY.0, BASE_VERTEX_SRC, FRAGMENT_SRC, &ATTRIBUTES)
        })?;
        let add = cache.get_or_link(ADD_KEY, || {
            ShaderProgram::link(ADD_KEY.0, ADD_VERTEX_SRC, FRAGMENT_SRC, &ATTRIBUTES)
        })?;

        let mut passes = RenderPassList::new();
        passes.add_render_pass(base, LightMode::Base);
        passes.add_render_pass(add, LightMode::Add);
        Ok(Self {
            specular: Vec3::ONE,
            gloss: 20.0,
            color_tint: Vec3::ONE,
            main_texture: None,
            main_texture_st: Vec4::new(1.0, 1.0, 0.0, 0.0),
            passes,
        })
    }
}

impl Material for VertexLightMaterial {
    fn render_passes(&self) -> &[RenderPass] {
        self.passes.as_slice()
    }

    fn required_system_uniforms(&self) -> &[SystemUniform] {
        &LIT_SYSTEM_UNIFORMS
    }

    fn bind_custom_uniforms(&self, pass: &RenderPass) {
        let program = pass.program();
        program.set_uniform_safe("u_specular", self.specular);
        program.set_uniform_safe("u_gloss", self.gloss);
        program.set_uniform_safe("u_colorTint", self.color_tint);
        program.set_uniform_safe("u_texMain_ST", self.main_texture_st);
        // The program is shared; an untextured instance must not inherit another's texture.
        match self.main_texture {
            Some(texture) => {
                program.set_uniform_safe("u_texMain", texture);
            }
            None => {
                program.clear_uniform("u_texMain");
            }
        }
    }
}
