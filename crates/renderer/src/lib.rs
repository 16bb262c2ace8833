//! Renderer side of the pipeline: shader programs, materials and forward multi-light
//! pass execution. GPU objects are created through the collaborators in [`backend`].

pub mod backend;
pub mod cache;
pub mod forward;
pub mod layout;
pub mod material;
pub mod shader;

pub use backend::{
    DrawSink, GpuTexture, RecordedBuffer, RecordedTexture, RecordingBackend, TextureFactory,
    WgpuUploader,
};
pub use cache::{ProgramCache, ProgramKey};
pub use forward::{
    BlendMode, DrawCall, ForwardRenderer, FrameState, PassInvocation, plan_passes,
    resolve_system_uniform,
};
pub use layout::{VertexLayout, vertex_layout};
pub use material::{
    BasicLightMaterial, LightMode, Material, RenderPass, RenderPassList, SystemUniform,
    VertexLightMaterial,
};
pub use shader::{
    LinkError, ShaderProgram, TextureHandle, UniformError, UniformInfo, UniformKind,
    UniformValue, UniformWrite,
};
