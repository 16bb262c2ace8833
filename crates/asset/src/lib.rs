//! Asset side of the pipeline: mesh text import, vertex formats, CPU meshes, textures.
//! Everything here is CPU-only; GPU objects are created through [`upload::BufferFactory`].

pub mod error;
pub mod mesh;
pub mod obj;
pub mod texture;
pub mod token;
pub mod upload;
pub mod vertex_format;

pub use error::{FormatError, MeshError, TextureError, UploadError};
pub use mesh::{GpuMesh, Mesh, MeshIssue};
pub use obj::{ImportOutput, ImportWarning, ObjImporter, UvIndexing};
pub use texture::TextureData;
pub use upload::BufferFactory;
pub use vertex_format::{VertexAttrib, VertexFormat, VertexSemantic};
