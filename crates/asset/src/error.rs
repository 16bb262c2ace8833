use crate::vertex_format::VertexSemantic;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FormatError {
    #[error("semantic {0:?} is already part of the vertex format")]
    DuplicateSemantic(VertexSemantic),

    #[error("semantic {semantic:?} has {components} components, expected 1..=4")]
    ComponentCount {
        semantic: VertexSemantic,
        components: u32,
    },
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MeshError {
    #[error("semantic {0:?} is not declared by the mesh vertex format")]
    SemanticNotInFormat(VertexSemantic),
}

/// Failure reported by the GPU-side buffer or texture collaborator.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("backend rejected '{label}': {reason}")]
    Backend { label: String, reason: String },

    #[error("mesh has {0} vertices, more than a u32 index can address")]
    TooManyVertices(usize),
}

#[derive(Debug, thiserror::Error)]
pub enum TextureError {
    #[error("texture data is {actual} bytes, {width}x{height} RGBA8 needs {expected}")]
    SizeMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("failed to decode PNG: {0}")]
    Decode(#[from] image::ImageError),
}
