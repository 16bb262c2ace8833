//! Boundary to the GPU buffer collaborator.

use crate::error::UploadError;

/// Creates GPU buffers from raw bytes. Implemented by the renderer backends.
pub trait BufferFactory {
    type Buffer;

    fn create_vertex_buffer(&self, label: &str, contents: &[u8])
    -> Result<Self::Buffer, UploadError>;

    fn create_index_buffer(&self, label: &str, contents: &[u8]) -> Result<Self::Buffer, UploadError>;
}
