//! GPU collaborators: buffer/texture creation and draw submission.
//!
//! [`RecordingBackend`] keeps everything in memory and is what the tests and the
//! headless app mode use. [`WgpuUploader`] creates real wgpu resources.

use std::cell::Cell;
use std::sync::atomic::{AtomicU64, Ordering};

use asset::{BufferFactory, TextureData, UploadError};
use wgpu::util::DeviceExt;

use crate::forward::DrawCall;
use crate::shader::TextureHandle;

static NEXT_TEXTURE_HANDLE: AtomicU64 = AtomicU64::new(1);

fn next_texture_handle() -> TextureHandle {
    TextureHandle(NEXT_TEXTURE_HANDLE.fetch_add(1, Ordering::Relaxed))
}

/// A backend texture plus the handle materials bind it by.
#[derive(Debug)]
pub struct GpuTexture<T> {
    handle: TextureHandle,
    raw: T,
}

impl<T> GpuTexture<T> {
    pub fn new(raw: T) -> Self {
        Self {
            handle: next_texture_handle(),
            raw,
        }
    }

    pub fn handle(&self) -> TextureHandle {
        self.handle
    }

    pub fn raw(&self) -> &T {
        &self.raw
    }
}

pub trait TextureFactory {
    type Texture;

    fn create_texture(
        &self,
        label: &str,
        texture: &TextureData,
    ) -> Result<GpuTexture<Self::Texture>, UploadError>;
}

/// Receives the pass invocations produced by the forward renderer.
pub trait DrawSink {
    fn submit(&mut self, call: DrawCall);
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedBuffer {
    pub label: String,
    pub bytes: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedTexture {
    pub label: String,
    pub width: u32,
    pub height: u32,
}

/// In-memory backend.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    buffers_created: Cell<usize>,
    bytes_uploaded: Cell<usize>,
    textures_created: Cell<usize>,
    reject_uploads: bool,
    calls: Vec<DrawCall>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend whose every buffer and texture creation fails.
    pub fn rejecting() -> Self {
        Self {
            reject_uploads: true,
            ..Self::default()
        }
    }

    pub fn buffers_created(&self) -> usize {
        self.buffers_created.get()
    }

    pub fn bytes_uploaded(&self) -> usize {
        self.bytes_uploaded.get()
    }

    pub fn textures_created(&self) -> usize {
        self.textures_created.get()
    }

    pub fn draw_calls(&self) -> &[DrawCall] {
        &self.calls
    }

    pub fn take_draw_calls(&mut self) -> Vec<DrawCall> {
        std::mem::take(&mut self.calls)
    }

    fn check(&self, label: &str) -> Result<(), UploadError> {
        if self.reject_uploads {
            return Err(UploadError::Backend {
                label: label.to_string(),
                reason: "backend is rejecting uploads".to_string(),
            });
        }
        Ok(())
    }

    fn record(&self, label: &str, contents: &[u8]) -> Result<RecordedBuffer, UploadError> {
        self.check(label)?;
        self.buffers_created.set(self.buffers_created.get() + 1);
        self.bytes_uploaded
            .set(self.bytes_uploaded.get() + contents.len());
        Ok(RecordedBuffer {
            label: label.to_string(),
            bytes: contents.to_vec(),
        })
    }
}

impl BufferFactory for RecordingBackend {
    type Buffer = RecordedBuffer;

    fn create_vertex_buffer(&self, label: &str, contents: &[u8]) -> Result<Self::Buffer, UploadError> {
        self.record(label, contents)
    }

    fn create_index_buffer(&self, label: &str, contents: &[u8]) -> Result<Self::Buffer, UploadError> {
        self.record(label, contents)
    }
}

impl TextureFactory for RecordingBackend {
    type Texture = RecordedTexture;

    fn create_texture(
        &self,
        label: &str,
        texture: &TextureData,
    ) -> Result<GpuTexture<Self::Texture>, UploadError> {
        self.check(label)?;
        self.textures_created.set(self.textures_created.get() + 1);
        Ok(GpuTexture::new(RecordedTexture {
            label: label.to_string(),
            width: texture.width(),
            height: texture.height(),
        }))
    }
}

impl DrawSink for RecordingBackend {
    fn submit(&mut self, call: DrawCall) {
        self.calls.push(call);
    }
}

/// Creates wgpu buffers and textures, turning validation errors into `UploadError`.
pub struct WgpuUploader<'a> {
    device: &'a wgpu::Device,
    queue: &'a wgpu::Queue,
}

impl<'a> WgpuUploader<'a> {
    pub fn new(device: &'a wgpu::Device, queue: &'a wgpu::Queue) -> Self {
        Self { device, queue }
    }

    fn scoped<T>(&self, label: &str, create: impl FnOnce() -> T) -> Result<T, UploadError> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let out = create();
        match pollster::block_on(self.device.pop_error_scope()) {
            Some(e) => {
                log::error!("wgpu rejected '{}': {}", label, e);
                Err(UploadError::Backend {
                    label: label.to_string(),
                    reason: e.to_string(),
                })
            }
            None => Ok(out),
        }
    }

    fn buffer(
        &self,
        label: &str,
        contents: &[u8],
        usage: wgpu::BufferUsages,
    ) -> Result<wgpu::Buffer, UploadError> {
        self.scoped(label, || {
            self.device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(label),
                    contents,
                    usage,
                })
        })
    }
}

impl BufferFactory for WgpuUploader<'_> {
    type Buffer = wgpu::Buffer;

    fn create_vertex_buffer(&self, label: &str, contents: &[u8]) -> Result<Self::Buffer, UploadError> {
        self.buffer(label, contents, wgpu::BufferUsages::VERTEX)
    }

    fn create_index_buffer(&self, label: &str, contents: &[u8]) -> Result<Self::Buffer, UploadError> {
        self.buffer(label, contents, wgpu::BufferUsages::INDEX)
    }
}

impl TextureFactory for WgpuUploader<'_> {
    type Texture = wgpu::Texture;

    fn create_texture(
        &self,
        label: &str,
        texture: &TextureData,
    ) -> Result<GpuTexture<Self::Texture>, UploadError> {
        let desc = wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: texture.width().max(1),
                height: texture.height().max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        };
        let raw = self.scoped(label, || {
            self.device.create_texture_with_data(
                self.queue,
                &desc,
                wgpu::util::TextureDataOrder::LayerMajor,
                texture.bytes(),
            )
        })?;
        Ok(GpuTexture::new(raw))
    }
}

/// Headless device on the first adapter `backends` offers.
pub async fn request_device(
    backends: wgpu::Backends,
) -> Result<(wgpu::Device, wgpu::Queue), UploadError> {
    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
        backends,
        ..Default::default()
    });
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        })
        .await
        .ok_or_else(|| UploadError::Backend {
            label: "adapter".to_string(),
            reason: format!("no adapter for {:?}", backends),
        })?;
    log::info!("adapter: {:?}", adapter.get_info().name);

    adapter
        .request_device(
            &wgpu::DeviceDescriptor {
                label: Some("mini3d device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_webgl2_defaults()
                    .using_resolution(adapter.limits()),
                memory_hints: Default::default(),
            },
            None,
        )
        .await
        .map_err(|e| UploadError::Backend {
            label: "device".to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use asset::{Mesh, VertexFormat, VertexSemantic};

    use super::*;

    fn triangle() -> Mesh {
        let mut format = VertexFormat::new();
        format.add_attrib(VertexSemantic::Position, 3).unwrap();
        let mut mesh = Mesh::new(format);
        mesh.set_vertex_data(VertexSemantic::Position, vec![0.0; 9]).unwrap();
        mesh.set_triangles(vec![0, 1, 2]);
        mesh
    }

    #[test]
    fn records_uploaded_bytes() {
        let backend = RecordingBackend::new();
        let gpu = triangle().upload(&backend).unwrap();
        assert_eq!(backend.buffers_created(), 2);
        assert_eq!(backend.bytes_uploaded(), 9 * 4 + 3 * 4);
        assert_eq!(gpu.vertex_buffer().bytes.len(), 36);
    }

    #[test]
    fn rejecting_backend_fails_upload() {
        let backend = RecordingBackend::rejecting();
        assert!(matches!(
            triangle().upload(&backend),
            Err(UploadError::Backend { .. })
        ));
        assert!(backend.create_texture("white", &TextureData::white()).is_err());
    }

    #[test]
    fn textures_get_distinct_handles() {
        let backend = RecordingBackend::new();
        let a = backend.create_texture("a", &TextureData::white()).unwrap();
        let b = backend
            .create_texture("b", &TextureData::checkerboard(8, 2))
            .unwrap();
        assert_ne!(a.handle(), b.handle());
        assert_eq!(b.raw().width, 8);
        assert_eq!(backend.textures_created(), 2);
    }
}
