//! CPU-side mesh: one flat `f32` array per semantic plus a triangle index list.
//!
//! Attribute arrays may be replaced freely until [`Mesh::upload`], which consumes the
//! mesh and hands back a [`GpuMesh`] holding the backend buffers.

use std::fmt;

use crate::error::{MeshError, UploadError};
use crate::upload::BufferFactory;
use crate::vertex_format::{VertexFormat, VertexSemantic};

/// Data-consistency problem found in a mesh. Reported, never fatal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MeshIssue {
    AttributeLength {
        semantic: VertexSemantic,
        expected: usize,
        actual: usize,
    },
    MissingAttribute(VertexSemantic),
    TriangleListLength(usize),
    IndexOutOfRange {
        position: usize,
        index: u32,
        vertex_count: usize,
    },
}

impl fmt::Display for MeshIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeshIssue::AttributeLength {
                semantic,
                expected,
                actual,
            } => write!(
                f,
                "{} data has {actual} floats, expected {expected}",
                semantic.name()
            ),
            MeshIssue::MissingAttribute(semantic) => {
                write!(f, "{} declared but never assigned", semantic.name())
            }
            MeshIssue::TriangleListLength(len) => {
                write!(f, "triangle list length {len} is not a multiple of 3")
            }
            MeshIssue::IndexOutOfRange {
                position,
                index,
                vertex_count,
            } => write!(
                f,
                "index {index} at {position} is out of range for {vertex_count} vertices"
            ),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
    format: VertexFormat,
    vertex_count: Option<usize>,
    /// Parallel to `format.attribs()`.
    data: Vec<Option<Vec<f32>>>,
    triangles: Vec<u32>,
}

impl Mesh {
    pub fn new(format: VertexFormat) -> Self {
        let data = vec![None; format.attribs().len()];
        Self {
            format,
            vertex_count: None,
            data,
            triangles: Vec::new(),
        }
    }

    pub fn format(&self) -> &VertexFormat {
        &self.format
    }

    /// Vertex count as inferred from the first POSITION assignment.
    pub fn vertex_count(&self) -> usize {
        self.vertex_count.unwrap_or(0)
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len() / 3
    }

    pub fn triangles(&self) -> &[u32] {
        &self.triangles
    }

    pub fn vertex_data(&self, semantic: VertexSemantic) -> Option<&[f32]> {
        let slot = self.slot(semantic)?;
        self.data[slot].as_deref()
    }

    fn slot(&self, semantic: VertexSemantic) -> Option<usize> {
        self.format
            .attribs()
            .iter()
            .position(|a| a.semantic == semantic)
    }

    /// Store the flat array for `semantic`. A length that does not match
    /// `vertex_count * components` is logged and kept as-is.
    pub fn set_vertex_data(
        &mut self,
        semantic: VertexSemantic,
        data: Vec<f32>,
    ) -> Result<(), MeshError> {
        let slot = self
            .slot(semantic)
            .ok_or(MeshError::SemanticNotInFormat(semantic))?;
        let components = self.format.attribs()[slot].components as usize;

        if semantic == VertexSemantic::Position && self.vertex_count.is_none() {
            self.vertex_count = Some(data.len() / components);
        }
        if let Some(count) = self.vertex_count {
            let expected = count * components;
            if data.len() != expected {
                log::warn!(
                    "{}",
                    MeshIssue::AttributeLength {
                        semantic,
                        expected,
                        actual: data.len(),
                    }
                );
            }
        }

        self.data[slot] = Some(data);
        Ok(())
    }

    pub fn set_triangles(&mut self, triangles: Vec<u32>) {
        self.triangles = triangles;
    }

    /// All consistency problems, in format order followed by index problems.
    pub fn validate(&self) -> Vec<MeshIssue> {
        let mut issues = Vec::new();
        let count = self.vertex_count();

        for (attrib, data) in self.format.attribs().iter().zip(&self.data) {
            match data {
                None => issues.push(MeshIssue::MissingAttribute(attrib.semantic)),
                Some(data) => {
                    let expected = count * attrib.components as usize;
                    if data.len() != expected {
                        issues.push(MeshIssue::AttributeLength {
                            semantic: attrib.semantic,
                            expected,
                            actual: data.len(),
                        });
                    }
                }
            }
        }

        if self.triangles.len() % 3 != 0 {
            issues.push(MeshIssue::TriangleListLength(self.triangles.len()));
        }
        for (position, &index) in self.triangles.iter().enumerate() {
            if index as usize >= count {
                issues.push(MeshIssue::IndexOutOfRange {
                    position,
                    index,
                    vertex_count: count,
                });
            }
        }
        issues
    }

    /// Pack every attribute into one buffer, vertex by vertex, in format order.
    /// Under-supplied arrays read as 0.0 past their end.
    pub fn interleave(&self) -> Vec<f32> {
        let count = self.vertex_count();
        let mut out = Vec::with_capacity(count * self.format.floats_per_vertex());
        for v in 0..count {
            for (attrib, data) in self.format.attribs().iter().zip(&self.data) {
                let n = attrib.components as usize;
                let src = data.as_deref().unwrap_or(&[]);
                out.extend((0..n).map(|c| src.get(v * n + c).copied().unwrap_or(0.0)));
            }
        }
        out
    }

    /// Hand the interleaved vertex buffer and the index buffer to the backend.
    pub fn upload<F: BufferFactory>(self, factory: &F) -> Result<GpuMesh<F::Buffer>, UploadError> {
        for issue in self.validate() {
            log::warn!("mesh upload: {issue}");
        }

        let vertex_count = self.vertex_count();
        let vertex_count_u32 =
            u32::try_from(vertex_count).map_err(|_| UploadError::TooManyVertices(vertex_count))?;

        let vertices = self.interleave();
        let vertex_buffer =
            factory.create_vertex_buffer("mesh vertices", bytemuck::cast_slice(&vertices))?;
        let index_buffer =
            factory.create_index_buffer("mesh indices", bytemuck::cast_slice(&self.triangles))?;

        log::debug!(
            "uploaded mesh: {} vertices, {} triangles, stride {}",
            vertex_count,
            self.triangle_count(),
            self.format.stride()
        );

        Ok(GpuMesh {
            format: self.format,
            vertex_count: vertex_count_u32,
            index_count: self.triangles.len() as u32,
            vertex_buffer,
            index_buffer,
        })
    }
}

/// Uploaded mesh. Buffers are read-only from here on.
#[derive(Debug)]
pub struct GpuMesh<B> {
    format: VertexFormat,
    vertex_count: u32,
    index_count: u32,
    vertex_buffer: B,
    index_buffer: B,
}

impl<B> GpuMesh<B> {
    pub fn format(&self) -> &VertexFormat {
        &self.format
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub fn triangle_count(&self) -> u32 {
        self.index_count / 3
    }

    pub fn vertex_buffer(&self) -> &B {
        &self.vertex_buffer
    }

    pub fn index_buffer(&self) -> &B {
        &self.index_buffer
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    fn pos_normal_format() -> VertexFormat {
        let mut f = VertexFormat::new();
        f.add_attrib(VertexSemantic::Position, 3).unwrap();
        f.add_attrib(VertexSemantic::Normal, 3).unwrap();
        f
    }

    /// Keeps the bytes it was given so tests can inspect them.
    #[derive(Default)]
    struct CapturingFactory {
        labels: RefCell<Vec<String>>,
    }

    impl BufferFactory for CapturingFactory {
        type Buffer = Vec<u8>;

        fn create_vertex_buffer(&self, label: &str, contents: &[u8]) -> Result<Vec<u8>, UploadError> {
            self.labels.borrow_mut().push(label.to_string());
            Ok(contents.to_vec())
        }

        fn create_index_buffer(&self, label: &str, contents: &[u8]) -> Result<Vec<u8>, UploadError> {
            self.labels.borrow_mut().push(label.to_string());
            Ok(contents.to_vec())
        }
    }

    #[test]
    fn vertex_count_comes_from_positions() {
        let mut mesh = Mesh::new(pos_normal_format());
        mesh.set_vertex_data(VertexSemantic::Position, vec![0.0; 9]).unwrap();
        assert_eq!(mesh.vertex_count(), 3);

        // Replacing positions later does not re-infer the count.
        mesh.set_vertex_data(VertexSemantic::Position, vec![0.0; 12]).unwrap();
        assert_eq!(mesh.vertex_count(), 3);
    }

    #[test]
    fn unknown_semantic_is_rejected() {
        let mut mesh = Mesh::new(pos_normal_format());
        assert_eq!(
            mesh.set_vertex_data(VertexSemantic::Uv0, vec![0.0; 2]),
            Err(MeshError::SemanticNotInFormat(VertexSemantic::Uv0))
        );
    }

    #[test]
    fn short_normals_are_kept_and_reported() {
        let mut mesh = Mesh::new(pos_normal_format());
        mesh.set_vertex_data(VertexSemantic::Position, vec![0.0; 9]).unwrap();
        mesh.set_vertex_data(VertexSemantic::Normal, vec![1.0; 3]).unwrap();
        mesh.set_triangles(vec![0, 1, 2]);

        assert_eq!(mesh.vertex_data(VertexSemantic::Normal).unwrap().len(), 3);
        assert_eq!(
            mesh.validate(),
            vec![MeshIssue::AttributeLength {
                semantic: VertexSemantic::Normal,
                expected: 9,
                actual: 3,
            }]
        );
    }

    #[test]
    fn validate_flags_bad_indices() {
        let mut f = VertexFormat::new();
        f.add_attrib(VertexSemantic::Position, 3).unwrap();
        let mut mesh = Mesh::new(f);
        mesh.set_vertex_data(VertexSemantic::Position, vec![0.0; 6]).unwrap();
        mesh.set_triangles(vec![0, 1, 5, 1]);
        let issues = mesh.validate();
        assert!(issues.contains(&MeshIssue::TriangleListLength(4)));
        assert!(issues.contains(&MeshIssue::IndexOutOfRange {
            position: 2,
            index: 5,
            vertex_count: 2,
        }));
    }

    #[test]
    fn interleave_follows_format_order() {
        let mut mesh = Mesh::new(pos_normal_format());
        mesh.set_vertex_data(VertexSemantic::Position, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0])
            .unwrap();
        mesh.set_vertex_data(VertexSemantic::Normal, vec![0.0, 0.0, 1.0]).unwrap();
        assert_eq!(
            mesh.interleave(),
            vec![
                1.0, 2.0, 3.0, 0.0, 0.0, 1.0, //
                4.0, 5.0, 6.0, 0.0, 0.0, 0.0,
            ]
        );
    }

    #[test]
    fn upload_hands_over_interleaved_bytes() {
        let mut mesh = Mesh::new(pos_normal_format());
        mesh.set_vertex_data(VertexSemantic::Position, vec![0.0; 9]).unwrap();
        mesh.set_vertex_data(VertexSemantic::Normal, vec![0.0; 9]).unwrap();
        mesh.set_triangles(vec![0, 1, 2]);

        let factory = CapturingFactory::default();
        let gpu = mesh.upload(&factory).expect("upload");
        assert_eq!(gpu.vertex_count(), 3);
        assert_eq!(gpu.triangle_count(), 1);
        assert_eq!(gpu.vertex_buffer().len(), 3 * 24);
        assert_eq!(gpu.index_buffer().len(), 3 * 4);
        assert_eq!(gpu.format().stride(), 24);
        assert_eq!(factory.labels.borrow().len(), 2);
    }

    #[test]
    fn empty_mesh_uploads_empty_buffers() {
        let mut f = VertexFormat::new();
        f.add_attrib(VertexSemantic::Position, 3).unwrap();
        let mut mesh = Mesh::new(f);
        mesh.set_vertex_data(VertexSemantic::Position, Vec::new()).unwrap();
        let gpu = mesh.upload(&CapturingFactory::default()).expect("upload");
        assert_eq!(gpu.vertex_count(), 0);
        assert!(gpu.vertex_buffer().is_empty());
        assert!(gpu.index_buffer().is_empty());
    }
}
