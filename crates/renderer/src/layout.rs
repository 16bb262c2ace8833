//! wgpu vertex buffer layouts for an interleaved mesh bound to a program.

use asset::{VertexFormat, VertexSemantic};

use crate::shader::ShaderProgram;

#[derive(Clone, Debug, PartialEq)]
pub struct VertexLayout {
    pub array_stride: u64,
    pub attributes: Vec<wgpu::VertexAttribute>,
    /// Semantics the program reads that the mesh format does not provide.
    pub missing: Vec<VertexSemantic>,
}

impl VertexLayout {
    pub fn as_wgpu(&self) -> wgpu::VertexBufferLayout<'_> {
        wgpu::VertexBufferLayout {
            array_stride: self.array_stride,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &self.attributes,
        }
    }
}

fn float_format(components: u32) -> Option<wgpu::VertexFormat> {
    match components {
        1 => Some(wgpu::VertexFormat::Float32),
        2 => Some(wgpu::VertexFormat::Float32x2),
        3 => Some(wgpu::VertexFormat::Float32x3),
        4 => Some(wgpu::VertexFormat::Float32x4),
        _ => None,
    }
}

/// Layout of `format`'s interleaved buffer as seen by `program`. Attributes the
/// program has no input for still take their space in the stride.
pub fn vertex_layout(format: &VertexFormat, program: &ShaderProgram) -> VertexLayout {
    let attributes = format
        .attribs()
        .iter()
        .filter_map(|attrib| {
            let shader_location = program.attribute_location(attrib.semantic)?;
            Some(wgpu::VertexAttribute {
                format: float_format(attrib.components)?,
                offset: attrib.offset as u64,
                shader_location,
            })
        })
        .collect();

    let missing: Vec<_> = program
        .attribute_semantics()
        .filter(|s| !format.contains(*s))
        .collect();
    if !missing.is_empty() {
        log::warn!(
            "program '{}' reads {:?}, which the mesh format lacks",
            program.label(),
            missing
        );
    }

    VertexLayout {
        array_stride: format.stride() as u64,
        attributes,
        missing,
    }
}
