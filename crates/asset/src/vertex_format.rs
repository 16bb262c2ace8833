//! Interleaved vertex layouts.
//!
//! A format is an ordered list of (semantic, component count) pairs. Every component
//! is an `f32`; the order of [`VertexFormat::add_attrib`] calls is the order the
//! attributes appear inside one vertex.

use crate::error::FormatError;

const FLOAT_SIZE: u32 = std::mem::size_of::<f32>() as u32;

/// Role of a vertex attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VertexSemantic {
    Position,
    Normal,
    Uv0,
}

impl VertexSemantic {
    pub fn name(self) -> &'static str {
        match self {
            VertexSemantic::Position => "POSITION",
            VertexSemantic::Normal => "NORMAL",
            VertexSemantic::Uv0 => "UV0",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VertexAttrib {
    pub semantic: VertexSemantic,
    pub components: u32,
    /// Byte offset inside one interleaved vertex.
    pub offset: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VertexFormat {
    attribs: Vec<VertexAttrib>,
    stride: u32,
}

impl VertexFormat {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an attribute after the ones already present.
    pub fn add_attrib(
        &mut self,
        semantic: VertexSemantic,
        components: u32,
    ) -> Result<(), FormatError> {
        if !(1..=4).contains(&components) {
            return Err(FormatError::ComponentCount {
                semantic,
                components,
            });
        }
        if self.contains(semantic) {
            return Err(FormatError::DuplicateSemantic(semantic));
        }
        self.attribs.push(VertexAttrib {
            semantic,
            components,
            offset: self.stride,
        });
        self.stride += components * FLOAT_SIZE;
        Ok(())
    }

    pub fn attribs(&self) -> &[VertexAttrib] {
        &self.attribs
    }

    pub fn attrib(&self, semantic: VertexSemantic) -> Option<&VertexAttrib> {
        self.attribs.iter().find(|a| a.semantic == semantic)
    }

    pub fn contains(&self, semantic: VertexSemantic) -> bool {
        self.attrib(semantic).is_some()
    }

    pub fn components(&self, semantic: VertexSemantic) -> Option<u32> {
        self.attrib(semantic).map(|a| a.components)
    }

    pub fn offset(&self, semantic: VertexSemantic) -> Option<u32> {
        self.attrib(semantic).map(|a| a.offset)
    }

    /// Bytes per interleaved vertex.
    #[inline]
    pub fn stride(&self) -> u32 {
        self.stride
    }

    /// Floats per interleaved vertex.
    #[inline]
    pub fn floats_per_vertex(&self) -> usize {
        (self.stride / FLOAT_SIZE) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_follow_insertion_order() {
        let mut f = VertexFormat::new();
        f.add_attrib(VertexSemantic::Position, 3).unwrap();
        f.add_attrib(VertexSemantic::Normal, 3).unwrap();
        f.add_attrib(VertexSemantic::Uv0, 2).unwrap();

        assert_eq!(f.offset(VertexSemantic::Position), Some(0));
        assert_eq!(f.offset(VertexSemantic::Normal), Some(12));
        assert_eq!(f.offset(VertexSemantic::Uv0), Some(24));
        assert_eq!(f.stride(), 32);
        assert_eq!(f.floats_per_vertex(), 8);
    }

    #[test]
    fn absent_semantic_has_no_offset() {
        let mut f = VertexFormat::new();
        f.add_attrib(VertexSemantic::Position, 3).unwrap();
        assert_eq!(f.offset(VertexSemantic::Uv0), None);
        assert!(!f.contains(VertexSemantic::Normal));
    }

    #[test]
    fn uv_before_normal_changes_layout() {
        let mut f = VertexFormat::new();
        f.add_attrib(VertexSemantic::Position, 3).unwrap();
        f.add_attrib(VertexSemantic::Uv0, 3).unwrap();
        f.add_attrib(VertexSemantic::Normal, 3).unwrap();
        assert_eq!(f.offset(VertexSemantic::Normal), Some(24));
        assert_eq!(f.stride(), 36);
    }

    #[test]
    fn rejects_duplicates_and_bad_component_counts() {
        let mut f = VertexFormat::new();
        f.add_attrib(VertexSemantic::Position, 3).unwrap();
        assert_eq!(
            f.add_attrib(VertexSemantic::Position, 3),
            Err(FormatError::DuplicateSemantic(VertexSemantic::Position))
        );
        assert!(matches!(
            f.add_attrib(VertexSemantic::Normal, 5),
            Err(FormatError::ComponentCount { components: 5, .. })
        ));
        assert!(f.add_attrib(VertexSemantic::Uv0, 0).is_err());
        assert_eq!(f.attribs().len(), 1);
        assert_eq!(f.stride(), 12);
    }
}
