//! Importer for the line-oriented ASCII mesh format (`v`, `vn`, `vt`, `f`).
//!
//! Indices in the document are 1-based and absolute. They are converted to 0-based
//! once, while parsing, and never checked: out-of-range, negative or non-numeric
//! indices flow through unchanged and show up later as mesh validation issues.

use std::collections::HashMap;
use std::fmt;

use crate::error::UploadError;
use crate::mesh::{GpuMesh, Mesh};
use crate::token::{TokenReader, parse_float, parse_int};
use crate::upload::BufferFactory;
use crate::vertex_format::{VertexFormat, VertexSemantic};

/// How texcoord indices in faces are treated when the mesh is assembled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UvIndexing {
    /// Texcoord `i` belongs to vertex `i`; face texcoord indices are parsed and ignored.
    #[default]
    SharedWithPosition,
    /// Every distinct (position, texcoord, normal) corner becomes its own vertex.
    Independent,
}

/// Something odd in the document. The import carries on regardless.
#[derive(Clone, Debug, PartialEq)]
pub enum ImportWarning {
    NormalCountMismatch { normals: usize, vertices: usize },
    TexcoordCountMismatch { texcoords: usize, vertices: usize },
    NormalIndexMismatch {
        face: usize,
        vertex: Option<i64>,
        normal: i64,
    },
    DegenerateFace { face: usize, corners: usize },
}

impl fmt::Display for ImportWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportWarning::NormalCountMismatch { normals, vertices } => {
                write!(f, "normal count {normals} does not match vertex count {vertices}")
            }
            ImportWarning::TexcoordCountMismatch {
                texcoords,
                vertices,
            } => write!(
                f,
                "texcoord count {texcoords} does not match vertex count {vertices}"
            ),
            ImportWarning::NormalIndexMismatch {
                face,
                vertex,
                normal,
            } => write!(
                f,
                "face {face}: normal index {normal} differs from vertex index {vertex:?}"
            ),
            ImportWarning::DegenerateFace { face, corners } => {
                write!(f, "face {face} has only {corners} corners, skipped")
            }
        }
    }
}

/// Result of an import: the mesh plus every warning raised while building it.
#[derive(Debug)]
pub struct ImportOutput {
    pub mesh: Mesh,
    pub warnings: Vec<ImportWarning>,
}

/// One face corner, 0-based. `None` in `vertex` means the index was not a number.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct Corner {
    vertex: Option<i64>,
    texcoord: Option<i64>,
    normal: Option<i64>,
}

#[derive(Clone, Copy, Debug)]
struct Texcoord {
    values: [f32; 3],
    len: usize,
}

/// Split a polygon into triangles sharing its first corner.
/// `k` corners give `k - 2` triangles; fewer than three give none.
pub fn fan_triangulate<T: Copy>(corners: &[T]) -> Vec<[T; 3]> {
    if corners.len() < 3 {
        return Vec::new();
    }
    (1..corners.len() - 1)
        .map(|i| [corners[0], corners[i], corners[i + 1]])
        .collect()
}

/// Mesh text importer. Accumulation state lives on the instance and is cleared at
/// the start and end of every import, so one instance serves many imports but
/// must not be shared between concurrent ones.
#[derive(Debug, Default)]
pub struct ObjImporter {
    uv_indexing: UvIndexing,
    vertices: Vec<[f32; 3]>,
    normals: Vec<[f32; 3]>,
    texcoords: Vec<Texcoord>,
    faces: Vec<Vec<Corner>>,
    warnings: Vec<ImportWarning>,
}

impl ObjImporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_uv_indexing(mut self, uv_indexing: UvIndexing) -> Self {
        self.uv_indexing = uv_indexing;
        self
    }

    pub fn uv_indexing(&self) -> UvIndexing {
        self.uv_indexing
    }

    fn reset(&mut self) {
        self.vertices.clear();
        self.normals.clear();
        self.texcoords.clear();
        self.faces.clear();
        self.warnings.clear();
    }

    /// Parse `text` into a mesh; `scale` multiplies every position component.
    pub fn import(&mut self, text: &str, scale: f32) -> Mesh {
        self.import_detailed(text, scale).mesh
    }

    /// Like [`ObjImporter::import`], also returning the warnings.
    pub fn import_detailed(&mut self, text: &str, scale: f32) -> ImportOutput {
        self.reset();

        let mut reader = TokenReader::default();
        for line in text.lines() {
            reader.reset(line);
            let Some(command) = reader.next_word() else {
                continue;
            };
            match command {
                "v" => {
                    let x = reader.next_float() * scale;
                    let y = reader.next_float() * scale;
                    let z = reader.next_float() * scale;
                    self.vertices.push([x, y, z]);
                }
                "vn" => {
                    let x = reader.next_float();
                    let y = reader.next_float();
                    let z = reader.next_float();
                    self.normals.push([x, y, z]);
                }
                "vt" => {
                    let mut tc = Texcoord {
                        values: [f32::NAN; 3],
                        len: 0,
                    };
                    for word in reader.words().take(3) {
                        tc.values[tc.len] = parse_float(word);
                        tc.len += 1;
                    }
                    self.texcoords.push(tc);
                }
                "f" => {
                    let face = reader.words().map(parse_corner).collect();
                    self.faces.push(face);
                }
                // Comments, material libraries, object and group names.
                _ => {}
            }
        }

        let mesh = match self.uv_indexing {
            UvIndexing::SharedWithPosition => self.assemble_shared(),
            UvIndexing::Independent => self.assemble_independent(),
        };
        for warning in &self.warnings {
            log::warn!("mesh import: {warning}");
        }
        log::info!("vertex count {}", mesh.vertex_count());
        log::info!("triangle count {}", mesh.triangle_count());

        let output = ImportOutput {
            mesh,
            warnings: std::mem::take(&mut self.warnings),
        };
        self.reset();
        output
    }

    /// Import and immediately upload through `factory`.
    pub fn import_and_upload<F: BufferFactory>(
        &mut self,
        text: &str,
        scale: f32,
        factory: &F,
    ) -> Result<GpuMesh<F::Buffer>, UploadError> {
        self.import(text, scale).upload(factory)
    }

    fn format(&self) -> VertexFormat {
        let mut format = VertexFormat::new();
        let mut add = |semantic, components| {
            // A fresh format with distinct semantics and 1..=3 components cannot fail.
            if let Err(e) = format.add_attrib(semantic, components) {
                log::error!("mesh import: {e}");
            }
        };
        add(VertexSemantic::Position, 3);
        if !self.normals.is_empty() {
            add(VertexSemantic::Normal, 3);
        }
        if let Some(first) = self.texcoords.first() {
            add(VertexSemantic::Uv0, first.len.max(1) as u32);
        }
        format
    }

    fn uv_size(&self) -> usize {
        self.texcoords.first().map_or(0, |t| t.len.max(1))
    }

    fn assemble_shared(&mut self) -> Mesh {
        let format = self.format();
        let vertex_count = self.vertices.len();

        if !self.normals.is_empty() && self.normals.len() != vertex_count {
            self.warnings.push(ImportWarning::NormalCountMismatch {
                normals: self.normals.len(),
                vertices: vertex_count,
            });
        }
        if !self.texcoords.is_empty() && self.texcoords.len() != vertex_count {
            self.warnings.push(ImportWarning::TexcoordCountMismatch {
                texcoords: self.texcoords.len(),
                vertices: vertex_count,
            });
        }

        let positions: Vec<f32> = self.vertices.iter().flatten().copied().collect();
        let normals: Vec<f32> = self.normals.iter().flatten().copied().collect();
        let uv_size = self.uv_size();
        let uvs: Vec<f32> = self
            .texcoords
            .iter()
            // Slots past a texcoord's own length are still NaN.
            .flat_map(|t| t.values.into_iter().take(uv_size))
            .collect();

        let mut triangles = Vec::new();
        for (face_index, face) in self.faces.iter().enumerate() {
            if face.len() < 3 {
                self.warnings.push(ImportWarning::DegenerateFace {
                    face: face_index,
                    corners: face.len(),
                });
                continue;
            }
            for corner in face {
                if let Some(normal) = corner.normal {
                    if Some(normal) != corner.vertex {
                        self.warnings.push(ImportWarning::NormalIndexMismatch {
                            face: face_index,
                            vertex: corner.vertex,
                            normal,
                        });
                    }
                }
            }
            for tri in fan_triangulate(face) {
                triangles.extend(tri.iter().map(|c| buffer_index(c.vertex)));
            }
        }

        build_mesh(format, positions, normals, uvs, triangles)
    }

    fn assemble_independent(&mut self) -> Mesh {
        let format = self.format();
        let has_normals = !self.normals.is_empty();
        let uv_size = self.uv_size();

        let mut unique: HashMap<Corner, u32> = HashMap::new();
        let mut positions = Vec::new();
        let mut normals = Vec::new();
        let mut uvs = Vec::new();
        let mut triangles = Vec::new();

        for (face_index, face) in self.faces.iter().enumerate() {
            if face.len() < 3 {
                self.warnings.push(ImportWarning::DegenerateFace {
                    face: face_index,
                    corners: face.len(),
                });
                continue;
            }
            let mut indices = Vec::with_capacity(face.len());
            for corner in face {
                // Corners that omit a stream fall back to the shared convention.
                let key = Corner {
                    vertex: corner.vertex,
                    texcoord: corner.texcoord.or(corner.vertex).filter(|_| uv_size > 0),
                    normal: corner.normal.or(corner.vertex).filter(|_| has_normals),
                };
                let index = *unique.entry(key).or_insert_with(|| {
                    positions.extend(lookup(&self.vertices, key.vertex));
                    if has_normals {
                        normals.extend(lookup(&self.normals, key.normal));
                    }
                    if uv_size > 0 {
                        let tc = key
                            .texcoord
                            .and_then(|i| usize::try_from(i).ok())
                            .and_then(|i| self.texcoords.get(i));
                        uvs.extend((0..uv_size).map(|c| match tc {
                            Some(t) if c < t.len => t.values[c],
                            _ => f32::NAN,
                        }));
                    }
                    (positions.len() / 3 - 1) as u32
                });
                indices.push(index);
            }
            for tri in fan_triangulate(&indices) {
                triangles.extend(tri);
            }
        }

        build_mesh(format, positions, normals, uvs, triangles)
    }
}

fn build_mesh(
    format: VertexFormat,
    positions: Vec<f32>,
    normals: Vec<f32>,
    uvs: Vec<f32>,
    triangles: Vec<u32>,
) -> Mesh {
    let has_normals = format.contains(VertexSemantic::Normal);
    let has_uvs = format.contains(VertexSemantic::Uv0);
    let mut mesh = Mesh::new(format);
    let streams = [
        (VertexSemantic::Position, positions, true),
        (VertexSemantic::Normal, normals, has_normals),
        (VertexSemantic::Uv0, uvs, has_uvs),
    ];
    for (semantic, data, present) in streams {
        if !present {
            continue;
        }
        if let Err(e) = mesh.set_vertex_data(semantic, data) {
            log::error!("mesh import: {e}");
        }
    }
    mesh.set_triangles(triangles);
    mesh
}

/// Corner word `v`, `v/t`, `v//n` or `v/t/n`, converted to 0-based.
fn parse_corner(word: &str) -> Corner {
    let mut parts = word.split('/');
    let index = |part: Option<&str>| part.and_then(parse_int).map(|i| i.wrapping_sub(1));
    let vertex = index(parts.next());
    let texcoord = index(parts.next());
    let normal = index(parts.next());
    Corner {
        vertex,
        texcoord,
        normal,
    }
}

/// Triangle-list value for a parsed index. Non-numeric indices become 0 and
/// negative ones wrap; neither is validated here.
fn buffer_index(index: Option<i64>) -> u32 {
    index.map_or(0, |i| i as u32)
}

fn lookup(items: &[[f32; 3]], index: Option<i64>) -> [f32; 3] {
    index
        .and_then(|i| usize::try_from(i).ok())
        .and_then(|i| items.get(i).copied())
        .unwrap_or([f32::NAN; 3])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::MeshIssue;

    const TRIANGLE: &str = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";

    fn import(src: &str) -> ImportOutput {
        ObjImporter::new().import_detailed(src, 1.0)
    }

    #[test]
    fn fan_gives_k_minus_two_triangles() {
        for k in 3..10usize {
            let corners: Vec<usize> = (0..k).collect();
            let tris = fan_triangulate(&corners);
            assert_eq!(tris.len(), k - 2);
            assert_eq!(tris[0], [0, 1, 2]);
            assert!(tris.iter().all(|t| t[0] == 0));
        }
        assert!(fan_triangulate(&[0, 1]).is_empty());
    }

    #[test]
    fn parse_simple_triangle() {
        let out = import(TRIANGLE);
        let mesh = out.mesh;
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(
            mesh.vertex_data(VertexSemantic::Position).unwrap(),
            &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]
        );
        assert_eq!(mesh.triangles(), &[0, 1, 2]);
        assert_eq!(mesh.format().attribs().len(), 1);
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn quad_is_fan_triangulated() {
        let mesh = ObjImporter::new().import("v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n", 1.0);
        assert_eq!(mesh.triangles(), &[0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn index_count_sums_over_faces() {
        let src = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nv 2 2 2\nv 3 3 3\n\
                   f 1 2 3\nf 1 2 3 4\nf 1 2 3 4 5 6\n";
        let mesh = ObjImporter::new().import(src, 1.0);
        assert_eq!(mesh.triangles().len(), (1 + 2 + 4) * 3);
        assert_eq!(mesh.triangle_count(), 7);
    }

    #[test]
    fn scale_only_touches_positions() {
        let src = "v 1 2 3\nv 4 5 6\nv 7 8 9\nvn 0 0 1\nvn 0 1 0\nvn 1 0 0\nf 1//1 2//2 3//3\n";
        let mut importer = ObjImporter::new();
        let one = importer.import(src, 1.0);
        let two = importer.import(src, 2.0);

        let p1 = one.vertex_data(VertexSemantic::Position).unwrap();
        let p2 = two.vertex_data(VertexSemantic::Position).unwrap();
        for (a, b) in p1.iter().zip(p2) {
            assert_eq!(*b, a * 2.0);
        }
        assert_eq!(
            one.vertex_data(VertexSemantic::Normal),
            two.vertex_data(VertexSemantic::Normal)
        );
    }

    #[test]
    fn ignored_commands_and_blank_lines() {
        let src = "# a comment\nmtllib cube.mtl\no Cube\ng group\n\n   \nusemtl red\ns off\n";
        let mesh = ObjImporter::new().import(&format!("{src}{TRIANGLE}"), 1.0);
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.triangles(), &[0, 1, 2]);
    }

    #[test]
    fn empty_document_gives_empty_mesh() {
        let out = import("");
        assert_eq!(out.mesh.vertex_count(), 0);
        assert_eq!(out.mesh.triangle_count(), 0);
        assert!(out.mesh.format().contains(VertexSemantic::Position));
        assert!(out.mesh.validate().is_empty());
    }

    #[test]
    fn fewer_normals_warns_but_keeps_vertex_count() {
        let out = import("v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0 1\nf 1 2 3\n");
        assert_eq!(out.mesh.vertex_count(), 3);
        assert_eq!(
            out.mesh.vertex_data(VertexSemantic::Normal).unwrap(),
            &[0.0, 0.0, 1.0]
        );
        assert_eq!(
            out.warnings,
            vec![ImportWarning::NormalCountMismatch {
                normals: 1,
                vertices: 3
            }]
        );
    }

    #[test]
    fn mismatched_normal_index_warns_without_correction() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0 1\nvn 0 0 1\nvn 0 0 1\nf 1//2 2//2 3//3\n";
        let out = import(src);
        assert_eq!(out.mesh.triangles(), &[0, 1, 2]);
        assert_eq!(
            out.warnings,
            vec![ImportWarning::NormalIndexMismatch {
                face: 0,
                vertex: Some(0),
                normal: 1
            }]
        );
    }

    #[test]
    fn first_texcoord_fixes_uv_size() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0.5 0.25 1\nvt 1 0\nvt 0 1 0 9\nf 1/1 2/2 3/3\n";
        let mesh = ObjImporter::new().import(src, 1.0);
        assert_eq!(mesh.format().components(VertexSemantic::Uv0), Some(3));
        let uvs = mesh.vertex_data(VertexSemantic::Uv0).unwrap();
        assert_eq!(uvs.len(), 9);
        assert_eq!(&uvs[..3], &[0.5, 0.25, 1.0]);
        assert_eq!(&uvs[3..5], &[1.0, 0.0]);
        assert!(uvs[5].is_nan());
        assert_eq!(&uvs[6..], &[0.0, 1.0, 0.0]);
    }

    #[test]
    fn fewer_texcoords_than_vertices_warns() {
        let out = import("v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0 0\nf 1 2 3\n");
        assert_eq!(
            out.warnings,
            vec![ImportWarning::TexcoordCountMismatch {
                texcoords: 1,
                vertices: 3
            }]
        );
        assert_eq!(out.mesh.vertex_count(), 3);
        assert_eq!(out.mesh.vertex_data(VertexSemantic::Uv0), Some(&[0.0, 0.0][..]));
        assert_eq!(out.mesh.triangles(), &[0, 1, 2]);
    }

    #[test]
    fn malformed_numbers_become_nan() {
        let mesh = ObjImporter::new().import("v 0 zero 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n", 1.0);
        let p = mesh.vertex_data(VertexSemantic::Position).unwrap();
        assert!(p[1].is_nan());
        assert_eq!(mesh.vertex_count(), 3);
    }

    #[test]
    fn bad_indices_are_not_validated_at_parse_time() {
        let out = import("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 9\nf x 2 3\n");
        assert_eq!(out.mesh.triangles(), &[0, 1, 8, 0, 1, 2]);
        assert!(out.mesh.validate().contains(&MeshIssue::IndexOutOfRange {
            position: 2,
            index: 8,
            vertex_count: 3
        }));
    }

    #[test]
    fn extreme_face_index_wraps_instead_of_aborting() {
        let out = import("v 0 0 0\nv 1 0 0\nv 0 1 0\nf -9223372036854775808 2 3\n");
        assert_eq!(out.mesh.vertex_count(), 3);
        assert_eq!(out.mesh.triangles(), &[u32::MAX, 1, 2]);
    }

    #[test]
    fn degenerate_faces_are_skipped() {
        let out = import("v 0 0 0\nv 1 0 0\nf 1 2\n");
        assert!(out.mesh.triangles().is_empty());
        assert_eq!(
            out.warnings,
            vec![ImportWarning::DegenerateFace { face: 0, corners: 2 }]
        );
    }

    #[test]
    fn importer_state_does_not_leak_between_imports() {
        let mut importer = ObjImporter::new();
        importer.import("v 5 5 5\nvn 0 0 1\nvt 0 0\n", 1.0);
        let mesh = importer.import(TRIANGLE, 1.0);
        assert_eq!(mesh.vertex_count(), 3);
        assert!(!mesh.format().contains(VertexSemantic::Normal));
        assert!(!mesh.format().contains(VertexSemantic::Uv0));
    }

    // A cube face whose uv seam needs separate texcoord indices: four positions,
    // texcoords listed in a different order than the positions.
    const SEAM: &str = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\n\
                        vt 0 0\nvt 0 1\nvt 1 1\nvt 1 0\n\
                        f 1/1 2/4 3/3 4/2\n";

    #[test]
    fn shared_uv_indexing_ignores_face_texcoords() {
        let mesh = ObjImporter::new().import(SEAM, 1.0);
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.triangles(), &[0, 1, 2, 0, 2, 3]);
        let uvs = mesh.vertex_data(VertexSemantic::Uv0).unwrap();
        // Vertex 1 takes vt 2, not the vt 4 the face asked for.
        assert_eq!(&uvs[2..4], &[0.0, 1.0]);
    }

    #[test]
    fn independent_uv_indexing_follows_face_texcoords() {
        let mut importer = ObjImporter::new().with_uv_indexing(UvIndexing::Independent);
        let mesh = importer.import(SEAM, 1.0);
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.triangles(), &[0, 1, 2, 0, 2, 3]);
        let uvs = mesh.vertex_data(VertexSemantic::Uv0).unwrap();
        assert_eq!(uvs, &[0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0]);
        assert!(mesh.validate().is_empty());
    }

    #[test]
    fn independent_uv_indexing_splits_seam_vertices() {
        // Position 1 is used with two different texcoords.
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nv 1 1 0\n\
                   vt 0 0\nvt 1 0\nvt 0 1\nvt 1 1\nvt 0.5 0.5\n\
                   f 1/1 2/2 3/3\nf 2/5 4/4 3/3\n";
        let mut importer = ObjImporter::new().with_uv_indexing(UvIndexing::Independent);
        let mesh = importer.import(src, 1.0);
        assert_eq!(mesh.vertex_count(), 5);
        assert_eq!(mesh.triangles(), &[0, 1, 2, 3, 4, 2]);
        let p = mesh.vertex_data(VertexSemantic::Position).unwrap();
        assert_eq!(&p[3..6], &p[9..12]);
    }
}
