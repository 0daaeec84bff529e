//! OBJ parser for positions, texture coordinates, normals and tri/quad faces.
//!
//! Face corners are deduplicated on the full vertex value, so corners shared
//! between faces collapse into one indexed vertex.

use std::{
    collections::HashMap,
    fs::File,
    io::{self, BufRead, BufReader},
    path::Path,
};

use crate::error::{AssetError, AssetResult};
use crate::mesh::{Geometry, Quad, Triangle, Vertex};

/// Load OBJ geometry from a file path.
pub fn load_obj_from_path(path: impl AsRef<Path>) -> AssetResult<Geometry> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| AssetError::io(path, e))?;
    parse_obj(BufReader::new(file)).map_err(|e| match e {
        // Read failures surface without a path from the reader; attach it.
        AssetError::Io { source, .. } => AssetError::io(path, source),
        other => other,
    })
}

/// Load OBJ geometry from a [`BufRead`] implementation.
pub fn load_obj_from_reader<R: BufRead>(reader: R) -> AssetResult<Geometry> {
    parse_obj(reader)
}

/// Convenience helper to parse an OBJ string literal.
pub fn load_obj_from_str(contents: &str) -> AssetResult<Geometry> {
    parse_obj(io::Cursor::new(contents))
}

fn parse_obj<R: BufRead>(reader: R) -> AssetResult<Geometry> {
    let mut parser = ObjParser::default();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| AssetError::io("<obj stream>", e))?;
        parser.parse_line(&line, line_no)?;
    }
    Ok(parser.finish())
}

/// Per-load parser state. A fresh one is built for every load call.
#[derive(Default)]
struct ObjParser {
    positions: Vec<[f32; 3]>,
    tex_coords: Vec<[f32; 2]>,
    normals: Vec<[f32; 3]>,
    unique: HashMap<Vertex, u32>,
    geometry: Geometry,
}

impl ObjParser {
    fn parse_line(&mut self, line: &str, line_no: usize) -> AssetResult<()> {
        let mut parts = line.split_whitespace();
        let Some(tag) = parts.next() else {
            return Ok(());
        };

        match tag {
            "v" => {
                let x = parse_f32(parts.next(), line_no, "x coordinate")?;
                let y = parse_f32(parts.next(), line_no, "y coordinate")?;
                let z = parse_f32(parts.next(), line_no, "z coordinate")?;
                self.positions.push([x, y, z]);
            }
            "vt" => {
                let u = parse_f32(parts.next(), line_no, "u coordinate")?;
                let v = parse_f32(parts.next(), line_no, "v coordinate")?;
                self.tex_coords.push([u, v]);
            }
            "vn" => {
                let nx = parse_f32(parts.next(), line_no, "nx coordinate")?;
                let ny = parse_f32(parts.next(), line_no, "ny coordinate")?;
                let nz = parse_f32(parts.next(), line_no, "nz coordinate")?;
                self.normals.push([nx, ny, nz]);
            }
            "f" => {
                let tokens: Vec<&str> = parts.collect();
                match tokens.as_slice() {
                    &[a, b, c] => {
                        let indices = [
                            self.resolve_face_token(a, line_no)?,
                            self.resolve_face_token(b, line_no)?,
                            self.resolve_face_token(c, line_no)?,
                        ];
                        self.geometry.triangles.push(Triangle { indices });
                    }
                    &[a, b, c, d] => {
                        let indices = [
                            self.resolve_face_token(a, line_no)?,
                            self.resolve_face_token(b, line_no)?,
                            self.resolve_face_token(c, line_no)?,
                            self.resolve_face_token(d, line_no)?,
                        ];
                        self.geometry.quads.push(Quad { indices });
                    }
                    other => {
                        log::debug!(
                            "Skipping face with {} corners on line {}",
                            other.len(),
                            line_no + 1
                        );
                    }
                }
            }
            _ => {
                // Ignore other directives (#/o/g/s/usemtl/etc.)
            }
        }
        Ok(())
    }

    /// Resolve `pos[/tex[/norm]]` to an index into the deduplicated vertex list.
    fn resolve_face_token(&mut self, token: &str, line_no: usize) -> AssetResult<u32> {
        let mut split = token.split('/');
        let pos = split.next().unwrap_or_default();
        let pos_idx = resolve_index(pos, self.positions.len(), line_no)?;
        let position = self.positions[pos_idx];

        let tex_coord = match split.next() {
            Some(value) if !value.is_empty() => {
                self.tex_coords[resolve_index(value, self.tex_coords.len(), line_no)?]
            }
            _ => [0.0; 2],
        };

        let normal = match split.next() {
            Some(value) if !value.is_empty() => {
                self.normals[resolve_index(value, self.normals.len(), line_no)?]
            }
            _ => [0.0; 3],
        };

        self.insert_vertex(Vertex::new(position, tex_coord, normal), line_no)
    }

    fn insert_vertex(&mut self, vertex: Vertex, line_no: usize) -> AssetResult<u32> {
        if let Some(&idx) = self.unique.get(&vertex) {
            return Ok(idx);
        }
        let idx = u32::try_from(self.geometry.vertices.len())
            .map_err(|_| AssetError::parse(line_no, format!("too many vertices (>{})", u32::MAX)))?;
        self.geometry.vertices.push(vertex);
        self.unique.insert(vertex, idx);
        Ok(idx)
    }

    fn finish(self) -> Geometry {
        self.geometry
    }
}

fn parse_f32(value: Option<&str>, line_no: usize, what: &str) -> AssetResult<f32> {
    let token = value.ok_or_else(|| AssetError::parse(line_no, format!("missing {what}")))?;
    token
        .parse::<f32>()
        .map_err(|e| AssetError::parse(line_no, format!("invalid {what} '{token}': {e}")))
}

/// OBJ indices are 1-based; negative values count back from the current end.
fn resolve_index(token: &str, len: usize, line_no: usize) -> AssetResult<usize> {
    let raw = token
        .parse::<i64>()
        .map_err(|e| AssetError::parse(line_no, format!("invalid index '{token}': {e}")))?;
    if raw == 0 {
        return Err(AssetError::parse(line_no, "OBJ indices are 1-based; found 0"));
    }

    let idx = if raw > 0 { raw - 1 } else { len as i64 + raw };

    if idx < 0 || idx as usize >= len {
        return Err(AssetError::parse(
            line_no,
            format!("index {raw} resolved out of bounds (len={len})"),
        ));
    }

    Ok(idx as usize)
}
