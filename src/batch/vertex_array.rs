use wgpu::{VertexAttribute, VertexBufferLayout, VertexFormat, VertexStepMode};

use crate::constants::MAX_BATCH_SIZE;
use crate::geom::{Matrix, Rectangle};
use crate::nodes::pack_uv as pack;

/// Interleaved vertex record: buffer-space position, packed UV, alpha.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct BatchVertex {
    pub position: [f32; 2],
    /// `v` in the high 16 bits, `u` in the low 16 bits.
    pub uv: u32,
    pub alpha: f32,
}

impl BatchVertex {
    pub fn desc() -> VertexBufferLayout<'static> {
        VertexBufferLayout {
            array_stride: std::mem::size_of::<BatchVertex>() as u64,
            step_mode: VertexStepMode::Vertex,
            attributes: &[
                // position
                VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: VertexFormat::Float32x2,
                },
                // packed uv
                VertexAttribute {
                    offset: 8,
                    shader_location: 1,
                    format: VertexFormat::Uint32,
                },
                // alpha
                VertexAttribute {
                    offset: 12,
                    shader_location: 2,
                    format: VertexFormat::Float32,
                },
            ],
        }
    }
}

/// Fixed-capacity vertex and index storage for one batch.
///
/// Quads use a precomputed index pattern. The first mesh in a batch
/// switches to a second index array that mesh indices are copied into.
#[derive(Debug)]
pub struct VertexArray {
    size: usize,
    vertex_max: usize,
    indices_max: usize,
    vertices: Vec<BatchVertex>,
    indices: Vec<u16>,
    mesh_indices: Vec<u16>,
    vertex_index: usize,
    index_index: usize,
    has_mesh: bool,
}

impl VertexArray {
    /// Capacity is given in quads and clamped so indices fit in 16 bits.
    pub fn new(batch_size: usize) -> Self {
        let mut array = Self {
            size: 0,
            vertex_max: 0,
            indices_max: 0,
            vertices: Vec::new(),
            indices: Vec::new(),
            mesh_indices: Vec::new(),
            vertex_index: 0,
            index_index: 0,
            has_mesh: false,
        };
        array.set_batch_size(batch_size);
        array
    }

    /// Reallocate for a new capacity. Pending data is discarded. Returns
    /// whether anything was reallocated.
    pub fn set_batch_size(&mut self, size: usize) -> bool {
        let size = size.clamp(1, MAX_BATCH_SIZE);
        if self.size == size {
            return false;
        }
        self.size = size;
        self.vertex_max = size * 4;
        self.indices_max = size * 6;
        self.vertices = vec![BatchVertex::default(); self.vertex_max];
        self.mesh_indices = vec![0; self.indices_max];
        self.indices = (0..size as u16)
            .flat_map(|quad| {
                let j = quad * 4;
                [j, j + 1, j + 2, j, j + 2, j + 3]
            })
            .collect();
        self.clear();
        true
    }

    pub fn batch_size(&self) -> usize {
        self.size
    }

    pub fn vertex_capacity(&self) -> usize {
        self.vertex_max
    }

    pub fn index_capacity(&self) -> usize {
        self.indices_max
    }

    /// Vertices written since the last clear.
    pub fn vertices(&self) -> &[BatchVertex] {
        &self.vertices[..self.vertex_index]
    }

    /// Indices for the vertices written since the last clear.
    pub fn indices(&self) -> &[u16] {
        if self.has_mesh {
            &self.mesh_indices[..self.index_index]
        } else {
            &self.indices[..self.index_index]
        }
    }

    pub fn has_mesh(&self) -> bool {
        self.has_mesh
    }

    pub fn is_empty(&self) -> bool {
        self.vertex_index == 0
    }

    /// Whether `vertex_count` more vertices and `index_count` more indices
    /// would overflow the batch.
    pub fn reach_max_size(&self, vertex_count: usize, index_count: usize) -> bool {
        self.vertex_index + vertex_count > self.vertex_max || self.index_index + index_count > self.indices_max
    }

    /// Switch to the mesh index array, copying the quad indices written so far.
    pub fn change_to_mesh_indices(&mut self) {
        if self.has_mesh {
            return;
        }
        self.mesh_indices[..self.index_index].copy_from_slice(&self.indices[..self.index_index]);
        self.has_mesh = true;
    }

    /// Write one textured quad.
    ///
    /// `source` is in texture pixels, `dest` in the space `matrix` maps to
    /// the buffer. A rotated source is stored turned 90 degrees in the
    /// atlas, so its UVs walk the corners in the other direction.
    #[allow(clippy::too_many_arguments)]
    pub fn cache_quad(
        &mut self,
        matrix: &Matrix,
        alpha: f32,
        source: &Rectangle,
        dest: &Rectangle,
        texture_width: f32,
        texture_height: f32,
        rotated: bool,
    ) {
        let Matrix {
            mut a,
            mut b,
            mut c,
            mut d,
            mut tx,
            mut ty,
        } = *matrix;

        if dest.x != 0.0 || dest.y != 0.0 {
            tx += dest.x * a + dest.y * c;
            ty += dest.x * b + dest.y * d;
        }
        let sx = dest.width / source.width;
        if sx != 1.0 {
            a *= sx;
            b *= sx;
        }
        let sy = dest.height / source.height;
        if sy != 1.0 {
            c *= sy;
            d *= sy;
        }

        let w = source.width;
        let h = source.height;
        let u = source.x / texture_width;
        let v = source.y / texture_height;
        let uvs = if rotated {
            let uw = source.height / texture_width;
            let vh = source.width / texture_height;
            [pack(u + uw, v), pack(u + uw, v + vh), pack(u, v + vh), pack(u, v)]
        } else {
            let uw = source.width / texture_width;
            let vh = source.height / texture_height;
            [pack(u, v), pack(u + uw, v), pack(u + uw, v + vh), pack(u, v + vh)]
        };
        let positions = [
            [tx, ty],
            [a * w + tx, b * w + ty],
            [a * w + c * h + tx, d * h + b * w + ty],
            [c * h + tx, d * h + ty],
        ];

        let base = self.vertex_index;
        for (i, (position, uv)) in positions.into_iter().zip(uvs).enumerate() {
            self.vertices[base + i] = BatchVertex { position, uv, alpha };
        }

        if self.has_mesh {
            let j = base as u16;
            let at = self.index_index;
            self.mesh_indices[at..at + 6].copy_from_slice(&[j, j + 1, j + 2, j, j + 2, j + 3]);
        }
        self.vertex_index += 4;
        self.index_index += 6;
    }

    /// Write a mesh. Every vertex is transformed individually and `uvs`
    /// are normalized over `source`.
    #[allow(clippy::too_many_arguments)]
    pub fn cache_mesh(
        &mut self,
        matrix: &Matrix,
        alpha: f32,
        source: &Rectangle,
        texture_width: f32,
        texture_height: f32,
        vertices: &[f32],
        uvs: &[f32],
        indices: &[u16],
        rotated: bool,
    ) {
        self.change_to_mesh_indices();

        let base = self.vertex_index;
        let count = uvs.len().min(vertices.len()) / 2;
        for i in 0..count {
            let x = vertices[i * 2];
            let y = vertices[i * 2 + 1];
            let u = uvs[i * 2];
            let v = uvs[i * 2 + 1];
            let uv = if rotated {
                pack(
                    (source.x + (1.0 - v) * source.height) / texture_width,
                    (source.y + u * source.width) / texture_height,
                )
            } else {
                pack(
                    (source.x + u * source.width) / texture_width,
                    (source.y + v * source.height) / texture_height,
                )
            };
            self.vertices[base + i] = BatchVertex {
                position: [
                    matrix.a * x + matrix.c * y + matrix.tx,
                    matrix.b * x + matrix.d * y + matrix.ty,
                ],
                uv,
                alpha,
            };
        }

        let at = self.index_index;
        for (slot, index) in self.mesh_indices[at..at + indices.len()].iter_mut().zip(indices) {
            *slot = index + base as u16;
        }
        self.vertex_index += count;
        self.index_index += indices.len();
    }

    pub fn clear(&mut self) {
        self.has_mesh = false;
        self.vertex_index = 0;
        self.index_index = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::unpack_uv;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn test_quad_positions_follow_matrix_and_dest() {
        let mut array = VertexArray::new(4);
        let matrix = Matrix::translation(10.0, 20.0);
        array.cache_quad(
            &matrix,
            0.5,
            &Rectangle::new(0.0, 0.0, 8.0, 8.0),
            &Rectangle::new(2.0, 3.0, 16.0, 4.0),
            8.0,
            8.0,
            false,
        );

        let positions: Vec<[f32; 2]> = array.vertices().iter().map(|v| v.position).collect();
        assert_eq!(positions, vec![[12.0, 23.0], [28.0, 23.0], [28.0, 27.0], [12.0, 27.0]]);
        assert!(array.vertices().iter().all(|v| v.alpha == 0.5));
        assert_eq!(array.indices(), &[0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn test_rotated_uvs_swap_and_turn() {
        let source = Rectangle::new(16.0, 32.0, 32.0, 16.0);
        let dest = Rectangle::new(0.0, 0.0, 32.0, 16.0);

        let mut plain = VertexArray::new(1);
        plain.cache_quad(&Matrix::IDENTITY, 1.0, &source, &dest, 128.0, 128.0, false);
        let mut rotated = VertexArray::new(1);
        rotated.cache_quad(&Matrix::IDENTITY, 1.0, &source, &dest, 128.0, 128.0, true);

        let plain: Vec<(f32, f32)> = plain.vertices().iter().map(|v| unpack_uv(v.uv)).collect();
        let rotated: Vec<(f32, f32)> = rotated.vertices().iter().map(|v| unpack_uv(v.uv)).collect();

        // Unrotated: 32 wide, 16 tall in UV space.
        assert!(approx_eq(plain[1].0 - plain[0].0, 32.0 / 128.0));
        assert!(approx_eq(plain[3].1 - plain[0].1, 16.0 / 128.0));
        // Rotated: the region is 16 wide, 32 tall and starts at the top-right corner.
        assert!(approx_eq(rotated[0].0 - rotated[3].0, 16.0 / 128.0));
        assert!(approx_eq(rotated[2].1 - rotated[3].1, 32.0 / 128.0));
        assert!(approx_eq(rotated[0].1, rotated[3].1));
        assert!(approx_eq(rotated[1].0, rotated[0].0));
    }

    #[test]
    fn test_mesh_switches_index_mode() {
        let mut array = VertexArray::new(8);
        let source = Rectangle::new(0.0, 0.0, 4.0, 4.0);
        array.cache_quad(&Matrix::IDENTITY, 1.0, &source, &source, 4.0, 4.0, false);
        assert!(!array.has_mesh());

        array.cache_mesh(
            &Matrix::IDENTITY,
            1.0,
            &source,
            4.0,
            4.0,
            &[0.0, 0.0, 4.0, 0.0, 0.0, 4.0],
            &[0.0, 0.0, 1.0, 0.0, 0.0, 1.0],
            &[0, 1, 2],
            false,
        );
        assert!(array.has_mesh());
        assert_eq!(array.indices(), &[0, 1, 2, 0, 2, 3, 4, 5, 6]);

        array.cache_quad(&Matrix::IDENTITY, 1.0, &source, &source, 4.0, 4.0, false);
        assert_eq!(&array.indices()[9..], &[7, 8, 9, 7, 9, 10]);
        assert_eq!(array.vertices().len(), 11);

        array.clear();
        assert!(!array.has_mesh());
        assert!(array.is_empty());
    }

    #[test]
    fn test_capacity() {
        let mut array = VertexArray::new(2);
        let r = Rectangle::new(0.0, 0.0, 1.0, 1.0);
        assert!(!array.reach_max_size(4, 6));
        array.cache_quad(&Matrix::IDENTITY, 1.0, &r, &r, 1.0, 1.0, false);
        array.cache_quad(&Matrix::IDENTITY, 1.0, &r, &r, 1.0, 1.0, false);
        assert!(array.reach_max_size(4, 6));
        assert!(!array.reach_max_size(0, 0));

        assert!(array.set_batch_size(3));
        assert!(!array.set_batch_size(3));
        assert!(array.is_empty());
        assert_eq!(array.vertex_capacity(), 12);
        assert_eq!(array.index_capacity(), 18);
    }
}
