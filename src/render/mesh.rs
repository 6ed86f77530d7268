//! Uploaded segment geometry
//!
//! Positions, texture coordinates and index buffers each remember the grid
//! size they were built for, so a draw can reject a stale combination instead
//! of reading past the end of a buffer.

use crate::core::error::Error;
use crate::core::types::{DVec3, Result};
use crate::terrain::lattice::{flatten_positions, vertex_count};

use super::buffer::{BufferService, GpuBuffer};
use super::registry::GridRegistry;

/// Position and texture-coordinate buffers for one lattice
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GpuMesh {
    pub grid_size: u32,
    pub positions: GpuBuffer,
    pub texcoords: GpuBuffer,
}

impl GpuMesh {
    /// Upload `vertices` as a `grid_size` lattice
    pub fn create(
        gpu: &mut dyn BufferService,
        registry: &mut GridRegistry,
        vertices: &[DVec3],
        grid_size: u32,
    ) -> Result<Self> {
        let count = vertex_count(grid_size);
        if vertices.len() != count {
            return Err(Error::Terrain(format!(
                "{} vertices cannot form a grid of {}",
                vertices.len(),
                grid_size
            )));
        }

        let texcoords = registry.texcoords(grid_size);
        let texcoords = gpu.create_array_buffer(&texcoords, 2, count as u32)?;
        let positions = match gpu.create_array_buffer(&flatten_positions(vertices), 3, count as u32) {
            Ok(buffer) => buffer,
            Err(e) => {
                gpu.delete_buffer(texcoords.handle);
                return Err(e);
            }
        };

        Ok(Self {
            grid_size,
            positions,
            texcoords,
        })
    }

    /// Free both buffers
    pub fn release(self, gpu: &mut dyn BufferService) {
        gpu.delete_buffer(self.positions.handle);
        gpu.delete_buffer(self.texcoords.handle);
    }
}

/// Triangle index buffer for a lattice of `grid_size`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexBuffer {
    pub grid_size: u32,
    pub buffer: GpuBuffer,
}

impl IndexBuffer {
    pub fn create(gpu: &mut dyn BufferService, indices: &[u32], grid_size: u32) -> Result<Self> {
        let buffer = gpu.create_element_array_buffer(indices, 1, indices.len() as u32)?;
        Ok(Self { grid_size, buffer })
    }

    pub fn index_count(&self) -> u32 {
        self.buffer.item_count
    }

    /// Fails unless these indices address `mesh`
    pub fn check_matches(&self, mesh: &GpuMesh) -> Result<()> {
        if self.grid_size != mesh.grid_size {
            return Err(Error::MeshMismatch {
                mesh: mesh.grid_size,
                indices: self.grid_size,
            });
        }
        Ok(())
    }

    pub fn release(self, gpu: &mut dyn BufferService) {
        gpu.delete_buffer(self.buffer.handle);
    }
}
