//! Per-context cache of grid-size keyed tables
//!
//! Texture coordinates and the uniform index buffer depend only on the grid
//! size, so every segment at that size shares them. The registry lives as long
//! as the graphics context and frees its buffers in [`GridRegistry::release`].

use std::collections::HashMap;
use std::sync::Arc;

use crate::core::types::Result;

use super::buffer::BufferService;
use super::indices::uniform_indexes;
use super::mesh::IndexBuffer;

#[derive(Debug, Default)]
pub struct GridRegistry {
    texcoords: HashMap<u32, Arc<[f32]>>,
    shared_indices: HashMap<u32, IndexBuffer>,
}

impl GridRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(u, v)` per lattice vertex: `u = col / n`, `v = row / n`
    pub fn texcoords(&mut self, grid_size: u32) -> Arc<[f32]> {
        self.texcoords
            .entry(grid_size)
            .or_insert_with(|| build_texcoords(grid_size))
            .clone()
    }

    /// Uniform index buffer for `grid_size`, uploaded on first use
    pub fn shared_index_buffer(&mut self, gpu: &mut dyn BufferService, grid_size: u32) -> Result<IndexBuffer> {
        if let Some(buffer) = self.shared_indices.get(&grid_size) {
            return Ok(*buffer);
        }

        let buffer = IndexBuffer::create(gpu, &uniform_indexes(grid_size), grid_size)?;
        log::debug!("Uploaded shared index buffer for grid {}", grid_size);
        self.shared_indices.insert(grid_size, buffer);
        Ok(buffer)
    }

    pub fn shared_buffer_count(&self) -> usize {
        self.shared_indices.len()
    }

    /// Free every shared buffer; tables are rebuilt on next use
    pub fn release(&mut self, gpu: &mut dyn BufferService) {
        for (_, buffer) in self.shared_indices.drain() {
            buffer.release(gpu);
        }
        self.texcoords.clear();
    }
}

fn build_texcoords(grid_size: u32) -> Arc<[f32]> {
    let n = grid_size.max(1) as f32;
    let side = grid_size + 1;
    let mut coords = Vec::with_capacity(side as usize * side as usize * 2);
    for r in 0..side {
        for c in 0..side {
            coords.push(c as f32 / n);
            coords.push(r as f32 / n);
        }
    }
    coords.into()
}
