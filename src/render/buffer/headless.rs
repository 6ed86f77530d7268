//! CPU-side buffer service
//!
//! Keeps uploaded arrays in memory. Used when no GPU device is available and
//! by tests that need to inspect what a segment uploaded.

use std::collections::HashMap;

use crate::core::types::Result;

use super::{check_layout, BufferHandle, BufferService, BufferTarget, GpuBuffer};

#[derive(Clone, Debug)]
enum BufferData {
    F32(Vec<f32>),
    U32(Vec<u32>),
}

/// In-memory [`BufferService`]
#[derive(Debug, Default)]
pub struct HeadlessBuffers {
    buffers: HashMap<BufferHandle, (GpuBuffer, BufferData)>,
    next_id: u64,
    created: u64,
    deleted: u64,
}

impl HeadlessBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, target: BufferTarget, item_size: u32, item_count: u32, data: BufferData) -> GpuBuffer {
        self.next_id += 1;
        let buffer = GpuBuffer {
            handle: BufferHandle(self.next_id),
            target,
            item_size,
            item_count,
        };
        self.buffers.insert(buffer.handle, (buffer, data));
        self.created += 1;
        buffer
    }

    /// Number of buffers currently alive
    pub fn live_count(&self) -> usize {
        self.buffers.len()
    }

    /// Total buffers ever created
    pub fn created_count(&self) -> u64 {
        self.created
    }

    /// Total buffers released
    pub fn deleted_count(&self) -> u64 {
        self.deleted
    }

    pub fn is_live(&self, handle: BufferHandle) -> bool {
        self.buffers.contains_key(&handle)
    }

    /// Contents of a live array buffer
    pub fn array_data(&self, handle: BufferHandle) -> Option<&[f32]> {
        match self.buffers.get(&handle) {
            Some((_, BufferData::F32(data))) => Some(data),
            _ => None,
        }
    }

    /// Contents of a live element array buffer
    pub fn element_data(&self, handle: BufferHandle) -> Option<&[u32]> {
        match self.buffers.get(&handle) {
            Some((_, BufferData::U32(data))) => Some(data),
            _ => None,
        }
    }
}

impl BufferService for HeadlessBuffers {
    fn create_array_buffer(&mut self, data: &[f32], item_size: u32, item_count: u32) -> Result<GpuBuffer> {
        check_layout(data.len(), item_size, item_count)?;
        Ok(self.insert(BufferTarget::Array, item_size, item_count, BufferData::F32(data.to_vec())))
    }

    fn create_element_array_buffer(&mut self, indices: &[u32], item_size: u32, item_count: u32) -> Result<GpuBuffer> {
        check_layout(indices.len(), item_size, item_count)?;
        Ok(self.insert(BufferTarget::ElementArray, item_size, item_count, BufferData::U32(indices.to_vec())))
    }

    fn delete_buffer(&mut self, handle: BufferHandle) {
        if self.buffers.remove(&handle).is_some() {
            self.deleted += 1;
        }
    }
}
