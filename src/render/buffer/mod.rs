//! GPU buffer service
//!
//! Segments never talk to a graphics API directly. They go through a
//! [`BufferService`], which hands out opaque handles for uploaded arrays.

pub mod headless;
pub mod wgpu_buffers;

pub use headless::HeadlessBuffers;
pub use wgpu_buffers::WgpuBufferService;

use crate::core::types::Result;

/// Opaque id of an uploaded buffer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferHandle(pub u64);

/// What the buffer is bound as
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferTarget {
    /// Per-vertex attribute data
    Array,
    /// Triangle indices
    ElementArray,
}

/// An uploaded buffer and its layout
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GpuBuffer {
    pub handle: BufferHandle,
    pub target: BufferTarget,
    /// Components per item (3 for positions, 2 for texture coordinates, 1 for indices)
    pub item_size: u32,
    pub item_count: u32,
}

/// Buffer creation and deletion on the graphics context
pub trait BufferService {
    /// Upload vertex attribute data; `data.len()` must equal `item_size × item_count`
    fn create_array_buffer(&mut self, data: &[f32], item_size: u32, item_count: u32) -> Result<GpuBuffer>;

    /// Upload index data; `indices.len()` must equal `item_size × item_count`
    fn create_element_array_buffer(&mut self, indices: &[u32], item_size: u32, item_count: u32) -> Result<GpuBuffer>;

    /// Release a buffer. Unknown or already released handles are ignored.
    fn delete_buffer(&mut self, handle: BufferHandle);
}

/// Length check shared by the implementations
pub(crate) fn check_layout(len: usize, item_size: u32, item_count: u32) -> Result<()> {
    let expected = item_size as usize * item_count as usize;
    if len != expected {
        return Err(crate::core::error::Error::Gpu(format!(
            "buffer data has {len} components, layout {item_size}x{item_count} needs {expected}"
        )));
    }
    Ok(())
}
