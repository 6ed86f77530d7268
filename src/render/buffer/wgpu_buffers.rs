//! Buffer service backed by a wgpu device

use std::collections::HashMap;

use crate::core::error::Error;
use crate::core::types::Result;
use crate::render::draw::DrawCall;

use super::{check_layout, BufferHandle, BufferService, BufferTarget, GpuBuffer};

/// [`BufferService`] that uploads into wgpu vertex and index buffers
pub struct WgpuBufferService {
    device: wgpu::Device,
    queue: wgpu::Queue,
    buffers: HashMap<BufferHandle, (GpuBuffer, wgpu::Buffer)>,
    next_id: u64,
}

impl WgpuBufferService {
    /// Wrap an existing device and queue
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self {
            device,
            queue,
            buffers: HashMap::new(),
            next_id: 0,
        }
    }

    /// Open a device without a surface (offscreen tools, tests)
    pub async fn request_headless() -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| Error::Gpu(format!("No suitable adapter found: {:?}", e)))?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("globe_terrain_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::Performance,
                experimental_features: Default::default(),
                trace: Default::default(),
            })
            .await
            .map_err(|e| Error::Gpu(e.to_string()))?;

        log::info!("Opened headless wgpu device on {:?}", adapter.get_info().backend);
        Ok(Self::new(device, queue))
    }

    fn upload(&mut self, label: &str, bytes: &[u8], usage: wgpu::BufferUsages, layout: GpuBuffer) -> GpuBuffer {
        // Zero-sized buffers are not bindable; keep one aligned word minimum
        let size = (bytes.len() as u64).max(wgpu::COPY_BUFFER_ALIGNMENT);
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: usage | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        if !bytes.is_empty() {
            self.queue.write_buffer(&buffer, 0, bytes);
        }
        self.buffers.insert(layout.handle, (layout, buffer));
        layout
    }

    fn next_layout(&mut self, target: BufferTarget, item_size: u32, item_count: u32) -> GpuBuffer {
        self.next_id += 1;
        GpuBuffer {
            handle: BufferHandle(self.next_id),
            target,
            item_size,
            item_count,
        }
    }

    /// Look up the wgpu buffer behind a handle
    pub fn buffer(&self, handle: BufferHandle) -> Option<&wgpu::Buffer> {
        self.buffers.get(&handle).map(|(_, buffer)| buffer)
    }

    pub fn live_count(&self) -> usize {
        self.buffers.len()
    }

    /// Replay recorded segment draws into a render pass
    ///
    /// Binds positions at slot 0 and texture coordinates (when recorded) at
    /// slot 1. Pipelines and material bind groups are set by the caller.
    pub fn encode_draws(&self, pass: &mut wgpu::RenderPass<'_>, calls: &[DrawCall]) -> Result<()> {
        for call in calls {
            let positions = call.positions.ok_or_else(|| Error::Gpu("draw without positions".into()))?;
            let positions = self.buffer(positions).ok_or(Error::UnknownBuffer(positions))?;
            pass.set_vertex_buffer(0, positions.slice(..));

            if let Some(texcoords) = call.texcoords {
                let texcoords = self.buffer(texcoords).ok_or(Error::UnknownBuffer(texcoords))?;
                pass.set_vertex_buffer(1, texcoords.slice(..));
            }

            let indices = self.buffer(call.indices).ok_or(Error::UnknownBuffer(call.indices))?;
            pass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..call.index_count, 0, 0..1);
        }
        Ok(())
    }
}

impl BufferService for WgpuBufferService {
    fn create_array_buffer(&mut self, data: &[f32], item_size: u32, item_count: u32) -> Result<GpuBuffer> {
        check_layout(data.len(), item_size, item_count)?;
        let layout = self.next_layout(BufferTarget::Array, item_size, item_count);
        Ok(self.upload(
            "segment_vertex_buffer",
            bytemuck::cast_slice(data),
            wgpu::BufferUsages::VERTEX,
            layout,
        ))
    }

    fn create_element_array_buffer(&mut self, indices: &[u32], item_size: u32, item_count: u32) -> Result<GpuBuffer> {
        check_layout(indices.len(), item_size, item_count)?;
        let layout = self.next_layout(BufferTarget::ElementArray, item_size, item_count);
        Ok(self.upload(
            "segment_index_buffer",
            bytemuck::cast_slice(indices),
            wgpu::BufferUsages::INDEX,
            layout,
        ))
    }

    fn delete_buffer(&mut self, handle: BufferHandle) {
        if let Some((_, buffer)) = self.buffers.remove(&handle) {
            buffer.destroy();
        }
    }
}
