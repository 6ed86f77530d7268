//! GPU resources and draw dispatch for terrain segments

pub mod buffer;
pub mod mesh;
pub mod indices;
pub mod registry;
pub mod draw;

pub use buffer::{BufferHandle, BufferService, GpuBuffer, HeadlessBuffers, WgpuBufferService};
pub use mesh::{GpuMesh, IndexBuffer};
pub use indices::{Side, SideSizes};
pub use registry::GridRegistry;
pub use draw::{DrawCall, DrawMode, DrawRecorder, DrawTarget, Frame, ShaderProgram};
