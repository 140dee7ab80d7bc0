mod batch;
mod device;
mod quad;
mod wgpu_backend;

pub use batch::{BatchStats, QuadBatch};
pub use device::{DrawRun, GraphicsDevice, RecordedRun, RecordingDevice};
pub use quad::{Quad, QuadVertex, TextureHandle, TextureInfo, VERTICES_PER_QUAD};
pub use wgpu_backend::WgpuDevice;
