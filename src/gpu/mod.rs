//! GPU resources: device, queue, and a compiled kernel library, shared
//! process-wide (spec §2 "GPU Resources", §5 "Shared resources").

mod resources;
pub(crate) mod shaders;

pub use resources::GpuResources;
