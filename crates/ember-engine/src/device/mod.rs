//! GPU device management.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue
//! - exposing the device/queue pair to buffer backends
//!
//! Surfaces and presentation belong to the host application.

mod gpu;
mod init;

pub use gpu::Gpu;
pub use init::GpuInit;
