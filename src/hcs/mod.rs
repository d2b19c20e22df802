//! Low-level HCS / HCN API wrappers
//!
//! This module provides safe Rust wrappers around the Windows Host Compute
//! Service and Host Compute Network APIs. Only [`completion`] is portable.

pub mod completion;

#[cfg(windows)]
pub mod compute;
#[cfg(windows)]
pub mod host;
#[cfg(windows)]
pub mod network;
#[cfg(windows)]
pub mod operation;

pub use completion::{completion, CompletionSource, PendingResult};

#[cfg(windows)]
pub use compute::ComputeSystem;
#[cfg(windows)]
pub use host::WindowsHost;
#[cfg(windows)]
pub use operation::Operation;
