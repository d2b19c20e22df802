//! WSL switch attachment
//!
//! Attaches an existing Hyper-V virtual switch to the running WSL2 virtual
//! machine through the Host Compute Service (HCS) and Host Compute Network
//! (HCN) APIs, by creating a bridge endpoint on the switch and adding it to
//! the VM as a network adapter.
//!
//! The run is idempotent: the endpoint id is derived from the network id, so
//! a repeated run against the same VM finds its own endpoint and does
//! nothing.
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(windows)]
//! # fn main() -> wsl_attach_switch::Result<()> {
//! use wsl_attach_switch::{AttachRequest, Attacher};
//! use wsl_attach_switch::hcs::WindowsHost;
//!
//! let host = WindowsHost::new();
//! let request = AttachRequest::builder().network("Ethernet").build()?;
//! let outcome = Attacher::new(&host).attach(&request)?;
//! println!("endpoint {}", outcome.endpoint_id());
//! # Ok(())
//! # }
//! # #[cfg(not(windows))]
//! # fn main() {}
//! ```

pub mod attach;
pub mod config;
pub mod endpoint_id;
pub mod error;
pub mod hcs;
pub mod host;
pub mod params;
pub mod properties;

pub use attach::{AttachOutcome, Attacher, WSL_OWNER};
pub use config::{AttachRequest, MacAddress, NetworkRef, VlanId};
pub use endpoint_id::derive_endpoint_id;
pub use error::{Error, Result};
pub use host::{HostControl, RawHandle, ResourceKind};
pub use params::{ParamStore, Params};
