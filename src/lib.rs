#![warn(clippy::all, rust_2018_idioms)]

//! Exports host-callable functions from a compiled module and keeps the
//! module resident so they stay callable.

pub mod config;
pub mod error;
pub mod handlers;
pub mod registrar;
pub mod registry;
pub mod residency;
pub mod value;
#[cfg(target_arch = "wasm32")]
mod web;

pub use config::{BridgeConfig, ErrorMode};
pub use error::BridgeError;
pub use registrar::{HostNamespace, LocalNamespace, Registrar};
pub use registry::{Binding, Registry};
pub use residency::{ResidencyGuard, ResidencyState, ShutdownHandle, ShutdownSignal};
pub use value::{HostValue, ValueKind};
