//! Peripheral discovery
//!
//! [`DiscoveryController`] keeps the device registry in step with what the
//! transport sees. [`introspect`] is the one-shot alternative run mode that
//! inspects the first matching peripheral instead.

pub mod controller;
pub mod introspect;

pub use controller::{DiscoveryController, DiscoveryHandle, PeripheralState};
pub use introspect::introspect;
