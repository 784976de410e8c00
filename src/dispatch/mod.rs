//! # Dispatch Core
//!
//! [`ConsumerInvoker`] runs a single consumer under its execution mode and
//! applies the failure policy; [`DispatchStats`] counts what publishers did.

pub mod invoker;
pub mod stats;

pub use invoker::ConsumerInvoker;
pub use stats::DispatchStats;
