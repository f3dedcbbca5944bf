#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![cfg_attr(feature = "fail-on-warnings", deny(clippy::all))]

//! Core of the frekenbok personal ledger.
//!
//! The chart of accounts is a forest of nested-set trees ([account]), money
//! movements are recorded as signed [entry] rows, and the [balance] module keeps
//! one cached sheaf per (account, currency) in sync with the approved entries.
//! Entries can be grouped into an [invoice] whose per-currency net is expected,
//! but not required, to be zero.

pub mod account;
mod atomic_operation;
pub mod balance;
pub mod entry;
pub mod invoice;
mod ledger;
pub mod migrate;

pub use atomic_operation::*;
pub use ledger::*;

pub mod primitives {
    pub use frekenbok_types::primitives::*;
}

pub use primitives::*;
