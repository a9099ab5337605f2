//! Power sequencing core for an application processor driven by an
//! embedded controller.
//!
//! The [`Chipset`] state machine walks the AP through G3, S5, S3 and S0,
//! replaying the rail tables in [`sequence`] and confirming every step
//! against the power-good lines read through [`PowerSignals`]. Other tasks
//! talk to it only through a shared [`PowerControl`].
#![no_std]

extern crate alloc;

// This mod MUST go first, so that the others see its macros.
mod fmt;

pub mod board;
pub mod chipset;
pub mod config;
pub mod control;
pub mod deferred;
pub mod error;
pub mod hooks;
pub mod rails;
pub mod sequence;
pub mod signals;
pub mod state;

pub use board::{Board, Charger, Platform};
pub use chipset::{BootInfo, Chipset};
pub use config::{PowerSeqVersion, SequencingConfig};
pub use control::PowerControl;
pub use deferred::DeferredCall;
pub use error::Error;
pub use hooks::{HookEvent, HookHandler, Hooks};
pub use rails::{Rail, RailDriver};
pub use sequence::{RunOutcome, SequenceOp, SequenceTables};
pub use signals::{PowerSignals, SignalMask};
pub use state::{ChipsetStateMask, PowerState, StateClass};
