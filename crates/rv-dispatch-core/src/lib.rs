//! Instruction-execution dispatch core for a functional RISC-V simulator.
//!
//! This crate is the Fetch -> Translate -> `ExecutionPage` -> `InstExecute`
//! -> Execute -> Fetch dispatch graph, with no scheduler, no ISA semantics,
//! no decoder, and no memory system of its own — all of those are supplied
//! by a [`hart::Hart`] implementation. [`dispatcher::Dispatcher`] wires the
//! graph together and is the crate's entry point; start with
//! [`dispatcher::Dispatcher::new`] and either call
//! [`dispatcher::Dispatcher::run_one_instruction`] in a loop, or drive
//! [`dispatcher::Dispatcher::step_group`] directly for finer-grained
//! control.
//!
//! Per-page decoded-instruction caching (the `ExecutionPage`/`InstExecute`
//! two-level sparse map) means re-executing the same address — a loop body,
//! a hot function — skips straight past translation and decode on every
//! visit after the first.

pub mod action;
pub mod addr;
pub mod dispatcher;
pub mod error;
mod execute;
pub mod execution_page;
pub mod fetch;
pub mod hart;
mod inst_execute;
pub mod inst_translate;
pub mod opcode;
pub mod sim_state;
pub mod tags;
pub mod translate;

#[cfg(any(test, feature = "test-utils"))]
pub mod testsupport;

pub use action::{Action, ActionGroup, ActionOutcome, GroupRef};
pub use addr::{Addr, AddrRange, PageSize};
pub use dispatcher::Dispatcher;
pub use error::{CoreError, MemoryFault};
pub use hart::{Hart, Inst, PrivMode};
pub use opcode::{Opcode, OpcodeSize};
pub use sim_state::SimState;
pub use tags::ActionTag;
pub use translate::{TranslationRequest, TranslationResult, TranslationState};
