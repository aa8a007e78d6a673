//! The `Hart` trait: the single seam across which every out-of-scope
//! collaborator named in spec §1/§6 (decoder, ISA-semantics execute stage,
//! MMU walk, memory, CSR policy) is injected into the dispatch core.

use crate::addr::Addr;
use crate::error::CoreError;
use crate::opcode::{Opcode, OpcodeSize};
use crate::sim_state::SimState;
use crate::translate::{TranslationRequest, TranslationResult, TranslationState};

/// RISC-V privilege level, needed only for the SATP/TVM pre-check in
/// spec §4.5 step 8.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivMode {
    User,
    Supervisor,
    Machine,
}

/// Opaque decoded-instruction handle (spec §3 "Inst").
pub trait Inst: Clone {
    /// `2` for a compressed instruction, `4` otherwise.
    fn opcode_size(&self) -> OpcodeSize;
    /// Whether this instruction reads or writes a CSR.
    fn has_csr(&self) -> bool;
    /// The CSR identifier, meaningful only when `has_csr()` is true.
    fn csr_id(&self) -> u32;
}

/// RISC-V CSR identifier for `satp`, used by the TVM pre-check (spec §4.5
/// step 8, glossary "SATP / MSTATUS.TVM").
pub const CSR_SATP: u32 = 0x180;

/// Everything the dispatch core needs from the surrounding simulator: a
/// decoder, a memory, an MMU walk, CSR policy, and the ISA-semantics
/// execute stage. One hart owns one `Hart` implementation, one
/// [`SimState`], and one [`TranslationState`] (spec §5).
pub trait Hart {
    type Inst: Inst;

    fn pc(&self) -> Addr;
    fn set_pc(&mut self, pc: Addr);

    fn sim_state(&mut self) -> &mut SimState<Self::Inst>;
    fn fetch_translation(&mut self) -> &mut TranslationState;

    /// The external MMU page walk (spec §4.3, "Translate (interface only)").
    fn translate_page(&mut self, request: TranslationRequest) -> Result<TranslationResult, CoreError>;

    fn read16(&mut self, paddr: Addr) -> Result<u16, CoreError>;
    fn read32(&mut self, paddr: Addr) -> Result<u32, CoreError>;

    /// The external Mavis-style decoder (spec §6, "To the decoder").
    fn decode(&mut self, opcode: Opcode) -> Result<Self::Inst, CoreError>;

    /// `inst.update_vec_config(state)` (spec §4.5 step 7) — vector-CSR
    /// bookkeeping performed by the ISA-semantics layer, opaque here.
    fn update_vec_config(&mut self, inst: &Self::Inst);

    fn privilege(&self) -> PrivMode;
    fn mstatus_tvm(&self) -> bool;

    /// Whether `csr` names a CSR this hart implements (spec §4.5 step 8).
    fn csr_known(&self, csr: u32) -> bool;

    /// Invokes the ISA-semantics action group for `inst` (spec §4.6,
    /// "Execute (interface)"). Opaque register/memory/CSR effects live
    /// entirely on the implementor's side of this call, including
    /// committing `sim_state().next_pc` (or a branch/jump target) to
    /// `set_pc` — the dispatch core never advances `pc` on its own.
    fn execute_current_inst(&mut self, inst: &Self::Inst) -> Result<(), CoreError>;
}
