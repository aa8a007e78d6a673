//! `Execute` (spec §4.6, component C8) and `InstExecute`'s replay path
//! (spec §4.5 "subsequent visits").
//!
//! The real ISA semantics this module hands off to are an out-of-scope
//! collaborator (spec §1) reached through [`Hart::execute_current_inst`].
//! What belongs to the dispatch core is only the *interface contract*
//! spec §4.6 describes: install the cached instruction into state, invoke
//! the opaque execute step, and return to the owning `ExecutionPage`.
//! `examples/original_source/core/translate/ExecutionPage.cpp` realises
//! this as two actions — `setInst_` then the materialised per-opcode
//! group — chained so that the final one hands back to
//! `translated_page_group_`; here that chain is exactly the two actions
//! below, with the hand-back modelled as the second action always
//! returning `ActionOutcome::Jump(GroupRef::Page { .. })`.

use crate::action::{ActionOutcome, GroupRef};
use crate::error::CoreError;
use crate::hart::{Hart, Inst};

fn slot_coords(self_ref: GroupRef) -> (crate::addr::Addr, u64, u16) {
    match self_ref {
        GroupRef::InstPlay { page_base, chunk, slot } => (page_base, chunk, slot),
        _ => unreachable!("execute/set_inst invoked with a non-InstPlay GroupRef"),
    }
}

/// `InstExecute::setInst_` (spec §4.5 "subsequent visits" / §3
/// `InstExecute` lifecycle "install cached inst into state").
///
/// No memory read, no decode, no CSR check — this is exactly what amortises
/// the cost of repeated execution of the same instruction.
pub(crate) fn set_inst<H: Hart>(
    dispatcher: &mut crate::dispatcher::Dispatcher<H>,
    self_ref: GroupRef,
) -> Result<ActionOutcome, CoreError> {
    let (page_base, chunk, slot_idx) = slot_coords(self_ref);

    let cached = dispatcher
        .translate
        .pages()
        .get(&page_base)
        .and_then(|page| page.slot(chunk, slot_idx))
        .and_then(|slot| slot.cached_inst())
        .cloned()
        .expect("InstPlay entered before setup cached an instruction for this slot");

    // A cached page-crosser re-reads its low half (and re-records its true
    // start VA) on every visit even though its decode is skipped — restore
    // it here too, not just on the cold path, so a replayed crosser hands
    // Execute the same `pc` it would have had fully in-page.
    if let Some(start_pc) = dispatcher.hart.sim_state().take_crossing_pc() {
        dispatcher.hart.set_pc(start_pc);
    }

    let pc = dispatcher.hart.pc();
    let opcode_size = cached.opcode_size();
    let sim = dispatcher.hart.sim_state();
    sim.current_inst = Some(cached);
    sim.next_pc = pc + opcode_size.bytes();

    Ok(ActionOutcome::Continue)
}

/// `Execute` (spec §4.6): invokes the ISA-semantics action group for the
/// current instruction, then hands control back to the owning
/// `ExecutionPage` (spec §2 "the back-edge from `InstExecute` through
/// `Execute` to the same `ExecutionPage`").
pub(crate) fn execute_current_inst<H: Hart>(
    dispatcher: &mut crate::dispatcher::Dispatcher<H>,
    self_ref: GroupRef,
) -> Result<ActionOutcome, CoreError> {
    let (page_base, _, _) = slot_coords(self_ref);

    let inst = dispatcher
        .hart
        .sim_state()
        .current_inst
        .clone()
        .expect("current_inst must be installed before Execute runs");

    dispatcher.hart.execute_current_inst(&inst)?;

    Ok(ActionOutcome::Jump(GroupRef::Page { page_base }))
}
