//! `InstExecute`'s first-visit path (spec §4.5 "setupInst"), component C7.
//!
//! On a slot's first visit this action reads the opcode (handling the
//! page-crosser and partial-opcode cases), detects compression, decodes
//! via the external decoder, runs the CSR pre-checks, and caches the
//! decoded instruction into the slot so every later visit can skip
//! straight to [`crate::execute`]'s replay path.
//!
//! Grounded in `examples/original_source/core/translate/
//! ExecutionPage.cpp`'s `InstExecute::setupInst_`.

use std::rc::Rc;

use crate::action::{ActionOutcome, GroupRef};
use crate::error::CoreError;
use crate::hart::{Hart, Inst, PrivMode, CSR_SATP};
use crate::opcode::{is_compressed, Opcode, OpcodeSize};

fn slot_coords(self_ref: GroupRef) -> (crate::addr::Addr, u64, u16) {
    match self_ref {
        GroupRef::InstSetup { page_base, chunk, slot } => (page_base, chunk, slot),
        _ => unreachable!("setup_inst invoked with a non-InstSetup GroupRef"),
    }
}

/// `InstExecute::setupInst_` (spec §4.5, steps 1-8 plus the wiring step).
pub(crate) fn setup_inst<H: Hart>(
    dispatcher: &mut crate::dispatcher::Dispatcher<H>,
    self_ref: GroupRef,
) -> Result<ActionOutcome, CoreError> {
    let (page_base, chunk, slot_idx) = slot_coords(self_ref);

    let (inst_addr, is_last_half_slot) = {
        let page = dispatcher.translate.pages_mut().get_mut(&page_base).expect("page must exist");
        let slot = page.slot_mut(chunk, slot_idx);
        (slot.inst_addr(), slot.is_last_half_slot())
    };

    let opcode = if is_last_half_slot {
        // Step 3: last slot in its 4 KiB chunk — read only the low 16
        // bits, remember we're mid-opcode, and bounce back through this
        // same page (which will re-check containment against the new PC
        // and, if it left the page, route through Fetch/Translate).
        //
        // The bounce advances the *virtual* pc by 2, not the physical
        // `inst_addr` by 2: the re-check on the other side (`ExecutionPage`'s
        // `contains`) is defined over virtual addresses, and a chunk
        // boundary crossed here is not necessarily a page boundary (a
        // single `ExecutionPage` can span many 4 KiB chunks). Bouncing on
        // the physical address would misreport "left the page" whenever
        // va and pa diverge above the chunk offset, which is exactly the
        // case a multi-chunk page exists to cover.
        let half = dispatcher.hart.read16(inst_addr)?;
        let vaddr = dispatcher.hart.pc();
        let sim = dispatcher.hart.sim_state();
        sim.current_opcode = u32::from(half);
        sim.partial_opcode = true;
        // Remember the instruction's true start VA: everything from here
        // until the high half merges in runs with `pc` pointing at the
        // high half's own VA instead (that's what locates the right
        // page/chunk/slot), and this is how the real start finds its way
        // back before next_pc/Execute need it.
        sim.crossing_pc = Some(vaddr);
        dispatcher.hart.set_pc(vaddr + 2);
        log::debug!("inst_execute: page-crosser at {inst_addr:#x}, bouncing to re-translate");
        return Ok(ActionOutcome::Jump(GroupRef::Page { page_base }));
    } else {
        let sim = dispatcher.hart.sim_state();
        let partial = sim.partial_opcode;
        if partial {
            // Step 2, partial branch: merge the high half read from this
            // page into the low half carried over from the previous one.
            let hi = dispatcher.hart.read16(inst_addr)?;
            let sim = dispatcher.hart.sim_state();
            sim.current_opcode |= u32::from(hi) << 16;
            sim.partial_opcode = false;
        } else {
            let full = dispatcher.hart.read32(inst_addr)?;
            dispatcher.hart.sim_state().current_opcode = full;
        }
        dispatcher.hart.sim_state().current_opcode
    };

    // The opcode is now fully assembled. If this was a page-crosser, `pc`
    // is still sitting on the high half's VA (needed to get here) — put
    // it back to the instruction's real start before anything downstream
    // reads it, so next_pc and Execute both see the address the
    // instruction actually began at.
    if let Some(start_pc) = dispatcher.hart.sim_state().take_crossing_pc() {
        dispatcher.hart.set_pc(start_pc);
    }

    // Step 4: compression check.
    let (opcode, opcode_size): (Opcode, OpcodeSize) = if is_compressed(opcode) {
        (opcode & 0xFFFF, OpcodeSize::Compressed)
    } else {
        (opcode, OpcodeSize::Full)
    };
    dispatcher.hart.sim_state().current_opcode = opcode;

    // Step 5.
    dispatcher.hart.sim_state().current_uid += 1;

    // Step 6: decode.
    let inst = dispatcher.hart.decode(opcode).inspect_err(|_| {
        log::warn!("inst_execute: illegal instruction {opcode:#x} at {inst_addr:#x}");
    })?;

    // Step 7.
    let pc = dispatcher.hart.pc();
    dispatcher.hart.sim_state().next_pc = pc + opcode_size.bytes();
    dispatcher.hart.update_vec_config(&inst);

    // Step 8: CSR pre-checks.
    if inst.has_csr() {
        let csr = inst.csr_id();
        if !dispatcher.hart.csr_known(csr) {
            return Err(CoreError::IllegalInstruction("unknown csr"));
        }
        if csr == CSR_SATP
            && dispatcher.hart.privilege() == PrivMode::Supervisor
            && dispatcher.hart.mstatus_tvm()
        {
            return Err(CoreError::IllegalInstruction("satp access blocked by mstatus.tvm"));
        }
    }

    // Cache the decoded instruction so later visits skip straight to the
    // replay path (spec §3 `InstExecute` lifecycle; §8 cache-hit
    // invariant — `Rc` makes the identity check observable).
    let cached = Rc::new(inst);
    dispatcher.hart.sim_state().current_inst = Some(Rc::clone(&cached));
    let page = dispatcher.translate.pages_mut().get_mut(&page_base).expect("page must exist");
    page.slot_mut(chunk, slot_idx).set_cached_inst(cached);

    Ok(ActionOutcome::Jump(GroupRef::InstPlay { page_base, chunk, slot: slot_idx }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_coords_extracts_inst_setup_fields() {
        let (page_base, chunk, slot) =
            slot_coords(GroupRef::InstSetup { page_base: 0xC000_0000, chunk: 2, slot: 7 });
        assert_eq!(page_base, 0xC000_0000);
        assert_eq!(chunk, 2);
        assert_eq!(slot, 7);
    }
}
