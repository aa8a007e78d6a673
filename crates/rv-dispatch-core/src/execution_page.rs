//! `ExecutionPage` — the per-page decoded-instruction cache (spec §3,
//! §4.4, component C6).
//!
//! Grounded in `examples/original_source/core/translate/
//! ExecutionPage.{hpp,cpp}`: a two-level sparse map from virtual address
//! to a pre-decoded `InstExecute` slot. The outer level (`decode_block`)
//! is keyed by 4 KiB sub-chunk index so a translation covering anywhere
//! from 4 KiB to 256 TiB never has to allocate more than the chunks that
//! are actually executed; the inner level is a dense 2048-entry vector
//! (one slot per 2-byte alignment within a 4 KiB chunk).
//!
//! Spec §9's "Last-slot boundary arithmetic" note is implemented as the
//! corrected behaviour, not the original bug: the slot flagged
//! `is_last_half_slot` is slot 2047 of *each* chunk's own vector, not a
//! single flag on one shared template shared by every chunk. Because
//! every chunk vector here is built fresh (not cloned from a shared
//! instance with its own wiring, spec §9 "Copy semantics of
//! `InstExecute`"), this falls out naturally rather than needing a
//! special case.

use std::collections::HashMap;

use crate::action::{ActionOutcome, GroupRef};
use crate::addr::{Addr, AddrRange};
use crate::error::CoreError;
use crate::hart::Hart;
use crate::translate::TranslationResult;

/// 4 KiB sub-chunk size; the unit `decode_block` is indexed by (spec §4.4
/// step 3).
pub const CHUNK_BYTES: u64 = 4096;
/// Entries per chunk: one per 2-byte-aligned offset within 4 KiB (spec §3
/// `ExecutionPage`).
pub const SLOTS_PER_CHUNK: usize = 2048;

/// Per-instruction-slot descriptor within a decode-block chunk (spec §3
/// `InstExecute`).
///
/// `setup_actions`/`play_actions_head`/`execute_actions`/`back_to_page`
/// from spec §3's data model are not separate fields here: this crate
/// models "which action list runs for this slot" structurally, via
/// `GroupRef::InstSetup`/`GroupRef::InstPlay` carrying the slot's own
/// coordinates rather than the slot carrying pointers to its own groups
/// (spec §9's own suggestion — "store per-slot state separately from the
/// shared setup action template"). `cached_inst` being `Some` is exactly
/// the "has this slot finished its first visit" flag; no additional
/// `play_ready` bit is needed.
#[derive(Clone)]
pub struct InstExecute<I> {
    inst_addr: Addr,
    cached_inst: Option<std::rc::Rc<I>>,
    is_last_half_slot: bool,
}

impl<I> InstExecute<I> {
    fn new(is_last_half_slot: bool) -> Self {
        Self { inst_addr: 0, cached_inst: None, is_last_half_slot }
    }

    #[must_use]
    pub const fn inst_addr(&self) -> Addr {
        self.inst_addr
    }

    #[must_use]
    pub const fn is_last_half_slot(&self) -> bool {
        self.is_last_half_slot
    }

    #[must_use]
    pub fn cached_inst(&self) -> Option<&std::rc::Rc<I>> {
        self.cached_inst.as_ref()
    }

    /// Whether this slot has already been decoded once (spec §3
    /// `InstExecute` lifecycle: "on later visits, replays").
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.cached_inst.is_some()
    }

    pub(crate) fn set_cached_inst(&mut self, inst: std::rc::Rc<I>) {
        self.cached_inst = Some(inst);
    }
}

fn fresh_chunk<I>() -> Vec<InstExecute<I>> {
    let mut chunk: Vec<InstExecute<I>> = (0..SLOTS_PER_CHUNK - 1).map(|_| InstExecute::new(false)).collect();
    chunk.push(InstExecute::new(true));
    chunk
}

/// Holds decoded-instruction descriptors for one translated page and
/// dispatches to per-instruction actions (spec §3, §4.4, component C6).
pub struct ExecutionPage<I> {
    translation_result: TranslationResult,
    decode_block: HashMap<u64, Vec<InstExecute<I>>>,
}

impl<I> ExecutionPage<I> {
    #[must_use]
    pub fn new(translation_result: TranslationResult) -> Self {
        Self { translation_result, decode_block: HashMap::new() }
    }

    #[must_use]
    pub const fn translation_result(&self) -> &TranslationResult {
        &self.translation_result
    }

    /// Returns the chunk at `addr_idx`, inserting a fresh copy of the
    /// default slot template if this is the first visit to that chunk
    /// (spec §4.4 step 5; invariant: `decode_block` populated lazily).
    pub(crate) fn chunk_mut(&mut self, addr_idx: u64) -> &mut Vec<InstExecute<I>> {
        self.decode_block.entry(addr_idx).or_insert_with(|| {
            log::debug!(
                "execution_page: allocating decode-block chunk {addr_idx} for page {:#x}",
                self.translation_result.vaddr() & self.translation_result.page_mask()
            );
            fresh_chunk()
        })
    }

    pub(crate) fn slot_mut(&mut self, addr_idx: u64, slot_idx: u16) -> &mut InstExecute<I> {
        &mut self.chunk_mut(addr_idx)[slot_idx as usize]
    }

    pub(crate) fn slot(&self, addr_idx: u64, slot_idx: u16) -> Option<&InstExecute<I>> {
        self.decode_block.get(&addr_idx).map(|chunk| &chunk[slot_idx as usize])
    }

    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.decode_block.len()
    }

    /// Drops any chunk whose 4 KiB span intersects `range`, forcing
    /// re-setup on the next visit (spec §9, "Self-modifying code" —
    /// exposed as a no-op-by-default hook; nothing in this core calls it
    /// on its own, since `fence.i` handling is left an open question by
    /// spec §9 and decided in `DESIGN.md`).
    pub fn invalidate(&mut self, range: AddrRange) {
        let page_base = self.translation_result.vaddr() & self.translation_result.page_mask();
        self.decode_block.retain(|&addr_idx, _| {
            let chunk_start = page_base + addr_idx * CHUNK_BYTES;
            let chunk_range = AddrRange::new(chunk_start, chunk_start + CHUNK_BYTES);
            !chunk_range.intersects(&range)
        });
    }
}

/// `translatedPageExecute` (spec §4.4): the seven-step algorithm that
/// decides whether the current PC is still on this page and, if so,
/// which `InstSetup`/`InstPlay` slot owns it.
pub(crate) fn translated_page_execute<H: Hart>(
    dispatcher: &mut crate::dispatcher::Dispatcher<H>,
    self_ref: GroupRef,
) -> Result<ActionOutcome, CoreError> {
    let GroupRef::Page { page_base } = self_ref else {
        unreachable!("translated_page_execute invoked with a non-Page GroupRef")
    };

    let vaddr = dispatcher.hart.pc();
    let page = dispatcher
        .translate
        .pages_mut()
        .get_mut(&page_base)
        .expect("GroupRef::Page must name a page Translate has already materialised");

    if !page.translation_result.contains(vaddr) {
        log::debug!("execution_page: pc {vaddr:#x} left page {page_base:#x}, returning to fetch");
        return Ok(ActionOutcome::Jump(GroupRef::Fetch));
    }

    let offset = page.translation_result.offset(vaddr);
    let addr_idx = offset >> 12;
    let slot_idx = ((vaddr & 0xFFF) >> 1) as u16;

    let paddr = page.translation_result.translate(vaddr);
    let slot = page.slot_mut(addr_idx, slot_idx);
    slot.inst_addr = paddr;
    let ready = slot.is_ready();

    let next = if ready {
        GroupRef::InstPlay { page_base, chunk: addr_idx, slot: slot_idx }
    } else {
        GroupRef::InstSetup { page_base, chunk: addr_idx, slot: slot_idx }
    };
    Ok(ActionOutcome::Jump(next))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addr::PageSize;

    fn sample_result() -> TranslationResult {
        TranslationResult::new(0xC000_0000, 0x8000_0000, 4, PageSize::Size4KiB)
    }

    #[test]
    fn last_slot_of_a_chunk_is_flagged() {
        let mut page: ExecutionPage<u32> = ExecutionPage::new(sample_result());
        let chunk = page.chunk_mut(0);
        assert!(!chunk[0].is_last_half_slot());
        assert!(chunk[SLOTS_PER_CHUNK - 1].is_last_half_slot());
    }

    #[test]
    fn chunk_allocation_is_lazy_and_per_chunk() {
        let mut page: ExecutionPage<u32> = ExecutionPage::new(sample_result());
        assert_eq!(page.chunk_count(), 0);
        page.chunk_mut(0);
        assert_eq!(page.chunk_count(), 1);
        page.chunk_mut(0);
        assert_eq!(page.chunk_count(), 1, "second access to same chunk must not reallocate");
        page.chunk_mut(1);
        assert_eq!(page.chunk_count(), 2);
    }

    #[test]
    fn invalidate_drops_only_intersecting_chunks() {
        let mut page: ExecutionPage<u32> = ExecutionPage::new(sample_result());
        page.chunk_mut(0);
        page.invalidate(AddrRange::new(0xC000_0000, 0xC000_0001));
        assert_eq!(page.chunk_count(), 0, "chunk 0 spans this range and must be dropped");

        page.chunk_mut(0);
        page.invalidate(AddrRange::new(0xC000_1000, 0xC000_2000));
        assert_eq!(page.chunk_count(), 1, "a disjoint range must not touch chunk 0");
    }
}
