//! Scenario 3 (spec §8): a 4 MiB translation whose loop body is placed so
//! the final `bne` straddles a 4 KiB sub-chunk boundary *inside* that one
//! translated page — exercising `InstExecute`'s page-crosser / partial-opcode
//! path without ever leaving the translated page itself. A second test
//! below exercises the same opcode split across two distinct translated
//! pages, where the high half is read only after a `Fetch`/`Translate`
//! round trip.

use rv_dispatch_core::testsupport::ReferenceHart;
use rv_dispatch_core::{Dispatcher, PageSize};

const VA_PAGE: u64 = 0xF040_0000;
const PA_PAGE: u64 = 0x0840_0000;
const LOOP_OFFSET: u64 = 0xFF2;

fn crossing_loop_hart() -> ReferenceHart {
    let mut hart = ReferenceHart::new(VA_PAGE + LOOP_OFFSET);
    hart.map_page(VA_PAGE, PA_PAGE, PageSize::Size4MiB);

    let base = PA_PAGE + LOOP_OFFSET;
    hart.write_u32(base, 0x009890B7); // lui ra,0x989           @ 0xFF2
    hart.write_u32(base + 0x4, 0x6800809B); // addiw ra,ra,1664  @ 0xFF6
    hart.write_u16(base + 0x8, 0x4105); // c.li sp,1             @ 0xFFA
    hart.write_u16(base + 0xA, 0x0105); // c.addi sp,sp,1        @ 0xFFC
    hart.write_u32(base + 0xC, 0xFE111FE3); // bne sp,ra,<loop>  @ 0xFFE, straddles 0x1000
    hart
}

#[test]
fn page_crossing_bne_decodes_and_branches_correctly() {
    let hart = crossing_loop_hart();
    let mut dispatcher = Dispatcher::new(hart);

    let target_pc = VA_PAGE + LOOP_OFFSET + 0x10;
    while dispatcher.hart().pc() != target_pc {
        dispatcher.run_one_instruction().expect("no faults expected in this program");
    }

    assert_eq!(dispatcher.hart().reg(1), 0x0098_9680);
    assert_eq!(dispatcher.hart().reg(2), 0x0098_9680);
}

#[test]
fn first_visit_to_the_crossing_bne_sets_partial_opcode_then_clears_it() {
    let hart = crossing_loop_hart();
    let mut dispatcher = Dispatcher::new(hart);

    dispatcher.run_one_instruction().unwrap(); // lui
    dispatcher.run_one_instruction().unwrap(); // addiw
    dispatcher.run_one_instruction().unwrap(); // c.li
    dispatcher.run_one_instruction().unwrap(); // c.addi

    // The crossing bne: its first half lives in the chunk ending at
    // 0xFFF, its second half in the chunk starting at 0x1000. Driving one
    // full instruction's worth of dispatch must resolve both halves and
    // land back at the loop body, not get stuck mid-opcode. sp (2) still
    // differs from ra here, so the branch is taken back to the c.addi at
    // the start of the loop body — two bytes behind the bne's own start,
    // not two bytes behind where the high half happened to be read from.
    dispatcher.run_one_instruction().expect("crossing bne must resolve in one driver step");
    assert_eq!(dispatcher.hart().pc(), VA_PAGE + LOOP_OFFSET + 0xA);
}

/// Same loop body, but the crossing `bne` straddles a boundary between two
/// distinct translated pages (non-contiguous physical mappings) rather than
/// two sub-chunks of one page — the high half is only read after a real
/// `ExecutionPage` -> `Fetch` -> `Translate` round trip, which must not lose
/// the low half already read or the instruction's true start VA.
#[test]
fn page_crossing_bne_across_two_translated_pages_resolves_correctly() {
    const VA_PAGE_A: u64 = 0xE000_0000;
    const PA_PAGE_A: u64 = 0x7000_0000;
    const VA_PAGE_B: u64 = VA_PAGE_A + 0x1000;
    const PA_PAGE_B: u64 = 0x7500_0000;

    let mut hart = ReferenceHart::new(VA_PAGE_A + LOOP_OFFSET);
    hart.map_page(VA_PAGE_A, PA_PAGE_A, PageSize::Size4KiB);
    hart.map_page(VA_PAGE_B, PA_PAGE_B, PageSize::Size4KiB);

    let base = PA_PAGE_A + LOOP_OFFSET;
    hart.write_u32(base, 0x009890B7); // lui ra,0x989
    hart.write_u32(base + 0x4, 0x6800809B); // addiw ra,ra,1664
    hart.write_u16(base + 0x8, 0x4105); // c.li sp,1
    hart.write_u16(base + 0xA, 0x0105); // c.addi sp,sp,1
    // bne's low half, the last 2 bytes of page A...
    hart.write_u16(PA_PAGE_A + 0xFFE, 0x1FE3);
    // ...and its high half, the first 2 bytes of page B — a wholly
    // separate physical mapping from page A's.
    hart.write_u16(PA_PAGE_B, 0xFE11);

    let mut dispatcher = Dispatcher::new(hart);

    let target_pc = VA_PAGE_B + 0x2;
    while dispatcher.hart().pc() != target_pc {
        dispatcher.run_one_instruction().expect("no faults expected in this program");
    }

    assert_eq!(dispatcher.hart().reg(1), 0x0098_9680);
    assert_eq!(dispatcher.hart().reg(2), 0x0098_9680);
}
