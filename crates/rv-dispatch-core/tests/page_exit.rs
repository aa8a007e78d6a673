//! Scenario 5 (spec §8): once PC no longer lies within the current
//! `ExecutionPage`'s translated range, the very next dispatch must route
//! back through `Fetch`/`Translate` rather than staying on the old page.

use rv_dispatch_core::testsupport::ReferenceHart;
use rv_dispatch_core::{Dispatcher, PageSize};

const VA_PAGE_A: u64 = 0xD000_0000;
const PA_PAGE_A: u64 = 0x9000_0000;
const VA_PAGE_B: u64 = 0xD000_1000;
const PA_PAGE_B: u64 = 0xA000_0000;

#[test]
fn pc_falling_off_the_end_of_a_page_re_enters_translate() {
    let mut hart = ReferenceHart::new(VA_PAGE_A + 0xFFC);
    hart.map_page(VA_PAGE_A, PA_PAGE_A, PageSize::Size4KiB);
    hart.map_page(VA_PAGE_B, PA_PAGE_B, PageSize::Size4KiB);
    // lui ra,0x1 at the very last word of page A; its default next_pc is
    // VA_PAGE_A + 0x1000 == VA_PAGE_B, outside page A's translated range.
    hart.write_u32(PA_PAGE_A + 0xFFC, 0x0000_10B7); // lui ra,0x1 (rd=1, imm20=0x1)
    hart.write_u16(PA_PAGE_B, 0x4105); // c.li sp,1, first instruction of page B

    let mut dispatcher = Dispatcher::new(hart);

    dispatcher.run_one_instruction().expect("lui must execute cleanly");
    assert_eq!(dispatcher.hart().pc(), VA_PAGE_B, "pc must have crossed into page B");

    dispatcher.run_one_instruction().expect("crossing into page B must re-translate and succeed");
    assert_eq!(dispatcher.hart().reg(2), 1, "c.li sp,1 on page B must have executed");
}
