//! Per-fetch scratch state (spec §3 "InstExecute"/§9 "SimState scope").

use std::rc::Rc;

use crate::addr::Addr;
use crate::opcode::Opcode;

/// Per-hart scratch cleared at the start of every [`Fetch`](crate::fetch::Fetch)
/// and mutated only by that hart's own action chain (spec §5 "Shared
/// resources").
///
/// `current_inst` is held behind an `Rc` rather than owned directly: the
/// cache-hit invariant in spec §8 ("`state.current_inst` observed after
/// visit N is pointer/identity-equal to that observed after visit 1") is
/// otherwise unobservable once `Inst` is `Clone` — `Rc::ptr_eq` is how a
/// test confirms no re-decode happened.
#[derive(Debug, Clone)]
pub struct SimState<I> {
    pub current_opcode: Opcode,
    pub partial_opcode: bool,
    pub current_uid: u64,
    pub current_inst: Option<Rc<I>>,
    pub next_pc: Addr,
    /// The true start VA of an instruction currently split across a
    /// page-crosser bounce, set when the low half is read and consumed
    /// once the high half merges in and decode completes. Everything in
    /// between (the crosser's own bounce, and — when the halves land on
    /// different translated pages — the `Fetch`/`Translate` round trip
    /// that re-translates the second half) runs with `pc` pointing at the
    /// high half's own VA instead, since that is what locates the right
    /// page/chunk/slot; this field is how that VA finds its way back to
    /// `pc` before `next_pc` is computed and before Execute runs.
    pub crossing_pc: Option<Addr>,
}

impl<I> Default for SimState<I> {
    fn default() -> Self {
        Self {
            current_opcode: 0,
            partial_opcode: false,
            current_uid: 0,
            current_inst: None,
            next_pc: 0,
            crossing_pc: None,
        }
    }
}

impl<I> SimState<I> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears the per-fetch fields. `current_uid` is a monotonically
    /// increasing counter across the whole run and is deliberately left
    /// untouched, matching `examples/original_source/core/Fetch.cpp`'s
    /// `fetch_()`, which never resets it.
    ///
    /// `current_opcode` and `crossing_pc` are preserved when
    /// `partial_opcode` is already set: that combination means a
    /// page-crosser's low half has been read and is waiting for its high
    /// half, which is read only after control bounces back through here
    /// when the crossing also leaves the translated page (the
    /// `ExecutionPage` → `Fetch` edge, not a fresh instruction start).
    /// Clearing them here would drop the half already read and the
    /// instruction's true start VA along with it.
    pub fn reset_for_fetch(&mut self) {
        if !self.partial_opcode {
            self.current_opcode = 0;
            self.crossing_pc = None;
        }
        self.current_inst = None;
        self.next_pc = 0;
    }

    /// Takes the pending page-crossing instruction's true start VA, if
    /// any, so a caller can restore `pc` to it before computing `next_pc`
    /// or invoking Execute. A no-op (`None`) for every non-crossing
    /// instruction.
    pub fn take_crossing_pc(&mut self) -> Option<Addr> {
        self.crossing_pc.take()
    }
}
