//! `Dispatcher` — owns one hart's worth of dispatch-graph state and wires
//! [`GroupRef`] identities back to the behaviour described in spec §4.
//!
//! This is the crate's single entry point (spec §6, "To the driver
//! (exposed)"): `fetch_action_group()` names where to start, and
//! `step_group` advances the chain exactly one hop at a time, matching
//! the original's `while (next_action_group) { next_action_group =
//! next_action_group->execute(state); }` — except here the loop itself
//! lives in the embedding driver (see [`Dispatcher::run_one_instruction`]
//! for a ready-made one), since the core has no scheduler of its own
//! (spec §4.1).

use crate::action::{ActionGroup, GroupRef};
use crate::error::CoreError;
use crate::execute::{execute_current_inst, set_inst};
use crate::execution_page::translated_page_execute;
use crate::fetch::Fetch;
use crate::hart::Hart;
use crate::inst_execute::setup_inst;
use crate::inst_translate::Translate;
use crate::tags::ActionTag;

/// Owns the dispatch-graph wiring for one hart: its `Hart` implementation,
/// the `Fetch` and `Translate` stages, and the shared `ExecutionPage`/
/// `InstExecute` action templates (spec §5: "Multiple harts ... each own
/// independent `State`, `TranslationState`, and an independent chain of
/// `ExecutionPage`s; they do not share mutable state" — a second hart is
/// simply a second `Dispatcher`).
pub struct Dispatcher<H: Hart> {
    pub(crate) hart: H,
    pub(crate) fetch: Fetch<H>,
    pub(crate) translate: Translate<H>,
    page_group: ActionGroup<H>,
    inst_setup_group: ActionGroup<H>,
    inst_play_group: ActionGroup<H>,
    /// Where the next call to [`Dispatcher::step_group`] (via
    /// [`Dispatcher::run_one_instruction`]) resumes. The dispatch graph
    /// itself has no notion of "one instruction" — per spec §4.1 the
    /// top-level driver is one unbroken loop over the whole run — so this
    /// is the embedding position a stepping driver needs to persist
    /// between calls, not state the graph consults on its own.
    current_group: GroupRef,
}

impl<H: Hart> Dispatcher<H> {
    #[must_use]
    pub fn new(hart: H) -> Self {
        let mut page_group = ActionGroup::new("ExecutionPageGroup", GroupRef::Fetch);
        page_group.add_action(crate::action::Action::new(
            "translated_page_execute",
            Some(ActionTag::TranslationPageExecute),
            translated_page_execute,
        ));

        let mut inst_setup_group = ActionGroup::new("InstSetupGroup", GroupRef::Fetch);
        inst_setup_group.add_action(crate::action::Action::new(
            "setup_inst",
            Some(ActionTag::Decode),
            setup_inst,
        ));

        let mut inst_play_group = ActionGroup::new("InstPlayGroup", GroupRef::Fetch);
        inst_play_group.add_action(crate::action::Action::new("set_inst", None, set_inst));
        inst_play_group.add_action(crate::action::Action::new(
            "execute_current_inst",
            Some(ActionTag::Execute),
            execute_current_inst,
        ));

        Self {
            hart,
            fetch: Fetch::new(),
            translate: Translate::new(),
            page_group,
            inst_setup_group,
            inst_play_group,
            current_group: GroupRef::Fetch,
        }
    }

    #[must_use]
    pub fn hart(&self) -> &H {
        &self.hart
    }

    #[must_use]
    pub fn hart_mut(&mut self) -> &mut H {
        &mut self.hart
    }

    /// The single entry point a driver needs (spec §6): where to start
    /// the chain to fetch-translate-decode-execute one instruction.
    #[must_use]
    pub const fn fetch_action_group() -> GroupRef {
        GroupRef::Fetch
    }

    /// Drops cached decode state touching `range` on every page this hart
    /// has translated (spec §9 "Self-modifying code").
    pub fn invalidate(&mut self, range: crate::addr::AddrRange) {
        self.translate.invalidate(range);
    }

    /// Runs exactly one group of the dispatch chain and returns the next
    /// one to run (spec §4.1: `g.execute(state)`).
    ///
    /// Each branch clones its group out before calling `execute`: the
    /// group is a field of `self`, and `ActionGroup::execute` needs
    /// `&mut Dispatcher<H>` (which owns that very field) at the same
    /// time as `&mut self` on the group, so the two can't be borrowed
    /// simultaneously in place. The clone is cheap (one or two `Action`
    /// function pointers) and `execute` already moves its own action
    /// list out for the same reason, so this mirrors that pattern one
    /// level up rather than introducing a different one.
    pub fn step_group(&mut self, g: GroupRef) -> Result<GroupRef, CoreError> {
        match g {
            GroupRef::Fetch => {
                let mut group = self.fetch.group_mut().clone();
                let result = group.execute(self, g);
                *self.fetch.group_mut() = group;
                result
            }
            GroupRef::InstTranslate => {
                let mut group = self.translate.group_mut().clone();
                let result = group.execute(self, g);
                *self.translate.group_mut() = group;
                result
            }
            GroupRef::Page { .. } => {
                let mut group = self.page_group.clone();
                let result = group.execute(self, g);
                self.page_group = group;
                result
            }
            GroupRef::InstSetup { .. } => {
                let mut group = self.inst_setup_group.clone();
                let result = group.execute(self, g);
                self.inst_setup_group = group;
                result
            }
            GroupRef::InstPlay { .. } => {
                let mut group = self.inst_play_group.clone();
                let result = group.execute(self, g);
                self.inst_play_group = group;
                result
            }
        }
    }

    /// Drives the chain forward, resuming from wherever the previous call
    /// left off, until exactly one instruction has retired through
    /// `Execute` (spec §4.6) — including any page-crosser bounce through
    /// `Fetch`/`Translate` needed to get there (spec §4.5 step 3).
    ///
    /// Convenience on top of [`Dispatcher::step_group`] for embedders that
    /// want per-instruction stepping; the dispatch graph has no such
    /// boundary on its own (spec §4.1's driver is one unbroken loop for
    /// the whole run, and spec §4.4's in-page back-edge means most
    /// instructions never touch `Fetch` again once their page is
    /// resident). `InstPlay` is always the group that runs `Execute`
    /// (spec §4.5 "subsequent visits" / §4.6), so stopping right after it
    /// has run is exactly "one instruction" regardless of whether this
    /// call found the slot cached or decoded it for the first time.
    pub fn run_one_instruction(&mut self) -> Result<(), CoreError> {
        loop {
            let about_to_run = self.current_group;
            self.current_group = self.step_group(about_to_run)?;
            if matches!(about_to_run, GroupRef::InstPlay { .. }) {
                return Ok(());
            }
        }
    }
}
