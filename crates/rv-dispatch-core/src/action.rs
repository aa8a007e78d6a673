//! `Action` / `ActionGroup` dispatch primitives (spec §4.1).
//!
//! The core has no scheduler and no interpreter loop. Instead, each stage
//! (`Fetch`, the `Translate` glue, `ExecutionPage`, `InstExecute`'s setup
//! and replay paths) owns an `ActionGroup`, and driving the simulator one
//! instruction at a time is nothing more than:
//!
//! ```ignore
//! let mut g = dispatcher.fetch_action_group();
//! loop {
//!     g = dispatcher.step_group(g)?;
//! }
//! ```
//!
//! `next_group` in the C++ original is a live pointer rebound between
//! groups; spec §9 asks implementers to use non-owning, stable identifiers
//! along the cyclic `Page -> InstExecute -> Execute -> Page` graph instead
//! of owned references. [`GroupRef`] is that identifier: a small `Copy`
//! enum naming *which* group to run next, resolved back to behaviour by
//! [`crate::dispatcher::Dispatcher::step_group`]. `ExecutionPage`,
//! `InstSetup` and `InstPlay` groups are shared, single template
//! instances reused across every page/chunk/slot; the identity of *which*
//! page/chunk/slot an action should act on travels in the `GroupRef`
//! itself rather than in `self` state, which is what lets one
//! `ActionGroup` value stand in for the thousands of conceptual per-slot
//! groups the original allocates.

use crate::addr::Addr;
use crate::dispatcher::Dispatcher;
use crate::error::CoreError;
use crate::hart::Hart;
use crate::tags::ActionTag;

/// A stable, non-owning reference to "the next group to run" (spec §9).
///
/// `Page`/`InstSetup`/`InstPlay` carry the page's virtual base address
/// plus the two-level `decode_block` coordinates (spec §3 `ExecutionPage`,
/// §4.4 steps 3-4) so that one shared `ActionGroup` can act on whichever
/// slot the caller names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupRef {
    Fetch,
    InstTranslate,
    /// `page_base` is the translated page's virtual address, masked down
    /// to its own page boundary (i.e. `TranslationResult::vaddr() &
    /// TranslationResult::page_mask()`), unique per translated page.
    Page { page_base: Addr },
    /// `chunk` is the 4 KiB sub-chunk index (spec §4.4 step 3, `addr_idx`);
    /// `slot` is the 2-byte-aligned slot within that chunk (step 4).
    InstSetup { page_base: Addr, chunk: u64, slot: u16 },
    InstPlay { page_base: Addr, chunk: u64, slot: u16 },
}

/// What an [`Action`] asks the enclosing [`ActionGroup::execute`] to do
/// next (spec §4.1's two escape hatches, realised as a plain sum type per
/// spec §9's own recommendation rather than a thrown exception).
pub enum ActionOutcome {
    /// Proceed to the next action in the group (or, if this was the last
    /// one, to the group's own `next_group`).
    Continue,
    /// Unwind immediately to `GroupRef`, skipping any remaining actions
    /// in this group. Used both for genuine non-local control transfer
    /// (the page-crosser bounce, spec §4.5 step 3) and for groups whose
    /// outgoing edge is computed per-call rather than fixed at
    /// construction (`ExecutionPage`'s hit/miss branch, `InstExecute`'s
    /// setup-to-play handoff).
    Jump(GroupRef),
}

/// One unit of work in an [`ActionGroup`] (spec §4.1).
///
/// `run` is a plain function pointer rather than a boxed closure: every
/// action in this crate is stateless code shared across many logical
/// instances (one `setup_inst` function serves every slot in every page),
/// with the specific instance named by the `GroupRef` passed back in. That
/// keeps `Action`/`ActionGroup` cheaply `Clone`, with no arena of
/// heap-allocated trait objects to manage.
pub struct Action<H: Hart> {
    name: &'static str,
    tag: Option<ActionTag>,
    run: fn(&mut Dispatcher<H>, GroupRef) -> Result<ActionOutcome, CoreError>,
}

impl<H: Hart> Clone for Action<H> {
    fn clone(&self) -> Self {
        Self { name: self.name, tag: self.tag, run: self.run }
    }
}

impl<H: Hart> Action<H> {
    #[must_use]
    pub const fn new(
        name: &'static str,
        tag: Option<ActionTag>,
        run: fn(&mut Dispatcher<H>, GroupRef) -> Result<ActionOutcome, CoreError>,
    ) -> Self {
        Self { name, tag, run }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub const fn tag(&self) -> Option<ActionTag> {
        self.tag
    }

    fn invoke(&self, dispatcher: &mut Dispatcher<H>, self_ref: GroupRef) -> Result<ActionOutcome, CoreError> {
        (self.run)(dispatcher, self_ref)
    }
}

/// An ordered list of [`Action`]s plus the group to hand off to once they
/// have all run (spec §3 `ActionGroup`, §4.1 contract).
///
/// `next_group` is a plain field here rather than the live, externally
/// rebindable pointer of the C++ original: every group this crate
/// constructs either has a fixed outgoing edge (`Fetch` always hands off
/// to `InstTranslate`) or computes its outgoing edge per call via
/// [`ActionOutcome::Jump`] (`ExecutionPage`, `InstSetup`, `InstPlay`), so
/// no group actually needs post-construction rebinding of `next_group`
/// itself — `set_next_action_group` is provided for completeness and used
/// by [`crate::fetch::Fetch`]'s wiring.
pub struct ActionGroup<H: Hart> {
    name: &'static str,
    actions: Vec<Action<H>>,
    next_group: GroupRef,
}

impl<H: Hart> Clone for ActionGroup<H> {
    fn clone(&self) -> Self {
        Self { name: self.name, actions: self.actions.clone(), next_group: self.next_group }
    }
}

impl<H: Hart> ActionGroup<H> {
    #[must_use]
    pub fn new(name: &'static str, next_group: GroupRef) -> Self {
        Self { name, actions: Vec::new(), next_group }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Appends an action. Used only at construction time (spec §4.1
    /// contract: "`addAction(a)` appends during construction only").
    pub fn add_action(&mut self, action: Action<H>) {
        self.actions.push(action);
    }

    /// Prepends an action once (spec §4.1: used by `InstExecute` to
    /// prefix the "install cached inst" action to the execute list).
    pub fn insert_action_front(&mut self, action: Action<H>) {
        self.actions.insert(0, action);
    }

    /// Idempotent rebind of the outgoing edge (spec §4.1 contract).
    pub fn set_next_action_group(&mut self, next_group: GroupRef) {
        self.next_group = next_group;
    }

    #[must_use]
    pub const fn next_action_group(&self) -> GroupRef {
        self.next_group
    }

    /// Runs this group's actions in order against `dispatcher`, returning
    /// the next group to run (spec §4.1: "Executing a group runs its
    /// actions in order ... then returns `next_group`").
    ///
    /// Callers hand `execute` a detached copy of the group it's called
    /// on (see `Dispatcher::step_group`) rather than a reference into
    /// `dispatcher` itself, precisely so `self` and `dispatcher` never
    /// alias the same storage here.
    pub fn execute(&mut self, dispatcher: &mut Dispatcher<H>, self_ref: GroupRef) -> Result<GroupRef, CoreError> {
        for action in &self.actions {
            match action.invoke(dispatcher, self_ref)? {
                ActionOutcome::Continue => {}
                ActionOutcome::Jump(target) => return Ok(target),
            }
        }
        Ok(self.next_group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop<H: Hart>(_: &mut Dispatcher<H>, _: GroupRef) -> Result<ActionOutcome, CoreError> {
        Ok(ActionOutcome::Continue)
    }

    #[test]
    fn insert_action_front_prepends() {
        let mut group: ActionGroup<crate::testsupport::ReferenceHart> =
            ActionGroup::new("test-group", GroupRef::Fetch);
        group.add_action(Action::new("second", None, noop));
        group.insert_action_front(Action::new("first", None, noop));
        let names: Vec<_> = group.actions.iter().map(Action::name).collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[test]
    fn set_next_action_group_is_idempotent() {
        let mut group: ActionGroup<crate::testsupport::ReferenceHart> =
            ActionGroup::new("test-group", GroupRef::Fetch);
        group.set_next_action_group(GroupRef::InstTranslate);
        group.set_next_action_group(GroupRef::InstTranslate);
        assert_eq!(group.next_action_group(), GroupRef::InstTranslate);
    }
}
