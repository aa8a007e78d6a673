//! `Translate` — consumes the pending translation request, performs the
//! externally-supplied page walk, and materialises or reuses the
//! `ExecutionPage` for the translated range (spec §4.3, component C5).
//!
//! The MMU walk itself (`Hart::translate_page`) is an out-of-scope
//! collaborator (spec §1); this module is only the glue that wires its
//! result into the dispatch graph. The core assumes at most one
//! `ExecutionPage` per distinct VA page (spec §4.3) — `pages` is keyed on
//! the translated page's own masked base address so a second translation
//! of the same page reuses the existing `ExecutionPage` instead of
//! rebuilding its decode cache.

use std::collections::HashMap;

use crate::action::{Action, ActionGroup, ActionOutcome, GroupRef};
use crate::addr::Addr;
use crate::error::CoreError;
use crate::execution_page::ExecutionPage;
use crate::hart::Hart;
use crate::tags::ActionTag;

pub struct Translate<H: Hart> {
    group: ActionGroup<H>,
    pages: HashMap<Addr, ExecutionPage<H::Inst>>,
}

impl<H: Hart> Translate<H> {
    #[must_use]
    pub fn new() -> Self {
        // The outgoing edge is always computed per call (spec §4.3: the
        // next group is whichever `ExecutionPage` the walk produced), so
        // the placeholder here is never actually returned.
        let mut group = ActionGroup::new("InstTranslateGroup", GroupRef::Fetch);
        group.add_action(Action::new(
            "inst_translate",
            Some(ActionTag::InstTranslate),
            inst_translate_action,
        ));
        Self { group, pages: HashMap::new() }
    }

    pub(crate) fn group_mut(&mut self) -> &mut ActionGroup<H> {
        &mut self.group
    }

    pub(crate) fn pages(&self) -> &HashMap<Addr, ExecutionPage<H::Inst>> {
        &self.pages
    }

    pub(crate) fn pages_mut(&mut self) -> &mut HashMap<Addr, ExecutionPage<H::Inst>> {
        &mut self.pages
    }

    /// Drops any cached decode state touching `range` across every
    /// translated page this hart has seen (spec §9, "Self-modifying
    /// code" — a host simulator's `fence.i`/MMIO-write handling calls
    /// this; the core itself never invalidates on its own).
    pub fn invalidate(&mut self, range: crate::addr::AddrRange) {
        for page in self.pages.values_mut() {
            page.invalidate(range);
        }
    }
}

impl<H: Hart> Default for Translate<H> {
    fn default() -> Self {
        Self::new()
    }
}

fn inst_translate_action<H: Hart>(
    dispatcher: &mut crate::dispatcher::Dispatcher<H>,
    _self_ref: GroupRef,
) -> Result<ActionOutcome, CoreError> {
    let request = dispatcher.hart.fetch_translation().pop_request();
    let result = dispatcher.hart.translate_page(request)?;
    let page_base = result.vaddr() & result.page_mask();

    dispatcher.hart.fetch_translation().push_result(result);

    dispatcher.translate.pages.entry(page_base).or_insert_with(|| {
        log::debug!("inst_translate: new ExecutionPage at page_base={page_base:#x}");
        ExecutionPage::new(result)
    });

    Ok(ActionOutcome::Jump(GroupRef::Page { page_base }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_exists_with_inst_translate_tag() {
        let translate: Translate<crate::testsupport::ReferenceHart> = Translate::new();
        assert_eq!(translate.group.name(), "InstTranslateGroup");
    }
}
