//! `Fetch` — the first stage of the dispatch graph (spec §4.2, component
//! C4).

use crate::action::{Action, ActionGroup, ActionOutcome, GroupRef};
use crate::error::CoreError;
use crate::hart::Hart;
use crate::tags::ActionTag;
use crate::translate::TranslationRequest;

/// Resets per-instruction state and requests a translation of the
/// program counter; hands off to the `Translate` glue stage.
///
/// Grounded in `examples/original_source/core/Fetch.cpp`'s `fetch_()`:
/// reset `SimState`, reset the fetch `TranslationState`, push exactly one
/// `{vaddr = PC, access_size = 4}` request. `Fetch` owns no per-hart data
/// of its own beyond its single `ActionGroup` — the state it resets lives
/// on the `Hart`.
pub struct Fetch<H: Hart> {
    group: ActionGroup<H>,
}

impl<H: Hart> Fetch<H> {
    #[must_use]
    pub fn new() -> Self {
        let mut group = ActionGroup::new("FetchGroup", GroupRef::InstTranslate);
        group.add_action(Action::new("fetch", Some(ActionTag::Fetch), fetch_action));
        Self { group }
    }

    pub(crate) fn group_mut(&mut self) -> &mut ActionGroup<H> {
        &mut self.group
    }
}

impl<H: Hart> Default for Fetch<H> {
    fn default() -> Self {
        Self::new()
    }
}

/// Width in bytes Fetch always requests: a full `Opcode` word, even
/// though the eventual instruction may turn out to be compressed (spec
/// §4.2; the access size shrinks only implicitly, via the page-crosser
/// path in `InstExecute::setupInst`, spec §4.5 step 3).
const OPCODE_ACCESS_SIZE: u8 = 4;

fn fetch_action<H: Hart>(
    dispatcher: &mut crate::dispatcher::Dispatcher<H>,
    _self_ref: GroupRef,
) -> Result<ActionOutcome, CoreError> {
    let pc = dispatcher.hart.pc();
    log::trace!("fetch: pc={pc:#x}");

    dispatcher.hart.sim_state().reset_for_fetch();

    let translation_state = dispatcher.hart.fetch_translation();
    translation_state.reset();
    translation_state.push_request(TranslationRequest::aligned(pc, OPCODE_ACCESS_SIZE));

    Ok(ActionOutcome::Continue)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_starts_wired_to_inst_translate() {
        let fetch: Fetch<crate::testsupport::ReferenceHart> = Fetch::new();
        assert_eq!(fetch.group.next_action_group(), GroupRef::InstTranslate);
    }
}
