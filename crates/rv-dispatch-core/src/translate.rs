//! Translation request/result types and the per-hart bounded stacks that
//! carry them between [`crate::fetch::Fetch`] and the `Translate` stage
//! (spec §3, §4.2, §4.3).

use crate::addr::{Addr, PageSize};

/// A request to translate one virtual address span.
///
/// Grounded in `examples/original_source/core/translate/
/// PegasusTranslationState.hpp`'s `TranslationRequest`, which asserts the
/// same two invariants in its constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranslationRequest {
    vaddr: Addr,
    access_size: u8,
    misaligned: bool,
    misaligned_bytes: u8,
}

impl TranslationRequest {
    /// # Panics
    /// Panics if `access_size == 0`, or if `misaligned` is set but
    /// `misaligned_bytes` is not strictly between 0 and `access_size`.
    #[must_use]
    pub fn new(vaddr: Addr, access_size: u8, misaligned: bool, misaligned_bytes: u8) -> Self {
        assert!(access_size > 0, "translation request access_size must be nonzero");
        if misaligned {
            assert!(
                misaligned_bytes > 0 && misaligned_bytes < access_size,
                "misaligned_bytes must lie strictly within access_size"
            );
        }
        Self { vaddr, access_size, misaligned, misaligned_bytes }
    }

    /// A simple, fully-aligned request for `access_size` bytes at `vaddr`.
    #[must_use]
    pub fn aligned(vaddr: Addr, access_size: u8) -> Self {
        Self::new(vaddr, access_size, false, 0)
    }

    #[must_use]
    pub const fn vaddr(&self) -> Addr {
        self.vaddr
    }

    #[must_use]
    pub const fn access_size(&self) -> u8 {
        self.access_size
    }

    #[must_use]
    pub const fn misaligned(&self) -> bool {
        self.misaligned
    }

    #[must_use]
    pub const fn misaligned_bytes(&self) -> u8 {
        self.misaligned_bytes
    }
}

/// An immutable, completed VA→PA translation for one page (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranslationResult {
    vaddr: Addr,
    paddr: Addr,
    access_size: u8,
    page_index_mask: Addr,
    page_mask: Addr,
}

impl TranslationResult {
    /// # Panics
    /// Panics if `page_size` is `Invalid`, or if `paddr` and `vaddr` don't
    /// share the same in-page offset.
    #[must_use]
    pub fn new(vaddr: Addr, paddr: Addr, access_size: u8, page_size: PageSize) -> Self {
        let span = page_size.size_in_bytes().expect("translation result needs a real page size");
        let page_index_mask = span - 1;
        let page_mask = !page_index_mask;
        assert_eq!(
            paddr & page_index_mask,
            vaddr & page_index_mask,
            "paddr and vaddr must share the same in-page offset"
        );
        Self { vaddr, paddr, access_size, page_index_mask, page_mask }
    }

    #[must_use]
    pub const fn vaddr(&self) -> Addr {
        self.vaddr
    }

    #[must_use]
    pub const fn paddr(&self) -> Addr {
        self.paddr
    }

    #[must_use]
    pub const fn access_size(&self) -> u8 {
        self.access_size
    }

    #[must_use]
    pub const fn page_index_mask(&self) -> Addr {
        self.page_index_mask
    }

    #[must_use]
    pub const fn page_mask(&self) -> Addr {
        self.page_mask
    }

    /// Whether `v` lies on the same page this result translated.
    #[must_use]
    pub const fn contains(&self, v: Addr) -> bool {
        (v & self.page_mask) == (self.vaddr & self.page_mask)
    }

    /// In-page offset of `v`.
    #[must_use]
    pub const fn offset(&self, v: Addr) -> Addr {
        v & self.page_index_mask
    }

    /// Physical address `v` maps to, assuming `contains(v)`.
    #[must_use]
    pub const fn translate(&self, v: Addr) -> Addr {
        (self.paddr & self.page_mask) | self.offset(v)
    }
}

/// Bounded stack capacity for both the request and result stacks (spec §3).
pub const MAX_TRANSLATION: usize = 64;

/// Per-hart bounded stacks of pending translation requests and completed
/// results, reset at the start of every fetch (spec §3, §4.2).
///
/// Grounded in `examples/original_source/core/translate/
/// PegasusTranslationState.hpp`'s fixed-capacity `requests_`/`results_`
/// arrays with `makeRequest`/`popRequest`/`setResult`/`popResult`.
#[derive(Debug, Clone, Default)]
pub struct TranslationState {
    requests: Vec<TranslationRequest>,
    results: Vec<TranslationResult>,
}

impl TranslationState {
    #[must_use]
    pub fn new() -> Self {
        Self { requests: Vec::new(), results: Vec::new() }
    }

    /// Clears both stacks. Called at the start of every [`Fetch`](crate::fetch::Fetch).
    pub fn reset(&mut self) {
        self.requests.clear();
        self.results.clear();
    }

    /// Pushes a new pending request.
    ///
    /// # Panics
    /// Panics (an invariant violation per spec §7) if the request stack is
    /// already at `MAX_TRANSLATION` capacity.
    pub fn push_request(&mut self, request: TranslationRequest) {
        debug_assert!(
            self.requests.len() < MAX_TRANSLATION,
            "translation request stack overflow"
        );
        self.requests.push(request);
    }

    /// Pops the most recently pushed request.
    ///
    /// # Panics
    /// Panics if the request stack is empty — popping with nothing pending
    /// is a dispatch bug, not a recoverable condition (spec §7).
    pub fn pop_request(&mut self) -> TranslationRequest {
        self.requests.pop().expect("pop_request on an empty translation request stack")
    }

    #[must_use]
    pub fn peek_request(&self) -> Option<&TranslationRequest> {
        self.requests.last()
    }

    #[must_use]
    pub fn requests_len(&self) -> usize {
        self.requests.len()
    }

    /// Pushes a completed result.
    ///
    /// # Panics
    /// Panics if the result stack is already at `MAX_TRANSLATION` capacity,
    /// or if any requests are still pending (spec §3 invariant: while
    /// results are non-empty, requests must be empty).
    pub fn push_result(&mut self, result: TranslationResult) {
        debug_assert!(self.results.len() < MAX_TRANSLATION, "translation result stack overflow");
        assert!(
            self.requests.is_empty(),
            "translation requests must be drained before results accumulate"
        );
        self.results.push(result);
    }

    /// Pops the most recently pushed result.
    ///
    /// # Panics
    /// Panics if the result stack is empty.
    pub fn pop_result(&mut self) -> TranslationResult {
        self.results.pop().expect("pop_result on an empty translation result stack")
    }

    #[must_use]
    pub fn peek_result(&self) -> Option<&TranslationResult> {
        self.results.last()
    }

    #[must_use]
    pub fn results_len(&self) -> usize {
        self.results.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_and_translate_agree_on_page_offset() {
        let result = TranslationResult::new(0xC000_0000, 0x8000_0000, 4, PageSize::Size4KiB);
        assert!(result.contains(0xC000_0FFE));
        assert!(!result.contains(0xC000_1000));
        assert_eq!(result.translate(0xC000_0FFE) & result.page_index_mask(), 0xFFE);
    }

    #[test]
    fn reset_clears_both_stacks() {
        let mut state = TranslationState::new();
        state.push_request(TranslationRequest::aligned(0x1000, 4));
        state.reset();
        assert_eq!(state.requests_len(), 0);
        assert_eq!(state.results_len(), 0, "reset() yields both empty");
    }

    #[test]
    fn results_accumulate_only_once_requests_drain() {
        let mut state = TranslationState::new();
        state.push_request(TranslationRequest::aligned(0x1000, 4));
        let req = state.pop_request();
        let result =
            TranslationResult::new(req.vaddr(), req.vaddr(), req.access_size(), PageSize::Size4KiB);
        state.push_result(result);
        assert_eq!(state.requests_len(), 0);
        assert_eq!(state.results_len(), 1);
    }

    #[test]
    #[should_panic(expected = "pop_request on an empty translation request stack")]
    fn pop_request_on_empty_stack_panics() {
        let mut state = TranslationState::new();
        state.pop_request();
    }

    #[test]
    #[should_panic(expected = "access_size must be nonzero")]
    fn zero_access_size_is_rejected() {
        TranslationRequest::new(0, 0, false, 0);
    }
}
