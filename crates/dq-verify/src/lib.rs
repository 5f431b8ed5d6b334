//! # dq-verify: proofs for DYNQ
//!
//! Kani harnesses over the page arithmetic and the operator catalog.
//! Every property is checked for all inputs in range, not sampled.
//!
//! # Proof: Page Window
//!
//! For any requested page and take, the clamped take lies in
//! `(0, max_take]`, the offset is `page * take`, and the metadata flags
//! agree with the page count derived from the total.

extern crate dq_core;

#[cfg(kani)]
use dq_core::{Operator, PageLimits};

#[cfg(kani)]
mod proofs {
    use super::*;

    /// Limits with a small, arbitrary maximum.
    fn any_limits() -> PageLimits {
        let default_take: u64 = kani::any();
        let max_take: u64 = kani::any();
        kani::assume(default_take <= 1000 && max_take <= 1000);
        PageLimits::new(default_take, max_take)
    }

    /// **Proof: Limit Normalisation**
    ///
    /// The default is never zero and never above the maximum.
    #[kani::proof]
    fn verify_limits_normalised() {
        let limits = any_limits();
        assert!(limits.default_take() > 0);
        assert!(limits.default_take() <= limits.max_take());
    }

    /// **Proof: Take Bounds**
    ///
    /// Whatever the client asks for, the take used for the read is positive
    /// and within the maximum. Pages are never negative.
    #[kani::proof]
    fn verify_take_bounds() {
        let limits = any_limits();
        let page = limits.page(kani::any(), kani::any());
        assert!(page.take() > 0);
        assert!(page.take() <= limits.max_take());
    }

    /// **Proof: Offset**
    ///
    /// Without overflow the offset is exactly `page * take`.
    #[kani::proof]
    fn verify_offset() {
        let limits = any_limits();
        let requested: i64 = kani::any();
        kani::assume((0..=1_000_000).contains(&requested));
        let page = limits.page(Some(requested), kani::any());
        assert_eq!(page.offset(), requested as u64 * page.take());
        assert_eq!(page.window().limit, page.take());
        assert_eq!(page.window().offset, page.offset());
    }

    /// **Proof: Page Metadata**
    ///
    /// `page_count = ceil(total / take)`, a next page exists iff
    /// `page + 1 < page_count`, a previous page iff `page > 0`.
    #[kani::proof]
    fn verify_meta_flags() {
        let limits = any_limits();
        let requested: i64 = kani::any();
        kani::assume((0..=10_000).contains(&requested));
        let page = limits.page(Some(requested), kani::any());

        let total: u64 = kani::any();
        kani::assume(total <= 1_000_000);
        let items: usize = kani::any();
        kani::assume(items as u64 <= page.take());

        let meta = page.meta(items, total);
        assert!(meta.page_count * page.take() >= total);
        if total > 0 {
            assert!((meta.page_count - 1) * page.take() < total);
        } else {
            assert_eq!(meta.page_count, 0);
        }
        assert_eq!(meta.has_next_page, page.page() + 1 < meta.page_count);
        assert_eq!(meta.has_previous_page, page.page() > 0);
        assert_eq!(meta.item_count, items as u64);
    }

    /// **Proof: Catalog Keywords**
    ///
    /// Every operator is found again by its own keyword, so the catalog
    /// has no shadowed or duplicate entries.
    #[kani::proof]
    #[kani::unwind(17)]
    fn verify_keyword_round_trip() {
        let i: usize = kani::any();
        kani::assume(i < Operator::ALL.len());
        let op = Operator::ALL[i];
        assert!(matches!(Operator::from_keyword(op.keyword()), Ok(found) if found == op));
    }
}

#[cfg(not(kani))]
pub fn _proof_placeholder() {
    // Kani proofs are compiled only under cfg(kani).
    // Run `cargo kani --package dq-verify` to execute proofs.
}
