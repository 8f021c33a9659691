//! Concurrent posting stress tests.
//!
//! These tests verify that:
//! - Concurrent posts in one tenant receive distinct, gap-free numbers
//! - Racing a post against a void of the same entry leaves one consistent outcome
//! - Balances after concurrent activity equal the sum of what was posted

#![allow(clippy::uninlined_format_args)]

mod common;

use std::collections::HashSet;
use std::sync::Arc;

use common::{cash_sale, date, ledger, usd_tenant};
use futures::future::join_all;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tally_core::ledger::EntryStatus;
use tally_shared::types::ActorId;
use tokio::sync::Barrier;

const CONCURRENT_POSTS: usize = 25;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_posts_receive_distinct_numbers() {
    let Some(core) = ledger().await else { return };
    let core = Arc::new(core);
    let tenant = usd_tenant(&core).await;
    let actor = ActorId::new();
    let on = date(2024, 9, 1);

    let mut drafts = Vec::with_capacity(CONCURRENT_POSTS);
    for _ in 0..CONCURRENT_POSTS {
        let draft = core
            .create_draft(tenant.id, cash_sale(on, dec!(10), actor))
            .await
            .unwrap();
        drafts.push(draft.id);
    }

    let barrier = Arc::new(Barrier::new(CONCURRENT_POSTS));
    let handles: Vec<_> = drafts
        .into_iter()
        .map(|id| {
            let core = Arc::clone(&core);
            let barrier = Arc::clone(&barrier);
            tokio::spawn(async move {
                barrier.wait().await;
                core.post(tenant.id, id, actor).await
            })
        })
        .collect();

    let mut numbers = HashSet::new();
    for result in join_all(handles).await {
        let number = result.expect("task panicked").expect("post failed");
        assert!(numbers.insert(number.to_string()), "duplicate number {}", number);
    }

    let expected: HashSet<String> = (1..=CONCURRENT_POSTS)
        .map(|n| format!("JE-{:05}", n))
        .collect();
    assert_eq!(numbers, expected);

    let cash = core.resolve_account(tenant.id, "1000").await.unwrap();
    let balance = core.account_balance(tenant.id, cash.id, on).await.unwrap();
    assert_eq!(balance.balance, Decimal::from(CONCURRENT_POSTS as u64) * dec!(10));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_racing_voids_produce_one_reversal() {
    let Some(core) = ledger().await else { return };
    let core = Arc::new(core);
    let tenant = usd_tenant(&core).await;
    let actor = ActorId::new();
    let on = date(2024, 9, 2);

    let draft = core
        .create_draft(tenant.id, cash_sale(on, dec!(40), actor))
        .await
        .unwrap();
    core.post(tenant.id, draft.id, actor).await.unwrap();

    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = (0..2)
        .map(|i| {
            let core = Arc::clone(&core);
            let barrier = Arc::clone(&barrier);
            tokio::spawn(async move {
                barrier.wait().await;
                core.void(tenant.id, draft.id, actor, &format!("void attempt {}", i))
                    .await
            })
        })
        .collect();

    let results: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|r| r.expect("task panicked"))
        .collect();
    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(succeeded, 1, "{results:?}");

    let original = core.get_entry(tenant.id, draft.id).await.unwrap();
    assert_eq!(original.status, EntryStatus::Voided);

    let cash = core.resolve_account(tenant.id, "1000").await.unwrap();
    let balance = core.account_balance(tenant.id, cash.id, on).await.unwrap();
    assert_eq!(balance.balance, Decimal::ZERO);
}
