//! End-to-end verification scenarios through `DeliveryVerifier`.
//!
//! Sources are scripted fakes; chains are ungated so every call reaches the
//! sources. Gate behaviour is covered in `cooldown_gate.rs`.

use std::sync::Arc;
use std::time::Duration;

use delivery_core::source::fakes::ScriptedSource;
use delivery_core::{
    Asset, AssetSource, DeliveryExpectation, DeliveryStatus, DeliveryVerifier, FallbackChain,
    FetchOutcome, StaticContainerCatalog, VerifierConfig, VerifyError,
};

const BUYER: &str = "76561198088587178";
const ITEM: &str = "Cannonroar Confessor";

fn source(id: &str, outcome: FetchOutcome) -> Arc<ScriptedSource> {
    Arc::new(ScriptedSource::new(id).default_outcome(outcome))
}

fn verifier(sources: &[&Arc<ScriptedSource>]) -> DeliveryVerifier {
    verifier_with(sources, VerifierConfig::default())
}

fn verifier_with(sources: &[&Arc<ScriptedSource>], config: VerifierConfig) -> DeliveryVerifier {
    let chain = FallbackChain::ungated(
        sources
            .iter()
            .map(|s| Arc::clone(s) as Arc<dyn AssetSource>)
            .collect(),
    );
    DeliveryVerifier::new(chain, config)
}

fn gifted_item() -> Asset {
    Asset::new(ITEM)
        .with_gift_from("kudarap")
        .with_date_received("2023-04-01")
        .with_dedication("enjoy")
}

// ===========================================================================
// Named scenarios
// ===========================================================================

#[tokio::test]
async fn scenario_a_sender_verified() {
    let steam = source("steam", FetchOutcome::Success(vec![gifted_item()]));
    let result = verifier(&[&steam])
        .verify_delivery(&DeliveryExpectation::new("kudarap", BUYER, ITEM))
        .await
        .unwrap();

    assert_eq!(result.status, DeliveryStatus::SenderVerified);
    assert_eq!(result.matched_assets, vec![gifted_item()]);
    assert_eq!(result.verified_by, "steam");
}

#[tokio::test]
async fn scenario_b_name_verified_for_other_seller() {
    let steam = source("steam", FetchOutcome::Success(vec![gifted_item()]));
    let result = verifier(&[&steam])
        .verify_delivery(&DeliveryExpectation::new("someoneElse", BUYER, ITEM))
        .await
        .unwrap();

    assert_eq!(result.status, DeliveryStatus::NameVerified);
    assert_eq!(result.matched_assets, vec![gifted_item()]);
}

#[tokio::test]
async fn scenario_c_empty_inventory_is_no_hit() {
    let steam = source("steam", FetchOutcome::Success(vec![]));
    let result = verifier(&[&steam])
        .verify_delivery(&DeliveryExpectation::new("kudarap", BUYER, ITEM))
        .await
        .unwrap();

    assert_eq!(result.status, DeliveryStatus::NoHit);
    assert!(result.matched_assets.is_empty());
    assert_eq!(result.verified_by, "steam");
}

#[tokio::test]
async fn scenario_d_private_without_fallback() {
    let steam = source("steam", FetchOutcome::PrivateProfile);
    let result = verifier(&[&steam])
        .verify_delivery(&DeliveryExpectation::new("kudarap", BUYER, ITEM))
        .await
        .unwrap();

    assert_eq!(result.status, DeliveryStatus::Private);
    assert!(result.matched_assets.is_empty());
    assert_eq!(result.verified_by, "");
}

#[tokio::test]
async fn scenario_e_fallback_after_transient_error() {
    let primary = source("primary", FetchOutcome::TransientError("502 bad gateway".into()));
    let secondary = source("secondary", FetchOutcome::Success(vec![gifted_item()]));
    let result = verifier(&[&primary, &secondary])
        .verify_delivery(&DeliveryExpectation::new("kudarap", BUYER, ITEM))
        .await
        .unwrap();

    assert_eq!(result.status, DeliveryStatus::SenderVerified);
    assert_eq!(result.verified_by, "secondary");
    assert_eq!(primary.calls(), 1);
}

// ===========================================================================
// Properties
// ===========================================================================

#[tokio::test]
async fn all_private_chain_is_private() {
    for len in 1..=4 {
        let sources: Vec<Arc<ScriptedSource>> = (0..len)
            .map(|i| source(&format!("s{i}"), FetchOutcome::PrivateProfile))
            .collect();
        let refs: Vec<&Arc<ScriptedSource>> = sources.iter().collect();

        let result = verifier(&refs)
            .verify_delivery(&DeliveryExpectation::new("kudarap", BUYER, ITEM))
            .await
            .unwrap();
        assert_eq!(result.status, DeliveryStatus::Private);
        assert!(result.matched_assets.is_empty());
        for s in &sources {
            assert_eq!(s.calls(), 1, "every link is consulted");
        }
    }
}

#[tokio::test]
async fn empty_first_snapshot_is_no_hit() {
    let first = source("first", FetchOutcome::Success(vec![]));
    let second = source("second", FetchOutcome::PrivateProfile);
    let result = verifier(&[&first, &second])
        .verify_delivery(&DeliveryExpectation::new("kudarap", BUYER, ITEM))
        .await
        .unwrap();

    assert_eq!(result.status, DeliveryStatus::NoHit);
    assert_eq!(result.verified_by, "first");
}

#[tokio::test]
async fn adding_sources_never_lowers_confidence() {
    let expectation = DeliveryExpectation::new("kudarap", BUYER, ITEM);
    let candidates = [
        FetchOutcome::PrivateProfile,
        FetchOutcome::TransientError("timeout".into()),
        FetchOutcome::Success(vec![]),
        FetchOutcome::Success(vec![Asset::new(ITEM)]),
        FetchOutcome::Success(vec![gifted_item()]),
    ];

    for single in &candidates {
        let alone = source("alone", single.clone());
        let baseline = verifier(&[&alone]).verify_delivery(&expectation).await;

        for extra in &candidates {
            for extra_first in [true, false] {
                let main = source("alone", single.clone());
                let other = source("other", extra.clone());
                let chain: [&Arc<ScriptedSource>; 2] = if extra_first {
                    [&other, &main]
                } else {
                    [&main, &other]
                };
                let combined = verifier(&chain).verify_delivery(&expectation).await;

                if let Ok(base) = &baseline {
                    let got = combined
                        .as_ref()
                        .expect("a chain containing an answering source must answer");
                    assert!(
                        got.status >= base.status,
                        "{:?} + {:?} lowered {} to {}",
                        single,
                        extra,
                        base.status,
                        got.status
                    );
                }
            }
        }
    }
}

#[tokio::test]
async fn verification_is_repeatable() {
    let steam = source(
        "steam",
        FetchOutcome::Success(vec![Asset::new(ITEM), gifted_item()]),
    );
    let v = verifier(&[&steam]);
    let e = DeliveryExpectation::new("kudarap", BUYER, ITEM);

    let first = v.verify_delivery(&e).await.unwrap();
    let second = v.verify_delivery(&e).await.unwrap();
    assert_eq!(first.status, second.status);
    assert_eq!(first.matched_assets, second.matched_assets);
    assert_eq!(first.verified_by, second.verified_by);
}

// ===========================================================================
// Errors
// ===========================================================================

#[tokio::test]
async fn all_transient_is_retryable_chain_exhausted() {
    let a = source("a", FetchOutcome::TransientError("503".into()));
    let b = source("b", FetchOutcome::TransientError("connection reset".into()));
    let err = verifier(&[&a, &b])
        .verify_delivery(&DeliveryExpectation::new("kudarap", BUYER, ITEM))
        .await
        .unwrap_err();

    assert!(err.is_retryable());
    assert_eq!(
        err,
        VerifyError::ChainExhausted {
            tried: 2,
            last_error: "b: connection reset".to_string()
        }
    );
}

#[tokio::test]
async fn invalid_expectation_rejected_before_fetch() {
    let steam = source("steam", FetchOutcome::Success(vec![]));
    let v = verifier(&[&steam]);

    let err = v
        .verify_delivery(&DeliveryExpectation::new("kudarap", BUYER, ""))
        .await
        .unwrap_err();
    assert!(matches!(err, VerifyError::InvalidExpectation(_)));
    assert!(!err.is_retryable());

    let err = v.verify_inventory("", ITEM).await.unwrap_err();
    assert!(matches!(err, VerifyError::InvalidExpectation(_)));
    assert_eq!(steam.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn deadline_is_distinct_from_exhaustion() {
    let slow = Arc::new(ScriptedSource::new("slow").with_latency(Duration::from_secs(60)));
    let config = VerifierConfig {
        deadline_ms: 1_000,
        ..VerifierConfig::default()
    };
    let err = verifier_with(&[&slow], config)
        .verify_delivery(&DeliveryExpectation::new("kudarap", BUYER, ITEM))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        VerifyError::DeadlineExceeded {
            deadline_ms: 1_000,
            tried: 1
        }
    );
    assert!(err.is_retryable());
}

#[tokio::test(start_paused = true)]
async fn private_outranks_deadline() {
    let private = source("private", FetchOutcome::PrivateProfile);
    let slow = Arc::new(ScriptedSource::new("slow").with_latency(Duration::from_secs(60)));
    let config = VerifierConfig {
        deadline_ms: 1_000,
        ..VerifierConfig::default()
    };
    let result = verifier_with(&[&private, &slow], config)
        .verify_delivery(&DeliveryExpectation::new("kudarap", BUYER, ITEM))
        .await
        .unwrap();
    assert_eq!(result.status, DeliveryStatus::Private);
}

// ===========================================================================
// Inventory checks, containers, batches
// ===========================================================================

#[tokio::test]
async fn inventory_check_ignores_gift_notes() {
    let steam = source("steam", FetchOutcome::Success(vec![gifted_item()]));
    let result = verifier(&[&steam]).verify_inventory(BUYER, ITEM).await.unwrap();
    assert_eq!(result.status, DeliveryStatus::NameVerified);
    assert_eq!(result.matched_assets, vec![gifted_item()]);
}

#[tokio::test]
async fn container_counts_through_catalog() {
    let chest = Asset::container("Immortal Treasure I 2023").with_gift_from("kudarap");
    let steam = source("steam", FetchOutcome::Success(vec![chest.clone()]));
    let catalog = StaticContainerCatalog::new().with_bundle("Immortal Treasure I 2023", [ITEM]);
    let v = verifier(&[&steam]).with_catalog(Arc::new(catalog));

    let result = v
        .verify_delivery(&DeliveryExpectation::new("kudarap", BUYER, ITEM))
        .await
        .unwrap();
    assert_eq!(result.status, DeliveryStatus::SenderVerified);
    assert_eq!(result.matched_assets, vec![chest]);
}

#[tokio::test]
async fn batch_keeps_input_order() {
    let steam = Arc::new(
        ScriptedSource::new("steam")
            .default_outcome(FetchOutcome::Success(vec![]))
            .script("buyer-a", [FetchOutcome::Success(vec![gifted_item()])])
            .script("buyer-b", [FetchOutcome::PrivateProfile])
            .script("buyer-c", [FetchOutcome::TransientError("503".into())]),
    );
    let config = VerifierConfig {
        max_concurrency: 2,
        ..VerifierConfig::default()
    };
    let v = verifier_with(&[&steam], config);

    let results = v
        .verify_batch(&[
            DeliveryExpectation::new("kudarap", "buyer-a", ITEM),
            DeliveryExpectation::new("kudarap", "buyer-b", ITEM),
            DeliveryExpectation::new("kudarap", "buyer-c", ITEM),
            DeliveryExpectation::new("kudarap", "buyer-d", ITEM),
            DeliveryExpectation::new("kudarap", "buyer-e", ""),
        ])
        .await;

    assert_eq!(results.len(), 5);
    assert_eq!(
        results[0].as_ref().unwrap().status,
        DeliveryStatus::SenderVerified
    );
    assert_eq!(results[1].as_ref().unwrap().status, DeliveryStatus::Private);
    assert!(results[2].as_ref().unwrap_err().is_retryable());
    assert_eq!(results[3].as_ref().unwrap().status, DeliveryStatus::NoHit);
    assert!(matches!(
        results[4],
        Err(VerifyError::InvalidExpectation(_))
    ));
}
