use std::sync::Arc;
use std::time::Duration;

use arbfill::adapter::outbound::queue::MemoryQueueStore;
use arbfill::application::{ProcessOutcome, RouterConfig};
use arbfill::domain::{DeliveryPayload, SourcePlatform, TaskStatus, TransactionState};
use arbfill::error::{RefundError, SourceError};
use arbfill::port::outbound::notifier::Event;
use arbfill::port::outbound::queue::ManualQueueStore;
use arbfill::testkit::config;
use arbfill::testkit::domain::listing_record;
use arbfill::testkit::doubles::{FlakyQueue, ScriptedPaymentProcessor, ScriptedSource};
use arbfill::testkit::harness::Harness;
use serde_json::json;

#[tokio::test]
async fn automated_sale_completes_with_profit() {
    let source = Arc::new(ScriptedSource::ok_json(json!({"image": "fox.png"})));
    let harness = Harness::builder()
        .automated(SourcePlatform::RapidApi, source.clone())
        .build();
    let tx = harness
        .sale(listing_record("img", "rapidapi", 800), 1500)
        .await;

    let outcome = harness.router.process(tx.id).await.unwrap();

    let ProcessOutcome::Completed(done) = outcome else {
        panic!("expected completion, got {outcome:?}");
    };
    assert_eq!(done.state, TransactionState::Completed);
    assert_eq!(done.source_platform, Some(SourcePlatform::RapidApi));
    let profit = done.profit.as_ref().unwrap();
    assert_eq!(profit.net_profit, 536);
    assert!(done.completed_at.is_some());
    assert_eq!(
        done.output.as_ref().map(|o| &o.payload),
        Some(&DeliveryPayload::ApiResult {
            data: json!({"image": "fox.png"})
        })
    );
    assert_eq!(source.calls(), 1);
    assert_eq!(harness.payments.calls(), 0);
    assert_eq!(harness.notifier.names(), vec!["transaction_completed"]);
}

#[tokio::test]
async fn processing_twice_is_rejected_without_a_second_call() {
    let source = Arc::new(ScriptedSource::ok_json(json!({})));
    let harness = Harness::builder()
        .automated(SourcePlatform::RapidApi, source.clone())
        .build();
    let tx = harness
        .sale(listing_record("img", "rapidapi", 800), 1500)
        .await;

    harness.router.process(tx.id).await.unwrap();
    let err = harness.router.process(tx.id).await.unwrap_err();

    assert_eq!(err.code(), "ALREADY_TERMINAL");
    assert_eq!(source.calls(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_process_calls_reach_the_source_once() {
    let source = Arc::new(
        ScriptedSource::ok_json(json!({"ok": true})).with_delay(Duration::from_millis(50)),
    );
    let harness = Harness::builder()
        .automated(SourcePlatform::HuggingFace, source.clone())
        .build();
    let tx = harness
        .sale(listing_record("space", "huggingface", 300), 1000)
        .await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let router = Arc::clone(&harness.router);
        handles.push(tokio::spawn(async move { router.process(tx.id).await }));
    }

    let mut completed = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(ProcessOutcome::Completed(_)) => completed += 1,
            Ok(other) => panic!("unexpected outcome {other:?}"),
            Err(err) => {
                assert!(
                    matches!(err.code(), "ALREADY_PROCESSING" | "ALREADY_TERMINAL"),
                    "unexpected error {err}"
                );
                rejected += 1;
            }
        }
    }
    assert_eq!(completed, 1);
    assert_eq!(rejected, 7);
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn source_failure_refunds_the_buyer_in_full() {
    let source = Arc::new(ScriptedSource::failing(SourceError::CallFailed {
        status: 500,
        body: "boom".into(),
    }));
    let harness = Harness::builder()
        .automated(SourcePlatform::RapidApi, source.clone())
        .build();
    let tx = harness
        .sale(listing_record("img", "rapidapi", 800), 1500)
        .await;

    let outcome = harness.router.process(tx.id).await.unwrap();

    let ProcessOutcome::Refunded {
        transaction, code, ..
    } = outcome
    else {
        panic!("expected refund");
    };
    assert_eq!(code, "SOURCE_CALL_FAILED");
    assert_eq!(transaction.state, TransactionState::Refunded);
    assert!(transaction.refund_reference.is_some());
    assert!(transaction.profit.is_none());
    assert_eq!(harness.payments.refunded_amounts(), vec![1500]);
    assert_eq!(source.calls(), 1);
    assert_eq!(
        harness.notifier.names(),
        vec!["fulfillment_failed", "refund_issued"]
    );
}

#[tokio::test]
async fn timeout_is_not_retried() {
    let source = Arc::new(ScriptedSource::failing(SourceError::Timeout {
        timeout_ms: 30_000,
    }));
    let harness = Harness::builder()
        .automated(SourcePlatform::RapidApi, source.clone())
        .config(RouterConfig {
            source_max_attempts: 3,
            ..config::router()
        })
        .build();
    let tx = harness
        .sale(listing_record("img", "rapidapi", 800), 1500)
        .await;

    let outcome = harness.router.process(tx.id).await.unwrap();
    assert!(matches!(
        outcome,
        ProcessOutcome::Refunded {
            code: "SOURCE_TIMEOUT",
            ..
        }
    ));
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn unreachable_source_is_retried_within_budget() {
    let source = Arc::new(
        ScriptedSource::ok_json(json!({"ok": true})).with_script(vec![Err(
            SourceError::Unreachable("connection refused".into()),
        )]),
    );
    let harness = Harness::builder()
        .automated(SourcePlatform::RapidApi, source.clone())
        .config(RouterConfig {
            source_max_attempts: 2,
            ..config::router()
        })
        .build();
    let tx = harness
        .sale(listing_record("img", "rapidapi", 800), 1500)
        .await;

    let outcome = harness.router.process(tx.id).await.unwrap();
    assert!(matches!(outcome, ProcessOutcome::Completed(_)));
    assert_eq!(source.calls(), 2);
}

#[tokio::test]
async fn refund_failure_leaves_refund_failed_with_both_reasons() {
    let harness = Harness::builder()
        .automated(
            SourcePlatform::RapidApi,
            Arc::new(ScriptedSource::failing(SourceError::CallFailed {
                status: 502,
                body: "bad gateway".into(),
            })),
        )
        .payments(Arc::new(ScriptedPaymentProcessor::always_failing(
            RefundError::Rejected {
                status: 400,
                message: "charge disputed".into(),
            },
        )))
        .build();
    let tx = harness
        .sale(listing_record("img", "rapidapi", 800), 1500)
        .await;

    let err = harness.router.process(tx.id).await.unwrap_err();

    assert_eq!(err.code(), "REFUND_FAILED");
    let stored = harness.store.get(tx.id).await.unwrap().unwrap();
    assert_eq!(stored.state, TransactionState::RefundFailed);
    let reason = stored.failure_reason.unwrap();
    assert!(reason.contains("bad gateway"), "{reason}");
    assert!(reason.contains("charge disputed"), "{reason}");
    assert_eq!(
        harness.notifier.names(),
        vec!["fulfillment_failed", "refund_failed"]
    );
}

#[tokio::test]
async fn manual_sale_waits_for_operator_then_completes() {
    let harness = Harness::builder().build();
    let tx = harness
        .sale(listing_record("logo", "fiverr", 2500), 5000)
        .await;

    let outcome = harness.router.process(tx.id).await.unwrap();
    let ProcessOutcome::AwaitingManual { transaction, task } = outcome else {
        panic!("expected manual routing");
    };
    assert_eq!(transaction.state, TransactionState::AwaitingManual);
    assert_eq!(transaction.task_number, Some(task.task_number));
    assert_eq!(task.status, TaskStatus::Pending);
    assert_eq!(task.buyer_paid, 5000);
    assert_eq!(task.source_cost, 2500);
    assert!(task.instructions.contains("fiverr"));

    let done = harness
        .router
        .complete_manual(
            task.task_number,
            DeliveryPayload::File {
                path: "/deliveries/logo.zip".into(),
            },
            Some("three concepts".into()),
        )
        .await
        .unwrap();

    assert_eq!(done.state, TransactionState::Completed);
    assert_eq!(done.profit.as_ref().unwrap().net_profit, 1775);
    assert_eq!(
        done.output.as_ref().and_then(|o| o.notes.as_deref()),
        Some("three concepts")
    );
    let closed = harness.queue.get(task.task_number).await.unwrap();
    assert_eq!(closed.status, TaskStatus::Completed);
    assert_eq!(
        harness.notifier.names(),
        vec!["task_queued", "transaction_completed"]
    );

    let err = harness
        .router
        .complete_manual(
            task.task_number,
            DeliveryPayload::TextResult { body: "again".into() },
            None,
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), "TASK_ALREADY_COMPLETED");

    let first = DeliveryPayload::File {
        path: "/deliveries/logo.zip".into(),
    };
    let stored = harness.store.get(tx.id).await.unwrap().unwrap();
    assert_eq!(stored.output.map(|o| o.payload), Some(first.clone()));
    let task = harness.queue.get(task.task_number).await.unwrap();
    assert_eq!(task.delivery.map(|d| d.payload), Some(first));
}

#[tokio::test]
async fn manual_profit_uses_cost_snapshotted_at_enqueue() {
    let harness = Harness::builder().build();
    let tx = harness
        .sale(listing_record("logo", "fiverr", 2500), 5000)
        .await;
    let ProcessOutcome::AwaitingManual { task, .. } = harness.router.process(tx.id).await.unwrap()
    else {
        panic!("expected manual routing");
    };

    // The seller reprices the gig while the task waits.
    harness.catalog.insert(listing_record("logo", "fiverr", 4000));

    let done = harness
        .router
        .complete_manual(
            task.task_number,
            DeliveryPayload::Url {
                url: "https://files.test/logo.zip".into(),
            },
            None,
        )
        .await
        .unwrap();
    let profit = done.profit.unwrap();
    assert_eq!(profit.source_cost, 2500);
    assert_eq!(profit.net_profit, 1775);
}

#[tokio::test]
async fn manual_completion_rejects_api_result() {
    let harness = Harness::builder().build();
    let tx = harness
        .sale(listing_record("logo", "upwork", 2500), 5000)
        .await;
    let ProcessOutcome::AwaitingManual { task, .. } = harness.router.process(tx.id).await.unwrap()
    else {
        panic!("expected manual routing");
    };

    let err = harness
        .router
        .complete_manual(
            task.task_number,
            DeliveryPayload::ApiResult { data: json!({}) },
            None,
        )
        .await
        .unwrap_err();

    assert_eq!(err.code(), "INVALID_INPUT");
    assert!(harness.queue.get(task.task_number).await.unwrap().is_pending());
}

#[tokio::test]
async fn queue_outage_releases_the_claim() {
    let queue = Arc::new(FlakyQueue::new(Arc::new(MemoryQueueStore::new()), 3));
    let harness = Harness::builder().queue(queue.clone()).build();
    let tx = harness
        .sale(listing_record("logo", "fiverr", 2500), 5000)
        .await;

    let err = harness.router.process(tx.id).await.unwrap_err();
    assert_eq!(err.code(), "QUEUE_UNAVAILABLE");
    assert!(err.is_retryable());
    assert_eq!(queue.enqueue_calls(), 3);

    let stored = harness.store.get(tx.id).await.unwrap().unwrap();
    assert_eq!(stored.state, TransactionState::Pending);
    assert_eq!(harness.payments.calls(), 0);

    let outcome = harness.router.process(tx.id).await.unwrap();
    assert!(matches!(outcome, ProcessOutcome::AwaitingManual { .. }));
    assert_eq!(queue.enqueue_calls(), 4);
}

#[tokio::test]
async fn unknown_listing_fails_and_refunds() {
    let harness = Harness::builder().build();
    let tx = harness
        .sale(listing_record("logo", "fiverr", 2500), 5000)
        .await;
    harness.catalog.remove(&tx.listing);

    let outcome = harness.router.process(tx.id).await.unwrap();
    assert!(matches!(
        outcome,
        ProcessOutcome::Refunded {
            code: "LISTING_NOT_FOUND",
            ..
        }
    ));
}

#[tokio::test]
async fn automated_platform_without_adapter_is_unsupported() {
    let harness = Harness::builder().build();
    let tx = harness
        .sale(listing_record("repo", "github", 1000), 3000)
        .await;

    let outcome = harness.router.process(tx.id).await.unwrap();
    let ProcessOutcome::Refunded {
        transaction, code, ..
    } = outcome
    else {
        panic!("expected refund");
    };
    assert_eq!(code, "UNSUPPORTED_PLATFORM");
    assert_eq!(transaction.source_platform, Some(SourcePlatform::GitHub));
}

#[tokio::test]
async fn sla_breach_alerts_once_and_can_auto_refund() {
    let harness = Harness::builder().build();
    let tx = harness
        .sale(listing_record("logo", "fiverr", 2500), 5000)
        .await;
    let ProcessOutcome::AwaitingManual { task, .. } = harness.router.process(tx.id).await.unwrap()
    else {
        panic!("expected manual routing");
    };

    let monitor = harness.sla(config::sla(24, true));
    let report = monitor
        .sweep_at(task.enqueued_at + chrono::Duration::hours(25))
        .await
        .unwrap();

    assert_eq!(report.breached, vec![task.task_number]);
    assert_eq!(report.refunded, vec![tx.id]);
    let stored = harness.store.get(tx.id).await.unwrap().unwrap();
    assert_eq!(stored.state, TransactionState::Refunded);
    assert!(harness
        .notifier
        .events()
        .iter()
        .any(|e| matches!(e, Event::SlaBreached(sla) if sla.task_number == task.task_number)));

    let again = monitor
        .sweep_at(task.enqueued_at + chrono::Duration::hours(30))
        .await
        .unwrap();
    assert!(again.breached.is_empty());

    let err = harness
        .router
        .complete_manual(
            task.task_number,
            DeliveryPayload::Url {
                url: "https://late.test".into(),
            },
            None,
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), "TASK_CANCELLED");
    let closed = harness.queue.get(task.task_number).await.unwrap();
    assert_eq!(closed.status, TaskStatus::Cancelled);
    assert!(closed.delivery.is_none());
}

#[tokio::test]
async fn stats_reflect_mixed_outcomes() {
    let harness = Harness::builder()
        .automated(
            SourcePlatform::RapidApi,
            Arc::new(ScriptedSource::ok_json(json!({}))),
        )
        .build();
    let auto = harness
        .sale(listing_record("img", "rapidapi", 800), 1500)
        .await;
    let manual = harness
        .sale(listing_record("logo", "fiverr", 2500), 5000)
        .await;
    harness.router.process(auto.id).await.unwrap();
    harness.router.process(manual.id).await.unwrap();

    let stats = arbfill::application::StatsAggregator::new(
        harness.store.clone(),
        harness.queue.clone(),
    );
    let summary = stats.summary().await.unwrap();
    assert_eq!(summary.total_transactions, 2);
    assert_eq!(summary.count(TransactionState::Completed), 1);
    assert_eq!(summary.count(TransactionState::AwaitingManual), 1);
    assert_eq!(summary.total_net_profit, 536);
    assert_eq!(summary.queue_depth, 1);
}
