mod common;

use assessment_functions::functions::average::{ASSESSMENTS, KNOWLEDGE, STRENGTH};
use assessment_functions::functions::{
    AuthContext, AverageResult, CallableError, CallableRequest, handle_average,
};
use assessment_functions::store::{FieldValue, InMemoryStore};
use common::{
    FailingStore, FlakyReadStore, ShuffledStore, assessment, fields, period, reference, signed_in,
};
use serde_json::json;

fn knowledge(correct_responses: FieldValue) -> assessment_functions::store::Fields {
    fields([("correct_responses", correct_responses)])
}

#[tokio::test]
async fn test_knowledge_average_of_two_documents() {
    let store = InMemoryStore::new();
    store.insert(ASSESSMENTS, "a1", assessment(3, 2024, "knowledge_id", reference("knowledge", "k1")));
    store.insert(ASSESSMENTS, "a2", assessment(3, 2024, "knowledge_id", reference("knowledge", "k2")));
    store.insert("knowledge", "k1", knowledge(8.into()));
    store.insert("knowledge", "k2", knowledge(4.into()));

    let result = handle_average(&store, &KNOWLEDGE, &signed_in(period(3, 2024)), 4)
        .await
        .unwrap();

    assert_eq!(result, AverageResult { average: 6.0, count: 2 });
}

#[tokio::test]
async fn test_no_assessments_for_period() {
    let store = InMemoryStore::new();
    store.insert(ASSESSMENTS, "a1", assessment(4, 2024, "knowledge_id", reference("knowledge", "k1")));
    store.insert("knowledge", "k1", knowledge(8.into()));

    let result = handle_average(&store, &KNOWLEDGE, &signed_in(period(3, 2024)), 4)
        .await
        .unwrap();

    assert_eq!(result, AverageResult::empty());
    // Only the assessment query ran.
    assert_eq!(store.operations(), 1);
}

#[tokio::test]
async fn test_reference_to_missing_document() {
    let store = InMemoryStore::new();
    store.insert(ASSESSMENTS, "a1", assessment(3, 2024, "knowledge_id", reference("knowledge", "gone")));

    let result = handle_average(&store, &KNOWLEDGE, &signed_in(period(3, 2024)), 4)
        .await
        .unwrap();

    assert_eq!(result, AverageResult { average: 0.0, count: 0 });
}

#[tokio::test]
async fn test_malformed_references_are_skipped_without_reads() {
    let store = InMemoryStore::new();
    store.insert(ASSESSMENTS, "a1", assessment(3, 2024, "knowledge_id", FieldValue::from("k1")));
    store.insert(ASSESSMENTS, "a2", assessment(3, 2024, "knowledge_id", FieldValue::Null));
    store.insert(ASSESSMENTS, "a3", assessment(3, 2024, "other_field", reference("knowledge", "k1")));
    store.insert("knowledge", "k1", knowledge(8.into()));

    let result = handle_average(&store, &KNOWLEDGE, &signed_in(period(3, 2024)), 4)
        .await
        .unwrap();

    assert_eq!(result, AverageResult::empty());
    assert_eq!(store.operations(), 1);
}

#[tokio::test]
async fn test_non_numeric_values_do_not_count_as_zero() {
    let store = InMemoryStore::new();
    let docs = [
        ("k1", knowledge(9.into())),
        ("k2", knowledge(3.0.into())),
        ("k3", knowledge(FieldValue::Null)),
        ("k4", knowledge(FieldValue::from("7"))),
        ("k5", fields([("other", 100.into())])),
    ];
    for (i, (id, doc)) in docs.into_iter().enumerate() {
        store.insert(
            ASSESSMENTS,
            &format!("a{i}"),
            assessment(3, 2024, "knowledge_id", reference("knowledge", id)),
        );
        store.insert("knowledge", id, doc);
    }

    let result = handle_average(&store, &KNOWLEDGE, &signed_in(period(3, 2024)), 2)
        .await
        .unwrap();

    assert_eq!(result, AverageResult { average: 6.0, count: 2 });
}

#[tokio::test]
async fn test_shared_reference_counts_per_assessment_and_reads_once() {
    let store = InMemoryStore::new();
    store.insert(ASSESSMENTS, "a1", assessment(3, 2024, "knowledge_id", reference("knowledge", "k1")));
    store.insert(ASSESSMENTS, "a2", assessment(3, 2024, "knowledge_id", reference("knowledge", "k1")));
    store.insert(ASSESSMENTS, "a3", assessment(3, 2024, "knowledge_id", reference("knowledge", "k2")));
    store.insert("knowledge", "k1", knowledge(10.into()));
    store.insert("knowledge", "k2", knowledge(1.into()));

    let result = handle_average(&store, &KNOWLEDGE, &signed_in(period(3, 2024)), 4)
        .await
        .unwrap();

    assert_eq!(result, AverageResult { average: 7.0, count: 3 });
    // One query plus one read per distinct document.
    assert_eq!(store.operations(), 3);
}

#[tokio::test]
async fn test_strength_average_uses_its_own_fields() {
    let store = InMemoryStore::new();
    store.insert(ASSESSMENTS, "a1", assessment(11, 2023, "strengthId", reference("strength", "s1")));
    store.insert(ASSESSMENTS, "a2", assessment(11, 2023, "strengthId", reference("strength", "s2")));
    store.insert(ASSESSMENTS, "a3", assessment(11, 2023, "knowledge_id", reference("knowledge", "k1")));
    store.insert("strength", "s1", fields([("elapsed_time", 30.5.into())]));
    store.insert("strength", "s2", fields([("elapsed_time", 20.5.into())]));
    store.insert("knowledge", "k1", knowledge(1000.into()));

    let result = handle_average(&store, &STRENGTH, &signed_in(period(11, 2023)), 4)
        .await
        .unwrap();

    assert_eq!(result, AverageResult { average: 25.5, count: 2 });
}

#[tokio::test]
async fn test_result_independent_of_completion_order() {
    let inner = InMemoryStore::new();
    let values = [5, 1, 9, 3, 7, 2, 8, 4, 6, 10];
    for (i, value) in values.iter().enumerate() {
        let id = format!("k{i}");
        inner.insert(
            ASSESSMENTS,
            &format!("a{i}"),
            assessment(6, 2025, "knowledge_id", reference("knowledge", &id)),
        );
        inner.insert("knowledge", &id, knowledge(FieldValue::Integer(*value)));
    }
    let store = ShuffledStore { inner };

    for concurrency in [1, 3, 16] {
        let result = handle_average(&store, &KNOWLEDGE, &signed_in(period(6, 2025)), concurrency)
            .await
            .unwrap();
        assert_eq!(result, AverageResult { average: 5.5, count: 10 });
    }
}

#[tokio::test]
async fn test_unauthenticated_touches_nothing() {
    let store = InMemoryStore::new();
    let anonymous = CallableRequest::new(None, period(3, 2024));

    for metric in [&KNOWLEDGE, &STRENGTH] {
        let err = handle_average(&store, metric, &anonymous, 4).await.unwrap_err();
        assert_eq!(err, CallableError::Unauthenticated);
    }
    assert_eq!(store.operations(), 0);
}

#[tokio::test]
async fn test_empty_uid_is_unauthenticated() {
    let store = InMemoryStore::new();
    let request = CallableRequest::new(Some(AuthContext::default()), period(3, 2024));

    let err = handle_average(&store, &KNOWLEDGE, &request, 4).await.unwrap_err();
    assert_eq!(err, CallableError::Unauthenticated);
}

#[tokio::test]
async fn test_auth_is_checked_before_arguments() {
    let store = InMemoryStore::new();
    let request = CallableRequest::new(None, json!({}));

    let err = handle_average(&store, &KNOWLEDGE, &request, 4).await.unwrap_err();
    assert_eq!(err, CallableError::Unauthenticated);
}

#[tokio::test]
async fn test_invalid_arguments_touch_nothing() {
    let store = InMemoryStore::new();
    let payloads = [
        json!({"thisMonth": 0, "thisYear": 2024}),
        json!({"thisMonth": 3, "thisYear": 0}),
        json!({"thisMonth": false, "thisYear": 2024}),
        json!({"thisMonth": 3, "thisYear": ""}),
        json!({"thisMonth": null, "thisYear": 2024}),
        json!({"thisYear": 2024}),
        json!({"thisMonth": 3}),
        json!(null),
    ];

    for data in payloads {
        let err = handle_average(&store, &STRENGTH, &signed_in(data), 4)
            .await
            .unwrap_err();
        assert!(matches!(err, CallableError::InvalidArgument(_)));
        assert_eq!(err.status(), "INVALID_ARGUMENT");
    }
    assert_eq!(store.operations(), 0);
}

#[tokio::test]
async fn test_truthy_non_integer_period_matches_nothing() {
    let store = InMemoryStore::new();
    store.insert(ASSESSMENTS, "a1", assessment(3, 2024, "knowledge_id", reference("knowledge", "k1")));
    store.insert("knowledge", "k1", knowledge(8.into()));
    let payloads = [
        json!({"thisMonth": "3", "thisYear": 2024}),
        json!({"thisMonth": true, "thisYear": 2024}),
        json!({"thisMonth": 3.5, "thisYear": 2024}),
        json!({"thisMonth": 3, "thisYear": "2024"}),
    ];

    for data in payloads {
        let result = handle_average(&store, &KNOWLEDGE, &signed_in(data.clone()), 4)
            .await
            .unwrap();
        assert_eq!(result, AverageResult::empty(), "{data}");
    }
    // One assessment query per call, nothing else.
    assert_eq!(store.operations(), 4);
}

#[tokio::test]
async fn test_integral_float_period_matches_integer_fields() {
    let store = InMemoryStore::new();
    store.insert(ASSESSMENTS, "a1", assessment(3, 2024, "knowledge_id", reference("knowledge", "k1")));
    store.insert("knowledge", "k1", knowledge(8.into()));

    let data = json!({"thisMonth": 3.0, "thisYear": 2024});
    let result = handle_average(&store, &KNOWLEDGE, &signed_in(data), 4)
        .await
        .unwrap();

    assert_eq!(result, AverageResult { average: 8.0, count: 1 });
}

#[tokio::test]
async fn test_store_failure_is_opaque_internal_error() {
    let err = handle_average(&FailingStore, &KNOWLEDGE, &signed_in(period(3, 2024)), 4)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        CallableError::Internal("Error calculating knowledge average.".to_string())
    );
    assert!(!err.to_string().contains("connection reset"));
}

#[tokio::test]
async fn test_failed_point_read_fails_whole_request() {
    let inner = InMemoryStore::new();
    inner.insert(ASSESSMENTS, "a1", assessment(3, 2024, "strengthId", reference("strength", "s1")));
    inner.insert(ASSESSMENTS, "a2", assessment(3, 2024, "strengthId", reference("strength", "s2")));
    inner.insert("strength", "s1", fields([("elapsed_time", 10.into())]));
    inner.insert("strength", "s2", fields([("elapsed_time", 20.into())]));
    let store = FlakyReadStore {
        inner,
        broken_id: "s2",
    };

    let err = handle_average(&store, &STRENGTH, &signed_in(period(3, 2024)), 4)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        CallableError::Internal("Error calculating strength average.".to_string())
    );
}
