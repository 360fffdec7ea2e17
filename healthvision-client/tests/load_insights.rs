use healthvision_client::{load_insights, ApiClient};
use healthvision_core::{FailureKind, InsightsConfig, InsightsError, LoadState};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Serve exactly one canned HTTP response and return the base URL.
async fn serve_once(status_line: &'static str, content_type: &'static str, body: String) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind listener");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept");
        let mut buf = vec![0u8; 4096];
        let _ = socket.read(&mut buf).await;
        let response = format!(
            "HTTP/1.1 {status_line}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        socket
            .write_all(response.as_bytes())
            .await
            .expect("write response");
        let _ = socket.shutdown().await;
    });

    format!("http://{addr}")
}

#[tokio::test]
async fn missing_dataset_reports_retrieval_failure() {
    let base = serve_once("404 Not Found", "text/plain", String::new()).await;
    let client = ApiClient::new(&base).expect("client");

    let state = load_insights(
        &client,
        "/healthvisionpro_dataset_1000.csv",
        &InsightsConfig::default(),
    )
    .await;

    assert_eq!(
        state,
        LoadState::Failed {
            kind: FailureKind::Retrieval,
            message: "CSV load error: 404".to_string(),
        }
    );
}

#[tokio::test]
async fn unreachable_host_reports_retrieval_failure_without_status() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    let client = ApiClient::new(&format!("http://{addr}")).expect("client");

    let state = load_insights(&client, "dataset.csv", &InsightsConfig::default()).await;

    assert_eq!(
        state,
        LoadState::Failed {
            kind: FailureKind::Retrieval,
            message: "Failed to load CSV data".to_string(),
        }
    );
}

#[tokio::test]
async fn served_dataset_is_aggregated() {
    let csv = "patients_visited,target_urgent_followup\n3,0\n3,1\n5,0\n".to_string();
    let base = serve_once("200 OK", "text/csv", csv).await;
    let client = ApiClient::new(&base).expect("client");

    let state = load_insights(&client, "dataset.csv", &InsightsConfig::default()).await;

    let insights = match state {
        LoadState::Ready { insights } => insights,
        other => panic!("expected ready state, got {other:?}"),
    };
    assert_eq!(insights.visits.len(), 2);
    assert_eq!(insights.risk.negative, 2);
    assert_eq!(insights.risk.positive, 1);
}

#[tokio::test]
async fn served_dataset_with_bad_header_is_schema_failure() {
    let base = serve_once("200 OK", "text/csv", "age,gender\n40,F\n".to_string()).await;
    let client = ApiClient::new(&base).expect("client");

    let state = load_insights(&client, "dataset.csv", &InsightsConfig::default()).await;

    assert!(matches!(
        state,
        LoadState::Failed { kind: FailureKind::Schema, .. }
    ));
}

#[tokio::test]
async fn backend_detail_is_returned_for_failed_prediction() {
    let body = r#"{"detail": "Patient P-999 not found"}"#.to_string();
    let base = serve_once("404 Not Found", "application/json", body).await;
    let client = ApiClient::new(&base).expect("client");

    let err = client.predict_risk("P-999").await.unwrap_err();

    match err {
        InsightsError::Backend { status, detail } => {
            assert_eq!(status, 404);
            assert_eq!(detail, "Patient P-999 not found");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn patients_by_visits_decodes_typed_records() {
    let body = r#"{
        "requested_count": 4,
        "patients": [
            {"patient_id": "P-008", "patient_name": "Kenji Mori", "visit_count": 4},
            {"patient_id": "P-021", "patient_name": null, "visit_count": 4}
        ]
    }"#
    .to_string();
    let base = serve_once("200 OK", "application/json", body).await;
    let client = ApiClient::new(&base).expect("client");

    let result = client.patients_by_visits(4).await.expect("patients");

    assert_eq!(result.requested_count, Some(4));
    assert_eq!(result.patients[0].display_name(), "P-008 – Kenji Mori");
    assert_eq!(result.patients[1].display_name(), "P-021");
}

#[tokio::test]
async fn blank_patient_id_is_rejected_before_any_request() {
    let client = ApiClient::new("http://127.0.0.1:9").expect("client");

    assert!(matches!(
        client.predict_risk("   ").await,
        Err(InsightsError::InvalidRecord(_))
    ));
}
