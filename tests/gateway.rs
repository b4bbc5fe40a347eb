//! Gateway and service behaviour against an in-process mock backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};

use cardiolens::adapters::{GatewayConfig, HttpGateway};
use cardiolens::application::{EvaluationService, PatientService, PredictionService, QueryCache};
use cardiolens::domain::examination::ExaminationKind;
use cardiolens::domain::{LifestyleInput, LifestyleMeasurements, PatientInput, ShapeDrift};
use cardiolens::ports::{AdminBackend, PatientRepository, PredictionBackend, TrainingBackend};
use cardiolens::{CardiolensError, GatewayError, RiskLevel};

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Should bind ephemeral port");
    let addr = listener.local_addr().expect("Should have address");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("Mock server failed");
    });
    format!("http://{addr}")
}

fn gateway(base_url: &str) -> Arc<HttpGateway> {
    let config = GatewayConfig::default().with_base_url(base_url);
    Arc::new(HttpGateway::with_config(config).expect("Should build gateway"))
}

fn patient_json(id: &str) -> Value {
    json!({
        "id": id,
        "name": "Nguyen Van A",
        "age": 58,
        "gender": "Nam",
        "riskLevel": "high",
        "healthScore": 18,
        "confidence": 0.82,
        "risk_score": 0.82,
        "cholesterol": 2,
        "gluc": 1,
        "smoke": 1,
        "alco": 0,
        "active": 0,
        "age_bin": 3,
        "BMI_Class": 3,
        "MAP_Class": 3,
        "cluster": 3
    })
}

fn lifestyle() -> LifestyleInput {
    LifestyleInput {
        gender: 1,
        age_bin: 3,
        bmi_class: 3,
        map_class: 3,
        cholesterol: 2,
        gluc: 1,
        smoke: 1,
        alco: 0,
        active: 0,
        history: 0,
    }
}

fn model(key: &str, name: &str, risk: f64, confidence: f64) -> Value {
    json!({
        "model_key": key,
        "model_name": name,
        "type": "ensemble",
        "accuracy": 73.2,
        "risk_score": risk,
        "risk_level": if risk > 0.5 { "High" } else { "Low" },
        "confidence": confidence
    })
}

#[tokio::test]
async fn test_status_error_returned_untouched() {
    const BODY: &str = r#"{"detail":"database is locked"}"#;
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);

    let router = Router::new().route(
        "/patients",
        get(move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                (StatusCode::INTERNAL_SERVER_ERROR, BODY)
            }
        }),
    );
    let gateway = gateway(&serve(router).await);

    let err = gateway.list_patients().await.expect_err("Should fail");

    assert_eq!(hits.load(Ordering::SeqCst), 1, "no retry");
    assert_eq!(err.operation(), Some("list patients"));
    assert_eq!(err.status(), Some(reqwest::StatusCode::INTERNAL_SERVER_ERROR));
    match err {
        GatewayError::Status { body, .. } => assert_eq!(body, BODY),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_malformed_body_is_decode_error() {
    let router = Router::new().route("/treatments", get(|| async { "<html>maintenance</html>" }));
    let gateway = gateway(&serve(router).await);

    let err = gateway.list_treatments().await.expect_err("Should fail");
    assert!(matches!(err, GatewayError::Decode { operation: "list treatments", .. }));
}

#[tokio::test]
async fn test_create_patient_sends_wire_names() {
    let seen: Arc<Mutex<Option<Value>>> = Arc::default();
    let capture = Arc::clone(&seen);

    let router = Router::new().route(
        "/patients",
        post(move |Json(body): Json<Value>| {
            let capture = Arc::clone(&capture);
            async move {
                *capture.lock().expect("Lock") = Some(body);
                Json(patient_json("BN-2024-0001"))
            }
        }),
    );
    let gateway = gateway(&serve(router).await);

    let input = PatientInput::new("Nguyen Van A", 58, "Nam")
        .with_metrics(lifestyle().to_metrics(3))
        .with_risk_score(0.82);
    let created = gateway.create_patient(&input).await.expect("Should create");

    assert_eq!(created.id, "BN-2024-0001");
    assert_eq!(created.risk_level, RiskLevel::High);
    assert_eq!(created.metrics.cluster, Some(3));

    let body = seen.lock().expect("Lock").clone().expect("Body captured");
    assert_eq!(body["riskLevel"], "high");
    assert_eq!(body["healthScore"], 18);
    assert_eq!(body["BMI_Class"], 3);
    assert_eq!(body["MAP_Class"], 3);
    assert!(body.get("phone").is_none());
}

#[tokio::test]
async fn test_single_prediction_empty_array() {
    let seen: Arc<Mutex<Option<Value>>> = Arc::default();
    let capture = Arc::clone(&seen);

    let router = Router::new().route(
        "/predict/lifestyle",
        post(move |Json(body): Json<Value>| {
            let capture = Arc::clone(&capture);
            async move {
                *capture.lock().expect("Lock") = Some(body);
                Json(json!([]))
            }
        }),
    );
    let gateway = gateway(&serve(router).await);

    let err = gateway
        .predict_lifestyle_one(&lifestyle())
        .await
        .expect_err("Should fail");
    assert!(matches!(err, GatewayError::EmptyPrediction { .. }));
    assert!(err.to_string().contains("no prediction result"));

    let body = seen.lock().expect("Lock").clone().expect("Body captured");
    assert_eq!(body["patients"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["patients"][0]["smoke"], 1);
}

#[tokio::test]
async fn test_single_prediction_assessment() {
    let router = Router::new().route(
        "/predict/lifestyle",
        post(|| async {
            Json(json!([{
                "risk_score": 0.64,
                "risk_level": "High",
                "model_used": "XGBoost",
                "confidence": 0.64,
                "contributing_factors": {"MAP_Class": 0.21, "smoke": 0.12}
            }]))
        }),
    );
    let service = PredictionService::new(gateway(&serve(router).await));

    let assessment = service.assess_lifestyle(&lifestyle()).await.expect("Should predict");
    assert_eq!(assessment.risk_level, RiskLevel::Medium);
    assert_eq!(assessment.health_score, 36);
    assert_eq!(assessment.model_used, "XGBoost");
}

#[tokio::test]
async fn test_prepare_intake_from_measurements() {
    let router = Router::new().route(
        "/predict/lifestyle",
        post(|| async {
            Json(json!([{"risk_score": 0.64, "risk_level": "High", "model_used": "XGBoost", "confidence": 0.64}]))
        }),
    );
    let service = PredictionService::new(gateway(&serve(router).await));

    let measurements = LifestyleMeasurements {
        male: true,
        age: 58,
        weight_kg: 92.0,
        height_cm: 175.0,
        systolic_bp: 145.0,
        total_cholesterol: 215.0,
        fasting_glucose: 98.0,
        smoker: true,
        drinks_alcohol: false,
        physically_active: false,
        cardiac_history: false,
    };
    let input = service
        .prepare_intake(PatientInput::new("Le Van C", 58, "Nam"), &measurements)
        .await
        .expect("Should prepare");

    assert_eq!(input.metrics.cluster, Some(3));
    assert_eq!(input.metrics.bmi_class, Some(3));
    assert_eq!(input.risk_level, RiskLevel::Medium);
    assert_eq!(input.health_score, 36);
    assert!((input.confidence - 0.64).abs() < 1e-9);
}

#[tokio::test]
async fn test_compare_builds_view() {
    let router = Router::new().route(
        "/predict/lifestyle/compare",
        post(|| async {
            Json(json!({
                "all_models": [
                    model("cardio_lr", "Logistic Regression", 0.58, 0.58),
                    model("cardio_xgb", "XGBoost", 0.71, 0.71),
                    model("cardio_rf", "Random Forest", 0.44, 0.56)
                ],
                "best_model": {
                    "model_key": "cardio_xgb",
                    "model_name": "XGBoost",
                    "risk_score": 0.71,
                    "risk_level": "High",
                    "confidence": 0.71
                },
                "consensus": {"high_risk_count": 2, "low_risk_count": 1, "total_models": 3}
            }))
        }),
    );
    let service = PredictionService::new(gateway(&serve(router).await));

    let view = service.compare_lifestyle(&lifestyle()).await.expect("Should compare");

    assert_eq!(view.best.model_key, "cardio_xgb");
    // Resolved from the full list, so the family is present.
    assert!(view.best.family.is_some());
    let order: Vec<&str> = view.models.iter().map(|m| m.model_key.as_str()).collect();
    assert_eq!(order, ["cardio_xgb", "cardio_lr", "cardio_rf"]);
    assert_eq!(view.consensus.high_risk_count, 2);
    assert_eq!(view.dissenters().len(), 1);
}

#[tokio::test]
async fn test_compare_rejects_unknown_best_model() {
    let router = Router::new().route(
        "/predict/lifestyle/compare",
        post(|| async {
            Json(json!({
                "all_models": [model("cardio_lr", "Logistic Regression", 0.58, 0.58)],
                "best_model": model("cardio_svm", "SVM", 0.6, 0.6),
                "consensus": {"high_risk_count": 1, "low_risk_count": 0, "total_models": 1}
            }))
        }),
    );
    let service = PredictionService::new(gateway(&serve(router).await));

    let err = service
        .compare_lifestyle(&lifestyle())
        .await
        .expect_err("Should reject");
    assert!(matches!(
        err,
        CardiolensError::Gateway(GatewayError::ShapeDrift(ShapeDrift::UnknownBestModel(ref key))) if key == "cardio_svm"
    ));
}

#[tokio::test]
async fn test_admin_model_query_parameter() {
    let models: Arc<Mutex<Vec<Option<String>>>> = Arc::default();
    let capture = Arc::clone(&models);

    let router = Router::new()
        .route(
            "/admin/metrics",
            get(move |Query(params): Query<HashMap<String, String>>| {
                let capture = Arc::clone(&capture);
                async move {
                    capture.lock().expect("Lock").push(params.get("model").cloned());
                    Json(json!({"accuracy": 73.5, "precision": 75.1, "recall": 69.8, "f1Score": 72.4, "auc": 0.80}))
                }
            }),
        )
        .route(
            "/admin/confusion",
            get(|| async {
                Json(json!({"trueNegative": 50, "falsePositive": 10, "falseNegative": 15, "truePositive": 25}))
            }),
        );
    let gateway = gateway(&serve(router).await);
    let service = EvaluationService::new(Arc::clone(&gateway), Arc::new(QueryCache::default()));

    let evaluation = service.evaluate(Some("cardio_rf")).await.expect("Should evaluate");
    gateway.model_metrics(None).await.expect("Should fetch default");

    assert!((evaluation.metrics.f1_score - 72.4).abs() < 1e-9);
    assert_eq!(evaluation.confusion.total(), 100);
    assert_eq!(
        *models.lock().expect("Lock"),
        vec![Some("cardio_rf".to_string()), None]
    );
}

#[tokio::test]
async fn test_evaluation_fails_if_either_request_fails() {
    let router = Router::new()
        .route(
            "/admin/metrics",
            get(|| async {
                Json(json!({"accuracy": 73.5, "precision": 75.1, "recall": 69.8, "f1Score": 72.4, "auc": 0.80}))
            }),
        )
        .route(
            "/admin/confusion",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "model not loaded") }),
        );
    let service = EvaluationService::new(gateway(&serve(router).await), Arc::new(QueryCache::default()));

    let err = service.evaluate(None).await.expect_err("Should fail");
    assert!(matches!(
        err,
        CardiolensError::Gateway(GatewayError::Status { operation: "confusion matrix", .. })
    ));
}

#[tokio::test]
async fn test_diagnosis_update() {
    let seen: Arc<Mutex<Option<(u64, Value)>>> = Arc::default();
    let capture = Arc::clone(&seen);

    let router = Router::new().route(
        "/examinations/clinical/:id/diagnosis",
        put(move |Path(id): Path<u64>, Json(body): Json<Value>| {
            let capture = Arc::clone(&capture);
            async move {
                *capture.lock().expect("Lock") = Some((id, body));
                Json(json!({
                    "id": id,
                    "patient_id": "BN-2024-0007",
                    "exam_date": "2024-11-02",
                    "model_prediction": 1,
                    "model_confidence": 0.77,
                    "doctor_diagnosis": 1,
                    "diagnosis_date": "2024-11-03",
                    "is_used_for_training": false,
                    "cp": 2,
                    "thal": 3
                }))
            }
        }),
    );
    let gateway = gateway(&serve(router).await);

    let exam = gateway
        .update_diagnosis(ExaminationKind::Clinical, 7, true.into())
        .await
        .expect("Should update");

    assert_eq!(exam.doctor_diagnosis, Some(1));
    assert_eq!(exam.model_was_right(), Some(true));
    assert_eq!(exam.features.get("thal"), Some(&json!(3)));

    let (id, body) = seen.lock().expect("Lock").clone().expect("Request captured");
    assert_eq!(id, 7);
    assert_eq!(body, json!({"doctor_diagnosis": 1}));
}

#[tokio::test]
async fn test_cached_reads_and_invalidation() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);

    let router = Router::new().route(
        "/patients",
        get(move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Json(json!([patient_json("BN-2024-0001")]))
            }
        })
        .post(|| async { Json(patient_json("BN-2024-0002")) }),
    );
    let service = PatientService::new(gateway(&serve(router).await), Arc::new(QueryCache::default()));

    service.patients().await.expect("Should list");
    let summary = service.dashboard().await.expect("Should summarise");
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(summary.metrics.high_risk_count, 1);
    assert_eq!(summary.inconsistent_scores, 0);

    service
        .create_patient(&PatientInput::new("Tran Thi B", 44, "Nu"))
        .await
        .expect("Should create");
    service.patients().await.expect("Should list");
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_invalid_patient_never_sent() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);

    let router = Router::new().route(
        "/patients",
        post(move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Json(patient_json("BN-2024-0003"))
            }
        }),
    );
    let service = PatientService::new(gateway(&serve(router).await), Arc::new(QueryCache::default()));

    let err = service
        .create_patient(&PatientInput::new("  ", 44, "Nu"))
        .await
        .expect_err("Should reject");
    assert!(matches!(err, CardiolensError::Validation(_)));
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_mark_trained_body_is_id_array() {
    let seen: Arc<Mutex<Option<Value>>> = Arc::default();
    let capture = Arc::clone(&seen);

    let router = Router::new().route(
        "/examinations/lifestyle/mark-trained",
        post(move |Json(body): Json<Value>| {
            let capture = Arc::clone(&capture);
            async move {
                *capture.lock().expect("Lock") = Some(body);
                Json(json!({"success": true, "marked_count": 3}))
            }
        }),
    );
    let gateway = gateway(&serve(router).await);

    let receipt = gateway
        .mark_trained(ExaminationKind::Lifestyle, &[4, 8, 15])
        .await
        .expect("Should mark");
    assert_eq!(receipt.marked_count, 3);
    assert_eq!(seen.lock().expect("Lock").clone(), Some(json!([4, 8, 15])));
}

#[tokio::test]
async fn test_health_probe() {
    let router = Router::new().route("/docs", get(|| async { "<html>docs</html>" }));
    assert!(gateway(&serve(router).await).is_reachable().await);

    // Bind then release a port so nothing is listening on it.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Should bind");
    let addr = listener.local_addr().expect("Should have address");
    drop(listener);
    assert!(!gateway(&format!("http://{addr}")).is_reachable().await);

    let unreachable = gateway(&format!("http://{addr}"))
        .list_patients()
        .await
        .expect_err("Should fail");
    assert!(unreachable.is_unreachable());
}

fn slow_router() -> Router {
    async fn slow() -> Json<Value> {
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        Json(json!([]))
    }
    Router::new().route("/patients", get(slow)).route("/docs", get(slow))
}

#[tokio::test]
async fn test_slow_backend_times_out() {
    let config = GatewayConfig {
        timeout: Duration::from_millis(100),
        ..GatewayConfig::default()
    }
    .with_base_url(serve(slow_router()).await);
    let gateway = HttpGateway::with_config(config).expect("Should build gateway");

    let err = gateway.list_patients().await.expect_err("Should time out");
    assert!(err.is_timeout());
    assert!(err.is_unreachable());
    assert_eq!(err.status(), None);
}

#[tokio::test]
async fn test_health_probe_uses_its_own_timeout() {
    // Regular calls would wait for the slow route; the probe must not.
    let config = GatewayConfig {
        timeout: Duration::from_secs(10),
        health_timeout: Duration::from_millis(100),
        ..GatewayConfig::default()
    }
    .with_base_url(serve(slow_router()).await);
    let gateway = HttpGateway::with_config(config).expect("Should build gateway");

    let started = Instant::now();
    assert!(!gateway.is_reachable().await);
    assert!(started.elapsed() < Duration::from_millis(1_000));
}
