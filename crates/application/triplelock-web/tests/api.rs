use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use triplelock_cipher::{RsaKeyPair, TripleLock};
use triplelock_config::Config;
use triplelock_core::{ShiftKey, TransKey};
use triplelock_web::{create_router, AppState};

fn app() -> Router {
    create_router(Arc::new(AppState::default()))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn post(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

// ═══════════════════════════════════════════════════════════
// GENERAL
// ═══════════════════════════════════════════════════════════

#[tokio::test]
async fn test_health() {
    let request = Request::builder().uri("/api/health").body(Body::empty()).unwrap();
    let (status, body) = send(app(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert!(body["vocabulary"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn test_malformed_json_is_an_error_body() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/caesar/encrypt")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(app(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

// ═══════════════════════════════════════════════════════════
// CAESAR
// ═══════════════════════════════════════════════════════════

#[tokio::test]
async fn test_caesar_round_trip() {
    let (status, body) = post(app(), "/api/caesar/encrypt", json!({"text": "HELLO", "shift": 3})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], "KHOOR");

    let (_, body) = post(app(), "/api/caesar/decrypt", json!({"text": "KHOOR", "shift": "3"})).await;
    assert_eq!(body["result"], "HELLO");
}

#[tokio::test]
async fn test_caesar_bad_shift() {
    let (status, body) = post(app(), "/api/caesar/encrypt", json!({"text": "HELLO", "shift": "three"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid key"));
}

#[tokio::test]
async fn test_caesar_attack() {
    let (status, body) = post(app(), "/api/caesar/attack", json!({"text": "KHOOR ZRUOG"})).await;
    assert_eq!(status, StatusCode::OK);

    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 10);
    assert_eq!(results[0]["plaintext"], "HELLO WORLD");
    assert_eq!(results[0]["key"], 3);
    assert!(results[0]["details"]["details"].is_array());
    let scores: Vec<f64> = results.iter().map(|r| r["score"].as_f64().unwrap()).collect();
    assert!(scores.iter().all(|s| (0.0..=1.0).contains(s)));
    assert!(scores[0] > 0.5);
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
    assert!(results[0]["details"]["log_prob"].is_number());
    assert_eq!(body["searched"], 26);
}

#[tokio::test]
async fn test_caesar_attack_on_empty_text() {
    let (status, body) = post(app(), "/api/caesar/attack", json!({"text": ""})).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["results"].as_array().unwrap().is_empty());
}

// ═══════════════════════════════════════════════════════════
// TRANSPOSITION
// ═══════════════════════════════════════════════════════════

#[tokio::test]
async fn test_transposition_round_trip() {
    let (_, body) = post(
        app(),
        "/api/transposition/encrypt",
        json!({"text": "ATTACK AT DAWN", "key": "ZEBRA"}),
    )
    .await;
    assert_eq!(body["result"], "C TAWT AATNAKD");

    let (_, body) = post(
        app(),
        "/api/transposition/decrypt",
        json!({"text": "C TAWT AATNAKD", "key": [4, 2, 1, 3, 0]}),
    )
    .await;
    assert_eq!(body["result"], "ATTACK AT DAWN");
}

#[tokio::test]
async fn test_transposition_attack() {
    let (status, body) = post(app(), "/api/transposition/attack", json!({"text": "C TAWT AATNAKD"})).await;
    assert_eq!(status, StatusCode::OK);

    let best = &body["results"][0];
    assert_eq!(best["plaintext"], "ATTACK AT DAWN");
    assert_eq!(best["key"], "Len 5 | [4, 2, 1, 3, 0]");
}

#[tokio::test]
async fn test_transposition_attack_on_fresh_sentences() {
    for (ciphertext, plaintext, key) in [
        ("sioeb el gfarcepenf", "please bring coffee", "Len 5 | [4, 2, 1, 3, 0]"),
        ("O V RJNOSAHLEMY", "JOHN LOVES MARY", "Len 3 | [1, 0, 2]"),
    ] {
        let (status, body) = post(app(), "/api/transposition/attack", json!({"text": ciphertext})).await;
        assert_eq!(status, StatusCode::OK);

        let best = &body["results"][0];
        assert_eq!(best["plaintext"], plaintext);
        assert_eq!(best["key"], key);
        assert!((0.0..=1.0).contains(&best["score"].as_f64().unwrap()));
    }
}

#[tokio::test]
async fn test_transposition_attack_too_short() {
    let (status, body) = post(app(), "/api/transposition/attack", json!({"text": "A"})).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["results"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_transposition_bad_key() {
    let (status, body) = post(
        app(),
        "/api/transposition/encrypt",
        json!({"text": "ATTACK", "key": "0,0,1"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

// ═══════════════════════════════════════════════════════════
// RSA
// ═══════════════════════════════════════════════════════════

#[tokio::test]
async fn test_rsa_generate_encrypt_decrypt_attack() {
    let (status, keys) = post(app(), "/api/rsa/generate", json!({"strength": "weak"})).await;
    assert_eq!(status, StatusCode::OK);
    assert!(keys["bits"].as_u64().unwrap() <= 32);
    let (e, n) = (keys["public"][0].clone(), keys["public"][1].clone());
    let d = keys["private"][0].clone();
    assert_eq!(keys["private"][1], n);

    let (_, body) = post(app(), "/api/rsa/encrypt", json!({"text": "Hi there", "e": e, "n": n})).await;
    let ciphertext = body["result"].as_str().unwrap().to_string();

    let (_, body) = post(app(), "/api/rsa/decrypt", json!({"text": ciphertext, "d": d, "n": n})).await;
    assert_eq!(body["result"], "Hi there");

    let (status, body) = post(app(), "/api/rsa/attack", json!({"text": ciphertext, "e": e, "n": n})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["decrypted"], "Hi there");
    assert_eq!(body["private_key"][0], d);

    let p: u64 = body["details"]["p"].as_str().unwrap().parse().unwrap();
    let q: u64 = body["details"]["q"].as_str().unwrap().parse().unwrap();
    let n: u64 = n.as_str().unwrap().parse().unwrap();
    assert_eq!(p * q, n);
}

#[tokio::test]
async fn test_rsa_unknown_strength() {
    let (status, body) = post(app(), "/api/rsa/generate", json!({"strength": "medium"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("weak"));
}

#[tokio::test]
async fn test_rsa_malformed_numbers() {
    let (status, body) = post(app(), "/api/rsa/encrypt", json!({"text": "hi", "e": "abc", "n": 3233})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "'e' must be a non-negative integer");

    let (status, body) = post(app(), "/api/rsa/decrypt", json!({"text": "12 x", "d": 7, "n": 3233})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid ciphertext"));
}

#[tokio::test]
async fn test_rsa_oversized_numbers() {
    // 10^620 is about 2060 bits; 700 nines are refused before parsing
    let wide = format!("1{}", "0".repeat(620));
    let huge = "9".repeat(700);
    for (uri, body) in [
        ("/api/rsa/encrypt", json!({"text": "hi", "e": 65537, "n": wide})),
        ("/api/rsa/encrypt", json!({"text": "hi", "e": huge, "n": 3233})),
        ("/api/rsa/decrypt", json!({"text": "12", "d": 7, "n": huge})),
        ("/api/rsa/attack", json!({"text": "12", "e": 3, "n": wide})),
        ("/api/triple/encrypt", json!({"text": "hi", "shift": 3, "trans_key": "KEY", "e": 3, "n": wide})),
        ("/api/triple/attack", json!({"text": "12", "e": 3, "n": huge})),
    ] {
        let (status, body) = post(app(), uri, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert!(body["error"].as_str().unwrap().ends_with("wider than the 2048-bit limit"), "{}", uri);
    }
}

#[tokio::test]
async fn test_rsa_attack_prime_modulus() {
    let (status, body) = post(app(), "/api/rsa/attack", json!({"text": "5", "e": 3, "n": 65521})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid modulus"));
}

// ═══════════════════════════════════════════════════════════
// TRIPLE LOCK
// ═══════════════════════════════════════════════════════════

#[tokio::test]
async fn test_triple_encrypt_then_attack() {
    let key = RsaKeyPair::generate(32).unwrap();
    let (e, n) = (key.e.to_string(), key.n.to_string());

    let (status, body) = post(
        app(),
        "/api/triple/encrypt",
        json!({"text": "ATTACK AT DAWN", "shift": 3, "trans_key": "ZEBRA", "e": e, "n": n}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let ciphertext = body["result"].as_str().unwrap().to_string();

    let (status, body) = post(app(), "/api/triple/attack", json!({"text": ciphertext, "e": e, "n": n})).await;
    assert_eq!(status, StatusCode::OK);

    let results = &body["results"];
    assert_eq!(results["success"], true);
    assert_eq!(results["final_plaintext"], "ATTACK AT DAWN");
    assert_eq!(results["step2_trans"], "DWWDFN DW GDZQ (Key: Len 5 | [4, 2, 1, 3, 0])");
    assert_eq!(results["step3_caesar"], "ATTACK AT DAWN (Key: 3)");
    assert!(!results["step1_rsa"].as_str().unwrap().starts_with("FAILED"));
}

#[tokio::test]
async fn test_triple_attack_ignores_labels() {
    let key = RsaKeyPair::generate(32).unwrap();
    let blocks = TripleLock::encrypt(
        "HELLO WORLD",
        ShiftKey::new(5),
        &TransKey::from_keyword("KEY").unwrap(),
        &key.e,
        &key.n,
    )
    .unwrap();
    let labelled = format!(
        "ENCRYPT LEVEL 3: {}",
        blocks.iter().map(|b| b.to_string()).collect::<Vec<_>>().join(" ")
    );

    let (status, body) = post(
        app(),
        "/api/triple/attack",
        json!({"text": labelled, "e": key.e.to_string(), "n": key.n.to_string()}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"]["final_plaintext"], "HELLO WORLD");
}

#[tokio::test]
async fn test_triple_attack_without_numbers() {
    let (status, body) = post(
        app(),
        "/api/triple/attack",
        json!({"text": "ENCRYPT LEVEL", "e": 65537, "n": 3233}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No valid integer ciphertext found.");
}

#[tokio::test]
async fn test_triple_attack_strong_key_fails_at_stage_one() {
    let mut config = Config::default();
    config.rsa.factor_time_ms = 200;
    config.rsa.factor_iterations = 50_000;
    let app = create_router(Arc::new(AppState::new(config, triplelock_lang::english())));

    let key = RsaKeyPair::generate(256).unwrap();
    let blocks = TripleLock::encrypt(
        "ATTACK AT DAWN",
        ShiftKey::new(3),
        &TransKey::from_keyword("ZEBRA").unwrap(),
        &key.e,
        &key.n,
    )
    .unwrap();
    let ciphertext = blocks.iter().map(|b| b.to_string()).collect::<Vec<_>>().join(" ");

    let (status, body) = post(
        app,
        "/api/triple/attack",
        json!({"text": ciphertext, "e": key.e.to_string(), "n": key.n.to_string()}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let results = &body["results"];
    assert_eq!(results["success"], false);
    assert!(results["step1_rsa"].as_str().unwrap().starts_with("FAILED: Could not factorize n"));
    assert!(results["step2_trans"].as_str().unwrap().starts_with("SKIPPED"));
    assert!(results["step3_caesar"].as_str().unwrap().starts_with("SKIPPED"));
    assert!(results["final_plaintext"].as_str().unwrap().starts_with("FAILED"));
}
