//! HTTP handlers
//!
//! Classical encrypt and decrypt run inline. Attacks and anything doing
//! modular exponentiation are CPU bound and run on the blocking pool so one
//! long request never stalls the reactor. Big integers are bounded by
//! `rsa.max_modulus_bits` before any arithmetic.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::{IntoResponse, Json};
use std::sync::Arc;

use triplelock_breaker::{CaesarBreaker, TranspositionBreaker, TripleLockBreaker};
use triplelock_cipher::{Caesar, Rsa, RsaKeyPair, Strength, Transposition, TripleLock};

use crate::api::{
    bounded_big_uint, shift_key, trans_key, ApiError, ApiResult, AttackRequest, AttackResponse,
    CaesarRequest, GenerateRequest, KeyPairResponse, PublicKeyAttackRequest, RsaAttackResponse,
    RsaDecryptRequest, RsaEncryptRequest, TextResponse, TranspositionRequest,
    TripleAttackResponse, TripleEncryptRequest, TripleReport,
};
use crate::AppState;

type Body<T> = std::result::Result<Json<T>, JsonRejection>;

/// Run CPU-heavy work off the async reactor.
async fn blocking<T, F>(work: F) -> std::result::Result<T, ApiError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError::internal(format!("worker task failed: {}", e)))
}

/// Health check
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "triplelock-web",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.uptime_secs(),
        "vocabulary": state.model.vocabulary_size(),
    }))
}

// ═══════════════════════════════════════════════════════════
// CAESAR
// ═══════════════════════════════════════════════════════════

pub async fn caesar_encrypt(body: Body<CaesarRequest>) -> ApiResult<TextResponse> {
    let Json(req) = body?;
    let shift = shift_key(&req.shift)?;
    Ok(Json(TextResponse {
        result: Caesar::encrypt(&req.text, shift),
    }))
}

pub async fn caesar_decrypt(body: Body<CaesarRequest>) -> ApiResult<TextResponse> {
    let Json(req) = body?;
    let shift = shift_key(&req.shift)?;
    Ok(Json(TextResponse {
        result: Caesar::decrypt(&req.text, shift),
    }))
}

pub async fn caesar_attack(
    State(state): State<Arc<AppState>>,
    body: Body<AttackRequest>,
) -> ApiResult<AttackResponse<triplelock_core::ShiftKey>> {
    let Json(req) = body?;
    let top_n = state.config.attack.top_n;

    let mut result = blocking(move || CaesarBreaker::new(&*state.model).attack(&req.text)).await?;
    result.truncate(top_n);
    Ok(Json(AttackResponse {
        results: result.candidates,
        searched: result.searched,
    }))
}

// ═══════════════════════════════════════════════════════════
// TRANSPOSITION
// ═══════════════════════════════════════════════════════════

pub async fn transposition_encrypt(body: Body<TranspositionRequest>) -> ApiResult<TextResponse> {
    let Json(req) = body?;
    let key = trans_key(&req.key)?;
    Ok(Json(TextResponse {
        result: Transposition::encrypt(&req.text, &key),
    }))
}

pub async fn transposition_decrypt(body: Body<TranspositionRequest>) -> ApiResult<TextResponse> {
    let Json(req) = body?;
    let key = trans_key(&req.key)?;
    Ok(Json(TextResponse {
        result: Transposition::decrypt(&req.text, &key),
    }))
}

pub async fn transposition_attack(
    State(state): State<Arc<AppState>>,
    body: Body<AttackRequest>,
) -> ApiResult<AttackResponse<triplelock_core::TransKey>> {
    let Json(req) = body?;

    let result = blocking(move || {
        TranspositionBreaker::new(&*state.model)
            .with_max_key_len(state.config.attack.transposition_max_key_len)
            .with_top_n(state.config.attack.top_n)
            .attack(&req.text)
    })
    .await??;
    Ok(Json(AttackResponse {
        results: result.candidates,
        searched: result.searched,
    }))
}

// ═══════════════════════════════════════════════════════════
// RSA
// ═══════════════════════════════════════════════════════════

pub async fn rsa_generate(
    State(state): State<Arc<AppState>>,
    body: Body<GenerateRequest>,
) -> ApiResult<KeyPairResponse> {
    let Json(req) = body?;
    let strength = match req.strength.as_deref() {
        Some(s) => s.parse::<Strength>()?,
        None => Strength::default(),
    };
    let bits = strength.modulus_bits(state.config.rsa.weak_bits, state.config.rsa.strong_bits);

    let key = blocking(move || RsaKeyPair::generate(bits)).await??;
    tracing::info!("Generated {} RSA key ({}-bit n)", strength, key.n.bits());
    Ok(Json(KeyPairResponse::from(&key)))
}

pub async fn rsa_encrypt(
    State(state): State<Arc<AppState>>,
    body: Body<RsaEncryptRequest>,
) -> ApiResult<TextResponse> {
    let Json(req) = body?;
    let max_bits = state.config.rsa.max_modulus_bits;
    let e = bounded_big_uint("e", &req.e, max_bits)?;
    let n = bounded_big_uint("n", &req.n, max_bits)?;

    let blocks = blocking(move || Rsa::encrypt(&req.text, &e, &n)).await??;
    Ok(Json(TextResponse {
        result: Rsa::format_blocks(&blocks),
    }))
}

pub async fn rsa_decrypt(
    State(state): State<Arc<AppState>>,
    body: Body<RsaDecryptRequest>,
) -> ApiResult<TextResponse> {
    let Json(req) = body?;
    let max_bits = state.config.rsa.max_modulus_bits;
    let d = bounded_big_uint("d", &req.d, max_bits)?;
    let n = bounded_big_uint("n", &req.n, max_bits)?;

    let blocks = Rsa::parse_blocks(&req.text)?;
    let result = blocking(move || Rsa::decrypt(&blocks, &d, &n)).await??;
    Ok(Json(TextResponse { result }))
}

pub async fn rsa_attack(
    State(state): State<Arc<AppState>>,
    body: Body<PublicKeyAttackRequest>,
) -> ApiResult<RsaAttackResponse> {
    let Json(req) = body?;
    let max_bits = state.config.rsa.max_modulus_bits;
    let e = bounded_big_uint("e", &req.e, max_bits)?;
    let n = bounded_big_uint("n", &req.n, max_bits)?;
    let blocks = Rsa::parse_blocks(&req.text)?;

    let factorizer = state.factorizer();
    let attack = blocking(move || factorizer.attack(&e, &n, &blocks)).await??;
    Ok(Json(RsaAttackResponse::from(attack)))
}

// ═══════════════════════════════════════════════════════════
// TRIPLE LOCK
// ═══════════════════════════════════════════════════════════

pub async fn triple_encrypt(
    State(state): State<Arc<AppState>>,
    body: Body<TripleEncryptRequest>,
) -> ApiResult<TextResponse> {
    let Json(req) = body?;
    let shift = shift_key(&req.shift)?;
    let key = trans_key(&req.trans_key)?;
    let max_bits = state.config.rsa.max_modulus_bits;
    let e = bounded_big_uint("e", &req.e, max_bits)?;
    let n = bounded_big_uint("n", &req.n, max_bits)?;

    let blocks = blocking(move || TripleLock::encrypt(&req.text, shift, &key, &e, &n)).await??;
    Ok(Json(TextResponse {
        result: Rsa::format_blocks(&blocks),
    }))
}

pub async fn triple_attack(
    State(state): State<Arc<AppState>>,
    body: Body<PublicKeyAttackRequest>,
) -> ApiResult<TripleAttackResponse> {
    let Json(req) = body?;
    let max_bits = state.config.rsa.max_modulus_bits;
    let e = bounded_big_uint("e", &req.e, max_bits)?;
    let n = bounded_big_uint("n", &req.n, max_bits)?;

    let blocks = Rsa::sanitize_blocks(&req.text);
    if blocks.is_empty() {
        return Err(ApiError::bad_request("No valid integer ciphertext found."));
    }

    let result = blocking(move || {
        TripleLockBreaker::new(&*state.model, state.factorizer())
            .with_max_key_len(state.config.attack.transposition_max_key_len)
            .with_paths(state.config.attack.pipeline_paths)
            .attack(&blocks, &e, &n)
    })
    .await?;

    tracing::info!(
        "Triple-lock attack finished: success={} failed_stage={:?}",
        result.success(),
        result.failed_stage()
    );
    Ok(Json(TripleAttackResponse {
        results: TripleReport::from(result),
    }))
}
