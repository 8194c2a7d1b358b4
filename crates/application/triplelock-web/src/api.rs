//! Request and response bodies for the JSON API
//!
//! Numeric fields are taken as raw JSON so that a non-numeric `shift`, `e`,
//! `n` or `d` becomes an `{"error": ...}` body instead of a rejection page.
//! Big integers always go out as decimal strings.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use triplelock_breaker::{Method, PipelineResult, RsaAttack, Stage};
use triplelock_cipher::RsaKeyPair;
use triplelock_core::{Candidate, Error, ScoreDetails, ShiftKey, TransKey};

// ═══════════════════════════════════════════════════════════
// ERRORS
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Any failure a handler can answer with
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::SearchAborted(_) => Self::internal(err.to_string()),
            _ => Self::bad_request(err.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::debug!("Request failed ({}): {}", self.status, self.message);
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

// ═══════════════════════════════════════════════════════════
// FIELD COERCION
// ═══════════════════════════════════════════════════════════

/// Non-negative integer from a JSON number or a decimal string.
pub fn big_uint(field: &str, value: &Value) -> std::result::Result<BigUint, ApiError> {
    let invalid = || ApiError::bad_request(format!("'{}' must be a non-negative integer", field));
    match value {
        Value::Null => Err(ApiError::bad_request(format!("missing field '{}'", field))),
        Value::Number(n) => n.as_u64().map(BigUint::from).ok_or_else(invalid),
        Value::String(s) => s.trim().parse::<BigUint>().map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}

/// [`big_uint`] no wider than `max_bits`.
///
/// Over-long decimal strings are refused before they are parsed.
pub fn bounded_big_uint(
    field: &str,
    value: &Value,
    max_bits: u64,
) -> std::result::Result<BigUint, ApiError> {
    let too_wide = || {
        ApiError::from(Error::InvalidKey(format!(
            "'{}' is wider than the {}-bit limit",
            field, max_bits
        )))
    };

    // Each decimal digit carries just over 3.32 bits
    let max_digits = (max_bits as usize).saturating_mul(31) / 100 + 2;
    if matches!(value, Value::String(s) if s.trim().len() > max_digits) {
        return Err(too_wide());
    }

    let n = big_uint(field, value)?;
    if n.bits() > max_bits {
        return Err(too_wide());
    }
    Ok(n)
}

/// Caesar shift from a JSON number or string, reduced modulo 26.
/// A missing shift is 0.
pub fn shift_key(value: &Value) -> std::result::Result<ShiftKey, ApiError> {
    match value {
        Value::Null => Ok(ShiftKey::default()),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Ok(ShiftKey::new(i)),
            None => Ok(ShiftKey::from_f64(n.as_f64().unwrap_or(f64::NAN))?),
        },
        Value::String(s) => Ok(s.parse::<ShiftKey>()?),
        _ => Err(Error::InvalidKey("shift must be an integer".into()).into()),
    }
}

/// Transposition key from a keyword, an order string, or a JSON array of columns.
pub fn trans_key(value: &Value) -> std::result::Result<TransKey, ApiError> {
    match value {
        Value::String(s) => Ok(s.parse::<TransKey>()?),
        Value::Array(items) => {
            let columns = items
                .iter()
                .map(|item| {
                    item.as_u64()
                        .map(|c| c as usize)
                        .ok_or_else(|| Error::InvalidKey(format!("{} is not a column index", item)))
                })
                .collect::<triplelock_core::Result<Vec<usize>>>()?;
            Ok(TransKey::from_order(columns)?)
        }
        Value::Null => Err(Error::InvalidKey("transposition key must not be empty".into()).into()),
        other => Err(Error::InvalidKey(format!("{} is not a transposition key", other)).into()),
    }
}

// ═══════════════════════════════════════════════════════════
// REQUESTS
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CaesarRequest {
    pub text: String,
    pub shift: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TranspositionRequest {
    pub text: String,
    pub key: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AttackRequest {
    pub text: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GenerateRequest {
    /// `"weak"` or `"strong"`; strong when absent
    pub strength: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RsaEncryptRequest {
    pub text: String,
    pub e: Value,
    pub n: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RsaDecryptRequest {
    pub text: String,
    pub d: Value,
    pub n: Value,
}

/// Body of `/api/rsa/attack` and `/api/triple/attack`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PublicKeyAttackRequest {
    pub text: String,
    pub e: Value,
    pub n: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TripleEncryptRequest {
    pub text: String,
    pub shift: Value,
    pub trans_key: Value,
    pub e: Value,
    pub n: Value,
}

// ═══════════════════════════════════════════════════════════
// RESPONSES
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextResponse {
    pub result: String,
}

/// Ranked candidates from a classical attack
#[derive(Debug, Serialize)]
pub struct AttackResponse<K> {
    pub results: Vec<Candidate<K>>,
    /// Keys evaluated during the search
    pub searched: usize,
}

#[derive(Debug, Serialize)]
pub struct KeyPairResponse {
    pub public: [String; 2],
    pub private: [String; 2],
    pub bits: u64,
}

impl From<&RsaKeyPair> for KeyPairResponse {
    fn from(key: &RsaKeyPair) -> Self {
        Self {
            public: [key.e.to_string(), key.n.to_string()],
            private: [key.d.to_string(), key.n.to_string()],
            bits: key.n.bits(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FactorDetails {
    pub p: String,
    pub q: String,
    pub phi: String,
    pub d: String,
    pub method: Method,
    pub iterations: u64,
    pub elapsed_ms: u128,
}

#[derive(Debug, Serialize)]
pub struct RsaAttackResponse {
    pub success: bool,
    pub private_key: [String; 2],
    pub decrypted: String,
    pub details: FactorDetails,
}

impl From<RsaAttack> for RsaAttackResponse {
    fn from(attack: RsaAttack) -> Self {
        let key = attack.key;
        Self {
            success: true,
            private_key: [key.d.to_string(), key.n.to_string()],
            decrypted: attack.decrypted,
            details: FactorDetails {
                p: key.factors.p.to_string(),
                q: key.factors.q.to_string(),
                phi: key.phi.to_string(),
                d: key.d.to_string(),
                method: key.factors.method,
                iterations: key.factors.iterations,
                elapsed_ms: attack.elapsed.as_millis(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TripleAttackResponse {
    pub results: TripleReport,
}

/// Per-stage strings of a triple-lock attack. Failed stages read
/// `FAILED: ...`, stages never reached read `SKIPPED: ...`.
#[derive(Debug, Serialize)]
pub struct TripleReport {
    pub step1_rsa: String,
    pub step2_trans: String,
    pub step3_caesar: String,
    pub final_plaintext: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rsa_details: Option<FactorDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trans_details: Option<ScoreDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caesar_details: Option<ScoreDetails>,
}

impl From<PipelineResult> for TripleReport {
    fn from(result: PipelineResult) -> Self {
        let failed = result.failed_stage();
        let step = |stage: Stage| match result.stage(stage) {
            Some(stage_result) => stage_result.summary(),
            None => skipped(failed),
        };

        let (step1_rsa, step2_trans, step3_caesar) = (
            step(Stage::Rsa),
            step(Stage::Transposition),
            step(Stage::Caesar),
        );
        let success = result.success();
        let final_plaintext = match (result.final_plaintext(), failed) {
            (Some(plaintext), _) => plaintext.to_string(),
            (None, Some(stage)) => format!("FAILED: stopped at stage {} ({})", stage.number(), stage),
            (None, None) => "FAILED: incomplete".to_string(),
        };

        Self {
            step1_rsa,
            step2_trans,
            step3_caesar,
            final_plaintext,
            success,
            rsa_details: result.rsa.map(|rsa| RsaAttackResponse::from(rsa).details),
            trans_details: result.transposition.map(|c| c.details),
            caesar_details: result.caesar.map(|c| c.details),
        }
    }
}

fn skipped(failed: Option<Stage>) -> String {
    match failed {
        Some(stage) => format!("SKIPPED: {} stage failed", stage),
        None => "SKIPPED".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_big_uint_accepts_numbers_and_strings() {
        assert_eq!(big_uint("n", &json!(3233)).unwrap(), BigUint::from(3233u32));
        assert_eq!(
            big_uint("n", &json!("123456789012345678901234567890")).unwrap().to_string(),
            "123456789012345678901234567890"
        );
        assert_eq!(big_uint("n", &json!(" 42 ")).unwrap(), BigUint::from(42u32));
    }

    #[test]
    fn test_big_uint_rejects_garbage() {
        assert_eq!(big_uint("e", &json!("abc")).unwrap_err().message, "'e' must be a non-negative integer");
        assert!(big_uint("e", &json!(-5)).is_err());
        assert!(big_uint("e", &json!(2.5)).is_err());
        assert!(big_uint("e", &json!([1])).is_err());
        assert_eq!(big_uint("n", &Value::Null).unwrap_err().message, "missing field 'n'");
    }

    #[test]
    fn test_shift_key_coercion() {
        assert_eq!(shift_key(&json!(3)).unwrap().value(), 3);
        assert_eq!(shift_key(&json!(-1)).unwrap().value(), 25);
        assert_eq!(shift_key(&json!("29")).unwrap().value(), 3);
        assert_eq!(shift_key(&json!(4.0)).unwrap().value(), 4);
        assert_eq!(shift_key(&Value::Null).unwrap().value(), 0);
        assert!(shift_key(&json!("three")).is_err());
        assert!(shift_key(&json!(true)).is_err());
    }

    #[test]
    fn test_trans_key_forms() {
        let keyword = trans_key(&json!("ZEBRA")).unwrap();
        assert_eq!(trans_key(&json!([4, 2, 1, 3, 0])).unwrap(), keyword);
        assert_eq!(trans_key(&json!("Len 5 | [4, 2, 1, 3, 0]")).unwrap(), keyword);
        assert!(trans_key(&json!([0, 0])).is_err());
        assert!(trans_key(&Value::Null).is_err());
    }

    #[test]
    fn test_bounded_big_uint() {
        let limit = 64;
        assert_eq!(bounded_big_uint("n", &json!(u64::MAX), limit).unwrap(), BigUint::from(u64::MAX));
        assert_eq!(
            bounded_big_uint("n", &json!("18446744073709551615"), limit).unwrap(),
            BigUint::from(u64::MAX)
        );

        let err = bounded_big_uint("n", &json!("18446744073709551616"), limit).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Invalid key: 'n' is wider than the 64-bit limit");

        let digits = "9".repeat(10_000);
        assert!(bounded_big_uint("d", &json!(digits), limit).is_err());
        assert!(bounded_big_uint("e", &Value::Null, limit).is_err());
    }

    #[test]
    fn test_search_aborted_is_a_server_error() {
        let err = ApiError::from(Error::SearchAborted("a transposition worker panicked".into()));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_error_from_core() {
        let err = ApiError::from(Error::InvalidCiphertext("'x' is not a decimal integer".into()));
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Invalid ciphertext: 'x' is not a decimal integer");
    }
}
