//! Wire types for the `/generate` endpoint.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::RequestError;
use crate::orchestrator::SolvedSample;

pub const DEFAULT_PAIR_COUNT: u32 = 4;
pub const MAX_PAIR_COUNT: u32 = 16;
pub const DEFAULT_MIN_POINT_SEPARATION_MM: f64 = 0.5;
pub const DEFAULT_CELL_SIZE_MM: f64 = 0.1;
pub const DEFAULT_VIA_DIAMETER_MM: f64 = 0.3;
pub const DEFAULT_TRACE_THICKNESS_MM: f64 = 0.1;
pub const DEFAULT_TRACE_MARGIN_MM: f64 = 0.1;
pub const DEFAULT_MAX_SOLVE_ATTEMPTS: u32 = 1;
pub const MAX_SOLVE_ATTEMPTS: u32 = 10;

/// Accepted `[min, max]` ranges for the physical fields, in millimetres.
/// These keep the routing grid and clearance footprints small enough to solve.
pub const MIN_POINT_SEPARATION_RANGE_MM: (f64, f64) = (0.0, 5.0);
pub const CELL_SIZE_RANGE_MM: (f64, f64) = (0.05, 1.0);
pub const VIA_DIAMETER_RANGE_MM: (f64, f64) = (0.01, 1.0);
pub const TRACE_THICKNESS_RANGE_MM: (f64, f64) = (0.01, 0.5);
pub const TRACE_MARGIN_RANGE_MM: (f64, f64) = (0.0, 0.5);

/// A `/generate` request with every default applied.
///
/// This is both what clients send and what the service hashes for its cache
/// key, so an omitted field and its explicit default share one entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub problem_id: String,
    pub seed: i64,
    pub pair_count: u32,
    pub min_point_separation_mm: f64,
    pub cell_size_mm: f64,
    pub via_diameter_mm: f64,
    pub trace_thickness_mm: f64,
    pub trace_margin_mm: f64,
    pub max_solve_attempts: u32,
}

impl GenerateRequest {
    pub fn new(problem_id: impl Into<String>, seed: i64) -> Self {
        Self {
            problem_id: problem_id.into(),
            seed,
            pair_count: DEFAULT_PAIR_COUNT,
            min_point_separation_mm: DEFAULT_MIN_POINT_SEPARATION_MM,
            cell_size_mm: DEFAULT_CELL_SIZE_MM,
            via_diameter_mm: DEFAULT_VIA_DIAMETER_MM,
            trace_thickness_mm: DEFAULT_TRACE_THICKNESS_MM,
            trace_margin_mm: DEFAULT_TRACE_MARGIN_MM,
            max_solve_attempts: DEFAULT_MAX_SOLVE_ATTEMPTS,
        }
    }
}

/// Validate and normalize a raw request body.
///
/// `problemId` must be a non-empty string and `seed` a number. Optional
/// fields may be absent or `null`; when present they must be numbers.
/// Integer fields are floored and clamped.
pub fn parse_request(body: &[u8]) -> Result<GenerateRequest, RequestError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| RequestError::MalformedJson(e.to_string()))?;
    let obj = value.as_object().ok_or(RequestError::NotAnObject)?;

    let problem_id = obj
        .get("problemId")
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .ok_or(RequestError::MissingProblemId)?;

    let seed = obj
        .get("seed")
        .and_then(Value::as_f64)
        .filter(|s| s.is_finite())
        .ok_or(RequestError::InvalidSeed)?;

    let mut request = GenerateRequest::new(problem_id, seed.floor() as i64);

    if let Some(n) = optional_number(obj, "pairCount")? {
        request.pair_count = clamp_count(n, MAX_PAIR_COUNT);
    }
    if let Some(n) = optional_in_range(obj, "minPointSeparationMm", MIN_POINT_SEPARATION_RANGE_MM)? {
        request.min_point_separation_mm = n;
    }
    if let Some(n) = optional_in_range(obj, "cellSizeMm", CELL_SIZE_RANGE_MM)? {
        request.cell_size_mm = n;
    }
    if let Some(n) = optional_in_range(obj, "viaDiameterMm", VIA_DIAMETER_RANGE_MM)? {
        request.via_diameter_mm = n;
    }
    if let Some(n) = optional_in_range(obj, "traceThicknessMm", TRACE_THICKNESS_RANGE_MM)? {
        request.trace_thickness_mm = n;
    }
    if let Some(n) = optional_in_range(obj, "traceMarginMm", TRACE_MARGIN_RANGE_MM)? {
        request.trace_margin_mm = n;
    }
    if let Some(n) = optional_number(obj, "maxSolveAttempts")? {
        request.max_solve_attempts = clamp_count(n, MAX_SOLVE_ATTEMPTS);
    }

    Ok(request)
}

fn optional_number(obj: &Map<String, Value>, field: &str) -> Result<Option<f64>, RequestError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_f64()
            .filter(|n| n.is_finite())
            .map(Some)
            .ok_or_else(|| RequestError::InvalidNumber {
                field: field.to_string(),
            }),
    }
}

fn optional_in_range(
    obj: &Map<String, Value>,
    field: &str,
    (min, max): (f64, f64),
) -> Result<Option<f64>, RequestError> {
    match optional_number(obj, field)? {
        Some(value) if !(min..=max).contains(&value) => Err(RequestError::OutOfRange {
            field: field.to_string(),
            value,
            min,
            max,
        }),
        other => Ok(other),
    }
}

fn clamp_count(n: f64, max: u32) -> u32 {
    n.floor().clamp(1.0, f64::from(max)) as u32
}

/// Body of every `/generate` 200 response, and the cached payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub ok: bool,
    #[serde(default)]
    pub cached: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample: Option<SolvedSample>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used_seed: Option<i64>,
}

impl GenerateResponse {
    pub fn success(sample: SolvedSample, attempts: u32, used_seed: i64) -> Self {
        Self {
            ok: true,
            cached: false,
            sample: Some(sample),
            reason: None,
            attempts,
            used_seed: Some(used_seed),
        }
    }

    pub fn failure(reason: impl Into<String>, attempts: u32) -> Self {
        Self {
            ok: false,
            cached: false,
            sample: None,
            reason: Some(reason.into()),
            attempts,
            used_seed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheKey;

    #[test]
    fn test_defaults_and_explicit_values_normalize_equal() {
        let implicit = parse_request(br#"{"problemId":"sample-000001","seed":5}"#).unwrap();
        let explicit = parse_request(
            br#"{"seed":5,"problemId":"sample-000001","pairCount":4,"cellSizeMm":0.1,
                "viaDiameterMm":0.3,"traceThicknessMm":0.1,"traceMarginMm":0.1,
                "minPointSeparationMm":0.5,"maxSolveAttempts":1}"#,
        )
        .unwrap();
        assert_eq!(implicit, explicit);
        assert_eq!(
            CacheKey::for_request(&implicit).unwrap(),
            CacheKey::for_request(&explicit).unwrap()
        );
    }

    #[test]
    fn test_integer_fields_are_floored_and_clamped() {
        let req = parse_request(
            br#"{"problemId":"p","seed":7.9,"pairCount":3.7,"maxSolveAttempts":99}"#,
        )
        .unwrap();
        assert_eq!(req.seed, 7);
        assert_eq!(req.pair_count, 3);
        assert_eq!(req.max_solve_attempts, MAX_SOLVE_ATTEMPTS);

        let req = parse_request(br#"{"problemId":"p","seed":1,"pairCount":0}"#).unwrap();
        assert_eq!(req.pair_count, 1);
    }

    #[test]
    fn test_validation_errors() {
        assert!(matches!(
            parse_request(b"{not json"),
            Err(RequestError::MalformedJson(_))
        ));
        assert!(matches!(parse_request(b"[1,2]"), Err(RequestError::NotAnObject)));
        assert!(matches!(
            parse_request(br#"{"problemId":"","seed":1}"#),
            Err(RequestError::MissingProblemId)
        ));
        assert!(matches!(
            parse_request(br#"{"problemId":"p"}"#),
            Err(RequestError::InvalidSeed)
        ));
        assert!(matches!(
            parse_request(br#"{"problemId":"p","seed":"12"}"#),
            Err(RequestError::InvalidSeed)
        ));
        assert!(matches!(
            parse_request(br#"{"problemId":"p","seed":1,"cellSizeMm":"big"}"#),
            Err(RequestError::InvalidNumber { .. })
        ));
        assert!(parse_request(br#"{"problemId":"p","seed":1,"cellSizeMm":null}"#).is_ok());
    }

    #[test]
    fn test_physical_fields_out_of_range_are_rejected() {
        for body in [
            r#"{"problemId":"p","seed":1,"traceThicknessMm":1e4}"#,
            r#"{"problemId":"p","seed":1,"viaDiameterMm":200}"#,
            r#"{"problemId":"p","seed":1,"viaDiameterMm":0}"#,
            r#"{"problemId":"p","seed":1,"cellSizeMm":-0.1}"#,
            r#"{"problemId":"p","seed":1,"cellSizeMm":0.001}"#,
            r#"{"problemId":"p","seed":1,"traceMarginMm":-1}"#,
            r#"{"problemId":"p","seed":1,"minPointSeparationMm":50}"#,
        ] {
            assert!(
                matches!(
                    parse_request(body.as_bytes()),
                    Err(RequestError::OutOfRange { .. })
                ),
                "body {}",
                body
            );
        }

        let edge = parse_request(
            br#"{"problemId":"p","seed":1,"traceMarginMm":0,"cellSizeMm":1,"viaDiameterMm":1}"#,
        )
        .unwrap();
        assert_eq!(edge.trace_margin_mm, 0.0);
        assert_eq!(edge.via_diameter_mm, 1.0);
    }

    #[test]
    fn test_response_wire_format() {
        let failure = GenerateResponse::failure("no solution", 3);
        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"ok": false, "cached": false, "reason": "no solution", "attempts": 3})
        );
    }
}
