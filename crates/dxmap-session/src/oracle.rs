//! The recommendation oracle contract.
//!
//! The oracle is an external collaborator mapping a symptom set to candidate
//! diagnoses and recommended tests. The session only depends on this one
//! request/response contract; any transport failure, non-2xx status, or
//! undecodable body is treated uniformly as "no data" and triggers the
//! fallback branch.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Request body for one oracle query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OracleRequest {
    /// The symptom set the recommendation should be based on.
    pub symptoms: Vec<String>,
    /// Names of tests already performed in this session.
    #[serde(default)]
    pub previous_tests: Vec<String>,
    /// Lower bound on the cost weight of suggested tests.
    #[serde(default)]
    pub min_cost: f64,
    /// How many tests to suggest.
    #[serde(default = "default_n")]
    pub n: u32,
}

fn default_n() -> u32 {
    2
}

impl OracleRequest {
    /// Builds a request with the default tuning parameters
    /// (`previous_tests = []`, `min_cost = 0`, `n = 2`).
    pub fn for_symptoms(symptoms: Vec<String>) -> Self {
        OracleRequest {
            symptoms,
            previous_tests: Vec::new(),
            min_cost: 0.0,
            n: 2,
        }
    }
}

/// One recommended test in an oracle response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestAdvice {
    pub test_name: String,
    pub test_description: String,
    pub cost_weight: f64,
}

/// A successful oracle response.
///
/// `diseases` and `tests` are required -- a body missing either is malformed
/// and handled like an unreachable oracle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OracleResponse {
    /// Server-side echo of accumulated symptoms. Decoded for wire
    /// compatibility; the locally computed graph-wide union is authoritative.
    #[serde(
        default,
        rename = "allSymptoms",
        skip_serializing_if = "Option::is_none"
    )]
    pub all_symptoms: Option<Vec<String>>,
    /// Candidate condition names.
    pub diseases: Vec<String>,
    /// Recommended tests.
    pub tests: Vec<TestAdvice>,
}

/// Oracle failure modes. The session never distinguishes them beyond
/// logging; all of them route to the fallback expansion.
#[derive(Debug, Error)]
pub enum OracleError {
    /// The request never produced a response.
    #[error("oracle transport failure: {reason}")]
    Transport { reason: String },

    /// The oracle answered with a non-2xx status. Error bodies are never
    /// inspected.
    #[error("oracle returned status {status}")]
    Status { status: u16 },

    /// The response body did not decode into [`OracleResponse`].
    #[error("malformed oracle response: {reason}")]
    Malformed { reason: String },
}

/// The oracle capability: one suspendable call per activation.
#[allow(async_fn_in_trait)]
pub trait Oracle {
    /// Maps a symptom set to candidate diagnoses and recommended tests.
    async fn next_step(&self, request: &OracleRequest) -> Result<OracleResponse, OracleError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_defaults() {
        let req = OracleRequest::for_symptoms(vec!["fever".into()]);
        assert!(req.previous_tests.is_empty());
        assert_eq!(req.min_cost, 0.0);
        assert_eq!(req.n, 2);
    }

    #[test]
    fn request_deserializes_with_optional_fields_missing() {
        let req: OracleRequest = serde_json::from_str(r#"{"symptoms":["fever"]}"#).unwrap();
        assert_eq!(req.symptoms, vec!["fever"]);
        assert!(req.previous_tests.is_empty());
        assert_eq!(req.n, 2);
    }

    #[test]
    fn response_decodes_wire_field_names() {
        let json = r#"{
            "allSymptoms": ["fever", "cough"],
            "diseases": ["Influenza"],
            "tests": [
                {"test_name": "Rapid antigen", "test_description": "Nasal swab", "cost_weight": 10}
            ]
        }"#;
        let resp: OracleResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.all_symptoms.as_deref(), Some(&["fever".to_string(), "cough".to_string()][..]));
        assert_eq!(resp.diseases, vec!["Influenza"]);
        assert_eq!(resp.tests[0].test_name, "Rapid antigen");
        assert_eq!(resp.tests[0].cost_weight, 10.0);
    }

    #[test]
    fn response_missing_required_fields_is_an_error() {
        // No `tests` array: malformed, the caller falls back.
        let json = r#"{"diseases": ["Influenza"]}"#;
        assert!(serde_json::from_str::<OracleResponse>(json).is_err());
    }

    #[test]
    fn all_symptoms_is_optional() {
        let json = r#"{"diseases": [], "tests": []}"#;
        let resp: OracleResponse = serde_json::from_str(json).unwrap();
        assert!(resp.all_symptoms.is_none());
    }
}
