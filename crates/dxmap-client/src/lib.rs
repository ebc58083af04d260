//! HTTP implementation of the recommendation oracle.
//!
//! Posts the session's symptom set to the backend's `next-test` endpoint.
//! Every failure mode -- connection errors, non-2xx statuses, undecodable
//! bodies -- maps to an [`OracleError`] the session treats uniformly as
//! "no data"; error bodies are never inspected.

use tracing::debug;

use dxmap_session::{Oracle, OracleError, OracleRequest, OracleResponse};

/// Oracle backed by the recommendation HTTP service.
#[derive(Debug, Clone)]
pub struct HttpOracle {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpOracle {
    /// Creates a client for the service at `base_url`
    /// (e.g. `http://localhost:5000`).
    pub fn new(base_url: &str) -> Self {
        HttpOracle {
            client: reqwest::Client::new(),
            endpoint: format!("{}/api/next-test", base_url.trim_end_matches('/')),
        }
    }
}

impl Oracle for HttpOracle {
    async fn next_step(&self, request: &OracleRequest) -> Result<OracleResponse, OracleError> {
        debug!(endpoint = %self.endpoint, symptoms = request.symptoms.len(), "querying oracle");

        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|err| OracleError::Transport {
                reason: err.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(OracleError::Status {
                status: status.as_u16(),
            });
        }

        response
            .json::<OracleResponse>()
            .await
            .map_err(|err| OracleError::Malformed {
                reason: err.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_is_derived_from_the_base_url() {
        let oracle = HttpOracle::new("http://localhost:5000/");
        assert_eq!(oracle.endpoint, "http://localhost:5000/api/next-test");
        let oracle = HttpOracle::new("https://dxmap.example.org");
        assert_eq!(oracle.endpoint, "https://dxmap.example.org/api/next-test");
    }

    #[tokio::test]
    async fn unusable_endpoint_maps_to_a_transport_error() {
        // An unparseable endpoint fails at request build time, without any
        // network traffic; the session only ever sees a Transport error.
        let oracle = HttpOracle::new("not a url");
        let request = OracleRequest::for_symptoms(vec!["fever".into()]);
        let err = oracle.next_step(&request).await.unwrap_err();
        assert!(matches!(err, OracleError::Transport { .. }));
    }
}
