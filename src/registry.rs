//! Schema-registry client.
//!
//! A thin HTTP client in front of a Confluent-compatible schema registry,
//! caching registered subject -> id mappings so repeated registrations (one
//! per worker, for the same subject) don't round-trip the network.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::ExportError;

/// A registry client with a subject -> id cache guarded by a mutex.
pub struct RegistryClient {
    base_url: String,
    http: reqwest::blocking::Client,
    registered_subjects: Mutex<HashMap<String, u32>>,
}

impl RegistryClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::blocking::Client::new(),
            registered_subjects: Mutex::new(HashMap::new()),
        }
    }

    /// Registers `schema_json` under `subject`, returning its numeric id.
    /// Cached: a second call for the same subject returns the cached id
    /// without another request.
    pub fn register(&self, subject: &str, schema_json: &str) -> Result<u32, ExportError> {
        if let Some(&id) = self.registered_subjects.lock().unwrap().get(subject) {
            return Ok(id);
        }

        let url = format!("{}/subjects/{}/versions", self.base_url, subject);
        let body = serde_json::json!({ "schema": schema_json });

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| ExportError::Registry(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ExportError::Registry(format!(
                "registry returned {} for subject {subject}",
                response.status()
            )));
        }

        #[derive(serde::Deserialize)]
        struct RegisterResponse {
            id: u32,
        }

        let parsed: RegisterResponse = response
            .json()
            .map_err(|e| ExportError::Registry(e.to_string()))?;

        self.registered_subjects
            .lock()
            .unwrap()
            .insert(subject.to_string(), parsed.id);

        Ok(parsed.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caches_registered_subject_ids() {
        let client = RegistryClient::new("http://localhost:8081");
        client
            .registered_subjects
            .lock()
            .unwrap()
            .insert("topic-value".to_string(), 7);

        // register() should short-circuit on the cache and never touch the
        // network for an already-registered subject.
        let id = client.register("topic-value", "{}").unwrap();
        assert_eq!(id, 7);
    }
}
