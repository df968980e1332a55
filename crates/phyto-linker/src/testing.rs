//! In-process name service for tests

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use phyto_core::{PhytoError, Result};

use crate::client::{ColResult, SearchResponse, TaxonomyService};

/// Answers from a fixed name table and records every query
#[derive(Default)]
pub(crate) struct FakeService {
    results: HashMap<String, ColResult>,
    failures: HashSet<String>,
    delay: Option<Duration>,
    calls: Mutex<Vec<String>>,
}

impl FakeService {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_result(mut self, name: &str, result: ColResult) -> Self {
        self.results.insert(name.to_string(), result);
        self
    }

    pub(crate) fn with_failure(mut self, name: &str) -> Self {
        self.failures.insert(name.to_string());
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Names queried so far, in call order
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl TaxonomyService for FakeService {
    async fn search(&self, name: &str) -> Result<SearchResponse> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(name.to_string());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failures.contains(name) {
            return Err(PhytoError::Service(format!("connection refused for '{name}'")));
        }

        let results: Vec<ColResult> = self.results.get(name).cloned().into_iter().collect();
        Ok(SearchResponse {
            name: name.to_string(),
            total_number_of_results: results.len() as u64,
            results,
        })
    }
}
