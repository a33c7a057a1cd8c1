use crate::gateway::{
    GatewayError, HistoryEntry, MAX_LIST_RESULTS, ParameterStore, ParameterSummary,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    GetValue(String),
    GetHistory(String),
    List(String),
}

/// In-memory parameter store that records every call made against it.
#[derive(Default)]
pub struct MockParameterStore {
    values: Mutex<HashMap<String, String>>,
    histories: Mutex<HashMap<String, Vec<HistoryEntry>>>,
    summaries: Mutex<Vec<ParameterSummary>>,
    failing: Mutex<HashSet<String>>,
    calls: Mutex<Vec<Call>>,
    latency: Option<Duration>,
}

impl MockParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call sleeps for `latency` before answering.
    pub fn with_latency(latency: Duration) -> Self {
        MockParameterStore {
            latency: Some(latency),
            ..Self::default()
        }
    }

    pub fn set_value(&self, name: &str, value: &str) {
        self.values.lock().insert(name.into(), value.into());
    }

    /// Registers a listed parameter. `history` is `(value, description)` in store order.
    pub fn add_parameter(
        &self,
        name: &str,
        description: Option<&str>,
        value: &str,
        history: &[(&str, Option<&str>)],
    ) {
        self.summaries.lock().push(ParameterSummary {
            name: name.into(),
            description: description.map(str::to_string),
        });
        self.set_value(name, value);
        self.histories.lock().insert(
            name.into(),
            history
                .iter()
                .map(|(value, description)| HistoryEntry {
                    value: value.to_string(),
                    description: description.map(str::to_string),
                })
                .collect(),
        );
    }

    /// Every call naming `name` fails from now on.
    pub fn fail(&self, name: &str) {
        self.failing.lock().insert(name.into());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    async fn record(&self, call: Call, name: &str) -> Result<(), GatewayError> {
        self.calls.lock().push(call);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.failing.lock().contains(name) {
            return Err(GatewayError::Request {
                operation: "mock",
                name: name.into(),
                message: "injected failure".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ParameterStore for MockParameterStore {
    async fn get_value(&self, name: &str) -> Result<String, GatewayError> {
        self.record(Call::GetValue(name.into()), name).await?;
        self.values
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound { name: name.into() })
    }

    async fn get_history(&self, name: &str) -> Result<Vec<HistoryEntry>, GatewayError> {
        self.record(Call::GetHistory(name.into()), name).await?;
        Ok(self.histories.lock().get(name).cloned().unwrap_or_default())
    }

    async fn list_by_filter(&self, filter: &str) -> Result<Vec<ParameterSummary>, GatewayError> {
        self.record(Call::List(filter.into()), filter).await?;
        Ok(self
            .summaries
            .lock()
            .iter()
            .filter(|summary| summary.name.starts_with(filter))
            .take(MAX_LIST_RESULTS as usize)
            .cloned()
            .collect())
    }
}
