//! Access to the external parameter store. The resolvers only depend on the
//! [`ParameterStore`] trait; [`SsmParameterStore`] is the production backend.
use crate::config::ParameterStoreConfig;
use crate::metrics_defs::{GATEWAY_ERRORS, GATEWAY_REQUEST_DURATION};
use async_trait::async_trait;
use aws_sdk_ssm::Client;
use aws_sdk_ssm::error::DisplayErrorContext;
use aws_sdk_ssm::types::ParameterStringFilter;
use aws_smithy_types::timeout::TimeoutConfig;
use shared::{counter, histogram};
use std::time::{Duration, Instant};

/// Upper bound on listed parameters. There is no pagination past this.
pub const MAX_LIST_RESULTS: i32 = 50;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    #[error("parameter {name} not found")]
    NotFound { name: String },
    #[error("{operation} failed for {name}: {message}")]
    Request {
        operation: &'static str,
        name: String,
        message: String,
    },
    #[error("store returned no value for {name}")]
    MissingValue { name: String },
    #[error("invalid filter: {0}")]
    InvalidFilter(String),
}

/// A previous value of a parameter. The description is where the store
/// keeps the version label.
#[derive(Clone, Debug, PartialEq)]
pub struct HistoryEntry {
    pub value: String,
    pub description: Option<String>,
}

/// Name and description of a parameter as returned by a listing.
#[derive(Clone, Debug, PartialEq)]
pub struct ParameterSummary {
    pub name: String,
    pub description: Option<String>,
}

#[async_trait]
pub trait ParameterStore: Send + Sync {
    /// Current (decrypted) value of `name`.
    async fn get_value(&self, name: &str) -> Result<String, GatewayError>;

    /// Full change history of `name` in store order.
    async fn get_history(&self, name: &str) -> Result<Vec<HistoryEntry>, GatewayError>;

    /// Parameters whose name begins with `filter`, at most [`MAX_LIST_RESULTS`].
    async fn list_by_filter(&self, filter: &str) -> Result<Vec<ParameterSummary>, GatewayError>;
}

pub struct SsmParameterStore {
    client: Client,
}

impl SsmParameterStore {
    pub async fn new(config: &ParameterStoreConfig) -> Self {
        let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;

        // Inherit credentials, retry and http settings, then apply our overrides
        Self::from_builder(aws_sdk_ssm::config::Builder::from(&sdk_config), config)
    }

    /// Applies the region, endpoint and timeout overrides of `config` on top
    /// of `builder`.
    pub fn from_builder(
        mut builder: aws_sdk_ssm::config::Builder,
        config: &ParameterStoreConfig,
    ) -> Self {
        builder = builder.region(aws_sdk_ssm::config::Region::new(config.region.clone()));

        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        if let Some(timeout_ms) = config.timeout_ms {
            let timeout_config = TimeoutConfig::builder()
                .operation_timeout(Duration::from_millis(timeout_ms))
                .build();
            builder = builder.timeout_config(timeout_config);
        }

        SsmParameterStore {
            client: Client::from_conf(builder.build()),
        }
    }
}

fn request_failed<E>(operation: &'static str, name: &str, err: E) -> GatewayError
where
    E: std::error::Error,
{
    GatewayError::Request {
        operation,
        name: name.to_string(),
        message: DisplayErrorContext(err).to_string(),
    }
}

fn record_call<T>(operation: &'static str, started: Instant, result: &Result<T, GatewayError>) {
    histogram!(GATEWAY_REQUEST_DURATION, "operation" => operation)
        .record(started.elapsed().as_secs_f64());
    if let Err(e) = result {
        counter!(GATEWAY_ERRORS, "operation" => operation).increment(1);
        tracing::debug!(operation, error = %e, "Parameter store call failed");
    }
}

#[async_trait]
impl ParameterStore for SsmParameterStore {
    async fn get_value(&self, name: &str) -> Result<String, GatewayError> {
        let started = Instant::now();
        let result = match self
            .client
            .get_parameter()
            .name(name)
            .with_decryption(true)
            .send()
            .await
        {
            Ok(output) => output
                .parameter()
                .and_then(|p| p.value())
                .map(str::to_string)
                .ok_or_else(|| GatewayError::MissingValue {
                    name: name.to_string(),
                }),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_parameter_not_found()) =>
            {
                Err(GatewayError::NotFound {
                    name: name.to_string(),
                })
            }
            Err(err) => Err(request_failed("GetParameter", name, err)),
        };
        record_call("get_parameter", started, &result);
        result
    }

    async fn get_history(&self, name: &str) -> Result<Vec<HistoryEntry>, GatewayError> {
        let started = Instant::now();
        let result: Result<Vec<HistoryEntry>, GatewayError> = self
            .client
            .get_parameter_history()
            .name(name)
            .with_decryption(true)
            .send()
            .await
            .map_err(|err| request_failed("GetParameterHistory", name, err))
            .map(|output| {
                output
                    .parameters()
                    .iter()
                    .map(|entry| HistoryEntry {
                        value: entry.value().unwrap_or_default().to_string(),
                        description: entry.description().map(str::to_string),
                    })
                    .collect()
            });
        record_call("get_parameter_history", started, &result);
        result
    }

    async fn list_by_filter(&self, filter: &str) -> Result<Vec<ParameterSummary>, GatewayError> {
        let started = Instant::now();
        let name_filter = ParameterStringFilter::builder()
            .key("Name")
            .option("BeginsWith")
            .values(filter)
            .build()
            .map_err(|e| GatewayError::InvalidFilter(e.to_string()))?;

        let result: Result<Vec<ParameterSummary>, GatewayError> = self
            .client
            .describe_parameters()
            .max_results(MAX_LIST_RESULTS)
            .parameter_filters(name_filter)
            .send()
            .await
            .map_err(|err| request_failed("DescribeParameters", filter, err))
            .map(|output| {
                output
                    .parameters()
                    .iter()
                    .filter_map(|metadata| {
                        Some(ParameterSummary {
                            name: metadata.name()?.to_string(),
                            description: metadata.description().map(str::to_string),
                        })
                    })
                    .collect()
            });
        record_call("describe_parameters", started, &result);
        result
    }
}
