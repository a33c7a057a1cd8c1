use crate::config::{Config, Mode};
use crate::engine::Resolver;
use crate::gateway::ParameterStore;
use crate::metrics_defs::REQUESTS;
use crate::types::RequestKey;
use http_body_util::BodyExt;
use http_body_util::combinators::BoxBody;
use hyper::body::{Body, Bytes};
use hyper::service::Service;
use hyper::{Method, Request, Response, StatusCode};
use serde::Serialize;
use shared::counter;
use shared::http::{make_json_response, run_http_service};
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;

#[derive(thiserror::Error, Debug)]
pub enum ResolverApiError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub async fn serve(config: Config, store: Arc<dyn ParameterStore>) -> Result<(), ResolverApiError> {
    let service = ParamsService::new(&config, store);
    run_http_service(&config.listener.host, config.listener.port, service).await
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
struct HealthResponse {
    region: String,
    single_key: String,
    debug: String,
}

/// Serves `POST /params` and `GET /service/health`; everything else is a 404.
#[derive(Clone)]
pub struct ParamsService {
    resolver: Resolver,
    health: Arc<HealthResponse>,
}

impl ParamsService {
    pub fn new(config: &Config, store: Arc<dyn ParameterStore>) -> Self {
        ParamsService {
            resolver: Resolver::new(store, config.mode, config.debug),
            health: Arc::new(HealthResponse {
                region: config.parameter_store.region.clone(),
                single_key: (config.mode == Mode::SingleKey).to_string(),
                debug: config.debug.to_string(),
            }),
        }
    }

    async fn handle<B>(&self, req: Request<B>) -> Response<BoxBody<Bytes, ResolverApiError>>
    where
        B: Body,
        B::Error: fmt::Display,
    {
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        let response = match (&method, path.as_str()) {
            (&Method::POST, "/params") => self.resolve_params(req.into_body()).await,
            (&Method::GET, "/service/health") => make_json_response(StatusCode::OK, &*self.health),
            _ => {
                let message = format!(
                    "Route {path} not found with method {method}, please check request and try again"
                );
                make_json_response(StatusCode::NOT_FOUND, &ErrorResponse { error: message })
            }
        };

        let status = response.status();
        counter!(REQUESTS, "status" => status.as_str().to_string()).increment(1);
        tracing::info!(%method, path = %path, status = status.as_u16(), "Handled request");
        response
    }

    async fn resolve_params<B>(&self, body: B) -> Response<BoxBody<Bytes, ResolverApiError>>
    where
        B: Body,
        B::Error: fmt::Display,
    {
        let key = match body.collect().await {
            Ok(collected) => parse_key(&collected.to_bytes()),
            Err(e) => {
                tracing::warn!(error = %e, "Could not read request body");
                RequestKey::default()
            }
        };

        let key = match key.validate() {
            Ok(key) => key,
            Err(e) => {
                tracing::warn!(error = %e, "Rejecting request");
                return make_json_response(
                    StatusCode::BAD_REQUEST,
                    &ErrorResponse {
                        error: e.to_string(),
                    },
                );
            }
        };

        let entry = self.resolver.resolve(&key).await;
        make_json_response(entry.status, &*entry.document)
    }
}

/// An unparsable body is treated like one with every field missing.
fn parse_key(body: &[u8]) -> RequestKey {
    serde_json::from_slice(body).unwrap_or_else(|e| {
        tracing::debug!(error = %e, "Could not parse request body");
        RequestKey::default()
    })
}

impl<B> Service<Request<B>> for ParamsService
where
    B: Body + Send + 'static,
    B::Data: Send,
    B::Error: fmt::Display,
{
    type Response = Response<BoxBody<Bytes, Self::Error>>;
    type Error = ResolverApiError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<B>) -> Self::Future {
        let service = self.clone();
        Box::pin(async move { Ok(service.handle(req).await) })
    }
}
