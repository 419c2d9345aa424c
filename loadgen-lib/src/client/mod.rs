//! centralized (web) client creation
//!
//! All generated traffic goes through the client created here.
//! Unit tests drive runners with the in-process `mock_client` instead,
//! so that library test suites never make actual network requests.

use rama::{
    Layer as _, Service,
    error::{BoxError, ErrorContext as _},
    http::{
        HeaderValue, Request, Response, client::EasyHttpWebClient,
        layer::required_header::AddRequiredRequestHeadersLayer,
    },
    rt::Executor,
};

use crate::utils::env;

#[cfg(test)]
pub(crate) mod mock_client;

/// Create a new web client that can be cloned and shared between runners.
///
/// Connections are pooled by the client itself.
pub fn new_web_client()
-> Result<impl Service<Request, Output = Response, Error: Into<BoxError>> + Clone, BoxError> {
    let inner = EasyHttpWebClient::connector_builder()
        .with_default_transport_connector()
        .without_tls_proxy_support()
        .without_proxy_support()
        .with_tls_support_using_boringssl(None)
        .with_default_http_connector(Executor::default())
        .try_with_default_connection_pool()
        .context("create connection pool for load generator web client")?
        .build_client();

    Ok(AddRequiredRequestHeadersLayer::new()
        .with_user_agent_header_value(HeaderValue::from_static(env::user_agent()))
        .into_layer(inner))
}
