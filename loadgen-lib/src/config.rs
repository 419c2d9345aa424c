//! Command line facing configuration of a load run.

use std::{num::NonZeroU64, time::Duration};

use clap::Args;
use rama::{
    error::{BoxError, ErrorContext as _},
    http::{HeaderName, HeaderValue, Uri},
};

use crate::{
    pacing::PacingConfig,
    request::{DEFAULT_PATH, RequestSpec},
    runner::RunConfig,
};

#[derive(Debug, Clone, Args)]
/// what to request and how often
pub struct LoadConfig {
    /// base URL of the target, e.g. `http://app:8080`
    #[arg(value_name = "BASE_URL", required = true)]
    pub base_url: Uri,

    /// path requested on every iteration
    #[arg(long, default_value = DEFAULT_PATH)]
    pub path: String,

    /// query parameter (repeatable), replaces the default
    /// `latencyMs=200` and `failRatePct=5` parameters
    #[arg(long = "param", value_name = "NAME=VALUE", value_parser = parse_query_param)]
    pub params: Vec<(String, String)>,

    /// header added to every request (repeatable)
    #[arg(long = "header", value_name = "NAME:VALUE", value_parser = parse_header)]
    pub headers: Vec<(HeaderName, HeaderValue)>,

    /// pause between the end of an iteration and the start of the next one
    #[arg(long, default_value = "100ms", value_parser = humantime::parse_duration)]
    pub delay: Duration,

    /// stop after this many iterations (unbounded if omitted)
    #[arg(long, value_name = "N")]
    pub iterations: Option<NonZeroU64>,

    /// stop once this much time passed since the first iteration
    #[arg(long, value_parser = humantime::parse_duration)]
    pub duration: Option<Duration>,

    /// per-request timeout
    #[arg(long, default_value = "30s", value_parser = humantime::parse_duration)]
    pub timeout: Duration,

    /// wait for as long as a request takes
    #[arg(long, default_value_t = false, conflicts_with = "timeout")]
    pub no_timeout: bool,
}

impl LoadConfig {
    pub fn request_spec(&self) -> Result<RequestSpec, BoxError> {
        let mut builder = RequestSpec::builder(self.base_url.clone()).with_path(self.path.clone());
        if !self.params.is_empty() {
            builder = builder.with_query_params(self.params.iter().cloned());
        }
        for (name, value) in &self.headers {
            builder = builder.with_header(name.clone(), value.clone());
        }
        builder.build().context("build request spec")
    }

    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            pacing: PacingConfig::new(self.delay),
            iterations: self.iterations,
            duration: self.duration,
            request_timeout: (!self.no_timeout).then_some(self.timeout),
        }
    }
}

pub fn parse_query_param(s: &str) -> Result<(String, String), BoxError> {
    let Some((name, value)) = s.split_once('=') else {
        return Err(BoxError::from(format!(
            "invalid query parameter '{s}': expected NAME=VALUE"
        )));
    };
    let name = name.trim();
    if name.is_empty() {
        return Err(BoxError::from(format!(
            "invalid query parameter '{s}': empty name"
        )));
    }
    Ok((name.to_owned(), value.to_owned()))
}

pub fn parse_header(s: &str) -> Result<(HeaderName, HeaderValue), BoxError> {
    let Some((name, value)) = s.split_once(':') else {
        return Err(BoxError::from(format!(
            "invalid header '{s}': expected NAME:VALUE"
        )));
    };
    let name = HeaderName::from_bytes(name.trim().as_bytes()).context("parse header name")?;
    let value = HeaderValue::from_str(value.trim()).context("parse header value")?;
    Ok((name, value))
}
