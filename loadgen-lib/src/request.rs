//! Immutable description of the request fired on every iteration.

use rama::{
    error::{BoxError, ErrorContext as _},
    http::{HeaderMap, HeaderName, HeaderValue, Uri},
};

/// Path requested when none is configured.
pub const DEFAULT_PATH: &str = "/work";

/// Query parameters used when none are configured,
/// asking the target for 200ms of latency and a 5% failure rate.
pub const DEFAULT_QUERY_PARAMS: [(&str, &str); 2] = [("latencyMs", "200"), ("failRatePct", "5")];

pub fn default_query_params() -> Vec<(String, String)> {
    DEFAULT_QUERY_PARAMS
        .iter()
        .map(|(name, value)| ((*name).to_owned(), (*value).to_owned()))
        .collect()
}

/// Target of a load run.
///
/// Created once through [`RequestSpec::builder`] and never mutated afterwards.
/// The full target URI is computed (and validated) when the spec is built.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    base_url: Uri,
    path: String,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    target: Uri,
}

impl RequestSpec {
    pub fn builder(base_url: Uri) -> RequestSpecBuilder {
        RequestSpecBuilder {
            base_url,
            path: None,
            query: None,
            headers: HeaderMap::new(),
        }
    }

    pub fn base_url(&self) -> &Uri {
        &self.base_url
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Query parameters in the order they were declared.
    pub fn query_params(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// `{base_url}{path}?{query}` as sent on the wire.
    pub fn target_uri(&self) -> &Uri {
        &self.target
    }
}

#[derive(Debug, Clone)]
pub struct RequestSpecBuilder {
    base_url: Uri,
    path: Option<String>,
    query: Option<Vec<(String, String)>>,
    headers: HeaderMap,
}

impl RequestSpecBuilder {
    /// Overwrite the request path (default: [`DEFAULT_PATH`]).
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Append a query parameter.
    ///
    /// Adding any parameter replaces [`DEFAULT_QUERY_PARAMS`] as a whole.
    pub fn with_query_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query
            .get_or_insert_with(Vec::new)
            .push((name.into(), value.into()));
        self
    }

    pub fn with_query_params<I, K, V>(self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        params
            .into_iter()
            .fold(self, |builder, (name, value)| {
                builder.with_query_param(name, value)
            })
    }

    /// Send no query parameters at all.
    pub fn without_query_params(mut self) -> Self {
        self.query = Some(Vec::new());
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn try_with_header(self, name: &str, value: &str) -> Result<Self, BoxError> {
        let name = HeaderName::from_bytes(name.trim().as_bytes()).context("parse header name")?;
        let value = HeaderValue::from_str(value.trim()).context("parse header value")?;
        Ok(self.with_header(name, value))
    }

    pub fn build(self) -> Result<RequestSpec, BoxError> {
        let scheme = match self.base_url.scheme_str() {
            Some(scheme @ ("http" | "https")) => scheme,
            _ => {
                return Err(BoxError::from(format!(
                    "base URL '{}' is not an absolute http(s) URL",
                    self.base_url
                )));
            }
        };

        let Some(authority) = self.base_url.authority() else {
            return Err(BoxError::from(format!(
                "base URL '{}' has no host",
                self.base_url
            )));
        };

        if self.base_url.query().is_some() {
            return Err(BoxError::from(format!(
                "base URL '{}' contains a query: declare query parameters separately",
                self.base_url
            )));
        }

        let path = self.path.unwrap_or_else(|| DEFAULT_PATH.to_owned());
        if !path.starts_with('/') {
            return Err(BoxError::from(format!(
                "request path '{path}' must start with '/'"
            )));
        }

        let query = self.query.unwrap_or_else(default_query_params);
        if query.iter().any(|(name, _)| name.is_empty()) {
            return Err(BoxError::from("query parameter names cannot be empty"));
        }

        let mut target = format!(
            "{scheme}://{authority}{}{path}",
            self.base_url.path().trim_end_matches('/')
        );
        if !query.is_empty() {
            let encoded =
                serde_html_form::to_string(query.as_slice()).context("encode query parameters")?;
            target.push('?');
            target.push_str(&encoded);
        }
        let target: Uri = target.parse().context("parse target URI")?;

        Ok(RequestSpec {
            base_url: self.base_url,
            path,
            query,
            headers: self.headers,
            target,
        })
    }
}
