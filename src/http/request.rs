//! Request descriptors and the cache keys derived from them.

use reqwest::Method;
use serde_json::Value;

/// One HTTP exchange to perform: method, URL, ordered query parameters and
/// an optional JSON body. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    method: Method,
    url: String,
    params: Vec<(String, String)>,
    body: Option<Value>,
}

impl Request {
    fn new(method: Method, url: impl Into<String>, body: Option<Value>) -> Self {
        Self {
            method,
            url: url.into(),
            params: Vec::new(),
            body,
        }
    }

    /// GET without a body.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url, None)
    }

    /// POST with a JSON body.
    pub fn post(url: impl Into<String>, body: Value) -> Self {
        Self::new(Method::POST, url, Some(body))
    }

    /// PUT with a JSON body.
    pub fn put(url: impl Into<String>, body: Value) -> Self {
        Self::new(Method::PUT, url, Some(body))
    }

    /// DELETE without a body.
    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::DELETE, url, None)
    }

    /// Appends query parameters, keeping their order.
    pub fn with_params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.params
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// HTTP method of the exchange.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Absolute URL, without the query parameters.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Query parameters in insertion order.
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// JSON body sent with POST and PUT.
    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// Key under which the response to this request is cached.
    pub fn cache_key(&self) -> CacheKey {
        CacheKey {
            method: self.method.clone(),
            url: self.url.clone(),
            params: self.params.clone(),
            body: self.body.as_ref().map(Value::to_string),
        }
    }
}

/// Identity of a request for caching: every field of the descriptor, with
/// the body in its serialized form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    method: Method,
    url: String,
    params: Vec<(String, String)>,
    body: Option<String>,
}
