pub mod error;
pub mod outcome;

use error::{Error, Result};
use outcome::error_message;
pub use outcome::CallOutcome;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method};
use serde_json::Value;
use std::sync::OnceLock;
use tracing::{debug, error, info};

/// Tracing target shared by every diagnostic event this crate emits,
/// so host applications can route the integration's log channel.
pub const LOG_TARGET: &str = "zendesk";

/// Configuration keys queried when a credential was not set explicitly.
pub const CONFIG_EMAIL: &str = "zendesk/general/email";
pub const CONFIG_PASSWORD: &str = "zendesk/general/password";
pub const CONFIG_DOMAIN: &str = "zendesk/general/domain";

const API_ROOT: &str = "api/v2";

/// Read access to whatever configuration store the host application uses.
/// Queried lazily, once per credential, for the `CONFIG_*` keys.
pub trait ConfigProvider: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
}

/// Channel for user-facing error messages. Pushed to on non-silent calls
/// that come back with an error status.
pub trait Notifier: Send + Sync {
    fn add_error(&self, message: &str);
}

/// One request to be executed by [`RequestExecutor::call`].
///
/// `endpoint` is relative to the service's `api/v2` root. Query parameters
/// keep their insertion order in the final URL.
#[derive(Debug, Clone)]
pub struct CallRequest {
    endpoint: String,
    params: Vec<(String, String)>,
    method: Method,
    body: Option<Value>,
    silent: bool,
    global: bool,
}

impl CallRequest {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            params: Vec::new(),
            method: Method::GET,
            body: None,
            silent: false,
            global: false,
        }
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// JSON body. Only sent for POST and PUT; other methods ignore it.
    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Silent calls never touch the notifier; the error body comes back
    /// as data for the caller to inspect.
    pub fn silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    /// Reserved for per-store scoping. Accepted but currently inert.
    pub fn global(mut self, global: bool) -> Self {
        self.global = global;
        self
    }
}

/// Performs authenticated JSON calls against a single Zendesk account.
///
/// Credentials resolve from the explicit `with_*` setters first, then fall
/// back to the injected [`ConfigProvider`], cached for the lifetime of the
/// instance. One instance per logical caller; the cached fields are
/// write-once and safe under concurrent reads.
pub struct RequestExecutor {
    client: Client,
    provider: Box<dyn ConfigProvider>,
    notifier: Option<Box<dyn Notifier>>,
    scheme: String,
    domain: OnceLock<String>,
    email: OnceLock<String>,
    token: OnceLock<String>,
}

impl RequestExecutor {
    pub fn new(provider: impl ConfigProvider + 'static) -> Result<Self> {
        let client = Client::builder()
            .user_agent(format!("zendesk-api/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(Error::ClientBuild)?;

        Ok(Self {
            client,
            provider: Box::new(provider),
            notifier: None,
            scheme: "https".to_string(),
            domain: OnceLock::new(),
            email: OnceLock::new(),
            token: OnceLock::new(),
        })
    }

    /// Account subdomain host, e.g. `example.zendesk.com`. Must carry no
    /// scheme and no trailing slash; not validated here.
    pub fn with_domain(self, domain: impl Into<String>) -> Self {
        let _ = self.domain.set(domain.into());
        self
    }

    pub fn with_email(self, email: impl Into<String>) -> Self {
        let _ = self.email.set(email.into());
        self
    }

    pub fn with_token(self, token: impl Into<String>) -> Self {
        let _ = self.token.set(token.into());
        self
    }

    pub fn with_notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Some(Box::new(notifier));
        self
    }

    /// Overrides the URL scheme. Production traffic is always HTTPS; plain
    /// HTTP exists for local mock servers.
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    /// The wire username: the configured email with the `/token` suffix
    /// marking token-based auth. The suffix is unconditional, whatever the
    /// value's origin.
    pub fn username(&self) -> String {
        let email = self
            .email
            .get_or_init(|| self.provider.get(CONFIG_EMAIL).unwrap_or_default());
        format!("{email}/token")
    }

    pub fn token(&self) -> &str {
        self.token
            .get_or_init(|| self.provider.get(CONFIG_PASSWORD).unwrap_or_default())
    }

    pub fn domain(&self) -> &str {
        self.domain
            .get_or_init(|| self.provider.get(CONFIG_DOMAIN).unwrap_or_default())
    }

    /// Absolute URL for a path relative to the `api/v2` root. Leading and
    /// trailing slashes on `path` are stripped; the path itself is not
    /// percent-encoded.
    pub fn build_url(&self, path: &str) -> String {
        format!(
            "{}://{}/{}/{}",
            self.scheme,
            self.domain(),
            API_ROOT,
            path.trim_matches('/')
        )
    }

    /// Executes one call and classifies the outcome.
    ///
    /// Transport-level failures are absorbed: they are logged and come back
    /// as [`CallOutcome::TransportFailure`], never as an `Err`. Error
    /// statuses come back as [`CallOutcome::ApplicationError`] with the
    /// decoded body unchanged; unless the request was silent, a readable
    /// message is also pushed to the notifier.
    pub async fn call(&self, request: CallRequest) -> CallOutcome {
        let CallRequest {
            mut endpoint,
            params,
            method,
            body,
            silent,
            global: _,
        } = request;

        if !params.is_empty() {
            endpoint = format!("{}?{}", endpoint, encode_query(&params));
        }

        let url = self.build_url(&endpoint);

        let payload = body.as_ref().map(Value::to_string).unwrap_or_default();
        info!(target: LOG_TARGET, %url, %method, data = %payload, "dispatching request");

        let mut req = self
            .client
            .request(method.clone(), &url)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .basic_auth(self.username(), Some(self.token()));

        if matches!(method, Method::POST | Method::PUT) {
            if let Some(data) = &body {
                req = req.body(data.to_string());
            }
        }

        let response = match req.send().await {
            Ok(response) => response,
            Err(err) => {
                error!(
                    target: LOG_TARGET,
                    %url,
                    %method,
                    data = %payload,
                    error = %err,
                    "request could not be completed"
                );
                return CallOutcome::TransportFailure;
            }
        };

        let status = response.status();
        let raw = match response.text().await {
            Ok(raw) => raw,
            Err(err) => {
                error!(target: LOG_TARGET, %url, error = %err, "failed to read response body");
                return CallOutcome::TransportFailure;
            }
        };

        // A body that is not JSON decodes to null and flows on unchanged.
        let decoded: Value = serde_json::from_str(&raw).unwrap_or(Value::Null);
        debug!(target: LOG_TARGET, status = status.as_u16(), body = %decoded, "response received");

        if status.is_client_error() || status.is_server_error() {
            if !silent {
                let message = format!("{} (HTTP {})", error_message(&decoded), status.as_u16());
                match &self.notifier {
                    Some(notifier) => notifier.add_error(&message),
                    None => {
                        error!(target: LOG_TARGET, status = status.as_u16(), %message, "request failed")
                    }
                }
            }
            return CallOutcome::ApplicationError {
                status: status.as_u16(),
                body: decoded,
            };
        }

        CallOutcome::Success(decoded)
    }
}

fn encode_query(params: &[(String, String)]) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in params {
        query.append_pair(key, value);
    }
    query.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    struct MapProvider {
        values: HashMap<String, String>,
        hits: Mutex<HashMap<String, usize>>,
    }

    impl MapProvider {
        fn new(pairs: &[(&str, &str)]) -> Self {
            Self {
                values: pairs
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                hits: Mutex::new(HashMap::new()),
            }
        }

        fn hits(&self, key: &str) -> usize {
            self.hits.lock().unwrap().get(key).copied().unwrap_or(0)
        }
    }

    impl ConfigProvider for MapProvider {
        fn get(&self, key: &str) -> Option<String> {
            *self.hits.lock().unwrap().entry(key.to_string()).or_default() += 1;
            self.values.get(key).cloned()
        }
    }

    // Lets a test keep observing the provider after handing it to an
    // executor, which takes ownership.
    struct Shared(Arc<MapProvider>);

    impl ConfigProvider for Shared {
        fn get(&self, key: &str) -> Option<String> {
            self.0.get(key)
        }
    }

    #[test]
    fn explicit_credentials_skip_the_provider() {
        let provider = MapProvider::new(&[
            (CONFIG_EMAIL, "config@example.com"),
            (CONFIG_PASSWORD, "config-token"),
            (CONFIG_DOMAIN, "config.zendesk.com"),
        ]);
        let executor = RequestExecutor::new(provider)
            .unwrap()
            .with_domain("mine.zendesk.com")
            .with_email("me@example.com")
            .with_token("my-secret");

        assert_eq!(executor.username(), "me@example.com/token");
        assert_eq!(executor.token(), "my-secret");
        assert_eq!(executor.domain(), "mine.zendesk.com");
    }

    #[test]
    fn unset_credentials_resolve_from_config_exactly_once() {
        let provider = Arc::new(MapProvider::new(&[
            (CONFIG_EMAIL, "agent@example.com"),
            (CONFIG_PASSWORD, "s3cret"),
            (CONFIG_DOMAIN, "acme.zendesk.com"),
        ]));
        let executor = RequestExecutor::new(Shared(provider.clone())).unwrap();

        assert_eq!(executor.username(), "agent@example.com/token");
        assert_eq!(executor.username(), "agent@example.com/token");
        assert_eq!(executor.token(), "s3cret");
        assert_eq!(executor.token(), "s3cret");
        assert_eq!(executor.domain(), "acme.zendesk.com");

        assert_eq!(provider.hits(CONFIG_EMAIL), 1);
        assert_eq!(provider.hits(CONFIG_PASSWORD), 1);
        assert_eq!(provider.hits(CONFIG_DOMAIN), 1);
    }

    #[test]
    fn missing_config_values_resolve_to_empty() {
        let executor = RequestExecutor::new(MapProvider::new(&[])).unwrap();
        assert_eq!(executor.username(), "/token");
        assert_eq!(executor.token(), "");
        assert_eq!(executor.domain(), "");
    }

    #[test]
    fn token_suffix_applies_to_explicit_values_too() {
        let executor = RequestExecutor::new(MapProvider::new(&[]))
            .unwrap()
            .with_email("someone@example.com/token");
        assert_eq!(executor.username(), "someone@example.com/token/token");
    }

    #[test]
    fn build_url_strips_path_separators() {
        let executor = RequestExecutor::new(MapProvider::new(&[]))
            .unwrap()
            .with_domain("acme.zendesk.com");

        for path in ["/tickets/", "tickets", "tickets/", "/tickets"] {
            assert_eq!(
                executor.build_url(path),
                "https://acme.zendesk.com/api/v2/tickets"
            );
        }
    }

    #[test]
    fn encode_query_preserves_insertion_order() {
        let params = vec![
            ("sort_by".to_string(), "created_at".to_string()),
            ("query".to_string(), "type:ticket status:open".to_string()),
            ("page".to_string(), "2".to_string()),
        ];
        assert_eq!(
            encode_query(&params),
            "sort_by=created_at&query=type%3Aticket+status%3Aopen&page=2"
        );
    }

    #[test]
    fn encode_query_escapes_keys_and_values() {
        let params = vec![("a&b".to_string(), "c=d".to_string())];
        assert_eq!(encode_query(&params), "a%26b=c%3Dd");
    }
}
