use std::time::Duration;

use tracing::debug;
use ureq::{Agent, ResponseExt};

use crate::error::{ErrorCode, JsonLdError};
use crate::iri::resolve_iri;
use crate::models::{LoaderOptions, RemoteDocument};

pub const CONTEXT_LINK_REL: &str = "http://www.w3.org/ns/json-ld#context";
pub const CONTEXT_PROFILE: &str = "http://www.w3.org/ns/json-ld#context";

const DEFAULT_MAX_REDIRECTS: u32 = 10;
const DEFAULT_MAX_BODY_SIZE: u64 = 10 * 1024 * 1024;

/// Retrieves JSON-LD documents by URL. Implementations must be shareable
/// across threads; the processor only calls them from one thread at a time.
pub trait DocumentLoader: Send + Sync {
    fn load(&self, url: &str, options: &LoaderOptions) -> Result<RemoteDocument, JsonLdError>;
}

/// Blocking HTTP loader.
#[derive(Debug, Clone)]
pub struct HttpDocumentLoader {
    max_redirects: u32,
    max_body_size: u64,
    timeout: Option<Duration>,
    env_proxy: bool,
}

impl Default for HttpDocumentLoader {
    fn default() -> Self {
        HttpDocumentLoader {
            max_redirects: DEFAULT_MAX_REDIRECTS,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            timeout: None,
            env_proxy: true,
        }
    }
}

impl HttpDocumentLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_redirects(mut self, max_redirects: u32) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    pub fn with_max_body_size(mut self, max_body_size: u64) -> Self {
        self.max_body_size = max_body_size;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Whether proxy settings are read from the environment (default on).
    pub fn with_env_proxy(mut self, env_proxy: bool) -> Self {
        self.env_proxy = env_proxy;
        self
    }

    fn agent(&self) -> Agent {
        let mut config = Agent::config_builder()
            .max_redirects(self.max_redirects)
            .http_status_as_error(false)
            .timeout_global(self.timeout);
        if !self.env_proxy {
            config = config.proxy(None);
        }
        config.build().into()
    }

    fn fetch(
        &self,
        agent: &Agent,
        url: &str,
        options: &LoaderOptions,
        follow_alternate: bool,
    ) -> Result<RemoteDocument, JsonLdError> {
        debug!(url, "fetching JSON-LD document");

        let mut response = agent
            .get(url)
            .header("Accept", accept_header(options))
            .call()
            .map_err(|e| JsonLdError::loading(ErrorCode::LoadingDocumentFailed, url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(JsonLdError::loading(
                ErrorCode::LoadingDocumentFailed,
                url,
                format!("server responded with status {}", status.as_u16()),
            ));
        }

        let document_url = response.get_uri().to_string();
        let raw_content_type = header_value(&response, "content-type");
        let (content_type, profile) = match raw_content_type.as_deref() {
            Some(value) => parse_content_type(value),
            None => (None, None),
        };
        let links: Vec<Link> = response
            .headers()
            .get_all("link")
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(parse_link_header)
            .collect();

        if !content_type.as_deref().is_some_and(is_json_media_type) {
            let alternate = links.iter().find(|link| {
                link.rel.as_deref() == Some("alternate")
                    && link.media_type.as_deref() == Some("application/ld+json")
            });
            if follow_alternate && let Some(link) = alternate {
                let target = resolve_iri(Some(&document_url), &link.target).ok_or_else(|| {
                    JsonLdError::loading(
                        ErrorCode::LoadingDocumentFailed,
                        url,
                        format!("cannot resolve alternate link '{}'", link.target),
                    )
                })?;
                debug!(url, alternate = %target, "following alternate link");
                return self.fetch(agent, &target, options, false);
            }
            return Err(JsonLdError::loading(
                ErrorCode::LoadingDocumentFailed,
                url,
                format!(
                    "unsupported content type '{}'",
                    content_type.as_deref().unwrap_or("")
                ),
            ));
        }

        let mut context_url = None;
        if content_type.as_deref() != Some("application/ld+json") {
            let mut context_links = links
                .iter()
                .filter(|link| link.rel.as_deref() == Some(CONTEXT_LINK_REL));
            if let Some(link) = context_links.next() {
                if context_links.next().is_some() {
                    return Err(JsonLdError::new(
                        ErrorCode::MultipleContextLinkHeaders,
                        format!("'{}' returned more than one context link header", url),
                    ));
                }
                context_url = resolve_iri(Some(&document_url), &link.target);
            }
        }

        let body = response
            .body_mut()
            .with_config()
            .limit(self.max_body_size)
            .read_to_string()
            .map_err(|e| JsonLdError::loading(ErrorCode::LoadingDocumentFailed, url, e))?;

        let document: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| JsonLdError::loading(ErrorCode::LoadingDocumentFailed, url, e))?;

        Ok(RemoteDocument {
            document_url,
            context_url,
            content_type,
            profile,
            document,
        })
    }
}

impl DocumentLoader for HttpDocumentLoader {
    fn load(&self, url: &str, options: &LoaderOptions) -> Result<RemoteDocument, JsonLdError> {
        let agent = self.agent();
        self.fetch(&agent, url, options, true)
    }
}

fn header_value(response: &ureq::http::Response<ureq::Body>, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

fn accept_header(options: &LoaderOptions) -> String {
    let ld_json = if options.request_profile.is_empty() {
        "application/ld+json".to_string()
    } else {
        format!(
            "application/ld+json;profile=\"{}\"",
            options.request_profile.join(" ")
        )
    };
    format!("{ld_json}, application/json;q=0.9, */*;q=0.1")
}

/// Splits a `Content-Type` value into the lower-cased media type and the
/// optional `profile` parameter.
fn parse_content_type(value: &str) -> (Option<String>, Option<String>) {
    let mut parts = value.split(';');
    let media_type = parts
        .next()
        .map(|media| media.trim().to_ascii_lowercase())
        .filter(|media| !media.is_empty());
    let profile = parts.find_map(|param| {
        let (name, value) = param.split_once('=')?;
        (name.trim().eq_ignore_ascii_case("profile"))
            .then(|| value.trim().trim_matches('"').to_string())
    });
    (media_type, profile)
}

fn is_json_media_type(media_type: &str) -> bool {
    media_type == "application/json"
        || media_type == "application/ld+json"
        || media_type.ends_with("+json")
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Link {
    target: String,
    rel: Option<String>,
    media_type: Option<String>,
}

/// Parses one `Link` header, which may carry several comma separated links.
fn parse_link_header(value: &str) -> Vec<Link> {
    let mut links = Vec::new();
    let mut rest = value;
    while let Some(start) = rest.find('<') {
        let Some(end) = rest[start..].find('>') else {
            break;
        };
        let target = rest[start + 1..start + end].trim().to_string();
        rest = &rest[start + end + 1..];

        let params_end = rest.find(',').unwrap_or(rest.len());
        let params = &rest[..params_end];
        rest = &rest[params_end..];

        let mut link = Link {
            target,
            rel: None,
            media_type: None,
        };
        for param in params.split(';') {
            let Some((name, value)) = param.split_once('=') else {
                continue;
            };
            let value = value.trim().trim_matches('"').to_string();
            match name.trim().to_ascii_lowercase().as_str() {
                "rel" => link.rel = Some(value),
                "type" => link.media_type = Some(value.to_ascii_lowercase()),
                _ => {}
            }
        }
        links.push(link);
    }
    links
}
