use http::{HeaderMap, HeaderName, Method};
use sha2::{Digest, Sha256};

/// The parts of an inbound request that can feed a request hash.
#[derive(Debug, Clone, Copy)]
pub struct RequestFingerprint<'a> {
    pub method: &'a Method,
    pub path: &'a str,
    pub query: Option<&'a str>,
    pub headers: &'a HeaderMap,
    pub body: &'a [u8],
}

impl<'a> RequestFingerprint<'a> {
    pub fn from_parts(parts: &'a http::request::Parts, body: &'a [u8]) -> Self {
        Self {
            method: &parts.method,
            path: parts.uri.path(),
            query: parts.uri.query(),
            headers: &parts.headers,
            body,
        }
    }
}

/// Strategy turning a request into the hash stored alongside its response.
pub trait RequestHasher: Send + Sync {
    fn hash(&self, request: &RequestFingerprint<'_>) -> String;
}

impl<F> RequestHasher for F
where
    F: Fn(&RequestFingerprint<'_>) -> String + Send + Sync,
{
    fn hash(&self, request: &RequestFingerprint<'_>) -> String {
        self(request)
    }
}

/// SHA-256 over method, path, query, selected headers and body.
#[derive(Debug, Clone)]
pub struct Sha256RequestHasher {
    hashed_headers: Vec<HeaderName>,
}

impl Default for Sha256RequestHasher {
    fn default() -> Self {
        Self::new(vec![http::header::AUTHORIZATION])
    }
}

impl Sha256RequestHasher {
    pub fn new(hashed_headers: Vec<HeaderName>) -> Self {
        Self { hashed_headers }
    }

    /// Builds a hasher from configured header names, skipping invalid ones.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Self {
        let hashed_headers = names
            .iter()
            .filter_map(|name| match HeaderName::from_bytes(name.as_ref().as_bytes()) {
                Ok(header) => Some(header),
                Err(_) => {
                    tracing::warn!(header = name.as_ref(), "Ignoring invalid hashed header name");
                    None
                }
            })
            .collect();
        Self::new(hashed_headers)
    }
}

impl RequestHasher for Sha256RequestHasher {
    fn hash(&self, request: &RequestFingerprint<'_>) -> String {
        let mut hasher = Sha256::new();

        hasher.update(request.method.as_str().as_bytes());
        hasher.update(b"|");
        hasher.update(normalize_path(request.path).as_bytes());

        if let Some(query) = request.query {
            hasher.update(b"?");
            hasher.update(query.as_bytes());
        }

        for name in &self.hashed_headers {
            hasher.update(b"|h:");
            hasher.update(name.as_str().as_bytes());
            hasher.update(b"=");
            for value in request.headers.get_all(name) {
                hasher.update(value.as_bytes());
                hasher.update(b",");
            }
        }

        hasher.update(b"|body:");
        hasher.update(request.body);

        hex::encode(hasher.finalize())
    }
}

/// Drops trailing slashes so `/orders/` and `/orders` hash alike.
pub fn normalize_path(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/"
    } else {
        trimmed
    }
}
