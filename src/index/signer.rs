use reqwest::header::{HeaderName, HeaderValue};
use reqwest::Request;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SigningError {
    #[error("invalid header name '{0}'")]
    InvalidHeaderName(String),

    #[error("invalid value for header '{0}'")]
    InvalidHeaderValue(String),

    #[error("signing failed: {0}")]
    Failed(String),
}

/// Authenticates an outgoing indexing request before it is sent.
///
/// Implementations see the fully built request (method, URL, headers and
/// body) and may add or rewrite headers.
pub trait RequestSigner: Send + Sync {
    fn sign(&self, request: &mut Request) -> Result<(), SigningError>;
}

/// Sends requests as they are
#[derive(Debug, Default, Clone)]
pub struct Unsigned;

impl RequestSigner for Unsigned {
    fn sign(&self, _request: &mut Request) -> Result<(), SigningError> {
        Ok(())
    }
}

/// Adds one fixed header to every request, e.g. `Authorization: ApiKey ...`.
#[derive(Debug, Clone)]
pub struct HeaderSigner {
    name: HeaderName,
    value: HeaderValue,
}

impl HeaderSigner {
    pub fn new(name: &str, value: &str) -> Result<Self, SigningError> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| SigningError::InvalidHeaderName(name.to_string()))?;
        let mut value = HeaderValue::from_str(value)
            .map_err(|_| SigningError::InvalidHeaderValue(name.to_string()))?;
        value.set_sensitive(true);

        Ok(Self { name, value })
    }
}

impl RequestSigner for HeaderSigner {
    fn sign(&self, request: &mut Request) -> Result<(), SigningError> {
        request
            .headers_mut()
            .insert(self.name.clone(), self.value.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::{Method, Url};

    fn request() -> Request {
        Request::new(
            Method::POST,
            Url::parse("http://localhost:9200/elblogs-2016.03.31/elb-access-logs").unwrap(),
        )
    }

    #[test]
    fn test_header_signer_adds_header() {
        let signer = HeaderSigner::new("Authorization", "ApiKey abc123").unwrap();
        let mut req = request();
        signer.sign(&mut req).unwrap();

        assert_eq!(req.headers()["authorization"], "ApiKey abc123");
    }

    #[test]
    fn test_header_signer_rejects_bad_input() {
        assert!(matches!(
            HeaderSigner::new("bad header", "x"),
            Err(SigningError::InvalidHeaderName(_))
        ));
        assert!(matches!(
            HeaderSigner::new("Authorization", "line\nbreak"),
            Err(SigningError::InvalidHeaderValue(_))
        ));
    }

    #[test]
    fn test_unsigned_leaves_request_alone() {
        let mut req = request();
        Unsigned.sign(&mut req).unwrap();
        assert!(req.headers().is_empty());
    }
}
