//! Pooled HTTPS POST used by hosted adapters.

use std::sync::Arc;
use std::time::Duration;

use hyper::body::{Bytes, to_bytes};
use hyper::client::HttpConnector;
use hyper::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, RETRY_AFTER};
use hyper::{Body, Client, Request, StatusCode, Uri};
use hyper_rustls::HttpsConnector;
use rustls::{ClientConfig, OwnedTrustAnchor, RootCertStore};
use tokio::time::timeout;

use crate::traits::{AdapterError, AdapterResult};

type Pooled = Client<HttpsConnector<HttpConnector>, Body>;

/// Status, throttling hint, and body of a completed exchange.
pub(crate) struct Exchange {
    pub(crate) status: StatusCode,
    pub(crate) retry_after: Option<Duration>,
    pub(crate) body: Bytes,
}

pub(crate) struct HttpsTransport {
    client: Pooled,
    timeout: Duration,
}

impl HttpsTransport {
    /// `timeout` bounds the whole exchange, body included.
    pub(crate) fn new(timeout: Duration) -> Self {
        let tls = ClientConfig::builder()
            .with_safe_defaults()
            .with_root_certificates(web_pki_roots())
            .with_no_client_auth();

        let mut http = HttpConnector::new();
        http.enforce_http(false);
        http.set_nodelay(true);

        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .build::<_, Body>(HttpsConnector::from((http, Arc::new(tls))));

        Self { client, timeout }
    }

    pub(crate) async fn post_json(
        &self,
        uri: &Uri,
        bearer: &str,
        body: Vec<u8>,
    ) -> AdapterResult<Exchange> {
        let request = Request::post(uri.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, format!("Bearer {bearer}"))
            .body(Body::from(body))
            .map_err(|err| AdapterError::transport(err.to_string()))?;

        let exchange = async {
            let response = self
                .client
                .request(request)
                .await
                .map_err(|err| AdapterError::transport(err.to_string()))?;
            let status = response.status();
            let retry_after = retry_after(response.headers());
            let body = to_bytes(response.into_body())
                .await
                .map_err(|err| AdapterError::transport(err.to_string()))?;
            Ok::<_, AdapterError>(Exchange {
                status,
                retry_after,
                body,
            })
        };

        timeout(self.timeout, exchange)
            .await
            .map_err(|_| AdapterError::TimedOut {
                after: self.timeout,
            })?
    }
}

fn web_pki_roots() -> RootCertStore {
    let mut roots = RootCertStore::empty();
    roots.add_trust_anchors(webpki_roots::TLS_SERVER_ROOTS.iter().map(|anchor| {
        OwnedTrustAnchor::from_subject_spki_name_constraints(
            anchor.subject,
            anchor.spki,
            anchor.name_constraints,
        )
    }));
    roots
}

/// Whole seconds only; HTTP-date values are ignored.
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let seconds = headers.get(RETRY_AFTER)?.to_str().ok()?.trim().parse().ok()?;
    Some(Duration::from_secs(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::HeaderValue;

    #[test]
    fn retry_after_reads_seconds() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static(" 3 "));
        assert_eq!(retry_after(&headers), Some(Duration::from_secs(3)));

        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(retry_after(&headers), None);
        assert_eq!(retry_after(&HeaderMap::new()), None);
    }
}
