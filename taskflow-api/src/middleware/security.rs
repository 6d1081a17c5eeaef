/// Security headers middleware
///
/// Adds a small set of response headers appropriate for a JSON API:
///
/// - `X-Content-Type-Options: nosniff` - attachments are served by URL,
///   never sniffed into HTML
/// - `X-Frame-Options: DENY`
/// - `Referrer-Policy: no-referrer`
/// - `Strict-Transport-Security` - production only

use axum::{extract::Request, response::Response};
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// Security headers middleware layer
#[derive(Clone)]
pub struct SecurityHeadersLayer {
    /// Whether to send HSTS (requires HTTPS, production only)
    enable_hsts: bool,
}

impl SecurityHeadersLayer {
    pub fn new(enable_hsts: bool) -> Self {
        Self { enable_hsts }
    }
}

impl<S> Layer<S> for SecurityHeadersLayer {
    type Service = SecurityHeadersMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SecurityHeadersMiddleware {
            inner,
            enable_hsts: self.enable_hsts,
        }
    }
}

/// Security headers middleware service
#[derive(Clone)]
pub struct SecurityHeadersMiddleware<S> {
    inner: S,
    enable_hsts: bool,
}

impl<S> Service<Request> for SecurityHeadersMiddleware<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let future = self.inner.call(request);
        let enable_hsts = self.enable_hsts;

        Box::pin(async move {
            let mut response = future.await?;
            let headers = response.headers_mut();

            headers.insert(
                "X-Content-Type-Options",
                axum::http::HeaderValue::from_static("nosniff"),
            );
            headers.insert(
                "X-Frame-Options",
                axum::http::HeaderValue::from_static("DENY"),
            );
            headers.insert(
                "Referrer-Policy",
                axum::http::HeaderValue::from_static("no-referrer"),
            );

            if enable_hsts {
                headers.insert(
                    "Strict-Transport-Security",
                    axum::http::HeaderValue::from_static("max-age=31536000; includeSubDomains"),
                );
            }

            Ok(response)
        })
    }
}
