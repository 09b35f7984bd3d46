// Security response headers
// Defaults mirror what helmet sets; HTML pages get a CSP that allows the map,
// payment and CDN scripts they load

use axum::{
    extract::Request,
    http::{header, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};

/// Content-Security-Policy for server-rendered pages
pub const VIEW_CSP: &str = "default-src 'self' https://*.mapbox.com https://js.stripe.com/v3/;\
base-uri 'self';block-all-mixed-content;font-src 'self' https: data:;frame-ancestors 'self';\
img-src 'self' data:;object-src 'none';\
script-src https://js.stripe.com/v3/ https://cdnjs.cloudflare.com https://api.mapbox.com \
https://cdn.jsdelivr.net/npm/sweetalert2@10 'self' blob: ;script-src-attr 'none';\
style-src 'self' https: 'unsafe-inline';upgrade-insecure-requests;";

const DEFAULT_CSP: &str = "default-src 'self';base-uri 'self';font-src 'self' https: data:;\
form-action 'self';frame-ancestors 'self';img-src 'self' data:;object-src 'none';\
script-src 'self';script-src-attr 'none';style-src 'self' https: 'unsafe-inline';\
upgrade-insecure-requests";

const STATIC_HEADERS: [(&str, &str); 9] = [
    ("cross-origin-opener-policy", "same-origin"),
    ("cross-origin-resource-policy", "same-origin"),
    ("origin-agent-cluster", "?1"),
    ("referrer-policy", "no-referrer"),
    ("strict-transport-security", "max-age=15552000; includeSubDomains"),
    ("x-content-type-options", "nosniff"),
    ("x-dns-prefetch-control", "off"),
    ("x-frame-options", "SAMEORIGIN"),
    ("x-permitted-cross-domain-policies", "none"),
];

/// Adds the default security headers without overriding ones a handler set
pub async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    for (name, value) in STATIC_HEADERS {
        headers
            .entry(HeaderName::from_static(name))
            .or_insert(HeaderValue::from_static(value));
    }
    headers
        .entry(header::CONTENT_SECURITY_POLICY)
        .or_insert(HeaderValue::from_static(DEFAULT_CSP));
    headers.insert("x-xss-protection", HeaderValue::from_static("0"));

    response
}
