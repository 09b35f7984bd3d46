// Per-IP request budget for the JSON API

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use tokio::task::JoinHandle;

use crate::api::errors::ApiError;
use crate::state::AppState;

pub const RATE_LIMIT_MESSAGE: &str = "Too many requests from this ip, please try again after some time";

pub type IpRateLimiter = DefaultKeyedRateLimiter<IpAddr>;

/// `max_per_hour` requests per client, replenished evenly over the hour
pub fn ip_rate_limiter(max_per_hour: u32) -> IpRateLimiter {
    let max = NonZeroU32::new(max_per_hour).unwrap_or(NonZeroU32::MIN);
    RateLimiter::keyed(Quota::per_hour(max))
}

/// Drops buckets that have refilled completely, returning how many remain
pub fn prune_idle(limiter: &IpRateLimiter) -> usize {
    limiter.retain_recent();
    limiter.shrink_to_fit();
    limiter.len()
}

/// Prunes idle buckets every `period` so one-off clients do not accumulate
pub fn spawn_pruner(limiter: Arc<IpRateLimiter>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let remaining = prune_idle(&limiter);
            tracing::debug!(remaining, "Pruned idle rate limit buckets");
        }
    })
}

/// Client address: the first `x-forwarded-for` hop behind a trusted proxy,
/// otherwise the socket peer
fn client_ip(request: &Request, trust_proxy: bool) -> IpAddr {
    let forwarded = || {
        request
            .headers()
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .and_then(|ip| ip.trim().parse::<IpAddr>().ok())
    };

    trust_proxy
        .then(forwarded)
        .flatten()
        .or_else(|| {
            request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip())
        })
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

pub async fn rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let ip = client_ip(&request, state.config.trust_proxy);
    if state.rate_limiter.check_key(&ip).is_err() {
        tracing::warn!(%ip, "Rate limit exceeded");
        return Err(ApiError::new(StatusCode::TOO_MANY_REQUESTS, RATE_LIMIT_MESSAGE));
    }
    Ok(next.run(request).await)
}
