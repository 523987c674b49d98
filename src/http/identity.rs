//! Client identity extraction for rate limiting.

use axum::http::HeaderMap;
use std::net::{IpAddr, SocketAddr};

/// Header set by most reverse proxies with the client chain.
const X_FORWARDED_FOR: &str = "x-forwarded-for";
/// Single-address alternative used by some proxies.
const X_REAL_IP: &str = "x-real-ip";

/// Derive the rate limiting key for a request.
///
/// The key is the client IP address without a port. Proxy headers are only
/// consulted when `trust_proxy` is set. The first valid address in
/// `X-Forwarded-For` wins, then `X-Real-IP`, then the peer.
pub fn client_identity(peer: SocketAddr, headers: &HeaderMap, trust_proxy: bool) -> String {
    let forwarded = if trust_proxy {
        forwarded_ip(headers)
    } else {
        None
    };

    forwarded
        .unwrap_or_else(|| peer.ip())
        .to_canonical()
        .to_string()
}

fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    let first_forwarded = headers
        .get(X_FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').find_map(parse_addr));

    first_forwarded.or_else(|| {
        headers
            .get(X_REAL_IP)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_addr)
    })
}

/// Parse a bare IP or an `ip:port` pair.
fn parse_addr(raw: &str) -> Option<IpAddr> {
    let raw = raw.trim();
    raw.parse::<IpAddr>()
        .ok()
        .or_else(|| raw.parse::<SocketAddr>().ok().map(|s| s.ip()))
}
