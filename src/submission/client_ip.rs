use std::net::IpAddr;

use axum::http::HeaderMap;
use ipnet::IpNet;

/// Resolve the address to run the IP cross-check and rate limit against.
///
/// `X-Forwarded-For` is only honoured when the direct peer sits inside one of
/// the trusted proxy networks. The header is walked right to left, skipping
/// trusted hops, and the first untrusted address is the client. Entries left
/// of it are client-supplied and never consulted.
pub fn resolve(headers: &HeaderMap, peer: IpAddr, trusted_proxies: &[IpNet]) -> IpAddr {
    let peer = peer.to_canonical();
    let trusted = |ip: &IpAddr| trusted_proxies.iter().any(|net| net.contains(ip));

    if !trusted(&peer) {
        return peer;
    }

    let Some(xff) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) else {
        return peer;
    };

    xff.rsplit(',')
        .filter_map(|s| s.trim().parse::<IpAddr>().ok())
        .map(|ip| ip.to_canonical())
        .find(|ip| !trusted(ip))
        .unwrap_or(peer)
}
