use std::net::{IpAddr, SocketAddr};

use axum::{extract::ConnectInfo, http::Request};
use tower_governor::{key_extractor::KeyExtractor, GovernorError};

/// Header appended to by the reverse proxy in front of the service.
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Keys the rate limiter on the client address as seen by the one trusted proxy.
///
/// The proxy appends the address it received the connection from to
/// `X-Forwarded-For`, so only the last entry is trustworthy; anything before it was
/// written by the client. Without the header, or when the last entry isn't an IP
/// address, the peer address of the TCP connection is used.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProxyHopKeyExtractor;

impl KeyExtractor for ProxyHopKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        last_forwarded_hop(req)
            .or_else(|| {
                req.extensions()
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip())
            })
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

fn last_forwarded_hop<T>(req: &Request<T>) -> Option<IpAddr> {
    let header = req.headers().get_all(X_FORWARDED_FOR).iter().last()?;
    let hop = header.to_str().ok()?.rsplit(',').next()?;

    hop.trim().parse().ok()
}
