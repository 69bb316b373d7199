use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{cache::AdmissionLimiter, error::AppError};

/// 没有连接信息时（例如进程内测试）使用的客户端标识
pub const UNKNOWN_CLIENT: &str = "unknown";

/// 取对端 IP 作为客户端标识；不信任 x-forwarded-for 等可伪造的请求头
pub fn client_identity(req: &Request<Body>) -> String {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

pub async fn rate_limit(
    State(limiter): State<AdmissionLimiter>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let client = client_identity(&req);

    if !limiter.admit(&client).is_allowed() {
        return AppError::RateLimited.into_response();
    }

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn identity_uses_peer_ip_without_port() {
        let mut req = Request::new(Body::empty());
        req.extensions_mut().insert(ConnectInfo(SocketAddr::new(
            IpAddr::V4(Ipv4Addr::new(192, 168, 0, 1)),
            54321,
        )));

        assert_eq!(client_identity(&req), "192.168.0.1");
    }

    #[test]
    fn forwarding_headers_are_ignored() {
        let req = Request::builder()
            .header("x-forwarded-for", "1.2.3.4")
            .body(Body::empty())
            .unwrap();

        assert_eq!(client_identity(&req), UNKNOWN_CLIENT);
    }
}
