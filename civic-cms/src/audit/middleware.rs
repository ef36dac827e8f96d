//! Request middleware that opens the audit context scope
//!
//! Reads the acting principal from the [`Actor`] request extension (inserted
//! by whichever authentication layer runs before this one), the
//! `X-Forwarded-For` and `User-Agent` headers, and the peer address from
//! `ConnectInfo`. The rest of the request then runs inside that scope, so
//! any persistence hook fired while handling it sees this request's context
//! and no other.
//!
//! ```rust,ignore
//! Router::new()
//!     .merge(audit_routes())
//!     .layer(axum::middleware::from_fn(audit_context_middleware))
//! ```

use axum::{
    extract::{ConnectInfo, Request},
    middleware::Next,
    response::Response,
};
use http::header::USER_AGENT;
use std::net::SocketAddr;

use super::context::{self, Actor, RequestContext};

/// Proxy chain header
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Build the audit context of an inbound request
pub fn request_context(request: &Request) -> RequestContext {
    let headers = request.headers();
    let forwarded_for = headers
        .get(X_FORWARDED_FOR)
        .and_then(|v| v.to_str().ok());
    let user_agent = headers.get(USER_AGENT).and_then(|v| v.to_str().ok());
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    let actor = request.extensions().get::<Actor>().cloned();

    RequestContext::from_request(actor, forwarded_for, user_agent, peer)
}

/// Run the request inside its own audit context scope
pub async fn audit_context_middleware(request: Request, next: Next) -> Response {
    let ctx = request_context(&request);
    tracing::trace!(
        actor = ctx.actor.as_ref().map(|a| a.username.as_str()),
        ip = ?ctx.ip_address,
        "Audit context opened"
    );
    context::scope(ctx, next.run(request)).await
}
