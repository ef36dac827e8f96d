//! Request-scoped audit context
//!
//! Every inbound request runs inside its own task-local scope holding the
//! acting principal, client IP and user agent. Persistence hooks read the
//! scope of whatever task is performing the mutation, so two concurrently
//! handled requests can never observe each other's context.
//!
//! Task-locals do not follow `tokio::spawn`. Work spawned from a request that
//! should stay attributed must be wrapped with [`propagate`].

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::future::Future;
use std::net::IpAddr;

/// Maximum stored user-agent length, in characters
pub const USER_AGENT_MAX_LEN: usize = 255;

tokio::task_local! {
    static CURRENT: RefCell<RequestContext>;
}

/// Reference to the authenticated principal behind a change
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    /// User id
    pub id: i64,
    /// Login name, used for display and search
    pub username: String,
}

impl Actor {
    /// Create an actor reference
    pub fn new(id: i64, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
        }
    }
}

/// Who is acting, and from where, for the request in flight
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Authenticated principal; `None` for anonymous or system changes
    pub actor: Option<Actor>,
    /// Client address
    pub ip_address: Option<IpAddr>,
    /// User agent, truncated to [`USER_AGENT_MAX_LEN`] characters
    pub user_agent: Option<String>,
}

impl RequestContext {
    /// Context with every field absent
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Build a context from the raw values the request layer sees
    ///
    /// The client IP is the first entry of the forwarded-for chain when that
    /// entry is present, non-blank and parses as an address. Otherwise the
    /// direct peer address is used.
    pub fn from_request(
        actor: Option<Actor>,
        forwarded_for: Option<&str>,
        user_agent: Option<&str>,
        peer: Option<IpAddr>,
    ) -> Self {
        Self {
            actor,
            ip_address: client_ip(forwarded_for, peer),
            user_agent: user_agent.map(truncate_user_agent),
        }
    }

    /// Set the actor
    pub fn with_actor(mut self, actor: Actor) -> Self {
        self.actor = Some(actor);
        self
    }

    /// Set the client address
    pub fn with_ip(mut self, ip: IpAddr) -> Self {
        self.ip_address = Some(ip);
        self
    }

    /// Set the user agent (truncated)
    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = Some(truncate_user_agent(user_agent));
        self
    }
}

fn client_ip(forwarded_for: Option<&str>, peer: Option<IpAddr>) -> Option<IpAddr> {
    let first_hop = forwarded_for
        .and_then(|chain| chain.split(',').next())
        .map(str::trim)
        .filter(|hop| !hop.is_empty());

    match first_hop {
        Some(hop) => match hop.parse::<IpAddr>() {
            Ok(ip) => Some(ip),
            Err(_) => {
                tracing::debug!(
                    forwarded_for = hop,
                    "Unparseable forwarded-for entry, using peer address"
                );
                peer
            }
        },
        None => peer,
    }
}

fn truncate_user_agent(user_agent: &str) -> String {
    user_agent.chars().take(USER_AGENT_MAX_LEN).collect()
}

/// Run `fut` with `ctx` as the current request context
pub async fn scope<F>(ctx: RequestContext, fut: F) -> F::Output
where
    F: Future,
{
    CURRENT.scope(RefCell::new(ctx), fut).await
}

/// Replace the context of the current scope
///
/// Values are overwritten, never merged. Outside of any scope this does
/// nothing.
pub fn set(ctx: RequestContext) {
    if CURRENT.try_with(|cell| cell.replace(ctx)).is_err() {
        tracing::debug!("Audit context set outside of a request scope; ignored");
    }
}

/// Snapshot of the current context, or the anonymous default
pub fn get() -> RequestContext {
    CURRENT
        .try_with(|cell| cell.borrow().clone())
        .unwrap_or_default()
}

/// Wrap a future so it runs with a copy of the caller's context
///
/// Use when handing work to `tokio::spawn` from inside a request.
pub fn propagate<F>(fut: F) -> impl Future<Output = F::Output>
where
    F: Future,
{
    let ctx = get();
    CURRENT.scope(RefCell::new(ctx), fut)
}
