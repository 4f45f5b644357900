//! Resolver pipeline contract and the upstream stage.
//!
//! Queries flow through a singly linked chain of stages. Each stage either
//! answers a [`Request`] itself or hands it to its successor unchanged.
//! The chain is assembled once at startup with [`chain`] and is read-only
//! while serving.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hickory_proto::op::Message;
use hickory_proto::serialize::binary::{BinDecodable, BinEncodable};
use tokio::net::UdpSocket;

use crate::error::{Error, Result};

/// Receive buffer size for upstream UDP answers.
pub const MAX_UDP_DNS_SIZE: usize = 4096;

/// A query entering the pipeline.
#[derive(Debug, Clone)]
pub struct Request {
    /// The DNS query message.
    pub message: Message,
    /// Candidate names of the requesting client, most specific first.
    pub client_names: Vec<String>,
    /// Address the query came from.
    pub client_ip: IpAddr,
    /// Trace context of the query. Stages log and delegate inside it.
    pub span: tracing::Span,
}

impl Request {
    pub fn new(message: Message, client_names: Vec<String>, client_ip: IpAddr) -> Self {
        Self {
            message,
            client_names,
            client_ip,
            span: tracing::Span::current(),
        }
    }
}

/// How a [`Response`] was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    /// Synthesized by the blocking stage.
    Blocked,
    /// Answered by a downstream resolver.
    Resolved,
    /// Answered by the upstream server.
    Upstream,
}

/// The answer leaving the pipeline.
#[derive(Debug, Clone)]
pub struct Response {
    pub message: Message,
    pub kind: ResponseKind,
    /// Short human-readable reason, e.g. `BLOCKED (ads)`.
    pub reason: String,
}

impl Response {
    pub fn blocked(message: Message, group: &str) -> Self {
        Self {
            message,
            kind: ResponseKind::Blocked,
            reason: format!("BLOCKED ({group})"),
        }
    }

    pub fn resolved(message: Message, reason: impl Into<String>) -> Self {
        Self {
            message,
            kind: ResponseKind::Resolved,
            reason: reason.into(),
        }
    }

    pub fn upstream(message: Message, upstream: SocketAddr) -> Self {
        Self {
            message,
            kind: ResponseKind::Upstream,
            reason: format!("RESOLVED ({upstream})"),
        }
    }
}

/// A pipeline stage.
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Answer the request or delegate it.
    async fn resolve(&self, request: &Request) -> Result<Response>;

    /// Human-readable description of the stage's effective configuration.
    fn configuration(&self) -> Vec<String>;
}

/// A stage that can delegate to a successor.
pub trait ChainedResolver: Resolver {
    /// Set the successor, replacing any previous one. Only valid before
    /// the pipeline starts serving.
    fn next(&mut self, next: Arc<dyn Resolver>);
}

/// Link `stages` in order in front of `terminal` and return the head of
/// the pipeline.
pub fn chain(
    stages: Vec<Box<dyn ChainedResolver>>,
    terminal: Arc<dyn Resolver>,
) -> Arc<dyn Resolver> {
    stages.into_iter().rev().fold(terminal, |next, mut stage| {
        stage.next(next);
        let stage: Arc<dyn ChainedResolver> = Arc::from(stage);
        let stage: Arc<dyn Resolver> = stage;
        stage
    })
}

/// Default deadline for one upstream exchange.
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(5);

/// Terminal stage forwarding queries to an upstream server over UDP.
#[derive(Clone)]
pub struct UpstreamResolver {
    upstream_addr: SocketAddr,
    timeout: Duration,
}

impl UpstreamResolver {
    pub const fn new(upstream_addr: SocketAddr) -> Self {
        Self {
            upstream_addr,
            timeout: DEFAULT_UPSTREAM_TIMEOUT,
        }
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn exchange(&self, query: &Message) -> Result<Message> {
        let unspecified = if self.upstream_addr.is_ipv4() {
            IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        } else {
            IpAddr::V6(Ipv6Addr::UNSPECIFIED)
        };
        let socket = UdpSocket::bind(SocketAddr::new(unspecified, 0)).await?;
        socket.connect(self.upstream_addr).await?;

        let query_bytes = query.to_bytes()?;
        socket.send(&query_bytes).await?;

        let mut response_buf = [0u8; MAX_UDP_DNS_SIZE];
        loop {
            let len = socket.recv(&mut response_buf).await?;
            let message = Message::from_bytes(&response_buf[..len])?;
            if message.id() == query.id() {
                return Ok(message);
            }
            tracing::warn!(
                expected = query.id(),
                received = message.id(),
                upstream = %self.upstream_addr,
                "ignoring upstream answer with mismatched id"
            );
        }
    }
}

#[async_trait]
impl Resolver for UpstreamResolver {
    async fn resolve(&self, request: &Request) -> Result<Response> {
        let message = tokio::time::timeout(self.timeout, self.exchange(&request.message))
            .await
            .map_err(|_| {
                Error::Resolver(format!(
                    "upstream {} timed out after {:?}",
                    self.upstream_addr, self.timeout
                ))
            })??;

        Ok(Response::upstream(message, self.upstream_addr))
    }

    fn configuration(&self) -> Vec<String> {
        vec![
            format!("upstream = {}", self.upstream_addr),
            format!("timeout = {:?}", self.timeout),
        ]
    }
}
