//! DNS server orchestration.
//!
//! Receives queries over UDP, runs each one through the resolver pipeline
//! on its own task and sends the answer back to the client.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use hickory_proto::op::{Message, MessageType, ResponseCode};
use hickory_proto::serialize::binary::{BinDecodable, BinEncodable};
use tokio::net::UdpSocket;
use tracing::{Instrument, debug, instrument, warn};

use crate::dns::resolver::MAX_UDP_DNS_SIZE;
use crate::dns::{Request, Resolver};
use crate::error::Result;

/// Turns decoded queries into pipeline requests and answers.
#[derive(Clone)]
pub struct QueryHandler {
    pipeline: Arc<dyn Resolver>,
    client_names: Arc<HashMap<IpAddr, Vec<String>>>,
}

impl QueryHandler {
    /// Create a handler in front of `pipeline`. `client_names` gives the
    /// static names of known client addresses.
    pub fn new(pipeline: Arc<dyn Resolver>, client_names: HashMap<IpAddr, Vec<String>>) -> Self {
        Self {
            pipeline,
            client_names: Arc::new(client_names),
        }
    }

    /// Names configured for `client_ip`, empty when unknown.
    #[must_use]
    pub fn client_names_for(&self, client_ip: IpAddr) -> Vec<String> {
        self.client_names
            .get(&client_ip)
            .cloned()
            .unwrap_or_default()
    }

    /// Handle a DNS query and return the response.
    ///
    /// Never fails: a pipeline error is answered with SERVFAIL.
    #[instrument(skip(self, query), fields(domain))]
    pub async fn handle_query(&self, query: Message, client_ip: IpAddr) -> Message {
        metrics::counter!("groupwall_queries_total").increment(1);

        let Some(question) = query.queries().first() else {
            warn!("query has no questions");
            return error_response(&query, ResponseCode::FormErr);
        };
        tracing::Span::current().record("domain", question.name().to_string());

        let request = Request::new(query, self.client_names_for(client_ip), client_ip);
        match self.pipeline.resolve(&request).await {
            Ok(response) => {
                debug!(reason = %response.reason, "query answered");
                response.message
            }
            Err(err) => {
                warn!("failed to resolve query: {err}");
                metrics::counter!("groupwall_upstream_errors_total").increment(1);
                error_response(&request.message, ResponseCode::ServFail)
            }
        }
    }

    /// Decode a datagram, handle it and encode the answer.
    pub async fn handle_packet(&self, packet: &[u8], client_ip: IpAddr) -> Result<Vec<u8>> {
        let query = Message::from_bytes(packet)?;
        let response = self.handle_query(query, client_ip).await;
        Ok(response.to_bytes()?)
    }
}

/// Empty response to `query` carrying `code`.
fn error_response(query: &Message, code: ResponseCode) -> Message {
    let mut response = Message::new();
    response
        .set_id(query.id())
        .set_message_type(MessageType::Response)
        .set_op_code(query.op_code())
        .set_recursion_desired(query.recursion_desired())
        .set_recursion_available(true)
        .set_response_code(code);
    for question in query.queries() {
        response.add_query(question.clone());
    }
    response
}

/// Run the DNS server event loop.
///
/// Every received datagram is processed on its own task. The loop stops
/// once `running` is cleared and the next datagram (or error) arrives.
pub async fn run_server(
    socket: Arc<UdpSocket>,
    handler: QueryHandler,
    running: Arc<AtomicBool>,
) -> Result<()> {
    let mut buf = [0u8; MAX_UDP_DNS_SIZE];

    while running.load(Ordering::SeqCst) {
        let (len, peer) = match socket.recv_from(&mut buf).await {
            Ok(received) => received,
            Err(err) => {
                warn!("failed to receive datagram: {err}");
                continue;
            }
        };

        let packet = buf[..len].to_vec();
        let socket = Arc::clone(&socket);
        let handler = handler.clone();
        let span = tracing::info_span!("query", %peer);
        tokio::spawn(
            async move {
                reply(&socket, &handler, &packet, peer).await;
            }
            .instrument(span),
        );
    }

    Ok(())
}

async fn reply(socket: &UdpSocket, handler: &QueryHandler, packet: &[u8], peer: SocketAddr) {
    let bytes = match handler.handle_packet(packet, peer.ip()).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!("dropping malformed query: {err}");
            return;
        }
    };

    if let Err(err) = socket.send_to(&bytes, peer).await {
        warn!("failed to send response: {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::resolver::tests::{StubResolver, create_request};
    use hickory_proto::rr::RecordType;

    fn handler(stub: &StubResolver) -> QueryHandler {
        let mut client_names = HashMap::new();
        client_names.insert(
            "192.168.178.55".parse().unwrap(),
            vec!["laptop".to_string(), "laptop.lan".to_string()],
        );
        QueryHandler::new(Arc::new(stub.clone()), client_names)
    }

    #[tokio::test]
    async fn test_handle_query_passes_client_names() {
        let stub = StubResolver::new();
        let handler = handler(&stub);

        let query = create_request("example.com.", RecordType::A).message;
        let response = handler
            .handle_query(query, "192.168.178.55".parse().unwrap())
            .await;

        assert_eq!(response.id(), 1234);
        assert_eq!(response.response_code(), ResponseCode::NoError);
        let seen = stub.last_request.lock().clone().unwrap();
        assert_eq!(seen.client_names, vec!["laptop", "laptop.lan"]);
        assert_eq!(seen.client_ip, "192.168.178.55".parse::<IpAddr>().unwrap());
    }

    #[tokio::test]
    async fn test_handle_query_unknown_client_has_no_names() {
        let stub = StubResolver::new();
        let handler = handler(&stub);

        let query = create_request("example.com.", RecordType::A).message;
        handler.handle_query(query, "10.0.0.9".parse().unwrap()).await;

        let seen = stub.last_request.lock().clone().unwrap();
        assert!(seen.client_names.is_empty());
    }

    #[tokio::test]
    async fn test_handle_query_servfail_on_pipeline_error() {
        let stub = StubResolver::failing("connection refused");
        let handler = handler(&stub);

        let query = create_request("example.com.", RecordType::A).message;
        let response = handler
            .handle_query(query, "10.0.0.9".parse().unwrap())
            .await;

        assert_eq!(response.id(), 1234);
        assert_eq!(response.message_type(), MessageType::Response);
        assert_eq!(response.response_code(), ResponseCode::ServFail);
        assert_eq!(response.queries().len(), 1);
        assert!(response.answers().is_empty());
    }

    #[tokio::test]
    async fn test_handle_query_without_questions() {
        let stub = StubResolver::new();
        let handler = handler(&stub);

        let mut query = Message::new();
        query.set_id(7);
        let response = handler
            .handle_query(query, "10.0.0.9".parse().unwrap())
            .await;

        assert_eq!(response.id(), 7);
        assert_eq!(response.response_code(), ResponseCode::FormErr);
        assert_eq!(stub.resolve_count(), 0);
    }

    #[tokio::test]
    async fn test_handle_packet_round_trip() {
        let stub = StubResolver::new();
        let handler = handler(&stub);

        let packet = create_request("example.com.", RecordType::A)
            .message
            .to_bytes()
            .unwrap();
        let bytes = handler
            .handle_packet(&packet, "10.0.0.9".parse().unwrap())
            .await
            .unwrap();

        let response = Message::from_bytes(&bytes).unwrap();
        assert_eq!(response.id(), 1234);
        assert_eq!(stub.resolve_count(), 1);
    }

    #[tokio::test]
    async fn test_handle_packet_rejects_garbage() {
        let stub = StubResolver::new();
        let handler = handler(&stub);

        let result = handler
            .handle_packet(&[0x12], "10.0.0.9".parse().unwrap())
            .await;

        assert!(result.is_err());
        assert_eq!(stub.resolve_count(), 0);
    }

    #[tokio::test]
    async fn test_run_server_answers_over_udp() {
        let stub = StubResolver::new();
        let server_socket = Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap());
        let server_addr = server_socket.local_addr().unwrap();
        let running = Arc::new(AtomicBool::new(true));

        let server = tokio::spawn(run_server(
            Arc::clone(&server_socket),
            handler(&stub),
            Arc::clone(&running),
        ));

        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let packet = create_request("example.com.", RecordType::A)
            .message
            .to_bytes()
            .unwrap();
        client.send_to(&packet, server_addr).await.unwrap();

        let mut buf = [0u8; MAX_UDP_DNS_SIZE];
        let (len, _) = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            client.recv_from(&mut buf),
        )
        .await
        .unwrap()
        .unwrap();

        let response = Message::from_bytes(&buf[..len]).unwrap();
        assert_eq!(response.id(), 1234);
        assert_eq!(response.response_code(), ResponseCode::NoError);

        running.store(false, Ordering::SeqCst);
        server.abort();
    }
}
