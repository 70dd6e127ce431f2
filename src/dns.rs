use std::net::SocketAddr;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use hickory_proto::op::{Message, MessageType, Query, ResponseCode};
use hickory_proto::rr::{Name, RData, RecordType};
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};

use crate::transport::Protocol;

/// Datagrams carrying a foreign message ID tolerated before giving up
const MAX_STRAY_REPLIES: usize = 3;

/// Failures below the DNS response layer: no usable reply was obtained
#[derive(Debug, Error)]
pub enum ExchangeError {
	#[error("i/o timeout after {0:?}")]
	Timeout(Duration),
	#[error("no address found for '{0}'")]
	NoAddress(String),
	#[error("invalid question: {0}")]
	InvalidQuestion(String),
	#[error(transparent)]
	Io(#[from] std::io::Error),
	#[error("malformed dns message: {0}")]
	Malformed(String),
	#[error("message id mismatch: expected {expected}, got {got}")]
	IdMismatch { expected: u16, got: u16 },
	#[error("received a query instead of a response")]
	NotAResponse,
}

/// DNS response information extracted from a parsed message
#[derive(Debug, Clone)]
pub struct DnsResponse {
	pub rcode: ResponseCode,
	/// Addresses of the `A` answer records, in message order
	pub answers: Vec<String>,
}

/// Build a recursion-desired `A` query for the given name.
///
/// Returns the serialized query bytes ready to put on the wire.
pub fn build_query(question: &str, txid: u16) -> Result<Vec<u8>> {
	let name = Name::from_ascii(question)
		.map_err(|e| anyhow!("invalid domain name '{}': {}", question, e))?;

	let mut message = Message::new();
	message.set_id(txid);
	message.set_recursion_desired(true);
	message.add_query(Query::query(name, RecordType::A));

	let bytes = message.to_vec()
		.map_err(|e| anyhow!("failed to serialize DNS query: {}", e))?;
	Ok(bytes)
}

/// Parse a DNS response, validating the transaction ID and collecting `A` answers.
pub fn parse_response(bytes: &[u8], expected_txid: u16) -> Result<DnsResponse, ExchangeError> {
	let message = Message::from_vec(bytes)
		.map_err(|e| ExchangeError::Malformed(e.to_string()))?;

	if message.id() != expected_txid {
		return Err(ExchangeError::IdMismatch {
			expected: expected_txid,
			got: message.id(),
		});
	}
	if message.message_type() != MessageType::Response {
		return Err(ExchangeError::NotAResponse);
	}

	let answers = message.answers().iter()
		.filter_map(|record| match record.data() {
			RData::A(a) => Some(a.0.to_string()),
			_ => None,
		})
		.collect();

	Ok(DnsResponse {
		rcode: message.response_code(),
		answers,
	})
}

/// Send one `A` query to `addr` and wait for the matching response.
///
/// The whole exchange, connection setup included, is bounded by `timeout`.
/// The returned duration covers only the time from writing the query to
/// reading the reply.
pub async fn exchange(
	protocol: Protocol,
	addr: SocketAddr,
	question: &str,
	timeout: Duration,
) -> Result<(DnsResponse, Duration), ExchangeError> {
	let txid: u16 = rand::random();
	let query = build_query(question, txid)
		.map_err(|e| ExchangeError::InvalidQuestion(e.to_string()))?;

	let attempt = async {
		match protocol {
			Protocol::Udp => exchange_udp(addr, &query, txid).await,
			Protocol::Tcp => exchange_tcp(addr, &query, txid).await,
		}
	};
	tokio::time::timeout(timeout, attempt)
		.await
		.map_err(|_| ExchangeError::Timeout(timeout))?
}

/// Query over a dedicated connected UDP socket.
///
/// Replies with a foreign message ID are skipped a few times so a late answer
/// to someone else's query does not fail the attempt.
async fn exchange_udp(
	addr: SocketAddr,
	query: &[u8],
	txid: u16,
) -> Result<(DnsResponse, Duration), ExchangeError> {
	let bind_addr = if addr.is_ipv4() {
		"0.0.0.0:0"
	} else {
		"[::]:0"
	};
	let socket = UdpSocket::bind(bind_addr).await?;
	socket.connect(addr).await?;

	let start = Instant::now();
	socket.send(query).await?;

	// 4096 bytes covers EDNS-sized replies
	let mut buf = vec![0u8; 4096];
	let mut strays = 0;
	loop {
		let len = socket.recv(&mut buf).await?;
		match parse_response(&buf[..len], txid) {
			Ok(response) => return Ok((response, start.elapsed())),
			Err(ExchangeError::IdMismatch { .. }) if strays < MAX_STRAY_REPLIES => strays += 1,
			Err(e) => return Err(e),
		}
	}
}

/// Query over TCP using the two-byte length framing.
async fn exchange_tcp(
	addr: SocketAddr,
	query: &[u8],
	txid: u16,
) -> Result<(DnsResponse, Duration), ExchangeError> {
	let mut stream = TcpStream::connect(addr).await?;

	let len = u16::try_from(query.len())
		.map_err(|_| ExchangeError::InvalidQuestion(format!("query of {} bytes is too long", query.len())))?;
	let mut framed = Vec::with_capacity(query.len() + 2);
	framed.extend_from_slice(&len.to_be_bytes());
	framed.extend_from_slice(query);

	let start = Instant::now();
	stream.write_all(&framed).await?;

	let reply_len = stream.read_u16().await?;
	let mut buf = vec![0u8; usize::from(reply_len)];
	stream.read_exact(&mut buf).await?;
	let response = parse_response(&buf, txid)?;
	Ok((response, start.elapsed()))
}
