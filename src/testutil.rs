//! In-process DNS servers for exercising the probe over real sockets.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use hickory_proto::op::{Message, MessageType, ResponseCode};
use hickory_proto::rr::rdata::A;
use hickory_proto::rr::{Name, RData, Record};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, UdpSocket};

/// How the test server answers queries for its zone name
#[derive(Debug, Clone)]
pub struct Reply {
	name: Name,
	rcode: ResponseCode,
	address: Option<Ipv4Addr>,
}

impl Reply {
	/// NoError with a single `A` record.
	pub fn answer(name: &str, address: Ipv4Addr) -> Self {
		Reply {
			name: Name::from_ascii(name).unwrap(),
			rcode: ResponseCode::NoError,
			address: Some(address),
		}
	}

	/// The given response code and no answers.
	pub fn rcode(name: &str, rcode: ResponseCode) -> Self {
		Reply {
			name: Name::from_ascii(name).unwrap(),
			rcode,
			address: None,
		}
	}

	/// Build the response for `request`; other names get NXDOMAIN.
	pub fn respond(&self, request: &Message) -> Message {
		let mut response = Message::new();
		response.set_id(request.id());
		response.set_message_type(MessageType::Response);
		response.set_op_code(request.op_code());
		response.set_recursion_desired(request.recursion_desired());
		response.add_queries(request.queries().to_vec());

		let Some(query) = request.queries().first() else {
			response.set_response_code(ResponseCode::FormErr);
			return response;
		};
		if *query.name() != self.name {
			response.set_response_code(ResponseCode::NXDomain);
			return response;
		}

		response.set_response_code(self.rcode);
		if let (ResponseCode::NoError, Some(address)) = (self.rcode, self.address) {
			response.add_answer(Record::from_rdata(query.name().clone(), 60, RData::A(A(address))));
		}
		response
	}
}

/// Serve `reply` over UDP on an ephemeral loopback port.
pub async fn spawn_udp_server(reply: Reply) -> SocketAddr {
	let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
	let addr = socket.local_addr().unwrap();
	tokio::spawn(async move {
		let mut buf = vec![0u8; 4096];
		loop {
			let Ok((len, peer)) = socket.recv_from(&mut buf).await else {
				return;
			};
			let Ok(request) = Message::from_vec(&buf[..len]) else {
				continue;
			};
			let bytes = reply.respond(&request).to_vec().unwrap();
			let _ = socket.send_to(&bytes, peer).await;
		}
	});
	addr
}

/// Serve `reply` over TCP on an ephemeral loopback port.
pub async fn spawn_tcp_server(reply: Reply) -> SocketAddr {
	let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
	let addr = listener.local_addr().unwrap();
	let reply = Arc::new(reply);
	tokio::spawn(async move {
		while let Ok((mut stream, _)) = listener.accept().await {
			let reply = Arc::clone(&reply);
			tokio::spawn(async move {
				let Ok(len) = stream.read_u16().await else {
					return;
				};
				let mut buf = vec![0u8; usize::from(len)];
				if stream.read_exact(&mut buf).await.is_err() {
					return;
				}
				let Ok(request) = Message::from_vec(&buf) else {
					return;
				};
				let bytes = reply.respond(&request).to_vec().unwrap();
				let _ = stream.write_all(&(bytes.len() as u16).to_be_bytes()).await;
				let _ = stream.write_all(&bytes).await;
			});
		}
	});
	addr
}
