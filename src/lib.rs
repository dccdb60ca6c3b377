pub use dnswire::{
    DecodeError, DnsHeader, DnsMessage, DnsQuestion, DnsRecord, EncodeError, QueryType,
    RecordData, ResponseCode,
};
use log::{debug, error, trace, warn};
use std::{
    io,
    net::{Ipv4Addr, UdpSocket},
};
use typed_builder::TypedBuilder;

pub const MAX_PACKET_SIZE: usize = 512;
/// Datagrams shorter than this are dropped without a reply.
pub const MIN_REQUEST_SIZE: usize = 8;

/// The single A record handed out to every client.
#[derive(Clone, Debug, PartialEq, Eq, TypedBuilder)]
pub struct CannedAnswer {
    #[builder(default = 1234)]
    pub id: u16,
    #[builder(default = "codecrafters.io".to_string(), setter(into))]
    pub name: String,
    #[builder(default = Ipv4Addr::new(8, 8, 8, 8))]
    pub addr: Ipv4Addr,
    #[builder(default = 60)]
    pub ttl: u32,
}

impl Default for CannedAnswer {
    fn default() -> Self {
        CannedAnswer::builder().build()
    }
}

impl CannedAnswer {
    pub fn message(&self) -> DnsMessage {
        let header = DnsHeader::builder().id(self.id).response(true).build();

        DnsMessage::new(header)
            .with_question(DnsQuestion::new(self.name.clone(), QueryType::A))
            .with_answer(DnsRecord::new(
                self.name.clone(),
                self.ttl,
                RecordData::A(self.addr),
            ))
    }
}

pub fn mk_query(id: u16, qname: &str, qtype: QueryType) -> DnsMessage {
    let header = DnsHeader::builder().id(id).recursion_desired(true).build();

    DnsMessage::new(header).with_question(DnsQuestion::new(qname, qtype))
}

/// Builds the reply for one datagram, or `None` when it is too short to answer.
/// The request is otherwise only inspected for logging.
pub fn respond(request: &[u8], answer: &CannedAnswer) -> anyhow::Result<Option<Vec<u8>>> {
    if request.len() < MIN_REQUEST_SIZE {
        warn!("Dropping {} byte request", request.len());
        return Ok(None);
    }

    match DnsMessage::decode(request) {
        Ok(query) => match query.first_question() {
            Some(q) => debug!("Query {} for {} ({:?})", query.header().id, q.name, q.qtype),
            None => debug!("Query {} without a question", query.header().id),
        },
        Err(e) => warn!("Could not decode {} byte request: {}", request.len(), e),
    }

    let response = answer.message().to_bytes()?;
    Ok(Some(response))
}

/// Receives one datagram and answers it.
pub fn serve_once(socket: &UdpSocket, answer: &CannedAnswer) -> anyhow::Result<()> {
    let mut buffer = [0u8; MAX_PACKET_SIZE];
    let (size, source) = socket.recv_from(&mut buffer)?;
    debug!("Received {} bytes from {}", size, source);

    let response = match respond(&buffer[..size], answer)? {
        Some(response) => response,
        None => return Ok(()),
    };
    if let Err(e) = socket.send_to(&response, source) {
        error!("Failed to send response to {}: {}", source, e);
    }

    Ok(())
}

/// Answers datagrams until receiving fails for a reason other than the read timeout.
pub fn serve(socket: &UdpSocket, answer: &CannedAnswer) -> anyhow::Result<()> {
    loop {
        match serve_once(socket, answer) {
            Ok(()) => {}
            Err(e) if is_timeout(&e) => trace!("Read timed out, still listening"),
            Err(e) => {
                error!("Error receiving data: {}", e);
                return Err(e);
            }
        }
    }
}

fn is_timeout(error: &anyhow::Error) -> bool {
    matches!(
        error.downcast_ref::<io::Error>().map(io::Error::kind),
        Some(io::ErrorKind::WouldBlock) | Some(io::ErrorKind::TimedOut)
    )
}
