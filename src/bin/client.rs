use log::debug;
use std::{net::UdpSocket, time::Duration};
use structopt::StructOpt;

use stubdns::{mk_query, DnsMessage, QueryType, MAX_PACKET_SIZE};

static UDP_RESPONSE_LISTENER: (&str, u16) = ("0.0.0.0", 0);

#[derive(Debug, StructOpt)]
#[structopt(name = "DNS Client", about = "Search DNS records for a given query")]
struct Opt {
    #[structopt(short, long, default_value = "codecrafters.io")]
    query: String,

    #[structopt(short, long, default_value = "127.0.0.1:2053")]
    server: String,

    #[structopt(long, default_value = "2000")]
    timeout_ms: u64,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    debug!("parsing args");

    let Opt {
        query,
        server,
        timeout_ms,
    } = StructOpt::from_args();
    debug!("args {} {}", query, server);

    let socket = UdpSocket::bind(UDP_RESPONSE_LISTENER)?;
    socket.set_read_timeout(Some(Duration::from_millis(timeout_ms)))?;

    let request = mk_query(rand::random(), &query, QueryType::A);
    debug!("Request: {:#?}", request);

    socket.send_to(&request.to_bytes()?, &server)?;

    let mut response_buffer = vec![0u8; MAX_PACKET_SIZE];
    let (size, _src) = socket.recv_from(&mut response_buffer)?;

    let response = DnsMessage::decode(&response_buffer[..size])?;

    print_packet(&response);

    Ok(())
}

pub fn print_packet(packet: &DnsMessage) {
    println!("{:#?}", packet.header());

    for q in packet.questions() {
        println!("{:#?}", q);
    }
    for rec in packet.answers() {
        println!("{:#?}", rec);
    }
    for rec in packet.authorities() {
        println!("{:#?}", rec);
    }
    for rec in packet.additionals() {
        println!("{:#?}", rec);
    }
}
