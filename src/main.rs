use std::{net::Ipv4Addr, net::UdpSocket, time::Duration};

use log::{debug, info};
use structopt::StructOpt;

use stubdns::{serve, CannedAnswer};

#[derive(Debug, StructOpt)]
#[structopt(name = "stubdns", about = "Answers every DNS datagram with one canned A record")]
struct Opt {
    #[structopt(short, long, default_value = "127.0.0.1:2053")]
    bind: String,

    /// Transaction id written into every response
    #[structopt(long, default_value = "1234")]
    id: u16,

    #[structopt(short, long, default_value = "codecrafters.io")]
    name: String,

    #[structopt(short, long, default_value = "8.8.8.8")]
    address: Ipv4Addr,

    #[structopt(short, long, default_value = "60")]
    ttl: u32,

    /// Wake up from a blocked receive after this many milliseconds
    #[structopt(long)]
    read_timeout_ms: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let opt = Opt::from_args();
    debug!("args {:?}", opt);

    let answer = CannedAnswer::builder()
        .id(opt.id)
        .name(opt.name)
        .addr(opt.address)
        .ttl(opt.ttl)
        .build();
    // fail before binding if the answer can not be encoded
    answer.message().to_bytes()?;

    info!("Starting DNS Server: {}", opt.bind);
    let socket = UdpSocket::bind(&opt.bind)?;
    if let Some(ms) = opt.read_timeout_ms {
        socket.set_read_timeout(Some(Duration::from_millis(ms)))?;
    }

    serve(&socket, &answer)
}
