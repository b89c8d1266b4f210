use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use socket2::{Domain, Protocol, Socket, Type};

/// Room for bursts of 7-packet datagrams
const RECV_BUFFER_BYTES: usize = 4 * 1024 * 1024;

/// Binds a UDP socket for TS reception, joining the group when `addr` is
/// an IPv4 multicast address.
pub fn create_udp_socket(addr: SocketAddr) -> anyhow::Result<Socket> {
    let ip = match addr.ip() {
        IpAddr::V4(v4) => v4,
        _ => anyhow::bail!("only IPv4 is supported"),
    };

    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    // best effort, the kernel may clamp it
    let _ = socket.set_recv_buffer_size(RECV_BUFFER_BYTES);
    socket.bind(&addr.into())?;

    if ip.is_multicast() {
        socket.join_multicast_v4(&ip, &Ipv4Addr::UNSPECIFIED)?;
    }

    socket.set_nonblocking(true)?;
    Ok(socket)
}
