//! UDP socket setup

use socket2::{Domain, Protocol, Socket, Type};
use std::net::SocketAddr;
use tokio::net::UdpSocket;

use crate::error::NetworkError;

/// Create a non-blocking UDP socket bound to `addr`
///
/// `SO_REUSEADDR` is set so a restarted hub can rebind immediately. Must be
/// called from within a Tokio runtime.
pub fn create_socket(
    addr: SocketAddr,
    recv_buffer_size: Option<usize>,
) -> Result<UdpSocket, NetworkError> {
    let bind_err = |e: std::io::Error| NetworkError::BindFailed(format!("{}: {}", addr, e));

    let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))
        .map_err(bind_err)?;
    socket.set_reuse_address(true).map_err(bind_err)?;
    if let Some(size) = recv_buffer_size {
        socket.set_recv_buffer_size(size).map_err(bind_err)?;
    }
    socket.set_nonblocking(true).map_err(bind_err)?;
    socket.bind(&addr.into()).map_err(bind_err)?;

    UdpSocket::from_std(socket.into()).map_err(bind_err)
}
