//! Name resolution and TCP connection setup.

use dp_core::PortalError;
use dp_core::PortalResult;
use std::io::Read;
use std::io::Write;
use std::net::SocketAddr;
use std::net::TcpStream;
use std::net::ToSocketAddrs;
use std::time::Duration;

pub trait IoStream: Read + Write {}
impl<T> IoStream for T where T: Read + Write {}

pub type BoxedIoStream = Box<dyn IoStream>;

/// Resolves `host:port` and connects to the first address that accepts.
pub fn connect(host: &str, port: u16, timeout: Duration) -> PortalResult<TcpStream> {
    let query = format!("{host}:{port}");
    let addresses: Vec<SocketAddr> = query
        .to_socket_addrs()
        .map_err(|error| {
            PortalError::transport(
                "net.dns.resolve_failed",
                format!("failed to resolve `{query}`: {error}"),
            )
        })?
        .collect();

    let mut last_error = PortalError::transport(
        "net.dns.no_results",
        format!("resolver returned no addresses for `{query}`"),
    );
    for address in addresses {
        match connect_address(address, timeout) {
            Ok(stream) => return Ok(stream),
            Err(error) => {
                tracing::debug!(%address, %error, "connect attempt failed");
                last_error = error;
            }
        }
    }

    Err(last_error)
}

fn connect_address(address: SocketAddr, timeout: Duration) -> PortalResult<TcpStream> {
    let stream = TcpStream::connect_timeout(&address, timeout).map_err(|error| {
        PortalError::transport(
            "net.transport.connect_failed",
            format!("failed to connect to `{address}`: {error}"),
        )
    })?;

    stream
        .set_nodelay(true)
        .and_then(|()| stream.set_read_timeout(Some(timeout)))
        .and_then(|()| stream.set_write_timeout(Some(timeout)))
        .map_err(|error| {
            PortalError::transport(
                "net.transport.socket_options_failed",
                format!("failed to configure socket for `{address}`: {error}"),
            )
        })?;

    Ok(stream)
}
