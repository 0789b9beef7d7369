//! Outbound socket link used by the client.
//!
//! A [`Link`] is one established path to a peer: a connected UDP socket or a
//! TCP stream. Frames handed to it are already encoded for its transport.

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::{TcpStream, UdpSocket};

use super::error::{TransportError, TransportResult};
use super::framing::Transport;

/// An established link to one peer.
#[derive(Debug)]
pub enum Link {
    /// UDP socket connected to the peer address.
    Datagram(UdpSocket),
    /// TCP stream to the peer.
    Stream(TcpStream),
}

impl Link {
    /// Open a link to `addr`, giving up after `timeout`.
    ///
    /// Datagram links bind an ephemeral local port of the same address
    /// family and connect it, so later refusals surface on send.
    pub async fn connect(
        transport: Transport,
        addr: SocketAddr,
        timeout: Duration,
    ) -> TransportResult<Self> {
        let attempt = async {
            match transport {
                Transport::Datagram => {
                    let local: SocketAddr = if addr.is_ipv4() {
                        (Ipv4Addr::UNSPECIFIED, 0).into()
                    } else {
                        (Ipv6Addr::UNSPECIFIED, 0).into()
                    };
                    let socket = UdpSocket::bind(local).await?;
                    socket.connect(addr).await?;
                    Ok::<_, io::Error>(Link::Datagram(socket))
                }
                Transport::Stream => {
                    let stream = TcpStream::connect(addr).await?;
                    stream.set_nodelay(true)?;
                    Ok(Link::Stream(stream))
                }
            }
        };

        match tokio::time::timeout(timeout, attempt).await {
            Ok(result) => result.map_err(TransportError::classify),
            Err(_) => Err(TransportError::ConnectTimeout(timeout)),
        }
    }

    /// Transport kind of this link.
    pub fn transport(&self) -> Transport {
        match self {
            Link::Datagram(_) => Transport::Datagram,
            Link::Stream(_) => Transport::Stream,
        }
    }

    /// Local address of the link.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        match self {
            Link::Datagram(socket) => socket.local_addr(),
            Link::Stream(stream) => stream.local_addr(),
        }
    }

    /// Peer address of the link.
    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        match self {
            Link::Datagram(socket) => socket.peer_addr(),
            Link::Stream(stream) => stream.peer_addr(),
        }
    }

    /// Write one complete frame.
    pub async fn send_frame(&mut self, frame: &[u8]) -> TransportResult<()> {
        match self {
            Link::Datagram(socket) => {
                let sent = socket.send(frame).await?;
                if sent != frame.len() {
                    return Err(TransportError::Io(io::Error::new(
                        io::ErrorKind::WriteZero,
                        format!("datagram truncated: sent {sent} of {} bytes", frame.len()),
                    )));
                }
            }
            Link::Stream(stream) => {
                stream.write_all(frame).await?;
                stream.flush().await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    const TIMEOUT: Duration = Duration::from_secs(2);

    #[tokio::test]
    async fn test_datagram_link_sends() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = server.local_addr().unwrap();

        let mut link = Link::connect(Transport::Datagram, addr, TIMEOUT)
            .await
            .unwrap();
        assert_eq!(link.transport(), Transport::Datagram);
        assert_eq!(link.peer_addr().unwrap(), addr);

        link.send_frame(b"datagram").await.unwrap();

        let mut buf = [0u8; 64];
        let (len, from) = server.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..len], b"datagram");
        assert_eq!(from.port(), link.local_addr().unwrap().port());
    }

    #[tokio::test]
    async fn test_stream_link_sends() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let mut link = Link::connect(Transport::Stream, addr, TIMEOUT)
            .await
            .unwrap();
        let (mut accepted, _) = listener.accept().await.unwrap();

        link.send_frame(b"stream").await.unwrap();

        let mut buf = [0u8; 6];
        accepted.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"stream");
    }

    #[tokio::test]
    async fn test_stream_refused_is_unreachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = Link::connect(Transport::Stream, addr, TIMEOUT)
            .await
            .unwrap_err();
        assert!(err.is_retryable(), "{err}");
    }
}
