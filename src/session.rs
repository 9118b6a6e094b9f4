use crate::error::Result;
use std::io::ErrorKind;
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, trace};

/// One connection, used for exactly one request and its response.
pub struct Session<S = TcpStream> {
    stream: S,
    peer: String,
}

impl Session<TcpStream> {
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        let socket = TcpStream::connect(addr).await?;
        socket.set_nodelay(true)?;
        debug!("Connected to {}", addr);
        Ok(Session::new(socket, addr.to_string()))
    }
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, peer: impl Into<String>) -> Self {
        Session {
            stream,
            peer: peer.into(),
        }
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Writes the whole buffer. An empty buffer sends nothing.
    pub async fn send(&mut self, bytes: &[u8]) -> Result<()> {
        self.stream.write_all(bytes).await?;
        self.stream.flush().await?;
        trace!("Sent {} bytes to {}", bytes.len(), self.peer);
        Ok(())
    }

    /// A single read. Returns 0 once the peer has stopped sending.
    pub async fn receive(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = self.stream.read(buf).await?;
        trace!("Received {} bytes from {}", n, self.peer);
        Ok(n)
    }

    /// A single read of at most `limit` bytes. Whatever did not arrive in
    /// that read is left behind.
    pub async fn receive_once(&mut self, limit: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; limit];
        let n = self.receive(&mut buf).await?;
        buf.truncate(n);
        Ok(buf)
    }

    /// Shuts down the write side so the peer sees end of stream, then drops
    /// the stream, which releases the read side and closes the socket. A peer
    /// that already went away is not an error here.
    pub async fn close(mut self) -> Result<()> {
        match self.stream.shutdown().await {
            Ok(()) => {}
            Err(e) if matches!(e.kind(), ErrorKind::NotConnected | ErrorKind::BrokenPipe) => {
                debug!("Peer {} already disconnected", self.peer);
            }
            Err(e) => return Err(e.into()),
        }
        debug!("Closed connection with {}", self.peer);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    #[tokio::test]
    async fn receive_once_stops_at_the_limit() {
        let (a, b) = duplex(64);
        let mut tx = Session::new(a, "tx");
        let mut rx = Session::new(b, "rx");

        tx.send(b"0123456789").await.unwrap();
        assert_eq!(rx.receive_once(4).await.unwrap(), b"0123");
        assert_eq!(rx.receive_once(100).await.unwrap(), b"456789");
    }

    #[tokio::test]
    async fn close_signals_end_of_stream() {
        let (a, b) = duplex(64);
        let mut tx = Session::new(a, "tx");
        let mut rx = Session::new(b, "rx");

        tx.send(b"bye").await.unwrap();
        tx.close().await.unwrap();

        let mut buf = [0u8; 16];
        assert_eq!(rx.receive(&mut buf).await.unwrap(), 3);
        assert_eq!(rx.receive(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn tcp_session_round_trip() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (socket, peer) = listener.accept().await.unwrap();
            let mut session = Session::new(socket, peer.to_string());
            let got = session.receive_once(32).await.unwrap();
            session.send(&got).await.unwrap();
            session.close().await.unwrap();
        });

        let mut client = Session::connect(addr).await.unwrap();
        assert_eq!(client.peer(), addr.to_string());
        client.send(b"echo").await.unwrap();
        let mut buf = [0u8; 32];
        let mut echoed = Vec::new();
        loop {
            let n = client.receive(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            echoed.extend_from_slice(&buf[..n]);
        }
        assert_eq!(echoed, b"echo");
        client.close().await.unwrap();
        server.await.unwrap();
    }
}
