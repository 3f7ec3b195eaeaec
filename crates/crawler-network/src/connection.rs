//! Connection handling.

use crate::{NetworkError, NetworkResult};
use crawler_protocol::{Message, MessageCodec};
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::codec::Framed;
use tracing::debug;

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Dial timeout, covering name resolution and TCP connect.
    pub connect_timeout: Duration,
    /// Read deadline per message.
    pub read_timeout: Duration,
    /// Write deadline per message.
    pub write_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(30),
            write_timeout: Duration::from_secs(10),
        }
    }
}

/// A framed connection to one peer.
pub struct Connection {
    /// Framed TCP stream.
    framed: Framed<TcpStream, MessageCodec>,
    /// Configuration.
    config: ConnectionConfig,
}

impl Connection {
    /// Dial a peer. `host` may be an IP literal or a resolvable name.
    pub async fn connect(
        host: &str,
        port: u16,
        magic: [u8; 4],
        config: ConnectionConfig,
    ) -> NetworkResult<Self> {
        let stream = timeout(config.connect_timeout, TcpStream::connect((host, port)))
            .await
            .map_err(|_| NetworkError::Timeout("connect"))??;

        debug!(host, port, "connected");

        Ok(Self {
            framed: Framed::new(stream, MessageCodec::new(magic)),
            config,
        })
    }

    /// Send a message within the write deadline.
    pub async fn send(&mut self, message: Message) -> NetworkResult<()> {
        let command = message.command.clone();

        timeout(self.config.write_timeout, self.framed.send(message))
            .await
            .map_err(|_| NetworkError::Timeout("write"))??;

        debug!(command = %command, "sent message");
        Ok(())
    }

    /// Receive the next message within the read deadline.
    pub async fn receive(&mut self) -> NetworkResult<Message> {
        let message = match timeout(self.config.read_timeout, self.framed.next()).await {
            Err(_) => return Err(NetworkError::Timeout("read")),
            Ok(None) => return Err(NetworkError::ConnectionClosed),
            Ok(Some(result)) => result?,
        };

        debug!(command = %message.command, len = message.payload.len(), "received message");
        Ok(message)
    }

    /// The remote address.
    pub fn peer_addr(&self) -> NetworkResult<SocketAddr> {
        Ok(self.framed.get_ref().peer_addr()?)
    }

    /// The local address of this socket.
    pub fn local_addr(&self) -> NetworkResult<SocketAddr> {
        Ok(self.framed.get_ref().local_addr()?)
    }

    /// Close the connection.
    pub async fn close(mut self) -> NetworkResult<()> {
        self.framed.get_mut().shutdown().await?;
        Ok(())
    }
}
