//! Scripted single-connection server.
//!
//! A [`Script`] is a fixed sequence of steps played against the first
//! client that connects: expect a client packet, send bytes (whole or in
//! small fragments), pause, or close. It exercises the client's reader
//! against exact byte layouts and awkward delivery patterns that the
//! [`MockClickHouseServer`](crate::MockClickHouseServer) never produces.
//!
//! ```rust,ignore
//! let server = Script::new()
//!     .expect(ClientCode::Hello)
//!     .send(ServerPackets::new().hello(&hello).build())
//!     .close()
//!     .start()
//!     .await?;
//! // connect to server.addr(), then
//! let received = server.finish().await?;
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use native_protocol::{ClientCode, ClientPacket};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::mock_server::{MockServerError, Result, read_client_packet, server_transport};

/// How long the server waits for the client to hang up after the last step.
const LINGER: Duration = Duration::from_secs(5);

/// One step of a script.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// Read one client packet and require this code.
    Expect(ClientCode),
    /// Send bytes in one write.
    Send(Bytes),
    /// Send bytes in writes of at most `chunk_size` bytes.
    SendFragmented {
        /// Bytes to send.
        data: Bytes,
        /// Maximum bytes per write.
        chunk_size: usize,
    },
    /// Pause before the next step.
    Delay(Duration),
    /// Close the connection and end the script.
    Close,
}

/// Builder for a scripted server.
#[derive(Debug, Clone, Default)]
pub struct Script {
    steps: Vec<ScriptStep>,
}

impl Script {
    /// Start an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Expect a client packet with this code.
    #[must_use]
    pub fn expect(mut self, code: ClientCode) -> Self {
        self.steps.push(ScriptStep::Expect(code));
        self
    }

    /// Send bytes in one write.
    #[must_use]
    pub fn send(mut self, data: impl Into<Bytes>) -> Self {
        self.steps.push(ScriptStep::Send(data.into()));
        self
    }

    /// Send bytes in fragments.
    #[must_use]
    pub fn send_fragmented(mut self, data: impl Into<Bytes>, chunk_size: usize) -> Self {
        self.steps.push(ScriptStep::SendFragmented {
            data: data.into(),
            chunk_size: chunk_size.max(1),
        });
        self
    }

    /// Pause before the next step.
    #[must_use]
    pub fn delay(mut self, duration: Duration) -> Self {
        self.steps.push(ScriptStep::Delay(duration));
        self
    }

    /// Close the connection.
    #[must_use]
    pub fn close(mut self) -> Self {
        self.steps.push(ScriptStep::Close);
        self
    }

    /// Steps recorded so far.
    #[must_use]
    pub fn steps(&self) -> &[ScriptStep] {
        &self.steps
    }

    /// Bind a port and play the script against the first connection.
    pub async fn start(self) -> Result<ScriptedServer> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let handle = tokio::spawn(async move {
            let (stream, _) = listener.accept().await?;
            play(stream, self.steps).await
        });
        Ok(ScriptedServer { addr, handle })
    }
}

/// A running scripted server.
#[derive(Debug)]
pub struct ScriptedServer {
    addr: SocketAddr,
    handle: JoinHandle<Result<Vec<ClientPacket>>>,
}

impl ScriptedServer {
    /// Get the server's listening address.
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get the host string for connection configuration.
    #[must_use]
    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    /// Get the port number.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Wait for the script to complete and return the packets it received.
    pub async fn finish(self) -> Result<Vec<ClientPacket>> {
        self.handle
            .await
            .map_err(|e| MockServerError::Protocol(format!("script task failed: {e}")))?
    }
}

async fn play(stream: tokio::net::TcpStream, steps: Vec<ScriptStep>) -> Result<Vec<ClientPacket>> {
    let mut input = server_transport(stream);
    let mut received = Vec::new();

    for step in steps {
        match step {
            ScriptStep::Expect(code) => {
                let packet = read_client_packet(&mut input).await?.ok_or_else(|| {
                    MockServerError::Protocol(format!("client closed while {code:?} was expected"))
                })?;
                if packet.code() != code {
                    return Err(MockServerError::Protocol(format!(
                        "expected {code:?}, got {:?}",
                        packet.code()
                    )));
                }
                received.push(packet);
            }
            ScriptStep::Send(data) => input.transport_mut().send(&data).await?,
            ScriptStep::SendFragmented { data, chunk_size } => {
                for chunk in data.chunks(chunk_size) {
                    input.transport_mut().send(chunk).await?;
                    tokio::time::sleep(Duration::from_millis(1)).await;
                }
            }
            ScriptStep::Delay(duration) => tokio::time::sleep(duration).await,
            ScriptStep::Close => {
                input.transport_mut().close().await;
                return Ok(received);
            }
        }
    }

    // Drain until the client hangs up so its unread replies are not reset.
    let _ = tokio::time::timeout(LINGER, async {
        while let Ok(Some(packet)) = read_client_packet(&mut input).await {
            received.push(packet);
        }
    })
    .await;
    Ok(received)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    #[tokio::test]
    async fn test_expect_and_send() {
        let server = Script::new()
            .expect(ClientCode::Ping)
            .send_fragmented(vec![4u8, 5], 1)
            .close()
            .start()
            .await
            .unwrap();

        let mut client = TcpStream::connect(server.addr()).await.unwrap();
        client.write_all(&[ClientCode::Ping as u8]).await.unwrap();
        let mut reply = Vec::new();
        client.read_to_end(&mut reply).await.unwrap();
        assert_eq!(reply, vec![4, 5]);

        let received = server.finish().await.unwrap();
        assert_eq!(received, vec![ClientPacket::Ping]);
    }

    #[tokio::test]
    async fn test_unexpected_packet_fails_script() {
        let server = Script::new()
            .expect(ClientCode::Hello)
            .start()
            .await
            .unwrap();

        let mut client = TcpStream::connect(server.addr()).await.unwrap();
        client.write_all(&[ClientCode::Ping as u8]).await.unwrap();

        assert!(matches!(
            server.finish().await,
            Err(MockServerError::Protocol(_))
        ));
    }
}
