//! In-memory appliance used by the integration tests.

#![allow(dead_code)]

use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncWriteExt, DuplexStream};
use tokio::sync::mpsc;
use tokio_util::codec::Framed;

use klf200_bridge::datagram::{
    Command, Datagram, DatagramType, GetAllNodesInformationNtf, PasswordEnterCfm,
};
use klf200_bridge::error::{Error, Result};
use klf200_bridge::protocol::FrameCodec;
use klf200_bridge::transport::{BoxedStream, Connector};

pub const PASSWORD: &str = "velux123";

/// Connector handing out in-memory streams; the far ends arrive on a channel.
pub struct MemoryConnector {
    appliances: mpsc::UnboundedSender<Appliance>,
}

impl MemoryConnector {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Appliance>) {
        let (appliances, rx) = mpsc::unbounded_channel();
        (Self { appliances }, rx)
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self) -> Result<BoxedStream> {
        let (client, server) = tokio::io::duplex(16 * 1024);
        self.appliances
            .send(Appliance::new(server))
            .map_err(|_| Error::ConnectionClosed)?;
        Ok(Box::new(client))
    }

    fn peer(&self) -> String {
        "memory".into()
    }
}

/// Appliance side of one connection.
pub struct Appliance {
    frames: Framed<DuplexStream, FrameCodec>,
}

impl Appliance {
    pub fn new(stream: DuplexStream) -> Self {
        Self {
            frames: Framed::new(stream, FrameCodec::new()),
        }
    }

    /// Next well-formed datagram from the bridge, `None` on EOF.
    pub async fn recv(&mut self) -> Option<Datagram> {
        loop {
            match self.frames.next().await? {
                Ok(Ok(datagram)) => return Some(datagram),
                Ok(Err(_)) => continue,
                Err(_) => return None,
            }
        }
    }

    /// Receive a datagram and check its command.
    pub async fn expect(&mut self, command: Command) -> Datagram {
        let datagram = tokio::time::timeout(Duration::from_secs(5), self.recv())
            .await
            .expect("no datagram from bridge")
            .expect("connection closed");
        assert_eq!(datagram.command(), command);
        datagram
    }

    pub async fn send(&mut self, datagram: impl Into<Datagram>) {
        let datagram: Datagram = datagram.into();
        self.frames.send(datagram).await.unwrap();
    }

    /// Write raw bytes, bypassing the codec.
    pub async fn send_raw(&mut self, bytes: &[u8]) {
        self.frames.get_mut().write_all(bytes).await.unwrap();
    }

    /// Accept the password and wait for monitoring to be enabled.
    pub async fn login(&mut self) {
        self.expect(Command::PasswordEnterReq).await;
        self.send(PasswordEnterCfm::empty()).await;
        self.expect(Command::HouseStatusMonitorEnableReq).await;
    }

    /// Drop the connection.
    pub async fn close(mut self) {
        let _ = self.frames.get_mut().shutdown().await;
    }
}

/// Node information notification for discovery.
pub fn node(id: u8, name: &str) -> GetAllNodesInformationNtf {
    let mut data = vec![0u8; GetAllNodesInformationNtf::SIZE];
    data[0] = id;
    data[4..4 + name.len()].copy_from_slice(name.as_bytes());
    GetAllNodesInformationNtf::from_bytes(&data).unwrap()
}
