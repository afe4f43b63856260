use crate::game::{component_mask, ClientWorld};
use crate::input::ScriptedInput;
use log::{debug, error, info, warn};
use shared::{ClientPacket, Packet, Point, ServerPacket, MAX_DATAGRAM_SIZE, PROTOCOL_VERSION, TICK_DT};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::{interval, sleep, Instant};

/// Visible area the headless client pretends to render.
const VIEW_SIZE: Point = Point::new(1280.0, 720.0);

pub struct Client {
    socket: UdpSocket,
    server_addr: SocketAddr,
    world: ClientWorld,
    input: ScriptedInput,
    fake_ping_ms: u64,
    packets_received: u64,
}

impl Client {
    pub async fn new(
        server_addr: &str,
        fake_ping_ms: u64,
        seed: u64,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        let server_addr = server_addr.parse()?;

        Ok(Client {
            socket,
            server_addr,
            world: ClientWorld::new(VIEW_SIZE),
            input: ScriptedInput::new(seed),
            fake_ping_ms,
            packets_received: 0,
        })
    }

    pub fn world(&self) -> &ClientWorld {
        &self.world
    }

    async fn send_packet(&self, packet: &ClientPacket) -> Result<(), Box<dyn std::error::Error>> {
        if self.fake_ping_ms > 0 {
            sleep(Duration::from_millis(self.fake_ping_ms / 2)).await;
        }

        let encoded = packet.encode()?;
        self.socket.send_to(encoded.as_bytes(), self.server_addr).await?;
        Ok(())
    }

    async fn connect(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        info!("Connecting to {}...", self.server_addr);
        self.send_packet(&ClientPacket::Activate {
            client_version: PROTOCOL_VERSION,
        })
        .await
    }

    async fn handle_datagram(&mut self, bytes: &[u8]) {
        let decoded = Packet::from_bytes(bytes.to_vec())
            .and_then(|packet| ServerPacket::decode_with_mask(&packet, component_mask()));
        let packet = match decoded {
            Ok(packet) => packet,
            Err(e) => {
                warn!("Dropping undecodable packet: {}", e);
                return;
            }
        };
        self.packets_received += 1;

        for reply in self.world.handle_server_packet(packet) {
            if let Err(e) = self.send_packet(&reply).await {
                error!("Error sending {:?}: {}", reply.packet_type(), e);
            }
        }
    }

    async fn send_input(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if !self.world.is_connected() {
            return Ok(());
        }
        let intent = self.input.next_intent();
        if let Some(input) = self.world.predict(intent) {
            self.send_packet(&ClientPacket::PlayerInput(input)).await?;
        }
        Ok(())
    }

    /// Plays for `duration`, then disconnects.
    pub async fn run(&mut self, duration: Duration) -> Result<(), Box<dyn std::error::Error>> {
        self.connect().await?;

        let mut input_interval = interval(Duration::from_secs_f32(TICK_DT));
        let mut status_interval = interval(Duration::from_secs(5));
        let deadline = Instant::now() + duration;
        let mut buffer = vec![0u8; MAX_DATAGRAM_SIZE];

        loop {
            tokio::select! {
                result = self.socket.recv_from(&mut buffer) => {
                    match result {
                        Ok((len, _)) => {
                            if self.fake_ping_ms > 0 {
                                sleep(Duration::from_millis(self.fake_ping_ms / 2)).await;
                            }
                            let bytes = buffer[..len].to_vec();
                            self.handle_datagram(&bytes).await;
                        },
                        Err(e) => error!("Error receiving packet: {}", e),
                    }
                },

                _ = input_interval.tick() => {
                    if let Err(e) = self.send_input().await {
                        error!("Error sending input: {}", e);
                    }
                },

                _ = status_interval.tick() => {
                    debug!(
                        "Tick {}: {} entities visible, {} pending inputs, {} rollbacks, {} packets",
                        self.world.tick,
                        self.world.confirmed.len(),
                        self.world.input_history.len(),
                        self.world.rollbacks,
                        self.packets_received
                    );
                },

                _ = tokio::time::sleep_until(deadline) => break,
            }
        }

        if self.world.is_connected() {
            let _ = self.send_packet(&ClientPacket::Disconnect).await;
        }
        info!(
            "Client finished after {} packets and {} rollbacks",
            self.packets_received, self.world.rollbacks
        );
        Ok(())
    }
}
