//! UDP transport and the main server loop.
//!
//! A spawned task decodes datagrams and forwards them over a channel; the
//! main loop owns the simulation and interleaves packet handling with ticks
//! paced by the scheduler. Handlers only stage work, so a packet arriving
//! between ticks never mutates the world structurally.

use crate::config::WorldConfig;
use crate::scheduler::TickScheduler;
use crate::simulation::{encode_for_dispatch, Simulation};
use log::{debug, error, info, warn};
use shared::{ClientPacket, Packet, MAX_DATAGRAM_SIZE};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::interval;

/// Ticks between debug summaries of the loop.
const SUMMARY_INTERVAL_TICKS: u32 = 200;

/// Messages sent from network tasks to the main server loop.
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived { packet: ClientPacket, addr: SocketAddr },
    Shutdown,
}

/// Decodes one datagram into a client packet.
pub fn decode_datagram(bytes: &[u8]) -> Result<ClientPacket, shared::CodecError> {
    let packet = Packet::from_bytes(bytes.to_vec())?;
    ClientPacket::decode(&packet)
}

pub struct Server {
    socket: Arc<UdpSocket>,
    simulation: Simulation,
    scheduler: TickScheduler,

    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
}

impl Server {
    pub async fn new(
        addr: &str,
        config: WorldConfig,
        max_clients: usize,
        warp: bool,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        info!("Server listening on {}", socket.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let scheduler = TickScheduler::new(config.tick_duration(), warp);

        Ok(Server {
            socket,
            simulation: Simulation::new(config, max_clients),
            scheduler,
            server_tx,
            server_rx,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Sender that can stop the loop with [`ServerMessage::Shutdown`].
    pub fn shutdown_handle(&self) -> mpsc::UnboundedSender<ServerMessage> {
        self.server_tx.clone()
    }

    /// Spawns the task that listens for incoming datagrams.
    fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = vec![0u8; MAX_DATAGRAM_SIZE];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => match decode_datagram(&buffer[..len]) {
                        Ok(packet) => {
                            if let Err(e) = server_tx.send(ServerMessage::PacketReceived { packet, addr }) {
                                error!("Failed to send packet to main loop: {}", e);
                                break;
                            }
                        }
                        Err(e) => warn!("Dropping undecodable datagram from {}: {}", addr, e),
                    },
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    async fn send_packet(&self, packet: &Packet, addr: SocketAddr) {
        if let Err(e) = self.socket.send_to(packet.as_bytes(), addr).await {
            error!("Failed to send packet to {}: {}", addr, e);
        }
    }

    async fn handle_message(&mut self, packet: ClientPacket, addr: SocketAddr) {
        let replies = self.simulation.handle_packet(addr, packet);
        for (addr, reply) in replies {
            if let Some(encoded) = encode_for_dispatch(&reply, addr) {
                self.send_packet(&encoded, addr).await;
            }
        }
    }

    /// Runs one tick and waits until every packet has been handed to the
    /// socket.
    async fn run_tick(&mut self) {
        let started = Instant::now();
        let outgoing = self.simulation.run_tick();
        for (addr, packet) in &outgoing {
            self.send_packet(packet, *addr).await;
        }
        self.scheduler.complete_tick(Instant::now(), started.elapsed());

        let tick = self.simulation.world.tick();
        if tick % SUMMARY_INTERVAL_TICKS == 0 {
            let stats = self.scheduler.stats();
            debug!(
                "Tick {}: {} sessions, {} entities, avg {}us, max {}us, {} late",
                tick,
                self.simulation.sessions.len(),
                self.simulation.world.entity_count(),
                stats.avg_tick_us,
                stats.max_tick_us,
                stats.late_ticks
            );
        }
    }

    /// Main server loop. Returns after a shutdown message.
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.spawn_network_receiver();

        let mut timeout_interval = interval(Duration::from_secs(1));

        info!(
            "Server started at {} ticks per second{}",
            self.simulation.world.config().tick_rate,
            if self.scheduler.is_warp() { " (warp)" } else { "" }
        );

        loop {
            let deadline = tokio::time::Instant::from_std(self.scheduler.next_deadline(Instant::now()));

            tokio::select! {
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::PacketReceived { packet, addr }) => {
                            self.handle_message(packet, addr).await;
                        }
                        Some(ServerMessage::Shutdown) | None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                _ = timeout_interval.tick() => {
                    self.simulation.check_timeouts();
                },

                _ = tokio::time::sleep_until(deadline) => {
                    self.run_tick().await;
                },
            }
        }

        Ok(())
    }
}
