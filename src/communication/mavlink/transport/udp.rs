//! MAVLink parameter link over UDP.
//!
//! The ground station binds a local port (14550 by convention) and either
//! knows the vehicle address up front or learns it from the first datagram
//! the vehicle sends. Every datagram carries one MAVLink v2 frame.
//!
//! [`UdpParamLink`] is the outbound half ([`ParamLink`]); its
//! [`receiver`](UdpParamLink::receiver) is the inbound half
//! ([`ParamValueSource`]). Both share the socket and the discovered address.

use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use mavlink::common::MavMessage;
use mavlink::peek_reader::PeekReader;
use mavlink::MavHeader;
use tokio::net::{ToSocketAddrs, UdpSocket};

use crate::communication::link::{IncomingParamValue, ParamLink, ParamValueSource};
use crate::communication::mavlink::codec;
use crate::error::LinkError;
use crate::parameters::{ComponentId, ParamRef, ParamValue, MAV_COMP_ID_AUTOPILOT1};

/// Standard GCS port
pub const MAVLINK_UDP_PORT: u16 = 14550;

/// Largest MAVLink v2 frame
const MAX_FRAME_LEN: usize = 280;

/// MAVLink identity of the ground station and the vehicle it talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkIdentity {
    /// Our system id
    pub system_id: u8,
    /// Our component id
    pub component_id: u8,
    /// Vehicle system id; values from other systems are ignored
    pub target_system: u8,
}

impl Default for LinkIdentity {
    fn default() -> Self {
        Self {
            system_id: 255,    // GCS convention
            component_id: 190, // MAV_COMP_ID_MISSIONPLANNER
            target_system: 1,
        }
    }
}

/// Outbound UDP parameter link
#[derive(Debug)]
pub struct UdpParamLink {
    socket: Arc<UdpSocket>,
    vehicle_addr: Arc<OnceLock<SocketAddr>>,
    identity: LinkIdentity,
    sequence: u8,
}

impl UdpParamLink {
    /// Bind the local socket
    pub async fn bind(addr: impl ToSocketAddrs, identity: LinkIdentity) -> Result<Self, LinkError> {
        let socket = UdpSocket::bind(addr).await?;
        Ok(Self {
            socket: Arc::new(socket),
            vehicle_addr: Arc::new(OnceLock::new()),
            identity,
            sequence: 0,
        })
    }

    /// Send to a known vehicle address instead of waiting for discovery
    pub fn with_vehicle_addr(self, addr: SocketAddr) -> Self {
        let _ = self.vehicle_addr.set(addr);
        self
    }

    pub fn local_addr(&self) -> Result<SocketAddr, LinkError> {
        Ok(self.socket.local_addr()?)
    }

    /// Vehicle endpoint, once known
    pub fn vehicle_addr(&self) -> Option<SocketAddr> {
        self.vehicle_addr.get().copied()
    }

    pub fn identity(&self) -> LinkIdentity {
        self.identity
    }

    /// Inbound half sharing this socket
    pub fn receiver(&self) -> UdpParamReceiver {
        UdpParamReceiver {
            socket: Arc::clone(&self.socket),
            vehicle_addr: Arc::clone(&self.vehicle_addr),
            target_system: self.identity.target_system,
            recv_buf: vec![0u8; MAX_FRAME_LEN],
        }
    }

    /// Send one MAVLink v2 message to the vehicle without waiting
    pub fn send_message(&mut self, msg: &MavMessage) -> Result<(), LinkError> {
        let addr = self.vehicle_addr().ok_or(LinkError::NotConnected)?;

        let header = MavHeader {
            system_id: self.identity.system_id,
            component_id: self.identity.component_id,
            sequence: self.sequence,
        };
        self.sequence = self.sequence.wrapping_add(1);

        let mut buf = Cursor::new(Vec::with_capacity(MAX_FRAME_LEN));
        mavlink::write_v2_msg(&mut buf, header, msg)
            .map_err(|e| LinkError::Encode(format!("{e:?}")))?;

        self.socket.try_send_to(&buf.into_inner(), addr)?;
        Ok(())
    }
}

impl ParamLink for UdpParamLink {
    fn request_parameter_list(&mut self, component: ComponentId) -> Result<(), LinkError> {
        let msg = codec::param_request_list(self.identity.target_system, component);
        self.send_message(&msg)
    }

    fn request_parameter(
        &mut self,
        component: ComponentId,
        target: &ParamRef,
    ) -> Result<(), LinkError> {
        let msg = codec::param_request_read(self.identity.target_system, component, target)?;
        self.send_message(&msg)
    }

    fn write_parameter(
        &mut self,
        component: ComponentId,
        name: &str,
        value: &ParamValue,
    ) -> Result<(), LinkError> {
        let msg = codec::param_set(self.identity.target_system, component, name, value)?;
        self.send_message(&msg)
    }

    fn commit_persistent_storage(&mut self) -> Result<(), LinkError> {
        let msg =
            codec::preflight_storage_write(self.identity.target_system, MAV_COMP_ID_AUTOPILOT1);
        self.send_message(&msg)
    }
}

/// Inbound UDP parameter link
#[derive(Debug)]
pub struct UdpParamReceiver {
    socket: Arc<UdpSocket>,
    vehicle_addr: Arc<OnceLock<SocketAddr>>,
    target_system: u8,
    recv_buf: Vec<u8>,
}

impl UdpParamReceiver {
    fn parse_datagram(data: &[u8]) -> Option<(MavHeader, MavMessage)> {
        let cursor = Cursor::new(data);
        let mut reader = PeekReader::new(cursor);
        mavlink::read_v2_msg::<MavMessage, _>(&mut reader).ok()
    }
}

#[async_trait]
impl ParamValueSource for UdpParamReceiver {
    /// Wait for the next PARAM_VALUE from the target system
    ///
    /// Other messages and undecodable frames are skipped. The first datagram
    /// from the target system fixes the vehicle address.
    async fn next_param_value(&mut self) -> Result<IncomingParamValue, LinkError> {
        loop {
            let (len, addr) = self.socket.recv_from(&mut self.recv_buf).await?;
            let Some((header, msg)) = Self::parse_datagram(&self.recv_buf[..len]) else {
                crate::log_trace!("Dropped undecodable datagram from {}", addr);
                continue;
            };
            if header.system_id != self.target_system {
                continue;
            }
            if self.vehicle_addr.set(addr).is_ok() {
                crate::log_info!("Vehicle {} discovered at {}", header.system_id, addr);
            }

            if let MavMessage::PARAM_VALUE(data) = msg {
                match codec::decode_param_value(&header, &data) {
                    Ok(value) => return Ok(value),
                    Err(e) => crate::log_warn!("Ignoring PARAM_VALUE: {}", e),
                }
            }
        }
    }
}
