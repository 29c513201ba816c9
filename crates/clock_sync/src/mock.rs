//! Simulated calibration host
//!
//! Deterministic stand-in for the host responder: every probe and reply leg
//! advances a shared [`ManualClock`] by a fixed one-way delay, and the host
//! stamps its replies with that clock shifted by a fixed offset. Used by unit
//! tests and by `accel-sync calibrate --simulate`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use contracts::{Channel, Clock, Connection, Connector, ContractError, ManualClock};
use wire_codec::{ProbePacket, ProbeReply, REPLY_SIZE};

/// Connector producing [`SimulatedLink`]s
#[derive(Debug, Clone)]
pub struct SimulatedHost {
    clock: ManualClock,
    one_way_delay_ms: i64,
    host_offset_ms: i64,
    /// Extra reply delay per probe index
    spikes: HashMap<usize, i64>,
    /// Replies replaced verbatim per probe index
    forged: HashMap<usize, ProbeReply>,
    refuse: bool,
    fail_at_probe: Option<usize>,
    log: Arc<Mutex<LinkLog>>,
}

/// What the simulated host observed
#[derive(Debug, Clone, Default)]
pub struct LinkLog {
    pub connects: usize,
    pub probes: Vec<ProbePacket>,
    pub shutdowns: usize,
}

impl SimulatedHost {
    pub fn new(clock: ManualClock, one_way_delay_ms: i64, host_offset_ms: i64) -> Self {
        Self {
            clock,
            one_way_delay_ms,
            host_offset_ms,
            spikes: HashMap::new(),
            forged: HashMap::new(),
            refuse: false,
            fail_at_probe: None,
            log: Arc::new(Mutex::new(LinkLog::default())),
        }
    }

    /// Delay the reply to probe `index` by `extra_ms`
    pub fn with_spike(mut self, index: usize, extra_ms: i64) -> Self {
        self.spikes.insert(index, extra_ms);
        self
    }

    /// Answer probe `index` with `reply` instead of the host clock
    pub fn with_forged_reply(mut self, index: usize, reply: ProbeReply) -> Self {
        self.forged.insert(index, reply);
        self
    }

    /// Refuse every connection attempt
    pub fn refusing(mut self) -> Self {
        self.refuse = true;
        self
    }

    /// Break the connection when probe `index` is written
    pub fn failing_at_probe(mut self, index: usize) -> Self {
        self.fail_at_probe = Some(index);
        self
    }

    pub fn clock(&self) -> &ManualClock {
        &self.clock
    }

    /// Snapshot of the observed traffic
    pub fn log(&self) -> LinkLog {
        self.log.lock().map(|log| log.clone()).unwrap_or_default()
    }

    fn with_log(&self, f: impl FnOnce(&mut LinkLog)) {
        if let Ok(mut log) = self.log.lock() {
            f(&mut log);
        }
    }
}

impl Connector for SimulatedHost {
    type Conn = SimulatedLink;

    async fn connect(&self, channel: Channel, addr: &str) -> Result<SimulatedLink, ContractError> {
        if self.refuse {
            return Err(ContractError::connect_failure(
                channel,
                addr,
                "connection refused (simulated)",
            ));
        }
        self.with_log(|log| log.connects += 1);
        Ok(SimulatedLink {
            host: self.clone(),
            channel,
            probe_index: 0,
            pending: None,
        })
    }
}

/// One simulated probe connection
#[derive(Debug)]
pub struct SimulatedLink {
    host: SimulatedHost,
    channel: Channel,
    probe_index: usize,
    pending: Option<ProbeReply>,
}

impl Connection for SimulatedLink {
    async fn write_all(&mut self, buf: &[u8]) -> Result<(), ContractError> {
        if self.host.fail_at_probe == Some(self.probe_index) {
            return Err(ContractError::transport(
                self.channel,
                "connection reset (simulated)",
            ));
        }
        let probe = ProbePacket::decode(buf)?;
        self.host.with_log(|log| log.probes.push(probe));

        let clock = &self.host.clock;
        clock.advance(self.host.one_way_delay_ms);
        let host_now = clock.now_ms() + self.host.host_offset_ms;
        let reply = self.host.forged.get(&self.probe_index).copied();
        self.pending = Some(reply.unwrap_or(ProbeReply {
            host_receive_time: host_now,
            host_send_time: host_now,
        }));
        Ok(())
    }

    async fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), ContractError> {
        if buf.len() != REPLY_SIZE {
            return Err(ContractError::MalformedPacket {
                kind: "reply",
                expected: REPLY_SIZE,
                actual: buf.len(),
            });
        }
        let reply = self.pending.take().ok_or_else(|| {
            ContractError::ProtocolInvariant("reply read before probe was written".to_string())
        })?;

        let spike = self.host.spikes.get(&self.probe_index).copied().unwrap_or(0);
        self.host.clock.advance(self.host.one_way_delay_ms + spike);
        self.probe_index += 1;

        buf.copy_from_slice(&reply.encode());
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), ContractError> {
        self.host.with_log(|log| log.shutdowns += 1);
        Ok(())
    }
}
