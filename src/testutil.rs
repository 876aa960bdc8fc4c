//! A scripted in-memory device for exercising probes, adapters and the
//! negotiation engine without hardware.

use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
};

use async_trait::async_trait;

use crate::{
    device::{Address, DeviceAccess, DeviceKind, ProtocolVersion, ReprogKey, RequestError},
    value::Choice,
};

/// A fake device built up from scripted replies.
///
/// Requests are answered from an exact `(address, payload)` table first,
/// then from a per-address fallback table, and fail with
/// [`RequestError::NoReply`] otherwise. Every request is logged so tests
/// can assert on the bytes that went out.
pub struct FakeDevice {
    online: bool,
    protocol: Option<ProtocolVersion>,
    kind: DeviceKind,
    features: HashSet<u16>,
    registers: HashSet<u8>,
    replies: HashMap<(Address, Vec<u8>), Vec<u8>>,
    fallbacks: HashMap<Address, Vec<u8>>,
    reprog_keys: Vec<ReprogKey>,
    host_names: HashMap<u8, (bool, String)>,
    local_host_name: String,
    log: Mutex<Vec<(Address, Vec<u8>)>>,
}

impl FakeDevice {
    pub fn new() -> Self {
        Self {
            online: true,
            protocol: Some(ProtocolVersion::V20 {
                protocol_num: 4,
                target_sw: 1,
            }),
            kind: DeviceKind::Mouse,
            features: HashSet::new(),
            registers: HashSet::new(),
            replies: HashMap::new(),
            fallbacks: HashMap::new(),
            reprog_keys: Vec::new(),
            host_names: HashMap::new(),
            local_host_name: "testhost".to_string(),
            log: Mutex::new(Vec::new()),
        }
    }

    pub fn offline(mut self) -> Self {
        self.online = false;
        self
    }

    pub fn with_protocol(mut self, protocol: Option<ProtocolVersion>) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn with_kind(mut self, kind: DeviceKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_feature(mut self, id: u16) -> Self {
        self.features.insert(id);
        self
    }

    pub fn with_register(mut self, register: u8) -> Self {
        self.registers.insert(register);
        self
    }

    /// Scripts the reply to one feature function call with an exact
    /// payload.
    pub fn with_reply(mut self, id: u16, function: u8, payload: Vec<u8>, reply: Vec<u8>) -> Self {
        let addr = Address::Feature {
            id,
            function,
            no_reply: false,
        };
        self.replies.insert((addr, payload), reply);
        self
    }

    /// Scripts the reply to one feature function call regardless of
    /// payload.
    pub fn with_fallback_reply(mut self, id: u16, function: u8, reply: Vec<u8>) -> Self {
        let addr = Address::Feature {
            id,
            function,
            no_reply: false,
        };
        self.fallbacks.insert(addr, reply);
        self
    }

    /// Scripts the reply to reads of one register.
    pub fn with_register_reply(mut self, register: u8, reply: Vec<u8>) -> Self {
        self.fallbacks.insert(Address::RegisterRead(register), reply);
        self
    }

    /// Accepts writes to one register, answering with an empty reply.
    pub fn with_register_write(mut self, register: u8) -> Self {
        self.fallbacks.insert(Address::RegisterWrite(register), Vec::new());
        self
    }

    pub fn with_reprog_key(mut self, key: u16, targets: Vec<Choice>) -> Self {
        self.reprog_keys.push(ReprogKey {
            key,
            targets,
        });
        self
    }

    pub fn with_host_name(mut self, host: u8, confirmed: bool, name: &str) -> Self {
        self.host_names.insert(host, (confirmed, name.to_string()));
        self
    }

    pub fn with_local_host_name(mut self, name: &str) -> Self {
        self.local_host_name = name.to_string();
        self
    }

    /// Every request made so far, in order.
    pub fn requests(&self) -> Vec<(Address, Vec<u8>)> {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeviceAccess for FakeDevice {
    fn is_online(&self) -> bool {
        self.online
    }

    fn protocol_version(&self) -> Option<ProtocolVersion> {
        self.protocol
    }

    fn device_kind(&self) -> DeviceKind {
        self.kind
    }

    fn has_feature(&self, id: u16) -> bool {
        self.features.contains(&id)
    }

    fn has_register(&self, register: u8) -> bool {
        self.registers.contains(&register)
    }

    async fn request(&self, addr: Address, payload: &[u8]) -> Result<Vec<u8>, RequestError> {
        self.log.lock().unwrap().push((addr, payload.to_vec()));

        // Scripted replies are keyed without the no-reply marker.
        let (key, unacknowledged) = match addr {
            Address::Feature {
                id,
                function,
                no_reply,
            } => (
                Address::Feature {
                    id,
                    function,
                    no_reply: false,
                },
                no_reply,
            ),
            other => (other, false),
        };

        if let Some(reply) = self.replies.get(&(key, payload.to_vec())) {
            return Ok(reply.clone());
        }
        if let Some(reply) = self.fallbacks.get(&key) {
            return Ok(reply.clone());
        }
        if unacknowledged {
            return Ok(Vec::new());
        }

        Err(RequestError::NoReply)
    }

    async fn reprogrammable_keys(&self) -> Result<Vec<ReprogKey>, RequestError> {
        Ok(self.reprog_keys.clone())
    }

    fn persisted_host_names(&self) -> HashMap<u8, (bool, String)> {
        self.host_names.clone()
    }

    fn local_host_name(&self) -> String {
        self.local_host_name.clone()
    }
}
