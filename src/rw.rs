//! Binds settings to a concrete protocol addressing scheme.
//!
//! Adapters know how to move raw bytes for one setting across the wire;
//! they carry no knowledge of value semantics. Transport failures are
//! propagated unchanged, never replaced by defaults.

use crate::device::{Address, DeviceAccess, RequestError};

/// Reads and writes a legacy register.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegisterRw {
    register: u8,
}

impl RegisterRw {
    /// Creates an adapter for a register number.
    pub fn new(register: u8) -> Self {
        Self {
            register,
        }
    }

    /// Reads the current register value.
    pub async fn read(&self, dev: &dyn DeviceAccess) -> Result<Vec<u8>, RequestError> {
        dev.request(Address::RegisterRead(self.register), &[]).await
    }

    /// Writes a new register value.
    pub async fn write(&self, dev: &dyn DeviceAccess, data: &[u8]) -> Result<Vec<u8>, RequestError> {
        dev.request(Address::RegisterWrite(self.register), data).await
    }
}

/// Reads and writes through a feature's read and write functions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeatureRw {
    feature: u16,
    read_function: u8,
    write_function: u8,
    no_reply: bool,
}

impl FeatureRw {
    /// Creates an adapter using the conventional function slots: function 0
    /// reads, function 1 writes.
    pub fn new(feature: u16) -> Self {
        Self::with_functions(feature, 0, 1)
    }

    /// Creates an adapter with explicit read and write function numbers.
    pub fn with_functions(feature: u16, read_function: u8, write_function: u8) -> Self {
        Self {
            feature,
            read_function,
            write_function,
            no_reply: false,
        }
    }

    /// Marks writes as unacknowledged. Only valid where the protocol
    /// documentation guarantees the device will not answer.
    pub fn no_reply(mut self) -> Self {
        self.no_reply = true;
        self
    }

    /// Reads the current value. `params` selects a sub-record where the
    /// feature's read function takes arguments (offsets, indices).
    pub async fn read(
        &self,
        dev: &dyn DeviceAccess,
        params: &[u8],
    ) -> Result<Vec<u8>, RequestError> {
        dev.request(
            Address::Feature {
                id: self.feature,
                function: self.read_function,
                no_reply: false,
            },
            params,
        )
        .await
    }

    /// Writes a new value.
    pub async fn write(&self, dev: &dyn DeviceAccess, data: &[u8]) -> Result<Vec<u8>, RequestError> {
        dev.request(
            Address::Feature {
                id: self.feature,
                function: self.write_function,
                no_reply: self.no_reply,
            },
            data,
        )
        .await
    }
}

/// A keyed variant of [`FeatureRw`] for map-shaped settings, addressing
/// one key per exchange.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeatureRwMap {
    feature: u16,
    read_function: u8,
    write_function: u8,
    key_byte_count: usize,
}

impl FeatureRwMap {
    /// Creates a keyed adapter with explicit function numbers and key
    /// width.
    pub fn new(feature: u16, read_function: u8, write_function: u8, key_byte_count: usize) -> Self {
        Self {
            feature,
            read_function,
            write_function,
            key_byte_count,
        }
    }

    fn key_bytes(&self, key: u16) -> Vec<u8> {
        (0..self.key_byte_count)
            .rev()
            .map(|shift| (key >> (shift * 8)) as u8)
            .collect()
    }

    /// Reads the current value stored for one key.
    pub async fn read(&self, dev: &dyn DeviceAccess, key: u16) -> Result<Vec<u8>, RequestError> {
        dev.request(
            Address::Feature {
                id: self.feature,
                function: self.read_function,
                no_reply: false,
            },
            &self.key_bytes(key),
        )
        .await
    }

    /// Writes a new value for one key.
    pub async fn write(
        &self,
        dev: &dyn DeviceAccess,
        key: u16,
        data: &[u8],
    ) -> Result<Vec<u8>, RequestError> {
        let mut payload = self.key_bytes(key);
        payload.extend_from_slice(data);

        dev.request(
            Address::Feature {
                id: self.feature,
                function: self.write_function,
                no_reply: false,
            },
            &payload,
        )
        .await
    }
}

/// The addressing scheme of a setting with a single raw value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rw {
    /// A legacy register.
    Register(RegisterRw),

    /// A feature's read/write function pair.
    Feature(FeatureRw),
}

impl Rw {
    /// Reads the current raw value.
    pub async fn read(&self, dev: &dyn DeviceAccess) -> Result<Vec<u8>, RequestError> {
        match self {
            Rw::Register(rw) => rw.read(dev).await,
            Rw::Feature(rw) => rw.read(dev, &[]).await,
        }
    }

    /// Writes a new raw value.
    pub async fn write(&self, dev: &dyn DeviceAccess, data: &[u8]) -> Result<Vec<u8>, RequestError> {
        match self {
            Rw::Register(rw) => rw.write(dev, data).await,
            Rw::Feature(rw) => rw.write(dev, data).await,
        }
    }
}
