//! The device-side interface the settings layer is built on.
//!
//! The actual HID++ transport lives in an external crate. Everything this
//! crate needs from it is bundled into the [`DeviceAccess`] trait: capability
//! queries, a single request/response primitive and a handful of host-side
//! lookups. The trait defines async methods using [`mod@async_trait`], which
//! is re-exported for annotating your implementing type.

use std::collections::HashMap;

use async_trait::async_trait;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use thiserror::Error;

use crate::value::Choice;

/// Represents the addressing of a single request/response exchange.
///
/// Modern devices are addressed through numbered features, each exposing a
/// set of functions. Older devices expose numbered registers instead, with
/// the read/write distinction encoded in the message type rather than a
/// function number.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Address {
    /// Reads a legacy register value.
    RegisterRead(u8),

    /// Writes a legacy register value.
    RegisterWrite(u8),

    /// Invokes a function of a feature, identified by the globally unique
    /// feature ID.
    Feature {
        /// The ID of the feature to address.
        id: u16,

        /// The number of the function to invoke within the feature.
        function: u8,

        /// Whether the device is known not to acknowledge this exchange.
        ///
        /// Only set where the protocol documentation guarantees it, as it
        /// forgoes write-failure detection.
        no_reply: bool,
    },
}

/// Represents the protocol version a device supports.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ProtocolVersion {
    /// The older HID++1.0 protocol. Feature enumeration is not available.
    V10,

    /// All newer protocols starting from HID++2.0.
    V20 {
        /// The protocol number reported by the device.
        protocol_num: u8,

        /// When `protocol_num >= 3` this field further hints at which
        /// software should support the device. Otherwise the value is zero.
        target_sw: u8,
    },
}

/// Represents the kind of a peripheral device as reported by the receiver
/// or the device itself.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, IntoPrimitive, TryFromPrimitive)]
#[non_exhaustive]
#[repr(u8)]
pub enum DeviceKind {
    Keyboard = 0x01,
    RemoteControl = 0x02,
    Numpad = 0x03,
    Mouse = 0x04,
    Touchpad = 0x05,
    Trackball = 0x06,
    Presenter = 0x07,
    Headset = 0x08,
}

/// Represents a reprogrammable control of a device together with the
/// targets its action can be remapped to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReprogKey {
    /// The control ID of the key or button.
    pub key: u16,

    /// The controls this key can take the action of. A key with less than
    /// two targets is not remappable in any meaningful way.
    pub targets: Vec<Choice>,
}

/// Represents a connected device as far as the settings layer is concerned.
///
/// Implementations wrap a concrete transport plus whatever per-device
/// metadata the surrounding application maintains (pairing info, persisted
/// host names etc.). All blocking happens inside [`Self::request`]; timeout
/// policy is the transport's responsibility and must surface as
/// [`RequestError::NoReply`] rather than a stale value.
#[async_trait]
pub trait DeviceAccess: Send + Sync {
    /// Whether the device is currently reachable.
    fn is_online(&self) -> bool;

    /// The protocol version the device reported, if known.
    fn protocol_version(&self) -> Option<ProtocolVersion>;

    /// The kind of the device.
    fn device_kind(&self) -> DeviceKind;

    /// Checks whether the device advertises a feature ID.
    fn has_feature(&self, id: u16) -> bool;

    /// Checks whether the device supports a legacy register.
    fn has_register(&self, register: u8) -> bool;

    /// Performs a single request/response exchange.
    ///
    /// For [`Address::Feature`] exchanges with `no_reply` set, the returned
    /// byte string is empty.
    async fn request(&self, addr: Address, payload: &[u8]) -> Result<Vec<u8>, RequestError>;

    /// Retrieves the reprogrammable controls of the device and their
    /// possible remap targets.
    async fn reprogrammable_keys(&self) -> Result<Vec<ReprogKey>, RequestError>;

    /// Returns the host names persisted for this device, keyed by host
    /// index. The boolean marks entries the user confirmed as defaults.
    fn persisted_host_names(&self) -> HashMap<u8, (bool, String)>;

    /// Returns the name of the machine this code runs on.
    ///
    /// This is a trait method rather than an ambient lookup so the
    /// negotiation step stays testable without a real operating
    /// environment.
    fn local_host_name(&self) -> String;
}

/// Represents a failed request/response exchange.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Error)]
pub enum RequestError {
    /// The device did not answer within the transport's deadline.
    #[error("the device did not reply")]
    NoReply,

    /// The device answered, but the reply did not have the expected form.
    #[error("the device reply was malformed")]
    MalformedReply,
}
