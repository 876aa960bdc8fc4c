//! Setting descriptors: one addressable configurable of a device.
//!
//! A descriptor couples a stable identity with an adapter and a codec.
//! The codec is either fixed at declaration time or resolved once per
//! device while negotiating; by the time a descriptor exists, it is
//! always concrete.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::{
    codec::{
        BitFieldCodec,
        BitFieldOffsetMaskCodec,
        ChoiceMapCodec,
        CodecError,
        MultiRangeCodec,
        ScalarCodec,
        SMART_SHIFT_MAX,
        SMART_SHIFT_MIN,
    },
    device::{DeviceAccess, DeviceKind, RequestError},
    rw::{FeatureRw, FeatureRwMap, Rw},
    value::{Choice, Value},
};

/// The display identity of a setting: a stable key plus the strings a
/// presentation layer shows for it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DisplayInfo {
    /// The stable key the setting is addressed by. Unique across the
    /// catalog.
    pub key: &'static str,

    /// The short human-readable name.
    pub name: &'static str,

    /// An optional longer description.
    pub tooltip: Option<&'static str>,
}

/// The adapter/codec pairing of a setting.
///
/// Each variant pairs a value shape with the only addressing scheme it
/// works through, so mismatched combinations cannot be constructed.
#[derive(Clone, Debug)]
pub(crate) enum Backend {
    /// A single raw value holding a boolean, range or choice.
    Scalar { rw: Rw, codec: ScalarCodec },

    /// One choice per key, exchanged one key at a time.
    Map {
        rw: FeatureRwMap,
        codec: ChoiceMapCodec,
    },

    /// A bit field of independent toggles in a single raw value.
    Flags { rw: Rw, codec: BitFieldCodec },

    /// Toggles spread across a longer record, exchanged per offset.
    FlagsAt {
        rw: FeatureRw,
        codec: BitFieldOffsetMaskCodec,
    },

    /// Numeric records exchanged per parameter.
    Ranges {
        rw: FeatureRw,
        codec: MultiRangeCodec,
    },
}

/// Represents one configurable behavior of a connected device.
///
/// Constructed during negotiation and dropped when the device goes away.
/// The generic [`Self::get`] and [`Self::set`] operations hide the raw
/// byte layout from callers.
#[derive(Clone, Debug)]
pub struct Setting {
    info: DisplayInfo,
    device_kinds: &'static [DeviceKind],
    persist: bool,
    backend: Backend,
}

impl Setting {
    pub(crate) fn new(info: DisplayInfo, backend: Backend) -> Self {
        Self {
            info,
            device_kinds: &[],
            persist: true,
            backend,
        }
    }

    /// Restricts the setting to specific device kinds.
    pub(crate) fn for_kinds(mut self, kinds: &'static [DeviceKind]) -> Self {
        self.device_kinds = kinds;
        self
    }

    /// Marks the setting as not to be restored on reconnect.
    pub(crate) fn volatile(mut self) -> Self {
        self.persist = false;
        self
    }

    /// The stable key the setting is addressed by.
    pub fn key(&self) -> &'static str {
        self.info.key
    }

    /// The short human-readable name.
    pub fn name(&self) -> &'static str {
        self.info.name
    }

    /// An optional longer description.
    pub fn tooltip(&self) -> Option<&'static str> {
        self.info.tooltip
    }

    /// The device kinds the setting applies to. Empty means unrestricted.
    pub fn device_kinds(&self) -> &'static [DeviceKind] {
        self.device_kinds
    }

    /// Whether the value should be restored when the device reconnects.
    pub fn persist(&self) -> bool {
        self.persist
    }

    /// The choices of a choice-shaped setting.
    pub fn choices(&self) -> Option<&[Choice]> {
        match &self.backend {
            Backend::Scalar {
                codec: ScalarCodec::Choice(codec),
                ..
            } => Some(&codec.choices),
            _ => None,
        }
    }

    /// The per-key choices of a map-shaped setting.
    pub fn choice_map(&self) -> Option<&BTreeMap<u16, Vec<Choice>>> {
        match &self.backend {
            Backend::Map {
                codec, ..
            } => Some(&codec.choices),
            _ => None,
        }
    }

    /// The inclusive bounds of a range-shaped setting.
    pub fn range(&self) -> Option<(i64, i64)> {
        match &self.backend {
            Backend::Scalar {
                codec: ScalarCodec::Range(codec),
                ..
            } => Some((i64::from(codec.min), i64::from(codec.max))),
            Backend::Scalar {
                codec: ScalarCodec::SmartShift(_),
                ..
            } => Some((SMART_SHIFT_MIN, SMART_SHIFT_MAX)),
            _ => None,
        }
    }

    /// The flag identifiers of a bit-field-shaped setting.
    pub fn flags(&self) -> Option<Vec<u32>> {
        match &self.backend {
            Backend::Flags {
                codec, ..
            } => Some(codec.flags.clone()),
            Backend::FlagsAt {
                codec, ..
            } => Some(codec.flags.iter().map(|f| f.flag).collect()),
            _ => None,
        }
    }

    /// Reads and decodes the current value from the device.
    pub async fn get(&self, dev: &dyn DeviceAccess) -> Result<Value, SettingError> {
        match &self.backend {
            Backend::Scalar {
                rw,
                codec,
            } => {
                let raw = rw.read(dev).await?;
                Ok(codec.decode(&raw)?)
            },
            Backend::Map {
                rw,
                codec,
            } => {
                let mut entries = BTreeMap::new();
                for key in codec.keys().collect::<Vec<_>>() {
                    let raw = rw.read(dev, key).await?;
                    entries.insert(key, codec.decode_entry(key, &raw)?);
                }
                Ok(Value::Map(entries))
            },
            Backend::Flags {
                rw,
                codec,
            } => {
                let raw = rw.read(dev).await?;
                Ok(Value::Flags(codec.decode(&raw)?))
            },
            Backend::FlagsAt {
                rw,
                codec,
            } => {
                let mut replies = BTreeMap::new();
                for offset in codec.offsets() {
                    let raw = rw.read(dev, &[offset]).await?;
                    let byte = *raw.first().ok_or(RequestError::MalformedReply)?;
                    replies.insert(offset, byte);
                }
                Ok(Value::Flags(codec.decode(&replies)?))
            },
            Backend::Ranges {
                rw,
                codec,
            } => {
                let mut records = BTreeMap::new();
                for item in codec.items.clone() {
                    let raw = rw.read(dev, &[item.selector]).await?;
                    records.insert(item.id, codec.decode_item(item.id, &raw)?);
                }
                Ok(Value::Records(records))
            },
        }
    }

    /// Encodes and writes a new value to the device.
    ///
    /// The value must have the shape the setting's codec declares;
    /// anything else is rejected before any exchange happens.
    pub async fn set(&self, dev: &dyn DeviceAccess, value: &Value) -> Result<(), SettingError> {
        match &self.backend {
            Backend::Scalar {
                rw,
                codec,
            } => {
                // Partial-mask codecs must not clobber unrelated bits.
                let current = if codec.needs_current() {
                    Some(rw.read(dev).await?)
                } else {
                    None
                };

                let data = codec.encode(value, current.as_deref())?;
                rw.write(dev, &data).await?;
                Ok(())
            },
            Backend::Map {
                rw,
                codec,
            } => {
                let Value::Map(entries) = value else {
                    return Err(CodecError::WrongShape.into());
                };

                for (&key, &chosen) in entries {
                    let data = codec.encode_entry(key, chosen)?;
                    rw.write(dev, key, &data).await?;
                }
                Ok(())
            },
            Backend::Flags {
                rw,
                codec,
            } => {
                let Value::Flags(flags) = value else {
                    return Err(CodecError::WrongShape.into());
                };

                let data = codec.encode(flags)?;
                rw.write(dev, &data).await?;
                Ok(())
            },
            Backend::FlagsAt {
                rw,
                codec,
            } => {
                let Value::Flags(flags) = value else {
                    return Err(CodecError::WrongShape.into());
                };

                for (offset, mask, bits) in codec.encode(flags)? {
                    rw.write(dev, &[offset, mask, bits]).await?;
                }
                Ok(())
            },
            Backend::Ranges {
                rw,
                codec,
            } => {
                let Value::Records(records) = value else {
                    return Err(CodecError::WrongShape.into());
                };

                for (&id, fields) in records {
                    let item = codec
                        .items
                        .iter()
                        .find(|i| i.id == id)
                        .ok_or(CodecError::UnknownKey(u16::from(id)))?;

                    let mut data = vec![item.selector];
                    data.extend(codec.encode_item(id, fields)?);
                    rw.write(dev, &data).await?;
                }
                Ok(())
            },
        }
    }
}

/// The per-device list of settings produced by negotiation.
///
/// Order follows the catalog; keys are unique. The list only grows during
/// negotiation and is dropped with the device.
#[derive(Debug, Default)]
pub struct ActiveSettings(Vec<Setting>);

impl ActiveSettings {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks whether a setting with the given key is already present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.iter().any(|s| s.key() == key)
    }

    /// Looks up a setting by its stable key.
    pub fn get(&self, key: &str) -> Option<&Setting> {
        self.0.iter().find(|s| s.key() == key)
    }

    /// Appends a setting unless its key is already taken. Returns whether
    /// the setting was added.
    pub fn push(&mut self, setting: Setting) -> bool {
        if self.contains_key(setting.key()) {
            return false;
        }

        self.0.push(setting);
        true
    }

    /// The number of settings in the list.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the settings in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &Setting> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a ActiveSettings {
    type Item = &'a Setting;
    type IntoIter = std::slice::Iter<'a, Setting>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}


/// Represents a failed setting operation.
#[derive(Clone, Debug, Error)]
pub enum SettingError {
    /// The request/response exchange with the device failed.
    #[error("the device request failed")]
    Request(#[from] RequestError),

    /// The value could not be translated to or from raw bytes.
    #[error("the value could not be translated")]
    Codec(#[from] CodecError),

    /// The device returned data violating the protocol's own rules.
    #[error("the device returned inconsistent data: {0}")]
    Inconsistent(String),
}
