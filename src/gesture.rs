//! Enumerates the gesture and parameter capabilities a device reports
//! through the Gestures feature (`0x6501`).
//!
//! The feature describes itself through a list of 2-byte entries, read in
//! pages of eight. Gesture entries occupy sequential slots in the enable
//! bit field when they are software-controllable or enabled by default;
//! parameter entries get sequential read selectors and a record layout
//! from a fixed table.

use crate::{
    codec::SubParam,
    device::{Address, DeviceAccess, RequestError},
    ids::feature,
    setting::SettingError,
};

/// Entry kind ending the capability list.
const KIND_END: u8 = 0x01;

/// A gesture the software can enable and disable, disabled by default.
const KIND_GESTURE: u8 = 0x80;

/// A controllable gesture that is enabled by default.
const KIND_GESTURE_DEFAULT_ON: u8 = 0x81;

/// A fixed gesture that is enabled by default.
const KIND_GESTURE_FIXED_ON: u8 = 0x82;

/// A fixed gesture that stays disabled. Never controllable.
const KIND_GESTURE_FIXED_OFF: u8 = 0x83;

/// A numeric parameter descriptor.
const KIND_PARAM: u8 = 0x84;

/// More entries than any known device reports; treated as a runaway list.
const MAX_ENTRIES: u16 = 0x200;

/// Parameter ID of the capability bits themselves. Carries no record.
pub const PARAM_EXTRA_CAPABILITIES: u8 = 1;

/// Parameter ID of the pixel-coordinate active zone.
pub const PARAM_PIXEL_ZONE: u8 = 2;

/// Parameter ID of the ratio-coordinate active zone.
pub const PARAM_RATIO_ZONE: u8 = 3;

/// Parameter ID of the cursor scale factor.
pub const PARAM_SCALE_FACTOR: u8 = 4;

const ZONE_SUB_PARAMS: &[SubParam] = &[
    SubParam {
        name: "left",
        byte_count: 2,
        signed: false,
        min: Some(0),
        max: Some(0xffff),
    },
    SubParam {
        name: "top",
        byte_count: 2,
        signed: false,
        min: Some(0),
        max: Some(0xffff),
    },
    SubParam {
        name: "width",
        byte_count: 2,
        signed: false,
        min: Some(0),
        max: Some(0xffff),
    },
    SubParam {
        name: "height",
        byte_count: 2,
        signed: false,
        min: Some(0),
        max: Some(0xffff),
    },
];

const RATIO_ZONE_SUB_PARAMS: &[SubParam] = &[
    SubParam {
        name: "left",
        byte_count: 1,
        signed: false,
        min: Some(0),
        max: Some(0xff),
    },
    SubParam {
        name: "top",
        byte_count: 1,
        signed: false,
        min: Some(0),
        max: Some(0xff),
    },
    SubParam {
        name: "width",
        byte_count: 1,
        signed: false,
        min: Some(0),
        max: Some(0xff),
    },
    SubParam {
        name: "height",
        byte_count: 1,
        signed: false,
        min: Some(0),
        max: Some(0xff),
    },
];

const SCALE_SUB_PARAMS: &[SubParam] = &[SubParam {
    name: "scale",
    byte_count: 2,
    signed: false,
    min: Some(0x002e),
    max: Some(0x01ff),
}];

/// Looks up the record layout of a parameter ID.
///
/// Parameters without a known layout (or without a record at all, like the
/// capability bits) return [`None`] and are not exposed as settings.
pub fn sub_params_for(param: u8) -> Option<&'static [SubParam]> {
    match param {
        PARAM_PIXEL_ZONE => Some(ZONE_SUB_PARAMS),
        PARAM_RATIO_ZONE => Some(RATIO_ZONE_SUB_PARAMS),
        PARAM_SCALE_FACTOR => Some(SCALE_SUB_PARAMS),
        _ => None,
    }
}

/// Represents one gesture reported by the device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Gesture {
    /// The gesture ID as reported by the device.
    pub id: u8,

    /// Whether the software may toggle the gesture.
    pub can_be_enabled: bool,

    /// Whether the gesture starts out enabled.
    pub default_enabled: bool,

    /// The slot of the gesture in the enable bit field, if it occupies
    /// one.
    pub slot: Option<u16>,
}

impl Gesture {
    /// The byte offset of the gesture's enable bit.
    pub fn offset(&self) -> Option<u8> {
        self.slot.map(|slot| (slot / 8) as u8)
    }

    /// The bit of the addressed byte carrying the gesture's enable state.
    pub fn mask(&self) -> Option<u8> {
        self.slot.map(|slot| 1 << (slot % 8))
    }
}

/// Represents one numeric parameter reported by the device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Param {
    /// The parameter ID as reported by the device.
    pub id: u8,

    /// The selector used to read and write the parameter.
    pub index: u8,

    /// The record layout of the parameter.
    pub sub_params: &'static [SubParam],
}

/// The full gesture capability set of a device.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Gestures {
    /// All gestures, in enumeration order.
    pub gestures: Vec<Gesture>,

    /// All parameters with a known record layout, in enumeration order.
    pub params: Vec<Param>,
}

/// Walks the device's capability list.
pub async fn enumerate(dev: &dyn DeviceAccess) -> Result<Gestures, SettingError> {
    let mut caps = Gestures::default();
    let mut slot = 0u16;
    let mut param_index = 0u8;
    let mut index = 0u16;

    'pages: loop {
        let reply = dev
            .request(
                Address::Feature {
                    id: feature::GESTURE_2,
                    function: 0,
                    no_reply: false,
                },
                &[(index >> 8) as u8, index as u8],
            )
            .await?;

        if reply.len() < 2 {
            return Err(RequestError::MalformedReply.into());
        }

        for entry in reply.chunks_exact(2) {
            index += 1;
            let (kind, id) = (entry[0], entry[1]);

            match kind {
                KIND_END => break 'pages,
                KIND_GESTURE | KIND_GESTURE_DEFAULT_ON | KIND_GESTURE_FIXED_ON
                | KIND_GESTURE_FIXED_OFF => {
                    let can_be_enabled =
                        matches!(kind, KIND_GESTURE | KIND_GESTURE_DEFAULT_ON);
                    let default_enabled =
                        matches!(kind, KIND_GESTURE_DEFAULT_ON | KIND_GESTURE_FIXED_ON);

                    // Only gestures backed by an enable bit occupy a slot.
                    let assigned = if can_be_enabled || default_enabled {
                        let current = slot;
                        slot += 1;
                        Some(current)
                    } else {
                        None
                    };

                    caps.gestures.push(Gesture {
                        id,
                        can_be_enabled,
                        default_enabled,
                        slot: assigned,
                    });
                },
                KIND_PARAM => {
                    if let Some(sub_params) = sub_params_for(id) {
                        caps.params.push(Param {
                            id,
                            index: param_index,
                            sub_params,
                        });
                    }
                    param_index = param_index.saturating_add(1);
                },
                // Unknown entry kinds are skipped so newer firmware does
                // not break enumeration.
                _ => {},
            }
        }

        if index >= MAX_ENTRIES {
            return Err(SettingError::Inconsistent(format!(
                "gesture capability list did not terminate after {MAX_ENTRIES} entries"
            )));
        }
    }

    Ok(caps)
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;

    use super::*;
    use crate::testutil::FakeDevice;

    fn page(entries: &[(u8, u8)]) -> Vec<u8> {
        let mut data = Vec::with_capacity(16);
        for &(kind, id) in entries {
            data.push(kind);
            data.push(id);
        }
        while data.len() < 16 {
            data.push(0x00);
        }
        data
    }

    #[test]
    fn enumerates_gestures_and_params() {
        let dev = FakeDevice::new()
            .with_feature(feature::GESTURE_2)
            .with_reply(
                feature::GESTURE_2,
                0,
                vec![0x00, 0x00],
                page(&[
                    (KIND_GESTURE, 1),
                    (KIND_GESTURE_DEFAULT_ON, 2),
                    (KIND_GESTURE_FIXED_OFF, 3),
                    (KIND_PARAM, PARAM_EXTRA_CAPABILITIES),
                    (KIND_PARAM, PARAM_SCALE_FACTOR),
                    (KIND_END, 0),
                ]),
            );

        let caps = block_on(enumerate(&dev)).unwrap();

        assert_eq!(caps.gestures.len(), 3);
        assert_eq!(caps.gestures[0].slot, Some(0));
        assert_eq!(caps.gestures[1].slot, Some(1));
        // Fixed-off gestures occupy no enable bit.
        assert_eq!(caps.gestures[2].slot, None);
        assert!(!caps.gestures[2].can_be_enabled);

        // The capability-bits parameter has no record and is dropped, but
        // it still consumes a selector.
        assert_eq!(caps.params.len(), 1);
        assert_eq!(caps.params[0].id, PARAM_SCALE_FACTOR);
        assert_eq!(caps.params[0].index, 1);
    }

    #[test]
    fn enumeration_spans_pages() {
        let first: Vec<(u8, u8)> = (0..8).map(|i| (KIND_GESTURE, i + 1)).collect();
        let dev = FakeDevice::new()
            .with_feature(feature::GESTURE_2)
            .with_reply(feature::GESTURE_2, 0, vec![0x00, 0x00], page(&first))
            .with_reply(
                feature::GESTURE_2,
                0,
                vec![0x00, 0x08],
                page(&[(KIND_GESTURE, 9), (KIND_END, 0)]),
            );

        let caps = block_on(enumerate(&dev)).unwrap();
        assert_eq!(caps.gestures.len(), 9);
        assert_eq!(caps.gestures[8].slot, Some(8));
        assert_eq!(caps.gestures[8].offset(), Some(1));
        assert_eq!(caps.gestures[8].mask(), Some(0x01));
    }

    #[test]
    fn runaway_list_fails_loudly() {
        // Every page is full of gestures and never terminates; the reply
        // is keyed only by feature and function, so any index matches.
        let entries: Vec<(u8, u8)> = (0..8).map(|i| (KIND_GESTURE, i + 1)).collect();
        let dev = FakeDevice::new()
            .with_feature(feature::GESTURE_2)
            .with_fallback_reply(feature::GESTURE_2, 0, page(&entries));

        assert!(matches!(
            block_on(enumerate(&dev)),
            Err(SettingError::Inconsistent(_))
        ));
    }
}
