//! The constructor library behind the catalog: one function per known
//! setting, producing a fully wired [`Setting`] descriptor.
//!
//! Register-backed constructors are plain functions; everything they need
//! is known statically. Feature-backed constructors talk to the device to
//! resolve choices, ranges or flag sets, and return `Ok(None)` when the
//! probe shows the capability is not usable on this particular unit.

use std::collections::BTreeMap;

use futures::future::BoxFuture;

use crate::{
    codec::{
        BitFieldCodec,
        BitFieldOffsetMaskCodec,
        BooleanCodec,
        ChoiceCodec,
        ChoiceMapCodec,
        FlagAt,
        MultiRangeCodec,
        MultiRangeItem,
        RangeCodec,
        ScalarCodec,
        SmartShiftCodec,
    },
    device::{Address, DeviceAccess, DeviceKind, RequestError},
    gesture,
    ids::{feature, register},
    rw::{FeatureRw, FeatureRwMap, RegisterRw, Rw},
    setting::{Backend, DisplayInfo, Setting, SettingError},
    value::Choice,
};

const KEYBOARDS: &[DeviceKind] = &[DeviceKind::Keyboard];
const MICE: &[DeviceKind] = &[DeviceKind::Mouse, DeviceKind::Trackball];
const TOUCHPADS: &[DeviceKind] = &[DeviceKind::Touchpad, DeviceKind::Mouse];

pub(crate) const HAND_DETECTION: DisplayInfo = DisplayInfo {
    key: "hand-detection",
    name: "Hand Detection",
    tooltip: Some("Turn on illumination when the hands hover over the keyboard."),
};

pub(crate) const SMOOTH_SCROLL: DisplayInfo = DisplayInfo {
    key: "smooth-scroll",
    name: "Smooth Scrolling",
    tooltip: Some("High-sensitivity mode for vertical scroll with the wheel."),
};

pub(crate) const SIDE_SCROLL: DisplayInfo = DisplayInfo {
    key: "side-scroll",
    name: "Side Scrolling",
    tooltip: Some(
        "When disabled, pushing the wheel sideways sends custom button events \
         instead of scrolling.",
    ),
};

pub(crate) const HI_RES_SCROLL: DisplayInfo = DisplayInfo {
    key: "hi-res-scroll",
    name: "High Resolution Scrolling",
    tooltip: Some("High-sensitivity mode for vertical scroll with the wheel."),
};

pub(crate) const LOWRES_SMOOTH_SCROLL: DisplayInfo = DisplayInfo {
    key: "lowres-smooth-scroll",
    name: "Scroll Wheel Smooth Scrolling",
    tooltip: Some("Low resolution mode for vertical scroll with the wheel."),
};

pub(crate) const HIRES_SMOOTH_INVERT: DisplayInfo = DisplayInfo {
    key: "hires-smooth-invert",
    name: "Scroll Wheel Direction",
    tooltip: Some("Invert direction for vertical scroll with the wheel."),
};

pub(crate) const HIRES_SMOOTH_RESOLUTION: DisplayInfo = DisplayInfo {
    key: "hires-smooth-resolution",
    name: "Scroll Wheel Resolution",
    tooltip: Some("High-sensitivity mode for vertical scroll with the wheel."),
};

pub(crate) const FN_SWAP: DisplayInfo = DisplayInfo {
    key: "fn-swap",
    name: "Swap Fx function",
    tooltip: Some(
        "When set, the F1..F12 keys will activate their special function, and \
         you must hold the FN key to activate their standard function.",
    ),
};

pub(crate) const NEW_FN_SWAP: DisplayInfo = DisplayInfo {
    key: "new-fn-swap",
    ..FN_SWAP
};

pub(crate) const K375S_FN_SWAP: DisplayInfo = DisplayInfo {
    key: "k375s-fn-swap",
    ..FN_SWAP
};

pub(crate) const DPI: DisplayInfo = DisplayInfo {
    key: "dpi",
    name: "Sensitivity (DPI)",
    tooltip: Some("Mouse movement sensitivity."),
};

pub(crate) const POINTER_SPEED: DisplayInfo = DisplayInfo {
    key: "pointer_speed",
    name: "Sensitivity (Pointer Speed)",
    tooltip: Some("Speed multiplier for the mouse (256 is the normal multiplier)."),
};

pub(crate) const SMART_SHIFT: DisplayInfo = DisplayInfo {
    key: "smart-shift",
    name: "Scroll Wheel Ratchet",
    tooltip: Some(
        "Automatically switch the mouse wheel between ratchet and freespin mode.\n\
         The mouse wheel is always free at 0, and always locked at 50.",
    ),
};

pub(crate) const BACKLIGHT: DisplayInfo = DisplayInfo {
    key: "backlight",
    name: "Backlight",
    tooltip: Some("Turn illumination on or off on the keyboard."),
};

pub(crate) const REPROGRAMMABLE_KEYS: DisplayInfo = DisplayInfo {
    key: "reprogrammable-keys",
    name: "Actions",
    tooltip: Some("Change the function of each key."),
};

pub(crate) const DISABLE_KEYBOARD_KEYS: DisplayInfo = DisplayInfo {
    key: "disable-keyboard-keys",
    name: "Disable keys",
    tooltip: Some("Disable specific keyboard keys."),
};

pub(crate) const MULTIPLATFORM: DisplayInfo = DisplayInfo {
    key: "multiplatform",
    name: "Set OS",
    tooltip: Some("Change keys to match the operating system."),
};

pub(crate) const DUALPLATFORM: DisplayInfo = DisplayInfo {
    key: "dualplatform",
    ..MULTIPLATFORM
};

pub(crate) const CHANGE_HOST: DisplayInfo = DisplayInfo {
    key: "change-host",
    name: "Change Host",
    tooltip: Some("Switch connection to a different host."),
};

pub(crate) const THUMB_SCROLL_MODE: DisplayInfo = DisplayInfo {
    key: "thumb-scroll-mode",
    name: "Thumb Wheel HID++ Scrolling",
    tooltip: Some("HID++ mode for horizontal scroll with the thumb wheel."),
};

pub(crate) const THUMB_SCROLL_INVERT: DisplayInfo = DisplayInfo {
    key: "thumb-scroll-invert",
    name: "Thumb Wheel Direction",
    tooltip: Some("Invert thumb wheel scroll direction."),
};

pub(crate) const GESTURE2_GESTURES: DisplayInfo = DisplayInfo {
    key: "gesture2-gestures",
    name: "Gestures",
    tooltip: Some("Tweak the mouse/touchpad behaviour."),
};

pub(crate) const GESTURE2_PARAMS: DisplayInfo = DisplayInfo {
    key: "gesture2-params",
    name: "Gesture params",
    tooltip: Some("Change numerical parameters of a mouse/touchpad."),
};

async fn feature_read(
    dev: &dyn DeviceAccess,
    id: u16,
    function: u8,
    params: &[u8],
) -> Result<Vec<u8>, RequestError> {
    dev.request(
        Address::Feature {
            id,
            function,
            no_reply: false,
        },
        params,
    )
    .await
}

fn boolean(rw: Rw, codec: BooleanCodec) -> Backend {
    Backend::Scalar {
        rw,
        codec: ScalarCodec::Boolean(codec),
    }
}

pub fn register_hand_detection() -> Setting {
    Setting::new(
        HAND_DETECTION,
        boolean(
            Rw::Register(RegisterRw::new(register::KEYBOARD_HAND_DETECTION)),
            BooleanCodec::new(vec![0, 0, 0x00], vec![0, 0, 0x30], vec![0, 0, 0xff]),
        ),
    )
    .for_kinds(KEYBOARDS)
}

pub fn register_fn_swap() -> Setting {
    Setting::new(
        FN_SWAP,
        boolean(
            Rw::Register(RegisterRw::new(register::KEYBOARD_FN_SWAP)),
            BooleanCodec::new(vec![0, 0x01], vec![0, 0x00], vec![0, 0x01]),
        ),
    )
    .for_kinds(KEYBOARDS)
}

pub fn register_smooth_scroll() -> Setting {
    Setting::new(
        SMOOTH_SCROLL,
        boolean(
            Rw::Register(RegisterRw::new(register::MOUSE_BUTTON_FLAGS)),
            BooleanCodec::flag(0x40, 0x40),
        ),
    )
    .for_kinds(MICE)
}

pub fn register_side_scroll() -> Setting {
    Setting::new(
        SIDE_SCROLL,
        boolean(
            Rw::Register(RegisterRw::new(register::MOUSE_BUTTON_FLAGS)),
            BooleanCodec::flag(0x02, 0x02),
        ),
    )
    .for_kinds(MICE)
}

/// Older mice report their supported resolutions out of band, so the
/// choice list has to be supplied by the caller.
pub fn register_dpi(choices: Vec<Choice>) -> Setting {
    Setting::new(
        DPI,
        Backend::Scalar {
            rw: Rw::Register(RegisterRw::new(register::MOUSE_DPI)),
            codec: ScalarCodec::Choice(ChoiceCodec::new(choices)),
        },
    )
    .for_kinds(MICE)
}

pub(crate) fn fn_swap(_dev: &dyn DeviceAccess) -> BoxFuture<'_, Result<Option<Setting>, SettingError>> {
    Box::pin(async move {
        Ok(Some(
            Setting::new(
                FN_SWAP,
                boolean(
                    Rw::Feature(FeatureRw::new(feature::FN_INVERSION)),
                    BooleanCodec::default(),
                ),
            )
            .for_kinds(KEYBOARDS),
        ))
    })
}

pub(crate) fn new_fn_swap(
    _dev: &dyn DeviceAccess,
) -> BoxFuture<'_, Result<Option<Setting>, SettingError>> {
    Box::pin(async move {
        Ok(Some(
            Setting::new(
                NEW_FN_SWAP,
                boolean(
                    Rw::Feature(FeatureRw::new(feature::NEW_FN_INVERSION)),
                    BooleanCodec::default(),
                ),
            )
            .for_kinds(KEYBOARDS),
        ))
    })
}

/// The K375s variant targets a host slot; `0xFF` addresses whichever host
/// the device is currently talking to.
pub(crate) fn k375s_fn_swap(
    _dev: &dyn DeviceAccess,
) -> BoxFuture<'_, Result<Option<Setting>, SettingError>> {
    Box::pin(async move {
        Ok(Some(
            Setting::new(
                K375S_FN_SWAP,
                boolean(
                    Rw::Feature(FeatureRw::new(feature::K375S_FN_INVERSION)),
                    BooleanCodec::new(vec![0xff, 0x01], vec![0xff, 0x00], vec![0xff, 0xff]),
                ),
            )
            .for_kinds(KEYBOARDS),
        ))
    })
}

pub(crate) fn backlight(
    _dev: &dyn DeviceAccess,
) -> BoxFuture<'_, Result<Option<Setting>, SettingError>> {
    Box::pin(async move {
        Ok(Some(
            Setting::new(
                BACKLIGHT,
                boolean(
                    Rw::Feature(FeatureRw::new(feature::BACKLIGHT2)),
                    BooleanCodec::default(),
                ),
            )
            .for_kinds(KEYBOARDS),
        ))
    })
}

pub(crate) fn hi_res_scroll(
    _dev: &dyn DeviceAccess,
) -> BoxFuture<'_, Result<Option<Setting>, SettingError>> {
    Box::pin(async move {
        Ok(Some(
            Setting::new(
                HI_RES_SCROLL,
                boolean(
                    Rw::Feature(FeatureRw::new(feature::HI_RES_SCROLLING)),
                    BooleanCodec::default(),
                ),
            )
            .for_kinds(MICE),
        ))
    })
}

pub(crate) fn lowres_smooth_scroll(
    _dev: &dyn DeviceAccess,
) -> BoxFuture<'_, Result<Option<Setting>, SettingError>> {
    Box::pin(async move {
        Ok(Some(
            Setting::new(
                LOWRES_SMOOTH_SCROLL,
                boolean(
                    Rw::Feature(FeatureRw::new(feature::LOWRES_WHEEL)),
                    BooleanCodec::default(),
                ),
            )
            .for_kinds(MICE),
        ))
    })
}

pub(crate) fn hires_smooth_invert(
    _dev: &dyn DeviceAccess,
) -> BoxFuture<'_, Result<Option<Setting>, SettingError>> {
    Box::pin(async move {
        Ok(Some(
            Setting::new(
                HIRES_SMOOTH_INVERT,
                boolean(
                    Rw::Feature(FeatureRw::with_functions(feature::HIRES_WHEEL, 1, 2)),
                    BooleanCodec::flag(0x04, 0x04),
                ),
            )
            .for_kinds(MICE),
        ))
    })
}

pub(crate) fn hires_smooth_resolution(
    _dev: &dyn DeviceAccess,
) -> BoxFuture<'_, Result<Option<Setting>, SettingError>> {
    Box::pin(async move {
        Ok(Some(
            Setting::new(
                HIRES_SMOOTH_RESOLUTION,
                boolean(
                    Rw::Feature(FeatureRw::with_functions(feature::HIRES_WHEEL, 1, 2)),
                    BooleanCodec::flag(0x02, 0x02),
                ),
            )
            .for_kinds(MICE),
        ))
    })
}

pub(crate) fn thumb_mode(
    _dev: &dyn DeviceAccess,
) -> BoxFuture<'_, Result<Option<Setting>, SettingError>> {
    Box::pin(async move {
        Ok(Some(
            Setting::new(
                THUMB_SCROLL_MODE,
                boolean(
                    Rw::Feature(FeatureRw::with_functions(feature::THUMB_WHEEL, 1, 2)),
                    BooleanCodec::new(vec![0x01, 0x00], vec![0x00, 0x00], vec![0x01, 0x00]),
                ),
            )
            .for_kinds(MICE),
        ))
    })
}

pub(crate) fn thumb_invert(
    _dev: &dyn DeviceAccess,
) -> BoxFuture<'_, Result<Option<Setting>, SettingError>> {
    Box::pin(async move {
        Ok(Some(
            Setting::new(
                THUMB_SCROLL_INVERT,
                boolean(
                    Rw::Feature(FeatureRw::with_functions(feature::THUMB_WHEEL, 1, 2)),
                    BooleanCodec::new(vec![0x00, 0x01], vec![0x00, 0x00], vec![0x00, 0x01]),
                ),
            )
            .for_kinds(MICE),
        ))
    })
}

pub(crate) fn pointer_speed(
    _dev: &dyn DeviceAccess,
) -> BoxFuture<'_, Result<Option<Setting>, SettingError>> {
    Box::pin(async move {
        Ok(Some(
            Setting::new(
                POINTER_SPEED,
                Backend::Scalar {
                    rw: Rw::Feature(FeatureRw::new(feature::POINTER_SPEED)),
                    codec: ScalarCodec::Range(RangeCodec::new(0x002e, 0x01ff, 2)),
                },
            )
            .for_kinds(MICE),
        ))
    })
}

pub(crate) fn smart_shift(
    _dev: &dyn DeviceAccess,
) -> BoxFuture<'_, Result<Option<Setting>, SettingError>> {
    Box::pin(async move {
        Ok(Some(
            Setting::new(
                SMART_SHIFT,
                Backend::Scalar {
                    rw: Rw::Feature(FeatureRw::new(feature::SMART_SHIFT)),
                    codec: ScalarCodec::SmartShift(SmartShiftCodec),
                },
            )
            .for_kinds(MICE),
        ))
    })
}

/// Reads the supported resolutions: bytes 1..15 of the reply hold up to
/// seven big-endian entries, terminated by zero. An entry with the top
/// three bits set is a step directive and expands the surrounding pair of
/// entries into an inclusive range.
async fn dpi_choices(dev: &dyn DeviceAccess) -> Result<Option<Vec<Choice>>, SettingError> {
    let reply = feature_read(dev, feature::ADJUSTABLE_DPI, 1, &[]).await?;

    let mut list: Vec<u16> = Vec::new();
    let mut step = None;
    for entry in reply.get(1..15).unwrap_or(&[]).chunks_exact(2) {
        let value = u16::from_be_bytes([entry[0], entry[1]]);
        if value == 0 {
            break;
        }

        if value >> 13 == 0b111 {
            if step.is_some() || list.len() != 1 {
                return Err(SettingError::Inconsistent(format!(
                    "misplaced DPI step directive {value:#06x}"
                )));
            }
            step = Some(value & 0x1fff);
        } else {
            list.push(value);
        }
    }

    if let Some(step) = step {
        if list.len() != 2 || step == 0 {
            return Err(SettingError::Inconsistent(format!(
                "unusable DPI step {step} over {} bounds",
                list.len()
            )));
        }
        list = (list[0]..=list[1]).step_by(usize::from(step)).collect();
    }

    if list.is_empty() {
        return Ok(None);
    }

    Ok(Some(
        list.into_iter()
            .map(|dpi| Choice::new(u32::from(dpi), dpi.to_string()))
            .collect(),
    ))
}

pub(crate) fn adjustable_dpi(
    dev: &dyn DeviceAccess,
) -> BoxFuture<'_, Result<Option<Setting>, SettingError>> {
    Box::pin(async move {
        let Some(choices) = dpi_choices(dev).await? else {
            return Ok(None);
        };

        // The raw value carries the sensor index in its leading byte; only
        // sensor zero is addressed, so plain 3-byte values work for both
        // directions.
        let codec = ChoiceCodec {
            byte_count: 3,
            ..ChoiceCodec::new(choices)
        };

        Ok(Some(
            Setting::new(
                DPI,
                Backend::Scalar {
                    rw: Rw::Feature(FeatureRw::with_functions(feature::ADJUSTABLE_DPI, 2, 3)),
                    codec: ScalarCodec::Choice(codec),
                },
            )
            .for_kinds(MICE),
        ))
    })
}

/// OS names by their bit in a platform descriptor, most specific first.
const OS_BITS: &[(&str, u16)] = &[
    ("Linux", 0x0400),
    ("MacOS", 0x2000),
    ("Windows", 0x0100),
    ("iOS", 0x4000),
    ("Android", 0x1000),
    ("WebOS", 0x8000),
    ("Chrome", 0x0800),
    ("WinEmb", 0x0200),
    ("Tizen", 0x0001),
];

fn os_version_label(version: u16) -> String {
    if version == 0 {
        return String::new();
    }

    let (major, minor) = (version >> 8, version & 0xff);
    if minor != 0 {
        format!("{major}.{minor}")
    } else {
        format!("{major}")
    }
}

fn os_version_range(low: u16, high: u16) -> String {
    if low == 0 && high == 0 {
        return String::new();
    }

    format!(" {}-{}", os_version_label(low), os_version_label(high))
}

pub(crate) fn multiplatform(
    dev: &dyn DeviceAccess,
) -> BoxFuture<'_, Result<Option<Setting>, SettingError>> {
    Box::pin(async move {
        let infos = feature_read(dev, feature::MULTIPLATFORM, 0, &[]).await?;
        if infos.len() < 2 {
            return Err(RequestError::MalformedReply.into());
        }

        // Bit 1 of the capability flags marks software platform selection.
        if infos[0] & 0x02 == 0 {
            return Ok(None);
        }

        let mut descriptors = Vec::with_capacity(usize::from(infos[1]));
        for index in 0..infos[1] {
            let descr = feature_read(dev, feature::MULTIPLATFORM, 1, &[index]).await?;
            if descr.len() < 8 {
                return Err(RequestError::MalformedReply.into());
            }

            descriptors.push((
                descr[0],
                u16::from_be_bytes([descr[2], descr[3]]),
                u16::from_be_bytes([descr[4], descr[5]]),
                u16::from_be_bytes([descr[6], descr[7]]),
            ));
        }

        // Choices come out in OS-table order, one per platform, labeled
        // with the first OS that matches it. Devices list one descriptor
        // per host slot, so the same platform (or label) shows up
        // repeatedly and is added only once.
        let mut choices: Vec<Choice> = Vec::new();
        for (os_name, bit) in OS_BITS {
            for &(platform, os_flags, low, high) in &descriptors {
                if os_flags & bit == 0 {
                    continue;
                }

                let label = format!("{os_name}{}", os_version_range(low, high));
                if choices
                    .iter()
                    .any(|c| c.value == u32::from(platform) || c.name == label)
                {
                    continue;
                }

                choices.push(Choice::new(u32::from(platform), label));
            }
        }

        if choices.is_empty() {
            return Ok(None);
        }

        // The current platform sits at byte 6 of the info reply; writes
        // address host 0xFF, the one the device is connected to.
        let codec = ChoiceCodec {
            read_skip_bytes: 6,
            write_prefix: vec![0xff],
            ..ChoiceCodec::new(choices)
        };

        Ok(Some(Setting::new(
            MULTIPLATFORM,
            Backend::Scalar {
                rw: Rw::Feature(FeatureRw::with_functions(feature::MULTIPLATFORM, 0, 3)),
                codec: ScalarCodec::Choice(codec),
            },
        )))
    })
}

pub(crate) fn dualplatform(
    _dev: &dyn DeviceAccess,
) -> BoxFuture<'_, Result<Option<Setting>, SettingError>> {
    Box::pin(async move {
        let choices = vec![
            Choice::new(0, "iOS, MacOS"),
            Choice::new(1, "Android, Windows"),
        ];

        Ok(Some(
            Setting::new(
                DUALPLATFORM,
                Backend::Scalar {
                    rw: Rw::Feature(FeatureRw::with_functions(feature::DUALPLATFORM, 0, 2)),
                    codec: ScalarCodec::Choice(ChoiceCodec::new(choices)),
                },
            )
            .for_kinds(KEYBOARDS),
        ))
    })
}

pub(crate) fn change_host(
    dev: &dyn DeviceAccess,
) -> BoxFuture<'_, Result<Option<Setting>, SettingError>> {
    Box::pin(async move {
        let reply = feature_read(dev, feature::CHANGE_HOST, 0, &[]).await?;
        if reply.len() < 2 {
            return Err(RequestError::MalformedReply.into());
        }

        let (num_hosts, current) = (reply[0], reply[1]);
        let persisted = dev.persisted_host_names();
        let mut choices = Vec::with_capacity(usize::from(num_hosts));
        for host in 0..num_hosts {
            let mut name = persisted
                .get(&host)
                .map(|(_, name)| name.clone())
                .unwrap_or_default();

            // The slot we are paired through carries no persisted name of
            // its own; the local machine name is the best label we have.
            if name.is_empty() && host == current {
                name = dev
                    .local_host_name()
                    .split('.')
                    .next()
                    .unwrap_or("")
                    .to_string();
            }

            let label = if name.is_empty() {
                format!("{}", host + 1)
            } else {
                format!("{}:{name}", host + 1)
            };
            choices.push(Choice::new(u32::from(host), label));
        }

        let codec = ChoiceCodec {
            read_skip_bytes: 1,
            ..ChoiceCodec::new(choices)
        };

        // Switching hosts drops the link mid-exchange, so the write is
        // unacknowledged and the value is never restored on reconnect.
        Ok(Some(
            Setting::new(
                CHANGE_HOST,
                Backend::Scalar {
                    rw: Rw::Feature(
                        FeatureRw::with_functions(feature::CHANGE_HOST, 0, 1).no_reply(),
                    ),
                    codec: ScalarCodec::Choice(codec),
                },
            )
            .volatile(),
        ))
    })
}

pub(crate) fn reprogrammable_keys(
    dev: &dyn DeviceAccess,
) -> BoxFuture<'_, Result<Option<Setting>, SettingError>> {
    Box::pin(async move {
        let mut choices = BTreeMap::new();
        for key in dev.reprogrammable_keys().await? {
            if key.targets.len() > 1 {
                choices.insert(key.key, key.targets);
            }
        }

        if choices.is_empty() {
            return Ok(None);
        }

        let codec = ChoiceMapCodec {
            key_byte_count: 2,
            byte_count: 2,
            read_skip_bytes: 1,
            write_prefix: vec![0x00],
            // A remap target of zero restores the key's built-in action. It
            // reads back from unremapped keys but is not offered for
            // writing.
            extra_default: Some(0),
            ..ChoiceMapCodec::new(choices)
        };

        Ok(Some(
            Setting::new(
                REPROGRAMMABLE_KEYS,
                Backend::Map {
                    rw: FeatureRwMap::new(feature::REPROG_CONTROLS_V4, 2, 3, 2),
                    codec,
                },
            )
            .for_kinds(KEYBOARDS),
        ))
    })
}

/// The keys a keyboard may allow disabling, by their capability bit.
const DISABLE_KEY_NAMES: &[(u32, &str)] = &[
    (0x01, "Caps Lock"),
    (0x02, "Num Lock"),
    (0x04, "Scroll Lock"),
    (0x08, "Insert"),
    (0x10, "Win"),
];

/// Looks up the display name of a disableable-key capability bit.
pub fn disable_key_name(flag: u32) -> Option<&'static str> {
    DISABLE_KEY_NAMES
        .iter()
        .find(|(bit, _)| *bit == flag)
        .map(|(_, name)| *name)
}

pub(crate) fn disable_keyboard_keys(
    dev: &dyn DeviceAccess,
) -> BoxFuture<'_, Result<Option<Setting>, SettingError>> {
    Box::pin(async move {
        let reply = feature_read(dev, feature::KEYBOARD_DISABLE_KEYS, 0, &[]).await?;
        let mask = u32::from(*reply.first().ok_or(RequestError::MalformedReply)?);

        let flags: Vec<u32> = DISABLE_KEY_NAMES
            .iter()
            .map(|(bit, _)| *bit)
            .filter(|bit| mask & bit != 0)
            .collect();
        if flags.is_empty() {
            return Ok(None);
        }

        Ok(Some(
            Setting::new(
                DISABLE_KEYBOARD_KEYS,
                Backend::Flags {
                    rw: Rw::Feature(FeatureRw::with_functions(
                        feature::KEYBOARD_DISABLE_KEYS,
                        1,
                        2,
                    )),
                    codec: BitFieldCodec::new(flags),
                },
            )
            .for_kinds(KEYBOARDS),
        ))
    })
}

pub(crate) fn gestures(
    dev: &dyn DeviceAccess,
) -> BoxFuture<'_, Result<Option<Setting>, SettingError>> {
    Box::pin(async move {
        let caps = gesture::enumerate(dev).await?;

        // Slots exist for every gesture that is controllable or enabled by
        // default; fixed default-on gestures keep their place in the bit
        // field even though toggling them off has no effect.
        let flags: Vec<FlagAt> = caps
            .gestures
            .iter()
            .filter_map(|g| {
                Some(FlagAt {
                    flag: u32::from(g.id),
                    offset: g.offset()?,
                    mask: g.mask()?,
                })
            })
            .collect();
        if flags.is_empty() {
            return Ok(None);
        }

        Ok(Some(
            Setting::new(
                GESTURE2_GESTURES,
                Backend::FlagsAt {
                    rw: FeatureRw::with_functions(feature::GESTURE_2, 1, 2),
                    codec: BitFieldOffsetMaskCodec::new(flags),
                },
            )
            .for_kinds(TOUCHPADS),
        ))
    })
}

pub(crate) fn gesture_params(
    dev: &dyn DeviceAccess,
) -> BoxFuture<'_, Result<Option<Setting>, SettingError>> {
    Box::pin(async move {
        let caps = gesture::enumerate(dev).await?;

        let items: Vec<MultiRangeItem> = caps
            .params
            .iter()
            .map(|p| MultiRangeItem {
                id: p.id,
                selector: p.index,
                sub_params: p.sub_params,
            })
            .collect();
        if items.is_empty() {
            return Ok(None);
        }

        Ok(Some(
            Setting::new(
                GESTURE2_PARAMS,
                Backend::Ranges {
                    rw: FeatureRw::with_functions(feature::GESTURE_2, 7, 8),
                    codec: MultiRangeCodec::new(items),
                },
            )
            .for_kinds(TOUCHPADS),
        ))
    })
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;

    use super::*;
    use crate::{testutil::FakeDevice, value::Value};

    fn pad16(mut data: Vec<u8>) -> Vec<u8> {
        while data.len() < 16 {
            data.push(0);
        }
        data
    }

    #[test]
    fn dpi_step_directive_expands_the_range() {
        // 800, step 200, 3200, terminator.
        let dev = FakeDevice::new().with_feature(feature::ADJUSTABLE_DPI).with_reply(
            feature::ADJUSTABLE_DPI,
            1,
            vec![],
            pad16(vec![0x00, 0x03, 0x20, 0xe0, 0xc8, 0x0c, 0x80, 0x00, 0x00]),
        );

        let setting = block_on(adjustable_dpi(&dev)).unwrap().unwrap();
        let choices = setting.choices().unwrap();

        assert_eq!(choices.len(), 13);
        assert_eq!(choices[0], Choice::new(800, "800"));
        assert_eq!(choices[1], Choice::new(1000, "1000"));
        assert_eq!(choices[12], Choice::new(3200, "3200"));
    }

    #[test]
    fn dpi_literal_list_is_used_verbatim() {
        let dev = FakeDevice::new().with_feature(feature::ADJUSTABLE_DPI).with_reply(
            feature::ADJUSTABLE_DPI,
            1,
            vec![],
            pad16(vec![0x00, 0x01, 0x90, 0x03, 0x20, 0x06, 0x40, 0x00, 0x00]),
        );

        let setting = block_on(adjustable_dpi(&dev)).unwrap().unwrap();
        let values: Vec<u32> = setting.choices().unwrap().iter().map(|c| c.value).collect();
        assert_eq!(values, vec![400, 800, 1600]);
    }

    #[test]
    fn dpi_step_without_upper_bound_is_inconsistent() {
        let dev = FakeDevice::new().with_feature(feature::ADJUSTABLE_DPI).with_reply(
            feature::ADJUSTABLE_DPI,
            1,
            vec![],
            pad16(vec![0x00, 0x03, 0x20, 0xe0, 0xc8, 0x00, 0x00]),
        );

        assert!(matches!(
            block_on(adjustable_dpi(&dev)),
            Err(SettingError::Inconsistent(_))
        ));
    }

    #[test]
    fn dpi_empty_list_yields_no_setting() {
        let dev = FakeDevice::new()
            .with_feature(feature::ADJUSTABLE_DPI)
            .with_reply(feature::ADJUSTABLE_DPI, 1, vec![], pad16(vec![0x00]));

        assert!(block_on(adjustable_dpi(&dev)).unwrap().is_none());
    }

    #[test]
    fn multiplatform_labels_and_dedup() {
        let dev = FakeDevice::new()
            .with_feature(feature::MULTIPLATFORM)
            .with_reply(feature::MULTIPLATFORM, 0, vec![], pad16(vec![0x02, 0x03]))
            // MacOS + Windows, no version bounds.
            .with_reply(
                feature::MULTIPLATFORM,
                0x01,
                vec![0x00],
                pad16(vec![0x00, 0x00, 0x21, 0x00, 0x00, 0x00, 0x00, 0x00]),
            )
            // Android 5-9.
            .with_reply(
                feature::MULTIPLATFORM,
                0x01,
                vec![0x01],
                pad16(vec![0x01, 0x00, 0x10, 0x00, 0x05, 0x00, 0x09, 0x00]),
            )
            // A second host slot repeating platform 0.
            .with_reply(
                feature::MULTIPLATFORM,
                0x01,
                vec![0x02],
                pad16(vec![0x00, 0x00, 0x21, 0x00, 0x00, 0x00, 0x00, 0x00]),
            );

        let setting = block_on(multiplatform(&dev)).unwrap().unwrap();
        let choices = setting.choices().unwrap();

        // A platform matching several OS bits is listed once, under the
        // first matching OS of the table.
        assert_eq!(choices.len(), 2);
        assert_eq!(choices[0], Choice::new(0, "MacOS"));
        assert_eq!(choices[1], Choice::new(1, "Android 5-9"));
    }

    #[test]
    fn multiplatform_choices_follow_os_table_order() {
        let dev = FakeDevice::new()
            .with_feature(feature::MULTIPLATFORM)
            .with_reply(feature::MULTIPLATFORM, 0, vec![], pad16(vec![0x02, 0x02]))
            // Windows only.
            .with_reply(
                feature::MULTIPLATFORM,
                0x01,
                vec![0x00],
                pad16(vec![0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00]),
            )
            // Linux only.
            .with_reply(
                feature::MULTIPLATFORM,
                0x01,
                vec![0x01],
                pad16(vec![0x01, 0x00, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00]),
            );

        let setting = block_on(multiplatform(&dev)).unwrap().unwrap();
        let choices = setting.choices().unwrap();

        // Linux precedes Windows in the OS table even though its platform
        // descriptor comes second.
        assert_eq!(choices.len(), 2);
        assert_eq!(choices[0], Choice::new(1, "Linux"));
        assert_eq!(choices[1], Choice::new(0, "Windows"));
    }

    #[test]
    fn multiplatform_without_selection_capability_yields_no_setting() {
        let dev = FakeDevice::new()
            .with_feature(feature::MULTIPLATFORM)
            .with_reply(feature::MULTIPLATFORM, 0, vec![], pad16(vec![0x00, 0x03]));

        assert!(block_on(multiplatform(&dev)).unwrap().is_none());
    }

    #[test]
    fn change_host_labels_fall_back_to_the_local_name() {
        let dev = FakeDevice::new()
            .with_feature(feature::CHANGE_HOST)
            .with_reply(feature::CHANGE_HOST, 0, vec![], vec![0x02, 0x01])
            .with_host_name(0, true, "alpha")
            .with_local_host_name("beta.lan");

        let setting = block_on(change_host(&dev)).unwrap().unwrap();
        assert!(!setting.persist());

        let labels: Vec<&str> =
            setting.choices().unwrap().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(labels, vec!["1:alpha", "2:beta"]);
    }

    #[test]
    fn single_host_devices_still_list_their_host() {
        let dev = FakeDevice::new()
            .with_feature(feature::CHANGE_HOST)
            .with_reply(feature::CHANGE_HOST, 0, vec![], vec![0x01, 0x00]);

        let setting = block_on(change_host(&dev)).unwrap().unwrap();
        let labels: Vec<&str> =
            setting.choices().unwrap().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(labels, vec!["1:testhost"]);
    }

    #[test]
    fn fixed_default_on_gestures_keep_their_enable_bit() {
        let dev = FakeDevice::new().with_feature(feature::GESTURE_2).with_reply(
            feature::GESTURE_2,
            0,
            vec![0x00, 0x00],
            pad16(vec![0x82, 0x05, 0x01, 0x00]),
        );

        let setting = block_on(gestures(&dev)).unwrap().unwrap();
        assert_eq!(setting.flags().unwrap(), vec![5]);
    }

    #[test]
    fn remappable_keys_are_gated_to_keyboards() {
        let dev = FakeDevice::new().with_reprog_key(
            0x00c4,
            vec![Choice::new(0x00c4, "Smart Shift"), Choice::new(0x0050, "Left Click")],
        );

        let setting = block_on(reprogrammable_keys(&dev)).unwrap().unwrap();
        assert_eq!(setting.device_kinds(), &[DeviceKind::Keyboard]);
    }

    #[test]
    fn disable_keys_honors_the_capability_mask() {
        let dev = FakeDevice::new()
            .with_feature(feature::KEYBOARD_DISABLE_KEYS)
            .with_reply(feature::KEYBOARD_DISABLE_KEYS, 0, vec![], vec![0x05]);

        let setting = block_on(disable_keyboard_keys(&dev)).unwrap().unwrap();
        let flags = setting.flags().unwrap();

        assert_eq!(flags, vec![0x01, 0x04]);
        assert_eq!(disable_key_name(0x01), Some("Caps Lock"));
        assert_eq!(disable_key_name(0x04), Some("Scroll Lock"));
        assert_eq!(disable_key_name(0x40), None);
    }

    #[test]
    fn smart_shift_writes_the_mode_threshold_record() {
        let dev = FakeDevice::new()
            .with_feature(feature::SMART_SHIFT)
            .with_fallback_reply(feature::SMART_SHIFT, 1, vec![]);

        let setting = block_on(smart_shift(&dev)).unwrap().unwrap();
        block_on(setting.set(&dev, &Value::Int(50))).unwrap();

        let writes = dev.requests();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].1, vec![0x02, 0xff, 0xff]);
    }

    #[test]
    fn register_toggle_preserves_unrelated_bits() {
        let dev = FakeDevice::new()
            .with_register(register::MOUSE_BUTTON_FLAGS)
            .with_register_reply(register::MOUSE_BUTTON_FLAGS, vec![0x15])
            .with_register_write(register::MOUSE_BUTTON_FLAGS);

        let setting = register_smooth_scroll();
        block_on(setting.set(&dev, &Value::Bool(true))).unwrap();

        let writes: Vec<_> = dev
            .requests()
            .into_iter()
            .filter(|(addr, _)| matches!(addr, Address::RegisterWrite(_)))
            .collect();
        assert_eq!(writes.len(), 1);
        // 0x15 with the 0x40 flag raised; the 0x15 bits survive.
        assert_eq!(writes[0].1, vec![0x55]);
    }

    #[test]
    fn register_toggle_reads_back_the_flag() {
        let dev = FakeDevice::new()
            .with_register(register::MOUSE_BUTTON_FLAGS)
            .with_register_reply(register::MOUSE_BUTTON_FLAGS, vec![0x42]);

        let setting = register_side_scroll();
        let value = block_on(setting.get(&dev)).unwrap();
        assert_eq!(value, Value::Bool(true));

        let setting = register_smooth_scroll();
        let value = block_on(setting.get(&dev)).unwrap();
        assert_eq!(value, Value::Bool(true));
    }
}
