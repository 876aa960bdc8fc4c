//! The static catalog of every setting this crate knows how to drive.
//!
//! Rows are ordered the way settings should be presented; the
//! negotiation step walks them in this order, so the resulting per-device
//! list is stable across runs.

use std::collections::HashMap;

use futures::future::BoxFuture;
use lazy_static::lazy_static;

use crate::{
    device::DeviceAccess,
    ids::{feature, register},
    setting::{Setting, SettingError},
    template,
};

/// Builds a register-backed setting. Whether the device actually has the
/// register is the caller's problem; no probing is involved.
pub type RegisterCtor = fn() -> Setting;

/// Probes a feature-backed setting on a device. `Ok(None)` means the
/// feature is present but not usable on this unit.
pub type FeatureCtor =
    for<'a> fn(&'a dyn DeviceAccess) -> BoxFuture<'a, Result<Option<Setting>, SettingError>>;

/// The ways one catalog row can be instantiated.
pub enum Constructors {
    /// Only a legacy register implementation exists.
    Register { register: u8, ctor: RegisterCtor },

    /// Only a feature implementation exists.
    Feature { id: u16, ctor: FeatureCtor },

    /// Both protocol generations implement the setting.
    Both {
        register: u8,
        register_ctor: RegisterCtor,
        id: u16,
        ctor: FeatureCtor,
    },
}

impl Constructors {
    /// The feature implementation, if one exists.
    pub fn feature(&self) -> Option<(u16, FeatureCtor)> {
        match *self {
            Constructors::Feature { id, ctor } | Constructors::Both { id, ctor, .. } => {
                Some((id, ctor))
            },
            Constructors::Register { .. } => None,
        }
    }

    /// The register implementation, if one exists.
    pub fn register(&self) -> Option<(u8, RegisterCtor)> {
        match *self {
            Constructors::Register { register, ctor }
            | Constructors::Both {
                register,
                register_ctor: ctor,
                ..
            } => Some((register, ctor)),
            Constructors::Feature { .. } => None,
        }
    }
}

/// One entry of the catalog.
pub struct Row {
    /// The stable key of the setting the row builds.
    pub key: &'static str,

    /// How to instantiate the setting.
    pub ctors: Constructors,
}

/// Every known setting, in presentation order.
pub static CATALOG: &[Row] = &[
    Row {
        key: "hand-detection",
        ctors: Constructors::Register {
            register: register::KEYBOARD_HAND_DETECTION,
            ctor: template::register_hand_detection,
        },
    },
    Row {
        key: "smooth-scroll",
        ctors: Constructors::Register {
            register: register::MOUSE_BUTTON_FLAGS,
            ctor: template::register_smooth_scroll,
        },
    },
    Row {
        key: "side-scroll",
        ctors: Constructors::Register {
            register: register::MOUSE_BUTTON_FLAGS,
            ctor: template::register_side_scroll,
        },
    },
    Row {
        key: "hi-res-scroll",
        ctors: Constructors::Feature {
            id: feature::HI_RES_SCROLLING,
            ctor: template::hi_res_scroll,
        },
    },
    Row {
        key: "lowres-smooth-scroll",
        ctors: Constructors::Feature {
            id: feature::LOWRES_WHEEL,
            ctor: template::lowres_smooth_scroll,
        },
    },
    Row {
        key: "hires-smooth-invert",
        ctors: Constructors::Feature {
            id: feature::HIRES_WHEEL,
            ctor: template::hires_smooth_invert,
        },
    },
    Row {
        key: "hires-smooth-resolution",
        ctors: Constructors::Feature {
            id: feature::HIRES_WHEEL,
            ctor: template::hires_smooth_resolution,
        },
    },
    Row {
        key: "fn-swap",
        ctors: Constructors::Both {
            register: register::KEYBOARD_FN_SWAP,
            register_ctor: template::register_fn_swap,
            id: feature::FN_INVERSION,
            ctor: template::fn_swap,
        },
    },
    Row {
        key: "new-fn-swap",
        ctors: Constructors::Feature {
            id: feature::NEW_FN_INVERSION,
            ctor: template::new_fn_swap,
        },
    },
    Row {
        key: "k375s-fn-swap",
        ctors: Constructors::Feature {
            id: feature::K375S_FN_INVERSION,
            ctor: template::k375s_fn_swap,
        },
    },
    Row {
        key: "dpi",
        ctors: Constructors::Both {
            register: register::MOUSE_DPI,
            register_ctor: || template::register_dpi(Vec::new()),
            id: feature::ADJUSTABLE_DPI,
            ctor: template::adjustable_dpi,
        },
    },
    Row {
        key: "pointer_speed",
        ctors: Constructors::Feature {
            id: feature::POINTER_SPEED,
            ctor: template::pointer_speed,
        },
    },
    Row {
        key: "smart-shift",
        ctors: Constructors::Feature {
            id: feature::SMART_SHIFT,
            ctor: template::smart_shift,
        },
    },
    Row {
        key: "backlight",
        ctors: Constructors::Feature {
            id: feature::BACKLIGHT2,
            ctor: template::backlight,
        },
    },
    Row {
        key: "reprogrammable-keys",
        ctors: Constructors::Feature {
            id: feature::REPROG_CONTROLS_V4,
            ctor: template::reprogrammable_keys,
        },
    },
    Row {
        key: "disable-keyboard-keys",
        ctors: Constructors::Feature {
            id: feature::KEYBOARD_DISABLE_KEYS,
            ctor: template::disable_keyboard_keys,
        },
    },
    Row {
        key: "multiplatform",
        ctors: Constructors::Feature {
            id: feature::MULTIPLATFORM,
            ctor: template::multiplatform,
        },
    },
    Row {
        key: "dualplatform",
        ctors: Constructors::Feature {
            id: feature::DUALPLATFORM,
            ctor: template::dualplatform,
        },
    },
    Row {
        key: "change-host",
        ctors: Constructors::Feature {
            id: feature::CHANGE_HOST,
            ctor: template::change_host,
        },
    },
    Row {
        key: "thumb-scroll-mode",
        ctors: Constructors::Feature {
            id: feature::THUMB_WHEEL,
            ctor: template::thumb_mode,
        },
    },
    Row {
        key: "thumb-scroll-invert",
        ctors: Constructors::Feature {
            id: feature::THUMB_WHEEL,
            ctor: template::thumb_invert,
        },
    },
    Row {
        key: "gesture2-gestures",
        ctors: Constructors::Feature {
            id: feature::GESTURE_2,
            ctor: template::gestures,
        },
    },
    Row {
        key: "gesture2-params",
        ctors: Constructors::Feature {
            id: feature::GESTURE_2,
            ctor: template::gesture_params,
        },
    },
];

lazy_static! {
    static ref BY_KEY: HashMap<&'static str, &'static Row> =
        CATALOG.iter().map(|row| (row.key, row)).collect();
}

/// Looks up a catalog row by its stable key.
pub fn lookup(key: &str) -> Option<&'static Row> {
    BY_KEY.get(key).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_unique() {
        assert_eq!(BY_KEY.len(), CATALOG.len());
    }

    #[test]
    fn lookup_finds_every_row() {
        for row in CATALOG {
            let found = lookup(row.key).unwrap();
            assert_eq!(found.key, row.key);
        }
        assert!(lookup("no-such-setting").is_none());
    }

    #[test]
    fn rows_build_settings_with_matching_keys() {
        for row in CATALOG {
            if let Some((_, ctor)) = row.ctors.register() {
                assert_eq!(ctor().key(), row.key);
            }
        }
    }
}
