//! The protocol identifiers addressed by the settings catalog.
//!
//! These are the feature IDs and legacy register numbers the catalog rows
//! bind to. The full enumeration tables live with the transport; only the
//! identifiers actually used by a setting are mirrored here.

/// HID++2.0 feature IDs.
pub mod feature {
    pub const SMART_SHIFT: u16 = 0x2110;
    pub const HI_RES_SCROLLING: u16 = 0x2120;
    pub const HIRES_WHEEL: u16 = 0x2121;
    pub const LOWRES_WHEEL: u16 = 0x2130;
    pub const THUMB_WHEEL: u16 = 0x2150;
    pub const ADJUSTABLE_DPI: u16 = 0x2201;
    pub const POINTER_SPEED: u16 = 0x2205;

    pub const FN_INVERSION: u16 = 0x40a0;
    pub const NEW_FN_INVERSION: u16 = 0x40a2;
    pub const K375S_FN_INVERSION: u16 = 0x40a3;

    pub const BACKLIGHT2: u16 = 0x1982;
    pub const CHANGE_HOST: u16 = 0x1814;
    pub const REPROG_CONTROLS_V4: u16 = 0x1b04;

    pub const KEYBOARD_DISABLE_KEYS: u16 = 0x4521;
    pub const DUALPLATFORM: u16 = 0x4530;
    pub const MULTIPLATFORM: u16 = 0x4531;

    pub const GESTURE_2: u16 = 0x6501;
}

/// HID++1.0 register numbers.
///
/// Register `0x01` doubles as the hand-detection register on keyboards and
/// the button-flags register on mice; which meaning applies is decided by
/// the device kind a setting is gated to.
pub mod register {
    pub const KEYBOARD_HAND_DETECTION: u8 = 0x01;
    pub const MOUSE_BUTTON_FLAGS: u8 = 0x01;
    pub const KEYBOARD_FN_SWAP: u8 = 0x09;
    pub const MOUSE_DPI: u8 = 0x63;
}
