//! A settings catalog and capability-negotiation engine for Logitech's
//! HID++ devices.
//!
//! Many of Logitech's more modern peripheral devices (mice, keyboards etc.)
//! expose configurable behaviors over the HID++ protocol: scroll wheels
//! dynamically switching between ratchet and freespin mode, swapping the
//! F-keys' special and standard functions, remapping buttons, disabling
//! specific keyboard keys, switching the active host and more. Which of
//! these a given unit actually supports can only be found out by asking
//! the device itself.
//!
//! This crate carries the knowledge of *what* can be asked and *how* the
//! answers translate into usable settings. It does not implement the
//! HID++ transport; bring your own by implementing
//! [`device::DeviceAccess`] on top of whatever HID plumbing you use. The
//! trait defines async methods using [`mod@async_trait`], which is
//! re-exported for annotating your implementing type.
//!
//! The [Solaar](https://github.com/pwr-Solaar/Solaar) project and
//! Logitech's published HID++ documentation were invaluable while mapping
//! out the per-feature byte layouts.
//!
//! # Overview
//!
//! The building blocks, bottom up:
//!
//! - [`codec`] translates between raw wire bytes and structured
//!   [`value::Value`]s, one codec per value shape.
//! - [`rw`] moves raw bytes for one setting across the wire, either
//!   through a legacy register or a feature's function pair.
//! - [`setting`] combines the two into a [`setting::Setting`] descriptor
//!   with uniform async `get`/`set` operations.
//! - [`template`] holds one constructor per known setting and [`catalog`]
//!   lists them all in presentation order.
//! - [`negotiate`] walks the catalog against a connected device and
//!   produces the device's [`setting::ActiveSettings`].
//!
//! # Negotiating a device's settings
//!
//! ```no_run
//! use hidpp_settings::{
//!     negotiate::negotiate,
//!     setting::ActiveSettings,
//!     value::Value,
//! };
//! # async fn demo(dev: &dyn hidpp_settings::device::DeviceAccess) {
//!
//! let mut active = ActiveSettings::new();
//! negotiate(dev, &mut active).await;
//!
//! for setting in &active {
//!     println!("{}: {}", setting.key(), setting.name());
//! }
//!
//! if let Some(ratchet) = active.get("smart-shift") {
//!     ratchet.set(dev, &Value::Int(30)).await.ok();
//! }
//! # }
//! ```
//!
//! Negotiation is deliberately forgiving: a device that answers one probe
//! with garbage still gets all the settings whose probes succeed. The
//! engine imposes no deadline of its own; wrap the returned future in your
//! executor's timeout if the transport cannot be trusted to fail promptly.

pub use async_trait::async_trait;

pub mod catalog;
pub mod codec;
pub mod device;
pub mod gesture;
pub mod ids;
pub mod negotiate;
pub mod rw;
pub mod setting;
pub mod template;
pub mod value;

#[cfg(test)]
mod testutil;

pub use crate::{
    device::{DeviceAccess, RequestError},
    negotiate::{negotiate, negotiate_one},
    setting::{ActiveSettings, Setting, SettingError},
    value::{Choice, Value},
};
