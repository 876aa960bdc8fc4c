//! Capability negotiation: turning an abstract device into its list of
//! usable settings.
//!
//! The engine walks the catalog once per connection. A probe that fails
//! only costs its own setting; the rest of the catalog still gets its
//! chance. Results are appended to the per-device list in catalog order,
//! so re-running after a partial failure fills the gaps without
//! reshuffling or duplicating anything.

use tracing::{debug, error};

use crate::{
    catalog::{self, CATALOG},
    device::{DeviceAccess, ProtocolVersion},
    setting::{ActiveSettings, Setting},
};

/// Probes the device for every feature-backed setting in the catalog and
/// appends the usable ones to `active`.
///
/// Returns whether probing actually ran. Offline devices cannot be
/// queried, and devices known to speak only the register protocol have no
/// features to enumerate; both cases leave `active` untouched. A device
/// whose protocol version is not known yet is still probed, since feature
/// queries on it are harmless.
pub async fn negotiate(dev: &dyn DeviceAccess, active: &mut ActiveSettings) -> bool {
    if !dev.is_online() {
        debug!("device offline, not negotiating");
        return false;
    }

    if let Some(ProtocolVersion::V10) = dev.protocol_version() {
        debug!("register-only device, no features to negotiate");
        return false;
    }

    for row in CATALOG {
        let Some((id, ctor)) = row.ctors.feature() else {
            continue;
        };

        if active.contains_key(row.key) || !dev.has_feature(id) {
            continue;
        }

        match ctor(dev).await {
            Ok(Some(setting)) => {
                debug!(key = row.key, "negotiated setting");
                active.push(setting);
            },
            Ok(None) => {
                debug!(key = row.key, "feature present but not usable");
            },
            Err(err) => {
                // One broken capability must not cost the device its
                // remaining settings.
                error!(key = row.key, feature = id, %err, "probing failed");
            },
        }
    }

    true
}

/// Instantiates a single setting by its catalog key, probing the device
/// where needed.
///
/// Feature-backed implementations take precedence on devices that
/// advertise the feature; otherwise the register implementation is used
/// when the device has the register. Probe failures surface as `None`,
/// logged the same way full negotiation logs them.
pub async fn negotiate_one(dev: &dyn DeviceAccess, key: &str) -> Option<Setting> {
    let row = catalog::lookup(key)?;

    let feature_capable =
        dev.is_online() && !matches!(dev.protocol_version(), Some(ProtocolVersion::V10));

    if feature_capable {
        if let Some((id, ctor)) = row.ctors.feature() {
            if dev.has_feature(id) {
                return match ctor(dev).await {
                    Ok(found) => found,
                    Err(err) => {
                        error!(key, feature = id, %err, "probing failed");
                        None
                    },
                };
            }
        }
    }

    let (register, ctor) = row.ctors.register()?;
    dev.has_register(register).then(ctor)
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;

    use super::*;
    use crate::{device::ProtocolVersion, ids::feature, ids::register, testutil::FakeDevice};

    fn page16(head: &[u8]) -> Vec<u8> {
        let mut data = head.to_vec();
        while data.len() < 16 {
            data.push(0);
        }
        data
    }

    #[test]
    fn negotiation_selects_the_advertised_subset_in_order() {
        let dev = FakeDevice::new()
            .with_feature(feature::HI_RES_SCROLLING)
            .with_feature(feature::SMART_SHIFT)
            .with_feature(feature::POINTER_SPEED);

        let mut active = ActiveSettings::new();
        assert!(block_on(negotiate(&dev, &mut active)));

        let keys: Vec<&str> = active.iter().map(|s| s.key()).collect();
        // Catalog order, not feature-ID order.
        assert_eq!(keys, vec!["hi-res-scroll", "pointer_speed", "smart-shift"]);
    }

    #[test]
    fn offline_devices_are_not_probed() {
        let dev = FakeDevice::new().with_feature(feature::SMART_SHIFT).offline();

        let mut active = ActiveSettings::new();
        assert!(!block_on(negotiate(&dev, &mut active)));
        assert!(active.is_empty());
        assert!(dev.requests().is_empty());
    }

    #[test]
    fn register_only_devices_are_not_probed() {
        let dev = FakeDevice::new()
            .with_feature(feature::SMART_SHIFT)
            .with_protocol(Some(ProtocolVersion::V10));

        let mut active = ActiveSettings::new();
        assert!(!block_on(negotiate(&dev, &mut active)));
        assert!(active.is_empty());
    }

    #[test]
    fn unknown_protocol_versions_are_still_probed() {
        let dev = FakeDevice::new().with_feature(feature::SMART_SHIFT).with_protocol(None);

        let mut active = ActiveSettings::new();
        assert!(block_on(negotiate(&dev, &mut active)));
        assert_eq!(active.len(), 1);
    }

    #[test]
    fn one_failing_probe_does_not_cost_the_rest() {
        // The DPI probe needs a reply and gets none; smart-shift still
        // negotiates.
        let dev = FakeDevice::new()
            .with_feature(feature::ADJUSTABLE_DPI)
            .with_feature(feature::SMART_SHIFT);

        let mut active = ActiveSettings::new();
        assert!(block_on(negotiate(&dev, &mut active)));

        let keys: Vec<&str> = active.iter().map(|s| s.key()).collect();
        assert_eq!(keys, vec!["smart-shift"]);
    }

    #[test]
    fn renegotiation_is_idempotent() {
        let dev = FakeDevice::new()
            .with_feature(feature::HI_RES_SCROLLING)
            .with_feature(feature::SMART_SHIFT);

        let mut active = ActiveSettings::new();
        assert!(block_on(negotiate(&dev, &mut active)));
        assert_eq!(active.len(), 2);

        assert!(block_on(negotiate(&dev, &mut active)));
        assert_eq!(active.len(), 2);
    }

    #[test]
    fn renegotiation_fills_gaps_left_by_failures() {
        let dev = FakeDevice::new()
            .with_feature(feature::ADJUSTABLE_DPI)
            .with_feature(feature::SMART_SHIFT);

        let mut active = ActiveSettings::new();
        block_on(negotiate(&dev, &mut active));
        assert_eq!(active.len(), 1);

        // The device starts answering the DPI list query.
        let dev = dev.with_reply(
            feature::ADJUSTABLE_DPI,
            1,
            vec![],
            page16(&[0x00, 0x03, 0x20, 0x06, 0x40]),
        );

        block_on(negotiate(&dev, &mut active));
        let keys: Vec<&str> = active.iter().map(|s| s.key()).collect();
        assert_eq!(keys, vec!["smart-shift", "dpi"]);
    }

    #[test]
    fn negotiate_one_prefers_the_feature_implementation() {
        let dev = FakeDevice::new()
            .with_feature(feature::FN_INVERSION)
            .with_register(register::KEYBOARD_FN_SWAP);

        let setting = block_on(negotiate_one(&dev, "fn-swap")).unwrap();
        assert_eq!(setting.key(), "fn-swap");
    }

    #[test]
    fn negotiate_one_falls_back_to_registers() {
        let dev = FakeDevice::new().with_register(register::KEYBOARD_FN_SWAP);
        assert!(block_on(negotiate_one(&dev, "fn-swap")).is_some());

        let bare = FakeDevice::new();
        assert!(block_on(negotiate_one(&bare, "fn-swap")).is_none());
        assert!(block_on(negotiate_one(&bare, "no-such-setting")).is_none());
    }
}
