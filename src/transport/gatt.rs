//! GATT identifiers of BerryMed oximeters.
//!
//! The data service exposes a "receive" characteristic whose notifications
//! carry the raw packet stream.

use uuid::Uuid;

/// Advertised device name.
pub const DEVICE_NAME: &str = "BerryMed";

/// Service carrying the packet stream.
pub const DATA_SERVICE_UUID: Uuid = Uuid::from_u128(0x49535343_fe7d_4ae5_8fa9_9fafd205e455);

/// Characteristic that notifies packet bytes.
pub const RECEIVE_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0x49535343_1e4d_4bd9_ba61_23c647249616);

/// Characteristic used to rename the device.
pub const RENAME_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0x00005343_0000_1000_8000_00805f9b34fb);

/// Whether an advertised name belongs to a supported device.
pub fn is_supported_device(name: &str) -> bool {
    name.starts_with(DEVICE_NAME)
}
