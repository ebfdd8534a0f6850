//! Persistent device configuration
//!
//! The radio pairing parameters written by the host over the transport and
//! kept in non-volatile storage as one fixed-size record.

use crate::types::Error;

/// Errors of the non-volatile record store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StoreError {
    /// Nothing has been saved yet
    NotFound,
    /// Backend error code
    Io(i32),
}

/// Byte-array record storage
pub trait ConfigStore {
    /// Read the record into `buf`, returning the number of bytes read
    fn load(&mut self, buf: &mut [u8]) -> Result<usize, StoreError>;

    fn save(&mut self, data: &[u8]) -> Result<(), StoreError>;
}

/// Individually readable/writable parts of [`DeviceConfig`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigField {
    SecretKey,
    PairingAddress,
    PacketValidationId,
    SystemAddress,
    HostId,
}

impl ConfigField {
    pub const ALL: [ConfigField; 5] = [
        ConfigField::SecretKey,
        ConfigField::PairingAddress,
        ConfigField::PacketValidationId,
        ConfigField::SystemAddress,
        ConfigField::HostId,
    ];

    pub const fn len(self) -> usize {
        match self {
            ConfigField::SecretKey => 16,
            ConfigField::PairingAddress => 5,
            ConfigField::PacketValidationId => 3,
            ConfigField::SystemAddress => 5,
            ConfigField::HostId => 5,
        }
    }

    /// Position of the field in the serialized record
    pub const fn offset(self) -> usize {
        match self {
            ConfigField::SecretKey => 0,
            ConfigField::PairingAddress => 16,
            ConfigField::PacketValidationId => 21,
            ConfigField::SystemAddress => 24,
            ConfigField::HostId => 29,
        }
    }
}

/// Pairing parameters, serialized as the fields in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceConfig {
    pub secret_key: [u8; 16],
    pub pairing_address: [u8; 5],
    pub packet_validation_id: [u8; 3],
    pub system_address: [u8; 5],
    pub host_id: [u8; 5],
}

impl DeviceConfig {
    pub const SIZE: usize = 34;

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        for field in ConfigField::ALL {
            let start = field.offset();
            out[start..start + field.len()].copy_from_slice(self.field(field));
        }
        out
    }

    /// Decode a record; missing trailing bytes read as zero.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut padded = [0u8; Self::SIZE];
        let n = bytes.len().min(Self::SIZE);
        padded[..n].copy_from_slice(&bytes[..n]);

        let mut config = Self::default();
        for field in ConfigField::ALL {
            let start = field.offset();
            config
                .field_mut(field)
                .copy_from_slice(&padded[start..start + field.len()]);
        }
        config
    }

    pub fn field(&self, field: ConfigField) -> &[u8] {
        match field {
            ConfigField::SecretKey => &self.secret_key,
            ConfigField::PairingAddress => &self.pairing_address,
            ConfigField::PacketValidationId => &self.packet_validation_id,
            ConfigField::SystemAddress => &self.system_address,
            ConfigField::HostId => &self.host_id,
        }
    }

    fn field_mut(&mut self, field: ConfigField) -> &mut [u8] {
        match field {
            ConfigField::SecretKey => &mut self.secret_key,
            ConfigField::PairingAddress => &mut self.pairing_address,
            ConfigField::PacketValidationId => &mut self.packet_validation_id,
            ConfigField::SystemAddress => &mut self.system_address,
            ConfigField::HostId => &mut self.host_id,
        }
    }

    /// Replace a whole field. Partial writes (wrong length or a nonzero
    /// offset) are rejected and leave the config unchanged.
    pub fn write_field(&mut self, field: ConfigField, offset: usize, data: &[u8]) -> Result<(), Error> {
        if data.len() != field.len() {
            error!(
                "Config: invalid length for {:?}: {} != {}",
                field,
                data.len(),
                field.len()
            );
            return Err(Error::InvalidParameter);
        }
        if offset != 0 {
            error!("Config: invalid offset for {:?}: {}", field, offset);
            return Err(Error::InvalidParameter);
        }

        self.field_mut(field).copy_from_slice(data);
        Ok(())
    }
}

/// Load the stored config; a missing record yields the all-zero default.
pub fn load_config<S: ConfigStore>(store: &mut S) -> Result<DeviceConfig, StoreError> {
    let mut buf = [0u8; DeviceConfig::SIZE];
    match store.load(&mut buf) {
        Ok(n) => {
            info!("Config: loaded {} bytes", n);
            Ok(DeviceConfig::from_bytes(&buf[..n.min(DeviceConfig::SIZE)]))
        }
        Err(StoreError::NotFound) => {
            warn!("Config: nothing stored, using defaults");
            Ok(DeviceConfig::default())
        }
        Err(e) => {
            error!("Config: failed to load: {:?}", e);
            Err(e)
        }
    }
}

pub fn save_config<S: ConfigStore>(store: &mut S, config: &DeviceConfig) -> Result<(), StoreError> {
    store.save(&config.to_bytes()).map_err(|e| {
        error!("Config: failed to save: {:?}", e);
        e
    })
}
