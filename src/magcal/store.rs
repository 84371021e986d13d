//! Calibration persistence
//!
//! The magnetometer calibration survives power cycles as a small blob:
//! magic, format version, six little-endian `f32` coefficients and a
//! CRC32. Where the blob lives (EEPROM, flash page, file) is the host's
//! business; the engine only sees the [`CalibrationStore`] capability.

use crate::math::Vec3;
use crc::{Crc, CRC_32_ISO_HDLC};

/// Blob magic ("MCAL")
const MAGIC: [u8; 4] = *b"MCAL";

/// Blob format version
const VERSION: u8 = 1;

/// Total blob size: magic + version + padding + 6 f32 + CRC32
pub const BLOB_LEN: usize = 4 + 1 + 3 + 24 + 4;

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// Calibration persistence failures.
///
/// `load` reporting zero bytes is not an error (fresh unit); everything
/// here is fatal at boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// Underlying storage I/O failed
    Io,
    /// Blob shorter than the fixed layout
    Truncated,
    /// Magic bytes do not match
    BadMagic,
    /// Unknown format version
    BadVersion,
    /// CRC32 mismatch
    BadChecksum,
}

impl StoreError {
    /// Variant name as a static string (usable with defmt on embedded)
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreError::Io => "Io",
            StoreError::Truncated => "Truncated",
            StoreError::BadMagic => "BadMagic",
            StoreError::BadVersion => "BadVersion",
            StoreError::BadChecksum => "BadChecksum",
        }
    }
}

/// Blob load/store capability injected into the AHRS.
pub trait CalibrationStore {
    /// Read the stored blob into `buf`, returning the byte count.
    /// `Ok(0)` means nothing has ever been stored.
    fn load(&mut self, buf: &mut [u8]) -> Result<usize, StoreError>;

    /// Persist a blob, replacing any previous one.
    fn save(&mut self, blob: &[u8]) -> Result<(), StoreError>;
}

/// Serialize bias and scale triples.
pub fn encode_calibration(bias: Vec3, scale: Vec3) -> [u8; BLOB_LEN] {
    let mut blob = [0u8; BLOB_LEN];
    blob[0..4].copy_from_slice(&MAGIC);
    blob[4] = VERSION;
    let mut offset = 8;
    for value in [bias.x, bias.y, bias.z, scale.x, scale.y, scale.z] {
        blob[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
        offset += 4;
    }
    let crc = CRC32.checksum(&blob[..offset]);
    blob[offset..offset + 4].copy_from_slice(&crc.to_le_bytes());
    blob
}

/// Deserialize and verify a blob, returning (bias, scale).
pub fn decode_calibration(blob: &[u8]) -> Result<(Vec3, Vec3), StoreError> {
    if blob.len() < BLOB_LEN {
        return Err(StoreError::Truncated);
    }
    if blob[0..4] != MAGIC {
        return Err(StoreError::BadMagic);
    }
    if blob[4] != VERSION {
        return Err(StoreError::BadVersion);
    }
    let payload_len = BLOB_LEN - 4;
    let stored_crc = u32::from_le_bytes([
        blob[payload_len],
        blob[payload_len + 1],
        blob[payload_len + 2],
        blob[payload_len + 3],
    ]);
    if CRC32.checksum(&blob[..payload_len]) != stored_crc {
        return Err(StoreError::BadChecksum);
    }

    let mut values = [0.0f32; 6];
    for (i, value) in values.iter_mut().enumerate() {
        let at = 8 + 4 * i;
        *value = f32::from_le_bytes([blob[at], blob[at + 1], blob[at + 2], blob[at + 3]]);
    }
    Ok((
        Vec3::new(values[0], values[1], values[2]),
        Vec3::new(values[3], values[4], values[5]),
    ))
}

/// In-memory store for tests and simulation.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: heapless::Vec<u8, BLOB_LEN>,
    fail_io: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every access fails, for boot-error testing.
    pub fn failing() -> Self {
        Self {
            data: heapless::Vec::new(),
            fail_io: true,
        }
    }

    /// Pre-load a blob, as if written in a previous session.
    pub fn with_blob(blob: &[u8]) -> Self {
        let mut store = Self::new();
        store.data.extend_from_slice(blob).unwrap();
        store
    }

    /// Flip bits in the stored blob to simulate corruption.
    pub fn corrupt(&mut self) {
        if let Some(byte) = self.data.get_mut(10) {
            *byte ^= 0xFF;
        }
    }

    pub fn contents(&self) -> &[u8] {
        &self.data
    }
}

impl CalibrationStore for MemoryStore {
    fn load(&mut self, buf: &mut [u8]) -> Result<usize, StoreError> {
        if self.fail_io {
            return Err(StoreError::Io);
        }
        let len = self.data.len().min(buf.len());
        buf[..len].copy_from_slice(&self.data[..len]);
        Ok(len)
    }

    fn save(&mut self, blob: &[u8]) -> Result<(), StoreError> {
        if self.fail_io {
            return Err(StoreError::Io);
        }
        self.data.clear();
        self.data
            .extend_from_slice(blob)
            .map_err(|_| StoreError::Io)?;
        Ok(())
    }
}
