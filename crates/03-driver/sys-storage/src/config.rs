use crate::error::{StorageError, StorageResult};

/// Magic identifier reported for a factory-default config.
pub const DEFAULT_MAGIC: u32 = 0x1234_5678;

/// Small fixed-width system configuration record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SysConfig {
    /// Identifies a valid record.
    pub magic_id: u32,
    /// Layout version.
    pub config_ver: u16,
    /// Free-form flag byte.
    pub flag: u8,
}

impl SysConfig {
    /// Size of the encoded record: 4 + 2 + 1 little-endian bytes, unpadded.
    pub const ENCODED_LEN: usize = 7;

    /// Encodes the record.
    pub fn to_bytes(&self) -> [u8; Self::ENCODED_LEN] {
        let mut out = [0u8; Self::ENCODED_LEN];
        out[0..4].copy_from_slice(&self.magic_id.to_le_bytes());
        out[4..6].copy_from_slice(&self.config_ver.to_le_bytes());
        out[6] = self.flag;
        out
    }

    /// Decodes a record, rejecting blobs of any other length.
    pub fn from_bytes(bytes: &[u8]) -> StorageResult<Self> {
        let bytes: &[u8; Self::ENCODED_LEN] =
            bytes.try_into().map_err(|_| StorageError::Corrupt {
                expected: Self::ENCODED_LEN,
                found: bytes.len(),
            })?;
        Ok(Self {
            magic_id: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            config_ver: u16::from_le_bytes([bytes[4], bytes[5]]),
            flag: bytes[6],
        })
    }
}

impl Default for SysConfig {
    fn default() -> Self {
        Self {
            magic_id: DEFAULT_MAGIC,
            config_ver: 0,
            flag: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_little_endian_without_padding() {
        let config = SysConfig {
            magic_id: 0xAABB_CCDD,
            config_ver: 1,
            flag: 0xFF,
        };
        assert_eq!(
            config.to_bytes(),
            [0xDD, 0xCC, 0xBB, 0xAA, 0x01, 0x00, 0xFF]
        );
        assert_eq!(SysConfig::from_bytes(&config.to_bytes()).ok(), Some(config));
    }

    #[test]
    fn wrong_length_is_corrupt() {
        for len in [0usize, 6, 8, 12] {
            let blob = vec![0u8; len];
            match SysConfig::from_bytes(&blob) {
                Err(StorageError::Corrupt { expected, found }) => {
                    assert_eq!((expected, found), (7, len));
                }
                other => panic!("expected corrupt for {len} bytes, got {other:?}"),
            }
        }
    }
}
