//! Record codec
//!
//! Encodes entries into the segment record format and decodes them back,
//! validating bounds and checksum along the way.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{EmberError, Result};

use super::{Entry, Flag, Meta};

/// CRC32 prefix size
pub const CRC_SIZE: usize = 4;

/// Header size: Timestamp (8) + TTL (4) + Flag (2) + 3 lengths (12) = 26 bytes
pub const HEADER_SIZE: usize = 26;

/// Fixed bytes every record carries before its payload
pub const RECORD_OVERHEAD: usize = CRC_SIZE + HEADER_SIZE;

/// Fixed-width header, serialized with bincode's default fixint encoding
#[derive(Debug, Serialize, Deserialize)]
struct RecordHeader {
    timestamp: u64,
    ttl: u32,
    flag: u16,
    bucket_len: u32,
    key_len: u32,
    value_len: u32,
}

impl RecordHeader {
    fn payload_len(&self) -> usize {
        self.bucket_len as usize + self.key_len as usize + self.value_len as usize
    }
}

/// Size of `entry` once encoded
pub fn encoded_len(entry: &Entry) -> usize {
    RECORD_OVERHEAD + entry.bucket.len() + entry.key.len() + entry.value.len()
}

/// Encode an entry: [crc][header][bucket][key][value]
pub fn encode_record(entry: &Entry) -> Result<Vec<u8>> {
    let header = RecordHeader {
        timestamp: entry.meta.timestamp,
        ttl: entry.meta.ttl,
        flag: entry.meta.flag.to_u16(),
        bucket_len: len_u32(entry.bucket.len(), "bucket")?,
        key_len: len_u32(entry.key.len(), "key")?,
        value_len: len_u32(entry.value.len(), "value")?,
    };
    let header_bytes = bincode::serialize(&header)?;
    debug_assert_eq!(header_bytes.len(), HEADER_SIZE);

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&header_bytes);
    hasher.update(entry.bucket.as_bytes());
    hasher.update(&entry.key);
    hasher.update(&entry.value);
    let crc = hasher.finalize();

    let mut buf = Vec::with_capacity(encoded_len(entry));
    buf.extend_from_slice(&crc.to_le_bytes());
    buf.extend_from_slice(&header_bytes);
    buf.extend_from_slice(entry.bucket.as_bytes());
    buf.extend_from_slice(&entry.key);
    buf.extend_from_slice(&entry.value);
    Ok(buf)
}

/// Decode the record starting at `offset` within `data`
///
/// `file_id` only feeds error context. Returns the entry and the number of
/// bytes the record occupies.
pub fn decode_record(data: &[u8], file_id: u64, offset: u64) -> Result<(Entry, usize)> {
    let decode_err = |reason: String| EmberError::Decode {
        file_id,
        offset,
        key: None,
        reason,
    };

    let start = usize::try_from(offset)
        .map_err(|_| decode_err("offset does not fit in memory".to_string()))?;
    if start >= data.len() {
        return Err(decode_err(format!(
            "offset out of range (segment holds {} bytes)",
            data.len()
        )));
    }

    let rest = &data[start..];
    if rest.len() < RECORD_OVERHEAD {
        return Err(decode_err(format!(
            "truncated header: {} of {} bytes",
            rest.len(),
            RECORD_OVERHEAD
        )));
    }

    let mut crc_bytes = [0u8; CRC_SIZE];
    crc_bytes.copy_from_slice(&rest[..CRC_SIZE]);
    let stored_crc = u32::from_le_bytes(crc_bytes);

    let header_bytes = &rest[CRC_SIZE..RECORD_OVERHEAD];
    let header: RecordHeader = bincode::deserialize(header_bytes)
        .map_err(|e| decode_err(format!("corrupt header: {}", e)))?;

    let total = RECORD_OVERHEAD + header.payload_len();
    if rest.len() < total {
        return Err(decode_err(format!(
            "truncated payload: record needs {} bytes, {} available",
            total,
            rest.len()
        )));
    }

    let payload = &rest[RECORD_OVERHEAD..total];
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(header_bytes);
    hasher.update(payload);
    let computed_crc = hasher.finalize();
    if computed_crc != stored_crc {
        return Err(decode_err(format!(
            "CRC mismatch: stored {:#010x}, computed {:#010x}",
            stored_crc, computed_crc
        )));
    }

    let flag = Flag::from_u16(header.flag)
        .ok_or_else(|| decode_err(format!("unknown flag {}", header.flag)))?;

    let bucket_end = header.bucket_len as usize;
    let key_end = bucket_end + header.key_len as usize;

    let bucket = std::str::from_utf8(&payload[..bucket_end])
        .map_err(|_| decode_err("bucket name is not UTF-8".to_string()))?
        .to_string();

    let entry = Entry {
        bucket,
        key: Bytes::copy_from_slice(&payload[bucket_end..key_end]),
        value: Bytes::copy_from_slice(&payload[key_end..]),
        meta: Meta::new(flag, header.timestamp, header.ttl),
    };

    Ok((entry, total))
}

fn len_u32(len: usize, what: &str) -> Result<u32> {
    u32::try_from(len)
        .map_err(|_| EmberError::Serialization(format!("{} length {} exceeds u32", what, len)))
}
