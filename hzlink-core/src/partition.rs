//! Partition hashing and key routing.
//!
//! Every keyed operation is sent to the partition that owns its key. The owner
//! is found by hashing the serialized key with 32-bit Murmur3 (x86 variant,
//! seed [`PARTITION_HASH_SEED`]) and reducing the hash modulo the partition
//! count the member reported.
//!
//! The [`PartitionAware`] trait lets a key supply the bytes that are hashed,
//! so related entries can be co-located on one partition.

use crate::error::{HzError, Result};

pub use crate::protocol::PARTITION_HASH_SEED;

const C1: u32 = 0xcc9e_2d51;
const C2: u32 = 0x1b87_3593;

/// Computes the 32-bit Murmur3 hash (x86 variant) of `key`.
///
/// Blocks are read little-endian. An empty key hashes to `0` regardless of
/// the seed.
pub fn murmur_hash3_x86_32(key: &[u8], seed: i32) -> i32 {
    if key.is_empty() {
        return 0;
    }

    let mut h1 = seed as u32;
    let mut blocks = key.chunks_exact(4);

    for block in &mut blocks {
        let k1 = u32::from_le_bytes([block[0], block[1], block[2], block[3]]);
        h1 ^= mix_k1(k1);
        h1 = h1.rotate_left(13);
        h1 = h1.wrapping_mul(5).wrapping_add(0xe654_6b64);
    }

    let tail = blocks.remainder();
    if !tail.is_empty() {
        let mut k1 = 0u32;
        for (i, byte) in tail.iter().enumerate() {
            k1 ^= u32::from(*byte) << (8 * i);
        }
        h1 ^= mix_k1(k1);
    }

    h1 ^= key.len() as u32;
    fmix32(h1) as i32
}

fn mix_k1(k1: u32) -> u32 {
    k1.wrapping_mul(C1).rotate_left(15).wrapping_mul(C2)
}

fn fmix32(mut h: u32) -> u32 {
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;
    h
}

/// Hashes a serialized key with the partition seed.
pub fn partition_hash(key: &[u8]) -> i32 {
    murmur_hash3_x86_32(key, PARTITION_HASH_SEED)
}

/// Maps a serialized key to a partition in `0..partition_count`.
///
/// Fails with [`HzError::PartitionCountUnknown`] when no partition table has
/// been received yet (`partition_count <= 0`).
pub fn partition_id(key: &[u8], partition_count: i32) -> Result<i32> {
    if partition_count <= 0 {
        return Err(HzError::PartitionCountUnknown(format!(
            "cannot route a key with partition count {partition_count}"
        )));
    }
    let hash = partition_hash(key);
    if hash == i32::MIN {
        return Ok(0);
    }
    Ok(hash.abs() % partition_count)
}

/// Builds the serialized key used to route operations on a named object.
///
/// The layout is a big-endian 32-bit length followed by the UTF-8 bytes of
/// the name, which is how the member serializes a string key.
pub fn partition_key_for_name(name: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(4 + name.len());
    key.extend_from_slice(&(name.len() as u32).to_be_bytes());
    key.extend_from_slice(name.as_bytes());
    key
}

/// Trait for keys that supply their own partition key bytes.
///
/// When a key implements this trait the partition is computed from
/// [`partition_key_bytes`](PartitionAware::partition_key_bytes) instead of
/// from the key's own serialized form.
pub trait PartitionAware: Send + Sync {
    /// Returns the bytes whose hash selects the partition.
    fn partition_key_bytes(&self) -> Vec<u8>;

    /// Returns the partition that owns this key.
    fn partition_id(&self, partition_count: i32) -> Result<i32> {
        partition_id(&self.partition_key_bytes(), partition_count)
    }
}

impl PartitionAware for [u8] {
    fn partition_key_bytes(&self) -> Vec<u8> {
        self.to_vec()
    }
}

impl PartitionAware for Vec<u8> {
    fn partition_key_bytes(&self) -> Vec<u8> {
        self.clone()
    }
}
