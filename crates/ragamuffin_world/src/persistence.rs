//! # Save Format
//!
//! The generated town is a pure function of the seed, so a save only needs
//! what the player changed: every edited block and every smashed prop.
//!
//! ```text
//! "RGMF"          magic
//! u16 LE          format version
//! u64 LE          world seed
//! LZ4 (size-prepended) body:
//!   u32 LE        modification count
//!   16 bytes each x:i32 y:i32 z:i32 id:u16 meta:u16
//!   u32 LE        destroyed prop count
//!   8 bytes each  prop id
//! ```

use lz4_flex::{compress_prepend_size, decompress_size_prepended};

use crate::block::Block;
use crate::chunk::BlockPos;
use crate::error::{WorldError, WorldResult};
use crate::noise::WorldSeed;
use crate::props::PropId;

/// File magic.
pub const SAVE_MAGIC: [u8; 4] = *b"RGMF";

/// Current format version.
pub const SAVE_VERSION: u16 = 1;

const HEADER_LEN: usize = 4 + 2 + 8;

/// Largest body a save may claim: four million edits and as many props.
const MAX_BODY_LEN: usize = 8 + (4 << 20) * (BlockModifyPayload::SIZE + 8);

/// LZ4 never packs more than this many output bytes into one input byte.
const MAX_LZ4_RATIO: usize = 255;

/// One recorded block edit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockModifyPayload {
    /// Where.
    pub pos: BlockPos,
    /// What is there now.
    pub block: Block,
}

impl BlockModifyPayload {
    /// Encoded size in bytes.
    pub const SIZE: usize = 16;

    /// Appends the little-endian encoding to `buf`.
    pub fn serialize(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.pos.x.to_le_bytes());
        buf.extend_from_slice(&self.pos.y.to_le_bytes());
        buf.extend_from_slice(&self.pos.z.to_le_bytes());
        buf.extend_from_slice(&self.block.id.to_le_bytes());
        buf.extend_from_slice(&self.block.meta.to_le_bytes());
    }

    /// Decodes one record.
    #[must_use]
    pub fn deserialize(data: &[u8]) -> Option<Self> {
        if data.len() < Self::SIZE {
            return None;
        }
        let i32_at = |o: usize| i32::from_le_bytes([data[o], data[o + 1], data[o + 2], data[o + 3]]);
        Some(Self {
            pos: BlockPos::new(i32_at(0), i32_at(4), i32_at(8)),
            block: Block {
                id: u16::from_le_bytes([data[12], data[13]]),
                meta: u16::from_le_bytes([data[14], data[15]]),
            },
        })
    }
}

/// Everything a save file holds beyond the seed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SaveData {
    /// Block edits in position order.
    pub modifications: Vec<BlockModifyPayload>,
    /// Props the player has destroyed.
    pub destroyed_props: Vec<PropId>,
}

/// Encodes a save for `seed`.
#[must_use]
pub fn encode(seed: WorldSeed, data: &SaveData) -> Vec<u8> {
    let mut body = Vec::with_capacity(
        8 + data.modifications.len() * BlockModifyPayload::SIZE + data.destroyed_props.len() * 8,
    );
    body.extend_from_slice(&(data.modifications.len() as u32).to_le_bytes());
    for entry in &data.modifications {
        entry.serialize(&mut body);
    }
    body.extend_from_slice(&(data.destroyed_props.len() as u32).to_le_bytes());
    for id in &data.destroyed_props {
        body.extend_from_slice(&id.to_le_bytes());
    }

    let mut out = Vec::with_capacity(HEADER_LEN + body.len() / 2);
    out.extend_from_slice(&SAVE_MAGIC);
    out.extend_from_slice(&SAVE_VERSION.to_le_bytes());
    out.extend_from_slice(&seed.value().to_le_bytes());
    out.extend_from_slice(&compress_prepend_size(&body));
    out
}

/// Decodes a save and checks it belongs to `seed`.
///
/// # Errors
///
/// [`WorldError::CorruptSave`] for bad magic, an unknown version, truncated
/// data or a body size no real save could have; [`WorldError::SeedMismatch`] if the file was written for another world.
pub fn decode(seed: WorldSeed, bytes: &[u8]) -> WorldResult<SaveData> {
    if bytes.len() < HEADER_LEN || bytes[..4] != SAVE_MAGIC {
        return Err(WorldError::CorruptSave("not a ragamuffin save".into()));
    }
    let version = u16::from_le_bytes([bytes[4], bytes[5]]);
    if version != SAVE_VERSION {
        return Err(WorldError::CorruptSave(format!("unsupported version {version}")));
    }
    let mut seed_bytes = [0u8; 8];
    seed_bytes.copy_from_slice(&bytes[6..14]);
    let found = u64::from_le_bytes(seed_bytes);
    if found != seed.value() {
        return Err(WorldError::SeedMismatch { expected: seed.value(), found });
    }

    let packed = &bytes[HEADER_LEN..];
    let claimed = packed
        .get(..4)
        .map(|p| u32::from_le_bytes([p[0], p[1], p[2], p[3]]) as usize)
        .ok_or_else(|| WorldError::CorruptSave("missing body".into()))?;
    if claimed > MAX_BODY_LEN || claimed > (packed.len() - 4).saturating_mul(MAX_LZ4_RATIO) {
        return Err(WorldError::CorruptSave(format!("implausible body size {claimed}")));
    }
    let body = decompress_size_prepended(packed).map_err(|e| WorldError::CorruptSave(e.to_string()))?;
    let mut reader = Reader { data: &body, at: 0 };

    let count = reader.u32()? as usize;
    let mut modifications = Vec::with_capacity(count.min(1 << 20));
    for _ in 0..count {
        let raw = reader.take(BlockModifyPayload::SIZE)?;
        modifications.extend(BlockModifyPayload::deserialize(raw));
    }

    let count = reader.u32()? as usize;
    let mut destroyed_props = Vec::with_capacity(count.min(1 << 20));
    for _ in 0..count {
        let mut id = [0u8; 8];
        id.copy_from_slice(reader.take(8)?);
        destroyed_props.push(u64::from_le_bytes(id));
    }

    Ok(SaveData { modifications, destroyed_props })
}

struct Reader<'a> {
    data: &'a [u8],
    at: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> WorldResult<&'a [u8]> {
        let end = self.at + n;
        let slice = self
            .data
            .get(self.at..end)
            .ok_or_else(|| WorldError::CorruptSave("truncated body".into()))?;
        self.at = end;
        Ok(slice)
    }

    fn u32(&mut self) -> WorldResult<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }
}
