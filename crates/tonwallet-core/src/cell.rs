//! Cells and bag-of-cells serialization
//!
//! Every on-chain structure the wallet touches (contract state, messages) is a
//! tree of cells: up to 1023 data bits plus up to 4 child references. A cell is
//! identified by its representation hash.
//!
//! Only ordinary cells are supported; exotic cells (pruned branches, library
//! references, Merkle proofs) never appear in wallet messages.

use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

pub const MAX_BITS: usize = 1023;
pub const MAX_REFS: usize = 4;
pub const MAX_DEPTH: u16 = 1024;

const BOC_MAGIC: [u8; 4] = [0xb5, 0xee, 0x9c, 0x72];
const FLAG_HAS_IDX: u8 = 0x80;
const FLAG_HAS_CRC32C: u8 = 0x40;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CellError {
    #[error("Cell overflow: {0} bits exceeds 1023")]
    BitOverflow(usize),
    #[error("Cell overflow: more than 4 references")]
    RefOverflow,
    #[error("Cell tree deeper than 1024")]
    DepthOverflow,
    #[error("Value {value} does not fit in {bits} bits")]
    ValueTooLarge { value: u128, bits: usize },
    #[error("Invalid bag of cells: {0}")]
    InvalidBoc(String),
    #[error("Bag of cells checksum mismatch")]
    ChecksumMismatch,
}

/// An immutable ordinary cell
#[derive(Clone, PartialEq, Eq)]
pub struct Cell {
    data: Vec<u8>,
    bit_len: usize,
    refs: Vec<Arc<Cell>>,
    hash: [u8; 32],
    depth: u16,
}

impl Cell {
    pub fn new(mut data: Vec<u8>, bit_len: usize, refs: Vec<Arc<Cell>>) -> Result<Self, CellError> {
        if bit_len > MAX_BITS {
            return Err(CellError::BitOverflow(bit_len));
        }
        if refs.len() > MAX_REFS {
            return Err(CellError::RefOverflow);
        }
        let byte_len = bit_len.div_ceil(8);
        if data.len() < byte_len {
            return Err(CellError::InvalidBoc(format!(
                "{} bytes cannot hold {} bits",
                data.len(),
                bit_len
            )));
        }
        data.truncate(byte_len);
        if bit_len % 8 != 0 {
            // keep unused trailing bits zero so equal cells compare equal
            let keep = 0xffu8 << (8 - bit_len % 8);
            if let Some(last) = data.last_mut() {
                *last &= keep;
            }
        }

        let depth = refs.iter().map(|r| r.depth).max().map_or(0, |d| d + 1);
        if depth > MAX_DEPTH {
            return Err(CellError::DepthOverflow);
        }
        let mut cell = Self {
            data,
            bit_len,
            refs,
            hash: [0u8; 32],
            depth,
        };
        cell.hash = cell.compute_hash();
        Ok(cell)
    }

    pub fn empty() -> Self {
        // zero bits, zero refs: always valid
        let mut cell = Self {
            data: Vec::new(),
            bit_len: 0,
            refs: Vec::new(),
            hash: [0u8; 32],
            depth: 0,
        };
        cell.hash = cell.compute_hash();
        cell
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    pub fn refs(&self) -> &[Arc<Cell>] {
        &self.refs
    }

    /// Representation hash
    pub fn hash(&self) -> [u8; 32] {
        self.hash
    }

    pub fn depth(&self) -> u16 {
        self.depth
    }

    /// Read `bits` bits starting at `offset` as an unsigned integer
    pub fn read_uint(&self, offset: usize, bits: usize) -> Option<u128> {
        if bits > 128 || offset + bits > self.bit_len {
            return None;
        }
        let mut value = 0u128;
        for i in offset..offset + bits {
            value = (value << 1) | u128::from(bit_at(&self.data, i));
        }
        Some(value)
    }

    fn descriptors(&self) -> [u8; 2] {
        let d1 = self.refs.len() as u8;
        let d2 = (self.bit_len.div_ceil(8) + self.bit_len / 8) as u8;
        [d1, d2]
    }

    /// Data bytes with the completion tag appended when not byte-aligned
    fn padded_data(&self) -> Vec<u8> {
        let mut data = self.data.clone();
        if self.bit_len % 8 != 0 {
            if let Some(last) = data.last_mut() {
                *last |= 0x80 >> (self.bit_len % 8);
            }
        }
        data
    }

    fn compute_hash(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.descriptors());
        hasher.update(self.padded_data());
        for r in &self.refs {
            hasher.update(r.depth.to_be_bytes());
        }
        for r in &self.refs {
            hasher.update(r.hash);
        }
        hasher.finalize().into()
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cell")
            .field("bits", &self.bit_len)
            .field("refs", &self.refs.len())
            .field("hash", &hex::encode(self.hash))
            .finish()
    }
}

/// Incremental cell writer
#[derive(Debug, Clone, Default)]
pub struct CellBuilder {
    data: Vec<u8>,
    bit_len: usize,
    refs: Vec<Arc<Cell>>,
}

impl CellBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    pub fn remaining_bits(&self) -> usize {
        MAX_BITS - self.bit_len
    }

    pub fn store_bit(&mut self, bit: bool) -> Result<&mut Self, CellError> {
        if self.bit_len + 1 > MAX_BITS {
            return Err(CellError::BitOverflow(self.bit_len + 1));
        }
        if self.bit_len % 8 == 0 {
            self.data.push(0);
        }
        if bit {
            let idx = self.bit_len / 8;
            self.data[idx] |= 0x80 >> (self.bit_len % 8);
        }
        self.bit_len += 1;
        Ok(self)
    }

    /// Store an unsigned integer big-endian in exactly `bits` bits
    pub fn store_uint(&mut self, value: u128, bits: usize) -> Result<&mut Self, CellError> {
        if bits < 128 && value >> bits != 0 {
            return Err(CellError::ValueTooLarge { value, bits });
        }
        if self.bit_len + bits > MAX_BITS {
            return Err(CellError::BitOverflow(self.bit_len + bits));
        }
        for i in (0..bits).rev() {
            let bit = i < 128 && (value >> i) & 1 == 1;
            self.store_bit(bit)?;
        }
        Ok(self)
    }

    pub fn store_u8(&mut self, value: u8) -> Result<&mut Self, CellError> {
        self.store_uint(value.into(), 8)
    }

    pub fn store_u32(&mut self, value: u32) -> Result<&mut Self, CellError> {
        self.store_uint(value.into(), 32)
    }

    pub fn store_u64(&mut self, value: u64) -> Result<&mut Self, CellError> {
        self.store_uint(value.into(), 64)
    }

    pub fn store_bytes(&mut self, bytes: &[u8]) -> Result<&mut Self, CellError> {
        if self.bit_len + bytes.len() * 8 > MAX_BITS {
            return Err(CellError::BitOverflow(self.bit_len + bytes.len() * 8));
        }
        for b in bytes {
            self.store_u8(*b)?;
        }
        Ok(self)
    }

    /// Store a `Grams`/`Coins` value (`VarUInteger 16`)
    pub fn store_coins(&mut self, nanos: u128) -> Result<&mut Self, CellError> {
        let len = (128 - nanos.leading_zeros() as usize).div_ceil(8);
        if len > 15 {
            return Err(CellError::ValueTooLarge { value: nanos, bits: 120 });
        }
        self.store_uint(len as u128, 4)?;
        self.store_uint(nanos, len * 8)
    }

    pub fn store_ref(&mut self, cell: Arc<Cell>) -> Result<&mut Self, CellError> {
        if self.refs.len() >= MAX_REFS {
            return Err(CellError::RefOverflow);
        }
        self.refs.push(cell);
        Ok(self)
    }

    pub fn build(&self) -> Result<Cell, CellError> {
        Cell::new(self.data.clone(), self.bit_len, self.refs.clone())
    }
}

/// Serialize a single-root bag of cells with a CRC32C trailer
pub fn serialize_boc(root: &Arc<Cell>) -> Vec<u8> {
    let order = topological_order(root);
    let index: HashMap<[u8; 32], usize> = order
        .iter()
        .enumerate()
        .map(|(i, c)| (c.hash, i))
        .collect();

    let size_bytes = min_bytes(order.len() as u64);
    let mut cells_blob = Vec::new();
    for cell in &order {
        cells_blob.extend_from_slice(&cell.descriptors());
        cells_blob.extend_from_slice(&cell.padded_data());
        for r in &cell.refs {
            push_uint(&mut cells_blob, index[&r.hash] as u64, size_bytes);
        }
    }
    let off_bytes = min_bytes(cells_blob.len() as u64);

    let mut out = Vec::with_capacity(cells_blob.len() + 32);
    out.extend_from_slice(&BOC_MAGIC);
    out.push(FLAG_HAS_CRC32C | size_bytes as u8);
    out.push(off_bytes as u8);
    push_uint(&mut out, order.len() as u64, size_bytes);
    push_uint(&mut out, 1, size_bytes); // roots
    push_uint(&mut out, 0, size_bytes); // absent
    push_uint(&mut out, cells_blob.len() as u64, off_bytes);
    push_uint(&mut out, 0, size_bytes); // root index
    out.extend_from_slice(&cells_blob);
    let crc = crc32c(&out);
    out.extend_from_slice(&crc.to_le_bytes());
    out
}

/// Parse a bag of cells and return its first root
pub fn deserialize_boc(bytes: &[u8]) -> Result<Arc<Cell>, CellError> {
    let mut r = Reader { bytes, pos: 0 };
    if r.take(4)? != BOC_MAGIC {
        return Err(CellError::InvalidBoc("bad magic".into()));
    }
    let flags = r.take(1)?[0];
    let size_bytes = (flags & 0x07) as usize;
    if size_bytes == 0 || size_bytes > 4 {
        return Err(CellError::InvalidBoc(format!("bad ref size {}", size_bytes)));
    }
    let off_bytes = r.take(1)?[0] as usize;
    if off_bytes == 0 || off_bytes > 8 {
        return Err(CellError::InvalidBoc(format!("bad offset size {}", off_bytes)));
    }

    let cell_count = r.uint(size_bytes)? as usize;
    let root_count = r.uint(size_bytes)? as usize;
    let _absent = r.uint(size_bytes)?;
    let total_size = r.uint(off_bytes)? as usize;
    if root_count == 0 || root_count > cell_count {
        return Err(CellError::InvalidBoc("bad root count".into()));
    }
    let mut roots = Vec::with_capacity(root_count.min(16));
    for _ in 0..root_count {
        let idx = r.uint(size_bytes)? as usize;
        if idx >= cell_count {
            return Err(CellError::InvalidBoc(format!("root index {} out of range", idx)));
        }
        roots.push(idx);
    }
    if flags & FLAG_HAS_IDX != 0 {
        r.take(cell_count * off_bytes)?;
    }

    let cells_start = r.pos;
    let mut raw = Vec::with_capacity(cell_count.min(4096));
    for i in 0..cell_count {
        let d = r.take(2)?;
        let (d1, d2) = (d[0], d[1]);
        if d1 & 0b1110_1000 != 0 {
            return Err(CellError::InvalidBoc(format!("cell {} is exotic or has levels", i)));
        }
        let ref_count = (d1 & 0x07) as usize;
        if ref_count > MAX_REFS {
            return Err(CellError::InvalidBoc(format!("cell {} has {} refs", i, ref_count)));
        }
        let byte_len = (d2 as usize).div_ceil(2);
        let data = r.take(byte_len)?.to_vec();
        let bit_len = if d2 % 2 == 1 {
            let last = *data.last().ok_or_else(|| CellError::InvalidBoc("empty padded cell".into()))?;
            if last == 0 {
                return Err(CellError::InvalidBoc(format!("cell {} lacks completion tag", i)));
            }
            byte_len * 8 - last.trailing_zeros() as usize - 1
        } else {
            byte_len * 8
        };
        let mut refs = Vec::with_capacity(ref_count);
        for _ in 0..ref_count {
            let idx = r.uint(size_bytes)? as usize;
            if idx <= i || idx >= cell_count {
                return Err(CellError::InvalidBoc(format!("cell {} has bad ref {}", i, idx)));
            }
            refs.push(idx);
        }
        raw.push((data, bit_len, refs));
    }
    if r.pos - cells_start != total_size {
        return Err(CellError::InvalidBoc("cell data size mismatch".into()));
    }
    if flags & FLAG_HAS_CRC32C != 0 {
        let body_end = r.pos;
        let expected = u32::from_le_bytes(
            r.take(4)?
                .try_into()
                .map_err(|_| CellError::InvalidBoc("truncated checksum".into()))?,
        );
        if crc32c(&bytes[..body_end]) != expected {
            return Err(CellError::ChecksumMismatch);
        }
    }

    let mut built: Vec<Option<Arc<Cell>>> = vec![None; cell_count];
    for (i, (data, bit_len, refs)) in raw.into_iter().enumerate().rev() {
        let children = refs
            .iter()
            .map(|&idx| built[idx].clone().ok_or_else(|| CellError::InvalidBoc("dangling ref".into())))
            .collect::<Result<Vec<_>, _>>()?;
        built[i] = Some(Arc::new(Cell::new(data, bit_len, children)?));
    }
    built[roots[0]]
        .clone()
        .ok_or_else(|| CellError::InvalidBoc("missing root".into()))
}

/// Parents before children, shared subtrees emitted once
fn topological_order(root: &Arc<Cell>) -> Vec<Arc<Cell>> {
    fn visit(cell: &Arc<Cell>, seen: &mut HashSet<[u8; 32]>, post: &mut Vec<Arc<Cell>>) {
        if !seen.insert(cell.hash) {
            return;
        }
        for r in cell.refs.iter().rev() {
            visit(r, seen, post);
        }
        post.push(cell.clone());
    }
    let mut seen = HashSet::new();
    let mut post = Vec::new();
    visit(root, &mut seen, &mut post);
    post.reverse();
    post
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], CellError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| CellError::InvalidBoc("unexpected end of data".into()))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn uint(&mut self, n: usize) -> Result<u64, CellError> {
        Ok(self.take(n)?.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b)))
    }
}

fn bit_at(data: &[u8], i: usize) -> u8 {
    (data[i / 8] >> (7 - i % 8)) & 1
}

fn min_bytes(value: u64) -> usize {
    let bits = 64 - value.leading_zeros() as usize;
    bits.div_ceil(8).max(1)
}

fn push_uint(out: &mut Vec<u8>, value: u64, bytes: usize) {
    out.extend_from_slice(&value.to_be_bytes()[8 - bytes..]);
}

/// CRC-32C (Castagnoli), reflected, as used by bag-of-cells trailers
pub fn crc32c(data: &[u8]) -> u32 {
    let mut crc = 0xffff_ffffu32;
    for &byte in data {
        crc ^= u32::from(byte);
        for _ in 0..8 {
            crc = if crc & 1 != 0 { (crc >> 1) ^ 0x82f6_3b78 } else { crc >> 1 };
        }
    }
    !crc
}
