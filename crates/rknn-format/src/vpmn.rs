//! Reader for the legacy VPMN binary dialect.
//!
//! VPMN regions are self-delimiting and carry their own magic. Only operator
//! type/id pairs are recoverable; there is no shape or data-flow information.
//!
//! ```text
//! offset  size  field
//! 0       4     magic "VPMN"
//! 4       2     major (u16 LE)
//! 6       2     minor (u16 LE)
//! 8       4     reserved
//! 12      64    model name (NUL-padded ASCII)
//! 76      4     node count (u32 LE)
//! 80      T     reserved block; T = 296 if major > 3, 288 if major > 1, else 32
//! 80+T    24    input offset, input count, output offset, output count,
//!               node-table offset, node-table size (u32 LE each)
//! ```
//!
//! Node-table entries (offsets relative to the region start) are a 64-byte
//! NUL-terminated op type, a u32 id, a u32 reserved word, and one extra u32
//! when major > 3.

use std::collections::{BTreeMap, HashSet};

use rknn_core::{Graph, GraphError, Node};
use serde::Serialize;

use crate::error::{FormatError, Result};

/// Magic bytes of a VPMN region: "VPMN"
pub const VPMN_MAGIC: [u8; 4] = *b"VPMN";

const NAME_LEN: usize = 64;
const FIXED_PREFIX: usize = 80;

/// Size of the reserved block after the node count.
pub fn reserved_block_size(major: u16) -> usize {
    if major > 3 {
        296
    } else if major > 1 {
        288
    } else {
        32
    }
}

/// Size of one node-table entry.
pub fn entry_size(major: u16) -> usize {
    NAME_LEN + 4 + 4 + if major > 3 { 4 } else { 0 }
}

/// Size of a VPMN region up to and including the descriptor fields.
pub fn descriptor_end(major: u16) -> usize {
    FIXED_PREFIX + reserved_block_size(major) + 6 * 4
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VpmnDescriptors {
    pub input_offset: u32,
    pub input_count: u32,
    pub output_offset: u32,
    pub output_count: u32,
    pub node_table_offset: u32,
    pub node_table_size: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VpmnEntry {
    pub op_type: String,
    pub id: u32,
}

/// Decoded VPMN region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VpmnModel {
    pub major: u16,
    pub minor: u16,
    pub name: String,
    pub descriptors: VpmnDescriptors,
    pub entries: Vec<VpmnEntry>,
}

impl VpmnModel {
    /// Build a compute graph of unconnected operator nodes.
    ///
    /// Node ids are the stored entry ids; if those collide, positions are
    /// used instead.
    pub fn into_graph(self) -> std::result::Result<Graph, GraphError> {
        let mut seen = HashSet::new();
        let unique = self.entries.iter().all(|e| seen.insert(e.id));
        if !unique {
            tracing::warn!("VPMN node ids are not unique; numbering nodes by position");
        }
        let nodes = self
            .entries
            .into_iter()
            .enumerate()
            .map(|(pos, entry)| {
                let id = if unique { entry.id as usize } else { pos };
                Node::new(id, entry.op_type)
            })
            .collect();
        Graph::new(nodes, BTreeMap::new())
    }
}

/// Offset of the first VPMN magic in `data`.
pub fn locate_vpmn(data: &[u8]) -> Option<usize> {
    data.windows(VPMN_MAGIC.len()).position(|w| w == VPMN_MAGIC)
}

/// Decode a VPMN region starting at the beginning of `data`.
pub fn read_vpmn(data: &[u8]) -> Result<VpmnModel> {
    read_vpmn_at(data, 0)
}

/// Decode a VPMN region; `base` is its offset in the enclosing file and is
/// only used for error reporting.
pub fn read_vpmn_at(data: &[u8], base: usize) -> Result<VpmnModel> {
    let mut r = Reader { data, pos: 0, base };

    if r.bytes(4)? != VPMN_MAGIC {
        return Err(FormatError::InvalidVpmnSignature { offset: base });
    }
    let major = r.u16()?;
    let minor = r.u16()?;
    r.skip(4)?;
    let name = ascii_name(r.bytes(NAME_LEN)?);
    let node_count = r.u32()?;
    r.skip(reserved_block_size(major))?;

    let descriptors = VpmnDescriptors {
        input_offset: r.u32()?,
        input_count: r.u32()?,
        output_offset: r.u32()?,
        output_count: r.u32()?,
        node_table_offset: r.u32()?,
        node_table_size: r.u32()?,
    };

    let stride = entry_size(major);
    let expected_table = u64::from(node_count) * stride as u64;
    if node_count > 0 && u64::from(descriptors.node_table_size) != expected_table {
        tracing::warn!(
            "VPMN node table declares {} bytes but {node_count} entries need {expected_table}",
            descriptors.node_table_size
        );
    }

    let mut entries = Vec::new();
    if node_count > 0 {
        r.seek(descriptors.node_table_offset as usize)?;
        for _ in 0..node_count {
            let op_type = ascii_name(r.bytes(NAME_LEN)?);
            let id = r.u32()?;
            r.skip(4)?;
            if major > 3 {
                r.skip(4)?;
            }
            entries.push(VpmnEntry { op_type, id });
        }
    }

    tracing::debug!("VPMN v{major}.{minor} '{name}': {} nodes", entries.len());
    Ok(VpmnModel {
        major,
        minor,
        name,
        descriptors,
        entries,
    })
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
    base: usize,
}

impl<'a> Reader<'a> {
    fn bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        let available = self.data.len().saturating_sub(self.pos);
        if n > available {
            return Err(FormatError::TruncatedVpmn {
                offset: self.base + self.pos,
                needed: n,
                available,
            });
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn skip(&mut self, n: usize) -> Result<()> {
        self.bytes(n).map(|_| ())
    }

    fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(FormatError::TruncatedVpmn {
                offset: self.base + pos,
                needed: 0,
                available: 0,
            });
        }
        self.pos = pos;
        Ok(())
    }

    fn u16(&mut self) -> Result<u16> {
        let b = self.bytes(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32> {
        let b = self.bytes(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }
}

/// NUL-terminated ASCII field; anything after the first NUL is padding.
fn ascii_name(raw: &[u8]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).into_owned()
}
