//! The commit-graph contract: a fast, external index from commit id to
//! tree, parents, commit time, and generation number.
//!
//! The on-disk layout of this index is out of scope for this crate (§1) —
//! it is consumed only through the [`CommitGraph`] trait. A concrete
//! reader for the real git commit-graph file format is included below
//! since the engine benefits from having a non-trivial implementation to
//! exercise the generation-ordered topo sort against, but nothing in
//! `walk`/`generators` depends on this being the *only* implementation.

use std::path::Path;

use git_hash::ObjectId;
use memmap2::Mmap;

use crate::RevWalkError;

/// One commit's worth of data as stored in a commit-graph.
#[derive(Debug, Clone)]
pub struct CommitGraphData {
    pub tree: ObjectId,
    pub commit_time: i64,
    /// Graph positions of this commit's parents (not yet resolved to ids).
    pub parent_positions: Vec<u32>,
    pub generation: u32,
}

/// External collaborator consumed by the commit-graph-accelerated topo
/// generator (§4.3 step 4) and by `merged_into`'s generation cutoff
/// (§4.6).
pub trait CommitGraph {
    /// The graph's internal position for `id`, if it is covered.
    fn find_graph_position(&self, id: &ObjectId) -> Option<u32>;

    /// The data stored at a graph position.
    fn get_commit_data(&self, pos: u32) -> Option<CommitGraphData>;

    /// Resolve a graph position back to an [`ObjectId`].
    fn oid_at(&self, pos: u32) -> Option<ObjectId>;
}

/// Maximum generation number representable in the v1 on-disk format.
#[allow(dead_code)]
const GENERATION_NUMBER_V1_MAX: u32 = 0x3FFF_FFFF;

const COMMIT_GRAPH_SIGNATURE: &[u8; 4] = b"CGPH";

const CHUNK_OID_FANOUT: u32 = 0x4F494446; // "OIDF"
const CHUNK_OID_LOOKUP: u32 = 0x4F49444C; // "OIDL"
const CHUNK_COMMIT_DATA: u32 = 0x43444154; // "CDAT"
const CHUNK_EXTRA_EDGES: u32 = 0x45444745; // "EDGE"

const PARENT_NONE: u32 = 0x7000_0000;
const PARENT_EXTRA_EDGE: u32 = 0x8000_0000;

/// A memory-mapped reader for the real git commit-graph file format.
pub struct FileCommitGraph {
    data: Mmap,
    num_commits: u32,
    oid_lookup_offset: usize,
    commit_data_offset: usize,
    extra_edges_offset: Option<usize>,
    hash_len: usize,
}

impl FileCommitGraph {
    /// Open and parse a commit-graph file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RevWalkError> {
        let file = std::fs::File::open(path.as_ref())?;
        let data = unsafe { Mmap::map(&file) }?;

        if data.len() < 8 {
            return Err(corrupt("commit-graph file too small"));
        }
        if &data[0..4] != COMMIT_GRAPH_SIGNATURE {
            return Err(corrupt("invalid commit-graph signature"));
        }
        let version = data[4];
        if version != 1 {
            return Err(corrupt(&format!("unsupported commit-graph version: {version}")));
        }
        let hash_len = match data[5] {
            1 => 20,
            2 => 32,
            other => return Err(corrupt(&format!("unsupported hash version: {other}"))),
        };

        let num_chunks = data[6] as usize;
        let toc_start = 8;
        let toc_entry_size = 12;
        if data.len() < toc_start + (num_chunks + 1) * toc_entry_size {
            return Err(corrupt("truncated chunk table of contents"));
        }

        let mut oid_fanout_offset = None;
        let mut oid_lookup_offset = None;
        let mut commit_data_offset = None;
        let mut extra_edges_offset = None;

        for i in 0..num_chunks {
            let entry = toc_start + i * toc_entry_size;
            let chunk_id = u32::from_be_bytes(data[entry..entry + 4].try_into().unwrap());
            let offset =
                u64::from_be_bytes(data[entry + 4..entry + 12].try_into().unwrap()) as usize;
            match chunk_id {
                CHUNK_OID_FANOUT => oid_fanout_offset = Some(offset),
                CHUNK_OID_LOOKUP => oid_lookup_offset = Some(offset),
                CHUNK_COMMIT_DATA => commit_data_offset = Some(offset),
                CHUNK_EXTRA_EDGES => extra_edges_offset = Some(offset),
                _ => {}
            }
        }

        let oid_fanout_offset = oid_fanout_offset.ok_or_else(|| corrupt("missing OID Fanout chunk"))?;
        let oid_lookup_offset = oid_lookup_offset.ok_or_else(|| corrupt("missing OID Lookup chunk"))?;
        let commit_data_offset =
            commit_data_offset.ok_or_else(|| corrupt("missing Commit Data chunk"))?;

        let fanout_last = oid_fanout_offset + 255 * 4;
        if data.len() < fanout_last + 4 {
            return Err(corrupt("truncated fanout table"));
        }
        let num_commits = u32::from_be_bytes(data[fanout_last..fanout_last + 4].try_into().unwrap());

        Ok(Self {
            data,
            num_commits,
            oid_lookup_offset,
            commit_data_offset,
            extra_edges_offset,
            hash_len,
        })
    }

    fn find_position(&self, id: &ObjectId) -> Option<u32> {
        let hash_bytes = id.as_bytes();
        if hash_bytes.len() != self.hash_len {
            return None;
        }
        let mut lo: u32 = 0;
        let mut hi: u32 = self.num_commits;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let offset = self.oid_lookup_offset + (mid as usize) * self.hash_len;
            if offset + self.hash_len > self.data.len() {
                return None;
            }
            let entry = &self.data[offset..offset + self.hash_len];
            match entry.cmp(hash_bytes) {
                std::cmp::Ordering::Equal => return Some(mid),
                std::cmp::Ordering::Less => lo = mid + 1,
                std::cmp::Ordering::Greater => hi = mid,
            }
        }
        None
    }
}

impl CommitGraph for FileCommitGraph {
    fn find_graph_position(&self, id: &ObjectId) -> Option<u32> {
        self.find_position(id)
    }

    fn oid_at(&self, pos: u32) -> Option<ObjectId> {
        let offset = self.oid_lookup_offset + (pos as usize) * self.hash_len;
        if offset + self.hash_len > self.data.len() {
            return None;
        }
        let algo = if self.hash_len == 20 {
            git_hash::HashAlgorithm::Sha1
        } else {
            git_hash::HashAlgorithm::Sha256
        };
        ObjectId::from_bytes(&self.data[offset..offset + self.hash_len], algo).ok()
    }

    fn get_commit_data(&self, pos: u32) -> Option<CommitGraphData> {
        let hash_len = self.hash_len;
        let entry_size = hash_len + 16;
        let offset = self.commit_data_offset + (pos as usize) * entry_size;
        if offset + entry_size > self.data.len() {
            return None;
        }

        let algo = if hash_len == 20 {
            git_hash::HashAlgorithm::Sha1
        } else {
            git_hash::HashAlgorithm::Sha256
        };
        let tree = ObjectId::from_bytes(&self.data[offset..offset + hash_len], algo).ok()?;

        let p1_offset = offset + hash_len;
        let parent1 = u32::from_be_bytes(self.data[p1_offset..p1_offset + 4].try_into().unwrap());
        let p2_offset = p1_offset + 4;
        let parent2 = u32::from_be_bytes(self.data[p2_offset..p2_offset + 4].try_into().unwrap());
        let gen_date_offset = p2_offset + 4;
        let gen_date =
            u32::from_be_bytes(self.data[gen_date_offset..gen_date_offset + 4].try_into().unwrap());
        let date_low_offset = gen_date_offset + 4;
        let date_low =
            u32::from_be_bytes(self.data[date_low_offset..date_low_offset + 4].try_into().unwrap());

        let generation = gen_date >> 2;
        let date_high = ((gen_date & 0x3) as u64) << 32;
        let commit_time = (date_high | date_low as u64) as i64;

        let mut parent_positions = Vec::new();
        if parent1 != PARENT_NONE {
            parent_positions.push(parent1);
        }
        if parent2 != PARENT_NONE {
            if parent2 & PARENT_EXTRA_EDGE != 0 {
                if let Some(extra_offset) = self.extra_edges_offset {
                    let mut idx = (parent2 & !PARENT_EXTRA_EDGE) as usize;
                    loop {
                        let edge_offset = extra_offset + idx * 4;
                        if edge_offset + 4 > self.data.len() {
                            break;
                        }
                        let edge = u32::from_be_bytes(
                            self.data[edge_offset..edge_offset + 4].try_into().unwrap(),
                        );
                        parent_positions.push(edge & 0x7FFF_FFFF);
                        if edge & 0x8000_0000 != 0 {
                            break;
                        }
                        idx += 1;
                    }
                }
            } else {
                parent_positions.push(parent2);
            }
        }

        Some(CommitGraphData {
            tree,
            commit_time,
            parent_positions,
            generation,
        })
    }
}

fn corrupt(reason: &str) -> RevWalkError {
    // The commit-graph file is an index, not an object; we report it
    // through the same textual-reason channel as a corrupt object rather
    // than inventing a second "corrupt index" variant.
    RevWalkError::CorruptObject {
        id: ObjectId::NULL_SHA1,
        reason: format!("commit-graph: {reason}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_signature() {
        let dir = std::env::temp_dir().join(format!("cg-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad.graph");
        std::fs::write(&path, b"NOPE\x01\x01\x00\x00").unwrap();
        let err = FileCommitGraph::open(&path).unwrap_err();
        assert!(matches!(err, RevWalkError::CorruptObject { .. }));
        std::fs::remove_file(&path).ok();
    }
}
