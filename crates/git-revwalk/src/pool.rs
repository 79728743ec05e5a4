//! The object pool: the single source of truth for every revision
//! object's parsed metadata and shared flag word (§4.2 design note,
//! §3.1).
//!
//! Every generator stage and every reachability query goes through a
//! `Pool` to look up or lazily parse an object. No two [`RevObject`]
//! instances ever exist for the same id — once an id has been looked up
//! once, every later lookup returns the same (mutable, shared) record.

use std::collections::HashMap;

use git_hash::ObjectId;

use crate::reader::{ObjectReader, RawObject};
use crate::validate::{validate_commit, validate_tag, validate_tree, FileMode, PersonIdentifier};
use crate::RevWalkError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Commit,
    Tree,
    Blob,
    Tag,
}

#[derive(Debug, Clone)]
pub struct TreeEntry {
    pub mode: FileMode,
    pub name: Vec<u8>,
    pub id: ObjectId,
}

/// A commit's parsed, validated metadata plus the bookkeeping fields the
/// topo/generation-ordered generators mutate in place.
#[derive(Debug, Clone)]
pub struct CommitData {
    pub tree: ObjectId,
    pub parents: Vec<ObjectId>,
    pub author: PersonIdentifier,
    pub committer: PersonIdentifier,
    pub commit_time: i64,
    /// Number of not-yet-emitted children, maintained by the classical
    /// topo generator (§4.3 step 4a).
    pub in_degree: u32,
    /// This commit's position in the commit-graph, if it has one.
    pub graph_position: Option<u32>,
    /// Generation number: `GENERATION_UNKNOWN` until a generator
    /// computes or looks one up.
    pub generation: u32,
}

#[derive(Debug, Clone)]
pub struct TagData {
    pub target: ObjectId,
    pub target_kind: ObjectKind,
    pub tag_name: Vec<u8>,
    pub tagger: Option<PersonIdentifier>,
}

/// The parsed payload of a revision object. Populated only once
/// [`Pool::parse`] has validated the object's raw bytes; before that a
/// looked-up-but-unparsed object has no data attached (see
/// [`RevObject::data`]).
#[derive(Debug, Clone)]
pub enum RevObjectData {
    Commit(CommitData),
    Tree(Vec<TreeEntry>),
    Blob,
    Tag(TagData),
}

/// One entry in the pool: an id, its kind, its shared flag word, and
/// (once parsed) its validated payload.
#[derive(Debug, Clone)]
pub struct RevObject {
    pub id: ObjectId,
    pub kind: ObjectKind,
    pub flags: u32,
    pub data: RevObjectData,
}

impl RevObject {
    pub fn has_flag(&self, mask: u32) -> bool {
        self.flags & mask != 0
    }

    pub fn set_flag(&mut self, mask: u32) {
        self.flags |= mask;
    }

    pub fn clear_flag(&mut self, mask: u32) {
        self.flags &= !mask;
    }
}

/// The shared object table. Owns every [`RevObject`] the walk has
/// touched so far and lazily parses new ones on first lookup.
///
/// Single-threaded by design (§5): the pool is never wrapped in a mutex
/// or shared across threads, matching the engine's cooperative,
/// synchronous concurrency model.
pub struct Pool {
    objects: HashMap<ObjectId, RevObject>,
    shallow: std::collections::HashSet<ObjectId>,
    shallow_loaded: bool,
}

impl Pool {
    pub fn new() -> Self {
        Self {
            objects: HashMap::new(),
            shallow: std::collections::HashSet::new(),
            shallow_loaded: false,
        }
    }

    fn ensure_shallow_loaded(&mut self, reader: &dyn ObjectReader) {
        if !self.shallow_loaded {
            self.shallow = reader.shallow_commits();
            self.shallow_loaded = true;
        }
    }

    /// Whether `id` is one of the reader's shallow commits, i.e. whether
    /// its parsed `parents` have been stripped to the empty list per §6.
    /// Loads the shallow set on first use, same as [`Pool::lookup_commit`].
    pub fn is_shallow(&mut self, reader: &dyn ObjectReader, id: &ObjectId) -> bool {
        self.ensure_shallow_loaded(reader);
        self.shallow.contains(id)
    }

    /// Number of distinct objects the pool currently holds.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn contains(&self, id: &ObjectId) -> bool {
        self.objects.contains_key(id)
    }

    pub fn get(&self, id: &ObjectId) -> Option<&RevObject> {
        self.objects.get(id)
    }

    pub fn get_mut(&mut self, id: &ObjectId) -> Option<&mut RevObject> {
        self.objects.get_mut(id)
    }

    /// Replace a commit's parent list. Used exclusively by the rewrite
    /// generator (§4.3 step 3) to splice history around commits elided
    /// by a tree filter; every other caller treats a parsed commit's
    /// parents as immutable.
    pub fn rewrite_parents(&mut self, id: &ObjectId, new_parents: Vec<ObjectId>) {
        if let Some(obj) = self.objects.get_mut(id) {
            if let RevObjectData::Commit(c) = &mut obj.data {
                c.parents = new_parents;
            }
        }
    }

    /// Iterate every object currently resident in the pool.
    pub fn iter(&self) -> impl Iterator<Item = &RevObject> {
        self.objects.values()
    }

    /// Iterate every object currently resident in the pool, mutably. Used by
    /// [`crate::walk::RevWalk::reset`] to clear non-retained flag bits across
    /// the whole pool in one pass.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut RevObject> {
        self.objects.values_mut()
    }

    /// Look up (or parse, validate, and insert) the commit at `id`,
    /// returning the fully populated [`CommitData`]. Fails with
    /// [`RevWalkError::IncorrectObjectType`] if `id` names a non-commit.
    pub fn lookup_commit<'a>(
        &'a mut self,
        reader: &dyn ObjectReader,
        id: &ObjectId,
    ) -> Result<&'a mut RevObject, RevWalkError> {
        self.ensure_shallow_loaded(reader);
        if !self.objects.contains_key(id) {
            let parsed = self.parse_commit(reader, id)?;
            self.objects.insert(*id, parsed);
        } else if !matches!(self.objects[id].data, RevObjectData::Commit(_)) {
            return Err(RevWalkError::IncorrectObjectType {
                id: *id,
                expected: ObjectKind::Commit,
                actual: self.objects[id].kind,
            });
        }
        Ok(self.objects.get_mut(id).unwrap())
    }

    /// Look up (or parse) any object regardless of kind, dispatching on
    /// the reader's declared type. Used by object-level traversal and
    /// the pedestrian bitmap fallback, which both need to walk
    /// commit/tree/blob/tag alike.
    pub fn lookup_or_parse_any<'a>(
        &'a mut self,
        reader: &dyn ObjectReader,
        id: &ObjectId,
    ) -> Result<&'a RevObject, RevWalkError> {
        self.ensure_shallow_loaded(reader);
        if !self.objects.contains_key(id) {
            let raw = reader.open(id, None)?;
            let obj = self.validate_and_wrap(id, raw)?;
            self.objects.insert(*id, obj);
        }
        Ok(&self.objects[id])
    }

    fn parse_commit(&self, reader: &dyn ObjectReader, id: &ObjectId) -> Result<RevObject, RevWalkError> {
        let raw = reader.open(id, Some(ObjectKind::Commit))?;
        let commit = match &raw {
            RawObject::Commit(bytes) => bytes,
            other => {
                return Err(RevWalkError::IncorrectObjectType {
                    id: *id,
                    expected: ObjectKind::Commit,
                    actual: other.kind(),
                })
            }
        };
        let validated = validate_commit(id, commit)?;

        let parents = if self.shallow.contains(id) {
            Vec::new()
        } else {
            validated.parents
        };

        let commit_time = validated.committer.seconds;
        Ok(RevObject {
            id: *id,
            kind: ObjectKind::Commit,
            flags: 0,
            data: RevObjectData::Commit(CommitData {
                tree: validated.tree,
                parents,
                author: validated.author,
                committer: validated.committer,
                commit_time,
                in_degree: 0,
                graph_position: None,
                generation: crate::GENERATION_UNKNOWN,
            }),
        })
    }

    fn validate_and_wrap(&self, id: &ObjectId, raw: RawObject) -> Result<RevObject, RevWalkError> {
        match raw {
            RawObject::Commit(bytes) => {
                let validated = validate_commit(id, &bytes)?;
                let parents = if self.shallow.contains(id) {
                    Vec::new()
                } else {
                    validated.parents
                };
                Ok(RevObject {
                    id: *id,
                    kind: ObjectKind::Commit,
                    flags: 0,
                    data: RevObjectData::Commit(CommitData {
                        tree: validated.tree,
                        parents,
                        commit_time: validated.committer.seconds,
                        author: validated.author,
                        committer: validated.committer,
                        in_degree: 0,
                        graph_position: None,
                        generation: crate::GENERATION_UNKNOWN,
                    }),
                })
            }
            RawObject::Tree(bytes) => {
                let entries = validate_tree(id, &bytes)?;
                Ok(RevObject {
                    id: *id,
                    kind: ObjectKind::Tree,
                    flags: 0,
                    data: RevObjectData::Tree(entries),
                })
            }
            RawObject::Blob(_) => Ok(RevObject {
                id: *id,
                kind: ObjectKind::Blob,
                flags: 0,
                data: RevObjectData::Blob,
            }),
            RawObject::Tag(bytes) => {
                let validated = validate_tag(id, &bytes)?;
                Ok(RevObject {
                    id: *id,
                    kind: ObjectKind::Tag,
                    flags: 0,
                    data: RevObjectData::Tag(TagData {
                        target: validated.target,
                        target_kind: validated.target_kind,
                        tag_name: validated.tag_name,
                        tagger: validated.tagger,
                    }),
                })
            }
        }
    }
}

impl Default for Pool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::ObjectReader;
    use std::collections::HashMap as Map;

    struct FakeReader {
        objects: Map<ObjectId, RawObject>,
    }

    impl ObjectReader for FakeReader {
        fn open(&self, id: &ObjectId, _hint: Option<ObjectKind>) -> Result<RawObject, RevWalkError> {
            self.objects
                .get(id)
                .cloned()
                .ok_or(RevWalkError::MissingObject { id: *id })
        }

        fn has(&self, id: &ObjectId) -> bool {
            self.objects.contains_key(id)
        }
    }

    fn commit_bytes(tree: &ObjectId, parents: &[ObjectId]) -> Vec<u8> {
        let mut s = format!("tree {}\n", tree.to_hex());
        for p in parents {
            s.push_str(&format!("parent {}\n", p.to_hex()));
        }
        s.push_str("author A U Thor <a@example.com> 1000 +0000\n");
        s.push_str("committer A U Thor <a@example.com> 2000 +0000\n");
        s.push_str("\nmsg\n");
        s.into_bytes()
    }

    #[test]
    fn lookup_commit_parses_and_caches() {
        let tree = ObjectId::NULL_SHA1;
        let commit_id = ObjectId::from_hex("0000000000000000000000000000000000000001").unwrap();
        let mut objects = Map::new();
        objects.insert(commit_id, RawObject::Commit(commit_bytes(&tree, &[]).into_boxed_slice()));
        let reader = FakeReader { objects };

        let mut pool = Pool::new();
        let obj = pool.lookup_commit(&reader, &commit_id).unwrap();
        match &obj.data {
            RevObjectData::Commit(c) => assert_eq!(c.tree, tree),
            _ => panic!("expected commit"),
        }
        assert_eq!(pool.len(), 1);

        // second lookup reuses the cached entry
        pool.lookup_commit(&reader, &commit_id).unwrap();
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn shallow_commit_has_parents_stripped() {
        struct ShallowReader(FakeReader);
        impl ObjectReader for ShallowReader {
            fn open(&self, id: &ObjectId, hint: Option<ObjectKind>) -> Result<RawObject, RevWalkError> {
                self.0.open(id, hint)
            }
            fn has(&self, id: &ObjectId) -> bool {
                self.0.has(id)
            }
            fn shallow_commits(&self) -> std::collections::HashSet<ObjectId> {
                self.0.objects.keys().cloned().collect()
            }
        }

        let tree = ObjectId::NULL_SHA1;
        let parent = ObjectId::from_hex("0000000000000000000000000000000000000002").unwrap();
        let commit_id = ObjectId::from_hex("0000000000000000000000000000000000000001").unwrap();
        let mut objects = Map::new();
        objects.insert(commit_id, RawObject::Commit(commit_bytes(&tree, &[parent]).into_boxed_slice()));
        let reader = ShallowReader(FakeReader { objects });

        let mut pool = Pool::new();
        let obj = pool.lookup_commit(&reader, &commit_id).unwrap();
        match &obj.data {
            RevObjectData::Commit(c) => assert!(c.parents.is_empty()),
            _ => panic!("expected commit"),
        }
    }
}
