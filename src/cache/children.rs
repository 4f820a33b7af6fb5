//! Children
//!
//! Ordered children of one parent, indexed by identifier and by name. Children
//! sharing a name carry SNS indexes 1..=k in order; removing one renumbers the
//! siblings that follow it. All access goes through a read/write lock, and
//! listing returns a copy taken under the read lock.

use super::ids::ChildNode;
use crate::graph::Location;
use crate::path::Segment;
use crate::types::{Name, NodeUuid};
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Debug, Default)]
struct ChildrenInner {
    order: Vec<NodeUuid>,
    by_uuid: HashMap<NodeUuid, ChildNode>,
    by_name: HashMap<Name, Vec<NodeUuid>>,
}

impl ChildrenInner {
    fn append(&mut self, name: Name, uuid: NodeUuid) -> ChildNode {
        let siblings = self.by_name.entry(name.clone()).or_default();
        siblings.push(uuid);
        let child = ChildNode::new(uuid, name, siblings.len());
        self.order.push(uuid);
        self.by_uuid.insert(uuid, child.clone());
        child
    }

    fn remove(&mut self, segment: &Segment) -> Option<ChildNode> {
        let siblings = self.by_name.get_mut(segment.name())?;
        let position = segment.index().checked_sub(1)?;
        if position >= siblings.len() {
            return None;
        }
        let uuid = siblings.remove(position);
        for (offset, sibling) in siblings[position..].iter().enumerate() {
            if let Some(existing) = self.by_uuid.get_mut(sibling) {
                *existing = existing.with_sns_index(position + offset + 1);
            }
        }
        if siblings.is_empty() {
            self.by_name.remove(segment.name());
        }
        self.order.retain(|u| *u != uuid);
        self.by_uuid.remove(&uuid)
    }

    fn clear(&mut self) -> Vec<ChildNode> {
        let removed = self
            .order
            .iter()
            .filter_map(|u| self.by_uuid.get(u).cloned())
            .collect();
        self.order.clear();
        self.by_uuid.clear();
        self.by_name.clear();
        removed
    }
}

#[derive(Debug)]
pub struct Children {
    parent: NodeUuid,
    inner: RwLock<ChildrenInner>,
}

impl Children {
    pub fn new(parent: NodeUuid) -> Self {
        Children {
            parent,
            inner: RwLock::new(ChildrenInner::default()),
        }
    }

    /// Children in backend order; locations without an identifier or a path are skipped
    pub fn from_locations(parent: NodeUuid, locations: &[Location]) -> Self {
        let children = Children::new(parent);
        children.append_locations(locations, false, |_| ());
        children
    }

    pub fn parent(&self) -> NodeUuid {
        self.parent
    }

    pub fn size(&self) -> usize {
        self.inner.read().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().order.is_empty()
    }

    pub fn child(&self, uuid: NodeUuid) -> Option<ChildNode> {
        self.inner.read().by_uuid.get(&uuid).cloned()
    }

    pub fn child_at(&self, segment: &Segment) -> Option<ChildNode> {
        let inner = self.inner.read();
        let uuid = inner
            .by_name
            .get(segment.name())?
            .get(segment.index().checked_sub(1)?)?;
        inner.by_uuid.get(uuid).cloned()
    }

    pub fn count_with_name(&self, name: &Name) -> usize {
        self.inner.read().by_name.get(name).map_or(0, Vec::len)
    }

    /// Append a child; its SNS index is one more than the siblings already named alike
    pub fn append(&self, name: Name, uuid: NodeUuid) -> ChildNode {
        self.append_with(name, uuid, |_| ())
    }

    /// Append a child and run `link` with the new entry while the write lock is held
    pub fn append_with(
        &self,
        name: Name,
        uuid: NodeUuid,
        link: impl FnOnce(&ChildNode),
    ) -> ChildNode {
        let mut inner = self.inner.write();
        let child = inner.append(name, uuid);
        link(&child);
        child
    }

    /// Bulk (re)population from backend locations. With `remove_existing_first`
    /// the current children are dropped first and `detach` runs for each of
    /// them under the write lock.
    pub fn append_locations(
        &self,
        locations: &[Location],
        remove_existing_first: bool,
        mut detach: impl FnMut(&ChildNode),
    ) -> Vec<ChildNode> {
        let mut inner = self.inner.write();
        if remove_existing_first {
            for removed in inner.clear() {
                detach(&removed);
            }
        }
        let mut appended = Vec::with_capacity(locations.len());
        for location in locations {
            let name = location
                .path
                .as_ref()
                .and_then(|p| p.last_segment())
                .map(|s| s.name().clone());
            match (name, location.uuid) {
                (Some(name), Some(uuid)) => appended.push(inner.append(name, uuid)),
                _ => tracing::warn!(
                    parent = %self.parent,
                    location = %location,
                    "Skipping child location without path or identifier"
                ),
            }
        }
        appended
    }

    /// Remove the child at the segment, renumbering later siblings with the same name
    pub fn remove(&self, segment: &Segment) -> Option<ChildNode> {
        self.remove_with(segment, |_| ())
    }

    /// Remove the child at the segment and run `unlink` under the write lock
    pub fn remove_with(
        &self,
        segment: &Segment,
        unlink: impl FnOnce(&ChildNode),
    ) -> Option<ChildNode> {
        let mut inner = self.inner.write();
        let removed = inner.remove(segment)?;
        unlink(&removed);
        Some(removed)
    }

    pub fn remove_uuid(&self, uuid: NodeUuid) -> Option<ChildNode> {
        let mut inner = self.inner.write();
        let segment = inner.by_uuid.get(&uuid)?.segment().clone();
        inner.remove(&segment)
    }

    /// Snapshot of the children in order
    pub fn as_list(&self) -> Vec<ChildNode> {
        let inner = self.inner.read();
        inner
            .order
            .iter()
            .filter_map(|u| inner.by_uuid.get(u).cloned())
            .collect()
    }
}

impl<'a> IntoIterator for &'a Children {
    type Item = ChildNode;
    type IntoIter = std::vec::IntoIter<ChildNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.as_list().into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use uuid::Uuid;

    fn segment(name: &str, index: usize) -> Segment {
        Segment::new(Name::from(name), index)
    }

    #[test]
    fn test_sns_lookup_and_removal_renumbers() {
        let children = Children::new(Uuid::new_v4());
        let first = Uuid::new_v4();
        let bar = Uuid::new_v4();
        let third = Uuid::new_v4();
        children.append(Name::from("foo"), first);
        children.append(Name::from("bar"), bar);
        children.append(Name::from("foo"), third);

        assert_eq!(children.size(), 3);
        assert_eq!(children.child_at(&segment("foo", 1)).unwrap().uuid(), first);
        assert_eq!(children.child_at(&segment("foo", 2)).unwrap().uuid(), third);

        let removed = children.remove(&segment("foo", 1)).unwrap();
        assert_eq!(removed.uuid(), first);
        let remaining: Vec<(NodeUuid, usize)> = children
            .as_list()
            .iter()
            .map(|c| (c.uuid(), c.sns_index()))
            .collect();
        assert_eq!(remaining, vec![(bar, 1), (third, 1)]);
        assert_eq!(children.child_at(&segment("foo", 1)).unwrap().uuid(), third);
        assert!(children.child_at(&segment("foo", 2)).is_none());
        assert_eq!(children.child(third).unwrap().sns_index(), 1);
    }

    #[test]
    fn test_remove_missing_segment_is_noop() {
        let children = Children::new(Uuid::new_v4());
        children.append(Name::from("a"), Uuid::new_v4());
        assert!(children.remove(&segment("a", 2)).is_none());
        assert!(children.remove(&segment("b", 1)).is_none());
        assert_eq!(children.size(), 1);
    }

    #[test]
    fn test_append_locations_replacing_existing_detaches_old_children() {
        let parent = Uuid::new_v4();
        let children = Children::new(parent);
        let old = Uuid::new_v4();
        children.append(Name::from("old"), old);

        let new = Uuid::new_v4();
        let path = crate::path::Path::parse("/p/new").unwrap();
        let mut detached = Vec::new();
        children.append_locations(&[Location::new(path, new)], true, |c| {
            detached.push(c.uuid())
        });

        assert_eq!(detached, vec![old]);
        assert_eq!(children.size(), 1);
        assert!(children.child(old).is_none());
        assert_eq!(children.child(new).unwrap().name(), &Name::from("new"));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Append(u8),
        Remove(u8, usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u8..3).prop_map(Op::Append),
            (0u8..3, 1usize..5).prop_map(|(n, i)| Op::Remove(n, i)),
        ]
    }

    proptest! {
        #[test]
        fn prop_sns_indexes_stay_contiguous(ops in proptest::collection::vec(op(), 0..60)) {
            let children = Children::new(Uuid::new_v4());
            for op in ops {
                match op {
                    Op::Append(n) => {
                        children.append(Name::new(format!("n{}", n)), Uuid::new_v4());
                    }
                    Op::Remove(n, i) => {
                        children.remove(&Segment::new(Name::new(format!("n{}", n)), i));
                    }
                }
            }
            let mut per_name: HashMap<Name, Vec<usize>> = HashMap::new();
            for child in children.as_list() {
                per_name.entry(child.name().clone()).or_default().push(child.sns_index());
                prop_assert_eq!(children.child_at(child.segment()).map(|c| c.uuid()), Some(child.uuid()));
            }
            for (_, indexes) in per_name {
                let expected: Vec<usize> = (1..=indexes.len()).collect();
                prop_assert_eq!(indexes, expected);
            }
        }
    }
}
