//! Referral forest with cycle-safe insertion and bounded walks.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use lib_types::{now_unix, MemberId};

use crate::errors::{ReferralError, ReferralResult};
use crate::node::ReferralNode;

/// Hop bound for ancestor walks.
///
/// A healthy forest is nowhere near this deep; the bound exists so corrupt
/// edge data can never loop a walk forever.
pub const MAX_ANCESTOR_HOPS: u32 = 1000;

/// Resumable position in a breadth-first descendant walk.
///
/// Serializable so an external tree view can hold it across requests and
/// expand one level at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescendantCursor {
    /// Members whose children form the next level
    frontier: Vec<MemberId>,
    /// Depth of the level the next page will return (1 = direct children)
    next_level: u32,
}

/// One level of a descendant walk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DescendantsPage {
    /// Depth of this level relative to the walk origin
    pub level: u32,
    /// Nodes at this level, in registration order per parent
    pub nodes: Vec<ReferralNode>,
    /// Cursor for the next level, or None when the subtree is exhausted
    pub cursor: Option<DescendantCursor>,
}

#[derive(Debug, Default)]
struct GraphInner {
    nodes: HashMap<MemberId, ReferralNode>,
    /// Direct referrals per member, in registration order
    children: HashMap<MemberId, Vec<MemberId>>,
    /// Memoized subtree sizes; cleared on every insert
    subtree_memo: HashMap<MemberId, u64>,
}

impl GraphInner {
    /// Walk up from `start`, failing if `needle` appears within the hop bound.
    fn check_no_cycle(&self, start: &MemberId, needle: &MemberId) -> ReferralResult<()> {
        let mut current = Some(start.clone());
        let mut hops = 0u32;
        while let Some(member) = current {
            if &member == needle {
                return Err(ReferralError::CycleDetected {
                    member_id: needle.clone(),
                    referrer_id: start.clone(),
                });
            }
            hops += 1;
            if hops > MAX_ANCESTOR_HOPS {
                return Err(ReferralError::HopBoundExceeded(start.clone()));
            }
            current = self
                .nodes
                .get(&member)
                .and_then(|node| node.referrer_id.clone());
        }
        Ok(())
    }
}

/// The referral forest.
///
/// Inserts take the write lock, so the cycle check and the insert itself are
/// a single race-free step. Reads (ancestor walks, descendant paging) only
/// take the read lock: referrer pointers are immutable once set, so a stale
/// read can at worst miss a chain inserted later, never see a corrupt one.
#[derive(Debug, Default)]
pub struct ReferralGraph {
    inner: RwLock<GraphInner>,
}

impl ReferralGraph {
    /// Create an empty forest
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a member, optionally under a referrer.
    ///
    /// Fails with `UnknownReferrer` if the referrer is not registered,
    /// `CycleDetected` if the edge would make the member its own ancestor,
    /// and `DuplicateMember` if the member is already registered (referrer
    /// pointers are set at most once; re-parenting is unsupported).
    pub async fn insert(
        &self,
        member_id: MemberId,
        referrer_id: Option<MemberId>,
    ) -> ReferralResult<ReferralNode> {
        let mut inner = self.inner.write().await;

        if let Some(referrer) = &referrer_id {
            if !inner.nodes.contains_key(referrer) {
                return Err(ReferralError::UnknownReferrer(referrer.clone()));
            }
            // Cycle check before the duplicate check: a re-parenting attempt
            // that would close a loop reports the loop, not the duplicate.
            inner.check_no_cycle(referrer, &member_id)?;
        }
        if inner.nodes.contains_key(&member_id) {
            return Err(ReferralError::DuplicateMember(member_id));
        }

        let node = ReferralNode {
            member_id: member_id.clone(),
            referrer_id: referrer_id.clone(),
            created_at: now_unix(),
        };
        inner.nodes.insert(member_id.clone(), node.clone());
        if let Some(referrer) = &referrer_id {
            inner
                .children
                .entry(referrer.clone())
                .or_default()
                .push(member_id.clone());
        }
        inner.subtree_memo.clear();

        info!(
            "registered member {} (referrer: {})",
            member_id,
            referrer_id.as_ref().map(|r| r.as_str()).unwrap_or("none")
        );
        Ok(node)
    }

    /// Look up one node.
    pub async fn node(&self, member_id: &MemberId) -> ReferralResult<ReferralNode> {
        self.inner
            .read()
            .await
            .nodes
            .get(member_id)
            .cloned()
            .ok_or_else(|| ReferralError::UnknownMember(member_id.clone()))
    }

    /// Whether a member is registered.
    pub async fn contains(&self, member_id: &MemberId) -> bool {
        self.inner.read().await.nodes.contains_key(member_id)
    }

    /// Ancestor chain of a member, closest first, at most `max_levels` long.
    ///
    /// Terminates early at a root. Level 1 is the direct referrer.
    pub async fn ancestors(
        &self,
        member_id: &MemberId,
        max_levels: u32,
    ) -> ReferralResult<Vec<(u32, ReferralNode)>> {
        let inner = self.inner.read().await;
        let start = inner
            .nodes
            .get(member_id)
            .ok_or_else(|| ReferralError::UnknownMember(member_id.clone()))?;

        let mut chain = Vec::new();
        let mut current = start.referrer_id.clone();
        let mut level = 0u32;
        while let Some(referrer) = current {
            if level >= max_levels {
                break;
            }
            if level >= MAX_ANCESTOR_HOPS {
                return Err(ReferralError::HopBoundExceeded(member_id.clone()));
            }
            let node = inner
                .nodes
                .get(&referrer)
                .ok_or_else(|| ReferralError::UnknownMember(referrer.clone()))?;
            level += 1;
            chain.push((level, node.clone()));
            current = node.referrer_id.clone();
        }
        Ok(chain)
    }

    /// Start a resumable descendant walk at a member.
    pub async fn descendant_cursor(
        &self,
        member_id: &MemberId,
    ) -> ReferralResult<DescendantCursor> {
        if !self.contains(member_id).await {
            return Err(ReferralError::UnknownMember(member_id.clone()));
        }
        Ok(DescendantCursor {
            frontier: vec![member_id.clone()],
            next_level: 1,
        })
    }

    /// Expand one breadth-first level of a descendant walk.
    ///
    /// Each call is independent: the cursor carries the whole frontier, so a
    /// caller can resume after arbitrary delay (inserts made in between are
    /// picked up, since children lists only grow).
    pub async fn descendants_page(
        &self,
        cursor: &DescendantCursor,
    ) -> ReferralResult<DescendantsPage> {
        let inner = self.inner.read().await;
        let mut nodes = Vec::new();
        for parent in &cursor.frontier {
            if let Some(children) = inner.children.get(parent) {
                for child in children {
                    let node = inner
                        .nodes
                        .get(child)
                        .ok_or_else(|| ReferralError::UnknownMember(child.clone()))?;
                    nodes.push(node.clone());
                }
            }
        }

        let next = if nodes.is_empty() {
            None
        } else {
            Some(DescendantCursor {
                frontier: nodes.iter().map(|n| n.member_id.clone()).collect(),
                next_level: cursor.next_level + 1,
            })
        };
        Ok(DescendantsPage {
            level: cursor.next_level,
            nodes,
            cursor: next,
        })
    }

    /// All descendants down to `max_depth`, breadth-first, as (level, node).
    pub async fn descendants(
        &self,
        member_id: &MemberId,
        max_depth: u32,
    ) -> ReferralResult<Vec<(u32, ReferralNode)>> {
        let mut result = Vec::new();
        let mut cursor = self.descendant_cursor(member_id).await?;
        while cursor.next_level <= max_depth {
            let page = self.descendants_page(&cursor).await?;
            for node in &page.nodes {
                result.push((page.level, node.clone()));
            }
            match page.cursor {
                Some(next) => cursor = next,
                None => break,
            }
        }
        Ok(result)
    }

    /// Number of members directly referred by this member.
    pub async fn direct_children_count(&self, member_id: &MemberId) -> ReferralResult<usize> {
        let inner = self.inner.read().await;
        if !inner.nodes.contains_key(member_id) {
            return Err(ReferralError::UnknownMember(member_id.clone()));
        }
        Ok(inner.children.get(member_id).map(Vec::len).unwrap_or(0))
    }

    /// Total descendants of this member (the whole downline).
    ///
    /// Memoized; the memo is cleared on every insert so it can never report
    /// a stale count.
    pub async fn subtree_size(&self, member_id: &MemberId) -> ReferralResult<u64> {
        {
            let inner = self.inner.read().await;
            if !inner.nodes.contains_key(member_id) {
                return Err(ReferralError::UnknownMember(member_id.clone()));
            }
            if let Some(&size) = inner.subtree_memo.get(member_id) {
                debug!("subtree_size memo hit for {}: {}", member_id, size);
                return Ok(size);
            }
        }

        let mut inner = self.inner.write().await;
        // Iterative walk; the forest is acyclic by construction.
        let mut size = 0u64;
        let mut stack = vec![member_id.clone()];
        while let Some(member) = stack.pop() {
            if let Some(children) = inner.children.get(&member) {
                size += children.len() as u64;
                stack.extend(children.iter().cloned());
            }
        }
        inner.subtree_memo.insert(member_id.clone(), size);
        Ok(size)
    }

    /// Number of registered members.
    pub async fn len(&self) -> usize {
        self.inner.read().await.nodes.len()
    }

    /// Whether the forest is empty.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(id: &str) -> MemberId {
        MemberId::new(id)
    }

    /// Build the M1 <- M2 <- M3 chain used across the engine tests.
    async fn chain() -> ReferralGraph {
        let graph = ReferralGraph::new();
        graph.insert(m("M1"), None).await.unwrap();
        graph.insert(m("M2"), Some(m("M1"))).await.unwrap();
        graph.insert(m("M3"), Some(m("M2"))).await.unwrap();
        graph
    }

    #[tokio::test]
    async fn test_insert_root_and_children() {
        let graph = chain().await;
        assert_eq!(graph.len().await, 3);
        assert!(graph.node(&m("M1")).await.unwrap().is_root());
        assert_eq!(
            graph.node(&m("M3")).await.unwrap().referrer_id,
            Some(m("M2"))
        );
    }

    #[tokio::test]
    async fn test_duplicate_member_rejected() {
        let graph = chain().await;
        let err = graph.insert(m("M2"), None).await.unwrap_err();
        assert_eq!(err, ReferralError::DuplicateMember(m("M2")));
    }

    #[tokio::test]
    async fn test_unknown_referrer_rejected() {
        let graph = ReferralGraph::new();
        let err = graph.insert(m("A"), Some(m("ghost"))).await.unwrap_err();
        assert_eq!(err, ReferralError::UnknownReferrer(m("ghost")));
    }

    #[tokio::test]
    async fn test_reparenting_into_cycle_rejected() {
        // A <- B, then "A referred by B" would make A its own ancestor.
        let graph = ReferralGraph::new();
        graph.insert(m("A"), None).await.unwrap();
        graph.insert(m("B"), Some(m("A"))).await.unwrap();

        let err = graph.insert(m("A"), Some(m("B"))).await.unwrap_err();
        assert!(matches!(err, ReferralError::CycleDetected { .. }));
    }

    #[tokio::test]
    async fn test_reparenting_without_cycle_still_rejected() {
        let graph = chain().await;
        graph.insert(m("X"), None).await.unwrap();
        // M3 exists; X is unrelated, so no cycle — immutability alone rejects.
        let err = graph.insert(m("M3"), Some(m("X"))).await.unwrap_err();
        assert_eq!(err, ReferralError::DuplicateMember(m("M3")));
    }

    #[tokio::test]
    async fn test_self_referral_rejected() {
        let graph = chain().await;
        let err = graph.insert(m("M1"), Some(m("M1"))).await.unwrap_err();
        assert!(matches!(err, ReferralError::CycleDetected { .. }));
    }

    #[tokio::test]
    async fn test_ancestors_closest_first() {
        let graph = chain().await;
        let chain = graph.ancestors(&m("M3"), 10).await.unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].0, 1);
        assert_eq!(chain[0].1.member_id, m("M2"));
        assert_eq!(chain[1].0, 2);
        assert_eq!(chain[1].1.member_id, m("M1"));
    }

    #[tokio::test]
    async fn test_ancestors_respects_max_levels() {
        let graph = chain().await;
        let chain = graph.ancestors(&m("M3"), 1).await.unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].1.member_id, m("M2"));
    }

    #[tokio::test]
    async fn test_ancestors_never_contains_self() {
        let graph = chain().await;
        for id in ["M1", "M2", "M3"] {
            let chain = graph.ancestors(&m(id), u32::MAX).await.unwrap();
            assert!(chain.iter().all(|(_, node)| node.member_id != m(id)));
        }
    }

    #[tokio::test]
    async fn test_descendants_breadth_first() {
        let graph = chain().await;
        graph.insert(m("M2b"), Some(m("M1"))).await.unwrap();

        let all = graph.descendants(&m("M1"), 10).await.unwrap();
        let levels: Vec<u32> = all.iter().map(|(l, _)| *l).collect();
        assert_eq!(levels, vec![1, 1, 2]);
        assert_eq!(all[0].1.member_id, m("M2"));
        assert_eq!(all[1].1.member_id, m("M2b"));
        assert_eq!(all[2].1.member_id, m("M3"));
    }

    #[tokio::test]
    async fn test_descendants_page_resumable() {
        let graph = chain().await;
        let cursor = graph.descendant_cursor(&m("M1")).await.unwrap();

        // Round-trip the cursor through JSON, as a UI layer would.
        let json = serde_json::to_string(&cursor).unwrap();
        let cursor: DescendantCursor = serde_json::from_str(&json).unwrap();

        let level1 = graph.descendants_page(&cursor).await.unwrap();
        assert_eq!(level1.level, 1);
        assert_eq!(level1.nodes.len(), 1);

        // Insert a grandchild sibling between pages; the resumed walk sees it.
        graph.insert(m("M3b"), Some(m("M2"))).await.unwrap();

        let level2 = graph
            .descendants_page(&level1.cursor.unwrap())
            .await
            .unwrap();
        assert_eq!(level2.level, 2);
        assert_eq!(level2.nodes.len(), 2);

        let level3 = graph
            .descendants_page(&level2.cursor.unwrap())
            .await
            .unwrap();
        assert!(level3.nodes.is_empty());
        assert!(level3.cursor.is_none());
    }

    #[tokio::test]
    async fn test_descendants_max_depth() {
        let graph = chain().await;
        let only_direct = graph.descendants(&m("M1"), 1).await.unwrap();
        assert_eq!(only_direct.len(), 1);
        assert_eq!(only_direct[0].1.member_id, m("M2"));
    }

    #[tokio::test]
    async fn test_counts_and_memo_invalidation() {
        let graph = chain().await;
        assert_eq!(graph.direct_children_count(&m("M1")).await.unwrap(), 1);
        assert_eq!(graph.subtree_size(&m("M1")).await.unwrap(), 2);
        // Memo hit path.
        assert_eq!(graph.subtree_size(&m("M1")).await.unwrap(), 2);

        // Insert must invalidate the memo.
        graph.insert(m("M4"), Some(m("M3"))).await.unwrap();
        assert_eq!(graph.subtree_size(&m("M1")).await.unwrap(), 3);
        assert_eq!(graph.subtree_size(&m("M3")).await.unwrap(), 1);
        assert_eq!(graph.direct_children_count(&m("M3")).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unknown_member_queries() {
        let graph = ReferralGraph::new();
        assert!(graph.ancestors(&m("nope"), 5).await.is_err());
        assert!(graph.subtree_size(&m("nope")).await.is_err());
        assert!(graph.descendant_cursor(&m("nope")).await.is_err());
    }
}
