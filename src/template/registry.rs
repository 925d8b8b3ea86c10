//! Block registry for one render of an inheritance chain

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

use super::block::BlockNode;

/// Blocks declared by one template, keyed by name
pub type BlockMap = BTreeMap<String, Arc<BlockNode>>;

/// Per-name queues of candidate block definitions.
///
/// Each queue runs from the most general definition (front, from the root
/// template) to the most specific one (back, from the leaf). Definitions are
/// registered leaf first, so registering prepends.
#[derive(Debug, Clone, Default)]
pub struct BlockContext {
    blocks: HashMap<String, VecDeque<Arc<BlockNode>>>,
}

impl BlockContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a template's blocks as more general than everything registered so far
    pub fn add_blocks(&mut self, blocks: &BlockMap) {
        for (name, block) in blocks {
            self.blocks
                .entry(name.clone())
                .or_default()
                .push_front(Arc::clone(block));
        }
    }

    /// Remove and return the most specific remaining definition
    pub fn pop(&mut self, name: &str) -> Option<Arc<BlockNode>> {
        self.blocks.get_mut(name).and_then(VecDeque::pop_back)
    }

    /// Return a definition to the most specific position
    pub fn push(&mut self, name: &str, block: Arc<BlockNode>) {
        self.blocks
            .entry(name.to_string())
            .or_default()
            .push_back(block);
    }

    /// Peek at the most specific remaining definition
    pub fn get_block(&self, name: &str) -> Option<&Arc<BlockNode>> {
        self.blocks.get(name).and_then(VecDeque::back)
    }

    /// Number of definitions queued under a name
    pub fn depth(&self, name: &str) -> usize {
        self.blocks.get(name).map_or(0, VecDeque::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::NodeList;

    fn block(name: &str, marker: &str) -> Arc<BlockNode> {
        Arc::new(BlockNode::new(name, NodeList::text(marker)))
    }

    fn map(blocks: &[Arc<BlockNode>]) -> BlockMap {
        blocks
            .iter()
            .map(|b| (b.name.clone(), Arc::clone(b)))
            .collect()
    }

    #[test]
    fn test_leaf_first_registration_orders_general_to_specific() {
        let leaf = block("content", "leaf");
        let middle = block("content", "middle");
        let root = block("content", "root");

        let mut ctx = BlockContext::new();
        ctx.add_blocks(&map(&[leaf.clone()]));
        ctx.add_blocks(&map(&[middle.clone()]));
        ctx.add_blocks(&map(&[root.clone()]));

        assert!(Arc::ptr_eq(ctx.get_block("content").unwrap(), &leaf));
        assert!(Arc::ptr_eq(&ctx.pop("content").unwrap(), &leaf));
        assert!(Arc::ptr_eq(&ctx.pop("content").unwrap(), &middle));
        assert!(Arc::ptr_eq(&ctx.pop("content").unwrap(), &root));
        assert!(ctx.pop("content").is_none());
    }

    #[test]
    fn test_pop_then_push_restores_state() {
        let a = block("title", "a");
        let b = block("title", "b");
        let mut ctx = BlockContext::new();
        ctx.add_blocks(&map(&[a.clone()]));
        ctx.add_blocks(&map(&[b]));

        let popped = ctx.pop("title").unwrap();
        assert_eq!(ctx.depth("title"), 1);
        ctx.push("title", popped);
        assert_eq!(ctx.depth("title"), 2);
        assert!(Arc::ptr_eq(ctx.get_block("title").unwrap(), &a));
    }

    #[test]
    fn test_unknown_name() {
        let mut ctx = BlockContext::new();
        assert!(ctx.get_block("missing").is_none());
        assert!(ctx.pop("missing").is_none());
        assert_eq!(ctx.depth("missing"), 0);
    }
}
