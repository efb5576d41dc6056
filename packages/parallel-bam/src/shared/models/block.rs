//! Block descriptors and the block partition
//!
//! A [`Block`] is an immutable program region with designated entry ("call")
//! and exit ("return") locations. Blocks are produced once by the
//! partitioning step and shared as `Arc<Block>`; identity is the [`BlockId`].

use crate::errors::{BamError, BamResult};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Program location (CFA node) identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Location(pub u32);

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "N{}", self.0)
    }
}

/// Block identifier (assigned by the partitioning step)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(pub u32);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "B{}", self.0)
    }
}

/// Immutable region descriptor
///
/// Equality and hashing only look at [`BlockId`]: two blocks with the same id
/// are the same block, whatever their node sets.
#[derive(Debug, Clone)]
pub struct Block {
    id: BlockId,
    /// All locations inside the block (entry and exit nodes included)
    nodes: FxHashSet<Location>,
    /// Entry locations
    call_nodes: BTreeSet<Location>,
    /// Exit locations
    return_nodes: BTreeSet<Location>,
}

impl Block {
    pub fn new(
        id: BlockId,
        call_nodes: impl IntoIterator<Item = Location>,
        return_nodes: impl IntoIterator<Item = Location>,
        inner_nodes: impl IntoIterator<Item = Location>,
    ) -> Self {
        let call_nodes: BTreeSet<Location> = call_nodes.into_iter().collect();
        let return_nodes: BTreeSet<Location> = return_nodes.into_iter().collect();

        let mut nodes: FxHashSet<Location> = inner_nodes.into_iter().collect();
        nodes.extend(call_nodes.iter().copied());
        nodes.extend(return_nodes.iter().copied());

        Self {
            id,
            nodes,
            call_nodes,
            return_nodes,
        }
    }

    pub fn id(&self) -> BlockId {
        self.id
    }

    pub fn call_nodes(&self) -> &BTreeSet<Location> {
        &self.call_nodes
    }

    pub fn return_nodes(&self) -> &BTreeSet<Location> {
        &self.return_nodes
    }

    pub fn nodes(&self) -> &FxHashSet<Location> {
        &self.nodes
    }

    /// Lowest entry location (blocks in practice have exactly one)
    pub fn entry(&self) -> Option<Location> {
        self.call_nodes.iter().next().copied()
    }

    pub fn is_call_node(&self, location: Location) -> bool {
        self.call_nodes.contains(&location)
    }

    pub fn is_return_node(&self, location: Location) -> bool {
        self.return_nodes.contains(&location)
    }

    pub fn contains(&self, location: Location) -> bool {
        self.nodes.contains(&location)
    }
}

impl PartialEq for Block {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Block {}

impl Hash for Block {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Output of the block-partitioning step
///
/// The main block is kept out of the call-node index: the main reached set
/// starts at its entry without a block call.
#[derive(Debug, Clone)]
pub struct BlockPartition {
    main: Arc<Block>,
    blocks: FxHashMap<BlockId, Arc<Block>>,
    by_call_node: FxHashMap<Location, Arc<Block>>,
}

impl BlockPartition {
    pub fn builder(main: Block) -> BlockPartitionBuilder {
        BlockPartitionBuilder {
            main,
            blocks: Vec::new(),
        }
    }

    pub fn main_block(&self) -> &Arc<Block> {
        &self.main
    }

    pub fn block(&self, id: BlockId) -> Option<&Arc<Block>> {
        self.blocks.get(&id)
    }

    /// Block entered at `location`, if `location` is a block entry
    pub fn block_for_call_node(&self, location: Location) -> Option<&Arc<Block>> {
        self.by_call_node.get(&location)
    }

    pub fn is_call_node(&self, location: Location) -> bool {
        self.by_call_node.contains_key(&location)
    }

    /// All blocks, main block included
    pub fn blocks(&self) -> impl Iterator<Item = &Arc<Block>> {
        self.blocks.values()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// Builder for [`BlockPartition`]
pub struct BlockPartitionBuilder {
    main: Block,
    blocks: Vec<Block>,
}

impl BlockPartitionBuilder {
    pub fn block(mut self, block: Block) -> Self {
        self.blocks.push(block);
        self
    }

    /// Validate and freeze the partition
    ///
    /// Rejects duplicate block ids and call nodes claimed by two blocks.
    pub fn build(self) -> BamResult<BlockPartition> {
        let main = Arc::new(self.main);
        let mut blocks = FxHashMap::default();
        let mut by_call_node: FxHashMap<Location, Arc<Block>> = FxHashMap::default();

        blocks.insert(main.id(), Arc::clone(&main));

        for block in self.blocks {
            let block = Arc::new(block);
            if blocks.insert(block.id(), Arc::clone(&block)).is_some() {
                return Err(BamError::InvalidPartition(format!(
                    "duplicate block id {}",
                    block.id()
                )));
            }

            for &node in block.call_nodes() {
                if let Some(existing) = by_call_node.insert(node, Arc::clone(&block)) {
                    return Err(BamError::InvalidPartition(format!(
                        "call node {} claimed by {} and {}",
                        node,
                        existing.id(),
                        block.id()
                    )));
                }
            }
        }

        Ok(BlockPartition {
            main,
            blocks,
            by_call_node,
        })
    }
}
