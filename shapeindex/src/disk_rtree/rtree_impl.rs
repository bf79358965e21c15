//! DiskRTree implementation.

use std::collections::{HashSet, VecDeque};
use std::path::Path;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::bounding_box::BoundingBox;
use crate::config::RTreeConfig;
use crate::errors::{SpatialError, SpatialResult};
use crate::record_pointer::RecordPointer;
use crate::spatial_index::SpatialIndex;

use super::page_store::PageStore;
use super::rtree_cache::NodeCache;
use super::rtree_constants::NO_PAGE;
use super::rtree_types::{
    ChildRef, IntegrityReport, LeafEntry, Node, PageId, PageKind, RTreeStats, TreeState,
};
use super::split::split;

/// A height-balanced R-Tree whose nodes live in the pages of one file.
///
/// Nodes reference each other by page number only and are read on demand.
/// Mutations are serialized internally; readers are not isolated from a
/// concurrent writer and may observe a tree in the middle of an update.
pub struct DiskRTree {
    inner: Arc<DiskRTreeInner>,
}

struct DiskRTreeInner {
    store: PageStore,
    config: RTreeConfig,
    cache: Mutex<NodeCache>,
    /// Held for the whole of an insert or delete
    writer: Mutex<()>,
    /// Is the tree closed?
    closed: RwLock<bool>,
}

impl DiskRTreeInner {
    fn check_closed(&self) -> SpatialResult<()> {
        if *self.closed.read() {
            Err(SpatialError::Closed)
        } else {
            Ok(())
        }
    }

    /// Reads a node from the cache, or from disk on a miss.
    fn read_node(&self, page_id: PageId) -> SpatialResult<Node> {
        if let Some(node) = self.cache.lock().get(page_id) {
            return Ok(node);
        }

        let page = self.store.read_page(page_id)?;
        if page.kind == PageKind::Free {
            return Err(SpatialError::Corruption(format!(
                "page {} is referenced by the tree but is free",
                page_id
            )));
        }
        let node = Node::decode(page_id, page.kind, &page.payload)?;
        self.cache.lock().put(page_id, node.clone());
        Ok(node)
    }

    /// Writes a node through to disk and refreshes its cached copy.
    fn write_node(&self, page_id: PageId, node: &Node) -> SpatialResult<()> {
        let payload = node.encode()?;
        self.store.write_page(page_id, node.page_kind(), &payload)?;
        self.cache.lock().put(page_id, node.clone());
        Ok(())
    }

    fn free_node(&self, page_id: PageId) -> SpatialResult<()> {
        self.cache.lock().remove(page_id);
        self.store.free_page(page_id)
    }
}

impl DiskRTree {
    /// Creates an empty tree in a new file. Fails if the file exists.
    pub fn create(path: impl AsRef<Path>, config: RTreeConfig) -> SpatialResult<Self> {
        let store = PageStore::create(path, config.page_definition())?;
        Ok(Self::with_store(store, config))
    }

    /// Opens a tree written with the same page layout as `config`.
    pub fn open(path: impl AsRef<Path>, config: RTreeConfig) -> SpatialResult<Self> {
        let store = PageStore::open(path, config.page_definition())?;
        Ok(Self::with_store(store, config))
    }

    /// Opens the tree if the file holds one, creates an empty one otherwise.
    pub fn open_or_create(path: impl AsRef<Path>, config: RTreeConfig) -> SpatialResult<Self> {
        let store = PageStore::open_or_create(path, config.page_definition())?;
        Ok(Self::with_store(store, config))
    }

    fn with_store(store: PageStore, config: RTreeConfig) -> Self {
        DiskRTree {
            inner: Arc::new(DiskRTreeInner {
                store,
                cache: Mutex::new(NodeCache::new(config.cache_pages())),
                config,
                writer: Mutex::new(()),
                closed: RwLock::new(false),
            }),
        }
    }

    fn check_closed(&self) -> SpatialResult<()> {
        self.inner.check_closed()
    }

    pub fn config(&self) -> &RTreeConfig {
        &self.inner.config
    }

    pub fn path(&self) -> &Path {
        self.inner.store.path()
    }

    /// Number of entries in the tree
    pub fn len(&self) -> u64 {
        self.inner.store.tree_state().entry_count
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of node levels; zero for an empty tree.
    pub fn height(&self) -> u32 {
        self.inner.store.tree_state().height
    }

    pub fn is_closed(&self) -> bool {
        *self.inner.closed.read()
    }

    /// Box covering every entry, `None` for an empty tree.
    pub fn bounds(&self) -> SpatialResult<Option<BoundingBox>> {
        self.check_closed()?;
        let root = self.inner.store.tree_state().root_page;
        if root == NO_PAGE {
            return Ok(None);
        }
        let node = self.inner.read_node(root)?;
        Ok((!node.is_empty()).then(|| node.compute_bbox()))
    }

    /// Get comprehensive statistics
    pub fn stats(&self) -> RTreeStats {
        let state = self.inner.store.tree_state();
        let store = self.inner.store.stats();
        let cache = self.inner.cache.lock();

        RTreeStats {
            total_entries: state.entry_count,
            tree_height: state.height,
            page_size: store.page_size,
            allocated_pages: store.allocated_pages,
            free_pages: store.free_pages,
            cached_pages: cache.len() as u64,
            cache_hits: cache.hits(),
            cache_misses: cache.misses(),
            disk_reads: store.disk_reads,
            disk_writes: store.disk_writes,
        }
    }

    /// Adds an entry. The box is validated before anything is written.
    pub fn insert(&self, bbox: &BoundingBox, pointer: RecordPointer) -> SpatialResult<()> {
        self.check_closed()?;
        bbox.validate()?;
        let _writer = self.inner.writer.lock();

        let mut state = self.inner.store.tree_state();
        self.place(&mut state, LeafEntry { bbox: *bbox, pointer })?;
        state.entry_count += 1;
        self.inner.store.set_tree_state(state);
        Ok(())
    }

    /// Removes the entry matching both box and pointer exactly.
    ///
    /// Returns false if no such entry exists. Nodes left under the minimum
    /// fill are dissolved and their entries inserted again.
    pub fn delete(&self, bbox: &BoundingBox, pointer: RecordPointer) -> SpatialResult<bool> {
        self.check_closed()?;
        bbox.validate()?;
        let _writer = self.inner.writer.lock();

        let mut state = self.inner.store.tree_state();
        if state.root_page == NO_PAGE {
            return Ok(false);
        }

        let mut path = Vec::new();
        let leaf_id = match self.find_leaf(state.root_page, bbox, pointer, &mut path)? {
            Some(leaf_id) => leaf_id,
            None => return Ok(false),
        };

        let mut leaf = self.inner.read_node(leaf_id)?;
        if let Node::Leaf { entries } = &mut leaf {
            if let Some(pos) = entries
                .iter()
                .position(|e| e.bbox == *bbox && e.pointer == pointer)
            {
                entries.remove(pos);
            }
        }

        state.entry_count = state.entry_count.saturating_sub(1);
        self.condense_tree(&mut state, leaf_id, leaf, &path)?;
        self.inner.store.set_tree_state(state);
        Ok(true)
    }

    /// Lazily yields the pointers of all entries whose box overlaps `query`.
    ///
    /// Each call walks the tree anew; pages are read as the cursor advances.
    pub fn intersects(&self, query: &BoundingBox) -> SpatialResult<TreeCursor> {
        self.cursor(query, QueryMode::Intersects)
    }

    /// Lazily yields the pointers of all entries lying inside `query`.
    pub fn contained(&self, query: &BoundingBox) -> SpatialResult<TreeCursor> {
        self.cursor(query, QueryMode::Contained)
    }

    fn cursor(&self, query: &BoundingBox, mode: QueryMode) -> SpatialResult<TreeCursor> {
        self.check_closed()?;
        query.validate()?;
        let root = self.inner.store.tree_state().root_page;
        Ok(TreeCursor {
            inner: self.inner.clone(),
            query: *query,
            mode,
            stack: if root == NO_PAGE { Vec::new() } else { vec![root] },
            pending: VecDeque::new(),
            done: false,
        })
    }

    /// Writes buffered header state and syncs the file.
    pub fn flush(&self) -> SpatialResult<()> {
        self.check_closed()?;
        self.inner.store.flush()
    }

    /// Flushes and closes the tree. Calling it again is a no-op.
    ///
    /// The tree counts as closed even if the final flush fails.
    pub fn close(&self) -> SpatialResult<()> {
        let _writer = self.inner.writer.lock();
        let mut closed = self.inner.closed.write();
        if *closed {
            return Ok(());
        }
        *closed = true;

        self.inner.cache.lock().clear();
        self.inner.store.close()
    }

    /// Walks the whole tree and the free list and reports every structural
    /// problem found.
    ///
    /// Checks fill bounds, parent box containment, levels, the entry count
    /// and that every allocated page is either reachable or free.
    pub fn check_integrity(&self) -> SpatialResult<IntegrityReport> {
        self.check_closed()?;
        let _writer = self.inner.writer.lock();

        let state = self.inner.store.tree_state();
        let free = self.inner.store.free_page_ids();
        let next_page_id = self.inner.store.next_page_id();

        let mut report = IntegrityReport::default();
        let mut reachable = HashSet::new();

        if state.root_page != NO_PAGE {
            if state.height == 0 {
                report
                    .errors
                    .push(format!("root {} recorded with height 0", state.root_page));
            } else {
                self.verify_subtree(
                    state.root_page,
                    state.height - 1,
                    None,
                    &free,
                    &mut reachable,
                    &mut report,
                );
            }
        } else if state.height != 0 {
            report
                .errors
                .push(format!("empty tree recorded with height {}", state.height));
        }

        if report.leaf_entries != state.entry_count {
            report.errors.push(format!(
                "tree holds {} entries, header records {}",
                report.leaf_entries, state.entry_count
            ));
        }

        for &page_id in &free {
            report.pages_checked += 1;
            match self.inner.store.read_page(page_id) {
                Ok(page) if page.kind == PageKind::Free => {}
                Ok(page) => report.errors.push(format!(
                    "free page {} holds a {:?} page",
                    page_id, page.kind
                )),
                Err(e) => report.errors.push(format!("free page {}: {}", page_id, e)),
            }
        }

        report.reachable_pages = reachable.len() as u64;
        report.free_pages = free.len() as u64;
        report.orphaned_pages = (1..next_page_id)
            .filter(|p| !reachable.contains(p) && !free.contains(p))
            .collect();
        Ok(report)
    }

    // ------------------------------------------------------------------------
    // Insertion
    // ------------------------------------------------------------------------

    /// Puts an entry into a leaf, growing the tree as needed. Leaves the
    /// entry count alone so reinsertion can use it too.
    fn place(&self, state: &mut TreeState, entry: LeafEntry) -> SpatialResult<()> {
        if state.root_page == NO_PAGE {
            let page_id = self.inner.store.allocate_page()?;
            self.inner.write_node(
                page_id,
                &Node::Leaf {
                    entries: vec![entry],
                },
            )?;
            state.root_page = page_id;
            state.height = 1;
            return Ok(());
        }

        let mut path = Vec::new();
        let leaf_id = self.choose_leaf(state.root_page, &entry.bbox, &mut path)?;

        let mut leaf = self.inner.read_node(leaf_id)?;
        let overflow = match &mut leaf {
            Node::Leaf { entries } => {
                entries.push(entry);
                if entries.len() > self.inner.config.max_entries() {
                    let (keep, moved) = split(
                        self.inner.config.split_algorithm(),
                        std::mem::take(entries),
                        self.inner.config.min_entries(),
                    );
                    *entries = keep;
                    Some(Node::Leaf { entries: moved })
                } else {
                    None
                }
            }
            Node::Internal { .. } => {
                return Err(SpatialError::Corruption(format!(
                    "descent ended on internal page {}",
                    leaf_id
                )))
            }
        };

        self.inner.write_node(leaf_id, &leaf)?;
        let sibling = match overflow {
            Some(node) => Some(self.write_sibling(leaf_id, node)?),
            None => None,
        };
        self.adjust_tree(state, &path, leaf.compute_bbox(), sibling)
    }

    /// Choose the best leaf node for insertion: least enlargement, then
    /// least area.
    fn choose_leaf(
        &self,
        page_id: PageId,
        bbox: &BoundingBox,
        path: &mut Vec<(PageId, usize)>,
    ) -> SpatialResult<PageId> {
        let node = self.inner.read_node(page_id)?;

        match node {
            Node::Leaf { .. } => Ok(page_id),
            Node::Internal { children, .. } => {
                if children.is_empty() {
                    return Err(SpatialError::Corruption(format!(
                        "internal page {} has no children",
                        page_id
                    )));
                }

                let mut best_idx = 0;
                let mut best_enlargement = f64::INFINITY;
                let mut best_area = f64::INFINITY;

                for (i, child) in children.iter().enumerate() {
                    let enlargement = child.bbox.enlargement(bbox);
                    let area = child.bbox.area();

                    if enlargement < best_enlargement
                        || (enlargement == best_enlargement && area < best_area)
                    {
                        best_enlargement = enlargement;
                        best_area = area;
                        best_idx = i;
                    }
                }

                path.push((page_id, best_idx));
                self.choose_leaf(children[best_idx].page_id, bbox, path)
            }
        }
    }

    fn write_sibling(&self, split_page: PageId, node: Node) -> SpatialResult<ChildRef> {
        let page_id = self.inner.store.allocate_page()?;
        self.inner.write_node(page_id, &node)?;
        log::debug!(
            "Split page {} into {} (level {}, {} entries moved)",
            split_page,
            page_id,
            node.level(),
            node.len()
        );
        Ok(ChildRef {
            bbox: node.compute_bbox(),
            page_id,
        })
    }

    /// Walks the insertion path upwards, refreshing the box of the child
    /// that changed and linking in the sibling of a split. Grows a new root
    /// if the split reaches the top.
    fn adjust_tree(
        &self,
        state: &mut TreeState,
        path: &[(PageId, usize)],
        mut child_bbox: BoundingBox,
        mut sibling: Option<ChildRef>,
    ) -> SpatialResult<()> {
        for &(parent_id, child_idx) in path.iter().rev() {
            let mut parent = self.inner.read_node(parent_id)?;

            let overflow = match &mut parent {
                Node::Internal { children, level } => {
                    let slot = children.get_mut(child_idx).ok_or_else(|| {
                        SpatialError::Corruption(format!(
                            "page {} has no child slot {}",
                            parent_id, child_idx
                        ))
                    })?;
                    if sibling.is_none() && slot.bbox == child_bbox {
                        // nothing above this level changes
                        return Ok(());
                    }
                    slot.bbox = child_bbox;

                    if let Some(new_child) = sibling.take() {
                        children.push(new_child);
                    }
                    if children.len() > self.inner.config.max_entries() {
                        let (keep, moved) = split(
                            self.inner.config.split_algorithm(),
                            std::mem::take(children),
                            self.inner.config.min_entries(),
                        );
                        *children = keep;
                        Some(Node::Internal {
                            children: moved,
                            level: *level,
                        })
                    } else {
                        None
                    }
                }
                Node::Leaf { .. } => {
                    return Err(SpatialError::Corruption(format!(
                        "leaf page {} found on an insertion path",
                        parent_id
                    )))
                }
            };

            self.inner.write_node(parent_id, &parent)?;
            if let Some(node) = overflow {
                sibling = Some(self.write_sibling(parent_id, node)?);
            }
            child_bbox = parent.compute_bbox();
        }

        if let Some(new_child) = sibling {
            let new_root = Node::Internal {
                children: vec![
                    ChildRef {
                        bbox: child_bbox,
                        page_id: state.root_page,
                    },
                    new_child,
                ],
                level: state.height,
            };
            let root_id = self.inner.store.allocate_page()?;
            self.inner.write_node(root_id, &new_root)?;

            log::debug!(
                "Root split, new root {} at height {}",
                root_id,
                state.height + 1
            );
            state.root_page = root_id;
            state.height += 1;
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Deletion
    // ------------------------------------------------------------------------

    /// Finds the leaf holding the exact entry, recording the path to it.
    fn find_leaf(
        &self,
        page_id: PageId,
        bbox: &BoundingBox,
        pointer: RecordPointer,
        path: &mut Vec<(PageId, usize)>,
    ) -> SpatialResult<Option<PageId>> {
        let node = self.inner.read_node(page_id)?;

        match node {
            Node::Leaf { entries } => Ok(entries
                .iter()
                .any(|e| e.bbox == *bbox && e.pointer == pointer)
                .then_some(page_id)),
            Node::Internal { children, .. } => {
                for (i, child) in children.iter().enumerate() {
                    if child.bbox.contains(bbox) {
                        path.push((page_id, i));
                        if let Some(found) = self.find_leaf(child.page_id, bbox, pointer, path)? {
                            return Ok(Some(found));
                        }
                        path.pop();
                    }
                }
                Ok(None)
            }
        }
    }

    /// Dissolves underfull nodes along `path`, shrinks ancestor boxes,
    /// collapses the root and reinserts the entries of dissolved nodes.
    fn condense_tree(
        &self,
        state: &mut TreeState,
        leaf_id: PageId,
        leaf: Node,
        path: &[(PageId, usize)],
    ) -> SpatialResult<()> {
        let min_entries = self.inner.config.min_entries();
        let mut orphans = Vec::new();
        let mut dissolved = 0usize;

        let mut node_id = leaf_id;
        let mut node = leaf;
        for &(parent_id, child_idx) in path.iter().rev() {
            let mut parent = self.inner.read_node(parent_id)?;
            let children = match &mut parent {
                Node::Internal { children, .. } if child_idx < children.len() => children,
                _ => {
                    return Err(SpatialError::Corruption(format!(
                        "page {} has no child slot {}",
                        parent_id, child_idx
                    )))
                }
            };

            if node.len() < min_entries {
                children.remove(child_idx);
                self.dissolve(node_id, node, &mut orphans)?;
                dissolved += 1;
            } else {
                self.inner.write_node(node_id, &node)?;
                children[child_idx].bbox = node.compute_bbox();
            }

            node_id = parent_id;
            node = parent;
        }

        // node is the root now
        self.inner.write_node(node_id, &node)?;
        self.collapse_root(state, node_id, node)?;

        if !orphans.is_empty() {
            log::debug!(
                "Condensed {} nodes, reinserting {} entries",
                dissolved,
                orphans.len()
            );
        }
        for entry in orphans {
            self.place(state, entry)?;
        }
        Ok(())
    }

    /// Frees every page of the subtree at `page_id`, collecting its leaf
    /// entries.
    fn dissolve(
        &self,
        page_id: PageId,
        node: Node,
        orphans: &mut Vec<LeafEntry>,
    ) -> SpatialResult<()> {
        match node {
            Node::Leaf { entries } => orphans.extend(entries),
            Node::Internal { children, .. } => {
                for child in children {
                    let child_node = self.inner.read_node(child.page_id)?;
                    self.dissolve(child.page_id, child_node, orphans)?;
                }
            }
        }
        self.inner.free_node(page_id)
    }

    /// Replaces a root with a single child by that child, and drops an
    /// empty root altogether.
    fn collapse_root(
        &self,
        state: &mut TreeState,
        mut root_id: PageId,
        mut root: Node,
    ) -> SpatialResult<()> {
        loop {
            match &root {
                Node::Internal { children, .. } if children.len() == 1 => {
                    let child_id = children[0].page_id;
                    self.inner.free_node(root_id)?;
                    root_id = child_id;
                    root = self.inner.read_node(child_id)?;
                    state.root_page = child_id;
                    state.height = state.height.saturating_sub(1);
                    log::debug!("Root shrunk to page {} at height {}", child_id, state.height);
                }
                _ if root.is_empty() => {
                    self.inner.free_node(root_id)?;
                    state.root_page = NO_PAGE;
                    state.height = 0;
                    return Ok(());
                }
                _ => return Ok(()),
            }
        }
    }

    // ------------------------------------------------------------------------
    // Integrity
    // ------------------------------------------------------------------------

    fn verify_subtree(
        &self,
        page_id: PageId,
        expected_level: u32,
        parent_bbox: Option<BoundingBox>,
        free: &HashSet<PageId>,
        reachable: &mut HashSet<PageId>,
        report: &mut IntegrityReport,
    ) {
        if !reachable.insert(page_id) {
            report
                .errors
                .push(format!("page {} is referenced more than once", page_id));
            return;
        }
        if free.contains(&page_id) {
            report
                .errors
                .push(format!("page {} is in the tree and on the free list", page_id));
        }

        let node = match self.inner.read_node(page_id) {
            Ok(node) => node,
            Err(e) => {
                report.errors.push(format!("page {}: {}", page_id, e));
                return;
            }
        };
        report.pages_checked += 1;

        let is_root = parent_bbox.is_none();
        let min = self.inner.config.min_entries();
        let max = self.inner.config.max_entries();
        if node.len() > max || (!is_root && node.len() < min) {
            report.errors.push(format!(
                "page {} holds {} entries, allowed {}..={}",
                page_id,
                node.len(),
                min,
                max
            ));
        }
        if node.level() != expected_level {
            report.errors.push(format!(
                "page {} is at level {}, expected {}",
                page_id,
                node.level(),
                expected_level
            ));
        }
        if let Some(parent_bbox) = parent_bbox {
            if !node.is_empty() && !parent_bbox.contains(&node.compute_bbox()) {
                report.errors.push(format!(
                    "page {} is not covered by its parent entry",
                    page_id
                ));
            }
        }

        match node {
            Node::Leaf { entries } => {
                report.leaf_entries += entries.len() as u64;
                for entry in entries.iter().filter(|e| e.bbox.validate().is_err()) {
                    report.errors.push(format!(
                        "page {} stores invalid box {} for {}",
                        page_id, entry.bbox, entry.pointer
                    ));
                }
            }
            Node::Internal { children, level } => {
                if is_root && children.len() < 2 {
                    report.errors.push(format!(
                        "internal root {} has {} children",
                        page_id,
                        children.len()
                    ));
                }
                if level == 0 {
                    report
                        .errors
                        .push(format!("internal page {} is at leaf level", page_id));
                    return;
                }
                for child in children {
                    self.verify_subtree(
                        child.page_id,
                        level - 1,
                        Some(child.bbox),
                        free,
                        reachable,
                        report,
                    );
                }
            }
        }
    }
}

impl SpatialIndex for DiskRTree {
    type Cursor = TreeCursor;

    fn insert(&self, bbox: &BoundingBox, pointer: RecordPointer) -> SpatialResult<()> {
        DiskRTree::insert(self, bbox, pointer)
    }

    fn delete(&self, bbox: &BoundingBox, pointer: RecordPointer) -> SpatialResult<bool> {
        DiskRTree::delete(self, bbox, pointer)
    }

    fn intersects(&self, query: &BoundingBox) -> SpatialResult<TreeCursor> {
        DiskRTree::intersects(self, query)
    }

    fn len(&self) -> u64 {
        DiskRTree::len(self)
    }

    fn close(&self) -> SpatialResult<()> {
        DiskRTree::close(self)
    }
}

impl Drop for DiskRTree {
    fn drop(&mut self) {
        // Best effort flush on drop
        if !*self.inner.closed.read() {
            if let Err(e) = self.inner.store.flush() {
                log::warn!("Failed to flush R-Tree {:?} on drop: {}", self.path(), e);
            }
        }
    }
}

// ============================================================================
// Cursor
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QueryMode {
    Intersects,
    Contained,
}

/// Depth-first, pull-driven walk over the entries matching a query box.
///
/// Results come in a deterministic order for a given tree state. The first
/// error ends the walk.
pub struct TreeCursor {
    inner: Arc<DiskRTreeInner>,
    query: BoundingBox,
    mode: QueryMode,
    stack: Vec<PageId>,
    pending: VecDeque<RecordPointer>,
    done: bool,
}

impl TreeCursor {
    fn matches(&self, bbox: &BoundingBox) -> bool {
        match self.mode {
            QueryMode::Intersects => self.query.intersects(bbox),
            QueryMode::Contained => self.query.contains(bbox),
        }
    }

    fn fail(&mut self, error: SpatialError) -> Option<SpatialResult<RecordPointer>> {
        self.done = true;
        self.stack.clear();
        self.pending.clear();
        Some(Err(error))
    }
}

impl Iterator for TreeCursor {
    type Item = SpatialResult<RecordPointer>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(pointer) = self.pending.pop_front() {
                return Some(Ok(pointer));
            }
            if self.done {
                return None;
            }
            let page_id = match self.stack.pop() {
                Some(page_id) => page_id,
                None => {
                    self.done = true;
                    return None;
                }
            };
            if let Err(e) = self.inner.check_closed() {
                return self.fail(e);
            }

            match self.inner.read_node(page_id) {
                Ok(Node::Leaf { entries }) => {
                    let matching: Vec<RecordPointer> = entries
                        .iter()
                        .filter(|e| self.matches(&e.bbox))
                        .map(|e| e.pointer)
                        .collect();
                    self.pending.extend(matching);
                }
                Ok(Node::Internal { children, .. }) => {
                    // a contained entry may sit in a child that only
                    // partially overlaps the query
                    let query = self.query;
                    self.stack.extend(
                        children
                            .iter()
                            .rev()
                            .filter(|c| query.intersects(&c.bbox))
                            .map(|c| c.page_id),
                    );
                }
                Err(e) => return self.fail(e),
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
