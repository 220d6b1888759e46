//! The scene [`Document`]: the world tree, scene settings, the transient asset
//! table, the dirty flag and the change-listener registry.
//!
//! Entities live in an id-indexed arena. Ownership is expressed by the
//! `children` list of each group; the `parent` field on an entity is only a
//! back-link for upward navigation. All structural mutators are crate-private:
//! outside this crate the tree can only change through
//! [`OperationEngine`](crate::engine::OperationEngine).

use std::collections::{HashMap, HashSet};
use std::fmt;

use tracing::warn;

use crate::asset::AssetTable;
use crate::codec::NodeTree;
use crate::entity::{EntityId, IdAllocator};
use crate::object::{Entity, ObjectKind};
use crate::property;
use crate::settings::SceneSettings;
use crate::ModelError;

// ---------------------------------------------------------------------------
// Change events
// ---------------------------------------------------------------------------

/// What changed in a document. One event is emitted per accepted operation,
/// undo or redo.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    /// Nodes were added, removed or reordered (or a composite was applied).
    StructureChanged,
    /// A single entity property changed.
    PropertyChanged { id: EntityId, path: String },
    /// A scene setting changed.
    SettingsChanged { path: String },
}

/// Handle returned by [`Document::on_change`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(&ChangeEvent)>;

#[derive(Default)]
struct ListenerRegistry {
    next_id: u64,
    listeners: Vec<(ListenerId, Listener)>,
}

impl ListenerRegistry {
    fn add(&mut self, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, listener));
        id
    }

    fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    fn emit(&mut self, event: &ChangeEvent) {
        for (_, listener) in &mut self.listeners {
            listener(event);
        }
    }
}

// ---------------------------------------------------------------------------
// Removed subtree
// ---------------------------------------------------------------------------

/// A subtree taken out of the document, with where it used to live.
#[derive(Debug, Clone)]
pub(crate) struct Detached {
    pub tree: NodeTree,
    pub parent: EntityId,
    pub index: usize,
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// An open scene.
pub struct Document {
    root: EntityId,
    nodes: HashMap<EntityId, Entity>,
    settings: SceneSettings,
    assets: AssetTable,
    dirty: bool,
    ids: IdAllocator,
    listeners: ListenerRegistry,
}

impl Document {
    /// Display name of the world root.
    pub const WORLD_NAME: &'static str = "world";

    /// An empty world with default settings.
    pub fn new() -> Self {
        Self::with_settings(SceneSettings::default())
    }

    /// An empty world with the given settings.
    pub fn with_settings(settings: SceneSettings) -> Self {
        let mut ids = IdAllocator::default();
        let root = ids.allocate(|_| false);
        let mut nodes = HashMap::new();
        nodes.insert(root.clone(), Entity::group(root.clone(), Self::WORLD_NAME));
        Self {
            root,
            nodes,
            settings,
            assets: AssetTable::new(),
            dirty: false,
            ids,
            listeners: ListenerRegistry::default(),
        }
    }

    /// Build a clean document from a decoded world tree.
    ///
    /// The root must be a group. Missing ids are assigned and duplicated ids
    /// are reassigned (with a warning) so the uniqueness invariant holds.
    pub fn from_tree(
        world: NodeTree,
        settings: SceneSettings,
        assets: AssetTable,
    ) -> Result<Self, ModelError> {
        if !world.entity.is_group() {
            return Err(ModelError::NotAGroup {
                id: world.entity.id.clone(),
            });
        }
        let mut doc = Self {
            root: EntityId::new(""),
            nodes: HashMap::with_capacity(world.entity_count()),
            settings,
            assets,
            dirty: false,
            ids: IdAllocator::default(),
            listeners: ListenerRegistry::default(),
        };
        doc.root = doc.insert_detached(world, None);
        Ok(doc)
    }

    // -- queries ------------------------------------------------------------

    pub fn root_id(&self) -> &EntityId {
        &self.root
    }

    /// The world group.
    pub fn root(&self) -> &Entity {
        // The root is inserted on construction and can never be removed.
        &self.nodes[&self.root]
    }

    pub fn find(&self, id: &EntityId) -> Option<&Entity> {
        self.nodes.get(id)
    }

    /// Like [`find`](Self::find) but with a [`ModelError::NotFound`] error.
    pub fn get(&self, id: &EntityId) -> Result<&Entity, ModelError> {
        self.nodes
            .get(id)
            .ok_or_else(|| ModelError::NotFound { id: id.clone() })
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Children of a group, in paint order.
    pub fn children(&self, group: &EntityId) -> Result<&[EntityId], ModelError> {
        self.get(group)?
            .kind
            .children()
            .ok_or_else(|| ModelError::NotAGroup { id: group.clone() })
    }

    /// Ancestors of `id`, nearest first, ending with the root.
    pub fn ancestors(&self, id: &EntityId) -> Result<Vec<EntityId>, ModelError> {
        let mut out = Vec::new();
        let mut cursor = self.get(id)?.parent.clone();
        while let Some(parent) = cursor {
            cursor = self.get(&parent)?.parent.clone();
            out.push(parent);
        }
        Ok(out)
    }

    /// Whether `id` is `ancestor` or lies below it.
    pub fn is_descendant(&self, id: &EntityId, ancestor: &EntityId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.nodes.get(current).and_then(|e| e.parent.as_ref());
        }
        false
    }

    /// Position of `id` within its parent's children.
    pub fn index_in_parent(&self, id: &EntityId) -> Result<Option<usize>, ModelError> {
        let entity = self.get(id)?;
        match &entity.parent {
            None => Ok(None),
            Some(parent) => Ok(self.children(parent)?.iter().position(|c| c == id)),
        }
    }

    /// Depth-first, pre-order traversal in child order, starting at the root.
    pub fn walk(&self) -> Walk<'_> {
        self.walk_from(&self.root)
    }

    /// Depth-first, pre-order traversal of the subtree rooted at `id`.
    pub fn walk_from<'a>(&'a self, id: &'a EntityId) -> Walk<'a> {
        Walk {
            doc: self,
            stack: vec![id],
        }
    }

    /// Read one property by dotted path.
    pub fn property(&self, id: &EntityId, path: &str) -> Result<serde_json::Value, ModelError> {
        property::get_property(self.get(id)?, path)
    }

    /// Number of entities, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// `true` when the world has no children.
    pub fn is_empty(&self) -> bool {
        self.root().kind.children().map_or(true, |c| c.is_empty())
    }

    pub fn settings(&self) -> &SceneSettings {
        &self.settings
    }

    pub fn assets(&self) -> &AssetTable {
        &self.assets
    }

    /// Replace the transient asset table. This is not a model change and
    /// does not touch the dirty flag.
    pub fn replace_assets(&mut self, assets: AssetTable) {
        self.assets = assets;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// A display name not used by any child of `parent`: `base` if it is
    /// free, otherwise `base1`, `base2`, ...
    pub fn create_name(&self, parent: &EntityId, base: &str) -> String {
        let taken: HashSet<&str> = self
            .children(parent)
            .unwrap_or(&[])
            .iter()
            .filter_map(|c| self.nodes.get(c))
            .map(|e| e.editor.name.as_str())
            .collect();

        if !taken.contains(base) {
            return base.to_owned();
        }
        (1u64..)
            .map(|n| format!("{base}{n}"))
            .find(|candidate| !taken.contains(candidate.as_str()))
            .unwrap_or_else(|| base.to_owned())
    }

    // -- listeners ----------------------------------------------------------

    /// Subscribe to change events.
    pub fn on_change(&mut self, listener: impl FnMut(&ChangeEvent) + 'static) -> ListenerId {
        self.listeners.add(Box::new(listener))
    }

    /// Unsubscribe. Returns `false` if the listener was already gone.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    // -- crate-private mutation -------------------------------------------

    pub(crate) fn emit(&mut self, event: &ChangeEvent) {
        self.listeners.emit(event);
    }

    pub(crate) fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    pub(crate) fn settings_mut(&mut self) -> &mut SceneSettings {
        &mut self.settings
    }

    pub(crate) fn entity_mut(&mut self, id: &EntityId) -> Result<&mut Entity, ModelError> {
        self.nodes
            .get_mut(id)
            .ok_or_else(|| ModelError::NotFound { id: id.clone() })
    }

    fn children_mut(&mut self, group: &EntityId) -> Result<&mut Vec<EntityId>, ModelError> {
        let entity = self
            .nodes
            .get_mut(group)
            .ok_or_else(|| ModelError::NotFound { id: group.clone() })?;
        entity
            .kind
            .children_mut()
            .ok_or_else(|| ModelError::NotAGroup { id: group.clone() })
    }

    /// Insert `tree` as a child of `parent` at `index` (clamped). Returns the
    /// id the subtree root ended up with.
    pub(crate) fn insert_tree(
        &mut self,
        parent: &EntityId,
        index: usize,
        tree: NodeTree,
    ) -> Result<EntityId, ModelError> {
        // Validate before touching the arena.
        self.children(parent)?;
        let id = self.insert_detached(tree, Some(parent.clone()));
        let children = self.children_mut(parent)?;
        let index = index.min(children.len());
        children.insert(index, id.clone());
        Ok(id)
    }

    /// Put a subtree into the arena without linking it into a parent list.
    fn insert_detached(&mut self, tree: NodeTree, parent: Option<EntityId>) -> EntityId {
        let NodeTree {
            mut entity,
            children,
        } = tree;

        if entity.id.as_str().is_empty() || self.nodes.contains_key(&entity.id) {
            if !entity.id.as_str().is_empty() {
                warn!(id = %entity.id, "duplicate entity id -- assigning a fresh one");
            }
            let nodes = &self.nodes;
            entity.id = self.ids.allocate(|candidate| nodes.contains_key(candidate));
        }
        entity.parent = parent;

        let id = entity.id.clone();
        let is_group = entity.is_group();
        if let Some(list) = entity.kind.children_mut() {
            list.clear();
        }
        self.nodes.insert(id.clone(), entity);

        if !is_group && !children.is_empty() {
            warn!(id = %id, dropped = children.len(), "leaf entity cannot own children -- dropping them");
            return id;
        }

        let child_ids: Vec<EntityId> = children
            .into_iter()
            .map(|child| self.insert_detached(child, Some(id.clone())))
            .collect();
        if let Some(list) = self.nodes.get_mut(&id).and_then(|e| e.kind.children_mut()) {
            *list = child_ids;
        }
        id
    }

    /// Detach the subtree rooted at `id` and take it out of the arena.
    pub(crate) fn remove_subtree(&mut self, id: &EntityId) -> Result<Detached, ModelError> {
        if *id == self.root {
            return Err(ModelError::RootImmutable);
        }
        let parent = self
            .get(id)?
            .parent
            .clone()
            .ok_or(ModelError::RootImmutable)?;
        let siblings = self.children_mut(&parent)?;
        let index = siblings
            .iter()
            .position(|c| c == id)
            .ok_or_else(|| ModelError::Malformed {
                details: format!("entity {id} is not listed by its parent {parent}"),
            })?;
        siblings.remove(index);

        let tree = self.take_subtree(id)?;
        Ok(Detached {
            tree,
            parent,
            index,
        })
    }

    fn take_subtree(&mut self, id: &EntityId) -> Result<NodeTree, ModelError> {
        let mut entity = self
            .nodes
            .remove(id)
            .ok_or_else(|| ModelError::NotFound { id: id.clone() })?;
        entity.parent = None;
        let child_ids = entity
            .kind
            .children_mut()
            .map(std::mem::take)
            .unwrap_or_default();
        let children = child_ids
            .iter()
            .map(|child| self.take_subtree(child))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(NodeTree { entity, children })
    }

    /// Move `id` under `new_parent` at `index` (clamped after removal).
    ///
    /// Returns `(old_parent, old_index, new_index)`.
    pub(crate) fn move_node(
        &mut self,
        id: &EntityId,
        new_parent: &EntityId,
        index: usize,
    ) -> Result<(EntityId, usize, usize), ModelError> {
        if *id == self.root {
            return Err(ModelError::RootImmutable);
        }
        self.get(id)?;
        self.children(new_parent)?;
        if self.is_descendant(new_parent, id) {
            return Err(ModelError::Cycle {
                id: id.clone(),
                parent: new_parent.clone(),
            });
        }

        let old_parent = self
            .get(id)?
            .parent
            .clone()
            .ok_or(ModelError::RootImmutable)?;
        let siblings = self.children_mut(&old_parent)?;
        let old_index = siblings
            .iter()
            .position(|c| c == id)
            .ok_or_else(|| ModelError::Malformed {
                details: format!("entity {id} is not listed by its parent {old_parent}"),
            })?;
        siblings.remove(old_index);

        let target = self.children_mut(new_parent)?;
        let new_index = index.min(target.len());
        target.insert(new_index, id.clone());
        self.entity_mut(id)?.parent = Some(new_parent.clone());

        Ok((old_parent, old_index, new_index))
    }

    /// Copy of the model state without listeners, for previews.
    pub(crate) fn detached_clone(&self) -> Document {
        Document {
            root: self.root.clone(),
            nodes: self.nodes.clone(),
            settings: self.settings.clone(),
            assets: self.assets.clone(),
            dirty: self.dirty,
            ids: self.ids.clone(),
            listeners: ListenerRegistry::default(),
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

/// Structural equality: same tree and settings. Dirty state, the asset table
/// and listeners are transient and ignored.
impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root && self.settings == other.settings && self.nodes == other.nodes
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("root", &self.root)
            .field("entities", &self.nodes.len())
            .field("dirty", &self.dirty)
            .field("listeners", &self.listeners.listeners.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Walk
// ---------------------------------------------------------------------------

/// Pre-order iterator returned by [`Document::walk`].
pub struct Walk<'a> {
    doc: &'a Document,
    stack: Vec<&'a EntityId>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a Entity;

    fn next(&mut self) -> Option<&'a Entity> {
        while let Some(id) = self.stack.pop() {
            let Some(entity) = self.doc.nodes.get(id) else {
                continue;
            };
            if let ObjectKind::Group(group) = &entity.kind {
                self.stack.extend(group.children.iter().rev());
            }
            return Some(entity);
        }
        None
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Entity;

    fn leaf(id: &str, name: &str) -> NodeTree {
        NodeTree::leaf(Entity::sprite(EntityId::new(id), name, None))
    }

    fn group(id: &str, name: &str, children: Vec<NodeTree>) -> NodeTree {
        NodeTree {
            entity: Entity::group(EntityId::new(id), name),
            children,
        }
    }

    fn sample() -> Document {
        let world = group(
            "world",
            "world",
            vec![
                group("g", "enemies", vec![leaf("a", "bat"), leaf("b", "bat1")]),
                leaf("c", "hero"),
            ],
        );
        Document::from_tree(world, SceneSettings::default(), AssetTable::new()).unwrap()
    }

    #[test]
    fn new_document_has_empty_world() {
        let doc = Document::new();
        assert_eq!(doc.len(), 1);
        assert!(doc.is_empty());
        assert!(!doc.is_dirty());
        assert_eq!(doc.root().editor.name, "world");
    }

    #[test]
    fn queries_follow_the_tree() {
        let doc = sample();
        let g = EntityId::new("g");
        let a = EntityId::new("a");
        assert_eq!(doc.children(&g).unwrap(), &[a.clone(), EntityId::new("b")]);
        assert_eq!(doc.ancestors(&a).unwrap(), vec![g.clone(), EntityId::new("world")]);
        assert!(doc.is_descendant(&a, &g));
        assert!(!doc.is_descendant(&g, &a));
        assert_eq!(doc.index_in_parent(&EntityId::new("c")).unwrap(), Some(1));
        assert!(matches!(
            doc.children(&a),
            Err(ModelError::NotAGroup { .. })
        ));
        assert!(matches!(
            doc.ancestors(&EntityId::new("zz")),
            Err(ModelError::NotFound { .. })
        ));
    }

    #[test]
    fn walk_is_preorder_in_child_order() {
        let doc = sample();
        let names: Vec<&str> = doc.walk().map(|e| e.editor.name.as_str()).collect();
        assert_eq!(names, ["world", "enemies", "bat", "bat1", "hero"]);
    }

    #[test]
    fn create_name_suffixes_a_counter() {
        let doc = sample();
        let g = EntityId::new("g");
        assert_eq!(doc.create_name(&g, "bat"), "bat2");
        assert_eq!(doc.create_name(&g, "owl"), "owl");
        assert_eq!(doc.create_name(doc.root_id(), "bat"), "bat");
    }

    #[test]
    fn duplicate_ids_are_reassigned_on_load() {
        let world = group("w", "world", vec![leaf("x", "one"), leaf("x", "two")]);
        let doc = Document::from_tree(world, SceneSettings::default(), AssetTable::new()).unwrap();
        assert_eq!(doc.len(), 3);
        let kids = doc.children(doc.root_id()).unwrap();
        assert_ne!(kids[0], kids[1]);
    }

    #[test]
    fn leaf_root_is_rejected() {
        let r = Document::from_tree(leaf("s", "s"), SceneSettings::default(), AssetTable::new());
        assert!(matches!(r, Err(ModelError::NotAGroup { .. })));
    }

    #[test]
    fn remove_and_reinsert_restores_the_tree() {
        let mut doc = sample();
        let before = doc.detached_clone();
        let detached = doc.remove_subtree(&EntityId::new("g")).unwrap();
        assert_eq!(doc.len(), 2);
        assert_eq!(detached.index, 0);
        assert_eq!(detached.tree.entity_count(), 3);
        doc.insert_tree(&detached.parent, detached.index, detached.tree)
            .unwrap();
        assert_eq!(doc, before);
    }

    #[test]
    fn move_rejects_cycles() {
        let mut doc = sample();
        let g = EntityId::new("g");
        let a = EntityId::new("a");
        assert!(matches!(
            doc.move_node(&g, &g, 0),
            Err(ModelError::Cycle { .. })
        ));
        assert!(matches!(
            doc.move_node(&g, &a, 0),
            Err(ModelError::NotAGroup { .. })
        ));
    }

    #[test]
    fn move_within_same_parent_reorders() {
        let mut doc = sample();
        let c = EntityId::new("c");
        let root = doc.root_id().clone();
        let (old_parent, old_index, new_index) = doc.move_node(&c, &root, 0).unwrap();
        assert_eq!((old_parent, old_index, new_index), (root.clone(), 1, 0));
        assert_eq!(doc.children(&root).unwrap()[0], c);
    }

    #[test]
    fn root_cannot_be_removed() {
        let mut doc = sample();
        let root = doc.root_id().clone();
        assert!(matches!(
            doc.remove_subtree(&root),
            Err(ModelError::RootImmutable)
        ));
    }

    #[test]
    fn listeners_can_be_removed() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let mut doc = Document::new();
        let seen = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&seen);
        let id = doc.on_change(move |_| *counter.borrow_mut() += 1);
        doc.emit(&ChangeEvent::StructureChanged);
        assert!(doc.remove_listener(id));
        doc.emit(&ChangeEvent::StructureChanged);
        assert_eq!(*seen.borrow(), 1);
        assert!(!doc.remove_listener(id));
    }
}
