//! Object tree for Trellis.
//!
//! Provides the structural half of every widget tree:
//! - Unique object identifiers via arena-based storage
//! - Parent-child relationships with cascade destruction
//! - Object naming and lookup
//!
//! Parents refer to children by owning their ids; children refer back to
//! their parent by id only. Nothing in the registry holds a reference to
//! another object, so there are no ownership cycles to break.
//!
//! # Key Types
//!
//! - [`ObjectId`] - Unique stable identifier for each object
//! - [`ObjectRegistry`] - Arena managing all objects and their relationships
//!
//! # Example
//!
//! ```
//! use trellis_core::ObjectRegistry;
//!
//! let mut registry = ObjectRegistry::new();
//! let window = registry.register("Window");
//! let button = registry.register("Button");
//! registry.set_parent(button, Some(window)).unwrap();
//!
//! assert_eq!(registry.parent(button).unwrap(), Some(window));
//!
//! // Destroying the window takes the button with it.
//! let destroyed = registry.destroy(window).unwrap();
//! assert_eq!(destroyed.len(), 2);
//! assert!(!registry.contains(button));
//! ```

use std::collections::VecDeque;
use std::fmt;

use slotmap::{SlotMap, new_key_type};

use crate::logging::targets;

new_key_type! {
    /// A unique identifier for an object in the registry.
    ///
    /// `ObjectId`s are stable handles that remain valid even as the object tree changes.
    /// They become invalid when the object is destroyed, and a destroyed id is
    /// never handed out again.
    pub struct ObjectId;
}

impl ObjectId {
    /// Convert the ObjectId to a raw u64 value.
    ///
    /// The raw value can be converted back using [`ObjectId::from_raw`].
    #[inline]
    pub fn as_raw(self) -> u64 {
        use slotmap::Key;
        self.data().as_ffi()
    }

    /// Create an ObjectId from a raw u64 value.
    ///
    /// This does not check if the ObjectId exists in any registry.
    #[inline]
    pub fn from_raw(raw: u64) -> Self {
        Self::from(slotmap::KeyData::from_ffi(raw))
    }
}

/// Errors that can occur during object operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectError {
    /// The object ID is invalid or has been destroyed.
    InvalidObjectId,
    /// Attempted to set an object as its own parent/ancestor.
    CircularParentage,
}

impl fmt::Display for ObjectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidObjectId => write!(f, "Invalid or destroyed object ID"),
            Self::CircularParentage => {
                write!(f, "Cannot set an object as its own parent or ancestor")
            }
        }
    }
}

impl std::error::Error for ObjectError {}

/// Result type for object operations.
pub type ObjectResult<T> = std::result::Result<T, ObjectError>;

/// Internal data stored in the registry for each object.
struct ObjectData {
    /// Human-readable name for debugging and lookup.
    name: String,
    /// The type name for debugging.
    type_name: &'static str,
    /// Parent object (if any).
    parent: Option<ObjectId>,
    /// Child objects (owned), in insertion order.
    children: Vec<ObjectId>,
}

impl ObjectData {
    fn new(type_name: &'static str) -> Self {
        Self {
            name: String::new(),
            type_name,
            parent: None,
            children: Vec::new(),
        }
    }
}

/// The arena that manages all objects and their relationships.
///
/// Uses a [`SlotMap`] for stable object IDs. Each registry is an ordinary
/// value owned by whoever drives it; there is no process-wide instance.
#[derive(Default)]
pub struct ObjectRegistry {
    objects: SlotMap<ObjectId, ObjectData>,
}

impl ObjectRegistry {
    /// Create a new empty object registry.
    pub fn new() -> Self {
        Self {
            objects: SlotMap::with_key(),
        }
    }

    /// Register a new root object and return its ID.
    pub fn register(&mut self, type_name: &'static str) -> ObjectId {
        let id = self.objects.insert(ObjectData::new(type_name));
        tracing::trace!(target: targets::OBJECT, ?id, type_name, "registered object");
        id
    }

    /// Remove an object and all its descendants from the registry.
    ///
    /// Returns the destroyed ids with descendants ordered before their
    /// parents, ending with `id` itself.
    #[tracing::instrument(skip(self), target = "trellis_core::object", level = "trace")]
    pub fn destroy(&mut self, id: ObjectId) -> ObjectResult<Vec<ObjectId>> {
        let mut doomed = self.collect_descendants(id)?;
        tracing::trace!(
            target: targets::OBJECT,
            ?id,
            descendant_count = doomed.len(),
            "destroying object tree"
        );

        if let Some(parent_id) = self.objects.get(id).and_then(|d| d.parent) {
            if let Some(parent_data) = self.objects.get_mut(parent_id) {
                parent_data.children.retain(|&child| child != id);
            }
        }

        doomed.push(id);
        for &doomed_id in &doomed {
            self.objects.remove(doomed_id);
        }

        Ok(doomed)
    }

    /// Collect all descendant IDs in depth-first order (children before parents).
    fn collect_descendants(&self, id: ObjectId) -> ObjectResult<Vec<ObjectId>> {
        let mut result = Vec::new();
        self.collect_descendants_recursive(id, &mut result)?;
        Ok(result)
    }

    fn collect_descendants_recursive(
        &self,
        id: ObjectId,
        result: &mut Vec<ObjectId>,
    ) -> ObjectResult<()> {
        let data = self.objects.get(id).ok_or(ObjectError::InvalidObjectId)?;
        for &child_id in &data.children {
            self.collect_descendants_recursive(child_id, result)?;
            result.push(child_id);
        }
        Ok(())
    }

    /// Check if an object exists in the registry.
    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(id)
    }

    /// Number of live objects.
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Remove every object.
    pub fn clear(&mut self) {
        self.objects.clear();
    }

    /// Set the parent of an object.
    ///
    /// This handles removing from the old parent and adding to the new parent.
    /// Passing `None` makes the object a root object.
    pub fn set_parent(&mut self, id: ObjectId, new_parent: Option<ObjectId>) -> ObjectResult<()> {
        if !self.objects.contains_key(id) {
            return Err(ObjectError::InvalidObjectId);
        }

        if let Some(parent_id) = new_parent {
            if !self.objects.contains_key(parent_id) {
                return Err(ObjectError::InvalidObjectId);
            }
            if self.is_ancestor_of(id, parent_id) {
                return Err(ObjectError::CircularParentage);
            }
        }

        let old_parent = self.objects.get(id).and_then(|d| d.parent);
        if let Some(old_parent_id) = old_parent {
            if let Some(parent_data) = self.objects.get_mut(old_parent_id) {
                parent_data.children.retain(|&child| child != id);
            }
        }

        if let Some(data) = self.objects.get_mut(id) {
            data.parent = new_parent;
        }

        if let Some(parent_id) = new_parent {
            if let Some(parent_data) = self.objects.get_mut(parent_id) {
                parent_data.children.push(id);
            }
        }

        tracing::trace!(
            target: targets::OBJECT,
            ?id,
            ?old_parent,
            ?new_parent,
            "reparented object"
        );
        Ok(())
    }

    /// Check if `potential_ancestor` is `id` or one of its ancestors.
    pub fn is_ancestor_of(&self, potential_ancestor: ObjectId, id: ObjectId) -> bool {
        let mut current = Some(id);
        while let Some(current_id) = current {
            if current_id == potential_ancestor {
                return true;
            }
            current = self.objects.get(current_id).and_then(|d| d.parent);
        }
        false
    }

    /// Get the parent of an object.
    pub fn parent(&self, id: ObjectId) -> ObjectResult<Option<ObjectId>> {
        self.objects
            .get(id)
            .map(|d| d.parent)
            .ok_or(ObjectError::InvalidObjectId)
    }

    /// Get the children of an object.
    pub fn children(&self, id: ObjectId) -> ObjectResult<&[ObjectId]> {
        self.objects
            .get(id)
            .map(|d| d.children.as_slice())
            .ok_or(ObjectError::InvalidObjectId)
    }

    /// Ancestors of an object, from the immediate parent up to the root.
    pub fn ancestors(&self, id: ObjectId) -> ObjectResult<Vec<ObjectId>> {
        let mut ancestors = Vec::new();
        let mut current = self.parent(id)?;
        while let Some(parent_id) = current {
            ancestors.push(parent_id);
            current = self.objects.get(parent_id).and_then(|d| d.parent);
        }
        Ok(ancestors)
    }

    /// All objects without a parent, in arena order.
    pub fn root_objects(&self) -> Vec<ObjectId> {
        self.objects
            .iter()
            .filter(|(_, data)| data.parent.is_none())
            .map(|(id, _)| id)
            .collect()
    }

    /// Get the object's name.
    pub fn object_name(&self, id: ObjectId) -> ObjectResult<&str> {
        self.objects
            .get(id)
            .map(|d| d.name.as_str())
            .ok_or(ObjectError::InvalidObjectId)
    }

    /// Set the object's name.
    pub fn set_object_name(&mut self, id: ObjectId, name: impl Into<String>) -> ObjectResult<()> {
        self.objects
            .get_mut(id)
            .map(|d| d.name = name.into())
            .ok_or(ObjectError::InvalidObjectId)
    }

    /// Get the type name of an object.
    pub fn type_name(&self, id: ObjectId) -> ObjectResult<&'static str> {
        self.objects
            .get(id)
            .map(|d| d.type_name)
            .ok_or(ObjectError::InvalidObjectId)
    }

    /// Find a child by name (direct children only).
    pub fn find_child_by_name(&self, id: ObjectId, name: &str) -> ObjectResult<Option<ObjectId>> {
        let children = self.children(id)?;
        Ok(children.iter().copied().find(|&child_id| {
            self.objects
                .get(child_id)
                .is_some_and(|data| data.name == name)
        }))
    }

    /// Recursively find all descendants with the given name, breadth first.
    pub fn find_descendants_by_name(
        &self,
        id: ObjectId,
        name: &str,
    ) -> ObjectResult<Vec<ObjectId>> {
        let mut result = Vec::new();
        let mut queue: VecDeque<ObjectId> = self.children(id)?.iter().copied().collect();
        while let Some(current) = queue.pop_front() {
            if let Some(data) = self.objects.get(current) {
                if data.name == name {
                    result.push(current);
                }
                queue.extend(data.children.iter().copied());
            }
        }
        Ok(result)
    }
}

impl fmt::Debug for ObjectRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectRegistry")
            .field("object_count", &self.objects.len())
            .finish()
    }
}
