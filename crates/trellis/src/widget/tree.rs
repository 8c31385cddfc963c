//! Widget storage.
//!
//! [`WidgetTree`] owns every widget of an application together with the
//! event filters installed on them. Structure (parent, children, names) is
//! kept in an [`ObjectRegistry`]; widgets refer to their parent by
//! [`ObjectId`] only.

use std::any::Any;
use std::fmt;

use slotmap::{SecondaryMap, SlotMap};
use trellis_core::logging::targets;
use trellis_core::{ObjectError, ObjectId, ObjectRegistry, ObjectResult};

use super::dispatcher::WidgetAccess;
use super::filter::{EventFilter, FilterId};
use super::traits::Widget;

struct WidgetNode {
    widget: Box<dyn Widget>,
    /// Installed filters in installation order.
    filters: Vec<FilterId>,
}

struct FilterEntry {
    owner: ObjectId,
    filter: Box<dyn EventFilter>,
}

/// Owns widgets, their parent/child structure, and their event filters.
///
/// # Example
///
/// ```
/// use trellis::widget::{Widget, WidgetTree};
///
/// struct Panel;
/// impl Widget for Panel {}
///
/// let mut tree = WidgetTree::new();
/// let root = tree.insert(Panel);
/// let child = tree.insert_child(root, Panel).unwrap();
///
/// assert_eq!(tree.parent(child).unwrap(), Some(root));
/// assert_eq!(tree.children(root).unwrap(), &[child]);
///
/// // Destroying a widget destroys its subtree.
/// tree.destroy(root).unwrap();
/// assert!(tree.is_empty());
/// ```
#[derive(Default)]
pub struct WidgetTree {
    registry: ObjectRegistry,
    nodes: SecondaryMap<ObjectId, WidgetNode>,
    filters: SlotMap<FilterId, FilterEntry>,
}

impl WidgetTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a top-level widget.
    pub fn insert<W: Widget>(&mut self, widget: W) -> ObjectId {
        let id = self.registry.register(std::any::type_name::<W>());
        self.nodes.insert(
            id,
            WidgetNode {
                widget: Box::new(widget),
                filters: Vec::new(),
            },
        );
        tracing::trace!(
            target: targets::WIDGET,
            ?id,
            type_name = std::any::type_name::<W>(),
            "widget inserted"
        );
        id
    }

    /// Insert a widget as the last child of `parent`.
    pub fn insert_child<W: Widget>(
        &mut self,
        parent: ObjectId,
        widget: W,
    ) -> ObjectResult<ObjectId> {
        if !self.contains(parent) {
            return Err(ObjectError::InvalidObjectId);
        }
        let id = self.insert(widget);
        self.registry.set_parent(id, Some(parent))?;
        Ok(id)
    }

    /// Move a widget under a new parent, or make it top-level with `None`.
    ///
    /// Fails with [`ObjectError::CircularParentage`] if `parent` is the
    /// widget itself or one of its descendants.
    pub fn set_parent(&mut self, id: ObjectId, parent: Option<ObjectId>) -> ObjectResult<()> {
        self.registry.set_parent(id, parent)
    }

    /// Destroy a widget, its descendants, and every filter installed on them.
    ///
    /// Returns the number of widgets destroyed.
    pub fn destroy(&mut self, id: ObjectId) -> ObjectResult<usize> {
        let destroyed = self.registry.destroy(id)?;
        let mut filter_count = 0;
        for widget_id in &destroyed {
            if let Some(node) = self.nodes.remove(*widget_id) {
                for filter_id in node.filters {
                    if self.filters.remove(filter_id).is_some() {
                        filter_count += 1;
                    }
                }
            }
        }
        tracing::debug!(
            target: targets::WIDGET,
            ?id,
            widgets = destroyed.len(),
            filters = filter_count,
            "widget subtree destroyed"
        );
        Ok(destroyed.len())
    }

    /// Remove every widget and filter.
    pub fn clear(&mut self) {
        self.registry.clear();
        self.nodes.clear();
        self.filters.clear();
    }

    /// Check whether a widget is in the tree.
    pub fn contains(&self, id: ObjectId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Number of widgets in the tree.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check whether the tree holds no widgets.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Top-level widgets.
    pub fn roots(&self) -> Vec<ObjectId> {
        self.registry.root_objects()
    }

    /// The parent of a widget.
    pub fn parent(&self, id: ObjectId) -> ObjectResult<Option<ObjectId>> {
        self.registry.parent(id)
    }

    /// The children of a widget, in insertion order.
    pub fn children(&self, id: ObjectId) -> ObjectResult<&[ObjectId]> {
        self.registry.children(id)
    }

    /// The widget's name. Empty if none was set.
    pub fn name(&self, id: ObjectId) -> ObjectResult<&str> {
        self.registry.object_name(id)
    }

    /// Set the widget's name.
    pub fn set_name(&mut self, id: ObjectId, name: impl Into<String>) -> ObjectResult<()> {
        self.registry.set_object_name(id, name)
    }

    /// Find a direct child by name.
    pub fn find_child_by_name(
        &self,
        parent: ObjectId,
        name: &str,
    ) -> ObjectResult<Option<ObjectId>> {
        self.registry.find_child_by_name(parent, name)
    }

    /// The structural registry, for debugging output.
    pub fn registry(&self) -> &ObjectRegistry {
        &self.registry
    }

    /// Borrow a widget as its concrete type.
    pub fn widget<W: Widget>(&self, id: ObjectId) -> Option<&W> {
        let widget: &dyn Any = self.nodes.get(id)?.widget.as_ref();
        widget.downcast_ref::<W>()
    }

    /// Mutably borrow a widget as its concrete type.
    pub fn widget_mut<W: Widget>(&mut self, id: ObjectId) -> Option<&mut W> {
        let widget: &mut dyn Any = self.nodes.get_mut(id)?.widget.as_mut();
        widget.downcast_mut::<W>()
    }

    /// Install an event filter on a widget.
    ///
    /// The tree takes ownership of the filter. Filters installed later run
    /// before filters installed earlier.
    pub fn install_event_filter<F>(&mut self, id: ObjectId, filter: F) -> ObjectResult<FilterId>
    where
        F: EventFilter + 'static,
    {
        let node = self.nodes.get_mut(id).ok_or(ObjectError::InvalidObjectId)?;
        let filter_id = self.filters.insert(FilterEntry {
            owner: id,
            filter: Box::new(filter),
        });
        node.filters.push(filter_id);
        tracing::trace!(target: targets::WIDGET, ?id, ?filter_id, "event filter installed");
        Ok(filter_id)
    }

    /// Remove an event filter, handing it back to the caller.
    ///
    /// Returns `None` if the filter was already removed or its widget destroyed.
    pub fn remove_event_filter(&mut self, filter_id: FilterId) -> Option<Box<dyn EventFilter>> {
        let entry = self.filters.remove(filter_id)?;
        if let Some(node) = self.nodes.get_mut(entry.owner) {
            node.filters.retain(|&f| f != filter_id);
        }
        tracing::trace!(
            target: targets::WIDGET,
            id = ?entry.owner,
            ?filter_id,
            "event filter removed"
        );
        Some(entry.filter)
    }

    /// Number of filters installed on a widget.
    pub fn event_filter_count(&self, id: ObjectId) -> usize {
        self.nodes.get(id).map_or(0, |node| node.filters.len())
    }
}

impl WidgetAccess for WidgetTree {
    fn get_widget(&self, id: ObjectId) -> Option<&dyn Widget> {
        self.nodes.get(id).map(|node| node.widget.as_ref())
    }

    fn get_widget_mut(&mut self, id: ObjectId) -> Option<&mut dyn Widget> {
        self.nodes.get_mut(id).map(|node| node.widget.as_mut())
    }

    fn parent_of(&self, id: ObjectId) -> Option<ObjectId> {
        self.registry.parent(id).ok().flatten()
    }

    fn children_of(&self, id: ObjectId) -> Vec<ObjectId> {
        self.registry
            .children(id)
            .map(<[ObjectId]>::to_vec)
            .unwrap_or_default()
    }

    fn event_filters(&self, id: ObjectId) -> Vec<FilterId> {
        self.nodes
            .get(id)
            .map(|node| node.filters.clone())
            .unwrap_or_default()
    }

    fn get_event_filter_mut(&mut self, filter_id: FilterId) -> Option<&mut dyn EventFilter> {
        self.filters
            .get_mut(filter_id)
            .map(|entry| -> &mut dyn EventFilter { entry.filter.as_mut() })
    }
}

impl fmt::Debug for WidgetTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WidgetTree")
            .field("widget_count", &self.nodes.len())
            .field("filter_count", &self.filters.len())
            .finish()
    }
}
