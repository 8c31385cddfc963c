//! Logging and debugging facilities for Trellis.
//!
//! This module provides:
//! - Target and span names used with the `tracing` crate
//! - Debug visualization for object trees
//! - Performance spans for timing operations
//!
//! # Tracing Integration
//!
//! Trellis uses the `tracing` crate for instrumentation. To see logs,
//! install a subscriber in your application:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("trellis::dispatch=trace,trellis::store=debug")
//!     .init();
//! ```
//!
//! # Debug Visualization
//!
//! Use [`ObjectTreeDebug`] to render the hierarchy held by an
//! [`ObjectRegistry`]:
//!
//! ```
//! use trellis_core::{ObjectRegistry, ObjectTreeDebug, TreeFormatOptions};
//!
//! let mut registry = ObjectRegistry::new();
//! let root = registry.register("Window");
//! registry.set_object_name(root, "main").unwrap();
//!
//! let debug = ObjectTreeDebug::with_options(TreeFormatOptions::minimal());
//! assert_eq!(debug.format_subtree(&registry, root).unwrap(), "main\n");
//! ```

use std::fmt::Write as FmtWrite;

use crate::object::{ObjectId, ObjectRegistry, ObjectResult};

/// Span names used throughout Trellis for tracing.
pub mod span_names {
    /// Event dispatch span (one per dispatched event).
    pub const DISPATCH: &str = "trellis::dispatch";
    /// Posted-event queue processing span.
    pub const PROCESS_EVENTS: &str = "trellis::process_events";
    /// Store snapshot load/save span.
    pub const PERSISTENCE: &str = "trellis::store::persistence";
}

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Object tree target.
    pub const OBJECT: &str = "trellis_core::object";
    /// Signal/slot system target.
    pub const SIGNAL: &str = "trellis_core::signal";
    /// Event dispatch target.
    pub const DISPATCH: &str = "trellis::dispatch";
    /// Widget tree target.
    pub const WIDGET: &str = "trellis::widget";
    /// Application lifecycle and event queue target.
    pub const APPLICATION: &str = "trellis::application";
    /// Configuration store target.
    pub const STORE: &str = "trellis::store";
    /// Timing spans target.
    pub const PERF: &str = "trellis::perf";
}

/// Style options for object tree visualization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TreeStyle {
    /// ASCII characters for tree branches.
    Ascii,
    /// Unicode box-drawing characters.
    #[default]
    Unicode,
}

/// Configuration for object tree debug output.
#[derive(Debug, Clone)]
pub struct TreeFormatOptions {
    /// The style of tree visualization.
    pub style: TreeStyle,
    /// Whether to show object IDs.
    pub show_ids: bool,
    /// Whether to show type names.
    pub show_types: bool,
    /// Maximum depth to traverse (None for unlimited).
    pub max_depth: Option<usize>,
}

impl Default for TreeFormatOptions {
    fn default() -> Self {
        Self {
            style: TreeStyle::default(),
            show_ids: true,
            show_types: true,
            max_depth: None,
        }
    }
}

impl TreeFormatOptions {
    /// Create options for minimal output (names only).
    pub fn minimal() -> Self {
        Self {
            show_ids: false,
            show_types: false,
            ..Default::default()
        }
    }

    /// Set the branch style.
    pub fn with_style(mut self, style: TreeStyle) -> Self {
        self.style = style;
        self
    }

    /// Limit the traversal depth.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }
}

/// Debug utility for visualizing object trees.
#[derive(Debug, Clone, Default)]
pub struct ObjectTreeDebug {
    options: TreeFormatOptions,
}

impl ObjectTreeDebug {
    /// Create a new debug visualizer with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a debug visualizer with custom options.
    pub fn with_options(options: TreeFormatOptions) -> Self {
        Self { options }
    }

    /// Format every root object in the registry and its subtree.
    pub fn format_all(&self, registry: &ObjectRegistry) -> ObjectResult<String> {
        let roots = registry.root_objects();

        let mut output = String::new();
        let _ = writeln!(output, "Object Tree ({} total objects):", registry.object_count());

        if roots.is_empty() {
            output.push_str("  (empty)\n");
        } else {
            for root_id in roots {
                self.format_subtree_into(registry, root_id, &mut Vec::new(), &mut output)?;
            }
        }

        Ok(output)
    }

    /// Format a subtree starting from a specific object.
    pub fn format_subtree(
        &self,
        registry: &ObjectRegistry,
        root: ObjectId,
    ) -> ObjectResult<String> {
        let mut output = String::new();
        self.format_subtree_into(registry, root, &mut Vec::new(), &mut output)?;
        Ok(output)
    }

    /// `last_flags` records, for each ancestor level below the root, whether
    /// that ancestor was the last of its siblings.
    fn format_subtree_into(
        &self,
        registry: &ObjectRegistry,
        id: ObjectId,
        last_flags: &mut Vec<bool>,
        output: &mut String,
    ) -> ObjectResult<()> {
        let depth = last_flags.len();
        if self.options.max_depth.is_some_and(|max| depth > max) {
            return Ok(());
        }

        let name = registry.object_name(id)?;
        let type_name = registry.type_name(id)?;
        let children = registry.children(id)?;

        output.push_str(&self.build_prefix(last_flags));
        output.push_str(if name.is_empty() { "(unnamed)" } else { name });

        if self.options.show_ids {
            let _ = write!(output, " [{:?}]", id);
        }

        if self.options.show_types {
            let short_type = type_name.rsplit("::").next().unwrap_or(type_name);
            let _ = write!(output, " ({})", short_type);
        }

        output.push('\n');

        let child_count = children.len();
        for (i, &child_id) in children.iter().enumerate() {
            last_flags.push(i + 1 == child_count);
            self.format_subtree_into(registry, child_id, last_flags, output)?;
            last_flags.pop();
        }

        Ok(())
    }

    fn build_prefix(&self, last_flags: &[bool]) -> String {
        let Some((&is_last, parents)) = last_flags.split_last() else {
            return String::new();
        };

        let (pipe, blank, tee, corner) = match self.options.style {
            TreeStyle::Ascii => ("|   ", "    ", "+-- ", "`-- "),
            TreeStyle::Unicode => (
                "\u{2502}   ",
                "    ",
                "\u{251c}\u{2500}\u{2500} ",
                "\u{2514}\u{2500}\u{2500} ",
            ),
        };

        let mut prefix = String::new();
        for &parent_was_last in parents {
            prefix.push_str(if parent_was_last { blank } else { pipe });
        }
        prefix.push_str(if is_last { corner } else { tee });
        prefix
    }
}

/// A guard that keeps a tracing span entered until dropped.
///
/// This is useful for tracking the duration of operations.
#[derive(Debug)]
pub struct PerfSpan {
    _span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Create and enter a new performance span.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::info_span!(target: targets::PERF, "perf", operation = name);
        Self {
            _span: span.entered(),
        }
    }
}
