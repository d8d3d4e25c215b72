#![forbid(unsafe_code)]

//! Widget lifecycle management.
//!
//! A widget is an externally-owned subtree: the differ treats it as opaque
//! and the [`WidgetHost`] routes explicit lifecycle calls to the owning
//! component instead. Identity is the [`OwnerKey`] assigned to the
//! insertion point at template-compile time, never position alone, so a
//! widget surviving at the same slot with a changed key is correctly torn
//! down and replaced.
//!
//! The host implements the render kernel's [`WidgetHooks`], which is how
//! the patcher reaches widgets during patch application. The takeover-mode
//! `attach` path is driven by the view controller directly and never
//! creates markup.

use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;
use veneer_core::{AttrList, OwnerKey, WidgetNode};
use veneer_render::adapter::{NodeId, SharedPlatform};
use veneer_render::apply::{HookError, WidgetHooks};

/// A widget's own lifecycle step failed (mount, attach, or update).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleError {
    /// Widget-reported reason.
    pub reason: String,
}

impl LifecycleError {
    /// Create an error from a reason.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for LifecycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

impl std::error::Error for LifecycleError {}

/// A widget failed to tear down cleanly. Never swallowed: a leaked
/// resource is worse than a visible error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeardownError {
    /// Widget-reported reason.
    pub reason: String,
}

impl TeardownError {
    /// Create an error from a reason.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for TeardownError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

impl std::error::Error for TeardownError {}

/// An externally-owned component occupying one widget slot.
///
/// The tree never reaches inside: `update` hands over new props and the
/// widget re-renders itself (or not) on its own terms. Platform borrows
/// are transient, so a widget may drive a full child view render inside
/// any of these calls.
pub trait Widget {
    /// Render fresh output and insert it under `parent` at `index`,
    /// returning the inserted root node.
    fn mount(
        &mut self,
        platform: &SharedPlatform,
        parent: NodeId,
        index: u32,
    ) -> Result<NodeId, LifecycleError>;

    /// Bind to `existing`, a platform node that already holds this
    /// widget's markup (server-rendered takeover). Must not create nodes.
    fn attach(
        &mut self,
        existing: NodeId,
        platform: &SharedPlatform,
    ) -> Result<(), LifecycleError>;

    /// Receive new props. The widget owns its re-render decision.
    fn update(
        &mut self,
        props: &AttrList,
        platform: &SharedPlatform,
    ) -> Result<(), LifecycleError>;

    /// Tear down, cascading to the widget's own children, before the
    /// platform node is detached.
    fn destroy(&mut self, platform: &SharedPlatform) -> Result<(), TeardownError>;
}

/// Instantiates widgets for insertion points carrying a given owner key.
pub trait WidgetFactory {
    /// Build a fresh, unmounted widget for `node`.
    fn instantiate(&self, node: &WidgetNode) -> Box<dyn Widget>;
}

/// Errors from host-level widget bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetError {
    /// No factory registered for this insertion point.
    UnknownFactory(OwnerKey),
    /// An attach or create targeted a key that is already live.
    AlreadyLive(OwnerKey),
    /// An update or destroy targeted a key with no live instance.
    NotLive(OwnerKey),
    /// The widget's own lifecycle step failed.
    Lifecycle {
        /// The widget that failed.
        key: OwnerKey,
        /// Underlying failure.
        source: LifecycleError,
    },
    /// The widget failed to tear down.
    Teardown {
        /// The widget that failed.
        key: OwnerKey,
        /// Underlying failure.
        source: TeardownError,
    },
}

impl fmt::Display for WidgetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownFactory(key) => write!(f, "no widget factory registered for {key}"),
            Self::AlreadyLive(key) => write!(f, "widget {key} is already live"),
            Self::NotLive(key) => write!(f, "widget {key} is not live"),
            Self::Lifecycle { key, source } => write!(f, "widget {key}: {source}"),
            Self::Teardown { key, source } => write!(f, "widget {key} teardown: {source}"),
        }
    }
}

impl std::error::Error for WidgetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Lifecycle { source, .. } => Some(source),
            Self::Teardown { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<WidgetError> for HookError {
    fn from(err: WidgetError) -> Self {
        match err {
            WidgetError::UnknownFactory(key)
            | WidgetError::AlreadyLive(key)
            | WidgetError::NotLive(key) => HookError::UnknownWidget(key),
            WidgetError::Lifecycle { key, source } => HookError::Lifecycle {
                key,
                reason: source.reason,
            },
            WidgetError::Teardown { key, source } => HookError::Teardown {
                key,
                reason: source.reason,
            },
        }
    }
}

/// Tracks live widget instances by owner key and routes lifecycle calls.
#[derive(Default)]
pub struct WidgetHost {
    factories: AHashMap<OwnerKey, Rc<dyn WidgetFactory>>,
    live: AHashMap<OwnerKey, Box<dyn Widget>>,
}

impl WidgetHost {
    /// Create an empty host.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the factory for one insertion point.
    ///
    /// Re-registering a key replaces the factory; live instances are
    /// unaffected.
    pub fn register(&mut self, key: impl Into<OwnerKey>, factory: Rc<dyn WidgetFactory>) {
        self.factories.insert(key.into(), factory);
    }

    /// Whether a live instance exists for `key`.
    #[must_use]
    pub fn is_live(&self, key: &OwnerKey) -> bool {
        self.live.contains_key(key)
    }

    /// Number of live instances.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Takeover binding: instantiate the widget for `node` and attach it to
    /// `existing` markup without creating nodes.
    pub fn attach(
        &mut self,
        node: &WidgetNode,
        existing: NodeId,
        platform: &SharedPlatform,
    ) -> Result<(), WidgetError> {
        if self.live.contains_key(&node.key) {
            return Err(WidgetError::AlreadyLive(node.key.clone()));
        }
        let factory = self
            .factories
            .get(&node.key)
            .ok_or_else(|| WidgetError::UnknownFactory(node.key.clone()))?;
        let mut widget = factory.instantiate(node);
        tracing::debug!(key = %node.key, node = %existing, "widget attach");
        widget
            .attach(existing, platform)
            .map_err(|source| WidgetError::Lifecycle {
                key: node.key.clone(),
                source,
            })?;
        self.live.insert(node.key.clone(), widget);
        Ok(())
    }

    fn create_impl(
        &mut self,
        node: &WidgetNode,
        platform: &SharedPlatform,
        parent: NodeId,
        index: u32,
    ) -> Result<NodeId, WidgetError> {
        if self.live.contains_key(&node.key) {
            return Err(WidgetError::AlreadyLive(node.key.clone()));
        }
        let factory = self
            .factories
            .get(&node.key)
            .ok_or_else(|| WidgetError::UnknownFactory(node.key.clone()))?;
        let mut widget = factory.instantiate(node);
        tracing::debug!(key = %node.key, %parent, index, "widget create");
        let root = widget
            .mount(platform, parent, index)
            .map_err(|source| WidgetError::Lifecycle {
                key: node.key.clone(),
                source,
            })?;
        self.live.insert(node.key.clone(), widget);
        Ok(root)
    }

    fn update_impl(
        &mut self,
        key: &OwnerKey,
        props: &AttrList,
        platform: &SharedPlatform,
    ) -> Result<(), WidgetError> {
        let widget = self
            .live
            .get_mut(key)
            .ok_or_else(|| WidgetError::NotLive(key.clone()))?;
        tracing::trace!(%key, "widget update");
        widget
            .update(props, platform)
            .map_err(|source| WidgetError::Lifecycle {
                key: key.clone(),
                source,
            })
    }

    fn destroy_impl(
        &mut self,
        key: &OwnerKey,
        platform: &SharedPlatform,
    ) -> Result<(), WidgetError> {
        let mut widget = self
            .live
            .remove(key)
            .ok_or_else(|| WidgetError::NotLive(key.clone()))?;
        tracing::debug!(%key, "widget destroy");
        widget
            .destroy(platform)
            .map_err(|source| WidgetError::Teardown {
                key: key.clone(),
                source,
            })
    }

    /// Destroy one live widget. Public for the controller's teardown
    /// cascade; patch-driven teardown arrives through [`WidgetHooks`].
    pub fn destroy(
        &mut self,
        key: &OwnerKey,
        platform: &SharedPlatform,
    ) -> Result<(), WidgetError> {
        self.destroy_impl(key, platform)
    }
}

impl fmt::Debug for WidgetHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WidgetHost")
            .field("factories", &self.factories.len())
            .field("live", &self.live.len())
            .finish()
    }
}

impl WidgetHooks for WidgetHost {
    fn create(
        &mut self,
        node: &WidgetNode,
        platform: &SharedPlatform,
        parent: NodeId,
        index: u32,
    ) -> Result<NodeId, HookError> {
        self.create_impl(node, platform, parent, index)
            .map_err(HookError::from)
    }

    fn update(
        &mut self,
        key: &OwnerKey,
        props: &AttrList,
        platform: &SharedPlatform,
    ) -> Result<(), HookError> {
        self.update_impl(key, props, platform).map_err(HookError::from)
    }

    fn destroy(&mut self, key: &OwnerKey, platform: &SharedPlatform) -> Result<(), HookError> {
        self.destroy_impl(key, platform).map_err(HookError::from)
    }
}
