//! Scoped-binding contract for stream and device scopes.

/// A reversible binding with enter/exit semantics.
///
/// Backends return scopes un-entered. On `enter` the scope's binding (a
/// stream or a device) becomes active for the calling thread and the
/// previously-active binding is remembered; on `exit` the previous binding
/// is restored. The wrappers below guarantee `exit` runs exactly once.
/// Nesting composes in LIFO order through ordinary drop order.
pub trait Scope: Send {
    fn enter(&mut self);
    fn exit(&mut self);
}

/// RAII wrapper that makes a stream active for its lifetime.
///
/// The previous stream is restored on drop, whether the scope ends
/// normally or during panic unwinding.
pub struct ScopedStream {
    scope: Box<dyn Scope>,
    active: bool,
}

impl ScopedStream {
    /// Enters the scope immediately.
    pub fn enter(mut scope: Box<dyn Scope>) -> Self {
        scope.enter();
        Self {
            scope,
            active: true,
        }
    }

    /// Restores the previous binding early. Dropping afterwards is a no-op.
    pub fn exit(&mut self) {
        if self.active {
            self.active = false;
            self.scope.exit();
        }
    }
}

impl Drop for ScopedStream {
    fn drop(&mut self) {
        self.exit();
    }
}

/// RAII wrapper that binds a device for its lifetime.
pub struct ScopedDevice {
    scope: Box<dyn Scope>,
    active: bool,
}

impl ScopedDevice {
    /// Enters the scope immediately.
    pub fn enter(mut scope: Box<dyn Scope>) -> Self {
        scope.enter();
        Self {
            scope,
            active: true,
        }
    }

    /// Restores the previous binding early. Dropping afterwards is a no-op.
    pub fn exit(&mut self) {
        if self.active {
            self.active = false;
            self.scope.exit();
        }
    }
}

impl Drop for ScopedDevice {
    fn drop(&mut self) {
        self.exit();
    }
}
