// src/hooks.rs

//! Lifecycle hooks.
//!
//! Handlers are registered per [`HookName`] and run in registration order.
//! The registry is passed to each driver explicitly; there is no global bus.

use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::build::BuildContext;
use crate::errors::{BuildError, Result};
use crate::options::BuildOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookName {
    /// Start of every cycle, before cleaning.
    BuildPrepare,
    /// Once per compile invocation, after options are assembled.
    BuildBefore,
    /// After every compile and post-step succeeded.
    BuildDone,
}

impl HookName {
    pub fn as_str(self) -> &'static str {
        match self {
            HookName::BuildPrepare => "build:prepare",
            HookName::BuildBefore => "build:before",
            HookName::BuildDone => "build:done",
        }
    }
}

impl fmt::Display for HookName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a handler gets to see (and mutate).
pub enum HookContext<'a> {
    Prepare(&'a mut BuildContext),
    Before {
        context: &'a mut BuildContext,
        options: &'a mut BuildOptions,
    },
    Done(&'a mut BuildContext),
}

impl HookContext<'_> {
    pub fn name(&self) -> HookName {
        match self {
            HookContext::Prepare(_) => HookName::BuildPrepare,
            HookContext::Before { .. } => HookName::BuildBefore,
            HookContext::Done(_) => HookName::BuildDone,
        }
    }

    pub fn build_context(&mut self) -> &mut BuildContext {
        match self {
            HookContext::Prepare(ctx) | HookContext::Done(ctx) => ctx,
            HookContext::Before { context, .. } => context,
        }
    }

    /// Present only for `build:before`.
    pub fn options(&mut self) -> Option<&mut BuildOptions> {
        match self {
            HookContext::Before { options, .. } => Some(options),
            _ => None,
        }
    }
}

type Handler = Arc<dyn Fn(&mut HookContext<'_>) -> anyhow::Result<()> + Send + Sync>;

/// Ordered hook registry.
#[derive(Clone, Default)]
pub struct Hooks {
    handlers: Vec<(HookName, Handler)>,
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(&mut self, name: HookName, handler: F) -> &mut Self
    where
        F: Fn(&mut HookContext<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.handlers.push((name, Arc::new(handler)));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Run every handler registered for `ctx`'s hook, stopping at the first
    /// error.
    pub fn call(&self, ctx: &mut HookContext<'_>) -> Result<()> {
        let name = ctx.name();
        for (_, handler) in self.handlers.iter().filter(|(n, _)| *n == name) {
            trace!(hook = %name, "calling hook");
            handler(ctx).map_err(|e| BuildError::Other(e.context(format!("{name} hook failed"))))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResolvedConfig;
    use std::sync::Mutex;

    fn context() -> BuildContext {
        BuildContext::new(Arc::new(ResolvedConfig::new("p", "/p")))
    }

    #[test]
    fn handlers_run_in_order_for_their_name_only() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut hooks = Hooks::new();
        for (name, label) in [
            (HookName::BuildPrepare, "a"),
            (HookName::BuildDone, "x"),
            (HookName::BuildPrepare, "b"),
        ] {
            let seen = seen.clone();
            hooks.on(name, move |_| {
                seen.lock().unwrap().push(label);
                Ok(())
            });
        }

        let mut ctx = context();
        hooks.call(&mut HookContext::Prepare(&mut ctx)).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn handler_error_stops_the_chain() {
        let mut hooks = Hooks::new();
        hooks
            .on(HookName::BuildDone, |_| Err(anyhow::anyhow!("boom")))
            .on(HookName::BuildDone, |_| panic!("must not run"));

        let mut ctx = context();
        let err = hooks.call(&mut HookContext::Done(&mut ctx)).unwrap_err();
        assert!(format!("{err:#}").contains("build:done"));
    }
}
