//! Delegates execution to an external script engine
//!
//! The script runtime itself is out of core scope. `ScriptEngine` is the
//! seam a caller fills in; the core ships no real JavaScript evaluator,
//! only the contract and a `NoopScriptEngine` placeholder useful for
//! testing composition without pulling in a JS runtime dependency.

use super::{NodeKind, Workflow};
use crate::cancellation::CancellationToken;
use crate::context::Context;
use crate::error::{EngineError, TaskError};
use crate::result::Outcome;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

/// Source text for a script, plus an optional origin for diagnostics and
/// tree rendering (`SRC -> <filename | "inline">`).
#[derive(Debug, Clone)]
pub struct ScriptSource {
    pub source: String,
    pub origin: Option<String>,
}

/// Yields script source text and its optional origin URI.
pub trait ScriptProvider: Send + Sync {
    fn provide(&self) -> Result<ScriptSource, TaskError>;
}

/// An inline script literal with no file origin.
pub struct InlineScript(pub String);

impl ScriptProvider for InlineScript {
    fn provide(&self) -> Result<ScriptSource, TaskError> {
        Ok(ScriptSource {
            source: self.0.clone(),
            origin: None,
        })
    }
}

/// External collaborator that evaluates a script against a [`Context`].
#[async_trait]
pub trait ScriptEngine: Send + Sync {
    async fn eval(&self, script: &ScriptSource, ctx: &Context) -> Result<(), TaskError>;
}

/// A placeholder engine that always succeeds without evaluating
/// anything. Exists so the node's composition and rendering can be
/// exercised without a real script runtime dependency.
pub struct NoopScriptEngine;

#[async_trait]
impl ScriptEngine for NoopScriptEngine {
    async fn eval(&self, _script: &ScriptSource, _ctx: &Context) -> Result<(), TaskError> {
        Ok(())
    }
}

/// A node that delegates to a [`ScriptEngine`], treated as a single
/// computation unit
pub struct JavascriptWorkflow {
    pub(crate) name: String,
    provider: Arc<dyn ScriptProvider>,
    engine: Arc<dyn ScriptEngine>,
}

impl JavascriptWorkflow {
    pub fn new(
        name: impl Into<String>,
        provider: Arc<dyn ScriptProvider>,
        engine: Arc<dyn ScriptEngine>,
    ) -> Workflow {
        Workflow::new(NodeKind::Javascript(JavascriptWorkflow {
            name: name.into(),
            provider,
            engine,
        }))
    }

    /// The script's origin, used by the tree renderer's
    /// `SRC -> <filename | "inline" | "[Error]">` edge label.
    pub(crate) fn render_origin(&self) -> String {
        match self.provider.provide() {
            Ok(ScriptSource { origin: Some(o), .. }) => o,
            Ok(ScriptSource { origin: None, .. }) => "inline".to_string(),
            Err(_) => "[Error]".to_string(),
        }
    }

    pub(super) async fn run(&self, ctx: &Context, _cancel: &CancellationToken) -> Outcome {
        let started_at = Utc::now();

        let script = match self.provider.provide() {
            Ok(script) => script,
            Err(err) => {
                return Outcome::failure(
                    started_at,
                    Utc::now(),
                    EngineError::TaskValidationFailed {
                        task: self.name.clone(),
                        source: err,
                    },
                )
            }
        };

        match self.engine.eval(&script, ctx).await {
            Ok(()) => Outcome::success(started_at, Utc::now()),
            Err(err) => Outcome::failure(
                started_at,
                Utc::now(),
                EngineError::TaskExecutionFailed {
                    task: self.name.clone(),
                    source: err,
                },
            ),
        }
    }
}
