//! Declarative assembly: builds a [`Workflow`] tree from a
//! [`WorkflowDefinition`].
//!
//! An explicit **registration pattern**: rather than reflecting over an
//! annotated class, an implementor declares its ordered elements and named
//! references directly. The resolution algorithm — ref resolution,
//! acyclicity check, ordered invocation, composition — runs in that order.

use crate::error::{EngineError, EngineResult};
use crate::retry::RetryPolicy;
use crate::task::{Task, TaskDescriptor};
use crate::timeout::TimeoutPolicy;
use crate::workflow::{ParallelWorkflow, SequentialWorkflow, TaskWorkflow, Workflow};
use std::collections::HashMap;
use std::sync::Arc;

/// A named handle to another declaratively-marked definition, resolved
/// before this definition's elements are built.
pub struct WorkflowRef {
    pub field_name: String,
    pub definition: Arc<dyn WorkflowDefinition>,
}

impl WorkflowRef {
    pub fn new(field_name: impl Into<String>, definition: Arc<dyn WorkflowDefinition>) -> Self {
        Self {
            field_name: field_name.into(),
            definition,
        }
    }
}

/// What an ordered element contributes to the composed tree.
pub enum ElementKind {
    /// A pre-built sub-workflow, used directly.
    Workflow(Workflow),
    /// A task, wrapped into a [`TaskWorkflow`] with the given policy
    /// metadata (`0` means "not configured").
    Task {
        task: Arc<dyn Task>,
        max_retries: u32,
        timeout_ms: u64,
    },
}

/// One producer's contribution: a name, an ordering key, and its kind.
pub struct WorkflowElement {
    pub name: String,
    pub order: i32,
    pub kind: ElementKind,
}

impl WorkflowElement {
    pub fn workflow(name: impl Into<String>, order: i32, workflow: Workflow) -> Self {
        Self {
            name: name.into(),
            order,
            kind: ElementKind::Workflow(workflow),
        }
    }

    pub fn task(name: impl Into<String>, order: i32, task: Arc<dyn Task>) -> Self {
        Self {
            name: name.into(),
            order,
            kind: ElementKind::Task {
                task,
                max_retries: 0,
                timeout_ms: 0,
            },
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        if let ElementKind::Task { max_retries: ref mut m, .. } = self.kind {
            *m = max_retries;
        }
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        if let ElementKind::Task { timeout_ms: ref mut t, .. } = self.kind {
            *t = timeout_ms;
        }
        self
    }
}

/// A declaratively-marked workflow definition.
///
/// Implementors stand in for an annotated class in a reflection-based
/// assembler: `refs()` replaces reflective `WorkflowRef` field discovery,
/// `elements()` replaces reflective method discovery over `WORKFLOW` /
/// `TASK` markers.
pub trait WorkflowDefinition: Send + Sync {
    /// The composed node's name.
    fn name(&self) -> String;

    /// If true, compose elements as a [`ParallelWorkflow`]; otherwise a
    /// [`SequentialWorkflow`].
    fn parallel(&self) -> bool {
        false
    }

    /// Only meaningful when [`WorkflowDefinition::parallel`] is true.
    fn share_context(&self) -> bool {
        false
    }

    /// Named references to other definitions, resolved before
    /// [`WorkflowDefinition::elements`] is called.
    fn refs(&self) -> Vec<WorkflowRef> {
        Vec::new()
    }

    /// Produces this definition's ordered elements, given the built
    /// `Workflow` for each entry [`WorkflowDefinition::refs`] declared,
    /// keyed by `field_name`.
    fn elements(&self, resolved_refs: &HashMap<String, Workflow>) -> Result<Vec<WorkflowElement>, String>;
}

/// Builds the composed [`Workflow`] tree for `definition`. Equivalent
/// definitions reachable through more than one `WorkflowRef` are built
/// once and shared.
pub fn build(definition: Arc<dyn WorkflowDefinition>) -> EngineResult<Workflow> {
    let mut building = Vec::new();
    let mut memo: HashMap<usize, Workflow> = HashMap::new();
    build_inner(definition, &mut building, &mut memo)
}

fn identity(definition: &Arc<dyn WorkflowDefinition>) -> usize {
    Arc::as_ptr(definition) as *const () as usize
}

fn build_inner(
    definition: Arc<dyn WorkflowDefinition>,
    building: &mut Vec<usize>,
    memo: &mut HashMap<usize, Workflow>,
) -> EngineResult<Workflow> {
    let id = identity(&definition);
    if let Some(cached) = memo.get(&id) {
        return Ok(cached.clone());
    }
    if building.contains(&id) {
        return Err(EngineError::CircularComposition(definition.name()));
    }
    building.push(id);

    let mut resolved_refs = HashMap::new();
    for r in definition.refs() {
        let built = build_inner(r.definition, building, memo).map_err(|err| match err {
            EngineError::CircularComposition(_) => err,
            other => EngineError::WorkflowComposition(format!(
                "resolving ref '{}' of '{}': {other}",
                r.field_name,
                definition.name()
            )),
        })?;
        resolved_refs.insert(r.field_name, built);
    }

    let mut elements = definition
        .elements(&resolved_refs)
        .map_err(|reason| EngineError::WorkflowBuild(format!("'{}': {reason}", definition.name())))?;
    // Stable sort: elements declared with equal `order` keep their
    // original registration order.
    elements.sort_by_key(|e| e.order);

    let children: Vec<Workflow> = elements
        .into_iter()
        .map(|element| match element.kind {
            ElementKind::Workflow(workflow) => workflow,
            ElementKind::Task {
                task,
                max_retries,
                timeout_ms,
            } => {
                let mut descriptor = TaskDescriptor::new(element.name, task);
                if max_retries > 0 {
                    descriptor = descriptor.with_retry_policy(RetryPolicy::limited_retries(max_retries));
                }
                if timeout_ms > 0 {
                    descriptor = descriptor.with_timeout_policy(TimeoutPolicy::of_millis(timeout_ms));
                }
                TaskWorkflow::new(descriptor)
            }
        })
        .collect();

    let composed = if definition.parallel() {
        let workflow = ParallelWorkflow::new(definition.name(), children);
        ParallelWorkflow::share_context(workflow, definition.share_context())
    } else {
        SequentialWorkflow::new(definition.name(), children)
    };

    building.pop();
    memo.insert(id, composed.clone());
    Ok(composed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::task::FnTask;

    struct LeafDefinition {
        name: &'static str,
    }

    impl WorkflowDefinition for LeafDefinition {
        fn name(&self) -> String {
            self.name.to_string()
        }

        fn elements(&self, _refs: &HashMap<String, Workflow>) -> Result<Vec<WorkflowElement>, String> {
            let name = self.name;
            Ok(vec![WorkflowElement::task(
                "write",
                0,
                Arc::new(FnTask::new("write", move |ctx: &Context| {
                    let mut log = ctx.get_typed::<Vec<String>>("log").unwrap_or_default();
                    log.push(name.to_string());
                    ctx.put("log", log);
                    Ok(())
                })),
            )
            .with_max_retries(2)])
        }
    }

    struct ParentDefinition;

    impl WorkflowDefinition for ParentDefinition {
        fn name(&self) -> String {
            "parent".to_string()
        }

        fn refs(&self) -> Vec<WorkflowRef> {
            vec![WorkflowRef::new("child", Arc::new(LeafDefinition { name: "leaf" }))]
        }

        fn elements(&self, resolved_refs: &HashMap<String, Workflow>) -> Result<Vec<WorkflowElement>, String> {
            let child = resolved_refs
                .get("child")
                .ok_or_else(|| "missing 'child' ref".to_string())?
                .clone();
            Ok(vec![WorkflowElement::workflow("child", 0, child)])
        }
    }

    #[tokio::test]
    async fn resolves_refs_and_builds_sequential_by_default() {
        let workflow = build(Arc::new(ParentDefinition)).unwrap();
        let ctx = Context::new();
        let cancel = crate::cancellation::CancellationToken::new();
        let outcome = workflow.execute(&ctx, &cancel).await;
        assert!(outcome.is_success());
        assert_eq!(ctx.get_typed::<Vec<String>>("log"), Some(vec!["leaf".to_string()]));
    }

    #[test]
    fn true_self_cycle_is_detected() {
        struct Cyclic(std::sync::Mutex<Option<Arc<Cyclic>>>);
        impl WorkflowDefinition for Cyclic {
            fn name(&self) -> String {
                "cyclic".to_string()
            }
            fn refs(&self) -> Vec<WorkflowRef> {
                let guard = self.0.lock().unwrap();
                match guard.as_ref() {
                    Some(selfref) => vec![WorkflowRef::new("self", selfref.clone())],
                    None => vec![],
                }
            }
            fn elements(&self, _r: &HashMap<String, Workflow>) -> Result<Vec<WorkflowElement>, String> {
                Ok(vec![])
            }
        }

        let cyclic = Arc::new(Cyclic(std::sync::Mutex::new(None)));
        *cyclic.0.lock().unwrap() = Some(cyclic.clone());

        let result = build(cyclic);
        assert!(matches!(result, Err(EngineError::CircularComposition(_))));
    }

    #[tokio::test]
    async fn ordering_is_stable_for_equal_order_values() {
        struct OrderedDefinition;
        impl WorkflowDefinition for OrderedDefinition {
            fn name(&self) -> String {
                "ordered".to_string()
            }
            fn elements(&self, _r: &HashMap<String, Workflow>) -> Result<Vec<WorkflowElement>, String> {
                fn marker(key: &'static str) -> Arc<dyn Task> {
                    Arc::new(FnTask::new(key, move |ctx: &Context| {
                        let mut log = ctx.get_typed::<Vec<String>>("log").unwrap_or_default();
                        log.push(key.to_string());
                        ctx.put("log", log);
                        Ok(())
                    }))
                }
                Ok(vec![
                    WorkflowElement::task("first", 0, marker("first")),
                    WorkflowElement::task("second", 0, marker("second")),
                    WorkflowElement::task("third", -1, marker("third")),
                ])
            }
        }

        let workflow = build(Arc::new(OrderedDefinition)).unwrap();
        let ctx = Context::new();
        let cancel = crate::cancellation::CancellationToken::new();
        workflow.execute(&ctx, &cancel).await;
        assert_eq!(
            ctx.get_typed::<Vec<String>>("log"),
            Some(vec!["third".to_string(), "first".to_string(), "second".to_string()])
        );
    }

    #[tokio::test]
    async fn element_build_failure_is_reported_as_workflow_build() {
        struct Failing;
        impl WorkflowDefinition for Failing {
            fn name(&self) -> String {
                "failing".to_string()
            }
            fn elements(&self, _r: &HashMap<String, Workflow>) -> Result<Vec<WorkflowElement>, String> {
                Err("boom".to_string())
            }
        }
        let result = build(Arc::new(Failing));
        assert!(matches!(result, Err(EngineError::WorkflowBuild(_))));
    }
}
