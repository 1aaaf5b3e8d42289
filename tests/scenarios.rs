//! End-to-end scenarios exercising the full workflow node catalogue.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use workflow_engine::prelude::*;

fn leaf(name: &'static str, f: impl Fn(&Context) -> Result<(), TaskError> + Send + Sync + 'static) -> Workflow {
    TaskWorkflow::new(TaskDescriptor::new(name, Arc::new(FnTask::new(name, f))))
}

#[tokio::test]
async fn s1_sequential_of_two_tasks() {
    let pipeline = SequentialWorkflow::new(
        "LinearFlow",
        vec![
            leaf("Step1", |ctx| {
                ctx.put("step1", true);
                Ok(())
            }),
            leaf("Step2", |ctx| {
                ctx.put("step2", true);
                Ok(())
            }),
        ],
    );

    let ctx = Context::new();
    let cancel = CancellationToken::new();
    let outcome = pipeline.execute(&ctx, &cancel).await;

    assert!(outcome.is_success());
    assert_eq!(ctx.get_typed::<bool>("step1"), Some(true));
    assert_eq!(ctx.get_typed::<bool>("step2"), Some(true));
    assert!(workflow_engine::render::render(&pipeline).starts_with("└── LinearFlow [Sequence]"));
}

#[tokio::test]
async fn s2_parallel_fail_fast() {
    let child1 = leaf("child1", |ctx| {
        ctx.put("child1", true);
        Ok(())
    });
    let child2 = TaskWorkflow::new(
        TaskDescriptor::new(
            "child2",
            Arc::new(FnTask::new("child2", |_ctx: &Context| {
                Err(TaskError::execution("boom"))
            })),
        )
        .with_retry_policy(RetryPolicy::none()),
    );

    struct Slow;
    #[async_trait::async_trait]
    impl Task for Slow {
        async fn execute(&self, _ctx: &Context) -> Result<(), TaskError> {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Ok(())
        }
    }
    let child3 = TaskWorkflow::new(TaskDescriptor::new("child3", Arc::new(Slow)));

    let parallel = ParallelWorkflow::new("Fanout", vec![child1, child2, child3]);

    let ctx = Context::new();
    let cancel = CancellationToken::new();
    let start = Instant::now();
    let outcome = parallel.execute(&ctx, &cancel).await;

    assert!(outcome.is_failure());
    assert!(start.elapsed() < Duration::from_millis(450));
}

#[tokio::test]
async fn s3_retry_then_succeed() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);

    struct FlakyThenOk {
        attempts: Arc<AtomicUsize>,
    }
    #[async_trait::async_trait]
    impl Task for FlakyThenOk {
        async fn execute(&self, _ctx: &Context) -> Result<(), TaskError> {
            let n = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if n < 3 {
                Err(TaskError::execution("transient"))
            } else {
                Ok(())
            }
        }
    }

    let task = TaskWorkflow::new(
        TaskDescriptor::new("Flaky", Arc::new(FlakyThenOk { attempts: counter }))
            .with_retry_policy(
                RetryPolicy::limited_retries(3)
                    .with_backoff(BackoffStrategy::constant(10)),
            ),
    );

    let ctx = Context::new();
    let cancel = CancellationToken::new();
    let start = Instant::now();
    let outcome = task.execute(&ctx, &cancel).await;

    assert!(outcome.is_success());
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    assert!(start.elapsed() >= Duration::from_millis(20));
}

#[tokio::test]
async fn s4_saga_rollback() {
    let reserve_compensated = Arc::new(AtomicUsize::new(0));
    let compensated = Arc::clone(&reserve_compensated);

    let reserve_stock = leaf("reserve_stock", |ctx| {
        ctx.put("reserved", true);
        Ok(())
    });
    let reserve_undo = leaf("reserve_stock.compensation", move |_ctx| {
        compensated.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    let charge_card = TaskWorkflow::new(
        TaskDescriptor::new(
            "charge_card",
            Arc::new(FnTask::new("charge_card", |_ctx: &Context| {
                Err(TaskError::execution("card declined"))
            })),
        )
        .with_retry_policy(RetryPolicy::none()),
    );

    let saga = SagaWorkflow::new(
        "Checkout",
        vec![
            SagaStep::new("reserve_stock", reserve_stock).with_compensation(reserve_undo),
            SagaStep::new("charge_card", charge_card),
        ],
    );

    let ctx = Context::new();
    let cancel = CancellationToken::new();
    let outcome = saga.execute(&ctx, &cancel).await;

    assert!(outcome.is_failure());
    assert_eq!(reserve_stock_compensated(&reserve_compensated), 1);
    assert!(outcome.error().unwrap().to_string().contains("card declined"));
}

fn reserve_stock_compensated(counter: &Arc<AtomicUsize>) -> usize {
    counter.load(Ordering::SeqCst)
}

#[tokio::test]
async fn s5_foreach_over_three_items() {
    use workflow_engine::workflow::foreach::IterableItems;

    let items: Arc<dyn IterableItems> =
        Arc::new(vec!["a".to_string(), "b".to_string(), "c".to_string()]);

    let order = Arc::new(std::sync::Mutex::new(Vec::<String>::new()));
    let seen = Arc::clone(&order);

    let body = TaskWorkflow::new(TaskDescriptor::new(
        "process_item",
        Arc::new(FnTask::new("process_item", move |ctx: &Context| {
            let item = ctx
                .with_typed::<Arc<dyn std::any::Any + Send + Sync>, String>("item", |v| {
                    v.downcast_ref::<String>().expect("item is a string").clone()
                })
                .ok_or_else(|| TaskError::validation("item missing"))?;
            ctx.put(format!("processed:{item}"), true);
            seen.lock().unwrap().push(item);
            Ok(())
        })),
    ));

    let loop_workflow = ForEachWorkflow::new("EachItem", "items", "item", body);

    let ctx = Context::new();
    ctx.put("items", items);
    let cancel = CancellationToken::new();
    let outcome = loop_workflow.execute(&ctx, &cancel).await;

    assert!(outcome.is_success());
    assert_eq!(*order.lock().unwrap(), vec!["a", "b", "c"]);
    assert!(ctx.contains_key("processed:a"));
    assert!(ctx.contains_key("processed:b"));
    assert!(ctx.contains_key("processed:c"));
}

#[tokio::test]
async fn s6_conditional_false_branch() {
    let when_true = leaf("Approved", |ctx| {
        ctx.put("approved", true);
        Ok(())
    });
    let when_false = leaf("Denied", |ctx| {
        ctx.put("denied", true);
        Ok(())
    });

    let gate = ConditionalWorkflow::new(
        "Gate",
        Arc::new(|_ctx: &Context| Ok(false)),
        when_true,
        Some(when_false),
    );

    let ctx = Context::new();
    let cancel = CancellationToken::new();
    let outcome = gate.execute(&ctx, &cancel).await;

    assert!(outcome.is_success());
    assert!(!ctx.contains_key("approved"));
    assert!(ctx.contains_key("denied"));
}
