//! Drives every (item, model) pair through the model adapter and the grader
//! registry, and collects the results into a frozen [`EvalRun`].
//!
//! Pairs are enumerated item-major: ordinal `i * |models| + m`. At most
//! `concurrency` pairs are in flight (a semaphore gates spawning), and the
//! frozen run lists results in ordinal order regardless of completion order.
//!
//! Cancellation (a `true` on the watch channel) stops scheduling. Pairs
//! already in flight run to completion (bounded by the retry policy's
//! timeout), so their results are kept in the partial run.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{warn, Instrument};

use crate::client::{ModelAdapter, ModelClient};
use crate::config::EvalConfig;
use crate::corpus::Corpus;
use crate::domain::{
    Category, EvalResult, EvalRun, EvalRunBuilder, ModelTarget, RawResponse, TestItem, Verdict,
    VerdictKind,
};
use crate::grading::{panic_message, GraderRegistry};
use crate::metrics::METRICS;
use crate::obs;

/// Identity of a scheduled pair, kept outside its task so a panicked task
/// can still be reported.
struct PairTask {
    ordinal: usize,
    test_id: String,
    model_name: String,
    category: Category,
    question: String,
    handle: JoinHandle<EvalResult>,
}

/// Evaluation engine for one configuration.
pub struct Orchestrator {
    config: Arc<EvalConfig>,
    adapter: ModelAdapter,
    graders: Arc<GraderRegistry>,
}

impl Orchestrator {
    pub fn new(
        config: Arc<EvalConfig>,
        client: Arc<dyn ModelClient>,
        graders: GraderRegistry,
    ) -> Self {
        let adapter = ModelAdapter::new(client, config.retry.clone());
        Self {
            config,
            adapter,
            graders: Arc::new(graders),
        }
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    /// Run every pair without a cancellation source.
    pub async fn run_to_completion(&self, corpus: &Corpus) -> EvalRun {
        let (_tx, rx) = watch::channel(false);
        self.run(corpus, rx).await
    }

    /// Run every pair of `corpus` × configured models.
    ///
    /// Never fails: transport and grading problems become `ERROR` results.
    pub async fn run(&self, corpus: &Corpus, cancel: watch::Receiver<bool>) -> EvalRun {
        let builder = EvalRunBuilder::new(
            self.config.endpoint.clone(),
            self.config.models.clone(),
            corpus.source.clone(),
        );
        let run_id = builder.run_id().to_string();
        self.execute(builder, corpus, cancel)
            .instrument(obs::run_span(&run_id))
            .await
    }

    async fn execute(
        &self,
        mut builder: EvalRunBuilder,
        corpus: &Corpus,
        mut cancel: watch::Receiver<bool>,
    ) -> EvalRun {
        let run_id = builder.run_id().to_string();
        let models = &self.config.models;
        let total = corpus.items.len() * models.len();
        let concurrency = self.config.concurrency.max(1);
        let started = Instant::now();

        obs::emit_run_started(&run_id, corpus.items.len(), models.len(), concurrency);

        let semaphore = Arc::new(Semaphore::new(concurrency));
        let completed = Arc::new(AtomicUsize::new(0));
        let mut tasks: Vec<PairTask> = Vec::with_capacity(total);
        let mut cancelled = *cancel.borrow();

        'schedule: for (i, item) in corpus.items.iter().enumerate() {
            for (m, model) in models.iter().enumerate() {
                if cancelled {
                    break 'schedule;
                }

                let permit = tokio::select! {
                    biased;
                    _ = cancellation(&mut cancel) => {
                        cancelled = true;
                        break 'schedule;
                    }
                    permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => break 'schedule,
                    },
                };

                builder.mark_scheduled();
                let ordinal = i * models.len() + m;
                let pair = self.pair_future(item.clone(), model.clone(), total, Arc::clone(&completed));
                let handle = tokio::spawn(
                    async move {
                        let _permit = permit;
                        pair.await
                    }
                    .in_current_span(),
                );

                tasks.push(PairTask {
                    ordinal,
                    test_id: item.id.clone(),
                    model_name: model.name.clone(),
                    category: item.category.clone(),
                    question: item.question.clone(),
                    handle,
                });
            }
        }

        if cancelled {
            obs::emit_run_cancelled(&run_id, builder.scheduled(), total);
        }

        for mut task in tasks {
            let joined = (&mut task.handle).await;
            match joined {
                Ok(result) => builder.append(task.ordinal, result),
                Err(e) => {
                    let message = match e.try_into_panic() {
                        Ok(payload) => panic_message(payload.as_ref()),
                        Err(e) => e.to_string(),
                    };
                    warn!(
                        test_id = %task.test_id,
                        model = %task.model_name,
                        error = %message,
                        "pair task failed"
                    );
                    builder.append(task.ordinal, panicked_result(task, &message));
                }
            }
        }

        if cancelled {
            builder.mark_cancelled();
        }
        let run = builder.freeze();

        obs::emit_run_finished(
            &run_id,
            started.elapsed().as_millis() as u64,
            [
                (VerdictKind::Pass, run.count(VerdictKind::Pass)),
                (VerdictKind::Fail, run.count(VerdictKind::Fail)),
                (VerdictKind::Error, run.count(VerdictKind::Error)),
                (VerdictKind::Unscored, run.count(VerdictKind::Unscored)),
            ],
            run.is_cancelled(),
        );
        run
    }

    /// Invoke, grade and log one pair.
    fn pair_future(
        &self,
        item: TestItem,
        model: ModelTarget,
        total: usize,
        completed: Arc<AtomicUsize>,
    ) -> impl std::future::Future<Output = EvalResult> + Send + 'static {
        let adapter = self.adapter.clone();
        let graders = Arc::clone(&self.graders);

        async move {
            let response = adapter.invoke(&item.id, &model, &item.question).await;

            let verdict = match graders.grade(&item.category, &item.question, &response) {
                Ok(verdict) => verdict,
                Err(fault) => {
                    obs::emit_grading_fault(&item.id, &model.name, &fault);
                    METRICS.inc_grading_faults();
                    Verdict::error(fault.to_string())
                }
            };

            let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
            METRICS.inc_pairs_completed();
            obs::emit_pair_completed(
                (done, total),
                &item.id,
                &model.name,
                verdict.kind,
                response.attempts,
                response.latency_ms,
            );

            EvalResult {
                test_id: item.id,
                model_name: model.name,
                category: item.category,
                question: item.question,
                raw_response: response,
                verdict,
                timestamp: Utc::now(),
            }
        }
    }
}

/// Resolves once the watch value is `true`. A dropped sender never cancels.
async fn cancellation(rx: &mut watch::Receiver<bool>) {
    let closed = rx.wait_for(|cancelled| *cancelled).await.is_err();
    if closed {
        std::future::pending::<()>().await;
    }
}

fn panicked_result(task: PairTask, message: &str) -> EvalResult {
    EvalResult {
        test_id: task.test_id.clone(),
        model_name: task.model_name.clone(),
        category: task.category,
        question: task.question,
        raw_response: RawResponse {
            test_id: task.test_id,
            model_name: task.model_name,
            text: String::new(),
            latency_ms: 0,
            attempts: 0,
            error: Some(message.to_string()),
        },
        verdict: Verdict::error(format!("pair task failed: {message}")),
        timestamp: Utc::now(),
    }
}
