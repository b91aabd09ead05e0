//! Judge stage
//!
//! Runs a submission against its problem's test cases in ascending order,
//! stopping at the first verdict that is not Accepted, and forwards the
//! outcome to the result stage.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    db::repositories::SubmissionStore,
    error::{AppError, AppResult},
    judge::{compose_actual_output, compute_score, map_status, ExecutionClient, ExecutionRequest},
    models::{Submission, SubmissionResult, SubmissionStatus},
    notify::{NotificationHub, SubmissionUpdate},
    queue::{JudgeRequest, JudgeResultMessage, PublishOutcome, QueuePublisher},
    storage::{CaseAssetStore, SourceFileStore},
};

use super::worker_pool::MessageHandler;

/// Overall outcome of one judging pass
#[derive(Debug, Clone, PartialEq)]
pub struct JudgeOutcome {
    pub status: SubmissionStatus,
    /// Results up to and including the first failure
    pub results: Vec<SubmissionResult>,
}

impl JudgeOutcome {
    fn internal_error(results: Vec<SubmissionResult>) -> Self {
        Self {
            status: SubmissionStatus::InternalError,
            results,
        }
    }
}

/// Consumer of judge requests
pub struct JudgeWorker {
    store: Arc<dyn SubmissionStore>,
    cases: Arc<dyn CaseAssetStore>,
    sources: SourceFileStore,
    executor: Arc<dyn ExecutionClient>,
    hub: Arc<NotificationHub>,
    publisher: QueuePublisher,
    result_queue: String,
}

impl JudgeWorker {
    pub fn new(
        store: Arc<dyn SubmissionStore>,
        cases: Arc<dyn CaseAssetStore>,
        sources: SourceFileStore,
        executor: Arc<dyn ExecutionClient>,
        hub: Arc<NotificationHub>,
        publisher: QueuePublisher,
        result_queue: impl Into<String>,
    ) -> Self {
        Self {
            store,
            cases,
            sources,
            executor,
            hub,
            publisher,
            result_queue: result_queue.into(),
        }
    }

    /// Judge one submission and build the message for the result stage.
    /// Returns `None` for a submission that already has a final verdict,
    /// which happens when a request is redelivered after its result landed.
    pub async fn judge(&self, submission_id: Uuid) -> AppResult<Option<JudgeResultMessage>> {
        let submission = self
            .store
            .find_by_id(submission_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Submission {} not found", submission_id)))?;

        if submission.status.is_final() {
            tracing::info!(
                submission_id = %submission_id,
                status = %submission.status,
                "Submission already judged, skipping redelivered request"
            );
            return Ok(None);
        }

        self.store
            .update_status(submission_id, SubmissionStatus::Judging)
            .await?;
        if let Err(e) = self
            .hub
            .broadcast(submission_id, &SubmissionUpdate::judging(submission_id))
        {
            tracing::warn!(submission_id = %submission_id, error = %e, "Failed to notify listeners");
        }

        tracing::info!(
            submission_id = %submission_id,
            case_id = %submission.case_id,
            language_id = submission.language_id,
            "Judging submission"
        );

        let outcome = self.run_test_cases(&submission).await;

        tracing::info!(
            submission_id = %submission_id,
            verdict = %outcome.status,
            test_cases = outcome.results.len(),
            "Judging finished"
        );

        Ok(Some(JudgeResultMessage {
            submission_id,
            final_status: outcome.status,
            score: compute_score(&outcome.results),
            results: outcome.results,
        }))
    }

    /// Fail-fast evaluation. Infrastructure failures end the pass with
    /// `InternalError` and whatever results were gathered so far.
    pub async fn run_test_cases(&self, submission: &Submission) -> JudgeOutcome {
        let source_code = match self.sources.read(&submission.source_code_path).await {
            Ok(source) => source,
            Err(e) => {
                tracing::error!(submission_id = %submission.id, error = %e, "Failed to read source code");
                return JudgeOutcome::internal_error(Vec::new());
            }
        };

        let test_cases = match self.cases.list_test_cases(submission.case_id).await {
            Ok(test_cases) => test_cases,
            Err(e) => {
                tracing::error!(case_id = %submission.case_id, error = %e, "Failed to list test cases");
                return JudgeOutcome::internal_error(Vec::new());
            }
        };
        if test_cases.is_empty() {
            tracing::error!(case_id = %submission.case_id, "Problem has no test cases");
            return JudgeOutcome::internal_error(Vec::new());
        }

        let mut results = Vec::with_capacity(test_cases.len());

        for test_case in &test_cases {
            let data = match self.cases.read_test_case(test_case).await {
                Ok(data) => data,
                Err(e) => {
                    tracing::error!(
                        submission_id = %submission.id,
                        testcase = test_case.number,
                        error = %e,
                        "Failed to read test case"
                    );
                    return JudgeOutcome::internal_error(results);
                }
            };

            let request = ExecutionRequest {
                source_code: source_code.clone(),
                language_id: submission.language_id,
                stdin: data.input.clone(),
            };
            let execution = match self.executor.execute(&request).await {
                Ok(execution) => execution,
                Err(e) => {
                    tracing::error!(
                        submission_id = %submission.id,
                        testcase = test_case.number,
                        error = %e,
                        "Execution failed"
                    );
                    return JudgeOutcome::internal_error(results);
                }
            };

            let verdict = map_status(execution.status.id, &execution.stdout, &data.expected_output);
            results.push(SubmissionResult {
                submission_id: submission.id,
                testcase_number: test_case.number,
                status: verdict,
                time_seconds: execution.time_seconds(),
                memory_kb: execution.memory,
                input: data.input,
                expected_output: data.expected_output,
                actual_output: compose_actual_output(&execution),
            });

            if !verdict.is_accepted() {
                return JudgeOutcome {
                    status: verdict,
                    results,
                };
            }
        }

        JudgeOutcome {
            status: SubmissionStatus::Accepted,
            results,
        }
    }
}

#[async_trait]
impl MessageHandler for JudgeWorker {
    type Message = JudgeRequest;

    fn stage(&self) -> &'static str {
        "judge"
    }

    async fn handle(&self, message: &JudgeRequest) -> AppResult<()> {
        let Some(result) = self.judge(message.submission_id).await? else {
            return Ok(());
        };

        match self.publisher.publish(&self.result_queue, &result).await? {
            PublishOutcome::Delivered => {
                tracing::debug!(submission_id = %message.submission_id, "Judge result published");
            }
            PublishOutcome::DeadLettered => {
                tracing::error!(
                    submission_id = %message.submission_id,
                    "Judge result dead-lettered, submission remains in Judging"
                );
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryConfig;
    use crate::db::repositories::submission_repo::MockSubmissionStore;
    use crate::judge::client::{ExecutionResult, ExecutionStatus, MockExecutionClient};
    use crate::models::{TestCase, TestCaseData};
    use crate::queue::{Broker, InMemoryBroker};
    use crate::storage::case_assets::MockCaseAssetStore;
    use crate::utils::now_utc;
    use std::time::Duration;

    struct Fixture {
        worker: JudgeWorker,
        broker: Arc<InMemoryBroker>,
        hub: Arc<NotificationHub>,
        submission: Submission,
        _dir: tempfile::TempDir,
    }

    fn test_cases(case_id: Uuid, count: i32) -> Vec<TestCase> {
        (1..=count)
            .map(|number| TestCase {
                case_id,
                number,
                input_url: format!("/{}.in", number),
                output_url: format!("/{}.out", number),
            })
            .collect()
    }

    fn ran(stdout: &str, status_id: i32) -> ExecutionResult {
        ExecutionResult {
            stdout: stdout.to_string(),
            time: "0.010".to_string(),
            memory: 2048,
            status: ExecutionStatus {
                id: status_id,
                description: String::new(),
            },
            ..Default::default()
        }
    }

    /// Test case `n` expects `"{n}\n"`; the executor answers per stdin
    async fn fixture(
        count: i32,
        execute: impl Fn(&ExecutionRequest) -> AppResult<ExecutionResult> + Send + 'static,
    ) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let sources = SourceFileStore::new(dir.path());
        let id = Uuid::new_v4();
        let path = sources.write(id, 71, "print(input())").await.unwrap();
        let now = now_utc();
        let submission = Submission {
            id,
            case_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            language_id: 71,
            status: SubmissionStatus::Judging,
            source_code_path: path,
            score: 0,
            contest_id: None,
            class_transaction_id: None,
            created_at: now,
            updated_at: now,
        };

        let mut store = MockSubmissionStore::new();
        let found = submission.clone();
        store
            .expect_find_by_id()
            .returning(move |_| Ok(Some(found.clone())));
        store.expect_update_status().returning(|_, _| Ok(()));

        let mut cases = MockCaseAssetStore::new();
        let listed = test_cases(submission.case_id, count);
        cases
            .expect_list_test_cases()
            .returning(move |_| Ok(listed.clone()));
        cases.expect_read_test_case().returning(|tc| {
            Ok(TestCaseData {
                input: format!("{}\n", tc.number),
                expected_output: format!("{}\n", tc.number),
            })
        });

        let mut executor = MockExecutionClient::new();
        executor.expect_execute().returning(execute);

        let broker = Arc::new(InMemoryBroker::new(Duration::from_millis(20)));
        let hub = Arc::new(NotificationHub::new());
        let publisher = QueuePublisher::new(broker.clone(), "dead", RetryConfig::default());

        Fixture {
            worker: JudgeWorker::new(
                Arc::new(store),
                Arc::new(cases),
                sources,
                Arc::new(executor),
                hub.clone(),
                publisher,
                "result_queue",
            ),
            broker,
            hub,
            submission,
            _dir: dir,
        }
    }

    #[tokio::test]
    async fn test_all_accepted() {
        let fx = fixture(5, |req| Ok(ran(&req.stdin, 3))).await;

        let message = fx.worker.judge(fx.submission.id).await.unwrap().unwrap();

        assert_eq!(message.final_status, SubmissionStatus::Accepted);
        assert_eq!(message.score, 100);
        assert_eq!(message.results.len(), 5);
        let numbers: Vec<i32> = message.results.iter().map(|r| r.testcase_number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_stops_at_first_runtime_error() {
        let fx = fixture(10, |req| {
            if req.stdin == "3\n" {
                let mut result = ran("", 11);
                result.stderr = "Traceback".to_string();
                Ok(result)
            } else {
                Ok(ran(&req.stdin, 3))
            }
        })
        .await;

        let message = fx.worker.judge(fx.submission.id).await.unwrap().unwrap();

        assert_eq!(message.final_status, SubmissionStatus::RuntimeError);
        assert_eq!(message.results.len(), 3);
        assert!(message.results.iter().all(|r| r.testcase_number <= 3));
        assert_eq!(message.results[2].actual_output, "\n--- STDERR ---\nTraceback");
    }

    #[tokio::test]
    async fn test_wrong_output_is_wrong_answer() {
        let fx = fixture(3, |_| Ok(ran("nope\n", 3))).await;

        let message = fx.worker.judge(fx.submission.id).await.unwrap().unwrap();

        assert_eq!(message.final_status, SubmissionStatus::WrongAnswer);
        assert_eq!(message.results.len(), 1);
        assert_eq!(message.score, 0);
    }

    #[tokio::test]
    async fn test_execution_failure_keeps_partial_results() {
        let fx = fixture(4, |req| {
            if req.stdin == "2\n" {
                Err(AppError::Execution("request timed out".to_string()))
            } else {
                Ok(ran(&req.stdin, 3))
            }
        })
        .await;

        let message = fx.worker.judge(fx.submission.id).await.unwrap().unwrap();

        assert_eq!(message.final_status, SubmissionStatus::InternalError);
        assert_eq!(message.results.len(), 1);
        assert_eq!(message.results[0].status, SubmissionStatus::Accepted);
    }

    #[tokio::test]
    async fn test_no_test_cases_is_internal_error() {
        let fx = fixture(0, |_| panic!("executor must not be called")).await;

        let message = fx.worker.judge(fx.submission.id).await.unwrap().unwrap();

        assert_eq!(message.final_status, SubmissionStatus::InternalError);
        assert!(message.results.is_empty());
    }

    #[tokio::test]
    async fn test_handle_notifies_and_publishes_result() {
        let fx = fixture(2, |req| Ok(ran(&req.stdin, 3))).await;
        let (_, mut listener) = fx.hub.subscribe(fx.submission.id, 4);

        fx.worker
            .handle(&JudgeRequest {
                submission_id: fx.submission.id,
            })
            .await
            .unwrap();

        let update: SubmissionUpdate =
            serde_json::from_str(&listener.recv().await.unwrap()).unwrap();
        assert_eq!(update, SubmissionUpdate::judging(fx.submission.id));

        let delivery = fx.broker.receive("result_queue", "c").await.unwrap().unwrap();
        let published: JudgeResultMessage = serde_json::from_str(&delivery.payload).unwrap();
        assert_eq!(published.submission_id, fx.submission.id);
        assert_eq!(published.final_status, SubmissionStatus::Accepted);
    }

    #[tokio::test]
    async fn test_missing_submission_is_not_found() {
        let mut store = MockSubmissionStore::new();
        store.expect_find_by_id().returning(|_| Ok(None));
        let broker = Arc::new(InMemoryBroker::new(Duration::from_millis(20)));
        let worker = JudgeWorker::new(
            Arc::new(store),
            Arc::new(MockCaseAssetStore::new()),
            SourceFileStore::new("/tmp"),
            Arc::new(MockExecutionClient::new()),
            Arc::new(NotificationHub::new()),
            QueuePublisher::new(broker, "dead", RetryConfig::default()),
            "result_queue",
        );

        let err = worker.judge(Uuid::new_v4()).await.unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_judged_submission_is_not_rejudged() {
        let now = now_utc();
        let submission = Submission {
            id: Uuid::new_v4(),
            case_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            language_id: 71,
            status: SubmissionStatus::Accepted,
            source_code_path: "/missing/main.py".to_string(),
            score: 100,
            contest_id: None,
            class_transaction_id: None,
            created_at: now,
            updated_at: now,
        };

        let mut store = MockSubmissionStore::new();
        let found = submission.clone();
        store
            .expect_find_by_id()
            .returning(move |_| Ok(Some(found.clone())));
        store.expect_update_status().never();
        let mut executor = MockExecutionClient::new();
        executor.expect_execute().never();

        let broker = Arc::new(InMemoryBroker::new(Duration::from_millis(20)));
        let hub = Arc::new(NotificationHub::new());
        let (_, mut listener) = hub.subscribe(submission.id, 4);
        let worker = JudgeWorker::new(
            Arc::new(store),
            Arc::new(MockCaseAssetStore::new()),
            SourceFileStore::new("/tmp"),
            Arc::new(executor),
            hub.clone(),
            QueuePublisher::new(broker.clone(), "dead", RetryConfig::default()),
            "result_queue",
        );

        worker
            .handle(&JudgeRequest {
                submission_id: submission.id,
            })
            .await
            .unwrap();

        assert!(listener.try_recv().is_err());
        assert!(broker.receive("result_queue", "c").await.unwrap().is_none());
    }
}
