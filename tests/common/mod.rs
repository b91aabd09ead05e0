//! In-memory collaborators shared by the integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use neptune_judge::{
    config::RetryConfig,
    db::repositories::{ContestDirectory, FinalizeOutcome, SubmissionStore},
    error::{AppError, AppResult},
    judge::{ExecutionClient, ExecutionRequest, ExecutionResult, ExecutionStatus},
    models::{
        ClassContest, ContestCase, Participant, Submission, SubmissionResult, SubmissionStatus,
        TestCase, TestCaseData,
    },
    notify::NotificationHub,
    queue::{InMemoryBroker, QueuePublisher},
    services::{JudgeWorker, ResultWorker, SubmissionService, WorkerPool},
    storage::{CaseAssetStore, SourceFileStore},
};

pub const JUDGE_QUEUE: &str = "judge_queue";
pub const RESULT_QUEUE: &str = "result_queue";
pub const DEAD_LETTER_QUEUE: &str = "judge_dead_letter";

/// Submission store backed by hash maps
#[derive(Default)]
pub struct MemoryStore {
    submissions: Mutex<HashMap<Uuid, Submission>>,
    results: Mutex<HashMap<Uuid, Vec<SubmissionResult>>>,
}

impl MemoryStore {
    pub fn insert(&self, submission: Submission) {
        self.submissions
            .lock()
            .unwrap()
            .insert(submission.id, submission);
    }

    pub fn submission(&self, id: Uuid) -> Option<Submission> {
        self.submissions.lock().unwrap().get(&id).cloned()
    }

    pub fn results(&self, id: Uuid) -> Vec<SubmissionResult> {
        self.results
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .unwrap_or_default()
    }

    fn all(&self) -> Vec<Submission> {
        let mut all: Vec<Submission> = self.submissions.lock().unwrap().values().cloned().collect();
        all.sort_by_key(|s| s.created_at);
        all
    }
}

#[async_trait]
impl SubmissionStore for MemoryStore {
    async fn save(&self, submission: &Submission) -> AppResult<Submission> {
        let mut submissions = self.submissions.lock().unwrap();
        if submissions.contains_key(&submission.id) {
            return Err(AppError::AlreadyExists("submission".to_string()));
        }
        submissions.insert(submission.id, submission.clone());
        Ok(submission.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Submission>> {
        Ok(self.submission(id))
    }

    async fn find_results(&self, id: Uuid) -> AppResult<Vec<SubmissionResult>> {
        Ok(self.results(id))
    }

    async fn update_status(&self, id: Uuid, status: SubmissionStatus) -> AppResult<()> {
        let mut submissions = self.submissions.lock().unwrap();
        let submission = submissions
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Submission {} not found", id)))?;
        submission.status = status;
        submission.updated_at = Utc::now();
        Ok(())
    }

    async fn finalize(
        &self,
        id: Uuid,
        status: SubmissionStatus,
        score: i32,
        results: &[SubmissionResult],
    ) -> AppResult<FinalizeOutcome> {
        let mut submissions = self.submissions.lock().unwrap();
        let mut stored = self.results.lock().unwrap();

        let submission = submissions
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Submission {} not found", id)))?;
        if submission.status.is_final() {
            return Ok(FinalizeOutcome::AlreadyFinalized);
        }

        submission.status = status;
        submission.score = score;
        submission.updated_at = Utc::now();
        stored.insert(id, results.to_vec());
        Ok(FinalizeOutcome::Applied)
    }

    async fn find_all_for_contest(
        &self,
        case_ids: &[Uuid],
        user_ids: &[Uuid],
        since: DateTime<Utc>,
    ) -> AppResult<Vec<Submission>> {
        Ok(self
            .all()
            .into_iter()
            .filter(|s| {
                case_ids.contains(&s.case_id) && user_ids.contains(&s.user_id) && s.created_at >= since
            })
            .collect())
    }

    async fn find_by_user_in_contest(
        &self,
        contest_id: Uuid,
        user_id: Uuid,
        class_transaction_id: Option<Uuid>,
    ) -> AppResult<Vec<Submission>> {
        let mut found: Vec<Submission> = self
            .all()
            .into_iter()
            .filter(|s| {
                s.contest_id == Some(contest_id)
                    && s.user_id == user_id
                    && s.class_transaction_id == class_transaction_id
            })
            .collect();
        found.reverse();
        Ok(found)
    }

    async fn find_class_submissions(
        &self,
        class_transaction_id: Uuid,
        contest_id: Uuid,
    ) -> AppResult<Vec<Submission>> {
        Ok(self
            .all()
            .into_iter()
            .filter(|s| {
                s.class_transaction_id == Some(class_transaction_id)
                    && s.contest_id == Some(contest_id)
            })
            .collect())
    }
}

/// `count` test cases per problem; test case `n` reads `"{n}\n"` and
/// expects the same back
pub struct FakeCases {
    pub count: i32,
}

#[async_trait]
impl CaseAssetStore for FakeCases {
    async fn list_test_cases(&self, case_id: Uuid) -> AppResult<Vec<TestCase>> {
        Ok((1..=self.count)
            .map(|number| TestCase {
                case_id,
                number,
                input_url: format!("/cases/{}/{}.in", case_id, number),
                output_url: format!("/cases/{}/{}.out", case_id, number),
            })
            .collect())
    }

    async fn read_test_case(&self, test_case: &TestCase) -> AppResult<TestCaseData> {
        Ok(TestCaseData {
            input: format!("{}\n", test_case.number),
            expected_output: format!("{}\n", test_case.number),
        })
    }
}

type Script = dyn Fn(&ExecutionRequest) -> AppResult<ExecutionResult> + Send + Sync;

/// Execution client answering from a closure
pub struct ScriptedExecutor {
    script: Box<Script>,
    pub calls: AtomicUsize,
}

impl ScriptedExecutor {
    pub fn new(
        script: impl Fn(&ExecutionRequest) -> AppResult<ExecutionResult> + Send + Sync + 'static,
    ) -> Self {
        Self {
            script: Box::new(script),
            calls: AtomicUsize::new(0),
        }
    }

    /// Echoes stdin, so every test case is accepted
    pub fn echo() -> Self {
        Self::new(|req| Ok(ran(&req.stdin, 3)))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExecutionClient for ScriptedExecutor {
    async fn execute(&self, request: &ExecutionRequest) -> AppResult<ExecutionResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.script)(request)
    }
}

pub fn ran(stdout: &str, status_id: i32) -> ExecutionResult {
    ExecutionResult {
        stdout: stdout.to_string(),
        time: "0.004".to_string(),
        memory: 3124,
        status: ExecutionStatus {
            id: status_id,
            description: String::new(),
        },
        ..Default::default()
    }
}

/// Contest directory with a fixed assignment, problem set and roster
#[derive(Default)]
pub struct FakeDirectory {
    pub class_contest: Option<ClassContest>,
    pub problems: Vec<ContestCase>,
    pub roster: Option<Vec<Participant>>,
}

#[async_trait]
impl ContestDirectory for FakeDirectory {
    async fn find_class_contest(&self, _: Uuid, _: Uuid) -> AppResult<Option<ClassContest>> {
        Ok(self.class_contest.clone())
    }

    async fn find_contest_cases(&self, _: Uuid) -> AppResult<Vec<ContestCase>> {
        Ok(self.problems.clone())
    }

    async fn find_roster(&self, _: Uuid) -> AppResult<Option<Vec<Participant>>> {
        Ok(self.roster.clone())
    }
}

pub fn fast_retry() -> RetryConfig {
    RetryConfig {
        max_retries: 2,
        base_delay_ms: 1,
        max_delay_ms: 5,
    }
}

/// Intake, both stages and the hub wired over an in-memory broker.
/// Consumers only run after [`Pipeline::start`].
pub struct Pipeline {
    pub store: Arc<MemoryStore>,
    pub hub: Arc<NotificationHub>,
    pub broker: Arc<InMemoryBroker>,
    pub publisher: QueuePublisher,
    pub submissions: SubmissionService,
    pub executor: Arc<ScriptedExecutor>,
    judge: Arc<JudgeWorker>,
    result: Arc<ResultWorker>,
    workers: WorkerPool,
    _dir: tempfile::TempDir,
}

impl Pipeline {
    pub fn new(test_cases: i32, executor: ScriptedExecutor) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::default());
        let hub = Arc::new(NotificationHub::new());
        let broker = Arc::new(InMemoryBroker::new(Duration::from_millis(20)));
        let publisher = QueuePublisher::new(broker.clone(), DEAD_LETTER_QUEUE, fast_retry());
        let sources = SourceFileStore::new(dir.path());
        let executor = Arc::new(executor);

        let submissions =
            SubmissionService::new(store.clone(), sources.clone(), publisher.clone(), JUDGE_QUEUE);
        let judge = Arc::new(JudgeWorker::new(
            store.clone(),
            Arc::new(FakeCases { count: test_cases }),
            sources,
            executor.clone(),
            hub.clone(),
            publisher.clone(),
            RESULT_QUEUE,
        ));
        let result = Arc::new(ResultWorker::new(store.clone(), hub.clone()));

        Self {
            store,
            hub,
            broker,
            publisher,
            submissions,
            executor,
            judge,
            result,
            workers: WorkerPool::new(),
            _dir: dir,
        }
    }

    /// Spawn one judge consumer and one result consumer
    pub fn start(&mut self) {
        self.workers
            .spawn(self.judge.clone(), &self.publisher, JUDGE_QUEUE, 1, "test");
        self.workers
            .spawn(self.result.clone(), &self.publisher, RESULT_QUEUE, 1, "test");
    }

    /// Spawn only the result consumer
    pub fn start_result_stage(&mut self) {
        self.workers
            .spawn(self.result.clone(), &self.publisher, RESULT_QUEUE, 1, "test");
    }

    pub async fn stop(self) {
        self.workers.shutdown().await;
    }
}
