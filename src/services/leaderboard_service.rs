//! ICPC-style leaderboard
//!
//! Standings are derived on demand from submission history. Rows are ranked
//! by solved count (desc), total penalty (asc), then username (asc), with
//! strictly sequential ranks.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    constants::ICPC_PENALTY_MINUTES,
    db::repositories::{ContestDirectory, SubmissionStore},
    error::{AppError, AppResult},
    models::{
        CaseResult, ContestCase, Leaderboard, LeaderboardRow, Participant, ProblemStatus,
        Submission, SubmissionStatus,
    },
    utils::minutes_between,
};

/// Leaderboard computation
#[derive(Clone)]
pub struct LeaderboardService {
    store: Arc<dyn SubmissionStore>,
    directory: Arc<dyn ContestDirectory>,
}

impl LeaderboardService {
    pub fn new(store: Arc<dyn SubmissionStore>, directory: Arc<dyn ContestDirectory>) -> Self {
        Self { store, directory }
    }

    /// Compute the standings of a class in a contest.
    ///
    /// Fails as a whole when the class/contest assignment or the roster is
    /// missing. A contest without problems yields no rows.
    pub async fn compute(&self, class_transaction_id: Uuid, contest_id: Uuid) -> AppResult<Leaderboard> {
        let class_contest = self
            .directory
            .find_class_contest(class_transaction_id, contest_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Contest {} is not assigned to class {}",
                    contest_id, class_transaction_id
                ))
            })?;

        let problems = self.directory.find_contest_cases(contest_id).await?;
        if problems.is_empty() {
            return Ok(Leaderboard {
                problems,
                rows: Vec::new(),
            });
        }

        let roster = self
            .directory
            .find_roster(class_transaction_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Class {} not found", class_transaction_id)))?;

        let case_ids: Vec<Uuid> = problems.iter().map(|p| p.case_id).collect();
        let user_ids: Vec<Uuid> = roster.iter().map(|p| p.user_id).collect();
        let submissions = self
            .store
            .find_all_for_contest(&case_ids, &user_ids, class_contest.start_time)
            .await?;

        let rows = rank_rows(build_rows(
            &problems,
            &roster,
            &submissions,
            class_contest.start_time,
        ));

        tracing::debug!(
            class_transaction_id = %class_transaction_id,
            contest_id = %contest_id,
            participants = rows.len(),
            submissions = submissions.len(),
            "Leaderboard computed"
        );

        Ok(Leaderboard { problems, rows })
    }
}

/// Outcome of one participant on one problem.
///
/// `attempts` must be in chronological order. The first accepted submission
/// solves the problem, and every attempt up to and including it is counted.
/// Without an accepted submission the highest-scoring wrong answer is shown,
/// the latest one winning ties.
pub fn problem_result(case_id: Uuid, attempts: &[&Submission], contest_start: DateTime<Utc>) -> CaseResult {
    if attempts.is_empty() {
        return CaseResult::unsolved(case_id);
    }

    if let Some(index) = attempts.iter().position(|s| s.status.is_accepted()) {
        let accepted = attempts[index];
        return CaseResult {
            case_id,
            submission_id: Some(accepted.id),
            status: ProblemStatus::Accepted,
            score: accepted.score,
            is_solved: true,
            solve_time_minutes: minutes_between(contest_start, accepted.created_at),
            wrong_attempts: index as i64 + 1,
        };
    }

    let best_wrong = attempts
        .iter()
        .copied()
        .filter(|s| s.status == SubmissionStatus::WrongAnswer)
        .fold(None::<&Submission>, |best, s| match best {
            Some(b) if b.score > s.score => Some(b),
            _ => Some(s),
        });

    CaseResult {
        case_id,
        submission_id: best_wrong.map(|s| s.id),
        status: ProblemStatus::Attempted,
        score: best_wrong.map_or(0, |s| s.score),
        is_solved: false,
        solve_time_minutes: 0,
        wrong_attempts: attempts.len() as i64,
    }
}

/// Penalty minutes of a solved problem. The accepted attempt itself is not
/// penalized.
pub fn penalty(result: &CaseResult) -> i64 {
    if !result.is_solved {
        return 0;
    }
    result.solve_time_minutes + ICPC_PENALTY_MINUTES * (result.wrong_attempts - 1).max(0)
}

/// One unranked row per roster member
pub fn build_rows(
    problems: &[ContestCase],
    roster: &[Participant],
    submissions: &[Submission],
    contest_start: DateTime<Utc>,
) -> Vec<LeaderboardRow> {
    let mut grouped: HashMap<(Uuid, Uuid), Vec<&Submission>> = HashMap::new();
    for submission in submissions {
        grouped
            .entry((submission.user_id, submission.case_id))
            .or_default()
            .push(submission);
    }
    for attempts in grouped.values_mut() {
        attempts.sort_by_key(|s| s.created_at);
    }

    roster
        .iter()
        .map(|participant| {
            let mut problem_results = BTreeMap::new();
            let mut solved_count = 0;
            let mut total_penalty = 0;

            for problem in problems {
                let attempts = grouped
                    .get(&(participant.user_id, problem.case_id))
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                let result = problem_result(problem.case_id, attempts, contest_start);

                if result.is_solved {
                    solved_count += 1;
                    total_penalty += penalty(&result);
                }
                problem_results.insert(problem.problem_code.clone(), result);
            }

            LeaderboardRow {
                rank: 0,
                user_id: participant.user_id,
                username: participant.username.clone(),
                name: participant.name.clone(),
                solved_count,
                total_penalty,
                problem_results,
            }
        })
        .collect()
}

/// Sort rows and assign 1-based sequential ranks
pub fn rank_rows(mut rows: Vec<LeaderboardRow>) -> Vec<LeaderboardRow> {
    rows.sort_by(|a, b| {
        b.solved_count
            .cmp(&a.solved_count)
            .then(a.total_penalty.cmp(&b.total_penalty))
            .then_with(|| a.username.cmp(&b.username))
    });

    for (i, row) in rows.iter_mut().enumerate() {
        row.rank = i + 1;
    }

    rows
}
