use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{content_service::ContentService, ServiceError, ServiceResult};
use crate::{
    db::{DbClient, DbError, Filter},
    metrics,
    middlewares::auth::AuthContext,
    models::{
        quiz_question::QuizQuestionRow,
        user_progress::{
            AttemptResult, QuestionFeedback, SubmitAttemptRequest, UserProgress, UserProgressInsert,
            UserProgressRow, UserProgressUpdate,
        },
    },
};

/// Outcome of grading answers against a module's questions.
#[derive(Debug, Clone)]
pub struct Grade {
    pub feedback: Vec<QuestionFeedback>,
    pub correct_count: usize,
    /// `None` when the module has no questions.
    pub score: Option<i32>,
}

/// Grades `answers[i]` against the i-th question; missing answers count wrong.
pub fn grade(questions: &[QuizQuestionRow], answers: &[i32]) -> Grade {
    let feedback: Vec<QuestionFeedback> = questions
        .iter()
        .enumerate()
        .map(|(i, q)| {
            let selected = answers.get(i).copied();
            QuestionFeedback {
                question_id: q.id,
                selected,
                correct: selected == Some(q.correct_answer),
                correct_answer: q.correct_answer,
                explanation: q.explanation.clone(),
            }
        })
        .collect();

    let correct_count = feedback.iter().filter(|f| f.correct).count();
    let score = (!questions.is_empty())
        .then(|| ((correct_count as f64 / questions.len() as f64) * 100.0).round() as i32);

    Grade {
        feedback,
        correct_count,
        score,
    }
}

/// A scored attempt passes at or above `passing_score`; no threshold always
/// passes. An unscored attempt passes only without a threshold.
pub fn passes(score: Option<i32>, passing_score: Option<i32>) -> bool {
    match (score, passing_score) {
        (_, None) => true,
        (Some(score), Some(threshold)) => score >= threshold,
        (None, Some(_)) => false,
    }
}

/// Bound on re-reads when concurrent attempts keep moving the row.
const MAX_RECORD_ATTEMPTS: usize = 16;

pub struct ProgressService {
    db: DbClient,
}

impl ProgressService {
    pub fn new(db: DbClient) -> Self {
        Self { db }
    }

    pub async fn list_own(&self, ctx: &AuthContext) -> ServiceResult<Vec<UserProgressRow>> {
        Ok(self
            .db
            .from::<UserProgress>()
            .select(
                &ctx.caller(),
                &Filter::new()
                    .eq("user_id", ctx.user.id)
                    .order("updated_at", false),
            )
            .await?)
    }

    pub async fn submit_attempt(
        &self,
        ctx: &AuthContext,
        module_id: Uuid,
        req: SubmitAttemptRequest,
    ) -> ServiceResult<AttemptResult> {
        let content = ContentService::new(self.db.clone());
        let module = content.find_module(ctx, module_id).await?;
        let questions = content.questions(ctx, module_id).await?;

        let grade = grade(&questions, &req.answers);
        let passed = passes(grade.score, module.passing_score);
        let progress = self.record(ctx, module_id, grade.score, passed).await?;

        metrics::record_quiz_attempt(passed);
        tracing::info!(
            user_id = %ctx.user.id,
            %module_id,
            score = ?grade.score,
            passed,
            attempts = progress.attempts,
            "Attempt recorded"
        );

        Ok(AttemptResult {
            module_id,
            score: grade.score,
            passed,
            correct_count: grade.correct_count,
            question_count: questions.len(),
            feedback: grade.feedback,
            progress,
        })
    }

    /// One row per (user, module): attempts increment, the best score is
    /// kept, and completion never reverts.
    ///
    /// Each write is conditional on the `attempts` value it read, so a
    /// concurrent attempt makes the write match nothing and the loop re-reads.
    async fn record(
        &self,
        ctx: &AuthContext,
        module_id: Uuid,
        score: Option<i32>,
        passed: bool,
    ) -> ServiceResult<UserProgressRow> {
        let caller = ctx.caller();
        let table = self.db.from::<UserProgress>();
        let key = Filter::new()
            .eq("user_id", ctx.user.id)
            .eq("module_id", module_id);

        for attempt in 1..=MAX_RECORD_ATTEMPTS {
            let now = Utc::now();

            let Some(existing) = table.select_one(&caller, key.clone()).await? else {
                let insert = UserProgressInsert {
                    user_id: ctx.user.id,
                    module_id,
                    id: None,
                    attempts: Some(1),
                    score,
                    is_completed: Some(passed),
                    completed_at: passed.then_some(now),
                    created_at: None,
                    updated_at: None,
                };
                match table.insert(&caller, &insert).await {
                    Ok(row) => return Ok(row),
                    // Another attempt created the row first; fold into it.
                    Err(DbError::Constraint(message)) if message.contains("duplicate key") => {
                        tracing::debug!(
                            %module_id,
                            attempt,
                            %message,
                            "progress row created concurrently"
                        );
                        continue;
                    }
                    Err(e) => return Err(e.into()),
                }
            };

            let patch = next_progress(&existing, score, passed, now);
            let guard = Filter::new()
                .eq("id", existing.id)
                .eq("attempts", existing.attempts);

            if let Some(row) = table.update(&caller, &guard, &patch).await?.pop() {
                return Ok(row);
            }
            tracing::debug!(%module_id, attempt, "progress row changed concurrently, retrying");
        }

        Err(ServiceError::Conflict(
            "Progress was updated concurrently, please retry".to_string(),
        ))
    }
}

/// Patch folding one more attempt into `existing`.
fn next_progress(
    existing: &UserProgressRow,
    score: Option<i32>,
    passed: bool,
    now: DateTime<Utc>,
) -> UserProgressUpdate {
    let best = match (existing.score, score) {
        (Some(old), Some(new)) => Some(old.max(new)),
        (old, new) => old.or(new),
    };
    let first_completion = passed && !existing.is_completed;

    UserProgressUpdate {
        attempts: Some(existing.attempts + 1),
        score: (best != existing.score).then_some(best),
        is_completed: first_completion.then_some(true),
        completed_at: first_completion.then_some(Some(now)),
        updated_at: Some(now),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::middlewares::auth::AuthUser;
    use crate::models::{
        learning_module::CreateModuleRequest, profile::ProfileRow,
        quiz_question::CreateQuestionRequest, UserRole,
    };
    use std::sync::Arc;

    fn question(correct_answer: i32) -> QuizQuestionRow {
        QuizQuestionRow {
            id: Uuid::new_v4(),
            module_id: Uuid::new_v4(),
            question: "?".to_string(),
            options: serde_json::json!(["a", "b", "c"]),
            correct_answer,
            explanation: None,
            order_index: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_grade_rounds_and_counts_missing_answers_wrong() {
        let questions = vec![question(0), question(1), question(2)];

        let result = grade(&questions, &[0, 1]);
        assert_eq!(result.correct_count, 2);
        assert_eq!(result.score, Some(67));
        assert!(!result.feedback[2].correct);
        assert_eq!(result.feedback[2].selected, None);

        assert_eq!(grade(&[], &[1, 2]).score, None);
    }

    #[test]
    fn test_passes() {
        assert!(passes(Some(70), Some(70)));
        assert!(!passes(Some(69), Some(70)));
        assert!(passes(Some(0), None));
        assert!(passes(None, None));
        assert!(!passes(None, Some(50)));
    }

    fn ctx(role: UserRole) -> AuthContext {
        let id = Uuid::new_v4();
        AuthContext {
            user: AuthUser { id, email: None },
            profile: Some(ProfileRow {
                id,
                email: "user@example.com".to_string(),
                full_name: "Test User".to_string(),
                avatar_url: None,
                role,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            }),
            access_token: "token".to_string(),
        }
    }

    async fn quiz_module(db: &DbClient, teacher: &AuthContext) -> Uuid {
        let content = ContentService::new(db.clone());
        let req: CreateModuleRequest = serde_json::from_value(serde_json::json!({
            "title": "Flood Response",
            "module_type": "quiz",
            "order_index": 1,
            "passing_score": 50
        }))
        .unwrap();
        let module = content.create_module(teacher, req).await.unwrap();

        for (i, correct) in [0, 1].into_iter().enumerate() {
            let q: CreateQuestionRequest = serde_json::from_value(serde_json::json!({
                "question": format!("Question {}", i),
                "options": ["yes", "no"],
                "correct_answer": correct,
                "order_index": i
            }))
            .unwrap();
            content.add_question(teacher, module.id, q).await.unwrap();
        }
        module.id
    }

    fn answers(values: &[i32]) -> SubmitAttemptRequest {
        SubmitAttemptRequest {
            answers: values.to_vec(),
        }
    }

    #[tokio::test]
    async fn test_progress_keeps_best_score_and_sticky_completion() {
        let db = DbClient::new(Arc::new(MemoryStore::new()));
        let module_id = quiz_module(&db, &ctx(UserRole::Teacher)).await;
        let service = ProgressService::new(db);
        let student = ctx(UserRole::Student);

        let first = service
            .submit_attempt(&student, module_id, answers(&[0, 1]))
            .await
            .unwrap();
        assert_eq!(first.score, Some(100));
        assert!(first.passed);
        assert!(first.progress.is_completed);
        let completed_at = first.progress.completed_at;
        assert!(completed_at.is_some());

        let second = service
            .submit_attempt(&student, module_id, answers(&[1, 0]))
            .await
            .unwrap();
        assert_eq!(second.score, Some(0));
        assert!(!second.passed);
        assert_eq!(second.progress.attempts, 2);
        assert_eq!(second.progress.score, Some(100));
        assert!(second.progress.is_completed);
        assert_eq!(second.progress.completed_at, completed_at);

        let rows = service.list_own(&student).await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_attempt_is_recorded_without_completion() {
        let db = DbClient::new(Arc::new(MemoryStore::new()));
        let module_id = quiz_module(&db, &ctx(UserRole::Teacher)).await;
        let service = ProgressService::new(db);
        let student = ctx(UserRole::Student);

        let result = service
            .submit_attempt(&student, module_id, answers(&[1]))
            .await
            .unwrap();
        assert_eq!(result.score, Some(0));
        assert!(!result.progress.is_completed);
        assert_eq!(result.progress.completed_at, None);
        assert_eq!(result.progress.attempts, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_attempts_are_all_counted() {
        let db = DbClient::new(Arc::new(MemoryStore::new()));
        let module_id = quiz_module(&db, &ctx(UserRole::Teacher)).await;
        let service = Arc::new(ProgressService::new(db));
        let student = Arc::new(ctx(UserRole::Student));

        let handles: Vec<_> = (0..12)
            .map(|i| {
                let service = service.clone();
                let student = student.clone();
                let picks = if i == 5 { vec![0, 1] } else { vec![1, 0] };
                tokio::spawn(async move {
                    service.submit_attempt(&student, module_id, answers(&picks)).await
                })
            })
            .collect();
        for result in futures::future::join_all(handles).await {
            result.unwrap().unwrap();
        }

        let rows = service.list_own(&student).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].attempts, 12);
        assert_eq!(rows[0].score, Some(100));
        assert!(rows[0].is_completed);
    }

    #[test]
    fn test_next_progress_only_touches_changed_columns() {
        let now = Utc::now();
        let existing = UserProgressRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            module_id: Uuid::new_v4(),
            attempts: 3,
            score: Some(80),
            is_completed: true,
            completed_at: Some(now),
            created_at: now,
            updated_at: now,
        };

        let patch = next_progress(&existing, Some(40), true, now);
        assert_eq!(patch.attempts, Some(4));
        assert_eq!(patch.score, None);
        assert_eq!(patch.is_completed, None);
        assert_eq!(patch.completed_at, None);
        assert_eq!(patch.id, None);
    }

    #[tokio::test]
    async fn test_attempt_on_unknown_module() {
        let service = ProgressService::new(DbClient::new(Arc::new(MemoryStore::new())));
        let result = service
            .submit_attempt(&ctx(UserRole::Student), Uuid::new_v4(), answers(&[]))
            .await;
        assert!(matches!(result, Err(ServiceError::NotFound(_))));
    }
}
