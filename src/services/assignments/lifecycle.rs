//! 作业生命周期服务
//!
//! 业务规则只存在于这里：每个操作在一个事务内完成 读取 -> 校验 -> 条件写入，
//! 成功提交，任何校验失败回滚。多个条件同时不满足时按
//! NotFound > InvalidState > Forbidden 的优先级报告。

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::errors::{AssignFlowError, Result};
use crate::models::assignments::{
    entities::{Assignment, AssignmentAction, Grade},
    requests::AssignmentDraft,
};
use crate::models::principals::entities::Principal;
use crate::storage::{Storage, StorageTransaction};

pub struct AssignmentLifecycle {
    storage: Arc<dyn Storage>,
}

impl AssignmentLifecycle {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// 学生创建草稿，或编辑自己仍处于草稿状态的作业
    pub async fn create_or_edit_draft(
        &self,
        student: &Principal,
        id: Option<i64>,
        content: Option<String>,
    ) -> Result<Assignment> {
        let student_id = student.require_student_id()?;
        let content =
            content.ok_or_else(|| AssignFlowError::invalid_input("content cannot be null"))?;

        let txn = self.storage.begin().await?;
        let draft = AssignmentDraft {
            id,
            student_id,
            content,
        };
        let outcome = upsert_draft_in(&*txn, draft).await;
        let assignment = finish(txn, outcome).await?;

        info!(
            "Assignment {} draft saved by student {}",
            assignment.id, student_id
        );
        Ok(assignment)
    }

    /// 学生提交草稿并指定评分教师
    pub async fn submit(
        &self,
        student: &Principal,
        id: i64,
        teacher_id: i64,
    ) -> Result<Assignment> {
        let student_id = student.require_student_id()?;

        let txn = self.storage.begin().await?;
        let outcome = submit_in(&*txn, id, student_id, teacher_id).await;
        let assignment = finish(txn, outcome).await?;

        info!(
            "Assignment {} submitted by student {} to teacher {}",
            id, student_id, teacher_id
        );
        Ok(assignment)
    }

    /// 教师对已提交作业评分
    pub async fn grade(&self, principal: &Principal, id: i64, grade: Grade) -> Result<Assignment> {
        let txn = self.storage.begin().await?;
        let outcome = grade_in(&*txn, principal, id, grade, AssignmentAction::Grade).await;
        let assignment = finish(txn, outcome).await?;

        info!(
            "Assignment {} graded {} by {}",
            id, grade, principal.user_id
        );
        Ok(assignment)
    }

    /// 教师覆盖已评分作业的成绩
    pub async fn regrade(
        &self,
        principal: &Principal,
        id: i64,
        grade: Grade,
    ) -> Result<Assignment> {
        let txn = self.storage.begin().await?;
        let outcome = grade_in(&*txn, principal, id, grade, AssignmentAction::Regrade).await;
        let assignment = finish(txn, outcome).await?;

        info!(
            "Assignment {} regraded {} by {}",
            id, grade, principal.user_id
        );
        Ok(assignment)
    }

    pub async fn list_for_student(&self, student: &Principal) -> Result<Vec<Assignment>> {
        let student_id = student.require_student_id()?;
        self.storage.list_assignments_by_student(student_id).await
    }

    pub async fn list_for_teacher(&self, teacher: &Principal) -> Result<Vec<Assignment>> {
        if !teacher.can_grade() {
            return Err(AssignFlowError::forbidden(format!(
                "role '{}' has no assigned assignments",
                teacher.role
            )));
        }
        self.storage.list_assignments_by_teacher(teacher.user_id).await
    }
}

/// 成功则提交，失败则回滚并原样返回错误
async fn finish(
    txn: Box<dyn StorageTransaction>,
    outcome: Result<Assignment>,
) -> Result<Assignment> {
    match outcome {
        Ok(assignment) => {
            txn.commit().await?;
            Ok(assignment)
        }
        Err(err) => {
            if err.is_rejection() {
                debug!("Assignment operation rejected: {}", err);
            }
            if let Err(rollback_err) = txn.rollback().await {
                warn!("Rollback after failed operation also failed: {}", rollback_err);
            }
            Err(err)
        }
    }
}

async fn upsert_draft_in(txn: &dyn StorageTransaction, draft: AssignmentDraft) -> Result<Assignment> {
    let (id, student_id) = (draft.id, draft.student_id);

    if let Some(id) = id {
        let current = txn.get_student_assignment(id, student_id).await?;
        check_draft_edit(current, id)?;
    }

    match txn.upsert_assignment(draft).await? {
        Some(assignment) => Ok(assignment),
        None => {
            // 条件写入未命中：在同一事务内重新读取并给出对应错误
            let id = id.ok_or_else(|| {
                AssignFlowError::database_operation("insert returned no assignment")
            })?;
            let current = txn.get_student_assignment(id, student_id).await?;
            check_draft_edit(current, id)?;
            Err(concurrently_modified(id))
        }
    }
}

async fn submit_in(
    txn: &dyn StorageTransaction,
    id: i64,
    student_id: i64,
    teacher_id: i64,
) -> Result<Assignment> {
    let current = txn.get_student_assignment(id, student_id).await?;
    check_submit(current, id)?;

    match txn.submit_assignment(id, student_id, teacher_id).await? {
        Some(assignment) => Ok(assignment),
        None => {
            let current = txn.get_student_assignment(id, student_id).await?;
            check_submit(current, id)?;
            Err(concurrently_modified(id))
        }
    }
}

async fn grade_in(
    txn: &dyn StorageTransaction,
    principal: &Principal,
    id: i64,
    grade: Grade,
    action: AssignmentAction,
) -> Result<Assignment> {
    let current = txn.get_assignment_by_id(id).await?;
    check_grading(current, id, principal, action)?;

    let written = match action {
        AssignmentAction::Grade => txn.grade_assignment(id, principal.user_id, grade).await?,
        AssignmentAction::Regrade => txn.regrade_assignment(id, principal.user_id, grade).await?,
        AssignmentAction::EditDraft | AssignmentAction::Submit => {
            return Err(AssignFlowError::invalid_state(format!(
                "{action:?} is not a grading action"
            )));
        }
    };

    match written {
        Some(assignment) => Ok(assignment),
        None => {
            let current = txn.get_assignment_by_id(id).await?;
            check_grading(current, id, principal, action)?;
            Err(concurrently_modified(id))
        }
    }
}

fn ensure_found(current: Option<Assignment>, id: i64) -> Result<Assignment> {
    current.ok_or_else(|| AssignFlowError::not_found(format!("Assignment {id} not found")))
}

fn ensure_transition(assignment: &Assignment, action: AssignmentAction) -> Result<()> {
    assignment
        .state
        .apply(action)
        .map(|_| ())
        .map_err(AssignFlowError::invalid_state)
}

fn check_draft_edit(current: Option<Assignment>, id: i64) -> Result<()> {
    let assignment = ensure_found(current, id)?;
    ensure_transition(&assignment, AssignmentAction::EditDraft)
}

fn check_submit(current: Option<Assignment>, id: i64) -> Result<()> {
    let assignment = ensure_found(current, id)?;
    ensure_transition(&assignment, AssignmentAction::Submit)?;
    if assignment.content.is_none() {
        return Err(AssignFlowError::invalid_input(
            "an assignment without content cannot be submitted",
        ));
    }
    Ok(())
}

fn check_grading(
    current: Option<Assignment>,
    id: i64,
    principal: &Principal,
    action: AssignmentAction,
) -> Result<()> {
    let assignment = ensure_found(current, id)?;
    ensure_transition(&assignment, action)?;
    if !principal.can_grade() || !assignment.is_assigned_to(principal.user_id) {
        return Err(AssignFlowError::forbidden(
            "You are not authorized to grade this assignment",
        ));
    }
    Ok(())
}

fn concurrently_modified(id: i64) -> AssignFlowError {
    AssignFlowError::invalid_state(format!("Assignment {id} was modified concurrently"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::models::assignments::entities::AssignmentState;
    use crate::models::principals::entities::PrincipalRole;
    use crate::storage::sea_orm_storage::SeaOrmStorage;

    const S1: i64 = 1;
    const S2: i64 = 2;
    const T1: i64 = 101;
    const T2: i64 = 102;

    async fn lifecycle() -> AssignmentLifecycle {
        let config = DatabaseConfig {
            url: ":memory:".to_string(),
            pool_size: 1,
            timeout: 5,
        };
        let storage = SeaOrmStorage::connect(&config)
            .await
            .expect("in-memory storage");
        AssignmentLifecycle::new(Arc::new(storage))
    }

    fn student(id: i64) -> Principal {
        Principal::student(id + 1000, id)
    }

    fn assert_invariants(a: &Assignment) {
        assert_eq!(a.grade.is_some(), a.state == AssignmentState::Graded);
        assert_eq!(a.teacher_id.is_some(), a.state != AssignmentState::Draft);
        if a.state != AssignmentState::Draft {
            assert!(a.content.is_some());
        }
    }

    async fn submitted(lc: &AssignmentLifecycle, content: &str) -> Assignment {
        let draft = lc
            .create_or_edit_draft(&student(S1), None, Some(content.to_string()))
            .await
            .unwrap();
        lc.submit(&student(S1), draft.id, T1).await.unwrap()
    }

    #[tokio::test]
    async fn test_full_lifecycle_scenario() {
        let lc = lifecycle().await;

        let draft = lc
            .create_or_edit_draft(&student(S1), None, Some("hello".into()))
            .await
            .unwrap();
        assert_eq!(draft.state, AssignmentState::Draft);
        assert_eq!(draft.student_id, S1);
        assert_invariants(&draft);

        let sub = lc.submit(&student(S1), draft.id, T1).await.unwrap();
        assert_eq!(sub.state, AssignmentState::Submitted);
        assert_eq!(sub.teacher_id, Some(T1));
        assert_invariants(&sub);

        let graded = lc
            .grade(&Principal::teacher(T1), draft.id, Grade::A)
            .await
            .unwrap();
        assert_eq!(graded.state, AssignmentState::Graded);
        assert_eq!(graded.grade, Some(Grade::A));
        assert_invariants(&graded);

        let regraded = lc
            .regrade(&Principal::teacher(T1), draft.id, Grade::B)
            .await
            .unwrap();
        assert_eq!(regraded.grade, Some(Grade::B));
        assert_eq!(regraded.state, AssignmentState::Graded);
        assert_eq!(regraded.teacher_id, Some(T1));
        assert_eq!(regraded.content.as_deref(), Some("hello"));
        assert_invariants(&regraded);
    }

    #[tokio::test]
    async fn test_null_content_is_invalid_input() {
        let lc = lifecycle().await;
        let err = lc
            .create_or_edit_draft(&student(S1), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AssignFlowError::InvalidInput(_)));
        assert!(lc.list_for_student(&student(S1)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_edit_draft_overwrites_content() {
        let lc = lifecycle().await;
        let draft = lc
            .create_or_edit_draft(&student(S1), None, Some("v1".into()))
            .await
            .unwrap();
        let edited = lc
            .create_or_edit_draft(&student(S1), Some(draft.id), Some("v2".into()))
            .await
            .unwrap();

        assert_eq!(edited.id, draft.id);
        assert_eq!(edited.content.as_deref(), Some("v2"));
        assert_eq!(edited.state, AssignmentState::Draft);
        assert_eq!(lc.list_for_student(&student(S1)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_edit_rejections() {
        let lc = lifecycle().await;
        let sub = submitted(&lc, "frozen").await;

        let err = lc
            .create_or_edit_draft(&student(S1), Some(sub.id), Some("changed".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, AssignFlowError::InvalidState(_)));

        let err = lc
            .create_or_edit_draft(&student(S2), Some(sub.id), Some("mine".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, AssignFlowError::NotFound(_)));

        let err = lc
            .create_or_edit_draft(&student(S1), Some(9999), Some("ghost".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, AssignFlowError::NotFound(_)));

        let after = lc.list_for_student(&student(S1)).await.unwrap();
        assert_eq!(after[0].content.as_deref(), Some("frozen"));
    }

    #[tokio::test]
    async fn test_submit_non_draft_is_invalid_state() {
        let lc = lifecycle().await;
        let sub = submitted(&lc, "work").await;

        for teacher in [T1, T2] {
            let err = lc.submit(&student(S1), sub.id, teacher).await.unwrap_err();
            assert!(matches!(err, AssignFlowError::InvalidState(_)));
        }

        lc.grade(&Principal::teacher(T1), sub.id, Grade::C)
            .await
            .unwrap();
        let err = lc.submit(&student(S1), sub.id, T1).await.unwrap_err();
        assert_eq!(
            err,
            AssignFlowError::invalid_state("only a draft assignment can be submitted")
        );
    }

    #[tokio::test]
    async fn test_submit_requires_ownership() {
        let lc = lifecycle().await;
        let draft = lc
            .create_or_edit_draft(&student(S1), None, Some("x".into()))
            .await
            .unwrap();

        let err = lc.submit(&student(S2), draft.id, T1).await.unwrap_err();
        assert!(matches!(err, AssignFlowError::NotFound(_)));

        let err = lc.submit(&student(S1), 4242, T1).await.unwrap_err();
        assert!(matches!(err, AssignFlowError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_grade_draft_is_invalid_state_even_for_strangers() {
        let lc = lifecycle().await;
        let draft = lc
            .create_or_edit_draft(&student(S1), None, Some("x".into()))
            .await
            .unwrap();

        for teacher in [T1, T2] {
            let err = lc
                .grade(&Principal::teacher(teacher), draft.id, Grade::A)
                .await
                .unwrap_err();
            assert!(matches!(err, AssignFlowError::InvalidState(_)));
        }
    }

    #[tokio::test]
    async fn test_grade_by_other_teacher_is_forbidden() {
        let lc = lifecycle().await;
        let sub = submitted(&lc, "x").await;

        let err = lc
            .grade(&Principal::teacher(T2), sub.id, Grade::A)
            .await
            .unwrap_err();
        assert!(matches!(err, AssignFlowError::Forbidden(_)));

        // 失败的操作不留下任何修改
        let unchanged = lc.list_for_teacher(&Principal::teacher(T1)).await.unwrap();
        assert_eq!(unchanged[0].state, AssignmentState::Submitted);
        assert_eq!(unchanged[0].grade, None);
        assert_invariants(&unchanged[0]);
    }

    #[tokio::test]
    async fn test_student_cannot_grade() {
        let lc = lifecycle().await;
        let sub = submitted(&lc, "x").await;

        let sneaky = Principal {
            user_id: T1,
            role: PrincipalRole::Student,
            student_id: Some(S1),
        };
        let err = lc.grade(&sneaky, sub.id, Grade::A).await.unwrap_err();
        assert!(matches!(err, AssignFlowError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_grade_twice_is_invalid_state() {
        let lc = lifecycle().await;
        let sub = submitted(&lc, "x").await;
        lc.grade(&Principal::teacher(T1), sub.id, Grade::A)
            .await
            .unwrap();

        let err = lc
            .grade(&Principal::teacher(T1), sub.id, Grade::B)
            .await
            .unwrap_err();
        assert!(matches!(err, AssignFlowError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_regrade_rules() {
        let lc = lifecycle().await;
        let sub = submitted(&lc, "x").await;

        let err = lc
            .regrade(&Principal::teacher(T1), sub.id, Grade::B)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            AssignFlowError::invalid_state("only graded assignments can be regraded")
        );

        lc.grade(&Principal::teacher(T1), sub.id, Grade::A)
            .await
            .unwrap();
        let err = lc
            .regrade(&Principal::teacher(T2), sub.id, Grade::D)
            .await
            .unwrap_err();
        assert!(matches!(err, AssignFlowError::Forbidden(_)));

        let err = lc
            .regrade(&Principal::teacher(T1), 777, Grade::D)
            .await
            .unwrap_err();
        assert!(matches!(err, AssignFlowError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_principal_role_grades_assigned_work() {
        let lc = lifecycle().await;
        let sub = submitted(&lc, "x").await;

        let graded = lc
            .grade(&Principal::principal(T1), sub.id, Grade::D)
            .await
            .unwrap();
        assert_eq!(graded.grade, Some(Grade::D));
    }

    #[tokio::test]
    async fn test_listing_by_role() {
        let lc = lifecycle().await;
        submitted(&lc, "one").await;
        lc.create_or_edit_draft(&student(S1), None, Some("two".into()))
            .await
            .unwrap();
        lc.create_or_edit_draft(&student(S2), None, Some("other".into()))
            .await
            .unwrap();

        assert_eq!(lc.list_for_student(&student(S1)).await.unwrap().len(), 2);
        assert_eq!(lc.list_for_student(&student(S2)).await.unwrap().len(), 1);
        assert_eq!(
            lc.list_for_teacher(&Principal::teacher(T1))
                .await
                .unwrap()
                .len(),
            1
        );
        assert!(
            lc.list_for_teacher(&Principal::teacher(T2))
                .await
                .unwrap()
                .is_empty()
        );
        assert!(lc.list_for_teacher(&student(S1)).await.is_err());
    }

    #[tokio::test]
    async fn test_teacher_cannot_write_drafts() {
        let lc = lifecycle().await;
        let err = lc
            .create_or_edit_draft(&Principal::teacher(T1), None, Some("x".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, AssignFlowError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_concurrent_submits_serialize() {
        let lc = lifecycle().await;
        let draft = lc
            .create_or_edit_draft(&student(S1), None, Some("race".into()))
            .await
            .unwrap();

        let s = student(S1);
        let (a, b) = tokio::join!(lc.submit(&s, draft.id, T1), lc.submit(&s, draft.id, T2));

        let results = [a, b];
        let ok: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        assert_eq!(ok.len(), 1);
        assert!(
            results
                .iter()
                .filter_map(|r| r.as_ref().err())
                .all(|e| matches!(e, AssignFlowError::InvalidState(_)))
        );

        let stored = lc.list_for_student(&s).await.unwrap();
        assert_eq!(stored[0].teacher_id, ok[0].teacher_id);
        assert_invariants(&stored[0]);
    }

    // 文件库 + 连接池时两个事务真正并行，后到者必须排队并看到已提交的状态
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_submits_serialize_on_file_database() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = DatabaseConfig {
            url: dir.path().join("assignflow.db").display().to_string(),
            pool_size: 8,
            timeout: 5,
        };
        let storage = SeaOrmStorage::connect(&config).await.expect("file storage");
        let lc = AssignmentLifecycle::new(Arc::new(storage));
        let s = student(S1);

        for round in 0..30 {
            let draft = lc
                .create_or_edit_draft(&s, None, Some(format!("round {round}")))
                .await
                .unwrap();

            let (a, b) = tokio::join!(lc.submit(&s, draft.id, T1), lc.submit(&s, draft.id, T2));
            let (winner, loser) = match (a, b) {
                (Ok(w), Err(l)) | (Err(l), Ok(w)) => (w, l),
                other => panic!("round {round}: expected exactly one submit to win, got {other:?}"),
            };
            assert!(
                matches!(loser, AssignFlowError::InvalidState(_)),
                "round {round}: {loser}"
            );
            assert_eq!(winner.state, AssignmentState::Submitted);
        }

        let stored = lc.list_for_student(&s).await.unwrap();
        assert_eq!(stored.len(), 30);
        stored.iter().for_each(assert_invariants);
    }
}
