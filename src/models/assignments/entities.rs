use serde::{Deserialize, Serialize};
use ts_rs::TS;

// 作业状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "../frontend/src/types/generated/assignment.ts")]
pub enum AssignmentState {
    Draft,     // 草稿
    Submitted, // 已提交
    Graded,    // 已评分
}

impl AssignmentState {
    pub const DRAFT: &'static str = "DRAFT";
    pub const SUBMITTED: &'static str = "SUBMITTED";
    pub const GRADED: &'static str = "GRADED";

    /// 校验某个动作在当前状态下是否合法，合法时返回目标状态
    ///
    /// ```text
    /// DRAFT     --edit-->    DRAFT
    /// DRAFT     --submit-->  SUBMITTED
    /// SUBMITTED --grade-->   GRADED
    /// GRADED    --regrade--> GRADED
    /// ```
    pub fn apply(self, action: AssignmentAction) -> Result<AssignmentState, &'static str> {
        use AssignmentAction as Act;
        use AssignmentState::*;

        match (self, action) {
            (Draft, Act::EditDraft) => Ok(Draft),
            (Submitted | Graded, Act::EditDraft) => Err("only a draft assignment can be edited"),

            (Draft, Act::Submit) => Ok(Submitted),
            (Submitted | Graded, Act::Submit) => Err("only a draft assignment can be submitted"),

            (Submitted, Act::Grade) => Ok(Graded),
            (Draft, Act::Grade) => Err("draft assignment cannot be graded"),
            (Graded, Act::Grade) => Err("assignment is already graded, use regrade"),

            (Graded, Act::Regrade) => Ok(Graded),
            (Draft | Submitted, Act::Regrade) => Err("only graded assignments can be regraded"),
        }
    }
}

impl std::fmt::Display for AssignmentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssignmentState::Draft => write!(f, "{}", AssignmentState::DRAFT),
            AssignmentState::Submitted => write!(f, "{}", AssignmentState::SUBMITTED),
            AssignmentState::Graded => write!(f, "{}", AssignmentState::GRADED),
        }
    }
}

impl std::str::FromStr for AssignmentState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            AssignmentState::DRAFT => Ok(AssignmentState::Draft),
            AssignmentState::SUBMITTED => Ok(AssignmentState::Submitted),
            AssignmentState::GRADED => Ok(AssignmentState::Graded),
            _ => Err(format!("Invalid assignment state: {s}")),
        }
    }
}

/// 作业上的生命周期动作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentAction {
    EditDraft,
    Submit,
    Grade,
    Regrade,
}

// 成绩等级
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/assignment.ts")]
pub enum Grade {
    A,
    B,
    C,
    D,
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Grade::A => write!(f, "A"),
            Grade::B => write!(f, "B"),
            Grade::C => write!(f, "C"),
            Grade::D => write!(f, "D"),
        }
    }
}

impl std::str::FromStr for Grade {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(Grade::A),
            "B" => Ok(Grade::B),
            "C" => Ok(Grade::C),
            "D" => Ok(Grade::D),
            _ => Err(format!("Invalid grade: {s}")),
        }
    }
}

/// 作业
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/assignment.ts")]
pub struct Assignment {
    // 唯一 ID
    pub id: i64,
    // 所属学生，创建后不可变
    pub student_id: i64,
    // 评分教师，提交时设置
    pub teacher_id: Option<i64>,
    // 作业内容，仅草稿状态可修改
    pub content: Option<String>,
    // 成绩，仅评分/重评时设置
    pub grade: Option<Grade>,
    // 生命周期状态
    pub state: AssignmentState,
    // 创建时间
    pub created_at: chrono::DateTime<chrono::Utc>,
    // 更新时间
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Assignment {
    pub fn is_assigned_to(&self, teacher_id: i64) -> bool {
        self.teacher_id == Some(teacher_id)
    }
}
