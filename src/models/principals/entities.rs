use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::errors::{AssignFlowError, Result};

// 调用者角色
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "../frontend/src/types/generated/principal.ts")]
pub enum PrincipalRole {
    Student,   // 学生
    Teacher,   // 教师
    Principal, // 校长
}

impl PrincipalRole {
    pub const STUDENT: &'static str = "student";
    pub const TEACHER: &'static str = "teacher";
    pub const PRINCIPAL: &'static str = "principal";

    pub fn student_roles() -> &'static [&'static PrincipalRole] {
        &[&Self::Student]
    }
    pub fn teacher_roles() -> &'static [&'static PrincipalRole] {
        &[&Self::Teacher]
    }
    pub fn principal_roles() -> &'static [&'static PrincipalRole] {
        &[&Self::Principal]
    }
}

impl<'de> Deserialize<'de> for PrincipalRole {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse::<PrincipalRole>().map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Display for PrincipalRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrincipalRole::Student => write!(f, "{}", PrincipalRole::STUDENT),
            PrincipalRole::Teacher => write!(f, "{}", PrincipalRole::TEACHER),
            PrincipalRole::Principal => write!(f, "{}", PrincipalRole::PRINCIPAL),
        }
    }
}

impl std::str::FromStr for PrincipalRole {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            PrincipalRole::STUDENT => Ok(PrincipalRole::Student),
            PrincipalRole::TEACHER => Ok(PrincipalRole::Teacher),
            PrincipalRole::PRINCIPAL => Ok(PrincipalRole::Principal),
            _ => Err(format!(
                "无效的角色: '{s}'. 支持的角色: student, teacher, principal"
            )),
        }
    }
}

/// 已认证的调用者
///
/// 由认证中间件从访问令牌解析得到，核心逻辑只消费、不重新推导。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/principal.ts")]
pub struct Principal {
    pub user_id: i64,
    pub role: PrincipalRole,
    // 仅学生持有
    pub student_id: Option<i64>,
}

impl Principal {
    pub fn student(user_id: i64, student_id: i64) -> Self {
        Self {
            user_id,
            role: PrincipalRole::Student,
            student_id: Some(student_id),
        }
    }

    pub fn teacher(user_id: i64) -> Self {
        Self {
            user_id,
            role: PrincipalRole::Teacher,
            student_id: None,
        }
    }

    pub fn principal(user_id: i64) -> Self {
        Self {
            user_id,
            role: PrincipalRole::Principal,
            student_id: None,
        }
    }

    /// 教师与校长都可以评分
    pub fn can_grade(&self) -> bool {
        match self.role {
            PrincipalRole::Teacher | PrincipalRole::Principal => true,
            PrincipalRole::Student => false,
        }
    }

    /// 学生身份的 student_id；非学生调用学生操作视为越权
    pub fn require_student_id(&self) -> Result<i64> {
        match (self.role, self.student_id) {
            (PrincipalRole::Student, Some(student_id)) => Ok(student_id),
            (PrincipalRole::Student, None) => Err(AssignFlowError::forbidden(
                "student principal carries no student_id",
            )),
            (role, _) => Err(AssignFlowError::forbidden(format!(
                "role '{role}' cannot act on student assignments"
            ))),
        }
    }
}
