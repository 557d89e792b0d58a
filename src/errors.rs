//! 统一错误处理模块
//!
//! 使用宏自动生成错误类型，支持错误代码和类型名称。
//! 生命周期相关的四类错误（NotFound / InvalidState / Forbidden / InvalidInput）
//! 拥有各自稳定的错误代码，路由层据此映射 HTTP 状态码。

use std::fmt;

/// 定义错误类型的宏
///
/// 自动生成：
/// - enum 定义
/// - code() 方法 - 返回错误代码
/// - error_type() 方法 - 返回错误类型名称
/// - message() 方法 - 返回错误详情
/// - 便捷构造函数
macro_rules! define_assignflow_errors {
    ($(
        $variant:ident($code:literal, $type_name:literal)
    ),* $(,)?) => {
        #[derive(Debug, Clone, PartialEq)]
        pub enum AssignFlowError {
            $($variant(String),)*
        }

        impl AssignFlowError {
            /// 获取错误代码
            pub fn code(&self) -> &'static str {
                match self {
                    $(AssignFlowError::$variant(_) => $code,)*
                }
            }

            /// 获取错误类型名称
            pub fn error_type(&self) -> &'static str {
                match self {
                    $(AssignFlowError::$variant(_) => $type_name,)*
                }
            }

            /// 获取错误详情
            pub fn message(&self) -> &str {
                match self {
                    $(AssignFlowError::$variant(msg) => msg,)*
                }
            }
        }

        // 生成便捷构造函数
        paste::paste! {
            impl AssignFlowError {
                $(
                    pub fn [<$variant:snake>]<T: Into<String>>(msg: T) -> Self {
                        AssignFlowError::$variant(msg.into())
                    }
                )*
            }
        }
    };
}

define_assignflow_errors! {
    DatabaseConfig("E001", "Database Configuration Error"),
    DatabaseConnection("E002", "Database Connection Error"),
    DatabaseOperation("E003", "Database Operation Error"),
    Authentication("E004", "Authentication Error"),
    NotFound("E101", "Resource Not Found"),
    InvalidState("E102", "Invalid Assignment State"),
    Forbidden("E103", "Forbidden"),
    InvalidInput("E104", "Invalid Input"),
}

impl AssignFlowError {
    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }

    /// 是否为业务规则拒绝（而非基础设施故障）
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            AssignFlowError::NotFound(_)
                | AssignFlowError::InvalidState(_)
                | AssignFlowError::Forbidden(_)
                | AssignFlowError::InvalidInput(_)
        )
    }
}

impl fmt::Display for AssignFlowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for AssignFlowError {}

// 为常见的错误类型实现 From trait
impl From<sea_orm::DbErr> for AssignFlowError {
    fn from(err: sea_orm::DbErr) -> Self {
        AssignFlowError::DatabaseOperation(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AssignFlowError>;
