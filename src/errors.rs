use std::fmt;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};

#[derive(Debug, Clone)]
pub enum ClickLedgerError {
    Config(String),
    DatabaseConnection(String),
    Storage(String),
    Fallback(String),
    DurableUnavailable(String),
    Validation(String),
    Unauthorized(String),
    NotFound(String),
    Serialization(String),
    FileOperation(String),
}

impl ClickLedgerError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            ClickLedgerError::Config(_) => "E001",
            ClickLedgerError::DatabaseConnection(_) => "E002",
            ClickLedgerError::Storage(_) => "E003",
            ClickLedgerError::Fallback(_) => "E004",
            ClickLedgerError::DurableUnavailable(_) => "E005",
            ClickLedgerError::Validation(_) => "E006",
            ClickLedgerError::Unauthorized(_) => "E007",
            ClickLedgerError::NotFound(_) => "E008",
            ClickLedgerError::Serialization(_) => "E009",
            ClickLedgerError::FileOperation(_) => "E010",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            ClickLedgerError::Config(_) => "Configuration Error",
            ClickLedgerError::DatabaseConnection(_) => "Database Connection Error",
            ClickLedgerError::Storage(_) => "Storage Error",
            ClickLedgerError::Fallback(_) => "Fallback Store Error",
            ClickLedgerError::DurableUnavailable(_) => "Durable Counter Unavailable",
            ClickLedgerError::Validation(_) => "Validation Error",
            ClickLedgerError::Unauthorized(_) => "Unauthorized",
            ClickLedgerError::NotFound(_) => "Resource Not Found",
            ClickLedgerError::Serialization(_) => "Serialization Error",
            ClickLedgerError::FileOperation(_) => "File Operation Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            ClickLedgerError::Config(msg)
            | ClickLedgerError::DatabaseConnection(msg)
            | ClickLedgerError::Storage(msg)
            | ClickLedgerError::Fallback(msg)
            | ClickLedgerError::DurableUnavailable(msg)
            | ClickLedgerError::Validation(msg)
            | ClickLedgerError::Unauthorized(msg)
            | ClickLedgerError::NotFound(msg)
            | ClickLedgerError::Serialization(msg)
            | ClickLedgerError::FileOperation(msg) => msg,
        }
    }

    /// 持久层是否不可用（超时、邮箱关闭或存储失败）
    ///
    /// 点击写入路径遇到这类错误时走降级计数。
    pub fn is_durable_failure(&self) -> bool {
        matches!(
            self,
            ClickLedgerError::DurableUnavailable(_)
                | ClickLedgerError::Storage(_)
                | ClickLedgerError::Serialization(_)
                | ClickLedgerError::DatabaseConnection(_)
        )
    }

    /// 格式化为彩色输出（用于启动失败时打印到终端）
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for ClickLedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for ClickLedgerError {}

// 便捷的构造函数
impl ClickLedgerError {
    pub fn config<T: Into<String>>(msg: T) -> Self {
        ClickLedgerError::Config(msg.into())
    }

    pub fn database_connection<T: Into<String>>(msg: T) -> Self {
        ClickLedgerError::DatabaseConnection(msg.into())
    }

    pub fn storage<T: Into<String>>(msg: T) -> Self {
        ClickLedgerError::Storage(msg.into())
    }

    pub fn fallback<T: Into<String>>(msg: T) -> Self {
        ClickLedgerError::Fallback(msg.into())
    }

    pub fn durable_unavailable<T: Into<String>>(msg: T) -> Self {
        ClickLedgerError::DurableUnavailable(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        ClickLedgerError::Validation(msg.into())
    }

    pub fn unauthorized<T: Into<String>>(msg: T) -> Self {
        ClickLedgerError::Unauthorized(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        ClickLedgerError::NotFound(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        ClickLedgerError::Serialization(msg.into())
    }

    pub fn file_operation<T: Into<String>>(msg: T) -> Self {
        ClickLedgerError::FileOperation(msg.into())
    }
}

// 为常见的错误类型实现 From trait
impl From<sea_orm::DbErr> for ClickLedgerError {
    fn from(err: sea_orm::DbErr) -> Self {
        ClickLedgerError::Storage(err.to_string())
    }
}

impl From<redis::RedisError> for ClickLedgerError {
    fn from(err: redis::RedisError) -> Self {
        ClickLedgerError::Fallback(err.to_string())
    }
}

impl From<serde_json::Error> for ClickLedgerError {
    fn from(err: serde_json::Error) -> Self {
        ClickLedgerError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for ClickLedgerError {
    fn from(err: std::io::Error) -> Self {
        ClickLedgerError::FileOperation(err.to_string())
    }
}

impl From<config::ConfigError> for ClickLedgerError {
    fn from(err: config::ConfigError) -> Self {
        ClickLedgerError::Config(err.to_string())
    }
}

impl ResponseError for ClickLedgerError {
    fn status_code(&self) -> StatusCode {
        match self {
            ClickLedgerError::Validation(_) => StatusCode::BAD_REQUEST,
            ClickLedgerError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ClickLedgerError::NotFound(_) => StatusCode::NOT_FOUND,
            ClickLedgerError::DurableUnavailable(_)
            | ClickLedgerError::Storage(_)
            | ClickLedgerError::Fallback(_)
            | ClickLedgerError::DatabaseConnection(_) => StatusCode::SERVICE_UNAVAILABLE,
            ClickLedgerError::Config(_)
            | ClickLedgerError::Serialization(_)
            | ClickLedgerError::FileOperation(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "ok": false,
            "code": self.code(),
            "error": self.message(),
        }))
    }
}

pub type Result<T> = std::result::Result<T, ClickLedgerError>;
