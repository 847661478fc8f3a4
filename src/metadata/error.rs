use crate::metadata::model::RoleField;
use crate::metadata::validate::ValidationIssue;

#[derive(thiserror::Error, Debug)]
pub enum CurationError {
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),
    #[error("malformed source: {0}")]
    MalformedSource(String),
    #[error("validation failed with {} issue(s)", .0.len())]
    Validation(Vec<ValidationIssue>),
    #[error("persist failure: {0}")]
    PersistFailure(String),
}

/// 读取侧可恢复的问题：记录日志并随会话结果一起返回，不中断编辑
#[derive(Clone, Debug, PartialEq)]
pub enum SessionWarning {
    /// 找到了旧的元数据对象但无法解析，按“没有旧记录”处理
    MalformedPriorMetadata { key: String, reason: String },
    /// 列出 metadata 前缀失败，按“没有旧记录”处理
    PriorLookupFailed(String),
    /// 数据集对象读取失败，可选列退化为旧记录中引用过的列
    DatasetUnavailable { key: String, reason: String },
    /// 角色列表中引用了当前数据集已不存在的列
    DroppedColumns { field: RoleField, columns: Vec<String> },
    /// tooltip 占位符引用了未知的列（不阻止保存）
    UnknownTooltipColumns(Vec<String>),
}

impl std::fmt::Display for SessionWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionWarning::MalformedPriorMetadata { key, reason } => {
                write!(f, "元数据 {} 无法解析，已按新记录处理: {}", key, reason)
            }
            SessionWarning::PriorLookupFailed(reason) => {
                write!(f, "查找旧元数据失败，已按新记录处理: {}", reason)
            }
            SessionWarning::DatasetUnavailable { key, reason } => {
                write!(
                    f,
                    "数据集 {} 不可读，可选列仅限旧记录中的列: {}",
                    key, reason
                )
            }
            SessionWarning::DroppedColumns { field, columns } => {
                write!(
                    f,
                    "{} 中的列已不在数据集中，已移除: {}",
                    field,
                    columns.join(", ")
                )
            }
            SessionWarning::UnknownTooltipColumns(columns) => {
                write!(f, "tooltip-content 引用了未知的列: {}", columns.join(", "))
            }
        }
    }
}
