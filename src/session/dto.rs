use crate::metadata::{MetadataRecord, SessionWarning};
use crate::session::EditSession;
use serde_json::{Map, Value};

/// 查找旧元数据的结果：没有 / 找到 / 找到但读不了
#[derive(Debug, Clone, PartialEq)]
pub enum PriorMetadata {
    Absent,
    Found { key: String, record: MetadataRecord },
    Corrupt { key: String, reason: String },
}

#[derive(Debug, Clone)]
pub struct SessionStart {
    pub session: EditSession,
    pub warnings: Vec<SessionWarning>,
    /// 采样的前几行，用于预览
    pub preview: Vec<Map<String, Value>>,
    pub prior_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SavedRecord {
    pub key: String,
    pub record: MetadataRecord,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExploreValue {
    Present(Value),
    Missing,
    Unreadable(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExploreRow {
    pub key: String,
    pub value: ExploreValue,
}
