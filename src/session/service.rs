use crate::metadata::model::format_updated_at;
use crate::metadata::persist::persist;
use crate::metadata::working::{parse_access_level, parse_visualization};
use crate::metadata::{
    normalize, reconcile, CurationError, MetadataRecord, SessionWarning, ValidationIssue,
    WorkingRecord,
};
use crate::sampler::sample_dataset;
use crate::session::dto::{ExploreRow, ExploreValue, PriorMetadata, SavedRecord, SessionStart};
use crate::session::EditSession;
use crate::storage::keys::{
    dataset_identifier, dataset_key, is_top_level_json, metadata_key, object_name,
    DATASETS_PREFIX, METADATA_PREFIX,
};
use crate::storage::{BlobStore, StoreError};
use chrono::Utc;
use log::{info, warn};
use serde_json::Value;
use std::sync::Arc;

/// 预览表显示的行数
pub const PREVIEW_ROWS: usize = 5;

pub struct CurationService {
    store: Arc<dyn BlobStore>,
    sample_limit: usize,
}

impl CurationService {
    pub fn new(store: Arc<dyn BlobStore>, sample_limit: usize) -> Self {
        Self {
            store,
            sample_limit,
        }
    }

    /// `datasets/` 下第一层的 json 对象
    pub async fn list_datasets(&self) -> Result<Vec<String>, CurationError> {
        let keys = self
            .store
            .list(DATASETS_PREFIX)
            .await
            .map_err(|e| CurationError::SourceUnavailable(format!("{}: {}", DATASETS_PREFIX, e)))?;
        Ok(keys.into_iter().filter(|k| is_top_level_json(k)).collect())
    }

    /// 查找数据集的旧元数据。
    /// 在“第一个对象名包含标识（忽略大小写）的 key”这一模糊匹配之上，
    /// 先看精确 key `metadata/<id>_metadata.json`，避免 `pop` 命中 `county_pop_metadata.json`。
    pub async fn find_prior(&self, dataset_id: &str) -> Result<PriorMetadata, StoreError> {
        if dataset_id.is_empty() {
            return Ok(PriorMetadata::Absent);
        }
        let keys = self.store.list(METADATA_PREFIX).await?;
        let exact = metadata_key(dataset_id);
        let needle = dataset_id.to_lowercase();
        let key = if keys.contains(&exact) {
            exact
        } else {
            match keys
                .iter()
                .find(|k| object_name(k).to_lowercase().contains(&needle))
            {
                Some(k) => k.clone(),
                None => return Ok(PriorMetadata::Absent),
            }
        };

        let body = self.store.get(&key).await?;
        let text = match std::str::from_utf8(&body) {
            Ok(t) => t,
            Err(e) => {
                return Ok(PriorMetadata::Corrupt {
                    key,
                    reason: format!("not utf-8: {}", e),
                })
            }
        };
        let raw: Value = match serde_json::from_str(text) {
            Ok(v) => v,
            Err(e) => {
                return Ok(PriorMetadata::Corrupt {
                    key,
                    reason: e.to_string(),
                })
            }
        };
        if !raw.is_object() {
            return Ok(PriorMetadata::Corrupt {
                key,
                reason: "top-level value is not an object".to_string(),
            });
        }
        Ok(PriorMetadata::Found {
            key,
            record: normalize(&raw),
        })
    }

    /// 打开数据集：加载旧元数据、采样列、调和，得到初始会话
    pub async fn start_session(&self, dataset_ref: &str) -> Result<SessionStart, CurationError> {
        let key = dataset_key(dataset_ref);
        let dataset_id = dataset_identifier(&key);
        let mut warnings = Vec::new();

        let prior = match self.find_prior(&dataset_id).await {
            Ok(p) => p,
            Err(e) => {
                warn!("查找旧元数据失败 {}: {}", dataset_id, e);
                warnings.push(SessionWarning::PriorLookupFailed(e.to_string()));
                PriorMetadata::Absent
            }
        };
        let (record, prior_key) = match prior {
            PriorMetadata::Absent => (MetadataRecord::default(), None),
            PriorMetadata::Found { key, record } => {
                info!("载入旧元数据: {}", key);
                (record, Some(key))
            }
            PriorMetadata::Corrupt { key, reason } => {
                warn!("旧元数据无法解析 {}: {}", key, reason);
                warnings.push(SessionWarning::MalformedPriorMetadata { key, reason });
                (MetadataRecord::default(), None)
            }
        };

        let sampled = sample_dataset(self.store.as_ref(), &key, self.sample_limit).await;
        let (discovered, preview) = match sampled {
            Ok(table) => {
                let preview = table.preview(PREVIEW_ROWS).to_vec();
                (table.columns, preview)
            }
            Err(CurationError::SourceUnavailable(reason)) if prior_key.is_some() => {
                warn!("数据集不可读，使用旧记录中的列: {}", reason);
                warnings.push(SessionWarning::DatasetUnavailable {
                    key: key.clone(),
                    reason,
                });
                (record.referenced_columns(), Vec::new())
            }
            Err(e) => return Err(e),
        };

        let reconciled = reconcile(record, &discovered);
        for dropped in reconciled.dropped {
            warnings.push(SessionWarning::DroppedColumns {
                field: dropped.field,
                columns: dropped.columns,
            });
        }

        info!(
            "会话开始: {} ({} 个可选列, {} 条警告)",
            dataset_id,
            reconciled.available.len(),
            warnings.len()
        );
        Ok(SessionStart {
            session: EditSession {
                dataset_id,
                dataset_key: key,
                discovered,
                working: WorkingRecord::from_record(reconciled.record),
                available: reconciled.available,
            },
            warnings,
            preview,
            prior_key,
        })
    }

    pub fn validate(&self, session: &EditSession) -> Vec<ValidationIssue> {
        session.validate()
    }

    /// 校验通过后写入存储，会话本身不变
    pub async fn save(&self, session: &EditSession) -> Result<SavedRecord, CurationError> {
        let issues = session.validate();
        if !issues.is_empty() {
            warn!("{} 校验未通过: {} 个问题", session.dataset_id, issues.len());
            return Err(CurationError::Validation(issues));
        }

        let working = &session.working;
        let mut record = working.record.clone();
        if let Some(level) = parse_access_level(&working.access_level_input) {
            record.layer_access_level = level;
        }
        if let Ok(v) = parse_visualization(&working.visualization_input) {
            record.visualization = v;
        }
        record.updated_at = format_updated_at(Utc::now());

        let key = persist(self.store.as_ref(), &record, &session.dataset_id).await?;
        Ok(SavedRecord { key, record })
    }

    /// 列出每个元数据对象中某个字段的原始值
    pub async fn explore_field(&self, field: &str) -> Result<Vec<ExploreRow>, CurationError> {
        let keys = self
            .store
            .list(METADATA_PREFIX)
            .await
            .map_err(|e| CurationError::SourceUnavailable(format!("{}: {}", METADATA_PREFIX, e)))?;

        let mut rows = Vec::new();
        for key in keys.into_iter().filter(|k| is_top_level_json(k)) {
            let value = match self.store.get(&key).await {
                Ok(body) => match serde_json::from_slice::<Value>(&body) {
                    Ok(raw) => match raw.get(field) {
                        Some(v) => ExploreValue::Present(v.clone()),
                        None => ExploreValue::Missing,
                    },
                    Err(e) => ExploreValue::Unreadable(e.to_string()),
                },
                Err(e) => ExploreValue::Unreadable(e.to_string()),
            };
            rows.push(ExploreRow { key, value });
        }
        Ok(rows)
    }
}
