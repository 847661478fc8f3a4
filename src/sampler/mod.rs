pub mod feature_stream;

use crate::metadata::CurationError;
use crate::storage::BlobStore;
use feature_stream::FeatureScanner;
use futures::StreamExt;
use log::info;
use serde_json::{Map, Value};

pub const DEFAULT_SAMPLE_LIMIT: usize = 1000;

/// 数据集前 N 个 feature 的属性表
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SampleTable {
    /// 所有行属性 key 的并集，按首次出现顺序
    pub columns: Vec<String>,
    pub rows: Vec<Map<String, Value>>,
}

impl SampleTable {
    fn push_feature(&mut self, feature: Value, idx: usize) -> Result<(), String> {
        let props = match feature.get("properties") {
            Some(Value::Object(m)) => m.clone(),
            Some(Value::Null) | None => Map::new(),
            Some(_) => return Err(format!("feature #{} has non-object properties", idx)),
        };
        for key in props.keys() {
            if !self.columns.iter().any(|c| c == key) {
                self.columns.push(key.clone());
            }
        }
        self.rows.push(props);
        Ok(())
    }

    pub fn preview(&self, n: usize) -> &[Map<String, Value>] {
        &self.rows[..n.min(self.rows.len())]
    }
}

/// 流式读取 `key` 指向的 FeatureCollection，只取前 `limit` 个 feature
pub async fn sample_dataset(
    store: &dyn BlobStore,
    key: &str,
    limit: usize,
) -> Result<SampleTable, CurationError> {
    let mut stream = store
        .get_stream(key)
        .await
        .map_err(|e| CurationError::SourceUnavailable(format!("{}: {}", key, e)))?;

    let mut scanner = FeatureScanner::new();
    let mut table = SampleTable::default();
    let mut bytes_read = 0usize;

    while table.rows.len() < limit {
        let Some(chunk) = stream.next().await else {
            scanner
                .finish()
                .map_err(|e| CurationError::MalformedSource(format!("{}: {}", key, e)))?;
            break;
        };
        let chunk =
            chunk.map_err(|e| CurationError::SourceUnavailable(format!("{}: {}", key, e)))?;
        bytes_read += chunk.len();

        let features = scanner
            .feed(&chunk, limit - table.rows.len())
            .map_err(|e| CurationError::MalformedSource(format!("{}: {}", key, e)))?;
        for feature in features {
            let idx = table.rows.len();
            table
                .push_feature(feature, idx)
                .map_err(|e| CurationError::MalformedSource(format!("{}: {}", key, e)))?;
        }
        if scanner.is_done() {
            break;
        }
    }

    info!(
        "采样 {}: {} 行, {} 列, 读取 {} bytes",
        key,
        table.rows.len(),
        table.columns.len(),
        bytes_read
    );
    Ok(table)
}
