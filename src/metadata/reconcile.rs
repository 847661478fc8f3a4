use crate::metadata::model::{
    format_updated_at, ColumnDetail, MetadataRecord, RoleField, GEOMETRY_COLUMN,
    RAW_GEOMETRY_COLUMNS, STATE_NAME_COLUMN,
};
use chrono::{DateTime, Utc};
use log::warn;

/// 可供角色列表选择的列（有序）
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AvailableColumns {
    names: Vec<String>,
}

impl AvailableColumns {
    /// 从数据集发现的列推导：去掉几何列，has_county_geoid 时补上 state_name
    pub fn derive(discovered: &[String], has_county_geoid: bool) -> Self {
        let mut names: Vec<String> = Vec::with_capacity(discovered.len() + 1);
        for name in discovered {
            if RAW_GEOMETRY_COLUMNS.contains(&name.as_str()) || names.contains(name) {
                continue;
            }
            names.push(name.clone());
        }
        if has_county_geoid && !names.iter().any(|n| n == STATE_NAME_COLUMN) {
            names.push(STATE_NAME_COLUMN.to_string());
        }
        Self { names }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DroppedColumns {
    pub field: RoleField,
    pub columns: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct Reconciled {
    pub record: MetadataRecord,
    pub available: AvailableColumns,
    pub dropped: Vec<DroppedColumns>,
}

/// 过滤 + 去重，保持首次出现顺序；返回被过滤掉（不可用）的列
fn filter_role(list: &[String], available: &AvailableColumns) -> (Vec<String>, Vec<String>) {
    let mut kept: Vec<String> = Vec::with_capacity(list.len());
    let mut dropped: Vec<String> = Vec::new();
    for name in list {
        if name == GEOMETRY_COLUMN {
            continue;
        }
        if !available.contains(name) {
            if !dropped.contains(name) {
                dropped.push(name.clone());
            }
            continue;
        }
        if !kept.contains(name) {
            kept.push(name.clone());
        }
    }
    (kept, dropped)
}

pub fn reconcile(record: MetadataRecord, discovered: &[String]) -> Reconciled {
    reconcile_at(record, discovered, Utc::now())
}

/// 按当前数据集的列对记录做一次调和。时间戳由调用方给出，便于保证结果确定。
pub fn reconcile_at(
    mut record: MetadataRecord,
    discovered: &[String],
    now: DateTime<Utc>,
) -> Reconciled {
    let available = AvailableColumns::derive(discovered, record.has_county_geoid);

    let mut dropped = Vec::new();
    for role in RoleField::ALL {
        let (kept, gone) = filter_role(record.role(role), &available);
        *record.role_mut(role) = kept;
        if !gone.is_empty() {
            warn!("{} 中的列已不在数据集中，已移除: {:?}", role, gone);
            dropped.push(DroppedColumns {
                field: role,
                columns: gone,
            });
        }
    }

    let columns: Vec<ColumnDetail> = record
        .selected_columns()
        .iter()
        .map(|name| {
            record
                .column(name)
                .cloned()
                .unwrap_or_else(|| ColumnDetail::synthesize(name))
        })
        .collect();
    record.columns = columns;
    record.updated_at = format_updated_at(now);

    Reconciled {
        record,
        available,
        dropped,
    }
}
