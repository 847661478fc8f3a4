pub mod dto;
pub mod service;

pub use dto::ExploreValue;
pub use service::CurationService;

use crate::metadata::validate::tooltip_unknown_columns;
use crate::metadata::{
    reconcile, validate, AvailableColumns, EditError, FieldEdit, SessionWarning, ValidationIssue,
    WorkingRecord,
};

/// 一次编辑会话：数据集 + 当前工作记录。编辑返回新的会话值。
#[derive(Debug, Clone)]
pub struct EditSession {
    pub dataset_id: String,
    pub dataset_key: String,
    /// 数据集采样得到的原始列
    pub discovered: Vec<String>,
    pub working: WorkingRecord,
    pub available: AvailableColumns,
}

impl EditSession {
    /// 应用一次编辑，然后按数据集的列重新调和
    pub fn apply(&self, edit: FieldEdit) -> Result<(EditSession, Vec<SessionWarning>), EditError> {
        let edited = self.working.apply(edit)?;
        let reconciled = reconcile(edited.record.clone(), &self.discovered);
        let warnings = reconciled
            .dropped
            .into_iter()
            .map(|d| SessionWarning::DroppedColumns {
                field: d.field,
                columns: d.columns,
            })
            .collect();
        let next = EditSession {
            working: edited.with_record(reconciled.record),
            available: reconciled.available,
            ..self.clone()
        };
        Ok((next, warnings))
    }

    pub fn validate(&self) -> Vec<ValidationIssue> {
        validate(&self.working, &self.available)
    }

    /// 不阻止保存的提示
    pub fn advisories(&self) -> Vec<SessionWarning> {
        let unknown = tooltip_unknown_columns(&self.working.record, &self.available);
        if unknown.is_empty() {
            Vec::new()
        } else {
            vec![SessionWarning::UnknownTooltipColumns(unknown)]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::model::{ColumnType, MetadataRecord, RoleField};

    fn session(discovered: &[&str]) -> EditSession {
        let discovered: Vec<String> = discovered.iter().map(|s| s.to_string()).collect();
        let reconciled = reconcile(MetadataRecord::default(), &discovered);
        EditSession {
            dataset_id: "county_pop".into(),
            dataset_key: "datasets/county_pop.json".into(),
            discovered,
            working: WorkingRecord::from_record(reconciled.record),
            available: reconciled.available,
        }
    }

    #[test]
    fn edit_then_reconcile_dedups() {
        let start = session(&["pop", "area", "geometry"]);
        let (next, warnings) = start
            .apply(FieldEdit::parse("data_columns", "pop,area,pop").unwrap())
            .unwrap();
        assert!(warnings.is_empty());
        assert_eq!(next.working.record.data_columns, vec!["pop", "area"]);
        let names: Vec<&str> = next
            .working
            .record
            .columns
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["pop", "area"]);
        assert!(next
            .working
            .record
            .columns
            .iter()
            .all(|c| c.column_type == ColumnType::Text));
        // 原会话不变
        assert!(start.working.record.data_columns.is_empty());
    }

    #[test]
    fn unknown_columns_in_edit_are_dropped_with_warning() {
        let start = session(&["pop"]);
        let (next, warnings) = start
            .apply(FieldEdit::parse("value_columns", "pop,ghost").unwrap())
            .unwrap();
        assert_eq!(next.working.record.value_columns, vec!["pop"]);
        assert_eq!(
            warnings,
            vec![SessionWarning::DroppedColumns {
                field: RoleField::Value,
                columns: vec!["ghost".into()],
            }]
        );
    }

    #[test]
    fn toggling_county_geoid_changes_available_columns() {
        let start = session(&["pop"]);
        assert!(!start.available.contains("state_name"));
        let (next, _) = start
            .apply(FieldEdit::parse("has_county_geoid", "true").unwrap())
            .unwrap();
        assert_eq!(next.available.names(), &["pop".to_string(), "state_name".to_string()][..]);
        let (next, warnings) = next
            .apply(FieldEdit::parse("category_columns", "state_name").unwrap())
            .unwrap();
        assert!(warnings.is_empty());
        assert_eq!(next.working.record.category_columns, vec!["state_name"]);
    }

    #[test]
    fn unknown_tooltip_column_is_advisory_only() {
        let start = session(&["pop"]);
        let (s, _) = start
            .apply(FieldEdit::parse("obj_details_column", "id").unwrap())
            .unwrap();
        let (s, _) = s
            .apply(FieldEdit::parse("tooltip-content", "{{density}} per km2").unwrap())
            .unwrap();
        assert!(s.validate().is_empty());
        assert_eq!(
            s.advisories(),
            vec![SessionWarning::UnknownTooltipColumns(vec!["density".into()])]
        );
    }

    #[test]
    fn column_details_survive_later_edits() {
        let start = session(&["pop", "area"]);
        let (s, _) = start
            .apply(FieldEdit::parse("value_columns", "pop").unwrap())
            .unwrap();
        let (s, _) = s
            .apply(FieldEdit::parse_column("pop", "type", "int").unwrap())
            .unwrap();
        let (s, _) = s
            .apply(FieldEdit::parse("details_columns", "area").unwrap())
            .unwrap();
        assert_eq!(s.working.record.column("pop").unwrap().column_type, ColumnType::Int);
        assert_eq!(s.working.record.columns.len(), 2);
    }
}
