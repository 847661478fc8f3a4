use crate::metadata::model::{MetadataRecord, RoleField, GEOMETRY_COLUMN, ID_LITERAL};
use crate::metadata::reconcile::AvailableColumns;
use crate::metadata::working::{parse_access_level, parse_visualization, WorkingRecord};
use regex::Regex;
use std::sync::OnceLock;

/// 阻止保存的问题，逐条收集，不在第一条就停
#[derive(Clone, Debug, PartialEq)]
pub enum ValidationIssue {
    OrphanDataColumn(String),
    InvalidAccessLevel(String),
    InvalidVisualization(String),
    DuplicateRoleEntry { field: RoleField, column: String },
    UnknownDetailsColumn(String),
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationIssue::OrphanDataColumn(c) => {
                write!(f, "data_columns entry {:?} has no column details", c)
            }
            ValidationIssue::InvalidAccessLevel(t) => {
                write!(f, "layer_access_level must be 0, 1 or 2, got {:?}", t)
            }
            ValidationIssue::InvalidVisualization(e) => {
                write!(f, "visualization is not a JSON object: {}", e)
            }
            ValidationIssue::DuplicateRoleEntry { field, column } => {
                write!(f, "{} lists {:?} more than once", field, column)
            }
            ValidationIssue::UnknownDetailsColumn(c) => write!(
                f,
                "obj_details_column {:?} must be \"id\" or an available column",
                c
            ),
        }
    }
}

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{\s*([^{}]+?)\s*\}\}").unwrap())
}

/// tooltip 模板中 `{{column}}` 引用的列名，按出现顺序去重
pub fn tooltip_placeholders(template: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for cap in placeholder_re().captures_iter(template) {
        let name = cap[1].to_string();
        if !out.contains(&name) {
            out.push(name);
        }
    }
    out
}

pub fn validate(working: &WorkingRecord, available: &AvailableColumns) -> Vec<ValidationIssue> {
    let record = &working.record;
    let mut issues = Vec::new();

    let mut data_columns = record.data_columns.clone();
    if !data_columns.iter().any(|c| c == GEOMETRY_COLUMN) {
        data_columns.push(GEOMETRY_COLUMN.to_string());
    }
    for name in &data_columns {
        if name != GEOMETRY_COLUMN && record.column(name).is_none() {
            issues.push(ValidationIssue::OrphanDataColumn(name.clone()));
        }
    }

    if parse_access_level(&working.access_level_input).is_none() {
        issues.push(ValidationIssue::InvalidAccessLevel(
            working.access_level_input.clone(),
        ));
    }

    if let Err(e) = parse_visualization(&working.visualization_input) {
        issues.push(ValidationIssue::InvalidVisualization(e));
    }

    for role in RoleField::ALL {
        let list = record.role(role);
        let mut reported: Vec<&String> = Vec::new();
        for (idx, name) in list.iter().enumerate() {
            if list[..idx].contains(name) && !reported.contains(&name) {
                reported.push(name);
                issues.push(ValidationIssue::DuplicateRoleEntry {
                    field: role,
                    column: name.clone(),
                });
            }
        }
    }

    let details = record.obj_details_column.as_str();
    if details != ID_LITERAL && !available.contains(details) {
        issues.push(ValidationIssue::UnknownDetailsColumn(details.to_string()));
    }

    issues
}

/// tooltip 中既不是 `id`、可选列，也不是计算字段的占位符。只作提示，不阻止保存。
pub fn tooltip_unknown_columns(
    record: &MetadataRecord,
    available: &AvailableColumns,
) -> Vec<String> {
    let calculated: Vec<&str> = record
        .calculated_fields
        .iter()
        .filter_map(|f| f.get("name").and_then(|n| n.as_str()))
        .collect();
    tooltip_placeholders(&record.tooltip_content)
        .into_iter()
        .filter(|name| {
            name != ID_LITERAL && !available.contains(name) && !calculated.contains(&name.as_str())
        })
        .collect()
}
