//! 编辑中的工作记录。每次编辑返回一个新的值，而不是原地修改。
//!
//! `layer_access_level` 和 `visualization` 在表单里是可编辑文本，文本本身保存在
//! 工作记录里，只有能解析时才回写到记录字段，否则保留旧值，留给校验阶段报告。

use crate::metadata::model::{
    ColumnDetail, ColumnType, MetadataRecord, RoleField, FIELD_NAMES, MAX_ACCESS_LEVEL,
};
use serde_json::Value;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum EditError {
    #[error("unknown field: {0}")]
    UnknownField(String),
    #[error("field {0} is not editable")]
    ReadOnlyField(String),
    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },
    #[error("column {0} is not part of any role list")]
    UnknownColumn(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextField {
    Name,
    LayerId,
    GeomType,
    GeomJoin,
    Description,
    ObjDetailsColumn,
    TooltipTitle,
    TooltipContent,
    S3FilePath,
    ViewName,
    HumanIdentifierField,
}

impl TextField {
    fn parse(s: &str) -> Option<TextField> {
        Some(match s {
            "name" => TextField::Name,
            "layer_id" => TextField::LayerId,
            "geom_type" => TextField::GeomType,
            "geom_join" => TextField::GeomJoin,
            "description" => TextField::Description,
            "obj_details_column" => TextField::ObjDetailsColumn,
            "tooltip-title" => TextField::TooltipTitle,
            "tooltip-content" => TextField::TooltipContent,
            "s3_file_path" => TextField::S3FilePath,
            "view_name" => TextField::ViewName,
            "human_identifier_field" => TextField::HumanIdentifierField,
            _ => return None,
        })
    }

    fn slot(self, record: &mut MetadataRecord) -> &mut String {
        match self {
            TextField::Name => &mut record.name,
            TextField::LayerId => &mut record.layer_id,
            TextField::GeomType => &mut record.geom_type,
            TextField::GeomJoin => &mut record.geom_join,
            TextField::Description => &mut record.description,
            TextField::ObjDetailsColumn => &mut record.obj_details_column,
            TextField::TooltipTitle => &mut record.tooltip_title,
            TextField::TooltipContent => &mut record.tooltip_content,
            TextField::S3FilePath => &mut record.s3_file_path,
            TextField::ViewName => &mut record.view_name,
            TextField::HumanIdentifierField => &mut record.human_identifier_field,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlagField {
    HasBiomass,
    HasCountyGeoid,
    SupplierLayer,
}

impl FlagField {
    fn parse(s: &str) -> Option<FlagField> {
        Some(match s {
            "has_biomass" => FlagField::HasBiomass,
            "has_county_geoid" => FlagField::HasCountyGeoid,
            "supplier_layer" => FlagField::SupplierLayer,
            _ => return None,
        })
    }

    fn slot(self, record: &mut MetadataRecord) -> &mut bool {
        match self {
            FlagField::HasBiomass => &mut record.has_biomass,
            FlagField::HasCountyGeoid => &mut record.has_county_geoid,
            FlagField::SupplierLayer => &mut record.supplier_layer,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnAttr {
    Label,
    Type,
    Description,
}

impl ColumnAttr {
    pub fn parse(s: &str) -> Option<ColumnAttr> {
        Some(match s {
            "label" => ColumnAttr::Label,
            "type" => ColumnAttr::Type,
            "description" => ColumnAttr::Description,
            _ => return None,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum FieldEdit {
    Text(TextField, String),
    Flag(FlagField, bool),
    Roles(RoleField, Vec<String>),
    LayerAccessLevel(String),
    Visualization(String),
    ColumnLabel { column: String, label: String },
    ColumnType { column: String, column_type: ColumnType },
    ColumnDescription { column: String, description: String },
}

fn parse_flag(field: &str, value: &str) -> Result<bool, EditError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(EditError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
        }),
    }
}

/// 逗号分隔的列清单；不在这里去重，去重是调和阶段的职责
fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|x| x.trim())
        .filter(|x| !x.is_empty())
        .map(|x| x.to_string())
        .collect()
}

pub fn parse_access_level(text: &str) -> Option<u8> {
    text.trim()
        .parse::<u8>()
        .ok()
        .filter(|v| *v <= MAX_ACCESS_LEVEL)
}

pub fn parse_visualization(text: &str) -> Result<Value, String> {
    match serde_json::from_str::<Value>(text) {
        Ok(v @ Value::Object(_)) => Ok(v),
        Ok(_) => Err("not a JSON object".to_string()),
        Err(e) => Err(e.to_string()),
    }
}

impl FieldEdit {
    /// 按字段名解析一次编辑
    pub fn parse(field: &str, value: &str) -> Result<FieldEdit, EditError> {
        if let Some(f) = TextField::parse(field) {
            return Ok(FieldEdit::Text(f, value.to_string()));
        }
        if let Some(f) = FlagField::parse(field) {
            return Ok(FieldEdit::Flag(f, parse_flag(field, value)?));
        }
        if let Some(r) = RoleField::parse(field) {
            return Ok(FieldEdit::Roles(r, parse_list(value)));
        }
        match field {
            "layer_access_level" => Ok(FieldEdit::LayerAccessLevel(value.to_string())),
            "visualization" => Ok(FieldEdit::Visualization(value.to_string())),
            other if FIELD_NAMES.contains(&other) => {
                Err(EditError::ReadOnlyField(other.to_string()))
            }
            other => Err(EditError::UnknownField(other.to_string())),
        }
    }

    pub fn parse_column(column: &str, attr: &str, value: &str) -> Result<FieldEdit, EditError> {
        let column = column.to_string();
        match ColumnAttr::parse(attr) {
            Some(ColumnAttr::Label) => Ok(FieldEdit::ColumnLabel {
                column,
                label: value.to_string(),
            }),
            Some(ColumnAttr::Description) => Ok(FieldEdit::ColumnDescription {
                column,
                description: value.to_string(),
            }),
            Some(ColumnAttr::Type) => match ColumnType::parse(value) {
                Some(column_type) => Ok(FieldEdit::ColumnType {
                    column,
                    column_type,
                }),
                None => Err(EditError::InvalidValue {
                    field: "type".to_string(),
                    value: value.to_string(),
                }),
            },
            None => Err(EditError::UnknownField(attr.to_string())),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct WorkingRecord {
    pub record: MetadataRecord,
    pub access_level_input: String,
    pub visualization_input: String,
}

impl WorkingRecord {
    pub fn from_record(record: MetadataRecord) -> Self {
        let access_level_input = record.layer_access_level.to_string();
        let visualization_input =
            serde_json::to_string(&record.visualization).unwrap_or_else(|_| "{}".to_string());
        Self {
            record,
            access_level_input,
            visualization_input,
        }
    }

    /// 替换底层记录（例如调和之后），保留表单文本
    pub fn with_record(&self, record: MetadataRecord) -> Self {
        Self {
            record,
            access_level_input: self.access_level_input.clone(),
            visualization_input: self.visualization_input.clone(),
        }
    }

    pub fn apply(&self, edit: FieldEdit) -> Result<WorkingRecord, EditError> {
        let mut next = self.clone();
        match edit {
            FieldEdit::Text(field, value) => *field.slot(&mut next.record) = value,
            FieldEdit::Flag(field, value) => *field.slot(&mut next.record) = value,
            FieldEdit::Roles(role, columns) => *next.record.role_mut(role) = columns,
            FieldEdit::LayerAccessLevel(text) => {
                if let Some(level) = parse_access_level(&text) {
                    next.record.layer_access_level = level;
                }
                next.access_level_input = text;
            }
            FieldEdit::Visualization(text) => {
                if let Ok(v) = parse_visualization(&text) {
                    next.record.visualization = v;
                }
                next.visualization_input = text;
            }
            FieldEdit::ColumnLabel { column, label } => {
                next.column_mut(&column)?.label = label;
            }
            FieldEdit::ColumnType {
                column,
                column_type,
            } => {
                next.column_mut(&column)?.column_type = column_type;
            }
            FieldEdit::ColumnDescription {
                column,
                description,
            } => {
                next.column_mut(&column)?.description = description;
            }
        }
        Ok(next)
    }

    fn column_mut(&mut self, name: &str) -> Result<&mut ColumnDetail, EditError> {
        self.record
            .columns
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| EditError::UnknownColumn(name.to_string()))
    }
}
