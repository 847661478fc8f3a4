use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

/// 保留的几何列名：内存中从不出现，只在序列化时追加到 data_columns
pub const GEOMETRY_COLUMN: &str = "geom";

/// 原始数据中的几何列，不作为可选列提供
pub const RAW_GEOMETRY_COLUMNS: [&str; 2] = ["geometry", "geom"];

/// has_county_geoid 为 true 时额外提供的合成列
pub const STATE_NAME_COLUMN: &str = "state_name";

/// obj_details_column 允许的字面值
pub const ID_LITERAL: &str = "id";

/// 0 = free, 1 = freemium, 2 = premium
pub const DEFAULT_ACCESS_LEVEL: u8 = 2;
pub const MAX_ACCESS_LEVEL: u8 = 2;

pub const UPDATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 记录字段，按声明顺序（也是持久化 JSON 的 key 顺序）
pub const FIELD_NAMES: [&str; 24] = [
    "name",
    "layer_id",
    "geom_type",
    "geom_join",
    "description",
    "obj_details_column",
    "has_biomass",
    "has_county_geoid",
    "value_columns",
    "category_columns",
    "details_columns",
    "data_columns",
    "tooltip-title",
    "tooltip-content",
    "s3_file_path",
    "view_name",
    "updated_at",
    "columns",
    "calculated_fields",
    "human_identifier_field",
    "mandatory_filter",
    "layer_access_level",
    "supplier_layer",
    "visualization",
];

pub fn format_updated_at(ts: DateTime<Utc>) -> String {
    ts.format(UPDATED_AT_FORMAT).to_string()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    #[default]
    Text,
    Float,
    Int,
    Boolean,
}

impl ColumnType {
    pub const ALL: [ColumnType; 4] = [
        ColumnType::Text,
        ColumnType::Float,
        ColumnType::Int,
        ColumnType::Boolean,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Text => "text",
            ColumnType::Float => "float",
            ColumnType::Int => "int",
            ColumnType::Boolean => "boolean",
        }
    }

    pub fn parse(s: &str) -> Option<ColumnType> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ColumnDetail {
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    pub description: String,
}

impl ColumnDetail {
    pub fn synthesize(name: &str) -> Self {
        Self {
            name: name.to_string(),
            label: name.to_string(),
            column_type: ColumnType::Text,
            description: String::new(),
        }
    }
}

/// 一个数据集图层的元数据记录
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MetadataRecord {
    pub name: String,
    pub layer_id: String,
    pub geom_type: String,
    pub geom_join: String,
    pub description: String,
    pub obj_details_column: String,
    pub has_biomass: bool,
    pub has_county_geoid: bool,
    pub value_columns: Vec<String>,
    pub category_columns: Vec<String>,
    pub details_columns: Vec<String>,
    pub data_columns: Vec<String>,
    #[serde(rename = "tooltip-title")]
    pub tooltip_title: String,
    #[serde(rename = "tooltip-content")]
    pub tooltip_content: String,
    pub s3_file_path: String,
    pub view_name: String,
    pub updated_at: String,
    pub columns: Vec<ColumnDetail>,
    pub calculated_fields: Vec<Value>,
    pub human_identifier_field: String,
    pub mandatory_filter: Vec<String>,
    pub layer_access_level: u8,
    pub supplier_layer: bool,
    pub visualization: Value,
}

impl Default for MetadataRecord {
    fn default() -> Self {
        Self {
            name: String::new(),
            layer_id: String::new(),
            geom_type: String::new(),
            geom_join: String::new(),
            description: String::new(),
            obj_details_column: String::new(),
            has_biomass: false,
            has_county_geoid: false,
            value_columns: Vec::new(),
            category_columns: Vec::new(),
            details_columns: Vec::new(),
            data_columns: Vec::new(),
            tooltip_title: String::new(),
            tooltip_content: String::new(),
            s3_file_path: String::new(),
            view_name: String::new(),
            updated_at: String::new(),
            columns: Vec::new(),
            calculated_fields: Vec::new(),
            human_identifier_field: String::new(),
            mandatory_filter: Vec::new(),
            layer_access_level: DEFAULT_ACCESS_LEVEL,
            supplier_layer: false,
            visualization: Value::Object(Map::new()),
        }
    }
}

impl MetadataRecord {
    pub fn role(&self, role: RoleField) -> &Vec<String> {
        match role {
            RoleField::Value => &self.value_columns,
            RoleField::Category => &self.category_columns,
            RoleField::Details => &self.details_columns,
            RoleField::Data => &self.data_columns,
            RoleField::MandatoryFilter => &self.mandatory_filter,
        }
    }

    pub fn role_mut(&mut self, role: RoleField) -> &mut Vec<String> {
        match role {
            RoleField::Value => &mut self.value_columns,
            RoleField::Category => &mut self.category_columns,
            RoleField::Details => &mut self.details_columns,
            RoleField::Data => &mut self.data_columns,
            RoleField::MandatoryFilter => &mut self.mandatory_filter,
        }
    }

    /// 四个列角色的并集，按首次出现顺序，去掉几何列
    pub fn selected_columns(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for role in RoleField::COLUMN_ROLES {
            for name in self.role(role) {
                if name != GEOMETRY_COLUMN && !out.contains(name) {
                    out.push(name.clone());
                }
            }
        }
        out
    }

    /// 记录中引用过的所有列名（角色列表 + columns），数据集不可读时用来兜底
    pub fn referenced_columns(&self) -> Vec<String> {
        let mut out = self.selected_columns();
        let extra = self
            .mandatory_filter
            .iter()
            .chain(self.columns.iter().map(|c| &c.name));
        for name in extra {
            if name != GEOMETRY_COLUMN && !out.contains(name) {
                out.push(name.clone());
            }
        }
        out
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDetail> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// 列角色：value / category / details / data / mandatory_filter
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RoleField {
    Value,
    Category,
    Details,
    Data,
    MandatoryFilter,
}

impl RoleField {
    /// 参与 columns 计算的四个角色
    pub const COLUMN_ROLES: [RoleField; 4] = [
        RoleField::Value,
        RoleField::Category,
        RoleField::Details,
        RoleField::Data,
    ];

    pub const ALL: [RoleField; 5] = [
        RoleField::Value,
        RoleField::Category,
        RoleField::Details,
        RoleField::Data,
        RoleField::MandatoryFilter,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RoleField::Value => "value_columns",
            RoleField::Category => "category_columns",
            RoleField::Details => "details_columns",
            RoleField::Data => "data_columns",
            RoleField::MandatoryFilter => "mandatory_filter",
        }
    }

    pub fn parse(s: &str) -> Option<RoleField> {
        Self::ALL.into_iter().find(|r| r.as_str() == s)
    }
}

impl std::fmt::Display for RoleField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
