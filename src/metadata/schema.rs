//! 元数据记录的规范化：丢弃未知字段，缺失字段补默认值。
//!
//! 历史记录里经常出现类型不对的值（比如 `"tooltip-title": []`、`"supplier_layer": ""`），
//! 这些字段按默认值处理，不让一条旧记录挡住编辑。

use crate::metadata::model::{
    ColumnDetail, ColumnType, MetadataRecord, DEFAULT_ACCESS_LEVEL, MAX_ACCESS_LEVEL,
};
use serde_json::{Map, Value};

fn string_field(obj: &Map<String, Value>, key: &str) -> String {
    obj.get(key)
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string()
}

fn bool_field(obj: &Map<String, Value>, key: &str) -> bool {
    obj.get(key).and_then(|v| v.as_bool()).unwrap_or(false)
}

fn string_list(obj: &Map<String, Value>, key: &str) -> Vec<String> {
    obj.get(key)
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|x| x.as_str())
                .map(|s| s.to_string())
                .collect()
        })
        .unwrap_or_default()
}

fn access_level(obj: &Map<String, Value>) -> u8 {
    let parsed = match obj.get("layer_access_level") {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    parsed
        .filter(|v| *v <= MAX_ACCESS_LEVEL as u64)
        .map(|v| v as u8)
        .unwrap_or(DEFAULT_ACCESS_LEVEL)
}

fn column_details(obj: &Map<String, Value>) -> Vec<ColumnDetail> {
    let Some(arr) = obj.get("columns").and_then(|v| v.as_array()) else {
        return Vec::new();
    };
    let mut out: Vec<ColumnDetail> = Vec::with_capacity(arr.len());
    for item in arr {
        let Some(name) = item.get("name").and_then(|x| x.as_str()) else {
            continue;
        };
        if out.iter().any(|c| c.name == name) {
            continue;
        }
        let label = item
            .get("label")
            .and_then(|x| x.as_str())
            .unwrap_or(name)
            .to_string();
        let column_type = item
            .get("type")
            .and_then(|x| x.as_str())
            .and_then(ColumnType::parse)
            .unwrap_or_default();
        let description = item
            .get("description")
            .and_then(|x| x.as_str())
            .unwrap_or("")
            .to_string();
        out.push(ColumnDetail {
            name: name.to_string(),
            label,
            column_type,
            description,
        });
    }
    out
}

/// 把任意 JSON 规范化为记录。非对象输入得到默认记录。
pub fn normalize(raw: &Value) -> MetadataRecord {
    let Some(obj) = raw.as_object() else {
        return MetadataRecord::default();
    };

    let visualization = match obj.get("visualization") {
        Some(v @ Value::Object(_)) => v.clone(),
        _ => Value::Object(Map::new()),
    };
    let calculated_fields = obj
        .get("calculated_fields")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();

    MetadataRecord {
        name: string_field(obj, "name"),
        layer_id: string_field(obj, "layer_id"),
        geom_type: string_field(obj, "geom_type"),
        geom_join: string_field(obj, "geom_join"),
        description: string_field(obj, "description"),
        obj_details_column: string_field(obj, "obj_details_column"),
        has_biomass: bool_field(obj, "has_biomass"),
        has_county_geoid: bool_field(obj, "has_county_geoid"),
        value_columns: string_list(obj, "value_columns"),
        category_columns: string_list(obj, "category_columns"),
        details_columns: string_list(obj, "details_columns"),
        data_columns: string_list(obj, "data_columns"),
        tooltip_title: string_field(obj, "tooltip-title"),
        tooltip_content: string_field(obj, "tooltip-content"),
        s3_file_path: string_field(obj, "s3_file_path"),
        view_name: string_field(obj, "view_name"),
        updated_at: string_field(obj, "updated_at"),
        columns: column_details(obj),
        calculated_fields,
        human_identifier_field: string_field(obj, "human_identifier_field"),
        mandatory_filter: string_list(obj, "mandatory_filter"),
        layer_access_level: access_level(obj),
        supplier_layer: bool_field(obj, "supplier_layer"),
        visualization,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::model::FIELD_NAMES;
    use serde_json::json;

    fn legacy_record() -> Value {
        json!({
            "name": "County Population",
            "layer_id": "county_pop",
            "has_county_geoid": true,
            "value_columns": ["pop", 7, "area"],
            "data_columns": ["pop", "geom"],
            "tooltip-title": [],
            "tooltip-content": "{{pop}} people",
            "detials_modals": [],
            "details_modals": [{"x": 1}],
            "columns": [
                {"name": "pop", "label": "Population", "type": "int", "description": "people"},
                {"name": "pop", "label": "dup", "type": "text", "description": ""},
                {"name": "area", "type": "string"},
                {"label": "nameless"}
            ],
            "layer_access_level": "1",
            "supplier_layer": "",
            "visualization": "not an object",
            "calculated_fields": [{"expr": "pop / area"}]
        })
    }

    #[test]
    fn drops_unknown_and_fills_defaults() {
        let record = normalize(&legacy_record());
        let value = record.to_value();
        let keys: Vec<&str> = value
            .as_object()
            .unwrap()
            .keys()
            .map(|k| k.as_str())
            .collect();
        assert_eq!(keys, FIELD_NAMES.to_vec());

        assert_eq!(record.name, "County Population");
        assert!(record.has_county_geoid);
        assert!(!record.has_biomass);
        assert_eq!(record.value_columns, vec!["pop", "area"]);
        assert_eq!(record.tooltip_title, "");
        assert_eq!(record.layer_access_level, 1);
        assert!(!record.supplier_layer);
        assert_eq!(record.visualization, json!({}));
        assert_eq!(record.calculated_fields, vec![json!({"expr": "pop / area"})]);
    }

    #[test]
    fn column_details_are_lenient() {
        let record = normalize(&legacy_record());
        assert_eq!(record.columns.len(), 2);
        assert_eq!(record.columns[0].label, "Population");
        assert_eq!(record.columns[0].column_type, ColumnType::Int);
        assert_eq!(record.columns[1].name, "area");
        assert_eq!(record.columns[1].label, "area");
        assert_eq!(record.columns[1].column_type, ColumnType::Text);
    }

    #[test]
    fn access_level_out_of_range_falls_back() {
        assert_eq!(normalize(&json!({"layer_access_level": 5})).layer_access_level, 2);
        assert_eq!(normalize(&json!({"layer_access_level": -1})).layer_access_level, 2);
        assert_eq!(normalize(&json!({"layer_access_level": 0})).layer_access_level, 0);
        assert_eq!(normalize(&json!({})).layer_access_level, 2);
    }

    #[test]
    fn non_object_input_yields_defaults() {
        assert_eq!(normalize(&json!([1, 2, 3])), MetadataRecord::default());
        assert_eq!(normalize(&Value::Null), MetadataRecord::default());
    }

    #[test]
    fn normalize_is_idempotent() {
        for raw in [legacy_record(), json!({}), json!({"visualization": {"color": "red"}})] {
            let once = normalize(&raw);
            let twice = normalize(&once.to_value());
            assert_eq!(once, twice);
        }
    }
}
