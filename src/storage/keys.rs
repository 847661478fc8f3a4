/// 原始数据集（GeoJSON FeatureCollection）所在前缀
pub const DATASETS_PREFIX: &str = "datasets";

/// 元数据记录所在前缀
pub const METADATA_PREFIX: &str = "metadata";

/// 数据集标识：取文件名并去掉最后一个扩展名
pub fn dataset_identifier(key: &str) -> String {
    let file = key.rsplit('/').next().unwrap_or(key);
    match file.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => file.to_string(),
    }
}

/// 数据集对象 key：已经是完整 key 时原样返回，否则按 `datasets/<id>.json` 拼接
pub fn dataset_key(dataset_ref: &str) -> String {
    if dataset_ref.contains('/') {
        dataset_ref.to_string()
    } else if dataset_ref.ends_with("json") && dataset_ref.contains('.') {
        format!("{}/{}", DATASETS_PREFIX, dataset_ref)
    } else {
        format!("{}/{}.json", DATASETS_PREFIX, dataset_ref)
    }
}

pub fn metadata_key(dataset_id: &str) -> String {
    format!("{}/{}_metadata.json", METADATA_PREFIX, dataset_id)
}

/// 只保留前缀下第一层的 json 对象（不进入子目录）
pub fn is_top_level_json(key: &str) -> bool {
    key.ends_with("json") && key.matches('/').count() == 1
}

/// key 的最后一段（对象名）
pub fn object_name(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}
