use crate::sampler::DEFAULT_SAMPLE_LIMIT;
use anyhow::{bail, Context, Result};
use std::path::PathBuf;

pub const DEFAULT_STORE: &str = "s3://dev-data-layer-datasets/";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// `s3://bucket/prefix`、本地目录或 `memory://`
    pub store_location: String,
    pub sample_limit: usize,
    pub log_dir: PathBuf,
}

impl AppConfig {
    /// 读取环境变量（调用前应先加载 .env）
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let store_location = lookup("LAYERMETA_STORE")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_STORE.to_string());

        let sample_limit = match lookup("LAYERMETA_SAMPLE_LIMIT") {
            Some(raw) => {
                let n = raw
                    .trim()
                    .parse::<usize>()
                    .with_context(|| format!("LAYERMETA_SAMPLE_LIMIT 不是整数: {:?}", raw))?;
                if n == 0 {
                    bail!("LAYERMETA_SAMPLE_LIMIT 必须大于 0");
                }
                n
            }
            None => DEFAULT_SAMPLE_LIMIT,
        };

        let log_dir = lookup("LAYERMETA_LOG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("logs"));

        Ok(AppConfig {
            store_location,
            sample_limit,
            log_dir,
        })
    }
}
