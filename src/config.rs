use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::application::catalog::RemovalPolicy;

/// 目録マネージャの設定
///
/// データディレクトリと書籍削除時の貸出の扱いを外部から注入する。
/// すべての項目に既定値があり、部分的な設定ファイルも受け付ける。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// CSVファイルを置くディレクトリ（なければ作成される）
    pub data_dir: PathBuf,
    /// 書籍削除時の貸出記録の扱い
    pub removal_policy: RemovalPolicy,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            removal_policy: RemovalPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CatalogConfig::default();
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.removal_policy, RemovalPolicy::KeepLoans);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: CatalogConfig =
            serde_json::from_str(r#"{"removal_policy": "cascade_return"}"#).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.removal_policy, RemovalPolicy::CascadeReturn);
    }
}
