//! 配置模块，负责加载字段目录 (field catalog) 的JSON配置文件

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// 字段目录配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件不存在: {0}")]
    NotFound(String),

    #[error("无法读取配置文件 {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("无法解析JSON配置文件 {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("字段id重复: {0}")]
    DuplicateId(String),
}

/// 一个可选字段：不透明的id、数据库列名和显示名称
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    pub id: String,
    pub column_name: String,
    pub display_label: String,
}

impl FieldDescriptor {
    pub fn new(id: &str, column_name: &str, display_label: &str) -> Self {
        Self {
            id: id.to_string(),
            column_name: column_name.to_string(),
            display_label: display_label.to_string(),
        }
    }
}

/// 字段目录：有序、只读，由外部提供
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldCatalog {
    fields: Vec<FieldDescriptor>,
}

impl FieldCatalog {
    pub fn new(fields: Vec<FieldDescriptor>) -> Result<Self, ConfigError> {
        let mut seen = HashSet::new();
        for field in &fields {
            if !seen.insert(field.id.as_str()) {
                return Err(ConfigError::DuplicateId(field.id.clone()));
            }
        }
        Ok(Self { fields })
    }

    /// 从JSON文件加载字段目录
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let display = path_ref.display().to_string();

        // 检查文件是否存在
        if !path_ref.exists() {
            return Err(ConfigError::NotFound(display));
        }

        let content = fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;

        let fields: Vec<FieldDescriptor> =
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: display,
                source,
            })?;

        Self::new(fields)
    }

    pub fn get(&self, id: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.id == id)
    }

    /// 获取字段对应的列名
    pub fn column_name(&self, id: &str) -> Option<&str> {
        self.get(id).map(|field| field.column_name.as_str())
    }

    pub fn display_label(&self, id: &str) -> Option<&str> {
        self.get(id).map(|field| field.display_label.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Default for FieldCatalog {
    /// 内置的用户字段（用于测试或fallback）
    fn default() -> Self {
        Self {
            fields: vec![
                FieldDescriptor::new("1", "user_age", "Age"),
                FieldDescriptor::new("2", "user_status", "Status"),
                FieldDescriptor::new("3", "user_role", "Role"),
                FieldDescriptor::new("4", "user_email", "Email"),
                FieldDescriptor::new("5", "user_name", "Full name"),
                FieldDescriptor::new("6", "created_at", "Created at"),
                FieldDescriptor::new("7", "updated_at", "Updated at"),
                FieldDescriptor::new("8", "department_id", "Department"),
                FieldDescriptor::new("9", "is_active", "Active"),
                FieldDescriptor::new("10", "salary", "Salary"),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write;

    #[test]
    fn test_load_valid_json_config() {
        // 创建临时配置文件
        let temp_file = "test_fields_valid.json";
        let mut file = fs::File::create(temp_file).unwrap();
        writeln!(file, r#"[
            {{ "id": "a", "columnName": "amount", "displayLabel": "Amount" }},
            {{ "id": "b", "columnName": "branch_code", "displayLabel": "Branch" }}
        ]"#).unwrap();

        let catalog = FieldCatalog::from_json_file(temp_file).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.column_name("b"), Some("branch_code"));
        assert_eq!(catalog.display_label("a"), Some("Amount"));
        assert_eq!(catalog.column_name("c"), None);
        let ids: Vec<_> = catalog.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);

        // 清理
        fs::remove_file(temp_file).ok();
    }

    #[test]
    fn test_invalid_json_config() {
        let temp_file = "test_fields_invalid.json";
        let mut file = fs::File::create(temp_file).unwrap();
        writeln!(file, "invalid json").unwrap();

        let result = FieldCatalog::from_json_file(temp_file);
        assert!(matches!(result, Err(ConfigError::Parse { .. })));

        fs::remove_file(temp_file).ok();
    }

    #[test]
    fn test_missing_file() {
        let result = FieldCatalog::from_json_file("non_existent_fields.json");
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let result = FieldCatalog::new(vec![
            FieldDescriptor::new("1", "a", "A"),
            FieldDescriptor::new("1", "b", "B"),
        ]);
        assert!(matches!(result, Err(ConfigError::DuplicateId(id)) if id == "1"));
    }

    #[test]
    fn test_default_config() {
        let catalog = FieldCatalog::default();
        assert_eq!(catalog.len(), 10);
        assert_eq!(catalog.column_name("1"), Some("user_age"));
        assert_eq!(catalog.column_name("9"), Some("is_active"));
        assert_eq!(catalog.column_name("10"), Some("salary"));
    }
}
