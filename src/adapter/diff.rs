//! 表结构差异
//!
//! 只计算增量：缺失的表、缺失的列与缺失的索引。存储中多出来的表、列和索引
//! 不参与比较，同步永远不会删除它们。

use crate::model::{IndexDefinition, ModelDefinition};

/// 单个模型与存储结构之间的差异
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaDiff {
    /// 表名
    pub table: String,
    /// 表不存在，需要新建
    pub create_table: bool,
    /// 需要新增的列
    pub missing_columns: Vec<String>,
    /// 需要新建的索引
    pub missing_indexes: Vec<IndexDefinition>,
}

impl SchemaDiff {
    /// 计算差异
    ///
    /// `live_columns` 为 `None` 表示表不存在；`live_indexes` 为存储中已有的索引名。
    pub fn compute(
        model: &ModelDefinition,
        live_columns: Option<&[String]>,
        live_indexes: &[String],
    ) -> Self {
        let mut diff = SchemaDiff {
            table: model.table.clone(),
            ..Default::default()
        };

        match live_columns {
            None => diff.create_table = true,
            Some(columns) => {
                diff.missing_columns = model
                    .columns()
                    .into_iter()
                    .map(|(column, _)| column)
                    .filter(|column| !columns.iter().any(|c| c.as_str() == *column))
                    .map(str::to_string)
                    .collect();
            }
        }

        diff.missing_indexes = model
            .indexes
            .iter()
            .filter(|index| !live_indexes.contains(&index.name))
            .cloned()
            .collect();

        diff
    }

    /// 没有任何差异
    pub fn is_empty(&self) -> bool {
        !self.create_table && self.missing_columns.is_empty() && self.missing_indexes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ModelOptions, PropertyDefinition, PropertyType};
    use std::collections::BTreeMap;

    fn model() -> ModelDefinition {
        let mut properties = BTreeMap::new();
        properties.insert("id".to_string(), PropertyDefinition::new(PropertyType::Number).id());
        properties.insert(
            "configId".to_string(),
            PropertyDefinition::new(PropertyType::Number).column("config_id"),
        );
        ModelDefinition {
            name: "State".to_string(),
            table: "state".to_string(),
            base: None,
            properties,
            id_property: "id".to_string(),
            id_generated: true,
            indexes: vec![IndexDefinition {
                name: "state_config_idx".to_string(),
                properties: vec!["configId".to_string()],
                unique: false,
            }],
            settings: ModelOptions::default(),
        }
    }

    #[test]
    fn test_missing_table() {
        let diff = SchemaDiff::compute(&model(), None, &[]);
        assert!(diff.create_table);
        assert_eq!(diff.missing_indexes.len(), 1);
        assert!(!diff.is_empty());
    }

    #[test]
    fn test_missing_column_uses_column_name_and_ignores_extras() {
        let live = vec!["id".to_string(), "legacy".to_string()];
        let diff = SchemaDiff::compute(&model(), Some(&live), &["state_config_idx".to_string()]);
        assert!(!diff.create_table);
        assert_eq!(diff.missing_columns, vec!["config_id".to_string()]);
        assert!(diff.missing_indexes.is_empty());

        let live = vec!["id".to_string(), "config_id".to_string(), "legacy".to_string()];
        let diff = SchemaDiff::compute(&model(), Some(&live), &["state_config_idx".to_string()]);
        assert!(diff.is_empty());
    }
}
