//! 模型集合
//!
//! 模型名 -> 模型句柄的映射，是交给调用者的最终产物。

use crate::connection::ConnectionHandle;
use crate::model::handle::ModelHandle;
use std::collections::btree_map::{BTreeMap, IntoIter, Iter};
use std::ops::Index;

/// 模型集合
#[derive(Debug, Clone, Default)]
pub struct ModelCollection {
    models: BTreeMap<String, ModelHandle>,
}

impl ModelCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// 加入模型，同名模型会被替换
    pub fn insert(&mut self, model: ModelHandle) -> Option<ModelHandle> {
        self.models.insert(model.name().to_string(), model)
    }

    pub fn get(&self, name: &str) -> Option<&ModelHandle> {
        self.models.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// 模型名（有序）
    pub fn names(&self) -> Vec<String> {
        self.models.keys().cloned().collect()
    }

    pub fn iter(&self) -> Iter<'_, String, ModelHandle> {
        self.models.iter()
    }

    pub fn handles(&self) -> Vec<ModelHandle> {
        self.models.values().cloned().collect()
    }

    /// 任意一个模型绑定的连接（同一次调用中所有模型共享同一个连接）
    pub fn connection(&self) -> Option<ConnectionHandle> {
        self.models.values().find_map(ModelHandle::connection)
    }
}

impl Index<&str> for ModelCollection {
    type Output = ModelHandle;

    fn index(&self, name: &str) -> &Self::Output {
        &self.models[name]
    }
}

impl FromIterator<ModelHandle> for ModelCollection {
    fn from_iter<T: IntoIterator<Item = ModelHandle>>(iter: T) -> Self {
        let mut collection = ModelCollection::new();
        for model in iter {
            collection.insert(model);
        }
        collection
    }
}

impl IntoIterator for ModelCollection {
    type Item = (String, ModelHandle);
    type IntoIter = IntoIter<String, ModelHandle>;

    fn into_iter(self) -> Self::IntoIter {
        self.models.into_iter()
    }
}

impl<'a> IntoIterator for &'a ModelCollection {
    type Item = (&'a String, &'a ModelHandle);
    type IntoIter = Iter<'a, String, ModelHandle>;

    fn into_iter(self) -> Self::IntoIter {
        self.models.iter()
    }
}
