//! 模型句柄
//!
//! 模型句柄是模型描述组装后的可查询表示。句柄可以廉价克隆，
//! 所有克隆共享同一份定义、关系、连接与钩子。

use crate::connection::ConnectionHandle;
use crate::error::{StandaloneError, StandaloneResult};
use crate::model::definition::ModelDefinition;
use crate::model::hooks::{HookHostKind, RemoteHookFn, RemoteHooks, RemoteMethodSpec};
use crate::model::relation::RelationAccessor;
use crate::types::{DefaultFn, Filter, PropertyDefinition, PropertyType, Record, RelationDefinition};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Weak};
use rat_logger::debug;

/// 操作钩子
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationHook {
    /// 写入前，可修改待写入的数据
    BeforeSave,
    /// 写入后，可修改返回给调用者的记录
    AfterSave,
}

impl OperationHook {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationHook::BeforeSave => "before save",
            OperationHook::AfterSave => "after save",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "before save" => Some(OperationHook::BeforeSave),
            "after save" => Some(OperationHook::AfterSave),
            _ => None,
        }
    }
}

/// 操作观察者，参数为模型名与记录
pub type Observer = Arc<dyn Fn(&str, &mut Record) -> anyhow::Result<()> + Send + Sync>;

struct ModelInner {
    name: String,
    definition: RwLock<ModelDefinition>,
    relations: RwLock<BTreeMap<String, RelationDefinition>>,
    connection: RwLock<Option<ConnectionHandle>>,
    mixins: RwLock<Vec<String>>,
    observers: RwLock<Vec<(OperationHook, Observer)>>,
    remote_hooks: RwLock<Option<Arc<dyn RemoteHooks>>>,
}

/// 模型句柄
#[derive(Clone)]
pub struct ModelHandle {
    inner: Arc<ModelInner>,
}

/// 模型句柄的弱引用，连接只以弱引用持有模型
#[derive(Clone)]
pub struct WeakModelHandle {
    inner: Weak<ModelInner>,
}

impl WeakModelHandle {
    pub fn upgrade(&self) -> Option<ModelHandle> {
        self.inner.upgrade().map(|inner| ModelHandle { inner })
    }
}

impl fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let definition = self.inner.definition.read();
        f.debug_struct("ModelHandle")
            .field("name", &self.inner.name)
            .field("table", &definition.table)
            .field("relations", &self.inner.relations.read().keys().collect::<Vec<_>>())
            .field("attached", &self.is_attached())
            .finish()
    }
}

impl ModelHandle {
    pub(crate) fn new(definition: ModelDefinition) -> Self {
        Self {
            inner: Arc::new(ModelInner {
                name: definition.name.clone(),
                definition: RwLock::new(definition),
                relations: RwLock::new(BTreeMap::new()),
                connection: RwLock::new(None),
                mixins: RwLock::new(Vec::new()),
                observers: RwLock::new(Vec::new()),
                remote_hooks: RwLock::new(None),
            }),
        }
    }

    /// 模型名
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// 当前定义的快照
    pub fn definition(&self) -> ModelDefinition {
        self.inner.definition.read().clone()
    }

    /// 表名/集合名
    pub fn table(&self) -> String {
        self.inner.definition.read().table.clone()
    }

    /// 主键属性名
    pub fn id_property(&self) -> String {
        self.inner.definition.read().id_property.clone()
    }

    pub fn downgrade(&self) -> WeakModelHandle {
        WeakModelHandle {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// 是否为同一个模型实例
    pub fn ptr_eq(&self, other: &ModelHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// 追加或覆盖属性（供混入与自定义逻辑使用）
    pub fn define_property(&self, name: &str, definition: PropertyDefinition) {
        debug!("模型 {} 定义属性: {}", self.inner.name, name);
        let mut current = self.inner.definition.write();
        if definition.id {
            current.id_property = name.to_string();
            current.id_generated = false;
        }
        current.properties.insert(name.to_string(), definition);
    }

    /// 已应用的混入
    pub fn mixins(&self) -> Vec<String> {
        self.inner.mixins.read().clone()
    }

    pub(crate) fn record_mixin(&self, name: &str) {
        self.inner.mixins.write().push(name.to_string());
    }

    // ---- 关系 ----

    /// 当前全部关系
    pub fn relations(&self) -> BTreeMap<String, RelationDefinition> {
        self.inner.relations.read().clone()
    }

    /// 单个关系定义
    pub fn relation_definition(&self, name: &str) -> Option<RelationDefinition> {
        self.inner.relations.read().get(name).cloned()
    }

    pub(crate) fn set_relation(&self, name: &str, definition: RelationDefinition) {
        self.inner
            .relations
            .write()
            .insert(name.to_string(), definition);
    }

    /// 关系访问器
    pub fn relation(&self, name: &str) -> Option<RelationAccessor> {
        self.relation_definition(name)
            .map(|definition| RelationAccessor::new(self.clone(), name, definition))
    }

    /// 通过关系取关联记录
    pub async fn related(
        &self,
        record: &Record,
        relation: &str,
    ) -> StandaloneResult<crate::model::relation::RelatedRecords> {
        let accessor = self.relation(relation).ok_or_else(|| StandaloneError::QueryError {
            message: crate::i18n::tf(
                "error.relation_not_found",
                &[("model", &self.inner.name.to_string()), ("relation", &relation.to_string())],
            ),
        })?;
        accessor.get(record).await
    }

    // ---- 连接 ----

    /// 绑定的连接
    pub fn connection(&self) -> Option<ConnectionHandle> {
        self.inner.connection.read().clone()
    }

    pub fn is_attached(&self) -> bool {
        self.inner.connection.read().is_some()
    }

    pub(crate) fn set_connection(&self, connection: ConnectionHandle) {
        *self.inner.connection.write() = Some(connection);
    }

    fn require_connection(&self) -> StandaloneResult<ConnectionHandle> {
        self.connection().ok_or_else(|| StandaloneError::QueryError {
            message: crate::i18n::tf(
                "error.model_not_attached",
                &[("model", &self.inner.name.to_string())],
            ),
        })
    }

    // ---- 操作钩子 ----

    /// 注册操作观察者
    pub fn observe(&self, hook: OperationHook, observer: Observer) {
        self.inner.observers.write().push((hook, observer));
    }

    fn notify(&self, hook: OperationHook, record: &mut Record) -> StandaloneResult<()> {
        let observers: Vec<Observer> = self
            .inner
            .observers
            .read()
            .iter()
            .filter(|(h, _)| *h == hook)
            .map(|(_, o)| o.clone())
            .collect();

        for observer in observers {
            observer(&self.inner.name, record).map_err(|e| StandaloneError::ValidationError {
                field: hook.as_str().to_string(),
                message: e.to_string(),
            })?;
        }
        Ok(())
    }

    // ---- 远程钩子宿主 ----

    /// 安装远程钩子宿主
    pub fn install_remote_hooks(&self, hooks: Arc<dyn RemoteHooks>) {
        *self.inner.remote_hooks.write() = Some(hooks);
    }

    /// 已安装的宿主类型
    pub fn remote_host(&self) -> Option<HookHostKind> {
        self.inner.remote_hooks.read().as_ref().map(|h| h.kind())
    }

    fn require_remote_hooks(&self) -> StandaloneResult<Arc<dyn RemoteHooks>> {
        self.inner
            .remote_hooks
            .read()
            .clone()
            .ok_or_else(|| StandaloneError::CustomizationError {
                model: self.inner.name.clone(),
                message: crate::i18n::tf(
                    "error.remote_hooks_missing",
                    &[("model", &self.inner.name.to_string())],
                ),
            })
    }

    pub fn remote_method(&self, name: &str, spec: RemoteMethodSpec) -> StandaloneResult<()> {
        self.require_remote_hooks()?
            .remote_method(&self.inner.name, name, spec);
        Ok(())
    }

    pub fn before_remote(&self, pattern: &str, hook: RemoteHookFn) -> StandaloneResult<()> {
        self.require_remote_hooks()?
            .before_remote(&self.inner.name, pattern, hook);
        Ok(())
    }

    pub fn after_remote(&self, pattern: &str, hook: RemoteHookFn) -> StandaloneResult<()> {
        self.require_remote_hooks()?
            .after_remote(&self.inner.name, pattern, hook);
        Ok(())
    }

    // ---- 数据操作 ----

    /// 创建记录
    pub async fn create(&self, data: Record) -> StandaloneResult<Record> {
        let connection = self.require_connection()?;
        let definition = self.definition();

        let mut data = data;
        apply_defaults(&definition, &mut data);
        self.notify(OperationHook::BeforeSave, &mut data)?;
        validate_record(&definition, &data)?;

        let row = definition.to_columns(&data);
        let created = connection.create(&definition, row).await?;
        let mut record = definition.from_columns(created);
        self.notify(OperationHook::AfterSave, &mut record)?;

        debug!("模型 {} 创建记录完成", self.inner.name);
        Ok(record)
    }

    /// 查找记录
    pub async fn find(&self, filter: &Filter) -> StandaloneResult<Vec<Record>> {
        let connection = self.require_connection()?;
        let definition = self.definition();
        let rows = connection
            .find(&definition, &definition.filter_to_columns(filter))
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| definition.from_columns(row))
            .collect())
    }

    /// 查找第一条记录
    pub async fn find_one(&self, filter: &Filter) -> StandaloneResult<Option<Record>> {
        let filter = filter.clone().limit(1);
        Ok(self.find(&filter).await?.into_iter().next())
    }

    /// 根据主键查找
    pub async fn find_by_id(&self, id: &Value) -> StandaloneResult<Option<Record>> {
        let filter = Filter::new().eq(&self.id_property(), id.clone());
        self.find_one(&filter).await
    }

    /// 统计记录数量
    pub async fn count(&self, filter: &Filter) -> StandaloneResult<u64> {
        let connection = self.require_connection()?;
        let definition = self.definition();
        connection
            .count(&definition, &definition.filter_to_columns(filter))
            .await
    }

    /// 删除满足条件的记录
    pub async fn destroy_all(&self, filter: &Filter) -> StandaloneResult<u64> {
        let connection = self.require_connection()?;
        let definition = self.definition();
        connection
            .destroy(&definition, &definition.filter_to_columns(filter))
            .await
    }

    /// 根据主键删除
    pub async fn destroy_by_id(&self, id: &Value) -> StandaloneResult<bool> {
        let filter = Filter::new().eq(&self.id_property(), id.clone());
        Ok(self.destroy_all(&filter).await? > 0)
    }
}

fn apply_defaults(definition: &ModelDefinition, data: &mut Record) {
    for (name, property) in &definition.properties {
        if data.get(name).is_some_and(|v| !v.is_null()) {
            continue;
        }
        if name == &definition.id_property && definition.id_generated {
            continue;
        }
        let value = match (&property.default, property.default_fn) {
            (Some(default), _) => default.clone(),
            (None, Some(DefaultFn::Uuid)) => Value::String(uuid::Uuid::new_v4().to_string()),
            (None, Some(DefaultFn::Now)) => Value::String(chrono::Utc::now().to_rfc3339()),
            (None, None) => continue,
        };
        data.insert(name.clone(), value);
    }
}

fn validate_record(definition: &ModelDefinition, data: &Record) -> StandaloneResult<()> {
    for (name, property) in &definition.properties {
        let value = data.get(name).unwrap_or(&Value::Null);
        if value.is_null() {
            let generated = name == &definition.id_property && definition.id_generated;
            if property.required && !generated {
                return Err(crate::quick_error!(validation, name, "必填属性不能为空"));
            }
            continue;
        }

        let valid = match &property.property_type {
            PropertyType::String => value.is_string(),
            PropertyType::Number => value.is_number(),
            PropertyType::Boolean => value.is_boolean(),
            PropertyType::Date => value
                .as_str()
                .is_some_and(|s| chrono::DateTime::parse_from_rfc3339(s).is_ok()),
            PropertyType::Array(_) => value.is_array(),
            PropertyType::Object | PropertyType::Model(_) => value.is_object(),
            PropertyType::Buffer | PropertyType::Any => true,
        };
        if !valid {
            return Err(crate::quick_error!(
                validation,
                name,
                format!("值 {} 与属性类型 {} 不匹配", value, property.property_type)
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ModelOptions;
    use serde_json::json;

    fn note_definition() -> ModelDefinition {
        let mut properties = BTreeMap::new();
        properties.insert("id".to_string(), PropertyDefinition::new(PropertyType::Number).id());
        properties.insert(
            "title".to_string(),
            PropertyDefinition::new(PropertyType::String).required(),
        );
        properties.insert(
            "status".to_string(),
            PropertyDefinition::new(PropertyType::String).default_value(json!("draft")),
        );
        properties.insert(
            "token".to_string(),
            PropertyDefinition::new(PropertyType::String).default_fn(DefaultFn::Uuid),
        );
        properties.insert("createdAt".to_string(), PropertyDefinition::new(PropertyType::Date));
        ModelDefinition {
            name: "Note".to_string(),
            table: "Note".to_string(),
            base: None,
            properties,
            id_property: "id".to_string(),
            id_generated: true,
            indexes: Vec::new(),
            settings: ModelOptions::default(),
        }
    }

    #[test]
    fn test_defaults_and_validation() {
        let definition = note_definition();
        let mut data = Record::new();
        data.insert("title".to_string(), json!("hello"));

        apply_defaults(&definition, &mut data);
        assert_eq!(data["status"], json!("draft"));
        assert!(uuid::Uuid::parse_str(data["token"].as_str().unwrap()).is_ok());
        assert!(!data.contains_key("id"));
        assert!(validate_record(&definition, &data).is_ok());

        data.remove("title");
        assert!(matches!(
            validate_record(&definition, &data),
            Err(StandaloneError::ValidationError { .. })
        ));

        data.insert("title".to_string(), json!("x"));
        data.insert("createdAt".to_string(), json!("not a date"));
        assert!(validate_record(&definition, &data).is_err());
    }

    #[test]
    fn test_standalone_remote_hooks() {
        let model = ModelHandle::new(note_definition());
        assert!(model.remote_method("greet", RemoteMethodSpec::default()).is_err());

        model.install_remote_hooks(Arc::new(crate::model::hooks::StandaloneHooks));
        assert_eq!(model.remote_host(), Some(HookHostKind::Standalone));
        assert!(model.remote_method("greet", RemoteMethodSpec::default()).is_ok());
        assert!(model.before_remote("*", Arc::new(|_ctx| Ok(()))).is_ok());
        assert!(model.after_remote("*", Arc::new(|_ctx| Ok(()))).is_ok());
    }

    #[tokio::test]
    async fn test_operations_require_connection() {
        let model = ModelHandle::new(note_definition());
        let result = model.find(&Filter::new()).await;
        assert!(matches!(result, Err(StandaloneError::QueryError { .. })));
    }
}
