//! 模型描述类型定义
//!
//! 模型描述（Schema Descriptor）是模型形状与关系的声明式表达，
//! 通常来自模型目录中的JSON文件，也可以由调用者直接构造。

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// 内置基类名称，`options.base` 指向它们时无需在同批次中定义
pub const BUILTIN_BASES: &[&str] = &["Model", "PersistedModel"];

/// 模型描述
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDescriptor {
    /// 模型名（唯一）
    pub name: String,
    /// 属性定义
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyDefinition>,
    /// 关系定义
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub relations: BTreeMap<String, RelationDefinition>,
    /// 模型选项
    #[serde(default)]
    pub options: ModelOptions,
    /// 顶层混入声明，组装前会被移动到 `options.mixins`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mixins: Option<BTreeMap<String, Value>>,
    /// 顶层索引声明，组装前会被移动到 `options.indexes`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexes: Option<BTreeMap<String, Value>>,
}

impl SchemaDescriptor {
    /// 创建空的模型描述
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            properties: BTreeMap::new(),
            relations: BTreeMap::new(),
            options: ModelOptions::default(),
            mixins: None,
            indexes: None,
        }
    }

    /// 添加属性
    pub fn property(mut self, name: &str, definition: PropertyDefinition) -> Self {
        self.properties.insert(name.to_string(), definition);
        self
    }

    /// 添加关系
    pub fn relation(mut self, name: &str, definition: RelationDefinition) -> Self {
        self.relations.insert(name.to_string(), definition);
        self
    }

    /// 设置基类
    pub fn base(mut self, base: &str) -> Self {
        self.options.base = Some(base.to_string());
        self
    }

    /// 设置表名
    pub fn table(mut self, table: &str) -> Self {
        self.options.table = Some(table.to_string());
        self
    }

    /// 声明一个顶层混入
    pub fn mixin(mut self, name: &str, options: Value) -> Self {
        self.mixins
            .get_or_insert_with(BTreeMap::new)
            .insert(name.to_string(), options);
        self
    }

    /// 声明一个顶层索引
    pub fn index(mut self, name: &str, definition: Value) -> Self {
        self.indexes
            .get_or_insert_with(BTreeMap::new)
            .insert(name.to_string(), definition);
        self
    }
}

/// 模型选项
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelOptions {
    /// 基类名
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    /// 自定义表名/集合名，缺省为模型名
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    /// 混入及其参数
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub mixins: BTreeMap<String, Value>,
    /// 索引定义
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub indexes: BTreeMap<String, Value>,
    /// 其他自由选项
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// 被内置类型占用、不能用作模型名的名称
pub const RESERVED_TYPE_NAMES: &[&str] = &["String", "Number", "Boolean", "Date", "Object", "Buffer", "Any", "Array"];

/// 属性类型
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PropertyType {
    String,
    Number,
    Boolean,
    Date,
    Object,
    Buffer,
    #[default]
    Any,
    /// 数组，元素类型
    Array(Box<PropertyType>),
    /// 引用同批次中的另一个模型（嵌入结构）
    Model(String),
}

impl PropertyType {
    /// 从类型名解析，未知名称视为模型引用
    ///
    /// 区分大小写：别名只接受小写，核心类型另外接受首字母大写的写法
    /// （见 [`RESERVED_TYPE_NAMES`]），其余写法一律视为模型名。
    pub fn from_name(name: &str) -> Self {
        match name {
            "string" | "String" | "text" => PropertyType::String,
            "number" | "Number" | "integer" | "float" => PropertyType::Number,
            "boolean" | "Boolean" | "bool" => PropertyType::Boolean,
            "date" | "Date" | "datetime" => PropertyType::Date,
            "object" | "Object" | "json" => PropertyType::Object,
            "buffer" | "Buffer" | "binary" => PropertyType::Buffer,
            "any" | "Any" => PropertyType::Any,
            "array" | "Array" => PropertyType::Array(Box::new(PropertyType::Any)),
            _ => PropertyType::Model(name.to_string()),
        }
    }

    /// 类型名
    pub fn name(&self) -> String {
        match self {
            PropertyType::String => "string".to_string(),
            PropertyType::Number => "number".to_string(),
            PropertyType::Boolean => "boolean".to_string(),
            PropertyType::Date => "date".to_string(),
            PropertyType::Object => "object".to_string(),
            PropertyType::Buffer => "buffer".to_string(),
            PropertyType::Any => "any".to_string(),
            PropertyType::Array(item) => format!("[{}]", item.name()),
            PropertyType::Model(name) => name.clone(),
        }
    }

    /// 返回所有被引用的模型名（递归进入数组元素）
    pub fn referenced_model(&self) -> Option<&str> {
        match self {
            PropertyType::Model(name) => Some(name),
            PropertyType::Array(item) => item.referenced_model(),
            _ => None,
        }
    }

    /// 是否以JSON文本形式存储
    pub fn is_structured(&self) -> bool {
        matches!(
            self,
            PropertyType::Object | PropertyType::Array(_) | PropertyType::Model(_) | PropertyType::Any
        )
    }

    fn from_json(value: &Value) -> Result<Self, String> {
        match value {
            Value::String(name) => Ok(Self::from_name(name)),
            Value::Array(items) => match items.as_slice() {
                [] => Ok(PropertyType::Array(Box::new(PropertyType::Any))),
                [item] => Ok(PropertyType::Array(Box::new(Self::from_json(item)?))),
                _ => Err("数组类型只能声明一个元素类型".to_string()),
            },
            other => Err(format!("无法识别的属性类型: {}", other)),
        }
    }

    fn to_json(&self) -> Value {
        match self {
            PropertyType::Array(item) => Value::Array(vec![item.to_json()]),
            other => Value::String(other.name()),
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl Serialize for PropertyType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PropertyType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        PropertyType::from_json(&value).map_err(de::Error::custom)
    }
}

/// 默认值生成函数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefaultFn {
    /// 随机UUID v4
    #[serde(alias = "guid", alias = "uuidv4")]
    Uuid,
    /// 当前UTC时间（RFC3339）
    Now,
}

/// 属性定义
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyDefinition {
    /// 属性类型
    #[serde(rename = "type")]
    pub property_type: PropertyType,
    /// 是否必填
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
    /// 是否主键
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub id: bool,
    /// 是否建立索引
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub index: bool,
    /// 默认值
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// 默认值生成函数
    #[serde(rename = "defaultFn", skip_serializing_if = "Option::is_none")]
    pub default_fn: Option<DefaultFn>,
    /// 数据库列名，缺省为属性名
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
}

impl PropertyDefinition {
    /// 创建新的属性定义
    pub fn new(property_type: PropertyType) -> Self {
        Self {
            property_type,
            required: false,
            id: false,
            index: false,
            default: None,
            default_fn: None,
            column: None,
        }
    }

    /// 设置为必填
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// 设置为主键
    pub fn id(mut self) -> Self {
        self.id = true;
        self
    }

    /// 设置为索引字段
    pub fn indexed(mut self) -> Self {
        self.index = true;
        self
    }

    /// 设置默认值
    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// 设置默认值生成函数
    pub fn default_fn(mut self, default_fn: DefaultFn) -> Self {
        self.default_fn = Some(default_fn);
        self
    }

    /// 设置列名
    pub fn column(mut self, column: &str) -> Self {
        self.column = Some(column.to_string());
        self
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawProperty {
    Short(PropertyType),
    Full(FullProperty),
}

#[derive(Deserialize)]
struct FullProperty {
    #[serde(rename = "type", default)]
    property_type: PropertyType,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    id: bool,
    #[serde(default)]
    index: bool,
    #[serde(default)]
    default: Option<Value>,
    #[serde(rename = "defaultFn", default)]
    default_fn: Option<DefaultFn>,
    #[serde(default)]
    column: Option<String>,
}

impl<'de> Deserialize<'de> for PropertyDefinition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match RawProperty::deserialize(deserializer)? {
            RawProperty::Short(property_type) => Ok(PropertyDefinition::new(property_type)),
            RawProperty::Full(full) => Ok(PropertyDefinition {
                property_type: full.property_type,
                required: full.required,
                id: full.id,
                index: full.index,
                default: full.default,
                default_fn: full.default_fn,
                column: full.column,
            }),
        }
    }
}

/// 关系类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationType {
    BelongsTo,
    HasOne,
    HasMany,
    HasAndBelongsToMany,
}

impl RelationType {
    /// 关系类型的字符串表示
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationType::BelongsTo => "belongsTo",
            RelationType::HasOne => "hasOne",
            RelationType::HasMany => "hasMany",
            RelationType::HasAndBelongsToMany => "hasAndBelongsToMany",
        }
    }

    /// 关系是否返回多条记录
    pub fn is_many(&self) -> bool {
        matches!(self, RelationType::HasMany | RelationType::HasAndBelongsToMany)
    }
}

/// 关系定义
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationDefinition {
    /// 关系类型
    #[serde(rename = "type")]
    pub relation_type: RelationType,
    /// 目标模型名
    pub model: String,
    /// 外键属性名
    #[serde(rename = "foreignKey", default, skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<String>,
    /// 多对多关系的中间模型
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub through: Option<String>,
}

impl RelationDefinition {
    fn with_type(relation_type: RelationType, model: &str) -> Self {
        Self {
            relation_type,
            model: model.to_string(),
            foreign_key: None,
            through: None,
        }
    }

    pub fn belongs_to(model: &str) -> Self {
        Self::with_type(RelationType::BelongsTo, model)
    }

    pub fn has_one(model: &str) -> Self {
        Self::with_type(RelationType::HasOne, model)
    }

    pub fn has_many(model: &str) -> Self {
        Self::with_type(RelationType::HasMany, model)
    }

    pub fn has_and_belongs_to_many(model: &str) -> Self {
        Self::with_type(RelationType::HasAndBelongsToMany, model)
    }

    /// 设置外键
    pub fn foreign_key(mut self, key: &str) -> Self {
        self.foreign_key = Some(key.to_string());
        self
    }

    /// 设置中间模型
    pub fn through(mut self, model: &str) -> Self {
        self.through = Some(model.to_string());
        self
    }

    /// 外键（空字符串视为未设置）
    pub fn explicit_foreign_key(&self) -> Option<&str> {
        self.foreign_key.as_deref().filter(|k| !k.is_empty())
    }
}

/// 关系覆盖提示：仅用于逆向发现，按模型名合并到已发现的模型上
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationHint {
    /// 目标模型名
    pub name: String,
    /// 需要补充或覆盖的关系
    #[serde(default)]
    pub relations: BTreeMap<String, RelationDefinition>,
}

impl RelationHint {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            relations: BTreeMap::new(),
        }
    }

    pub fn relation(mut self, name: &str, definition: RelationDefinition) -> Self {
        self.relations.insert(name.to_string(), definition);
        self
    }
}
