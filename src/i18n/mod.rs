//! 多语言错误消息模块
//!
//! 使用rat_embed_lang框架提供统一的错误消息多语言支持

use std::collections::HashMap;
use once_cell::sync::Lazy;
use rat_embed_lang::register_translations;

/// 错误消息翻译注册器
pub struct ErrorMessageI18n;

impl ErrorMessageI18n {
    /// 注册所有错误消息翻译
    pub fn register_all_translations() {
        let mut translations = HashMap::new();

        // 同步时没有任何模型
        let mut empty_model_set = HashMap::new();
        empty_model_set.insert("zh-CN".to_string(), "没有可同步的模型 (no models to sync)".to_string());
        empty_model_set.insert("en-US".to_string(), "no models to sync".to_string());
        empty_model_set.insert("ja-JP".to_string(), "同期するモデルがありません (no models to sync)".to_string());
        translations.insert("error.empty_model_set".to_string(), empty_model_set);

        // 模型描述文件解析失败
        let mut parse_schema = HashMap::new();
        parse_schema.insert("zh-CN".to_string(), "模型描述格式错误: {message}".to_string());
        parse_schema.insert("en-US".to_string(), "Malformed schema document: {message}".to_string());
        parse_schema.insert("ja-JP".to_string(), "モデル定義の形式が不正です: {message}".to_string());
        translations.insert("error.parse_schema".to_string(), parse_schema);

        // 模型名重复
        let mut duplicate_model = HashMap::new();
        duplicate_model.insert("zh-CN".to_string(), "模型 '{model}' 重复定义".to_string());
        duplicate_model.insert("en-US".to_string(), "Model '{model}' is defined more than once".to_string());
        duplicate_model.insert("ja-JP".to_string(), "モデル '{model}' が重複して定義されています".to_string());
        translations.insert("error.duplicate_model".to_string(), duplicate_model);

        // 模型名非法
        let mut invalid_model_name = HashMap::new();
        invalid_model_name.insert("zh-CN".to_string(), "模型名 '{model}' 不合法".to_string());
        invalid_model_name.insert("en-US".to_string(), "Model name '{model}' is not a valid identifier".to_string());
        invalid_model_name.insert("ja-JP".to_string(), "モデル名 '{model}' が不正です".to_string());
        translations.insert("error.invalid_model_name".to_string(), invalid_model_name);

        // 基类未定义
        let mut base_undefined = HashMap::new();
        base_undefined.insert("zh-CN".to_string(), "基类 '{base}' 未定义".to_string());
        base_undefined.insert("en-US".to_string(), "Base model '{base}' is not defined".to_string());
        base_undefined.insert("ja-JP".to_string(), "基底モデル '{base}' が定義されていません".to_string());
        translations.insert("error.base_undefined".to_string(), base_undefined);

        // 基类顺序错误
        let mut base_out_of_order = HashMap::new();
        base_out_of_order.insert("zh-CN".to_string(), "基类 '{base}' 必须排在 '{model}' 之前".to_string());
        base_out_of_order.insert("en-US".to_string(), "Base model '{base}' must be listed before '{model}'".to_string());
        base_out_of_order.insert("ja-JP".to_string(), "基底モデル '{base}' は '{model}' より前に定義する必要があります".to_string());
        translations.insert("error.base_out_of_order".to_string(), base_out_of_order);

        // 属性类型未定义
        let mut unknown_type = HashMap::new();
        unknown_type.insert("zh-CN".to_string(), "属性 '{property}' 引用了未定义的类型 '{type}'".to_string());
        unknown_type.insert("en-US".to_string(), "Property '{property}' references undefined type '{type}'".to_string());
        unknown_type.insert("ja-JP".to_string(), "プロパティ '{property}' が未定義の型 '{type}' を参照しています".to_string());
        translations.insert("error.unknown_type".to_string(), unknown_type);

        // 混入未注册
        let mut mixin_not_registered = HashMap::new();
        mixin_not_registered.insert("zh-CN".to_string(), "混入 '{mixin}' 未注册".to_string());
        mixin_not_registered.insert("en-US".to_string(), "Mixin '{mixin}' is not registered".to_string());
        mixin_not_registered.insert("ja-JP".to_string(), "ミックスイン '{mixin}' は登録されていません".to_string());
        translations.insert("error.mixin_not_registered".to_string(), mixin_not_registered);

        // 混入执行失败
        let mut mixin_failed = HashMap::new();
        mixin_failed.insert("zh-CN".to_string(), "混入 '{mixin}' 执行失败: {message}".to_string());
        mixin_failed.insert("en-US".to_string(), "Mixin '{mixin}' failed: {message}".to_string());
        mixin_failed.insert("ja-JP".to_string(), "ミックスイン '{mixin}' の実行に失敗しました: {message}".to_string());
        translations.insert("error.mixin_failed".to_string(), mixin_failed);

        // 关系目标模型缺失
        let mut relation_target_missing = HashMap::new();
        relation_target_missing.insert("zh-CN".to_string(), "关系 '{relation}' 的目标模型 '{target}' 未绑定到当前连接".to_string());
        relation_target_missing.insert("en-US".to_string(), "Target model '{target}' of relation '{relation}' is not attached to this connection".to_string());
        relation_target_missing.insert("ja-JP".to_string(), "リレーション '{relation}' の対象モデル '{target}' はこの接続に登録されていません".to_string());
        translations.insert("error.relation_target_missing".to_string(), relation_target_missing);

        // 关系不存在
        let mut relation_not_found = HashMap::new();
        relation_not_found.insert("zh-CN".to_string(), "模型 '{model}' 没有名为 '{relation}' 的关系".to_string());
        relation_not_found.insert("en-US".to_string(), "Model '{model}' has no relation named '{relation}'".to_string());
        relation_not_found.insert("ja-JP".to_string(), "モデル '{model}' にリレーション '{relation}' はありません".to_string());
        translations.insert("error.relation_not_found".to_string(), relation_not_found);

        // 模型尚未绑定连接
        let mut model_not_attached = HashMap::new();
        model_not_attached.insert("zh-CN".to_string(), "模型 '{model}' 尚未绑定数据库连接".to_string());
        model_not_attached.insert("en-US".to_string(), "Model '{model}' is not attached to a connection".to_string());
        model_not_attached.insert("ja-JP".to_string(), "モデル '{model}' はデータベース接続に登録されていません".to_string());
        translations.insert("error.model_not_attached".to_string(), model_not_attached);

        // 远程钩子宿主未安装
        let mut remote_hooks_missing = HashMap::new();
        remote_hooks_missing.insert("zh-CN".to_string(), "模型 '{model}' 未安装远程钩子宿主".to_string());
        remote_hooks_missing.insert("en-US".to_string(), "No remote hook host is installed on model '{model}'".to_string());
        remote_hooks_missing.insert("ja-JP".to_string(), "モデル '{model}' にリモートフックのホストがありません".to_string());
        translations.insert("error.remote_hooks_missing".to_string(), remote_hooks_missing);

        // sync 与 discovery 冲突
        let mut mode_conflict = HashMap::new();
        mode_conflict.insert("zh-CN".to_string(), "sync 与 discovery 不能同时启用".to_string());
        mode_conflict.insert("en-US".to_string(), "sync and discovery cannot be enabled together".to_string());
        mode_conflict.insert("ja-JP".to_string(), "sync と discovery は同時に有効にできません".to_string());
        translations.insert("error.mode_conflict".to_string(), mode_conflict);

        // 缺少模型目录
        let mut models_path_missing = HashMap::new();
        models_path_missing.insert("zh-CN".to_string(), "未提供 schemas 时必须设置 models_path".to_string());
        models_path_missing.insert("en-US".to_string(), "models_path is required when schemas are not given".to_string());
        models_path_missing.insert("ja-JP".to_string(), "schemas を指定しない場合は models_path が必要です".to_string());
        translations.insert("error.models_path_missing".to_string(), models_path_missing);

        // 缺少连接器配置
        let mut connector_missing = HashMap::new();
        connector_missing.insert("zh-CN".to_string(), "连接器配置必须设置".to_string());
        connector_missing.insert("en-US".to_string(), "A connector profile is required".to_string());
        connector_missing.insert("ja-JP".to_string(), "コネクタ設定が必要です".to_string());
        translations.insert("error.connector_missing".to_string(), connector_missing);

        // 连接器逻辑名缺失
        let mut profile_name_missing = HashMap::new();
        profile_name_missing.insert("zh-CN".to_string(), "连接器逻辑名必须设置".to_string());
        profile_name_missing.insert("en-US".to_string(), "The connector profile requires a name".to_string());
        profile_name_missing.insert("ja-JP".to_string(), "コネクタの論理名が必要です".to_string());
        translations.insert("error.profile_name_missing".to_string(), profile_name_missing);

        // 连接器驱动缺失
        let mut profile_driver_missing = HashMap::new();
        profile_driver_missing.insert("zh-CN".to_string(), "连接器驱动标识必须设置".to_string());
        profile_driver_missing.insert("en-US".to_string(), "The connector profile requires a driver".to_string());
        profile_driver_missing.insert("ja-JP".to_string(), "コネクタのドライバ識別子が必要です".to_string());
        translations.insert("error.profile_driver_missing".to_string(), profile_driver_missing);

        // 同步时模型未绑定连接
        let mut sync_unbound = HashMap::new();
        sync_unbound.insert("zh-CN".to_string(), "模型未绑定任何连接，无法同步".to_string());
        sync_unbound.insert("en-US".to_string(), "Models are not attached to a connection, cannot sync".to_string());
        sync_unbound.insert("ja-JP".to_string(), "モデルが接続に紐付いていないため同期できません".to_string());
        translations.insert("error.sync_unbound".to_string(), sync_unbound);

        // 模型名与内置类型冲突
        let mut reserved_type_name = HashMap::new();
        reserved_type_name.insert("zh-CN".to_string(), "模型名 '{model}' 与内置属性类型重名".to_string());
        reserved_type_name.insert("en-US".to_string(), "Model name '{model}' collides with a built-in property type".to_string());
        reserved_type_name.insert("ja-JP".to_string(), "モデル名 '{model}' は組み込みのプロパティ型と重複しています".to_string());
        translations.insert("error.reserved_type_name".to_string(), reserved_type_name);

        // 关系提示冲突
        let mut hint_conflict = HashMap::new();
        hint_conflict.insert("zh-CN".to_string(), "模型 '{model}' 的关系提示 '{relation}' 存在互相矛盾的定义".to_string());
        hint_conflict.insert("en-US".to_string(), "Relation hint '{relation}' for model '{model}' has conflicting definitions".to_string());
        hint_conflict.insert("ja-JP".to_string(), "モデル '{model}' のリレーションヒント '{relation}' の定義が矛盾しています".to_string());
        translations.insert("error.hint_conflict".to_string(), hint_conflict);

        // SQLite 缺少文件配置
        let mut sqlite_file_missing = HashMap::new();
        sqlite_file_missing.insert("zh-CN".to_string(), "sqlite 连接器必须设置 file".to_string());
        sqlite_file_missing.insert("en-US".to_string(), "The sqlite connector requires a 'file' setting".to_string());
        sqlite_file_missing.insert("ja-JP".to_string(), "sqlite コネクタには 'file' の設定が必要です".to_string());
        translations.insert("error.sqlite_file_missing".to_string(), sqlite_file_missing);

        // SQLite连接失败
        let mut sqlite_connection_failed = HashMap::new();
        sqlite_connection_failed.insert("zh-CN".to_string(), "SQLite连接失败: {message}".to_string());
        sqlite_connection_failed.insert("en-US".to_string(), "SQLite connection failed: {message}".to_string());
        sqlite_connection_failed.insert("ja-JP".to_string(), "SQLite接続失敗: {message}".to_string());
        translations.insert("error.sqlite_connection".to_string(), sqlite_connection_failed);

        // 注册所有翻译
        register_translations(translations);
    }

    /// 初始化错误消息多语言支持
    pub fn init() {
        Lazy::force(&REGISTERED);

        // 从环境变量获取语言设置，默认为zh-CN
        let lang = std::env::var("RAT_LANG")
            .or_else(|_| std::env::var("LANG"))
            .unwrap_or_else(|_| "zh-CN".to_string());

        // 标准化语言代码
        use rat_embed_lang::normalize_language_code;
        let normalized_lang = normalize_language_code(&lang);
        set_language(&normalized_lang);
    }
}


static REGISTERED: Lazy<()> = Lazy::new(ErrorMessageI18n::register_all_translations);

/// 翻译（首次调用时注册全部翻译）
pub fn t(key: &str) -> String {
    Lazy::force(&REGISTERED);
    rat_embed_lang::t(key)
}

/// 带参数的翻译（首次调用时注册全部翻译）
pub fn tf(key: &str, args: &[(&str, &str)]) -> String {
    Lazy::force(&REGISTERED);
    rat_embed_lang::tf(key, args)
}

/// 重新导出rat_embed_lang的语言设置函数
pub use rat_embed_lang::{set_language, current_language};
