//! Field Validator
//!
//! Walks `DATA_TYPE_RULES` for per-field checks, then applies the
//! inter-field invariants of an entity.

use std::collections::HashMap;

use serde::Serialize;

use crate::common_fields::{common_field_definitions, is_common_field_code};
use crate::config::ValidationConfig;
use crate::schema::rules::{
    is_reserved_word, is_valid_identifier, rule_for, CommonFieldDefinition, MAX_CODE_LENGTH,
    MAX_DECIMAL_PRECISION,
};
use crate::schema::{DataType, Entity, Field};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// One finding about a field, or about the entity when `field_code` is empty
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldIssue {
    /// Rule identifier (`STRING_LENGTH_REQUIRED`, `DUPLICATE_CODE`, ...)
    pub rule: &'static str,
    pub field_code: String,
    pub field_name: String,
    pub severity: Severity,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationSummary {
    pub total_fields: usize,
    pub error_count: usize,
    pub warning_count: usize,
    pub common_fields_count: usize,
    pub business_fields_count: usize,
}

/// Result of validating an entity's field list
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityValidationResult {
    pub is_valid: bool,
    pub errors: Vec<FieldIssue>,
    pub warnings: Vec<FieldIssue>,
    pub recommendations: Vec<String>,
    pub summary: ValidationSummary,
}

impl EntityValidationResult {
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Messages of every error, in evaluation order
    pub fn error_messages(&self) -> Vec<&str> {
        self.errors.iter().map(|e| e.message.as_str()).collect()
    }

    fn error(&mut self, rule: &'static str, field: Option<&Field>, message: impl Into<String>) {
        self.errors.push(issue(rule, field, Severity::Error, message.into()));
    }

    fn warn(&mut self, rule: &'static str, field: Option<&Field>, message: impl Into<String>) {
        self.warnings.push(issue(rule, field, Severity::Warning, message.into()));
    }
}

fn issue(rule: &'static str, field: Option<&Field>, severity: Severity, message: String) -> FieldIssue {
    FieldIssue {
        rule,
        field_code: field.map(|f| f.code.clone()).unwrap_or_default(),
        field_name: field.map(|f| f.name.clone()).unwrap_or_default(),
        severity,
        message,
    }
}

/// Field validator with configurable entity limits
#[derive(Debug, Clone, Default)]
pub struct FieldValidator {
    limits: ValidationConfig,
}

impl FieldValidator {
    pub fn new(limits: ValidationConfig) -> Self {
        Self { limits }
    }

    /// Validate `fields` as the complete field list of `entity`
    ///
    /// `known_entities` resolves foreign key targets; `entity` itself always
    /// counts as known so self-referencing keys are accepted.
    pub fn validate_entity_fields(
        &self,
        entity: &Entity,
        fields: &[Field],
        known_entities: &[Entity],
    ) -> EntityValidationResult {
        let mut result = EntityValidationResult::default();

        self.check_common_fields(fields, &mut result);

        for field in fields.iter().filter(|f| !is_common_field_code(&f.code)) {
            self.check_field(field, &mut result);
        }

        self.check_field_relations(fields, &mut result);
        self.check_primary_key(fields, &mut result);
        self.check_foreign_keys(entity, fields, known_entities, &mut result);
        self.check_entity_limits(fields, &mut result);
        result.recommendations = recommendations(fields);

        let common = fields.iter().filter(|f| is_common_field_code(&f.code)).count();
        result.summary = ValidationSummary {
            total_fields: fields.len(),
            error_count: result.errors.len(),
            warning_count: result.warnings.len(),
            common_fields_count: common,
            business_fields_count: fields.len() - common,
        };
        result.is_valid = result.errors.is_empty();
        result
    }

    // =========================================================================
    // Common fields
    // =========================================================================

    fn check_common_fields(&self, fields: &[Field], result: &mut EntityValidationResult) {
        for def in common_field_definitions() {
            match fields.iter().find(|f| f.code == def.code) {
                None => result.errors.push(FieldIssue {
                    rule: "MISSING_COMMON_FIELD",
                    field_code: def.code.to_string(),
                    field_name: def.name.to_string(),
                    severity: Severity::Error,
                    message: format!("缺少必需的通用字段: {}", def.name),
                }),
                Some(field) => check_common_configuration(field, def, result),
            }
        }
    }

    // =========================================================================
    // Single field
    // =========================================================================

    /// Per-field checks for a business field
    pub fn check_field(&self, field: &Field, result: &mut EntityValidationResult) {
        if field.name.trim().is_empty() {
            result.error("NAME_REQUIRED", Some(field), "字段名称不能为空");
        }
        if let Some(message) = check_code(&field.code) {
            result.error("CODE_FORMAT", Some(field), message);
        }
        self.check_type_attributes(field, result);
        check_default_value(field, result);
    }

    fn check_type_attributes(&self, field: &Field, result: &mut EntityValidationResult) {
        let rule = rule_for(field.data_type);
        let type_name = field.data_type.as_str();

        if rule.requires_length {
            match field.length {
                None | Some(0) => result.error(
                    "LENGTH_REQUIRED",
                    Some(field),
                    format!("{}类型字段必须指定长度", type_name),
                ),
                Some(len) if len > self.limits.max_string_length => result.warn(
                    "LENGTH_TOO_LARGE",
                    Some(field),
                    format!(
                        "{}类型字段长度超过{}，建议使用TEXT类型",
                        type_name, self.limits.max_string_length
                    ),
                ),
                Some(_) => {}
            }
        }

        if rule.requires_precision {
            match field.precision {
                None | Some(0) => result.error(
                    "PRECISION_REQUIRED",
                    Some(field),
                    format!("{}类型字段必须指定精度", type_name),
                ),
                Some(p) => {
                    if p > MAX_DECIMAL_PRECISION {
                        result.error(
                            "PRECISION_TOO_LARGE",
                            Some(field),
                            format!("{}类型字段精度不能超过{}", type_name, MAX_DECIMAL_PRECISION),
                        );
                    }
                    if field.scale.is_some_and(|s| s > p) {
                        result.error(
                            "SCALE_EXCEEDS_PRECISION",
                            Some(field),
                            format!("{}类型字段的小数位数不能大于精度", type_name),
                        );
                    }
                }
            }
        }

        if !rule.accepts_length && field.length.is_some() {
            result.warn(
                "SUPERFLUOUS_LENGTH",
                Some(field),
                format!("{}类型字段不需要指定长度", type_name),
            );
        }
        if !rule.accepts_precision && (field.precision.is_some() || field.scale.is_some()) {
            result.warn(
                "SUPERFLUOUS_PRECISION",
                Some(field),
                format!("{}类型字段不需要指定精度", type_name),
            );
        }
    }

    // =========================================================================
    // Inter-field invariants
    // =========================================================================

    fn check_field_relations(&self, fields: &[Field], result: &mut EntityValidationResult) {
        for code in duplicates(fields.iter().map(|f| f.code.as_str())) {
            for field in fields.iter().filter(|f| f.code == code) {
                result.error("DUPLICATE_CODE", Some(field), format!("字段代码重复: {}", code));
            }
        }
        // distinct codes can still collapse onto one snake_case column
        let columns: Vec<String> = fields.iter().map(Field::column_name).collect();
        for column in duplicates(columns.iter().map(String::as_str)) {
            let clashing: Vec<&Field> = fields.iter().filter(|f| f.column_name() == column).collect();
            if clashing.windows(2).all(|w| w[0].code == w[1].code) {
                continue;
            }
            for field in clashing {
                result.error(
                    "DUPLICATE_COLUMN",
                    Some(field),
                    format!("字段代码映射到重复的列名: {}", column),
                );
            }
        }
        for name in duplicates(fields.iter().map(|f| f.name.as_str())) {
            for field in fields.iter().filter(|f| f.name == name) {
                result.warn("DUPLICATE_NAME", Some(field), format!("字段名称重复: {}", name));
            }
        }
        let orders: Vec<String> = fields.iter().map(|f| f.display_order.to_string()).collect();
        for order in duplicates(orders.iter().map(String::as_str)) {
            for field in fields.iter().filter(|f| f.display_order.to_string() == order) {
                result.warn(
                    "DUPLICATE_DISPLAY_ORDER",
                    Some(field),
                    format!("显示顺序重复: {}", order),
                );
            }
        }
    }

    fn check_primary_key(&self, fields: &[Field], result: &mut EntityValidationResult) {
        let keys: Vec<&Field> = fields.iter().filter(|f| f.primary_key).collect();
        match keys.len() {
            0 if !fields.is_empty() => {
                result.error("PRIMARY_KEY", None, "实体必须有且只有一个主键字段")
            }
            0 | 1 => {}
            _ => {
                let codes: Vec<&str> = keys.iter().map(|f| f.code.as_str()).collect();
                for field in keys {
                    result.error(
                        "PRIMARY_KEY",
                        Some(field),
                        format!("实体只能有一个主键字段，当前为: {}", codes.join(", ")),
                    );
                }
            }
        }
    }

    fn check_foreign_keys(
        &self,
        entity: &Entity,
        fields: &[Field],
        known_entities: &[Entity],
        result: &mut EntityValidationResult,
    ) {
        for field in fields {
            let Some(fk) = &field.foreign_key else { continue };

            let referenced = if fk.referenced_entity_id == entity.id {
                Some(entity)
            } else {
                known_entities.iter().find(|e| e.id == fk.referenced_entity_id)
            };

            match referenced {
                None => result.error(
                    "FOREIGN_KEY_ENTITY",
                    Some(field),
                    format!("外键引用的实体不存在: {}", fk.referenced_entity_id),
                ),
                Some(target) => {
                    // A target without loaded fields is only checked for existence
                    if !target.fields.is_empty() && !target.has_field(&fk.referenced_field) {
                        result.error(
                            "FOREIGN_KEY_FIELD",
                            Some(field),
                            format!(
                                "外键引用的字段不存在: {}.{}",
                                target.code, fk.referenced_field
                            ),
                        );
                    }
                }
            }
        }
    }

    fn check_entity_limits(&self, fields: &[Field], result: &mut EntityValidationResult) {
        if fields.is_empty() {
            result.error("FIELD_COUNT", None, "实体必须至少包含一个字段");
        } else if fields.len() > self.limits.max_fields {
            result.warn("FIELD_COUNT", None, "实体字段数量过多，可能影响性能");
        }

        if !fields.iter().any(Field::is_required) {
            result.warn("NO_REQUIRED_FIELD", None, "实体没有必填字段，建议至少设置一个必填字段");
        }

        if fields.iter().filter(|f| f.unique).count() > self.limits.max_unique_fields {
            result.warn("UNIQUE_COUNT", None, "唯一字段数量过多，可能影响插入性能");
        }
    }
}

/// Validate with default limits
pub fn validate_entity_fields(
    entity: &Entity,
    fields: &[Field],
    known_entities: &[Entity],
) -> EntityValidationResult {
    FieldValidator::default().validate_entity_fields(entity, fields, known_entities)
}

fn check_common_configuration(
    field: &Field,
    def: &CommonFieldDefinition,
    result: &mut EntityValidationResult,
) {
    if field.data_type != def.data_type {
        result.error(
            "COMMON_FIELD_TYPE",
            Some(field),
            format!(
                "通用字段 {} 的数据类型应为 {}，当前为 {}",
                field.name, def.data_type, field.data_type
            ),
        );
    }
    if field.is_required() != def.required {
        result.error(
            "COMMON_FIELD_REQUIRED",
            Some(field),
            format!(
                "通用字段 {} 的必填属性应为 {}，当前为 {}",
                field.name,
                def.required,
                field.is_required()
            ),
        );
    }
    if field.primary_key != def.primary_key {
        result.error(
            "COMMON_FIELD_PRIMARY_KEY",
            Some(field),
            format!("通用字段 {} 的主键属性应为 {}", field.name, def.primary_key),
        );
    }
    if field.name != def.name {
        result.warn(
            "COMMON_FIELD_NAME",
            Some(field),
            format!("通用字段 {} 的名称建议使用标准名称: {}", field.code, def.name),
        );
    }
}

/// Error message for an unusable business field code
fn check_code(code: &str) -> Option<String> {
    if code.trim().is_empty() {
        return Some("字段代码不能为空".to_string());
    }
    if !is_valid_identifier(code) {
        return Some("字段代码必须以字母开头，只能包含字母、数字和下划线".to_string());
    }
    if code.len() > MAX_CODE_LENGTH {
        return Some(format!("字段代码长度不能超过{}个字符", MAX_CODE_LENGTH));
    }
    if is_reserved_word(code) {
        return Some(format!("字段代码不能使用保留字: {}", code));
    }
    None
}

fn check_default_value(field: &Field, result: &mut EntityValidationResult) {
    let Some(value) = field.default_value.as_deref().filter(|v| !v.is_empty()) else {
        return;
    };
    let rule = rule_for(field.data_type);
    if !(rule.check_default)(value) {
        result.error(
            "DEFAULT_VALUE",
            Some(field),
            format!("{}类型字段的默认值{}", field.data_type, rule.default_hint),
        );
    }
}

/// Values that occur more than once, in first-seen order
fn duplicates<'a>(values: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut order = Vec::new();
    for v in values {
        let count = counts.entry(v).or_insert(0);
        *count += 1;
        if *count == 2 {
            order.push(v);
        }
    }
    order
}

fn recommendations(fields: &[Field]) -> Vec<String> {
    let mut out = Vec::new();
    if fields.is_empty() {
        return out;
    }

    if fields.len() > 50 {
        out.push("实体字段数量较多，建议考虑拆分为多个相关实体以提升性能".to_string());
    }
    if fields.iter().filter(|f| f.unique || f.is_required()).count() > 10 {
        out.push("索引字段过多可能影响写入性能，建议优化索引策略".to_string());
    }
    if fields.iter().filter(|f| f.data_type == DataType::Text).count() > 3 {
        out.push("大文本字段较多，建议考虑使用外部存储或分离存储策略".to_string());
    }
    if fields.iter().filter(|f| f.data_type == DataType::Json).count() > 2 {
        out.push("JSON字段过多可能影响查询性能，建议规范化数据结构".to_string());
    }
    if fields
        .iter()
        .any(|f| f.data_type == DataType::String && f.length.is_some_and(|l| l > 1000))
    {
        out.push("存在长度超过1000的字符串字段，建议评估是否需要调整为TEXT类型".to_string());
    }
    let required = fields.iter().filter(|f| f.is_required()).count();
    if (required as f64) / (fields.len() as f64) < 0.3 {
        out.push("必填字段比例较低，可能导致数据质量问题，建议增加必要的约束".to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common_fields::inject;
    use crate::schema::{ForeignKeyRef, NewEntity, NewField};

    fn entity() -> Entity {
        Entity::create(NewEntity::new("p-1", "user", "User", "admin")).unwrap()
    }

    fn fields_with(entity: &Entity, business: Vec<NewField>) -> Vec<Field> {
        inject(entity, business, "admin").unwrap()
    }

    #[test]
    fn test_valid_entity() {
        let e = entity();
        let fields = fields_with(
            &e,
            vec![NewField::new("username", "用户名", DataType::String).length(50).unique().required()],
        );
        let result = validate_entity_fields(&e, &fields, &[]);
        assert!(result.is_valid, "{:?}", result.errors);
        assert_eq!(result.summary.total_fields, 6);
        assert_eq!(result.summary.common_fields_count, 5);
        assert_eq!(result.summary.business_fields_count, 1);
    }

    #[test]
    fn test_string_requires_length() {
        let e = entity();
        let fields = fields_with(&e, vec![NewField::new("nickname", "昵称", DataType::String)]);
        let result = validate_entity_fields(&e, &fields, &[]);
        assert!(!result.is_valid);
        assert!(result.errors.iter().any(|i| i.rule == "LENGTH_REQUIRED"));
    }

    #[test]
    fn test_long_string_warns() {
        let e = entity();
        let fields = fields_with(&e, vec![NewField::new("bio", "简介", DataType::String).length(5000)]);
        let result = validate_entity_fields(&e, &fields, &[]);
        assert!(result.is_valid);
        assert!(result.warnings.iter().any(|i| i.rule == "LENGTH_TOO_LARGE"));
    }

    #[test]
    fn test_decimal_scale_and_precision() {
        let e = entity();
        let fields = fields_with(
            &e,
            vec![
                NewField::new("price", "价格", DataType::Decimal).precision(5, 7),
                NewField::new("total", "总额", DataType::Decimal).precision(40, 2),
                NewField::new("ratio", "比例", DataType::Decimal),
            ],
        );
        let result = validate_entity_fields(&e, &fields, &[]);
        let rules: Vec<_> = result.errors.iter().map(|i| i.rule).collect();
        assert!(rules.contains(&"SCALE_EXCEEDS_PRECISION"));
        assert!(rules.contains(&"PRECISION_TOO_LARGE"));
        assert!(rules.contains(&"PRECISION_REQUIRED"));
    }

    #[test]
    fn test_superfluous_attributes_warn() {
        let e = entity();
        let fields = fields_with(&e, vec![NewField::new("age", "年龄", DataType::Integer).length(10)]);
        let result = validate_entity_fields(&e, &fields, &[]);
        assert!(result.is_valid);
        assert!(result.warnings.iter().any(|i| i.message == "INTEGER类型字段不需要指定长度"));
    }

    #[test]
    fn test_default_value_checks() {
        let e = entity();
        let fields = fields_with(
            &e,
            vec![
                NewField::new("age", "年龄", DataType::Integer).default_value("ten"),
                NewField::new("active", "启用", DataType::Boolean).default_value("true"),
            ],
        );
        let result = validate_entity_fields(&e, &fields, &[]);
        assert_eq!(result.error_messages(), ["INTEGER类型字段的默认值必须是整数"]);
    }

    #[test]
    fn test_duplicate_code_and_primary_key() {
        let e = entity();
        let mut fields = fields_with(&e, vec![NewField::new("title", "标题", DataType::Text)]);
        let mut dup = fields[5].clone();
        dup.display_order = 7;
        dup.primary_key = true;
        fields.push(dup);

        let result = validate_entity_fields(&e, &fields, &[]);
        assert_eq!(
            result.errors.iter().filter(|i| i.rule == "DUPLICATE_CODE").count(),
            2
        );
        assert!(result.errors.iter().any(|i| i.rule == "PRIMARY_KEY"));
        assert!(result.warnings.iter().any(|i| i.rule == "DUPLICATE_NAME"));
    }

    #[test]
    fn test_codes_sharing_a_column() {
        let e = entity();
        let fields = fields_with(
            &e,
            vec![
                NewField::new("userName", "用户名", DataType::String).length(20),
                NewField::new("user_name", "用户名2", DataType::Integer),
            ],
        );
        let result = validate_entity_fields(&e, &fields, &[]);
        assert!(!result.is_valid);
        let clashing: Vec<&str> = result
            .errors
            .iter()
            .filter(|i| i.rule == "DUPLICATE_COLUMN")
            .map(|i| i.field_code.as_str())
            .collect();
        assert_eq!(clashing, ["userName", "user_name"]);
        assert!(result.error_messages().contains(&"字段代码映射到重复的列名: user_name"));
    }

    #[test]
    fn test_missing_common_field() {
        let e = entity();
        let mut fields = fields_with(&e, vec![]);
        fields.retain(|f| f.code != "createdAt");
        let result = validate_entity_fields(&e, &fields, &[]);
        assert!(result.error_messages().contains(&"缺少必需的通用字段: 创建时间"));
    }

    #[test]
    fn test_reserved_code() {
        let e = entity();
        let fields = fields_with(&e, vec![NewField::new("order", "顺序", DataType::Integer)]);
        let result = validate_entity_fields(&e, &fields, &[]);
        assert!(result.error_messages().contains(&"字段代码不能使用保留字: order"));
    }

    #[test]
    fn test_foreign_key_must_reference_known_entity() {
        let e = entity();
        let fields = fields_with(
            &e,
            vec![NewField::new("roleId", "角色", DataType::String)
                .length(36)
                .references(ForeignKeyRef::new("missing-entity", "id"))],
        );
        let result = validate_entity_fields(&e, &fields, &[]);
        assert!(result.errors.iter().any(|i| i.rule == "FOREIGN_KEY_ENTITY"));

        let role = Entity::create(NewEntity::new("p-1", "role", "Role", "admin")).unwrap();
        let fields = fields_with(
            &e,
            vec![NewField::new("roleId", "角色", DataType::String)
                .length(36)
                .references(ForeignKeyRef::new(role.id.clone(), "id"))],
        );
        let result = validate_entity_fields(&e, &fields, &[role]);
        assert!(result.is_valid, "{:?}", result.errors);
    }

    #[test]
    fn test_empty_entity() {
        let e = entity();
        let result = validate_entity_fields(&e, &[], &[]);
        assert!(result.error_messages().contains(&"实体必须至少包含一个字段"));
    }

    #[test]
    fn test_unique_limit_from_config() {
        let e = entity();
        let validator = FieldValidator::new(ValidationConfig {
            max_unique_fields: 1,
            ..Default::default()
        });
        let fields = fields_with(
            &e,
            vec![NewField::new("email", "邮箱", DataType::String).length(100).unique()],
        );
        let result = validator.validate_entity_fields(&e, &fields, &[]);
        assert!(result.warnings.iter().any(|i| i.rule == "UNIQUE_COUNT"));
    }
}
