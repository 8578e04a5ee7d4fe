// ==========================================
// 商品目录同步 - 单元格编辑校验器
// ==========================================
// 职责: 展示层单元格编辑的字段级校验与类型转换
// 规则: SKU 非空且仅含字母/数字/-/_；价格 ≥ 0；数量 ≥ 0；名称非空
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::{ProductNode, ProductStatus};
use serde::{Deserialize, Serialize};

/// 校验通过的编辑值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldEdit {
    Sku(String),
    Name(String),
    Price(f64),
    Quantity(u32),
    Status(ProductStatus),
    /// 其他列写入扩展属性
    Attribute { key: String, value: String },
}

impl FieldEdit {
    /// 将编辑应用到节点（不含子节点）
    pub fn apply_to(self, node: &mut ProductNode) {
        match self {
            FieldEdit::Sku(v) => node.sku = v,
            FieldEdit::Name(v) => node.name = v,
            FieldEdit::Price(v) => node.price = v,
            FieldEdit::Quantity(v) => node.quantity = v,
            FieldEdit::Status(v) => node.status = v,
            FieldEdit::Attribute { key, value } => {
                node.attributes.insert(key, value);
            }
        }
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ApiError {
    ApiError::FieldValidationError {
        field: field.to_string(),
        reason: reason.into(),
    }
}

/// 校验单元格编辑
///
/// # 参数
/// - field: 列名（sku / name / price / qty / quantity / status / 其他属性键）
/// - value: 编辑后的原始文本
///
/// # 返回
/// - Ok(FieldEdit): 类型化的编辑值
/// - Err(FieldValidationError): 校验失败原因
pub fn validate_field_edit(field: &str, value: &str) -> ApiResult<FieldEdit> {
    let field = field.trim();
    let value = value.trim();

    match field {
        "sku" => {
            if value.is_empty() {
                return Err(invalid(field, "SKU 不能为空"));
            }
            if !value
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
            {
                return Err(invalid(field, "SKU 只能包含字母、数字、连字符和下划线"));
            }
            Ok(FieldEdit::Sku(value.to_string()))
        }
        "name" => {
            if value.is_empty() {
                return Err(invalid(field, "商品名称不能为空"));
            }
            Ok(FieldEdit::Name(value.to_string()))
        }
        "price" => match value.parse::<f64>() {
            Ok(price) if price.is_finite() && price >= 0.0 => Ok(FieldEdit::Price(price)),
            Ok(_) => Err(invalid(field, "价格必须为非负数")),
            Err(_) => Err(invalid(field, format!("价格不是有效数字: {}", value))),
        },
        "qty" | "quantity" => match value.parse::<i64>() {
            Ok(qty) if qty < 0 => Err(invalid(field, "数量必须为非负整数")),
            Ok(qty) => u32::try_from(qty)
                .map(FieldEdit::Quantity)
                .map_err(|_| invalid(field, "数量超出范围")),
            Err(_) => Err(invalid(field, format!("数量不是有效整数: {}", value))),
        },
        "status" => Ok(FieldEdit::Status(ProductStatus::parse(value))),
        "" => Err(ApiError::InvalidInput("列名不能为空".to_string())),
        key => Ok(FieldEdit::Attribute {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}
