use serde_json::Value;

/// 本地通知描述符：名称 + 载荷
///
/// 由实体在状态变更时排队，仓储在持久化成功后按入队顺序发布；
/// 通知本身不持久化。
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    /// 通知名称（观察者按名称匹配）
    pub name: String,
    /// 通知载荷
    pub payload: Value,
}

impl Notification {
    pub fn new(name: impl Into<String>, payload: Value) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }
}
