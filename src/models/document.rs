use std::fmt::Display;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// 页面上抓到的原始链接（由 JS 返回）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLink {
    pub href: String,
    #[serde(default)]
    pub text: String,
}

impl RawLink {
    pub fn new(href: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            text: text.into(),
        }
    }
}

/// 待导出的文档引用
///
/// `identifier` 是去重键，由 `locator` 推导而来；标题不同但标识相同的
/// 两个引用视为同一文档，因此相等性和哈希只看 `identifier`。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentReference {
    pub identifier: String,
    pub locator: String,
    pub label: String,
}

impl DocumentReference {
    pub fn new(
        identifier: impl Into<String>,
        locator: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            locator: locator.into(),
            label: label.into(),
        }
    }
}

impl PartialEq for DocumentReference {
    fn eq(&self, other: &Self) -> bool {
        self.identifier == other.identifier
    }
}

impl Eq for DocumentReference {}

impl Hash for DocumentReference {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identifier.hash(state);
    }
}

impl Display for DocumentReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[文档 #{}] {}", self.identifier, self.label)
    }
}
