//! 搜索匹配规则
//!
//! 查询词为单个自由文本，按原样（不去除首尾空白）做不区分大小写的子串匹配；
//! 空查询词匹配全部。

use crate::room::Room;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchTerm {
    raw: String,
    folded: String,
}

impl SearchTerm {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let folded = raw.to_lowercase();
        Self { raw, folded }
    }

    /// 请求中缺失的 `q` 参数等价于空查询。
    pub fn from_query(query: Option<String>) -> Self {
        query.map(Self::new).unwrap_or_default()
    }

    pub fn everything() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn matches(&self, haystack: &str) -> bool {
        self.is_empty() || haystack.to_lowercase().contains(&self.folded)
    }

    pub fn matches_any<'a>(&self, fields: impl IntoIterator<Item = &'a str>) -> bool {
        self.is_empty() || fields.into_iter().any(|field| self.matches(field))
    }

    /// 房间匹配：话题名、房间名、描述任意一项命中即可。
    pub fn matches_room(&self, room: &Room, topic_name: &str) -> bool {
        self.matches_any([topic_name, room.name.as_str(), room.description.as_str()])
    }
}
