use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct WindowId(pub u64);

impl Display for WindowId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "window:{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct TabId(pub u64);

impl Display for TabId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "tab:{}", self.0)
    }
}

/// Tab group identifier as reported by the provider.
///
/// Providers use `-1` for "no group"; any id `<= 0` is treated as a
/// non-group sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct GroupId(pub i64);

impl GroupId {
    pub const NONE: GroupId = GroupId(-1);

    pub fn is_real(self) -> bool {
        self.0 > 0
    }

    pub fn real(group_id: Option<GroupId>) -> Option<GroupId> {
        group_id.filter(|id| id.is_real())
    }
}

impl Display for GroupId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "group:{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArchiveEntryId(pub u64);

impl Display for ArchiveEntryId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "archive:{}", self.0)
    }
}

/// Ids arrive as JSON numbers in values and as strings when they key a map.
#[derive(Deserialize)]
#[serde(untagged)]
enum NumericId {
    Number(i64),
    Text(String),
}

fn numeric_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    match NumericId::deserialize(deserializer)? {
        NumericId::Number(value) => Ok(value),
        NumericId::Text(text) => text.trim().parse().map_err(D::Error::custom),
    }
}

fn unsigned_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let value = numeric_id(deserializer)?;
    u64::try_from(value).map_err(|_| D::Error::custom(format!("id {value} is negative")))
}

impl<'de> Deserialize<'de> for WindowId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        unsigned_id(deserializer).map(Self)
    }
}

impl<'de> Deserialize<'de> for TabId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        unsigned_id(deserializer).map(Self)
    }
}

impl<'de> Deserialize<'de> for GroupId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        numeric_id(deserializer).map(Self)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::json;

    use super::*;

    #[test]
    fn ids_accept_numbers_and_numeric_strings() {
        let window: WindowId = serde_json::from_value(json!(5)).expect("number should parse");
        let group: GroupId = serde_json::from_value(json!("-1")).expect("string should parse");
        assert_eq!(window, WindowId(5));
        assert_eq!(group, GroupId::NONE);
        assert!(serde_json::from_value::<TabId>(json!(-3)).is_err());

        let names: BTreeMap<WindowId, String> =
            serde_json::from_value(json!({"7": "Work"})).expect("map keys should parse");
        assert_eq!(names.get(&WindowId(7)).map(String::as_str), Some("Work"));
    }

    #[test]
    fn only_positive_group_ids_are_real() {
        assert!(GroupId(3).is_real());
        assert!(!GroupId(0).is_real());
        assert_eq!(GroupId::real(Some(GroupId::NONE)), None);
    }
}
