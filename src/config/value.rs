use std::collections::BTreeMap;

use toml::Value;
use url::Url;

/// The typed result of resolving one declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedValue {
    /// No value was set and none was required.
    Absent,
    String(String),
    Integer(i64),
    Boolean(bool),
    Url(Url),
    IpList(Vec<String>),
    Object(BTreeMap<String, String>),
}

impl ResolvedValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            Self::Url(u) => Some(u.as_str()),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_url(&self) -> Option<&Url> {
        match self {
            Self::Url(u) => Some(u),
            _ => None,
        }
    }

    pub fn as_ip_list(&self) -> Option<&[String]> {
        match self {
            Self::IpList(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Converts to a TOML value for serde extraction. `Absent` has no TOML form.
    pub fn to_toml(&self) -> Option<Value> {
        let value = match self {
            Self::Absent => return None,
            Self::String(s) => Value::String(s.clone()),
            Self::Integer(i) => Value::Integer(*i),
            Self::Boolean(b) => Value::Boolean(*b),
            Self::Url(u) => Value::String(u.to_string()),
            Self::IpList(list) => Value::Array(list.iter().cloned().map(Value::String).collect()),
            Self::Object(map) => Value::Table(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect(),
            ),
        };
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        let url = ResolvedValue::Url(Url::parse("https://example.com").unwrap());
        assert_eq!(url.as_str(), Some("https://example.com/"));
        assert_eq!(url.as_url().unwrap().scheme(), "https");
        assert_eq!(url.as_i64(), None);

        assert_eq!(ResolvedValue::Integer(7).as_i64(), Some(7));
        assert_eq!(ResolvedValue::Boolean(true).as_bool(), Some(true));
        assert!(ResolvedValue::Absent.is_absent());
    }

    #[test]
    fn test_to_toml() {
        assert_eq!(ResolvedValue::Absent.to_toml(), None);
        assert_eq!(
            ResolvedValue::IpList(vec!["10.0.0.1".into()]).to_toml(),
            Some(Value::Array(vec![Value::String("10.0.0.1".into())]))
        );

        let object = ResolvedValue::Object(BTreeMap::from([("a".to_string(), "1".to_string())]));
        let table = object.to_toml().unwrap();
        assert_eq!(table["a"].as_str(), Some("1"));
    }
}
