//! The canonical value tree.

use std::collections::BTreeMap;

use serde_json::{Map, Number, Value};

/// How a scalar was typed before it was rendered to text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarKind {
    /// Free text.
    Text,
    /// Signed or unsigned integer.
    Integer,
    /// `true` / `false`.
    Boolean,
}

/// Whether a record field is part of the declared schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    /// Compared, printed and hashed.
    #[default]
    Public,
    /// Carried through to the control plane but never compared.
    Internal,
}

/// A labeled record field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Field label, as the control plane spells it.
    pub label: String,
    /// Field value.
    pub value: CanonicalValue,
    /// Schema visibility.
    pub visibility: Visibility,
}

/// A language-neutral specification tree.
///
/// Two trees can only be compared when they agree on shape at every path:
/// same variant, same scalar kind, same record labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanonicalValue {
    /// A leaf, compared by its rendered text.
    Scalar {
        /// Original type of the leaf.
        kind: ScalarKind,
        /// Rendered text.
        text: String,
    },
    /// Ordered list, compared positionally.
    Sequence(Vec<CanonicalValue>),
    /// String-keyed map with unique keys.
    Mapping(BTreeMap<String, CanonicalValue>),
    /// Present or absent value.
    Optional(Option<Box<CanonicalValue>>),
    /// Ordered set of labeled fields.
    Record(Vec<Field>),
}

/// Conversion of typed specifications into canonical trees.
pub trait ToCanonical {
    /// Builds the canonical tree for `self`.
    fn to_canonical(&self) -> CanonicalValue;
}

impl Field {
    /// A field that belongs to the declared schema.
    #[must_use]
    pub fn public(label: impl Into<String>, value: CanonicalValue) -> Self {
        Self {
            label: label.into(),
            value,
            visibility: Visibility::Public,
        }
    }

    /// A field the control plane owns; skipped when comparing.
    #[must_use]
    pub fn internal(label: impl Into<String>, value: CanonicalValue) -> Self {
        Self {
            label: label.into(),
            value,
            visibility: Visibility::Internal,
        }
    }

    /// Returns true if the field takes part in diffs.
    #[must_use]
    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Public
    }
}

impl CanonicalValue {
    /// A text scalar.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Scalar {
            kind: ScalarKind::Text,
            text: text.into(),
        }
    }

    /// An integer scalar.
    #[must_use]
    pub fn integer(value: impl Into<i128>) -> Self {
        Self::Scalar {
            kind: ScalarKind::Integer,
            text: value.into().to_string(),
        }
    }

    /// A boolean scalar.
    #[must_use]
    pub fn boolean(value: bool) -> Self {
        Self::Scalar {
            kind: ScalarKind::Boolean,
            text: value.to_string(),
        }
    }

    /// A sequence built from an iterator.
    #[must_use]
    pub fn sequence(items: impl IntoIterator<Item = Self>) -> Self {
        Self::Sequence(items.into_iter().collect())
    }

    /// A mapping built from key/value pairs. Later duplicates win.
    #[must_use]
    pub fn mapping<K: Into<String>>(entries: impl IntoIterator<Item = (K, Self)>) -> Self {
        Self::Mapping(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// An optional value.
    #[must_use]
    pub fn optional(value: Option<Self>) -> Self {
        Self::Optional(value.map(Box::new))
    }

    /// A record from its fields, in declaration order.
    #[must_use]
    pub const fn record(fields: Vec<Field>) -> Self {
        Self::Record(fields)
    }

    /// The zero value of this node's shape.
    ///
    /// Scalars become `""`, `"0"` or `"false"`, containers become empty,
    /// optionals become absent and records keep their labels with zeroed
    /// values.
    #[must_use]
    pub fn zero(&self) -> Self {
        match self {
            Self::Scalar { kind, .. } => Self::Scalar {
                kind: *kind,
                text: match kind {
                    ScalarKind::Text => String::new(),
                    ScalarKind::Integer => String::from("0"),
                    ScalarKind::Boolean => String::from("false"),
                },
            },
            Self::Sequence(_) => Self::Sequence(Vec::new()),
            Self::Mapping(_) => Self::Mapping(BTreeMap::new()),
            Self::Optional(_) => Self::Optional(None),
            Self::Record(fields) => Self::Record(
                fields
                    .iter()
                    .map(|f| Field {
                        label: f.label.clone(),
                        value: f.value.zero(),
                        visibility: f.visibility,
                    })
                    .collect(),
            ),
        }
    }

    /// Short description of the node's shape, used in mismatch errors.
    #[must_use]
    pub fn shape(&self) -> String {
        match self {
            Self::Scalar { kind, .. } => match kind {
                ScalarKind::Text => String::from("scalar(text)"),
                ScalarKind::Integer => String::from("scalar(integer)"),
                ScalarKind::Boolean => String::from("scalar(boolean)"),
            },
            Self::Sequence(_) => String::from("sequence"),
            Self::Mapping(_) => String::from("mapping"),
            Self::Optional(_) => String::from("optional"),
            Self::Record(fields) => {
                let labels: Vec<&str> = fields.iter().map(|f| f.label.as_str()).collect();
                format!("record{{{}}}", labels.join(","))
            }
        }
    }

    /// Returns the rendered text of a scalar.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Scalar { text, .. } => Some(text.as_str()),
            _ => None,
        }
    }

    /// Looks up a public or internal record field by label.
    #[must_use]
    pub fn get(&self, label: &str) -> Option<&Self> {
        match self {
            Self::Record(fields) => fields.iter().find(|f| f.label == label).map(|f| &f.value),
            Self::Optional(Some(inner)) => inner.get(label),
            _ => None,
        }
    }

    /// Converts the tree into the JSON the control plane accepts.
    ///
    /// Integers become numbers, booleans become bools, and record fields
    /// holding an absent optional are left out.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Scalar { kind, text } => match kind {
                ScalarKind::Text => Value::String(text.clone()),
                ScalarKind::Integer => text
                    .parse::<i64>()
                    .map(Number::from)
                    .or_else(|_| text.parse::<u64>().map(Number::from))
                    .map_or_else(|_| Value::String(text.clone()), Value::Number),
                ScalarKind::Boolean => Value::Bool(text == "true"),
            },
            Self::Sequence(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Mapping(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Self::Optional(inner) => inner.as_ref().map_or(Value::Null, |v| v.to_json()),
            Self::Record(fields) => {
                let mut object = Map::new();
                for field in fields {
                    if matches!(field.value, Self::Optional(None)) {
                        continue;
                    }
                    object.insert(field.label.clone(), field.value.to_json());
                }
                Value::Object(object)
            }
        }
    }
}

impl ToCanonical for String {
    fn to_canonical(&self) -> CanonicalValue {
        CanonicalValue::text(self.as_str())
    }
}

impl ToCanonical for u32 {
    fn to_canonical(&self) -> CanonicalValue {
        CanonicalValue::integer(*self)
    }
}

impl ToCanonical for u64 {
    fn to_canonical(&self) -> CanonicalValue {
        CanonicalValue::integer(*self)
    }
}

impl ToCanonical for bool {
    fn to_canonical(&self) -> CanonicalValue {
        CanonicalValue::boolean(*self)
    }
}

impl<T: ToCanonical> ToCanonical for Vec<T> {
    fn to_canonical(&self) -> CanonicalValue {
        CanonicalValue::sequence(self.iter().map(ToCanonical::to_canonical))
    }
}

impl<T: ToCanonical> ToCanonical for Option<T> {
    fn to_canonical(&self) -> CanonicalValue {
        CanonicalValue::optional(self.as_ref().map(ToCanonical::to_canonical))
    }
}

impl<T: ToCanonical> ToCanonical for BTreeMap<String, T> {
    fn to_canonical(&self) -> CanonicalValue {
        CanonicalValue::mapping(self.iter().map(|(k, v)| (k.as_str(), v.to_canonical())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn service() -> CanonicalValue {
        CanonicalValue::record(vec![
            Field::public("Name", CanonicalValue::text("app_web")),
            Field::public(
                "Mode",
                CanonicalValue::optional(Some(CanonicalValue::record(vec![Field::public(
                    "Replicas",
                    CanonicalValue::integer(2u64),
                )]))),
            ),
            Field::public("Env", CanonicalValue::sequence([CanonicalValue::text("A=1")])),
            Field::public("Endpoint", CanonicalValue::optional(None)),
            Field::internal("ForceUpdate", CanonicalValue::integer(3u64)),
        ])
    }

    #[test]
    fn test_zero_keeps_record_labels() {
        let zero = service().zero();
        assert_eq!(zero.shape(), service().shape());
        assert_eq!(zero.get("Name").and_then(CanonicalValue::as_text), Some(""));
        assert_eq!(zero.get("Mode"), Some(&CanonicalValue::Optional(None)));
        assert_eq!(zero.get("Env"), Some(&CanonicalValue::Sequence(vec![])));
        assert_eq!(
            zero.get("ForceUpdate").and_then(CanonicalValue::as_text),
            Some("0")
        );
        assert_eq!(CanonicalValue::boolean(true).zero().as_text(), Some("false"));
    }

    #[test]
    fn test_to_json() {
        assert_eq!(
            service().to_json(),
            json!({
                "Name": "app_web",
                "Mode": { "Replicas": 2 },
                "Env": ["A=1"],
                "ForceUpdate": 3
            })
        );
    }

    #[test]
    fn test_to_canonical_containers() {
        let mut labels = BTreeMap::new();
        labels.insert(String::from("b"), String::from("2"));
        labels.insert(String::from("a"), String::from("1"));
        let value = labels.to_canonical();
        let CanonicalValue::Mapping(entries) = value else {
            panic!("expected a mapping");
        };
        let keys: Vec<&String> = entries.keys().collect();
        assert_eq!(keys, ["a", "b"]);

        assert_eq!(None::<u32>.to_canonical(), CanonicalValue::Optional(None));
        assert_eq!(
            vec![8080u32].to_canonical(),
            CanonicalValue::Sequence(vec![CanonicalValue::integer(8080u32)])
        );
    }
}
