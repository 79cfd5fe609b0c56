//! JSON elements shared by raw and wrapped trees
//!
//! [`Element`] is the value type every variable holds. Objects and arrays are
//! shared handles ([`ObjectRef`], [`ArrayRef`]): cloning an element that holds
//! an object clones the handle, not the map, so a node that embeds its value
//! into an enclosing object keeps that object current by writing through the
//! same handle.
//!
//! Read accessors (`as_string`, `as_i64`, `is_number`, ...) resolve
//! [`Element::Lazy`] values first, so a `"{port}"` placeholder answers with
//! the type of the variable it refers to.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::{Map, Number, Value};

use crate::lazy::LazyElement;
use crate::path;
use crate::{Error, Result};

/// Insertion-ordered object storage.
pub type JsonMap = IndexMap<String, Element>;

/// Shared handle to a JSON object.
#[derive(Clone, Default)]
pub struct ObjectRef(Arc<RwLock<JsonMap>>);

/// Non-owning handle to a JSON object, used for mirror registrations.
#[derive(Clone)]
pub(crate) struct WeakObjectRef(Weak<RwLock<JsonMap>>);

impl ObjectRef {
    /// Create an empty object.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing map in a new handle.
    pub fn from_map(map: JsonMap) -> Self {
        Self(Arc::new(RwLock::new(map)))
    }

    pub fn get(&self, key: &str) -> Option<Element> {
        self.0.read().get(key).cloned()
    }

    /// Insert or replace a field, returning the previous value.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<Element>) -> Option<Element> {
        self.0.write().insert(key.into(), value.into())
    }

    /// Remove a field, keeping the order of the remaining ones.
    pub fn remove(&self, key: &str) -> Option<Element> {
        self.0.write().shift_remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.read().contains_key(key)
    }

    /// Find a key case-insensitively, returning its stored spelling.
    pub fn find_key(&self, key: &str) -> Option<String> {
        let map = self.0.read();
        if map.contains_key(key) {
            return Some(key.to_string());
        }
        let folded = path::fold(key);
        map.keys().find(|k| path::fold(k) == folded).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.0.read().keys().cloned().collect()
    }

    /// Snapshot of all fields in insertion order.
    pub fn entries(&self) -> Vec<(String, Element)> {
        self.0
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }

    /// Whether both handles point at the same object.
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn downgrade(&self) -> WeakObjectRef {
        WeakObjectRef(Arc::downgrade(&self.0))
    }
}

impl WeakObjectRef {
    pub(crate) fn upgrade(&self) -> Option<ObjectRef> {
        self.0.upgrade().map(ObjectRef)
    }

    pub(crate) fn points_to(&self, object: &ObjectRef) -> bool {
        std::ptr::eq(self.0.as_ptr(), Arc::as_ptr(&object.0))
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.read().iter()).finish()
    }
}

impl fmt::Debug for WeakObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upgrade() {
            Some(object) => write!(f, "WeakObjectRef({} keys)", object.len()),
            None => write!(f, "WeakObjectRef(dropped)"),
        }
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || *self.0.read() == *other.0.read()
    }
}

impl From<JsonMap> for ObjectRef {
    fn from(map: JsonMap) -> Self {
        Self::from_map(map)
    }
}

/// Shared handle to a JSON array.
#[derive(Clone, Default)]
pub struct ArrayRef(Arc<RwLock<Vec<Element>>>);

impl ArrayRef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_vec(items: Vec<Element>) -> Self {
        Self(Arc::new(RwLock::new(items)))
    }

    pub fn get(&self, index: usize) -> Option<Element> {
        self.0.read().get(index).cloned()
    }

    pub fn push(&self, value: impl Into<Element>) {
        self.0.write().push(value.into());
    }

    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }

    /// Snapshot of the elements.
    pub fn to_vec(&self) -> Vec<Element> {
        self.0.read().clone()
    }

    pub fn ptr_eq(&self, other: &ArrayRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ArrayRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.read().iter()).finish()
    }
}

impl PartialEq for ArrayRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || *self.0.read() == *other.0.read()
    }
}

impl From<Vec<Element>> for ArrayRef {
    fn from(items: Vec<Element>) -> Self {
        Self::from_vec(items)
    }
}

/// The kind of a resolved element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
}

impl ElementKind {
    pub fn name(self) -> &'static str {
        match self {
            ElementKind::Null => "null",
            ElementKind::Bool => "bool",
            ElementKind::Number => "number",
            ElementKind::String => "string",
            ElementKind::Array => "array",
            ElementKind::Object => "object",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A JSON value, possibly wrapped for lazy placeholder resolution.
#[derive(Clone, Debug, Default)]
pub enum Element {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(ArrayRef),
    Object(ObjectRef),
    /// A value whose `{name}` placeholders resolve on every read
    Lazy(LazyElement),
}

impl Element {
    /// An empty object.
    pub fn object() -> Self {
        Element::Object(ObjectRef::new())
    }

    /// An empty array.
    pub fn array() -> Self {
        Element::Array(ArrayRef::new())
    }

    pub fn is_lazy(&self) -> bool {
        matches!(self, Element::Lazy(_))
    }

    /// The element itself, or the delegate of a lazy element.
    fn peel(&self) -> &Element {
        match self {
            Element::Lazy(lazy) => lazy.delegate(),
            other => other,
        }
    }

    /// Kind of the element without resolving placeholders.
    pub fn raw_kind(&self) -> ElementKind {
        match self.peel() {
            Element::Null => ElementKind::Null,
            Element::Bool(_) => ElementKind::Bool,
            Element::Number(_) => ElementKind::Number,
            Element::String(_) => ElementKind::String,
            Element::Array(_) => ElementKind::Array,
            Element::Object(_) => ElementKind::Object,
            Element::Lazy(lazy) => lazy.delegate().raw_kind(),
        }
    }

    /// Strip the outer lazy layer, if any. Nested fields keep theirs.
    pub fn unwrapped(&self) -> Element {
        self.peel().clone()
    }

    /// Deep copy into fresh handles with every lazy layer removed.
    pub fn detached(&self) -> Element {
        match self.peel() {
            Element::Object(object) => Element::Object(ObjectRef::from_map(
                object
                    .entries()
                    .into_iter()
                    .map(|(k, v)| (k, v.detached()))
                    .collect(),
            )),
            Element::Array(array) => Element::Array(ArrayRef::from_vec(
                array.to_vec().iter().map(Element::detached).collect(),
            )),
            primitive => primitive.clone(),
        }
    }

    /// The object a node holding this value links its children into.
    pub(crate) fn live_object(&self) -> Option<ObjectRef> {
        match self.peel() {
            Element::Object(object) => Some(object.clone()),
            _ => None,
        }
    }

    /// Resolve placeholders one level deep. The result is never lazy.
    pub fn resolved(&self) -> Result<Element> {
        match self {
            Element::Lazy(lazy) => lazy.resolve(),
            other => Ok(other.clone()),
        }
    }

    /// Kind of the element after placeholder resolution.
    pub fn kind(&self) -> Result<ElementKind> {
        Ok(self.resolved()?.raw_kind())
    }

    /// Whether the element resolves to `null`.
    ///
    /// The `is_*` predicates answer `false` when resolution fails, so a
    /// value caught in a reference cycle matches none of them. Use
    /// [`kind`](Self::kind) to see the error.
    pub fn is_null(&self) -> bool {
        matches!(self.kind(), Ok(ElementKind::Null))
    }

    pub fn is_bool(&self) -> bool {
        matches!(self.kind(), Ok(ElementKind::Bool))
    }

    pub fn is_number(&self) -> bool {
        matches!(self.kind(), Ok(ElementKind::Number))
    }

    pub fn is_string(&self) -> bool {
        matches!(self.kind(), Ok(ElementKind::String))
    }

    pub fn is_array(&self) -> bool {
        matches!(self.kind(), Ok(ElementKind::Array))
    }

    pub fn is_object(&self) -> bool {
        matches!(self.kind(), Ok(ElementKind::Object))
    }

    fn mismatch(&self, expected: &'static str) -> Error {
        Error::TypeMismatch {
            expected,
            found: self.raw_kind().name(),
        }
    }

    /// String form of a resolved primitive.
    pub fn as_string(&self) -> Result<String> {
        match self.resolved()? {
            Element::String(text) => Ok(text),
            Element::Number(number) => Ok(number.to_string()),
            Element::Bool(flag) => Ok(flag.to_string()),
            other => Err(other.mismatch("string")),
        }
    }

    /// Integer value. Whole-number floats and strings holding an integer
    /// literal are accepted.
    pub fn as_i64(&self) -> Result<i64> {
        let value = self.resolved()?;
        let parsed = match &value {
            Element::Number(number) => number.as_i64().or_else(|| {
                whole(number)
                    .filter(|f| *f >= i64::MIN as f64 && *f < i64::MAX as f64)
                    .map(|f| f as i64)
            }),
            Element::String(text) => text.trim().parse().ok(),
            _ => None,
        };
        parsed.ok_or_else(|| value.mismatch("integer"))
    }

    pub fn as_u64(&self) -> Result<u64> {
        let value = self.resolved()?;
        let parsed = match &value {
            Element::Number(number) => number.as_u64().or_else(|| {
                whole(number)
                    .filter(|f| *f >= 0.0 && *f < u64::MAX as f64)
                    .map(|f| f as u64)
            }),
            Element::String(text) => text.trim().parse().ok(),
            _ => None,
        };
        parsed.ok_or_else(|| value.mismatch("unsigned integer"))
    }

    pub fn as_f64(&self) -> Result<f64> {
        let value = self.resolved()?;
        let parsed = match &value {
            Element::Number(number) => number.as_f64(),
            Element::String(text) => text.trim().parse().ok(),
            _ => None,
        };
        parsed.ok_or_else(|| value.mismatch("number"))
    }

    /// Boolean value. Strings `true`/`false` (any case) are accepted.
    pub fn as_bool(&self) -> Result<bool> {
        let value = self.resolved()?;
        let parsed = match &value {
            Element::Bool(flag) => Some(*flag),
            Element::String(text) if text.eq_ignore_ascii_case("true") => Some(true),
            Element::String(text) if text.eq_ignore_ascii_case("false") => Some(false),
            _ => None,
        };
        parsed.ok_or_else(|| value.mismatch("bool"))
    }

    pub fn as_object(&self) -> Result<ObjectRef> {
        match self.resolved()? {
            Element::Object(object) => Ok(object),
            other => Err(other.mismatch("object")),
        }
    }

    pub fn as_array(&self) -> Result<ArrayRef> {
        match self.resolved()? {
            Element::Array(array) => Ok(array),
            other => Err(other.mismatch("array")),
        }
    }

    /// Field of a resolved object.
    pub fn get(&self, key: &str) -> Result<Option<Element>> {
        Ok(self.as_object()?.get(key))
    }

    /// Element of a resolved array.
    pub fn at(&self, index: usize) -> Result<Option<Element>> {
        Ok(self.as_array()?.get(index))
    }

    /// Fully resolved JSON value of the whole tree.
    pub fn to_value(&self) -> Result<Value> {
        self.to_value_in(&mut Vec::new())
    }

    pub(crate) fn to_value_in(&self, chain: &mut Vec<String>) -> Result<Value> {
        match self {
            Element::Lazy(lazy) => {
                lazy.resolve_with(chain, &mut |value, chain| value.to_value_in(chain))
            }
            Element::Object(object) => {
                let mut map = Map::new();
                for (key, value) in object.entries() {
                    map.insert(key, value.to_value_in(chain)?);
                }
                Ok(Value::Object(map))
            }
            Element::Array(array) => {
                let mut items = Vec::with_capacity(array.len());
                for value in array.to_vec() {
                    items.push(value.to_value_in(chain)?);
                }
                Ok(Value::Array(items))
            }
            Element::Null => Ok(Value::Null),
            Element::Bool(flag) => Ok(Value::Bool(*flag)),
            Element::Number(number) => Ok(Value::Number(number.clone())),
            Element::String(text) => Ok(Value::String(text.clone())),
        }
    }

    /// JSON value of the tree as stored, placeholders left in place.
    pub fn raw_value(&self) -> Value {
        match self.peel() {
            Element::Object(object) => Value::Object(
                object
                    .entries()
                    .into_iter()
                    .map(|(k, v)| (k, v.raw_value()))
                    .collect(),
            ),
            Element::Array(array) => {
                Value::Array(array.to_vec().iter().map(Element::raw_value).collect())
            }
            Element::Null => Value::Null,
            Element::Bool(flag) => Value::Bool(*flag),
            Element::Number(number) => Value::Number(number.clone()),
            Element::String(text) => Value::String(text.clone()),
            Element::Lazy(lazy) => lazy.delegate().raw_value(),
        }
    }
}

/// A float without a fractional part.
fn whole(number: &Number) -> Option<f64> {
    number.as_f64().filter(|f| f.fract() == 0.0)
}

impl PartialEq for Element {
    /// Structural equality of the stored values; lazy layers are ignored
    /// and placeholders are compared as written.
    fn eq(&self, other: &Self) -> bool {
        match (self.peel(), other.peel()) {
            (Element::Null, Element::Null) => true,
            (Element::Bool(a), Element::Bool(b)) => a == b,
            (Element::Number(a), Element::Number(b)) => a == b,
            (Element::String(a), Element::String(b)) => a == b,
            (Element::Array(a), Element::Array(b)) => a == b,
            (Element::Object(a), Element::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialEq<Value> for Element {
    fn eq(&self, other: &Value) -> bool {
        self.raw_value() == *other
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw_value())
    }
}

impl FromStr for Element {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(s)?;
        Ok(value.into())
    }
}

impl From<Value> for Element {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Element::Null,
            Value::Bool(flag) => Element::Bool(flag),
            Value::Number(number) => Element::Number(number),
            Value::String(text) => Element::String(text),
            Value::Array(items) => Element::Array(ArrayRef::from_vec(
                items.into_iter().map(Element::from).collect(),
            )),
            Value::Object(map) => Element::Object(ObjectRef::from_map(
                map.into_iter().map(|(k, v)| (k, Element::from(v))).collect(),
            )),
        }
    }
}

impl From<&Value> for Element {
    fn from(value: &Value) -> Self {
        value.clone().into()
    }
}

impl From<&str> for Element {
    fn from(text: &str) -> Self {
        Element::String(text.to_string())
    }
}

impl From<String> for Element {
    fn from(text: String) -> Self {
        Element::String(text)
    }
}

impl From<bool> for Element {
    fn from(flag: bool) -> Self {
        Element::Bool(flag)
    }
}

impl From<i32> for Element {
    fn from(number: i32) -> Self {
        Element::Number(number.into())
    }
}

impl From<i64> for Element {
    fn from(number: i64) -> Self {
        Element::Number(number.into())
    }
}

impl From<u64> for Element {
    fn from(number: u64) -> Self {
        Element::Number(number.into())
    }
}

impl From<f64> for Element {
    /// Non-finite numbers have no JSON form and become `null`.
    fn from(number: f64) -> Self {
        Number::from_f64(number).map_or(Element::Null, Element::Number)
    }
}

impl From<ObjectRef> for Element {
    fn from(object: ObjectRef) -> Self {
        Element::Object(object)
    }
}

impl From<ArrayRef> for Element {
    fn from(array: ArrayRef) -> Self {
        Element::Array(array)
    }
}

impl From<LazyElement> for Element {
    fn from(lazy: LazyElement) -> Self {
        Element::Lazy(lazy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value_preserves_structure() {
        let element = Element::from(json!({"a": [1, "two", null], "b": {"c": true}}));
        assert_eq!(element, json!({"a": [1, "two", null], "b": {"c": true}}));
        assert_eq!(element.raw_kind(), ElementKind::Object);
    }

    #[test]
    fn test_clone_shares_object_handle() {
        let element = Element::from(json!({"a": 1}));
        let copy = element.clone();
        element.as_object().unwrap().insert("b", 2);
        assert_eq!(copy, json!({"a": 1, "b": 2}));
    }

    #[test]
    fn test_detached_copy_is_independent() {
        let element = Element::from(json!({"a": {"b": 1}}));
        let copy = element.detached();
        element
            .get("a")
            .unwrap()
            .unwrap()
            .as_object()
            .unwrap()
            .insert("b", 2);
        assert_eq!(copy, json!({"a": {"b": 1}}));
    }

    #[test]
    fn test_find_key_is_case_insensitive() {
        let object = ObjectRef::new();
        object.insert("Host", "localhost");
        assert_eq!(object.find_key("host"), Some("Host".to_string()));
        assert_eq!(object.find_key("Host"), Some("Host".to_string()));
        assert_eq!(object.find_key("port"), None);
    }

    #[test]
    fn test_remove_keeps_field_order() {
        let object = ObjectRef::new();
        object.insert("a", 1);
        object.insert("b", 2);
        object.insert("c", 3);
        object.remove("b");
        assert_eq!(object.keys(), vec!["a", "c"]);
    }

    #[test]
    fn test_lenient_primitive_accessors() {
        assert_eq!(Element::from("42").as_i64().unwrap(), 42);
        assert_eq!(Element::from(" 7 ").as_u64().unwrap(), 7);
        assert_eq!(Element::from("1.5").as_f64().unwrap(), 1.5);
        assert!(Element::from("TRUE").as_bool().unwrap());
        assert_eq!(Element::from(3).as_string().unwrap(), "3");
        assert_eq!(Element::from(false).as_string().unwrap(), "false");
    }

    #[test]
    fn test_whole_floats_are_integers() {
        assert_eq!(Element::from(42.0).as_i64().unwrap(), 42);
        assert_eq!(Element::from(-3.0).as_i64().unwrap(), -3);
        assert_eq!(Element::from(42.0).as_u64().unwrap(), 42);
        assert!(Element::from(42.5).as_i64().is_err());
        assert!(Element::from(-1.0).as_u64().is_err());
        assert!(Element::from(1e300).as_i64().is_err());
    }

    #[test]
    fn test_array_handle_is_shared() {
        let array = ArrayRef::new();
        let element = Element::from(array.clone());
        array.push("x");
        assert_eq!(element.at(0).unwrap(), Some(Element::from("x")));
        assert_eq!(element.at(1).unwrap(), None);
    }

    #[test]
    fn test_type_mismatch_reports_kinds() {
        let err = Element::from(json!({"a": 1})).as_i64().unwrap_err();
        match err {
            Error::TypeMismatch { expected, found } => {
                assert_eq!(expected, "integer");
                assert_eq!(found, "object");
            }
            other => panic!("expected TypeMismatch, got {:?}", other),
        }
        assert!(Element::Null.as_string().is_err());
        assert!(Element::from("yes").as_bool().is_err());
    }

    #[test]
    fn test_non_finite_float_becomes_null() {
        assert_eq!(Element::from(f64::NAN), Element::Null);
    }

    #[test]
    fn test_from_str_parses_json() {
        let element: Element = r#"{"port": 8080}"#.parse().unwrap();
        assert_eq!(element.get("port").unwrap().unwrap().as_i64().unwrap(), 8080);
        assert!("{not json".parse::<Element>().is_err());
    }

    #[test]
    fn test_display_is_compact_json() {
        let element = Element::from(json!({"a": [1, 2]}));
        assert_eq!(element.to_string(), r#"{"a":[1,2]}"#);
    }
}
