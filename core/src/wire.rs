//! JSON codec that applies a `NamingConvention` to struct field names.
//!
//! # Design
//! Serde hands the field identifiers of a struct to the (de)serializer:
//! `serialize_field` receives each key, `deserialize_struct` receives the full
//! list. Wrapping `serde_json::Value` in a serializer and a deserializer that
//! use those names lets one runtime convention govern both directions without
//! per-type `rename_all` attributes. Map keys are data and pass through
//! untouched. Externally tagged enums are decoded here as well, so fields of
//! struct variants and of structs inside newtype or tuple variants follow the
//! convention in both directions.
//!
//! Untagged and internally tagged enums are buffered by serde before the
//! variant is known, so no field list reaches this deserializer. Their
//! payloads are matched against the wire names as written; such types need
//! their own `rename_all` that agrees with the convention.

use serde::de::value::{MapDeserializer, SeqDeserializer};
use serde::de::{self, DeserializeOwned, IntoDeserializer, Visitor};
use serde::ser::{self, Serialize};
use serde::{forward_to_deserialize_any, Deserializer as _, Serializer as _};
use serde_json::{Map, Value};

use crate::naming::NamingConvention;

type Result<T> = std::result::Result<T, serde_json::Error>;

/// Serialize `value` to a JSON value, renaming struct fields per `naming`.
pub fn to_value<T: Serialize + ?Sized>(value: &T, naming: NamingConvention) -> Result<Value> {
    value.serialize(WireSerializer { naming })
}

/// Decode `value` into `T`, routing wire keys to fields per `naming`.
pub fn from_value<T: DeserializeOwned>(value: Value, naming: NamingConvention) -> Result<T> {
    T::deserialize(WireDeserializer { value, naming })
}

/// Serialize a request body. `None` when the value has no JSON content.
pub fn encode_body<T: Serialize + ?Sized>(value: &T, naming: NamingConvention) -> Result<Option<String>> {
    match to_value(value, naming)? {
        Value::Null => Ok(None),
        other => serde_json::to_string(&other).map(Some),
    }
}

/// Decode a body holding zero or more whitespace-separated JSON documents.
///
/// Every document is decoded as `T` and the last one wins; a literal `null`
/// document resets the result to `None`. Empty input yields `None`.
pub fn decode_documents<T: DeserializeOwned>(bytes: &[u8], naming: NamingConvention) -> Result<Option<T>> {
    let mut result = None;
    for document in serde_json::Deserializer::from_slice(bytes).into_iter::<Value>() {
        result = match document? {
            Value::Null => None,
            value => Some(from_value(value, naming)?),
        };
    }
    Ok(result)
}

// ---------------------------------------------------------------------------
// Serializer
// ---------------------------------------------------------------------------

struct WireSerializer {
    naming: NamingConvention,
}

impl ser::Serializer for WireSerializer {
    type Ok = Value;
    type Error = serde_json::Error;

    type SerializeSeq = SerializeVec;
    type SerializeTuple = SerializeVec;
    type SerializeTupleStruct = SerializeVec;
    type SerializeTupleVariant = SerializeTupleVariant;
    type SerializeMap = SerializeObject;
    type SerializeStruct = SerializeObject;
    type SerializeStructVariant = SerializeStructVariant;

    fn serialize_bool(self, v: bool) -> Result<Value> {
        Ok(Value::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<Value> {
        Ok(Value::from(v))
    }

    fn serialize_i16(self, v: i16) -> Result<Value> {
        Ok(Value::from(v))
    }

    fn serialize_i32(self, v: i32) -> Result<Value> {
        Ok(Value::from(v))
    }

    fn serialize_i64(self, v: i64) -> Result<Value> {
        Ok(Value::from(v))
    }

    fn serialize_i128(self, v: i128) -> Result<Value> {
        ser::Serializer::serialize_i128(serde_json::value::Serializer, v)
    }

    fn serialize_u8(self, v: u8) -> Result<Value> {
        Ok(Value::from(v))
    }

    fn serialize_u16(self, v: u16) -> Result<Value> {
        Ok(Value::from(v))
    }

    fn serialize_u32(self, v: u32) -> Result<Value> {
        Ok(Value::from(v))
    }

    fn serialize_u64(self, v: u64) -> Result<Value> {
        Ok(Value::from(v))
    }

    fn serialize_u128(self, v: u128) -> Result<Value> {
        ser::Serializer::serialize_u128(serde_json::value::Serializer, v)
    }

    fn serialize_f32(self, v: f32) -> Result<Value> {
        Ok(Value::from(v))
    }

    fn serialize_f64(self, v: f64) -> Result<Value> {
        Ok(Value::from(v))
    }

    fn serialize_char(self, v: char) -> Result<Value> {
        Ok(Value::String(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<Value> {
        Ok(Value::String(v.to_owned()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Value> {
        Ok(Value::Array(v.iter().map(|b| Value::from(*b)).collect()))
    }

    fn serialize_none(self) -> Result<Value> {
        Ok(Value::Null)
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<Value> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Value> {
        Ok(Value::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Value> {
        Ok(Value::Null)
    }

    fn serialize_unit_variant(self, _name: &'static str, _index: u32, variant: &'static str) -> Result<Value> {
        Ok(Value::String(variant.to_owned()))
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(self, _name: &'static str, value: &T) -> Result<Value> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Value> {
        let mut map = Map::new();
        map.insert(variant.to_owned(), value.serialize(self)?);
        Ok(Value::Object(map))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SerializeVec> {
        Ok(SerializeVec {
            naming: self.naming,
            items: Vec::with_capacity(len.unwrap_or(0)),
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<SerializeVec> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(self, _name: &'static str, len: usize) -> Result<SerializeVec> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<SerializeTupleVariant> {
        Ok(SerializeTupleVariant {
            variant: variant.to_owned(),
            inner: SerializeVec {
                naming: self.naming,
                items: Vec::with_capacity(len),
            },
        })
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<SerializeObject> {
        Ok(SerializeObject {
            naming: self.naming,
            map: Map::new(),
            next_key: None,
        })
    }

    fn serialize_struct(self, _name: &'static str, len: usize) -> Result<SerializeObject> {
        self.serialize_map(Some(len))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<SerializeStructVariant> {
        Ok(SerializeStructVariant {
            variant: variant.to_owned(),
            inner: SerializeObject {
                naming: self.naming,
                map: Map::new(),
                next_key: None,
            },
        })
    }
}

struct SerializeVec {
    naming: NamingConvention,
    items: Vec<Value>,
}

impl SerializeVec {
    fn push<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.items.push(to_value(value, self.naming)?);
        Ok(())
    }
}

impl ser::SerializeSeq for SerializeVec {
    type Ok = Value;
    type Error = serde_json::Error;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.push(value)
    }

    fn end(self) -> Result<Value> {
        Ok(Value::Array(self.items))
    }
}

impl ser::SerializeTuple for SerializeVec {
    type Ok = Value;
    type Error = serde_json::Error;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.push(value)
    }

    fn end(self) -> Result<Value> {
        Ok(Value::Array(self.items))
    }
}

impl ser::SerializeTupleStruct for SerializeVec {
    type Ok = Value;
    type Error = serde_json::Error;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.push(value)
    }

    fn end(self) -> Result<Value> {
        Ok(Value::Array(self.items))
    }
}

struct SerializeTupleVariant {
    variant: String,
    inner: SerializeVec,
}

impl ser::SerializeTupleVariant for SerializeTupleVariant {
    type Ok = Value;
    type Error = serde_json::Error;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.inner.push(value)
    }

    fn end(self) -> Result<Value> {
        let mut map = Map::new();
        map.insert(self.variant, Value::Array(self.inner.items));
        Ok(Value::Object(map))
    }
}

struct SerializeObject {
    naming: NamingConvention,
    map: Map<String, Value>,
    next_key: Option<String>,
}

impl SerializeObject {
    fn insert_field<T: ?Sized + Serialize>(&mut self, key: &'static str, value: &T) -> Result<()> {
        let name = self.naming.apply(key).into_owned();
        self.map.insert(name, to_value(value, self.naming)?);
        Ok(())
    }
}

impl ser::SerializeMap for SerializeObject {
    type Ok = Value;
    type Error = serde_json::Error;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Result<()> {
        let key = match to_value(key, self.naming)? {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => return Err(ser::Error::custom("key must be a string")),
        };
        self.next_key = Some(key);
        Ok(())
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        let key = self
            .next_key
            .take()
            .ok_or_else(|| <serde_json::Error as ser::Error>::custom("serialize_value called before serialize_key"))?;
        self.map.insert(key, to_value(value, self.naming)?);
        Ok(())
    }

    fn end(self) -> Result<Value> {
        Ok(Value::Object(self.map))
    }
}

impl ser::SerializeStruct for SerializeObject {
    type Ok = Value;
    type Error = serde_json::Error;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, key: &'static str, value: &T) -> Result<()> {
        self.insert_field(key, value)
    }

    fn end(self) -> Result<Value> {
        Ok(Value::Object(self.map))
    }
}

struct SerializeStructVariant {
    variant: String,
    inner: SerializeObject,
}

impl ser::SerializeStructVariant for SerializeStructVariant {
    type Ok = Value;
    type Error = serde_json::Error;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, key: &'static str, value: &T) -> Result<()> {
        self.inner.insert_field(key, value)
    }

    fn end(self) -> Result<Value> {
        let mut map = Map::new();
        map.insert(self.variant, Value::Object(self.inner.map));
        Ok(Value::Object(map))
    }
}

// ---------------------------------------------------------------------------
// Deserializer
// ---------------------------------------------------------------------------

struct WireDeserializer {
    value: Value,
    naming: NamingConvention,
}

impl WireDeserializer {
    fn wrap(value: Value, naming: NamingConvention) -> Self {
        Self { value, naming }
    }
}

impl<'de> IntoDeserializer<'de, serde_json::Error> for WireDeserializer {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}

fn visit_array<'de, V: Visitor<'de>>(items: Vec<Value>, naming: NamingConvention, visitor: V) -> Result<V::Value> {
    let iter = items.into_iter().map(|v| WireDeserializer::wrap(v, naming));
    let mut seq = SeqDeserializer::<_, serde_json::Error>::new(iter);
    let value = visitor.visit_seq(&mut seq)?;
    seq.end()?;
    Ok(value)
}

fn visit_object<'de, V: Visitor<'de>>(
    object: Map<String, Value>,
    naming: NamingConvention,
    fields: Option<&'static [&'static str]>,
    visitor: V,
) -> Result<V::Value> {
    let iter = object.into_iter().map(|(key, value)| {
        let key = match fields {
            Some(fields) => fields
                .iter()
                .find(|field| naming.apply(field) == key.as_str())
                .map(|field| (*field).to_owned())
                .unwrap_or(key),
            None => key,
        };
        (key, WireDeserializer::wrap(value, naming))
    });
    let mut map = MapDeserializer::<'de, _, serde_json::Error>::new(iter);
    let value = visitor.visit_map(&mut map)?;
    map.end()?;
    Ok(value)
}

impl<'de> de::Deserializer<'de> for WireDeserializer {
    type Error = serde_json::Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.value {
            Value::Array(items) => visit_array(items, self.naming, visitor),
            Value::Object(object) => visit_object(object, self.naming, None, visitor),
            other => other.deserialize_any(visitor),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.value {
            Value::Null => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(self, _name: &'static str, visitor: V) -> Result<V::Value> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        match self.value {
            Value::Object(object) => visit_object(object, self.naming, Some(fields), visitor),
            other => WireDeserializer::wrap(other, self.naming).deserialize_any(visitor),
        }
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        let (variant, payload) = match self.value {
            Value::String(variant) => (variant, None),
            Value::Object(object) if object.len() == 1 => {
                let mut entries = object.into_iter();
                match entries.next() {
                    Some((variant, payload)) => (variant, Some(payload)),
                    None => return Err(de::Error::invalid_length(0, &"map with a single key")),
                }
            }
            Value::Object(object) => return Err(de::Error::invalid_length(object.len(), &"map with a single key")),
            other => return Err(de::Error::invalid_type(unexpected(&other), &"string or map")),
        };
        visitor.visit_enum(WireEnum {
            variant,
            payload,
            naming: self.naming,
        })
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct seq tuple tuple_struct map identifier
        ignored_any
    }
}

fn unexpected(value: &Value) -> de::Unexpected<'_> {
    match value {
        Value::Null => de::Unexpected::Unit,
        Value::Bool(b) => de::Unexpected::Bool(*b),
        Value::Number(_) => de::Unexpected::Other("number"),
        Value::String(s) => de::Unexpected::Str(s),
        Value::Array(_) => de::Unexpected::Seq,
        Value::Object(_) => de::Unexpected::Map,
    }
}

/// An externally tagged enum: `"Variant"` or `{"Variant": payload}`.
struct WireEnum {
    variant: String,
    payload: Option<Value>,
    naming: NamingConvention,
}

impl<'de> de::EnumAccess<'de> for WireEnum {
    type Error = serde_json::Error;
    type Variant = WireVariant;

    fn variant_seed<S: de::DeserializeSeed<'de>>(self, seed: S) -> Result<(S::Value, WireVariant)> {
        let variant = seed.deserialize(IntoDeserializer::<'de, serde_json::Error>::into_deserializer(self.variant))?;
        Ok((
            variant,
            WireVariant {
                payload: self.payload,
                naming: self.naming,
            },
        ))
    }
}

/// Variant payload; struct and nested fields are routed per the convention.
struct WireVariant {
    payload: Option<Value>,
    naming: NamingConvention,
}

impl<'de> de::VariantAccess<'de> for WireVariant {
    type Error = serde_json::Error;

    fn unit_variant(self) -> Result<()> {
        match self.payload {
            None | Some(Value::Null) => Ok(()),
            Some(other) => Err(de::Error::invalid_type(unexpected(&other), &"unit variant")),
        }
    }

    fn newtype_variant_seed<S: de::DeserializeSeed<'de>>(self, seed: S) -> Result<S::Value> {
        match self.payload {
            Some(value) => seed.deserialize(WireDeserializer::wrap(value, self.naming)),
            None => Err(de::Error::invalid_type(de::Unexpected::UnitVariant, &"newtype variant")),
        }
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value> {
        match self.payload {
            Some(Value::Array(items)) => visit_array(items, self.naming, visitor),
            Some(other) => Err(de::Error::invalid_type(unexpected(&other), &"tuple variant")),
            None => Err(de::Error::invalid_type(de::Unexpected::UnitVariant, &"tuple variant")),
        }
    }

    fn struct_variant<V: Visitor<'de>>(self, fields: &'static [&'static str], visitor: V) -> Result<V::Value> {
        match self.payload {
            Some(Value::Object(object)) => visit_object(object, self.naming, Some(fields), visitor),
            Some(other) => Err(de::Error::invalid_type(unexpected(&other), &"struct variant")),
            None => Err(de::Error::invalid_type(de::Unexpected::UnitVariant, &"struct variant")),
        }
    }
}
