//! EIP-712 typed structured data hashing.
//!
//! Implements `encodeType`, `typeHash`, `encodeData` and `hashStruct` from
//! <https://eips.ethereum.org/EIPS/eip-712> for arbitrary (nested) struct
//! definitions, plus the final `0x1901` signing hash. Everything here is pure:
//! the same inputs always produce the same 32-byte output.

use std::collections::{BTreeMap, BTreeSet};

use alloy_primitives::{keccak256, Address, B256, I256, U256};
use serde::{Deserialize, Serialize};

use super::domain::Eip712Domain;
use crate::address::normalize_address;
use crate::{Error, Result};

/// Name of the implicit domain struct.
pub const EIP712_DOMAIN_TYPE: &str = "EIP712Domain";

/// A single `(name, type)` entry of a struct definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedField {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

impl TypedField {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// Struct definitions keyed by type name.
///
/// Field order inside a definition is part of the encoding and is preserved
/// exactly as inserted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Types(BTreeMap<String, Vec<TypedField>>);

impl Types {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a struct definition from `(name, type)` pairs.
    pub fn with_struct(mut self, type_name: &str, fields: &[(&str, &str)]) -> Self {
        self.insert(
            type_name,
            fields
                .iter()
                .map(|(name, ty)| TypedField::new(*name, *ty))
                .collect(),
        );
        self
    }

    pub fn insert(&mut self, type_name: impl Into<String>, fields: Vec<TypedField>) {
        self.0.insert(type_name.into(), fields);
    }

    pub fn get(&self, type_name: &str) -> Option<&[TypedField]> {
        self.0.get(type_name).map(Vec::as_slice)
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.0.contains_key(type_name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Copy of these definitions without `type_name`.
    pub fn without(&self, type_name: &str) -> Self {
        let mut types = self.clone();
        types.0.remove(type_name);
        types
    }
}

/// A typed value to be encoded against a [`Types`] definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Uint(U256),
    Int(I256),
    Bool(bool),
    Address(Address),
    /// `bytes1` .. `bytes32`; the length must match the declared size.
    FixedBytes(Vec<u8>),
    Bytes(Vec<u8>),
    String(String),
    Array(Vec<Value>),
    Struct(BTreeMap<String, Value>),
}

impl Value {
    /// Build a struct value from `(field name, value)` pairs.
    pub fn record<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Value::Struct(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    fn kind(&self) -> &'static str {
        match self {
            Value::Uint(_) => "uint",
            Value::Int(_) => "int",
            Value::Bool(_) => "bool",
            Value::Address(_) => "address",
            Value::FixedBytes(_) => "fixed bytes",
            Value::Bytes(_) => "bytes",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Struct(_) => "struct",
        }
    }

    /// Convert a JSON value (as found in `eth_signTypedData_v4` payloads) into
    /// a typed value, driven by the declared type.
    ///
    /// Integers may be JSON numbers, decimal strings or `0x` hex strings.
    pub fn from_json(type_name: &str, types: &Types, json: &serde_json::Value) -> Result<Self> {
        let value = match parse_field_type(type_name, types)? {
            FieldKind::Uint(_) => Value::Uint(json_u256(json)?),
            FieldKind::Int(_) => Value::Int(json_i256(json)?),
            FieldKind::Bool => Value::Bool(
                json.as_bool()
                    .ok_or_else(|| json_mismatch(type_name, json))?,
            ),
            FieldKind::Address => Value::Address(normalize_address(
                json.as_str().ok_or_else(|| json_mismatch(type_name, json))?,
            )?),
            FieldKind::FixedBytes(_) => Value::FixedBytes(json_hex_bytes(type_name, json)?),
            FieldKind::Bytes => Value::Bytes(json_hex_bytes(type_name, json)?),
            FieldKind::String => Value::String(
                json.as_str()
                    .ok_or_else(|| json_mismatch(type_name, json))?
                    .to_string(),
            ),
            FieldKind::Array { element, .. } => Value::Array(
                json.as_array()
                    .ok_or_else(|| json_mismatch(type_name, json))?
                    .iter()
                    .map(|item| Value::from_json(element, types, item))
                    .collect::<Result<_>>()?,
            ),
            FieldKind::Struct(name) => {
                let object = json
                    .as_object()
                    .ok_or_else(|| json_mismatch(type_name, json))?;
                let fields = types.get(name).unwrap_or_default();

                if let Some(extra) = object
                    .keys()
                    .find(|key| !fields.iter().any(|f| &f.name == *key))
                {
                    return Err(Error::typed_data(format!(
                        "unexpected field `{extra}` for type {name}"
                    )));
                }

                let mut map = BTreeMap::new();
                for field in fields {
                    let raw = object.get(&field.name).ok_or_else(|| {
                        Error::typed_data(format!("missing field `{}` for type {name}", field.name))
                    })?;
                    map.insert(
                        field.name.clone(),
                        Value::from_json(&field.type_name, types, raw)?,
                    );
                }
                Value::Struct(map)
            }
        };
        Ok(value)
    }
}

impl From<U256> for Value {
    fn from(v: U256) -> Self {
        Value::Uint(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Uint(U256::from(v))
    }
}

impl From<I256> for Value {
    fn from(v: I256) -> Self {
        Value::Int(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<Address> for Value {
    fn from(v: Address) -> Self {
        Value::Address(v)
    }
}

impl From<B256> for Value {
    fn from(v: B256) -> Self {
        Value::FixedBytes(v.to_vec())
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

/// A closed record type with a fixed EIP-712 definition.
///
/// Implementors pin field order and field types in code rather than relying on
/// map key enumeration.
pub trait Eip712Message {
    /// Name of the root struct in [`Eip712Message::types`].
    const PRIMARY_TYPE: &'static str;

    fn types() -> &'static Types;

    fn to_value(&self) -> Value;

    fn struct_hash(&self) -> Result<B256> {
        hash_struct(Self::PRIMARY_TYPE, Self::types(), &self.to_value())
    }

    fn signing_hash(&self, domain: &Eip712Domain) -> Result<B256> {
        compute_digest(domain, Self::types(), Self::PRIMARY_TYPE, &self.to_value())
    }
}

/// `eth_signTypedData_v4` payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedData {
    pub types: Types,
    pub primary_type: String,
    pub domain: Eip712Domain,
    pub message: serde_json::Value,
}

impl TypedData {
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Struct definitions of the message, without `EIP712Domain`.
    pub fn message_types(&self) -> Types {
        self.types.without(EIP712_DOMAIN_TYPE)
    }

    pub fn message_value(&self) -> Result<Value> {
        Value::from_json(&self.primary_type, &self.message_types(), &self.message)
    }

    pub fn struct_hash(&self) -> Result<B256> {
        hash_struct(
            &self.primary_type,
            &self.message_types(),
            &self.message_value()?,
        )
    }

    /// Domain separator. A declared `EIP712Domain` type fixes the member list
    /// and order; every set domain field must be declared and vice versa.
    pub fn domain_separator(&self) -> Result<B256> {
        if !self.types.contains(EIP712_DOMAIN_TYPE) {
            return self.domain.separator();
        }

        self.domain.validate()?;
        let value = Value::record(
            self.domain
                .fields()
                .into_iter()
                .map(|(name, _, value)| (name, value)),
        );
        hash_struct(EIP712_DOMAIN_TYPE, &self.types, &value)
    }

    pub fn digest(&self) -> Result<B256> {
        Ok(signing_hash(self.domain_separator()?, self.struct_hash()?))
    }
}

/// Parsed field type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldKind<'a> {
    Uint(usize),
    Int(usize),
    Bool,
    Address,
    FixedBytes(usize),
    Bytes,
    String,
    Array { element: &'a str, len: Option<usize> },
    Struct(&'a str),
}

fn parse_field_type<'a>(type_name: &'a str, types: &Types) -> Result<FieldKind<'a>> {
    if let Some(inner) = type_name.strip_suffix(']') {
        let open = inner
            .rfind('[')
            .ok_or_else(|| Error::typed_data(format!("malformed array type `{type_name}`")))?;
        let element = &inner[..open];
        let len = match &inner[open + 1..] {
            "" => None,
            digits => Some(digits.parse::<usize>().map_err(|_| {
                Error::typed_data(format!("malformed array length in `{type_name}`"))
            })?),
        };
        if element.is_empty() {
            return Err(Error::typed_data(format!("malformed array type `{type_name}`")));
        }
        return Ok(FieldKind::Array { element, len });
    }

    match type_name {
        "bool" => return Ok(FieldKind::Bool),
        "address" => return Ok(FieldKind::Address),
        "string" => return Ok(FieldKind::String),
        "bytes" => return Ok(FieldKind::Bytes),
        _ => {}
    }

    if let Some(bits) = sized_suffix(type_name, "uint") {
        return integer_width(type_name, bits).map(FieldKind::Uint);
    }
    if let Some(bits) = sized_suffix(type_name, "int") {
        return integer_width(type_name, bits).map(FieldKind::Int);
    }
    if let Some(size) = sized_suffix(type_name, "bytes") {
        if (1..=32).contains(&size) {
            return Ok(FieldKind::FixedBytes(size));
        }
        return Err(Error::typed_data(format!("invalid fixed bytes type `{type_name}`")));
    }

    if types.contains(type_name) {
        Ok(FieldKind::Struct(type_name))
    } else {
        Err(Error::typed_data(format!("unknown type `{type_name}`")))
    }
}

/// Numeric suffix of `type_name` after `prefix`, if the remainder is all digits.
fn sized_suffix(type_name: &str, prefix: &str) -> Option<usize> {
    let rest = type_name.strip_prefix(prefix)?;
    if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    rest.parse().ok()
}

fn integer_width(type_name: &str, bits: usize) -> Result<usize> {
    if bits == 0 || bits > 256 || bits % 8 != 0 {
        return Err(Error::typed_data(format!("invalid integer type `{type_name}`")));
    }
    Ok(bits)
}

/// Element type with any array suffixes removed (`Person[][2]` -> `Person`).
fn base_type(type_name: &str) -> &str {
    match type_name.find('[') {
        Some(idx) => &type_name[..idx],
        None => type_name,
    }
}

fn collect_dependencies<'a>(type_name: &'a str, types: &'a Types, found: &mut BTreeSet<&'a str>) {
    if found.contains(type_name) {
        return;
    }
    let Some(fields) = types.get(type_name) else {
        return;
    };
    found.insert(type_name);
    for field in fields {
        collect_dependencies(base_type(&field.type_name), types, found);
    }
}

fn format_struct(type_name: &str, fields: &[TypedField]) -> String {
    let members: Vec<String> = fields
        .iter()
        .map(|f| format!("{} {}", f.type_name, f.name))
        .collect();
    format!("{}({})", type_name, members.join(","))
}

fn definition<'a>(type_name: &str, types: &'a Types) -> Result<&'a [TypedField]> {
    types
        .get(type_name)
        .ok_or_else(|| Error::typed_data(format!("no definition for type `{type_name}`")))
}

/// `encodeType`: the primary definition followed by every referenced struct
/// definition, sorted by name.
pub fn encode_type(primary: &str, types: &Types) -> Result<String> {
    let fields = definition(primary, types)?;

    let mut dependencies = BTreeSet::new();
    collect_dependencies(primary, types, &mut dependencies);
    dependencies.remove(primary);

    let mut encoded = format_struct(primary, fields);
    for dependency in dependencies {
        encoded.push_str(&format_struct(dependency, definition(dependency, types)?));
    }
    Ok(encoded)
}

pub fn type_hash(primary: &str, types: &Types) -> Result<B256> {
    Ok(keccak256(encode_type(primary, types)?.as_bytes()))
}

/// `encodeData`: type hash followed by one 32-byte word per field, in
/// definition order.
pub fn encode_data(type_name: &str, types: &Types, value: &Value) -> Result<Vec<u8>> {
    let fields = definition(type_name, types)?;
    let Value::Struct(members) = value else {
        return Err(Error::typed_data(format!(
            "expected struct value for type {type_name}, got {}",
            value.kind()
        )));
    };

    if let Some(extra) = members
        .keys()
        .find(|key| !fields.iter().any(|f| &f.name == *key))
    {
        return Err(Error::typed_data(format!(
            "unexpected field `{extra}` for type {type_name}"
        )));
    }

    let mut encoded = Vec::with_capacity(32 * (fields.len() + 1));
    encoded.extend_from_slice(type_hash(type_name, types)?.as_slice());

    for field in fields {
        let member = members.get(&field.name).ok_or_else(|| {
            Error::typed_data(format!("missing field `{}` for type {type_name}", field.name))
        })?;
        let word = encode_field(&field.type_name, types, member).map_err(|e| match e {
            Error::TypedData { message } => {
                Error::typed_data(format!("{type_name}.{}: {message}", field.name))
            }
            other => other,
        })?;
        encoded.extend_from_slice(word.as_slice());
    }

    Ok(encoded)
}

/// `hashStruct`: keccak256 of [`encode_data`].
pub fn hash_struct(type_name: &str, types: &Types, value: &Value) -> Result<B256> {
    Ok(keccak256(encode_data(type_name, types, value)?))
}

/// Encode a single field value into its 32-byte slot.
fn encode_field(type_name: &str, types: &Types, value: &Value) -> Result<B256> {
    match (parse_field_type(type_name, types)?, value) {
        (FieldKind::Uint(bits), Value::Uint(v)) => {
            if bits < 256 && (*v >> bits) != U256::ZERO {
                return Err(Error::typed_data(format!("value {v} overflows {type_name}")));
            }
            Ok(B256::from(v.to_be_bytes::<32>()))
        }
        (FieldKind::Int(bits), Value::Int(v)) => {
            let limit = U256::from(1u8) << (bits - 1);
            let magnitude = v.unsigned_abs();
            let fits = if v.is_negative() {
                magnitude <= limit
            } else {
                magnitude < limit
            };
            if !fits {
                return Err(Error::typed_data(format!("value {v} overflows {type_name}")));
            }
            Ok(B256::from(v.into_raw().to_be_bytes::<32>()))
        }
        (FieldKind::Bool, Value::Bool(b)) => Ok(B256::from(U256::from(*b as u8).to_be_bytes::<32>())),
        (FieldKind::Address, Value::Address(address)) => {
            Ok(B256::left_padding_from(address.as_slice()))
        }
        (FieldKind::FixedBytes(size), Value::FixedBytes(bytes)) => {
            if bytes.len() != size {
                return Err(Error::typed_data(format!(
                    "expected {size} bytes for {type_name}, got {}",
                    bytes.len()
                )));
            }
            Ok(B256::right_padding_from(bytes))
        }
        (FieldKind::Bytes, Value::Bytes(bytes)) => Ok(keccak256(bytes)),
        (FieldKind::String, Value::String(s)) => Ok(keccak256(s.as_bytes())),
        (FieldKind::Array { element, len }, Value::Array(items)) => {
            if let Some(expected) = len {
                if items.len() != expected {
                    return Err(Error::typed_data(format!(
                        "expected {expected} elements for {type_name}, got {}",
                        items.len()
                    )));
                }
            }
            let mut concatenated = Vec::with_capacity(32 * items.len());
            for item in items {
                concatenated.extend_from_slice(encode_field(element, types, item)?.as_slice());
            }
            Ok(keccak256(concatenated))
        }
        (FieldKind::Struct(name), Value::Struct(_)) => hash_struct(name, types, value),
        (_, value) => Err(Error::typed_data(format!(
            "cannot encode {} value as {type_name}",
            value.kind()
        ))),
    }
}

/// The unique definition that no other definition references.
pub fn primary_type(types: &Types) -> Result<&str> {
    let referenced: BTreeSet<&str> = types
        .0
        .values()
        .flatten()
        .map(|field| base_type(&field.type_name))
        .filter(|name| types.contains(name))
        .collect();

    let roots: Vec<&str> = types
        .names()
        .filter(|name| !referenced.contains(name))
        .collect();

    match roots.as_slice() {
        [root] => Ok(*root),
        [] => Err(Error::typed_data("no primary type found")),
        many => Err(Error::typed_data(format!(
            "ambiguous primary type, candidates: {}",
            many.join(", ")
        ))),
    }
}

/// Domain separator: `hashStruct(EIP712Domain)` over the present fields only.
pub fn hash_domain(domain: &Eip712Domain) -> Result<B256> {
    let fields = domain.fields();
    if fields.is_empty() {
        return Err(Error::InvalidDomain {
            message: "domain has no fields".to_string(),
        });
    }

    let mut types = Types::new();
    types.insert(
        EIP712_DOMAIN_TYPE,
        fields
            .iter()
            .map(|(name, ty, _)| TypedField::new(*name, *ty))
            .collect(),
    );
    let value = Value::record(fields.into_iter().map(|(name, _, value)| (name, value)));

    hash_struct(EIP712_DOMAIN_TYPE, &types, &value)
}

/// `keccak256(0x19 0x01 ‖ domainSeparator ‖ structHash)`.
pub fn signing_hash(domain_separator: B256, struct_hash: B256) -> B256 {
    let mut preimage = [0u8; 66];
    preimage[0] = 0x19;
    preimage[1] = 0x01;
    preimage[2..34].copy_from_slice(domain_separator.as_slice());
    preimage[34..].copy_from_slice(struct_hash.as_slice());
    keccak256(preimage)
}

/// Digest of `value` as `primary` under `domain`.
pub fn compute_digest(
    domain: &Eip712Domain,
    types: &Types,
    primary: &str,
    value: &Value,
) -> Result<B256> {
    let domain_separator = hash_domain(domain)?;
    let struct_hash = hash_struct(primary, types, value)?;
    Ok(signing_hash(domain_separator, struct_hash))
}

/// Digest of `value` with the primary type inferred from `types`.
pub fn digest(domain: &Eip712Domain, types: &Types, value: &Value) -> Result<B256> {
    let primary = primary_type(types)?;
    compute_digest(domain, types, primary, value)
}

fn json_mismatch(type_name: &str, json: &serde_json::Value) -> Error {
    Error::typed_data(format!("cannot read {json} as {type_name}"))
}

/// Read an unsigned integer from a JSON number, decimal string or hex string.
pub fn json_u256(json: &serde_json::Value) -> Result<U256> {
    let parsed = match json {
        serde_json::Value::Number(n) => n.as_u64().map(U256::from),
        serde_json::Value::String(s) => {
            let s = s.trim();
            match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                Some(hex_digits) => U256::from_str_radix(hex_digits, 16).ok(),
                None => U256::from_str_radix(s, 10).ok(),
            }
        }
        _ => None,
    };
    parsed.ok_or_else(|| Error::typed_data(format!("invalid unsigned integer {json}")))
}

fn json_i256(json: &serde_json::Value) -> Result<I256> {
    let parsed = match json {
        serde_json::Value::Number(n) => n.as_i64().and_then(|i| I256::from_dec_str(&i.to_string()).ok()),
        serde_json::Value::String(s) => {
            let s = s.trim();
            if s.contains("0x") || s.contains("0X") {
                I256::from_hex_str(s).ok()
            } else {
                I256::from_dec_str(s).ok()
            }
        }
        _ => None,
    };
    parsed.ok_or_else(|| Error::typed_data(format!("invalid signed integer {json}")))
}

fn json_hex_bytes(type_name: &str, json: &serde_json::Value) -> Result<Vec<u8>> {
    let s = json.as_str().ok_or_else(|| json_mismatch(type_name, json))?;
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    hex::decode(digits).map_err(|e| Error::typed_data(format!("invalid hex for {type_name}: {e}")))
}
