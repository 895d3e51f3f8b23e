//! Typed ABI values.
//!
//! Values are [`DynSolValue`]s checked against the [`DynSolType`]s resolved
//! from the descriptor, so encoding stays bit-exact with any other ABI codec.

use alloy::{
    dyn_abi::{DynSolType, DynSolValue},
    hex,
    primitives::{B256, keccak256},
};
use itertools::Itertools;

use crate::error::{Error, Result};

pub use alloy::dyn_abi::{DynSolType as ValueType, DynSolValue as Value};

/// Values returned by a function call, named after the output schema.
///
/// Outputs without a name in the ABI have an empty name and are reachable
/// by position only.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct CallOutput {
    fields: Vec<(String, DynSolValue)>,
}

impl CallOutput {
    pub(crate) fn new(fields: Vec<(String, DynSolValue)>) -> Self {
        Self { fields }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Output by name.
    pub fn get(&self, name: &str) -> Option<&DynSolValue> {
        self.fields
            .iter()
            .find(|(n, _)| !n.is_empty() && n == name)
            .map(|(_, v)| v)
    }

    /// Output by position.
    pub fn value(&self, idx: usize) -> Option<&DynSolValue> {
        self.fields.get(idx).map(|(_, v)| v)
    }

    pub fn fields(&self) -> &[(String, DynSolValue)] {
        &self.fields
    }

    pub fn values(&self) -> impl Iterator<Item = &DynSolValue> {
        self.fields.iter().map(|(_, v)| v)
    }

    pub fn into_values(self) -> Vec<DynSolValue> {
        self.fields.into_iter().map(|(_, v)| v).collect()
    }

    /// The only output of a single-return function.
    pub fn into_single(self) -> Result<DynSolValue> {
        let len = self.fields.len();
        match <[_; 1]>::try_from(self.fields) {
            Ok([(_, value)]) => Ok(value),
            Err(_) => Err(Error::Decoding(format!(
                "expected a single return value, got {len}"
            ))),
        }
    }
}

/// Solidity type name of the value, for error messages.
pub(crate) fn type_name(value: &DynSolValue) -> String {
    value
        .sol_type_name()
        .map(|name| name.into_owned())
        .unwrap_or_else(|| "<unknown>".to_string())
}

/// Types stored in a topic as their ABI word rather than as a hash.
pub fn is_value_type(ty: &DynSolType) -> bool {
    matches!(
        ty,
        DynSolType::Bool
            | DynSolType::Int(_)
            | DynSolType::Uint(_)
            | DynSolType::FixedBytes(_)
            | DynSolType::Address
            | DynSolType::Function
    )
}

/// Decodes a sequence of values laid out as function parameters.
pub(crate) fn decode_params(types: &[DynSolType], data: &[u8]) -> Result<Vec<DynSolValue>> {
    if types.is_empty() {
        return Ok(Vec::new());
    }
    match DynSolType::Tuple(types.to_vec()).abi_decode_params(data) {
        Ok(DynSolValue::Tuple(values)) => Ok(values),
        Ok(other) => Err(Error::Decoding(format!(
            "expected a tuple, decoded {}",
            type_name(&other)
        ))),
        Err(err) => Err(Error::Decoding(err.to_string())),
    }
}

/// Topic representation of an indexed event parameter value.
///
/// Value types are stored as their 32-byte ABI word, `string` and `bytes` as
/// the keccak-256 hash of their content. Arrays and tuples are not
/// supported as filter values.
pub fn topic(ty: &DynSolType, value: &DynSolValue) -> Result<B256> {
    if !ty.matches(value) {
        return Err(Error::Encoding(format!(
            "topic value: expected {ty}, got {}",
            type_name(value)
        )));
    }
    match value {
        DynSolValue::String(s) => Ok(keccak256(s.as_bytes())),
        DynSolValue::Bytes(b) => Ok(keccak256(b)),
        v if is_value_type(ty) => v
            .as_word()
            .ok_or_else(|| Error::Encoding(format!("{ty} value has no topic word"))),
        _ => Err(Error::Encoding(format!(
            "indexed {ty} values can not be used as topics"
        ))),
    }
}

/// Decodes an indexed event parameter from its topic.
pub(crate) fn from_topic(ty: &DynSolType, word: &B256) -> Result<DynSolValue> {
    if is_value_type(ty) {
        ty.abi_decode(word.as_slice())
            .map_err(|err| Error::Decoding(format!("topic as {ty}: {err}")))
    } else {
        Ok(DynSolValue::FixedBytes(*word, 32))
    }
}

/// Parses human-readable arguments, e.g. from the command line.
pub fn coerce_args<S: AsRef<str>>(types: &[DynSolType], raw: &[S]) -> Result<Vec<DynSolValue>> {
    if types.len() != raw.len() {
        return Err(Error::Encoding(format!(
            "expected {} argument(s), got {}",
            types.len(),
            raw.len()
        )));
    }
    types
        .iter()
        .zip(raw)
        .enumerate()
        .map(|(idx, (ty, s))| {
            ty.coerce_str(s.as_ref())
                .map_err(|err| Error::Encoding(format!("argument {idx} as {ty}: {err}")))
        })
        .collect()
}

/// Human-readable rendering of a value.
pub fn format_value(value: &DynSolValue) -> String {
    match value {
        DynSolValue::Bool(b) => b.to_string(),
        DynSolValue::Int(i, _) => i.to_string(),
        DynSolValue::Uint(u, _) => u.to_string(),
        DynSolValue::FixedBytes(word, size) => hex::encode_prefixed(&word[..*size]),
        DynSolValue::Address(address) => address.to_checksum(None),
        DynSolValue::Bytes(bytes) => hex::encode_prefixed(bytes),
        DynSolValue::String(s) => format!("{s:?}"),
        DynSolValue::Array(values) | DynSolValue::FixedArray(values) => {
            format!("[{}]", values.iter().map(format_value).join(", "))
        }
        DynSolValue::Tuple(values) => {
            format!("({})", values.iter().map(format_value).join(", "))
        }
        other => format!("{other:?}"),
    }
}
