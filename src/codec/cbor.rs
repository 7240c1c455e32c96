//! Canonical binary codec
//!
//! A self-describing binary encoding for [`IrStatement`] following the
//! CBOR major-type scheme (RFC 8949): integers with 1/2/4/8-byte argument
//! widths chosen by magnitude, byte strings, text strings, arrays, maps,
//! semantic tags, and the simple values false/true/null plus 64-bit
//! floats. Indefinite lengths are not emitted and not accepted.
//!
//! Refinement types ride in a private tag block. Each tag wraps a map
//! carrying exactly the fields needed to reconstruct the value, plus a
//! `trusted` flag:
//!
//! | tag               | payload                                        |
//! |-------------------|------------------------------------------------|
//! | 39600 BoundedNat  | {min, max, value, trusted}                     |
//! | 39601 BoundedInt  | {min, max, value, trusted}                     |
//! | 39602 NonEmptyString | {value, trusted}                            |
//! | 39603 Confidence  | {value, trusted}                               |
//! | 39604 PromptScores | {6 dimensions, overall, trusted}              |
//! | 39605 ProofBlob   | byte string                                    |
//! | 39606 Tracked     | {value, actor, rationale, timestamp, trusted}  |
//! | 39607 BoundedFloat | {min, max, value, trusted}                    |
//!
//! The `trusted` flag records the producer's intent, but it is never
//! sufficient on its own: [`decode`] re-runs the validated constructors on
//! every refined payload regardless of the flag, so tampered or
//! self-certifying bytes are rejected. The fast path is reached only
//! through [`decode_trusted`], a caller opt-in for bytes produced
//! in-process by [`encode_trusted`] that never crossed a trust boundary.
//! Standard tags 0 (RFC 3339 text) and 37 (UUID bytes) are used for
//! timestamps and UUIDs.

use std::io::{Cursor, Read};

use crate::error::{Error, Result};
use crate::ir::{IrStatement, PermissionMetadata, ValidationLevel};
use crate::parsing::ast::{CompareOp, Direction, OrderBy};
use crate::semantic::obligation::{ObligationRecord, ProofObligation};
use crate::semantic::validated::{ValidatedColumn, ValidatedPredicate, ValidatedStatement};
use crate::types::data_type::{TypeExpr, TypeExprKind};
use crate::types::refined::{
    ActorId, BoundedFloat, BoundedInt, BoundedNat, Confidence, NonEmptyString, PromptScores,
    Rationale, Tracked,
};
use crate::types::value::TypedValue;

pub const TAG_BOUNDED_NAT: u64 = 39600;
pub const TAG_BOUNDED_INT: u64 = 39601;
pub const TAG_NON_EMPTY_STRING: u64 = 39602;
pub const TAG_CONFIDENCE: u64 = 39603;
pub const TAG_PROMPT_SCORES: u64 = 39604;
pub const TAG_PROOF_BLOB: u64 = 39605;
pub const TAG_TRACKED: u64 = 39606;
pub const TAG_BOUNDED_FLOAT: u64 = 39607;

const TAG_DATETIME: u64 = 0;
const TAG_UUID: u64 = 37;

/// Encodes an IR statement, marking all refined payloads untrusted so any
/// decoder re-validates them.
pub fn encode(ir: &IrStatement) -> Vec<u8> {
    encode_with_trust(ir, false)
}

/// Encodes an IR statement with refined payloads marked trusted. Only for
/// bytes that never leave the process boundary.
pub fn encode_trusted(ir: &IrStatement) -> Vec<u8> {
    encode_with_trust(ir, true)
}

fn encode_with_trust(ir: &IrStatement, trusted: bool) -> Vec<u8> {
    let value = ir_to_value(ir, trusted);
    let mut out = Vec::new();
    write_value(&value, &mut out);
    out
}

/// Decodes an IR statement. Every refined payload is rebuilt through the
/// validated constructors, whatever its embedded `trusted` flag says; a
/// malformed or invariant-violating payload is a [`Error::Codec`], never
/// a panic.
pub fn decode(bytes: &[u8]) -> Result<IrStatement> {
    decode_with_trust(bytes, Trust::Verify)
}

/// Decodes bytes produced in-process by [`encode_trusted`], honoring the
/// embedded trust marks to skip re-validation. Never use this on bytes
/// received across a trust boundary.
pub fn decode_trusted(bytes: &[u8]) -> Result<IrStatement> {
    decode_with_trust(bytes, Trust::Accept)
}

fn decode_with_trust(bytes: &[u8], trust: Trust) -> Result<IrStatement> {
    let mut cursor = Cursor::new(bytes);
    let value = read_value(&mut cursor, 0)?;
    if cursor.position() != bytes.len() as u64 {
        return Err(Error::Codec("trailing bytes after statement".into()));
    }
    ir_from_value(&value, trust)
}

/// Decoder-side trust policy. The embedded `trusted` flag alone never
/// selects the fast path; the caller has to opt in through
/// [`decode_trusted`] as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trust {
    /// Re-run the validated constructors on every refined payload.
    Verify,
    /// Honor payloads marked trusted by the producer.
    Accept,
}

/// Encodes just an obligation list; used for the IR proof blob.
pub fn encode_obligations(obligations: &[ObligationRecord]) -> Vec<u8> {
    let value = Value::Array(obligations.iter().map(obligation_record_to_value).collect());
    let mut out = Vec::new();
    write_value(&value, &mut out);
    out
}

/// Decodes a proof blob back into its obligation list.
pub fn decode_obligations(bytes: &[u8]) -> Result<Vec<ObligationRecord>> {
    let mut cursor = Cursor::new(bytes);
    let value = read_value(&mut cursor, 0)?;
    let items = value.as_array("proof blob")?;
    items.iter().map(obligation_record_from_value).collect()
}

// ============================================================================
// Data model
// ============================================================================

/// In-memory form of a CBOR item. The codec round-trips IR through this.
#[derive(Debug, Clone, PartialEq)]
enum Value {
    Uint(u64),
    /// Negative integer, stored as its actual value.
    Nint(i64),
    Bytes(Vec<u8>),
    Text(String),
    Array(Vec<Value>),
    /// Maps with text keys only; key order is preserved as written so
    /// encoding stays canonical and deterministic.
    Map(Vec<(String, Value)>),
    Tag(u64, Box<Value>),
    Bool(bool),
    Null,
    Float(f64),
}

impl Value {
    fn int(value: i64) -> Value {
        if value < 0 {
            Value::Nint(value)
        } else {
            Value::Uint(value as u64)
        }
    }

    fn int128(value: i128) -> Result<Value> {
        if value >= 0 {
            u64::try_from(value)
                .map(Value::Uint)
                .map_err(|_| Error::Codec(format!("integer {} exceeds 64-bit range", value)))
        } else {
            i64::try_from(value)
                .map(Value::Nint)
                .map_err(|_| Error::Codec(format!("integer {} exceeds 64-bit range", value)))
        }
    }

    fn opt(value: Option<Value>) -> Value {
        value.unwrap_or(Value::Null)
    }

    fn as_u64(&self, what: &str) -> Result<u64> {
        match self {
            Value::Uint(n) => Ok(*n),
            _ => Err(Error::Codec(format!("{}: expected unsigned integer", what))),
        }
    }

    fn as_i64(&self, what: &str) -> Result<i64> {
        match self {
            Value::Uint(n) => i64::try_from(*n)
                .map_err(|_| Error::Codec(format!("{}: integer out of range", what))),
            Value::Nint(n) => Ok(*n),
            _ => Err(Error::Codec(format!("{}: expected integer", what))),
        }
    }

    fn as_i128(&self, what: &str) -> Result<i128> {
        match self {
            Value::Uint(n) => Ok(*n as i128),
            Value::Nint(n) => Ok(*n as i128),
            _ => Err(Error::Codec(format!("{}: expected integer", what))),
        }
    }

    fn as_f64(&self, what: &str) -> Result<f64> {
        match self {
            Value::Float(x) => Ok(*x),
            _ => Err(Error::Codec(format!("{}: expected float", what))),
        }
    }

    fn as_bool(&self, what: &str) -> Result<bool> {
        match self {
            Value::Bool(b) => Ok(*b),
            _ => Err(Error::Codec(format!("{}: expected bool", what))),
        }
    }

    fn as_text(&self, what: &str) -> Result<&str> {
        match self {
            Value::Text(s) => Ok(s),
            _ => Err(Error::Codec(format!("{}: expected text", what))),
        }
    }

    fn as_bytes(&self, what: &str) -> Result<&[u8]> {
        match self {
            Value::Bytes(b) => Ok(b),
            _ => Err(Error::Codec(format!("{}: expected byte string", what))),
        }
    }

    fn as_array(&self, what: &str) -> Result<&[Value]> {
        match self {
            Value::Array(items) => Ok(items),
            _ => Err(Error::Codec(format!("{}: expected array", what))),
        }
    }

    fn as_map(&self, what: &str) -> Result<&[(String, Value)]> {
        match self {
            Value::Map(entries) => Ok(entries),
            _ => Err(Error::Codec(format!("{}: expected map", what))),
        }
    }
}

/// Looks up a required key in a decoded map.
fn get<'a>(entries: &'a [(String, Value)], key: &str, what: &str) -> Result<&'a Value> {
    entries
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v)
        .ok_or_else(|| Error::Codec(format!("{}: missing key '{}'", what, key)))
}

/// Looks up an optional key; Null counts as absent.
fn get_opt<'a>(entries: &'a [(String, Value)], key: &str) -> Option<&'a Value> {
    entries
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v)
        .filter(|v| !matches!(v, Value::Null))
}

// ============================================================================
// Byte-level writer
// ============================================================================

const MAJOR_UINT: u8 = 0;
const MAJOR_NINT: u8 = 1;
const MAJOR_BYTES: u8 = 2;
const MAJOR_TEXT: u8 = 3;
const MAJOR_ARRAY: u8 = 4;
const MAJOR_MAP: u8 = 5;
const MAJOR_TAG: u8 = 6;
const MAJOR_SIMPLE: u8 = 7;

/// Writes a major type with its argument in the shortest width.
fn write_head(major: u8, arg: u64, out: &mut Vec<u8>) {
    let major = major << 5;
    if arg < 24 {
        out.push(major | arg as u8);
    } else if arg <= u8::MAX as u64 {
        out.push(major | 24);
        out.push(arg as u8);
    } else if arg <= u16::MAX as u64 {
        out.push(major | 25);
        out.extend_from_slice(&(arg as u16).to_be_bytes());
    } else if arg <= u32::MAX as u64 {
        out.push(major | 26);
        out.extend_from_slice(&(arg as u32).to_be_bytes());
    } else {
        out.push(major | 27);
        out.extend_from_slice(&arg.to_be_bytes());
    }
}

fn write_value(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Uint(n) => write_head(MAJOR_UINT, *n, out),
        Value::Nint(n) => {
            // Major type 1 encodes -1 - arg.
            let arg = (-1 - *n) as u64;
            write_head(MAJOR_NINT, arg, out);
        }
        Value::Bytes(bytes) => {
            write_head(MAJOR_BYTES, bytes.len() as u64, out);
            out.extend_from_slice(bytes);
        }
        Value::Text(text) => {
            write_head(MAJOR_TEXT, text.len() as u64, out);
            out.extend_from_slice(text.as_bytes());
        }
        Value::Array(items) => {
            write_head(MAJOR_ARRAY, items.len() as u64, out);
            for item in items {
                write_value(item, out);
            }
        }
        Value::Map(entries) => {
            write_head(MAJOR_MAP, entries.len() as u64, out);
            for (key, item) in entries {
                write_value(&Value::Text(key.clone()), out);
                write_value(item, out);
            }
        }
        Value::Tag(tag, inner) => {
            write_head(MAJOR_TAG, *tag, out);
            write_value(inner, out);
        }
        Value::Bool(false) => out.push(0xf4),
        Value::Bool(true) => out.push(0xf5),
        Value::Null => out.push(0xf6),
        Value::Float(x) => {
            out.push(0xfb);
            out.extend_from_slice(&x.to_bits().to_be_bytes());
        }
    }
}

// ============================================================================
// Byte-level reader
// ============================================================================

/// Nesting limit so hostile input cannot blow the stack.
const MAX_DEPTH: u32 = 64;

fn read_exact(cursor: &mut Cursor<&[u8]>, len: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    cursor
        .read_exact(&mut buf)
        .map_err(|_| Error::Codec("unexpected end of input".into()))?;
    Ok(buf)
}

fn read_arg(cursor: &mut Cursor<&[u8]>, info: u8) -> Result<u64> {
    match info {
        0..=23 => Ok(info as u64),
        24 => Ok(read_exact(cursor, 1)?[0] as u64),
        25 => Ok(u16::from_be_bytes(read_exact(cursor, 2)?.try_into().unwrap()) as u64),
        26 => Ok(u32::from_be_bytes(read_exact(cursor, 4)?.try_into().unwrap()) as u64),
        27 => Ok(u64::from_be_bytes(read_exact(cursor, 8)?.try_into().unwrap())),
        31 => Err(Error::Codec("indefinite lengths are not supported".into())),
        _ => Err(Error::Codec(format!("reserved additional info {}", info))),
    }
}

fn read_value(cursor: &mut Cursor<&[u8]>, depth: u32) -> Result<Value> {
    if depth > MAX_DEPTH {
        return Err(Error::Codec("nesting too deep".into()));
    }
    let initial = read_exact(cursor, 1)?[0];
    let major = initial >> 5;
    let info = initial & 0x1f;

    match major {
        MAJOR_UINT => Ok(Value::Uint(read_arg(cursor, info)?)),
        MAJOR_NINT => {
            let arg = read_arg(cursor, info)?;
            let value = i64::try_from(arg)
                .ok()
                .and_then(|a| (-1i64).checked_sub(a))
                .ok_or_else(|| Error::Codec("negative integer out of range".into()))?;
            Ok(Value::Nint(value))
        }
        MAJOR_BYTES => {
            let len = read_arg(cursor, info)? as usize;
            Ok(Value::Bytes(read_exact(cursor, len)?))
        }
        MAJOR_TEXT => {
            let len = read_arg(cursor, info)? as usize;
            let bytes = read_exact(cursor, len)?;
            let text = String::from_utf8(bytes)
                .map_err(|_| Error::Codec("invalid UTF-8 in text string".into()))?;
            Ok(Value::Text(text))
        }
        MAJOR_ARRAY => {
            let len = read_arg(cursor, info)? as usize;
            let mut items = Vec::with_capacity(len.min(1024));
            for _ in 0..len {
                items.push(read_value(cursor, depth + 1)?);
            }
            Ok(Value::Array(items))
        }
        MAJOR_MAP => {
            let len = read_arg(cursor, info)? as usize;
            let mut entries = Vec::with_capacity(len.min(1024));
            for _ in 0..len {
                let key = match read_value(cursor, depth + 1)? {
                    Value::Text(key) => key,
                    _ => return Err(Error::Codec("map keys must be text".into())),
                };
                let item = read_value(cursor, depth + 1)?;
                entries.push((key, item));
            }
            Ok(Value::Map(entries))
        }
        MAJOR_TAG => {
            let tag = read_arg(cursor, info)?;
            let inner = read_value(cursor, depth + 1)?;
            Ok(Value::Tag(tag, Box::new(inner)))
        }
        MAJOR_SIMPLE => match initial {
            0xf4 => Ok(Value::Bool(false)),
            0xf5 => Ok(Value::Bool(true)),
            0xf6 => Ok(Value::Null),
            0xfb => {
                let bits = u64::from_be_bytes(read_exact(cursor, 8)?.try_into().unwrap());
                Ok(Value::Float(f64::from_bits(bits)))
            }
            other => Err(Error::Codec(format!("unsupported simple value {:#04x}", other))),
        },
        _ => unreachable!("major type is 3 bits"),
    }
}

// ============================================================================
// IR -> Value
// ============================================================================

fn ir_to_value(ir: &IrStatement, trusted: bool) -> Value {
    Value::Map(vec![
        ("statement".into(), statement_to_value(&ir.statement, trusted)),
        ("permissions".into(), permissions_to_value(&ir.permissions)),
        (
            "obligations".into(),
            Value::Array(ir.obligations.iter().map(obligation_record_to_value).collect()),
        ),
        (
            "proof_blob".into(),
            Value::Tag(TAG_PROOF_BLOB, Box::new(Value::Bytes(ir.proof_blob.clone()))),
        ),
    ])
}

fn statement_to_value(statement: &ValidatedStatement, trusted: bool) -> Value {
    match statement {
        ValidatedStatement::Insert {
            table,
            columns,
            rows,
            rationale,
            actor,
        } => Value::Map(vec![
            ("stmt".into(), Value::Text("insert".into())),
            ("table".into(), Value::Text(table.clone())),
            (
                "columns".into(),
                Value::Array(columns.iter().map(column_to_value).collect()),
            ),
            (
                "rows".into(),
                Value::Array(
                    rows.iter()
                        .map(|row| {
                            Value::Array(row.iter().map(|v| typed_value_to_value(v, trusted)).collect())
                        })
                        .collect(),
                ),
            ),
            (
                "rationale".into(),
                non_empty_to_value(rationale, trusted),
            ),
            (
                "actor".into(),
                Value::opt(actor.as_ref().map(|a| non_empty_to_value(a, trusted))),
            ),
        ]),
        ValidatedStatement::Select {
            table,
            alias,
            columns,
            predicate,
            order_by,
            limit,
            returning_refinement,
        } => Value::Map(vec![
            ("stmt".into(), Value::Text("select".into())),
            ("table".into(), Value::Text(table.clone())),
            (
                "alias".into(),
                Value::opt(alias.as_ref().map(|a| Value::Text(a.clone()))),
            ),
            (
                "columns".into(),
                Value::Array(columns.iter().map(column_to_value).collect()),
            ),
            (
                "predicate".into(),
                Value::opt(predicate.as_ref().map(|p| predicate_to_value(p, trusted))),
            ),
            (
                "order_by".into(),
                Value::Array(order_by.iter().map(order_by_to_value).collect()),
            ),
            ("limit".into(), Value::opt(limit.map(Value::Uint))),
            (
                "returning".into(),
                Value::opt(returning_refinement.as_ref().map(type_expr_to_value)),
            ),
        ]),
        ValidatedStatement::Update {
            table,
            assignments,
            predicate,
            rationale,
        } => Value::Map(vec![
            ("stmt".into(), Value::Text("update".into())),
            ("table".into(), Value::Text(table.clone())),
            (
                "assignments".into(),
                Value::Array(
                    assignments
                        .iter()
                        .map(|(column, value)| {
                            Value::Map(vec![
                                ("column".into(), column_to_value(column)),
                                ("value".into(), typed_value_to_value(value, trusted)),
                            ])
                        })
                        .collect(),
                ),
            ),
            (
                "predicate".into(),
                Value::opt(predicate.as_ref().map(|p| predicate_to_value(p, trusted))),
            ),
            ("rationale".into(), non_empty_to_value(rationale, trusted)),
        ]),
        ValidatedStatement::Delete {
            table,
            predicate,
            rationale,
        } => Value::Map(vec![
            ("stmt".into(), Value::Text("delete".into())),
            ("table".into(), Value::Text(table.clone())),
            ("predicate".into(), predicate_to_value(predicate, trusted)),
            ("rationale".into(), non_empty_to_value(rationale, trusted)),
        ]),
    }
}

fn column_to_value(column: &ValidatedColumn) -> Value {
    Value::Map(vec![
        ("name".into(), Value::Text(column.name.clone())),
        ("type".into(), type_expr_to_value(&column.datatype)),
    ])
}

fn predicate_to_value(predicate: &ValidatedPredicate, trusted: bool) -> Value {
    Value::Map(vec![
        ("column".into(), column_to_value(&predicate.column)),
        ("op".into(), Value::Text(predicate.op.to_string())),
        (
            "value".into(),
            typed_value_to_value(&predicate.value, trusted),
        ),
    ])
}

fn order_by_to_value(order: &OrderBy) -> Value {
    Value::Map(vec![
        ("column".into(), Value::Text(order.column.clone())),
        (
            "dir".into(),
            Value::Text(
                match order.direction {
                    Direction::Ascending => "asc",
                    Direction::Descending => "desc",
                }
                .into(),
            ),
        ),
    ])
}

fn type_expr_to_value(ty: &TypeExpr) -> Value {
    let mut entries = vec![("t".into(), Value::Text(ty.kind().to_string()))];
    match ty {
        TypeExpr::BoundedNat { min, max } => {
            entries.push(("min".into(), Value::Uint(*min)));
            entries.push(("max".into(), Value::Uint(*max)));
        }
        TypeExpr::BoundedInt { min, max } => {
            entries.push(("min".into(), Value::int(*min)));
            entries.push(("max".into(), Value::int(*max)));
        }
        TypeExpr::BoundedFloat { min, max } => {
            entries.push(("min".into(), Value::Float(*min)));
            entries.push(("max".into(), Value::Float(*max)));
        }
        TypeExpr::Vector { elem, len } => {
            entries.push(("elem".into(), type_expr_to_value(elem)));
            entries.push(("len".into(), Value::Uint(*len)));
        }
        TypeExpr::Tracked(elem) => {
            entries.push(("elem".into(), type_expr_to_value(elem)));
        }
        _ => {}
    }
    Value::Map(entries)
}

fn non_empty_to_value(value: &NonEmptyString, trusted: bool) -> Value {
    Value::Tag(
        TAG_NON_EMPTY_STRING,
        Box::new(Value::Map(vec![
            ("value".into(), Value::Text(value.as_str().to_string())),
            ("trusted".into(), Value::Bool(trusted)),
        ])),
    )
}

fn typed_value_to_value(value: &TypedValue, trusted: bool) -> Value {
    let (kind, payload) = match value {
        TypedValue::Nat(n) => ("Nat", Value::Uint(*n)),
        TypedValue::Int(i) => ("Int", Value::int(*i)),
        TypedValue::Str(s) => ("String", Value::Text(s.clone())),
        TypedValue::Bool(b) => ("Bool", Value::Bool(*b)),
        TypedValue::Float(x) => ("Float", Value::Float(*x)),
        TypedValue::Uuid(uuid) => (
            "Uuid",
            Value::Tag(TAG_UUID, Box::new(Value::Bytes(uuid.as_bytes().to_vec()))),
        ),
        TypedValue::Timestamp(ts) => (
            "Timestamp",
            Value::Tag(
                TAG_DATETIME,
                Box::new(Value::Text(ts.format("%Y-%m-%dT%H:%M:%S%.f").to_string())),
            ),
        ),
        TypedValue::Vector(items) => (
            "Vector",
            Value::Array(items.iter().map(|v| typed_value_to_value(v, trusted)).collect()),
        ),
        TypedValue::BoundedNat(b) => (
            "BoundedNat",
            Value::Tag(
                TAG_BOUNDED_NAT,
                Box::new(Value::Map(vec![
                    ("min".into(), Value::Uint(b.min())),
                    ("max".into(), Value::Uint(b.max())),
                    ("value".into(), Value::Uint(b.value())),
                    ("trusted".into(), Value::Bool(trusted)),
                ])),
            ),
        ),
        TypedValue::BoundedInt(b) => (
            "BoundedInt",
            Value::Tag(
                TAG_BOUNDED_INT,
                Box::new(Value::Map(vec![
                    ("min".into(), Value::int(b.min())),
                    ("max".into(), Value::int(b.max())),
                    ("value".into(), Value::int(b.value())),
                    ("trusted".into(), Value::Bool(trusted)),
                ])),
            ),
        ),
        TypedValue::BoundedFloat(b) => (
            "BoundedFloat",
            Value::Tag(
                TAG_BOUNDED_FLOAT,
                Box::new(Value::Map(vec![
                    ("min".into(), Value::Float(b.min())),
                    ("max".into(), Value::Float(b.max())),
                    ("value".into(), Value::Float(b.value())),
                    ("trusted".into(), Value::Bool(trusted)),
                ])),
            ),
        ),
        TypedValue::NonEmpty(s) => ("NonEmptyString", non_empty_to_value(s, trusted)),
        TypedValue::Confidence(c) => (
            "Confidence",
            Value::Tag(
                TAG_CONFIDENCE,
                Box::new(Value::Map(vec![
                    ("value".into(), Value::Float(c.value())),
                    ("trusted".into(), Value::Bool(trusted)),
                ])),
            ),
        ),
        TypedValue::Tracked(tracked) => (
            "Tracked",
            Value::Tag(
                TAG_TRACKED,
                Box::new(Value::Map(vec![
                    (
                        "value".into(),
                        typed_value_to_value(tracked.value(), trusted),
                    ),
                    (
                        "actor".into(),
                        Value::Text(tracked.actor().as_str().to_string()),
                    ),
                    (
                        "rationale".into(),
                        Value::Text(tracked.rationale().as_str().to_string()),
                    ),
                    ("timestamp".into(), Value::Uint(tracked.timestamp())),
                    ("trusted".into(), Value::Bool(trusted)),
                ])),
            ),
        ),
        TypedValue::PromptScores(scores) => (
            "PromptScores",
            Value::Tag(
                TAG_PROMPT_SCORES,
                Box::new(Value::Map(vec![
                    ("provenance".into(), Value::Uint(scores.provenance() as u64)),
                    (
                        "replicability".into(),
                        Value::Uint(scores.replicability() as u64),
                    ),
                    (
                        "objectivity".into(),
                        Value::Uint(scores.objectivity() as u64),
                    ),
                    (
                        "methodology".into(),
                        Value::Uint(scores.methodology() as u64),
                    ),
                    (
                        "publication".into(),
                        Value::Uint(scores.publication() as u64),
                    ),
                    (
                        "transparency".into(),
                        Value::Uint(scores.transparency() as u64),
                    ),
                    ("overall".into(), Value::Uint(scores.overall() as u64)),
                    ("trusted".into(), Value::Bool(trusted)),
                ])),
            ),
        ),
    };
    Value::Map(vec![
        ("k".into(), Value::Text(kind.into())),
        ("v".into(), payload),
    ])
}

fn permissions_to_value(permissions: &PermissionMetadata) -> Value {
    Value::Map(vec![
        (
            "user".into(),
            Value::Tag(
                TAG_UUID,
                Box::new(Value::Bytes(permissions.user_id.as_bytes().to_vec())),
            ),
        ),
        ("role".into(), Value::Text(permissions.role_id.clone())),
        (
            "level".into(),
            Value::Text(
                match permissions.validation_level {
                    ValidationLevel::Strict => "strict",
                    ValidationLevel::Runtime => "runtime",
                }
                .into(),
            ),
        ),
        (
            "allowed".into(),
            Value::Array(
                permissions
                    .allowed_types
                    .iter()
                    .map(|k| Value::Text(k.to_string()))
                    .collect(),
            ),
        ),
        ("ts".into(), Value::Uint(permissions.timestamp)),
    ])
}

fn obligation_record_to_value(record: &ObligationRecord) -> Value {
    Value::Map(vec![
        ("obligation".into(), obligation_to_value(&record.obligation)),
        ("evidence".into(), Value::Text(record.evidence.clone())),
        ("verified".into(), Value::Bool(record.verified)),
    ])
}

fn obligation_to_value(obligation: &ProofObligation) -> Value {
    match obligation {
        ProofObligation::BoundsCheck { min, max, value } => Value::Map(vec![
            ("o".into(), Value::Text("bounds".into())),
            ("min".into(), Value::int128(*min).unwrap_or(Value::Null)),
            ("max".into(), Value::int128(*max).unwrap_or(Value::Null)),
            ("value".into(), Value::int128(*value).unwrap_or(Value::Null)),
        ]),
        ProofObligation::FloatBoundsCheck { min, max, value } => Value::Map(vec![
            ("o".into(), Value::Text("fbounds".into())),
            ("min".into(), Value::Float(*min)),
            ("max".into(), Value::Float(*max)),
            ("value".into(), Value::Float(*value)),
        ]),
        ProofObligation::NonEmpty { value } => Value::Map(vec![
            ("o".into(), Value::Text("nonempty".into())),
            ("value".into(), Value::Text(value.clone())),
        ]),
        ProofObligation::ConstraintCheck { schema_ref, row_ref } => Value::Map(vec![
            ("o".into(), Value::Text("constraint".into())),
            ("schema".into(), Value::Text(schema_ref.clone())),
            ("row".into(), Value::Uint(*row_ref)),
        ]),
        ProofObligation::Custom { predicate_id } => Value::Map(vec![
            ("o".into(), Value::Text("custom".into())),
            ("id".into(), Value::Text(predicate_id.clone())),
        ]),
    }
}

// ============================================================================
// Value -> IR
// ============================================================================

fn ir_from_value(value: &Value, trust: Trust) -> Result<IrStatement> {
    let entries = value.as_map("IR statement")?;
    let statement = statement_from_value(get(entries, "statement", "IR statement")?, trust)?;
    let permissions = permissions_from_value(get(entries, "permissions", "IR statement")?)?;
    let obligations = get(entries, "obligations", "IR statement")?
        .as_array("obligations")?
        .iter()
        .map(obligation_record_from_value)
        .collect::<Result<Vec<_>>>()?;
    let proof_blob = match get(entries, "proof_blob", "IR statement")? {
        Value::Tag(TAG_PROOF_BLOB, inner) => inner.as_bytes("proof blob")?.to_vec(),
        _ => return Err(Error::Codec("proof blob: expected tag 39605".into())),
    };
    Ok(IrStatement {
        statement,
        permissions,
        obligations,
        proof_blob,
    })
}

fn statement_from_value(value: &Value, trust: Trust) -> Result<ValidatedStatement> {
    let entries = value.as_map("statement")?;
    let kind = get(entries, "stmt", "statement")?.as_text("stmt")?;
    let table = get(entries, "table", "statement")?
        .as_text("table")?
        .to_string();

    match kind {
        "insert" => {
            let columns = columns_from_value(get(entries, "columns", "insert")?)?;
            let rows = get(entries, "rows", "insert")?
                .as_array("rows")?
                .iter()
                .map(|row| {
                    row.as_array("row")?
                        .iter()
                        .map(|v| typed_value_from_value(v, trust))
                        .collect::<Result<Vec<_>>>()
                })
                .collect::<Result<Vec<_>>>()?;
            let rationale = non_empty_from_value(get(entries, "rationale", "insert")?, trust)?;
            let actor = get_opt(entries, "actor")
                .map(|v| non_empty_from_value(v, trust))
                .transpose()?;
            Ok(ValidatedStatement::Insert {
                table,
                columns,
                rows,
                rationale,
                actor,
            })
        }
        "select" => {
            let alias = get_opt(entries, "alias")
                .map(|v| v.as_text("alias").map(str::to_string))
                .transpose()?;
            let columns = columns_from_value(get(entries, "columns", "select")?)?;
            let predicate = get_opt(entries, "predicate")
                .map(|v| predicate_from_value(v, trust))
                .transpose()?;
            let order_by = get(entries, "order_by", "select")?
                .as_array("order_by")?
                .iter()
                .map(order_by_from_value)
                .collect::<Result<Vec<_>>>()?;
            let limit = get_opt(entries, "limit")
                .map(|v| v.as_u64("limit"))
                .transpose()?;
            let returning_refinement = get_opt(entries, "returning")
                .map(type_expr_from_value)
                .transpose()?;
            Ok(ValidatedStatement::Select {
                table,
                alias,
                columns,
                predicate,
                order_by,
                limit,
                returning_refinement,
            })
        }
        "update" => {
            let assignments = get(entries, "assignments", "update")?
                .as_array("assignments")?
                .iter()
                .map(|item| {
                    let entry = item.as_map("assignment")?;
                    let column = column_from_value(get(entry, "column", "assignment")?)?;
                    let value = typed_value_from_value(get(entry, "value", "assignment")?, trust)?;
                    Ok((column, value))
                })
                .collect::<Result<Vec<_>>>()?;
            let predicate = get_opt(entries, "predicate")
                .map(|v| predicate_from_value(v, trust))
                .transpose()?;
            let rationale = non_empty_from_value(get(entries, "rationale", "update")?, trust)?;
            Ok(ValidatedStatement::Update {
                table,
                assignments,
                predicate,
                rationale,
            })
        }
        "delete" => {
            let predicate = predicate_from_value(get(entries, "predicate", "delete")?, trust)?;
            let rationale = non_empty_from_value(get(entries, "rationale", "delete")?, trust)?;
            Ok(ValidatedStatement::Delete {
                table,
                predicate,
                rationale,
            })
        }
        other => Err(Error::Codec(format!("unknown statement kind '{}'", other))),
    }
}

fn columns_from_value(value: &Value) -> Result<Vec<ValidatedColumn>> {
    value
        .as_array("columns")?
        .iter()
        .map(column_from_value)
        .collect()
}

fn column_from_value(value: &Value) -> Result<ValidatedColumn> {
    let entries = value.as_map("column")?;
    Ok(ValidatedColumn {
        name: get(entries, "name", "column")?.as_text("name")?.to_string(),
        datatype: type_expr_from_value(get(entries, "type", "column")?)?,
    })
}

fn predicate_from_value(value: &Value, trust: Trust) -> Result<ValidatedPredicate> {
    let entries = value.as_map("predicate")?;
    let op = match get(entries, "op", "predicate")?.as_text("op")? {
        "=" => CompareOp::Equal,
        "!=" => CompareOp::NotEqual,
        "<" => CompareOp::LessThan,
        "<=" => CompareOp::LessOrEqual,
        ">" => CompareOp::GreaterThan,
        ">=" => CompareOp::GreaterOrEqual,
        other => return Err(Error::Codec(format!("unknown operator '{}'", other))),
    };
    Ok(ValidatedPredicate {
        column: column_from_value(get(entries, "column", "predicate")?)?,
        op,
        value: typed_value_from_value(get(entries, "value", "predicate")?, trust)?,
    })
}

fn order_by_from_value(value: &Value) -> Result<OrderBy> {
    let entries = value.as_map("order_by")?;
    let direction = match get(entries, "dir", "order_by")?.as_text("dir")? {
        "asc" => Direction::Ascending,
        "desc" => Direction::Descending,
        other => return Err(Error::Codec(format!("unknown direction '{}'", other))),
    };
    Ok(OrderBy {
        column: get(entries, "column", "order_by")?
            .as_text("column")?
            .to_string(),
        direction,
    })
}

fn type_expr_from_value(value: &Value) -> Result<TypeExpr> {
    let entries = value.as_map("type expression")?;
    let name = get(entries, "t", "type expression")?.as_text("t")?;
    Ok(match name {
        "Nat" => TypeExpr::Nat,
        "Int" => TypeExpr::Int,
        "String" => TypeExpr::String,
        "Bool" => TypeExpr::Bool,
        "Float" => TypeExpr::Float,
        "Uuid" => TypeExpr::Uuid,
        "Timestamp" => TypeExpr::Timestamp,
        "NonEmptyString" => TypeExpr::NonEmptyString,
        "Confidence" => TypeExpr::Confidence,
        "PromptScores" => TypeExpr::PromptScores,
        "BoundedNat" => TypeExpr::bounded_nat(
            get(entries, "min", "BoundedNat")?.as_u64("min")?,
            get(entries, "max", "BoundedNat")?.as_u64("max")?,
        )
        .map_err(|e| Error::Codec(e.to_string()))?,
        "BoundedInt" => TypeExpr::bounded_int(
            get(entries, "min", "BoundedInt")?.as_i64("min")?,
            get(entries, "max", "BoundedInt")?.as_i64("max")?,
        )
        .map_err(|e| Error::Codec(e.to_string()))?,
        "BoundedFloat" => TypeExpr::bounded_float(
            get(entries, "min", "BoundedFloat")?.as_f64("min")?,
            get(entries, "max", "BoundedFloat")?.as_f64("max")?,
        )
        .map_err(|e| Error::Codec(e.to_string()))?,
        "Vector" => TypeExpr::Vector {
            elem: Box::new(type_expr_from_value(get(entries, "elem", "Vector")?)?),
            len: get(entries, "len", "Vector")?.as_u64("len")?,
        },
        "Tracked" => TypeExpr::Tracked(Box::new(type_expr_from_value(get(
            entries, "elem", "Tracked",
        )?)?)),
        other => return Err(Error::Codec(format!("unknown type '{}'", other))),
    })
}

/// Whether a refined-type tag payload may take the constructor-skipping
/// fast path: the decoder must be in [`Trust::Accept`] AND the payload
/// must be marked trusted. A flag forged into externally received bytes
/// is ignored.
fn fast_path(entries: &[(String, Value)], what: &str, trust: Trust) -> Result<bool> {
    let marked = get(entries, "trusted", what)?.as_bool("trusted")?;
    Ok(trust == Trust::Accept && marked)
}

fn non_empty_from_value(value: &Value, trust: Trust) -> Result<NonEmptyString> {
    let inner = match value {
        Value::Tag(TAG_NON_EMPTY_STRING, inner) => inner,
        _ => return Err(Error::Codec("expected NonEmptyString tag".into())),
    };
    let entries = inner.as_map("NonEmptyString")?;
    let text = get(entries, "value", "NonEmptyString")?
        .as_text("value")?
        .to_string();
    if fast_path(entries, "NonEmptyString", trust)? {
        Ok(NonEmptyString::from_trusted(text))
    } else {
        NonEmptyString::new(text).map_err(|e| Error::Codec(e.to_string()))
    }
}

fn typed_value_from_value(value: &Value, trust: Trust) -> Result<TypedValue> {
    let entries = value.as_map("typed value")?;
    let kind = get(entries, "k", "typed value")?.as_text("k")?;
    let payload = get(entries, "v", "typed value")?;

    Ok(match kind {
        "Nat" => TypedValue::Nat(payload.as_u64("Nat")?),
        "Int" => TypedValue::Int(payload.as_i64("Int")?),
        "String" => TypedValue::Str(payload.as_text("String")?.to_string()),
        "Bool" => TypedValue::Bool(payload.as_bool("Bool")?),
        "Float" => TypedValue::Float(payload.as_f64("Float")?),
        "Uuid" => match payload {
            Value::Tag(TAG_UUID, inner) => {
                let bytes = inner.as_bytes("Uuid")?;
                let bytes: [u8; 16] = bytes
                    .try_into()
                    .map_err(|_| Error::Codec("Uuid: expected 16 bytes".into()))?;
                TypedValue::Uuid(uuid::Uuid::from_bytes(bytes))
            }
            _ => return Err(Error::Codec("Uuid: expected tag 37".into())),
        },
        "Timestamp" => match payload {
            Value::Tag(TAG_DATETIME, inner) => {
                let text = inner.as_text("Timestamp")?;
                let ts = chrono::NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
                    .map_err(|e| Error::Codec(format!("Timestamp: {}", e)))?;
                TypedValue::Timestamp(ts)
            }
            _ => return Err(Error::Codec("Timestamp: expected tag 0".into())),
        },
        "Vector" => TypedValue::Vector(
            payload
                .as_array("Vector")?
                .iter()
                .map(|v| typed_value_from_value(v, trust))
                .collect::<Result<Vec<_>>>()?,
        ),
        "BoundedNat" => match payload {
            Value::Tag(TAG_BOUNDED_NAT, inner) => {
                let entries = inner.as_map("BoundedNat")?;
                let min = get(entries, "min", "BoundedNat")?.as_u64("min")?;
                let max = get(entries, "max", "BoundedNat")?.as_u64("max")?;
                let val = get(entries, "value", "BoundedNat")?.as_u64("value")?;
                let bounded = if fast_path(entries, "BoundedNat", trust)? {
                    BoundedNat::from_trusted_parts(min, max, val)
                } else {
                    BoundedNat::new(min, max, val).map_err(|e| Error::Codec(e.to_string()))?
                };
                TypedValue::BoundedNat(bounded)
            }
            _ => return Err(Error::Codec("BoundedNat: expected tag 39600".into())),
        },
        "BoundedInt" => match payload {
            Value::Tag(TAG_BOUNDED_INT, inner) => {
                let entries = inner.as_map("BoundedInt")?;
                let min = get(entries, "min", "BoundedInt")?.as_i64("min")?;
                let max = get(entries, "max", "BoundedInt")?.as_i64("max")?;
                let val = get(entries, "value", "BoundedInt")?.as_i64("value")?;
                let bounded = if fast_path(entries, "BoundedInt", trust)? {
                    BoundedInt::from_trusted_parts(min, max, val)
                } else {
                    BoundedInt::new(min, max, val).map_err(|e| Error::Codec(e.to_string()))?
                };
                TypedValue::BoundedInt(bounded)
            }
            _ => return Err(Error::Codec("BoundedInt: expected tag 39601".into())),
        },
        "BoundedFloat" => match payload {
            Value::Tag(TAG_BOUNDED_FLOAT, inner) => {
                let entries = inner.as_map("BoundedFloat")?;
                let min = get(entries, "min", "BoundedFloat")?.as_f64("min")?;
                let max = get(entries, "max", "BoundedFloat")?.as_f64("max")?;
                let val = get(entries, "value", "BoundedFloat")?.as_f64("value")?;
                let bounded = if fast_path(entries, "BoundedFloat", trust)? {
                    BoundedFloat::from_trusted_parts(min, max, val)
                } else {
                    BoundedFloat::new(min, max, val).map_err(|e| Error::Codec(e.to_string()))?
                };
                TypedValue::BoundedFloat(bounded)
            }
            _ => return Err(Error::Codec("BoundedFloat: expected tag 39607".into())),
        },
        "NonEmptyString" => TypedValue::NonEmpty(non_empty_from_value(payload, trust)?),
        "Confidence" => match payload {
            Value::Tag(TAG_CONFIDENCE, inner) => {
                let entries = inner.as_map("Confidence")?;
                let val = get(entries, "value", "Confidence")?.as_f64("value")?;
                let confidence = if fast_path(entries, "Confidence", trust)? {
                    Confidence::from_trusted(val)
                } else {
                    Confidence::new(val).map_err(|e| Error::Codec(e.to_string()))?
                };
                TypedValue::Confidence(confidence)
            }
            _ => return Err(Error::Codec("Confidence: expected tag 39603".into())),
        },
        "Tracked" => match payload {
            Value::Tag(TAG_TRACKED, inner) => {
                let entries = inner.as_map("Tracked")?;
                let value = typed_value_from_value(get(entries, "value", "Tracked")?, trust)?;
                let actor_text = get(entries, "actor", "Tracked")?
                    .as_text("actor")?
                    .to_string();
                let rationale_text = get(entries, "rationale", "Tracked")?
                    .as_text("rationale")?
                    .to_string();
                let timestamp = get(entries, "timestamp", "Tracked")?.as_u64("timestamp")?;
                let tracked = if fast_path(entries, "Tracked", trust)? {
                    Tracked::from_trusted_parts(
                        value,
                        ActorId::from_trusted(actor_text),
                        Rationale::from_trusted(rationale_text),
                        timestamp,
                    )
                } else {
                    let actor =
                        ActorId::new(actor_text).map_err(|e| Error::Codec(e.to_string()))?;
                    let rationale =
                        Rationale::new(rationale_text).map_err(|e| Error::Codec(e.to_string()))?;
                    Tracked::new(value, actor, rationale, timestamp)
                        .map_err(|e| Error::Codec(e.to_string()))?
                };
                TypedValue::Tracked(Box::new(tracked))
            }
            _ => return Err(Error::Codec("Tracked: expected tag 39606".into())),
        },
        "PromptScores" => match payload {
            Value::Tag(TAG_PROMPT_SCORES, inner) => {
                let entries = inner.as_map("PromptScores")?;
                let dim = |key: &str| -> Result<u8> {
                    let raw = get(entries, key, "PromptScores")?.as_u64(key)?;
                    u8::try_from(raw)
                        .map_err(|_| Error::Codec(format!("PromptScores {}: out of range", key)))
                };
                let dims = [
                    dim("provenance")?,
                    dim("replicability")?,
                    dim("objectivity")?,
                    dim("methodology")?,
                    dim("publication")?,
                    dim("transparency")?,
                ];
                let overall = dim("overall")?;
                let scores = if fast_path(entries, "PromptScores", trust)? {
                    PromptScores::from_trusted_parts(dims, overall)
                } else {
                    // The untrusted path re-derives the overall and rejects
                    // a forged one.
                    let scores =
                        PromptScores::new(dims[0], dims[1], dims[2], dims[3], dims[4], dims[5])
                            .map_err(|e| Error::Codec(e.to_string()))?;
                    if scores.overall() != overall {
                        return Err(Error::Codec(format!(
                            "PromptScores overall {} does not match derived value {}",
                            overall,
                            scores.overall()
                        )));
                    }
                    scores
                };
                TypedValue::PromptScores(scores)
            }
            _ => return Err(Error::Codec("PromptScores: expected tag 39604".into())),
        },
        other => return Err(Error::Codec(format!("unknown value kind '{}'", other))),
    })
}

fn permissions_from_value(value: &Value) -> Result<PermissionMetadata> {
    let entries = value.as_map("permissions")?;
    let user_id = match get(entries, "user", "permissions")? {
        Value::Tag(TAG_UUID, inner) => {
            let bytes: [u8; 16] = inner
                .as_bytes("user")?
                .try_into()
                .map_err(|_| Error::Codec("user: expected 16 bytes".into()))?;
            uuid::Uuid::from_bytes(bytes)
        }
        _ => return Err(Error::Codec("user: expected tag 37".into())),
    };
    let validation_level = match get(entries, "level", "permissions")?.as_text("level")? {
        "strict" => ValidationLevel::Strict,
        "runtime" => ValidationLevel::Runtime,
        other => return Err(Error::Codec(format!("unknown validation level '{}'", other))),
    };
    let allowed_types = get(entries, "allowed", "permissions")?
        .as_array("allowed")?
        .iter()
        .map(|item| {
            let name = item.as_text("allowed type")?;
            TypeExprKind::from_name(name)
                .ok_or_else(|| Error::Codec(format!("unknown type kind '{}'", name)))
        })
        .collect::<Result<_>>()?;
    Ok(PermissionMetadata {
        user_id,
        role_id: get(entries, "role", "permissions")?
            .as_text("role")?
            .to_string(),
        validation_level,
        allowed_types,
        timestamp: get(entries, "ts", "permissions")?.as_u64("ts")?,
    })
}

fn obligation_record_from_value(value: &Value) -> Result<ObligationRecord> {
    let entries = value.as_map("obligation record")?;
    Ok(ObligationRecord {
        obligation: obligation_from_value(get(entries, "obligation", "obligation record")?)?,
        evidence: get(entries, "evidence", "obligation record")?
            .as_text("evidence")?
            .to_string(),
        verified: get(entries, "verified", "obligation record")?.as_bool("verified")?,
    })
}

fn obligation_from_value(value: &Value) -> Result<ProofObligation> {
    let entries = value.as_map("obligation")?;
    Ok(
        match get(entries, "o", "obligation")?.as_text("o")? {
            "bounds" => ProofObligation::BoundsCheck {
                min: get(entries, "min", "bounds")?.as_i128("min")?,
                max: get(entries, "max", "bounds")?.as_i128("max")?,
                value: get(entries, "value", "bounds")?.as_i128("value")?,
            },
            "fbounds" => ProofObligation::FloatBoundsCheck {
                min: get(entries, "min", "fbounds")?.as_f64("min")?,
                max: get(entries, "max", "fbounds")?.as_f64("max")?,
                value: get(entries, "value", "fbounds")?.as_f64("value")?,
            },
            "nonempty" => ProofObligation::NonEmpty {
                value: get(entries, "value", "nonempty")?
                    .as_text("value")?
                    .to_string(),
            },
            "constraint" => ProofObligation::ConstraintCheck {
                schema_ref: get(entries, "schema", "constraint")?
                    .as_text("schema")?
                    .to_string(),
                row_ref: get(entries, "row", "constraint")?.as_u64("row")?,
            },
            "custom" => ProofObligation::Custom {
                predicate_id: get(entries, "id", "custom")?.as_text("id")?.to_string(),
            },
            other => return Err(Error::Codec(format!("unknown obligation '{}'", other))),
        },
    )
}
