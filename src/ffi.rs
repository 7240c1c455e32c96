//! C-compatible embedding surface
//!
//! Opaque handles over the registry and pipeline for host languages that
//! cannot link Rust directly. Every function is panic-free at the
//! boundary: failures come back as a [`StatusCode`] plus an optional
//! heap-allocated message the caller must free with [`evql_string_free`].
//!
//! Ownership rules: every `*_new` has a matching `*_free`; output buffers
//! from [`evql_compile`] are released with [`evql_bytes_free`]. Passing a
//! null handle returns [`StatusCode::InvalidArg`] rather than crashing.

use std::ffi::{c_char, CStr, CString};
use std::ptr;

use uuid::Uuid;

use crate::error::Error;
use crate::ir::PermissionMetadata;
use crate::parsing::ParseMode;
use crate::pipeline::{Pipeline, PipelineConfig, SerializationFormat};
use crate::registry::SchemaRegistry;
use crate::types::schema::Schema;

/// Result of an FFI call. Stable values; never reorder.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Ok = 0,
    /// Null handle, malformed argument, or unparseable statement text.
    InvalidArg = 1,
    TypeMismatch = 2,
    /// A refinement invariant could not be proven (bounds, non-emptiness).
    ProofFailed = 3,
    PermissionDenied = 4,
    OutOfMemory = 5,
    InternalError = 6,
}

impl StatusCode {
    fn from_error(error: &Error) -> StatusCode {
        match error {
            Error::Lex { .. }
            | Error::Parse(_)
            | Error::ParseAt { .. }
            | Error::MissingRationale(_)
            | Error::MissingWhereOnDelete
            | Error::UnknownTable(_)
            | Error::UnknownColumn { .. } => StatusCode::InvalidArg,
            Error::InvalidTypeExpr(_) | Error::TypeMismatch { .. } => StatusCode::TypeMismatch,
            Error::BoundsViolation { .. }
            | Error::FloatBoundsViolation { .. }
            | Error::EmptyStringViolation(_)
            | Error::InvalidValue(_) => StatusCode::ProofFailed,
            Error::PermissionDenied { .. } => StatusCode::PermissionDenied,
            Error::Codec(_) => StatusCode::InternalError,
        }
    }
}

/// Opaque schema registry handle.
pub struct EvqlRegistry {
    registry: SchemaRegistry,
}

/// Opaque pipeline handle bound to a registry snapshot source.
pub struct EvqlPipeline {
    pipeline: Pipeline,
}

/// Writes an error message to the out-parameter, if provided.
fn set_message(out_message: *mut *mut c_char, message: &str) {
    if out_message.is_null() {
        return;
    }
    // NUL bytes inside the message would truncate it; strip them.
    let sanitized: String = message.chars().filter(|&c| c != '\0').collect();
    let cstring = CString::new(sanitized).unwrap_or_default();
    unsafe { *out_message = cstring.into_raw() };
}

/// Creates an empty schema registry. Free with [`evql_registry_free`].
#[no_mangle]
pub extern "C" fn evql_registry_new() -> *mut EvqlRegistry {
    Box::into_raw(Box::new(EvqlRegistry {
        registry: SchemaRegistry::new(),
    }))
}

/// Registers a schema described as JSON. Replaces any schema with the
/// same table name.
///
/// # Safety
/// `handle` must come from [`evql_registry_new`] and `schema_json` must be
/// a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn evql_registry_register_json(
    handle: *mut EvqlRegistry,
    schema_json: *const c_char,
    out_message: *mut *mut c_char,
) -> StatusCode {
    let Some(registry) = handle.as_ref() else {
        return StatusCode::InvalidArg;
    };
    if schema_json.is_null() {
        return StatusCode::InvalidArg;
    }
    let json = match CStr::from_ptr(schema_json).to_str() {
        Ok(json) => json,
        Err(_) => {
            set_message(out_message, "schema JSON is not valid UTF-8");
            return StatusCode::InvalidArg;
        }
    };
    match serde_json::from_str::<Schema>(json) {
        Ok(schema) => {
            registry.registry.register(schema);
            StatusCode::Ok
        }
        Err(e) => {
            set_message(out_message, &e.to_string());
            StatusCode::InvalidArg
        }
    }
}

/// # Safety
/// `handle` must come from [`evql_registry_new`] and must not be used
/// after this call. Null is a no-op.
#[no_mangle]
pub unsafe extern "C" fn evql_registry_free(handle: *mut EvqlRegistry) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

/// Creates a pipeline with unrestricted permissions for the given role.
/// Free with [`evql_pipeline_free`].
///
/// # Safety
/// `registry` must be a live handle from [`evql_registry_new`]; `role_id`
/// must be a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn evql_pipeline_new(
    registry: *const EvqlRegistry,
    role_id: *const c_char,
    strict: bool,
    timestamp: u64,
) -> *mut EvqlPipeline {
    let Some(registry) = registry.as_ref() else {
        return ptr::null_mut();
    };
    if role_id.is_null() {
        return ptr::null_mut();
    }
    let Ok(role) = CStr::from_ptr(role_id).to_str() else {
        return ptr::null_mut();
    };
    let permissions = PermissionMetadata::unrestricted(Uuid::new_v4(), role, timestamp);
    let mode = if strict {
        ParseMode::Strict
    } else {
        ParseMode::Lenient
    };
    let config = PipelineConfig::new(permissions)
        .with_mode(mode)
        .with_format(SerializationFormat::Cbor);
    Box::into_raw(Box::new(EvqlPipeline {
        pipeline: Pipeline::new(config, registry.registry.clone()),
    }))
}

/// # Safety
/// `handle` must come from [`evql_pipeline_new`] and must not be used
/// after this call. Null is a no-op.
#[no_mangle]
pub unsafe extern "C" fn evql_pipeline_free(handle: *mut EvqlPipeline) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

/// Compiles one statement to encoded IR.
///
/// On success, `*out_bytes`/`*out_len` receive a buffer the caller frees
/// with [`evql_bytes_free`]. On failure, `*out_message` (if non-null)
/// receives a message the caller frees with [`evql_string_free`].
///
/// # Safety
/// `handle` must be a live pipeline; `source` must be a valid
/// NUL-terminated string; `out_bytes` and `out_len` must be valid for
/// writes.
#[no_mangle]
pub unsafe extern "C" fn evql_compile(
    handle: *const EvqlPipeline,
    source: *const c_char,
    out_bytes: *mut *mut u8,
    out_len: *mut usize,
    out_message: *mut *mut c_char,
) -> StatusCode {
    let Some(pipeline) = handle.as_ref() else {
        return StatusCode::InvalidArg;
    };
    if source.is_null() || out_bytes.is_null() || out_len.is_null() {
        return StatusCode::InvalidArg;
    }
    let source = match CStr::from_ptr(source).to_str() {
        Ok(source) => source,
        Err(_) => {
            set_message(out_message, "source is not valid UTF-8");
            return StatusCode::InvalidArg;
        }
    };

    match pipeline.pipeline.run(source) {
        Ok(output) => {
            let mut bytes = output.encoded.into_boxed_slice();
            *out_len = bytes.len();
            *out_bytes = bytes.as_mut_ptr();
            std::mem::forget(bytes);
            StatusCode::Ok
        }
        Err(e) => {
            set_message(out_message, &e.to_string());
            StatusCode::from_error(&e.source)
        }
    }
}

/// # Safety
/// `bytes`/`len` must come from a successful [`evql_compile`] call and
/// must not be used after this call. Null is a no-op.
#[no_mangle]
pub unsafe extern "C" fn evql_bytes_free(bytes: *mut u8, len: usize) {
    if !bytes.is_null() {
        drop(Box::from_raw(ptr::slice_from_raw_parts_mut(bytes, len)));
    }
}

/// # Safety
/// `message` must come from an EVQL out-parameter and must not be used
/// after this call. Null is a no-op.
#[no_mangle]
pub unsafe extern "C" fn evql_string_free(message: *mut c_char) {
    if !message.is_null() {
        drop(CString::from_raw(message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    #[test]
    fn null_handles_are_invalid_arg() {
        let source = CString::new("SELECT * FROM t").unwrap();
        let mut bytes = ptr::null_mut();
        let mut len = 0usize;
        let status = unsafe {
            evql_compile(
                ptr::null(),
                source.as_ptr(),
                &mut bytes,
                &mut len,
                ptr::null_mut(),
            )
        };
        assert_eq!(status, StatusCode::InvalidArg);
    }

    #[test]
    fn compile_round_trip_over_ffi() {
        let registry = evql_registry_new();
        let schema_json = CString::new(
            serde_json::to_string(
                &crate::types::schema::Schema::new(
                    "notes",
                    vec![crate::types::schema::Column::new(
                        "body",
                        crate::types::data_type::TypeExpr::String,
                    )],
                )
                .unwrap(),
            )
            .unwrap(),
        )
        .unwrap();
        let status = unsafe {
            evql_registry_register_json(registry, schema_json.as_ptr(), ptr::null_mut())
        };
        assert_eq!(status, StatusCode::Ok);

        let role = CString::new("tester").unwrap();
        let pipeline = unsafe { evql_pipeline_new(registry, role.as_ptr(), false, 1) };
        assert!(!pipeline.is_null());

        let source = CString::new(
            "INSERT INTO notes (body) VALUES ('hi') RATIONALE 'adding a note'",
        )
        .unwrap();
        let mut bytes = ptr::null_mut();
        let mut len = 0usize;
        let mut message = ptr::null_mut();
        let status = unsafe {
            evql_compile(pipeline, source.as_ptr(), &mut bytes, &mut len, &mut message)
        };
        assert_eq!(status, StatusCode::Ok);
        assert!(len > 0);

        let encoded = unsafe { std::slice::from_raw_parts(bytes, len) };
        assert!(crate::codec::decode(encoded).is_ok());

        unsafe {
            evql_bytes_free(bytes, len);
            evql_pipeline_free(pipeline);
            evql_registry_free(registry);
        }
    }

    #[test]
    fn out_of_bounds_insert_is_a_proof_failure() {
        let registry = evql_registry_new();
        let schema_json = CString::new(
            serde_json::to_string(
                &crate::types::schema::Schema::new(
                    "evidence",
                    vec![crate::types::schema::Column::new(
                        "score",
                        crate::types::data_type::TypeExpr::bounded_nat(0, 100).unwrap(),
                    )],
                )
                .unwrap(),
            )
            .unwrap(),
        )
        .unwrap();
        unsafe { evql_registry_register_json(registry, schema_json.as_ptr(), ptr::null_mut()) };

        let role = CString::new("tester").unwrap();
        let pipeline = unsafe { evql_pipeline_new(registry, role.as_ptr(), false, 1) };
        let source =
            CString::new("INSERT INTO evidence (score) VALUES (150) RATIONALE 'r'").unwrap();
        let mut bytes = ptr::null_mut();
        let mut len = 0usize;
        let status = unsafe {
            evql_compile(
                pipeline,
                source.as_ptr(),
                &mut bytes,
                &mut len,
                ptr::null_mut(),
            )
        };
        assert_eq!(status, StatusCode::ProofFailed);

        unsafe {
            evql_pipeline_free(pipeline);
            evql_registry_free(registry);
        }
    }

    #[test]
    fn parse_failure_reports_status_and_message() {
        let registry = evql_registry_new();
        let role = CString::new("tester").unwrap();
        let pipeline = unsafe { evql_pipeline_new(registry, role.as_ptr(), false, 1) };

        let source = CString::new("DELETE FROM notes RATIONALE 'cleanup'").unwrap();
        let mut bytes = ptr::null_mut();
        let mut len = 0usize;
        let mut message = ptr::null_mut();
        let status = unsafe {
            evql_compile(pipeline, source.as_ptr(), &mut bytes, &mut len, &mut message)
        };
        assert_eq!(status, StatusCode::InvalidArg);
        assert!(!message.is_null());
        let text = unsafe { CStr::from_ptr(message) }.to_str().unwrap();
        assert!(text.contains("WHERE"));

        unsafe {
            evql_string_free(message);
            evql_pipeline_free(pipeline);
            evql_registry_free(registry);
        }
    }
}
