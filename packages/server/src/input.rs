//! Gathers action input from the request sources.
//!
//! The body's content type picks a strategy:
//!
//! | content type                          | strategy                                   |
//! |---------------------------------------|--------------------------------------------|
//! | url-encoded, multipart, none          | every source through the form parser       |
//! | `application/json`                    | body as-is, other sources cast per schema  |
//! | `application/octet-stream`            | body staged to a file, other sources form  |
//!
//! Sources are applied in order; later sources win on key collisions. Input
//! is arranged but not validated here; the dispatcher runs the schema after
//! its hooks.

use std::io::Write;

use isoresource_core::{json_to_value, FileHandle, Schema, Source, Value};
use isoresource_form::{arrange, FlatRecord, SchemaArranger};
use tempfile::TempPath;

use crate::config::DispatchConfig;
use crate::error::InputError;
use crate::request::Request;

pub(crate) const INPUT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::input");

/// How the request body is read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BodyStrategy {
    Form,
    Json,
    Octet,
}

impl BodyStrategy {
    pub fn for_request(request: &Request) -> Self {
        match request.content_type().as_deref() {
            Some("application/json") => BodyStrategy::Json,
            Some(essence) if essence.ends_with("+json") => BodyStrategy::Json,
            Some("application/octet-stream") => BodyStrategy::Octet,
            _ => BodyStrategy::Form,
        }
    }
}

/// Deletes files staged for a request when dropped.
///
/// Returned alongside arranged input; keep it alive until the resource method
/// has finished with the staged file.
#[derive(Debug, Default)]
pub struct Cleanup {
    staged: Vec<TempPath>,
}

impl Cleanup {
    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &std::path::Path> {
        self.staged.iter().map(|p| &**p)
    }

    fn stage(&mut self, path: TempPath) {
        self.staged.push(path);
    }
}

impl Drop for Cleanup {
    fn drop(&mut self) {
        for path in self.staged.drain(..) {
            let shown = path.display().to_string();
            match path.close() {
                Ok(()) => tracing::debug!(target: INPUT_TARGET, path = %shown, "removed staged upload"),
                Err(error) => {
                    tracing::warn!(target: INPUT_TARGET, path = %shown, %error, "failed to remove staged upload")
                }
            }
        }
    }
}

/// Arrange the input of one request.
///
/// `sources` is the ordered source list of the action (see
/// [`Source::defaults_for`]). The returned [`Cleanup`] must outlive any use of
/// staged files; it is also dropped, and the files removed, when this
/// function fails part-way.
pub async fn arrange_input(
    request: &Request,
    sources: &[Source],
    schema: &Schema,
    config: &DispatchConfig,
) -> Result<(Value, Cleanup), InputError> {
    let mut cleanup = Cleanup::default();
    let strategy = BodyStrategy::for_request(request);
    tracing::debug!(target: INPUT_TARGET, ?strategy, ?sources, path = %request.path, "arranging input");

    let value = match strategy {
        BodyStrategy::Form => arrange_form(request, sources, schema)?,
        BodyStrategy::Json => arrange_json(request, sources, schema)?,
        BodyStrategy::Octet => {
            let staged = stage_body(request, config, &mut cleanup)?;
            arrange_octet(request, sources, schema, &config.octet_field, staged)?
        }
    };
    Ok((value, cleanup))
}

/// All sources folded into one flat record, then parsed once.
fn arrange_form(request: &Request, sources: &[Source], schema: &Schema) -> Result<Value, InputError> {
    let mut record = FlatRecord::new();
    for source in sources {
        record.overlay(flat_source(request, *source));
    }
    Ok(arrange(&record, &SchemaArranger::new(schema))?)
}

fn arrange_json(request: &Request, sources: &[Source], schema: &Schema) -> Result<Value, InputError> {
    let mut merged = Value::map();
    for source in sources {
        let layer = match source {
            Source::Body if request.body.is_empty() => continue,
            Source::Body => json_to_value(serde_json::from_slice(&request.body)?),
            other => arrange(&flat_source(request, *other), &SchemaArranger::new(schema))?,
        };
        merged.merge(layer);
    }
    Ok(merged)
}

fn arrange_octet(
    request: &Request,
    sources: &[Source],
    schema: &Schema,
    field: &str,
    staged: FileHandle,
) -> Result<Value, InputError> {
    let mut staged = Some(staged);
    let mut merged = Value::map();
    for source in sources {
        let layer = match source {
            Source::Body | Source::Files => match staged.take() {
                Some(file) => Value::object([(field, Value::File(file))]),
                None => continue,
            },
            other => arrange(&flat_source(request, *other), &SchemaArranger::new(schema))?,
        };
        merged.merge(layer);
    }
    Ok(merged)
}

/// One source as flat key/value pairs.
fn flat_source(request: &Request, source: Source) -> FlatRecord {
    match source {
        Source::Query => FlatRecord::from_urlencoded(request.query.as_bytes()),
        Source::Params => request.params.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect(),
        Source::Body => match request.content_type().as_deref() {
            Some("application/x-www-form-urlencoded") => FlatRecord::from_urlencoded(&request.body),
            _ => request.form.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect(),
        },
        Source::Files => request
            .files
            .iter()
            .map(|(k, file)| (k.as_str(), Value::File(file.clone())))
            .collect(),
    }
}

/// Write the raw body to a temp file owned by `cleanup`.
fn stage_body(request: &Request, config: &DispatchConfig, cleanup: &mut Cleanup) -> Result<FileHandle, InputError> {
    let dir = config.staging_dir();
    let mut file = tempfile::Builder::new()
        .prefix("isoresource-upload-")
        .tempfile_in(&dir)?;
    file.write_all(&request.body)?;
    file.flush()?;

    let path = file.into_temp_path();
    let handle = FileHandle {
        path: path.to_path_buf(),
        name: request
            .header("x-file-name")
            .map(str::to_string),
        content_type: Some("application/octet-stream".to_string()),
        size: request.body.len() as u64,
    };
    cleanup.stage(path);
    tracing::debug!(target: INPUT_TARGET, path = %handle.path.display(), size = handle.size, "staged octet-stream body");
    Ok(handle)
}
