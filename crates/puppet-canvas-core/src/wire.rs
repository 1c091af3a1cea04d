//! Wire protocol shared by the controller and the renderer executor
//!
//! Frames are length-prefixed JSON (see [`crate::transport`]). A request
//! carries a correlation `id`, a `method` name and JSON `params`; the matching
//! response carries the same `id` and either a `result` or an `error` payload.
//! Frames without an `id` are events (renderer console output and the like)
//! and are logged rather than correlated.
//!
//! The interesting part of the protocol is the `"op"` method: a GET/SET/APPLY
//! instruction executed against a live object graph inside the renderer.
//! Objects never cross the boundary; a result that is not plain data comes
//! back as a [`Reference`] marker pointing into the root's reference table.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Identifier of an attached root object (e.g. one canvas element).
///
/// Allocated by the executor when the root is adopted; selects the reference
/// table every subsequent operation resolves against.
pub type RootId = u64;

/// Marker tag distinguishing a [`Reference`] from ordinary object data.
pub const REFERENCE_TAG: &str = "_deferred_";

/// One remote access, relative to a root object or a previously exported
/// reference.
///
/// Wire shape: `{"type": "GET"|"SET"|"APPLY", "path": [...], ...}`.
/// `value` and `args` may contain [`Reference`] markers in place of live
/// objects.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum Op {
    /// Read the value at `path`.
    Get { path: Vec<String> },
    /// Assign `value` to the last segment of `path` on its parent.
    Set { path: Vec<String>, value: Value },
    /// Invoke the callable at `path` with the parent as receiver.
    Apply { path: Vec<String>, args: Vec<Value> },
}

impl Op {
    /// The accessed property path.
    pub fn path(&self) -> &[String] {
        match self {
            Op::Get { path } | Op::Set { path, .. } | Op::Apply { path, .. } => path,
        }
    }
}

/// Serializable stand-in for a live object retained in a reference table.
///
/// Never carries the object's data; the `id` is only meaningful to the table
/// it was minted from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    #[serde(rename = "type")]
    kind: String,
    pub id: String,
}

impl Reference {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            kind: REFERENCE_TAG.to_string(),
            id: id.into(),
        }
    }

    /// Encode as the wire marker `{"type": "_deferred_", "id": ...}`.
    pub fn to_value(&self) -> Value {
        json!({ "type": REFERENCE_TAG, "id": self.id })
    }

    /// Detect a reference marker inside a JSON value.
    ///
    /// Returns `None` for everything that is not an object carrying the
    /// `_deferred_` tag, so plain data passes through untouched.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        if obj.get("type")?.as_str()? != REFERENCE_TAG {
            return None;
        }
        Some(Reference::new(obj.get("id")?.as_str()?))
    }
}

/// Parameters of the `"op"` request method.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpParams {
    /// Root whose reference table the operation resolves against.
    pub root: RootId,
    /// Backing reference id for ops issued on a derived stand-in. `None`
    /// targets the root object itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    pub op: Op,
}

/// Parameters of the `"createCanvas"` request method.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCanvasParams {
    pub width: u32,
    pub height: u32,
}

/// Parameters of the `"releaseCanvas"` request method.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseParams {
    pub root: RootId,
}

/// Parameters of the `"screenshot"` request method.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenshotParams {
    pub root: RootId,
    #[serde(default)]
    pub options: Value,
}

/// Parameters of the `"loadFont"` request method.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadFontParams {
    pub root: RootId,
    pub name: String,
    pub url: String,
}

/// Parameters of the `"loadImage"` request method.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadImageParams {
    pub root: RootId,
    pub url: String,
}

/// Request frame sent from the controller to the executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Unique request id for correlating responses
    pub id: u32,
    /// Method name (`"op"`, `"createCanvas"`, `"releaseCanvas"`,
    /// `"screenshot"`, `"loadFont"`, `"loadImage"`)
    pub method: String,
    /// Method parameters as JSON
    pub params: Value,
}

/// Response frame sent from the executor back to the controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Request id this response correlates to
    pub id: u32,
    /// Success result (mutually exclusive with `error`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error result (mutually exclusive with `result`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorWrapper>,
}

/// Wrapper for the error payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorWrapper {
    pub error: ErrorPayload,
}

/// Error details carried on the wire
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Human-readable message
    pub message: String,
    /// Stable error name (e.g. "PathError", "UnknownRootError")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Unsolicited frame from the renderer (no correlation id).
///
/// The controller logs these; they are not part of the op protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// Discriminated union of incoming frames on the controller side.
///
/// Distinguished by the presence of the `id` field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
    /// Response frame (has `id`)
    Response(Response),
    /// Event frame (no `id`)
    Event(Event),
}
