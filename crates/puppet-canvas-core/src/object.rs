//! Dynamic object model for the renderer-side object graph
//!
//! The executor knows nothing about canvases. It walks paths and invokes
//! methods through [`ScriptObject`], which a renderer implements for its real
//! in-page objects (canvas element, 2d context, image elements, ...).

use crate::error::{Error, Result};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// A value flowing through the executor.
///
/// `Data` is JSON-safe and crosses the transport boundary unchanged;
/// `Object` must stay resident in the renderer and travels as a reference.
#[derive(Clone)]
pub enum ScriptValue {
    Data(Value),
    Object(Arc<dyn ScriptObject>),
}

impl ScriptValue {
    pub fn null() -> Self {
        ScriptValue::Data(Value::Null)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ScriptValue::Data(Value::Null))
    }

    pub fn as_object(&self) -> Option<&Arc<dyn ScriptObject>> {
        match self {
            ScriptValue::Object(obj) => Some(obj),
            ScriptValue::Data(_) => None,
        }
    }

    pub fn as_data(&self) -> Option<&Value> {
        match self {
            ScriptValue::Data(value) => Some(value),
            ScriptValue::Object(_) => None,
        }
    }
}

impl fmt::Debug for ScriptValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptValue::Data(value) => write!(f, "Data({})", value),
            ScriptValue::Object(obj) => write!(f, "Object({})", obj.type_name()),
        }
    }
}

impl From<Value> for ScriptValue {
    fn from(value: Value) -> Self {
        ScriptValue::Data(value)
    }
}

impl From<Arc<dyn ScriptObject>> for ScriptValue {
    fn from(object: Arc<dyn ScriptObject>) -> Self {
        ScriptValue::Object(object)
    }
}

/// A live object inside the renderer the executor can operate on.
///
/// Implementations run on the executor's single cooperative loop; methods are
/// expected to complete without blocking on the controller.
pub trait ScriptObject: Send + Sync {
    /// Property read. `None` when the property does not exist, which
    /// short-circuits path resolution to nothing.
    fn get(&self, prop: &str) -> Option<ScriptValue>;

    /// Property write.
    fn set(&self, prop: &str, value: ScriptValue) -> Result<()> {
        let _ = value;
        Err(Error::Script(format!(
            "cannot set '{}' on {}",
            prop,
            self.type_name()
        )))
    }

    /// Invoke `method` with this object as the receiver.
    fn call(&self, method: &str, args: Vec<ScriptValue>) -> Result<ScriptValue> {
        let _ = args;
        Err(Error::NotCallable(format!(
            "{}.{}",
            self.type_name(),
            method
        )))
    }

    /// Name used in error messages and logs.
    fn type_name(&self) -> &str {
        "Object"
    }
}
