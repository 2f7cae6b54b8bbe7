//! Protocol calls: the unit of communication with the consumer.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One outbound protocol call: a method name and its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    /// Method to invoke on the consumer.
    pub method: String,
    /// Parameters object.
    pub params: Value,
}

impl Call {
    /// Create a new call.
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }
}

/// Anything a call builder may return.
///
/// Builders emit either one call for a whole batch of records or one call
/// per record; both flatten into the same ordered list.
pub trait IntoCalls {
    fn into_calls(self) -> Vec<Call>;
}

impl IntoCalls for Call {
    fn into_calls(self) -> Vec<Call> {
        vec![self]
    }
}

impl IntoCalls for Vec<Call> {
    fn into_calls(self) -> Vec<Call> {
        self
    }
}

impl IntoCalls for Option<Call> {
    fn into_calls(self) -> Vec<Call> {
        self.into_iter().collect()
    }
}
