//! JSON Schema validation of tool arguments.
//!
//! Tools advertise an `inputSchema`; arguments are checked against it before
//! a `tools/call` is sent so that obviously wrong calls never reach the
//! server.

use jsonschema::Validator;
use serde_json::{Map, Value};

/// A compiled tool input schema.
pub struct ArgumentValidator {
    validator: Validator,
}

impl std::fmt::Debug for ArgumentValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArgumentValidator").finish_non_exhaustive()
    }
}

impl ArgumentValidator {
    /// Compile a schema. The draft is detected from `$schema`, defaulting to
    /// the latest one the validator knows.
    pub fn compile(schema: &Value) -> Result<Self, String> {
        let validator = jsonschema::validator_for(schema).map_err(|e| e.to_string())?;
        Ok(Self { validator })
    }

    /// Validate `arguments`, collecting every violation.
    pub fn validate(&self, arguments: &Value) -> Result<(), Vec<String>> {
        let errors: Vec<String> = self
            .validator
            .iter_errors(arguments)
            .map(|e| {
                let path = e.instance_path.to_string();
                if path.is_empty() {
                    e.to_string()
                } else {
                    format!("{}: {}", path, e)
                }
            })
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Arguments as sent on the wire: absent or `null` becomes `{}`.
pub fn normalize_arguments(arguments: Option<Value>) -> Value {
    match arguments {
        None | Some(Value::Null) => Value::Object(Map::new()),
        Some(value) => value,
    }
}
