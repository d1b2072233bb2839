//! Resolution of a field's argument values from the AST and the request's
//! variable bindings, for handing to computed fetch requirements.

use crate::JsonMap;
use crate::JsonValue;
use apollo_compiler::ast::Value;
use apollo_compiler::executable::Field;
use apollo_compiler::schema::FieldDefinition;
use apollo_compiler::Name;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputCoercionError {
    #[error("int value overflow in argument `{name}`")]
    IntOverflow { name: Name },
    #[error("float value overflow in argument `{name}`")]
    FloatOverflow { name: Name },
    #[error("variable `{variable}` used in the default value of argument `{name}`")]
    VariableInDefault { name: Name, variable: Name },
    #[error("missing value for required argument `{name}`")]
    MissingRequiredArgument { name: Name },
}

/// Resolves the argument values of one field selection against the field's
/// definition: explicit values are converted to JSON with variables
/// substituted from `variables`, absent or unbound arguments fall back to
/// the definition's default.
///
/// Arguments that end up with no value at all are left out of the map.
pub fn coerce_argument_values(
    field_def: &FieldDefinition,
    field: &Field,
    variables: &JsonMap,
) -> Result<JsonMap, InputCoercionError> {
    let mut coerced = JsonMap::with_capacity(field_def.arguments.len());
    for arg_def in &field_def.arguments {
        let name = &arg_def.name;
        let provided = field
            .arguments
            .iter()
            .find(|arg| arg.name == *name)
            .map(|arg| &arg.value);
        let unbound_variable = match provided {
            Some(value) => match value.as_ref() {
                Value::Variable(variable) => variables.get(variable.as_str()).is_none(),
                _ => false,
            },
            None => false,
        };
        match provided {
            Some(value) if !unbound_variable => {
                coerced.insert(
                    name.as_str(),
                    graphql_value_to_json(name, value, Some(variables))?,
                );
            }
            _ => match &arg_def.default_value {
                Some(default) => {
                    coerced.insert(name.as_str(), graphql_value_to_json(name, default, None)?);
                }
                None if arg_def.ty.is_non_null() => {
                    return Err(InputCoercionError::MissingRequiredArgument {
                        name: name.clone(),
                    })
                }
                None => {}
            },
        }
    }
    Ok(coerced)
}

/// `variables: None` marks a default-value position, where a variable
/// reference is invalid rather than merely unbound.
fn graphql_value_to_json(
    name: &Name,
    value: &Value,
    variables: Option<&JsonMap>,
) -> Result<JsonValue, InputCoercionError> {
    match value {
        Value::Null => Ok(JsonValue::Null),
        Value::Variable(variable) => match variables {
            Some(variables) => Ok(variables
                .get(variable.as_str())
                .cloned()
                .unwrap_or(JsonValue::Null)),
            None => Err(InputCoercionError::VariableInDefault {
                name: name.clone(),
                variable: variable.clone(),
            }),
        },
        Value::Enum(value) => Ok(value.as_str().into()),
        Value::String(value) => Ok(value.as_str().into()),
        Value::Boolean(value) => Ok((*value).into()),
        Value::Int(value) => Ok(JsonValue::Number(value.as_str().parse().map_err(|_| {
            InputCoercionError::IntOverflow { name: name.clone() }
        })?)),
        Value::Float(value) => Ok(JsonValue::Number(value.as_str().parse().map_err(|_| {
            InputCoercionError::FloatOverflow { name: name.clone() }
        })?)),
        Value::List(values) => values
            .iter()
            .map(|value| graphql_value_to_json(name, value, variables))
            .collect(),
        Value::Object(fields) => fields
            .iter()
            .map(|(key, value)| {
                Ok((
                    key.as_str(),
                    graphql_value_to_json(name, value, variables)?,
                ))
            })
            .collect(),
    }
}
