//! Schema validation for the TOML tables that configure each implementation.
//!
//! Every pluggable implementation (signer, chain provider, solver) publishes a
//! [`ConfigSchema`]. The loader and the factories check a table against it
//! before building anything, so misconfiguration is reported with the field
//! path instead of surfacing later as a failed RPC call.

use thiserror::Error;

use crate::address::{is_zero_address, normalize_address};

/// Errors that can occur during configuration validation.
#[derive(Debug, Error)]
pub enum ValidationError {
	#[error("Missing required field: {0}")]
	MissingField(String),
	#[error("Invalid value for field '{field}': {message}")]
	InvalidValue { field: String, message: String },
	#[error("Type mismatch for field '{field}': expected {expected}, got {actual}")]
	TypeMismatch {
		field: String,
		expected: String,
		actual: String,
	},
	#[error("Failed to deserialize config: {0}")]
	DeserializationError(String),
}

impl ValidationError {
	/// Prefixes the field path with the enclosing table name.
	fn nested_in(self, parent: &str) -> Self {
		match self {
			ValidationError::MissingField(f) => {
				ValidationError::MissingField(format!("{parent}.{f}"))
			}
			ValidationError::InvalidValue { field, message } => ValidationError::InvalidValue {
				field: format!("{parent}.{field}"),
				message,
			},
			ValidationError::TypeMismatch {
				field,
				expected,
				actual,
			} => ValidationError::TypeMismatch {
				field: format!("{parent}.{field}"),
				expected,
				actual,
			},
			other => other,
		}
	}
}

/// Type of a configuration field.
#[derive(Debug)]
pub enum FieldType {
	String,
	/// A hex address string that must not normalize to the zero address.
	Address,
	Integer { min: Option<i64>, max: Option<i64> },
	Boolean,
	Array(Box<FieldType>),
	Table(Schema),
}

impl FieldType {
	fn name(&self) -> &'static str {
		match self {
			FieldType::String => "string",
			FieldType::Address => "address",
			FieldType::Integer { .. } => "integer",
			FieldType::Boolean => "boolean",
			FieldType::Array(_) => "array",
			FieldType::Table(_) => "table",
		}
	}
}

pub type FieldValidator = Box<dyn Fn(&toml::Value) -> Result<(), String> + Send + Sync>;

pub struct Field {
	pub name: String,
	pub field_type: FieldType,
	pub validator: Option<FieldValidator>,
}

impl std::fmt::Debug for Field {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Field")
			.field("name", &self.name)
			.field("field_type", &self.field_type)
			.field("validator", &self.validator.is_some())
			.finish()
	}
}

impl Field {
	pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
		Self {
			name: name.into(),
			field_type,
			validator: None,
		}
	}

	pub fn with_validator<F>(mut self, validator: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<(), String> + Send + Sync + 'static,
	{
		self.validator = Some(Box::new(validator));
		self
	}

	fn check(&self, value: &toml::Value) -> Result<(), ValidationError> {
		check_type(&self.name, value, &self.field_type)?;
		if let Some(validator) = &self.validator {
			validator(value).map_err(|message| ValidationError::InvalidValue {
				field: self.name.clone(),
				message,
			})?;
		}
		Ok(())
	}
}

/// Required and optional fields of one table.
#[derive(Debug)]
pub struct Schema {
	pub required: Vec<Field>,
	pub optional: Vec<Field>,
}

impl Schema {
	pub fn new(required: Vec<Field>, optional: Vec<Field>) -> Self {
		Self { required, optional }
	}

	pub fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let table = config
			.as_table()
			.ok_or_else(|| ValidationError::TypeMismatch {
				field: "root".to_string(),
				expected: "table".to_string(),
				actual: config.type_str().to_string(),
			})?;

		for field in &self.required {
			let value = table
				.get(&field.name)
				.ok_or_else(|| ValidationError::MissingField(field.name.clone()))?;
			field.check(value)?;
		}

		for field in &self.optional {
			if let Some(value) = table.get(&field.name) {
				field.check(value)?;
			}
		}

		Ok(())
	}
}

fn mismatch(field: &str, expected: &FieldType, value: &toml::Value) -> ValidationError {
	ValidationError::TypeMismatch {
		field: field.to_string(),
		expected: expected.name().to_string(),
		actual: value.type_str().to_string(),
	}
}

fn check_type(
	field: &str,
	value: &toml::Value,
	expected: &FieldType,
) -> Result<(), ValidationError> {
	match expected {
		FieldType::String => {
			if !value.is_str() {
				return Err(mismatch(field, expected, value));
			}
		}
		FieldType::Address => {
			let raw = value
				.as_str()
				.ok_or_else(|| mismatch(field, expected, value))?;
			if is_zero_address(&normalize_address(raw)) {
				return Err(ValidationError::InvalidValue {
					field: field.to_string(),
					message: format!("'{raw}' is not a valid non-zero address"),
				});
			}
		}
		FieldType::Integer { min, max } => {
			let int_val = value
				.as_integer()
				.ok_or_else(|| mismatch(field, expected, value))?;

			if let Some(min_val) = min {
				if int_val < *min_val {
					return Err(ValidationError::InvalidValue {
						field: field.to_string(),
						message: format!("Value {int_val} is less than minimum {min_val}"),
					});
				}
			}
			if let Some(max_val) = max {
				if int_val > *max_val {
					return Err(ValidationError::InvalidValue {
						field: field.to_string(),
						message: format!("Value {int_val} is greater than maximum {max_val}"),
					});
				}
			}
		}
		FieldType::Boolean => {
			if !value.is_bool() {
				return Err(mismatch(field, expected, value));
			}
		}
		FieldType::Array(inner) => {
			let array = value
				.as_array()
				.ok_or_else(|| mismatch(field, expected, value))?;
			for (i, item) in array.iter().enumerate() {
				check_type(&format!("{field}[{i}]"), item, inner)?;
			}
		}
		FieldType::Table(schema) => {
			schema.validate(value).map_err(|e| e.nested_in(field))?;
		}
	}

	Ok(())
}

/// Validates the configuration table of one implementation.
pub trait ConfigSchema: Send + Sync {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError>;
}

/// Shared validator for hex-encoded 32-byte private keys.
pub fn validate_private_key(value: &toml::Value) -> Result<(), String> {
	let key = value.as_str().unwrap_or_default();
	let key = key.strip_prefix("0x").unwrap_or(key);
	if key.len() != 64 {
		return Err("Private key must be 64 hex characters (32 bytes)".to_string());
	}
	if !key.chars().all(|c| c.is_ascii_hexdigit()) {
		return Err("Private key must be valid hexadecimal".to_string());
	}
	Ok(())
}

/// Shared validator for HTTP endpoints.
pub fn validate_http_url(value: &toml::Value) -> Result<(), String> {
	let url = value.as_str().unwrap_or_default();
	if url.starts_with("http://") || url.starts_with("https://") {
		Ok(())
	} else {
		Err("URL must start with http:// or https://".to_string())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn solver_schema() -> Schema {
		Schema::new(
			vec![Field::new("partner_contract", FieldType::Address)],
			vec![
				Field::new(
					"slippage_bps",
					FieldType::Integer {
						min: Some(0),
						max: Some(10_000),
					},
				),
				Field::new("api_url", FieldType::String).with_validator(validate_http_url),
			],
		)
	}

	fn parse(s: &str) -> toml::Value {
		toml::from_str(s).unwrap()
	}

	#[test]
	fn test_accepts_valid_table() {
		let config = parse(
			r#"
			partner_contract = "0x8ee392a4787397126c163cb9844d7c447da419d8"
			slippage_bps = 50
			api_url = "https://api.cow.fi/optimism"
			"#,
		);
		assert!(solver_schema().validate(&config).is_ok());
	}

	#[test]
	fn test_missing_required_field() {
		let err = solver_schema().validate(&parse("slippage_bps = 1")).unwrap_err();
		assert!(matches!(err, ValidationError::MissingField(f) if f == "partner_contract"));
	}

	#[test]
	fn test_rejects_zero_address() {
		let config = parse(r#"partner_contract = "0x0000000000000000000000000000000000000000""#);
		let err = solver_schema().validate(&config).unwrap_err();
		assert!(matches!(err, ValidationError::InvalidValue { .. }));
	}

	#[test]
	fn test_integer_bounds() {
		let config = parse(
			r#"
			partner_contract = "0x8ee392a4787397126c163cb9844d7c447da419d8"
			slippage_bps = 20000
			"#,
		);
		let err = solver_schema().validate(&config).unwrap_err();
		assert!(err.to_string().contains("greater than maximum"));
	}

	#[test]
	fn test_nested_table_prefixes_field() {
		let schema = Schema::new(
			vec![Field::new(
				"config",
				FieldType::Table(Schema::new(
					vec![Field::new("private_key", FieldType::String)
						.with_validator(validate_private_key)],
					vec![],
				)),
			)],
			vec![],
		);
		let err = schema
			.validate(&parse("[config]\nprivate_key = \"0x1234\""))
			.unwrap_err();
		match err {
			ValidationError::InvalidValue { field, .. } => assert_eq!(field, "config.private_key"),
			other => panic!("unexpected error {other:?}"),
		}
	}
}
