//! Front-matter splitting and schema validation.
//!
//! A front-matter block is YAML between two `---` lines at the very start of
//! the document:
//! ```markdown
//! ---
//! desc: An example
//! tags: [a, b]
//! ---
//! # Body starts here
//! ```

use jsonschema::JSONSchema;
use serde_json::{Map, Value};
use tracing::error;

use crate::error::{CmsError, FieldViolation};

const DELIMITER: &str = "---";

/// Parsed metadata and the remaining document body.
#[derive(Debug, Clone, PartialEq)]
pub struct FrontmatterResult {
    pub metadata: Map<String, Value>,
    pub body: String,
}

/// A compiled JSON schema for front-matter.
///
/// Compiled once and only read afterwards, so one instance can be shared by
/// every concurrent validation.
pub struct FrontmatterValidator {
    schema: JSONSchema,
}

impl FrontmatterValidator {
    pub fn compile(schema: &Value) -> Result<Self, CmsError> {
        let schema = JSONSchema::compile(schema).map_err(|e| {
            error!(error = %e, "Front-matter schema failed to compile");
            CmsError::InvalidSchema(e.to_string())
        })?;
        Ok(Self { schema })
    }

    /// Validate `metadata`, collecting every violation rather than stopping at
    /// the first.
    pub fn validate(&self, metadata: &Value) -> Result<(), Vec<FieldViolation>> {
        self.schema.validate(metadata).map_err(|errors| {
            errors
                .map(|err| FieldViolation {
                    instance_path: err.instance_path.to_string(),
                    message: err.to_string(),
                })
                .collect()
        })
    }
}

impl std::fmt::Debug for FrontmatterValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrontmatterValidator").finish_non_exhaustive()
    }
}

/// Split `raw` into the YAML text of its front-matter block (if any) and the
/// body that follows it.
///
/// Without an opening delimiter on the first line, or without a closing one,
/// the whole document is body.
pub fn split_frontmatter(raw: &str) -> (Option<&str>, &str) {
    let text = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    let Some((opener, rest)) = text.split_once('\n') else {
        return (None, raw);
    };
    // delimiter lines may carry trailing whitespace, `\r` included
    if opener.trim_end() != DELIMITER {
        return (None, raw);
    }

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == DELIMITER {
            return (Some(&rest[..offset]), &rest[offset + line.len()..]);
        }
        offset += line.len();
    }
    (None, raw)
}

/// Split `raw` into metadata and body, validating the metadata when a
/// validator is given. `path` only labels errors.
pub fn process(
    path: &str,
    raw: &str,
    validator: Option<&FrontmatterValidator>,
) -> Result<FrontmatterResult, CmsError> {
    let (matter, body) = split_frontmatter(raw);
    let metadata = match matter {
        Some(yaml) if !yaml.trim().is_empty() => parse_metadata(path, yaml)?,
        _ => Map::new(),
    };

    if let Some(validator) = validator {
        let value = Value::Object(metadata.clone());
        if let Err(violations) = validator.validate(&value) {
            error!(path, violations = violations.len(), "Front-matter failed validation");
            return Err(CmsError::FrontmatterValidation {
                path: path.to_string(),
                violations,
            });
        }
    }

    Ok(FrontmatterResult {
        metadata,
        body: body.to_string(),
    })
}

fn parse_metadata(path: &str, yaml: &str) -> Result<Map<String, Value>, CmsError> {
    let value: Value =
        serde_yaml::from_str(yaml).map_err(|source| CmsError::InvalidFrontmatter {
            path: path.to_string(),
            source,
        })?;
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        _ => Err(CmsError::FrontmatterNotAMapping {
            path: path.to_string(),
        }),
    }
}

/// Reassemble a document from metadata and body. Splitting the result yields
/// `body` unchanged.
pub fn render_document(metadata: &Map<String, Value>, body: &str) -> Result<String, serde_yaml::Error> {
    if metadata.is_empty() {
        return Ok(format!("{DELIMITER}\n{DELIMITER}\n{body}"));
    }
    let yaml = serde_yaml::to_string(metadata)?;
    Ok(format!("{DELIMITER}\n{yaml}{DELIMITER}\n{body}"))
}
