use crate::foundation::error::ProgramError;
use crate::program::host::ProgramMetadata;
use serde::Deserialize;
use std::sync::Arc;

/// Largest number of units a single `shuffle` node may permute.
pub const MAX_SHUFFLE_UNITS: u64 = 1 << 24;

/// Parsed declarative program.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProgramDoc {
    /// Program name, version and free-form fields.
    #[serde(default)]
    pub metadata: ProgramMetadata,
    /// Integrity flash settings; no flashes when absent.
    #[serde(default)]
    pub integrity: Option<IntegrityDef>,
    /// Child nodes.
    pub body: Arc<[NodeDef]>,
}

/// Periodic integrity flash settings.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IntegrityDef {
    /// Program time between flashes.
    pub every_secs: f64,
}

/// One node of a program body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "lowercase", deny_unknown_fields)]
pub enum NodeDef {
    /// A stimulus template; expressions are resolved at yield time.
    Stimulus(serde_json::Value),
    /// Children sharing metadata.
    Group(GroupDef),
    /// Children repeated in order.
    Repeat(RepeatDef),
    /// Children repeated once per bound value.
    For(ForDef),
    /// Children repeated, then presented in seeded random order.
    Shuffle(RepeatDef),
}

/// Body of a `group` node.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupDef {
    /// Evaluated once on entry and merged into every descendant stimulus.
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    /// Child nodes.
    pub body: Arc<[NodeDef]>,
}

/// Body of a `repeat` or `shuffle` node.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepeatDef {
    /// Repetitions; defaults to one.
    #[serde(default = "one")]
    pub times: u64,
    /// Child nodes.
    pub body: Arc<[NodeDef]>,
}

/// Body of a `for` node.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ForDef {
    /// Variable bound in the body.
    pub var: String,
    /// Values bound in turn; each is resolved once per iteration.
    pub values: Arc<[serde_json::Value]>,
    /// Child nodes.
    pub body: Arc<[NodeDef]>,
}

fn one() -> u64 {
    1
}

impl NodeDef {
    /// Key naming the node kind, used in error paths.
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Stimulus(_) => "stimulus",
            Self::Group(_) => "group",
            Self::Repeat(_) => "repeat",
            Self::For(_) => "for",
            Self::Shuffle(_) => "shuffle",
        }
    }
}

impl ProgramDoc {
    /// Parse program text. Malformed JSON or unknown node shapes are syntax errors.
    pub fn parse(source: &str) -> Result<Self, ProgramError> {
        let doc: Self = serde_json::from_str(source).map_err(|e| {
            ProgramError::new(
                "SyntaxError",
                e.to_string(),
                format!("<program>:{}:{}", e.line(), e.column()),
            )
        })?;
        doc.validate()?;
        Ok(doc)
    }

    fn validate(&self) -> Result<(), ProgramError> {
        if let Some(integrity) = self.integrity
            && !(integrity.every_secs.is_finite() && integrity.every_secs > 0.0)
        {
            return Err(ProgramError::new(
                "RangeError",
                format!(
                    "integrity.every_secs must be a positive number (got {})",
                    integrity.every_secs
                ),
                "integrity.every_secs",
            ));
        }
        validate_body(&self.body, "body")
    }
}

fn validate_body(body: &[NodeDef], path: &str) -> Result<(), ProgramError> {
    for (i, node) in body.iter().enumerate() {
        let here = format!("{path}[{i}].{}", node.keyword());
        match node {
            NodeDef::Stimulus(t) => {
                if !t.is_object() {
                    return Err(ProgramError::new(
                        "TypeError",
                        "stimulus template must be an object",
                        here,
                    ));
                }
            }
            NodeDef::Group(g) => validate_body(&g.body, &format!("{here}.body"))?,
            NodeDef::Repeat(r) => validate_body(&r.body, &format!("{here}.body"))?,
            NodeDef::For(f) => {
                if f.var.is_empty() {
                    return Err(ProgramError::new(
                        "SyntaxError",
                        "for.var must be a non-empty name",
                        format!("{here}.var"),
                    ));
                }
                validate_body(&f.body, &format!("{here}.body"))?;
            }
            NodeDef::Shuffle(s) => {
                let units = s.times.checked_mul(s.body.len() as u64);
                if units.is_none_or(|u| u > MAX_SHUFFLE_UNITS) {
                    return Err(ProgramError::new(
                        "RangeError",
                        format!("shuffle may permute at most {MAX_SHUFFLE_UNITS} units"),
                        here,
                    ));
                }
                validate_body(&s.body, &format!("{here}.body"))?;
            }
        }
    }
    Ok(())
}
