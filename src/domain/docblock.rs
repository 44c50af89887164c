//! Structured documentation block parser
//!
//! Grammar: free-text description lines, then tagged lines.
//!
//! ```text
//! /**
//!  * Adds two numbers.
//!  *
//!  * @param int $a first operand
//!  * @param int $b second operand
//!  * @return int the sum
//!  */
//! ```
//!
//! The comment markers (`/**`, `*/`, leading `*`) are optional.

use std::sync::OnceLock;

use regex::Regex;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocBlock {
    pub description: String,
    pub params: Vec<ParamTag>,
    pub returns: Option<ReturnTag>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamTag {
    pub type_name: String,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnTag {
    pub type_name: String,
    pub description: String,
}

impl DocBlock {
    pub fn param(&self, name: &str) -> Option<&ParamTag> {
        self.params.iter().find(|tag| tag.name == name)
    }
}

fn param_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^@param\s+(\S+)\s+\$?([A-Za-z_][A-Za-z0-9_]*)(?:\s+(.*))?$")
            .expect("static regex is valid")
    })
}

fn return_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^@return\s+(\S+)(?:\s+(.*))?$").expect("static regex is valid")
    })
}

pub fn parse(doc: &str) -> DocBlock {
    let lines = doc.lines().map(strip_markers).collect::<Vec<_>>();

    let description = lines
        .iter()
        .take_while(|line| !line.starts_with('@'))
        .filter(|line| !line.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ");

    let mut params = Vec::new();
    let mut returns = None;
    for line in lines.iter().filter(|line| line.starts_with('@')) {
        if let Some(captures) = param_pattern().captures(line) {
            params.push(ParamTag {
                type_name: captures[1].to_string(),
                name: captures[2].to_string(),
                description: captures
                    .get(3)
                    .map(|m| m.as_str().trim().to_string())
                    .unwrap_or_default(),
            });
        } else if returns.is_none() {
            if let Some(captures) = return_pattern().captures(line) {
                returns = Some(ReturnTag {
                    type_name: captures[1].to_string(),
                    description: captures
                        .get(2)
                        .map(|m| m.as_str().trim().to_string())
                        .unwrap_or_default(),
                });
            }
        }
    }

    DocBlock {
        description,
        params,
        returns,
    }
}

fn strip_markers(line: &str) -> &str {
    let line = line.trim();
    let line = line.strip_prefix("/**").unwrap_or(line);
    let line = line.strip_suffix("*/").unwrap_or(line);
    let line = line.trim();
    line.strip_prefix('*').unwrap_or(line).trim()
}
