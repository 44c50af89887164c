//! Template documents: an optional YAML header fenced by `---` lines, then a body
//!
//! A missing or unparsable header is not an error; the document is treated as
//! header-less and the whole text becomes the body.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateDocument {
    pub metadata: Map<String, Value>,
    pub body: String,
}

fn frontmatter_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?s)^---[ \t]*\r?\n(.*?)\r?\n---[ \t]*(?:\r?\n(.*))?$")
            .expect("static regex is valid")
    })
}

pub fn parse(content: &str) -> TemplateDocument {
    let headerless = || TemplateDocument {
        metadata: Map::new(),
        body: content.to_string(),
    };

    let Some(captures) = frontmatter_pattern().captures(content) else {
        return headerless();
    };

    let header = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
    let body = captures
        .get(2)
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default();

    match serde_yaml::from_str::<Value>(header) {
        Ok(Value::Object(metadata)) => TemplateDocument { metadata, body },
        Ok(_) => TemplateDocument {
            metadata: Map::new(),
            body,
        },
        Err(err) => {
            debug!(error = %err, "template header is not valid YAML");
            headerless()
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn splits_header_and_trimmed_body() {
        let doc = parse("---\nname: greet\ndescription: Greets\n---\n\nHello, {{name}}\n\n");

        assert_eq!(doc.metadata.get("name"), Some(&json!("greet")));
        assert_eq!(doc.metadata.get("description"), Some(&json!("Greets")));
        assert_eq!(doc.body, "Hello, {{name}}");
    }

    #[test]
    fn parses_argument_sequences() {
        let doc = parse(
            "---\nname: review\ndescription: Reviews code\narguments:\n  - name: language\n    required: true\n---\nReview it.",
        );

        assert_eq!(
            doc.metadata.get("arguments"),
            Some(&json!([{ "name": "language", "required": true }]))
        );
    }

    #[test]
    fn document_without_header_is_all_body() {
        let content = "Just a body\nwith two lines";
        let doc = parse(content);

        assert!(doc.metadata.is_empty());
        assert_eq!(doc.body, content);
    }

    #[test]
    fn invalid_yaml_falls_back_to_whole_document() {
        let content = "---\nname: [unclosed\n---\nBody";
        let doc = parse(content);

        assert!(doc.metadata.is_empty());
        assert_eq!(doc.body, content);
    }

    #[test]
    fn accepts_crlf_and_empty_body() {
        let doc = parse("---\r\nname: x\r\ndescription: y\r\n---");

        assert_eq!(doc.metadata.get("name"), Some(&json!("x")));
        assert_eq!(doc.body, "");
    }

    #[test]
    fn scalar_header_yields_empty_metadata() {
        let doc = parse("---\njust text\n---\nBody");

        assert!(doc.metadata.is_empty());
        assert_eq!(doc.body, "Body");
    }
}
