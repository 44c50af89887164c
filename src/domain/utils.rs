//! Domain-specific shared normalization helpers

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

pub const DIRECTORY_MIME_TYPE: &str = "inode/directory";
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

const MIME_TYPES: [(&str, &str); 31] = [
    ("txt", "text/plain"),
    ("md", "text/markdown"),
    ("json", "application/json"),
    ("xml", "application/xml"),
    ("html", "text/html"),
    ("htm", "text/html"),
    ("css", "text/css"),
    ("js", "text/javascript"),
    ("php", "text/x-php"),
    ("py", "text/x-python"),
    ("java", "text/x-java"),
    ("c", "text/x-c"),
    ("cpp", "text/x-c++"),
    ("h", "text/x-c"),
    ("sh", "text/x-shellscript"),
    ("sql", "text/x-sql"),
    ("log", "text/plain"),
    ("csv", "text/csv"),
    ("yaml", "text/yaml"),
    ("yml", "text/yaml"),
    ("ini", "text/plain"),
    ("conf", "text/plain"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("svg", "image/svg+xml"),
    ("pdf", "application/pdf"),
    ("zip", "application/zip"),
    ("tar", "application/x-tar"),
    ("gz", "application/gzip"),
];

/// Maps a file extension (case-insensitive) to a MIME type.
pub fn mime_type_for(path: &Path) -> &'static str {
    let Some(extension) = path.extension().and_then(|ext| ext.to_str()) else {
        return DEFAULT_MIME_TYPE;
    };

    let extension = extension.to_ascii_lowercase();
    MIME_TYPES
        .iter()
        .find(|(known, _)| *known == extension)
        .map(|(_, mime)| *mime)
        .unwrap_or(DEFAULT_MIME_TYPE)
}

pub fn is_text_family(mime_type: &str) -> bool {
    mime_type.starts_with("text/")
}

/// Types returned inline as `text` by `resources/read`; everything else is a base64 blob.
pub fn is_inline_text(mime_type: &str) -> bool {
    is_text_family(mime_type) || matches!(mime_type, "application/json" | "application/xml")
}

/// Dot-prefixed file or directory name.
pub fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with('.'))
}

fn camel_boundary() -> &'static Regex {
    static BOUNDARY: OnceLock<Regex> = OnceLock::new();
    BOUNDARY.get_or_init(|| Regex::new(r"([a-z])([A-Z])").expect("static regex is valid"))
}

/// `ClassName` -> `class_name`, `doThing` -> `do_thing`. Only lower-to-upper boundaries split.
pub fn to_snake_case(value: &str) -> String {
    camel_boundary()
        .replace_all(value, "${1}_${2}")
        .to_lowercase()
}

/// Derives `<source>_<function>` with a trailing `Tools` stripped from the source name.
pub fn tool_name(source: &str, function: &str) -> String {
    let short = source.rsplit("::").next().unwrap_or(source);
    let short = short.strip_suffix("Tools").unwrap_or(short);
    format!("{}_{}", to_snake_case(short), to_snake_case(function))
}

/// Collapses a declared type name onto the JSON Schema primitives. Unknown types become `string`.
pub fn normalize_type(type_name: &str) -> &'static str {
    match type_name.trim().to_ascii_lowercase().as_str() {
        "int" | "integer" | "i8" | "i16" | "i32" | "i64" | "u8" | "u16" | "u32" | "u64"
        | "usize" | "isize" => "integer",
        "float" | "double" | "number" | "f32" | "f64" => "number",
        "bool" | "boolean" => "boolean",
        "array" | "list" | "vec" => "array",
        "object" | "map" => "object",
        _ => "string",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_extensions() {
        assert_eq!(mime_type_for(Path::new("notes/readme.MD")), "text/markdown");
        assert_eq!(mime_type_for(Path::new("data.json")), "application/json");
        assert_eq!(mime_type_for(Path::new("photo.jpeg")), "image/jpeg");
    }

    #[test]
    fn unknown_or_missing_extension_is_binary() {
        assert_eq!(mime_type_for(Path::new("archive.7z")), DEFAULT_MIME_TYPE);
        assert_eq!(mime_type_for(Path::new("Makefile")), DEFAULT_MIME_TYPE);
    }

    #[test]
    fn inline_text_covers_json_and_xml() {
        assert!(is_inline_text("text/csv"));
        assert!(is_inline_text("application/json"));
        assert!(is_inline_text("application/xml"));
        assert!(!is_inline_text("image/png"));
        assert!(!is_text_family("application/json"));
    }

    #[test]
    fn derives_tool_names() {
        assert_eq!(tool_name("ClassNameTools", "doThing"), "class_name_do_thing");
        assert_eq!(tool_name("app::tools::MathTools", "add"), "math_add");
        assert_eq!(tool_name("Weather", "currentTemp"), "weather_current_temp");
    }

    #[test]
    fn normalizes_types() {
        assert_eq!(normalize_type("int"), "integer");
        assert_eq!(normalize_type(" Float "), "number");
        assert_eq!(normalize_type("bool"), "boolean");
        assert_eq!(normalize_type("mixed"), "string");
        assert_eq!(normalize_type("SomeClass"), "string");
    }
}
