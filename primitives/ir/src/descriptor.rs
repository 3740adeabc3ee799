//! Triplegate descriptor model
//!
//! This module defines the descriptor structures consumed by the gateway
//! generator: a set of proto files, each carrying messages, enums and
//! services whose methods expose HTTP bindings.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fully-qualified name of the well-known field mask message.
pub const FIELD_MASK_TYPE: &str = ".google.protobuf.FieldMask";

/// Body selector meaning "the whole request message".
pub const WHOLE_BODY: &str = "*";

/// Errors raised while loading or saving a descriptor set.
#[derive(Debug, Error)]
pub enum IrError {
    /// Filesystem failure
    #[error("descriptor I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Malformed JSON
    #[error("descriptor JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A resolved descriptor set: every file the run knows about.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DescriptorSet {
    /// All files, including imported dependencies
    files: Vec<File>,
    /// Names of the files to generate for; empty means every file
    #[serde(default)]
    targets: Vec<String>,
}

impl DescriptorSet {
    /// Create a descriptor set targeting every file it contains
    pub fn new(files: Vec<File>) -> Self { Self { files, targets: Vec::new() } }

    /// Restrict generation to the named files
    pub fn with_targets(mut self, targets: Vec<String>) -> Self {
        self.targets = targets;
        self
    }

    /// All files in the set
    pub fn files(&self) -> &[File] { &self.files }

    /// Explicit target names, possibly empty
    pub fn target_names(&self) -> &[String] { &self.targets }

    /// Files selected for generation, in descriptor order
    pub fn targets(&self) -> impl Iterator<Item = &File> {
        self.files
            .iter()
            .filter(move |f| self.targets.is_empty() || self.targets.iter().any(|t| t == &f.name))
    }

    /// Look up a file by name
    pub fn get_file(&self, name: &str) -> Option<&File> {
        self.files.iter().find(|f| f.name == name)
    }

    /// Load a descriptor set from a JSON file
    pub fn from_file(path: &Path) -> Result<Self, IrError> {
        let content = std::fs::read_to_string(path)?;
        let set: Self = serde_json::from_str(&content)?;
        Ok(set)
    }

    /// Save the descriptor set to a JSON file with pretty formatting
    pub fn to_file(&self, path: &Path) -> Result<(), IrError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(&mut file, self)?;
        use std::io::Write;
        writeln!(file)?;
        Ok(())
    }
}

/// A single proto file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct File {
    /// File name as given to protoc (e.g. "helloworld/helloworld.proto")
    pub name: String,
    /// Proto package (e.g. "helloworld"); may be empty
    #[serde(default)]
    pub package: String,
    /// Rust module holding the generated message and service types
    pub module: RustModule,
    /// Prefix for generated output files; defaults to the file name without ".proto"
    #[serde(default)]
    pub generated_filename_prefix: Option<String>,
    /// Top-level messages, nested ones flattened with dotted names
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Top-level enums, nested ones flattened with dotted names
    #[serde(default)]
    pub enums: Vec<Enum>,
    /// Services
    #[serde(default)]
    pub services: Vec<Service>,
}

impl File {
    /// Fully-qualified proto name of a type declared in this file
    pub fn qualify(&self, local: &str) -> String {
        if self.package.is_empty() {
            format!(".{local}")
        } else {
            format!(".{}.{}", self.package, local)
        }
    }

    /// Prefix used to name the generated output
    pub fn output_prefix(&self) -> String {
        match &self.generated_filename_prefix {
            Some(prefix) if !prefix.is_empty() => prefix.clone(),
            _ => self.name.strip_suffix(".proto").unwrap_or(&self.name).to_string(),
        }
    }

    /// Whether any method in the file carries at least one HTTP binding
    pub fn has_bindings(&self) -> bool {
        self.services.iter().flat_map(|s| &s.methods).any(|m| !m.bindings.is_empty())
    }
}

/// Location of the Rust types generated for a proto file
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RustModule {
    /// Absolute module path (e.g. "crate::pb::helloworld")
    pub path: String,
    /// Preferred alias when the module is imported (e.g. "helloworld")
    pub name: String,
}

/// A message definition
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Message {
    /// Local name; nested messages use "Outer.Inner"
    pub name: String,
    /// Fields in declaration order
    #[serde(default)]
    pub fields: Vec<Field>,
}

impl Message {
    /// Look up a field by proto name
    pub fn field(&self, name: &str) -> Option<&Field> { self.fields.iter().find(|f| f.name == name) }
}

/// A message field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Proto field name (snake case)
    pub name: String,
    /// Cardinality
    #[serde(default)]
    pub label: Label,
    /// Declared with the proto3 `optional` keyword
    #[serde(default)]
    pub proto3_optional: bool,
    /// Field type
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

impl Field {
    /// Create a singular field
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self { name: name.into(), label: Label::Optional, proto3_optional: false, field_type }
    }

    /// Create a repeated field
    pub fn repeated(name: impl Into<String>, field_type: FieldType) -> Self {
        Self { label: Label::Repeated, ..Self::new(name, field_type) }
    }

    /// Whether the field is repeated
    pub fn is_repeated(&self) -> bool { self.label == Label::Repeated }

    /// Whether the field holds a message
    pub fn is_message(&self) -> bool { matches!(self.field_type, FieldType::Message(_)) }

    /// Whether the field is a `google.protobuf.FieldMask`
    pub fn is_field_mask(&self) -> bool {
        matches!(&self.field_type, FieldType::Message(name) if name == FIELD_MASK_TYPE)
    }

    /// Fully-qualified enum name if the field is enum-typed
    pub fn enum_type(&self) -> Option<&str> {
        match &self.field_type {
            FieldType::Enum(name) => Some(name),
            _ => None,
        }
    }

    /// Fully-qualified message name if the field is message-typed
    pub fn message_type(&self) -> Option<&str> {
        match &self.field_type {
            FieldType::Message(name) => Some(name),
            _ => None,
        }
    }
}

/// Field cardinality
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    /// Singular (proto3 implicit presence or `optional`)
    #[default]
    Optional,
    /// `repeated`
    Repeated,
}

/// Field type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Scalar value
    Scalar(ScalarType),
    /// Enum, by fully-qualified name
    Enum(String),
    /// Message, by fully-qualified name
    Message(String),
}

/// Proto scalar kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum ScalarType {
    Double,
    Float,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Bool,
    String,
    Bytes,
}

impl ScalarType {
    /// Rust type prost generates for this scalar
    pub fn rust_type(self) -> &'static str {
        match self {
            ScalarType::Double => "f64",
            ScalarType::Float => "f32",
            ScalarType::Int32 | ScalarType::Sint32 | ScalarType::Sfixed32 => "i32",
            ScalarType::Int64 | ScalarType::Sint64 | ScalarType::Sfixed64 => "i64",
            ScalarType::Uint32 | ScalarType::Fixed32 => "u32",
            ScalarType::Uint64 | ScalarType::Fixed64 => "u64",
            ScalarType::Bool => "bool",
            ScalarType::String => "String",
            ScalarType::Bytes => "Vec<u8>",
        }
    }
}

/// An enum definition
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Enum {
    /// Local name; nested enums use "Outer.Inner"
    pub name: String,
    /// Values in declaration order
    #[serde(default)]
    pub values: Vec<EnumValue>,
}

impl Enum {
    /// Number for a symbolic value name
    pub fn value(&self, name: &str) -> Option<i32> {
        self.values.iter().find(|v| v.name == name).map(|v| v.number)
    }
}

/// A single enum value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumValue {
    /// Symbolic name
    pub name: String,
    /// Wire number
    pub number: i32,
}

/// An RPC service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Service {
    /// Service name (e.g. "Greeter")
    pub name: String,
    /// Methods in declaration order
    #[serde(default)]
    pub methods: Vec<Method>,
}

/// An RPC method
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Method {
    /// Method name (e.g. "SayHello")
    pub name: String,
    /// Fully-qualified request message name
    pub input_type: String,
    /// Fully-qualified response message name
    pub output_type: String,
    /// Request is a stream
    #[serde(default)]
    pub client_streaming: bool,
    /// Response is a stream
    #[serde(default)]
    pub server_streaming: bool,
    /// HTTP bindings; the index in this list is the binding index
    #[serde(default)]
    pub bindings: Vec<Binding>,
}

/// An HTTP route bound to a method
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    /// HTTP verb
    pub http_method: HttpMethod,
    /// Compiled path template
    pub path_template: PathTemplate,
    /// Body selector: "*" for the whole message, otherwise a dotted field path
    #[serde(default)]
    pub body: Option<String>,
    /// Dotted field path of the sub-field returned as the response body
    #[serde(default)]
    pub response_body: Option<String>,
    /// Dotted field paths captured by the template, in template order
    #[serde(default)]
    pub path_params: Vec<String>,
}

impl Binding {
    /// Create a binding without body or path parameters
    pub fn new(http_method: HttpMethod, path_template: PathTemplate) -> Self {
        Self { http_method, path_template, body: None, response_body: None, path_params: Vec::new() }
    }
}

/// HTTP verbs accepted in bindings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[allow(missing_docs)]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
    Patch,
    Head,
    Options,
}

impl HttpMethod {
    /// Canonical upper-case verb
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Put => "PUT",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

/// A path template compiled by the path-matching collaborator.
///
/// The generator embeds `version`, `op_codes`, `pool` and `verb` verbatim;
/// `template` is the source text used for diagnostics and duplicate checks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathTemplate {
    /// Source template (e.g. "/v1/hello/{name}")
    pub template: String,
    /// Op-code format version
    #[serde(default = "default_template_version")]
    pub version: i32,
    /// Flattened (opcode, operand) pairs
    #[serde(default)]
    pub op_codes: Vec<i32>,
    /// Literal and variable-name pool
    #[serde(default)]
    pub pool: Vec<String>,
    /// Trailing custom verb, empty if none
    #[serde(default)]
    pub verb: String,
}

fn default_template_version() -> i32 { 1 }

impl PathTemplate {
    /// Template with no compiled op codes
    pub fn new(template: impl Into<String>) -> Self {
        Self { template: template.into(), version: default_template_version(), ..Self::default() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_mask_detection() {
        let mask = Field::new("update_mask", FieldType::Message(FIELD_MASK_TYPE.into()));
        let other = Field::new("book", FieldType::Message(".library.Book".into()));
        assert!(mask.is_field_mask());
        assert!(!other.is_field_mask());
    }

    #[test]
    fn output_prefix_strips_extension() {
        let mut file = File { name: "foo/bar.proto".into(), ..File::default() };
        assert_eq!(file.output_prefix(), "foo/bar");
        file.generated_filename_prefix = Some("out/baz".into());
        assert_eq!(file.output_prefix(), "out/baz");
    }

    #[test]
    fn qualify_with_and_without_package() {
        let file = File { package: "helloworld".into(), ..File::default() };
        assert_eq!(file.qualify("HelloRequest"), ".helloworld.HelloRequest");
        let bare = File::default();
        assert_eq!(bare.qualify("Ping"), ".Ping");
    }

    #[test]
    fn field_type_json_shape() {
        let json = r#"{"name":"kind","label":"repeated","type":{"enum":".pkg.Kind"}}"#;
        let field: Field = serde_json::from_str(json).expect("parse field");
        assert!(field.is_repeated());
        assert_eq!(field.enum_type(), Some(".pkg.Kind"));

        let json = r#"{"name":"id","type":{"scalar":"int64"}}"#;
        let field: Field = serde_json::from_str(json).expect("parse field");
        assert_eq!(field.field_type, FieldType::Scalar(ScalarType::Int64));
        assert_eq!(ScalarType::Int64.rust_type(), "i64");
    }
}
