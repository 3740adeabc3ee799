//! Validation and pretty-printing of generated units.

use crate::{CodegenError, Result};

/// Parse `source` as a Rust file and print it in canonical layout.
///
/// Generated text must always parse; a failure means a template is broken
/// and is reported with the offending text attached.
pub fn format_unit(file_name: &str, source: &str) -> Result<String> {
    match syn::parse_file(source) {
        Ok(tree) => Ok(prettyplease::unparse(&tree)),
        Err(err) => {
            tracing::error!(file = file_name, "generated source does not parse: {err}\n{source}");
            Err(CodegenError::Format {
                file: file_name.to_string(),
                message: err.to_string(),
                source_text: source.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_source_is_reprinted() {
        let out = format_unit("a.proto", "fn   main( ) { let x=1 ; }").expect("formats");
        assert_eq!(out, "fn main() {\n    let x = 1;\n}\n");
    }

    #[test]
    fn broken_source_is_a_format_error() {
        let err = format_unit("a.proto", "fn main( {").expect_err("does not parse");
        assert!(err.is_fatal());
        assert!(matches!(err, CodegenError::Format { ref file, .. } if file == "a.proto"));
    }
}
