use ir::{DescriptorSet, FieldType};
use registry::{DescriptorLookup, Registry, RegistryError, Separator};

fn library() -> DescriptorSet {
    serde_json::from_str(
        r#"{
          "files": [{
            "name": "library.proto",
            "package": "library",
            "module": { "path": "crate::pb::library", "name": "library" },
            "messages": [
              { "name": "Book", "fields": [
                { "name": "name", "type": { "scalar": "string" } },
                { "name": "shelf", "type": { "message": ".library.Shelf" } },
                { "name": "tags", "label": "repeated", "type": { "message": ".library.Tag" } },
                { "name": "genre", "type": { "enum": ".library.Genre" } }
              ]},
              { "name": "Shelf", "fields": [ { "name": "id", "type": { "scalar": "int64" } } ] },
              { "name": "Tag", "fields": [ { "name": "label", "type": { "scalar": "string" } } ] }
            ],
            "enums": [
              { "name": "Genre", "values": [ { "name": "GENRE_UNSPECIFIED", "number": 0 }, { "name": "POETRY", "number": 1 } ] }
            ]
          }]
        }"#,
    )
    .expect("valid descriptor json")
}

#[test]
fn test_lookup_by_fully_qualified_name() {
    let registry = Registry::load(&library()).expect("load");
    assert_eq!(registry.message_count(), 3);
    assert_eq!(registry.enum_count(), 1);

    let book = registry.lookup_message(".library.Book").expect("book");
    assert_eq!(book.local_name, "Book");
    assert_eq!(book.module.name, "library");

    let genre = registry.lookup_enum(".library.Genre").expect("genre");
    assert_eq!(genre.definition.value("POETRY"), Some(1));

    assert_eq!(
        registry.lookup_enum(".library.Missing").map(|e| e.fqn.clone()),
        Err(RegistryError::UnknownEnum(".library.Missing".into()))
    );
}

#[test]
fn test_resolve_nested_field_path() {
    let registry = Registry::load(&library()).expect("load");
    let path = registry.resolve_field_path(".library.Book", "shelf.id").expect("resolves");
    assert!(path.is_nested());
    assert_eq!(path.dotted(), "shelf.id");
    assert_eq!(path.target().map(|f| f.field_type.clone()), Some(FieldType::Scalar(ir::ScalarType::Int64)));

    let flat = registry.resolve_field_path(".library.Book", "genre").expect("resolves");
    assert!(!flat.is_nested());
    assert_eq!(flat.target().and_then(|f| f.enum_type()), Some(".library.Genre"));
}

#[test]
fn test_unresolvable_field_path_is_descriptive() {
    let registry = Registry::load(&library()).expect("load");
    let err = registry.resolve_field_path(".library.Book", "shelf.missing").expect_err("missing");
    assert_eq!(
        err,
        RegistryError::UnknownField {
            message: ".library.Shelf".into(),
            field: "missing".into(),
            path: "shelf.missing".into(),
        }
    );
    assert!(err.to_string().contains("shelf.missing"));

    let err = registry.resolve_field_path(".library.Book", "tags.label").expect_err("repeated");
    assert!(matches!(err, RegistryError::NotAMessage { .. }));
    let err = registry.resolve_field_path(".library.Book", "name.first").expect_err("scalar");
    assert!(matches!(err, RegistryError::NotAMessage { .. }));
}

#[test]
fn test_duplicate_types_are_rejected() {
    let mut set = library();
    let copy = set.files()[0].clone();
    set = DescriptorSet::new(vec![set.files()[0].clone(), copy]);
    assert_eq!(Registry::load(&set).map(|_| ()), Err(RegistryError::DuplicateType(".library.Book".into())));
}

#[test]
fn test_separator_configuration() {
    let registry = Registry::load(&library()).expect("load");
    assert_eq!(registry.repeated_path_param_separator(), Separator::Csv);
    let registry = registry.with_separator("pipes".parse().expect("known separator"));
    assert_eq!(registry.repeated_path_param_separator().as_char(), '|');
    assert!("semicolon".parse::<Separator>().is_err());
    assert_eq!(Separator::Tsv.to_string(), "tsv");
}
