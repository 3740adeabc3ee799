//! Unit tests for loading and querying descriptor sets

use ir::*;

const HELLOWORLD: &str = r#"{
  "files": [
    {
      "name": "helloworld/helloworld.proto",
      "package": "helloworld",
      "module": { "path": "crate::pb::helloworld", "name": "helloworld" },
      "messages": [
        { "name": "HelloRequest", "fields": [ { "name": "name", "type": { "scalar": "string" } } ] },
        { "name": "HelloReply", "fields": [ { "name": "message", "type": { "scalar": "string" } } ] }
      ],
      "services": [
        {
          "name": "Greeter",
          "methods": [
            {
              "name": "SayHello",
              "input_type": ".helloworld.HelloRequest",
              "output_type": ".helloworld.HelloReply",
              "bindings": [
                {
                  "http_method": "GET",
                  "path_template": {
                    "template": "/v1/hello/{name}",
                    "op_codes": [2, 0, 2, 1, 1, 0, 4, 1, 5, 2],
                    "pool": ["v1", "hello", "name"]
                  },
                  "path_params": ["name"]
                }
              ]
            }
          ]
        }
      ]
    },
    {
      "name": "empty.proto",
      "package": "empty",
      "module": { "path": "crate::pb::empty", "name": "empty" }
    }
  ],
  "targets": ["helloworld/helloworld.proto"]
}"#;

fn helloworld() -> DescriptorSet { serde_json::from_str(HELLOWORLD).expect("valid descriptor json") }

#[test]
fn test_targets_filter_by_name() {
    let set = helloworld();
    assert_eq!(set.files().len(), 2);
    let targets: Vec<_> = set.targets().map(|f| f.name.as_str()).collect();
    assert_eq!(targets, vec!["helloworld/helloworld.proto"]);

    let all = DescriptorSet::new(set.files().to_vec());
    assert_eq!(all.targets().count(), 2);
}

#[test]
fn test_binding_fields_parsed() {
    let set = helloworld();
    let file = set.get_file("helloworld/helloworld.proto").expect("file present");
    let method = &file.services[0].methods[0];
    assert!(!method.client_streaming && !method.server_streaming);

    let binding = &method.bindings[0];
    assert_eq!(binding.http_method, HttpMethod::Get);
    assert_eq!(binding.path_template.version, 1);
    assert_eq!(binding.path_template.pool, vec!["v1", "hello", "name"]);
    assert!(binding.path_template.verb.is_empty());
    assert_eq!(binding.body, None);
    assert_eq!(binding.path_params, vec!["name"]);
}

#[test]
fn test_has_bindings() {
    let set = helloworld();
    assert!(set.get_file("helloworld/helloworld.proto").expect("file").has_bindings());
    assert!(!set.get_file("empty.proto").expect("file").has_bindings());
}

#[test]
fn test_file_io() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("nested").join("descriptors.json");
    helloworld().to_file(&path).expect("save");

    let content = std::fs::read_to_string(&path).expect("read back");
    assert!(content.ends_with('\n'));

    let loaded = DescriptorSet::from_file(&path).expect("load");
    assert_eq!(loaded.target_names(), &["helloworld/helloworld.proto".to_string()]);
    assert_eq!(loaded.files()[0].services[0].name, "Greeter");
}

#[test]
fn test_from_file_reports_malformed_json() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("bad.json");
    std::fs::write(&path, "{ not json").expect("write");
    assert!(matches!(DescriptorSet::from_file(&path), Err(IrError::Json(_))));
    assert!(matches!(DescriptorSet::from_file(&dir.path().join("missing.json")), Err(IrError::Io(_))));
}
