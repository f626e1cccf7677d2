//! Determinism Tests
//!
//! Identical input gives byte-identical output, independent of traversal
//! order, thread scheduling or previous runs.

use orrery::determinism::{fingerprint, to_canonical_json};
use orrery::{index_project, parse_file, IndexOptions, LanguageId};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn populate(root: &Path, order: &[usize]) {
    let files = [
        ("pkg/util.py", "def helper(a, b=2):\n    return a + b\n"),
        ("pkg/__init__.py", "from .util import helper\n"),
        ("src/main.rs", "mod cli;\n\nfn main() {\n    cli::run();\n}\n"),
        ("src/cli.rs", "pub fn run() {}\n"),
        ("web/index.ts", "import { a } from './a';\nexport default a;\n"),
        ("web/a.ts", "// the answer\nexport const a = 42;\n"),
    ];
    for &i in order {
        let (path, content) = files[i];
        write(root, path, content);
    }
}

#[test]
fn test_index_is_reproducible() {
    let temp_dir = TempDir::new().unwrap();
    populate(temp_dir.path(), &[0, 1, 2, 3, 4, 5]);

    let first = index_project(temp_dir.path(), &IndexOptions::default()).unwrap();
    let second = index_project(temp_dir.path(), &IndexOptions::default()).unwrap();

    assert_eq!(first.fingerprint(), second.fingerprint());
    assert!(first.same_content(&second));
    assert_eq!(first.files, second.files);
    assert_eq!(first.errors, second.errors);
}

#[test]
fn test_creation_order_does_not_matter() {
    let forward = TempDir::new().unwrap();
    populate(forward.path(), &[0, 1, 2, 3, 4, 5]);
    let backward = TempDir::new().unwrap();
    populate(backward.path(), &[5, 4, 3, 2, 1, 0]);

    let a = index_project(forward.path(), &IndexOptions::default()).unwrap();
    let b = index_project(backward.path(), &IndexOptions::default()).unwrap();

    let files_a = to_canonical_json(&a.files).unwrap();
    let files_b = to_canonical_json(&b.files).unwrap();
    assert_eq!(files_a, files_b);
}

#[test]
fn test_file_keys_are_path_ordered() {
    let temp_dir = TempDir::new().unwrap();
    populate(temp_dir.path(), &[5, 3, 1, 4, 0, 2]);

    let model = index_project(temp_dir.path(), &IndexOptions::default()).unwrap();
    let keys: Vec<_> = model.files.keys().cloned().collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);

    let json = model.to_json().unwrap();
    let init = json.find("\"pkg/__init__.py\"").unwrap();
    let util = json.find("\"pkg/util.py\"").unwrap();
    let cli = json.find("\"src/cli.rs\"").unwrap();
    assert!(init < util && util < cli);
}

#[test]
fn test_parse_file_json_is_stable() {
    let source = "export class A {\n  b() {}\n  a() {}\n}\n// trailing\nexport function z() {}\n";
    let first = parse_file(source, LanguageId::TypeScript).unwrap();
    let second = parse_file(source, LanguageId::TypeScript).unwrap();

    assert_eq!(fingerprint(&first).unwrap(), fingerprint(&second).unwrap());

    let json = to_canonical_json(&first).unwrap();
    let checksum = json.find("\"checksum\"").unwrap();
    let declarations = json.find("\"declarations\"").unwrap();
    let path = json.find("\"path\"").unwrap();
    assert!(checksum < declarations && declarations < path);

    let class = &first.declarations[0];
    let names: Vec<_> = class.children.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["b", "a"]);
}

#[test]
fn test_fingerprint_tracks_content() {
    let temp_dir = TempDir::new().unwrap();
    populate(temp_dir.path(), &[0, 1, 2, 3, 4, 5]);
    let before = index_project(temp_dir.path(), &IndexOptions::default()).unwrap();

    write(temp_dir.path(), "src/cli.rs", "pub fn run() {}\npub fn stop() {}\n");
    let after = index_project(temp_dir.path(), &IndexOptions::default()).unwrap();

    assert_ne!(before.fingerprint(), after.fingerprint());
    assert_ne!(
        before.file("src/cli.rs").unwrap().checksum,
        after.file("src/cli.rs").unwrap().checksum
    );
    assert_eq!(before.file("src/main.rs"), after.file("src/main.rs"));
}
