//! Config loader tests: line format, comment handling, script caching,
//! and fatal error reporting with 1-based line numbers.

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use rehook::config::{load, parse_with_reader};
use rehook::AppError;

/// Reader that serves canned script contents and counts reads per path.
fn counting_reader(
    scripts: Vec<(&'static str, &'static str)>,
) -> (
    impl FnMut(&std::path::Path) -> io::Result<String>,
    Arc<std::sync::Mutex<HashMap<PathBuf, usize>>>,
) {
    let canned: HashMap<PathBuf, String> = scripts
        .into_iter()
        .map(|(path, text)| (PathBuf::from(path), text.to_owned()))
        .collect();
    let counts = Arc::new(std::sync::Mutex::new(HashMap::new()));
    let counts_clone = Arc::clone(&counts);

    let reader = move |path: &std::path::Path| {
        *counts_clone
            .lock()
            .unwrap()
            .entry(path.to_path_buf())
            .or_insert(0) += 1;
        canned
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such script"))
    };
    (reader, counts)
}

#[test]
fn valid_lines_produce_entries_in_file_order() {
    let (reader, _) = counting_reader(vec![("a.js", "// a"), ("b.js", "// b")]);
    let raw = "com.first.app a.js\ncom.second.app b.js\n";

    let packages = parse_with_reader(raw, reader).expect("config should parse");

    assert_eq!(packages.len(), 2);
    assert_eq!(packages[0].name, "com.first.app");
    assert_eq!(packages[1].name, "com.second.app");
    assert_eq!(&*packages[0].script, "// a");
    assert_eq!(&*packages[1].script, "// b");
}

#[test]
fn shared_script_path_is_read_once_and_shared() {
    let (reader, counts) = counting_reader(vec![("hook.js", "// shared")]);
    let raw = "com.one hook.js\ncom.two hook.js\n";

    let packages = parse_with_reader(raw, reader).expect("config should parse");

    assert_eq!(packages.len(), 2);
    assert!(
        Arc::ptr_eq(&packages[0].script, &packages[1].script),
        "both packages must share one loaded copy"
    );
    let counts = counts.lock().unwrap();
    assert_eq!(counts.get(&PathBuf::from("hook.js")), Some(&1));
}

#[test]
fn comment_lines_never_produce_entries() {
    let (reader, _) = counting_reader(vec![("a.js", "// a")]);
    let raw = "# com.ignored.app a.js\n#anything at all\ncom.real.app a.js\n";

    let packages = parse_with_reader(raw, reader).expect("config should parse");

    assert_eq!(packages.len(), 1);
    assert_eq!(packages[0].name, "com.real.app");
}

#[test]
fn duplicate_package_names_create_independent_slots() {
    let (reader, _) = counting_reader(vec![("a.js", "// a")]);
    let raw = "com.same.app a.js\ncom.same.app a.js\n";

    let packages = parse_with_reader(raw, reader).expect("config should parse");

    assert_eq!(packages.len(), 2);
    assert_eq!(packages[0].name, packages[1].name);
}

#[test]
fn one_token_line_aborts_with_line_number() {
    let (reader, _) = counting_reader(vec![("a.js", "// a")]);
    let raw = "com.first.app a.js\njust-one-token\n";

    let err = parse_with_reader(raw, reader).expect_err("parse must fail");
    let AppError::Config(message) = err else {
        panic!("expected Config error, got {err:?}");
    };
    assert!(message.contains("line 2"), "got: {message}");
    assert!(message.contains("just-one-token"), "got: {message}");
}

#[test]
fn blank_line_aborts() {
    let (reader, _) = counting_reader(vec![("a.js", "// a")]);
    let raw = "com.first.app a.js\n\ncom.second.app a.js\n";

    let err = parse_with_reader(raw, reader).expect_err("parse must fail");
    let AppError::Config(message) = err else {
        panic!("expected Config error, got {err:?}");
    };
    assert!(message.contains("line 2"), "got: {message}");
}

#[test]
fn three_token_line_aborts_with_line_number() {
    let (reader, _) = counting_reader(vec![("a.js", "// a")]);
    let raw = "com.app a.js extra-token\n";

    let err = parse_with_reader(raw, reader).expect_err("parse must fail");
    let AppError::Config(message) = err else {
        panic!("expected Config error, got {err:?}");
    };
    assert!(message.contains("line 1"), "got: {message}");
}

#[test]
fn unreadable_script_aborts() {
    let (reader, _) = counting_reader(vec![]);
    let raw = "com.app missing.js\n";

    let err = parse_with_reader(raw, reader).expect_err("parse must fail");
    let AppError::Config(message) = err else {
        panic!("expected Config error, got {err:?}");
    };
    assert!(message.contains("missing.js"), "got: {message}");
}

#[test]
fn load_reads_config_and_scripts_from_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let script_path = dir.path().join("hook.js");
    std::fs::write(&script_path, "console.log('hi');").expect("write script");

    let conf_path = dir.path().join("rehook.conf");
    std::fs::write(
        &conf_path,
        format!("# mapping\ncom.target.app {}\n", script_path.display()),
    )
    .expect("write config");

    let packages = load(&conf_path).expect("load should succeed");
    assert_eq!(packages.len(), 1);
    assert_eq!(&*packages[0].script, "console.log('hi');");
}

#[test]
fn missing_config_file_is_fatal() {
    let err = load(std::path::Path::new("/nonexistent/rehook.conf")).expect_err("must fail");
    assert!(matches!(err, AppError::Config(_)), "got {err:?}");
}
