//! End-to-end runs of the built-in codemod catalog over real files.

use pycodemod::codemods;
use pycodemod::findings::FindingSet;
use pycodemod::{FileContext, FileOutcome, LineFilter, LineRange, PathFilter, Session};
use std::path::Path;

const WALRUS_INPUT: &str = "x = compute()\nif x:\n    handle(x)\n";
const WALRUS_OUTPUT: &str = "if x := compute():\n    handle(x)\n";

const COMBINE_INPUT: &str = "\
def check(name):
    # prefix gate
    if name.startswith('tmp_') or name.startswith('bak_'):
        return True
    return False
";
const COMBINE_OUTPUT: &str = "\
def check(name):
    # prefix gate
    if name.startswith(('tmp_', 'bak_')):
        return True
    return False
";

fn walrus_findings_json(component: &str) -> String {
    format!(
        r#"{{"issues": [{{
            "rule": "use-walrus-if",
            "status": "OPEN",
            "component": "{component}",
            "textRange": {{"startLine": 1, "startOffset": 0, "endLine": 1, "endOffset": 13}}
        }}]}}"#
    )
}

#[test]
fn pattern_codemod_rewrites_file_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("check.py");
    std::fs::write(&path, COMBINE_INPUT).unwrap();

    let mut session = Session::new(codemods::default_codemods().unwrap());
    let mut file = FileContext::new(&path);

    let outcome = session.process_file(&mut file).unwrap();
    assert_eq!(outcome, FileOutcome::Rewritten { dry_run: false });
    assert_eq!(std::fs::read_to_string(&path).unwrap(), COMBINE_OUTPUT);

    let entries = session.registry().entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].codemod, "combine-startswith-endswith");
    assert_eq!(entries[0].changes[0].line_number, 3);
}

#[test]
fn dry_run_reports_changes_without_writing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("check.py");
    std::fs::write(&path, COMBINE_INPUT).unwrap();

    let mut session = Session::new(codemods::default_codemods().unwrap());
    let mut file = FileContext::new(&path).dry_run(true);

    let outcome = session.process_file(&mut file).unwrap();
    assert_eq!(outcome, FileOutcome::Rewritten { dry_run: true });
    assert_eq!(std::fs::read_to_string(&path).unwrap(), COMBINE_INPUT);
    assert!(!session.registry().is_empty());
}

#[test]
fn rule_codemod_consumes_findings_loaded_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let source_path = dir.path().join("app.py");
    std::fs::write(&source_path, WALRUS_INPUT).unwrap();

    let findings_path = dir.path().join("findings.json");
    let component = format!("proj:{}", source_path.display());
    std::fs::write(&findings_path, walrus_findings_json(&component)).unwrap();

    let mut session = Session::new(codemods::default_codemods().unwrap());
    let mut file =
        FileContext::new(&source_path).with_findings(FindingSet::load_cached(&findings_path));

    let outcome = session.process_file(&mut file).unwrap();
    assert_eq!(outcome, FileOutcome::Rewritten { dry_run: false });
    assert_eq!(std::fs::read_to_string(&source_path).unwrap(), WALRUS_OUTPUT);

    let entries = session.registry().entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].codemod, "use-walrus-if");
    assert_eq!(entries[0].changes[0].line_number, 1);
}

#[test]
fn rule_codemod_stays_quiet_without_findings() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.py");
    std::fs::write(&path, WALRUS_INPUT).unwrap();

    let mut session = Session::new(codemods::default_codemods().unwrap());
    let mut file = FileContext::new(&path);

    let outcome = session.process_file(&mut file).unwrap();
    assert_eq!(outcome, FileOutcome::Unchanged);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), WALRUS_INPUT);
    assert!(session.registry().is_empty());
}

#[test]
fn both_codemods_fire_in_one_session() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.py");
    let input = "x = compute()\nif x:\n    ok = x.startswith('a') or x.startswith('b')\n";
    std::fs::write(&path, input).unwrap();

    let component = format!("proj:{}", path.display());
    let findings_path = dir.path().join("findings.json");
    std::fs::write(&findings_path, walrus_findings_json(&component)).unwrap();

    let mut session = Session::new(codemods::default_codemods().unwrap());
    let mut file = FileContext::new(&path).with_findings(FindingSet::load_cached(&findings_path));

    session.process_file(&mut file).unwrap();
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "if x := compute():\n    ok = x.startswith(('a', 'b'))\n"
    );

    let codemod_names: Vec<&str> = session
        .registry()
        .entries()
        .iter()
        .map(|e| e.codemod.as_str())
        .collect();
    assert_eq!(
        codemod_names,
        ["combine-startswith-endswith", "use-walrus-if"]
    );
}

#[test]
fn path_filter_excludes_files_entirely() {
    let mut session = Session::new(codemods::default_codemods().unwrap());
    let mut file = FileContext::new("vendor/check.py")
        .with_path_filter(PathFilter::new::<&str>(&[], &["vendor/**"]).unwrap());

    let out = session.process_source(&mut file, COMBINE_INPUT).unwrap();
    assert!(out.is_none());
    assert!(session.registry().is_empty());
}

#[test]
fn line_filter_limits_rewrite_sites() {
    let source = "\
a = x.startswith('a') or x.startswith('b')
b = x.startswith('c') or x.startswith('d')
";
    let mut session = Session::new(codemods::default_codemods().unwrap());
    let mut file = FileContext::new("app.py")
        .with_line_filter(LineFilter::new(vec![LineRange::single(2)], vec![]));

    let out = session.process_source(&mut file, source).unwrap();
    assert_eq!(
        out.as_deref(),
        Some("a = x.startswith('a') or x.startswith('b')\nb = x.startswith(('c', 'd'))\n")
    );
}

#[test]
fn comments_and_formatting_survive_untouched() {
    let source = "\
#!/usr/bin/env python
\"\"\"Module docstring.\"\"\"

VALUES = [1,   2,3]  # odd spacing preserved

if VALUES and (x.startswith('a') or x.startswith('b')):
    pass
";
    let mut session = Session::new(codemods::default_codemods().unwrap());
    let mut file = FileContext::new("app.py");

    let out = session.process_source(&mut file, source).unwrap().unwrap();
    assert!(out.contains("#!/usr/bin/env python"));
    assert!(out.contains("VALUES = [1,   2,3]  # odd spacing preserved"));
    assert!(out.contains("x.startswith(('a', 'b'))"));
}

#[test]
fn registry_serializes_to_report_json() {
    let mut session = Session::new(codemods::default_codemods().unwrap());
    let mut file = FileContext::new("app.py");
    session
        .process_source(&mut file, "y = x.startswith('a') or x.startswith('b')\n")
        .unwrap();

    let json = serde_json::to_value(session.registry()).unwrap();
    let entry = &json["entries"][0];
    assert_eq!(entry["codemod"], "combine-startswith-endswith");
    assert_eq!(entry["changes"][0]["lineNumber"], "1");
    assert_eq!(
        entry["changes"][0]["description"],
        "Use tuple of matches instead of boolean expression"
    );
}

#[test]
fn missing_file_surfaces_io_error() {
    let mut session = Session::new(codemods::default_codemods().unwrap());
    let mut file = FileContext::new(Path::new("/nonexistent/app.py"));
    assert!(session.process_file(&mut file).is_err());
}
