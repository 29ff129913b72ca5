//! End-to-end runs over real packages on disk, through the loader and
//! the full rule catalogue.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tempfile::TempDir;

use godet::rules::{self, RuleBuilder};
use godet::{Analyzer, Config, Issue, Metrics};

fn write_package(dir: &Path, files: &[(&str, &str)]) {
    fs::write(dir.join("go.mod"), "module example.com/scan\n\ngo 1.22\n").unwrap();
    for (name, source) in files {
        fs::write(dir.join(name), source).unwrap();
    }
}

fn scan(files: &[(&str, &str)]) -> (Vec<Issue>, Metrics) {
    let tmp = TempDir::new().unwrap();
    write_package(tmp.path(), files);

    let mut analyzer = Analyzer::new(Config::new(), false);
    analyzer.load_rules(&rules::generate_rule_list());
    analyzer
        .process(&[], &[tmp.path().display().to_string()])
        .unwrap();

    let (issues, stats, _) = analyzer.report();
    (issues.to_vec(), *stats)
}

#[test]
fn strconv_bitsize_scenario() {
    let source = r#"package scan

import "strconv"

func parse(s string) int64 {
	u, _ := strconv.ParseUint(s, 10, 64)
	x := int64(u)
	return x
}
"#;
    let (issues, _) = scan(&[("a.go", source)]);
    let bitsize: Vec<_> = issues.iter().filter(|i| i.rule_id == "G702").collect();
    assert_eq!(bitsize.len(), 1);
    assert_eq!(bitsize[0].what, "Overflow in bitSize of 64 for \"int64\"");
}

#[test]
fn map_range_key_value_scenario() {
    let source = r#"package scan

func drain(m map[string]int) {
	for k, v := range m {
		_ = k
		_ = v
	}
}
"#;
    let (issues, _) = scan(&[("b.go", source)]);
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].rule_id, "G703");
}

#[test]
fn map_range_value_message() {
    let source = r#"package scan

import "fmt"

func dump(m map[string]int) {
	for k, v := range m {
		fmt.Println(k, v)
	}
}
"#;
    let (issues, _) = scan(&[("b2.go", source)]);
    assert_eq!(issues.len(), 1);
    assert_eq!(
        issues[0].what,
        "the value in the range statement should be _ unless copying a map: want: for key := range m"
    );
}

#[test]
fn map_clear_idiom_scenario() {
    let source = r#"package scan

func clear(m map[string]int) {
	for k := range m {
		delete(m, k)
	}
}
"#;
    let (issues, _) = scan(&[("c.go", source)]);
    assert!(issues.is_empty(), "unexpected issues: {issues:?}");
}

#[test]
fn blocklisted_import_scenario() {
    let source = r#"package scan

import "math/rand"

func roll() int {
	return rand.Int()
}
"#;
    let (issues, _) = scan(&[("d.go", source)]);
    let blocklist: Vec<_> = issues.iter().filter(|i| i.rule_id == "G501").collect();
    assert_eq!(blocklist.len(), 1);
    assert_eq!(blocklist[0].what, "Blocklisted import math/rand");
    assert_eq!(blocklist[0].line, "3");
}

#[test]
fn len_cast_scenario() {
    let source = r#"package scan

func count(xs []string) int32 {
	n := len(xs)
	var y int32 = int32(n)
	return y
}
"#;
    let (issues, _) = scan(&[("e.go", source)]);
    let casts: Vec<_> = issues.iter().filter(|i| i.rule_id == "G701").collect();
    if rules::IS_32BIT {
        assert!(casts.is_empty());
    } else {
        assert_eq!(casts.len(), 1);
    }
}

#[test]
fn generated_file_scenario() {
    let generated = r#"// Code generated by protoc-gen-go. DO NOT EDIT.
package scan

import "math/rand"

var _ = rand.Int
"#;
    let handwritten = r#"package scan

func ok() {}
"#;
    let (issues, stats) = scan(&[("zz_generated.go", generated), ("ok.go", handwritten)]);
    assert!(issues.is_empty());
    assert_eq!(stats.num_files, 1);
    assert_eq!(stats.num_lines, 3);
}

#[test]
fn suppressed_subtree_scenario() {
    let source = r#"package scan

import "time"

func stamp() int64 {
	// #nosec G704
	return time.Now().Unix()
}
"#;
    let (issues, stats) = scan(&[("s.go", source)]);
    assert!(issues.is_empty());
    assert_eq!(stats.num_nosec, 1);
}

#[test]
fn missing_path_is_skipped_without_error() {
    let mut analyzer = Analyzer::new(Config::new(), false);
    analyzer.load_rules(&rules::generate_rule_list());
    analyzer
        .process(&[], &["/definitely/not/a/package".to_string()])
        .unwrap();

    let (issues, stats, errors) = analyzer.report();
    assert!(issues.is_empty());
    assert_eq!(stats.num_files, 0);
    assert!(errors.is_empty());
}

#[test]
fn directory_without_go_files_is_dropped_silently() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("notes.txt"), "nothing to see").unwrap();

    let mut analyzer = Analyzer::new(Config::new(), false);
    analyzer.load_rules(&rules::generate_rule_list());
    analyzer
        .process(&[], &[tmp.path().display().to_string()])
        .unwrap();

    let (_, _, errors) = analyzer.report();
    assert!(errors.is_empty());
}

#[test]
fn parse_errors_are_collected_and_sorted() {
    let broken = "package scan\n\nfunc broken( {\n\tx :=\n}\n";
    let tmp = TempDir::new().unwrap();
    write_package(tmp.path(), &[("broken.go", broken)]);

    let mut analyzer = Analyzer::new(Config::new(), false);
    analyzer.load_rules(&rules::generate_rule_list());
    analyzer
        .process(&[], &[tmp.path().display().to_string()])
        .unwrap();

    let (_, _, errors) = analyzer.report();
    let file_errors: Vec<_> = errors.values().flatten().collect();
    assert!(!file_errors.is_empty());
    for pair in file_errors.windows(2) {
        assert!((pair[0].line, pair[0].column) <= (pair[1].line, pair[1].column));
    }
}

#[test]
fn issue_sequences_are_deterministic_across_definition_orders() {
    let source = r#"package scan

import (
	"crypto/md5"
	"math/rand"
	"time"
)

func f(v uint64) {
	md5.New()
	_ = rand.Int
	_ = time.Now()
	w := uint32(v)
	_ = w
}
"#;
    let tmp = TempDir::new().unwrap();
    write_package(tmp.path(), &[("mix.go", source)]);
    let path = tmp.path().display().to_string();

    let run = |definitions: HashMap<String, RuleBuilder>| -> Vec<String> {
        let mut analyzer = Analyzer::new(Config::new(), false);
        analyzer.load_rules(&definitions);
        analyzer.process(&[], &[path.clone()]).unwrap();
        analyzer
            .report()
            .0
            .iter()
            .map(|i| i.rule_id.clone())
            .collect()
    };

    let full = rules::generate_rule_list();
    let mut pairs: Vec<(String, RuleBuilder)> =
        full.iter().map(|(id, b)| (id.clone(), *b)).collect();
    pairs.sort_by(|a, b| b.0.cmp(&a.0));
    let reversed: HashMap<String, RuleBuilder> = pairs.into_iter().collect();

    let first = run(full);
    let second = run(reversed);
    assert_eq!(first, second);
    assert!(first.len() >= 4);
}

#[test]
fn tests_flag_includes_test_files() {
    let prod = "package scan\n\nfunc ok() {}\n";
    let test_file = "package scan\n\nimport \"math/rand\"\n\nvar _ = rand.Int\n";

    let tmp = TempDir::new().unwrap();
    write_package(tmp.path(), &[("a.go", prod), ("a_test.go", test_file)]);
    let path = tmp.path().display().to_string();

    let mut without = Analyzer::new(Config::new(), false);
    without.load_rules(&rules::generate_rule_list());
    without.process(&[], &[path.clone()]).unwrap();
    assert!(without.report().0.is_empty());

    let mut with = Analyzer::new(Config::new(), true);
    with.load_rules(&rules::generate_rule_list());
    with.process(&[], &[path]).unwrap();
    let flagged: Vec<_> = with
        .report()
        .0
        .iter()
        .filter(|i| i.rule_id == "G501")
        .collect();
    assert_eq!(flagged.len(), 1);
}
