//! The analyzer walks every non-generated file of the loaded packages,
//! maintains the `#nosec` suppression stack, and dispatches each node to
//! the rules registered for its kind.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Component, Path};
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, warn};
use tree_sitter::Node;

use crate::analysis::Context;
use crate::config::Config;
use crate::issue::{Issue, Metrics, ParseError};
use crate::loader::{generated, syntax_errors, GoPackageLoader, LoadError, LoaderConfig, Package, PackageLoader};
use crate::rules::{Rule, RuleBuilder};

fn rule_id_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"G\d{3}").unwrap())
}

/// Rules indexed by the node kinds they registered for. Registration
/// order is preserved per kind.
#[derive(Default)]
pub struct RuleSet {
    rules: Vec<Box<dyn Rule>>,
    by_kind: HashMap<&'static str, Vec<usize>>,
}

impl RuleSet {
    pub fn register(&mut self, rule: Box<dyn Rule>, kinds: &[&'static str]) {
        let index = self.rules.len();
        self.rules.push(rule);
        for kind in kinds {
            self.by_kind.entry(kind).or_default().push(index);
        }
    }

    pub fn registered_for(&self, kind: &str) -> &[usize] {
        self.by_kind.get(kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn rule(&self, index: usize) -> &dyn Rule {
        self.rules[index].as_ref()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

pub struct Analyzer {
    ignore_nosec: bool,
    ruleset: RuleSet,
    config: Config,
    tests: bool,
    issues: Vec<Issue>,
    stats: Metrics,
    errors: BTreeMap<String, Vec<ParseError>>,
}

impl Analyzer {
    pub fn new(config: Config, tests: bool) -> Self {
        Analyzer {
            ignore_nosec: config.is_nosec_disabled(),
            ruleset: RuleSet::default(),
            config,
            tests,
            issues: Vec::new(),
            stats: Metrics::default(),
            errors: BTreeMap::new(),
        }
    }

    pub fn set_config(&mut self, config: Config) {
        self.ignore_nosec = config.is_nosec_disabled();
        self.config = config;
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Instantiates the rule definitions in ID order, so that dispatch
    /// order within a node is a function of the rule IDs alone.
    pub fn load_rules(&mut self, definitions: &HashMap<String, RuleBuilder>) {
        let mut ids: Vec<&String> = definitions.keys().collect();
        ids.sort();

        for id in ids {
            let builder = definitions[id];
            let (rule, kinds) = builder(id, &self.config);
            self.ruleset.register(rule, &kinds);
        }
    }

    /// Loads and checks every package path. Load failures are attached to
    /// the failing path; only a filter I/O failure aborts the run.
    pub fn process(&mut self, build_tags: &[String], package_paths: &[String]) -> crate::Result<()> {
        let loader = GoPackageLoader;
        let mut loader_config = LoaderConfig::new(build_tags, self.tests);

        for path in package_paths {
            match loader.load(Path::new(path), &mut loader_config) {
                Ok(packages) => {
                    for pkg in packages {
                        if pkg.name.is_empty() {
                            continue;
                        }
                        self.parse_errors(&pkg);
                        self.check(&pkg);
                    }
                }
                Err(LoadError::Filter(err)) => return Err(err.into()),
                Err(err) => self.append_error(path, &err.to_string()),
            }
        }
        self.sort_errors();
        Ok(())
    }

    /// Walks every analyzable file of `pkg`.
    pub fn check(&mut self, pkg: &Package) {
        debug!(package = %pkg.name, root = %pkg.module_root.display(), "checking package");

        for file in &pkg.files {
            if file.path.extension().and_then(|e| e.to_str()) != Some("go") {
                continue;
            }
            if under_testutil(&file.path) {
                continue;
            }
            if generated::is_generated(&file.source) {
                continue;
            }
            debug!(file = %file.path.display(), "checking file");

            let Analyzer {
                ruleset,
                config,
                issues,
                stats,
                ignore_nosec,
                ..
            } = self;
            let ctx = Context::new(pkg, file, config);
            let mut walker = Walker {
                ruleset,
                issues,
                stats,
                ignore_nosec: *ignore_nosec,
                nosec_tag: config.nosec_tag().to_string(),
                ignores: Vec::new(),
            };
            walker.walk(ctx.root(), &ctx);

            self.stats.num_files += 1;
            self.stats.num_lines += file.line_count();
        }
    }

    /// Harvests front-end syntax errors from `pkg` into the per-file
    /// error map.
    pub fn parse_errors(&mut self, pkg: &Package) {
        for (file, errors) in syntax_errors(pkg) {
            self.errors.entry(file).or_default().extend(errors);
        }
    }

    /// Attaches a load error to `path`. Empty build-tagged packages are
    /// not errors and are dropped.
    pub fn append_error(&mut self, path: &str, message: &str) {
        if message.contains("no buildable Go source files") {
            return;
        }
        self.errors
            .entry(path.to_string())
            .or_default()
            .push(ParseError::new(0, 0, message));
    }

    fn sort_errors(&mut self) {
        for errors in self.errors.values_mut() {
            errors.sort_by_key(|e| (e.line, e.column));
        }
    }

    pub fn report(&self) -> (&[Issue], &Metrics, &BTreeMap<String, Vec<ParseError>>) {
        (&self.issues, &self.stats, &self.errors)
    }

    /// Clears issues, metrics, errors, and the rule catalogue.
    pub fn reset(&mut self) {
        self.issues.clear();
        self.stats = Metrics::default();
        self.errors.clear();
        self.ruleset = RuleSet::default();
    }
}

fn under_testutil(path: &Path) -> bool {
    path.components()
        .any(|c| matches!(c, Component::Normal(name) if name == "testutil"))
}

struct Walker<'r> {
    ruleset: &'r RuleSet,
    issues: &'r mut Vec<Issue>,
    stats: &'r mut Metrics,
    ignore_nosec: bool,
    nosec_tag: String,
    ignores: Vec<HashSet<String>>,
}

impl Walker<'_> {
    fn walk<'a>(&mut self, node: Node<'a>, ctx: &Context<'a>) {
        let (ignored, ignore_all) = self.suppressions_for(node, ctx);
        if ignore_all {
            return;
        }

        // Each node gets a frame holding the union of the enclosing
        // suppressions and its own.
        let mut frame = self.ignores.last().cloned().unwrap_or_default();
        frame.extend(ignored);
        self.ignores.push(frame);

        if node.kind() == "import_spec" {
            ctx.track_import(node);
        }

        let ruleset = self.ruleset;
        for &index in ruleset.registered_for(node.kind()) {
            let rule = ruleset.rule(index);
            if self
                .ignores
                .last()
                .is_some_and(|frame| frame.contains(rule.id()))
            {
                continue;
            }
            match rule.match_node(node, ctx) {
                Ok(Some(issue)) => {
                    self.issues.push(issue);
                    self.stats.num_found += 1;
                }
                Ok(None) => {}
                Err(err) => {
                    let file = Path::new(ctx.file_path())
                        .file_name()
                        .and_then(|f| f.to_str())
                        .unwrap_or("");
                    let line = node.start_position().row + 1;
                    warn!(rule = rule.id(), error = %err, "rule error ({file}:{line})");
                }
            }
        }

        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            self.walk(child, ctx);
        }
        self.ignores.pop();
    }

    /// Reads any suppression annotation attached to `node`: the rule IDs
    /// it names, or all-rules when it names none.
    fn suppressions_for(&mut self, node: Node, ctx: &Context<'_>) -> (Vec<String>, bool) {
        if self.ignore_nosec {
            return (Vec::new(), false);
        }
        let Some(groups) = ctx.comments().groups_for(node) else {
            return (Vec::new(), false);
        };
        for group in groups {
            if !group.contains(&self.nosec_tag) {
                continue;
            }
            self.stats.num_nosec += 1;

            let ids: Vec<String> = rule_id_pattern()
                .find_iter(group)
                .map(|m| m.as_str().to_string())
                .collect();
            if ids.is_empty() {
                return (Vec::new(), true);
            }
            return (ids, false);
        }
        (Vec::new(), false)
    }
}
