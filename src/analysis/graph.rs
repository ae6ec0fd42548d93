use crate::config::SelfLoopPolicy;
use crate::model::{
    ImportStatement, Language, ModuleCoupling, ParseResult, ParsedFile, UnresolvedImport,
    UnresolvedReason,
};
use crate::parser::normalize_path;
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const JS_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "mjs", "cjs", "mts", "cts"];
const PY_EXTENSIONS: &[&str] = &["py", "pyi"];
const MAX_REPORTED_CHAINS: usize = 10;

/// One import that resolved to an analyzed module.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportLink {
    pub target: PathBuf,
    pub module_path: String,
    pub line: usize,
}

pub struct DependencyGraph {
    graph: DiGraph<PathBuf, ()>,
    node_indices: HashMap<PathBuf, NodeIndex>,
    links: BTreeMap<PathBuf, Vec<ImportLink>>,
    external: BTreeMap<PathBuf, BTreeSet<String>>,
    unresolved: Vec<UnresolvedImport>,
}

impl DependencyGraph {
    pub fn build(files: &[ParsedFile], self_loops: SelfLoopPolicy) -> Self {
        let results: Vec<&ParseResult> = files.iter().map(|f| &f.result).collect();
        Self::from_results(&results, self_loops)
    }

    pub fn from_results(results: &[&ParseResult], self_loops: SelfLoopPolicy) -> Self {
        let mut graph = DiGraph::new();
        let mut node_indices = HashMap::new();

        // Every analyzed file is a node, failed parses included
        let mut paths: Vec<PathBuf> = results
            .iter()
            .map(|r| normalize_path(&r.file_path))
            .collect();
        paths.sort();
        paths.dedup();
        for path in &paths {
            let idx = graph.add_node(path.clone());
            node_indices.insert(path.clone(), idx);
        }

        let resolver = Resolver::new(&paths);
        let mut links: BTreeMap<PathBuf, Vec<ImportLink>> = BTreeMap::new();
        let mut external: BTreeMap<PathBuf, BTreeSet<String>> = BTreeMap::new();
        let mut unresolved = Vec::new();

        for result in results.iter().filter(|r| r.parse_succeeded) {
            let from = normalize_path(&result.file_path);
            let Some(&from_idx) = node_indices.get(&from) else {
                continue;
            };

            for import in &result.imports {
                let targets = resolver.resolve(import, result.language);
                if targets.is_empty() {
                    let reason = resolver.unresolved_reason(import, result.language);
                    match reason {
                        UnresolvedReason::MissingTarget => warn!(
                            file = %from.display(),
                            import = %import.module_path,
                            line = import.line,
                            "unresolved relative import"
                        ),
                        UnresolvedReason::External => debug!(
                            file = %from.display(),
                            import = %import.module_path,
                            "external import"
                        ),
                    }
                    external
                        .entry(from.clone())
                        .or_default()
                        .insert(import.module_path.clone());
                    unresolved.push(UnresolvedImport {
                        source_file: from.clone(),
                        module_path: import.module_path.clone(),
                        line: import.line,
                        reason,
                    });
                    continue;
                }

                for target in targets {
                    if target == from && self_loops == SelfLoopPolicy::Suppress {
                        debug!(file = %from.display(), "dropping self-import");
                        continue;
                    }
                    if let Some(&to_idx) = node_indices.get(&target) {
                        graph.update_edge(from_idx, to_idx, ());
                        links.entry(from.clone()).or_default().push(ImportLink {
                            target,
                            module_path: import.module_path.clone(),
                            line: import.line,
                        });
                    }
                }
            }
        }

        Self {
            graph,
            node_indices,
            links,
            external,
            unresolved,
        }
    }

    pub fn graph(&self) -> &DiGraph<PathBuf, ()> {
        &self.graph
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.graph.node_weights()
    }

    /// Resolved imports of one file, in source order.
    pub fn links(&self, path: &Path) -> &[ImportLink] {
        self.links.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn unresolved(&self) -> &[UnresolvedImport] {
        &self.unresolved
    }

    pub fn fan_in(&self, path: &Path) -> usize {
        self.node_indices
            .get(path)
            .map(|idx| {
                self.graph
                    .neighbors_directed(*idx, Direction::Incoming)
                    .count()
            })
            .unwrap_or(0)
    }

    /// Distinct analyzed modules this one imports.
    pub fn fan_out(&self, path: &Path) -> usize {
        self.node_indices
            .get(path)
            .map(|idx| {
                self.graph
                    .neighbors_directed(*idx, Direction::Outgoing)
                    .count()
            })
            .unwrap_or(0)
    }

    /// Distinct imports that did not resolve to an analyzed module.
    pub fn external_fan_out(&self, path: &Path) -> usize {
        self.external.get(path).map(BTreeSet::len).unwrap_or(0)
    }

    pub fn instability(&self, path: &Path) -> f64 {
        let fan_in = self.fan_in(path);
        let fan_out = self.fan_out(path) + self.external_fan_out(path);
        if fan_in + fan_out == 0 {
            0.0
        } else {
            fan_out as f64 / (fan_in + fan_out) as f64
        }
    }

    pub fn dependents(&self, path: &Path) -> Vec<PathBuf> {
        let Some(idx) = self.node_indices.get(path) else {
            return Vec::new();
        };
        let mut out: Vec<PathBuf> = self
            .graph
            .neighbors_directed(*idx, Direction::Incoming)
            .map(|n| self.graph[n].clone())
            .collect();
        out.sort();
        out
    }

    /// Per-module coupling, sorted by path.
    pub fn module_metrics(&self) -> Vec<ModuleCoupling> {
        let mut metrics: Vec<ModuleCoupling> = self
            .graph
            .node_weights()
            .map(|path| ModuleCoupling {
                path: path.clone(),
                fan_in: self.fan_in(path),
                fan_out: self.fan_out(path),
                external_fan_out: self.external_fan_out(path),
                instability: self.instability(path),
            })
            .collect();
        metrics.sort_by(|a, b| a.path.cmp(&b.path));
        metrics
    }

    fn sorted_successors(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut succ: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(idx, Direction::Outgoing)
            .collect();
        succ.sort_by(|a, b| self.graph[*a].cmp(&self.graph[*b]));
        succ.dedup();
        succ
    }

    fn sorted_nodes(&self) -> Vec<NodeIndex> {
        let mut nodes: Vec<NodeIndex> = self.graph.node_indices().collect();
        nodes.sort_by(|a, b| self.graph[*a].cmp(&self.graph[*b]));
        nodes
    }

    /// Cycles found by DFS back-edges, each reported once and rotated to
    /// start at its smallest path.
    pub fn find_cycles(&self) -> Vec<Vec<PathBuf>> {
        self.detect_cycles(self.sorted_nodes())
    }

    /// Same as [`find_cycles`](Self::find_cycles) but with `root` visited first.
    pub fn find_cycles_from(&self, root: &Path) -> Vec<Vec<PathBuf>> {
        let mut order = self.sorted_nodes();
        if let Some(&idx) = self.node_indices.get(root) {
            order.retain(|n| *n != idx);
            order.insert(0, idx);
        }
        self.detect_cycles(order)
    }

    fn detect_cycles(&self, order: Vec<NodeIndex>) -> Vec<Vec<PathBuf>> {
        struct Frame {
            node: NodeIndex,
            successors: Vec<NodeIndex>,
            next: usize,
        }

        let mut visited: HashSet<NodeIndex> = HashSet::new();
        let mut seen: HashSet<Vec<NodeIndex>> = HashSet::new();
        let mut cycles: Vec<Vec<PathBuf>> = Vec::new();

        for root in order {
            if visited.contains(&root) {
                continue;
            }
            visited.insert(root);
            let mut on_stack: HashMap<NodeIndex, usize> = HashMap::from([(root, 0)]);
            let mut stack = vec![Frame {
                node: root,
                successors: self.sorted_successors(root),
                next: 0,
            }];

            while let Some(frame) = stack.last_mut() {
                if frame.next >= frame.successors.len() {
                    let node = frame.node;
                    stack.pop();
                    on_stack.remove(&node);
                    continue;
                }
                let next = frame.successors[frame.next];
                frame.next += 1;

                if let Some(&pos) = on_stack.get(&next) {
                    let members: Vec<NodeIndex> = stack[pos..].iter().map(|f| f.node).collect();
                    let mut key = members.clone();
                    key.sort();
                    if seen.insert(key) {
                        cycles.push(self.rotate_cycle(members));
                    }
                } else if visited.insert(next) {
                    on_stack.insert(next, stack.len());
                    stack.push(Frame {
                        node: next,
                        successors: self.sorted_successors(next),
                        next: 0,
                    });
                }
            }
        }

        cycles.sort();
        cycles
    }

    fn rotate_cycle(&self, members: Vec<NodeIndex>) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = members.into_iter().map(|n| self.graph[n].clone()).collect();
        if let Some(min_pos) = paths
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.cmp(b.1))
            .map(|(i, _)| i)
        {
            paths.rotate_left(min_pos);
        }
        paths
    }

    /// Longest dependency chains with more than `max_depth` edges. Chains that
    /// start inside an already-reported chain are skipped.
    pub fn deep_chains(&self, max_depth: usize) -> Vec<Vec<PathBuf>> {
        let mut memo: HashMap<NodeIndex, Vec<NodeIndex>> = HashMap::new();
        let mut candidates: Vec<Vec<NodeIndex>> = Vec::new();

        for node in self.sorted_nodes() {
            let mut visiting = HashSet::new();
            let chain = self.longest_from(node, &mut memo, &mut visiting);
            if chain.len().saturating_sub(1) > max_depth {
                candidates.push(chain);
            }
        }

        candidates.sort_by(|a, b| {
            b.len()
                .cmp(&a.len())
                .then_with(|| self.graph[a[0]].cmp(&self.graph[b[0]]))
        });

        let mut covered: HashSet<NodeIndex> = HashSet::new();
        let mut chains = Vec::new();
        for chain in candidates {
            if covered.contains(&chain[0]) {
                continue;
            }
            covered.extend(chain.iter().skip(1).copied());
            chains.push(chain.iter().map(|n| self.graph[*n].clone()).collect());
            if chains.len() == MAX_REPORTED_CHAINS {
                break;
            }
        }
        chains
    }

    fn longest_from(
        &self,
        node: NodeIndex,
        memo: &mut HashMap<NodeIndex, Vec<NodeIndex>>,
        visiting: &mut HashSet<NodeIndex>,
    ) -> Vec<NodeIndex> {
        if let Some(path) = memo.get(&node) {
            return path.clone();
        }
        visiting.insert(node);
        let mut best: Vec<NodeIndex> = Vec::new();
        for succ in self.sorted_successors(node) {
            // back edges would make the chain infinite
            if visiting.contains(&succ) {
                continue;
            }
            let candidate = self.longest_from(succ, memo, visiting);
            if candidate.len() > best.len() {
                best = candidate;
            }
        }
        visiting.remove(&node);

        let mut path = Vec::with_capacity(best.len() + 1);
        path.push(node);
        path.extend(best);
        memo.insert(node, path.clone());
        path
    }
}

/// Maps import specifiers onto the set of analyzed files.
struct Resolver {
    files: HashSet<PathBuf>,
    /// Dotted Python module name (every suffix of the path) -> files.
    python_modules: HashMap<String, Vec<PathBuf>>,
}

impl Resolver {
    fn new(paths: &[PathBuf]) -> Self {
        let mut python_modules: HashMap<String, Vec<PathBuf>> = HashMap::new();
        for path in paths {
            let is_python = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| PY_EXTENSIONS.contains(&e));
            if !is_python {
                continue;
            }
            let mut parts: Vec<String> = path
                .with_extension("")
                .components()
                .map(|c| c.as_os_str().to_string_lossy().to_string())
                .collect();
            if parts.last().is_some_and(|p| p == "__init__") {
                parts.pop();
            }
            for start in 0..parts.len() {
                let dotted = parts[start..].join(".");
                // `import utils` should not bind to `deep/nested/utils.py`
                if parts.len() - start == 1 && start > 1 {
                    continue;
                }
                python_modules.entry(dotted).or_default().push(path.clone());
            }
        }
        for candidates in python_modules.values_mut() {
            candidates.sort_by(|a, b| {
                a.components()
                    .count()
                    .cmp(&b.components().count())
                    .then_with(|| a.cmp(b))
            });
        }

        Self {
            files: paths.iter().cloned().collect(),
            python_modules,
        }
    }

    fn resolve(&self, import: &ImportStatement, language: Language) -> Vec<PathBuf> {
        let mut targets = match language {
            Language::Python => self.resolve_python(import),
            Language::JavaScript | Language::TypeScript => {
                self.resolve_js(import).into_iter().collect()
            }
        };
        targets.sort();
        targets.dedup();
        targets
    }

    fn unresolved_reason(&self, import: &ImportStatement, language: Language) -> UnresolvedReason {
        let local = import.is_relative
            || (language != Language::Python && alias_stripped(&import.module_path).is_some());
        let asset = Path::new(&import.module_path)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| {
                !JS_EXTENSIONS.contains(&e) && !PY_EXTENSIONS.contains(&e) && language != Language::Python
            });
        if local && !asset {
            UnresolvedReason::MissingTarget
        } else {
            UnresolvedReason::External
        }
    }

    fn resolve_python(&self, import: &ImportStatement) -> Vec<PathBuf> {
        let submodule_names = import
            .imported_names
            .iter()
            .filter(|n| n.as_str() != "*" && n.as_str() != import.module_path);

        if import.is_relative {
            let Some(base) = &import.resolved_base else {
                return Vec::new();
            };
            let mut targets = Vec::new();
            let mut all_submodules = true;
            for name in submodule_names {
                match self.python_file(&base.join(name)) {
                    Some(t) => targets.push(t),
                    None => all_submodules = false,
                }
            }
            if !all_submodules || targets.is_empty() {
                targets.extend(self.python_file(base));
            }
            return targets;
        }

        let mut targets = Vec::new();
        let mut all_submodules = true;
        for name in submodule_names {
            match self.python_module(&format!("{}.{}", import.module_path, name)) {
                Some(t) => targets.push(t),
                None => all_submodules = false,
            }
        }
        if !all_submodules || targets.is_empty() {
            targets.extend(self.python_module(&import.module_path));
        }
        targets
    }

    fn python_file(&self, base: &Path) -> Option<PathBuf> {
        let base = normalize_path(base);
        PY_EXTENSIONS
            .iter()
            .map(|ext| base.with_extension(ext))
            .chain(std::iter::once(base.join("__init__.py")))
            .find(|c| self.files.contains(c))
    }

    fn python_module(&self, dotted: &str) -> Option<PathBuf> {
        self.python_modules
            .get(dotted)
            .and_then(|c| c.first())
            .cloned()
    }

    fn resolve_js(&self, import: &ImportStatement) -> Option<PathBuf> {
        if import.is_relative {
            return import.resolved_base.as_deref().and_then(|b| self.js_file(b));
        }
        if let Some(rest) = alias_stripped(&import.module_path) {
            return self
                .js_file(&Path::new("src").join(rest))
                .or_else(|| self.js_file(Path::new(rest)));
        }
        // baseUrl-style imports (`components/Button`) when the path exists
        self.js_file(Path::new(&import.module_path))
    }

    fn js_file(&self, base: &Path) -> Option<PathBuf> {
        let base = normalize_path(base);
        if self.files.contains(&base) {
            return Some(base);
        }

        // `./util.js` written for a `util.ts` source
        let stem = match base.extension().and_then(|e| e.to_str()) {
            Some(ext) if JS_EXTENSIONS.contains(&ext) => base.with_extension(""),
            _ => base.clone(),
        };

        JS_EXTENSIONS
            .iter()
            .map(|ext| append_extension(&stem, ext))
            .chain(JS_EXTENSIONS.iter().map(|ext| stem.join(format!("index.{}", ext))))
            .find(|c| self.files.contains(c))
    }
}

fn alias_stripped(spec: &str) -> Option<&str> {
    spec.strip_prefix("@/").or_else(|| spec.strip_prefix("~/"))
}

/// `a/b.service` + `ts` -> `a/b.service.ts` (`with_extension` would replace `.service`).
fn append_extension(base: &Path, ext: &str) -> PathBuf {
    let mut s = base.as_os_str().to_os_string();
    s.push(".");
    s.push(ext);
    PathBuf::from(s)
}
