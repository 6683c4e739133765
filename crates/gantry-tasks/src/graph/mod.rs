//! Target invocation graph construction
//!
//! Requested selectors are resolved recursively into [`TargetInvocation`]
//! nodes, one per [`TargetInstanceId`], each carrying its isolated
//! configuration. Nodes and edges are fixed once built.

mod invocation;
mod selection;

pub use invocation::TargetInvocation;
pub use selection::{RequestedTarget, Selection};

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

use gantry_core::config::{merge_tables, ConfigLayers};
use gantry_core::{CommandDefaults, ConfigError, ProjectConfig, TargetDefinition, TargetInstanceId};
use tracing::{debug, info, instrument};

use crate::error::GraphError;
use crate::function::FunctionRegistry;

/// Directed acyclic graph of invocations
#[derive(Debug)]
pub struct InvocationGraph {
    nodes: BTreeMap<TargetInstanceId, TargetInvocation>,
    dependents: BTreeMap<TargetInstanceId, BTreeSet<TargetInstanceId>>,
    /// Invocations grouped by wave (wave 0 has no dependencies)
    waves: Vec<Vec<TargetInstanceId>>,
    sorted_order: Vec<TargetInstanceId>,
    requested: Vec<TargetInstanceId>,
    overrides: Vec<String>,
}

impl InvocationGraph {
    /// Resolve `selection` against `config`.
    ///
    /// Selectors naming an override target contribute its block to every
    /// invocation instead of becoming nodes.
    #[instrument(skip_all, fields(selectors = selection.requested.len()))]
    pub fn build(
        config: &ProjectConfig,
        registry: &FunctionRegistry,
        selection: &Selection,
    ) -> Result<Self, GraphError> {
        let mut requested: Vec<TargetInstanceId> = Vec::new();
        let mut scoped: BTreeMap<TargetInstanceId, toml::Table> = BTreeMap::new();
        let mut overrides: Vec<(String, toml::Table)> = Vec::new();

        for selector in &selection.requested {
            let id = &selector.id;
            if id.variant.is_none() && config.target(&id.target).is_none() {
                if let Some(block) = config.override_block(&id.target) {
                    let mut block = block.clone();
                    merge_tables(&mut block, &selector.flags);
                    overrides.push((id.target.clone(), block));
                    continue;
                }
            }
            resolve_definition(config, id)?;
            match scoped.get_mut(id) {
                Some(flags) => merge_tables(flags, &selector.flags),
                None => {
                    requested.push(id.clone());
                    scoped.insert(id.clone(), selector.flags.clone());
                }
            }
        }

        if requested.is_empty() {
            return Err(GraphError::Selection("no targets selected".to_string()));
        }

        let mut nodes: BTreeMap<TargetInstanceId, TargetInvocation> = BTreeMap::new();
        let mut queue: VecDeque<TargetInstanceId> = requested.iter().cloned().collect();

        while let Some(id) = queue.pop_front() {
            if nodes.contains_key(&id) {
                continue;
            }
            let definition = resolve_definition(config, &id)?;

            let mut layers = ConfigLayers::new();
            layers.push("config", &config.config);
            layers.push(format!("targets.{}.config", id.target), &definition.config);
            if let Some((variant, table)) = id
                .variant
                .as_ref()
                .and_then(|v| definition.variants.get_key_value(v))
            {
                layers.push(format!("targets.{}.variants.{}", id.target, variant), table);
            }
            for (name, block) in &overrides {
                layers.push(format!("overrides.{}", name), block);
            }
            if let Some(flags) = scoped.get(&id) {
                layers.push("command line", &selection.global);
                layers.push(format!("command line ({})", id), flags);
            }
            let isolated = layers.resolve();
            debug!(id = %id, layers = ?layers.labels(), "isolated configuration");

            let command_defaults = command_defaults(&id, &isolated)?;
            let invocable = registry.instantiate(&id.target, &definition.function, &isolated)?;

            let mut dependencies = Vec::new();
            for selector in &definition.depends_on {
                let dep = TargetInstanceId::parse(selector)?;
                resolve_definition(config, &dep)?;
                if !dependencies.contains(&dep) {
                    dependencies.push(dep.clone());
                }
                queue.push_back(dep);
            }

            nodes.insert(
                id.clone(),
                TargetInvocation {
                    id: id.clone(),
                    function: definition.function.clone(),
                    description: definition.description.clone(),
                    config: isolated,
                    layers: layers.labels().into_iter().map(String::from).collect(),
                    command_defaults,
                    dependencies,
                    invocable,
                },
            );
        }

        let mut dependents: BTreeMap<TargetInstanceId, BTreeSet<TargetInstanceId>> =
            nodes.keys().map(|id| (id.clone(), BTreeSet::new())).collect();
        for (id, node) in &nodes {
            for dep in &node.dependencies {
                if let Some(set) = dependents.get_mut(dep) {
                    set.insert(id.clone());
                }
            }
        }

        let sorted_order = Self::topological_sort(&nodes, &dependents)?;
        let waves = Self::compute_waves(&nodes, &sorted_order);

        info!(
            invocations = nodes.len(),
            waves = waves.len(),
            "invocation graph built"
        );

        Ok(Self {
            nodes,
            dependents,
            waves,
            sorted_order,
            requested,
            overrides: overrides.into_iter().map(|(name, _)| name).collect(),
        })
    }

    /// Topological sort using Kahn's algorithm
    fn topological_sort(
        nodes: &BTreeMap<TargetInstanceId, TargetInvocation>,
        dependents: &BTreeMap<TargetInstanceId, BTreeSet<TargetInstanceId>>,
    ) -> Result<Vec<TargetInstanceId>, ConfigError> {
        let mut in_degree: BTreeMap<&TargetInstanceId, usize> = BTreeMap::new();
        let mut queue: VecDeque<&TargetInstanceId> = VecDeque::new();
        let mut sorted: Vec<TargetInstanceId> = Vec::new();

        for (id, node) in nodes {
            let degree = node.dependencies.len();
            in_degree.insert(id, degree);
            if degree == 0 {
                queue.push_back(id);
            }
        }

        while let Some(id) = queue.pop_front() {
            sorted.push(id.clone());
            for dependent in dependents.get(id).into_iter().flatten() {
                if let Some(degree) = in_degree.get_mut(dependent) {
                    *degree = degree.saturating_sub(1);
                    if *degree == 0 {
                        queue.push_back(dependent);
                    }
                }
            }
        }

        if sorted.len() != nodes.len() {
            let in_sorted: HashSet<_> = sorted.iter().collect();
            let cyclic: Vec<String> = nodes
                .keys()
                .filter(|id| !in_sorted.contains(id))
                .map(|id| id.to_string())
                .collect();
            return Err(ConfigError::CyclicDependency(cyclic.join(", ")));
        }

        Ok(sorted)
    }

    /// Group invocations into waves that could run side by side
    fn compute_waves(
        nodes: &BTreeMap<TargetInstanceId, TargetInvocation>,
        sorted: &[TargetInstanceId],
    ) -> Vec<Vec<TargetInstanceId>> {
        let mut wave_map: BTreeMap<&TargetInstanceId, usize> = BTreeMap::new();

        for id in sorted {
            if let Some(node) = nodes.get(id) {
                let wave = node
                    .dependencies
                    .iter()
                    .filter_map(|dep| wave_map.get(dep))
                    .max()
                    .map(|w| w + 1)
                    .unwrap_or(0);
                wave_map.insert(id, wave);
            }
        }

        let mut waves: Vec<Vec<TargetInstanceId>> = Vec::new();
        for id in sorted {
            if let Some(&wave) = wave_map.get(id) {
                if waves.len() <= wave {
                    waves.resize_with(wave + 1, Vec::new);
                }
                waves[wave].push(id.clone());
            }
        }
        waves
    }

    pub fn get(&self, id: &TargetInstanceId) -> Option<&TargetInvocation> {
        self.nodes.get(id)
    }

    /// Invocations that depend directly on `id`
    pub fn dependents(&self, id: &TargetInstanceId) -> impl Iterator<Item = &TargetInstanceId> {
        self.dependents.get(id).into_iter().flatten()
    }

    pub fn waves(&self) -> &[Vec<TargetInstanceId>] {
        &self.waves
    }

    /// Every invocation, dependencies before dependents
    pub fn sorted(&self) -> &[TargetInstanceId] {
        &self.sorted_order
    }

    /// Invocations named on the command line, in order
    pub fn requested(&self) -> &[TargetInstanceId] {
        &self.requested
    }

    /// Override targets applied to this run
    pub fn overrides(&self) -> &[String] {
        &self.overrides
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Human-readable execution plan, one line per invocation by wave
    pub fn execution_plan(&self) -> String {
        let mut plan = String::new();
        for (i, wave) in self.waves.iter().enumerate() {
            let noun = if wave.len() == 1 { "target" } else { "targets" };
            plan.push_str(&format!("Wave {} ({} {}):\n", i, wave.len(), noun));
            for id in wave {
                if let Some(node) = self.nodes.get(id) {
                    let deps: Vec<String> = node.dependencies.iter().map(|d| d.to_string()).collect();
                    if deps.is_empty() {
                        plan.push_str(&format!("  {} -> {}\n", id, node.function));
                    } else {
                        plan.push_str(&format!(
                            "  {} -> {} (after: {})\n",
                            id,
                            node.function,
                            deps.join(", ")
                        ));
                    }
                }
            }
        }
        plan
    }
}

fn resolve_definition<'a>(
    config: &'a ProjectConfig,
    id: &TargetInstanceId,
) -> Result<&'a TargetDefinition, ConfigError> {
    let definition = config
        .target(&id.target)
        .ok_or_else(|| ConfigError::UnknownTarget(id.target.clone()))?;
    if let Some(variant) = &id.variant {
        if !definition.variants.contains_key(variant) {
            return Err(ConfigError::UnknownVariant {
                target: id.target.clone(),
                variant: variant.clone(),
            });
        }
    }
    Ok(definition)
}

fn command_defaults(id: &TargetInstanceId, config: &toml::Table) -> Result<CommandDefaults, ConfigError> {
    match config.get("command") {
        None => Ok(CommandDefaults::default()),
        Some(value) => value.clone().try_into().map_err(|e: toml::de::Error| {
            ConfigError::invalid(format!("{}: command", id), e.message().to_string())
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn project(s: &str) -> ProjectConfig {
        toml::from_str(s).unwrap()
    }

    fn build(config: &ProjectConfig, tokens: &[&str]) -> Result<InvocationGraph, GraphError> {
        let selection = Selection::parse(tokens).unwrap();
        InvocationGraph::build(config, &FunctionRegistry::with_builtins(), &selection)
    }

    fn id(s: &str) -> TargetInstanceId {
        TargetInstanceId::parse(s).unwrap()
    }

    const CHAIN: &str = r#"
        [targets.a]
        function = "exec"
        config = { executable = "/bin/true" }

        [targets.b]
        function = "exec"
        depends_on = ["a"]
        config = { executable = "/bin/true" }

        [targets.c]
        function = "exec"
        depends_on = ["a", "b"]
        config = { executable = "/bin/true" }

        [targets.lint]
        function = "exec"
        config = { executable = "/bin/true" }
    "#;

    #[test]
    fn test_transitive_dependencies_are_resolved() {
        let config = project(CHAIN);
        let graph = build(&config, &["b"]).unwrap();

        assert_eq!(graph.len(), 2);
        assert_eq!(graph.sorted(), &[id("a"), id("b")]);
        assert_eq!(graph.requested(), &[id("b")]);
        assert_eq!(graph.get(&id("b")).unwrap().dependencies(), &[id("a")]);
    }

    #[test]
    fn test_shared_dependency_is_one_node() {
        let config = project(CHAIN);
        let graph = build(&config, &["c", "b", "b"]).unwrap();

        assert_eq!(graph.len(), 3);
        assert_eq!(graph.requested(), &[id("c"), id("b")]);
        let dependents: Vec<_> = graph.dependents(&id("a")).cloned().collect();
        assert_eq!(dependents, vec![id("b"), id("c")]);
    }

    #[test]
    fn test_waves() {
        let config = project(CHAIN);
        let graph = build(&config, &["c", "lint"]).unwrap();

        assert_eq!(graph.waves().len(), 3);
        assert_eq!(graph.waves()[0], vec![id("a"), id("lint")]);
        assert_eq!(graph.waves()[1], vec![id("b")]);
        assert_eq!(graph.waves()[2], vec![id("c")]);

        let plan = graph.execution_plan();
        assert!(plan.contains("Wave 0 (2 targets)"));
        assert!(plan.contains("  c -> exec (after: a, b)"));
    }

    #[test]
    fn test_cycle_is_rejected() {
        let config = project(
            r#"
            [targets.a]
            function = "exec"
            depends_on = ["b"]
            config = { executable = "x" }

            [targets.b]
            function = "exec"
            depends_on = ["a"]
            config = { executable = "x" }
            "#,
        );
        let err = build(&config, &["a"]).unwrap_err();
        assert!(matches!(err, GraphError::Config(ConfigError::CyclicDependency(_))));
    }

    #[test]
    fn test_unknown_selectors() {
        let config = project(CHAIN);
        assert!(matches!(
            build(&config, &["missing"]),
            Err(GraphError::Config(ConfigError::UnknownTarget(_)))
        ));
        assert!(matches!(
            build(&config, &["a:nope"]),
            Err(GraphError::Config(ConfigError::UnknownVariant { .. }))
        ));
        assert!(matches!(build(&config, &[]), Err(GraphError::Selection(_))));
    }

    #[test]
    fn test_unknown_function() {
        let config = project(
            r#"
            [targets.a]
            function = "render"
            "#,
        );
        assert!(matches!(
            build(&config, &["a"]),
            Err(GraphError::Config(ConfigError::UnknownFunction { .. }))
        ));
    }

    const LAYERED: &str = r#"
        [config]
        from = "X"
        to = "out"
        shared = "base"

        [targets.copy]
        function = "file/copy"
        config = { from = "Y" }

        [targets.copy.variants.hosts]
        to = "hosts-out"

        [targets.sibling]
        function = "file/copy"
        config = { from = "Y" }

        [overrides.release]
        shared = "release"
    "#;

    #[test]
    fn test_override_layering_is_isolated() {
        let config = project(LAYERED);
        let graph = build(&config, &["copy", "--from=Z", "sibling"]).unwrap();

        let copy = graph.get(&id("copy")).unwrap();
        let sibling = graph.get(&id("sibling")).unwrap();
        assert_eq!(copy.config()["from"].as_str(), Some("Z"));
        assert_eq!(sibling.config()["from"].as_str(), Some("Y"));
        assert_eq!(sibling.config()["shared"].as_str(), Some("base"));
    }

    #[test]
    fn test_variant_and_override_layers() {
        let config = project(LAYERED);
        let graph = build(&config, &["release", "copy:hosts"]).unwrap();

        assert_eq!(graph.len(), 1);
        assert_eq!(graph.overrides(), &["release".to_string()]);
        let copy = graph.get(&id("copy:hosts")).unwrap();
        assert_eq!(copy.config()["from"].as_str(), Some("Y"));
        assert_eq!(copy.config()["to"].as_str(), Some("hosts-out"));
        assert_eq!(copy.config()["shared"].as_str(), Some("release"));
        assert_eq!(
            copy.layers(),
            &[
                "config".to_string(),
                "targets.copy.config".to_string(),
                "targets.copy.variants.hosts".to_string(),
                "overrides.release".to_string(),
            ]
        );
    }

    #[test]
    fn test_global_flags_skip_dependencies() {
        let config = project(
            r#"
            [targets.prepare]
            function = "exec"
            config = { executable = "/bin/true" }

            [targets.build]
            function = "exec"
            depends_on = ["prepare"]
            config = { executable = "/bin/true" }
            "#,
        );
        let graph = build(&config, &["--retries=3", "build"]).unwrap();

        assert_eq!(graph.get(&id("build")).unwrap().config()["retries"].as_integer(), Some(3));
        assert!(!graph.get(&id("prepare")).unwrap().config().contains_key("retries"));
    }

    #[test]
    fn test_command_defaults_from_isolated_config() {
        let config = project(
            r#"
            [config.command]
            timeout = "5s"

            [targets.build]
            function = "exec"
            config = { executable = "/bin/true" }
            "#,
        );
        let graph = build(&config, &["build", "--command.environment.LANG=C"]).unwrap();

        let defaults = graph.get(&id("build")).unwrap().command_defaults();
        assert_eq!(defaults.timeout, Some(Duration::from_secs(5)));
        assert_eq!(defaults.environment.get("LANG").map(String::as_str), Some("C"));
    }

    #[test]
    fn test_bad_function_config_fails_before_execution() {
        let config = project(
            r#"
            [targets.build]
            function = "exec"
            config = { args = ["x"] }
            "#,
        );
        assert!(matches!(
            build(&config, &["build"]),
            Err(GraphError::Config(ConfigError::InvalidValue { .. }))
        ));
    }
}
