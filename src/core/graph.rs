use super::{ConfigError, Item};
use ahash::{HashMap, HashMapExt};

/// Dependency relation of an instance, checked to be acyclic.
///
/// Items are addressed by position. `order` lists positions level by level:
/// first every item without dependencies, then every item whose dependencies
/// are all in earlier levels, and so on. Within a level, items are sorted by id.
#[derive(Clone, Debug, Default)]
pub struct DependencyGraph {
    order: Vec<usize>,
    depth: Vec<usize>,
    dependencies: Vec<Vec<usize>>,
    dependents: Vec<Vec<usize>>,
}

impl DependencyGraph {
    /// Builds the graph from the dependency lists of the items.
    ///
    /// # Errors
    /// - If an item depends on itself.
    /// - If a dependency does not name a known item.
    /// - If the dependencies form a cycle. The error names one item on the cycle.
    pub fn build(items: &[Item], index: &HashMap<String, usize>) -> Result<Self, ConfigError> {
        let mut dependencies = vec![Vec::new(); items.len()];
        let mut dependents = vec![Vec::new(); items.len()];

        for (i, item) in items.iter().enumerate() {
            for dependency in &item.depends_on {
                if *dependency == item.id {
                    return Err(ConfigError::SelfDependency(item.id.clone()));
                }
                let &d = index
                    .get(dependency)
                    .ok_or_else(|| ConfigError::UnknownDependency {
                        item: item.id.clone(),
                        dependency: dependency.clone(),
                    })?;
                if !dependencies[i].contains(&d) {
                    dependencies[i].push(d);
                    dependents[d].push(i);
                }
            }
        }

        let by_id = |a: &usize, b: &usize| items[*a].id.cmp(&items[*b].id);
        for list in dependencies.iter_mut().chain(dependents.iter_mut()) {
            list.sort_unstable_by(by_id);
        }

        let mut remaining: Vec<usize> = dependencies.iter().map(Vec::len).collect();
        let mut depth = vec![0; items.len()];
        let mut order = Vec::with_capacity(items.len());
        let mut level: Vec<usize> = (0..items.len()).filter(|&i| remaining[i] == 0).collect();
        let mut current = 0;

        while !level.is_empty() {
            level.sort_unstable_by(by_id);
            let mut next = Vec::new();
            for &i in &level {
                depth[i] = current;
                for &dependent in &dependents[i] {
                    remaining[dependent] -= 1;
                    if remaining[dependent] == 0 {
                        next.push(dependent);
                    }
                }
            }
            order.append(&mut level);
            level = next;
            current += 1;
        }

        if order.len() < items.len() {
            let member = find_cycle_member(items, &dependencies, &remaining);
            return Err(ConfigError::Cycle(items[member].id.clone()));
        }

        Ok(Self {
            order,
            depth,
            dependencies,
            dependents,
        })
    }

    /// Positions in topological order, ties broken by id.
    #[must_use]
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Length of the longest dependency chain leading to the item.
    #[must_use]
    pub fn depth(&self, item: usize) -> usize {
        self.depth[item]
    }

    /// Direct dependencies of the item, sorted by id.
    #[must_use]
    pub fn dependencies(&self, item: usize) -> &[usize] {
        &self.dependencies[item]
    }

    /// Items that directly depend on the item, sorted by id.
    #[must_use]
    pub fn dependents(&self, item: usize) -> &[usize] {
        &self.dependents[item]
    }

    #[must_use]
    pub fn dependent_count(&self, item: usize) -> usize {
        self.dependents[item].len()
    }
}

/// Walks unresolved dependencies from the smallest unresolved id until an item repeats.
/// Every unresolved item has an unresolved dependency, so the walk always closes a cycle.
fn find_cycle_member(items: &[Item], dependencies: &[Vec<usize>], remaining: &[usize]) -> usize {
    let unresolved = |i: &usize| remaining[*i] > 0;
    let Some(mut current) = (0..items.len())
        .filter(unresolved)
        .min_by(|a, b| items[*a].id.cmp(&items[*b].id))
    else {
        unreachable!("Cycle without unresolved items");
    };

    let mut visited = vec![false; items.len()];
    while !visited[current] {
        visited[current] = true;
        let Some(&next) = dependencies[current].iter().find(|d| unresolved(d)) else {
            unreachable!("Unresolved item without unresolved dependency");
        };
        current = next;
    }
    current
}

/// Returns the item ids in dependency order, ties at equal depth broken by id ascending.
///
/// # Errors
/// - If an id is defined twice.
/// - If a dependency is unknown, an item depends on itself or the dependencies form a cycle.
pub fn topological_order(items: &[Item]) -> Result<Vec<String>, ConfigError> {
    let mut index = HashMap::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        if index.insert(item.id.clone(), i).is_some() {
            return Err(ConfigError::DuplicateItem(item.id.clone()));
        }
    }

    let graph = DependencyGraph::build(items, &index)?;
    Ok(graph.order.iter().map(|&i| items[i].id.clone()).collect())
}
