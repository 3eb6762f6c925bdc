//! Task registry: the resolved, read-only mapping of names to task nodes

use crate::engine::action::Action;
use crate::engine::node::TaskNode;
use crate::error::{RegistryError, RegistryResult, TaskError, TaskResult};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Owns every task node of one task graph
///
/// Dependencies are resolved when a task is registered, so every name a
/// task depends on must already be present. This also makes cycles
/// impossible to express through [`Registry::register`]; use
/// [`RegistryBuilder`] to declare tasks in any order.
#[derive(Debug, Default)]
pub struct Registry {
    tasks: HashMap<String, Arc<TaskNode>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task under `name`
    ///
    /// Rejects empty names, names already registered and dependencies that
    /// are not registered yet. Repeated dependency names collapse into one.
    pub fn register<A>(&mut self, name: &str, deps: &[&str], action: A) -> RegistryResult<Arc<TaskNode>>
    where
        A: Action + 'static,
    {
        self.insert(name, deps, Box::new(action))
    }

    fn insert(&mut self, name: &str, deps: &[&str], action: Box<dyn Action>) -> RegistryResult<Arc<TaskNode>> {
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.tasks.contains_key(name) {
            return Err(RegistryError::DuplicateTask(name.to_string()));
        }

        let mut seen = HashSet::new();
        let mut resolved = Vec::with_capacity(deps.len());
        for dep in deps {
            if !seen.insert(*dep) {
                continue;
            }
            let node = self
                .tasks
                .get(*dep)
                .ok_or_else(|| RegistryError::UnknownDependency {
                    task: name.to_string(),
                    dependency: dep.to_string(),
                })?;
            resolved.push(Arc::clone(node));
        }

        let node = Arc::new(TaskNode::new(name.to_string(), resolved, action));
        self.tasks.insert(name.to_string(), Arc::clone(&node));
        Ok(node)
    }

    /// Find a task by name
    pub fn lookup(&self, name: &str) -> TaskResult<Arc<TaskNode>> {
        self.tasks
            .get(name)
            .cloned()
            .ok_or_else(|| TaskError::NotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    /// Registered task names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tasks.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

struct Declaration {
    name: String,
    deps: Vec<String>,
    action: Box<dyn Action>,
}

/// Collects task declarations in any order and resolves them in one pass
#[derive(Default)]
pub struct RegistryBuilder {
    declarations: Vec<Declaration>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a task; nothing is checked until [`RegistryBuilder::build`]
    pub fn task<A>(mut self, name: impl Into<String>, deps: Vec<String>, action: A) -> Self
    where
        A: Action + 'static,
    {
        self.add(name, deps, action);
        self
    }

    /// Declare a task through a mutable reference
    pub fn add<A>(&mut self, name: impl Into<String>, deps: Vec<String>, action: A)
    where
        A: Action + 'static,
    {
        self.declarations.push(Declaration {
            name: name.into(),
            deps,
            action: Box::new(action),
        });
    }

    /// Resolve every declaration into a registry
    ///
    /// Checks names, unknown dependencies and cycles before registering
    /// tasks dependencies-first.
    pub fn build(self) -> RegistryResult<Registry> {
        let mut index: HashMap<&str, usize> = HashMap::new();
        for (i, decl) in self.declarations.iter().enumerate() {
            if decl.name.is_empty() {
                return Err(RegistryError::EmptyName);
            }
            if index.insert(decl.name.as_str(), i).is_some() {
                return Err(RegistryError::DuplicateTask(decl.name.clone()));
            }
        }

        for decl in &self.declarations {
            for dep in &decl.deps {
                if !index.contains_key(dep.as_str()) {
                    return Err(RegistryError::UnknownDependency {
                        task: decl.name.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }

        let mut order = Vec::with_capacity(self.declarations.len());
        let mut visited = HashSet::new();
        let mut stack = Vec::new();
        for decl in &self.declarations {
            visit(&decl.name, &self.declarations, &index, &mut visited, &mut stack, &mut order)?;
        }

        let mut slots: Vec<Option<Declaration>> = self.declarations.into_iter().map(Some).collect();
        let mut registry = Registry::new();
        for i in order {
            if let Some(decl) = slots[i].take() {
                let deps: Vec<&str> = decl.deps.iter().map(String::as_str).collect();
                registry.insert(&decl.name, &deps, decl.action)?;
            }
        }

        Ok(registry)
    }
}

/// Depth-first walk recording post-order; a name met again while still on
/// the stack closes a cycle
fn visit(
    name: &str,
    declarations: &[Declaration],
    index: &HashMap<&str, usize>,
    visited: &mut HashSet<String>,
    stack: &mut Vec<String>,
    order: &mut Vec<usize>,
) -> RegistryResult<()> {
    if let Some(pos) = stack.iter().position(|n| n == name) {
        let mut cycle: Vec<String> = stack[pos..].to_vec();
        cycle.push(name.to_string());
        return Err(RegistryError::Cycle(cycle));
    }

    if visited.contains(name) {
        return Ok(());
    }

    let Some(&i) = index.get(name) else {
        return Ok(());
    };

    stack.push(name.to_string());
    for dep in &declarations[i].deps {
        visit(dep, declarations, index, visited, stack, order)?;
    }
    stack.pop();

    visited.insert(name.to_string());
    order.push(i);

    Ok(())
}
