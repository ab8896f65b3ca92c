//! Graph construction and validation for task sets.
//!
//! The builder takes the declared tasks with their dependencies and constructs
//! a directed acyclic graph. Validation happens entirely here, before any job
//! is started: duplicate ids, unknown dependency ids, and cycles are all
//! rejected with a [`GraphError`].

use crate::errors::GraphError;
use crate::task::TaskInput;
use std::collections::{HashMap, HashSet};

/// Index into the task list.
pub type TaskIndex = usize;

/// A validated directed acyclic graph of task definitions.
#[derive(Debug, Clone)]
pub struct TaskGraph {
    /// Tasks in declaration order.
    inputs: Vec<TaskInput>,
    /// Map from task id to index.
    index_map: HashMap<String, TaskIndex>,
    /// Forward edges: index -> tasks that depend on it.
    forward_edges: Vec<Vec<TaskIndex>>,
    /// Reverse edges: index -> tasks it depends on.
    reverse_edges: Vec<Vec<TaskIndex>>,
}

impl TaskGraph {
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Get all task definitions in declaration order.
    pub fn inputs(&self) -> &[TaskInput] {
        &self.inputs
    }

    /// Get the index for a task id.
    pub fn index_of(&self, id: &str) -> Option<TaskIndex> {
        self.index_map.get(id).copied()
    }

    /// Tasks that depend on the given task.
    pub fn dependents(&self, index: TaskIndex) -> &[TaskIndex] {
        self.forward_edges.get(index).map_or(&[], |v| v.as_slice())
    }

    /// Tasks the given task depends on.
    pub fn dependencies(&self, index: TaskIndex) -> &[TaskIndex] {
        self.reverse_edges.get(index).map_or(&[], |v| v.as_slice())
    }

    /// Check whether every dependency of a task is in the completed set.
    pub fn dependencies_satisfied(
        &self,
        index: TaskIndex,
        completed: &HashSet<TaskIndex>,
    ) -> bool {
        self.dependencies(index)
            .iter()
            .all(|dep| completed.contains(dep))
    }
}

/// Builder for validated task graphs.
pub struct GraphBuilder {
    inputs: Vec<TaskInput>,
}

impl GraphBuilder {
    pub fn new(inputs: Vec<TaskInput>) -> Self {
        Self { inputs }
    }

    /// Build the task graph, validating structure:
    /// - task ids must be unique
    /// - all dependencies must reference declared tasks
    /// - the dependency relation must be acyclic
    pub fn build(self) -> Result<TaskGraph, GraphError> {
        let mut index_map = HashMap::new();
        for (i, input) in self.inputs.iter().enumerate() {
            if index_map.insert(input.id.clone(), i).is_some() {
                return Err(GraphError::DuplicateTask {
                    id: input.id.clone(),
                });
            }
        }

        let mut forward_edges: Vec<Vec<TaskIndex>> = vec![Vec::new(); self.inputs.len()];
        let mut reverse_edges: Vec<Vec<TaskIndex>> = vec![Vec::new(); self.inputs.len()];

        for (to_idx, input) in self.inputs.iter().enumerate() {
            for dep in &input.depends_on {
                let from_idx = *index_map.get(dep).ok_or_else(|| {
                    GraphError::UnknownDependency {
                        task: input.id.clone(),
                        dependency: dep.clone(),
                    }
                })?;
                forward_edges[from_idx].push(to_idx);
                reverse_edges[to_idx].push(from_idx);
            }
        }

        let graph = TaskGraph {
            inputs: self.inputs,
            index_map,
            forward_edges,
            reverse_edges,
        };

        Self::validate_no_cycles(&graph)?;

        Ok(graph)
    }

    /// Cycle check via Kahn's algorithm.
    fn validate_no_cycles(graph: &TaskGraph) -> Result<(), GraphError> {
        let mut in_degree: Vec<usize> =
            graph.reverse_edges.iter().map(|deps| deps.len()).collect();

        let mut queue: Vec<TaskIndex> = in_degree
            .iter()
            .enumerate()
            .filter(|&(_, deg)| *deg == 0)
            .map(|(i, _)| i)
            .collect();

        let mut processed = 0;

        while let Some(node) = queue.pop() {
            processed += 1;
            for &dependent in graph.dependents(node) {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    queue.push(dependent);
                }
            }
        }

        if processed != graph.len() {
            let involved: Vec<String> = in_degree
                .iter()
                .enumerate()
                .filter(|&(_, deg)| *deg > 0)
                .filter_map(|(i, _)| graph.inputs.get(i).map(|t| t.id.clone()))
                .collect();
            return Err(GraphError::CycleDetected { involved });
        }

        Ok(())
    }
}
