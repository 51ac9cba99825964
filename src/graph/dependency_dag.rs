use crate::error::{ScheduleError, ScheduleResult};
use crate::task::{Task, TaskId};
use petgraph::algo::{has_path_connecting, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Bfs;
use std::collections::HashMap;

/// Finish-to-start graph over a task collection. Edges run predecessor -> successor.
pub struct DependencyDag {
    pub graph: DiGraph<TaskId, ()>,
    pub id_to_index: HashMap<TaskId, NodeIndex>,
}

impl DependencyDag {
    /// Dependencies naming tasks outside `tasks` are skipped.
    pub fn build(tasks: &[Task]) -> Self {
        let mut graph: DiGraph<TaskId, ()> = DiGraph::with_capacity(tasks.len(), tasks.len());
        let mut id_to_index: HashMap<TaskId, NodeIndex> = HashMap::with_capacity(tasks.len());

        for task in tasks {
            let node_ix = graph.add_node(task.id);
            id_to_index.insert(task.id, node_ix);
        }

        for task in tasks {
            let Some(&successor) = id_to_index.get(&task.id) else {
                continue;
            };
            for dependency in &task.dependencies {
                if let Some(&predecessor) = id_to_index.get(dependency) {
                    graph.add_edge(predecessor, successor, ());
                }
            }
        }

        Self { graph, id_to_index }
    }

    /// True when `to` can be reached from `from` by following edges forward.
    /// Each check is a single DFS, so O(V+E).
    pub fn reaches(&self, from: TaskId, to: TaskId) -> bool {
        match (self.id_to_index.get(&from), self.id_to_index.get(&to)) {
            (Some(&a), Some(&b)) => has_path_connecting(&self.graph, a, b, None),
            _ => false,
        }
    }

    /// Adding `predecessor -> successor` closes a loop when the successor is
    /// already upstream of the predecessor.
    pub fn would_create_cycle(&self, predecessor: TaskId, successor: TaskId) -> bool {
        predecessor == successor || self.reaches(successor, predecessor)
    }

    pub fn topological_order(&self) -> ScheduleResult<Vec<TaskId>> {
        let order = toposort(&self.graph, None).map_err(|cycle| {
            let task = self.graph[cycle.node_id()];
            ScheduleError::invalid(format!("dependency cycle through task {task}"))
        })?;
        Ok(order.into_iter().map(|ix| self.graph[ix]).collect())
    }

    /// Every task that transitively depends on `root`, excluding `root`.
    pub fn downstream_of(&self, root: TaskId) -> Vec<TaskId> {
        let Some(&start) = self.id_to_index.get(&root) else {
            return Vec::new();
        };
        let mut bfs = Bfs::new(&self.graph, start);
        let mut downstream = Vec::new();
        while let Some(node_ix) = bfs.next(&self.graph) {
            if node_ix != start {
                downstream.push(self.graph[node_ix]);
            }
        }
        downstream
    }
}
