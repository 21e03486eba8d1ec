//! Dependency tracking between formula properties
//!
//! Nodes are formula properties, identified by their position in schema
//! order. Edges are stored as index lists in both directions, so the graph
//! owns no references and cycles in the schema are just data.

/// Dependency graph for formula properties
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Node → nodes that read it (dependents)
    dependents: Vec<Vec<usize>>,
    /// Node → nodes it reads (precedents)
    precedents: Vec<Vec<usize>>,
}

/// Result of ordering a [`DependencyGraph`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluationOrder {
    /// Acyclic nodes, every node after all of its precedents
    pub order: Vec<usize>,
    /// Nodes that sit on a cycle, ascending
    pub cyclic: Vec<usize>,
}

const UNVISITED: usize = usize::MAX;

impl DependencyGraph {
    /// Create a graph with `len` nodes and no edges
    pub fn with_nodes(len: usize) -> Self {
        Self {
            dependents: vec![Vec::new(); len],
            precedents: vec![Vec::new(); len],
        }
    }

    pub fn len(&self) -> usize {
        self.precedents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.precedents.is_empty()
    }

    /// Add a dependency: dependent depends on precedent
    pub fn add_dependency(&mut self, precedent: usize, dependent: usize) {
        if !self.precedents[dependent].contains(&precedent) {
            self.precedents[dependent].push(precedent);
            self.dependents[precedent].push(dependent);
        }
    }

    /// Nodes that read the given node
    pub fn get_dependents(&self, node: usize) -> impl Iterator<Item = usize> + '_ {
        self.dependents[node].iter().copied()
    }

    /// Nodes the given node reads
    pub fn get_precedents(&self, node: usize) -> impl Iterator<Item = usize> + '_ {
        self.precedents[node].iter().copied()
    }

    /// Strongly connected components, precedents before dependents.
    ///
    /// Iterative Tarjan: roots are visited in index order and edges in
    /// insertion order, so the result is deterministic and the walk never
    /// recurses on the call stack.
    pub fn strongly_connected_components(&self) -> Vec<Vec<usize>> {
        let n = self.len();
        let mut index = vec![UNVISITED; n];
        let mut lowlink = vec![0; n];
        let mut on_stack = vec![false; n];
        let mut stack = Vec::new();
        let mut next_index = 0;
        let mut components = Vec::new();
        // (node, position of the next edge to follow)
        let mut call_stack: Vec<(usize, usize)> = Vec::new();

        for root in 0..n {
            if index[root] != UNVISITED {
                continue;
            }
            index[root] = next_index;
            lowlink[root] = next_index;
            next_index += 1;
            stack.push(root);
            on_stack[root] = true;
            call_stack.push((root, 0));

            while let Some(frame) = call_stack.last_mut() {
                let node = frame.0;
                if let Some(&next) = self.precedents[node].get(frame.1) {
                    frame.1 += 1;
                    if index[next] == UNVISITED {
                        index[next] = next_index;
                        lowlink[next] = next_index;
                        next_index += 1;
                        stack.push(next);
                        on_stack[next] = true;
                        call_stack.push((next, 0));
                    } else if on_stack[next] {
                        lowlink[node] = lowlink[node].min(index[next]);
                    }
                    continue;
                }

                call_stack.pop();
                if let Some(&(parent, _)) = call_stack.last() {
                    lowlink[parent] = lowlink[parent].min(lowlink[node]);
                }
                if lowlink[node] == index[node] {
                    let mut component = Vec::new();
                    while let Some(member) = stack.pop() {
                        on_stack[member] = false;
                        component.push(member);
                        if member == node {
                            break;
                        }
                    }
                    component.sort_unstable();
                    components.push(component);
                }
            }
        }

        components
    }

    /// Topological order of the acyclic part, plus every node on a cycle
    pub fn evaluation_order(&self) -> EvaluationOrder {
        let mut result = EvaluationOrder::default();
        for component in self.strongly_connected_components() {
            match component.as_slice() {
                [single] if !self.precedents[*single].contains(single) => {
                    result.order.push(*single)
                }
                _ => result.cyclic.extend(component),
            }
        }
        result.cyclic.sort_unstable();
        result
    }

    /// Whether the node sits on a cycle
    pub fn has_circular_reference(&self, node: usize) -> bool {
        self.evaluation_order().cyclic.contains(&node)
    }

    /// The node and everything it transitively reads
    pub fn precedent_closure(&self, node: usize) -> Vec<bool> {
        self.reachable(node, &self.precedents)
    }

    /// The node and everything that transitively reads it
    pub fn dependent_closure(&self, node: usize) -> Vec<bool> {
        self.reachable(node, &self.dependents)
    }

    fn reachable(&self, start: usize, edges: &[Vec<usize>]) -> Vec<bool> {
        let mut seen = vec![false; self.len()];
        let mut pending = vec![start];
        seen[start] = true;
        while let Some(node) = pending.pop() {
            for &next in &edges[node] {
                if !seen[next] {
                    seen[next] = true;
                    pending.push(next);
                }
            }
        }
        seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_add_dependency() {
        let mut graph = DependencyGraph::with_nodes(2);
        graph.add_dependency(0, 1);
        graph.add_dependency(0, 1);

        assert_eq!(graph.get_dependents(0).collect::<Vec<_>>(), vec![1]);
        assert_eq!(graph.get_precedents(1).collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn test_order_puts_precedents_first() {
        // 0 reads 2, 2 reads 1
        let mut graph = DependencyGraph::with_nodes(3);
        graph.add_dependency(2, 0);
        graph.add_dependency(1, 2);

        let order = graph.evaluation_order();
        assert_eq!(order.order, vec![1, 2, 0]);
        assert!(order.cyclic.is_empty());
    }

    #[test]
    fn test_circular_reference() {
        // 0 -> 1 -> 2 -> 0, and 3 reads 0
        let mut graph = DependencyGraph::with_nodes(4);
        graph.add_dependency(0, 1);
        graph.add_dependency(1, 2);
        graph.add_dependency(2, 0);
        graph.add_dependency(0, 3);

        let order = graph.evaluation_order();
        assert_eq!(order.cyclic, vec![0, 1, 2]);
        assert_eq!(order.order, vec![3]);
        assert!(graph.has_circular_reference(1));
        assert!(!graph.has_circular_reference(3));
    }

    #[test]
    fn test_self_reference_is_cycle() {
        let mut graph = DependencyGraph::with_nodes(2);
        graph.add_dependency(0, 0);

        let order = graph.evaluation_order();
        assert_eq!(order.cyclic, vec![0]);
        assert_eq!(order.order, vec![1]);
    }

    #[test]
    fn test_every_member_of_figure_eight_is_cyclic() {
        // Two cycles sharing node 0: 0 <-> 1 and 0 <-> 2
        let mut graph = DependencyGraph::with_nodes(3);
        graph.add_dependency(1, 0);
        graph.add_dependency(0, 1);
        graph.add_dependency(2, 0);
        graph.add_dependency(0, 2);

        assert_eq!(graph.evaluation_order().cyclic, vec![0, 1, 2]);
    }

    #[test]
    fn test_long_chain_does_not_recurse() {
        let n = 100_000;
        let mut graph = DependencyGraph::with_nodes(n);
        for i in 1..n {
            graph.add_dependency(i, i - 1);
        }
        let order = graph.evaluation_order();
        assert_eq!(order.order.len(), n);
        assert_eq!(order.order[0], n - 1);
    }

    #[test]
    fn test_closures() {
        let mut graph = DependencyGraph::with_nodes(4);
        graph.add_dependency(0, 1);
        graph.add_dependency(1, 2);

        assert_eq!(graph.precedent_closure(2), vec![true, true, true, false]);
        assert_eq!(graph.dependent_closure(1), vec![false, true, true, false]);
    }
}
