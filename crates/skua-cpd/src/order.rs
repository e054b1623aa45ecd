use std::io::{Read, Write};

use skua_graph::Graph;

use crate::invalid_data;

/// A relabeling of graph node ids, used to index CPD rows.
///
/// CPD rows compress best when ids that are close in the graph are close in
/// the row, so rows are indexed by a depth-first preorder of the graph rather
/// than by raw node id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GraphOrder {
    to_index: Vec<u32>,
    from_index: Vec<u32>,
}

impl GraphOrder {
    /// Computes a depth-first preorder of `graph`, visiting out-edges in
    /// insertion order and covering every component.
    pub fn dfs_preorder(graph: &Graph) -> GraphOrder {
        let mut to_index = vec![u32::MAX; graph.num_nodes()];
        let mut from_index = Vec::with_capacity(graph.num_nodes());
        let mut stack = vec![];
        for root in 0..graph.num_nodes() as u32 {
            if to_index[root as usize] != u32::MAX {
                continue;
            }
            stack.push(root);
            while let Some(node) = stack.pop() {
                if to_index[node as usize] != u32::MAX {
                    continue;
                }
                to_index[node as usize] = from_index.len() as u32;
                from_index.push(node);
                // Reversed so the first out-edge is explored first.
                for edge in graph.outgoing(node).iter().rev() {
                    if to_index[edge.to as usize] == u32::MAX {
                        stack.push(edge.to);
                    }
                }
            }
        }
        GraphOrder {
            to_index,
            from_index,
        }
    }

    pub fn num_ids(&self) -> usize {
        self.from_index.len()
    }

    /// The row index of `node`.
    #[track_caller]
    pub fn to_index(&self, node: u32) -> usize {
        self.to_index[node as usize] as usize
    }

    /// The node at row `index`.
    #[track_caller]
    pub fn from_index(&self, index: usize) -> u32 {
        self.from_index[index]
    }

    pub fn save(&self, to: &mut impl Write) -> std::io::Result<()> {
        to.write_all(&(self.from_index.len() as u32).to_le_bytes())?;
        for &node in &self.from_index {
            to.write_all(&node.to_le_bytes())?;
        }
        Ok(())
    }

    pub fn load(from: &mut impl Read) -> std::io::Result<GraphOrder> {
        let mut bytes = [0; 4];
        from.read_exact(&mut bytes)?;
        let len = u32::from_le_bytes(bytes) as usize;

        let mut to_index = vec![u32::MAX; len];
        let mut from_index = Vec::with_capacity(len);
        for index in 0..len {
            from.read_exact(&mut bytes)?;
            let node = u32::from_le_bytes(bytes);
            if (node as usize) >= len {
                return Err(invalid_data("order entry out of range"));
            }
            if to_index[node as usize] != u32::MAX {
                return Err(invalid_data("order entry repeated"));
            }
            to_index[node as usize] = index as u32;
            from_index.push(node);
        }

        Ok(GraphOrder {
            to_index,
            from_index,
        })
    }

    /// Bytes of memory in use by the order.
    pub fn mem(&self) -> usize {
        (self.to_index.capacity() + self.from_index.capacity()) * std::mem::size_of::<u32>()
    }
}

#[cfg(test)]
fn branching_graph() -> Graph {
    // 0 -> {1, 2}, 1 -> 3, and an isolated node 4.
    let mut graph = Graph::new();
    for _ in 0..5 {
        graph.add_node(0, 0);
    }
    graph.add_edge(0, 1, 1.0);
    graph.add_edge(0, 2, 1.0);
    graph.add_edge(1, 3, 1.0);
    graph
}

#[test]
fn preorder_visits_first_edge_first() {
    let order = GraphOrder::dfs_preorder(&branching_graph());
    assert_eq!(order.num_ids(), 5);
    let visited: Vec<_> = (0..5).map(|i| order.from_index(i)).collect();
    assert_eq!(visited, vec![0, 1, 3, 2, 4]);
    for index in 0..5 {
        assert_eq!(order.to_index(order.from_index(index)), index);
    }
}

#[test]
fn order_round_trips() {
    let order = GraphOrder::dfs_preorder(&branching_graph());
    let mut bytes = vec![];
    order.save(&mut bytes).unwrap();
    let loaded = GraphOrder::load(&mut &bytes[..]).unwrap();
    assert!(loaded == order);
}

#[test]
fn load_rejects_corrupt_orders() {
    let order = GraphOrder::dfs_preorder(&branching_graph());
    let mut bytes = vec![];
    order.save(&mut bytes).unwrap();

    // Second entry duplicates the first.
    let mut bad = bytes.clone();
    let first = bad[4..8].to_vec();
    bad[8..12].copy_from_slice(&first);
    let err = GraphOrder::load(&mut &bad[..]).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);

    // Entry beyond the id range.
    bytes[4..8].copy_from_slice(&77u32.to_le_bytes());
    let err = GraphOrder::load(&mut &bytes[..]).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
}
