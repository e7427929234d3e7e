use priority_queue::PriorityQueue;

use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::geodesy::distance_meters;
use crate::osm_fetcher::WaterwayData;
use crate::types::{GeoPoint, OsmNodeId};

// Total order over non-NaN distances, so they can be queue priorities.
#[derive(Debug, Clone, Copy, PartialEq)]
struct OrderedFloat(f64);

impl Eq for OrderedFloat {}

impl Ord for OrderedFloat {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl PartialOrd for OrderedFloat {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// One edge leaving a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub end: OsmNodeId,
    pub distance_m: f64,
}

#[derive(Debug, Clone)]
pub struct NodeInfo {
    pub location: GeoPoint,
    pub connections: Vec<Segment>,
}

/// Undirected waterway graph weighted by great-circle distance.
///
/// Nodes are kept in id order, so scans over the graph are deterministic.
#[derive(Debug, Default)]
pub struct WaterwayGraph {
    nodes: BTreeMap<OsmNodeId, NodeInfo>,
}

impl WaterwayGraph {
    /// Builds the graph from consecutive node pairs of every way.
    ///
    /// Pairs with an endpoint missing from the node table are dropped.
    pub fn from_data(data: &WaterwayData) -> Self {
        let mut graph = WaterwayGraph::default();
        let mut dropped = 0usize;
        for way in &data.ways {
            for pair in way.windows(2) {
                let (start, end) = (pair[0], pair[1]);
                let (Some(a), Some(b)) = (data.nodes.get(&start), data.nodes.get(&end)) else {
                    dropped += 1;
                    continue;
                };
                graph.add_edge(start, *a, end, *b);
            }
        }
        if dropped > 0 {
            log::debug!("Dropped {} segments with unknown endpoints", dropped);
        }
        log::info!("Built waterway graph with {} nodes", graph.node_count());
        graph
    }

    pub fn add_edge(&mut self, start: OsmNodeId, a: GeoPoint, end: OsmNodeId, b: GeoPoint) {
        let distance_m = distance_meters(&a, &b);
        self.entry(start, a).connections.push(Segment { end, distance_m });
        self.entry(end, b).connections.push(Segment {
            end: start,
            distance_m,
        });
    }

    fn entry(&mut self, id: OsmNodeId, location: GeoPoint) -> &mut NodeInfo {
        self.nodes.entry(id).or_insert_with(|| NodeInfo {
            location,
            connections: Vec::new(),
        })
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn location(&self, id: OsmNodeId) -> Option<GeoPoint> {
        self.nodes.get(&id).map(|node| node.location)
    }

    pub fn neighbours(&self, id: OsmNodeId) -> &[Segment] {
        self.nodes
            .get(&id)
            .map(|node| node.connections.as_slice())
            .unwrap_or(&[])
    }

    /// Node closest to `point`. Exact ties go to the smallest id.
    pub fn closest_node(&self, point: &GeoPoint) -> Option<OsmNodeId> {
        let mut closest_node_id = None;
        let mut closest_distance = f64::INFINITY;
        for (node_id, node_info) in &self.nodes {
            let distance = distance_meters(point, &node_info.location);
            if distance < closest_distance {
                closest_distance = distance;
                closest_node_id = Some(*node_id);
            }
        }
        closest_node_id
    }

    /// Dijkstra from `start`, stopping once `goal` is settled.
    ///
    /// Returns the node ids from `start` to `goal`, or `None` if `goal` is unreachable.
    pub fn shortest_path(&self, start: OsmNodeId, goal: OsmNodeId) -> Option<Vec<OsmNodeId>> {
        if !self.nodes.contains_key(&start) || !self.nodes.contains_key(&goal) {
            return None;
        }

        let mut distances: HashMap<OsmNodeId, f64> = HashMap::new();
        let mut parents: HashMap<OsmNodeId, OsmNodeId> = HashMap::new();
        let mut settled: HashSet<OsmNodeId> = HashSet::new();
        let mut frontier = PriorityQueue::new();

        distances.insert(start, 0.0);
        frontier.push(start, Reverse(OrderedFloat(0.0)));

        while let Some((current, Reverse(OrderedFloat(current_distance)))) = frontier.pop() {
            settled.insert(current);
            if current == goal {
                break;
            }
            for segment in self.neighbours(current) {
                if settled.contains(&segment.end) {
                    continue;
                }
                let candidate = current_distance + segment.distance_m;
                let known = distances.get(&segment.end).copied().unwrap_or(f64::INFINITY);
                if candidate < known {
                    distances.insert(segment.end, candidate);
                    parents.insert(segment.end, current);
                    // Only ever lowers the distance, so replacing the priority is safe.
                    frontier.push(segment.end, Reverse(OrderedFloat(candidate)));
                }
            }
        }

        reconstruct_path(&parents, start, goal)
    }
}

fn reconstruct_path(
    parents: &HashMap<OsmNodeId, OsmNodeId>,
    start: OsmNodeId,
    goal: OsmNodeId,
) -> Option<Vec<OsmNodeId>> {
    let mut path = vec![goal];
    let mut current = goal;
    while current != start {
        current = *parents.get(&current)?;
        path.push(current);
    }
    path.reverse();
    Some(path)
}
