//! Network topology: a symmetric inter-node distance matrix loaded from a
//! text file, used by the hierarchical installer to score router/computer
//! pairings.
//!
//! Grounded on `Edge/topology.{h,cpp}`: blank lines and `#`-comments are
//! skipped; each remaining line is `<node-name> <d1> <d2> ... <dN>`.

use std::collections::HashMap;
use std::path::Path;

use crate::error::TopologyError;

/// A symmetric distance matrix over a fixed set of named nodes.
#[derive(Debug, Clone)]
pub struct Topology {
    names: HashMap<String, usize>,
    distances: Vec<f64>,
}

impl Topology {
    /// Load a topology from a text file.
    ///
    /// # Errors
    /// Returns [`TopologyError::InvalidFile`] if the file cannot be read,
    /// and [`TopologyError::Malformed`] if a row's width does not match
    /// the node count.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TopologyError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|_| TopologyError::InvalidFile(path.display().to_string()))?;
        Self::parse(&raw)
    }

    /// Parse a topology from its textual representation.
    ///
    /// # Errors
    /// Returns [`TopologyError::Malformed`] if a row's width does not
    /// match the node count, or a node name repeats.
    pub fn parse(raw: &str) -> Result<Self, TopologyError> {
        let mut names = HashMap::new();
        let mut rows: Vec<Vec<f64>> = Vec::new();

        for line in raw.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut fields = line.split_whitespace();
            let name = fields
                .next()
                .ok_or_else(|| TopologyError::Malformed(format!("empty row: '{line}'")))?;
            if names.contains_key(name) {
                return Err(TopologyError::Malformed(format!("duplicate node name '{name}'")));
            }
            let distances: Vec<f64> = fields
                .map(|f| {
                    f.parse::<f64>()
                        .map_err(|_| TopologyError::Malformed(format!("non-numeric distance '{f}'")))
                })
                .collect::<Result<_, _>>()?;
            names.insert(name.to_string(), rows.len());
            rows.push(distances);
        }

        let n = rows.len();
        for row in &rows {
            if row.len() != n {
                return Err(TopologyError::Malformed(format!(
                    "expected {n} distances per row, found {}",
                    row.len()
                )));
            }
        }

        Ok(Self {
            names,
            distances: rows.into_iter().flatten().collect(),
        })
    }

    /// The number of nodes in this topology.
    #[must_use]
    pub fn num_nodes(&self) -> usize {
        self.names.len()
    }

    /// Every node name known to this topology, in no particular order.
    #[must_use]
    pub fn node_names(&self) -> impl Iterator<Item = &str> {
        self.names.keys().map(String::as_str)
    }

    /// The distance between two named nodes.
    ///
    /// # Errors
    /// Returns [`TopologyError::InvalidNode`] if either name is unknown.
    pub fn distance(&self, src: &str, dst: &str) -> Result<f64, TopologyError> {
        let i = *self
            .names
            .get(src)
            .ok_or_else(|| TopologyError::InvalidNode(src.to_string()))?;
        let j = *self
            .names
            .get(dst)
            .ok_or_else(|| TopologyError::InvalidNode(dst.to_string()))?;
        Ok(self.distances[i * self.num_nodes() + j])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# comment line, and a blank line follows

a 0 1 2
b 1 0 3
c 2 3 0
";

    #[test]
    fn parses_comments_and_blank_lines() {
        let topo = Topology::parse(SAMPLE).unwrap();
        assert_eq!(topo.num_nodes(), 3);
        assert_eq!(topo.distance("a", "c").unwrap(), 2.0);
        assert_eq!(topo.distance("c", "b").unwrap(), 3.0);
    }

    #[test]
    fn unknown_node_is_rejected() {
        let topo = Topology::parse(SAMPLE).unwrap();
        assert!(matches!(
            topo.distance("a", "z"),
            Err(TopologyError::InvalidNode(_))
        ));
    }

    #[test]
    fn mismatched_row_width_is_malformed() {
        let bad = "a 0 1\nb 1 0 2\n";
        assert!(matches!(Topology::parse(bad), Err(TopologyError::Malformed(_))));
    }
}
