use crate::errors::Error;
use crate::*;
use serde::{Deserialize, Serialize};
use std::io::{BufWriter, Write};

type Result<T> = std::result::Result<T, Error>;

/// Node and facet arrays of a sealed model, ready for a tetrahedral mesher.
///
/// Node marks carry the ordinal of the surface a node came from; facet marks
/// carry the per-surface mark, or the large boundary flag for facets on the
/// free border of an interior fault.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TetgenInput {
    /// deduplicated node positions
    pub nodes: Vec<Point3>,
    /// per-node surface marks
    pub node_marks: Vec<i32>,
    /// triangular facets as node indices
    pub facets: Vec<[usize; 3]>,
    /// per-facet marks
    pub facet_marks: Vec<i32>,
}

impl TetgenInput {
    /// Whether every facet index is in range.
    pub fn indices_in_range(&self) -> bool {
        self.facets
            .iter()
            .flatten()
            .all(|&n| n < self.nodes.len())
    }
}

/// Writes smesh data to an output stream.
///
/// The layout is one comment line, the node header `N 3 1 0`, one line per
/// node `i x y z mark`, a comment, the facet header `M 1`, one line per facet
/// `3 n1 n2 n3 mark`, then empty hole and region sections.
/// # Examples
/// ```
/// use strata_mesh::{base::*, smesh, TetgenInput};
/// let input = TetgenInput {
///     nodes: vec![
///         Point3::new(0.0, 0.0, 0.0),
///         Point3::new(1.0, 0.0, 0.0),
///         Point3::new(0.0, 1.0, 0.0),
///     ],
///     node_marks: vec![0, 0, 0],
///     facets: vec![[0, 1, 2]],
///     facet_marks: vec![0],
/// };
/// let mut buffer = Vec::new();
/// smesh::write(&input, &mut buffer).unwrap();
/// assert!(String::from_utf8(buffer).unwrap().starts_with("# nodes\n3 3 1 0\n"));
/// ```
pub fn write<W: Write>(input: &TetgenInput, writer: W) -> Result<()> {
    sub_write(input, &mut BufWriter::new(writer))
}

fn sub_write<W: Write>(input: &TetgenInput, writer: &mut BufWriter<W>) -> Result<()> {
    writer.write_fmt(format_args!("# nodes\n{} 3 1 0\n", input.nodes.len()))?;
    for (i, (pt, mark)) in input.nodes.iter().zip(&input.node_marks).enumerate() {
        writer.write_fmt(format_args!("{} {} {} {} {}\n", i, pt.x, pt.y, pt.z, mark))?;
    }
    writer.write_fmt(format_args!("# facets\n{} 1\n", input.facets.len()))?;
    for (facet, mark) in input.facets.iter().zip(&input.facet_marks) {
        writer.write_fmt(format_args!(
            "3 {} {} {} {}\n",
            facet[0], facet[1], facet[2], mark
        ))?;
    }
    writer.write_all(b"0\n")?;
    writer.write_all(b"0\n")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TetgenInput {
        TetgenInput {
            nodes: vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.5),
                Point3::new(0.0, 1.0, 0.25),
                Point3::new(1.0, 1.0, 0.75),
            ],
            node_marks: vec![0, 0, 1, 1],
            facets: vec![[0, 1, 2], [1, 3, 2]],
            facet_marks: vec![0, 1_000_000],
        }
    }

    #[test]
    fn layout() {
        let mut buffer = Vec::new();
        write(&sample(), &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[1], "4 3 1 0");
        assert_eq!(lines[2], "0 0 0 0 0");
        assert_eq!(lines[7], "2 1");
        assert_eq!(lines[8], "3 0 1 2 0");
        assert_eq!(lines[9], "3 1 3 2 1000000");
        assert_eq!(&lines[10..], ["0", "0"].as_slice());
    }

    #[test]
    fn deterministic() {
        let input = sample();
        let mut a = Vec::new();
        let mut b = Vec::new();
        write(&input, &mut a).unwrap();
        write(&input, &mut b).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn index_check() {
        let mut input = sample();
        assert!(input.indices_in_range());
        input.facets.push([0, 1, 9]);
        assert!(!input.indices_in_range());
    }
}
