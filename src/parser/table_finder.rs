//! Table detection from page geometry.
//!
//! Column and row edges are derived per axis, either from ruling lines drawn
//! on the page (`lines` strategy) or from the alignment of words (`text`
//! strategy, in the spirit of Camelot's Stream mode). Edges that intersect
//! are grouped into connected grids; each grid with at least two edges per
//! axis becomes a table whose cells collect the spans centred inside them.

use std::cmp::Ordering;

use crate::model::RawTable;

use super::content::{PageLayout, Ruling, TextSpan};
use super::options::{GeometryProfile, Strategy, TableSettings};

/// Edges closer than this are treated as the same grid line.
const DUPLICATE_EDGE_GAP: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    /// Constant X, spanning Y
    Vertical,
    /// Constant Y, spanning X
    Horizontal,
}

/// A table edge: a segment at `position` from `start` to `end`.
#[derive(Debug, Clone, Copy)]
struct Edge {
    axis: Axis,
    position: f32,
    start: f32,
    end: f32,
}

/// A row of spans grouped by baseline.
#[derive(Debug, Clone)]
struct RowData {
    spans: Vec<TextSpan>,
}

impl RowData {
    fn top(&self) -> f32 {
        self.spans.iter().map(|s| s.top()).fold(f32::MIN, f32::max)
    }

    fn bottom(&self) -> f32 {
        self.spans.iter().map(|s| s.bottom()).fold(f32::MAX, f32::min)
    }
}

/// Finds tables on a page.
#[derive(Debug, Clone)]
pub struct TableFinder {
    profile: GeometryProfile,
}

impl TableFinder {
    /// Create a finder with a resolved profile.
    pub fn new(profile: GeometryProfile) -> Self {
        Self { profile }
    }

    /// Create a finder from named settings.
    pub fn from_settings(settings: &TableSettings) -> Self {
        Self::new(GeometryProfile::from_settings(settings))
    }

    /// The profile in use.
    pub fn profile(&self) -> &GeometryProfile {
        &self.profile
    }

    /// Find tables in a page layout, top of page first.
    pub fn find_tables(&self, layout: &PageLayout) -> Vec<RawTable> {
        let mut edges = match self.profile.vertical_strategy {
            Strategy::Lines => self.ruling_edges(&layout.rulings, Axis::Vertical),
            Strategy::Text => self.text_vertical_edges(&layout.spans),
        };
        edges.extend(match self.profile.horizontal_strategy {
            Strategy::Lines => self.ruling_edges(&layout.rulings, Axis::Horizontal),
            Strategy::Text => self.text_horizontal_edges(&layout.spans),
        });

        log::debug!(
            "TableFinder: {} vertical, {} horizontal edges",
            edges.iter().filter(|e| e.axis == Axis::Vertical).count(),
            edges.iter().filter(|e| e.axis == Axis::Horizontal).count()
        );

        let mut grids: Vec<(Vec<f32>, Vec<f32>)> = self
            .connected_grids(&edges)
            .into_iter()
            .filter(|(xs, ys)| xs.len() >= 2 && ys.len() >= 2)
            .collect();

        // Top of page first (PDF Y grows upwards), then left to right.
        grids.sort_by(|a, b| {
            b.1[0]
                .partial_cmp(&a.1[0])
                .unwrap_or(Ordering::Equal)
                .then(a.0[0].partial_cmp(&b.0[0]).unwrap_or(Ordering::Equal))
        });

        grids
            .iter()
            .map(|(xs, ys)| self.fill_cells(xs, ys, &layout.spans))
            .filter(|table| table.iter().flatten().any(|cell| cell.is_some()))
            .collect()
    }

    /// Edges from ruling lines along one axis, snapped and joined.
    fn ruling_edges(&self, rulings: &[Ruling], axis: Axis) -> Vec<Edge> {
        let mut edges: Vec<Edge> = rulings
            .iter()
            .filter(|r| r.length() >= self.profile.edge_min_length)
            .filter_map(|r| match axis {
                Axis::Vertical if r.is_vertical() => Some(Edge {
                    axis,
                    position: (r.x0 + r.x1) / 2.0,
                    start: r.y0,
                    end: r.y1,
                }),
                Axis::Horizontal if r.is_horizontal() => Some(Edge {
                    axis,
                    position: (r.y0 + r.y1) / 2.0,
                    start: r.x0,
                    end: r.x1,
                }),
                _ => None,
            })
            .collect();

        if edges.is_empty() {
            return edges;
        }

        edges.sort_by(|a, b| a.position.partial_cmp(&b.position).unwrap_or(Ordering::Equal));

        // Snap positions within tolerance to their cluster mean.
        let tolerance = self.profile.snap_tolerance;
        let mut clusters: Vec<Vec<Edge>> = Vec::new();
        for edge in edges {
            match clusters.last_mut() {
                Some(cluster)
                    if edge.position - cluster[cluster.len() - 1].position <= tolerance =>
                {
                    cluster.push(edge)
                }
                _ => clusters.push(vec![edge]),
            }
        }

        let mut snapped = Vec::new();
        for mut cluster in clusters {
            let mean = cluster.iter().map(|e| e.position).sum::<f32>() / cluster.len() as f32;
            cluster.sort_by(|a, b| a.start.partial_cmp(&b.start).unwrap_or(Ordering::Equal));

            // Join collinear segments that touch or overlap.
            let mut current: Option<Edge> = None;
            for edge in cluster {
                let edge = Edge {
                    position: mean,
                    ..edge
                };
                current = match current {
                    Some(mut open) if edge.start <= open.end + tolerance => {
                        open.end = open.end.max(edge.end);
                        Some(open)
                    }
                    Some(open) => {
                        snapped.push(open);
                        Some(edge)
                    }
                    None => Some(edge),
                };
            }
            snapped.extend(current);
        }

        snapped
    }

    /// Column edges at word left edges that line up, plus the right margin.
    fn text_vertical_edges(&self, spans: &[TextSpan]) -> Vec<Edge> {
        if spans.is_empty() {
            return vec![];
        }

        let mut sorted: Vec<&TextSpan> = spans.iter().collect();
        sorted.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal));

        let mut clusters: Vec<Vec<&TextSpan>> = Vec::new();
        for span in sorted {
            match clusters.last_mut() {
                Some(cluster)
                    if span.x - cluster[cluster.len() - 1].x <= self.profile.text_x_tolerance =>
                {
                    cluster.push(span)
                }
                _ => clusters.push(vec![span]),
            }
        }

        let aligned: Vec<Vec<&TextSpan>> = clusters
            .into_iter()
            .filter(|c| c.len() >= self.profile.min_words_vertical)
            .collect();

        if aligned.is_empty() {
            return vec![];
        }

        let members = aligned.iter().flatten();
        let top = members.clone().map(|s| s.top()).fold(f32::MIN, f32::max);
        let bottom = members.clone().map(|s| s.bottom()).fold(f32::MAX, f32::min);
        let right = spans
            .iter()
            .filter(|s| s.bottom() < top && s.top() > bottom)
            .map(|s| s.right())
            .fold(f32::MIN, f32::max);

        let mut edges: Vec<Edge> = aligned
            .iter()
            .map(|cluster| Edge {
                axis: Axis::Vertical,
                position: cluster.iter().map(|s| s.x).fold(f32::MAX, f32::min),
                start: bottom,
                end: top,
            })
            .collect();
        edges.push(Edge {
            axis: Axis::Vertical,
            position: right,
            start: bottom,
            end: top,
        });

        edges
    }

    /// Row edges at the top of each text line, plus the bottom of the last.
    fn text_horizontal_edges(&self, spans: &[TextSpan]) -> Vec<Edge> {
        let rows: Vec<RowData> = self
            .group_into_rows(spans)
            .into_iter()
            .filter(|r| r.spans.len() >= self.profile.min_words_horizontal)
            .collect();

        let Some(last) = rows.last() else {
            return vec![];
        };

        let left = rows
            .iter()
            .flat_map(|r| r.spans.iter())
            .map(|s| s.x)
            .fold(f32::MAX, f32::min);
        let right = rows
            .iter()
            .flat_map(|r| r.spans.iter())
            .map(|s| s.right())
            .fold(f32::MIN, f32::max);

        let mut edges: Vec<Edge> = rows
            .iter()
            .map(|row| Edge {
                axis: Axis::Horizontal,
                position: row.top(),
                start: left,
                end: right,
            })
            .collect();
        edges.push(Edge {
            axis: Axis::Horizontal,
            position: last.bottom(),
            start: left,
            end: right,
        });

        edges
    }

    /// Group spans into rows by baseline, top of page first.
    fn group_into_rows(&self, spans: &[TextSpan]) -> Vec<RowData> {
        let mut sorted = spans.to_vec();
        sorted.sort_by(|a, b| {
            b.y.partial_cmp(&a.y)
                .unwrap_or(Ordering::Equal)
                .then(a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal))
        });

        let mut rows: Vec<RowData> = Vec::new();
        let mut current_y: Option<f32> = None;

        for span in sorted {
            match (current_y, rows.last_mut()) {
                (Some(y), Some(row)) if (span.y - y).abs() <= self.profile.text_y_tolerance => {
                    row.spans.push(span);
                }
                _ => {
                    current_y = Some(span.y);
                    rows.push(RowData { spans: vec![span] });
                }
            }
        }

        rows
    }

    fn intersects(&self, v: &Edge, h: &Edge) -> bool {
        let tx = self.profile.intersection_x_tolerance;
        let ty = self.profile.intersection_y_tolerance;
        v.position >= h.start - tx
            && v.position <= h.end + tx
            && h.position >= v.start - ty
            && h.position <= v.end + ty
    }

    /// Split edges into connected grids; returns (xs ascending, ys descending).
    fn connected_grids(&self, edges: &[Edge]) -> Vec<(Vec<f32>, Vec<f32>)> {
        let mut parent: Vec<usize> = (0..edges.len()).collect();

        fn find(parent: &mut [usize], i: usize) -> usize {
            let mut root = i;
            while parent[root] != root {
                root = parent[root];
            }
            let mut node = i;
            while parent[node] != root {
                let next = parent[node];
                parent[node] = root;
                node = next;
            }
            root
        }

        let mut linked = vec![false; edges.len()];
        for (i, v) in edges.iter().enumerate() {
            if v.axis != Axis::Vertical {
                continue;
            }
            for (j, h) in edges.iter().enumerate() {
                if h.axis == Axis::Horizontal && self.intersects(v, h) {
                    linked[i] = true;
                    linked[j] = true;
                    let (a, b) = (find(&mut parent, i), find(&mut parent, j));
                    if a != b {
                        parent[a] = b;
                    }
                }
            }
        }

        let mut groups: Vec<(usize, Vec<f32>, Vec<f32>)> = Vec::new();
        for (i, edge) in edges.iter().enumerate() {
            if !linked[i] {
                continue;
            }
            let root = find(&mut parent, i);
            let index = match groups.iter().position(|g| g.0 == root) {
                Some(index) => index,
                None => {
                    groups.push((root, Vec::new(), Vec::new()));
                    groups.len() - 1
                }
            };
            match edge.axis {
                Axis::Vertical => groups[index].1.push(edge.position),
                Axis::Horizontal => groups[index].2.push(edge.position),
            }
        }

        groups
            .into_iter()
            .map(|(_, mut xs, mut ys)| {
                xs.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
                ys.sort_by(|a, b| b.partial_cmp(a).unwrap_or(Ordering::Equal));
                xs.dedup_by(|b, a| (*b - *a).abs() < DUPLICATE_EDGE_GAP);
                ys.dedup_by(|b, a| (*a - *b).abs() < DUPLICATE_EDGE_GAP);
                (xs, ys)
            })
            .collect()
    }

    /// Collect span text into the grid cells.
    fn fill_cells(&self, xs: &[f32], ys: &[f32], spans: &[TextSpan]) -> RawTable {
        let columns = xs.len() - 1;
        let mut table: Vec<Vec<Vec<&TextSpan>>> = vec![vec![Vec::new(); columns]; ys.len() - 1];

        for span in spans {
            let (cx, cy) = span.center();
            let column = xs.windows(2).position(|w| cx >= w[0] && cx < w[1]);
            let row = ys.windows(2).position(|w| cy <= w[0] && cy > w[1]);
            if let (Some(row), Some(column)) = (row, column) {
                table[row][column].push(span);
            }
        }

        table
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|cell| self.cell_text(cell))
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Join a cell's spans: words with spaces, lines with newlines.
    fn cell_text(&self, spans: Vec<&TextSpan>) -> Option<String> {
        if spans.is_empty() {
            return None;
        }
        let owned: Vec<TextSpan> = spans.into_iter().cloned().collect();
        let lines: Vec<String> = self
            .group_into_rows(&owned)
            .into_iter()
            .map(|row| {
                row.spans
                    .iter()
                    .map(|s| s.text.as_str())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect();
        Some(lines.join("\n"))
    }
}

impl Default for TableFinder {
    fn default() -> Self {
        Self::new(GeometryProfile::default())
    }
}
