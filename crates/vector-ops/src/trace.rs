//! Raster-to-polygon conversion.
//!
//! Every 4-connected run of equal gridcodes becomes one polygon feature
//! whose rings follow the cell edges exactly: no simplification, every
//! cell corner is retained. Components are discovered in row-major scan
//! order, so output is deterministic for a given raster.

use std::collections::{HashMap, VecDeque};

use tracing::debug;

use harvest_common::HarvestResult;

use crate::features::{Feature, FeatureSet, FieldDef, Value};
use crate::geometry::{MultiPolygon, PolygonGeometry, Ring};
use crate::grid::GridcodeRaster;

/// Attribute carrying each polygon's source cell value.
pub const GRIDCODE_FIELD: &str = "gridcode";

/// Convert a gridcode raster into polygon features.
///
/// All values are polygonized, including the no-data code; filtering is a
/// separate selection step.
pub fn trace_polygons(raster: &GridcodeRaster) -> HarvestResult<FeatureSet> {
    let components = label_components(raster);
    debug!(components = components.len(), "Labeled raster components");

    let mut set = FeatureSet::new(vec![FieldDef::int(GRIDCODE_FIELD)]);
    for component in &components {
        let rings = link_rings(&component.edges);
        let geometry = assemble_parts(rings);

        let mut feature = Feature::new(geometry);
        feature.attributes.insert(
            GRIDCODE_FIELD.to_string(),
            Value::Int(component.code as i64),
        );
        set.features.push(feature);
    }

    Ok(set)
}

/// A labeled component: its gridcode and its directed boundary edges.
struct Component {
    code: u8,
    /// Unit edges in pixel-corner space, directed so the component
    /// interior lies to the right of travel.
    edges: Vec<((u32, u32), (u32, u32))>,
}

fn label_components(raster: &GridcodeRaster) -> Vec<Component> {
    let width = raster.width() as usize;
    let height = raster.height() as usize;
    let mut labels = vec![0u32; width * height];
    let mut components: Vec<Component> = Vec::new();

    for start_y in 0..height {
        for start_x in 0..width {
            if labels[start_y * width + start_x] != 0 {
                continue;
            }

            let code = raster.get(start_x as u32, start_y as u32);
            let id = components.len() as u32 + 1;
            components.push(Component {
                code,
                edges: Vec::new(),
            });

            // Flood fill the 4-connected run of this code.
            let mut queue = VecDeque::new();
            labels[start_y * width + start_x] = id;
            queue.push_back((start_x, start_y));

            while let Some((x, y)) = queue.pop_front() {
                let mut visit = |nx: usize, ny: usize, queue: &mut VecDeque<(usize, usize)>| {
                    let idx = ny * width + nx;
                    if labels[idx] == 0 && raster.get(nx as u32, ny as u32) == code {
                        labels[idx] = id;
                        queue.push_back((nx, ny));
                    }
                };
                if x > 0 {
                    visit(x - 1, y, &mut queue);
                }
                if x + 1 < width {
                    visit(x + 1, y, &mut queue);
                }
                if y > 0 {
                    visit(x, y - 1, &mut queue);
                }
                if y + 1 < height {
                    visit(x, y + 1, &mut queue);
                }
            }
        }
    }

    // Second pass: emit directed boundary edges wherever a cell's side
    // faces a different component or the raster edge. Cell (x, y) spans
    // corners (x, y)..(x+1, y+1); walking keeps the cell on the right.
    for y in 0..height {
        for x in 0..width {
            let label = labels[y * width + x];
            let differs = |nx: isize, ny: isize| -> bool {
                if nx < 0 || ny < 0 || nx as usize >= width || ny as usize >= height {
                    return true;
                }
                labels[ny as usize * width + nx as usize] != label
            };

            let (cx, cy) = (x as u32, y as u32);
            let edges = &mut components[label as usize - 1].edges;
            if differs(x as isize, y as isize - 1) {
                edges.push(((cx, cy), (cx + 1, cy)));
            }
            if differs(x as isize + 1, y as isize) {
                edges.push(((cx + 1, cy), (cx + 1, cy + 1)));
            }
            if differs(x as isize, y as isize + 1) {
                edges.push(((cx + 1, cy + 1), (cx, cy + 1)));
            }
            if differs(x as isize - 1, y as isize) {
                edges.push(((cx, cy + 1), (cx, cy)));
            }
        }
    }

    components
}

/// Link directed unit edges into closed rings.
///
/// At a corner where two diagonal cells of the same component touch, four
/// edges meet; taking the sharpest right turn relative to the incoming
/// direction keeps each ring tight around its own cells and free of
/// self-crossings.
fn link_rings(edges: &[((u32, u32), (u32, u32))]) -> Vec<Ring> {
    let mut by_start: HashMap<(u32, u32), Vec<usize>> = HashMap::new();
    for (i, (start, _)) in edges.iter().enumerate() {
        by_start.entry(*start).or_default().push(i);
    }

    let mut used = vec![false; edges.len()];
    let mut rings = Vec::new();

    for first in 0..edges.len() {
        if used[first] {
            continue;
        }

        let ring_start = edges[first].0;
        let mut points = Vec::new();
        let mut current = first;

        loop {
            used[current] = true;
            let (start, end) = edges[current];
            points.push(start);
            if end == ring_start {
                break;
            }

            let incoming = direction(start, end);
            let candidates = by_start.get(&end).map(Vec::as_slice).unwrap_or(&[]);
            let next = candidates
                .iter()
                .copied()
                .filter(|&i| !used[i])
                .min_by_key(|&i| {
                    let outgoing = direction(edges[i].0, edges[i].1);
                    turn_priority(incoming, outgoing)
                });

            match next {
                Some(i) => current = i,
                // Open chain: only possible on malformed input.
                None => break,
            }
        }

        rings.push(Ring::new(points));
    }

    rings
}

fn direction(start: (u32, u32), end: (u32, u32)) -> (i32, i32) {
    (
        end.0 as i32 - start.0 as i32,
        end.1 as i32 - start.1 as i32,
    )
}

/// 0 = right turn, 1 = straight, 2 = left turn, 3 = reversal.
fn turn_priority(incoming: (i32, i32), outgoing: (i32, i32)) -> u8 {
    // Right turn in y-down pixel space: (dx, dy) -> (-dy, dx).
    let right = (-incoming.1, incoming.0);
    let left = (incoming.1, -incoming.0);
    if outgoing == right {
        0
    } else if outgoing == incoming {
        1
    } else if outgoing == left {
        2
    } else {
        3
    }
}

/// Group a component's rings into polygon parts: each outer ring becomes
/// a part, each hole attaches to the innermost outer ring containing it.
fn assemble_parts(rings: Vec<Ring>) -> MultiPolygon {
    let (outers, holes): (Vec<Ring>, Vec<Ring>) = rings.into_iter().partition(Ring::is_outer);

    let mut parts: Vec<PolygonGeometry> = outers
        .into_iter()
        .map(|outer| PolygonGeometry {
            outer,
            holes: Vec::new(),
        })
        .collect();

    for hole in holes {
        let probe = hole_probe_point(&hole);
        let owner = parts
            .iter_mut()
            .filter(|p| p.outer.contains(probe.0, probe.1))
            .min_by_key(|p| p.outer.signed_area2());
        match owner {
            Some(part) => part.holes.push(hole),
            // A hole with no containing outer cannot come out of the edge
            // emitter; drop rather than misattach if it ever does.
            None => debug!("Dropped orphan hole ring"),
        }
    }

    MultiPolygon { parts }
}

/// A point strictly inside the hole region: half a cell to the left of
/// the hole ring's first edge (the component lies to the right).
fn hole_probe_point(hole: &Ring) -> (f64, f64) {
    let start = hole.points[0];
    let end = hole.points[1 % hole.points.len()];
    let dir = direction(start, end);
    let left = (dir.1, -dir.0);
    (
        start.0 as f64 + dir.0 as f64 * 0.5 + left.0 as f64 * 0.5,
        start.1 as f64 + dir.1 as f64 * 0.5 + left.1 as f64 * 0.5,
    )
}
