//! Removal of one-cell wall stubs left behind where walls overshoot a
//! junction.

use std::collections::HashSet;

use minimap_core::{CellCoord, CellType};
use minimap_grid::{query, GridModel};

/// Wall cells that should be reclassified as floor.
///
/// A stub is a wall cell with exactly one wall neighbour, where that
/// neighbour is a junction: more than two wall neighbours spanning both
/// axes. When every arm of a junction is itself a stub the junction is an
/// isolated glyph and none of its arms are reported.
///
/// Candidates are collected against the unmodified grid, so removing one
/// stub never exposes another in the same pass.
#[must_use]
pub fn find_stubs(grid: &GridModel) -> Vec<CellCoord> {
    let mut candidates: Vec<(CellCoord, CellCoord)> = Vec::new();
    for cell in grid.cells() {
        if cell.cell_type() != CellType::Wall {
            continue;
        }
        let position = cell.position();
        let neighbors = query::wall_neighbors(grid, position);
        if neighbors.count() != 1 {
            continue;
        }
        let Some(&junction) = neighbors.positions(position).first() else {
            continue;
        };
        let around = query::wall_neighbors(grid, junction);
        if around.count() > 2 && around.spans_both_axes() {
            candidates.push((position, junction));
        }
    }

    let stubs: HashSet<CellCoord> = candidates.iter().map(|(stub, _)| *stub).collect();
    candidates
        .into_iter()
        .filter(|(_, junction)| {
            !query::wall_neighbors(grid, *junction)
                .positions(*junction)
                .iter()
                .all(|arm| stubs.contains(arm))
        })
        .map(|(stub, _)| stub)
        .collect()
}

/// Reclassifies every stub found by [`find_stubs`] as ownerless floor and
/// returns the affected cells.
pub fn prune_stubs(grid: &mut GridModel) -> Vec<CellCoord> {
    let stubs = find_stubs(grid);
    for &stub in &stubs {
        let _ = grid.set_cell(stub, CellType::Floor, None);
    }
    stubs
}
