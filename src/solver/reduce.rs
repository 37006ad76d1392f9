//! The constraint reducer ("simple_solve"): derives forced Mine/NoMine
//! cells from the revealed clues bordering a frontier state, and, when the
//! state isn't fully determined, picks the pivot constraint with the
//! smallest enumeration fan-out.

use super::Solver;
use crate::cell::{Cell, CellFlag, State};
use crate::geometry::{adj_diff, adj_index, shift, MASK_LPAD, MASK_STRIDE};
use crate::ways::WaysTable;

/// One or two revealed cells' neighborhoods, intersected into a single
/// "exactly `count` mines among these cells" constraint.
#[derive(Clone, Copy, Debug)]
pub struct Constraint {
    pub pos1: i32,
    pub pos2: i32,
    pub msk1: u32,
    pub msk2: u32,
    pub count: i32,
}

pub enum ReduceOutcome {
    Unsatisfiable,
    Resolved,
    Pivot(Constraint),
}

/// True iff board position `x` participates in `cell`'s constraint.
pub fn in_cell(w: usize, cell: &Constraint, x: usize) -> bool {
    let adj1 = adj_index(cell.pos1 as usize, x, w);
    if adj1 != -1 && (cell.msk1 & (1 << adj1)) != 0 {
        return true;
    }
    if cell.pos2 != -1 {
        let adj2 = adj_index(cell.pos2 as usize, x, w);
        if adj2 != -1 && (cell.msk2 & (1 << adj2)) != 0 {
            return true;
        }
    }
    false
}

/// Calls `f` with the absolute board position of every cell participating
/// in `cell`'s mask(s).
fn for_in_cell<F: FnMut(usize)>(w: usize, cell: &Constraint, mut f: F) {
    for which in 0..=1 {
        let (mut m, pos) = if which == 1 {
            (cell.msk2, cell.pos2)
        } else {
            (cell.msk1, cell.pos1)
        };
        let mut i: i32 = 0;
        while m > 0 {
            let tz = m.trailing_zeros() as i32;
            m >>= tz;
            i += tz;

            let di = 1 + MASK_LPAD - i / MASK_STRIDE;
            let dj = 1 + MASK_LPAD - i % MASK_STRIDE;
            let y = pos + (w as i32) * di + dj;
            f(y as usize);

            m >>= 1;
            i += 1;
        }
    }
}

/// Records a derived constraint. Returns `true` if it proves the state
/// unsatisfiable. A fully-determined constraint (`count == 0` or
/// `count == k`) is applied to `s` immediately; otherwise it's kept as a
/// pivot candidate if its enumeration fan-out beats the current best.
#[allow(clippy::too_many_arguments)]
fn try_push(
    ways: &WaysTable,
    tmp_cell_idx: &[i32],
    w: usize,
    s: &mut State,
    mine_offset: &mut i32,
    found: &mut bool,
    min_choice: &mut usize,
    chosen: &mut Option<Constraint>,
    pos1: i32,
    pos2: i32,
    msk1: u32,
    msk2: u32,
    count: i32,
) -> bool {
    let k = msk1.count_ones() as i32 + msk2.count_ones() as i32;
    if count < 0 || count > k {
        return true;
    }
    if k == 0 || k >= 9 {
        return false;
    }

    let new_cell = Constraint {
        pos1,
        pos2,
        msk1,
        msk2,
        count,
    };
    let k = k as usize;

    if count == 0 {
        *found = true;
        for_in_cell(w, &new_cell, |y| {
            let idx = tmp_cell_idx[y];
            if idx != -1 {
                s[idx as usize].set_flag(CellFlag::NoMine);
            }
        });
    } else if count as usize == k {
        *found = true;
        for_in_cell(w, &new_cell, |y| {
            let idx = tmp_cell_idx[y];
            if idx != -1 {
                let cell: &mut Cell = &mut s[idx as usize];
                if cell.flag() == CellFlag::Decide {
                    cell.set_flag(CellFlag::Mine);
                    *mine_offset += 1;
                }
            }
        });
    } else {
        let fan_out = ways.count(k, count as usize);
        if fan_out < *min_choice {
            *min_choice = fan_out;
            *chosen = Some(new_cell);
        }
    }

    false
}

impl Solver {
    /// Derives forced cells to a fixed point and selects the pivot with the
    /// smallest fan-out, if any Decide cells remain undetermined.
    ///
    /// Assumes `self.tmp_cell_idx` already maps every position in `s` to its
    /// index within `s` (set up by the caller before calling this).
    pub(super) fn simple_solve(&mut self, s: &mut State, mine_offset: &mut i32) -> ReduceOutcome {
        loop {
            self.visit_i += 1;
            let visit_i = self.visit_i;

            self.dfs.clear();
            for ci in 0..s.len() {
                let pos = s[ci].position();
                for yi in 0..self.neighbors[pos].len() {
                    let y = self.neighbors[pos][yi];
                    if self.known[y] == -1 || self.visited[y] == visit_i {
                        continue;
                    }
                    self.visited[y] = visit_i;

                    let mut no_unknown = true;
                    let mut msk_y: u32 = 0;
                    let mut count_y = self.known[y];

                    for zi in 0..self.neighbors[y].len() {
                        let z = self.neighbors[y][zi];
                        if self.tmp_cell_idx[z] != -1 {
                            let a = s[self.tmp_cell_idx[z] as usize];
                            if a.flag() == CellFlag::Decide {
                                msk_y |= 1 << adj_index(y, z, self.w);
                            } else if a.flag() == CellFlag::Mine {
                                count_y -= 1;
                            }
                        } else if self.known[z] == -1 {
                            no_unknown = false;
                            break;
                        }
                    }

                    self.tmp_cell_msk[y] = msk_y;
                    self.tmp_cell_count[y] = count_y;

                    if no_unknown {
                        if count_y > msk_y.count_ones() as i32 || count_y < 0 {
                            return ReduceOutcome::Unsatisfiable;
                        }
                        if msk_y != 0 {
                            self.dfs.push(y);
                        }
                    }
                }
            }

            let mut found = false;
            let mut min_choice = usize::MAX;
            let mut chosen: Option<Constraint> = None;

            for xi in 0..self.dfs.len() {
                let x = self.dfs[xi];
                let m = self.tmp_cell_msk[x];
                let nm = !m;

                if try_push(
                    &self.ways,
                    &self.tmp_cell_idx,
                    self.w,
                    s,
                    mine_offset,
                    &mut found,
                    &mut min_choice,
                    &mut chosen,
                    x as i32,
                    -1,
                    m,
                    0,
                    self.tmp_cell_count[x],
                ) {
                    return ReduceOutcome::Unsatisfiable;
                }

                for yi in 0..self.neighbors[x].len() {
                    let y = self.neighbors[x][yi];
                    if self.visited[y] != visit_i || self.tmp_cell_msk[y] == 0 {
                        continue;
                    }

                    let shift1 = adj_diff(x, y, self.w);
                    let s1 = shift(self.tmp_cell_msk[y], shift1);
                    let ns1 = !s1;
                    if (m & ns1) == 0
                        && try_push(
                            &self.ways,
                            &self.tmp_cell_idx,
                            self.w,
                            s,
                            mine_offset,
                            &mut found,
                            &mut min_choice,
                            &mut chosen,
                            x as i32,
                            -1,
                            s1 & nm,
                            0,
                            self.tmp_cell_count[y] - self.tmp_cell_count[x],
                        )
                    {
                        return ReduceOutcome::Unsatisfiable;
                    }

                    for zi in 0..self.neighbors[x].len() {
                        let z = self.neighbors[x][zi];
                        if self.visited[z] != visit_i || z == y || self.tmp_cell_msk[z] == 0 {
                            continue;
                        }

                        // Source reuses `adj_diff(x, y, w)` here rather than
                        // `adj_diff(x, z, w)`, preserved verbatim, see
                        // DESIGN.md.
                        let shift2 = adj_diff(x, y, self.w);
                        let s2 = shift(self.tmp_cell_msk[z], shift2);
                        let ns2 = !s2;

                        if (m & ns1 & ns2) == 0 && (nm & s1 & s2) == 0 {
                            let count =
                                self.tmp_cell_count[y] + self.tmp_cell_count[z] - self.tmp_cell_count[x];
                            if try_push(
                                &self.ways,
                                &self.tmp_cell_idx,
                                self.w,
                                s,
                                mine_offset,
                                &mut found,
                                &mut min_choice,
                                &mut chosen,
                                y as i32,
                                z as i32,
                                shift(s1 & nm, -shift1),
                                shift(s2 & (s1 | nm), -shift2),
                                count,
                            ) {
                                return ReduceOutcome::Unsatisfiable;
                            }
                        }
                    }
                }
            }

            if !found {
                return match chosen {
                    Some(c) => ReduceOutcome::Pivot(c),
                    None => ReduceOutcome::Resolved,
                };
            }
        }
    }
}
