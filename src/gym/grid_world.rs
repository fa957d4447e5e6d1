use std::{
    fmt,
    ops::{Index, IndexMut},
};

use strum::{Display, EnumIter, FromRepr, VariantArray};

use crate::{
    algo::tabular::Policy,
    env::{DiscreteAction, DiscreteSpace, Environment, Transition},
    error::{Error, Result},
};

use super::MapPreset;

/// Position coordinates `(row, col)` in the grid
pub type Pos = (usize, usize);

/// Reward for bumping into a wall or the edge of the grid
pub const BUMP_PENALTY: f64 = -5.0;
/// Reward for entering the goal
pub const GOAL_REWARD: f64 = 100.0;
/// Reward for entering a trap, every time
pub const TRAP_PENALTY: f64 = -50.0;
/// Reward for collecting a bonus, once per reset
pub const BONUS_REWARD: f64 = 8.0;
/// Reward for entering an empty cell
pub const STEP_COST: f64 = -1.0;

/// Cell code marking the start position in a layout; the cell itself is empty
const START_CODE: u8 = 2;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, FromRepr)]
#[repr(u8)]
pub enum Cell {
    Empty = 0,
    Wall = 1,
    Goal = 3,
    Trap = 4,
    Bonus = 5,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Display, EnumIter, VariantArray, FromRepr)]
pub enum Action {
    Up = 0,
    Down = 1,
    Left = 2,
    Right = 3,
}

impl Action {
    /// Unit `(row, col)` offset of the move
    pub fn offset(self) -> (isize, isize) {
        match self {
            Action::Up => (-1, 0),
            Action::Down => (1, 0),
            Action::Left => (0, -1),
            Action::Right => (0, 1),
        }
    }

    /// Decode a raw action code
    pub fn from_code(code: usize) -> Result<Self> {
        Self::from_repr(code).ok_or(Error::InvalidAction { code })
    }

    fn arrow(self) -> char {
        match self {
            Action::Up => '^',
            Action::Down => 'v',
            Action::Left => '<',
            Action::Right => '>',
        }
    }
}

impl DiscreteAction for Action {
    const ALL: &'static [Self] = <Self as VariantArray>::VARIANTS;

    fn index(self) -> usize {
        self as usize
    }
}

/// A fixed rectangular grid of [cells](Cell)
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct GridMap {
    rows: usize,
    cols: usize,
    cells: Vec<Cell>,
}

impl GridMap {
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// The cell at `pos`, or `None` if out of bounds
    pub fn get(&self, pos: Pos) -> Option<Cell> {
        (pos.0 < self.rows && pos.1 < self.cols).then(|| self[pos])
    }

    /// The in-bounds position one `action` away from `pos`
    fn neighbor(&self, pos: Pos, action: Action) -> Option<Pos> {
        let (dr, dc) = action.offset();
        let row = pos.0.checked_add_signed(dr)?;
        let col = pos.1.checked_add_signed(dc)?;
        (row < self.rows && col < self.cols).then_some((row, col))
    }

    /// The position one `action` away from `pos` if it can be entered
    fn open_neighbor(&self, pos: Pos, action: Action) -> Option<Pos> {
        self.neighbor(pos, action)
            .filter(|&target| self[target] != Cell::Wall)
    }
}

impl Index<Pos> for GridMap {
    type Output = Cell;

    fn index(&self, pos: Pos) -> &Self::Output {
        &self.cells[pos.0 * self.cols + pos.1]
    }
}

impl IndexMut<Pos> for GridMap {
    fn index_mut(&mut self, pos: Pos) -> &mut Self::Output {
        &mut self.cells[pos.0 * self.cols + pos.1]
    }
}

/// A maze of walls, traps and one-time bonuses with a single goal
///
/// The state is the agent's position. Walls and the grid edge block movement, the goal is terminal,
/// traps cost [`TRAP_PENALTY`] on every visit, and a bonus pays [`BONUS_REWARD`] once before turning
/// into an empty cell until the next [`reset`](Environment::reset).
#[derive(Clone, Debug)]
pub struct GridWorld {
    initial: GridMap,
    map: GridMap,
    start: Pos,
    goal: Pos,
    pos: Pos,
}

impl GridWorld {
    /// Build one of the built-in mazes
    pub fn new(preset: MapPreset) -> Self {
        Self::from_codes(preset.layout()).expect("preset layouts are well-formed")
    }

    /// Build a maze from rows of cell codes
    ///
    /// Codes: `0` empty, `1` wall, `2` start, `3` goal, `4` trap, `5` bonus. The grid must be
    /// rectangular and contain exactly one start and exactly one goal.
    pub fn from_codes<R: AsRef<[u8]>>(codes: &[R]) -> Result<Self> {
        let invalid = |reason: String| Error::InvalidMap { reason };

        let rows = codes.len();
        let cols = codes.first().map_or(0, |row| row.as_ref().len());
        if rows == 0 || cols == 0 {
            return Err(invalid("grid is empty".to_string()));
        }

        let mut cells = Vec::with_capacity(rows * cols);
        let mut starts = Vec::new();
        let mut goals = Vec::new();
        for (i, row) in codes.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != cols {
                return Err(invalid(format!(
                    "row {i} has {} cells, expected {cols}",
                    row.len()
                )));
            }
            for (j, &code) in row.iter().enumerate() {
                let cell = if code == START_CODE {
                    starts.push((i, j));
                    Cell::Empty
                } else {
                    Cell::from_repr(code)
                        .ok_or_else(|| invalid(format!("unknown cell code {code} at ({i}, {j})")))?
                };
                if cell == Cell::Goal {
                    goals.push((i, j));
                }
                cells.push(cell);
            }
        }

        let [start] = starts[..] else {
            return Err(invalid(format!(
                "expected exactly one start, found {}",
                starts.len()
            )));
        };
        let [goal] = goals[..] else {
            return Err(invalid(format!(
                "expected exactly one goal, found {}",
                goals.len()
            )));
        };

        let map = GridMap { rows, cols, cells };
        Ok(Self {
            initial: map.clone(),
            map,
            start,
            goal,
            pos: start,
        })
    }

    pub fn rows(&self) -> usize {
        self.map.rows
    }

    pub fn cols(&self) -> usize {
        self.map.cols
    }

    /// Current agent position
    pub fn position(&self) -> Pos {
        self.pos
    }

    pub fn start(&self) -> Pos {
        self.start
    }

    pub fn goal(&self) -> Pos {
        self.goal
    }

    /// The current map, including any bonus consumption since the last reset
    pub fn map(&self) -> &GridMap {
        &self.map
    }

    /// The current cell at `pos`, or `None` if out of bounds
    pub fn cell(&self, pos: Pos) -> Option<Cell> {
        self.map.get(pos)
    }

    /// Decode a raw action code and [step](Environment::step) with it
    ///
    /// Fails with [`Error::InvalidAction`] for codes outside `0..=3`, leaving the world untouched.
    pub fn step_code(&mut self, code: usize) -> Result<Transition<Pos>> {
        let action = Action::from_code(code)?;
        Ok(self.step(action))
    }

    /// Text snapshot of the grid with the agent marked `A`
    pub fn render(&self) -> String {
        self.frame(|pos| {
            if pos == self.pos {
                return 'A';
            }
            match self.map[pos] {
                Cell::Empty => ' ',
                Cell::Wall => '#',
                Cell::Goal => 'G',
                Cell::Trap => 'X',
                Cell::Bonus => 'B',
            }
        })
    }

    /// Text snapshot of a policy over this grid, one arrow per cell
    ///
    /// Walls are drawn as `#`, the goal as `G`, and cells without an action as `.`.
    pub fn render_policy(&self, policy: &Policy<Action>) -> String {
        self.frame(|pos| match self.map[pos] {
            Cell::Wall => '#',
            Cell::Goal => 'G',
            _ => policy
                .get(self.state_index(&pos))
                .map_or('.', Action::arrow),
        })
    }

    fn frame(&self, glyph: impl Fn(Pos) -> char) -> String {
        let border = "-".repeat(self.cols() * 2 + 1);
        let mut out = String::with_capacity((border.len() + 1) * (self.rows() + 2));
        out.push_str(&border);
        out.push('\n');
        for i in 0..self.rows() {
            out.push('|');
            for j in 0..self.cols() {
                out.push(glyph((i, j)));
                out.push('|');
            }
            out.push('\n');
        }
        out.push_str(&border);
        out.push('\n');
        out
    }
}

impl fmt::Display for GridWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl DiscreteSpace for GridWorld {
    type State = Pos;
    type Action = Action;

    fn state_index(&self, state: &Pos) -> usize {
        state.0 * self.cols() + state.1
    }

    fn state_at(&self, index: usize) -> Pos {
        (index / self.cols(), index % self.cols())
    }

    fn total_states(&self) -> usize {
        self.rows() * self.cols()
    }

    fn legal_actions(&self, state: &Pos) -> Vec<Action> {
        Action::VARIANTS
            .iter()
            .copied()
            .filter(|&action| self.map.open_neighbor(*state, action).is_some())
            .collect()
    }
}

impl Environment for GridWorld {
    fn reset(&mut self) -> Pos {
        self.map.clone_from(&self.initial);
        self.pos = self.start;
        self.pos
    }

    fn step(&mut self, action: Action) -> Transition<Pos> {
        let Some(target) = self.map.open_neighbor(self.pos, action) else {
            return Transition {
                next_state: self.pos,
                reward: BUMP_PENALTY,
                done: false,
            };
        };

        self.pos = target;
        let (reward, done) = match self.map[target] {
            Cell::Goal => (GOAL_REWARD, true),
            Cell::Trap => (TRAP_PENALTY, false),
            Cell::Bonus => {
                self.map[target] = Cell::Empty;
                (BONUS_REWARD, false)
            }
            Cell::Empty => (STEP_COST, false),
            Cell::Wall => unreachable!("walls are never entered"),
        };

        Transition {
            next_state: target,
            reward,
            done,
        }
    }
}
