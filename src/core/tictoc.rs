pub const CELLS: usize = 9;

// Rows, columns, then diagonals; the first satisfied line wins the scan.
pub const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mark {
    Cross,
    Nought,
}

impl Mark {
    pub fn symbol(self) -> char {
        match self {
            Mark::Cross => 'X',
            Mark::Nought => '0',
        }
    }

    pub fn other(self) -> Mark {
        match self {
            Mark::Cross => Mark::Nought,
            Mark::Nought => Mark::Cross,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Won { mark: Mark, line: [usize; 3] },
    Draw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Rejected,
    Placed,
    Won { line: [usize; 3] },
    Draw,
}

#[derive(Debug, Clone)]
pub struct TicTocGame {
    cells: [Option<Mark>; CELLS],
    next: Mark,
    outcome: Option<Outcome>,
}

impl TicTocGame {
    pub fn new() -> Self {
        Self {
            cells: [None; CELLS],
            next: Mark::Cross,
            outcome: None,
        }
    }

    pub fn restart(&mut self) {
        *self = Self::new();
    }

    pub fn play(&mut self, cell: usize) -> MoveOutcome {
        if self.outcome.is_some() || cell >= CELLS || self.cells[cell].is_some() {
            return MoveOutcome::Rejected;
        }
        let mark = self.next;
        self.cells[cell] = Some(mark);
        self.next = mark.other();
        if let Some(line) = winning_line(&self.cells, mark) {
            self.outcome = Some(Outcome::Won { mark, line });
            return MoveOutcome::Won { line };
        }
        if self.cells.iter().all(Option::is_some) {
            self.outcome = Some(Outcome::Draw);
            return MoveOutcome::Draw;
        }
        MoveOutcome::Placed
    }

    pub fn cell(&self, cell: usize) -> Option<Mark> {
        self.cells[cell]
    }

    pub fn next_mark(&self) -> Mark {
        self.next
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    pub fn is_over(&self) -> bool {
        self.outcome.is_some()
    }
}

impl Default for TicTocGame {
    fn default() -> Self {
        Self::new()
    }
}

fn winning_line(cells: &[Option<Mark>; CELLS], mark: Mark) -> Option<[usize; 3]> {
    LINES
        .iter()
        .copied()
        .find(|line| line.iter().all(|&c| cells[c] == Some(mark)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marks_alternate_starting_with_cross() {
        let mut game = TicTocGame::new();
        assert_eq!(game.next_mark(), Mark::Cross);
        game.play(0);
        assert_eq!(game.cell(0), Some(Mark::Cross));
        game.play(1);
        assert_eq!(game.cell(1), Some(Mark::Nought));
        assert_eq!(game.next_mark(), Mark::Cross);
    }

    #[test]
    fn occupied_cells_reject_without_losing_the_turn() {
        let mut game = TicTocGame::new();
        game.play(4);
        assert_eq!(game.play(4), MoveOutcome::Rejected);
        assert_eq!(game.next_mark(), Mark::Nought);
    }

    #[test]
    fn every_line_can_win() {
        for line in LINES {
            let mut game = TicTocGame::new();
            let spare: Vec<usize> = (0..CELLS).filter(|c| !line.contains(c)).collect();
            game.play(line[0]);
            game.play(spare[0]);
            game.play(line[1]);
            game.play(spare[1]);
            assert_eq!(game.play(line[2]), MoveOutcome::Won { line });
            assert_eq!(
                game.outcome(),
                Some(Outcome::Won { mark: Mark::Cross, line })
            );
        }
    }

    #[test]
    fn full_board_without_a_line_is_a_draw() {
        let mut game = TicTocGame::new();
        for cell in [0, 1, 2, 4, 3, 5, 7, 6] {
            assert_eq!(game.play(cell), MoveOutcome::Placed);
        }
        assert_eq!(game.play(8), MoveOutcome::Draw);
        assert_eq!(game.outcome(), Some(Outcome::Draw));
    }

    #[test]
    fn finished_games_reject_further_moves() {
        let mut game = TicTocGame::new();
        game.play(0);
        game.play(3);
        game.play(1);
        game.play(4);
        game.play(2);
        assert!(game.is_over());
        assert_eq!(game.play(5), MoveOutcome::Rejected);
    }

    #[test]
    fn scan_reports_the_first_line_in_fixed_order() {
        let mut cells = [None; CELLS];
        for c in [0, 1, 2, 4, 8] {
            cells[c] = Some(Mark::Cross);
        }
        // Both the top row and the main diagonal are complete.
        assert_eq!(winning_line(&cells, Mark::Cross), Some([0, 1, 2]));
    }

    #[test]
    fn restart_clears_the_board() {
        let mut game = TicTocGame::new();
        game.play(0);
        game.play(1);
        game.restart();
        assert_eq!(game.cell(0), None);
        assert_eq!(game.next_mark(), Mark::Cross);
        assert!(!game.is_over());
    }
}
