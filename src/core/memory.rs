use rand::seq::SliceRandom;

pub const PAIR_COUNT: usize = 8;
pub const TILE_COUNT: usize = PAIR_COUNT * 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileFace {
    Hidden,
    FaceUp,
    Matched,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealOutcome {
    Ignored,
    Revealed,
    Mismatch,
    Matched,
    Finished { score: u32 },
}

#[derive(Debug, Clone)]
pub struct MemoryGame {
    board: Vec<u8>,
    face_up: Vec<usize>,
    matched: [bool; TILE_COUNT],
    clicks: u32,
    elapsed_seconds: u32,
    finished: bool,
}

impl MemoryGame {
    pub fn new() -> Self {
        let mut board: Vec<u8> = (1..=PAIR_COUNT as u8).chain(1..=PAIR_COUNT as u8).collect();
        board.shuffle(&mut rand::thread_rng());
        Self {
            board,
            face_up: Vec::with_capacity(2),
            matched: [false; TILE_COUNT],
            clicks: 0,
            elapsed_seconds: 0,
            finished: false,
        }
    }

    pub fn restart(&mut self) {
        *self = Self::new();
    }

    // A turn holds at most two face-up tiles. A mismatched pair stays
    // visible until the player's next reveal, which flips both back down
    // before uncovering the new tile.
    pub fn reveal(&mut self, tile: usize) -> RevealOutcome {
        if self.finished || tile >= TILE_COUNT || self.matched[tile] {
            return RevealOutcome::Ignored;
        }
        if self.face_up.contains(&tile) {
            return RevealOutcome::Ignored;
        }
        if self.face_up.len() == 2 {
            self.face_up.clear();
        }
        self.clicks += 1;
        self.face_up.push(tile);
        if self.face_up.len() < 2 {
            return RevealOutcome::Revealed;
        }

        let (a, b) = (self.face_up[0], self.face_up[1]);
        if self.board[a] != self.board[b] {
            return RevealOutcome::Mismatch;
        }
        self.matched[a] = true;
        self.matched[b] = true;
        self.face_up.clear();
        if self.matched.iter().all(|&m| m) {
            self.finished = true;
            RevealOutcome::Finished { score: self.score() }
        } else {
            RevealOutcome::Matched
        }
    }

    pub fn on_second(&mut self) {
        if !self.finished {
            self.elapsed_seconds += 1;
        }
    }

    pub fn face(&self, tile: usize) -> TileFace {
        if self.matched[tile] {
            TileFace::Matched
        } else if self.face_up.contains(&tile) {
            TileFace::FaceUp
        } else {
            TileFace::Hidden
        }
    }

    pub fn value(&self, tile: usize) -> u8 {
        self.board[tile]
    }

    pub fn clicks(&self) -> u32 {
        self.clicks
    }

    pub fn elapsed_seconds(&self) -> u32 {
        self.elapsed_seconds
    }

    pub fn matched_count(&self) -> usize {
        self.matched.iter().filter(|&&m| m).count()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    // floor(16 / clicks * 100); a perfect game of 16 clicks scores 100.
    pub fn score(&self) -> u32 {
        if self.clicks == 0 {
            0
        } else {
            TILE_COUNT as u32 * 100 / self.clicks
        }
    }
}

impl Default for MemoryGame {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiles_with_value(game: &MemoryGame, value: u8) -> Vec<usize> {
        (0..TILE_COUNT).filter(|&t| game.value(t) == value).collect()
    }

    #[test]
    fn board_holds_each_value_exactly_twice() {
        let game = MemoryGame::new();
        for value in 1..=PAIR_COUNT as u8 {
            assert_eq!(tiles_with_value(&game, value).len(), 2, "value {value}");
        }
    }

    #[test]
    fn boards_are_shuffled() {
        let boards: Vec<Vec<u8>> = (0..5).map(|_| MemoryGame::new().board).collect();
        assert!(boards.iter().any(|b| b != &boards[0]));
    }

    #[test]
    fn revealing_the_same_tile_twice_is_ignored() {
        let mut game = MemoryGame::new();
        assert_eq!(game.reveal(0), RevealOutcome::Revealed);
        assert_eq!(game.reveal(0), RevealOutcome::Ignored);
        assert_eq!(game.clicks(), 1);
    }

    #[test]
    fn matched_pairs_lock_and_finish_the_game() {
        let mut game = MemoryGame::new();
        let mut seen = 0;
        for value in 1..=PAIR_COUNT as u8 {
            let pair = tiles_with_value(&game, value);
            assert_eq!(game.reveal(pair[0]), RevealOutcome::Revealed);
            let outcome = game.reveal(pair[1]);
            seen += 2;
            assert_eq!(game.matched_count(), seen);
            if seen == TILE_COUNT {
                assert_eq!(outcome, RevealOutcome::Finished { score: 100 });
            } else {
                assert_eq!(outcome, RevealOutcome::Matched);
            }
        }
        assert!(game.is_finished());
        assert_eq!(game.clicks(), 16);
    }

    #[test]
    fn mismatch_stays_visible_until_the_next_reveal() {
        let mut game = MemoryGame::new();
        let first = tiles_with_value(&game, 1);
        let second = tiles_with_value(&game, 2);
        let (a, b, c) = (first[0], second[0], second[1]);

        assert_eq!(game.reveal(a), RevealOutcome::Revealed);
        assert_eq!(game.reveal(b), RevealOutcome::Mismatch);
        assert_eq!(game.face(a), TileFace::FaceUp);
        assert_eq!(game.face(b), TileFace::FaceUp);

        assert_eq!(game.reveal(c), RevealOutcome::Revealed);
        assert_eq!(game.face(a), TileFace::Hidden);
        assert_eq!(game.face(b), TileFace::Hidden);
        assert_eq!(game.face(c), TileFace::FaceUp);
    }

    #[test]
    fn matched_count_only_grows_in_pairs() {
        let mut game = MemoryGame::new();
        let pair = tiles_with_value(&game, 3);
        let other = tiles_with_value(&game, 4);

        assert_eq!(game.matched_count(), 0);
        game.reveal(pair[0]);
        assert_eq!(game.matched_count(), 0);
        game.reveal(other[0]);
        assert_eq!(game.matched_count(), 0);
        game.reveal(pair[1]);
        assert_eq!(game.matched_count(), 0);
        game.reveal(pair[0]);
        assert_eq!(game.matched_count(), 2);
    }

    #[test]
    fn score_floors_the_click_ratio() {
        let mut game = MemoryGame::new();
        game.clicks = 16;
        assert_eq!(game.score(), 100);
        game.clicks = 20;
        assert_eq!(game.score(), 80);
        game.clicks = 48;
        assert_eq!(game.score(), 33);
    }

    #[test]
    fn finished_games_ignore_reveals_and_stop_the_clock() {
        let mut game = MemoryGame::new();
        for value in 1..=PAIR_COUNT as u8 {
            let pair = tiles_with_value(&game, value);
            game.reveal(pair[0]);
            game.reveal(pair[1]);
        }
        assert!(game.is_finished());
        assert_eq!(game.reveal(0), RevealOutcome::Ignored);
        let before = game.elapsed_seconds();
        game.on_second();
        assert_eq!(game.elapsed_seconds(), before);
    }

    #[test]
    fn restart_resets_progress() {
        let mut game = MemoryGame::new();
        game.reveal(0);
        game.on_second();
        game.restart();
        assert_eq!(game.clicks(), 0);
        assert_eq!(game.elapsed_seconds(), 0);
        assert_eq!(game.matched_count(), 0);
        assert!(!game.is_finished());
    }
}
