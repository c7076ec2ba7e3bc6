use rand::Rng;

pub const ROUNDS: u32 = 10;
pub const ROUND_SECONDS: u32 = 10;
pub const POINTS_PER_ANSWER: i64 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Add,
    Sub,
    Mul,
}

impl Operator {
    pub fn symbol(self) -> char {
        match self {
            Operator::Add => '+',
            Operator::Sub => '-',
            Operator::Mul => '*',
        }
    }

    fn apply(self, a: i64, b: i64) -> i64 {
        match self {
            Operator::Add => a + b,
            Operator::Sub => a - b,
            Operator::Mul => a * b,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Equation {
    pub a: i64,
    pub b: i64,
    pub op: Operator,
}

impl Equation {
    fn draw(rng: &mut impl Rng) -> Self {
        let ops = [Operator::Add, Operator::Sub, Operator::Mul];
        Self {
            a: rng.gen_range(1..=100),
            b: rng.gen_range(1..=10),
            op: ops[rng.gen_range(0..ops.len())],
        }
    }

    pub fn answer(&self) -> i64 {
        self.op.apply(self.a, self.b)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Round,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Feedback {
    pub correct: bool,
    pub expected: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Ignored,
    Accepted,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Idle,
    Counting,
    Expired,
}

#[derive(Debug, Clone)]
pub struct CalculationGame {
    phase: Phase,
    equation: Option<Equation>,
    round: u32,
    current_score: i64,
    total_seconds: u32,
    remaining_seconds: u32,
    feedback: Option<Feedback>,
}

impl CalculationGame {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            equation: None,
            round: 0,
            current_score: 0,
            total_seconds: 0,
            remaining_seconds: 0,
            feedback: None,
        }
    }

    pub fn start(&mut self) {
        *self = Self::new();
        self.phase = Phase::Round;
        self.next_equation();
    }

    // The answer is judged as typed; anything that does not parse as an
    // integer counts as a wrong answer, never as an error. Rounds advance
    // only here, so ten submits end the game no matter how many equations
    // timed out along the way.
    pub fn submit(&mut self, input: &str) -> SubmitOutcome {
        let Some(eq) = self.equation else {
            return SubmitOutcome::Ignored;
        };
        if self.phase != Phase::Round {
            return SubmitOutcome::Ignored;
        }
        let expected = eq.answer();
        let correct = input
            .trim()
            .parse::<i64>()
            .map(|v| v == expected)
            .unwrap_or(false);
        if correct {
            self.current_score += POINTS_PER_ANSWER;
        }
        self.feedback = Some(Feedback { correct, expected });
        self.round += 1;
        if self.round >= ROUNDS {
            self.phase = Phase::Finished;
            self.equation = None;
            self.remaining_seconds = 0;
            return SubmitOutcome::Finished;
        }
        self.next_equation();
        SubmitOutcome::Accepted
    }

    // One wall-clock second of an active round. Expiry swaps in a fresh
    // equation and rewinds the countdown without touching the round count.
    pub fn on_second(&mut self) -> TickOutcome {
        if self.phase != Phase::Round {
            return TickOutcome::Idle;
        }
        self.total_seconds += 1;
        if self.remaining_seconds > 1 {
            self.remaining_seconds -= 1;
            TickOutcome::Counting
        } else {
            self.next_equation();
            TickOutcome::Expired
        }
    }

    fn next_equation(&mut self) {
        self.equation = Some(Equation::draw(&mut rand::thread_rng()));
        self.remaining_seconds = ROUND_SECONDS;
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn equation(&self) -> Option<Equation> {
        self.equation
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn current_score(&self) -> i64 {
        self.current_score
    }

    pub fn total_seconds(&self) -> u32 {
        self.total_seconds
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.remaining_seconds
    }

    pub fn feedback(&self) -> Option<Feedback> {
        self.feedback
    }

    // Seconds count against the score, so the total can go negative.
    pub fn total_score(&self) -> i64 {
        self.current_score - self.total_seconds as i64
    }
}

impl Default for CalculationGame {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer_text(game: &CalculationGame) -> String {
        game.equation().map(|eq| eq.answer().to_string()).unwrap_or_default()
    }

    #[test]
    fn operands_stay_in_range() {
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let eq = Equation::draw(&mut rng);
            assert!((1..=100).contains(&eq.a));
            assert!((1..=10).contains(&eq.b));
        }
    }

    #[test]
    fn subtraction_may_go_negative() {
        let eq = Equation { a: 1, b: 9, op: Operator::Sub };
        assert_eq!(eq.answer(), -8);
    }

    #[test]
    fn game_opens_idle_until_started() {
        let mut game = CalculationGame::new();
        assert_eq!(game.phase(), Phase::Idle);
        assert!(game.equation().is_none());
        assert_eq!(game.submit("3"), SubmitOutcome::Ignored);
        assert_eq!(game.on_second(), TickOutcome::Idle);
        assert_eq!(game.total_seconds(), 0);
    }

    #[test]
    fn ten_submits_finish_the_game_exactly_once() {
        let mut game = CalculationGame::new();
        game.start();
        for round in 1..ROUNDS {
            assert_eq!(game.submit("no idea"), SubmitOutcome::Accepted);
            assert_eq!(game.round(), round);
        }
        assert_eq!(game.submit("no idea"), SubmitOutcome::Finished);
        assert_eq!(game.phase(), Phase::Finished);
        assert_eq!(game.round(), ROUNDS);
        assert_eq!(game.submit("42"), SubmitOutcome::Ignored);
    }

    #[test]
    fn correct_answers_add_twenty_points() {
        let mut game = CalculationGame::new();
        game.start();
        let text = answer_text(&game);
        game.submit(&text);
        assert_eq!(game.current_score(), POINTS_PER_ANSWER);
        assert_eq!(game.feedback().map(|f| f.correct), Some(true));
    }

    #[test]
    fn non_numeric_input_scores_as_wrong() {
        let mut game = CalculationGame::new();
        game.start();
        let expected = game.equation().map(|eq| eq.answer());
        game.submit("carrots");
        assert_eq!(game.current_score(), 0);
        let feedback = game.feedback().expect("feedback after submit");
        assert!(!feedback.correct);
        assert_eq!(Some(feedback.expected), expected);
        assert_eq!(game.round(), 1);
    }

    #[test]
    fn expiry_redraws_without_advancing_the_round() {
        let mut game = CalculationGame::new();
        game.start();
        for s in 1..ROUND_SECONDS {
            assert_eq!(game.on_second(), TickOutcome::Counting);
            assert_eq!(game.remaining_seconds(), ROUND_SECONDS - s);
        }
        assert_eq!(game.on_second(), TickOutcome::Expired);
        assert_eq!(game.round(), 0);
        assert_eq!(game.phase(), Phase::Round);
        assert_eq!(game.remaining_seconds(), ROUND_SECONDS);
        assert_eq!(game.total_seconds(), ROUND_SECONDS);
    }

    #[test]
    fn submit_rewinds_the_countdown() {
        let mut game = CalculationGame::new();
        game.start();
        game.on_second();
        game.on_second();
        game.submit("whatever");
        assert_eq!(game.remaining_seconds(), ROUND_SECONDS);
    }

    #[test]
    fn total_score_subtracts_elapsed_seconds() {
        let mut game = CalculationGame::new();
        game.start();
        game.on_second();
        game.on_second();
        game.on_second();
        for _ in 0..ROUNDS {
            let text = answer_text(&game);
            game.submit(&text);
        }
        assert_eq!(game.phase(), Phase::Finished);
        assert_eq!(game.current_score(), ROUNDS as i64 * POINTS_PER_ANSWER);
        assert_eq!(game.total_score(), ROUNDS as i64 * POINTS_PER_ANSWER - 3);
    }

    #[test]
    fn total_score_can_go_negative() {
        let mut game = CalculationGame::new();
        game.start();
        for _ in 0..30 {
            game.on_second();
        }
        for _ in 0..ROUNDS {
            game.submit("wrong");
        }
        assert_eq!(game.total_score(), -30);
    }
}
