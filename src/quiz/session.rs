//! The quiz session controller.
//!
//! A [`QuizSession`] is a plain state machine and never performs I/O. Moves
//! that need a new question ([`QuizSession::start`], [`QuizSession::advance`])
//! hand back a [`QuestionRequest`]; the caller asks the backend and feeds the
//! outcome to [`QuizSession::resolve`]. [`QuizSession::drive`] does both for
//! callers that hold the session across the request.
//!
//! Every request carries a [`Ticket`]. Only the ticket of the single
//! outstanding request is honoured, and [`QuizSession::restart`] invalidates
//! all tickets handed out before it, so a late answer for an abandoned game
//! can never leak into the next one.

use std::fmt;

use crate::trivia::{ApiError, CategoryChoice, Question, QuestionId, TriviaBackend};

use super::grading;
use super::GameConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreSummary {
    pub correct: usize,
    pub asked: usize,
}

impl fmt::Display for ScoreSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} out of {}", self.correct, self.asked)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Phase {
    /// Configuring; no question has been served yet.
    #[default]
    PrePlay,
    /// A question is shown and its answer is hidden.
    AwaitingGuess {
        question: Question,
        pending_guess: String,
    },
    /// The guess was graded and the answer is revealed.
    ShowingResult {
        question: Question,
        guess: String,
        correct: bool,
    },
    GameOver { summary: ScoreSummary },
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::PrePlay => "setting up",
            Phase::AwaitingGuess { .. } => "waiting for a guess",
            Phase::ShowingResult { .. } => "showing the answer",
            Phase::GameOver { .. } => "game over",
        }
    }
}

/// Identifies one question request within one game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    generation: u64,
    serial: u64,
}

/// What to ask the backend for. `exclude_ids` is every question already
/// asked in this game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionRequest {
    pub ticket: Ticket,
    pub exclude_ids: Vec<QuestionId>,
    pub category: CategoryChoice,
}

/// Outcome of [`QuizSession::advance`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// The round limit was reached; the game is over.
    Finished(ScoreSummary),
    /// Another question is needed.
    Fetch(QuestionRequest),
}

/// Outcome of feeding a backend response to [`QuizSession::resolve`].
#[derive(Debug)]
pub enum Resolution {
    /// A new question is shown.
    Asked,
    /// The backend ran out of questions; the game is over.
    Finished(ScoreSummary),
    /// The request failed. Nothing changed, the same move can be retried.
    Failed(ApiError),
    /// The response belongs to a request this session no longer waits for
    /// and was ignored.
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuizError {
    #[error("cannot {action} while {phase}")]
    InvalidTransition {
        action: &'static str,
        phase: &'static str,
    },
    #[error("still waiting for the previous question")]
    RequestInFlight,
}

#[derive(Debug, Clone, Default)]
pub struct QuizSession {
    config: GameConfig,
    phase: Phase,
    asked_question_ids: Vec<QuestionId>,
    correct_count: usize,
    exhausted: bool,
    generation: u64,
    serial: u64,
    in_flight: Option<Ticket>,
}

impl QuizSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// Questions asked in this game, in the order they were graded.
    pub fn asked_question_ids(&self) -> &[QuestionId] {
        &self.asked_question_ids
    }

    pub fn correct_count(&self) -> usize {
        self.correct_count
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn is_over(&self) -> bool {
        matches!(self.phase, Phase::GameOver { .. })
    }

    pub fn current_question(&self) -> Option<&Question> {
        match &self.phase {
            Phase::AwaitingGuess { question, .. } | Phase::ShowingResult { question, .. } => {
                Some(question)
            }
            Phase::PrePlay | Phase::GameOver { .. } => None,
        }
    }

    pub fn summary(&self) -> ScoreSummary {
        ScoreSummary {
            correct: self.correct_count(),
            asked: self.asked_question_ids.len(),
        }
    }

    /// Begins a game with `config` and asks for its first question.
    pub fn start(&mut self, config: GameConfig) -> Result<QuestionRequest, QuizError> {
        self.ensure_idle()?;
        if !matches!(self.phase, Phase::PrePlay) {
            return Err(self.invalid("start a game"));
        }

        self.config = config;
        self.asked_question_ids.clear();
        self.correct_count = 0;
        self.exhausted = false;
        log::debug!("Starting quiz with {config:?}");

        Ok(self.issue_request())
    }

    /// Replaces the in-progress guess without grading it.
    pub fn set_guess(&mut self, text: &str) -> Result<(), QuizError> {
        if let Phase::AwaitingGuess { pending_guess, .. } = &mut self.phase {
            text.clone_into(pending_guess);
            return Ok(());
        }
        Err(self.invalid("type a guess"))
    }

    /// Grades whatever was last passed to [`QuizSession::set_guess`].
    pub fn submit_pending_guess(&mut self) -> Result<bool, QuizError> {
        let guess = match &self.phase {
            Phase::AwaitingGuess { pending_guess, .. } => pending_guess.clone(),
            _ => return Err(self.invalid("submit a guess")),
        };
        self.submit_guess(&guess)
    }

    /// Grades `guess` against the current question and reveals the answer.
    /// The question counts as asked from here on.
    pub fn submit_guess(&mut self, guess: &str) -> Result<bool, QuizError> {
        let question = match std::mem::take(&mut self.phase) {
            Phase::AwaitingGuess { question, .. } => question,
            other => {
                self.phase = other;
                return Err(self.invalid("submit a guess"));
            }
        };

        let correct = grading::is_correct(&question.answer, guess);
        if correct {
            self.correct_count += 1;
        }
        if !self.asked_question_ids.contains(&question.id) {
            self.asked_question_ids.push(question.id);
        }
        log::debug!(
            "Question {} graded {}, score {}",
            question.id,
            if correct { "correct" } else { "wrong" },
            self.summary()
        );

        self.phase = Phase::ShowingResult {
            question,
            guess: guess.to_string(),
            correct,
        };
        Ok(correct)
    }

    /// Moves on from a revealed answer: either the round limit is reached and
    /// the game ends, or another question is requested.
    pub fn advance(&mut self) -> Result<Step, QuizError> {
        self.ensure_idle()?;
        if !matches!(self.phase, Phase::ShowingResult { .. }) {
            return Err(self.invalid("move to the next question"));
        }

        if self
            .config
            .questions_per_round
            .is_reached(self.asked_question_ids.len())
        {
            return Ok(Step::Finished(self.finish()));
        }
        Ok(Step::Fetch(self.issue_request()))
    }

    /// Abandons the current game, whatever state it is in, including any
    /// request still on its way.
    pub fn restart(&mut self) {
        let generation = self.generation.wrapping_add(1);
        log::debug!("Restarting quiz, generation {generation}");
        *self = Self {
            generation,
            ..Self::default()
        };
    }

    /// Applies the backend's answer to the request identified by `ticket`.
    ///
    /// Exhaustion ends the game no matter how many rounds remain. A failure
    /// leaves the session exactly as it was before the request was issued.
    pub fn resolve(
        &mut self,
        ticket: Ticket,
        outcome: Result<Option<Question>, ApiError>,
    ) -> Resolution {
        if self.in_flight != Some(ticket) {
            log::debug!("Dropping response for stale request {ticket:?}");
            return Resolution::Stale;
        }
        self.in_flight = None;

        match outcome {
            Err(e) => {
                log::warn!("Unable to load quiz question: {e}");
                Resolution::Failed(e)
            }
            Ok(None) => {
                self.exhausted = true;
                Resolution::Finished(self.finish())
            }
            Ok(Some(question)) if self.asked_question_ids.contains(&question.id) => {
                log::warn!(
                    "Backend repeated question {}; treating the bank as exhausted",
                    question.id
                );
                self.exhausted = true;
                Resolution::Finished(self.finish())
            }
            Ok(Some(question)) => {
                log::debug!("Serving question {}", question.id);
                self.phase = Phase::AwaitingGuess {
                    question,
                    pending_guess: String::new(),
                };
                Resolution::Asked
            }
        }
    }

    /// Sends `request` to `backend` and resolves it.
    pub async fn drive(
        &mut self,
        request: QuestionRequest,
        backend: &dyn TriviaBackend,
    ) -> Resolution {
        let outcome = backend
            .next_quiz_question(&request.exclude_ids, request.category)
            .await;
        self.resolve(request.ticket, outcome)
    }

    fn ensure_idle(&self) -> Result<(), QuizError> {
        match self.in_flight {
            Some(_) => Err(QuizError::RequestInFlight),
            None => Ok(()),
        }
    }

    fn issue_request(&mut self) -> QuestionRequest {
        self.serial += 1;
        let ticket = Ticket {
            generation: self.generation,
            serial: self.serial,
        };
        self.in_flight = Some(ticket);
        QuestionRequest {
            ticket,
            exclude_ids: self.asked_question_ids.clone(),
            category: self.config.category,
        }
    }

    fn finish(&mut self) -> ScoreSummary {
        let summary = self.summary();
        log::debug!("Quiz over: {summary}");
        self.phase = Phase::GameOver { summary };
        summary
    }

    fn invalid(&self, action: &'static str) -> QuizError {
        QuizError::InvalidTransition {
            action,
            phase: self.phase.name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::quiz::RoundLimit;
    use crate::trivia::testing::{question, server_error, ScriptedBackend};

    fn config(rounds: usize) -> GameConfig {
        GameConfig {
            category: CategoryChoice::Any,
            questions_per_round: RoundLimit::limited(rounds).unwrap(),
        }
    }

    fn assert_invariants(session: &QuizSession) {
        let asked = session.asked_question_ids();
        assert!(session.correct_count() <= asked.len());
        let mut unique = asked.to_vec();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), asked.len(), "duplicate ids in {asked:?}");
    }

    /// Plays a whole game against `backend`, answering every question
    /// correctly, and returns how many times `advance` was called.
    async fn play_out(session: &mut QuizSession, backend: &ScriptedBackend) -> usize {
        let config = *session.config();
        let request = session.start(config).unwrap();
        let mut resolution = session.drive(request, backend).await;
        let mut advances = 0;
        loop {
            assert_invariants(session);
            match resolution {
                Resolution::Asked => {}
                Resolution::Finished(_) => return advances,
                other => panic!("unexpected {other:?}"),
            }
            session.submit_guess("maya").unwrap();
            assert_invariants(session);
            advances += 1;
            match session.advance().unwrap() {
                Step::Finished(_) => return advances,
                Step::Fetch(request) => resolution = session.drive(request, backend).await,
            }
        }
    }

    #[tokio::test]
    async fn start_serves_first_question() {
        let backend = ScriptedBackend::default();
        let mut session = QuizSession::new();

        let request = session.start(config(5)).unwrap();
        assert!(request.exclude_ids.is_empty());
        assert!(session.in_flight.is_some());

        assert!(matches!(
            session.drive(request, &backend).await,
            Resolution::Asked
        ));
        assert!(matches!(session.phase(), Phase::AwaitingGuess { .. }));
        assert_eq!(session.current_question().map(|q| q.id), Some(1));
    }

    #[tokio::test]
    async fn game_of_five_ends_after_five_advances() {
        let backend = ScriptedBackend::default();
        let mut session = QuizSession::new();
        session.config = config(5);

        let advances = play_out(&mut session, &backend).await;

        assert_eq!(advances, 5);
        assert_eq!(session.asked_question_ids(), &[1, 2, 3, 4, 5]);
        assert_eq!(
            session.phase(),
            &Phase::GameOver {
                summary: ScoreSummary {
                    correct: 5,
                    asked: 5
                }
            }
        );
        assert_eq!(backend.quiz_call_count(), 5);
        assert!(!session.is_exhausted());
    }

    #[tokio::test]
    async fn exhaustion_ends_game_before_round_limit() {
        let backend = ScriptedBackend {
            exhaust_on_call: Some(3),
            ..ScriptedBackend::default()
        };
        let mut session = QuizSession::new();
        session.config = config(5);

        play_out(&mut session, &backend).await;

        assert!(session.is_over());
        assert!(session.is_exhausted());
        assert_eq!(backend.quiz_call_count(), 3);
        assert_eq!(session.summary(), ScoreSummary { correct: 2, asked: 2 });
    }

    #[tokio::test]
    async fn exhaustion_on_first_request_ends_immediately() {
        let backend = ScriptedBackend {
            exhaust_on_call: Some(1),
            ..ScriptedBackend::default()
        };
        let mut session = QuizSession::new();

        let request = session.start(config(5)).unwrap();
        let resolution = session.drive(request, &backend).await;

        assert!(matches!(
            resolution,
            Resolution::Finished(ScoreSummary { correct: 0, asked: 0 })
        ));
        assert!(session.is_over());
    }

    #[tokio::test]
    async fn requests_exclude_every_asked_question() {
        let backend = ScriptedBackend::default();
        let mut session = QuizSession::new();
        session.config = GameConfig {
            category: CategoryChoice::Only(3),
            questions_per_round: RoundLimit::limited(3).unwrap(),
        };

        play_out(&mut session, &backend).await;

        let calls = backend.quiz_calls.lock().unwrap();
        assert_eq!(
            *calls,
            vec![
                (vec![], CategoryChoice::Only(3)),
                (vec![1], CategoryChoice::Only(3)),
                (vec![1, 2], CategoryChoice::Only(3)),
            ]
        );
    }

    #[test]
    fn wrong_guess_reveals_answer_without_scoring() {
        let mut session = QuizSession::new();
        let request = session.start(config(5)).unwrap();
        session.resolve(request.ticket, Ok(Some(question(7, "Maya Angelou"))));

        let correct = session.submit_guess("Maya Angelou").unwrap();

        assert!(!correct);
        assert_eq!(session.correct_count(), 0);
        assert_eq!(session.asked_question_ids(), &[7]);
        match session.phase() {
            Phase::ShowingResult {
                question,
                guess,
                correct,
            } => {
                assert_eq!(question.answer, "Maya Angelou");
                assert_eq!(guess, "Maya Angelou");
                assert!(!correct);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn pending_guess_is_graded_on_submit() {
        let mut session = QuizSession::new();
        let request = session.start(config(5)).unwrap();
        session.resolve(request.ticket, Ok(Some(question(7, "Maya Angelou"))));

        session.set_guess("Ma").unwrap();
        session.set_guess("Maya!").unwrap();

        assert_eq!(session.submit_pending_guess(), Ok(true));
        assert_eq!(session.correct_count(), 1);
    }

    #[test]
    fn transport_failure_on_start_leaves_pre_play() {
        let mut session = QuizSession::new();
        let request = session.start(config(5)).unwrap();

        let resolution = session.resolve(request.ticket, Err(server_error()));

        assert!(matches!(resolution, Resolution::Failed(_)));
        assert_eq!(session.phase(), &Phase::PrePlay);
        assert!(!session.in_flight.is_some());
        assert!(!session.is_exhausted());
        assert!(session.start(config(5)).is_ok());
    }

    #[test]
    fn transport_failure_on_advance_keeps_result_and_allows_retry() {
        let mut session = QuizSession::new();
        let request = session.start(config(5)).unwrap();
        session.resolve(request.ticket, Ok(Some(question(1, "Paris"))));
        session.submit_guess("paris").unwrap();
        let before = session.phase().clone();

        let Step::Fetch(request) = session.advance().unwrap() else {
            panic!("expected a fetch");
        };
        let resolution = session.resolve(request.ticket, Err(server_error()));

        assert!(matches!(resolution, Resolution::Failed(_)));
        assert_eq!(session.phase(), &before);
        assert_eq!(session.asked_question_ids(), &[1]);
        assert_eq!(session.correct_count(), 1);

        let Step::Fetch(retry) = session.advance().unwrap() else {
            panic!("expected a fetch");
        };
        assert_eq!(retry.exclude_ids, vec![1]);
    }

    #[test]
    fn only_one_request_in_flight() {
        let mut session = QuizSession::new();
        let request = session.start(config(5)).unwrap();

        assert_eq!(session.start(config(5)), Err(QuizError::RequestInFlight));

        session.resolve(request.ticket, Ok(Some(question(1, "Paris"))));
        session.submit_guess("x").unwrap();
        let _pending = session.advance().unwrap();
        assert_eq!(session.advance(), Err(QuizError::RequestInFlight));
    }

    #[test]
    fn invalid_moves_are_rejected_without_changes() {
        let mut session = QuizSession::new();

        assert!(matches!(
            session.submit_guess("x"),
            Err(QuizError::InvalidTransition { .. })
        ));
        assert!(matches!(
            session.advance(),
            Err(QuizError::InvalidTransition { .. })
        ));
        assert!(session.set_guess("x").is_err());

        let request = session.start(config(5)).unwrap();
        session.resolve(request.ticket, Ok(Some(question(1, "Paris"))));
        assert!(matches!(
            session.advance(),
            Err(QuizError::InvalidTransition { .. })
        ));
        assert!(matches!(session.phase(), Phase::AwaitingGuess { .. }));

        session.submit_guess("paris").unwrap();
        assert!(matches!(
            session.submit_guess("paris"),
            Err(QuizError::InvalidTransition { .. })
        ));
        assert_eq!(session.correct_count(), 1);
    }

    /// A session driven into the phase numbered `stage`, from set-up (0)
    /// through game over (4).
    fn session_at(stage: usize) -> QuizSession {
        let mut session = QuizSession::new();
        if stage == 0 {
            return session;
        }
        let request = session.start(config(1)).unwrap();
        if stage == 1 {
            return session;
        }
        session.resolve(request.ticket, Ok(Some(question(1, "Paris"))));
        if stage == 2 {
            return session;
        }
        session.submit_guess("paris").unwrap();
        if stage == 3 {
            return session;
        }
        session.advance().unwrap();
        session
    }

    #[test]
    fn restart_from_every_phase_returns_to_pre_play() {
        for stage in 0..=4 {
            let mut session = session_at(stage);

            session.restart();

            assert_eq!(session.phase(), &Phase::PrePlay, "stage {stage}");
            assert!(session.asked_question_ids().is_empty());
            assert_eq!(session.correct_count(), 0);
            assert!(!session.in_flight.is_some());
            assert!(!session.is_exhausted());
            assert_eq!(session.config(), &GameConfig::default());
        }
        assert!(session_at(4).is_over());
    }

    #[test]
    fn response_after_restart_is_discarded() {
        let mut session = QuizSession::new();
        let old = session.start(config(5)).unwrap();

        session.restart();
        assert!(matches!(
            session.resolve(old.ticket, Ok(Some(question(1, "Paris")))),
            Resolution::Stale
        ));
        assert_eq!(session.phase(), &Phase::PrePlay);

        // A new game started in the meantime is not disturbed either.
        let new = session.start(config(3)).unwrap();
        assert!(matches!(
            session.resolve(old.ticket, Ok(None)),
            Resolution::Stale
        ));
        assert!(session.in_flight.is_some());
        assert!(!session.is_exhausted());

        assert!(matches!(
            session.resolve(new.ticket, Ok(Some(question(2, "Rome")))),
            Resolution::Asked
        ));
        assert_eq!(session.current_question().map(|q| q.id), Some(2));
    }

    #[test]
    fn duplicate_response_is_discarded() {
        let mut session = QuizSession::new();
        let request = session.start(config(5)).unwrap();
        session.resolve(request.ticket, Ok(Some(question(1, "Paris"))));

        assert!(matches!(
            session.resolve(request.ticket, Ok(Some(question(2, "Rome")))),
            Resolution::Stale
        ));
        assert_eq!(session.current_question().map(|q| q.id), Some(1));
    }

    #[test]
    fn repeated_question_from_backend_counts_as_exhaustion() {
        let mut session = QuizSession::new();
        let request = session.start(config(5)).unwrap();
        session.resolve(request.ticket, Ok(Some(question(1, "Paris"))));
        session.submit_guess("paris").unwrap();
        let Step::Fetch(request) = session.advance().unwrap() else {
            panic!("expected a fetch");
        };

        let resolution = session.resolve(request.ticket, Ok(Some(question(1, "Paris"))));

        assert!(matches!(resolution, Resolution::Finished(_)));
        assert!(session.is_exhausted());
        assert_eq!(session.asked_question_ids(), &[1]);
    }

    #[test]
    fn unlimited_game_runs_until_exhaustion() {
        let mut session = QuizSession::new();
        let mut request = session
            .start(GameConfig {
                category: CategoryChoice::Any,
                questions_per_round: RoundLimit::Unlimited,
            })
            .unwrap();

        for id in 1..=60 {
            session.resolve(request.ticket, Ok(Some(question(id, "x"))));
            session.submit_guess("x").unwrap();
            request = match session.advance().unwrap() {
                Step::Fetch(request) => request,
                Step::Finished(_) => panic!("unlimited game finished at {id}"),
            };
        }
        session.resolve(request.ticket, Ok(None));

        assert_eq!(session.summary(), ScoreSummary { correct: 60, asked: 60 });
    }

    #[test]
    fn summary_reads_as_score_out_of_asked() {
        assert_eq!(
            ScoreSummary { correct: 3, asked: 5 }.to_string(),
            "3 out of 5"
        );
    }

    #[derive(Debug, Clone)]
    enum Action {
        Start(usize),
        Answer { id: QuestionId },
        Exhaust,
        Fail,
        Guess(bool),
        Advance,
        Restart,
    }

    fn action() -> impl Strategy<Value = Action> {
        prop_oneof![
            (1usize..6).prop_map(Action::Start),
            (1i64..8).prop_map(|id| Action::Answer { id }),
            Just(Action::Exhaust),
            Just(Action::Fail),
            any::<bool>().prop_map(Action::Guess),
            Just(Action::Advance),
            Just(Action::Restart),
        ]
    }

    proptest! {
        #[test]
        fn invariants_hold_for_any_sequence(actions in prop::collection::vec(action(), 0..60)) {
            let mut session = QuizSession::new();
            let mut pending: Option<Ticket> = None;

            for action in actions {
                match action {
                    Action::Start(rounds) => {
                        if let Ok(request) = session.start(config(rounds)) {
                            pending = Some(request.ticket);
                        }
                    }
                    Action::Answer { id } => {
                        if let Some(ticket) = pending.take() {
                            session.resolve(ticket, Ok(Some(question(id, "alpha beta"))));
                        }
                    }
                    Action::Exhaust => {
                        if let Some(ticket) = pending.take() {
                            session.resolve(ticket, Ok(None));
                        }
                    }
                    Action::Fail => {
                        if let Some(ticket) = pending.take() {
                            session.resolve(ticket, Err(server_error()));
                        }
                    }
                    Action::Guess(right) => {
                        let _ = session.submit_guess(if right { "beta" } else { "gamma" });
                    }
                    Action::Advance => {
                        if let Ok(Step::Fetch(request)) = session.advance() {
                            prop_assert_eq!(&request.exclude_ids, &session.asked_question_ids().to_vec());
                            pending = Some(request.ticket);
                        }
                    }
                    Action::Restart => session.restart(),
                }

                let asked = session.asked_question_ids();
                prop_assert!(session.correct_count() <= asked.len());
                let mut unique = asked.to_vec();
                unique.sort_unstable();
                unique.dedup();
                prop_assert_eq!(unique.len(), asked.len());
                if let RoundLimit::Limited(limit) = session.config().questions_per_round {
                    prop_assert!(asked.len() <= limit.get());
                }
            }
        }
    }
}
