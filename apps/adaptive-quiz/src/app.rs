//! Application state and logic.

use crate::config::{Config, StorageBackend};
use crossterm::event::{KeyCode, KeyEvent};
use quiz_engine::{
    Advance, AnswerOutcome, Completion, EndReason, JsonFileBackend, PerformanceStore,
    QuestionBank, QuizSession, QuizSummary, SessionError, SqliteBackend, StatsBackend,
    StoreWarning, Username,
};
use tracing::warn;

pub struct App {
    pub config: Config,
    pub bank: QuestionBank,
    pub store: PerformanceStore,
    pub view: View,
    pub input_buffer: String,
    pub session: Option<QuizSession>,
    pub feedback: Option<Feedback>,
    pub summary: Option<QuizSummary>,
    pub message: Option<String>,
    pub confirm_quit: bool,
    pub should_quit: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Login,
    Quiz,
    Results,
}

/// What the user sees after answering the current question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feedback {
    /// Index of the picked choice.
    pub picked: usize,
    pub correct: bool,
    pub answer: String,
    pub times_correct: u32,
    pub times_chosen: u32,
}

impl Feedback {
    fn from_outcome(picked: usize, outcome: &AnswerOutcome) -> Self {
        Self {
            picked,
            correct: outcome.correct,
            answer: outcome.answer.clone(),
            times_correct: outcome.times_correct,
            times_chosen: outcome.times_chosen,
        }
    }
}

/// Choices are picked with the digit keys 1-9.
pub const MAX_CHOICES: usize = 9;

fn check_choice_count(bank: &QuestionBank) -> anyhow::Result<()> {
    if let Some(q) = bank.iter().find(|q| q.choices.len() > MAX_CHOICES) {
        anyhow::bail!(
            "Question {} has {} choices; at most {} can be answered from the keyboard",
            q.id,
            q.choices.len(),
            MAX_CHOICES
        );
    }
    Ok(())
}

impl App {
    /// Load the question bank and user data named by the config file.
    ///
    /// A missing or malformed bank is fatal. Malformed user data is dropped
    /// and reported once the UI is up.
    pub fn new() -> anyhow::Result<Self> {
        let config = Config::load();
        if Config::config_path().is_some_and(|p| !p.exists()) {
            if let Err(e) = config.save() {
                warn!(error = %e, "could not write default config");
            }
        }
        let bank = QuestionBank::load(&config.quiz.questions_file)?;
        check_choice_count(&bank)?;

        let path = config.store_path();
        let backend: Box<dyn StatsBackend> = match config.storage.backend {
            StorageBackend::Json => Box::new(JsonFileBackend::new(path)),
            StorageBackend::Sqlite => Box::new(SqliteBackend::new(path)),
        };
        let (store, warning) = PerformanceStore::load(backend)?;

        Ok(Self::with_parts(config, bank, store, warning))
    }

    pub fn with_parts(
        config: Config,
        bank: QuestionBank,
        store: PerformanceStore,
        warning: Option<StoreWarning>,
    ) -> Self {
        Self {
            config,
            bank,
            store,
            view: View::Login,
            input_buffer: String::new(),
            session: None,
            feedback: None,
            summary: None,
            message: warning.map(|w| w.to_string()),
            confirm_quit: false,
            should_quit: false,
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if self.confirm_quit {
            self.confirm_quit = false;
            if matches!(key.code, KeyCode::Char('y') | KeyCode::Char('Y')) {
                self.should_quit = true;
            }
            return;
        }

        if key.code == KeyCode::Esc {
            self.confirm_quit = true;
            return;
        }

        self.message = None;
        match self.view {
            View::Login => self.handle_login_key(key),
            View::Quiz => self.handle_quiz_key(key),
            View::Results => self.handle_results_key(key),
        }
    }

    fn handle_login_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => self.start_quiz(),
            KeyCode::Backspace => {
                self.input_buffer.pop();
            }
            KeyCode::Char(c) => self.input_buffer.push(c),
            _ => {}
        }
    }

    fn handle_quiz_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char(c) if c.is_ascii_digit() && c != '0' => {
                let index = c as usize - '1' as usize;
                self.choose(index);
            }
            KeyCode::Enter => self.next_question(),
            _ => {}
        }
    }

    fn handle_results_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Enter {
            self.session = None;
            self.feedback = None;
            self.summary = None;
            self.view = View::Login;
        }
    }

    fn start_quiz(&mut self) {
        let username = match Username::parse(&self.input_buffer) {
            Ok(username) => username,
            Err(e) => {
                self.message = Some(e.to_string());
                return;
            }
        };

        let config = self.config.to_session_config();
        let mut rng = rand::thread_rng();
        let (mut session, persist_error) =
            match QuizSession::start(&mut self.store, &self.bank, &username, &config, &mut rng) {
                Ok(started) => started,
                Err(e) => {
                    self.message = Some(e.to_string());
                    return;
                }
            };
        if let Some(e) = persist_error {
            self.message = Some(format!("Could not save user data: {}", e));
        }
        if let Some(e) = session.load_question().err() {
            self.message = Some(e.to_string());
            return;
        }

        self.input_buffer = username.to_string();
        self.session = Some(session);
        self.feedback = None;
        self.summary = None;
        self.view = View::Quiz;
    }

    fn choose(&mut self, index: usize) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some(choice) = session.current().and_then(|q| q.choices().get(index)).cloned() else {
            return;
        };

        match session.answer(&choice, &mut self.store) {
            Ok(outcome) => {
                if let Some(e) = &outcome.persist_error {
                    self.message = Some(format!("Could not save user data: {}", e));
                }
                self.feedback = Some(Feedback::from_outcome(index, &outcome));
            }
            Err(SessionError::AlreadyAnswered) => {
                self.message = Some("Already answered. Press Enter for the next question.".into());
            }
            // The time limit passed before the timer noticed.
            Err(SessionError::SessionClosed) => self.show_results(),
            Err(e) => self.message = Some(e.to_string()),
        }
    }

    fn next_question(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        match session.advance(&mut self.store) {
            Ok(Advance::Next) => {
                self.feedback = None;
                if let Some(e) = session.load_question().err() {
                    self.message = Some(e.to_string());
                }
            }
            Ok(Advance::Completed(completion)) => self.finish(completion),
            Err(SessionError::NotAnswered) => {
                self.message = Some("Pick an answer first.".into());
            }
            Err(e) => self.message = Some(e.to_string()),
        }
    }

    /// Timer step, called by the event loop.
    pub fn tick(&mut self) {
        if self.view != View::Quiz {
            return;
        }
        let completion = self
            .session
            .as_mut()
            .and_then(|session| session.tick(&mut self.store));
        if let Some(completion) = completion {
            self.finish(completion);
        }
    }

    fn finish(&mut self, completion: Completion) {
        if let Some(e) = &completion.persist_error {
            warn!(error = %e, "final score not saved");
            self.message = Some(format!("Could not save user data: {}", e));
        } else {
            self.message = None;
        }
        self.show_results();
    }

    fn show_results(&mut self) {
        let Some(session) = &self.session else {
            return;
        };
        if self.message.is_none() && session.end_reason() == Some(EndReason::TimeExpired) {
            self.message = Some("Time's up!".into());
        }
        self.summary = self
            .store
            .profile(session.username())
            .map(|profile| QuizSummary::new(session, profile, &self.bank));
        self.feedback = None;
        self.view = View::Results;
    }

    /// Remaining time of the running quiz as `MM:SS`.
    pub fn countdown(&self) -> Option<String> {
        self.session
            .as_ref()
            .filter(|s| !s.is_complete())
            .map(QuizSession::format_remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;
    use quiz_engine::{MemoryBackend, Question};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
    }

    fn app(questions: usize) -> App {
        let bank = QuestionBank::new(
            (1..=questions)
                .map(|i| {
                    Question::new(
                        i.to_string(),
                        format!("{}. Question {}", i, i),
                        vec!["yes".into(), "no".into()],
                        "yes",
                    )
                })
                .collect(),
        )
        .unwrap();
        let mut config = Config::default();
        config.quiz.questions_per_quiz = 2;
        App::with_parts(config, bank, PerformanceStore::in_memory(), None)
    }

    fn pick_correct(app: &mut App) {
        let index = app
            .session
            .as_ref()
            .and_then(|s| s.current())
            .and_then(|q| q.choices().iter().position(|c| c == "yes"))
            .unwrap();
        app.handle_key(key(KeyCode::Char(char::from(b'1' + index as u8))));
    }

    #[test]
    fn test_invalid_username_stays_on_login() {
        let mut app = app(3);
        type_text(&mut app, "a!");
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.view, View::Login);
        assert!(app.message.is_some());
    }

    #[test]
    fn test_full_quiz_reaches_results() {
        let mut app = app(3);
        type_text(&mut app, " Alice ");
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.view, View::Quiz);
        assert_eq!(app.input_buffer, "alice");

        pick_correct(&mut app);
        let feedback = app.feedback.clone().unwrap();
        assert!(feedback.correct);
        assert_eq!((feedback.times_correct, feedback.times_chosen), (1, 1));
        app.handle_key(key(KeyCode::Enter));
        assert!(app.feedback.is_none());

        pick_correct(&mut app);
        app.handle_key(key(KeyCode::Enter));

        assert_eq!(app.view, View::Results);
        let summary = app.summary.as_ref().unwrap();
        assert_eq!(summary.score, 2);
        assert_eq!(summary.total, 2);
        assert_eq!(summary.history, vec![2]);
    }

    #[test]
    fn test_enter_without_answer_keeps_question() {
        let mut app = app(3);
        type_text(&mut app, "alice");
        app.handle_key(key(KeyCode::Enter));

        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.view, View::Quiz);
        assert_eq!(app.session.as_ref().unwrap().position(), 0);
        assert_eq!(app.message.as_deref(), Some("Pick an answer first."));
    }

    #[test]
    fn test_second_pick_is_ignored() {
        let mut app = app(3);
        type_text(&mut app, "alice");
        app.handle_key(key(KeyCode::Enter));

        app.handle_key(key(KeyCode::Char('1')));
        let first = app.feedback.clone();
        app.handle_key(key(KeyCode::Char('2')));
        assert_eq!(app.feedback, first);
        assert!(app.message.is_some());
    }

    #[test]
    fn test_out_of_range_digit_is_ignored() {
        let mut app = app(3);
        type_text(&mut app, "alice");
        app.handle_key(key(KeyCode::Enter));

        app.handle_key(key(KeyCode::Char('9')));
        assert!(app.feedback.is_none());
        assert!(!app.session.as_ref().unwrap().current_answered());
    }

    #[test]
    fn test_escape_asks_before_quitting() {
        let mut app = app(3);
        app.handle_key(key(KeyCode::Esc));
        assert!(app.confirm_quit);
        app.handle_key(key(KeyCode::Char('n')));
        assert!(!app.should_quit);

        app.handle_key(key(KeyCode::Esc));
        app.handle_key(key(KeyCode::Char('y')));
        assert!(app.should_quit);
    }

    #[test]
    fn test_store_warning_is_shown() {
        let (store, _) = PerformanceStore::load(Box::new(MemoryBackend::new())).unwrap();
        let warning = StoreWarning::Discarded {
            reason: "bad json".into(),
        };
        let app = App::with_parts(Config::default(), QuestionBank::default(), store, Some(warning));
        assert!(app.message.unwrap().contains("bad json"));
    }

    #[test]
    fn test_results_return_to_login() {
        let mut app = app(1);
        type_text(&mut app, "alice");
        app.handle_key(key(KeyCode::Enter));
        app.handle_key(key(KeyCode::Char('2')));
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.view, View::Results);

        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.view, View::Login);
        assert_eq!(app.input_buffer, "alice");
        assert!(app.countdown().is_none());
    }

    #[test]
    fn test_answer_after_time_limit_shows_results() {
        let mut app = app(3);
        type_text(&mut app, "alice");
        app.handle_key(key(KeyCode::Enter));

        let session = app.session.take().unwrap();
        let alice = session.username().clone();
        let mut late = QuizSession::new(
            alice.clone(),
            session.questions().to_vec(),
            chrono::Utc::now() - chrono::Duration::minutes(30),
            chrono::Duration::minutes(25),
        )
        .unwrap();
        late.load_question().unwrap();
        app.session = Some(late);

        app.handle_key(key(KeyCode::Char('1')));
        assert_eq!(app.view, View::Results);
        assert!(app.feedback.is_none());
        assert_eq!(app.message.as_deref(), Some("Time's up!"));
        assert_eq!(app.summary.as_ref().unwrap().score, 0);
        assert_eq!(app.store.profile(&alice).unwrap().scores(), &[0]);
    }

    #[test]
    fn test_too_many_choices_rejected() {
        let choices: Vec<String> = (1..=10).map(|i| i.to_string()).collect();
        let wide = QuestionBank::new(vec![Question::new("1", "Pick", choices, "10")]).unwrap();
        let err = check_choice_count(&wide).unwrap_err();
        assert!(err.to_string().contains("10 choices"));

        assert!(check_choice_count(&app(3).bank).is_ok());
    }
}
