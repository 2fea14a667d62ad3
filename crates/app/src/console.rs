//! Line-based terminal front-end over `SessionLoopService`.

use std::io::{self, BufRead, Write};

use quiz_core::model::{
    AnswerLabel, AnswerSet, MAX_OPTIONS, QuestionDraft, SetId, strip_option_label,
};
use services::{
    AnswerOutcome, QuizSession, SessionAdvance, SessionError, SessionLoopService, SessionReport,
    SessionSource,
};

/// What the user picked in the main menu.
#[derive(Debug, Clone, PartialEq, Eq)]
enum MenuChoice {
    Start(SessionSource),
    Quit,
}

/// What the user typed at the answer prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
enum AnswerInput {
    Letters(AnswerSet),
    Edit,
    Abort,
}

/// How a session ended.
enum SessionEnd {
    Completed(SessionReport),
    Aborted,
}

pub struct Console<R, W> {
    input: R,
    output: W,
    service: SessionLoopService,
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W, service: SessionLoopService) -> Self {
        Self {
            input,
            output,
            service,
        }
    }

    /// Menu loop; returns when the user quits or input ends.
    pub fn run(&mut self) -> io::Result<()> {
        loop {
            let Some(choice) = self.main_menu()? else {
                return Ok(());
            };
            let MenuChoice::Start(source) = choice else {
                return Ok(());
            };

            let mut next = Some(source);
            while let Some(source) = next.take() {
                let session = match self.service.start_session(source) {
                    Ok(session) => session,
                    Err(SessionError::NothingToReview) => {
                        writeln!(self.output, "No incorrectly answered questions to review.")?;
                        break;
                    }
                    Err(err) => {
                        writeln!(self.output, "Cannot start quiz: {err}")?;
                        break;
                    }
                };
                let restart_source = session.source().clone();
                match self.play(session)? {
                    Some(SessionEnd::Completed(report)) => {
                        self.show_report(&report)?;
                        if self.confirm("Restart this quiz? [y/N] ")? {
                            next = Some(restart_source);
                        }
                    }
                    Some(SessionEnd::Aborted) => writeln!(self.output, "Quiz aborted.")?,
                    None => return Ok(()),
                }
            }
        }
    }

    fn prompt(&mut self, text: &str) -> io::Result<Option<String>> {
        write!(self.output, "{text}")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_owned()))
    }

    fn confirm(&mut self, text: &str) -> io::Result<bool> {
        Ok(self
            .prompt(text)?
            .is_some_and(|answer| matches!(answer.trim(), "y" | "Y" | "yes")))
    }

    fn main_menu(&mut self) -> io::Result<Option<MenuChoice>> {
        let sets: Vec<(SetId, usize)> = self
            .service
            .store()
            .set_ids()
            .map(|id| {
                let count = self.service.store().questions(id).map_or(0, <[_]>::len);
                (id.clone(), count)
            })
            .collect();

        loop {
            writeln!(self.output)?;
            writeln!(self.output, "Question sets:")?;
            for (index, (set_id, count)) in sets.iter().enumerate() {
                writeln!(self.output, "  {}. {set_id} ({count} questions)", index + 1)?;
            }
            writeln!(self.output, "  a. All sets")?;
            writeln!(self.output, "  u. Several sets (e.g. u 1,3)")?;
            writeln!(self.output, "  m. Review mistakes")?;
            writeln!(self.output, "  q. Quit")?;

            let Some(line) = self.prompt("> ")? else {
                return Ok(None);
            };
            match parse_menu_choice(&line, &sets) {
                Some(choice) => return Ok(Some(choice)),
                None => writeln!(self.output, "Unrecognised choice: {}", line.trim())?,
            }
        }
    }

    /// Run one session to its end; `None` when input ran out.
    fn play(&mut self, mut session: QuizSession) -> io::Result<Option<SessionEnd>> {
        loop {
            self.show_question(&session)?;

            let input = loop {
                let Some(line) = self.prompt("Answer (letters, edit, abort): ")? else {
                    return self.abort(session).map(|()| None);
                };
                match parse_answer_input(&line) {
                    Some(input) => break input,
                    None => writeln!(self.output, "Type answer letters such as A or B,D.")?,
                }
            };

            match input {
                AnswerInput::Abort => return self.abort(session).map(|()| Some(SessionEnd::Aborted)),
                AnswerInput::Edit => self.edit_current(&mut session)?,
                AnswerInput::Letters(selected) => {
                    let outcome = match self.service.submit_answer(&mut session, &selected) {
                        Ok(outcome) => outcome,
                        Err(err) => {
                            writeln!(self.output, "{err}")?;
                            continue;
                        }
                    };
                    self.show_outcome(&outcome)?;
                    if self.prompt("Press Enter to continue ")?.is_none() {
                        return self.abort(session).map(|()| None);
                    }
                    match self.service.advance(&mut session) {
                        Ok(SessionAdvance::Next) => {}
                        Ok(SessionAdvance::Completed(report)) => {
                            return Ok(Some(SessionEnd::Completed(report)));
                        }
                        Err(err) => writeln!(self.output, "{err}")?,
                    }
                }
            }
        }
    }

    fn abort(&mut self, session: QuizSession) -> io::Result<()> {
        if let Err(err) = self.service.abort(session) {
            writeln!(self.output, "Warning: {err}")?;
        }
        Ok(())
    }

    fn show_question(&mut self, session: &QuizSession) -> io::Result<()> {
        let Some(presented) = session.presented() else {
            return Ok(());
        };
        let progress = session.progress();
        let elapsed = self.service.clock().elapsed_since(session.started_at());

        writeln!(self.output)?;
        writeln!(
            self.output,
            "[{}/{}] {}  score {}  {elapsed}",
            session.cursor() + 1,
            progress.total,
            presented.question.set_id(),
            session.score()
        )?;
        writeln!(self.output, "{}", presented.question.text())?;
        for (index, option) in presented.options.iter().enumerate() {
            let label = AnswerLabel::from_index(index).map_or('?', AnswerLabel::as_char);
            writeln!(self.output, "  {label}. {}", strip_option_label(option))?;
        }
        Ok(())
    }

    fn show_outcome(&mut self, outcome: &AnswerOutcome) -> io::Result<()> {
        if outcome.is_correct {
            writeln!(self.output, "Correct!")
        } else {
            writeln!(
                self.output,
                "Incorrect. Correct answer: {}",
                outcome.expected
            )
        }
    }

    fn show_report(&mut self, report: &SessionReport) -> io::Result<()> {
        let summary = &report.summary;
        writeln!(self.output)?;
        writeln!(
            self.output,
            "Score: {}/{} ({}%) in {}",
            summary.score(),
            summary.total(),
            summary.percentage(),
            summary.elapsed()
        )?;
        if let Some(warning) = &report.save_warning {
            writeln!(self.output, "Warning: {warning}")?;
        }
        Ok(())
    }

    /// Prompt for new content; blank input keeps the current value, `-` clears an option.
    fn edit_current(&mut self, session: &mut QuizSession) -> io::Result<()> {
        let Some(question) = session.current_question() else {
            return Ok(());
        };
        let current_text = question.text().to_owned();
        let current_options = question.options().to_vec();
        let current_correct = question.correct_answers().clone();

        writeln!(self.output, "Editing (stored option order, blank keeps value, - clears):")?;
        let Some(text) = self.prompt(&format!("Question [{current_text}]: "))? else {
            return Ok(());
        };
        let text = if text.trim().is_empty() { current_text } else { text };

        let mut options = Vec::with_capacity(MAX_OPTIONS);
        for index in 0..MAX_OPTIONS {
            let label = AnswerLabel::from_index(index).map_or('?', AnswerLabel::as_char);
            let current = current_options.get(index).cloned().unwrap_or_default();
            let Some(line) = self.prompt(&format!("Option {label} [{current}]: "))? else {
                return Ok(());
            };
            options.push(match line.trim() {
                "" => current,
                "-" => String::new(),
                _ => line,
            });
        }

        let Some(line) = self.prompt(&format!("Correct answers [{current_correct}]: "))? else {
            return Ok(());
        };
        let correct_answers = if line.trim().is_empty() {
            current_correct
        } else {
            match AnswerSet::parse_letters(&line) {
                Ok(set) => set,
                Err(err) => {
                    writeln!(self.output, "Not saved: {err}")?;
                    return Ok(());
                }
            }
        };

        let draft = QuestionDraft {
            text,
            options,
            correct_answers,
        };
        match self.service.edit_current_question(session, draft) {
            Ok(_) => writeln!(self.output, "Question saved."),
            Err(err) => writeln!(self.output, "Not saved: {err}"),
        }
    }
}

fn parse_menu_choice(line: &str, sets: &[(SetId, usize)]) -> Option<MenuChoice> {
    let line = line.trim();
    let (head, rest) = line.split_at(line.find(char::is_whitespace).unwrap_or(line.len()));
    match head.to_ascii_lowercase().as_str() {
        "q" => Some(MenuChoice::Quit),
        "a" => Some(MenuChoice::Start(SessionSource::All)),
        "m" => Some(MenuChoice::Start(SessionSource::Mistakes)),
        "u" => {
            let chosen = rest
                .split([',', ' '])
                .filter(|part| !part.is_empty())
                .map(|part| pick_set(part, sets))
                .collect::<Option<Vec<SetId>>>()?;
            Some(MenuChoice::Start(SessionSource::Sets(chosen)))
        }
        number => pick_set(number, sets).map(|set| MenuChoice::Start(SessionSource::Set(set))),
    }
}

fn pick_set(number: &str, sets: &[(SetId, usize)]) -> Option<SetId> {
    let index = number.trim().parse::<usize>().ok()?.checked_sub(1)?;
    sets.get(index).map(|(id, _)| id.clone())
}

fn parse_answer_input(line: &str) -> Option<AnswerInput> {
    match line.trim() {
        "edit" => Some(AnswerInput::Edit),
        "abort" => Some(AnswerInput::Abort),
        letters => AnswerSet::parse_letters(letters)
            .ok()
            .filter(|set| !set.is_empty())
            .map(AnswerInput::Letters),
    }
}
