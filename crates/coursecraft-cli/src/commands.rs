//! Parsing of the interactive prompt commands.

use coursecraft_client::Action;
use coursecraft_core::{Answer, Navigator, Screen};

/// Help text printed by `help` and at startup.
pub const HELP: &str = "\
Commands:
  create <1-3> <subject>   Create a course with 1 to 3 lessons
  history                  Show your previous courses
  open <n>                 Open course <n> from the history
  lesson <n>               Open lesson <n> of the current course
  next | prev              Next or previous lesson or question
  course                   Back to the course overview
  home                     Back to the home screen
  assess                   Take the assessment for the current course
  answer <n|true|false>    Answer the current question
  restart                  Restart the assessment
  progress                 Fetch the server's current progress
  cancel                   Stop following course creation
  help                     Show this help
  quit                     Exit";

/// A parsed prompt line.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Blank line.
    Empty,
    /// Print the help text.
    Help,
    /// Fetch one progress snapshot over HTTP.
    Progress,
    /// Post an action to the app.
    App(Action),
}

/// Parses one prompt line against the current navigation state.
///
/// `next` and `prev` depend on the screen: they move between lessons on the
/// lesson screen and between questions on the assessment screen. `next` on
/// the last lesson completes the course.
///
/// # Errors
///
/// Returns an error with a usage hint for unknown commands or bad arguments.
pub fn parse_command(line: &str, navigator: &Navigator) -> anyhow::Result<Command> {
    let line = line.trim();
    let (word, rest) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(w, r)| (w, r.trim()));

    let action = match word.to_ascii_lowercase().as_str() {
        "" => return Ok(Command::Empty),
        "help" | "?" => return Ok(Command::Help),
        "progress" => return Ok(Command::Progress),
        "create" => parse_create(rest)?,
        "history" => Action::LoadHistory,
        "open" => Action::OpenCourse(parse_position(rest, "open <n>")?),
        "lesson" => Action::SelectLesson(parse_position(rest, "lesson <n>")?),
        "next" => match navigator.screen() {
            Screen::Lesson => Action::NextLesson,
            Screen::Assessment => Action::NextQuestion,
            Screen::Home | Screen::CourseOverview => {
                anyhow::bail!("Open a lesson first, e.g. 'lesson 1'")
            }
        },
        "prev" | "previous" => match navigator.screen() {
            Screen::Lesson => Action::PreviousLesson,
            Screen::Assessment => Action::PreviousQuestion,
            Screen::Home | Screen::CourseOverview => {
                anyhow::bail!("Open a lesson first, e.g. 'lesson 1'")
            }
        },
        "course" | "back" => Action::BackToCourse,
        "home" => Action::BackToHome,
        "assess" | "assessment" => Action::StartAssessment,
        "answer" => Action::Answer(parse_answer(rest)?),
        "restart" => Action::RestartAssessment,
        "cancel" => Action::Cancel,
        "quit" | "exit" => Action::Quit,
        other => anyhow::bail!("Unknown command '{other}'. Type 'help' for a list of commands"),
    };

    Ok(Command::App(action))
}

/// Parses `<n> <subject>`. The subject may be empty; the workflow rejects
/// it with its own message.
fn parse_create(rest: &str) -> anyhow::Result<Action> {
    let (count, subject) = rest
        .split_once(char::is_whitespace)
        .map_or((rest, ""), |(c, s)| (c, s.trim()));
    let num_lessons = count
        .parse::<u8>()
        .map_err(|_| anyhow::anyhow!("Usage: create <1-3> <subject>"))?;

    Ok(Action::Submit {
        subject: subject.to_string(),
        num_lessons,
    })
}

/// Parses a 1-based position into a 0-based index.
fn parse_position(rest: &str, usage: &str) -> anyhow::Result<usize> {
    match rest.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n - 1),
        _ => anyhow::bail!("Usage: {usage} (counting from 1)"),
    }
}

/// Parses `true`/`false` or a 1-based option number.
fn parse_answer(rest: &str) -> anyhow::Result<Answer> {
    match rest.to_ascii_lowercase().as_str() {
        "true" | "t" => Ok(Answer::Bool(true)),
        "false" | "f" => Ok(Answer::Bool(false)),
        other => parse_position(other, "answer <option number|true|false>").map(Answer::Choice),
    }
}

// ============================================================================
// Tests
// ============================================================================
