use teloxide::{
    prelude::*,
    types::{KeyboardButton, KeyboardMarkup, KeyboardRemove},
};

use super::{mount_directory, Backend, HandlerResult, State, TriviaDialogue};
use crate::quiz::{GameConfig, Phase, QuizSession, Resolution, RoundLimit, ScoreSummary, Step};
use crate::trivia::{categories::CategoryDirectory, CategoryChoice};

const ANY_CATEGORY_BUTTON: &str = "all";
const NEXT_QUESTION: &str = "Next question";
const PLAY_AGAIN: &str = "Play again?";
const LOAD_QUESTION_FAILED: &str = "Unable to load question. Please try your request again.";

pub(super) async fn play(
    bot: Bot,
    dialogue: TriviaDialogue,
    backend: Backend,
    state: State,
    msg: Message,
) -> HandlerResult {
    let session = state.into_session().unwrap_or_else(QuizSession::new);
    begin_setup(bot, dialogue, backend, session, msg.chat.id).await
}

pub(super) async fn restart(
    bot: Bot,
    dialogue: TriviaDialogue,
    backend: Backend,
    state: State,
    msg: Message,
) -> HandlerResult {
    match state.into_session() {
        Some(session) => begin_setup(bot, dialogue, backend, session, msg.chat.id).await,
        None => {
            bot.send_message(msg.chat.id, "There is no quiz running. Use /play to start one.")
                .await?;
            Ok(())
        }
    }
}

/// Throws away whatever game `session` held and opens the setup screen.
async fn begin_setup(
    bot: Bot,
    dialogue: TriviaDialogue,
    backend: Backend,
    mut session: QuizSession,
    chat_id: ChatId,
) -> HandlerResult {
    session.restart();
    let directory = mount_directory(&bot, chat_id, backend.as_ref()).await?;

    bot.send_message(chat_id, "Choose a category:")
        .reply_markup(category_keyboard(&directory))
        .await?;

    dialogue
        .update(State::ChoosingCategory { directory, session })
        .await?;
    Ok(())
}

pub(super) async fn receive_category(
    bot: Bot,
    dialogue: TriviaDialogue,
    (directory, session): (CategoryDirectory, QuizSession),
    msg: Message,
) -> HandlerResult {
    let Some(category) = msg.text().and_then(|text| directory.parse_choice(text)) else {
        bot.send_message(msg.chat.id, "Please pick one of the categories.")
            .reply_markup(category_keyboard(&directory))
            .await?;
        return Ok(());
    };

    bot.send_message(
        msg.chat.id,
        format!(
            "Playing {}. How many questions per play?",
            directory.label(category)
        ),
    )
    .reply_markup(round_limit_keyboard())
    .await?;

    dialogue
        .update(State::ChoosingRoundLimit { category, session })
        .await?;
    Ok(())
}

pub(super) async fn receive_round_limit(
    bot: Bot,
    dialogue: TriviaDialogue,
    backend: Backend,
    (category, mut session): (CategoryChoice, QuizSession),
    msg: Message,
) -> HandlerResult {
    let Some(questions_per_round) = msg.text().and_then(|text| text.parse::<RoundLimit>().ok())
    else {
        bot.send_message(
            msg.chat.id,
            "Please choose a number of questions, or \"unlimited\".",
        )
        .reply_markup(round_limit_keyboard())
        .await?;
        return Ok(());
    };

    let request = session.start(GameConfig {
        category,
        questions_per_round,
    })?;
    let resolution = session.drive(request, backend.as_ref()).await;

    if let Resolution::Failed(_) = resolution {
        // Still on the setup screen; sending the choice again retries.
        bot.send_message(msg.chat.id, LOAD_QUESTION_FAILED).await?;
        dialogue
            .update(State::ChoosingRoundLimit { category, session })
            .await?;
        return Ok(());
    }

    report(&bot, msg.chat.id, &session, &resolution).await?;
    dialogue.update(State::Playing { session }).await?;
    Ok(())
}

/// What a message sent during a game asks for, given where the game is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlayMove<'a> {
    Grade(&'a str),
    /// A button tap left over from an earlier screen. Never graded.
    StrayTap,
    Advance,
    RemindNext,
    Setup,
    RemindPlayAgain,
}

fn next_move<'a>(phase: &Phase, text: &'a str) -> PlayMove<'a> {
    match phase {
        Phase::AwaitingGuess { .. } if text == NEXT_QUESTION || text == PLAY_AGAIN => {
            PlayMove::StrayTap
        }
        Phase::AwaitingGuess { .. } => PlayMove::Grade(text),
        Phase::ShowingResult { .. } if text == NEXT_QUESTION => PlayMove::Advance,
        Phase::ShowingResult { .. } => PlayMove::RemindNext,
        Phase::GameOver { .. } if text == PLAY_AGAIN => PlayMove::Setup,
        Phase::GameOver { .. } => PlayMove::RemindPlayAgain,
        Phase::PrePlay => PlayMove::Setup,
    }
}

pub(super) async fn receive_play_message(
    bot: Bot,
    dialogue: TriviaDialogue,
    backend: Backend,
    mut session: QuizSession,
    msg: Message,
) -> HandlerResult {
    let Some(text) = msg.text() else {
        bot.send_message(msg.chat.id, "Please answer with text.")
            .await?;
        return Ok(());
    };

    match next_move(session.phase(), text) {
        PlayMove::Grade(guess) => {
            session.set_guess(guess)?;
            session.submit_pending_guess()?;
            bot.send_message(msg.chat.id, verdict_text(session.phase()))
                .reply_markup(single_button(NEXT_QUESTION))
                .await?;
        }
        PlayMove::StrayTap => {
            bot.send_message(msg.chat.id, "Type your answer to the question above.")
                .reply_markup(KeyboardRemove::new())
                .await?;
            return Ok(());
        }
        PlayMove::Advance => match session.advance()? {
            Step::Finished(summary) => {
                send_final_score(&bot, msg.chat.id, summary).await?;
            }
            Step::Fetch(request) => {
                let resolution = session.drive(request, backend.as_ref()).await;
                report(&bot, msg.chat.id, &session, &resolution).await?;
            }
        },
        PlayMove::RemindNext => {
            bot.send_message(msg.chat.id, format!("Tap \"{NEXT_QUESTION}\" to continue."))
                .reply_markup(single_button(NEXT_QUESTION))
                .await?;
            return Ok(());
        }
        PlayMove::Setup => {
            return begin_setup(bot, dialogue, backend, session, msg.chat.id).await;
        }
        PlayMove::RemindPlayAgain => {
            bot.send_message(
                msg.chat.id,
                format!("The game is over. Tap \"{PLAY_AGAIN}\" or send /play."),
            )
            .reply_markup(single_button(PLAY_AGAIN))
            .await?;
            return Ok(());
        }
    }

    dialogue.update(State::Playing { session }).await?;
    Ok(())
}

/// Tells the user what a finished question request led to.
async fn report(
    bot: &Bot,
    chat_id: ChatId,
    session: &QuizSession,
    resolution: &Resolution,
) -> Result<(), teloxide::RequestError> {
    match resolution {
        Resolution::Asked => {
            if let Some(question) = session.current_question() {
                bot.send_message(
                    chat_id,
                    format!(
                        "{}:\n{}",
                        question_heading(session),
                        question.question
                    ),
                )
                .reply_markup(KeyboardRemove::new())
                .await?;
            }
        }
        Resolution::Finished(summary) => {
            if session.is_exhausted() {
                bot.send_message(chat_id, "There are no more questions left.")
                    .await?;
            }
            send_final_score(bot, chat_id, *summary).await?;
        }
        Resolution::Failed(_) => {
            bot.send_message(chat_id, LOAD_QUESTION_FAILED)
                .reply_markup(single_button(NEXT_QUESTION))
                .await?;
        }
        Resolution::Stale => log::debug!("Ignoring stale quiz response for chat {chat_id}"),
    }
    Ok(())
}

async fn send_final_score(
    bot: &Bot,
    chat_id: ChatId,
    summary: ScoreSummary,
) -> Result<(), teloxide::RequestError> {
    bot.send_message(chat_id, format!("Your final score is: {summary}"))
        .reply_markup(single_button(PLAY_AGAIN))
        .await?;
    Ok(())
}

fn question_heading(session: &QuizSession) -> String {
    let number = session.asked_question_ids().len() + 1;
    match session.config().questions_per_round {
        RoundLimit::Limited(limit) => format!("Question {number} of {limit}"),
        RoundLimit::Unlimited => format!("Question {number}"),
    }
}

fn verdict_text(phase: &Phase) -> String {
    match phase {
        Phase::ShowingResult {
            question, correct, ..
        } => format!(
            "{}\nThe answer is: {}",
            if *correct {
                "You were correct!"
            } else {
                "You were incorrect."
            },
            question.answer
        ),
        _ => String::new(),
    }
}

fn single_button(text: &str) -> KeyboardMarkup {
    KeyboardMarkup::new(vec![vec![KeyboardButton::new(text)]])
}

fn category_keyboard(directory: &CategoryDirectory) -> KeyboardMarkup {
    let mut rows: Vec<Vec<KeyboardButton>> = directory
        .iter()
        .map(|(_, name)| vec![KeyboardButton::new(name)])
        .collect();
    rows.push(vec![KeyboardButton::new(ANY_CATEGORY_BUTTON)]);
    KeyboardMarkup::new(rows)
}

fn round_limit_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![RoundLimit::CHOICES
        .iter()
        .map(|choice| KeyboardButton::new(*choice))
        .collect::<Vec<_>>()])
}
