use teloxide::{
    prelude::*,
    types::{KeyboardButton, KeyboardMarkup, KeyboardRemove},
};

use super::{mount_directory, Backend, HandlerResult, State, TriviaDialogue};
use crate::trivia::{
    categories::CategoryDirectory,
    listing::{page_count, ListingQuery},
    CategoryChoice, QuestionId, QuestionPage,
};

const LOAD_QUESTIONS_FAILED: &str = "Unable to load questions. Please try your request again.";
const DELETE_FAILED: &str = "Unable to delete the question. Please try your request again.";
const CONFIRM_DELETE: &str = "Yes, delete it";
const KEEP_QUESTION: &str = "No, keep it";

/// The listing a chat was browsing before it was asked to confirm a delete.
pub type PreviousListing = Option<(ListingQuery, CategoryDirectory)>;

/// The listing this chat is looking at, or a fresh one (with freshly loaded
/// categories) when it is not browsing yet.
async fn open_listing(
    bot: &Bot,
    chat_id: ChatId,
    backend: &Backend,
    state: State,
) -> Result<(ListingQuery, CategoryDirectory), teloxide::RequestError> {
    match state {
        State::Browsing { query, directory } => Ok((query, directory)),
        _ => {
            let directory = mount_directory(bot, chat_id, backend.as_ref()).await?;
            Ok((ListingQuery::default(), directory))
        }
    }
}

async fn show_listing(
    bot: &Bot,
    dialogue: &TriviaDialogue,
    backend: &Backend,
    mut query: ListingQuery,
    directory: CategoryDirectory,
) -> HandlerResult {
    let chat_id = dialogue.chat_id();
    let page = match backend.questions(&query).await {
        Ok(page) => page,
        Err(e) => {
            log::warn!("Unable to load questions for {query:?}: {e}");
            bot.send_message(chat_id, LOAD_QUESTIONS_FAILED).await?;
            return Ok(());
        }
    };
    if let Some(served) = page.page {
        query.page = served;
    }

    bot.send_message(chat_id, render_listing(&page, &query, &directory))
        .await?;
    dialogue
        .update(State::Browsing { query, directory })
        .await?;
    Ok(())
}

pub(super) async fn categories(bot: Bot, backend: Backend, msg: Message) -> HandlerResult {
    let directory = mount_directory(&bot, msg.chat.id, backend.as_ref()).await?;
    if directory.is_empty() {
        return Ok(());
    }

    let lines: Vec<String> = directory
        .iter()
        .map(|(id, name)| format!("{id}. {name}"))
        .collect();
    bot.send_message(msg.chat.id, format!("Categories:\n{}", lines.join("\n")))
        .await?;
    Ok(())
}

pub(super) async fn list(
    bot: Bot,
    dialogue: TriviaDialogue,
    backend: Backend,
    state: State,
    page: String,
    msg: Message,
) -> HandlerResult {
    let page = page.trim();
    let requested = if page.is_empty() {
        None
    } else {
        match page.parse::<u64>() {
            Ok(page) => Some(page),
            Err(_) => {
                bot.send_message(msg.chat.id, "Usage: /list or /list <page number>")
                    .await?;
                return Ok(());
            }
        }
    };

    let (mut query, directory) = open_listing(&bot, msg.chat.id, &backend, state).await?;
    if let Some(page) = requested {
        query.go_to(page);
    }
    show_listing(&bot, &dialogue, &backend, query, directory).await
}

pub(super) async fn filter_category(
    bot: Bot,
    dialogue: TriviaDialogue,
    backend: Backend,
    state: State,
    category: String,
    msg: Message,
) -> HandlerResult {
    let (mut query, directory) = open_listing(&bot, msg.chat.id, &backend, state).await?;
    let category = match directory.parse_choice(&category) {
        Some(CategoryChoice::Any) => None,
        Some(CategoryChoice::Only(id)) => Some(id),
        None => {
            bot.send_message(
                msg.chat.id,
                "Unknown category. Use /categories to see them, or /category all.",
            )
            .await?;
            return Ok(());
        }
    };

    query.select_category(category);
    show_listing(&bot, &dialogue, &backend, query, directory).await
}

pub(super) async fn search(
    bot: Bot,
    dialogue: TriviaDialogue,
    backend: Backend,
    state: State,
    term: String,
    msg: Message,
) -> HandlerResult {
    let (mut query, directory) = open_listing(&bot, msg.chat.id, &backend, state).await?;
    query.search(&term);
    show_listing(&bot, &dialogue, &backend, query, directory).await
}

pub(super) async fn delete(
    bot: Bot,
    dialogue: TriviaDialogue,
    state: State,
    id: String,
    msg: Message,
) -> HandlerResult {
    let Ok(id) = id.trim().parse::<QuestionId>() else {
        bot.send_message(msg.chat.id, "Usage: /delete <question id>")
            .await?;
        return Ok(());
    };

    let previous = match state {
        State::Browsing { query, directory } => Some((query, directory)),
        State::ConfirmingDelete { previous, .. } => previous,
        _ => None,
    };

    bot.send_message(
        msg.chat.id,
        format!("Are you sure you want to delete question #{id}?"),
    )
    .reply_markup(confirm_keyboard())
    .await?;
    dialogue
        .update(State::ConfirmingDelete { id, previous })
        .await?;
    Ok(())
}

pub(super) async fn receive_delete_confirmation(
    bot: Bot,
    dialogue: TriviaDialogue,
    backend: Backend,
    (id, previous): (QuestionId, PreviousListing),
    msg: Message,
) -> HandlerResult {
    match msg.text().and_then(parse_confirmation) {
        None => {
            bot.send_message(msg.chat.id, format!("Delete question #{id}? Please answer yes or no."))
                .reply_markup(confirm_keyboard())
                .await?;
        }
        Some(false) => {
            bot.send_message(msg.chat.id, format!("Question #{id} was kept."))
                .reply_markup(KeyboardRemove::new())
                .await?;
            dialogue.update(state_after_delete_prompt(previous)).await?;
        }
        Some(true) => {
            if let Err(e) = backend.delete_question(id).await {
                log::warn!("Unable to delete question {id}: {e}");
                // Still confirming; answering yes again retries.
                bot.send_message(msg.chat.id, DELETE_FAILED)
                    .reply_markup(confirm_keyboard())
                    .await?;
                return Ok(());
            }

            log::info!("Deleted question {id}");
            bot.send_message(msg.chat.id, format!("Question {id} deleted."))
                .reply_markup(KeyboardRemove::new())
                .await?;
            match previous {
                // Refresh the page the user was looking at.
                Some((query, directory)) => {
                    show_listing(&bot, &dialogue, &backend, query, directory).await?
                }
                None => dialogue.exit().await?,
            }
        }
    }
    Ok(())
}

/// `Some(true)` to delete, `Some(false)` to keep, `None` if unclear.
fn parse_confirmation(text: &str) -> Option<bool> {
    let text = text.trim();
    if text == CONFIRM_DELETE || ["yes", "y"].iter().any(|w| w.eq_ignore_ascii_case(text)) {
        Some(true)
    } else if text == KEEP_QUESTION || ["no", "n"].iter().any(|w| w.eq_ignore_ascii_case(text)) {
        Some(false)
    } else {
        None
    }
}

fn state_after_delete_prompt(previous: PreviousListing) -> State {
    match previous {
        Some((query, directory)) => State::Browsing { query, directory },
        None => State::Start,
    }
}

fn confirm_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![vec![
        KeyboardButton::new(CONFIRM_DELETE),
        KeyboardButton::new(KEEP_QUESTION),
    ]])
}

fn render_listing(
    page: &QuestionPage,
    query: &ListingQuery,
    directory: &CategoryDirectory,
) -> String {
    let mut filters = vec![match query.category {
        Some(id) => format!("category: {}", directory.label(CategoryChoice::Only(id))),
        None => "all categories".to_string(),
    }];
    if let Some(term) = &query.search_term {
        filters.push(format!("search: \"{term}\""));
    }
    let header = format!("Questions ({})", filters.join(", "));

    if page.questions.is_empty() {
        return format!("{header}\n\nNo questions found.");
    }

    let entries: Vec<String> = page
        .questions
        .iter()
        .map(|question| {
            format!(
                "#{} · {} · difficulty {}\n{}\nAnswer: {}",
                question.id,
                directory.name(question.category).unwrap_or("unknown"),
                question.difficulty,
                question.question,
                question.answer
            )
        })
        .collect();

    format!(
        "{header}\n\n{}\n\nPage {} of {} · {} question(s) in total",
        entries.join("\n\n"),
        query.page,
        page_count(page.total_questions).max(1),
        page.total_questions
    )
}
