use teloxide::{
    prelude::*,
    types::{KeyboardButton, KeyboardMarkup, KeyboardRemove},
};

use super::{mount_directory, Backend, HandlerResult, State, TriviaDialogue};
use crate::trivia::{
    categories::CategoryDirectory,
    form::{QuestionDraft, DIFFICULTIES},
    CategoryChoice,
};

const ADD_FAILED: &str = "Unable to add question. Please try your request again.";

pub(super) async fn add(
    bot: Bot,
    dialogue: TriviaDialogue,
    backend: Backend,
    msg: Message,
) -> HandlerResult {
    let directory = mount_directory(&bot, msg.chat.id, backend.as_ref()).await?;

    bot.send_message(
        msg.chat.id,
        "Add a new trivia question. What is the question? (/cancel to stop)",
    )
    .reply_markup(KeyboardRemove::new())
    .await?;

    dialogue
        .update(State::ReceiveQuestionText { directory })
        .await?;
    Ok(())
}

pub(super) async fn receive_question_text(
    bot: Bot,
    dialogue: TriviaDialogue,
    directory: CategoryDirectory,
    msg: Message,
) -> HandlerResult {
    let Some(text) = msg.text().filter(|text| !text.trim().is_empty()) else {
        bot.send_message(msg.chat.id, "Please send the question as text.")
            .await?;
        return Ok(());
    };

    let draft = QuestionDraft {
        question: text.trim().to_string(),
        category: directory.first_id().unwrap_or(QuestionDraft::default().category),
        ..QuestionDraft::default()
    };
    bot.send_message(msg.chat.id, "What is the answer?")
        .await?;

    dialogue
        .update(State::ReceiveAnswer { directory, draft })
        .await?;
    Ok(())
}

pub(super) async fn receive_answer(
    bot: Bot,
    dialogue: TriviaDialogue,
    (directory, mut draft): (CategoryDirectory, QuestionDraft),
    msg: Message,
) -> HandlerResult {
    let Some(text) = msg.text().filter(|text| !text.trim().is_empty()) else {
        bot.send_message(msg.chat.id, "Please send the answer as text.")
            .await?;
        return Ok(());
    };

    draft.answer = text.trim().to_string();
    bot.send_message(msg.chat.id, "How difficult is it?")
        .reply_markup(difficulty_keyboard())
        .await?;

    dialogue
        .update(State::ReceiveDifficulty { directory, draft })
        .await?;
    Ok(())
}

pub(super) async fn receive_difficulty(
    bot: Bot,
    dialogue: TriviaDialogue,
    (directory, mut draft): (CategoryDirectory, QuestionDraft),
    msg: Message,
) -> HandlerResult {
    if let Err(e) = draft.set_difficulty(msg.text().unwrap_or_default()) {
        bot.send_message(msg.chat.id, format!("Sorry, {e}."))
            .reply_markup(difficulty_keyboard())
            .await?;
        return Ok(());
    }

    if directory.is_empty() {
        bot.send_message(msg.chat.id, "Which category? Send its id.")
            .reply_markup(KeyboardRemove::new())
            .await?;
    } else {
        bot.send_message(msg.chat.id, "Which category?")
            .reply_markup(category_keyboard(&directory))
            .await?;
    }

    dialogue
        .update(State::ReceiveCategory { directory, draft })
        .await?;
    Ok(())
}

pub(super) async fn receive_category(
    bot: Bot,
    dialogue: TriviaDialogue,
    backend: Backend,
    (directory, mut draft): (CategoryDirectory, QuestionDraft),
    msg: Message,
) -> HandlerResult {
    match msg.text().and_then(|text| directory.parse_choice(text)) {
        Some(CategoryChoice::Only(id)) => draft.category = id,
        _ => {
            bot.send_message(msg.chat.id, "Please pick one category for the question.")
                .await?;
            return Ok(());
        }
    }

    let question = match draft.clone().finish() {
        Ok(question) => question,
        Err(e) => {
            bot.send_message(msg.chat.id, format!("Sorry, {e}. Use /add to start over."))
                .reply_markup(KeyboardRemove::new())
                .await?;
            dialogue.exit().await?;
            return Ok(());
        }
    };

    if let Err(e) = backend.create_question(&question).await {
        log::warn!("Unable to add question {question:?}: {e}");
        // Keep the draft; choosing the category again retries.
        bot.send_message(msg.chat.id, ADD_FAILED).await?;
        dialogue
            .update(State::ReceiveCategory { directory, draft })
            .await?;
        return Ok(());
    }

    log::info!("Added question {:?}", question.question);
    bot.send_message(msg.chat.id, "The question has been added successfully!")
        .reply_markup(KeyboardRemove::new())
        .await?;
    dialogue.exit().await?;
    Ok(())
}

fn difficulty_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![DIFFICULTIES
        .map(|difficulty| KeyboardButton::new(difficulty.to_string()))
        .collect::<Vec<_>>()])
}

fn category_keyboard(directory: &CategoryDirectory) -> KeyboardMarkup {
    KeyboardMarkup::new(
        directory
            .iter()
            .map(|(_, name)| vec![KeyboardButton::new(name)])
            .collect::<Vec<_>>(),
    )
}
