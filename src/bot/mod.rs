mod browse;
mod create;
mod play;

use std::sync::Arc;

use teloxide::{
    dispatching::{
        dialogue::{self, ErasedStorage},
        UpdateHandler,
    },
    prelude::*,
    types::KeyboardRemove,
    utils::command::BotCommands,
};

use crate::quiz::QuizSession;
use crate::trivia::{
    categories::CategoryDirectory, form::QuestionDraft, listing::ListingQuery, CategoryChoice,
    QuestionId, TriviaBackend,
};
use browse::PreviousListing;

pub type DialogueStorage = Arc<ErasedStorage<State>>;
pub type Backend = Arc<dyn TriviaBackend>;

type TriviaDialogue = Dialogue<State, ErasedStorage<State>>;
type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Where each chat is in the conversation.
#[derive(Clone, Default)]
pub enum State {
    #[default]
    Start,
    Browsing {
        query: ListingQuery,
        directory: CategoryDirectory,
    },
    ChoosingCategory {
        directory: CategoryDirectory,
        session: QuizSession,
    },
    ChoosingRoundLimit {
        category: CategoryChoice,
        session: QuizSession,
    },
    Playing {
        session: QuizSession,
    },
    ConfirmingDelete {
        id: QuestionId,
        previous: PreviousListing,
    },
    ReceiveQuestionText {
        directory: CategoryDirectory,
    },
    ReceiveAnswer {
        directory: CategoryDirectory,
        draft: QuestionDraft,
    },
    ReceiveDifficulty {
        directory: CategoryDirectory,
        draft: QuestionDraft,
    },
    ReceiveCategory {
        directory: CategoryDirectory,
        draft: QuestionDraft,
    },
}

impl State {
    /// The quiz this chat has going, if it is anywhere in the quiz flow.
    fn into_session(self) -> Option<QuizSession> {
        match self {
            State::ChoosingCategory { session, .. }
            | State::ChoosingRoundLimit { session, .. }
            | State::Playing { session } => Some(session),
            _ => None,
        }
    }
}

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "These commands are supported:")]
pub enum Command {
    #[command(description = "say hello.")]
    Start,
    #[command(description = "show this text.")]
    Help,
    #[command(description = "play a quiz.")]
    Play,
    #[command(description = "abandon the current quiz and set up a new one.")]
    Restart,
    #[command(description = "show the categories.")]
    Categories,
    #[command(description = "list questions, optionally at a page: /list 2")]
    List(String),
    #[command(description = "list one category only (name, id or \"all\"): /category Science")]
    Category(String),
    #[command(description = "search the question text: /search title")]
    Search(String),
    #[command(description = "delete a question by id, after confirming: /delete 12")]
    Delete(String),
    #[command(description = "add a new question.")]
    Add,
    #[command(description = "stop what you are doing.")]
    Cancel,
}

pub fn schema() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync + 'static>> {
    use dptree::case;

    let commands = teloxide::filter_command::<Command, _>()
        .branch(case![Command::Start].endpoint(start))
        .branch(case![Command::Help].endpoint(help))
        .branch(case![Command::Play].endpoint(play::play))
        .branch(case![Command::Restart].endpoint(play::restart))
        .branch(case![Command::Categories].endpoint(browse::categories))
        .branch(case![Command::List(page)].endpoint(browse::list))
        .branch(case![Command::Category(category)].endpoint(browse::filter_category))
        .branch(case![Command::Search(term)].endpoint(browse::search))
        .branch(case![Command::Delete(id)].endpoint(browse::delete))
        .branch(case![Command::Add].endpoint(create::add))
        .branch(case![Command::Cancel].endpoint(cancel));

    Update::filter_message()
        .enter_dialogue::<Message, ErasedStorage<State>, State>()
        .branch(commands)
        .branch(
            case![State::ChoosingCategory { directory, session }]
                .endpoint(play::receive_category),
        )
        .branch(
            case![State::ChoosingRoundLimit { category, session }]
                .endpoint(play::receive_round_limit),
        )
        .branch(case![State::Playing { session }].endpoint(play::receive_play_message))
        .branch(
            case![State::ConfirmingDelete { id, previous }]
                .endpoint(browse::receive_delete_confirmation),
        )
        .branch(
            case![State::ReceiveQuestionText { directory }]
                .endpoint(create::receive_question_text),
        )
        .branch(case![State::ReceiveAnswer { directory, draft }].endpoint(create::receive_answer))
        .branch(
            case![State::ReceiveDifficulty { directory, draft }]
                .endpoint(create::receive_difficulty),
        )
        .branch(
            case![State::ReceiveCategory { directory, draft }]
                .endpoint(create::receive_category),
        )
        .branch(dptree::endpoint(idle))
}

/// Creates the per-chat dialogue storage. Nothing outlives the process.
pub fn storage() -> DialogueStorage {
    use dialogue::{InMemStorage, Storage};

    InMemStorage::<State>::new().erase()
}

const GREETING_TEXT: &str = "Hi! I am the trivia bot. I can quiz you, and I can show, search, add and delete trivia questions.";

async fn start(bot: Bot, dialogue: TriviaDialogue, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, GREETING_TEXT).await?;
    bot.send_message(msg.chat.id, Command::descriptions().to_string())
        .reply_markup(KeyboardRemove::new())
        .await?;

    dialogue.update(State::Start).await?;
    Ok(())
}

async fn help(bot: Bot, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, Command::descriptions().to_string())
        .await?;
    Ok(())
}

async fn cancel(bot: Bot, dialogue: TriviaDialogue, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, "Cancelled.")
        .reply_markup(KeyboardRemove::new())
        .await?;
    dialogue.exit().await?;
    Ok(())
}

async fn idle(bot: Bot, msg: Message) -> HandlerResult {
    bot.send_message(
        msg.chat.id,
        format!(
            "I did not understand that.\n\n{}",
            Command::descriptions()
        ),
    )
    .await?;
    Ok(())
}

const LOAD_CATEGORIES_FAILED: &str = "Unable to load categories. Please try your request again.";

/// Loads the categories for a view that is being opened. A failure is
/// reported to the user and yields an empty directory, which still allows
/// "all categories".
async fn mount_directory(
    bot: &Bot,
    chat_id: ChatId,
    backend: &dyn TriviaBackend,
) -> Result<CategoryDirectory, teloxide::RequestError> {
    let mut directory = CategoryDirectory::default();
    if directory.load(backend).await.is_err() {
        bot.send_message(chat_id, LOAD_CATEGORIES_FAILED).await?;
    }
    Ok(directory)
}
