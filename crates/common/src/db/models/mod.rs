//! SeaORM entity models
//!
//! Database entities for CardForge

mod card;
mod deck;
mod generation_job;
mod srs_state;
mod suggestion;
mod upload;

pub use upload::{
    Entity as UploadEntity,
    Model as Upload,
    ActiveModel as UploadActiveModel,
    Column as UploadColumn,
    UploadStatus,
};

pub use generation_job::{
    Entity as GenerationJobEntity,
    Model as GenerationJob,
    ActiveModel as GenerationJobActiveModel,
    Column as GenerationJobColumn,
    JobStatus,
};

pub use deck::{
    Entity as DeckEntity,
    Model as Deck,
    ActiveModel as DeckActiveModel,
    Column as DeckColumn,
};

pub use card::{
    Entity as CardEntity,
    Model as Card,
    ActiveModel as CardActiveModel,
    Column as CardColumn,
    CardSource,
    CardType,
};

pub use suggestion::{
    Entity as SuggestionEntity,
    Model as Suggestion,
    ActiveModel as SuggestionActiveModel,
    Column as SuggestionColumn,
    SuggestionStatus,
};

pub use srs_state::{
    Entity as SrsStateEntity,
    Model as SrsState,
    ActiveModel as SrsStateActiveModel,
    Column as SrsStateColumn,
    DEFAULT_EASE,
};
