//! Local SQLite replica store.

pub mod error;
pub mod library;
pub mod repository;
pub mod schema;
pub mod screening;

pub use error::DbError;
pub use library::{
    AnswerRow, ExerciseRow, LocalExercise, MaterialRow, QuestionRow, QuestionnaireRow,
};
pub use repository::{FileOwner, LocalFile, NewFile, SqliteRepository, SyncRun};
pub use screening::ScreeningSubtree;
