//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles the queries for one aggregate.

pub mod comment;
pub mod profile;
pub mod question;
pub mod session;
pub mod tag;
pub mod user;

#[cfg(test)]
pub(crate) mod test_support;

pub use comment::{CommentRepository, SqlxCommentRepository};
pub use profile::{ProfileRepository, SqlxProfileRepository};
pub use question::{QuestionRepository, SqlxQuestionRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use tag::{SqlxTagRepository, TagRepository};
pub use user::{SqlxUserRepository, UserRepository};
