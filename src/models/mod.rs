//! Data models
//!
//! Database entities (User, Profile, Session, Question, Tag, Comment), the
//! read models rendered by the templates, and the pager types.

mod comment;
mod page;
mod profile;
mod question;
mod session;
mod tag;
mod user;

pub use comment::{Comment, CommentView, CreateCommentInput};
pub use page::{paginate, parse_page_number, Page, PageWindow};
pub use profile::{avatar_url, Author, Profile};
pub use question::{CreateQuestionInput, Question, QuestionCard};
pub use session::Session;
pub use tag::{Tag, TagWithCount};
pub use user::{CreateUserInput, CurrentUser, SettingsChange, User};
