//! Services layer - Business logic
//!
//! Services sit between the web handlers and the repositories. They apply
//! the form rules, resolve page windows and map storage failures into
//! per-service error types.

pub mod comment;
pub mod forms;
pub mod password;
pub mod profile;
pub mod question;
pub mod tag;
pub mod user;

pub use comment::{CommentService, CommentServiceError};
pub use forms::FormErrors;
pub use password::{hash_password, verify_password};
pub use profile::ProfileService;
pub use question::{QuestionService, QuestionServiceError};
pub use tag::TagService;
pub use user::{SettingsOutcome, UserService, UserServiceError};
