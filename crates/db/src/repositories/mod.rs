//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod chapter_repo;
pub mod downgrade_repo;
pub mod generation_job_repo;
pub mod incorrect_answer_repo;
pub mod note_repo;
pub mod notebook_repo;
pub mod question_bank_repo;
pub mod question_repo;
pub mod share_link_repo;
pub mod user_repo;
pub mod user_response_repo;

pub use chapter_repo::ChapterRepo;
pub use downgrade_repo::DowngradeRepo;
pub use generation_job_repo::GenerationJobRepo;
pub use incorrect_answer_repo::IncorrectAnswerRepo;
pub use note_repo::NoteRepo;
pub use notebook_repo::NotebookRepo;
pub use question_bank_repo::QuestionBankRepo;
pub use question_repo::QuestionRepo;
pub use share_link_repo::ShareLinkRepo;
pub use user_repo::UserRepo;
pub use user_response_repo::UserResponseRepo;
