mod event;

pub use event::Comment;
pub use event::Event;
pub use event::Submission;
