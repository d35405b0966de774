pub mod resume;

pub use resume::{Feedback, FeedbackState, ResumeRecord};
