pub mod dns;

pub use dns::{AnswerSource, Resolution, ResolveAaaaUseCase};
