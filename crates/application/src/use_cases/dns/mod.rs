mod resolve_aaaa;

pub use resolve_aaaa::{AnswerSource, Resolution, ResolveAaaaUseCase};
