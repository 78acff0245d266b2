// 文本生成
// 调用 OpenAI 兼容接口并以纯文本流转发增量内容

mod client;
mod decoder;

pub use client::{CompletionRequest, TextGenerator};
pub use decoder::DeltaDecoder;
