use serde::Deserialize;

#[derive(Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Default, Deserialize)]
struct Delta {
    content: Option<String>,
}

/// 增量解析 server-sent events，提取 `choices[].delta.content`
///
/// 字节块可以在任意位置切分（包括 UTF-8 多字节字符中间），
/// 未完成的行保留到下一次 `push`。
#[derive(Debug, Default)]
pub struct DeltaDecoder {
    pending: Vec<u8>,
    finished: bool,
}

impl DeltaDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 是否已收到 `data: [DONE]`
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn push(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);

        let mut text = String::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            if self.finished {
                continue;
            }
            self.decode_line(&String::from_utf8_lossy(&line), &mut text);
        }
        text
    }

    fn decode_line(&mut self, line: &str, out: &mut String) {
        let Some(data) = line.trim().strip_prefix("data:") else {
            return;
        };
        let data = data.trim();
        if data == "[DONE]" {
            self.finished = true;
            return;
        }

        match serde_json::from_str::<ChatChunk>(data) {
            Ok(chunk) => {
                for choice in chunk.choices {
                    if let Some(content) = choice.delta.content {
                        out.push_str(&content);
                    }
                }
            }
            Err(e) => tracing::debug!("Skipping undecodable event: {}", e),
        }
    }
}
