//! Response normalizer — strips channel markers from raw model output.
//!
//! Harmony-format models (gpt-oss) emit analysis and final channels inline,
//! e.g. `<|channel|>analysis<|message|>…<|end|><|start|>assistant<|channel|>final<|message|>Hi`.
//! Only the text after the last final-channel marker is meant for the user.

/// Opens the user-facing answer.
const FINAL_MARKER: &str = "<|channel|>final<|message|>";
/// Opens any message body; used when no final channel is present.
const MESSAGE_MARKER: &str = "<|message|>";

/// Extract the user-facing answer from `raw`.
///
/// Text after the last final-channel marker wins, then text after the last
/// generic message marker, otherwise the whole input. The result is trimmed.
pub fn normalize(raw: &str) -> String {
    let answer = raw
        .rsplit_once(FINAL_MARKER)
        .or_else(|| raw.rsplit_once(MESSAGE_MARKER))
        .map_or(raw, |(_, tail)| tail);
    answer.trim().to_string()
}
