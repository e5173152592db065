use medrag_core::config::GenerationSettings;

/// Instructions for a clinical diabetes nurse answering from retrieved text.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    pub language: String,
    pub max_chars: usize,
    pub refusal_message: String,
}

impl PromptTemplate {
    pub fn from_settings(settings: &GenerationSettings) -> Self {
        Self {
            language: settings.language.clone(),
            max_chars: settings.max_chars,
            refusal_message: settings.refusal_message.clone(),
        }
    }

    pub fn render(&self, context: &str, question: &str) -> String {
        format!(
            "任務:\n\
             1. 你是一位在台灣的糖尿病領域的專業護理師，需要以專業且嚴謹的態度回答病患的問題。\n\
             2. 請仔細分析下方的「相關文本」，並按照以下步驟回答：\n\
             \x20  a. 從「相關文本」中提取可靠且相關的醫療資訊\n\
             \x20  b. 確保所提供的每一項建議都有文獻依據，並引用「相關文本」\n\
             \x20  c. 使用準確的醫療術語，並提供清晰的解釋\n\
             3. 回答要求：\n\
             \x20  - 字數限制：最多{max_chars}字\n\
             \x20  - 使用{language}\n\
             \x20  - 純文字格式\n\
             4. 回答限制：\n\
             \x20  - 如果相關文本中沒有足夠的專業依據，必須明確告知：「{refusal}」\n\
             \x20  - 不進行推測性回答\n\
             \x20  - 對於可能影響病患安全的建議，必須提醒諮詢醫療人員\n\
             ------\n\
             「相關文本」：\n\
             {context}\n\
             ------\n\
             「病患的提問」：\n\
             {question}\n",
            max_chars = self.max_chars,
            language = self.language,
            refusal = self.refusal_message,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_settings_context_and_question() {
        let t = PromptTemplate::from_settings(&GenerationSettings::default());
        let p = t.render("一份水果約一個拳頭", "一份水果是多少？");
        assert!(p.contains("最多60字"));
        assert!(p.contains("使用繁體中文"));
        assert!(p.contains("建議您諮詢主治醫師"));
        assert!(p.contains("「相關文本」：\n一份水果約一個拳頭\n------"));
        assert!(p.ends_with("「病患的提問」：\n一份水果是多少？\n"));
        assert!(p.contains("\n   a. 從"));
    }
}
