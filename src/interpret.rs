//! Interpreter for free-text replies from the chat-completion service.
//!
//! The model is asked for a four-field JSON object but routinely answers with
//! fenced JSON, Markdown headings, or plain prose, in Chinese or English. The
//! strategies below run in a fixed order and the result always carries text
//! in every field; nothing here can fail.

use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Analysis {
    pub pattern: String,
    pub strengths: String,
    pub weaknesses: String,
    pub suggestions: String,
}

const FIELDS: [&str; 4] = ["pattern", "strengths", "weaknesses", "suggestions"];

/// Heading variants seen in real replies, Chinese first.
const FIELD_LABELS: [(&str, &[&str]); 4] = [
    (
        "pattern",
        &[
            "学习模式分析",
            "学习模式",
            "learning pattern analysis",
            "learning pattern",
            "pattern",
        ],
    ),
    ("strengths", &["优势领域", "优势", "strengths"]),
    (
        "weaknesses",
        &["待提升领域", "薄弱环节", "不足", "weaknesses"],
    ),
    ("suggestions", &["学习建议", "建议", "suggestions"]),
];

const PATTERN_KEYWORDS: [&str; 4] = ["学习模式", "学习行为", "learning pattern", "learning behavior"];

const MIN_PARAGRAPH_CHARS: usize = 20;

fn placeholder(field: &str) -> &'static str {
    match field {
        "pattern" => "Not enough data to characterize a learning pattern yet.",
        "strengths" => "No clear strengths identified yet.",
        "weaknesses" => "No clear weak areas identified yet.",
        _ => "Keep practicing regularly to generate personalized suggestions.",
    }
}

pub fn interpret(raw: &str) -> Analysis {
    let text = strip_fences(raw);

    let mut fields: Vec<(&str, Option<String>)> =
        FIELDS.iter().map(|f| (*f, None)).collect();

    // Strict JSON first. When the reply parses as an object, whatever it did
    // not fill is considered absent; prose strategies would only pick the
    // JSON text itself back up.
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str(&text) {
        for (field, slot) in fields.iter_mut() {
            if let Some(value) = map.get(*field).and_then(|v| v.as_str()) {
                let value = value.trim();
                if !value.is_empty() {
                    *slot = Some(value.to_string());
                }
            }
        }
    } else {
        let sections = labeled_sections(&text);
        for (field, slot) in fields.iter_mut() {
            if slot.is_none() {
                if let Some(section) = sections.iter().find(|(f, _)| f == field) {
                    *slot = Some(section.1.clone());
                }
            }
        }

        // The remaining strategies only know how to describe a pattern.
        if fields[0].1.is_none() {
            fields[0].1 = keyword_paragraph(&text).or_else(|| long_paragraph(&text));
        }
    }

    let take = |field: &str| {
        fields
            .iter()
            .find(|(f, _)| *f == field)
            .and_then(|(_, v)| v.clone())
            .unwrap_or_else(|| placeholder(field).to_string())
    };

    Analysis {
        pattern: take("pattern"),
        strengths: take("strengths"),
        weaknesses: take("weaknesses"),
        suggestions: take("suggestions"),
    }
}

fn strip_fences(raw: &str) -> String {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim().to_string()
}

/// Every recognized heading with its position; a field's section is the text
/// between its heading and the next recognized heading.
fn labeled_sections(text: &str) -> Vec<(String, String)> {
    struct Heading {
        field: &'static str,
        start: usize,
        content_start: usize,
    }

    let mut headings: Vec<Heading> = Vec::new();
    for (field, labels) in FIELD_LABELS {
        for label in labels {
            let Some(re) = heading_regex(label) else {
                continue;
            };
            for m in re.find_iter(text) {
                headings.push(Heading {
                    field,
                    start: m.start(),
                    content_start: m.end(),
                });
            }
        }
    }
    headings.sort_by_key(|h| h.start);

    let mut sections: Vec<(String, String)> = Vec::new();
    for (i, heading) in headings.iter().enumerate() {
        if sections.iter().any(|(f, _)| f == heading.field) {
            continue;
        }
        let end = headings
            .get(i + 1..)
            .and_then(|rest| rest.iter().find(|h| h.start > heading.content_start))
            .map(|h| h.start)
            .unwrap_or(text.len());
        let body = text[heading.content_start..end].trim();
        if !body.is_empty() {
            sections.push((heading.field.to_string(), body.to_string()));
        }
    }
    sections
}

fn heading_regex(label: &str) -> Option<Regex> {
    let pattern = format!(
        r"(?mi)^[\s#>\-\*\d\.、]*(?:\*\*)?\s*{}\s*(?:\*\*)?\s*[:：]\s*",
        regex::escape(label)
    );
    Regex::new(&pattern).ok()
}

fn keyword_paragraph(text: &str) -> Option<String> {
    paragraphs(text)
        .into_iter()
        .find(|p| {
            let lower = p.to_lowercase();
            PATTERN_KEYWORDS.iter().any(|k| lower.contains(k))
        })
}

fn long_paragraph(text: &str) -> Option<String> {
    paragraphs(text)
        .into_iter()
        .find(|p| p.chars().count() > MIN_PARAGRAPH_CHARS && !looks_like_bare_heading(p))
}

fn paragraphs(text: &str) -> Vec<String> {
    text.split("\n\n")
        .flat_map(|block| block.split('\n'))
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

fn looks_like_bare_heading(paragraph: &str) -> bool {
    let trimmed = paragraph.trim_end();
    (trimmed.ends_with(':') || trimmed.ends_with('：')) && trimmed.chars().count() <= 30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fenced_json_reply_is_parsed() {
        let reply = "```json\n{\"pattern\": \"steady\", \"strengths\": \"loops\", \
                     \"weaknesses\": \"recursion\", \"suggestions\": \"practice\"}\n```";
        let analysis = interpret(reply);
        assert_eq!(analysis.pattern, "steady");
        assert_eq!(analysis.strengths, "loops");
        assert_eq!(analysis.weaknesses, "recursion");
        assert_eq!(analysis.suggestions, "practice");
    }

    #[test]
    fn empty_json_fields_fall_back_to_placeholders() {
        let reply = "```json\n{\"pattern\":\"\",\"strengths\":\"ok\"}\n```";
        let analysis = interpret(reply);
        assert_eq!(analysis.strengths, "ok");
        assert_eq!(analysis.pattern, placeholder("pattern"));
        assert_eq!(analysis.weaknesses, placeholder("weaknesses"));
        assert_eq!(analysis.suggestions, placeholder("suggestions"));
    }

    #[test]
    fn chinese_labeled_sections_are_extracted() {
        let reply = "学习模式分析：稳定的每日练习者。\n\n优势领域：循环与数组。\n\n\
                     待提升领域：递归。\n\n学习建议：每天一道递归题。";
        let analysis = interpret(reply);
        assert_eq!(analysis.pattern, "稳定的每日练习者。");
        assert_eq!(analysis.strengths, "循环与数组。");
        assert_eq!(analysis.weaknesses, "递归。");
        assert_eq!(analysis.suggestions, "每天一道递归题。");
    }

    #[test]
    fn markdown_english_headings_are_extracted() {
        let reply = "## Learning Pattern: works in evening bursts.\n\
                     ## Strengths: string handling.\n\
                     ## Weaknesses: pointer arithmetic.\n\
                     ## Suggestions: review chapter 4.";
        let analysis = interpret(reply);
        assert_eq!(analysis.pattern, "works in evening bursts.");
        assert_eq!(analysis.strengths, "string handling.");
        assert_eq!(analysis.weaknesses, "pointer arithmetic.");
        assert_eq!(analysis.suggestions, "review chapter 4.");
    }

    #[test]
    fn keyword_paragraph_fills_pattern_only() {
        let reply = "短评。\n\n该学生的学习行为显示出持续的晚间练习习惯，正确率稳步提升。";
        let analysis = interpret(reply);
        assert!(analysis.pattern.contains("学习行为"));
        assert_eq!(analysis.strengths, placeholder("strengths"));
    }

    #[test]
    fn long_paragraph_is_last_text_resort() {
        let reply = "hm\n\nThe student shows consistent improvement across all recent exercises.";
        let analysis = interpret(reply);
        assert_eq!(
            analysis.pattern,
            "The student shows consistent improvement across all recent exercises."
        );
    }

    #[test]
    fn garbage_input_yields_all_placeholders() {
        for reply in ["", "   ", "?!", "x:"] {
            let analysis = interpret(reply);
            assert_eq!(analysis.pattern, placeholder("pattern"));
            assert_eq!(analysis.strengths, placeholder("strengths"));
            assert_eq!(analysis.weaknesses, placeholder("weaknesses"));
            assert_eq!(analysis.suggestions, placeholder("suggestions"));
        }
    }

    #[test]
    fn interpret_is_deterministic() {
        let reply = "Strengths: arrays.\nWeaknesses: graphs.";
        assert_eq!(interpret(reply), interpret(reply));
    }
}
