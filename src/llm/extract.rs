//! 从 LLM 原始文本中提取第一个顶层 JSON 对象
//!
//! 模型常在 JSON 前后附带解释或 ```json 代码块；这里按括号配对扫描（跳过字符串内的括号与转义），
//! 返回第一个完整的 `{...}` 片段，找不到则返回 None。

/// 提取第一个顶层 JSON 对象的文本切片
pub fn extract_json_object(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &b) in bytes[start..].iter().enumerate() {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

/// 提取并解析为 serde_json::Value；提取失败或 JSON 非法时返回错误描述
pub fn parse_json_object(text: &str) -> Result<serde_json::Value, String> {
    let raw = extract_json_object(text).ok_or_else(|| "no JSON object found".to_string())?;
    serde_json::from_str(raw).map_err(|e| format!("{}: {}", e, raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_plain_object() {
        assert_eq!(extract_json_object(r#"{"a": 1}"#), Some(r#"{"a": 1}"#));
    }

    #[test]
    fn test_extract_with_surrounding_text() {
        let text = "Sure, here it is:\n```json\n{\"action\": \"post\", \"p\": {\"q\": 1}}\n```\nDone {x}";
        assert_eq!(
            extract_json_object(text),
            Some("{\"action\": \"post\", \"p\": {\"q\": 1}}")
        );
    }

    #[test]
    fn test_extract_ignores_braces_in_strings() {
        let text = r#"{"reasoning": "use } carefully \" {", "n": 2} trailing"#;
        assert_eq!(
            extract_json_object(text),
            Some(r#"{"reasoning": "use } carefully \" {", "n": 2}"#)
        );
    }

    #[test]
    fn test_extract_unbalanced_returns_none() {
        assert_eq!(extract_json_object("{\"a\": {\"b\": 1}"), None);
        assert_eq!(extract_json_object("no json here"), None);
    }

    #[test]
    fn test_parse_json_object_error() {
        assert!(parse_json_object("{not json}").is_err());
        assert!(parse_json_object("plain").is_err());
    }
}
