// src/prompts.rs
//! Prompt builders for the three outbound operations. Output language is Simplified Chinese.

use crate::model::MarketEvent;

/// Topics used when the caller supplies no keywords.
pub const DEFAULT_TOPICS: &[&str] = &["宏观经济", "地缘政治"];

/// Number of records the trend digest asks for.
pub const TREND_COUNT: usize = 10;

const RECORD_SCHEMA: &str = r#"[
  {
    "title": "事件标题（中文）",
    "summary": "2句话摘要（中文）",
    "region": "来源地区（如：中国、欧洲、中东）",
    "severity": "HIGH" | "MEDIUM" | "LOW",
    "affectedStocks": [
      {
        "symbol": "AAPL",
        "name": "Apple Inc.",
        "impact": "BULLISH" | "BEARISH" | "NEUTRAL" | "VOLATILE",
        "reasoning": "为什么受影响（中文）"
      }
    ]
  }
]"#;

/// Keywords joined verbatim for the prompt; an empty list means the default topics.
pub fn topic_list(keywords: &[String]) -> String {
    if keywords.is_empty() {
        DEFAULT_TOPICS.join(", ")
    } else {
        keywords.join(", ")
    }
}

pub fn intelligence_prompt(keywords: &[String]) -> String {
    format!(
        "你是一位资深金融分析师。\n\
         任务：搜索过去24小时内对美股市场有重大影响的国际新闻、地缘政治事件或宏观经济变化。\n\
         关注领域：{topics}。\n\n\
         对于发现的每个事件：\n\
         1. 分析其对美股市场的影响严重程度。\n\
         2. 找出直接受影响的美股代码（或ETF）。\n\
         3. 判断是利好（BULLISH）还是利空（BEARISH）。\n\
         4. 用中文提供简明的理由。\n\n\
         输出格式：\n\
         严格返回一个有效的 JSON 对象数组。\n\
         不要包含任何开场白或结尾语，直接以 \"[\" 开始。\n\n\
         JSON 结构必须是：\n{schema}\n",
        topics = topic_list(keywords),
        schema = RECORD_SCHEMA,
    )
}

pub fn trends_prompt() -> String {
    format!(
        "你是一位全球宏观策略师。\n\
         任务：识别当前世界上影响全球金融市场的{count}大关键趋势。\n\
         这些趋势可以是长期的（如人工智能革命、能源转型），也可以是短期的剧烈变化（如某地战争升级）。\n\n\
         输出格式：\n\
         严格返回一个恰好包含{count}个对象的有效 JSON 数组，全部使用简体中文。\n\
         不要包含任何开场白或结尾语，直接以 \"[\" 开始。\n\
         region 字段统一填写 \"全球\"。\n\n\
         JSON 结构必须是：\n{schema}\n",
        count = TREND_COUNT,
        schema = RECORD_SCHEMA,
    )
}

pub fn notification_prompt(event: &MarketEvent, recipient: &str) -> String {
    let assets = event
        .affected_stocks
        .iter()
        .map(|s| format!("{} ({})", s.symbol, s.impact.label()))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "起草一封发送给 {recipient} 的专业且紧急的金融快讯邮件。\n\
         语言：简体中文。\n\n\
         主题: {title}\n\
         严重程度: {severity}\n\
         摘要: {summary}\n\
         受影响资产: {assets}.\n\n\
         语气应客观、专业且具有可操作性。\n\
         请使用 HTML 标签进行排版（使用 <b>, <br>, <ul>, <li> 等）。\n",
        title = event.title,
        severity = event.severity.label(),
        summary = event.summary,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ImpactType, Severity, StockImpact};

    #[test]
    fn empty_keywords_use_default_topics() {
        assert_eq!(topic_list(&[]), "宏观经济, 地缘政治");
        assert_eq!(
            topic_list(&["科技".to_string(), " 能源 ".to_string()]),
            "科技,  能源 "
        );
        assert!(intelligence_prompt(&[]).contains("关注领域：宏观经济, 地缘政治。"));
    }

    #[test]
    fn trends_prompt_asks_for_ten() {
        assert!(trends_prompt().contains("恰好包含10个对象"));
    }

    #[test]
    fn notification_prompt_lists_assets() {
        let ev = MarketEvent {
            id: "evt-1-0".into(),
            title: "关税升级".into(),
            summary: "摘要".into(),
            region: "中国".into(),
            timestamp: "2026-01-01T00:00:00.000Z".into(),
            severity: Severity::High,
            affected_stocks: vec![
                StockImpact {
                    symbol: "AAPL".into(),
                    name: "Apple".into(),
                    impact: ImpactType::Bearish,
                    reasoning: "r".into(),
                },
                StockImpact {
                    symbol: "NVDA".into(),
                    name: "Nvidia".into(),
                    impact: ImpactType::Volatile,
                    reasoning: "r".into(),
                },
            ],
            sources: vec![],
        };
        let p = notification_prompt(&ev, "ops@example.com");
        assert!(p.contains("发送给 ops@example.com"));
        assert!(p.contains("严重程度: HIGH"));
        assert!(p.contains("受影响资产: AAPL (BEARISH), NVDA (VOLATILE)."));
    }
}
