use anyhow::{Context, Result};
use lettre::message::{Mailbox, Message, MultiPart};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};
use once_cell::sync::OnceCell;
use regex::Regex;

use crate::model::MarketEvent;

/// Delivers drafted notifications over SMTP.
pub struct EmailSender {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl EmailSender {
    /// Build from SMTP_HOST / SMTP_USER / SMTP_PASS / NOTIFY_EMAIL_FROM.
    /// Returns `Ok(None)` when SMTP_HOST is unset (delivery disabled).
    pub fn from_env() -> Result<Option<Self>> {
        let Ok(host) = std::env::var("SMTP_HOST") else {
            return Ok(None);
        };
        let user = std::env::var("SMTP_USER").context("SMTP_USER missing")?;
        let pass = std::env::var("SMTP_PASS").context("SMTP_PASS missing")?;
        let from_addr = std::env::var("NOTIFY_EMAIL_FROM").context("NOTIFY_EMAIL_FROM missing")?;

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&host)
            .context("invalid SMTP_HOST")?
            .credentials(Credentials::new(user, pass))
            .build();
        let from: Mailbox = from_addr.parse().context("invalid NOTIFY_EMAIL_FROM")?;

        Ok(Some(Self { mailer, from }))
    }

    pub async fn send_draft(&self, event: &MarketEvent, recipient: &str, html: &str) -> Result<()> {
        let msg = build_message(self.from.clone(), event, recipient, html)?;
        self.mailer.send(msg).await.context("send email")?;
        Ok(())
    }
}

pub fn subject_for(event: &MarketEvent) -> String {
    format!("市场快讯 [{}]: {}", event.severity.label(), event.title)
}

fn build_message(
    from: Mailbox,
    event: &MarketEvent,
    recipient: &str,
    html: &str,
) -> Result<Message> {
    let to: Mailbox = recipient
        .parse()
        .with_context(|| format!("invalid recipient `{recipient}`"))?;
    Message::builder()
        .from(from)
        .to(to)
        .subject(subject_for(event))
        .multipart(MultiPart::alternative_plain_html(
            plain_text_from_html(html),
            html.to_string(),
        ))
        .context("build email")
}

/// Plain-text alternative: line-breaking tags become newlines, other tags are dropped,
/// entities decoded.
pub fn plain_text_from_html(html: &str) -> String {
    static RE_BREAKS: OnceCell<Regex> = OnceCell::new();
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    static RE_BLANK: OnceCell<Regex> = OnceCell::new();
    let re_breaks = RE_BREAKS
        .get_or_init(|| Regex::new(r"(?i)<br\s*/?>|</p\s*>|</li\s*>").expect("static regex"));
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?s)</?[^>]+>").expect("static regex"));
    let re_blank = RE_BLANK.get_or_init(|| Regex::new(r"\n{3,}").expect("static regex"));

    let out = re_breaks.replace_all(html, "\n");
    let out = re_tags.replace_all(&out, "");
    let out = html_escape::decode_html_entities(&out).to_string();
    let out = re_blank.replace_all(&out, "\n\n");
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Severity;

    fn event() -> MarketEvent {
        MarketEvent {
            id: "evt-1-0".into(),
            title: "油价飙升".into(),
            summary: "s".into(),
            region: "中东".into(),
            timestamp: "2026-01-01T00:00:00.000Z".into(),
            severity: Severity::High,
            affected_stocks: vec![],
            sources: vec![],
        }
    }

    #[test]
    fn html_is_flattened_for_plain_part() {
        let html = "<b>Alert</b><br>Oil &amp; gas<br><ul><li>XOM</li><li>CVX</li></ul>";
        assert_eq!(plain_text_from_html(html), "Alert\nOil & gas\nXOM\nCVX");
    }

    #[test]
    fn subject_carries_severity_and_title() {
        assert_eq!(subject_for(&event()), "市场快讯 [HIGH]: 油价飙升");
    }

    #[test]
    fn invalid_recipient_is_rejected() {
        let from: Mailbox = "alerts@example.com".parse().unwrap();
        assert!(build_message(from.clone(), &event(), "not an address", "<b>x</b>").is_err());
        assert!(build_message(from, &event(), "ops@example.com", "<b>x</b>").is_ok());
    }
}
