/// Central template renderer for the workbench dashboard.
///
/// The dashboard is a single HTML template (`studio/assets/dashboard.html`)
/// with placeholder tokens like `{{TOKEN}}`, loaded at compile time.
/// `render_page` resolves the global placeholders and hands the rest to a
/// closure; anything left unfilled is blanked.

use crate::state::{FlashKind, FlashMessage};

const TEMPLATE: &str = include_str!("assets/dashboard.html");

/// Renders the full dashboard page.
///
/// # Arguments
/// - `run_active`: whether a training run is in progress
/// - `fill`: closure that fills section placeholders
pub fn render_page<F>(run_active: bool, fill: F) -> String
where
    F: FnOnce(String) -> String,
{
    let mut html = TEMPLATE.to_owned();
    html = html.replace("{{RUN_ACTIVE}}", if run_active { "true" } else { "false" });
    html = fill(html);
    blank_remaining(html)
}

/// Replaces any `{{TOKEN}}` that wasn't substituted with an empty string.
fn blank_remaining(mut html: String) -> String {
    while let Some(start) = html.find("{{") {
        if let Some(end) = html[start..].find("}}") {
            let abs_end = start + end + 2;
            html.replace_range(start..abs_end, "");
        } else {
            break;
        }
    }
    html
}

pub fn render_flash_html(flash: Option<&FlashMessage>) -> String {
    match flash {
        None    => String::new(),
        Some(f) => {
            let cls = match f.kind {
                FlashKind::Success => "flash-success",
                FlashKind::Error   => "flash-error",
            };
            format!(r#"<div class="flash {}">{}</div>"#, cls, html_escape(&f.text))
        }
    }
}

/// Escapes markup and braces, so user text never forms a `{{TOKEN}}`.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
     .replace('<', "&lt;")
     .replace('>', "&gt;")
     .replace('"', "&quot;")
     .replace('{', "&#123;")
     .replace('}', "&#125;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unfilled_tokens_are_blanked() {
        assert_eq!(blank_remaining("a{{X}}b{{Y}}c".into()), "abc");
        assert_eq!(blank_remaining("open {{ only".into()), "open {{ only");
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(html_escape("<a href=\"x\">&</a>"), "&lt;a href=&quot;x&quot;&gt;&amp;&lt;/a&gt;");
    }

    #[test]
    fn escaped_text_survives_blanking() {
        let html = blank_remaining(format!("<td>{}</td>", html_escape("{{hidden}}")));
        assert_eq!(html, "<td>&#123;&#123;hidden&#125;&#125;</td>");
    }

    #[test]
    fn chart_plots_loss_and_accuracy_series() {
        for key in ["trainingLoss", "validationLoss", "trainingAccuracy", "validationAccuracy"] {
            assert!(TEMPLATE.contains(&format!("line('{}'", key)), "{} is not charted", key);
        }
    }
}
