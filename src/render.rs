//! Status line rendering.

use crossterm::style::{StyledContent, Stylize};

use costline_cost::{ContextBand, ContextUsage, Rollup};

const BAR_SEGMENTS: u64 = 10;
const SEPARATOR: &str = " │ ";

/// Everything shown on the status line.
#[derive(Debug, Clone)]
pub struct StatusLine<'a> {
    pub model: &'a str,
    pub context: ContextUsage,
    pub project: Option<&'a str>,
    pub branch: Option<&'a str>,
    pub session_cost: f64,
    pub totals: Rollup,
    pub clock: &'a str,
}

impl StatusLine<'_> {
    /// Render the single output line, with ANSI styling when `color` is set.
    pub fn render(&self, color: bool) -> String {
        let mut parts = vec![
            paint(self.model.to_string(), color, |s| s.cyan().bold()),
            context_segment(&self.context, color),
        ];

        if let Some(project) = self.project {
            parts.push(paint(project.to_string(), color, |s| s.blue()));
        }
        if let Some(branch) = self.branch {
            parts.push(paint(format!("⎇ {branch}"), color, |s| s.magenta()));
        }

        parts.push(cost_segment(self.session_cost, &self.totals));
        parts.push(paint(self.clock.to_string(), color, |s| s.dim()));

        parts.join(SEPARATOR)
    }
}

/// 10-segment bar of used context plus the remaining percentage.
fn context_segment(context: &ContextUsage, color: bool) -> String {
    let filled = ((context.used_percent + 5) / BAR_SEGMENTS).min(BAR_SEGMENTS) as usize;
    let bar = format!(
        "{}{}",
        "█".repeat(filled),
        "░".repeat(BAR_SEGMENTS as usize - filled)
    );
    let text = format!("{bar} {}%", context.remaining_percent());

    paint(text, color, |s| match context.band() {
        ContextBand::Plenty => s.green(),
        ContextBand::Moderate => s.yellow(),
        ContextBand::Low => s.red().bold(),
        ContextBand::Critical => s.red().bold().slow_blink(),
        ContextBand::Unknown => s.dim(),
    })
}

fn cost_segment(session_cost: f64, totals: &Rollup) -> String {
    format!(
        "{} sess · {} day · {} wk · {} mo · {} yr",
        format_cents(session_cost),
        format_cents(totals.day),
        format_whole(totals.week),
        format_whole(totals.month),
        format_whole(totals.year),
    )
}

fn paint(
    text: String,
    color: bool,
    style: impl FnOnce(StyledContent<String>) -> StyledContent<String>,
) -> String {
    if color {
        style(text.stylize()).to_string()
    } else {
        text
    }
}

/// Dollars rounded to cents, e.g. `$1.50`.
pub fn format_cents(amount: f64) -> String {
    format!("${:.2}", clean(amount * 100.0).round() / 100.0)
}

/// Dollars rounded to whole units, e.g. `$19`.
pub fn format_whole(amount: f64) -> String {
    format!("${:.0}", clean(amount).round())
}

fn clean(amount: f64) -> f64 {
    if amount.is_finite() && amount > 0.0 { amount } else { 0.0 }
}
