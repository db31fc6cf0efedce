//! Task report email rendering.

use chrono::{DateTime, Utc};

use crate::notify::Notification;
use crate::notify::dispatch::DISPLAY_TIME_FORMAT;
use crate::notify::escape_html;
use crate::tasks::Task;

fn text_line(task: &Task) -> String {
    match task.due_at {
        Some(due) => format!("- {} (due {})", task.title, due.format(DISPLAY_TIME_FORMAT)),
        None => format!("- {}", task.title),
    }
}

fn html_item(task: &Task) -> String {
    match task.due_at {
        Some(due) => format!(
            "<li>{} <em>(due {})</em></li>",
            escape_html(&task.title),
            due.format(DISPLAY_TIME_FORMAT)
        ),
        None => format!("<li>{}</li>", escape_html(&task.title)),
    }
}

fn text_section(out: &mut String, heading: &str, tasks: &[&Task]) {
    out.push_str(&format!("\n{heading} ({}):\n", tasks.len()));
    if tasks.is_empty() {
        out.push_str("- none\n");
    }
    for task in tasks {
        out.push_str(&text_line(task));
        out.push('\n');
    }
}

fn html_section(out: &mut String, heading: &str, tasks: &[&Task]) {
    out.push_str(&format!("<h3>{heading} ({})</h3>", tasks.len()));
    if tasks.is_empty() {
        out.push_str("<p>None</p>");
        return;
    }
    out.push_str("<ul>");
    for task in tasks {
        out.push_str(&html_item(task));
    }
    out.push_str("</ul>");
}

/// Render the summary email for `owner_name`'s tasks.
pub fn render_report(owner_name: &str, tasks: &[Task], now: DateTime<Utc>) -> Notification {
    let (completed, pending): (Vec<&Task>, Vec<&Task>) = tasks.iter().partition(|t| t.completed);

    let date = now.format("%d %b %Y");
    let subject = format!("Your task report for {date}");

    let mut text = format!(
        "Hi {owner_name}, here is your task report.\n{} completed, {} pending.\n",
        completed.len(),
        pending.len()
    );
    text_section(&mut text, "Pending", &pending);
    text_section(&mut text, "Completed", &completed);

    let mut html = format!(
        "<h2>Task report</h2><p>Hi {}, here is your task report. {} completed, {} pending.</p>",
        escape_html(owner_name),
        completed.len(),
        pending.len()
    );
    html_section(&mut html, "Pending", &pending);
    html_section(&mut html, "Completed", &completed);

    Notification {
        subject,
        text,
        html,
    }
}
