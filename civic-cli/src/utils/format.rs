use colored::{ColoredString, Colorize};

use civic_cms::audit::{AuditAction, AuditPage, AuditRecord};

const REPR_WIDTH: usize = 40;

/// Column headings matching [`record_line`]
pub fn header() -> String {
    format!(
        "{:<19}  {:<7}  {:<16}  {:<28}  {}",
        "TIME", "ACTION", "ACTOR", "ENTITY", "DISPLAY"
    )
    .bold()
    .to_string()
}

/// One record as a table row
pub fn record_line(record: &AuditRecord) -> String {
    format!(
        "{:<19}  {:<7}  {:<16}  {:<28}  {}",
        record.created_at.format("%Y-%m-%d %H:%M:%S"),
        colored_action(record.action),
        record.actor_name().unwrap_or("-"),
        entity_label(record),
        ellipsize(&record.entity_repr, REPR_WIDTH)
    )
}

/// `Page 2 of 5 (93 records)`
pub fn page_footer(page: &AuditPage) -> String {
    format!(
        "Page {} of {} ({} record{})",
        page.page,
        page.total_pages(),
        page.total,
        if page.total == 1 { "" } else { "s" }
    )
}

fn colored_action(action: AuditAction) -> ColoredString {
    let name = format!("{:<7}", action.as_str());
    match action {
        AuditAction::Create => name.green(),
        AuditAction::Update => name.yellow(),
        AuditAction::Delete => name.red(),
        AuditAction::Login | AuditAction::Logout => name.blue(),
    }
}

/// `content.Page#7`, or the bare label without an id
pub fn entity_label(record: &AuditRecord) -> String {
    if record.entity_id.is_empty() {
        record.entity_type.clone()
    } else {
        format!("{}#{}", record.entity_type, record.entity_id)
    }
}

/// Shorten to at most `width` characters, marking the cut with `…`
pub fn ellipsize(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_string();
    }
    let mut short: String = value.chars().take(width.saturating_sub(1)).collect();
    short.push('…');
    short
}

#[cfg(test)]
mod tests {
    use super::*;
    use civic_cms::audit::EntityType;

    #[test]
    fn test_ellipsize() {
        assert_eq!(ellipsize("About", 40), "About");
        assert_eq!(ellipsize("abcdef", 4), "abc…");
        assert_eq!(ellipsize("ééééé", 5), "ééééé");
    }

    #[test]
    fn test_entity_label() {
        let record = AuditRecord::new(AuditAction::Update).with_target(
            EntityType::new("content", "Page"),
            "7",
            "About",
        );
        assert_eq!(entity_label(&record), "content.Page#7");

        let record = AuditRecord::new(AuditAction::Delete).with_target(
            EntityType::new("content", "Page"),
            "",
            "About",
        );
        assert_eq!(entity_label(&record), "content.Page");
    }

    #[test]
    fn test_page_footer() {
        let page = AuditPage {
            records: Vec::new(),
            total: 45,
            page: 2,
            per_page: 20,
        };
        assert_eq!(page_footer(&page), "Page 2 of 3 (45 records)");

        let empty = AuditPage {
            records: Vec::new(),
            total: 0,
            page: 1,
            per_page: 20,
        };
        assert_eq!(page_footer(&empty), "Page 1 of 1 (0 records)");
    }

    #[test]
    fn test_record_line_plain() {
        colored::control::set_override(false);
        let record = AuditRecord::new(AuditAction::Create).with_target(
            EntityType::new("notices", "Notice"),
            "3",
            "Road closure",
        );
        let line = record_line(&record);
        assert!(line.contains("CREATE"));
        assert!(line.contains("notices.Notice#3"));
        assert!(line.contains("Road closure"));
        assert!(line.contains(" - "));
    }
}
