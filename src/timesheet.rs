use crate::harvest::TimeEntry;

/// One line of the timesheet: every entry for a single day folded together.
#[derive(Debug, PartialEq, Clone)]
pub struct Row {
    pub date: String,
    pub hours: f64,
    pub notes: String,
}

/// Harvest renders task names like "Design / Review"; in the notes column
/// the slash reads like a second task, so swap the first one for an "&".
fn normalize_task(name: &str) -> String {
    name.replacen(" / ", " & ", 1)
}

/// Fold raw time entries into one row per day, in first-seen date order.
///
/// Hours are summed as-is; Harvest already rounds each entry. Task names
/// are deduplicated with a plain substring check against the notes built
/// so far, which mirrors the notes a human would keep but will also drop
/// a task whose name happens to be contained in another's.
pub fn aggregate(entries: &[TimeEntry]) -> Vec<Row> {
    let mut rows: Vec<Row> = Vec::new();
    for entry in entries {
        let task = normalize_task(&entry.task.name);
        match rows.iter_mut().find(|row| row.date == entry.spent_date) {
            Some(row) => {
                row.hours += entry.rounded_hours;
                if !row.notes.contains(&task) {
                    row.notes.push_str("; ");
                    row.notes.push_str(&task);
                }
            }
            None => rows.push(Row {
                date: entry.spent_date.clone(),
                hours: entry.rounded_hours,
                notes: task,
            }),
        }
    }
    rows
}

pub fn total(rows: &[Row]) -> f64 {
    rows.iter().map(|row| row.hours).sum()
}

/// Render rows as CSV: a bare header, then each row prefixed (not
/// terminated) by a newline, so the document has no trailing newline.
pub fn to_csv(rows: &[Row]) -> String {
    let mut csv = String::from("Date,Hours,Notes");
    for row in rows {
        csv.push('\n');
        csv.push_str(&format!(
            "{},{},{}",
            row.date,
            row.hours,
            quoted(&row.notes)
        ));
    }
    csv
}

/// Notes can contain commas and semicolons, so the field is always quoted,
/// with embedded quotes doubled.
fn quoted(field: &str) -> String {
    let mut out = String::with_capacity(field.len() + 2);
    out.push('"');
    for c in field.chars() {
        if c == '"' {
            out.push('"');
        }
        out.push(c);
    }
    out.push('"');
    out
}
